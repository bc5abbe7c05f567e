use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};

use crate::app::{App, HeaderMode};
use crate::ui::constants::{HEADER_HEIGHT, columns};
use crate::ui::modals::draw_notice_modal;
use crate::ui::panels::{draw_app_header, draw_help_header, draw_log_panel, draw_status_panel};

pub(crate) mod constants;
mod helpers;
mod modals;
mod panels;

pub(crate) fn draw_ui(frame: &mut Frame<'_>, app: &App) {
    let body_area = if app.header_mode == HeaderMode::Help {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(HEADER_HEIGHT), Constraint::Min(1)].as_ref())
            .split(frame.area());
        let header = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(columns().as_ref())
            .split(rows[0]);
        draw_app_header(frame, header[0]);
        draw_help_header(frame, header[1]);
        rows[1]
    } else {
        frame.area()
    };

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(columns().as_ref())
        .split(body_area);
    draw_status_panel(frame, app, body[0]);
    draw_log_panel(frame, app, body[1]);

    if app.notice.is_some() {
        draw_notice_modal(frame, app);
    }
}
