use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::App;
use crate::hotkey::hotkey_label;
use crate::model::ListenState;
use crate::ui::constants::{APP_TITLE, HELP_TEXT, LABEL_WIDTH};
use crate::ui::helpers::{field_line, level_color, truncate_text};

fn panel_block(title: &str) -> Block<'static> {
    Block::default()
        .title(Line::from(Span::styled(
            title.to_string(),
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )))
        .borders(Borders::ALL)
}

pub(crate) fn draw_app_header(frame: &mut Frame<'_>, area: Rect) {
    let title = Paragraph::new(APP_TITLE)
        .style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(title, area);
}

pub(crate) fn draw_help_header(frame: &mut Frame<'_>, area: Rect) {
    let help = Paragraph::new(HELP_TEXT)
        .block(
            Block::default()
                .title(Line::from(Span::styled(
                    "Help",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )))
                .borders(Borders::ALL),
        )
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(help, area);
}

pub(crate) fn draw_status_panel(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let plain = Style::default();
    let value_width = (area.width as usize).saturating_sub(LABEL_WIDTH + 4);
    let directory = match app.working_dir.get() {
        Some(dir) => field_line("Directory", &dir, plain.fg(Color::Green)),
        None => field_line("Directory", "not resolved, press t", plain.fg(Color::Yellow)),
    };
    let state = if app.probe_running {
        field_line("State", "Testing connection", plain.fg(Color::Cyan))
    } else {
        match app.trigger.state() {
            ListenState::Listening => field_line("State", "Listening", plain.fg(Color::Green)),
            ListenState::Idle => field_line("State", "Idle", plain.fg(Color::Gray)),
        }
    };
    let lines = vec![
        field_line("Server", &app.config.connection.label(), plain),
        field_line("User", &app.config.connection.user, plain),
        field_line("Target", &app.config.target_dir, plain),
        directory,
        field_line("Hotkey", &hotkey_label(&app.config.hotkey), plain),
        state,
        Line::default(),
        field_line(
            "Status",
            &truncate_text(&app.status, value_width),
            plain.fg(Color::Gray),
        ),
    ];
    let panel = Paragraph::new(lines).block(panel_block("Uploader"));
    frame.render_widget(panel, area);
}

pub(crate) fn draw_log_panel(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .log_lines
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .map(|line| {
            Line::from(Span::styled(
                line.text.clone(),
                Style::default().fg(level_color(line.level)),
            ))
        })
        .collect();
    let logs = Paragraph::new(lines)
        .block(panel_block("Logs"))
        .wrap(Wrap { trim: true });
    frame.render_widget(logs, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogLevel;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render(
        width: u16,
        height: u16,
        draw: impl FnOnce(&mut Frame<'_>),
    ) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(draw).unwrap();
        terminal
    }

    fn content(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn help_header_lists_keys() {
        let terminal = render(100, 3, |frame| draw_help_header(frame, frame.area()));
        let text = content(&terminal);
        assert!(text.contains("(t)est connection"));
        assert!(text.contains("(q)uit"));
    }

    #[test]
    fn status_panel_shows_directory_state() {
        let app = App::for_test();
        let terminal = render(60, 10, |frame| draw_status_panel(frame, &app, frame.area()));
        let text = content(&terminal);
        assert!(text.contains("44.112.2.110"));
        assert!(text.contains("not resolved"));
        assert!(text.contains("Idle"));

        app.working_dir.set("/nanAn/".to_string());
        let terminal = render(60, 10, |frame| draw_status_panel(frame, &app, frame.area()));
        assert!(content(&terminal).contains("/nanAn/"));
    }

    #[test]
    fn log_panel_colors_by_level() {
        let mut app = App::for_test();
        app.clear_log();
        app.log(LogLevel::Error, "boom");
        let terminal = render(60, 6, |frame| draw_log_panel(frame, &app, frame.area()));
        let buffer = terminal.backend().buffer();
        let cell = buffer
            .content()
            .iter()
            .find(|cell| cell.symbol() == "b")
            .unwrap();
        assert_eq!(cell.fg, Color::Red);
    }
}
