use ratatui::layout::Constraint;

pub(crate) const APP_TITLE: &str = concat!("SHOTFTP ", env!("CARGO_PKG_VERSION"));
pub(crate) const HELP_TEXT: &str =
    "(t)est connection | (s)tart listening | (x) stop | (c)lear log | (v)iew | (q)uit";

pub(crate) const LABEL_WIDTH: usize = 10;

pub(crate) const HEADER_HEIGHT: u16 = 3;

pub(crate) const COLUMN_PERCENTAGES: [u16; 2] = [40, 60];

pub(crate) const NOTICE_WIDTH_PERCENT: u16 = 50;

pub(crate) const POPUP_MIN_WIDTH: u16 = 10;
pub(crate) const POPUP_MIN_HEIGHT: u16 = 5;

pub(crate) fn columns() -> [Constraint; 2] {
    COLUMN_PERCENTAGES.map(Constraint::Percentage)
}
