use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, HeaderMode};

impl App {
    /// Returns true when the app should quit.
    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c'))
        {
            return Ok(true);
        }
        if self.notice.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.notice = None;
            }
            return Ok(false);
        }
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('t') => self.start_probe(),
            KeyCode::Char('s') => self.start_listening(),
            KeyCode::Char('x') => self.stop_listening(),
            KeyCode::Char('c') => self.clear_log(),
            KeyCode::Char('v') => self.cycle_header_mode(),
            _ => {}
        }
        Ok(false)
    }

    fn cycle_header_mode(&mut self) {
        self.header_mode = match self.header_mode {
            HeaderMode::Help => HeaderMode::Off,
            HeaderMode::Off => HeaderMode::Help,
        };
    }
}
