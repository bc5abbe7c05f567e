use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::mpsc;

use chrono::Datelike;

use crate::app::App;
use crate::app::constants::{
    LOG_MAX_ENTRIES, LOG_MAX_IN_MEMORY, LOG_PARSE_FORMAT, LOG_RETENTION_DAYS, LOG_SEPARATOR,
    LOG_TIMESTAMP_FORMAT,
};
use crate::model::{AppEvent, LogEvent, LogLevel, LogLine};

/// Cloneable handle worker threads use to report progress to the log panel.
#[derive(Debug, Clone)]
pub(crate) struct LogSink {
    tx: mpsc::Sender<AppEvent>,
}

impl LogSink {
    pub(crate) fn new(tx: mpsc::Sender<AppEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message.into());
    }

    pub(crate) fn warning(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warning, message.into());
    }

    pub(crate) fn success(&self, message: impl Into<String>) {
        self.emit(LogLevel::Success, message.into());
    }

    pub(crate) fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message.into());
    }

    pub(crate) fn send(&self, event: AppEvent) {
        // The UI may already be gone during shutdown.
        let _ = self.tx.send(event);
    }

    fn emit(&self, level: LogLevel, message: String) {
        self.send(AppEvent::Log(LogEvent { level, message }));
    }
}

impl App {
    pub(crate) fn set_status(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.status = message.clone();
        self.log(LogLevel::Info, &message);
    }

    pub(crate) fn log(&mut self, level: LogLevel, message: &str) {
        let timestamp = chrono::Local::now().format(LOG_TIMESTAMP_FORMAT);
        let text = format!("{timestamp}{LOG_SEPARATOR}{message}");
        if let Some(parent) = self.log_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(mut file) = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
        {
            let _ = writeln!(
                file,
                "{timestamp}{LOG_SEPARATOR}{}{LOG_SEPARATOR}{message}",
                level.as_str()
            );
        }
        self.log_lines.push_back(LogLine { level, text });
        while self.log_lines.len() > LOG_MAX_IN_MEMORY {
            self.log_lines.pop_front();
        }
    }

    pub(crate) fn clear_log(&mut self) {
        self.log_lines.clear();
        self.log(LogLevel::Info, "Log cleared");
    }
}

pub(crate) fn prune_log_file(path: &Path) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let cutoff = chrono::Local::now().naive_local() - chrono::Duration::days(LOG_RETENTION_DAYS);
    let current_year = chrono::Local::now().year();
    let mut kept = Vec::new();
    for line in content.lines() {
        if let Some((timestamp, _)) = line.split_once(LOG_SEPARATOR) {
            let with_year = format!("{current_year}-{timestamp}");
            if let Ok(parsed) = chrono::NaiveDateTime::parse_from_str(&with_year, LOG_PARSE_FORMAT)
            {
                if parsed >= cutoff {
                    kept.push(line.to_string());
                }
            }
        }
    }
    if kept.len() > LOG_MAX_ENTRIES {
        kept = kept.split_off(kept.len().saturating_sub(LOG_MAX_ENTRIES));
    }
    if kept.is_empty() {
        let _ = fs::remove_file(path);
    } else if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
        let _ = fs::write(path, kept.join("\n") + "\n");
    }
}
