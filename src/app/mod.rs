use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};

use anyhow::{Context, Result};

use crate::app::constants::STATUS_READY;
use crate::app::ftp_backend::{FtpBackend, RealFtpBackend};
use crate::app::logging::{LogSink, prune_log_file};
use crate::app::upload::Uploader;
use crate::clipboard::{ClipboardSource, SystemClipboard};
use crate::hotkey::{GlobalHotkeyListener, KeyListener, hotkey_label};
use crate::model::{AppConfig, AppEvent, LogLevel, LogLine, Notice, WorkingDirectory};
use crate::paths::generate_candidates;
use crate::storage::{config_path, load_or_init_store, log_path};

mod capture;
pub(crate) mod constants;
mod ftp_backend;
mod handlers;
mod logging;
mod probe;
mod upload;

use capture::CaptureTrigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderMode {
    Help,
    Off,
}

pub(crate) struct App {
    pub(crate) config: AppConfig,
    pub(crate) candidates: Vec<String>,
    pub(crate) log_path: PathBuf,
    pub(crate) log_lines: VecDeque<LogLine>,
    pub(crate) status: String,
    pub(crate) notice: Option<Notice>,
    pub(crate) header_mode: HeaderMode,
    pub(crate) working_dir: WorkingDirectory,
    pub(crate) probe_running: bool,
    pub(crate) trigger: CaptureTrigger,
    backend: Arc<dyn FtpBackend>,
    clipboard: Arc<dyn ClipboardSource>,
    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,
}

impl App {
    pub(crate) fn load() -> Result<Self> {
        let config_path = config_path()?;
        let config = load_or_init_store(&config_path)?;
        let log_path = log_path()?;
        prune_log_file(&log_path);
        let listener = GlobalHotkeyListener::new(&config.hotkey).context("parse hotkey")?;
        Ok(Self::new(
            config,
            log_path,
            Arc::new(RealFtpBackend),
            Arc::new(SystemClipboard),
            Box::new(listener),
        ))
    }

    pub(crate) fn new(
        config: AppConfig,
        log_path: PathBuf,
        backend: Arc<dyn FtpBackend>,
        clipboard: Arc<dyn ClipboardSource>,
        listener: Box<dyn KeyListener>,
    ) -> Self {
        let candidates = generate_candidates(&config.target_dir, &config.aliases);
        let (events_tx, events_rx) = mpsc::channel();
        let mut app = Self {
            config,
            candidates,
            log_path,
            log_lines: VecDeque::new(),
            status: String::new(),
            notice: None,
            header_mode: HeaderMode::Help,
            working_dir: WorkingDirectory::default(),
            probe_running: false,
            trigger: CaptureTrigger::new(listener),
            backend,
            clipboard,
            events_tx,
            events_rx,
        };
        app.log(
            LogLevel::Info,
            &format!(
                "Server {}, target directory {}",
                app.config.connection.label(),
                app.config.target_dir
            ),
        );
        app.log(
            LogLevel::Info,
            &format!(
                "Press t to find an upload directory, then s to listen for {}",
                hotkey_label(&app.config.hotkey)
            ),
        );
        app.set_status(STATUS_READY);
        app
    }

    pub(crate) fn log_sink(&self) -> LogSink {
        LogSink::new(self.events_tx.clone())
    }

    pub(crate) fn uploader(&self) -> Uploader {
        Uploader::new(
            Arc::clone(&self.backend),
            self.config.connection.clone(),
            self.working_dir.reader(),
            self.log_sink(),
        )
    }

    pub(crate) fn poll_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::Log(event) => self.log(event.level, &event.message),
                AppEvent::ProbeFinished(outcome) => self.finish_probe(outcome),
                AppEvent::CaptureFinished(outcome) => self.finish_capture(outcome),
            }
        }
    }

    pub(crate) fn shutdown(&mut self) {
        self.stop_listening();
    }
}

#[cfg(test)]
impl App {
    pub(crate) fn for_test() -> Self {
        Self::for_test_with_backend(Arc::new(ftp_backend::MockFtpBackend::default()))
    }

    pub(crate) fn for_test_with_backend(backend: Arc<dyn FtpBackend>) -> Self {
        let (listener, _) = crate::hotkey::MockKeyListener::new();
        Self::for_test_with(
            backend,
            Arc::new(crate::clipboard::MockClipboard::empty()),
            Box::new(listener),
        )
    }

    pub(crate) fn for_test_with(
        backend: Arc<dyn FtpBackend>,
        clipboard: Arc<dyn ClipboardSource>,
        listener: Box<dyn KeyListener>,
    ) -> Self {
        let config = AppConfig {
            connection: crate::model::ConnectionConfig {
                host: "44.112.2.110".to_string(),
                port: crate::ftp::DEFAULT_PORT,
                user: "uploader".to_string(),
                password: "pw".to_string(),
            },
            target_dir: crate::model::DEFAULT_TARGET_DIR.to_string(),
            aliases: crate::model::default_aliases(),
            hotkey: crate::model::HotkeyConfig::default(),
            capture_delay_ms: 0,
        };
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let log_path = std::env::temp_dir().join(format!("shotftp-app-test-{nanos}.log"));
        Self::new(config, log_path, backend, clipboard, listener)
    }

    pub(crate) fn wait_for_probe(&mut self) {
        for _ in 0..500 {
            self.poll_events();
            if !self.probe_running {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        panic!("probe did not finish");
    }
}
