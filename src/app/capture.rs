use std::sync::Arc;
use std::time::Duration;

use crate::app::App;
use crate::app::constants::{
    FILE_TIMESTAMP_FORMAT, NOTICE_HOTKEY_TITLE, NOTICE_NO_DIRECTORY_MESSAGE,
    NOTICE_NO_DIRECTORY_TITLE,
};
use crate::app::logging::LogSink;
use crate::app::upload::Uploader;
use crate::clipboard::{ClipboardSource, encode_png};
use crate::hotkey::{HotkeyError, KeyListener, hotkey_label};
use crate::model::{AppEvent, CaptureOutcome, FailureKind, ListenState, LogLevel, Notice};

pub(crate) struct CaptureTrigger {
    listener: Box<dyn KeyListener>,
    state: ListenState,
}

impl CaptureTrigger {
    pub(crate) fn new(listener: Box<dyn KeyListener>) -> Self {
        Self {
            listener,
            state: ListenState::Idle,
        }
    }

    pub(crate) fn state(&self) -> ListenState {
        self.state
    }

    pub(crate) fn start_listening(
        &mut self,
        on_press: Box<dyn Fn() + Send>,
    ) -> Result<bool, HotkeyError> {
        if self.state == ListenState::Listening {
            return Ok(false);
        }
        self.listener.start(on_press)?;
        self.state = ListenState::Listening;
        Ok(true)
    }

    /// Returns `Ok(false)` when already idle. The trigger is idle afterwards
    /// even if releasing the key failed.
    pub(crate) fn stop_listening(&mut self) -> Result<bool, HotkeyError> {
        if self.state == ListenState::Idle {
            return Ok(false);
        }
        self.state = ListenState::Idle;
        self.listener.stop()?;
        Ok(true)
    }
}

pub(crate) fn capture_and_upload(
    clipboard: &dyn ClipboardSource,
    uploader: &Uploader,
    log: &LogSink,
    delay: Duration,
) -> CaptureOutcome {
    std::thread::sleep(delay);
    log.info("Reading image from clipboard");
    let image = match clipboard.read_image() {
        Ok(Some(image)) => image,
        Ok(None) => {
            let message = "Clipboard does not hold an image".to_string();
            log.error(message.as_str());
            return CaptureOutcome::Failed {
                kind: FailureKind::NoClipboardImage,
                message,
            };
        }
        Err(err) => {
            let message = format!("Screenshot processing failed: {err}");
            log.error(message.as_str());
            return CaptureOutcome::Failed {
                kind: FailureKind::ClipboardUnavailable,
                message,
            };
        }
    };
    log.info(format!(
        "Captured {}x{} image",
        image.width(),
        image.height()
    ));

    let payload = match encode_png(&image) {
        Ok(payload) => payload,
        Err(err) => {
            let message = format!("Screenshot processing failed: {err}");
            log.error(message.as_str());
            return CaptureOutcome::Failed {
                kind: FailureKind::UploadFailed,
                message,
            };
        }
    };
    let filename = format!(
        "screenshot_{}.png",
        chrono::Local::now().format(FILE_TIMESTAMP_FORMAT)
    );
    match uploader.try_upload(&payload, &filename) {
        Ok(()) => CaptureOutcome::Uploaded { filename },
        Err(kind) => CaptureOutcome::Failed {
            kind,
            message: format!("Upload of {filename} failed ({kind})"),
        },
    }
}

impl App {
    pub(crate) fn start_listening(&mut self) {
        if self.working_dir.get().is_none() {
            self.log(
                LogLevel::Warning,
                "Cannot listen yet, no working directory resolved",
            );
            self.notice = Some(Notice {
                title: NOTICE_NO_DIRECTORY_TITLE.to_string(),
                message: NOTICE_NO_DIRECTORY_MESSAGE.to_string(),
                level: LogLevel::Warning,
            });
            return;
        }
        if self.probe_running {
            self.log(
                LogLevel::Warning,
                "Wait for the connection test to finish before listening",
            );
            return;
        }

        let uploader = self.uploader();
        let clipboard = Arc::clone(&self.clipboard);
        let log = self.log_sink();
        let delay = Duration::from_millis(self.config.capture_delay_ms);
        let on_press = Box::new(move || {
            log.info("Screenshot key pressed");
            let outcome = capture_and_upload(clipboard.as_ref(), &uploader, &log, delay);
            log.send(AppEvent::CaptureFinished(outcome));
        });

        let label = hotkey_label(&self.config.hotkey);
        match self.trigger.start_listening(on_press) {
            Ok(true) => self.set_status(format!("Listening for {label}")),
            Ok(false) => self.log(LogLevel::Info, "Already listening"),
            Err(err) => {
                self.log(LogLevel::Error, &format!("Cannot listen for {label}: {err}"));
                self.notice = Some(Notice {
                    title: NOTICE_HOTKEY_TITLE.to_string(),
                    message: err.to_string(),
                    level: LogLevel::Error,
                });
            }
        }
    }

    pub(crate) fn stop_listening(&mut self) {
        match self.trigger.stop_listening() {
            Ok(true) => self.set_status("Stopped listening"),
            Ok(false) => {}
            Err(err) => self.log(
                LogLevel::Warning,
                &format!("Stopped listening, but releasing the key failed: {err}"),
            ),
        }
    }

    pub(crate) fn finish_capture(&mut self, outcome: CaptureOutcome) {
        match outcome {
            CaptureOutcome::Uploaded { filename } => {
                self.status = format!("Screenshot uploaded: {filename}");
            }
            CaptureOutcome::Failed { kind, message } => {
                self.status = format!("Screenshot failed: {kind}");
                self.log(LogLevel::Error, &message);
            }
        }
    }
}
