use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::ftp::DEFAULT_PORT;

pub(crate) const DEFAULT_TARGET_DIR: &str = "/南安/";
pub(crate) const DEFAULT_CAPTURE_DELAY_MS: u64 = 500;
pub(crate) const DEFAULT_HOTKEY_KEY: &str = "PrintScreen";

pub(crate) fn default_aliases() -> Vec<String> {
    ["/nanAn/", "/NanAn/", "/NANAN/", "/nan_an/"]
        .iter()
        .map(|alias| alias.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConnectionConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) user: String,
    pub(crate) password: String,
}

impl ConnectionConfig {
    pub(crate) fn label(&self) -> String {
        if self.port == DEFAULT_PORT {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct HotkeyConfig {
    #[serde(default)]
    pub(crate) modifiers: String,
    #[serde(default = "default_hotkey_key")]
    pub(crate) key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            modifiers: String::new(),
            key: default_hotkey_key(),
        }
    }
}

fn default_hotkey_key() -> String {
    DEFAULT_HOTKEY_KEY.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AppConfig {
    pub(crate) connection: ConnectionConfig,
    pub(crate) target_dir: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) hotkey: HotkeyConfig,
    pub(crate) capture_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoreFile {
    pub(crate) master: MasterConfig,
    pub(crate) connection: StoredConnection,
    #[serde(default = "default_target_dir")]
    pub(crate) target_dir: String,
    #[serde(default = "default_aliases")]
    pub(crate) aliases: Vec<String>,
    #[serde(default)]
    pub(crate) hotkey: HotkeyConfig,
    #[serde(default = "default_capture_delay_ms")]
    pub(crate) capture_delay_ms: u64,
}

fn default_target_dir() -> String {
    DEFAULT_TARGET_DIR.to_string()
}

fn default_capture_delay_ms() -> u64 {
    DEFAULT_CAPTURE_DELAY_MS
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MasterConfig {
    pub(crate) salt_b64: String,
    pub(crate) check: EncryptedBlob,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EncryptedBlob {
    pub(crate) nonce: String,
    pub(crate) ciphertext: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredConnection {
    pub(crate) host: String,
    #[serde(default = "default_port")]
    pub(crate) port: u16,
    pub(crate) user: String,
    pub(crate) password: EncryptedBlob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogLevel {
    Info,
    Warning,
    Success,
    Error,
}

impl LogLevel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Success => "OK",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogEvent {
    pub(crate) level: LogLevel,
    pub(crate) message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogLine {
    pub(crate) level: LogLevel,
    pub(crate) text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureKind {
    AuthenticationFailure,
    DirectoryAccessDenied,
    UploadPermissionDenied,
    NetworkFailure,
    NoClipboardImage,
    ClipboardUnavailable,
    UnresolvedWorkingDirectory,
    UploadFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AuthenticationFailure => "authentication failed",
            Self::DirectoryAccessDenied => "directory access denied",
            Self::UploadPermissionDenied => "upload not permitted",
            Self::NetworkFailure => "network failure",
            Self::NoClipboardImage => "no image in clipboard",
            Self::ClipboardUnavailable => "clipboard unavailable",
            Self::UnresolvedWorkingDirectory => "no working directory",
            Self::UploadFailed => "upload failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProbeOutcome {
    pub(crate) success: bool,
    pub(crate) working_directory: Option<String>,
    pub(crate) message: String,
    pub(crate) failure: Option<FailureKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CaptureOutcome {
    Uploaded { filename: String },
    Failed { kind: FailureKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AppEvent {
    Log(LogEvent),
    ProbeFinished(ProbeOutcome),
    CaptureFinished(CaptureOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListenState {
    Idle,
    Listening,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Notice {
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) level: LogLevel,
}

/// Write side of the resolved upload directory. Owned by the UI; only a
/// finished probe sets it.
#[derive(Debug, Default)]
pub(crate) struct WorkingDirectory {
    inner: Arc<RwLock<Option<String>>>,
}

#[derive(Debug, Clone)]
pub(crate) struct WorkingDirectoryReader {
    inner: Arc<RwLock<Option<String>>>,
}

impl WorkingDirectory {
    pub(crate) fn set(&self, path: String) {
        let mut guard = self.inner.write().unwrap_or_else(|err| err.into_inner());
        *guard = Some(path);
    }

    pub(crate) fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub(crate) fn reader(&self) -> WorkingDirectoryReader {
        WorkingDirectoryReader {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl WorkingDirectoryReader {
    pub(crate) fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}
