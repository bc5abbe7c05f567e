use std::time::Duration;

pub(crate) const STATUS_READY: &str = "Ready";

pub(crate) const LOG_TIMESTAMP_FORMAT: &str = "%m-%d %H:%M:%S";
pub(crate) const LOG_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const LOG_SEPARATOR: &str = " | ";

pub(crate) const LOG_RETENTION_DAYS: i64 = 7;
pub(crate) const LOG_MAX_ENTRIES: usize = 10_000;
pub(crate) const LOG_MAX_IN_MEMORY: usize = 100;

pub(crate) const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub(crate) const PROBE_PAYLOAD: &[u8] = b"FTP connection test";

pub(crate) const HOTKEY_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) const NOTICE_PROBE_TITLE: &str = "Connection test";
pub(crate) const NOTICE_NO_DIRECTORY_TITLE: &str = "No working directory";
pub(crate) const NOTICE_NO_DIRECTORY_MESSAGE: &str =
    "Run the connection test (t) first to find a directory that accepts uploads.";
pub(crate) const NOTICE_HOTKEY_TITLE: &str = "Hotkey unavailable";

pub(crate) const NO_DIRECTORY_FOUND_MESSAGE: &str =
    "No directory accepts uploads; check the account permissions";
