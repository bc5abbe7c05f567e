use std::sync::Arc;

use crate::app::App;
use crate::app::constants::{
    FILE_TIMESTAMP_FORMAT, NO_DIRECTORY_FOUND_MESSAGE, NOTICE_PROBE_TITLE, PROBE_PAYLOAD,
};
use crate::app::ftp_backend::{FtpBackend, FtpSession};
use crate::app::logging::LogSink;
use crate::ftp::FtpError;
use crate::model::{
    AppEvent, ConnectionConfig, FailureKind, ListenState, LogLevel, Notice, ProbeOutcome,
};

struct ProbeAbort {
    kind: FailureKind,
    error: FtpError,
}

impl ProbeAbort {
    fn new(kind: FailureKind, error: FtpError) -> Self {
        Self { kind, error }
    }
}

/// Walks `candidates` in order over one control connection and returns the
/// first directory that accepts a test upload.
pub(crate) fn run_probe(
    backend: &dyn FtpBackend,
    conn: &ConnectionConfig,
    candidates: &[String],
    log: &LogSink,
) -> ProbeOutcome {
    log.info(format!("Testing FTP connection to {}", conn.label()));
    match probe_candidates(backend, conn, candidates, log) {
        Ok(Some(dir)) => {
            log.success(format!("Upload directory resolved: {dir}"));
            ProbeOutcome {
                success: true,
                working_directory: Some(dir.clone()),
                message: format!("Connection OK, uploads go to {dir}"),
                failure: None,
            }
        }
        Ok(None) => {
            log.error(NO_DIRECTORY_FOUND_MESSAGE);
            ProbeOutcome {
                success: false,
                working_directory: None,
                message: NO_DIRECTORY_FOUND_MESSAGE.to_string(),
                failure: Some(FailureKind::DirectoryAccessDenied),
            }
        }
        Err(abort) => {
            let message = format!("{}: {}", abort.kind, abort.error);
            log.error(format!("Connection test failed: {message}"));
            ProbeOutcome {
                success: false,
                working_directory: None,
                message,
                failure: Some(abort.kind),
            }
        }
    }
}

fn probe_candidates(
    backend: &dyn FtpBackend,
    conn: &ConnectionConfig,
    candidates: &[String],
    log: &LogSink,
) -> Result<Option<String>, ProbeAbort> {
    let mut session = backend
        .open(conn)
        .map_err(|err| ProbeAbort::new(FailureKind::NetworkFailure, err))?;
    log.info(format!("Connected, logging in as {}", conn.user));
    session
        .login(&conn.user, &conn.password)
        .map_err(|err| ProbeAbort::new(FailureKind::AuthenticationFailure, err))?;
    log.success("Login succeeded");

    log.info("Root directory:");
    log_listing(session.as_mut(), log);

    let mut resolved = None;
    for path in candidates {
        log.info(format!("Trying directory {path}"));
        match session.change_dir(path) {
            Ok(()) => {}
            Err(err) if err.is_permission_denied() => {
                log.error(format!("Cannot enter {path}: {err}"));
                continue;
            }
            Err(err) if err.is_unencodable() => {
                log.warning(format!("Skipping {path}: {err}"));
                continue;
            }
            Err(err) => return Err(ProbeAbort::new(FailureKind::NetworkFailure, err)),
        }
        log.success(format!("Entered {path}"));
        log_listing(session.as_mut(), log);

        let test_name = format!(
            "test_{}.txt",
            chrono::Local::now().format(FILE_TIMESTAMP_FORMAT)
        );
        log.info(format!("Uploading test file {test_name}"));
        match session.store(&test_name, PROBE_PAYLOAD) {
            Ok(()) => {}
            Err(err) if err.is_permission_denied() => {
                log.error(format!("Upload refused in {path}: {err}"));
                continue;
            }
            Err(err) => return Err(ProbeAbort::new(FailureKind::NetworkFailure, err)),
        }
        log.success("Test file uploaded");
        match session.delete(&test_name) {
            Ok(()) => log.info("Test file removed"),
            Err(err) => log.warning(format!("Could not remove test file: {err}")),
        }
        resolved = Some(path.clone());
        break;
    }

    if let Err(err) = session.quit() {
        log.warning(format!("QUIT failed: {err}"));
    }
    Ok(resolved)
}

fn log_listing(session: &mut dyn FtpSession, log: &LogSink) {
    match session.list() {
        Ok(names) if names.is_empty() => log.info("  (empty)"),
        Ok(names) => {
            for name in names {
                log.info(format!("  - {name}"));
            }
        }
        Err(err) => log.warning(format!("Cannot list directory: {err}")),
    }
}

impl App {
    pub(crate) fn start_probe(&mut self) {
        if self.probe_running {
            self.log(LogLevel::Warning, "A connection test is already running");
            return;
        }
        if self.trigger.state() == ListenState::Listening {
            self.log(
                LogLevel::Warning,
                "Stop listening (x) before testing the connection",
            );
            return;
        }
        self.probe_running = true;
        let backend = Arc::clone(&self.backend);
        let conn = self.config.connection.clone();
        let candidates = self.candidates.clone();
        let log = self.log_sink();
        std::thread::spawn(move || {
            let outcome = run_probe(backend.as_ref(), &conn, &candidates, &log);
            log.send(AppEvent::ProbeFinished(outcome));
        });
        self.set_status("Testing connection...");
    }

    pub(crate) fn finish_probe(&mut self, outcome: ProbeOutcome) {
        self.probe_running = false;
        let level = match outcome.working_directory {
            Some(dir) if outcome.success => {
                self.working_dir.set(dir);
                LogLevel::Success
            }
            _ => LogLevel::Error,
        };
        self.status = outcome.message.clone();
        self.notice = Some(Notice {
            title: NOTICE_PROBE_TITLE.to_string(),
            message: outcome.message,
            level,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ftp_backend::MockFtpBackend;
    use crate::ftp::DEFAULT_PORT;
    use crate::model::LogEvent;
    use crate::paths::generate_candidates;
    use std::sync::mpsc;

    fn conn() -> ConnectionConfig {
        ConnectionConfig {
            host: "44.112.2.110".to_string(),
            port: DEFAULT_PORT,
            user: "uploader".to_string(),
            password: "pw".to_string(),
        }
    }

    fn probe(backend: &MockFtpBackend, candidates: &[String]) -> (ProbeOutcome, Vec<LogEvent>) {
        let (tx, rx) = mpsc::channel();
        let log = LogSink::new(tx);
        let outcome = run_probe(backend, &conn(), candidates, &log);
        let events = rx
            .try_iter()
            .filter_map(|event| match event {
                AppEvent::Log(log) => Some(log),
                _ => None,
            })
            .collect();
        (outcome, events)
    }

    fn cwd_commands(backend: &MockFtpBackend) -> Vec<String> {
        backend
            .commands()
            .into_iter()
            .filter_map(|command| command.strip_prefix("CWD ").map(str::to_string))
            .collect()
    }

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn falls_back_to_ascii_alias() {
        let backend = MockFtpBackend::default();
        backend.deny_dir("/南安/");
        let candidates = generate_candidates("/南安/", &crate::model::default_aliases());
        let latin1 = "/\u{C4}\u{CF}\u{B0}\u{B2}/";
        let utf8 = "/\u{E5}\u{8D}\u{97}\u{E5}\u{AE}\u{89}/";
        assert_eq!(candidates[1..4].to_vec(), vec![latin1, utf8, "/nanAn/"]);

        let (outcome, events) = probe(&backend, &candidates);

        assert!(outcome.success);
        assert_eq!(outcome.working_directory.as_deref(), Some("/nanAn/"));
        assert_eq!(cwd_commands(&backend), vec!["/南安/", "/nanAn/"]);
        for skipped in [latin1, utf8] {
            let prefix = format!("Skipping {skipped}");
            assert!(
                events
                    .iter()
                    .any(|event| event.level == LogLevel::Warning
                        && event.message.starts_with(&prefix))
            );
        }
        let stored = backend.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, "/nanAn/");
        assert!(stored[0].1.starts_with("test_"));
        assert_eq!(stored[0].2, PROBE_PAYLOAD);
        assert!(
            events
                .iter()
                .any(|event| event.level == LogLevel::Error && event.message.contains("/南安/"))
        );
        assert_eq!(backend.commands().last().map(String::as_str), Some("QUIT"));
    }

    #[test]
    fn reports_failure_when_every_directory_is_denied() {
        let backend = MockFtpBackend::default();
        let candidates = paths(&["/a/", "/b/", "/"]);
        for path in &candidates {
            backend.deny_dir(path);
        }

        let (outcome, _) = probe(&backend, &candidates);

        assert!(!outcome.success);
        assert_eq!(outcome.working_directory, None);
        assert_eq!(outcome.message, NO_DIRECTORY_FOUND_MESSAGE);
        assert_eq!(outcome.failure, Some(FailureKind::DirectoryAccessDenied));
        assert_eq!(cwd_commands(&backend), candidates);
        assert!(backend.stored().is_empty());
    }

    #[test]
    fn login_failure_aborts_before_any_directory() {
        let backend = MockFtpBackend::default();
        backend.deny_login();

        let (outcome, _) = probe(&backend, &paths(&["/a/", "/"]));

        assert!(!outcome.success);
        assert_eq!(outcome.failure, Some(FailureKind::AuthenticationFailure));
        assert!(cwd_commands(&backend).is_empty());
    }

    #[test]
    fn connect_failure_is_a_network_failure() {
        let backend = MockFtpBackend::default();
        backend.set_connect_error("connection refused");

        let (outcome, _) = probe(&backend, &paths(&["/"]));

        assert_eq!(outcome.failure, Some(FailureKind::NetworkFailure));
        assert!(outcome.message.contains("connection refused"));
    }

    #[test]
    fn dropped_connection_stops_the_walk() {
        let backend = MockFtpBackend::default();
        backend.deny_dir("/a/");
        backend.break_on_dir("/b/");

        let (outcome, _) = probe(&backend, &paths(&["/a/", "/b/", "/c/", "/"]));

        assert!(!outcome.success);
        assert_eq!(outcome.failure, Some(FailureKind::NetworkFailure));
        assert_eq!(cwd_commands(&backend), paths(&["/a/", "/b/"]));
    }

    #[test]
    fn refused_upload_moves_to_next_candidate() {
        let backend = MockFtpBackend::default();
        backend.deny_store_in("/a/");

        let (outcome, _) = probe(&backend, &paths(&["/a/", "/b/", "/"]));

        assert_eq!(outcome.working_directory.as_deref(), Some("/b/"));
        assert_eq!(cwd_commands(&backend), paths(&["/a/", "/b/"]));
    }

    #[test]
    fn listing_and_cleanup_failures_are_not_fatal() {
        let backend = MockFtpBackend::default();
        backend.deny_list();
        backend.deny_delete();

        let (outcome, events) = probe(&backend, &paths(&["/a/", "/"]));

        assert!(outcome.success);
        assert_eq!(outcome.working_directory.as_deref(), Some("/a/"));
        let warnings = events
            .iter()
            .filter(|event| event.level == LogLevel::Warning)
            .count();
        assert_eq!(warnings, 3);
    }

    #[test]
    fn start_probe_sets_working_directory() {
        let backend = MockFtpBackend::default();
        backend.deny_dir("/南安/");
        let mut app = App::for_test_with_backend(Arc::new(backend.clone()));

        app.start_probe();
        app.start_probe();
        app.wait_for_probe();

        assert!(!app.probe_running);
        let opens = backend
            .commands()
            .iter()
            .filter(|command| command.starts_with("OPEN "))
            .count();
        assert_eq!(opens, 1);
        assert!(app.working_dir.get().is_some());
        assert_eq!(
            app.notice.as_ref().map(|notice| notice.level),
            Some(LogLevel::Success)
        );
        assert!(
            app.log_lines
                .iter()
                .any(|line| line.text.contains("already running"))
        );
    }

    #[test]
    fn failed_probe_keeps_directory_unset() {
        let backend = MockFtpBackend::default();
        backend.deny_login();
        let mut app = App::for_test_with_backend(Arc::new(backend));

        app.start_probe();
        app.wait_for_probe();

        assert_eq!(app.working_dir.get(), None);
        assert_eq!(
            app.notice.as_ref().map(|notice| notice.level),
            Some(LogLevel::Error)
        );
    }
}
