use std::sync::Arc;

use crate::app::ftp_backend::FtpBackend;
use crate::app::logging::LogSink;
use crate::ftp::FtpError;
use crate::model::{ConnectionConfig, FailureKind, WorkingDirectoryReader};

#[derive(Clone)]
pub(crate) struct Uploader {
    backend: Arc<dyn FtpBackend>,
    conn: ConnectionConfig,
    working_dir: WorkingDirectoryReader,
    log: LogSink,
}

impl Uploader {
    pub(crate) fn new(
        backend: Arc<dyn FtpBackend>,
        conn: ConnectionConfig,
        working_dir: WorkingDirectoryReader,
        log: LogSink,
    ) -> Self {
        Self {
            backend,
            conn,
            working_dir,
            log,
        }
    }

    pub(crate) fn upload(&self, payload: &[u8], filename: &str) -> bool {
        self.try_upload(payload, filename).is_ok()
    }

    pub(crate) fn try_upload(&self, payload: &[u8], filename: &str) -> Result<(), FailureKind> {
        let Some(dir) = self.working_dir.get() else {
            self.log
                .error("No working directory yet, run the connection test first");
            return Err(FailureKind::UnresolvedWorkingDirectory);
        };
        match self.store(&dir, payload, filename) {
            Ok(()) => {
                self.log.success(format!("Uploaded {filename} to {dir}"));
                Ok(())
            }
            Err((kind, err)) => {
                self.log.error(format!("Upload of {filename} failed: {err}"));
                Err(kind)
            }
        }
    }

    fn store(
        &self,
        dir: &str,
        payload: &[u8],
        filename: &str,
    ) -> Result<(), (FailureKind, FtpError)> {
        self.log.info(format!(
            "Uploading {filename} ({} bytes) to {}",
            payload.len(),
            self.conn.label()
        ));
        let mut session = self
            .backend
            .open(&self.conn)
            .map_err(|err| (FailureKind::NetworkFailure, err))?;
        session
            .login(&self.conn.user, &self.conn.password)
            .map_err(|err| (FailureKind::AuthenticationFailure, err))?;
        session.change_dir(dir).map_err(|err| {
            if err.is_permission_denied() {
                (FailureKind::DirectoryAccessDenied, err)
            } else {
                (FailureKind::NetworkFailure, err)
            }
        })?;
        session.store(filename, payload).map_err(|err| {
            if err.is_permission_denied() {
                (FailureKind::UploadPermissionDenied, err)
            } else {
                (FailureKind::NetworkFailure, err)
            }
        })?;
        if let Err(err) = session.quit() {
            self.log.warning(format!("QUIT failed: {err}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ftp_backend::MockFtpBackend;
    use crate::ftp::DEFAULT_PORT;
    use crate::model::{AppEvent, LogLevel, WorkingDirectory};
    use std::sync::mpsc;

    fn uploader(
        backend: &MockFtpBackend,
        dir: &WorkingDirectory,
    ) -> (Uploader, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        let conn = ConnectionConfig {
            host: "ftp.local".to_string(),
            port: DEFAULT_PORT,
            user: "uploader".to_string(),
            password: "pw".to_string(),
        };
        let uploader = Uploader::new(
            Arc::new(backend.clone()),
            conn,
            dir.reader(),
            LogSink::new(tx),
        );
        (uploader, rx)
    }

    #[test]
    fn unset_directory_does_no_network_io() {
        let backend = MockFtpBackend::default();
        let dir = WorkingDirectory::default();
        let (uploader, rx) = uploader(&backend, &dir);

        assert!(!uploader.upload(b"png", "shot.png"));
        assert!(backend.commands().is_empty());
        let errors = rx
            .try_iter()
            .filter(|event| matches!(event, AppEvent::Log(log) if log.level == LogLevel::Error))
            .count();
        assert_eq!(errors, 1);
    }

    #[test]
    fn stores_into_resolved_directory() {
        let backend = MockFtpBackend::default();
        let dir = WorkingDirectory::default();
        dir.set("/nanAn/".to_string());
        let (uploader, _rx) = uploader(&backend, &dir);

        assert!(uploader.upload(b"png-bytes", "screenshot_1.png"));
        assert_eq!(
            backend.commands(),
            vec![
                "OPEN ftp.local",
                "LOGIN uploader",
                "CWD /nanAn/",
                "STOR screenshot_1.png",
                "QUIT",
            ]
        );
        assert_eq!(
            backend.stored(),
            vec![(
                "/nanAn/".to_string(),
                "screenshot_1.png".to_string(),
                b"png-bytes".to_vec()
            )]
        );
    }

    #[test]
    fn classifies_failures() {
        let backend = MockFtpBackend::default();
        let dir = WorkingDirectory::default();
        dir.set("/ro/".to_string());
        let (uploader, _rx) = uploader(&backend, &dir);

        backend.deny_store_in("/ro/");
        assert_eq!(
            uploader.try_upload(b"x", "a.png"),
            Err(FailureKind::UploadPermissionDenied)
        );

        backend.deny_dir("/ro/");
        assert_eq!(
            uploader.try_upload(b"x", "a.png"),
            Err(FailureKind::DirectoryAccessDenied)
        );

        backend.deny_login();
        assert_eq!(
            uploader.try_upload(b"x", "a.png"),
            Err(FailureKind::AuthenticationFailure)
        );
        assert!(!uploader.upload(b"x", "a.png"));
    }
}
