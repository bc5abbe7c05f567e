use crate::ftp::{FtpError, FtpStream};
use crate::model::ConnectionConfig;

#[cfg(test)]
use encoding_rs::GBK;
#[cfg(test)]
use std::collections::HashSet;
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// Opens control connections. Shared between the UI, the probe thread and
/// the hotkey thread.
pub(crate) trait FtpBackend: Send + Sync {
    fn open(&self, conn: &ConnectionConfig) -> Result<Box<dyn FtpSession>, FtpError>;
}

pub(crate) trait FtpSession {
    fn login(&mut self, user: &str, password: &str) -> Result<(), FtpError>;
    fn list(&mut self) -> Result<Vec<String>, FtpError>;
    fn change_dir(&mut self, path: &str) -> Result<(), FtpError>;
    fn store(&mut self, name: &str, data: &[u8]) -> Result<(), FtpError>;
    fn delete(&mut self, name: &str) -> Result<(), FtpError>;
    fn quit(&mut self) -> Result<(), FtpError>;
}

#[derive(Debug, Default)]
pub(crate) struct RealFtpBackend;

impl FtpBackend for RealFtpBackend {
    fn open(&self, conn: &ConnectionConfig) -> Result<Box<dyn FtpSession>, FtpError> {
        let stream = FtpStream::connect(&conn.host, conn.port)?;
        Ok(Box::new(stream))
    }
}

impl FtpSession for FtpStream {
    fn login(&mut self, user: &str, password: &str) -> Result<(), FtpError> {
        FtpStream::login(self, user, password)
    }

    fn list(&mut self) -> Result<Vec<String>, FtpError> {
        self.nlst()
    }

    fn change_dir(&mut self, path: &str) -> Result<(), FtpError> {
        self.cwd(path)
    }

    fn store(&mut self, name: &str, data: &[u8]) -> Result<(), FtpError> {
        self.put(name, data)
    }

    fn delete(&mut self, name: &str) -> Result<(), FtpError> {
        FtpStream::delete(self, name)
    }

    fn quit(&mut self) -> Result<(), FtpError> {
        FtpStream::quit(self)
    }
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    commands: Mutex<Vec<String>>,
    stored: Mutex<Vec<(String, String, Vec<u8>)>>,
    connect_error: Mutex<Option<String>>,
    login_denied: Mutex<bool>,
    list_denied: Mutex<bool>,
    delete_denied: Mutex<bool>,
    denied_dirs: Mutex<HashSet<String>>,
    readonly_dirs: Mutex<HashSet<String>>,
    broken_dirs: Mutex<HashSet<String>>,
}

#[cfg(test)]
#[derive(Default, Clone)]
pub(crate) struct MockFtpBackend {
    state: Arc<MockState>,
}

#[cfg(test)]
impl MockFtpBackend {
    pub(crate) fn set_connect_error(&self, message: &str) {
        *self.state.connect_error.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn deny_login(&self) {
        *self.state.login_denied.lock().unwrap() = true;
    }

    pub(crate) fn deny_list(&self) {
        *self.state.list_denied.lock().unwrap() = true;
    }

    pub(crate) fn deny_delete(&self) {
        *self.state.delete_denied.lock().unwrap() = true;
    }

    pub(crate) fn deny_dir(&self, path: &str) {
        self.state.denied_dirs.lock().unwrap().insert(path.to_string());
    }

    pub(crate) fn deny_store_in(&self, path: &str) {
        self.state.readonly_dirs.lock().unwrap().insert(path.to_string());
    }

    pub(crate) fn break_on_dir(&self, path: &str) {
        self.state.broken_dirs.lock().unwrap().insert(path.to_string());
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.state.commands.lock().unwrap().clone()
    }

    pub(crate) fn stored(&self) -> Vec<(String, String, Vec<u8>)> {
        self.state.stored.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl FtpBackend for MockFtpBackend {
    fn open(&self, conn: &ConnectionConfig) -> Result<Box<dyn FtpSession>, FtpError> {
        self.state
            .commands
            .lock()
            .unwrap()
            .push(format!("OPEN {}", conn.label()));
        if let Some(message) = self.state.connect_error.lock().unwrap().clone() {
            return Err(FtpError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                message,
            )));
        }
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
            cwd: "/".to_string(),
        }))
    }
}

#[cfg(test)]
struct MockSession {
    state: Arc<MockState>,
    cwd: String,
}

#[cfg(test)]
impl MockSession {
    fn record(&self, command: String) {
        self.state.commands.lock().unwrap().push(command);
    }
}

#[cfg(test)]
fn reply(code: u16, message: &str) -> FtpError {
    FtpError::Reply {
        code,
        message: message.to_string(),
    }
}

#[cfg(test)]
impl FtpSession for MockSession {
    fn login(&mut self, user: &str, _password: &str) -> Result<(), FtpError> {
        self.record(format!("LOGIN {user}"));
        if *self.state.login_denied.lock().unwrap() {
            return Err(reply(530, "Login incorrect."));
        }
        Ok(())
    }

    fn list(&mut self) -> Result<Vec<String>, FtpError> {
        self.record("NLST".to_string());
        if *self.state.list_denied.lock().unwrap() {
            return Err(reply(550, "No files found"));
        }
        Ok(vec!["南安".to_string(), "readme.txt".to_string()])
    }

    fn change_dir(&mut self, path: &str) -> Result<(), FtpError> {
        let (_, _, unencodable) = GBK.encode(path);
        if unencodable {
            return Err(FtpError::Unencodable {
                verb: "CWD".to_string(),
            });
        }
        self.record(format!("CWD {path}"));
        if self.state.broken_dirs.lock().unwrap().contains(path) {
            return Err(FtpError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        if self.state.denied_dirs.lock().unwrap().contains(path) {
            return Err(reply(550, "Failed to change directory."));
        }
        self.cwd = path.to_string();
        Ok(())
    }

    fn store(&mut self, name: &str, data: &[u8]) -> Result<(), FtpError> {
        self.record(format!("STOR {name}"));
        if self.state.readonly_dirs.lock().unwrap().contains(&self.cwd) {
            return Err(reply(553, "Could not create file."));
        }
        self.state
            .stored
            .lock()
            .unwrap()
            .push((self.cwd.clone(), name.to_string(), data.to_vec()));
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<(), FtpError> {
        self.record(format!("DELE {name}"));
        if *self.state.delete_denied.lock().unwrap() {
            return Err(reply(550, "Permission denied."));
        }
        Ok(())
    }

    fn quit(&mut self) -> Result<(), FtpError> {
        self.record("QUIT".to_string());
        Ok(())
    }
}
