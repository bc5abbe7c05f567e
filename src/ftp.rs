use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use encoding_rs::{Encoding, GBK};
use thiserror::Error;

pub(crate) const DEFAULT_PORT: u16 = 21;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub(crate) enum FtpError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{code} {message}")]
    Reply { code: u16, message: String },
    #[error("argument of {verb} cannot be encoded for the server")]
    Unencodable { verb: String },
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl FtpError {
    /// Permanent negative completion (5xx), e.g. access denied or no such directory.
    pub(crate) fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Reply { code, .. } if (500..600).contains(code))
    }

    pub(crate) fn is_unencodable(&self) -> bool {
        matches!(self, Self::Unencodable { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub(crate) code: u16,
    pub(crate) text: String,
}

impl Reply {
    fn into_error(self) -> FtpError {
        FtpError::Reply {
            code: self.code,
            message: self.text,
        }
    }
}

/// Control connection to an FTP server. Every command and reply goes
/// through one fixed text encoding for the whole session.
pub(crate) struct FtpStream {
    reader: BufReader<TcpStream>,
    encoding: &'static Encoding,
}

impl FtpStream {
    pub(crate) fn connect(host: &str, port: u16) -> Result<Self, FtpError> {
        Self::connect_with_encoding(host, port, GBK)
    }

    pub(crate) fn connect_with_encoding(
        host: &str,
        port: u16,
        encoding: &'static Encoding,
    ) -> Result<Self, FtpError> {
        let stream = connect_tcp(host, port)?;
        let mut ftp = Self {
            reader: BufReader::new(stream),
            encoding,
        };
        let mut greeting = ftp.read_reply()?;
        while greeting.code == 120 {
            greeting = ftp.read_reply()?;
        }
        if greeting.code != 220 {
            return Err(greeting.into_error());
        }
        Ok(ftp)
    }

    pub(crate) fn login(&mut self, user: &str, password: &str) -> Result<(), FtpError> {
        self.send("USER", Some(user))?;
        let reply = self.read_reply()?;
        match reply.code {
            230 => return Ok(()),
            331 => {}
            _ => return Err(reply.into_error()),
        }
        self.send("PASS", Some(password))?;
        self.expect(&[230, 202])?;
        Ok(())
    }

    pub(crate) fn cwd(&mut self, path: &str) -> Result<(), FtpError> {
        self.send("CWD", Some(path))?;
        self.expect(&[250, 200])?;
        Ok(())
    }

    pub(crate) fn nlst(&mut self) -> Result<Vec<String>, FtpError> {
        self.send("TYPE", Some("A"))?;
        self.expect(&[200])?;
        let mut data = self.open_passive()?;
        self.send("NLST", None)?;
        self.expect(&[125, 150])?;
        let mut raw = Vec::new();
        data.read_to_end(&mut raw)?;
        drop(data);
        self.expect(&[226, 250])?;
        let (text, _) = self.encoding.decode_without_bom_handling(&raw);
        Ok(text
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    pub(crate) fn put(&mut self, name: &str, data: &[u8]) -> Result<(), FtpError> {
        self.send("TYPE", Some("I"))?;
        self.expect(&[200])?;
        let mut stream = self.open_passive()?;
        self.send("STOR", Some(name))?;
        self.expect(&[125, 150])?;
        stream.write_all(data)?;
        stream.flush()?;
        stream.shutdown(Shutdown::Write).ok();
        drop(stream);
        self.expect(&[226, 250])?;
        Ok(())
    }

    pub(crate) fn delete(&mut self, name: &str) -> Result<(), FtpError> {
        self.send("DELE", Some(name))?;
        self.expect(&[250])?;
        Ok(())
    }

    pub(crate) fn quit(&mut self) -> Result<(), FtpError> {
        self.send("QUIT", None)?;
        self.expect(&[221])?;
        Ok(())
    }

    fn open_passive(&mut self) -> Result<TcpStream, FtpError> {
        self.send("PASV", None)?;
        let reply = self.expect(&[227])?;
        let port = parse_pasv_port(&reply.text)
            .ok_or_else(|| FtpError::Protocol(format!("bad PASV reply: {}", reply.text)))?;
        // The advertised host is ignored; servers behind NAT often report a private address.
        let host = self.reader.get_ref().peer_addr()?.ip();
        let stream = TcpStream::connect_timeout(&SocketAddr::new(host, port), CONNECT_TIMEOUT)?;
        stream.set_read_timeout(Some(CONNECT_TIMEOUT)).ok();
        stream.set_write_timeout(Some(CONNECT_TIMEOUT)).ok();
        Ok(stream)
    }

    fn send(&mut self, verb: &str, arg: Option<&str>) -> Result<(), FtpError> {
        let line = match arg {
            Some(arg) => format!("{verb} {arg}\r\n"),
            None => format!("{verb}\r\n"),
        };
        let (bytes, _, had_errors) = self.encoding.encode(&line);
        if had_errors {
            return Err(FtpError::Unencodable {
                verb: verb.to_string(),
            });
        }
        let stream = self.reader.get_mut();
        stream.write_all(&bytes)?;
        stream.flush()?;
        Ok(())
    }

    fn expect(&mut self, codes: &[u16]) -> Result<Reply, FtpError> {
        let reply = self.read_reply()?;
        if codes.contains(&reply.code) {
            Ok(reply)
        } else {
            Err(reply.into_error())
        }
    }

    fn read_reply(&mut self) -> Result<Reply, FtpError> {
        let first = self.read_line()?;
        let code = parse_code(&first)?;
        let mut text = first.get(4..).unwrap_or_default().to_string();
        if first.as_bytes().get(3) == Some(&b'-') {
            let terminator = format!("{code:03} ");
            loop {
                let line = self.read_line()?;
                text.push('\n');
                match line.strip_prefix(&terminator) {
                    Some(rest) => {
                        text.push_str(rest);
                        break;
                    }
                    None => text.push_str(&line),
                }
            }
        }
        Ok(Reply { code, text })
    }

    fn read_line(&mut self) -> Result<String, FtpError> {
        let mut buffer = Vec::new();
        if self.reader.read_until(b'\n', &mut buffer)? == 0 {
            return Err(FtpError::Protocol("connection closed by server".to_string()));
        }
        while matches!(buffer.last(), Some(b'\n' | b'\r')) {
            buffer.pop();
        }
        let (text, _) = self.encoding.decode_without_bom_handling(&buffer);
        Ok(text.into_owned())
    }
}

fn connect_tcp(host: &str, port: u16) -> Result<TcpStream, FtpError> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                stream.set_read_timeout(Some(CONNECT_TIMEOUT)).ok();
                stream.set_write_timeout(Some(CONNECT_TIMEOUT)).ok();
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(FtpError::Io(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("no address for {host}"))
    })))
}

fn parse_code(line: &str) -> Result<u16, FtpError> {
    line.get(..3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| FtpError::Protocol(format!("malformed reply: {line}")))
}

fn parse_pasv_port(text: &str) -> Option<u16> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let numbers: Vec<u16> = text[start..]
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .take(6)
        .map(|part| part.parse().ok())
        .collect::<Option<Vec<_>>>()?;
    if numbers.len() != 6 || numbers.iter().any(|&n| n > 255) {
        return None;
    }
    Some(numbers[4] * 256 + numbers[5])
}
