//! FTP backend (`ftp:` remotes).
//!
//! One control connection is opened by [`FtpTransport::connect`] and used for
//! the whole run. Names are joined onto the absolute directory taken from the
//! URL path. Permission bits are set with `SITE CHMOD`.

use super::{Credentials, Transport, TransportError};
use async_trait::async_trait;
use suppaftp::tokio::AsyncFtpStream;
use suppaftp::types::FileType;
use suppaftp::{FtpError, Status};
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tracing::debug;

/// A remote directory on an FTP server.
pub struct FtpTransport {
    stream: Mutex<Option<AsyncFtpStream>>,
    root: String,
}

impl std::fmt::Debug for FtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpTransport")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FtpTransport {
    /// Connect to `host:port`, log in and switch to binary transfers.
    ///
    /// `root` is the absolute remote directory. Without credentials the
    /// session logs in anonymously.
    pub async fn connect(
        host: &str,
        port: u16,
        root: &str,
        credentials: Option<Credentials>,
    ) -> Result<Self, TransportError> {
        let mut stream = AsyncFtpStream::connect((host, port))
            .await
            .map_err(|e| ftp_error(host, e, TransportError::NotFound))?;

        let (username, password) = match credentials {
            Some(c) => (c.username, c.password),
            None => ("anonymous".to_string(), "anonymous@".to_string()),
        };
        debug!(host, port, user = %username, "logging in to FTP remote");
        stream
            .login(username.as_str(), password.as_str())
            .await
            .map_err(|e| ftp_error(host, e, TransportError::NotFound))?;
        stream
            .transfer_type(FileType::Binary)
            .await
            .map_err(|e| ftp_error(host, e, TransportError::NotFound))?;

        Ok(Self {
            stream: Mutex::new(Some(stream)),
            root: directory(root),
        })
    }

    /// Absolute server path of a remote name.
    pub fn path(&self, name: &str) -> String {
        format!("{}{}", self.root, name.trim_start_matches('/'))
    }
}

fn directory(root: &str) -> String {
    match root.trim_matches('/') {
        "" => "/".to_string(),
        root => format!("/{root}/"),
    }
}

/// Map a client error; a 550 reply becomes `unavailable`.
fn ftp_error(
    name: &str,
    err: FtpError,
    unavailable: fn(String) -> TransportError,
) -> TransportError {
    match err {
        FtpError::ConnectionError(source) => TransportError::from_io(name, source),
        FtpError::UnexpectedResponse(response) if response.status == Status::FileUnavailable => {
            unavailable(name.to_string())
        }
        other => TransportError::Ftp(format!("{name}: {other}")),
    }
}

fn closed(name: &str) -> TransportError {
    TransportError::Ftp(format!("{name}: connection closed"))
}

#[async_trait]
impl Transport for FtpTransport {
    async fn get(&self, name: &str) -> Result<Vec<u8>, TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or_else(|| closed(name))?;
        let path = self.path(name);

        let mut data = stream
            .retr_as_stream(&path)
            .await
            .map_err(|e| ftp_error(name, e, TransportError::NotFound))?;
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)
            .await
            .map_err(|e| TransportError::from_io(name, e))?;
        stream
            .finalize_retr_stream(data)
            .await
            .map_err(|e| ftp_error(name, e, TransportError::NotFound))?;
        Ok(bytes)
    }

    async fn put(&self, name: &str, data: Vec<u8>) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or_else(|| closed(name))?;
        stream
            .put_file(self.path(name), &mut data.as_slice())
            .await
            .map(|_| ())
            .map_err(|e| ftp_error(name, e, TransportError::NotFound))
    }

    async fn rm(&self, name: &str) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or_else(|| closed(name))?;
        stream
            .rm(self.path(name))
            .await
            .map_err(|e| ftp_error(name, e, TransportError::NotFound))
    }

    async fn mkdir(&self, name: &str) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or_else(|| closed(name))?;
        stream
            .mkdir(self.path(name))
            .await
            .map_err(|e| ftp_error(name, e, TransportError::AlreadyExists))
    }

    async fn rmdir(&self, name: &str) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or_else(|| closed(name))?;
        stream
            .rmdir(self.path(name))
            .await
            .map_err(|e| ftp_error(name, e, TransportError::NotFound))
    }

    async fn chmod(&self, name: &str, mode: u32) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or_else(|| closed(name))?;
        stream
            .site(format!("CHMOD {:o} {}", mode, self.path(name)))
            .await
            .map(|_| ())
            .map_err(|e| ftp_error(name, e, TransportError::NotFound))
    }

    async fn close(&self) {
        if let Some(mut stream) = self.stream.lock().await.take() {
            if let Err(e) = stream.quit().await {
                debug!(error = %e, "FTP quit failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::net::SocketAddr;
    use suppaftp::types::Response;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// A single-session FTP server that answers every command with a canned
    /// reply and records what it received.
    ///
    /// `fail` maps a command verb to a reply that replaces the usual one.
    /// `RETR` serves `file`; `STOR` uploads are logged as `DATA <text>`.
    async fn server(
        fail: &'static [(&'static str, &'static str)],
        file: &'static [u8],
    ) -> (SocketAddr, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            let mut log = Vec::new();
            let mut data: Option<TcpListener> = None;

            write.write_all(b"220 ready\r\n").await.unwrap();
            while let Some(line) = lines.next_line().await.unwrap() {
                let verb = line.split(' ').next().unwrap_or_default().to_string();
                log.push(line);
                if let Some((_, reply)) = fail.iter().find(|(v, _)| *v == verb) {
                    write.write_all(reply.as_bytes()).await.unwrap();
                    continue;
                }
                match verb.as_str() {
                    "USER" => write.write_all(b"331 password please\r\n").await.unwrap(),
                    "PASS" => write.write_all(b"230 logged in\r\n").await.unwrap(),
                    "TYPE" | "SITE" => write.write_all(b"200 ok\r\n").await.unwrap(),
                    "MKD" => write.write_all(b"257 created\r\n").await.unwrap(),
                    "RMD" | "DELE" => write.write_all(b"250 done\r\n").await.unwrap(),
                    "PASV" => {
                        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                        let port = listener.local_addr().unwrap().port();
                        let reply = format!(
                            "227 Entering Passive Mode (127,0,0,1,{},{})\r\n",
                            port / 256,
                            port % 256
                        );
                        data = Some(listener);
                        write.write_all(reply.as_bytes()).await.unwrap();
                    }
                    "RETR" | "STOR" => {
                        write.write_all(b"150 opening\r\n").await.unwrap();
                        let (mut conn, _) = data.take().unwrap().accept().await.unwrap();
                        if verb == "RETR" {
                            conn.write_all(file).await.unwrap();
                        } else {
                            let mut received = Vec::new();
                            conn.read_to_end(&mut received).await.unwrap();
                            log.push(format!("DATA {}", String::from_utf8_lossy(&received)));
                        }
                        drop(conn);
                        write.write_all(b"226 complete\r\n").await.unwrap();
                    }
                    "QUIT" => {
                        write.write_all(b"221 bye\r\n").await.unwrap();
                        break;
                    }
                    _ => write.write_all(b"502 not implemented\r\n").await.unwrap(),
                }
            }
            log
        });

        (addr, handle)
    }

    fn creds() -> Option<Credentials> {
        Some(Credentials {
            username: "deploy".into(),
            password: "secret".into(),
        })
    }

    fn response(code: u32) -> FtpError {
        FtpError::UnexpectedResponse(Response::new(Status::from(code), b"nope".to_vec()))
    }

    // ===========================================
    // Path and Error Tests
    // ===========================================

    #[test]
    fn root_is_an_absolute_directory() {
        assert_eq!(directory("/site/"), "/site/");
        assert_eq!(directory("/site"), "/site/");
        assert_eq!(directory("site"), "/site/");
        assert_eq!(directory("/"), "/");
        assert_eq!(directory(""), "/");
    }

    #[test]
    fn unavailable_reply_is_classified_per_operation() {
        let err = ftp_error("a.txt", response(550), TransportError::NotFound);
        assert!(matches!(err, TransportError::NotFound(name) if name == "a.txt"));

        let err = ftp_error("css", response(550), TransportError::AlreadyExists);
        assert!(matches!(err, TransportError::AlreadyExists(_)));

        let err = ftp_error("a.txt", response(530), TransportError::NotFound);
        assert!(matches!(err, TransportError::Ftp(ref msg) if msg.starts_with("a.txt: ")));

        let io = FtpError::ConnectionError(io::Error::from(io::ErrorKind::ConnectionReset));
        let err = ftp_error("a.txt", io, TransportError::NotFound);
        assert!(matches!(err, TransportError::Io { .. }));
    }

    // ===========================================
    // Session Tests
    // ===========================================

    #[tokio::test]
    async fn session_sends_commands_under_root() {
        let (addr, log) = server(&[], b"").await;
        let ftp = FtpTransport::connect("127.0.0.1", addr.port(), "/site/", creds())
            .await
            .unwrap();

        ftp.mkdir("css").await.unwrap();
        ftp.chmod("css/main.css", 0o644).await.unwrap();
        ftp.rm("old.html").await.unwrap();
        ftp.rmdir("img").await.unwrap();
        ftp.close().await;

        assert_eq!(
            log.await.unwrap(),
            vec![
                "USER deploy",
                "PASS secret",
                "TYPE I",
                "MKD /site/css",
                "SITE CHMOD 644 /site/css/main.css",
                "DELE /site/old.html",
                "RMD /site/img",
                "QUIT",
            ]
        );
    }

    #[tokio::test]
    async fn transfers_use_passive_data_connections() {
        let (addr, log) = server(&[], b"remote index").await;
        let ftp = FtpTransport::connect("127.0.0.1", addr.port(), "/", None)
            .await
            .unwrap();

        let bytes = ftp.get(".htdistsync").await.unwrap();
        ftp.put("index.html", b"<p>hi</p>".to_vec()).await.unwrap();
        ftp.close().await;

        assert_eq!(bytes, b"remote index");
        let log = log.await.unwrap();
        assert_eq!(&log[..2], ["USER anonymous", "PASS anonymous@"]);
        assert!(log.contains(&"RETR /.htdistsync".to_string()));
        assert!(log.contains(&"STOR /index.html".to_string()));
        assert!(log.contains(&"DATA <p>hi</p>".to_string()));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let (addr, _log) = server(&[("DELE", "550 no such file\r\n")], b"").await;
        let ftp = FtpTransport::connect("127.0.0.1", addr.port(), "/", creds())
            .await
            .unwrap();

        let err = ftp.rm("gone.txt").await.unwrap_err();
        assert!(matches!(err, TransportError::NotFound(name) if name == "gone.txt"));
        ftp.close().await;
    }

    #[tokio::test]
    async fn refused_chmod_is_an_error() {
        let (addr, _log) = server(&[("SITE", "500 unknown command\r\n")], b"").await;
        let ftp = FtpTransport::connect("127.0.0.1", addr.port(), "/", creds())
            .await
            .unwrap();

        let err = ftp.chmod("a", 0o600).await.unwrap_err();
        assert!(matches!(err, TransportError::Ftp(_)));
        ftp.close().await;
    }

    #[tokio::test]
    async fn rejected_login_fails_connect() {
        let (addr, _log) = server(&[("PASS", "530 login incorrect\r\n")], b"").await;
        let result = FtpTransport::connect("127.0.0.1", addr.port(), "/", creds()).await;
        assert!(matches!(result, Err(TransportError::Ftp(_))));
    }

    #[tokio::test]
    async fn operations_after_close_fail() {
        let (addr, _log) = server(&[], b"").await;
        let ftp = FtpTransport::connect("127.0.0.1", addr.port(), "/", creds())
            .await
            .unwrap();
        ftp.close().await;
        ftp.close().await;

        assert!(matches!(ftp.mkdir("a").await, Err(TransportError::Ftp(_))));
    }
}
