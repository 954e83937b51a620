//! Remote resolution and connection.

use percent_encoding::percent_decode_str;
use std::path::Path;
use tracing::debug;
use url::{Host, Url};

use crate::error::ClientError;
use crate::transport::{Credentials, FsTransport, FtpTransport, Transport, WebDavTransport};

const FTP_PORT: u16 = 21;

/// Parse a remote given as a URL or as a filesystem path.
///
/// Strings without a scheme are paths, resolved against `base` when relative.
/// The resulting URL always denotes a directory.
pub fn parse_remote(remote: &str, base: &Path) -> Result<Url, ClientError> {
    let url = match Url::parse(remote) {
        // Single-letter schemes are Windows drive letters
        Ok(url) if url.scheme().len() > 1 => url,
        _ => {
            let path = base.join(remote);
            Url::from_directory_path(&path).map_err(|()| {
                ClientError::Config(format!("invalid remote path: {}", path.display()))
            })?
        }
    };
    Ok(as_directory(url))
}

fn as_directory(mut url: Url) -> Url {
    if !url.cannot_be_a_base() && !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Open a connection to `remote`.
///
/// `password` takes precedence over a password embedded in the URL.
pub async fn connect(
    remote: &Url,
    password: Option<&str>,
) -> Result<Box<dyn Transport>, ClientError> {
    match remote.scheme() {
        "file" => {
            let root = remote
                .to_file_path()
                .map_err(|()| ClientError::Config(format!("invalid file URL: {remote}")))?;
            debug!(destination = %root.display(), "connecting");
            let transport = FsTransport::connect(root)
                .await
                .map_err(ClientError::Connect)?;
            Ok(Box::new(transport))
        }
        "http" | "https" => {
            let credentials = credentials(remote, password);
            let mut base = remote.clone();
            base.set_username("")
                .and_then(|()| base.set_password(None))
                .map_err(|()| ClientError::Config(format!("invalid remote URL: {remote}")))?;
            debug!(origin = %base.origin().ascii_serialization(), "connecting");
            let transport =
                WebDavTransport::connect(base, credentials).map_err(ClientError::Connect)?;
            Ok(Box::new(transport))
        }
        "ftp" => {
            let host = match remote.host() {
                Some(Host::Domain(domain)) => domain.to_string(),
                Some(Host::Ipv4(addr)) => addr.to_string(),
                Some(Host::Ipv6(addr)) => addr.to_string(),
                None => return Err(ClientError::Config(format!("missing FTP host: {remote}"))),
            };
            let port = remote.port().unwrap_or(FTP_PORT);
            let root = percent_decode_str(remote.path())
                .decode_utf8()
                .map_err(|_| ClientError::Config(format!("invalid FTP path: {remote}")))?;
            let credentials = credentials(remote, password).or_else(|| user_only(remote));
            debug!(host = %host, port, root = %root, "connecting");
            let transport = FtpTransport::connect(&host, port, &root, credentials)
                .await
                .map_err(ClientError::Connect)?;
            Ok(Box::new(transport))
        }
        other => Err(ClientError::UnsupportedTransport(format!("{other}:"))),
    }
}

fn credentials(remote: &Url, password: Option<&str>) -> Option<Credentials> {
    let username = remote.username();
    if username.is_empty() {
        return None;
    }
    let password = password.or(remote.password())?;
    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// FTP servers may accept a user with an empty password.
fn user_only(remote: &Url) -> Option<Credentials> {
    let username = remote.username();
    (!username.is_empty()).then(|| Credentials {
        username: username.to_string(),
        password: String::new(),
    })
}
