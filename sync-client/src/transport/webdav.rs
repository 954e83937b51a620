//! WebDAV backend (`http:` / `https:` remotes).
//!
//! Uses plain GET, PUT, DELETE and MKCOL. WebDAV has no permission model, so
//! `chmod` succeeds without doing anything.

use super::{Credentials, Transport, TransportError};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::debug;
use url::Url;

/// A remote collection on a WebDAV server.
#[derive(Debug, Clone)]
pub struct WebDavTransport {
    client: Client,
    base: Url,
    credentials: Option<Credentials>,
}

impl WebDavTransport {
    /// Prepare a client for the collection at `base`.
    ///
    /// No request is made until the first operation.
    pub fn connect(base: Url, credentials: Option<Credentials>) -> Result<Self, TransportError> {
        if base.cannot_be_a_base() {
            return Err(TransportError::Http(format!("not a base URL: {base}")));
        }
        debug!(origin = %base.origin().ascii_serialization(), "connecting to WebDAV remote");
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    /// URL of a remote name, one percent-encoded path segment per name segment.
    pub fn url(&self, name: &str, collection: bool) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(name.split('/').filter(|s| !s.is_empty()));
            if collection {
                segments.push("");
            }
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.credentials {
            Some(c) => request.basic_auth(&c.username, Some(&c.password)),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        request
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))
    }

    async fn send(&self, name: &str, request: RequestBuilder) -> Result<Response, TransportError> {
        let response = self.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(status_error(name, status))
        }
    }
}

fn status_error(name: &str, status: StatusCode) -> TransportError {
    match status {
        StatusCode::NOT_FOUND => TransportError::NotFound(name.to_string()),
        _ => TransportError::Http(format!("{name}: {status}")),
    }
}

#[async_trait]
impl Transport for WebDavTransport {
    async fn get(&self, name: &str) -> Result<Vec<u8>, TransportError> {
        let request = self.request(Method::GET, self.url(name, false));
        let response = self.send(name, request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn put(&self, name: &str, data: Vec<u8>) -> Result<(), TransportError> {
        let request = self.request(Method::PUT, self.url(name, false)).body(data);
        self.send(name, request).await.map(|_| ())
    }

    async fn rm(&self, name: &str) -> Result<(), TransportError> {
        let request = self.request(Method::DELETE, self.url(name, false));
        self.send(name, request).await.map(|_| ())
    }

    async fn mkdir(&self, name: &str) -> Result<(), TransportError> {
        let method =
            Method::from_bytes(b"MKCOL").map_err(|e| TransportError::Http(e.to_string()))?;
        let request = self.request(method, self.url(name, true));
        let status = self.execute(request).await?.status();
        match status {
            s if s.is_success() => Ok(()),
            // MKCOL on an existing collection
            StatusCode::METHOD_NOT_ALLOWED => {
                Err(TransportError::AlreadyExists(name.to_string()))
            }
            s => Err(status_error(name, s)),
        }
    }

    async fn rmdir(&self, name: &str) -> Result<(), TransportError> {
        let request = self.request(Method::DELETE, self.url(name, true));
        self.send(name, request).await.map(|_| ())
    }

    async fn chmod(&self, _name: &str, _mode: u32) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> WebDavTransport {
        WebDavTransport::connect(Url::parse(base).unwrap(), None).unwrap()
    }

    #[test]
    fn url_joins_segments() {
        let t = transport("https://dav.example.com/site/");
        assert_eq!(
            t.url("css/main.css", false).as_str(),
            "https://dav.example.com/site/css/main.css"
        );
    }

    #[test]
    fn url_without_trailing_slash_base() {
        let t = transport("https://dav.example.com/site");
        assert_eq!(
            t.url("a.txt", false).as_str(),
            "https://dav.example.com/site/a.txt"
        );
    }

    #[test]
    fn url_escapes_reserved_characters() {
        let t = transport("https://dav.example.com/");
        assert_eq!(
            t.url("what?#100%.txt", false).as_str(),
            "https://dav.example.com/what%3F%23100%25.txt"
        );
    }

    #[test]
    fn collection_url_has_trailing_slash() {
        let t = transport("https://dav.example.com/site/");
        assert_eq!(
            t.url("a/b", true).as_str(),
            "https://dav.example.com/site/a/b/"
        );
    }

    #[test]
    fn credentials_are_redacted() {
        let creds = Credentials {
            username: "deploy".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("deploy"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn opaque_url_is_rejected() {
        let result = WebDavTransport::connect(Url::parse("mailto:a@b").unwrap(), None);
        assert!(matches!(result, Err(TransportError::Http(_))));
    }
}
