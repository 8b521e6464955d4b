//! HTTP store: blobs live at `<base>/<name>` and are written with `PUT`.

use std::io::Read;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use url::Url;

use super::{validate_blob_name, RemoteTransport, TransportError};
use crate::config::RemoteConfig;

const DEFAULT_USER_AGENT: &str = concat!("parcel/", env!("CARGO_PKG_VERSION"));
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// HTTP transport with basic authentication and retries
pub struct HttpTransport {
    client: Client,
    base: Url,
    username: Option<String>,
    password: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpTransport {
    /// Create a transport for `base` with default settings
    pub fn new(base: Url) -> Result<Self, reqwest::Error> {
        Self::with_config(base, &RemoteConfig::default())
    }

    /// Create a transport for `base` using the timeouts, retries and
    /// credentials from `config`
    pub fn with_config(mut base: Url, config: &RemoteConfig) -> Result<Self, reqwest::Error> {
        // a base without trailing slash would lose its last segment on join
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base,
            username: config.username.clone(),
            password: config.password.clone(),
            max_retries: config.max_retries,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// URL of the blob `name`; the name is percent-encoded as one path segment
    pub fn blob_url(&self, name: &str) -> Result<Url, TransportError> {
        validate_blob_name(name)?;

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::Other {
                name: name.to_string(),
                reason: format!("{} cannot be a base URL", self.base),
            })?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.username {
            Some(ref username) => request.basic_auth(username, self.password.as_deref()),
            None => request,
        }
    }

    /// Send a request, retrying server errors, rate limiting and
    /// connection failures with exponential backoff
    fn send_with_retries<F>(&self, name: &str, build: F) -> Result<Response, TransportError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match self.authorize(build()).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let error = self.status_error(name, status);
                    if !(status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS) {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
                Err(e) => {
                    let error = self.request_error(name, &e);
                    if !matches!(error, TransportError::ConnectionFailed { .. }) {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
            }

            if attempt < self.max_retries {
                let delay = self.retry_delay * 2_u32.pow(attempt);
                log::debug!("Retrying {} in {:?} (attempt {})", name, delay, attempt + 1);
                thread::sleep(delay);
            }
        }

        Err(last_error.unwrap_or_else(|| TransportError::Other {
            name: name.to_string(),
            reason: "max retries exceeded".to_string(),
        }))
    }

    fn status_error(&self, name: &str, status: StatusCode) -> TransportError {
        match status {
            StatusCode::NOT_FOUND => TransportError::NotFound {
                name: name.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportError::Other {
                name: name.to_string(),
                reason: format!("HTTP {}: authentication rejected by {}", status.as_u16(), self.base),
            },
            _ => TransportError::Other {
                name: name.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            },
        }
    }

    fn request_error(&self, name: &str, error: &reqwest::Error) -> TransportError {
        if error.is_connect() || error.is_timeout() {
            TransportError::ConnectionFailed {
                endpoint: self.base.to_string(),
                reason: error.to_string(),
            }
        } else {
            TransportError::Other {
                name: name.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

impl RemoteTransport for HttpTransport {
    fn put(&self, name: &str, content: &mut dyn Read) -> Result<(), TransportError> {
        let url = self.blob_url(name)?;

        // buffered so the body can be resent on retry
        let mut body = Vec::new();
        content.read_to_end(&mut body).map_err(|e| TransportError::Other {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        log::debug!("HTTP PUT {} ({} bytes)", url, body.len());
        let response = self.send_with_retries(name, || self.client.put(url.clone()).body(body.clone()))?;
        log::debug!("HTTP {} {}", response.status().as_u16(), url);
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Box<dyn Read + '_>, TransportError> {
        let url = self.blob_url(name)?;

        log::debug!("HTTP GET {}", url);
        let response = self.send_with_retries(name, || self.client.get(url.clone()))?;
        log::debug!(
            "HTTP {} {} ({} bytes)",
            response.status().as_u16(),
            url,
            response.content_length().unwrap_or(0)
        );
        Ok(Box::new(response))
    }

    fn endpoint(&self) -> String {
        self.base.to_string()
    }
}
