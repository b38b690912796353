use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use reqwest::{Client, Response};
use std::time::Duration;

use super::ReadChunk;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Body of a single HTTP GET, consumed front to back.
pub struct HttpStream {
    response: Response,
    content_length: u64,
    /// Bytes received from the transport but not yet handed out.
    pending: Vec<u8>,
    pending_pos: usize,
    finished: bool,
}

impl HttpStream {
    /// Build the client used for the download.
    ///
    /// No overall timeout is set: a large archive may legitimately take a long
    /// time. Only connection establishment can be bounded.
    pub fn client(connect_timeout: Option<Duration>) -> Result<Client> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(builder.build()?)
    }

    /// Send the GET and validate the response head.
    ///
    /// Fails with a network error on connection failure or a non-success
    /// status, and with a parsing error when `Content-Length` is missing or
    /// malformed. The body is not read here.
    pub async fn open(client: &Client, url: &str) -> Result<Self> {
        let resp = client.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Network(format!(
                "GET {} failed with status: {}",
                url,
                resp.status()
            )));
        }

        let content_length = parse_content_length(resp.headers())?;
        tracing::debug!(url, content_length, "response head received");

        Ok(Self {
            response: resp,
            content_length,
            pending: Vec::new(),
            pending_pos: 0,
            finished: false,
        })
    }

    /// Size declared by the server.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }
}

/// Read the `Content-Length` header as a byte count.
pub(crate) fn parse_content_length(headers: &HeaderMap) -> Result<u64> {
    let value = headers
        .get(CONTENT_LENGTH)
        .ok_or_else(|| Error::Parsing("response has no Content-Length header".to_string()))?;

    let text = value
        .to_str()
        .map_err(|_| Error::Parsing("Content-Length header is not ASCII".to_string()))?;

    text.trim()
        .parse()
        .map_err(|_| Error::Parsing(format!("invalid Content-Length: {:?}", text)))
}

#[async_trait]
impl ReadChunk for HttpStream {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pending_pos == self.pending.len() {
            if self.finished {
                return Ok(0);
            }

            match self.response.chunk().await {
                Ok(Some(bytes)) => {
                    self.pending.clear();
                    self.pending.extend_from_slice(&bytes);
                    self.pending_pos = 0;
                }
                Ok(None) => self.finished = true,
                // The connection went away mid-body; whatever arrived so far is
                // what the download gets.
                Err(e) if e.is_body() || e.is_decode() => {
                    tracing::warn!("response body ended early: {}", e);
                    self.finished = true;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let available = &self.pending[self.pending_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pending_pos += n;

        Ok(n)
    }
}
