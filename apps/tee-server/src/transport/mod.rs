// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Enclave-to-host HTTP transport
//!
//! The enclave has no network stack of its own: every outbound request
//! leaves through a virtio-socket stream to the host (CID 3), where a dumb
//! L4 forwarder pipes bytes to the real destination. TLS terminates
//! *inside* the enclave, so the host only ever sees ciphertext.
//!
//! Two transports are provided:
//!
//! - [`VsockHttpClient`]: plain HTTP/1.1 over vsock (instance metadata).
//! - [`VsockTlsHttpClient`]: HTTP/1.1 inside a rustls client session,
//!   with SNI and certificate verification against a fixed server name.
//!
//! Both open exactly one vsock connection per request and close it before
//! returning; response bodies are fully buffered. A 30-second deadline is
//! applied when the caller does not supply one, and the TLS handshake is
//! raced against that deadline; if the deadline wins, the handshake
//! future is dropped, which closes the socket.

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderValue, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{timeout_at, Instant};
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tokio_vsock::{VsockAddr, VsockStream};
use tracing::debug;

/// Context ID of the parent instance.
pub const HOST_CID: u32 = 3;

/// Deadline attached to requests whose caller supplies none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("unable to connect to vsock port {port}: {source}")]
    Connect { port: u32, source: std::io::Error },
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(std::io::Error),
    #[error("TLS handshake timeout")]
    TlsHandshakeTimeout,
    #[error("HTTP handshake failed: {0}")]
    Handshake(hyper::Error),
    #[error("request failed: {0}")]
    Request(hyper::Error),
    #[error("request deadline exceeded")]
    Timeout,
    #[error("request URL is missing a host")]
    MissingHost,
    #[error("invalid server name: {0}")]
    InvalidServerName(String),
}

/// A fully buffered HTTP response. The vsock connection that produced it
/// is already closed by the time this value exists.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as a lossy UTF-8 string.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Plain HTTP/1.1 client over a vsock stream. Used for the host's
/// instance-metadata proxy.
#[derive(Debug, Clone)]
pub struct VsockHttpClient {
    port: u32,
}

impl VsockHttpClient {
    pub fn new(port: u32) -> Self {
        Self { port }
    }

    pub async fn request(
        &self,
        req: Request<Full<Bytes>>,
    ) -> Result<HttpResponse, TransportError> {
        self.request_with_timeout(req, DEFAULT_TIMEOUT).await
    }

    pub async fn request_with_timeout(
        &self,
        req: Request<Full<Bytes>>,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let deadline = Instant::now() + timeout;
        let req = origin_form(req)?;

        debug!(port = self.port, uri = %req.uri(), "dialing vsock for HTTP request");
        let stream = dial(self.port, deadline).await?;
        exchange(stream, req, deadline).await
    }
}

/// HTTP/1.1 client that drives a TLS session over a vsock stream. The
/// server name is fixed at construction and used for SNI and certificate
/// verification; each client therefore talks to exactly one upstream host.
#[derive(Clone)]
pub struct VsockTlsHttpClient {
    port: u32,
    server_name: ServerName<'static>,
    connector: TlsConnector,
}

impl VsockTlsHttpClient {
    pub fn new(port: u32, server_name: &str) -> Result<Self, TransportError> {
        let server_name = ServerName::try_from(server_name.to_owned())
            .map_err(|_| TransportError::InvalidServerName(server_name.to_owned()))?;

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            port,
            server_name,
            connector: TlsConnector::from(Arc::new(config)),
        })
    }

    pub async fn request(
        &self,
        req: Request<Full<Bytes>>,
    ) -> Result<HttpResponse, TransportError> {
        self.request_with_timeout(req, DEFAULT_TIMEOUT).await
    }

    pub async fn request_with_timeout(
        &self,
        req: Request<Full<Bytes>>,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let deadline = Instant::now() + timeout;
        let req = origin_form(req)?;

        debug!(port = self.port, uri = %req.uri(), "dialing vsock for HTTPS request");
        let stream = dial(self.port, deadline).await?;

        // The handshake races the deadline; dropping the loser closes the
        // underlying stream.
        let tls = match timeout_at(deadline, self.connector.connect(self.server_name.clone(), stream))
            .await
        {
            Err(_) => return Err(TransportError::TlsHandshakeTimeout),
            Ok(Err(err)) => return Err(TransportError::TlsHandshake(err)),
            Ok(Ok(tls)) => tls,
        };

        exchange(tls, req, deadline).await
    }
}

async fn dial(port: u32, deadline: Instant) -> Result<VsockStream, TransportError> {
    let addr = VsockAddr::new(HOST_CID, port);
    match timeout_at(deadline, VsockStream::connect(addr)).await {
        Err(_) => Err(TransportError::Timeout),
        Ok(Err(source)) => Err(TransportError::Connect { port, source }),
        Ok(Ok(stream)) => Ok(stream),
    }
}

/// Rewrite the request into origin form (`/path?query`), moving the
/// authority into the `Host` header. hyper's HTTP/1.1 client writes the
/// URI verbatim, and the upstream servers expect origin-form targets.
fn origin_form(mut req: Request<Full<Bytes>>) -> Result<Request<Full<Bytes>>, TransportError> {
    let uri = req.uri().clone();
    let host = uri.host().ok_or(TransportError::MissingHost)?.to_owned();

    if !req.headers().contains_key(http::header::HOST) {
        let value = match uri.port_u16() {
            Some(port) if port != 80 && port != 443 => format!("{host}:{port}"),
            _ => host,
        };
        req.headers_mut().insert(
            http::header::HOST,
            HeaderValue::from_str(&value).map_err(|_| TransportError::MissingHost)?,
        );
    }

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_owned();
    *req.uri_mut() = path_and_query
        .parse::<Uri>()
        .map_err(|_| TransportError::MissingHost)?;
    Ok(req)
}

/// Run one HTTP/1.1 exchange over the given stream, fully buffering the
/// response body. The connection driver is aborted afterwards, which
/// closes the stream on every path.
async fn exchange<T>(
    io: T,
    req: Request<Full<Bytes>>,
    deadline: Instant,
) -> Result<HttpResponse, TransportError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = match timeout_at(deadline, http1::handshake(TokioIo::new(io))).await {
        Err(_) => return Err(TransportError::Timeout),
        Ok(Err(err)) => return Err(TransportError::Handshake(err)),
        Ok(Ok(pair)) => pair,
    };

    let driver = tokio::spawn(async move {
        if let Err(err) = conn.await {
            debug!(error = %err, "vsock connection driver finished with error");
        }
    });

    let result = async {
        let response = match timeout_at(deadline, sender.send_request(req)).await {
            Err(_) => return Err(TransportError::Timeout),
            Ok(Err(err)) => return Err(TransportError::Request(err)),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        let body = match timeout_at(deadline, response.into_body().collect()).await {
            Err(_) => return Err(TransportError::Timeout),
            Ok(Err(err)) => return Err(TransportError::Request(err)),
            Ok(Ok(collected)) => collected.to_bytes(),
        };

        debug!(status = %status, bytes = body.len(), "received HTTP response over vsock");
        Ok(HttpResponse { status, body })
    }
    .await;

    drop(sender);
    driver.abort();
    result
}
