// ABOUTME: Minimal HTTP/1.1 client used to talk to Marathon and Marathon-LB.
// ABOUTME: One connection per request over hyper's connection handshake, plain or TLS, with a hard timeout.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{ACCEPT, CONTENT_TYPE, HOST};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use serde::de::DeserializeOwned;
use snafu::{ResultExt, Snafu};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

/// Upper bound for a single request, connection included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors talking to the scheduler or the load balancer.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ClientError {
    #[snafu(display("invalid endpoint '{url}': {reason}"))]
    InvalidEndpoint { url: String, reason: String },

    #[snafu(display("failed to resolve {host}: {source}"))]
    Resolve {
        host: String,
        source: std::io::Error,
    },

    #[snafu(display("no IPv4 addresses found for {host}"))]
    NoAddresses { host: String },

    #[snafu(display("failed to connect to {url}: {source}"))]
    Connect {
        url: String,
        source: std::io::Error,
    },

    #[snafu(display("failed to set up TLS for {url}: {source}"))]
    TlsConfig { url: String, source: rustls::Error },

    #[snafu(display("TLS handshake with {url} failed: {source}"))]
    TlsHandshake {
        url: String,
        source: std::io::Error,
    },

    #[snafu(display("HTTP exchange with {url} failed: {source}"))]
    Http { url: String, source: hyper::Error },

    #[snafu(display("failed to build request for {url}: {source}"))]
    BuildRequest {
        url: String,
        source: hyper::http::Error,
    },

    #[snafu(display("request to {url} timed out after {}s", timeout.as_secs()))]
    TimedOut { url: String, timeout: Duration },

    #[snafu(display("{url} returned {status}: {body}"))]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[snafu(display("failed to decode response from {url}: {source}"))]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// The configured URL is unusable.
    InvalidEndpoint,
    /// DNS, TCP, or HTTP-level failure reaching the remote.
    Unreachable,
    /// The remote did not answer in time.
    TimedOut,
    /// The remote answered with a non-success status.
    Status,
    /// The response body did not have the expected shape.
    Decode,
}

impl ClientError {
    pub fn kind(&self) -> ClientErrorKind {
        match self {
            ClientError::InvalidEndpoint { .. } => ClientErrorKind::InvalidEndpoint,
            ClientError::Resolve { .. }
            | ClientError::NoAddresses { .. }
            | ClientError::Connect { .. }
            | ClientError::TlsConfig { .. }
            | ClientError::TlsHandshake { .. }
            | ClientError::Http { .. }
            | ClientError::BuildRequest { .. } => ClientErrorKind::Unreachable,
            ClientError::TimedOut { .. } => ClientErrorKind::TimedOut,
            ClientError::Status { .. } => ClientErrorKind::Status,
            ClientError::Decode { .. } => ClientErrorKind::Decode,
        }
    }

    /// HTTP status code, if the remote answered with a non-success status.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// How an endpoint is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// A base URL requests are made against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
    base_path: String,
    /// Name the TLS certificate is checked against; survives `with_host`.
    server_name: String,
}

impl Endpoint {
    /// Parse an `http(s)://host[:port][/base]` URL.
    pub fn parse(url: &str) -> Result<Self, ClientError> {
        let uri: Uri = url.trim().parse().map_err(|e: hyper::http::uri::InvalidUri| {
            ClientError::InvalidEndpoint {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let scheme = match uri.scheme_str() {
            Some("http") => Scheme::Http,
            Some("https") => Scheme::Https,
            Some(other) => {
                return InvalidEndpointSnafu {
                    url,
                    reason: format!("unsupported scheme '{other}'"),
                }
                .fail();
            }
            None => {
                return InvalidEndpointSnafu {
                    url,
                    reason: "missing scheme",
                }
                .fail();
            }
        };

        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ClientError::InvalidEndpoint {
                url: url.to_string(),
                reason: "missing host".to_string(),
            })?;

        Ok(Self {
            scheme,
            host: host.to_string(),
            port: uri.port_u16().unwrap_or(scheme.default_port()),
            base_path: uri.path().trim_end_matches('/').to_string(),
            server_name: host.to_string(),
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The same endpoint addressed through a different host (e.g. one resolved IP).
    pub fn with_host(&self, host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..self.clone()
        }
    }

    /// Full URL for a path, used in logs and error messages.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}://{}:{}{}{}",
            self.scheme.as_str(),
            self.host,
            self.port,
            self.base_path,
            path
        )
    }

    pub async fn get(&self, path: &str) -> Result<HttpResponse, ClientError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn delete(&self, path: &str) -> Result<HttpResponse, ClientError> {
        self.request(Method::DELETE, path, None).await
    }

    pub async fn put_json<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<HttpResponse, ClientError> {
        let url = self.url(path);
        let bytes = serde_json::to_vec(body).context(DecodeSnafu { url })?;
        self.request(Method::PUT, path, Some(Bytes::from(bytes))).await
    }

    /// Send one request. `path` includes any query string.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<HttpResponse, ClientError> {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);

        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{}{}", self.base_path, path))
            .header(HOST, format!("{}:{}", self.host, self.port))
            .header(ACCEPT, "application/json");
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let req = builder
            .body(Full::new(body.unwrap_or_default()))
            .context(BuildRequestSnafu { url: &url })?;

        let exchange = async {
            let stream = TcpStream::connect((self.host.as_str(), self.port))
                .await
                .context(ConnectSnafu { url: &url })?;

            let response = match self.scheme {
                Scheme::Http => send(TokioIo::new(stream), req, &url).await?,
                Scheme::Https => {
                    let server_name = ServerName::try_from(self.server_name.clone()).map_err(
                        |e| ClientError::InvalidEndpoint {
                            url: url.clone(),
                            reason: e.to_string(),
                        },
                    )?;
                    let stream = tls_connector(&url)?
                        .connect(server_name, stream)
                        .await
                        .context(TlsHandshakeSnafu { url: &url })?;
                    send(TokioIo::new(stream), req, &url).await?
                }
            };
            Ok::<_, ClientError>(response)
        };

        match tokio::time::timeout(REQUEST_TIMEOUT, exchange).await {
            Ok(result) => result,
            Err(_elapsed) => TimedOutSnafu {
                url: &url,
                timeout: REQUEST_TIMEOUT,
            }
            .fail(),
        }
    }
}

/// Run one request over an established connection.
async fn send<I>(io: I, req: Request<Full<Bytes>>, url: &str) -> Result<HttpResponse, ClientError>
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .context(HttpSnafu { url })?;

    // Drive the connection until the exchange completes
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("connection error: {}", e);
        }
    });

    let resp = sender
        .send_request(req)
        .await
        .context(HttpSnafu { url })?;
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .context(HttpSnafu { url })?
        .to_bytes();

    Ok(HttpResponse {
        url: url.to_string(),
        status,
        body,
    })
}

/// Client TLS over the Mozilla root store.
fn tls_connector(url: &str) -> Result<TlsConnector, ClientError> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config =
        rustls::ClientConfig::builder_with_provider(rustls::crypto::ring::default_provider().into())
            .with_safe_default_protocol_versions()
            .context(TlsConfigSnafu { url })?
            .with_root_certificates(roots)
            .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// A fully read response.
#[derive(Debug)]
pub struct HttpResponse {
    url: String,
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turn a non-success status into `ClientError::Status`.
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.is_success() {
            return Ok(self);
        }
        StatusSnafu {
            status: self.status.as_u16(),
            body: self.text(),
            url: self.url,
        }
        .fail()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).context(DecodeSnafu { url: &self.url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_endpoint_with_port_and_path() {
        let ep = Endpoint::parse("http://marathon.example.com:8080/api/").unwrap();
        assert_eq!(ep.host(), "marathon.example.com");
        assert_eq!(ep.port(), 8080);
        assert_eq!(
            ep.url("/v2/apps"),
            "http://marathon.example.com:8080/api/v2/apps"
        );
    }

    #[test]
    fn parse_endpoint_defaults_to_port_80() {
        let ep = Endpoint::parse("http://lb.internal").unwrap();
        assert_eq!(ep.port(), 80);
        assert_eq!(ep.url("/_haproxy_getpids"), "http://lb.internal:80/_haproxy_getpids");
    }

    #[test]
    fn parse_https_endpoint_defaults_to_port_443() {
        let ep = Endpoint::parse("https://marathon.example.com/marathon").unwrap();
        assert_eq!(ep.scheme(), Scheme::Https);
        assert_eq!(ep.port(), 443);
        assert_eq!(
            ep.url("/v2/info"),
            "https://marathon.example.com:443/marathon/v2/info"
        );
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let err = Endpoint::parse("ftp://marathon.example.com").unwrap_err();
        assert_eq!(err.kind(), ClientErrorKind::InvalidEndpoint);
    }

    #[test]
    fn resolved_https_replica_keeps_certificate_name() {
        let ep = Endpoint::parse("https://lb.example.com:9443").unwrap();
        let replica = ep.with_host("10.0.0.7");
        assert_eq!(replica.scheme(), Scheme::Https);
        assert_eq!(replica.url("/x"), "https://10.0.0.7:9443/x");
        assert_eq!(replica.server_name, "lb.example.com");
    }

    #[test]
    fn tls_connector_builds_from_bundled_roots() {
        assert!(tls_connector("https://marathon.example.com").is_ok());
    }

    #[test]
    fn missing_scheme_is_rejected() {
        assert!(Endpoint::parse("marathon.example.com:8080").is_err());
    }

    #[test]
    fn with_host_keeps_port_and_path() {
        let ep = Endpoint::parse("http://lb.internal:9090/base").unwrap();
        let replica = ep.with_host("10.0.0.7");
        assert_eq!(replica.url("/x"), "http://10.0.0.7:9090/base/x");
    }
}
