use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{header, Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::error::{HttpError, HttpResult};
use crate::transport::{HttpResponse, HttpTransport};

const APPLICATION_JSON: &str = "application/json";
const MAX_REDIRECTS: usize = 5;

/// [`HttpTransport`] over a pooled `hyper` HTTP/1.1 client.
///
/// The client is cheap to share: connections are pooled and every call is
/// independent. Each call is bounded by `timeout`, covering connect, request
/// and reading the body. Up to five redirects are followed, keeping the
/// method and body.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl HyperTransport {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(&self, method: Method, url: &str, body: Bytes) -> HttpResult<HttpResponse> {
        let mut uri = parse_uri(url)?;
        let mut redirects = 0;
        let follow = async {
            loop {
                let (status, location, reply) = self.exchange(&method, &uri, body.clone()).await?;
                let target = match location {
                    Some(location) if (300..400).contains(&status) => location,
                    _ => return Ok::<_, HttpError>(HttpResponse::new(status, reply)),
                };
                if redirects == MAX_REDIRECTS {
                    return Err(HttpError::TooManyRedirects {
                        url: url.to_string(),
                        limit: MAX_REDIRECTS,
                    });
                }
                redirects += 1;
                let next = resolve_location(&uri, &target)?;
                debug!(%method, from = %uri, to = %next, status, "following redirect");
                uri = next;
            }
        };

        let response = tokio::time::timeout(self.timeout, follow)
            .await
            .map_err(|_| HttpError::Timeout {
                url: url.to_string(),
                after_ms: self.timeout.as_millis() as u64,
            })??;
        debug!(%method, url, status = response.status, "http exchange complete");
        Ok(response)
    }

    /// One request/response round trip: status, `Location` header, body.
    async fn exchange(
        &self,
        method: &Method,
        uri: &Uri,
        body: Bytes,
    ) -> HttpResult<(u16, Option<String>, Vec<u8>)> {
        let request = Request::builder()
            .method(method.clone())
            .uri(uri.clone())
            .header(header::ACCEPT, APPLICATION_JSON)
            .header(header::CONTENT_TYPE, APPLICATION_JSON)
            .body(Full::new(body))
            .map_err(|e| HttpError::Request(e.to_string()))?;
        let response = self.client.request(request).await.map_err(|e| {
            if e.is_connect() {
                HttpError::Connect(e.to_string())
            } else {
                HttpError::Request(e.to_string())
            }
        })?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| HttpError::Body(e.to_string()))?
            .to_bytes();
        Ok((status, location, body.to_vec()))
    }
}

fn parse_uri(url: &str) -> HttpResult<Uri> {
    url.parse().map_err(|e: hyper::http::uri::InvalidUri| HttpError::InvalidUri {
        uri: url.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve a `Location` value against the URI that produced it. Absolute
/// URLs and absolute paths are supported.
fn resolve_location(base: &Uri, location: &str) -> HttpResult<Uri> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return parse_uri(location);
    }
    if !location.starts_with('/') {
        return Err(HttpError::InvalidUri {
            uri: location.to_string(),
            reason: "unsupported relative redirect".into(),
        });
    }
    let scheme = base.scheme_str().unwrap_or("http");
    let authority = base.authority().map(|a| a.as_str()).unwrap_or_default();
    parse_uri(&format!("{scheme}://{authority}{location}"))
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn get(&self, url: &str) -> HttpResult<HttpResponse> {
        self.send(Method::GET, url, Bytes::new()).await
    }

    async fn put(&self, url: &str, body: &[u8]) -> HttpResult<HttpResponse> {
        self.send(Method::PUT, url, Bytes::copy_from_slice(body)).await
    }

    async fn post(&self, url: &str, body: &[u8]) -> HttpResult<HttpResponse> {
        self.send(Method::POST, url, Bytes::copy_from_slice(body)).await
    }

    async fn delete(&self, url: &str) -> HttpResult<HttpResponse> {
        self.send(Method::DELETE, url, Bytes::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn request_complete(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        let Some(head_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..head_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        buf.len() >= head_end + 4 + content_length
    }

    /// Serve exactly one canned response and hand back the raw request head.
    async fn one_shot_server(
        response: impl Into<String>,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let response = response.into();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if n == 0 || request_complete(&buf) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn get_returns_status_and_body() {
        let (base, server) = one_shot_server(
            "HTTP/1.1 404 Not Found\r\ncontent-type: application/json\r\ncontent-length: 15\r\nconnection: close\r\n\r\n{\"found\":false}",
        )
        .await;
        let transport = HyperTransport::new(Duration::from_secs(5));
        let resp = transport.get(&format!("{base}/git2_odb/_doc/abc")).await.unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body_text(), r#"{"found":false}"#);

        let head = server.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /git2_odb/_doc/abc http/1.1"));
        assert!(head.contains("accept: application/json"));
        assert!(head.contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn put_sends_body() {
        let (base, server) = one_shot_server(
            "HTTP/1.1 201 Created\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
        )
        .await;
        let transport = HyperTransport::new(Duration::from_secs(5));
        let resp = transport.put(&format!("{base}/idx"), br#"{"a":1}"#).await.unwrap();
        assert!(resp.is_success());

        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /idx"));
        assert!(request.ends_with(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn redirect_is_followed_with_method_and_body() {
        let (target, target_server) = one_shot_server(
            "HTTP/1.1 200 OK\r\ncontent-length: 11\r\nconnection: close\r\n\r\n{\"ok\":true}",
        )
        .await;
        let (base, redirect_server) = one_shot_server(format!(
            "HTTP/1.1 307 Temporary Redirect\r\nlocation: {target}/moved\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
        ))
        .await;
        let transport = HyperTransport::new(Duration::from_secs(5));
        let resp = transport.put(&format!("{base}/idx"), br#"{"a":1}"#).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body_text(), r#"{"ok":true}"#);

        assert!(redirect_server.await.unwrap().starts_with("PUT /idx"));
        let moved = target_server.await.unwrap();
        assert!(moved.starts_with("PUT /moved"));
        assert!(moved.ends_with(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn redirect_loop_is_bounded() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request_complete(&buf) {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                let reply = "HTTP/1.1 302 Found\r\nlocation: /again\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });
        let transport = HyperTransport::new(Duration::from_secs(5));
        let err = transport.get(&format!("http://{addr}/idx")).await.unwrap_err();
        assert!(matches!(err, HttpError::TooManyRedirects { limit: 5, .. }));
    }

    #[tokio::test]
    async fn unresponsive_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });
        let transport = HyperTransport::new(Duration::from_millis(100));
        let err = transport.get(&format!("http://{addr}/idx")).await.unwrap_err();
        assert!(matches!(err, HttpError::Timeout { after_ms: 100, .. }));
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let transport = HyperTransport::new(Duration::from_secs(5));
        let err = transport.get(&format!("http://{addr}/idx")).await.unwrap_err();
        assert!(matches!(err, HttpError::Connect(_)));
    }

    #[tokio::test]
    async fn invalid_uri_rejected() {
        let transport = HyperTransport::new(Duration::from_secs(1));
        let err = transport.get("http://bad host/").await.unwrap_err();
        assert!(matches!(err, HttpError::InvalidUri { .. }));
    }
}
