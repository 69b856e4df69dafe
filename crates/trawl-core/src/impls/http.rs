//! HttpFetcher - reqwest を使った Fetch 実装
//!
//! reqwest のエラーは timeout / connect / builder / その他に分類する。
//! retry しないのは builder エラー（不正な URI など）だけ。

use async_trait::async_trait;
use reqwest::{Client, Method};

use crate::ports::{Fetch, FetchError, FetchRequest, FetchResponse};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP transport backed by a shared `reqwest::Client`.
///
/// The client pools connections, so one instance serves every worker.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, request.uri.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(map_error)?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_connect() {
        FetchError::Connect(error.to_string())
    } else if error.is_builder() {
        FetchError::InvalidRequest(error.to_string())
    } else {
        FetchError::Transport(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HttpMethod;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::with_client(Client::builder().no_proxy().build().unwrap())
    }

    fn get(uri: impl Into<String>) -> FetchRequest {
        FetchRequest {
            uri: uri.into(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: None,
            timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Serve one canned response and hand back the raw request text.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (format!("http://{addr}/page"), handle)
    }

    #[tokio::test]
    async fn fetch_returns_status_headers_and_body() {
        let (uri, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;

        let mut request = get(uri);
        request.headers.push(("X-Trace".into(), "abc".into()));
        let response = fetcher().fetch(request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"hello");
        assert!(
            response
                .headers
                .iter()
                .any(|(k, v)| k == "content-type" && v == "text/plain")
        );

        let raw = server.await.unwrap().to_ascii_lowercase();
        assert!(raw.starts_with("get /page http/1.1"));
        assert!(raw.contains("x-trace: abc"));
    }

    #[tokio::test]
    async fn non_success_status_is_not_an_error() {
        let (uri, _server) = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let response = fetcher().fetch(get(uri)).await.unwrap();
        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn invalid_uri_is_not_retryable() {
        let error = fetcher().fetch(get("not a uri")).await.unwrap_err();
        assert!(matches!(error, FetchError::InvalidRequest(_)));
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn refused_connection_is_retryable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let error = fetcher().fetch(get(format!("http://{addr}/"))).await.unwrap_err();
        assert!(error.is_retryable());
    }
}
