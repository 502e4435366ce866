//! HTTP watch-history transport.
//!
//! Posts history entries as JSON with a bearer token. Requests are spawned
//! onto a tokio runtime and never awaited by the caller, so a player that is
//! shutting down does not wait on the network.

use http_body_util::{BodyExt, Full};
use hyper::{body::Bytes, header, Method, Request};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::runtime::Handle;
use url::Url;

use crate::error::HistoryError;
use crate::progress::{HistoryRequest, HistoryTransport};

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Builds the POST request for a history write against `base`.
pub fn build_request(
    base: &Url,
    request: &HistoryRequest,
) -> Result<Request<Full<Bytes>>, HistoryError> {
    let url = base
        .join(&request.endpoint)
        .map_err(|e| HistoryError::Endpoint(format!("{}: {e}", request.endpoint)))?;

    Request::builder()
        .method(Method::POST)
        .uri(url.as_str())
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", request.bearer_token),
        )
        .body(Full::new(Bytes::from(request.body.clone())))
        .map_err(|e| HistoryError::Endpoint(e.to_string()))
}

/// History transport over hyper.
#[derive(Clone)]
pub struct HttpHistoryTransport {
    base: Url,
    client: HttpsClient,
    runtime: Handle,
}

impl HttpHistoryTransport {
    /// Creates a transport resolving endpoints against `base_url` and
    /// spawning requests onto `runtime`.
    pub fn new(base_url: &str, runtime: Handle) -> Result<Self, HistoryError> {
        let base =
            Url::parse(base_url).map_err(|e| HistoryError::Endpoint(format!("{base_url}: {e}")))?;

        let https = HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|err| {
                tracing::error!("Failed to load native root certificates: {err}");
                HistoryError::Transport(format!("TLS configuration: {err}"))
            })?
            .https_or_http()
            .enable_http1()
            .build();

        let client: HttpsClient = Client::builder(TokioExecutor::new()).build(https);
        Ok(Self {
            base,
            client,
            runtime,
        })
    }
}

impl HistoryTransport for HttpHistoryTransport {
    fn send(&self, request: HistoryRequest) -> Result<(), HistoryError> {
        let req = build_request(&self.base, &request)?;
        let client = self.client.clone();
        let keepalive = request.keepalive;

        // The runtime outlives the player, which is all keep-alive needs natively.
        self.runtime.spawn(async move {
            match client.request(req).await {
                Ok(res) => {
                    let status = res.status();
                    // Drain so the connection can be reused.
                    if let Err(e) = res.into_body().collect().await {
                        tracing::debug!("History response body error: {e}");
                    }
                    if status.is_success() {
                        tracing::debug!("History saved (keepalive: {keepalive})");
                    } else {
                        tracing::warn!("{}", HistoryError::Status(status.as_u16()));
                    }
                }
                Err(e) => tracing::warn!("{}", HistoryError::Transport(e.to_string())),
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use hyper::body::Incoming;
    use hyper::service::service_fn;
    use hyper::{Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    #[derive(Debug)]
    struct Received {
        method: Method,
        path: String,
        authorization: String,
        content_type: String,
        body: String,
    }

    /// Serves every request with `status` on a loopback port and reports
    /// what arrived. Returns the base URL.
    async fn serve(status: StatusCode) -> (String, mpsc::UnboundedReceiver<Received>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let tx = tx.clone();
                        async move {
                            let (parts, body) = req.into_parts();
                            let body = body.collect().await?.to_bytes();
                            let read_header = |name: header::HeaderName| {
                                parts
                                    .headers
                                    .get(name)
                                    .and_then(|v| v.to_str().ok())
                                    .unwrap_or_default()
                                    .to_string()
                            };
                            let _ = tx.send(Received {
                                method: parts.method.clone(),
                                path: parts.uri.path().to_string(),
                                authorization: read_header(header::AUTHORIZATION),
                                content_type: read_header(header::CONTENT_TYPE),
                                body: String::from_utf8_lossy(&body).into_owned(),
                            });
                            let mut response = Response::new(Full::new(Bytes::new()));
                            *response.status_mut() = status;
                            Ok::<_, hyper::Error>(response)
                        }
                    });
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
        (format!("http://{addr}/"), rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Received>) -> Received {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("history write did not arrive")
            .expect("server stopped")
    }

    fn request() -> HistoryRequest {
        HistoryRequest {
            endpoint: "/api/user/watch-history".into(),
            bearer_token: "abc".into(),
            body: r#"{"movieSlug":"movie-a"}"#.into(),
            keepalive: true,
        }
    }

    #[test]
    fn test_build_request_sets_auth_and_json() {
        let base = Url::parse("https://reel.example/watch/movie-a").unwrap();
        let req = build_request(&base, &request()).unwrap();
        assert_eq!(req.method(), Method::POST);
        assert_eq!(
            req.uri().to_string(),
            "https://reel.example/api/user/watch-history"
        );
        assert_eq!(req.headers()[header::AUTHORIZATION], "Bearer abc");
        assert_eq!(req.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_absolute_endpoint_overrides_base() {
        let base = Url::parse("https://reel.example/").unwrap();
        let mut r = request();
        r.endpoint = "https://api.example/history".into();
        let req = build_request(&base, &r).unwrap();
        assert_eq!(req.uri().to_string(), "https://api.example/history");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_send_posts_entry_with_bearer_token() {
        let (base, mut rx) = serve(StatusCode::OK).await;
        let transport = HttpHistoryTransport::new(&base, Handle::current()).unwrap();

        transport.send(request()).unwrap();

        let received = next(&mut rx).await;
        assert_eq!(received.method, Method::POST);
        assert_eq!(received.path, "/api/user/watch-history");
        assert_eq!(received.authorization, "Bearer abc");
        assert_eq!(received.content_type, "application/json");
        assert_eq!(received.body, r#"{"movieSlug":"movie-a"}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_rejected_write_is_swallowed() {
        let (base, mut rx) = serve(StatusCode::UNAUTHORIZED).await;
        let transport = HttpHistoryTransport::new(&base, Handle::current()).unwrap();

        assert!(transport.send(request()).is_ok());
        next(&mut rx).await;

        // The transport keeps working after an error status
        let mut second = request();
        second.body = r#"{"movieSlug":"movie-b"}"#.into();
        assert!(transport.send(second).is_ok());
        assert_eq!(next(&mut rx).await.body, r#"{"movieSlug":"movie-b"}"#);
    }

    #[tokio::test]
    async fn test_unreachable_server_does_not_fail_send() {
        // Bind then drop to get a port nothing listens on
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let transport =
            HttpHistoryTransport::new(&format!("http://{addr}/"), Handle::current()).unwrap();
        assert!(transport.send(request()).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_rejected() {
        let result = HttpHistoryTransport::new("not a url", Handle::current());
        assert!(matches!(result, Err(HistoryError::Endpoint(_))));
    }
}
