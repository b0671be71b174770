//! Minimal JSON-over-HTTP(S) client shared by the HTTP adapters.

use std::io::BufReader;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use hyper::client::HttpConnector;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Body, Client, Method, Request, StatusCode};
use hyper_rustls::HttpsConnector;
use serde::Serialize;
use tracing::debug;

/// Raw HTTP reply.
#[derive(Debug)]
pub struct JsonReply {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Transport-level failure: the request never produced an HTTP reply.
#[derive(Debug)]
pub struct TransportFailure(pub String);

#[derive(Clone)]
pub struct JsonClient {
    client: Client<HttpsConnector<HttpConnector>>,
    base_url: String,
    timeout: Duration,
}

impl JsonClient {
    /// Client for `http://` or `https://` endpoints, trusting the bundled web PKI roots.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        Self::with_connector(connector, base_url, timeout)
    }

    /// Client that trusts only the given PEM certificates, e.g. the
    /// `tlsCACerts` of a connection profile. Falls back to `new` when empty.
    pub fn with_root_certificates(
        base_url: impl Into<String>,
        timeout: Duration,
        pems: &[String],
    ) -> Result<Self> {
        if pems.is_empty() {
            return Ok(Self::new(base_url, timeout));
        }

        let mut roots = rustls::RootCertStore::empty();
        for pem in pems {
            let certs = rustls_pemfile::certs(&mut BufReader::new(pem.as_bytes()))
                .context("reading TLS root certificate")?;
            if certs.is_empty() {
                bail!("no certificate found in TLS root PEM");
            }
            for der in certs {
                roots
                    .add(&rustls::Certificate(der))
                    .context("adding TLS root certificate")?;
            }
        }

        let tls = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .build();
        Ok(Self::with_connector(connector, base_url, timeout))
    }

    fn with_connector(
        connector: HttpsConnector<HttpConnector>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder().build(connector),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` as JSON to `path`, with extra headers.
    pub async fn post<B: Serialize>(
        &self,
        path: &str,
        headers: &[(HeaderName, String)],
        body: &B,
    ) -> Result<JsonReply, TransportFailure> {
        let payload = serde_json::to_vec(body).map_err(|e| TransportFailure(e.to_string()))?;
        self.post_bytes(path, headers, payload).await
    }

    /// POST an already-encoded JSON payload. Used when headers are derived
    /// from the exact bytes sent.
    pub async fn post_bytes(
        &self,
        path: &str,
        headers: &[(HeaderName, String)],
        payload: Vec<u8>,
    ) -> Result<JsonReply, TransportFailure> {
        let uri = format!("{}{}", self.base_url, path);

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            let value =
                HeaderValue::from_str(value).map_err(|e| TransportFailure(e.to_string()))?;
            builder = builder.header(name, value);
        }
        let request = builder
            .body(Body::from(payload))
            .map_err(|e| TransportFailure(e.to_string()))?;

        debug!("POST {}", uri);
        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| TransportFailure(format!("{} timed out after {:?}", uri, self.timeout)))?
            .map_err(|e| TransportFailure(format!("{}: {}", uri, e)))?;

        let status = response.status();
        let body = tokio::time::timeout(self.timeout, hyper::body::to_bytes(response.into_body()))
            .await
            .map_err(|_| TransportFailure(format!("{} body timed out", uri)))?
            .map_err(|e| TransportFailure(format!("{}: {}", uri, e)))?;

        Ok(JsonReply {
            status,
            body: body.to_vec(),
        })
    }
}

/// Local HTTP server answering every request from a closure, for adapter tests.
#[cfg(test)]
pub(crate) mod test_server {
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, HeaderMap, Request, Response, Server, StatusCode};

    /// One request as the server saw it.
    #[derive(Debug, Clone)]
    pub struct Recorded {
        pub path: String,
        pub headers: HeaderMap,
        pub body: Vec<u8>,
    }

    pub struct TestServer {
        pub addr: SocketAddr,
        requests: Arc<Mutex<Vec<Recorded>>>,
    }

    impl TestServer {
        pub fn start<F>(respond: F) -> Self
        where
            F: Fn(&str) -> (StatusCode, String) + Send + Sync + 'static,
        {
            Self::start_with_delay(Duration::ZERO, respond)
        }

        /// Like `start`, but every reply is held back for `delay`.
        pub fn start_with_delay<F>(delay: Duration, respond: F) -> Self
        where
            F: Fn(&str) -> (StatusCode, String) + Send + Sync + 'static,
        {
            let requests: Arc<Mutex<Vec<Recorded>>> = Arc::new(Mutex::new(Vec::new()));
            let respond = Arc::new(respond);

            let make_svc = {
                let requests = requests.clone();
                make_service_fn(move |_conn| {
                    let requests = requests.clone();
                    let respond = respond.clone();
                    async move {
                        Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                            let requests = requests.clone();
                            let respond = respond.clone();
                            async move {
                                let (parts, body) = req.into_parts();
                                let body = hyper::body::to_bytes(body).await.unwrap_or_default().to_vec();
                                let path = parts.uri.path().to_string();
                                requests.lock().unwrap().push(Recorded {
                                    path: path.clone(),
                                    headers: parts.headers,
                                    body,
                                });

                                if !delay.is_zero() {
                                    tokio::time::sleep(delay).await;
                                }
                                let (status, text) = respond(&path);
                                Ok::<_, Infallible>(
                                    Response::builder().status(status).body(Body::from(text)).unwrap(),
                                )
                            }
                        }))
                    }
                })
            };

            let server = Server::bind(&"127.0.0.1:0".parse().unwrap()).serve(make_svc);
            let addr = server.local_addr();
            tokio::spawn(server);
            Self { addr, requests }
        }

        pub fn url(&self) -> String {
            format!("http://{}", self.addr)
        }

        pub fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_server::TestServer;
    use super::*;

    #[derive(Serialize)]
    struct Ping {
        n: u32,
    }

    #[tokio::test]
    async fn test_post_sends_json_and_headers() {
        let server = TestServer::start(|_| (StatusCode::OK, r#"{"ok":true}"#.to_string()));
        let client = JsonClient::new(format!("{}/", server.url()), Duration::from_secs(5));

        let reply = client
            .post("/api/v1/ping", &[(HeaderName::from_static("x-trace"), "abc".to_string())], &Ping { n: 7 })
            .await
            .unwrap();

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, br#"{"ok":true}"#.to_vec());
        let seen = server.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, "/api/v1/ping");
        assert_eq!(seen[0].body, br#"{"n":7}"#.to_vec());
        assert_eq!(seen[0].headers["x-trace"], "abc");
        assert_eq!(seen[0].headers[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_stalled_reply_times_out() {
        let server = TestServer::start_with_delay(Duration::from_secs(5), |_| (StatusCode::OK, "{}".to_string()));
        let client = JsonClient::new(server.url(), Duration::from_millis(200));

        let err = client.post("/slow", &[], &Ping { n: 1 }).await.unwrap_err();
        assert!(err.0.contains("timed out"), "{}", err.0);
    }

    #[tokio::test]
    async fn test_https_url_is_attempted_over_tls() {
        // Plain TCP listener that hangs up on the handshake.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let client = JsonClient::new(format!("https://{}", addr), Duration::from_secs(5));
        let err = client.post("/api/v1/enroll", &[], &Ping { n: 1 }).await.unwrap_err();
        assert!(!err.0.contains("scheme is not http"), "{}", err.0);
    }

    #[test]
    fn test_root_certificates_from_pem() {
        let pem = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .unwrap()
            .cert
            .pem();
        assert!(JsonClient::with_root_certificates("https://localhost:7054", Duration::from_secs(1), &[pem]).is_ok());
        assert!(JsonClient::with_root_certificates("https://localhost:7054", Duration::from_secs(1), &[]).is_ok());
        assert!(JsonClient::with_root_certificates(
            "https://localhost:7054",
            Duration::from_secs(1),
            &["not a certificate".to_string()]
        )
        .is_err());
    }
}
