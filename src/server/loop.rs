// Server loop module
// Accepts connections until shutdown is requested

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Accept connections on `listener` until `shutdown` is notified
///
/// In-flight connections keep running on their own tasks; the loop only
/// stops taking new ones.
pub async fn run(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                logger::log_shutdown(active_connections.load(Ordering::SeqCst));
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handler::HandlerRegistry;
    use crate::headers::{HeaderResolver, HeaderRule, StaticRuleSource};
    use crate::server::create_reusable_listener;

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>hi</p>").unwrap();

        let mut config = Config::default();
        config.project.static_dir = dir.path().to_path_buf();
        config.logging.access_log = false;
        let mut handlers = HandlerRegistry::new();
        handlers.register("api", crate::api::index::hello);
        let rules = vec![HeaderRule::new("^/api", &[("X-Api", "1")])];
        let state = Arc::new(AppState::with_parts(
            config,
            HeaderResolver::new(StaticRuleSource::new(rules)),
            handlers,
        ));

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(run(listener, state, Arc::clone(&shutdown)));

        let client = reqwest::Client::builder().no_proxy().build().unwrap();

        let index = client.get(format!("http://{addr}/")).send().await.unwrap();
        assert_eq!(index.status(), 200);
        assert_eq!(index.headers()["access-control-allow-origin"], "*");
        assert_eq!(index.text().await.unwrap(), "<p>hi</p>");

        let api = client
            .post(format!("http://{addr}/api/"))
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(api.status(), 200);
        assert_eq!(api.headers()["x-api"], "1");

        let preflight = client
            .request(reqwest::Method::OPTIONS, format!("http://{addr}/api"))
            .send()
            .await
            .unwrap();
        assert_eq!(preflight.status(), 204);
        assert_eq!(
            preflight.headers()["access-control-allow-methods"],
            "OPTIONS, POST"
        );

        let missing = client
            .get(format!("http://{addr}/nope"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);
        assert_eq!(missing.text().await.unwrap(), r#"{"error":"not found"}"#);

        shutdown.notify_one();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_chunked_body_over_limit_is_413() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.project.static_dir = dir.path().to_path_buf();
        config.logging.access_log = false;
        config.http.max_body_size = 4;
        let mut handlers = HandlerRegistry::new();
        handlers.register("api", crate::api::index::hello);
        let rules = vec![HeaderRule::new("^/api", &[("X-Api", "1")])];
        let state = Arc::new(AppState::with_parts(
            config,
            HeaderResolver::new(StaticRuleSource::new(rules)),
            handlers,
        ));

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(run(listener, state, Arc::clone(&shutdown)));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                b"POST /api/ HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\
                  Connection: close\r\n\r\n10\r\n0123456789abcdef\r\n0\r\n\r\n",
            )
            .await
            .unwrap();

        // The server may reset once the reply is out; keep what arrived
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        while let Ok(n) = stream.read(&mut buf).await {
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
        }
        let reply = String::from_utf8(raw).unwrap().to_ascii_lowercase();

        assert!(reply.starts_with("http/1.1 413"), "reply: {reply}");
        assert!(reply.contains("access-control-allow-origin: *"));
        assert!(reply.contains("access-control-allow-methods: options, post"));
        assert!(reply.contains("access-control-allow-headers: content-type"));
        assert!(reply.contains("x-api: 1"));
        assert!(reply.ends_with(r#"{"error":"payload too large"}"#));

        shutdown.notify_one();
        server.await.unwrap();
    }
}
