//! Integration tests for the match synchronizer.
//!
//! These drive the full polling loop against a scriptable in-memory backend,
//! and exercise the HTTP transport against a real TCP socket.

use gamecloud::{
    HttpTransport, MatchEvent, MatchSettings, MatchSynchronizer, Transport, TransportError,
};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

/// In-memory backend: one fixed response per script filename, adjustable
/// while the loop runs.
#[derive(Default)]
struct ScriptedBackend {
    responses: Mutex<HashMap<&'static str, String>>,
}

impl ScriptedBackend {
    fn set(&self, file: &'static str, body: &str) {
        self.responses.lock().unwrap().insert(file, body.to_string());
    }
}

impl Transport for ScriptedBackend {
    fn fetch(
        &self,
        url: &str,
        _timeout: Duration,
    ) -> impl Future<Output = Result<String, TransportError>> + Send {
        let responses = self.responses.lock().unwrap();
        let result = responses
            .iter()
            .find(|(file, _)| url.contains(*file))
            .map(|(_, body)| body.clone())
            .ok_or(TransportError::Status(404));
        async move { result }
    }
}

fn scripted_backend() -> Arc<ScriptedBackend> {
    let backend = Arc::new(ScriptedBackend::default());
    backend.set("send_local_ready.php", "");
    backend.set("retrieve_remote_ready.php", "0\n");
    backend.set("write_param.php", "");
    backend.set("read_param.php", "[]");
    backend.set("send_local_event.php", "");
    backend.set("retrieve_remote_event.php", "null");
    backend
}

fn spawn_loop(
    sync: &MatchSynchronizer,
    backend: &Arc<ScriptedBackend>,
) -> tokio::task::JoinHandle<()> {
    let sync = sync.clone();
    let backend = Arc::clone(backend);
    tokio::spawn(async move { sync.run(&*backend).await })
}

/// Polls a condition instead of sleeping for fixed periods, so the tests stay
/// fast on quick machines and stable on slow ones.
async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 2.5s");
}

mod polling_loop {
    use super::*;

    #[tokio::test]
    async fn edge_triggered_update_runs_exactly_one_cycle() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut settings = MatchSettings::new(42, 1, "http://host.test/");
        settings.poll_frequency_ms = 5;
        settings.unlimited_collection = false;
        let sync = MatchSynchronizer::new(settings);

        let backend = scripted_backend();
        let handle = spawn_loop(&sync, &backend);

        wait_for(|| sync.is_local_player_ready()).await;
        assert!(!sync.is_remote_player_ready());

        backend.set("retrieve_remote_ready.php", "1\n");
        wait_for(|| sync.is_remote_player_ready()).await;

        // Remote is ready but nothing was requested: no cycle runs.
        sleep(Duration::from_millis(50)).await;
        assert_eq!(sync.update_count(), 0);
        assert!(!sync.has_new_data());

        sync.request_update();
        wait_for(|| sync.update_count() == 1).await;
        wait_for(|| sync.update_complete()).await;
        assert!(sync.has_new_data());
        assert!(!sync.has_new_data());

        // The request flag was cleared: no further cycle until the next one.
        sleep(Duration::from_millis(50)).await;
        assert_eq!(sync.update_count(), 1);

        sync.request_update();
        wait_for(|| sync.update_count() == 2).await;

        sync.set_connection_active(false);
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop did not stop")
            .expect("loop task panicked");
    }

    #[tokio::test]
    async fn unlimited_collection_cycles_continuously() {
        let mut settings = MatchSettings::new(43, 2, "http://host.test/");
        settings.poll_frequency_ms = 5;
        settings.unlimited_collection = true;
        let sync = MatchSynchronizer::new(settings);
        assert_eq!(sync.opposite_player(), 1);

        let backend = scripted_backend();
        backend.set("retrieve_remote_ready.php", "1\n");
        backend.set("retrieve_remote_event.php", r#"{"index":1,"type":9}"#);
        backend.set(
            "read_param.php",
            r#"[{"key":0,"name":"turn","value":"3"}]"#,
        );

        let handle = spawn_loop(&sync, &backend);

        wait_for(|| sync.update_count() >= 3).await;
        wait_for(|| sync.remote_active_event().is_some()).await;
        assert_eq!(
            sync.remote_active_event(),
            Some(MatchEvent { index: 1, kind: 9 })
        );
        assert_eq!(sync.parameter_value(0), Some("3".to_string()));

        sync.set_connection_active(false);
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop did not stop")
            .expect("loop task panicked");
    }

    #[tokio::test]
    async fn queued_events_drain_through_the_loop() {
        let mut settings = MatchSettings::new(44, 1, "http://host.test/");
        settings.poll_frequency_ms = 5;
        settings.unlimited_collection = true;
        let sync = MatchSynchronizer::new(settings);

        let backend = scripted_backend();
        backend.set("retrieve_remote_ready.php", "1");

        sync.raise_event(5);
        sync.raise_event(6);

        let handle = spawn_loop(&sync, &backend);
        wait_for(|| sync.pending_event_count() == 0).await;

        sync.set_connection_active(false);
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop did not stop")
            .expect("loop task panicked");
    }
}

mod http_transport {
    use super::*;

    /// Minimal one-response-per-connection HTTP server.
    async fn spawn_http_server(status_line: &'static str, body: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status_line,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        addr
    }

    #[tokio::test]
    async fn fetch_returns_body_on_200() {
        let addr = spawn_http_server("200 OK", r#"{"index":3,"type":1}"#).await;
        let transport = HttpTransport::new();

        let url = format!("http://{}/retrieve_remote_event.php?matchId=1&player=2", addr);
        let body = transport
            .fetch(&url, Duration::from_millis(2000))
            .await
            .expect("fetch failed");
        assert_eq!(body, r#"{"index":3,"type":1}"#);
    }

    #[tokio::test]
    async fn fetch_rejects_error_status() {
        let addr = spawn_http_server("500 Internal Server Error", "boom").await;
        let transport = HttpTransport::new();

        let url = format!("http://{}/read_param.php?matchId=1", addr);
        match transport.fetch(&url, Duration::from_millis(2000)).await {
            Err(TransportError::Status(500)) => {}
            other => panic!("expected status error, got {:?}", other.map(|_| "body")),
        }
    }

    #[tokio::test]
    async fn fetch_encodes_raw_json_query_values() {
        let addr = spawn_http_server("200 OK", "").await;
        let transport = HttpTransport::new();

        // The synchronizer builds URLs with the raw JSON in the query string;
        // the client must encode it rather than reject the URL.
        let url = format!(
            r#"http://{}/write_param.php?matchId=1&param=[{{"key":0,"name":"a","value":"b"}}]"#,
            addr
        );
        transport
            .fetch(&url, Duration::from_millis(2000))
            .await
            .expect("fetch failed");
    }

    #[tokio::test]
    async fn fetch_times_out_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept connections but never answer.
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    sleep(Duration::from_secs(10)).await;
                    drop(socket);
                });
            }
        });

        let transport = HttpTransport::new();
        let url = format!("http://{}/read_param.php?matchId=1", addr);
        match transport.fetch(&url, Duration::from_millis(100)).await {
            Err(TransportError::Request(e)) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {:?}", other.map(|_| "body")),
        }
    }
}
