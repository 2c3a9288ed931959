//! Common test helpers for the OSCQuery crates
//!
//! - Condition-based waiting (no hardcoded sleeps)
//! - A loopback query server that shuts down on drop
//! - Event collectors for broadcast channels

use oscquery_core::{Access, MethodOptions, OscValue};
use oscquery_server::{QueryServer, QueryServerConfig};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Notify};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Port Allocation
// ============================================================================

/// Find an available TCP port for testing
pub async fn find_available_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

// ============================================================================
// Test Server - RAII wrapper around a loopback QueryServer
// ============================================================================

/// Loopback config with mDNS disabled
pub fn loopback_config(name: &str) -> QueryServerConfig {
    QueryServerConfig {
        name: name.to_string(),
        http_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        osc_port: Some(9000),
        advertise: false,
        ..Default::default()
    }
}

/// A running query server bound to 127.0.0.1; the listener closes on drop
pub struct TestServer {
    server: QueryServer,
    port: u16,
}

impl TestServer {
    /// Start an empty server
    pub async fn start() -> Self {
        Self::start_with_config(loopback_config("Test Server")).await
    }

    /// Start a server with the sample namespace from [`populate_sample`]
    pub async fn start_sample() -> Self {
        let test = Self::start().await;
        populate_sample(&test.server);
        test
    }

    pub async fn start_with_config(config: QueryServerConfig) -> Self {
        let server = QueryServer::new(config).unwrap();
        server.start().await.unwrap();
        let port = server.port().unwrap();
        Self { server, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL for HTTP requests
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn server(&self) -> &QueryServer {
        &self.server
    }

    /// GET `path_and_query`, returning the status code and JSON body if any
    pub async fn get(&self, path_and_query: &str) -> (u16, Option<serde_json::Value>) {
        let response = reqwest::get(format!("{}{}", self.url(), path_and_query))
            .await
            .unwrap();
        let status = response.status().as_u16();
        let body = response.bytes().await.unwrap();
        (status, serde_json::from_slice(&body).ok())
    }
}

/// Namespace shaped like a typical avatar parameter tree:
///
/// ```text
/// /avatar/change                 s  read-write  "avtr_test"
/// /avatar/parameters/Foo         i  read-write  5
/// /avatar/parameters/Secret      f  write-only
/// /chatbox/input                 sTT write-only
/// ```
pub fn populate_sample(server: &QueryServer) {
    server
        .add_method(
            "/avatar/change",
            MethodOptions::with_type("s", Access::ReadWrite).description("current avatar"),
        )
        .unwrap();
    server
        .set_value("/avatar/change", 0, OscValue::from("avtr_test"))
        .unwrap();
    server
        .add_method(
            "/avatar/parameters/Foo",
            MethodOptions::with_type("i", Access::ReadWrite),
        )
        .unwrap();
    server.set_value("/avatar/parameters/Foo", 0, 5).unwrap();
    server
        .add_method(
            "/avatar/parameters/Secret",
            MethodOptions::with_type("f", Access::WriteOnly),
        )
        .unwrap();
    server
        .add_method(
            "/chatbox/input",
            MethodOptions::with_type("sTT", Access::WriteOnly),
        )
        .unwrap();
}

// ============================================================================
// Event Collection
// ============================================================================

/// Drains a broadcast receiver in the background and keeps every event
#[derive(Clone)]
pub struct EventCollector<T> {
    events: Arc<parking_lot::Mutex<Vec<T>>>,
    notify: Arc<Notify>,
}

impl<T: Clone + Send + 'static> EventCollector<T> {
    pub fn spawn(mut rx: broadcast::Receiver<T>) -> Self {
        let collector = Self {
            events: Arc::new(parking_lot::Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
        };

        let events = collector.events.clone();
        let notify = collector.notify.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        events.lock().push(event);
                        notify.notify_waiters();
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        collector
    }

    pub fn events(&self) -> Vec<T> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    /// Wait until an event matching `pred` has been collected
    pub async fn wait_for(&self, pred: impl Fn(&T) -> bool, max_wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            // register before checking so a push in between still wakes us
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.events.lock().iter().any(&pred) {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.events.lock().iter().any(&pred);
            }
        }
    }
}
