//! Discovery Tests (oscquery-discovery)
//!
//! Drives the registry with synthetic advertisements against real loopback
//! servers, so no multicast traffic is needed:
//! - fetching and deserializing peer trees
//! - dedup of repeated sightings
//! - removal events
//! - failure classification and isolation

use oscquery_core::{Access, OscValue, SERVICE_TYPE};
use oscquery_discovery::{
    Advertisement, DiscoveredService, DiscoveryConfig, DiscoveryError, DiscoveryEvent,
    ServiceRegistry,
};
use oscquery_test_utils::{find_available_port, EventCollector, TestServer, DEFAULT_TIMEOUT};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn registry() -> ServiceRegistry {
    ServiceRegistry::new(&DiscoveryConfig {
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .unwrap()
}

fn advertisement(name: &str, port: u16, addresses: &[&str]) -> Advertisement {
    Advertisement {
        fullname: format!("{}.{}", name, SERVICE_TYPE),
        service_type: SERVICE_TYPE.to_string(),
        port,
        addresses: addresses.iter().map(|a| a.to_string()).collect(),
    }
}

/// Answers every connection with a 200 that is not OSCQuery JSON
async fn spawn_plain_http() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(
                        b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
                    )
                    .await;
            });
        }
    });
    port
}

/// Serves a minimal OSCQuery root after `delay`
async fn spawn_slow_oscquery(delay: Duration) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let body = if request.contains("HOST_INFO") {
                    r#"{"NAME":"Slow","OSC_PORT":9000}"#
                } else {
                    r#"{"FULL_PATH":"/","ACCESS":0}"#
                };
                tokio::time::sleep(delay).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
            });
        }
    });
    port
}

// ============================================================================
// Fetching
// ============================================================================

#[tokio::test]
async fn test_update_loads_tree_and_host_info() {
    let server = TestServer::start_sample().await;
    let mut service = DiscoveredService::new("127.0.0.1", server.port()).unwrap();
    assert!(!service.is_loaded());

    service.update(&reqwest::Client::new()).await.unwrap();
    assert!(service.is_loaded());

    let info = service.host_info().unwrap();
    assert_eq!(info.name, "Test Server");
    assert_eq!(info.osc_port, 9000);

    let foo = service.resolve_path("/avatar/parameters/Foo").unwrap().unwrap();
    assert_eq!(foo.name(), "Foo");
    assert_eq!(foo.access(), Some(Access::ReadWrite));
    assert_eq!(foo.arguments().unwrap()[0].value, Some(OscValue::Int(5)));

    assert!(service.resolve_path("/avatar/parameters/Nope").unwrap().is_none());
}

#[tokio::test]
async fn test_peer_tree_matches_server_tree() {
    let server = TestServer::start_sample().await;
    let registry = registry();
    let service = registry
        .query_new_service("127.0.0.1", server.port())
        .await
        .unwrap();

    let expected: Vec<String> = server.server().with_tree(|tree| {
        tree.methods(tree.root()).map(|n| n.full_path()).collect()
    });
    let found: Vec<String> = service.methods().unwrap().map(|n| n.full_path()).collect();
    assert_eq!(found, expected);

    let chatbox = service.resolve_path("/chatbox/input").unwrap().unwrap();
    assert_eq!(chatbox.arguments().unwrap().len(), 3);
    assert_eq!(chatbox.access(), Some(Access::WriteOnly));
}

#[tokio::test]
async fn test_query_emits_up_event() {
    let server = TestServer::start_sample().await;
    let registry = registry();
    let events = EventCollector::spawn(registry.subscribe());

    registry
        .query_new_service("127.0.0.1", server.port())
        .await
        .unwrap();

    assert!(
        events
            .wait_for(|e| matches!(e, DiscoveryEvent::Up(_)), DEFAULT_TIMEOUT)
            .await
    );
    assert_eq!(registry.services().len(), 1);
    assert!(registry.get("127.0.0.1", server.port()).is_some());
}

// ============================================================================
// Dedup
// ============================================================================

#[tokio::test]
async fn test_repeated_sightings_are_deduplicated() {
    let server = TestServer::start_sample().await;
    let registry = registry();
    let events = EventCollector::spawn(registry.subscribe());
    let ad = advertisement("studio", server.port(), &["127.0.0.1"]);

    registry.service_up(ad.clone()).await;
    registry.service_up(ad).await;

    assert_eq!(registry.services().len(), 1);
    assert!(
        events
            .wait_for(|e| matches!(e, DiscoveryEvent::Up(_)), DEFAULT_TIMEOUT)
            .await
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    let ups = events
        .events()
        .iter()
        .filter(|e| matches!(e, DiscoveryEvent::Up(_)))
        .count();
    assert_eq!(ups, 1);
}

#[tokio::test]
async fn test_concurrent_sightings_are_deduplicated() {
    let server = TestServer::start_sample().await;
    let registry = registry();
    let ad = advertisement("studio", server.port(), &["127.0.0.1"]);

    let (a, b) = tokio::join!(registry.service_up(ad.clone()), registry.service_up(ad));
    assert_eq!(a.len() + b.len(), 1);
    assert_eq!(registry.services().len(), 1);
}

#[tokio::test]
async fn test_unusable_addresses_are_skipped() {
    let server = TestServer::start_sample().await;
    let registry = registry();

    let live = registry
        .service_up(advertisement("studio", server.port(), &["", "::1", "127.0.0.1"]))
        .await;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].address(), "127.0.0.1");
}

#[tokio::test]
async fn test_non_tcp_service_is_ignored() {
    let server = TestServer::start_sample().await;
    let registry = registry();
    let mut ad = advertisement("studio", server.port(), &["127.0.0.1"]);
    ad.service_type = "_oscjson._udp.local.".to_string();

    assert!(registry.service_up(ad).await.is_empty());
    assert!(registry.services().is_empty());
}

// ============================================================================
// Removal
// ============================================================================

#[tokio::test]
async fn test_service_down_removes_and_notifies() {
    let server = TestServer::start_sample().await;
    let registry = registry();
    let events = EventCollector::spawn(registry.subscribe());
    let ad = advertisement("studio", server.port(), &["127.0.0.1"]);
    let fullname = ad.fullname.clone();

    registry.service_up(ad).await;
    let removed = registry.service_down(&fullname);
    assert_eq!(removed.len(), 1);
    assert!(registry.services().is_empty());
    assert!(
        events
            .wait_for(|e| matches!(e, DiscoveryEvent::Down(_)), DEFAULT_TIMEOUT)
            .await
    );

    // already gone: no second event
    assert!(registry.service_down(&fullname).is_empty());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let downs = events
        .events()
        .iter()
        .filter(|e| matches!(e, DiscoveryEvent::Down(_)))
        .count();
    assert_eq!(downs, 1);
}

#[tokio::test]
async fn test_service_can_return_after_removal() {
    let server = TestServer::start_sample().await;
    let registry = registry();
    let ad = advertisement("studio", server.port(), &["127.0.0.1"]);

    registry.service_up(ad.clone()).await;
    registry.service_down(&ad.fullname);
    registry.service_up(ad).await;
    assert_eq!(registry.services().len(), 1);
}

#[tokio::test]
async fn test_re_resolution_keeps_earlier_addresses() {
    let server = TestServer::start_sample().await;
    let registry = registry();
    let port = server.port();

    registry
        .service_up(advertisement("studio", port, &["127.0.0.1"]))
        .await;
    registry
        .service_up(advertisement("studio", port, &["localhost"]))
        .await;
    assert_eq!(registry.services().len(), 2);

    let removed = registry.service_down(&format!("studio.{}", SERVICE_TYPE));
    assert_eq!(removed.len(), 2);
    assert!(registry.services().is_empty());
}

#[tokio::test]
async fn test_removal_during_query_discards_result() {
    let port = spawn_slow_oscquery(Duration::from_millis(200)).await;
    let registry = registry();
    let events = EventCollector::spawn(registry.subscribe());
    let ad = advertisement("slow", port, &["127.0.0.1"]);
    let fullname = ad.fullname.clone();

    let (live, removed) = tokio::join!(registry.service_up(ad), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry.service_down(&fullname)
    });

    assert!(live.is_empty());
    assert!(removed.is_empty());
    assert!(registry.services().is_empty());

    // withdrawn results are neither announced nor reported as errors
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(events.count(), 0);
}

#[tokio::test]
async fn test_slow_service_is_added_when_still_advertised() {
    let port = spawn_slow_oscquery(Duration::from_millis(50)).await;
    let registry = registry();

    let live = registry
        .service_up(advertisement("slow", port, &["127.0.0.1"]))
        .await;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].host_info().unwrap().name, "Slow");
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_unreachable_service() {
    let port = find_available_port().await;
    let registry = registry();
    let events = EventCollector::spawn(registry.subscribe());

    let err = registry
        .query_new_service("127.0.0.1", port)
        .await
        .unwrap_err();
    assert!(err.is_unreachable());
    assert!(registry.services().is_empty());
    assert!(
        events
            .wait_for(
                |e| matches!(e, DiscoveryEvent::Error { unreachable: true, .. }),
                DEFAULT_TIMEOUT
            )
            .await
    );
}

#[tokio::test]
async fn test_non_oscquery_http_is_an_error() {
    let port = spawn_plain_http().await;
    let registry = registry();

    let err = registry
        .query_new_service("127.0.0.1", port)
        .await
        .unwrap_err();
    assert!(!err.is_unreachable());
    assert!(matches!(err, DiscoveryError::Decode { .. }));
}

#[tokio::test]
async fn test_one_failure_does_not_block_others() {
    let server = TestServer::start_sample().await;
    let dead_port = find_available_port().await;
    let registry = registry();

    let (dead, live) = tokio::join!(
        registry.service_up(advertisement("dead", dead_port, &["127.0.0.1"])),
        registry.service_up(advertisement("live", server.port(), &["127.0.0.1"]))
    );
    assert!(dead.is_empty());
    assert_eq!(live.len(), 1);
    assert_eq!(registry.services().len(), 1);
}
