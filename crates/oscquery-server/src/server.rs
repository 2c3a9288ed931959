//! Query server lifecycle and namespace mutation

use oscquery_core::{HostInfo, MethodOptions, NodeTree, OscValue};
use parking_lot::{Mutex, RwLock};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::QueryServerConfig;
use crate::handler;
use crate::{Result, ServerError};

#[cfg(feature = "mdns")]
use crate::advertise::ServiceAdvertiser;

const EVENT_CAPACITY: usize = 64;

/// Events emitted by a [`QueryServer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// HTTP listener is accepting requests on `port`
    Started { port: u16 },
    /// The first request since the last start arrived
    FirstRequest { path: String },
    /// Listener closed and advertisement withdrawn
    Stopped,
}

/// State shared with the HTTP handlers
pub(crate) struct Shared {
    pub(crate) tree: RwLock<NodeTree>,
    pub(crate) host_info: HostInfo,
    pub(crate) events: broadcast::Sender<ServerEvent>,
    first_request_seen: AtomicBool,
}

impl Shared {
    pub(crate) fn new(tree: NodeTree, host_info: HostInfo) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tree: RwLock::new(tree),
            host_info,
            events,
            first_request_seen: AtomicBool::new(false),
        }
    }

    pub(crate) fn note_request(&self, path: &str) {
        if !self.first_request_seen.swap(true, Ordering::SeqCst) {
            let path = format!("/{}", path.trim_start_matches('/'));
            debug!("First request: {}", path);
            let _ = self.events.send(ServerEvent::FirstRequest { path });
        }
    }
}

struct Running {
    port: u16,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
    advertiser: Option<Advertiser>,
}

enum Lifecycle {
    Stopped,
    Binding,
    Running(Running),
}

#[cfg(feature = "mdns")]
type Advertiser = ServiceAdvertiser;

#[cfg(not(feature = "mdns"))]
type Advertiser = std::convert::Infallible;

/// Resets a `Binding` state to `Stopped` unless disarmed, so a failed or
/// cancelled start leaves the server startable again.
struct BindingGuard<'a> {
    state: &'a Mutex<Lifecycle>,
    armed: bool,
}

impl Drop for BindingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock();
            if matches!(*state, Lifecycle::Binding) {
                *state = Lifecycle::Stopped;
            }
        }
    }
}

/// OSCQuery HTTP server
///
/// Owns a [`NodeTree`] that can be mutated at any time, running or not.
/// Requests always see the current tree.
pub struct QueryServer {
    config: QueryServerConfig,
    shared: Arc<Shared>,
    state: Mutex<Lifecycle>,
}

impl QueryServer {
    /// Create a server with an empty namespace. Fails if the configuration
    /// is missing required fields.
    pub fn new(config: QueryServerConfig) -> Result<Self> {
        let host_info = config.host_info()?;
        Ok(Self {
            config,
            shared: Arc::new(Shared::new(NodeTree::new(), host_info)),
            state: Mutex::new(Lifecycle::Stopped),
        })
    }

    pub fn config(&self) -> &QueryServerConfig {
        &self.config
    }

    pub fn host_info(&self) -> &HostInfo {
        &self.shared.host_info
    }

    /// Bound HTTP port while running
    pub fn port(&self) -> Option<u16> {
        match &*self.state.lock() {
            Lifecycle::Running(running) => Some(running.port),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), Lifecycle::Running(_))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.shared.events.subscribe()
    }

    /// Bind the HTTP listener and advertise it.
    ///
    /// Returns the host info once requests are being served. Calling this
    /// while running returns immediately; calling it while another start is
    /// in progress fails with [`ServerError::AlreadyBinding`].
    pub async fn start(&self) -> Result<HostInfo> {
        {
            let mut state = self.state.lock();
            match &*state {
                Lifecycle::Binding => return Err(ServerError::AlreadyBinding),
                Lifecycle::Running(_) => return Ok(self.shared.host_info.clone()),
                Lifecycle::Stopped => {}
            }
            *state = Lifecycle::Binding;
        }
        let mut guard = BindingGuard {
            state: &self.state,
            armed: true,
        };

        let (listener, advertiser) = match self.config.http_port.filter(|p| *p != 0) {
            Some(port) => tokio::try_join!(
                self.bind_fixed(port),
                self.advertise(port)
            )?,
            None => {
                let listener = self.bind_auto().await?;
                let port = listener.local_addr()?.port();
                let advertiser = self.advertise(port).await?;
                (listener, advertiser)
            }
        };
        let port = listener.local_addr()?.port();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = handler::router(self.shared.clone());
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        });

        guard.armed = false;
        *self.state.lock() = Lifecycle::Running(Running {
            port,
            shutdown_tx,
            task,
            advertiser,
        });

        info!(
            "OSCQuery server '{}' listening on {}:{}",
            self.shared.host_info.name, self.config.http_ip, port
        );
        let _ = self.shared.events.send(ServerEvent::Started { port });

        Ok(self.shared.host_info.clone())
    }

    /// Close the listener and withdraw the advertisement. No-op unless running.
    pub async fn stop(&self) -> Result<()> {
        let running = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, Lifecycle::Stopped) {
                Lifecycle::Running(running) => running,
                other => {
                    *state = other;
                    return Ok(());
                }
            }
        };

        let Running {
            port,
            shutdown_tx,
            task,
            advertiser,
        } = running;

        let close = async move {
            let _ = shutdown_tx.send(());
            if let Err(e) = task.await {
                warn!("HTTP server task ended abnormally: {}", e);
            }
        };
        let ((), withdrawn) = tokio::join!(close, withdraw(advertiser));

        self.shared.first_request_seen.store(false, Ordering::SeqCst);
        info!("OSCQuery server on port {} stopped", port);
        let _ = self.shared.events.send(ServerEvent::Stopped);

        withdrawn
    }

    /// Add or replace the method at `path`, creating containers as needed
    pub fn add_method(&self, path: &str, opts: MethodOptions) -> Result<()> {
        self.shared.tree.write().add_method(path, opts)?;
        Ok(())
    }

    /// Remove the method at `path` and prune containers it leaves empty
    pub fn remove_method(&self, path: &str) -> Result<()> {
        self.shared.tree.write().remove_method(path)?;
        Ok(())
    }

    pub fn set_value(&self, path: &str, index: usize, value: impl Into<OscValue>) -> Result<()> {
        self.shared
            .tree
            .write()
            .set_value_at(path, index, value.into())?;
        Ok(())
    }

    pub fn unset_value(&self, path: &str, index: usize) -> Result<()> {
        self.shared.tree.write().unset_value_at(path, index)?;
        Ok(())
    }

    /// Run `f` against the current namespace
    pub fn with_tree<R>(&self, f: impl FnOnce(&NodeTree) -> R) -> R {
        f(&self.shared.tree.read())
    }

    async fn bind_fixed(&self, port: u16) -> Result<TcpListener> {
        let addr = SocketAddr::new(self.config.http_ip, port);
        Ok(TcpListener::bind(addr).await?)
    }

    async fn bind_auto(&self) -> Result<TcpListener> {
        let ip = self.config.http_ip;
        let Some(range) = self.config.port_range.clone() else {
            return Ok(TcpListener::bind(SocketAddr::new(ip, 0)).await?);
        };

        let (start, end) = (*range.start(), *range.end());
        for port in range {
            match TcpListener::bind(SocketAddr::new(ip, port)).await {
                Ok(listener) => return Ok(listener),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::AddrInUse | io::ErrorKind::PermissionDenied
                    ) =>
                {
                    debug!("Port {} unavailable: {}", port, e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServerError::NoFreePort { start, end })
    }

    async fn advertise(&self, port: u16) -> Result<Option<Advertiser>> {
        if !self.config.advertise {
            return Ok(None);
        }
        register(self.config.name.clone(), port).await.map(Some)
    }
}

#[cfg(feature = "mdns")]
async fn register(name: String, port: u16) -> Result<Advertiser> {
    tokio::task::spawn_blocking(move || {
        let mut advertiser = ServiceAdvertiser::new()?;
        advertiser.advertise(&name, port)?;
        Ok(advertiser)
    })
    .await
    .map_err(|e| ServerError::Other(e.to_string()))?
}

#[cfg(not(feature = "mdns"))]
async fn register(_name: String, port: u16) -> Result<Advertiser> {
    Err(ServerError::Config(format!(
        "cannot advertise port {}: built without mDNS support",
        port
    )))
}

#[cfg(feature = "mdns")]
async fn withdraw(advertiser: Option<Advertiser>) -> Result<()> {
    let Some(mut advertiser) = advertiser else {
        return Ok(());
    };
    tokio::task::spawn_blocking(move || advertiser.stop())
        .await
        .map_err(|e| ServerError::Other(e.to_string()))?
}

#[cfg(not(feature = "mdns"))]
async fn withdraw(advertiser: Option<Advertiser>) -> Result<()> {
    match advertiser {
        None => Ok(()),
        Some(never) => match never {},
    }
}

impl Drop for QueryServer {
    fn drop(&mut self) {
        if let Lifecycle::Running(running) =
            std::mem::replace(self.state.get_mut(), Lifecycle::Stopped)
        {
            let _ = running.shutdown_tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> QueryServerConfig {
        QueryServerConfig {
            http_ip: "127.0.0.1".parse().unwrap(),
            osc_port: Some(9000),
            advertise: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_binding_guard_resets_state() {
        let server = QueryServer::new(config()).unwrap();
        *server.state.lock() = Lifecycle::Binding;
        {
            let _guard = BindingGuard {
                state: &server.state,
                armed: true,
            };
        }
        assert!(matches!(*server.state.lock(), Lifecycle::Stopped));
    }

    #[test]
    fn test_disarmed_guard_keeps_state() {
        let server = QueryServer::new(config()).unwrap();
        *server.state.lock() = Lifecycle::Binding;
        {
            let mut guard = BindingGuard {
                state: &server.state,
                armed: true,
            };
            guard.armed = false;
        }
        assert!(matches!(*server.state.lock(), Lifecycle::Binding));
    }

    #[tokio::test]
    async fn test_start_while_binding_fails() {
        let server = QueryServer::new(config()).unwrap();
        *server.state.lock() = Lifecycle::Binding;
        assert!(matches!(
            server.start().await,
            Err(ServerError::AlreadyBinding)
        ));
        // stop leaves a pending bind alone
        server.stop().await.unwrap();
        assert!(matches!(*server.state.lock(), Lifecycle::Binding));
    }

    #[tokio::test]
    async fn test_cancelled_start_can_be_retried() {
        let server = QueryServer::new(config()).unwrap();
        // dropping the future before it is polled to completion
        drop(server.start());
        assert!(!server.is_running());

        server.start().await.unwrap();
        assert!(server.is_running());
        server.stop().await.unwrap();
    }

    #[test]
    fn test_first_request_noted_once() {
        let shared = Shared::new(NodeTree::new(), config().host_info().unwrap());
        let mut events = shared.events.subscribe();
        shared.note_request("a/b");
        shared.note_request("c");
        assert_eq!(
            events.try_recv().unwrap(),
            ServerEvent::FirstRequest {
                path: "/a/b".to_string()
            }
        );
        assert!(events.try_recv().is_err());
    }
}
