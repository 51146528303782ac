//! Connection management
//!
//! The ConnectionManager owns the connection lifecycle: a background thread
//! runs the connector's pre-flight probe and connect, then settles the
//! init barrier exactly once with the outcome. A probe or connect failure
//! is terminal for the driver instance; no reconnection is attempted and
//! the captured error is replayed to every queued and subsequent caller.

use crate::barrier::InitBarrier;
use packrat_core::{Connector, DriverConfig, Error, Result, StoreConnection};
use parking_lot::RwLock;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

/// Owns the connection and the readiness signal for one driver instance
pub struct ConnectionManager {
    barrier: Arc<InitBarrier>,
    connection: Arc<RwLock<Option<Arc<dyn StoreConnection>>>>,
}

impl ConnectionManager {
    /// Open a connection in the background and return immediately
    ///
    /// Operations submitted before the connection settles are queued by the
    /// barrier and replayed in arrival order.
    pub fn open(config: DriverConfig, connector: Arc<dyn Connector>) -> Self {
        let barrier = Arc::new(InitBarrier::new());
        let connection = Arc::new(RwLock::new(None));

        let manager = ConnectionManager {
            barrier: barrier.clone(),
            connection: connection.clone(),
        };

        thread::spawn(move || {
            let outcome = establish(&config, connector.as_ref(), &connection);
            match &outcome {
                Ok(()) => info!(
                    host = %config.host,
                    port = config.port,
                    database = %config.database,
                    "document store connection ready"
                ),
                Err(err) => error!(
                    %err,
                    host = %config.host,
                    port = config.port,
                    "connection setup failed"
                ),
            }
            barrier.settle(outcome);
        });

        manager
    }

    /// Submit an operation through the init barrier
    pub fn submit<F>(&self, operation: F)
    where
        F: FnOnce(&Result<()>) + Send + 'static,
    {
        self.barrier.submit(operation);
    }

    /// Register a readiness observer
    ///
    /// Fires exactly once with the settlement outcome, in arrival order
    /// relative to queued operations.
    pub fn on_ready<F>(&self, observer: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        self.barrier.submit(move |outcome| observer(outcome.clone()));
    }

    /// The live connection
    ///
    /// # Errors
    ///
    /// Returns a store error if the connection has not been established.
    pub fn connection(&self) -> Result<Arc<dyn StoreConnection>> {
        self.connection
            .read()
            .clone()
            .ok_or_else(|| Error::Store("connection is not available".to_string()))
    }
}

fn establish(
    config: &DriverConfig,
    connector: &dyn Connector,
    slot: &RwLock<Option<Arc<dyn StoreConnection>>>,
) -> Result<()> {
    connector.probe(config)?;
    let connection = connector.connect(config)?;
    *slot.write() = Some(connection);
    Ok(())
}

/// Pre-flight reachability probe for network connectors
///
/// Attempts a TCP connection to `host:port` within the timeout. The probe
/// only checks reachability; the stream is dropped immediately.
///
/// # Errors
///
/// Returns a configuration error if the host does not resolve or no
/// address accepts a connection within the timeout.
pub fn check_port(host: &str, port: u16, timeout: Duration) -> Result<()> {
    let configuration_error = |reason: String| Error::Configuration {
        host: host.to_string(),
        port,
        reason,
    };

    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|err| configuration_error(err.to_string()))?;

    let mut last_failure = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(_) => return Ok(()),
            Err(err) => last_failure = Some(err.to_string()),
        }
    }
    Err(configuration_error(
        last_failure.unwrap_or_else(|| "host did not resolve to any address".to_string()),
    ))
}

/// Network connector over TCP
///
/// Runs [`check_port`] as its pre-flight probe with the configured host,
/// port, and timeout. Actual protocol speech is the embedding
/// application's concern: the post-probe connection handle comes from the
/// supplied factory.
pub struct TcpConnector {
    factory: Box<dyn Fn(&DriverConfig) -> Result<Arc<dyn StoreConnection>> + Send + Sync>,
}

impl TcpConnector {
    /// Connector producing connection handles with the given factory
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&DriverConfig) -> Result<Arc<dyn StoreConnection>> + Send + Sync + 'static,
    {
        TcpConnector {
            factory: Box::new(factory),
        }
    }
}

impl Connector for TcpConnector {
    fn probe(&self, config: &DriverConfig) -> Result<()> {
        check_port(&config.host, config.port, config.connect_timeout)
    }

    fn connect(&self, config: &DriverConfig) -> Result<Arc<dyn StoreConnection>> {
        (self.factory)(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryConnector, MemoryStore};
    use std::sync::mpsc;

    fn wait(manager: &ConnectionManager) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        manager.on_ready(move |outcome| {
            let _ = tx.send(outcome);
        });
        rx.recv().expect("readiness observer dropped")
    }

    #[test]
    fn test_open_settles_ready() {
        let store = MemoryStore::new();
        let manager = ConnectionManager::open(
            DriverConfig::default(),
            Arc::new(MemoryConnector::new(store)),
        );
        assert!(wait(&manager).is_ok());
        assert!(manager.connection().is_ok());
    }

    #[test]
    fn test_probe_failure_is_terminal() {
        let store = MemoryStore::new();
        let failure = Error::Configuration {
            host: "localhost".to_string(),
            port: 27017,
            reason: "connection refused".to_string(),
        };
        let connector = MemoryConnector::new(store).with_probe_failure(failure.clone());
        let manager = ConnectionManager::open(DriverConfig::default(), Arc::new(connector));

        assert_eq!(wait(&manager).unwrap_err(), failure);
        // Later callers see the same captured error.
        assert_eq!(wait(&manager).unwrap_err(), failure);
        assert!(manager.connection().is_err());
    }

    #[test]
    fn test_queued_operations_see_probe_failure() {
        let store = MemoryStore::new();
        let failure = Error::Configuration {
            host: "localhost".to_string(),
            port: 1,
            reason: "connection refused".to_string(),
        };
        let connector = MemoryConnector::new(store).with_probe_failure(failure.clone());
        let manager = ConnectionManager::open(DriverConfig::default(), Arc::new(connector));

        let (tx, rx) = mpsc::channel();
        for _ in 0..3 {
            let tx = tx.clone();
            manager.submit(move |outcome| {
                let _ = tx.send(outcome.clone());
            });
        }
        for _ in 0..3 {
            assert_eq!(
                rx.recv().expect("operation dropped"),
                Err(failure.clone())
            );
        }
    }

    #[test]
    fn test_check_port_unreachable() {
        // Port 1 on localhost is assumed closed.
        let err = check_port("127.0.0.1", 1, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, Error::Configuration { port: 1, .. }));
    }

    #[test]
    fn test_tcp_connector_probe_failure_settles_barrier() {
        let store = MemoryStore::new();
        let connector = TcpConnector::new(move |_config| {
            Ok(Arc::new(store.clone()) as Arc<dyn StoreConnection>)
        });
        let config = DriverConfig::new("127.0.0.1", 1, "default")
            .with_connect_timeout(Duration::from_millis(200));
        let manager = ConnectionManager::open(config, Arc::new(connector));

        let outcome = wait(&manager);
        assert!(matches!(
            outcome,
            Err(Error::Configuration { port: 1, .. })
        ));
    }
}
