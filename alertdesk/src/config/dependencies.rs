//! Dependency initialization and wiring for the alert desk service.

use std::env;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use alertdesk_repository::{
    postgres::{self, PgPool},
    AlertStore, ChangeStore, GraphStore, MemorySeed, Neo4jGraphStore,
    PostgresAlertStore, PostgresChangeStore, PostgresRuleStore, RuleStore, StoreError,
};
use tokio::time::sleep;
use tracing::{info, warn};

use super::settings::DeskConfig;
use crate::desk::{Desk, Stores};
use crate::server::DEFAULT_CORS_ORIGINS;
use crate::ServiceError;

/// Default HTTP listen address.
const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";

/// Default Neo4j bolt URI.
const DEFAULT_NEO4J_URI: &str = "bolt://localhost:7687";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Connection mode for the backing stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection every interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Valid values: "fail-fast" or "retry" (case-insensitive). Defaults to "retry".
    fn from_env() -> Self {
        match env::var("CONNECTION_MODE")
            .unwrap_or_else(|_| "retry".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Where alerts, rules and changes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl StoreBackend {
    fn from_env() -> Self {
        match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => Self::Postgres,
            "memory" => Self::Memory,
            other => {
                warn!(value = other, "Invalid STORE_BACKEND, defaulting to 'memory'");
                Self::Memory
            }
        }
    }
}

/// Where the topology graph lives. `Disabled` leaves topology views unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphBackend {
    Memory,
    Neo4j,
    Disabled,
}

impl GraphBackend {
    fn from_env() -> Self {
        match env::var("GRAPH_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "neo4j" => Self::Neo4j,
            "memory" => Self::Memory,
            "none" | "disabled" => Self::Disabled,
            other => {
                warn!(value = other, "Invalid GRAPH_BACKEND, defaulting to 'memory'");
                Self::Memory
            }
        }
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub desk: Arc<Desk>,
    pub server_addr: SocketAddr,
    pub cors_origins: Vec<String>,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SERVER_ADDR`: listen address (default: 0.0.0.0:8080)
    /// - `CORS_ORIGINS`: comma-separated allowed origins (default: local UI dev servers)
    /// - `STORE_BACKEND`: "memory" or "postgres" (default: memory)
    /// - `DATABASE_URL`: PostgreSQL URL, required for the postgres backend
    /// - `GRAPH_BACKEND`: "memory", "neo4j" or "none" (default: memory)
    /// - `NEO4J_URI`, `NEO4J_USER`, `NEO4J_PASSWORD`: Neo4j connection (default URI: bolt://localhost:7687)
    /// - `MEMORY_SEED_PATH`: JSON fixture loaded into the in-memory stores
    /// - `CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `CONNECTION_RETRY_INTERVAL_SECS`: retry interval in seconds (default: 15)
    ///
    /// Service tunables are read by [`DeskConfig::from_env`].
    pub async fn new() -> Result<Self, ServiceError> {
        let server_addr: SocketAddr = env::var("SERVER_ADDR")
            .unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string())
            .parse()
            .map_err(|e| ServiceError::config(format!("Invalid SERVER_ADDR: {}", e)))?;
        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect());
        let store_backend = StoreBackend::from_env();
        let graph_backend = GraphBackend::from_env();
        let connection_mode = ConnectionMode::from_env();
        let retry_interval = Duration::from_secs(
            env::var("CONNECTION_RETRY_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_INTERVAL_SECS),
        );
        let config = DeskConfig::from_env();

        info!(
            server_addr = %server_addr,
            store_backend = ?store_backend,
            graph_backend = ?graph_backend,
            connection_mode = ?connection_mode,
            retry_interval_secs = retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let seed = if store_backend == StoreBackend::Memory || graph_backend == GraphBackend::Memory
        {
            Some(load_seed()?)
        } else {
            None
        };
        let (memory_records, memory_graph) = match seed {
            Some(seed) => {
                let (alerts, rules, changes, graph) = seed
                    .into_stores()
                    .map_err(|e| ServiceError::config(format!("Invalid memory seed: {}", e)))?;
                (Some((alerts, rules, changes)), Some(graph))
            }
            None => (None, None),
        };

        let (alerts, rules, changes): (Arc<dyn AlertStore>, Arc<dyn RuleStore>, Arc<dyn ChangeStore>) =
            match (store_backend, memory_records) {
                (StoreBackend::Memory, Some((alerts, rules, changes))) => {
                    (Arc::new(alerts), Arc::new(rules), Arc::new(changes))
                }
                (StoreBackend::Memory, None) => {
                    return Err(ServiceError::config("memory stores were not initialized"));
                }
                (StoreBackend::Postgres, _) => {
                    let url = env::var("DATABASE_URL").map_err(|_| {
                        ServiceError::config("DATABASE_URL is required for the postgres backend")
                    })?;
                    let pool = with_retry("PostgreSQL", connection_mode, retry_interval, || {
                        connect_postgres(&url)
                    })
                    .await?;
                    info!("PostgreSQL connection established");
                    (
                        Arc::new(PostgresAlertStore::new(pool.clone())),
                        Arc::new(PostgresRuleStore::new(pool.clone())),
                        Arc::new(PostgresChangeStore::new(pool)),
                    )
                }
            };

        let graph: Option<Arc<dyn GraphStore>> = match graph_backend {
            GraphBackend::Memory => {
                memory_graph.map(|graph| Arc::new(graph) as Arc<dyn GraphStore>)
            }
            GraphBackend::Neo4j => {
                let uri = env::var("NEO4J_URI").unwrap_or_else(|_| DEFAULT_NEO4J_URI.to_string());
                let user = env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".to_string());
                let password = env::var("NEO4J_PASSWORD").unwrap_or_else(|_| "neo4j".to_string());
                let store = with_retry("Neo4j", connection_mode, retry_interval, || {
                    std::future::ready(Neo4jGraphStore::new(&uri, &user, &password))
                })
                .await?;
                info!("Neo4j graph store ready");
                Some(Arc::new(store))
            }
            GraphBackend::Disabled => {
                warn!("No graph store configured, topology views are disabled");
                None
            }
        };

        let stores = Stores {
            alerts,
            rules,
            changes,
            graph,
        };
        Ok(Self {
            desk: Arc::new(Desk::new(stores, config)),
            server_addr,
            cors_origins,
        })
    }
}

fn load_seed() -> Result<MemorySeed, ServiceError> {
    match env::var("MEMORY_SEED_PATH") {
        Ok(path) => {
            let seed = MemorySeed::from_path(&path)
                .map_err(|e| ServiceError::config(format!("Failed to load seed: {}", e)))?;
            info!(
                path = %path,
                alerts = seed.alerts.len(),
                rules = seed.rules.len(),
                changes = seed.changes.len(),
                nodes = seed.nodes.len(),
                "Loaded memory seed"
            );
            Ok(seed)
        }
        Err(_) => {
            info!("MEMORY_SEED_PATH not set, starting with empty memory stores");
            Ok(MemorySeed::default())
        }
    }
}

async fn connect_postgres(url: &str) -> Result<PgPool, StoreError> {
    let pool = postgres::connect(url).await?;
    postgres::ensure_schema(&pool).await?;
    Ok(pool)
}

/// Run `connect` until it succeeds, or once when `mode` is fail-fast.
async fn with_retry<T, F, Fut>(
    backend: &str,
    mode: ConnectionMode,
    retry_interval: Duration,
    mut connect: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    loop {
        match connect().await {
            Ok(value) => return Ok(value),
            Err(e) => match mode {
                ConnectionMode::FailFast => {
                    return Err(ServiceError::config(format!(
                        "Failed to connect to {}: {}",
                        backend, e
                    )));
                }
                ConnectionMode::Retry => {
                    warn!(
                        backend = backend,
                        error = %e,
                        retry_interval_secs = retry_interval.as_secs(),
                        "Failed to connect, retrying..."
                    );
                    sleep(retry_interval).await;
                }
            },
        }
    }
}
