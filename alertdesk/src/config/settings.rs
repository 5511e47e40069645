//! Tunables shared by the core services.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Default budget for point lookups against the alert, rule and change stores.
const DEFAULT_POINT_TIMEOUT_MS: u64 = 5_000;

/// Default budget for graph traversals.
const DEFAULT_GRAPH_TIMEOUT_MS: u64 = 20_000;

/// Limits and time budgets for correlation, topology and RCA work.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    /// Maximum candidates fetched per rule evaluation.
    pub candidate_limit: usize,
    /// Hop bound of the neighborhood query behind the incident subgraph.
    pub subgraph_max_hops: u32,
    /// Hop bound of each shortest-path query.
    pub path_max_hops: u32,
    /// Hop bound of neighbor discovery for RCA and related changes.
    pub rca_max_hops: u32,
    /// Shortest-path queries kept in flight at once.
    pub path_concurrency: usize,
    /// Maximum change records overlaid on one alert.
    pub change_limit: usize,
    pub point_timeout: Duration,
    pub graph_timeout: Duration,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 50,
            subgraph_max_hops: 10,
            path_max_hops: 6,
            rca_max_hops: 6,
            path_concurrency: 8,
            change_limit: 100,
            point_timeout: Duration::from_millis(DEFAULT_POINT_TIMEOUT_MS),
            graph_timeout: Duration::from_millis(DEFAULT_GRAPH_TIMEOUT_MS),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = key, value = %raw, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

impl DeskConfig {
    /// Read tunables from the environment, falling back to defaults.
    ///
    /// # Environment Variables
    ///
    /// - `CANDIDATE_LIMIT` (default: 50)
    /// - `SUBGRAPH_MAX_HOPS` (default: 10)
    /// - `PATH_MAX_HOPS` (default: 6)
    /// - `RCA_MAX_HOPS` (default: 6)
    /// - `PATH_CONCURRENCY` (default: 8)
    /// - `CHANGE_LIMIT` (default: 100)
    /// - `POINT_TIMEOUT_MS` (default: 5000)
    /// - `GRAPH_TIMEOUT_MS` (default: 20000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            candidate_limit: env_or("CANDIDATE_LIMIT", defaults.candidate_limit),
            subgraph_max_hops: env_or("SUBGRAPH_MAX_HOPS", defaults.subgraph_max_hops),
            path_max_hops: env_or("PATH_MAX_HOPS", defaults.path_max_hops),
            rca_max_hops: env_or("RCA_MAX_HOPS", defaults.rca_max_hops),
            path_concurrency: env_or("PATH_CONCURRENCY", defaults.path_concurrency).max(1),
            change_limit: env_or("CHANGE_LIMIT", defaults.change_limit),
            point_timeout: Duration::from_millis(env_or(
                "POINT_TIMEOUT_MS",
                DEFAULT_POINT_TIMEOUT_MS,
            )),
            graph_timeout: Duration::from_millis(env_or(
                "GRAPH_TIMEOUT_MS",
                DEFAULT_GRAPH_TIMEOUT_MS,
            )),
        }
    }
}
