use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Public bootstrap peers. Recorded in the configuration and reported at
/// startup; the two-node flow never dials them.
pub const DEFAULT_BOOTSTRAP: [&str; 4] = [
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmQCU2EcMqAqQPR2i9bChDtGNJchTbq5TbXJJ16u19uLTa",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmbLHAnMoJPWSCR5Zhtx6BHJX9KiKNN6tpvbUcqanj75Nb",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmcZf59bWwK5XFi76CZX8cbJ4BhTzzA3gU1ZjYZcYW3dwt",
];

/// Configuration shared by every node a process creates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Listen address; `/memory/0` picks a free port.
    pub listen: String,
    /// Stable identity name. Each node derives its id from this name and its
    /// label. `None` gives every start a random identity.
    pub identity: Option<String>,
    /// Upper bound on a single link request, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Capacity of each node's inbound request queue.
    pub inbox_capacity: usize,
    /// Keep blocks fetched from peers in the local store.
    pub cache_fetched: bool,
    pub bootstrap: Vec<String>,
}

impl NodeConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: "/memory/0".into(),
            identity: None,
            fetch_timeout_ms: 5_000,
            inbox_capacity: 64,
            cache_fetched: true,
            bootstrap: DEFAULT_BOOTSTRAP.iter().map(|s| s.to_string()).collect(),
        }
    }
}
