//! Agent discovery contract
//!
//! Discovery itself lives in an external index; this crate only consumes a
//! candidate list, read-only. No matching or ranking happens here.

use async_trait::async_trait;
use paymesh_types::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// An agent candidate returned by the discovery index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCandidate {
    /// Agent identity (e.g. a DID)
    pub identity: String,
    /// Callable endpoint
    pub endpoint: String,
    /// Capability strings this agent advertises
    pub capabilities: Vec<String>,
}

/// Read-only view of the external discovery index
#[async_trait]
pub trait DiscoveryIndex: Send + Sync {
    /// Return candidates advertising the given capability
    async fn search(&self, capability: &str) -> Result<Vec<AgentCandidate>>;
}

/// In-memory index seeded with a static candidate list
///
/// Stands in for the real external index in the server wiring and in tests.
#[derive(Default)]
pub struct MemoryIndex {
    candidates: Arc<RwLock<Vec<AgentCandidate>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, candidate: AgentCandidate) {
        let mut candidates = self.candidates.write().await;
        candidates.retain(|c| c.identity != candidate.identity);
        candidates.push(candidate);
    }
}

#[async_trait]
impl DiscoveryIndex for MemoryIndex {
    async fn search(&self, capability: &str) -> Result<Vec<AgentCandidate>> {
        let candidates = self.candidates.read().await;
        Ok(candidates
            .iter()
            .filter(|c| c.capabilities.iter().any(|cap| cap == capability))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_filters_by_capability() {
        let index = MemoryIndex::new();
        index
            .register(AgentCandidate {
                identity: "did:mesh:bidder".to_string(),
                endpoint: "http://localhost:8002/bid".to_string(),
                capabilities: vec!["gov.rfp.bidder".to_string()],
            })
            .await;
        index
            .register(AgentCandidate {
                identity: "did:mesh:trader".to_string(),
                endpoint: "http://localhost:8003/trade".to_string(),
                capabilities: vec!["fin.defi.trade".to_string()],
            })
            .await;

        let hits = index.search("gov.rfp.bidder").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identity, "did:mesh:bidder");
        assert!(index.search("unknown.capability").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reregistration_replaces_candidate() {
        let index = MemoryIndex::new();
        let mut candidate = AgentCandidate {
            identity: "did:mesh:bidder".to_string(),
            endpoint: "http://localhost:8002/bid".to_string(),
            capabilities: vec!["gov.rfp.bidder".to_string()],
        };
        index.register(candidate.clone()).await;
        candidate.endpoint = "http://localhost:9002/bid".to_string();
        index.register(candidate).await;

        let hits = index.search("gov.rfp.bidder").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].endpoint, "http://localhost:9002/bid");
    }
}
