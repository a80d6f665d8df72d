//! Stale-hold reaper - the dead man's switch
//!
//! A hold that nobody finalized within the TTL is released so the payer's
//! funds never stay reserved indefinitely. The sweep is a partial-failure
//! tolerant batch job: one stuck hold never blocks the rest. Scheduling is
//! external (a cron trigger hitting the authenticated sweep endpoint).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use paymesh_types::CancelReason;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::EscrowFlow;

/// Default hold TTL: 72 hours
pub const DEFAULT_HOLD_TTL_SECS: u64 = 72 * 3600;

/// Result of one sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Holds released this sweep
    pub released: usize,
    pub errors: Vec<String>,
}

/// Releases holds that outlived their TTL
#[derive(Clone)]
pub struct StaleHoldReaper {
    flow: Arc<EscrowFlow>,
}

impl StaleHoldReaper {
    pub fn new(flow: Arc<EscrowFlow>) -> Self {
        Self { flow }
    }

    /// Cancel every open hold older than `ttl` as CANCELLED_TIMEOUT
    pub async fn sweep(&self, ttl: std::time::Duration) -> SweepReport {
        self.sweep_at(Utc::now(), ttl).await
    }

    async fn sweep_at(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> SweepReport {
        let ttl = Duration::from_std(ttl).unwrap_or(Duration::MAX);
        let stale = self.flow.stale_holds(now, ttl).await;

        let mut released = 0;
        let mut errors = Vec::new();
        for hold_id in stale {
            match self.flow.cancel(&hold_id, CancelReason::Timeout).await {
                Ok(_) => {
                    released += 1;
                    info!(hold_id = %hold_id, "released stale hold");
                }
                Err(e) => {
                    let message = format!("failed to release hold {hold_id}: {e}");
                    error!("{message}");
                    errors.push(message);
                }
            }
        }

        SweepReport { released, errors }
    }
}
