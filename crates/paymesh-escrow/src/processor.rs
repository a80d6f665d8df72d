//! Payment processor contract
//!
//! The real processor lives outside this system; EscrowFlow consumes it only
//! through this trait. Every call is an I/O suspension point and is treated
//! as non-retriable within a single operation - silent retries on capture
//! risk duplicate capture.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use paymesh_types::{PayMeshError, Result};
use rand::Rng;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A hold freshly opened at the processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorHold {
    /// Processor-side intent id; becomes our hold id
    pub hold_id: String,
    /// Secret the payer's client uses to confirm the hold
    pub client_secret: String,
    /// Whether the processor confirmed two-phase (manual) capture
    pub manual_capture: bool,
}

/// Processor-side state of a hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorHoldState {
    /// Funds reserved, capture pending
    RequiresCapture,
    /// Funds irreversibly transferred
    Captured,
    /// Hold released
    Cancelled,
}

/// External payment processor
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Open a hold for `amount` with manual (two-phase) capture
    async fn create_hold(&self, amount: Decimal) -> Result<ProcessorHold>;

    /// Capture previously held funds - irreversible
    async fn capture(&self, hold_id: &str) -> Result<()>;

    /// Release a hold without capturing
    async fn cancel(&self, hold_id: &str) -> Result<()>;

    /// Query the processor-side state of a hold (reconciliation)
    async fn hold_state(&self, hold_id: &str) -> Result<ProcessorHoldState>;
}

/// In-memory processor
///
/// Stands in for the external processor in the server wiring and in tests.
/// Counts capture/cancel calls so exactly-once properties are observable.
pub struct MemoryProcessor {
    intents: Arc<RwLock<HashMap<String, ProcessorHoldState>>>,
    capture_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
    fail_captures: AtomicBool,
    manual_capture: bool,
}

impl MemoryProcessor {
    pub fn new() -> Self {
        Self {
            intents: Arc::new(RwLock::new(HashMap::new())),
            capture_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
            fail_captures: AtomicBool::new(false),
            manual_capture: true,
        }
    }

    /// A processor that ignores the manual-capture request - used to prove
    /// the flow fails closed
    pub fn auto_capture_only() -> Self {
        Self {
            manual_capture: false,
            ..Self::new()
        }
    }

    /// Make subsequent capture calls fail
    pub fn set_fail_captures(&self, fail: bool) {
        self.fail_captures.store(fail, Ordering::SeqCst);
    }

    pub fn capture_calls(&self) -> usize {
        self.capture_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

impl Default for MemoryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProcessor for MemoryProcessor {
    async fn create_hold(&self, _amount: Decimal) -> Result<ProcessorHold> {
        let hold_id = format!("pi_{}", Uuid::new_v4().simple());
        let secret: [u8; 16] = rand::thread_rng().gen();
        let client_secret = format!("{hold_id}_secret_{}", hex::encode(secret));

        self.intents
            .write()
            .await
            .insert(hold_id.clone(), ProcessorHoldState::RequiresCapture);

        Ok(ProcessorHold {
            hold_id,
            client_secret,
            manual_capture: self.manual_capture,
        })
    }

    async fn capture(&self, hold_id: &str) -> Result<()> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_captures.load(Ordering::SeqCst) {
            return Err(PayMeshError::ProcessorError {
                message: format!("capture declined for {hold_id}"),
            });
        }

        let mut intents = self.intents.write().await;
        match intents.get_mut(hold_id) {
            Some(state @ ProcessorHoldState::RequiresCapture) => {
                *state = ProcessorHoldState::Captured;
                Ok(())
            }
            Some(ProcessorHoldState::Captured) => Err(PayMeshError::ProcessorError {
                message: format!("{hold_id} already captured"),
            }),
            Some(ProcessorHoldState::Cancelled) => Err(PayMeshError::ProcessorError {
                message: format!("{hold_id} already cancelled"),
            }),
            None => Err(PayMeshError::ProcessorError {
                message: format!("no such intent: {hold_id}"),
            }),
        }
    }

    async fn cancel(&self, hold_id: &str) -> Result<()> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);

        let mut intents = self.intents.write().await;
        match intents.get_mut(hold_id) {
            Some(state @ ProcessorHoldState::RequiresCapture) => {
                *state = ProcessorHoldState::Cancelled;
                Ok(())
            }
            // Cancelling twice is absorbed processor-side
            Some(ProcessorHoldState::Cancelled) => Ok(()),
            Some(ProcessorHoldState::Captured) => Err(PayMeshError::ProcessorError {
                message: format!("{hold_id} already captured"),
            }),
            None => Err(PayMeshError::ProcessorError {
                message: format!("no such intent: {hold_id}"),
            }),
        }
    }

    async fn hold_state(&self, hold_id: &str) -> Result<ProcessorHoldState> {
        self.intents
            .read()
            .await
            .get(hold_id)
            .copied()
            .ok_or_else(|| PayMeshError::ProcessorError {
                message: format!("no such intent: {hold_id}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_hold_lifecycle() {
        let processor = MemoryProcessor::new();
        let hold = processor.create_hold(dec!(500.00)).await.unwrap();
        assert!(hold.manual_capture);
        assert!(hold.client_secret.starts_with(&hold.hold_id));

        assert_eq!(
            processor.hold_state(&hold.hold_id).await.unwrap(),
            ProcessorHoldState::RequiresCapture
        );
        processor.capture(&hold.hold_id).await.unwrap();
        assert_eq!(
            processor.hold_state(&hold.hold_id).await.unwrap(),
            ProcessorHoldState::Captured
        );
    }

    #[tokio::test]
    async fn test_double_capture_rejected() {
        let processor = MemoryProcessor::new();
        let hold = processor.create_hold(dec!(1.00)).await.unwrap();
        processor.capture(&hold.hold_id).await.unwrap();
        assert!(processor.capture(&hold.hold_id).await.is_err());
        assert_eq!(processor.capture_calls(), 2);
    }

    #[tokio::test]
    async fn test_cancel_is_absorbed_twice() {
        let processor = MemoryProcessor::new();
        let hold = processor.create_hold(dec!(1.00)).await.unwrap();
        processor.cancel(&hold.hold_id).await.unwrap();
        processor.cancel(&hold.hold_id).await.unwrap();
        assert_eq!(
            processor.hold_state(&hold.hold_id).await.unwrap(),
            ProcessorHoldState::Cancelled
        );
    }
}
