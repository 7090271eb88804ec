//! Tracking a submitted anchor transaction to finality.
//!
//! [`AnchorTracker::start`] spawns one polling task per transaction. The task
//! queries the ledger status source immediately and then once per
//! [`TrackerConfig::poll_interval`], awaiting each answer before scheduling
//! the next, so at most one query is ever in flight for a record.
//!
//! Transport errors never move the state; they are reported as
//! [`AnchorEvent::TransportError`] and the next tick retries. Cancellation
//! (explicit via [`AnchorHandle::cancel`], or by dropping the handle) stops
//! the loop and discards any answer still in flight.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ownmark_core::anchor::{AnchorTracker, TrackerConfig};
//! use ownmark_core::service::ExplorerStatusClient;
//!
//! # async fn example() -> ownmark_core::Result<()> {
//! let source = Arc::new(ExplorerStatusClient::new()?);
//! let tracker = AnchorTracker::new(source, TrackerConfig::default());
//! let mut handle = tracker.start("0x5c50...2060", None)?;
//! let record = handle.wait_terminal().await;
//! println!("{} is {}", record.tx_hash, record.status);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::{AnchorRecord, AnchorStatus, TxHash};
use crate::error::{OwnmarkError, Result};
use crate::service::LedgerStatusSource;

/// Default delay between two status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for anchor tracking.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Delay between the end of one status query and the start of the next.
    pub poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: std::env::var("OWNMARK_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        }
    }
}

/// Outcome of one poll tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorEvent {
    /// The status source answered; the record now has this status.
    Status(AnchorStatus),
    /// The query failed in transit. The record is unchanged.
    TransportError(String),
}

/// Starts polling tasks against a shared ledger status source.
#[derive(Clone)]
pub struct AnchorTracker {
    source: Arc<dyn LedgerStatusSource>,
    config: TrackerConfig,
}

impl AnchorTracker {
    pub fn new(source: Arc<dyn LedgerStatusSource>, config: TrackerConfig) -> Self {
        Self { source, config }
    }

    /// Begin tracking a submitted transaction.
    ///
    /// The hash is normalized to its `0x` form and the record moves to
    /// [`AnchorStatus::Pending`]. Must be called within a tokio runtime.
    pub fn start(&self, tx_hash: &str, known_block: Option<u64>) -> Result<AnchorHandle> {
        let tx_hash = TxHash::parse(tx_hash).ok_or_else(|| {
            OwnmarkError::InvalidInput(format!("invalid transaction hash: {tx_hash:?}"))
        })?;
        Ok(self.track(AnchorRecord::new(tx_hash, known_block)))
    }

    /// Begin tracking an existing record. Terminal records are not polled.
    #[instrument(level = "debug", skip_all, fields(
        tx_hash = %record.tx_hash,
        source = self.source.source_name(),
        interval_ms = self.config.poll_interval.as_millis() as u64
    ))]
    pub fn track(&self, mut record: AnchorRecord) -> AnchorHandle {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        if !record.is_terminal() {
            record.status = AnchorStatus::Pending;
        }
        let terminal = record.is_terminal();
        let (state_tx, state_rx) = watch::channel(record);

        let task = if terminal {
            debug!("Record already final, not polling");
            None
        } else {
            let poller = Poller {
                source: Arc::clone(&self.source),
                interval: self.config.poll_interval,
                state: state_tx,
                events: events_tx,
            };
            Some(tokio::spawn(poller.run(cancel_rx)))
        };

        AnchorHandle {
            state: state_rx,
            events: events_rx,
            cancel: Some(cancel_tx),
            task,
        }
    }
}

/// Owner's view of one tracked anchor. Dropping it cancels polling.
pub struct AnchorHandle {
    state: watch::Receiver<AnchorRecord>,
    events: mpsc::UnboundedReceiver<AnchorEvent>,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl AnchorHandle {
    /// Snapshot of the record as last observed.
    pub fn record(&self) -> AnchorRecord {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> AnchorStatus {
        self.state.borrow().status
    }

    /// Next poll outcome, or `None` once polling has ended and all events
    /// were delivered.
    pub async fn next_event(&mut self) -> Option<AnchorEvent> {
        self.events.recv().await
    }

    /// Wait until the record reaches a terminal status, or polling stops.
    pub async fn wait_terminal(&mut self) -> AnchorRecord {
        loop {
            if self.state.borrow_and_update().is_terminal() {
                break;
            }
            if self.state.changed().await.is_err() {
                break;
            }
        }
        self.record()
    }

    /// Stop polling and return the last observed record.
    ///
    /// An answer still in flight is discarded; the observed status is never
    /// changed by cancelling.
    pub async fn cancel(mut self) -> AnchorRecord {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Anchor poll task ended abnormally");
            }
        }
        self.record()
    }
}

struct Poller {
    source: Arc<dyn LedgerStatusSource>,
    interval: Duration,
    state: watch::Sender<AnchorRecord>,
    events: mpsc::UnboundedSender<AnchorEvent>,
}

impl Poller {
    async fn run(self, mut cancel: oneshot::Receiver<()>) {
        let tx_hash = self.state.borrow().tx_hash.clone();
        let mut tick: u64 = 0;

        loop {
            tick += 1;
            // Cancellation wins over an answer that arrives in the same poll.
            let outcome = tokio::select! {
                biased;
                _ = &mut cancel => {
                    debug!(tx_hash = %tx_hash, tick, "Anchor tracking cancelled");
                    return;
                }
                outcome = self.source.receipt_status(&tx_hash) => outcome,
            };

            match outcome {
                Ok(receipt) => {
                    let status = receipt.to_anchor_status();
                    self.state.send_modify(|record| record.status = status);
                    let _ = self.events.send(AnchorEvent::Status(status));

                    if status.is_terminal() {
                        info!(tx_hash = %tx_hash, status = %status, tick, "Anchor reached final status");
                        return;
                    }
                    debug!(tx_hash = %tx_hash, tick, "Anchor still pending");
                }
                Err(e) => {
                    warn!(tx_hash = %tx_hash, error = %e, tick, "Status query failed, retrying next tick");
                    let _ = self.events.send(AnchorEvent::TransportError(e.to_string()));
                }
            }

            tokio::select! {
                biased;
                _ = &mut cancel => {
                    debug!(tx_hash = %tx_hash, tick, "Anchor tracking cancelled");
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
