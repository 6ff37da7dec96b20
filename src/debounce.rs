//! Per-channel debounce core.
//!
//! Collapses a burst of qualifying inbound events on one channel into a
//! single delayed acknowledgment, timed from the last event in the burst.
//! The registry of pending timers is an owned object constructed per
//! scheduler instance, reachable only through [`AckScheduler`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error};

use crate::sender::RetryingSender;
use crate::types::ChannelId;

/// Debounce settings.
#[derive(Debug, Clone)]
pub struct DebounceConfig {
    /// Quiet period after the last event before the acknowledgment fires.
    pub delay: Duration,

    /// Acknowledgment text delivered when the timer fires.
    pub ack_text: String,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(5000),
            ack_text: "Acknowledged ✅".to_string(),
        }
    }
}

/// One pending acknowledgment timer. At most one exists per channel.
struct PendingAck {
    handle: JoinHandle<()>,
    seq: u64,
    #[allow(dead_code)]
    scheduled_at: Instant,
}

struct Inner {
    pending: Mutex<HashMap<ChannelId, PendingAck>>,
    // Distinguishes a timer from its replacement for the same key, so a
    // firing timer only ever removes its own registry entry.
    next_seq: std::sync::atomic::AtomicU64,
    config: DebounceConfig,
    sender: Arc<RetryingSender>,
}

/// Debounce scheduler: one pending acknowledgment timer per channel,
/// cancel-and-replace on every new qualifying event.
#[derive(Clone)]
pub struct AckScheduler {
    inner: Arc<Inner>,
}

impl AckScheduler {
    pub fn new(sender: Arc<RetryingSender>, config: DebounceConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(HashMap::new()),
                next_seq: std::sync::atomic::AtomicU64::new(0),
                config,
                sender,
            }),
        }
    }

    /// Record a qualifying event for `channel`.
    ///
    /// Cancels any pending timer for the key and arms a fresh one; the
    /// cancel and the replace happen under one registry lock, so later
    /// events observe them atomically. A superseded timer never fires its
    /// side effect; a timer that has already fired (removed its entry) can
    /// no longer be cancelled, so an in-flight delivery is never aborted.
    pub async fn on_message_event(&self, channel: ChannelId) {
        let inner = self.inner.clone();
        let seq = inner
            .next_seq
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let mut pending = inner.pending.lock().await;

        if let Some(previous) = pending.remove(&channel) {
            previous.handle.abort();
            debug!(channel = %channel, "debounce timer reset");
        } else {
            debug!(channel = %channel, "debounce timer armed");
        }

        let task_inner = self.inner.clone();
        let task_channel = channel.clone();
        let handle = tokio::spawn(async move {
            sleep(task_inner.config.delay).await;

            // Fire-and-remove: drop our registry entry first so the entry
            // cannot outlive the timer, then deliver outside the lock.
            {
                let mut pending = task_inner.pending.lock().await;
                match pending.get(&task_channel) {
                    Some(entry) if entry.seq == seq => {
                        pending.remove(&task_channel);
                    }
                    // Superseded between wake-up and lock acquisition.
                    _ => return,
                }
            }

            let outcome = task_inner
                .sender
                .send(&task_channel, &task_inner.config.ack_text)
                .await;

            // The debounce window for this burst is closed either way; a
            // failed acknowledgment is logged and dropped, never re-armed.
            if let Err(err) = outcome {
                error!(
                    channel = %task_channel,
                    error = %err,
                    "acknowledgment delivery failed after retries"
                );
            }
        });

        pending.insert(
            channel,
            PendingAck {
                handle,
                seq,
                scheduled_at: Instant::now(),
            },
        );
    }

    /// Number of channels with a pending acknowledgment.
    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.len()
    }
}
