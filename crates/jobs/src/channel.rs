// crates/jobs/src/channel.rs
//! Single-writer, multi-reader progress channel for one job.
//!
//! Every subscriber owns an unbounded queue, so a slow or stalled viewer never
//! blocks the job or other viewers. Queues whose receiver has gone away are
//! pruned on the next publish.

use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;

use crate::types::{JobId, Message};

/// Fan-out channel carrying a job's progress messages.
///
/// Subscribers only see messages published after they subscribe. The write
/// side (`publish` / `close`) is crate-private: the runner publishes and the
/// registry closes.
#[derive(Debug)]
pub struct BroadcastChannel {
    job_id: JobId,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    subscribers: Vec<mpsc::UnboundedSender<Message>>,
    closed: bool,
}

impl BroadcastChannel {
    /// Create an empty channel with no subscribers and no history.
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Attach a new reader starting at "now". Never blocks.
    ///
    /// On a channel that has already ended the subscription yields
    /// `EndOfStream` immediately, so the reader is never left waiting.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if inner.closed {
            let _ = tx.send(Message::EndOfStream);
        } else {
            inner.subscribers.push(tx);
        }
        tracing::debug!(
            job_id = self.job_id,
            subscribers = inner.subscribers.len(),
            "subscription attached"
        );
        Subscription { job_id: self.job_id, rx }
    }

    /// Deliver a payload to every live subscription. Returns how many
    /// subscriptions received it.
    pub(crate) fn publish(&self, payload: impl Into<String>) -> usize {
        let mut inner = self.lock();
        if inner.closed {
            tracing::warn!(job_id = self.job_id, "publish after end of stream ignored");
            return 0;
        }
        let message = Message::Payload(payload.into());
        inner
            .subscribers
            .retain(|tx| tx.send(message.clone()).is_ok());
        inner.subscribers.len()
    }

    /// Publish `EndOfStream` and release every subscriber queue sender.
    ///
    /// Returns `false` if the channel was already closed; the sentinel is
    /// never published twice.
    pub(crate) fn close(&self) -> bool {
        let mut inner = self.lock();
        if inner.closed {
            return false;
        }
        inner.closed = true;
        for tx in inner.subscribers.drain(..) {
            let _ = tx.send(Message::EndOfStream);
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of attached subscriptions whose reader is still alive.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| {
            tracing::error!(job_id = self.job_id, "channel mutex poisoned, recovering");
            PoisonError::into_inner(e)
        })
    }
}

/// A reader's independent cursor into a [`BroadcastChannel`].
///
/// Dropping the subscription releases its queue; the channel forgets it on
/// the next publish.
#[derive(Debug)]
pub struct Subscription {
    job_id: JobId,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Subscription {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Wait for the next message.
    ///
    /// Yields payloads in publish order, then `EndOfStream` exactly once,
    /// then `None` on every later call without blocking.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

impl Stream for Subscription {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        self.rx.poll_recv(cx)
    }
}
