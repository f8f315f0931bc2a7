//! Per-connection state and queues.

use crate::message::Message;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// An unbounded FIFO queue with a single producer and a single consumer.
///
/// The `Notify` carries a stored permit, so a push that races the
/// consumer's wait is never lost.
#[derive(Debug, Default)]
struct Queue {
    items: Mutex<VecDeque<Message>>,
    ready: Notify,
}

impl Queue {
    fn push(&self, msg: Message) {
        self.items.lock().push_back(msg);
        self.ready.notify_one();
    }

    fn try_pop(&self) -> Option<Message> {
        self.items.lock().pop_front()
    }

    /// Wait for the oldest entry, or `None` once the session is cancelled.
    async fn pop(&self, cancel: &CancellationToken) -> Option<Message> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            if let Some(msg) = self.try_pop() {
                return Some(msg);
            }
            tokio::select! {
                _ = self.ready.notified() => {}
                _ = cancel.cancelled() => return None,
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

/// One connected client.
///
/// Identity is the process-unique `id`, never the handle: the handle is
/// mutable and only required to be unique among live sessions. The reader
/// task is the sole producer into `inbound`, the dispatcher the sole
/// consumer; the roles swap for `outbound`.
#[derive(Debug)]
pub struct Session {
    id: u64,
    handle: RwLock<String>,
    username: String,
    realname: String,
    host: String,
    inbound: Queue,
    outbound: Queue,
    /// Shared with the registry; armed on every inbound push so the
    /// dispatcher wakes no matter which session produced work.
    work_ready: Arc<Notify>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        handle: impl Into<String>,
        username: impl Into<String>,
        realname: impl Into<String>,
        host: impl Into<String>,
        work_ready: Arc<Notify>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            handle: RwLock::new(handle.into()),
            username: username.into(),
            realname: realname.into(),
            host: host.into(),
            inbound: Queue::default(),
            outbound: Queue::default(),
            work_ready,
            cancel: CancellationToken::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn handle(&self) -> String {
        self.handle.read().clone()
    }

    /// Mutate the handle. Callers must serialize the collision check and
    /// this write; the registry does so inside its critical section.
    pub fn rename(&self, new_handle: impl Into<String>) {
        *self.handle.write() = new_handle.into();
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn realname(&self) -> &str {
        &self.realname
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The user prefix the way IRC likes to see it: `nick!~user@host`.
    pub fn hostline(&self) -> String {
        format!("{}!~{}@{}", self.handle.read(), self.username, self.host)
    }

    /// Append to the inbound queue and wake the dispatcher. Never blocks.
    pub fn push_inbound(&self, msg: Message) {
        self.inbound.push(msg);
        self.work_ready.notify_one();
    }

    pub fn push_outbound(&self, msg: Message) {
        self.outbound.push(msg);
    }

    pub async fn pop_inbound(&self) -> Option<Message> {
        self.inbound.pop(&self.cancel).await
    }

    pub async fn pop_outbound(&self) -> Option<Message> {
        self.outbound.pop(&self.cancel).await
    }

    /// Non-blocking pop, used by the dispatcher's work scan.
    pub fn try_pop_inbound(&self) -> Option<Message> {
        self.inbound.try_pop()
    }

    pub fn try_pop_outbound(&self) -> Option<Message> {
        self.outbound.try_pop()
    }

    pub fn is_inbound_empty(&self) -> bool {
        self.inbound.is_empty()
    }

    pub fn is_outbound_empty(&self) -> bool {
        self.outbound.is_empty()
    }

    /// Cancel the transport tasks and unblock any queue wait. Idempotent.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}
