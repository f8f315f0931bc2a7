//! Process-wide server state: the session roster and the channel map.
//!
//! Every mutation runs inside one coarse critical section. Roster and
//! channel churn is rare next to message traffic, so a single lock is the
//! simple correct choice; the dispatcher never holds it across an await.

use crate::state::{Channel, Session};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    roster: Vec<Arc<Session>>,
    /// Keyed by uppercase-normalized channel name.
    channels: HashMap<String, Channel>,
}

/// The single owner of shared server state.
#[derive(Debug)]
pub struct Registry {
    name: String,
    motd: String,
    /// Armed by every inbound push on any session; awaited by the
    /// dispatcher when a full roster scan finds no pending work.
    work_ready: Arc<Notify>,
    inner: Mutex<Inner>,
}

fn normalize(channel: &str) -> String {
    channel.to_uppercase()
}

impl Registry {
    pub fn new(name: impl Into<String>, motd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            motd: motd.into(),
            work_ready: Arc::new(Notify::new()),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.name
    }

    pub fn motd(&self) -> &str {
        &self.motd
    }

    pub fn work_ready(&self) -> &Arc<Notify> {
        &self.work_ready
    }

    /// Add a session to the roster. Fails without side effects if the
    /// handle collides, case-insensitively, with any live session.
    pub fn register(&self, session: Arc<Session>) -> bool {
        let mut inner = self.inner.lock();
        let handle = session.handle();
        if inner
            .roster
            .iter()
            .any(|live| live.handle().eq_ignore_ascii_case(&handle))
        {
            return false;
        }
        inner.roster.push(session);
        true
    }

    /// Remove a session by identity, from the roster and from every
    /// channel's member list, so listings never show it again.
    pub fn unregister(&self, session: &Session) -> Option<Arc<Session>> {
        let mut inner = self.inner.lock();
        let at = inner
            .roster
            .iter()
            .position(|live| live.id() == session.id())?;
        let removed = inner.roster.remove(at);
        for channel in inner.channels.values_mut() {
            channel.part(session);
        }
        Some(removed)
    }

    /// Atomically check and change a session's handle. Fails if the new
    /// handle collides with any *other* live session; on success the
    /// handle is mutated in place before the lock is released, so two
    /// concurrent attempts can never both claim the same name.
    pub fn rename_handle(&self, new_handle: &str, session: &Session) -> bool {
        let inner = self.inner.lock();
        if inner
            .roster
            .iter()
            .any(|live| live.id() != session.id() && live.handle().eq_ignore_ascii_case(new_handle))
        {
            return false;
        }
        session.rename(new_handle);
        true
    }

    pub fn handle_exists(&self, handle: &str) -> bool {
        self.inner
            .lock()
            .roster
            .iter()
            .any(|live| live.handle().eq_ignore_ascii_case(handle))
    }

    /// Case-insensitive roster lookup, used for user-targeted PRIVMSG.
    pub fn find_by_handle(&self, handle: &str) -> Option<Arc<Session>> {
        self.inner
            .lock()
            .roster
            .iter()
            .find(|live| live.handle().eq_ignore_ascii_case(handle))
            .cloned()
    }

    pub fn channel_exists(&self, channel: &str) -> bool {
        self.inner.lock().channels.contains_key(&normalize(channel))
    }

    pub fn topic(&self, channel: &str) -> Option<String> {
        self.inner
            .lock()
            .channels
            .get(&normalize(channel))
            .map(|c| c.topic().to_string())
    }

    pub fn set_topic(&self, channel: &str, topic: &str) -> bool {
        match self.inner.lock().channels.get_mut(&normalize(channel)) {
            Some(c) => {
                c.set_topic(topic);
                true
            }
            None => {
                debug!(channel = %channel, "TOPIC set on nonexistent channel ignored");
                false
            }
        }
    }

    /// Create the channel with an empty topic if absent, then join.
    pub fn join_channel(&self, channel: &str, session: Arc<Session>) {
        let key = normalize(channel);
        self.inner
            .lock()
            .channels
            .entry(key.clone())
            .or_insert_with(|| Channel::new(key))
            .join(session);
    }

    /// Fails silently if the channel does not exist.
    pub fn part_channel(&self, channel: &str, session: &Session) {
        if let Some(c) = self.inner.lock().channels.get_mut(&normalize(channel)) {
            c.part(session);
        }
    }

    pub fn is_channel_member(&self, channel: &str, session: &Session) -> bool {
        self.inner
            .lock()
            .channels
            .get(&normalize(channel))
            .is_some_and(|c| c.is_member(session))
    }

    /// Snapshot of the channel membership; empty if the channel does not
    /// exist, never an error.
    pub fn channel_members(&self, channel: &str) -> Vec<Arc<Session>> {
        self.inner
            .lock()
            .channels
            .get(&normalize(channel))
            .map(|c| c.members())
            .unwrap_or_default()
    }

    /// Snapshot of the live roster for iteration.
    pub fn roster(&self) -> Vec<Arc<Session>> {
        self.inner.lock().roster.clone()
    }
}
