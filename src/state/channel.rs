//! A named, many-member broadcast group.

use crate::state::Session;
use std::sync::Arc;

/// Channel state, owned by the registry and mutated only inside its
/// critical section. Members are kept in join order; a channel is created
/// on first JOIN and never removed, even once empty.
#[derive(Debug)]
pub struct Channel {
    name: String,
    topic: String,
    members: Vec<Arc<Session>>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: String::new(),
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
    }

    /// Add a member. Joining twice is a no-op, not an error.
    pub fn join(&mut self, session: Arc<Session>) {
        if !self.is_member(&session) {
            self.members.push(session);
        }
    }

    /// Remove a member; no-op if absent.
    pub fn part(&mut self, session: &Session) {
        self.members.retain(|member| member.id() != session.id());
    }

    pub fn is_member(&self, session: &Session) -> bool {
        self.members.iter().any(|member| member.id() == session.id())
    }

    /// Stable snapshot of the membership for iteration.
    pub fn members(&self) -> Vec<Arc<Session>> {
        self.members.clone()
    }
}
