//! The protocol-translation worker.
//!
//! A single [`Dispatcher`] task pulls one pending inbound message at a
//! time, interprets it against the [`Registry`], and pushes the resulting
//! lines into the affected sessions' outbound queues. Commands never
//! overlap: all outbound effects of one command are enqueued before the
//! next command starts, so broadcasts never interleave.

use crate::message::Message;
use crate::proto::Command;
use crate::state::{Registry, Session};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Messages dispatched per roster member between keepalive sweeps.
///
/// The RFC lets a server periodically PING connected clients to find ones
/// worth dropping; the threshold scales with the roster so a busy server
/// pings no more often than a quiet one.
const KEEPALIVE_PER_USER: usize = 11;

/// The single consumer of every session's inbound queue.
pub struct Dispatcher {
    registry: Arc<Registry>,
    /// Round-robin position in the roster, advanced past each served
    /// session so a burst from one client cannot starve the others.
    cursor: usize,
    /// Messages dispatched since the last keepalive sweep.
    dispatched: usize,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            cursor: 0,
            dispatched: 0,
        }
    }

    /// Run forever. One iteration = one dispatch cycle.
    pub async fn run(mut self) {
        loop {
            self.cycle().await;
        }
    }

    /// Find one pending inbound message, execute it fully, then check the
    /// keepalive cadence.
    async fn cycle(&mut self) {
        let msg = self.next_work().await;
        self.execute(&msg);

        self.dispatched += 1;
        if self.dispatched > KEEPALIVE_PER_USER * self.registry.roster().len() {
            self.dispatched = 0;
            self.ping_all();
        }
    }

    /// Event-driven work discovery: scan one rotation of the roster, and
    /// if nothing is pending, sleep until any session pushes inbound. The
    /// registry's `Notify` stores a permit, so a push racing the scan
    /// completes the wait immediately instead of being lost.
    async fn next_work(&mut self) -> Message {
        loop {
            if let Some(msg) = self.find_work() {
                return msg;
            }
            self.registry.work_ready().notified().await;
        }
    }

    fn find_work(&mut self) -> Option<Message> {
        let roster = self.registry.roster();
        if roster.is_empty() {
            return None;
        }
        let start = self.cursor % roster.len();
        for offset in 0..roster.len() {
            let at = (start + offset) % roster.len();
            if let Some(msg) = roster[at].try_pop_inbound() {
                self.cursor = at + 1;
                return Some(msg);
            }
        }
        None
    }

    /// Interpret one inbound line. A malformed line is a logged no-op;
    /// the loop's liveness survives anything a client sends.
    fn execute(&mut self, msg: &Message) {
        let Some(sender) = msg.session().cloned() else {
            return;
        };

        match Command::parse(msg.line()) {
            Ok(Some(command)) => self.dispatch(command, sender),
            Ok(None) => {
                trace!(handle = %sender.handle(), line = %msg.line(), "ignoring unknown command");
            }
            Err(error) => {
                debug!(handle = %sender.handle(), line = %msg.line(), error = %error,
                    "dropping malformed line");
            }
        }
    }

    fn dispatch(&mut self, command: Command, sender: Arc<Session>) {
        match command {
            Command::Privmsg { target, text } => self.privmsg(&sender, &target, &text),
            Command::WelcomeMsg => self.welcome(&sender),
            Command::Join { channel } => self.join(&sender, &channel),
            Command::Topic { channel, text } => self.topic(&sender, &channel, text.as_deref()),
            Command::Who { channel } => self.who(&sender, &channel),
            Command::Names { channel } => self.names(&sender, &channel),
            Command::Ping { token } => self.pong(&sender, &token),
            Command::Quit { reason } => self.quit(&sender, reason.as_deref()),
            Command::Motd => self.motd(&sender),
            Command::Part { channel } => self.part(&sender, &channel),
            Command::Nick { nick } => self.nick(&sender, &nick),
        }
    }

    fn server_name(&self) -> &str {
        self.registry.server_name()
    }

    /// Reply 001, sent once right after registration.
    fn welcome(&self, sender: &Arc<Session>) {
        let name = self.server_name();
        let line = format!(
            ":{name} 001 {handle} :Welcome to the {name} IRC server, {handle}!",
            handle = sender.handle(),
        );
        sender.push_outbound(Message::new(sender.clone(), line));
    }

    /// Replies 375/372/376 as one multi-segment message.
    fn motd(&self, sender: &Arc<Session>) {
        let name = self.server_name();
        let handle = sender.handle();
        let line = format!(
            ":{name} 375 {handle} :- {name} Message Of The Day -\n\
             :{name} 372 {handle} :- {motd}\n\
             :{name} 376 {handle} :- END /MOTD",
            motd = self.registry.motd(),
        );
        sender.push_outbound(Message::new(sender.clone(), line));
    }

    fn pong(&self, sender: &Arc<Session>, token: &str) {
        let name = self.server_name();
        let line = format!(":{name} PONG {name} {token}");
        sender.push_outbound(Message::new(sender.clone(), line));
    }

    /// Atomic rename. On success the change is announced to the whole
    /// roster under the pre-rename prefix; a conflict stays silent toward
    /// the requester.
    fn nick(&self, sender: &Arc<Session>, new_nick: &str) {
        let old_hostline = sender.hostline();
        if !self.registry.rename_handle(new_nick, sender) {
            debug!(handle = %sender.handle(), requested = %new_nick, "nick already in use");
            return;
        }
        info!(old = %old_hostline, new = %new_nick, "nick changed");
        let line = format!(":{old_hostline} NICK :{new_nick}");
        for member in self.registry.roster() {
            member.push_outbound(Message::new(member.clone(), line.clone()));
        }
    }

    /// Join (creating the channel if needed), echo JOIN to every member,
    /// and queue synthetic NAMES/TOPIC commands so the joiner gets an
    /// automatic listing and topic reply.
    fn join(&self, sender: &Arc<Session>, channel: &str) {
        self.registry.join_channel(channel, sender.clone());
        info!(handle = %sender.handle(), channel = %channel, "joined");

        let line = format!(":{} JOIN :{channel}", sender.hostline());
        for member in self.registry.channel_members(channel) {
            if member.id() == sender.id() {
                member.push_inbound(Message::new(member.clone(), format!("NAMES {channel}")));
                member.push_inbound(Message::new(member.clone(), format!("TOPIC {channel}")));
            }
            member.push_outbound(Message::new(member.clone(), line.clone()));
        }
    }

    /// Broadcast before removal, so the leaver still sees their own PART.
    /// Leaving a channel you are not in is a silent no-op.
    fn part(&self, sender: &Arc<Session>, channel: &str) {
        if !self.registry.is_channel_member(channel, sender) {
            debug!(handle = %sender.handle(), channel = %channel, "PART without membership ignored");
            return;
        }
        let line = format!(":{} PART {channel}", sender.hostline());
        for member in self.registry.channel_members(channel) {
            member.push_outbound(Message::new(member.clone(), line.clone()));
        }
        self.registry.part_channel(channel, sender);
        info!(handle = %sender.handle(), channel = %channel, "parted");
    }

    /// With text: set and broadcast to the membership. Without: reply 332
    /// to the sender. Nonexistent channels are ignored either way.
    fn topic(&self, sender: &Arc<Session>, channel: &str, text: Option<&str>) {
        match text {
            Some(text) => {
                if !self.registry.set_topic(channel, text) {
                    return;
                }
                let line = format!(":{} TOPIC {channel} {text}", sender.hostline());
                for member in self.registry.channel_members(channel) {
                    member.push_outbound(Message::new(member.clone(), line.clone()));
                }
            }
            None => {
                let Some(topic) = self.registry.topic(channel) else {
                    debug!(channel = %channel, "TOPIC query for nonexistent channel ignored");
                    return;
                };
                let line = format!(
                    ":{name} 332 {handle} {channel} {topic}",
                    name = self.server_name(),
                    handle = sender.handle(),
                );
                sender.push_outbound(Message::new(sender.clone(), line));
            }
        }
    }

    /// Replies 353/366: the brief, space-joined member listing.
    fn names(&self, sender: &Arc<Session>, channel: &str) {
        let name = self.server_name();
        let handle = sender.handle();
        let listing: String = self
            .registry
            .channel_members(channel)
            .iter()
            .map(|member| format!("{} ", member.handle()))
            .collect();
        let line = format!(
            ":{name} 353 {handle} = {channel} :{listing}\n\
             :{name} 366 {handle} {channel} :End of /NAMES list",
        );
        sender.push_outbound(Message::new(sender.clone(), line));
    }

    /// Replies 352/315: one detail line per member.
    fn who(&self, sender: &Arc<Session>, channel: &str) {
        let name = self.server_name();
        let handle = sender.handle();
        let mut line = String::new();
        for member in self.registry.channel_members(channel) {
            line.push_str(&format!(
                ":{name} 352 {handle} {channel} {username} {host} {name} {member} H :0 {realname}\n",
                username = member.username(),
                host = member.host(),
                member = member.handle(),
                realname = member.realname(),
            ));
        }
        line.push_str(&format!(":{name} 315 {handle} {channel} :End of /WHO list"));
        sender.push_outbound(Message::new(sender.clone(), line));
    }

    /// Channel targets fan out to every member but the sender; user
    /// targets deliver to exactly one session, found case-insensitively.
    /// Unknown targets are dropped without a reply.
    fn privmsg(&self, sender: &Arc<Session>, target: &str, text: &str) {
        if target.contains('#') {
            let line = format!(":{} PRIVMSG {target} :{text}", sender.hostline());
            for member in self.registry.channel_members(target) {
                if member.id() == sender.id() {
                    continue;
                }
                member.push_outbound(Message::new(member.clone(), line.clone()));
            }
        } else if let Some(peer) = self.registry.find_by_handle(target) {
            let line = format!(":{} PRIVMSG {target} :{text}", sender.handle());
            peer.push_outbound(Message::new(peer.clone(), line));
        } else {
            debug!(target = %target, "PRIVMSG to unknown handle dropped");
        }
    }

    /// Tell everybody on the server that the user quit, then tear the
    /// session down. Broadcasting to the full roster rather than only
    /// shared channels is a deliberate simplification.
    fn quit(&self, sender: &Arc<Session>, reason: Option<&str>) {
        let line = format!(
            ":{} QUIT :{}",
            sender.hostline(),
            reason.unwrap_or_default()
        );
        for member in self.registry.roster() {
            member.push_outbound(Message::new(member.clone(), line.clone()));
        }
        self.registry.unregister(sender);
        sender.disconnect();
        info!(handle = %sender.handle(), "quit");
    }

    /// Keepalive sweep: one server-synthesized PING per live session.
    fn ping_all(&self) {
        let line = format!("PING :{}", self.server_name());
        for member in self.registry.roster() {
            member.push_outbound(Message::server(line.clone()));
        }
    }
}
