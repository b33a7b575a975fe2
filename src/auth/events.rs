// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Typed auth lifecycle events
//!
//! Listeners run synchronously, in registration order, on the task that
//! emits the event.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Error;
use crate::session::User;

/// Event names listeners subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Login,
    Logout,
    SessionRestored,
    Error,
    Debug,
}

/// Event with its payload
#[derive(Debug, Clone, Copy)]
pub enum AuthEvent<'a> {
    /// The client is usable
    Ready,
    /// A fresh login succeeded
    Login(&'a User),
    /// The session was dropped by `logout`
    Logout,
    /// A saved session was accepted by the server
    SessionRestored(&'a User),
    /// An auth flow failed
    Error(&'a Error),
    /// Diagnostic message
    Debug(&'a str),
}

impl AuthEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            AuthEvent::Ready => EventKind::Ready,
            AuthEvent::Login(_) => EventKind::Login,
            AuthEvent::Logout => EventKind::Logout,
            AuthEvent::SessionRestored(_) => EventKind::SessionRestored,
            AuthEvent::Error(_) => EventKind::Error,
            AuthEvent::Debug(_) => EventKind::Debug,
        }
    }
}

/// Event callback
pub type Listener = Arc<dyn Fn(&AuthEvent<'_>) + Send + Sync>;

/// Handle returned by `on`/`once`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Subscription {
    id: ListenerId,
    once: bool,
    listener: Listener,
}

/// Listener registry
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct EventManager {
    listeners: Arc<RwLock<HashMap<EventKind, Vec<Subscription>>>>,
    next_id: Arc<AtomicU64>,
    debug: Arc<AtomicBool>,
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let counts: HashMap<_, _> = listeners.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventManager")
            .field("listeners", &counts)
            .field("debug", &self.debug.load(Ordering::Relaxed))
            .finish()
    }
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every `kind` event
    pub fn on(
        &self,
        kind: EventKind,
        listener: impl Fn(&AuthEvent<'_>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.subscribe(kind, false, Arc::new(listener))
    }

    /// Subscribe to the next `kind` event only
    pub fn once(
        &self,
        kind: EventKind,
        listener: impl Fn(&AuthEvent<'_>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.subscribe(kind, true, Arc::new(listener))
    }

    fn subscribe(&self, kind: EventKind, once: bool, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(kind)
            .or_default()
            .push(Subscription { id, once, listener });
        id
    }

    /// Unsubscribe; returns whether the listener was registered
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        for subscriptions in listeners.values_mut() {
            if let Some(pos) = subscriptions.iter().position(|s| s.id == id) {
                subscriptions.remove(pos);
                return true;
            }
        }
        false
    }

    /// Dispatch an event; returns whether any listener ran
    pub fn emit(&self, event: &AuthEvent<'_>) -> bool {
        let kind = event.kind();
        let targets: Vec<Listener> = {
            let mut listeners = self.listeners.write();
            let Some(subscriptions) = listeners.get_mut(&kind) else {
                return false;
            };
            let targets = subscriptions.iter().map(|s| s.listener.clone()).collect();
            subscriptions.retain(|s| !s.once);
            targets
        };

        // listeners may subscribe or unsubscribe from inside the callback
        for listener in &targets {
            listener(event);
        }
        !targets.is_empty()
    }

    /// Emit a `Debug` event, also logged through tracing
    pub fn emit_debug(&self, message: &str) {
        if self.debug.load(Ordering::Relaxed) {
            tracing::info!(target: "ypareo::debug", "{}", message);
        } else {
            tracing::debug!("{}", message);
        }
        self.emit(&AuthEvent::Debug(message));
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }
}
