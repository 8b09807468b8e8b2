use serde::Serialize;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Write kind attempted against the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOp {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for WriteOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteOp::Create => f.write_str("create"),
            WriteOp::Update => f.write_str("update"),
            WriteOp::Delete => f.write_str("delete"),
        }
    }
}

/// A rejected write, described well enough to debug the denial: the resource
/// path, the operation, and (for create/update) the payload the store turned
/// away. This is a message value carried on the [`ErrorEmitter`], not an error
/// type for normal control flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionError {
    pub path: String,
    pub operation: WriteOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl std::fmt::Display for PermissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} denied at {}", self.operation, self.path)
    }
}

type Listener = Box<dyn Fn(&PermissionError) + Send>;

/// Handle returned by [`ErrorEmitter::subscribe`]; pass it back to
/// [`ErrorEmitter::unsubscribe`] when the consumer goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

/// Publish/subscribe channel for permission denials. Constructed once and
/// handed to whatever needs it; there is no global instance. `emit` invokes
/// every current listener synchronously in subscription order and holds no
/// queue, so an event with zero listeners is simply dropped.
#[derive(Clone, Default)]
pub struct ErrorEmitter {
    inner: Arc<Mutex<EmitterInner>>,
}

#[derive(Default)]
struct EmitterInner {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

impl ErrorEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriberId
    where
        F: Fn(&PermissionError) + Send + 'static,
    {
        let mut inner = self.inner.lock().expect("emitter lock");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Box::new(listener)));
        SubscriberId(id)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.lock().expect("emitter lock");
        inner.listeners.retain(|(listener_id, _)| *listener_id != id.0);
    }

    /// Listeners run under the emitter lock and must not call back into the
    /// emitter.
    pub fn emit(&self, error: &PermissionError) {
        let inner = self.inner.lock().expect("emitter lock");
        for (_, listener) in &inner.listeners {
            listener(error);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().expect("emitter lock").listeners.len()
    }
}

/// Bounded buffer of the most recent denials, fed by a global emitter
/// listener and rendered as a banner plus a debug endpoint.
#[derive(Clone, Default)]
pub struct DenialLog {
    entries: Arc<Mutex<VecDeque<PermissionError>>>,
}

const DENIAL_LOG_CAPACITY: usize = 20;

impl DenialLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach this log to an emitter. The returned id can be used to detach.
    pub fn attach(&self, emitter: &ErrorEmitter) -> SubscriberId {
        let entries = Arc::clone(&self.entries);
        emitter.subscribe(move |error| {
            let mut entries = entries.lock().expect("denial log lock");
            if entries.len() == DENIAL_LOG_CAPACITY {
                entries.pop_front();
            }
            entries.push_back(error.clone());
        })
    }

    pub fn recent(&self) -> Vec<PermissionError> {
        self.entries
            .lock()
            .expect("denial log lock")
            .iter()
            .cloned()
            .collect()
    }
}
