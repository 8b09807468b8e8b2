use crate::auth::AuthState;
use crate::care::CareStore;
use crate::config::AppConfig;
use crate::errors::DenialLog;
use crate::ports::DocumentStore;

use serde::Serialize;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Per-process "done today" flags for the end-user portal. Deliberately
/// transient: the flags are never written to the document store and a restart
/// clears them.
#[derive(Default)]
pub struct Completions {
    done: HashMap<String, HashSet<String>>,
}

impl Completions {
    pub fn mark(&mut self, user_id: &str, item_key: String) {
        self.done.entry(user_id.to_string()).or_default().insert(item_key);
    }

    pub fn is_done(&self, user_id: &str, item_key: &str) -> bool {
        self.done
            .get(user_id)
            .is_some_and(|items| items.contains(item_key))
    }

    pub fn count_for(&self, user_id: &str) -> usize {
        self.done.get(user_id).map_or(0, |items| items.len())
    }

    pub fn total(&self) -> usize {
        self.done.values().map(|items| items.len()).sum()
    }
}

pub(crate) fn medicine_key(medicine_id: &str) -> String {
    format!("medicine:{medicine_id}")
}

pub(crate) fn task_key(task_id: &str) -> String {
    format!("task:{task_id}")
}

/// Metadata-only "upload": no binary is stored anywhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordEntry {
    pub file_name: String,
    pub kind: String,
    pub uploaded_at: String,
}

#[derive(Clone)]
pub struct AppState<S: DocumentStore> {
    pub config: AppConfig,
    pub(crate) auth: Option<AuthState>,
    pub care: CareStore<S>,
    pub denials: DenialLog,
    pub completions: Arc<Mutex<Completions>>,
    pub records: Arc<Mutex<Vec<RecordEntry>>>,
}
