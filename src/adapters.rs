use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::errors::WriteOp;
use crate::ports::{Document, DocumentStore, StoreError};
use async_trait::async_trait;

const DOC_ID_LEN: usize = 20;

/// Decides whether a write may proceed, standing in for the remote store's
/// security rules. For creates the path is the target collection; for updates
/// and deletes it is the document path.
pub type WriteRules = Arc<dyn Fn(WriteOp, &str) -> bool + Send + Sync>;

/// In-memory [`DocumentStore`] adapter. Documents are JSON values keyed by
/// their full slash path; ids are assigned at insert time and never reused.
#[derive(Clone)]
pub struct MemoryStore {
    docs: Arc<Mutex<BTreeMap<String, Value>>>,
    rules: WriteRules,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store that allows every write.
    pub fn new() -> Self {
        Self {
            docs: Arc::new(Mutex::new(BTreeMap::new())),
            rules: Arc::new(|_, _| true),
        }
    }

    pub fn with_rules<F>(rules: F) -> Self
    where
        F: Fn(WriteOp, &str) -> bool + Send + Sync + 'static,
    {
        Self {
            docs: Arc::new(Mutex::new(BTreeMap::new())),
            rules: Arc::new(rules),
        }
    }

    /// A store that rejects every write whose path starts with `prefix`.
    pub fn denying_writes_under(prefix: &str) -> Self {
        let prefix = prefix.to_string();
        Self::with_rules(move |_, path| !path.starts_with(&prefix))
    }

    /// Place a document at an exact path, bypassing id assignment and rules.
    /// Seeding only.
    pub fn put(&self, doc_path: &str, value: Value) {
        self.docs
            .lock()
            .expect("store lock")
            .insert(doc_path.to_string(), value);
    }

    fn assign_id(&self, docs: &BTreeMap<String, Value>, collection: &str) -> String {
        loop {
            let id: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(DOC_ID_LEN)
                .map(char::from)
                .collect();
            if !docs.contains_key(&format!("{collection}/{id}")) {
                return id;
            }
        }
    }
}

fn segments(path: &str) -> Option<Vec<&str>> {
    if path.is_empty() {
        return None;
    }
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return None;
    }
    Some(parts)
}

fn is_collection_path(path: &str) -> bool {
    segments(path).is_some_and(|parts| parts.len() % 2 == 1)
}

fn is_doc_path(path: &str) -> bool {
    segments(path).is_some_and(|parts| parts.len() % 2 == 0)
}

fn doc_id(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn merge_into(target: &mut Value, partial: Value) {
    match (target, partial) {
        (Value::Object(existing), Value::Object(updates)) => {
            for (key, value) in updates {
                existing.insert(key, value);
            }
        }
        (target, partial) => *target = partial,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, value: Value) -> Result<String, StoreError> {
        if !is_collection_path(collection) {
            return Err(StoreError::BadPath);
        }
        if !(self.rules)(WriteOp::Create, collection) {
            return Err(StoreError::PermissionDenied);
        }
        let mut docs = self.docs.lock().expect("store lock");
        let id = self.assign_id(&docs, collection);
        docs.insert(format!("{collection}/{id}"), value);
        Ok(id)
    }

    async fn merge(&self, doc_path: &str, partial: Value) -> Result<(), StoreError> {
        if !is_doc_path(doc_path) {
            return Err(StoreError::BadPath);
        }
        if !(self.rules)(WriteOp::Update, doc_path) {
            return Err(StoreError::PermissionDenied);
        }
        let mut docs = self.docs.lock().expect("store lock");
        let existing = docs.get_mut(doc_path).ok_or(StoreError::NotFound)?;
        merge_into(existing, partial);
        Ok(())
    }

    async fn delete(&self, doc_path: &str) -> Result<(), StoreError> {
        if !is_doc_path(doc_path) {
            return Err(StoreError::BadPath);
        }
        if !(self.rules)(WriteOp::Delete, doc_path) {
            return Err(StoreError::PermissionDenied);
        }
        self.docs.lock().expect("store lock").remove(doc_path);
        Ok(())
    }

    async fn get(&self, doc_path: &str) -> Result<Option<Document>, StoreError> {
        if !is_doc_path(doc_path) {
            return Err(StoreError::BadPath);
        }
        let docs = self.docs.lock().expect("store lock");
        Ok(docs.get(doc_path).map(|value| Document {
            id: doc_id(doc_path).to_string(),
            value: value.clone(),
        }))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        if !is_collection_path(collection) {
            return Err(StoreError::BadPath);
        }
        let docs = self.docs.lock().expect("store lock");
        let prefix = format!("{collection}/");
        let matches = docs
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('/'))
            })
            .map(|(path, value)| Document {
                id: doc_id(path).to_string(),
                value: value.clone(),
            })
            .collect();
        Ok(matches)
    }

    async fn collection_group(&self, name: &str) -> Result<Vec<Document>, StoreError> {
        if name.is_empty() || name.contains('/') {
            return Err(StoreError::BadPath);
        }
        let docs = self.docs.lock().expect("store lock");
        let matches = docs
            .iter()
            .filter(|(path, _)| {
                let parts: Vec<&str> = path.split('/').collect();
                parts.len() >= 2 && parts[parts.len() - 2] == name
            })
            .map(|(path, value)| Document {
                id: doc_id(path).to_string(),
                value: value.clone(),
            })
            .collect();
        Ok(matches)
    }
}
