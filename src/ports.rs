use async_trait::async_trait;
use serde_json::Value;

/// Failure surface of the remote document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store's security rules rejected the write.
    PermissionDenied,
    /// The target document does not exist (merge only; deletes are
    /// idempotent).
    NotFound,
    /// The path is not a well-formed collection or document path.
    BadPath,
    /// Transport or backend failure.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::PermissionDenied => f.write_str("permission denied"),
            StoreError::NotFound => f.write_str("document not found"),
            StoreError::BadPath => f.write_str("malformed document path"),
            StoreError::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
        }
    }
}

/// A fetched document: its store-assigned id plus the stored JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub value: Value,
}

/// The remote document store seam. Documents live at slash-separated paths:
/// an even number of segments names a document (`users/u1`), an odd number a
/// collection (`users/u1/medicines`). The store assigns ids on insert and
/// never reuses them.
#[async_trait]
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Insert a new document into `collection` and return its assigned id.
    async fn insert(&self, collection: &str, value: Value) -> Result<String, StoreError>;

    /// Merge `partial`'s top-level fields into an existing document.
    /// Untouched fields keep their values.
    async fn merge(&self, doc_path: &str, partial: Value) -> Result<(), StoreError>;

    /// Delete the document at `doc_path`. Deleting a missing document
    /// succeeds.
    async fn delete(&self, doc_path: &str) -> Result<(), StoreError>;

    async fn get(&self, doc_path: &str) -> Result<Option<Document>, StoreError>;

    /// All documents directly inside `collection`.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// All documents in same-named sub-collections, regardless of parent:
    /// `collection_group("medicines")` spans every `users/{id}/medicines`.
    async fn collection_group(&self, name: &str) -> Result<Vec<Document>, StoreError>;
}
