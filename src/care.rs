use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use std::collections::HashMap;

use crate::errors::{ErrorEmitter, PermissionError, WriteOp};
use crate::ports::{Document, DocumentStore, StoreError};

pub const USERS_COLLECTION: &str = "users";
pub const MEDICINES_COLLECTION: &str = "medicines";
pub const TASKS_COLLECTION: &str = "tasks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
    #[serde(rename = "caregiver")]
    Caregiver,
    #[serde(rename = "endUser")]
    EndUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
        }
    }
}

/// A person in the roster. Caregivers and end users share the same document
/// shape; caregiver documents additionally carry the credential hash used by
/// the auth layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip)]
    pub id: String,
    pub user_type: UserType,
    pub name: String,
    pub email: String,
    pub language: String,
    pub status: UserStatus,
    pub last_activity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl User {
    pub(crate) fn from_document(doc: Document) -> Option<Self> {
        match serde_json::from_value::<User>(doc.value) {
            Ok(mut user) => {
                user.id = doc.id;
                Some(user)
            }
            Err(err) => {
                tracing::warn!(id = %doc.id, error = %err, "skipping undecodable user document");
                None
            }
        }
    }
}

/// Create payload for a [`User`]: everything but the store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_type: UserType,
    pub name: String,
    pub email: String,
    pub language: String,
    pub status: UserStatus,
    pub last_activity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

/// Sparse update for a [`User`]; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    #[serde(skip)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub dosage: String,
    pub time: String,
}

impl Medicine {
    pub(crate) fn from_document(doc: Document) -> Option<Self> {
        match serde_json::from_value::<Medicine>(doc.value) {
            Ok(mut medicine) => {
                medicine.id = doc.id;
                Some(medicine)
            }
            Err(err) => {
                tracing::warn!(id = %doc.id, error = %err, "skipping undecodable medicine document");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMedicine {
    pub name: String,
    pub dosage: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MedicinePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(skip)]
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub time: String,
}

impl Task {
    pub(crate) fn from_document(doc: Document) -> Option<Self> {
        match serde_json::from_value::<Task>(doc.value) {
            Ok(mut task) => {
                task.id = doc.id;
                Some(task)
            }
            Err(err) => {
                tracing::warn!(id = %doc.id, error = %err, "skipping undecodable task document");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    pub description: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

pub(crate) fn user_doc(user_id: &str) -> String {
    format!("{USERS_COLLECTION}/{user_id}")
}

pub(crate) fn medicine_collection(user_id: &str) -> String {
    format!("{USERS_COLLECTION}/{user_id}/{MEDICINES_COLLECTION}")
}

pub(crate) fn medicine_doc(user_id: &str, medicine_id: &str) -> String {
    format!("{USERS_COLLECTION}/{user_id}/{MEDICINES_COLLECTION}/{medicine_id}")
}

pub(crate) fn task_collection(user_id: &str) -> String {
    format!("{USERS_COLLECTION}/{user_id}/{TASKS_COLLECTION}")
}

pub(crate) fn task_doc(user_id: &str, task_id: &str) -> String {
    format!("{USERS_COLLECTION}/{user_id}/{TASKS_COLLECTION}/{task_id}")
}

/// Current timestamp in the `lastActivity` wire format.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("format rfc3339 timestamp")
}

/// Accepts 24h `HH:MM` strings, the time-of-day format stored on schedule
/// items. Lexicographic order on valid values matches chronological order.
pub fn valid_time_of_day(value: &str) -> bool {
    let Some((hours, minutes)) = value.split_once(':') else {
        return false;
    };
    if hours.len() != 2 || minutes.len() != 2 {
        return false;
    }
    let (Ok(hours), Ok(minutes)) = (hours.parse::<u8>(), minutes.parse::<u8>()) else {
        return false;
    };
    hours < 24 && minutes < 60
}

/// Data access over the document store. Writes are dispatched fire-and-forget
/// on the runtime: the caller gets no result, success shows up through the
/// next read, and a rejection is broadcast on the injected [`ErrorEmitter`]
/// as a [`PermissionError`].
#[derive(Clone)]
pub struct CareStore<S> {
    store: S,
    emitter: ErrorEmitter,
}

impl<S: DocumentStore> CareStore<S> {
    pub fn new(store: S, emitter: ErrorEmitter) -> Self {
        Self { store, emitter }
    }

    pub fn add_user(&self, user: NewUser) {
        let payload = serde_json::to_value(&user).expect("user payload serializes");
        self.dispatch_create(USERS_COLLECTION.to_string(), payload);
    }

    /// Account creation is the one write whose outcome the caller needs right
    /// away: the new document id becomes the session subject. Awaited, and a
    /// rejection surfaces to the caller instead of the emitter.
    pub async fn register_user(&self, user: NewUser) -> Result<String, StoreError> {
        let payload = serde_json::to_value(&user).expect("user payload serializes");
        self.store.insert(USERS_COLLECTION, payload).await
    }

    pub fn update_user(&self, user_id: &str, patch: UserPatch) {
        let partial = serde_json::to_value(&patch).expect("user patch serializes");
        self.dispatch_update(user_doc(user_id), partial);
    }

    /// Does not cascade: the user's medicines and tasks stay in the store and
    /// remain reachable through collection-group reads.
    pub fn delete_user(&self, user_id: &str) {
        self.dispatch_delete(user_doc(user_id));
    }

    pub fn add_medicine(&self, user_id: &str, medicine: NewMedicine) {
        let mut payload = serde_json::to_value(&medicine).expect("medicine payload serializes");
        payload["userId"] = Value::String(user_id.to_string());
        self.dispatch_create(medicine_collection(user_id), payload);
    }

    pub fn update_medicine(&self, user_id: &str, medicine_id: &str, patch: MedicinePatch) {
        let partial = serde_json::to_value(&patch).expect("medicine patch serializes");
        self.dispatch_update(medicine_doc(user_id, medicine_id), partial);
    }

    pub fn delete_medicine(&self, user_id: &str, medicine_id: &str) {
        self.dispatch_delete(medicine_doc(user_id, medicine_id));
    }

    pub fn add_task(&self, user_id: &str, task: NewTask) {
        let mut payload = serde_json::to_value(&task).expect("task payload serializes");
        payload["userId"] = Value::String(user_id.to_string());
        self.dispatch_create(task_collection(user_id), payload);
    }

    pub fn update_task(&self, user_id: &str, task_id: &str, patch: TaskPatch) {
        let partial = serde_json::to_value(&patch).expect("task patch serializes");
        self.dispatch_update(task_doc(user_id, task_id), partial);
    }

    pub fn delete_task(&self, user_id: &str, task_id: &str) {
        self.dispatch_delete(task_doc(user_id, task_id));
    }

    pub async fn user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let doc = self.store.get(&user_doc(user_id)).await?;
        Ok(doc.and_then(User::from_document))
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let docs = self.store.list(USERS_COLLECTION).await?;
        Ok(docs
            .into_iter()
            .filter_map(User::from_document)
            .find(|user| user.email.eq_ignore_ascii_case(email)))
    }

    /// End users only, sorted by name for display.
    pub async fn end_users(&self) -> Result<Vec<User>, StoreError> {
        let docs = self.store.list(USERS_COLLECTION).await?;
        let mut users: Vec<User> = docs
            .into_iter()
            .filter_map(User::from_document)
            .filter(|user| user.user_type == UserType::EndUser)
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    /// Every medicine across all users, sorted by time of day.
    pub async fn all_medicines(&self) -> Result<Vec<Medicine>, StoreError> {
        let docs = self.store.collection_group(MEDICINES_COLLECTION).await?;
        let mut medicines: Vec<Medicine> = docs
            .into_iter()
            .filter_map(Medicine::from_document)
            .collect();
        medicines.sort_by(|a, b| a.time.cmp(&b.time));
        Ok(medicines)
    }

    /// Every task across all users, sorted by time of day.
    pub async fn all_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let docs = self.store.collection_group(TASKS_COLLECTION).await?;
        let mut tasks: Vec<Task> = docs.into_iter().filter_map(Task::from_document).collect();
        tasks.sort_by(|a, b| a.time.cmp(&b.time));
        Ok(tasks)
    }

    pub async fn medicines_for(&self, user_id: &str) -> Result<Vec<Medicine>, StoreError> {
        let docs = self.store.list(&medicine_collection(user_id)).await?;
        let mut medicines: Vec<Medicine> = docs
            .into_iter()
            .filter_map(Medicine::from_document)
            .collect();
        medicines.sort_by(|a, b| a.time.cmp(&b.time));
        Ok(medicines)
    }

    pub async fn tasks_for(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let docs = self.store.list(&task_collection(user_id)).await?;
        let mut tasks: Vec<Task> = docs.into_iter().filter_map(Task::from_document).collect();
        tasks.sort_by(|a, b| a.time.cmp(&b.time));
        Ok(tasks)
    }

    fn dispatch_create(&self, collection: String, payload: Value) {
        let store = self.store.clone();
        let emitter = self.emitter.clone();
        tokio::spawn(async move {
            if let Err(err) = store.insert(&collection, payload.clone()).await {
                report_rejected(&emitter, WriteOp::Create, collection, Some(payload), err);
            }
        });
    }

    fn dispatch_update(&self, doc_path: String, partial: Value) {
        let store = self.store.clone();
        let emitter = self.emitter.clone();
        tokio::spawn(async move {
            if let Err(err) = store.merge(&doc_path, partial.clone()).await {
                report_rejected(&emitter, WriteOp::Update, doc_path, Some(partial), err);
            }
        });
    }

    fn dispatch_delete(&self, doc_path: String) {
        let store = self.store.clone();
        let emitter = self.emitter.clone();
        tokio::spawn(async move {
            if let Err(err) = store.delete(&doc_path).await {
                report_rejected(&emitter, WriteOp::Delete, doc_path, None, err);
            }
        });
    }
}

fn report_rejected(
    emitter: &ErrorEmitter,
    operation: WriteOp,
    path: String,
    payload: Option<Value>,
    err: StoreError,
) {
    tracing::warn!(%path, op = %operation, error = %err, "document store rejected write");
    emitter.emit(&PermissionError {
        path,
        operation,
        payload,
    });
}

/// A schedule row with the owning user's display name attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Named<T> {
    pub user_name: String,
    pub item: T,
}

/// Join collection-group rows back to the flat user list. Builds an id→name
/// lookup in one pass; rows whose owner is missing keep the raw id as the
/// display name. Every input row appears exactly once in the output.
pub fn join_user_names<T, F>(users: &[User], items: Vec<T>, owner_id: F) -> Vec<Named<T>>
where
    F: Fn(&T) -> &str,
{
    let names: HashMap<&str, &str> = users
        .iter()
        .map(|user| (user.id.as_str(), user.name.as_str()))
        .collect();
    items
        .into_iter()
        .map(|item| {
            let id = owner_id(&item);
            let user_name = names.get(id).map_or_else(|| id.to_string(), |n| n.to_string());
            Named { user_name, item }
        })
        .collect()
}
