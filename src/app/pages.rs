use crate::auth::Session;
use crate::care::{self, UserPatch, UserStatus};
use crate::errors::PermissionError;
use crate::ports::DocumentStore;
use crate::state::{AppState, RecordEntry};
use crate::templates;

use axum::Extension;
use axum::Json;
use axum::extract::Form;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use super::users::FlashQuery;

const STORE_UNAVAILABLE: (StatusCode, &str) = (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable");

pub(crate) async fn landing<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> templates::LandingTemplate {
    templates::LandingTemplate {
        app_name: state.config.app_name,
    }
}

pub(crate) async fn dashboard<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> Result<templates::DashboardTemplate, (StatusCode, &'static str)> {
    let users = state.care.end_users().await.map_err(|_| STORE_UNAVAILABLE)?;
    let medicines = state.care.all_medicines().await.map_err(|_| STORE_UNAVAILABLE)?;
    let tasks = state.care.all_tasks().await.map_err(|_| STORE_UNAVAILABLE)?;

    Ok(templates::DashboardTemplate {
        app_name: state.config.app_name,
        denials: state.denials.recent(),
        active_users: users
            .iter()
            .filter(|user| user.status == UserStatus::Active)
            .count(),
        medicine_count: medicines.len(),
        task_count: tasks.len(),
        completions_today: state.completions.lock().expect("completions lock").total(),
    })
}

pub(crate) async fn record_list<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<FlashQuery>,
) -> templates::RecordsTemplate {
    templates::RecordsTemplate {
        app_name: state.config.app_name,
        denials: state.denials.recent(),
        records: state.records.lock().expect("records lock").clone(),
        error: query.error.unwrap_or_default(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordForm {
    file_name: String,
}

pub(crate) async fn record_add<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Form(form): Form<RecordForm>,
) -> Redirect {
    let file_name = form.file_name.trim().to_string();
    if file_name.is_empty() {
        return Redirect::to("/caregiver/records?error=A%20file%20name%20is%20required.");
    }

    let entry = RecordEntry {
        kind: record_kind(&file_name).to_string(),
        file_name,
        uploaded_at: care::now_rfc3339(),
    };
    state.records.lock().expect("records lock").push(entry);

    Redirect::to("/caregiver/records")
}

pub(crate) async fn reports<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> Result<templates::ReportsTemplate, (StatusCode, &'static str)> {
    let users = state.care.end_users().await.map_err(|_| STORE_UNAVAILABLE)?;
    let medicines = state.care.all_medicines().await.map_err(|_| STORE_UNAVAILABLE)?;
    let tasks = state.care.all_tasks().await.map_err(|_| STORE_UNAVAILABLE)?;

    let completions = state.completions.lock().expect("completions lock");
    let rows = users
        .iter()
        .map(|user| templates::ReportRow {
            user_name: user.name.clone(),
            medicine_count: medicines
                .iter()
                .filter(|medicine| medicine.user_id == user.id)
                .count(),
            task_count: tasks.iter().filter(|task| task.user_id == user.id).count(),
            completed_today: completions.count_for(&user.id),
            last_activity: user.last_activity.clone(),
        })
        .collect();
    drop(completions);

    Ok(templates::ReportsTemplate {
        app_name: state.config.app_name,
        denials: state.denials.recent(),
        rows,
    })
}

pub(crate) async fn settings_form<S: DocumentStore>(
    State(state): State<AppState<S>>,
    session: Option<Extension<Session>>,
    Query(query): Query<FlashQuery>,
) -> Response {
    let Some(Extension(session)) = session else {
        return Redirect::to("/login?role=caregiver").into_response();
    };

    let user = match state.care.user(&session.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return (StatusCode::NOT_FOUND, "no such user").into_response(),
        Err(_) => return STORE_UNAVAILABLE.into_response(),
    };

    templates::SettingsTemplate {
        app_name: state.config.app_name,
        denials: state.denials.recent(),
        name: user.name,
        email: user.email,
        language: user.language,
        notice: query.notice.unwrap_or_default(),
        error: query.error.unwrap_or_default(),
    }
    .into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct SettingsForm {
    name: String,
    language: String,
}

pub(crate) async fn settings_submit<S: DocumentStore>(
    State(state): State<AppState<S>>,
    session: Option<Extension<Session>>,
    Form(form): Form<SettingsForm>,
) -> Response {
    let Some(Extension(session)) = session else {
        return Redirect::to("/login?role=caregiver").into_response();
    };

    let name = form.name.trim().to_string();
    if name.is_empty() || !matches!(form.language.as_str(), "en" | "sv" | "de") {
        return Redirect::to("/caregiver/settings?error=A%20name%20and%20a%20supported%20language%20are%20required.")
            .into_response();
    }

    state.care.update_user(
        &session.user_id,
        UserPatch {
            name: Some(name),
            language: Some(form.language),
            ..Default::default()
        },
    );

    Redirect::to("/caregiver/settings?notice=Settings%20saved.").into_response()
}

/// Recent write denials as JSON, newest last.
pub(crate) async fn denial_debug<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> Json<Vec<PermissionError>> {
    Json(state.denials.recent())
}

fn record_kind(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "PDF",
        "jpg" | "jpeg" | "png" | "gif" => "Image",
        "doc" | "docx" | "txt" | "md" => "Document",
        _ => "File",
    }
}
