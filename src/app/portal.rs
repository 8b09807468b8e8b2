use crate::auth::Session;
use crate::care::{self, UserPatch};
use crate::ports::DocumentStore;
use crate::state::{AppState, medicine_key, task_key};
use crate::templates;

use axum::Extension;
use axum::extract::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use time::OffsetDateTime;

/// The end-user day view: today's medicines and tasks with their transient
/// completion flags.
pub(crate) async fn day_view<S: DocumentStore>(
    State(state): State<AppState<S>>,
    session: Option<Extension<Session>>,
) -> Response {
    let Some(Extension(session)) = session else {
        return Redirect::to("/login?role=user").into_response();
    };

    let user = match state.care.user(&session.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return (StatusCode::NOT_FOUND, "no such user").into_response(),
        Err(_) => return (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable").into_response(),
    };
    let medicines = match state.care.medicines_for(&user.id).await {
        Ok(medicines) => medicines,
        Err(_) => return (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable").into_response(),
    };
    let tasks = match state.care.tasks_for(&user.id).await {
        Ok(tasks) => tasks,
        Err(_) => return (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable").into_response(),
    };

    let completions = state.completions.lock().expect("completions lock");
    let medicines = medicines
        .into_iter()
        .map(|medicine| templates::PortalMedicine {
            taken: completions.is_done(&user.id, &medicine_key(&medicine.id)),
            id: medicine.id,
            name: medicine.name,
            dosage: medicine.dosage,
            time: medicine.time,
        })
        .collect();
    let tasks = tasks
        .into_iter()
        .map(|task| templates::PortalTask {
            done: completions.is_done(&user.id, &task_key(&task.id)),
            id: task.id,
            description: task.description,
            time: task.time,
        })
        .collect();
    drop(completions);

    templates::PortalTemplate {
        app_name: state.config.app_name,
        greeting: greeting_for_hour(OffsetDateTime::now_utc().hour()).to_string(),
        user_name: user.name,
        medicines,
        tasks,
    }
    .into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct TakeForm {
    medicine_id: String,
}

pub(crate) async fn take_medicine<S: DocumentStore>(
    State(state): State<AppState<S>>,
    session: Option<Extension<Session>>,
    Form(form): Form<TakeForm>,
) -> Response {
    let Some(Extension(session)) = session else {
        return Redirect::to("/login?role=user").into_response();
    };

    mark_done(&state, &session.user_id, medicine_key(&form.medicine_id));
    Redirect::to("/user").into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct DoneForm {
    task_id: String,
}

pub(crate) async fn finish_task<S: DocumentStore>(
    State(state): State<AppState<S>>,
    session: Option<Extension<Session>>,
    Form(form): Form<DoneForm>,
) -> Response {
    let Some(Extension(session)) = session else {
        return Redirect::to("/login?role=user").into_response();
    };

    mark_done(&state, &session.user_id, task_key(&form.task_id));
    Redirect::to("/user").into_response()
}

/// Completion is process-local, but the marking still counts as activity on
/// the stored profile.
fn mark_done<S: DocumentStore>(state: &AppState<S>, user_id: &str, item_key: String) {
    state
        .completions
        .lock()
        .expect("completions lock")
        .mark(user_id, item_key);
    state.care.update_user(
        user_id,
        UserPatch {
            last_activity: Some(care::now_rfc3339()),
            ..Default::default()
        },
    );
}

fn greeting_for_hour(hour: u8) -> &'static str {
    match hour {
        5..12 => "Good morning",
        12..18 => "Good afternoon",
        _ => "Good evening",
    }
}
