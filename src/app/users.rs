use crate::care::{self, NewUser, UserPatch, UserStatus, UserType};
use crate::ports::DocumentStore;
use crate::state::AppState;
use crate::templates;

use axum::extract::Form;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Redirect;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FlashQuery {
    pub(crate) notice: Option<String>,
    pub(crate) error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserForm {
    name: String,
    email: String,
}

pub(crate) async fn user_list<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<FlashQuery>,
) -> Result<templates::UsersTemplate, (StatusCode, &'static str)> {
    let users = state
        .care
        .end_users()
        .await
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable"))?;

    let rows = users
        .into_iter()
        .map(|user| templates::UserRow {
            initials: initials(&user.name),
            id: user.id,
            name: user.name,
            email: user.email,
            status: user.status.as_str().to_string(),
            last_activity: activity_date(&user.last_activity),
        })
        .collect();

    Ok(templates::UsersTemplate {
        app_name: state.config.app_name,
        denials: state.denials.recent(),
        users: rows,
        name: String::new(),
        email: String::new(),
        notice: query.notice.unwrap_or_default(),
        error: query.error.unwrap_or_default(),
    })
}

pub(crate) async fn user_add<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Form(form): Form<UserForm>,
) -> Redirect {
    let name = form.name.trim().to_string();
    let email = form.email.trim().to_lowercase();
    if name.is_empty() || !email.contains('@') {
        return Redirect::to("/caregiver/users?error=A%20name%20and%20a%20valid%20email%20are%20required.");
    }

    state.care.add_user(NewUser {
        user_type: UserType::EndUser,
        name,
        email,
        language: "en".to_string(),
        status: UserStatus::Active,
        last_activity: care::now_rfc3339(),
        password_hash: None,
    });

    Redirect::to("/caregiver/users?notice=User%20added.")
}

pub(crate) async fn user_edit_form<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> Result<templates::UserEditTemplate, (StatusCode, &'static str)> {
    let user = state
        .care
        .user(&user_id)
        .await
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable"))?
        .ok_or((StatusCode::NOT_FOUND, "no such user"))?;

    Ok(templates::UserEditTemplate {
        app_name: state.config.app_name,
        denials: state.denials.recent(),
        user_id: user.id,
        name: user.name,
        email: user.email,
        error: String::new(),
    })
}

pub(crate) async fn user_edit_submit<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
    Form(form): Form<UserForm>,
) -> Redirect {
    let name = form.name.trim().to_string();
    let email = form.email.trim().to_lowercase();
    if name.is_empty() || !email.contains('@') {
        return Redirect::to("/caregiver/users?error=A%20name%20and%20a%20valid%20email%20are%20required.");
    }

    state.care.update_user(
        &user_id,
        UserPatch {
            name: Some(name),
            email: Some(email),
            ..Default::default()
        },
    );

    Redirect::to("/caregiver/users?notice=User%20updated.")
}

pub(crate) async fn user_delete_form<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> Result<templates::UserDeleteTemplate, (StatusCode, &'static str)> {
    let user = state
        .care
        .user(&user_id)
        .await
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable"))?
        .ok_or((StatusCode::NOT_FOUND, "no such user"))?;

    Ok(templates::UserDeleteTemplate {
        app_name: state.config.app_name,
        denials: state.denials.recent(),
        user_id: user.id,
        name: user.name,
    })
}

pub(crate) async fn user_delete_submit<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> Redirect {
    state.care.delete_user(&user_id);
    Redirect::to("/caregiver/users?notice=User%20deleted.")
}

/// Avatar initials: first letter of the first two words, uppercased.
fn initials(name: &str) -> String {
    name.split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// The date part of a `lastActivity` timestamp, or the raw value if it is not
/// in the expected shape.
fn activity_date(timestamp: &str) -> String {
    match timestamp.split_once('T') {
        Some((date, _)) => date.to_string(),
        None => timestamp.to_string(),
    }
}
