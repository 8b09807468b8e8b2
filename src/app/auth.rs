use crate::auth::{hash_password, verify_password};
use crate::care::{self, NewUser, UserPatch, UserStatus, UserType};
use crate::ports::DocumentStore;
use crate::state::AppState;
use crate::templates;

use axum::Json;
use axum::body::Body;
use axum::extract::Form;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde::Serialize;

#[derive(Serialize)]
struct AuthErrorResponse {
    error: &'static str,
}

/// Gate requests on the session cookie and portal role. The verified
/// [`Session`] is handed to handlers through request extensions.
pub(crate) async fn auth_middleware<S: DocumentStore>(
    State(state): State<AppState<S>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth = match &state.auth {
        Some(auth) => auth,
        None => return next.run(req).await,
    };

    let path = req.uri().path().to_string();
    if is_auth_bypass_path(&path) {
        return next.run(req).await;
    }

    let session = session_cookie(req.headers(), auth.cookie_name())
        .and_then(|token| auth.verify_token(token).ok());

    let Some(session) = session else {
        if path.starts_with("/api/") {
            return (
                StatusCode::UNAUTHORIZED,
                Json(AuthErrorResponse {
                    error: "unauthorized",
                }),
            )
                .into_response();
        }
        let role = if path.starts_with("/user") {
            "user"
        } else {
            "caregiver"
        };
        return Redirect::to(&format!("/login?role={role}")).into_response();
    };

    // A signed-in visitor landing in the wrong portal is sent to their own.
    if path.starts_with("/caregiver") && session.role != UserType::Caregiver {
        return Redirect::to("/user").into_response();
    }
    if path.starts_with("/user") && session.role != UserType::EndUser {
        return Redirect::to("/caregiver").into_response();
    }

    req.extensions_mut().insert(session);
    next.run(req).await
}

fn is_auth_bypass_path(path: &str) -> bool {
    path == "/"
        || path == "/login"
        || path == "/signup"
        || path == "/logout"
        || path == "/health"
        || path.starts_with("/static/")
}

fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for header in headers.get_all(COOKIE).iter() {
        if let Ok(raw) = header.to_str()
            && let Some(value) = cookie_from_header(raw, name)
        {
            return Some(value);
        }
    }
    None
}

fn cookie_from_header<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, cookie_value)) = trimmed.split_once('=')
            && cookie_name == name
        {
            return Some(cookie_value);
        }
    }
    None
}

fn sanitize_role(role: Option<&str>) -> &'static str {
    match role {
        Some("user") => "user",
        _ => "caregiver",
    }
}

fn portal_home(user_type: UserType) -> &'static str {
    match user_type {
        UserType::Caregiver => "/caregiver",
        UserType::EndUser => "/user",
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginQuery {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    email: String,
    password: String,
    role: Option<String>,
}

pub(crate) async fn login_form<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<LoginQuery>,
) -> Result<templates::LoginTemplate, (StatusCode, &'static str)> {
    if state.auth.is_none() {
        return Err((StatusCode::NOT_FOUND, "not found"));
    }

    Ok(templates::LoginTemplate {
        app_name: state.config.app_name,
        role: sanitize_role(query.role.as_deref()).to_string(),
        error: String::new(),
    })
}

pub(crate) async fn login_submit<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, templates::LoginTemplate)> {
    let role = sanitize_role(form.role.as_deref());
    let auth = state.auth.as_ref().ok_or((
        StatusCode::NOT_FOUND,
        templates::LoginTemplate {
            app_name: state.config.app_name.clone(),
            role: role.to_string(),
            error: "Auth is not enabled.".to_string(),
        },
    ))?;

    let email = form.email.trim();
    if email.is_empty() {
        return Err(login_error(&state.config.app_name, role));
    }

    let user = match state.care.user_by_email(email).await {
        Ok(user) => user,
        Err(err) => {
            tracing::error!(error = %err, "user lookup failed during login");
            return Err(login_error(&state.config.app_name, role));
        }
    };
    let Some(user) = user else {
        return Err(login_error(&state.config.app_name, role));
    };

    // End users without a stored credential sign in with just their email.
    let credentials_ok = match user.password_hash.as_deref() {
        Some(hash) => verify_password(&form.password, hash),
        None => user.user_type == UserType::EndUser,
    };
    if !credentials_ok {
        return Err(login_error(&state.config.app_name, role));
    }

    let token = match auth.issue_token(&user.id, user.user_type) {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "failed to issue auth token");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                templates::LoginTemplate {
                    app_name: state.config.app_name,
                    role: role.to_string(),
                    error: "Failed to sign in.".to_string(),
                },
            ));
        }
    };

    state.care.update_user(
        &user.id,
        UserPatch {
            last_activity: Some(care::now_rfc3339()),
            ..Default::default()
        },
    );

    let mut response = Redirect::to(portal_home(user.user_type)).into_response();
    let cookie = auth.auth_cookie(&token);
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("auth cookie header"),
    );
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignupForm {
    name: String,
    email: String,
    password: String,
    confirm_password: String,
}

pub(crate) async fn signup_form<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> Result<templates::SignupTemplate, (StatusCode, &'static str)> {
    if state.auth.is_none() {
        return Err((StatusCode::NOT_FOUND, "not found"));
    }

    Ok(templates::SignupTemplate {
        app_name: state.config.app_name,
        name: String::new(),
        email: String::new(),
        error: String::new(),
    })
}

pub(crate) async fn signup_submit<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Form(form): Form<SignupForm>,
) -> Result<Response, (StatusCode, templates::SignupTemplate)> {
    let auth = state.auth.as_ref().ok_or((
        StatusCode::NOT_FOUND,
        templates::SignupTemplate {
            app_name: state.config.app_name.clone(),
            name: String::new(),
            email: String::new(),
            error: "Auth is not enabled.".to_string(),
        },
    ))?;

    let name = form.name.trim().to_string();
    let email = form.email.trim().to_lowercase();

    if name.is_empty() || !email.contains('@') {
        return Err(signup_error(
            &state,
            &name,
            &email,
            "A name and a valid email are required.",
        ));
    }
    if form.password.len() < 6 {
        return Err(signup_error(
            &state,
            &name,
            &email,
            "Password must be at least 6 characters.",
        ));
    }
    if form.password != form.confirm_password {
        return Err(signup_error(&state, &name, &email, "Passwords do not match."));
    }

    match state.care.user_by_email(&email).await {
        Ok(Some(_)) => {
            return Err(signup_error(
                &state,
                &name,
                &email,
                "An account with that email already exists.",
            ));
        }
        Ok(None) => {}
        Err(err) => {
            tracing::error!(error = %err, "user lookup failed during signup");
            return Err(signup_error(&state, &name, &email, "Failed to sign up."));
        }
    }

    let password_hash = match hash_password(&form.password) {
        Ok(hash) => hash,
        Err(err) => {
            tracing::error!(error = %err, "failed to hash password");
            return Err(signup_error(&state, &name, &email, "Failed to sign up."));
        }
    };

    let user_id = match state
        .care
        .register_user(NewUser {
            user_type: UserType::Caregiver,
            name,
            email,
            language: "en".to_string(),
            status: UserStatus::Active,
            last_activity: care::now_rfc3339(),
            password_hash: Some(password_hash),
        })
        .await
    {
        Ok(user_id) => user_id,
        Err(err) => {
            tracing::error!(error = %err, "failed to create caregiver account");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                templates::SignupTemplate {
                    app_name: state.config.app_name.clone(),
                    name: String::new(),
                    email: String::new(),
                    error: "Failed to create the account.".to_string(),
                },
            ));
        }
    };

    let token = match auth.issue_token(&user_id, UserType::Caregiver) {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "failed to issue auth token after signup");
            return Ok(Redirect::to("/login?role=caregiver").into_response());
        }
    };

    let mut response = Redirect::to("/caregiver").into_response();
    let cookie = auth.auth_cookie(&token);
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("auth cookie header"),
    );
    Ok(response)
}

pub(crate) async fn logout<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> Result<Response, (StatusCode, &'static str)> {
    let auth = state
        .auth
        .as_ref()
        .ok_or((StatusCode::NOT_FOUND, "not found"))?;
    let mut response = Redirect::to("/").into_response();
    let cookie = auth.clear_cookie();
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("logout cookie header"),
    );
    Ok(response)
}

fn login_error(app_name: &str, role: &str) -> (StatusCode, templates::LoginTemplate) {
    (
        StatusCode::UNAUTHORIZED,
        templates::LoginTemplate {
            app_name: app_name.to_string(),
            role: role.to_string(),
            error: "Invalid email or password.".to_string(),
        },
    )
}

fn signup_error<S: DocumentStore>(
    state: &AppState<S>,
    name: &str,
    email: &str,
    message: &str,
) -> (StatusCode, templates::SignupTemplate) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        templates::SignupTemplate {
            app_name: state.config.app_name.clone(),
            name: name.to_string(),
            email: email.to_string(),
            error: message.to_string(),
        },
    )
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn cookie_from_header__should_find_named_cookie() {
        // Given
        let header = "other=1; dualcare_auth=token-value; theme=dark";

        // Then
        assert_eq!(
            cookie_from_header(header, "dualcare_auth"),
            Some("token-value")
        );
        assert_eq!(cookie_from_header(header, "missing"), None);
    }

    #[test]
    fn sanitize_role__should_default_to_caregiver() {
        // Then
        assert_eq!(sanitize_role(Some("user")), "user");
        assert_eq!(sanitize_role(Some("admin")), "caregiver");
        assert_eq!(sanitize_role(None), "caregiver");
    }

    #[test]
    fn is_auth_bypass_path__should_allow_public_pages_only() {
        // Then
        assert!(is_auth_bypass_path("/"));
        assert!(is_auth_bypass_path("/login"));
        assert!(is_auth_bypass_path("/signup"));
        assert!(is_auth_bypass_path("/static/style.css"));
        assert!(!is_auth_bypass_path("/caregiver"));
        assert!(!is_auth_bypass_path("/user"));
        assert!(!is_auth_bypass_path("/api/debug/denials"));
    }
}
