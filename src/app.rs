use crate::assets;
use crate::auth as auth_service;
use crate::care;
use crate::config;
use crate::errors;
use crate::ports::DocumentStore;
use crate::state;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;

use std::sync::{Arc, Mutex};

mod auth;
mod pages;
mod portal;
mod schedules;
mod users;

pub fn app<S: DocumentStore>(config: config::AppConfig, store: S) -> Router {
    let auth = auth_service::AuthState::from_config(&config)
        .unwrap_or_else(|err| panic!("invalid auth configuration: {err}"));
    let emitter = errors::ErrorEmitter::new();
    let denials = errors::DenialLog::new();
    denials.attach(&emitter);
    let state = state::AppState {
        config,
        auth,
        care: care::CareStore::new(store, emitter),
        denials,
        completions: Arc::new(Mutex::new(state::Completions::default())),
        records: Arc::new(Mutex::new(Vec::new())),
    };
    Router::new()
        .route("/", get(pages::landing::<S>))
        .route(
            "/login",
            get(auth::login_form::<S>).post(auth::login_submit::<S>),
        )
        .route(
            "/signup",
            get(auth::signup_form::<S>).post(auth::signup_submit::<S>),
        )
        .route("/logout", post(auth::logout::<S>))
        .route("/caregiver", get(pages::dashboard::<S>))
        .route(
            "/caregiver/users",
            get(users::user_list::<S>).post(users::user_add::<S>),
        )
        .route(
            "/caregiver/users/{user_id}/edit",
            get(users::user_edit_form::<S>).post(users::user_edit_submit::<S>),
        )
        .route(
            "/caregiver/users/{user_id}/delete",
            get(users::user_delete_form::<S>).post(users::user_delete_submit::<S>),
        )
        .route("/caregiver/schedules", get(schedules::schedule_list::<S>))
        .route(
            "/caregiver/schedules/medicines",
            post(schedules::medicine_add::<S>),
        )
        .route(
            "/caregiver/schedules/medicines/{user_id}/{medicine_id}/edit",
            get(schedules::medicine_edit_form::<S>).post(schedules::medicine_edit_submit::<S>),
        )
        .route(
            "/caregiver/schedules/medicines/{user_id}/{medicine_id}/delete",
            post(schedules::medicine_delete::<S>),
        )
        .route("/caregiver/schedules/tasks", post(schedules::task_add::<S>))
        .route(
            "/caregiver/schedules/tasks/{user_id}/{task_id}/edit",
            get(schedules::task_edit_form::<S>).post(schedules::task_edit_submit::<S>),
        )
        .route(
            "/caregiver/schedules/tasks/{user_id}/{task_id}/delete",
            post(schedules::task_delete::<S>),
        )
        .route(
            "/caregiver/records",
            get(pages::record_list::<S>).post(pages::record_add::<S>),
        )
        .route("/caregiver/reports", get(pages::reports::<S>))
        .route(
            "/caregiver/settings",
            get(pages::settings_form::<S>).post(pages::settings_submit::<S>),
        )
        .route("/user", get(portal::day_view::<S>))
        .route("/user/take", post(portal::take_medicine::<S>))
        .route("/user/done", post(portal::finish_task::<S>))
        .route("/api/debug/denials", get(pages::denial_debug::<S>))
        .route("/static/style.css", get(assets::stylesheet))
        .route("/health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state,
            auth::auth_middleware::<S>,
        ))
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::care::UserType;
    use crate::care::tests::settle;
    use crate::errors::WriteOp;

    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};
    use axum::body::Body;
    use axum::body::to_bytes;
    use axum::http::Request;
    use axum::http::StatusCode;
    use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
    use base64::{URL_SAFE_NO_PAD, encode_config};
    use serde_json::{Value as JsonValue, from_slice as json_from_slice, json};
    use time::Duration;
    use tower::ServiceExt;

    fn open_config() -> config::AppConfig {
        config::AppConfig::default()
    }

    fn auth_config(key_bytes: &[u8]) -> config::AppConfig {
        config::AppConfig {
            app_name: "DualCare".to_string(),
            auth: Some(config::AuthConfig {
                key: encode_config(key_bytes, URL_SAFE_NO_PAD),
                token_ttl: Duration::days(1),
                cookie_name: "dualcare_auth".to_string(),
                cookie_secure: false,
            }),
        }
    }

    fn session_cookie(config: &config::AppConfig, user_id: &str, role: UserType) -> String {
        let auth = auth_service::AuthState::from_config(config)
            .expect("auth config")
            .expect("auth enabled");
        let token = auth.issue_token(user_id, role).expect("issue token");
        format!("dualcare_auth={token}")
    }

    fn hash_password_for_test(password: &str) -> String {
        let salt = SaltString::encode_b64(b"dualcare-tests").expect("salt");
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .expect("hash password")
            .to_string()
    }

    fn seed_end_user(store: &MemoryStore, id: &str, name: &str, email: &str) {
        store.put(
            &format!("users/{id}"),
            json!({
                "userType": "endUser",
                "name": name,
                "email": email,
                "language": "en",
                "status": "Active",
                "lastActivity": "2025-06-01T08:00:00Z",
            }),
        );
    }

    fn seed_caregiver(store: &MemoryStore, id: &str, email: &str, password_hash: &str) {
        store.put(
            &format!("users/{id}"),
            json!({
                "userType": "caregiver",
                "name": "Carol Carer",
                "email": email,
                "language": "en",
                "status": "Active",
                "lastActivity": "2025-06-01T08:00:00Z",
                "passwordHash": password_hash,
            }),
        );
    }

    async fn body_string(response: axum::response::Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        String::from_utf8(body.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn app__should_return_ok_on_health_endpoint() {
        // Given
        let app = app(open_config(), MemoryStore::new());

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn landing__should_offer_both_portals() {
        // Given
        let app = app(open_config(), MemoryStore::new());

        // When
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("/login?role=caregiver"));
        assert!(body.contains("/login?role=user"));
    }

    #[tokio::test]
    async fn auth_middleware__should_redirect_html_to_role_login() {
        // Given
        let app = app(auth_config(b"redirect-secret"), MemoryStore::new());

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/caregiver")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).expect("location header"),
            "/login?role=caregiver"
        );
    }

    #[tokio::test]
    async fn auth_middleware__should_return_json_unauthorized_for_api() {
        // Given
        let app = app(auth_config(b"api-secret"), MemoryStore::new());

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/debug/denials")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let payload: JsonValue = json_from_slice(&body).expect("parse json");
        assert_eq!(payload["error"], "unauthorized");
    }

    #[tokio::test]
    async fn auth_middleware__should_send_end_users_back_to_their_portal() {
        // Given
        let config = auth_config(b"wrong-portal-secret");
        let store = MemoryStore::new();
        seed_end_user(&store, "u1", "John Doe", "john@example.com");
        let cookie = session_cookie(&config, "u1", UserType::EndUser);

        // When
        let response = app(config, store)
            .oneshot(
                Request::builder()
                    .uri("/caregiver/users")
                    .header(COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).expect("location header"),
            "/user"
        );
    }

    #[tokio::test]
    async fn login__should_set_cookie_and_redirect_caregiver() {
        // Given
        let store = MemoryStore::new();
        seed_caregiver(
            &store,
            "c1",
            "carol@example.com",
            &hash_password_for_test("secret"),
        );
        let form = "email=carol%40example.com&password=secret&role=caregiver";

        // When
        let response = app(auth_config(b"login-secret"), store)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).expect("location header"),
            "/caregiver"
        );
        let cookie = response.headers().get(SET_COOKIE).expect("set-cookie");
        let cookie = cookie.to_str().expect("cookie header");
        assert!(cookie.contains("dualcare_auth="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[tokio::test]
    async fn login__should_let_end_users_in_with_email_only() {
        // Given
        let store = MemoryStore::new();
        seed_end_user(&store, "u1", "John Doe", "john@example.com");
        let form = "email=John%40example.com&password=&role=user";

        // When
        let response = app(auth_config(b"email-only-secret"), store)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).expect("location header"),
            "/user"
        );
    }

    #[tokio::test]
    async fn login__should_reject_invalid_credentials() {
        // Given
        let store = MemoryStore::new();
        seed_caregiver(
            &store,
            "c1",
            "carol@example.com",
            &hash_password_for_test("secret"),
        );
        let form = "email=carol%40example.com&password=wrong&role=caregiver";

        // When
        let response = app(auth_config(b"login-fail-secret"), store)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_string(response).await;
        assert!(body.contains("Invalid email or password."));
    }

    #[tokio::test]
    async fn signup__should_create_caregiver_and_sign_them_in() {
        // Given
        let store = MemoryStore::new();
        let form =
            "name=Carol+Carer&email=carol%40example.com&password=supersecret&confirm_password=supersecret";

        // When
        let response = app(auth_config(b"signup-secret"), store)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/signup")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).expect("location header"),
            "/caregiver"
        );
        assert!(response.headers().get(SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn signup__should_reject_duplicate_emails() {
        // Given
        let store = MemoryStore::new();
        seed_caregiver(
            &store,
            "c1",
            "carol@example.com",
            &hash_password_for_test("secret"),
        );
        let form =
            "name=Carol+Again&email=carol%40example.com&password=supersecret&confirm_password=supersecret";

        // When
        let response = app(auth_config(b"dup-signup-secret"), store)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/signup")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_string(response).await;
        assert!(body.contains("already exists"));
    }

    #[tokio::test]
    async fn signup__should_reject_mismatched_passwords() {
        // Given
        let form =
            "name=Carol+Carer&email=carol%40example.com&password=supersecret&confirm_password=different";

        // When
        let response = app(auth_config(b"mismatch-secret"), MemoryStore::new())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/signup")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_string(response).await;
        assert!(body.contains("Passwords do not match."));
    }

    #[tokio::test]
    async fn logout__should_clear_cookie_and_return_to_landing() {
        // Given
        let app = app(auth_config(b"logout-secret"), MemoryStore::new());

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).expect("location header"),
            "/"
        );
        let cookie = response.headers().get(SET_COOKIE).expect("set-cookie");
        assert!(cookie.to_str().expect("cookie header").contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn user_add__should_show_up_in_the_roster() {
        // Given
        let store = MemoryStore::new();
        let app = app(open_config(), store);
        let form = "name=John+Doe&email=john%40example.com";

        // When
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/caregiver/users")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");
        settle().await;

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let list = app
            .oneshot(
                Request::builder()
                    .uri("/caregiver/users")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        let body = body_string(list).await;
        assert!(body.contains("John Doe"));
        assert!(body.contains("john@example.com"));
    }

    #[tokio::test]
    async fn rejected_medicine_add__should_surface_in_banner_and_debug_endpoint() {
        // Given: a store whose rules turn away creates under medicine schedules
        let store = MemoryStore::with_rules(|op, path| {
            !(op == WriteOp::Create && path.ends_with("/medicines"))
        });
        seed_end_user(&store, "u1", "John Doe", "john@example.com");
        let app = app(open_config(), store);
        let form = "user_id=u1&name=Aspirin&dosage=81mg&time=08%3A00";

        // When
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/caregiver/schedules/medicines")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");
        settle().await;

        // Then: the write itself still redirected optimistically
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let page = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/caregiver/schedules")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        let body = body_string(page).await;
        assert!(body.contains("Permission denied: create at users/u1/medicines"));

        let debug = app
            .oneshot(
                Request::builder()
                    .uri("/api/debug/denials")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        let body = to_bytes(debug.into_body(), usize::MAX)
            .await
            .expect("read body");
        let denials: JsonValue = json_from_slice(&body).expect("parse json");
        assert_eq!(denials[0]["path"], "users/u1/medicines");
        assert_eq!(denials[0]["operation"], "create");
        assert_eq!(denials[0]["payload"]["userId"], "u1");
    }

    #[tokio::test]
    async fn schedule_list__should_join_user_names_onto_rows() {
        // Given
        let store = MemoryStore::new();
        seed_end_user(&store, "u1", "John Doe", "john@example.com");
        store.put(
            "users/u1/medicines/m1",
            json!({"userId": "u1", "name": "Aspirin", "dosage": "81mg", "time": "08:00"}),
        );
        store.put(
            "users/gone/tasks/t1",
            json!({"userId": "gone", "description": "Walk", "time": "09:00"}),
        );

        // When
        let response = app(open_config(), store)
            .oneshot(
                Request::builder()
                    .uri("/caregiver/schedules")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then: named rows where the owner exists, raw id where they do not
        let body = body_string(response).await;
        assert!(body.contains("John Doe"));
        assert!(body.contains("Aspirin"));
        assert!(body.contains("gone"));
    }

    #[tokio::test]
    async fn portal__should_mark_taken_medicines() {
        // Given
        let config = auth_config(b"portal-secret");
        let store = MemoryStore::new();
        seed_end_user(&store, "u1", "John Doe", "john@example.com");
        store.put(
            "users/u1/medicines/m1",
            json!({"userId": "u1", "name": "Aspirin", "dosage": "81mg", "time": "08:00"}),
        );
        let cookie = session_cookie(&config, "u1", UserType::EndUser);
        let app = app(config, store);

        // When
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/user/take")
                    .header(COOKIE, cookie.clone())
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("medicine_id=m1"))
                    .unwrap(),
            )
            .await
            .expect("request failed");
        settle().await;

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let page = app
            .oneshot(
                Request::builder()
                    .uri("/user")
                    .header(COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        let body = body_string(page).await;
        assert!(body.contains("Taken"));
    }

    #[tokio::test]
    async fn user_delete__should_keep_schedule_rows_visible() {
        // Given
        let store = MemoryStore::new();
        seed_end_user(&store, "u1", "John Doe", "john@example.com");
        store.put(
            "users/u1/medicines/m1",
            json!({"userId": "u1", "name": "Aspirin", "dosage": "81mg", "time": "08:00"}),
        );
        let app = app(open_config(), store);

        // When
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/caregiver/users/u1/delete")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        settle().await;

        // Then: the profile is gone but the orphaned row still lists, keyed by
        // the raw owner id
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let page = app
            .oneshot(
                Request::builder()
                    .uri("/caregiver/schedules")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        let body = body_string(page).await;
        assert!(body.contains("Aspirin"));
        assert!(body.contains("u1"));
        assert!(!body.contains("John Doe"));
    }

    #[tokio::test]
    async fn records__should_list_added_metadata() {
        // Given
        let app = app(open_config(), MemoryStore::new());

        // When
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/caregiver/records")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("file_name=bloodwork.pdf"))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let page = app
            .oneshot(
                Request::builder()
                    .uri("/caregiver/records")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        let body = body_string(page).await;
        assert!(body.contains("bloodwork.pdf"));
        assert!(body.contains("PDF"));
    }

    #[tokio::test]
    async fn stylesheet__should_be_served_without_auth() {
        // Given
        let app = app(auth_config(b"static-secret"), MemoryStore::new());

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/static/style.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .expect("content type"),
            "text/css"
        );
    }
}
