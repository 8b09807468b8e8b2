use crate::care::{MedicinePatch, NewMedicine, NewTask, TaskPatch, join_user_names, valid_time_of_day};
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

use super::users::FlashQuery;

const STORE_UNAVAILABLE: (StatusCode, &str) = (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable");

pub(crate) async fn schedule_list<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<FlashQuery>,
) -> Result<templates::SchedulesTemplate, (StatusCode, &'static str)> {
    let users = state.care.end_users().await.map_err(|_| STORE_UNAVAILABLE)?;
    let medicines = state.care.all_medicines().await.map_err(|_| STORE_UNAVAILABLE)?;
    let tasks = state.care.all_tasks().await.map_err(|_| STORE_UNAVAILABLE)?;

    let medicines = join_user_names(&users, medicines, |medicine| &medicine.user_id)
        .into_iter()
        .map(|named| templates::MedicineRow {
            user_name: named.user_name,
            user_id: named.item.user_id,
            medicine_id: named.item.id,
            name: named.item.name,
            dosage: named.item.dosage,
            time: named.item.time,
        })
        .collect();
    let tasks = join_user_names(&users, tasks, |task| &task.user_id)
        .into_iter()
        .map(|named| templates::TaskRow {
            user_name: named.user_name,
            user_id: named.item.user_id,
            task_id: named.item.id,
            description: named.item.description,
            time: named.item.time,
        })
        .collect();

    Ok(templates::SchedulesTemplate {
        app_name: state.config.app_name,
        denials: state.denials.recent(),
        users: users
            .into_iter()
            .map(|user| templates::UserOption {
                id: user.id,
                name: user.name,
            })
            .collect(),
        medicines,
        tasks,
        notice: query.notice.unwrap_or_default(),
        error: query.error.unwrap_or_default(),
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct MedicineForm {
    user_id: String,
    name: String,
    dosage: String,
    time: String,
}

pub(crate) async fn medicine_add<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Form(form): Form<MedicineForm>,
) -> Redirect {
    let name = form.name.trim().to_string();
    let dosage = form.dosage.trim().to_string();
    if name.is_empty() || dosage.is_empty() || !valid_time_of_day(&form.time) {
        return Redirect::to(
            "/caregiver/schedules?error=Medicine%2C%20dosage%20and%20a%20HH%3AMM%20time%20are%20required.",
        );
    }
    if !matches!(state.care.user(&form.user_id).await, Ok(Some(_))) {
        return Redirect::to("/caregiver/schedules?error=Pick%20a%20user%20first.");
    }

    state.care.add_medicine(
        &form.user_id,
        NewMedicine {
            name,
            dosage,
            time: form.time,
        },
    );

    Redirect::to("/caregiver/schedules?notice=Medicine%20added.")
}

#[derive(Debug, Deserialize)]
pub(crate) struct MedicineEditForm {
    name: String,
    dosage: String,
    time: String,
}

pub(crate) async fn medicine_edit_form<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((user_id, medicine_id)): Path<(String, String)>,
) -> Result<templates::MedicineEditTemplate, (StatusCode, &'static str)> {
    let medicine = state
        .care
        .medicines_for(&user_id)
        .await
        .map_err(|_| STORE_UNAVAILABLE)?
        .into_iter()
        .find(|medicine| medicine.id == medicine_id)
        .ok_or((StatusCode::NOT_FOUND, "no such medicine"))?;

    Ok(templates::MedicineEditTemplate {
        app_name: state.config.app_name,
        denials: state.denials.recent(),
        user_id,
        medicine_id,
        name: medicine.name,
        dosage: medicine.dosage,
        time: medicine.time,
        error: String::new(),
    })
}

pub(crate) async fn medicine_edit_submit<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((user_id, medicine_id)): Path<(String, String)>,
    Form(form): Form<MedicineEditForm>,
) -> Redirect {
    let name = form.name.trim().to_string();
    let dosage = form.dosage.trim().to_string();
    if name.is_empty() || dosage.is_empty() || !valid_time_of_day(&form.time) {
        return Redirect::to(
            "/caregiver/schedules?error=Medicine%2C%20dosage%20and%20a%20HH%3AMM%20time%20are%20required.",
        );
    }

    state.care.update_medicine(
        &user_id,
        &medicine_id,
        MedicinePatch {
            name: Some(name),
            dosage: Some(dosage),
            time: Some(form.time),
        },
    );

    Redirect::to("/caregiver/schedules?notice=Medicine%20updated.")
}

pub(crate) async fn medicine_delete<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((user_id, medicine_id)): Path<(String, String)>,
) -> Redirect {
    state.care.delete_medicine(&user_id, &medicine_id);
    Redirect::to("/caregiver/schedules?notice=Medicine%20deleted.")
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskForm {
    user_id: String,
    description: String,
    time: String,
}

pub(crate) async fn task_add<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Form(form): Form<TaskForm>,
) -> Redirect {
    let description = form.description.trim().to_string();
    if description.is_empty() || !valid_time_of_day(&form.time) {
        return Redirect::to(
            "/caregiver/schedules?error=A%20task%20and%20a%20HH%3AMM%20time%20are%20required.",
        );
    }
    if !matches!(state.care.user(&form.user_id).await, Ok(Some(_))) {
        return Redirect::to("/caregiver/schedules?error=Pick%20a%20user%20first.");
    }

    state.care.add_task(
        &form.user_id,
        NewTask {
            description,
            time: form.time,
        },
    );

    Redirect::to("/caregiver/schedules?notice=Task%20added.")
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskEditForm {
    description: String,
    time: String,
}

pub(crate) async fn task_edit_form<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((user_id, task_id)): Path<(String, String)>,
) -> Result<templates::TaskEditTemplate, (StatusCode, &'static str)> {
    let task = state
        .care
        .tasks_for(&user_id)
        .await
        .map_err(|_| STORE_UNAVAILABLE)?
        .into_iter()
        .find(|task| task.id == task_id)
        .ok_or((StatusCode::NOT_FOUND, "no such task"))?;

    Ok(templates::TaskEditTemplate {
        app_name: state.config.app_name,
        denials: state.denials.recent(),
        user_id,
        task_id,
        description: task.description,
        time: task.time,
        error: String::new(),
    })
}

pub(crate) async fn task_edit_submit<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((user_id, task_id)): Path<(String, String)>,
    Form(form): Form<TaskEditForm>,
) -> Redirect {
    let description = form.description.trim().to_string();
    if description.is_empty() || !valid_time_of_day(&form.time) {
        return Redirect::to(
            "/caregiver/schedules?error=A%20task%20and%20a%20HH%3AMM%20time%20are%20required.",
        );
    }

    state.care.update_task(
        &user_id,
        &task_id,
        TaskPatch {
            description: Some(description),
            time: Some(form.time),
        },
    );

    Redirect::to("/caregiver/schedules?notice=Task%20updated.")
}

pub(crate) async fn task_delete<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((user_id, task_id)): Path<(String, String)>,
) -> Redirect {
    state.care.delete_task(&user_id, &task_id);
    Redirect::to("/caregiver/schedules?notice=Task%20deleted.")
}
