use askama::Template;
use askama_web::WebTemplate;

use crate::errors::PermissionError;
use crate::state::RecordEntry;

#[derive(Template, WebTemplate)]
#[template(path = "landing.html")]
pub(crate) struct LandingTemplate {
    pub(crate) app_name: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub(crate) struct LoginTemplate {
    pub(crate) app_name: String,
    pub(crate) role: String,
    pub(crate) error: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "signup.html")]
pub(crate) struct SignupTemplate {
    pub(crate) app_name: String,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) error: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub(crate) struct DashboardTemplate {
    pub(crate) app_name: String,
    pub(crate) denials: Vec<PermissionError>,
    pub(crate) active_users: usize,
    pub(crate) medicine_count: usize,
    pub(crate) task_count: usize,
    pub(crate) completions_today: usize,
}

pub(crate) struct UserRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) initials: String,
    pub(crate) status: String,
    pub(crate) last_activity: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "users.html")]
pub(crate) struct UsersTemplate {
    pub(crate) app_name: String,
    pub(crate) denials: Vec<PermissionError>,
    pub(crate) users: Vec<UserRow>,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) notice: String,
    pub(crate) error: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "user_edit.html")]
pub(crate) struct UserEditTemplate {
    pub(crate) app_name: String,
    pub(crate) denials: Vec<PermissionError>,
    pub(crate) user_id: String,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) error: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "user_delete.html")]
pub(crate) struct UserDeleteTemplate {
    pub(crate) app_name: String,
    pub(crate) denials: Vec<PermissionError>,
    pub(crate) user_id: String,
    pub(crate) name: String,
}

pub(crate) struct UserOption {
    pub(crate) id: String,
    pub(crate) name: String,
}

pub(crate) struct MedicineRow {
    pub(crate) user_id: String,
    pub(crate) medicine_id: String,
    pub(crate) user_name: String,
    pub(crate) name: String,
    pub(crate) dosage: String,
    pub(crate) time: String,
}

pub(crate) struct TaskRow {
    pub(crate) user_id: String,
    pub(crate) task_id: String,
    pub(crate) user_name: String,
    pub(crate) description: String,
    pub(crate) time: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "schedules.html")]
pub(crate) struct SchedulesTemplate {
    pub(crate) app_name: String,
    pub(crate) denials: Vec<PermissionError>,
    pub(crate) users: Vec<UserOption>,
    pub(crate) medicines: Vec<MedicineRow>,
    pub(crate) tasks: Vec<TaskRow>,
    pub(crate) notice: String,
    pub(crate) error: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "medicine_edit.html")]
pub(crate) struct MedicineEditTemplate {
    pub(crate) app_name: String,
    pub(crate) denials: Vec<PermissionError>,
    pub(crate) user_id: String,
    pub(crate) medicine_id: String,
    pub(crate) name: String,
    pub(crate) dosage: String,
    pub(crate) time: String,
    pub(crate) error: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "task_edit.html")]
pub(crate) struct TaskEditTemplate {
    pub(crate) app_name: String,
    pub(crate) denials: Vec<PermissionError>,
    pub(crate) user_id: String,
    pub(crate) task_id: String,
    pub(crate) description: String,
    pub(crate) time: String,
    pub(crate) error: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "records.html")]
pub(crate) struct RecordsTemplate {
    pub(crate) app_name: String,
    pub(crate) denials: Vec<PermissionError>,
    pub(crate) records: Vec<RecordEntry>,
    pub(crate) error: String,
}

pub(crate) struct ReportRow {
    pub(crate) user_name: String,
    pub(crate) medicine_count: usize,
    pub(crate) task_count: usize,
    pub(crate) completed_today: usize,
    pub(crate) last_activity: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "reports.html")]
pub(crate) struct ReportsTemplate {
    pub(crate) app_name: String,
    pub(crate) denials: Vec<PermissionError>,
    pub(crate) rows: Vec<ReportRow>,
}

#[derive(Template, WebTemplate)]
#[template(path = "settings.html")]
pub(crate) struct SettingsTemplate {
    pub(crate) app_name: String,
    pub(crate) denials: Vec<PermissionError>,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) language: String,
    pub(crate) notice: String,
    pub(crate) error: String,
}

pub(crate) struct PortalMedicine {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) dosage: String,
    pub(crate) time: String,
    pub(crate) taken: bool,
}

pub(crate) struct PortalTask {
    pub(crate) id: String,
    pub(crate) description: String,
    pub(crate) time: String,
    pub(crate) done: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "portal.html")]
pub(crate) struct PortalTemplate {
    pub(crate) app_name: String,
    pub(crate) greeting: String,
    pub(crate) user_name: String,
    pub(crate) medicines: Vec<PortalMedicine>,
    pub(crate) tasks: Vec<PortalTask>,
}
