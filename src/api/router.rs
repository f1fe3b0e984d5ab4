use std::time::Duration;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{
    admin, applications, core, recent_grades, reports, scholarships, settings, students,
};
use super::types::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(core::health))
        .route(
            "/settings/allow_grade_edit",
            get(settings::get_allow_grade_edit).put(settings::put_allow_grade_edit),
        )
        .route("/students/register", post(students::register))
        .route("/students/login", post(students::login))
        .route(
            "/students/profile",
            get(students::get_profile).put(students::update_profile),
        )
        .route(
            "/students/recent-grades",
            get(recent_grades::student_recent_grades),
        )
        .route(
            "/students/applications",
            get(applications::student_applications).post(applications::apply),
        )
        .route("/scholarships", get(scholarships::list_open))
        .route("/scholarships/:id", get(scholarships::get_one))
        .route("/admin/login", post(admin::login))
        .route("/admin/students", get(admin::list_students))
        .route("/admin/students/:id", get(admin::get_student))
        .route(
            "/admin/recent-grades",
            get(recent_grades::admin_recent_grades),
        )
        .route(
            "/admin/recent-grades/:student_id",
            get(recent_grades::admin_student_recent_grades),
        )
        .route(
            "/admin/scholarships",
            get(scholarships::admin_list).post(scholarships::create),
        )
        .route(
            "/admin/scholarships/:id",
            put(scholarships::update).delete(scholarships::delete),
        )
        .route("/admin/applications", get(applications::admin_list))
        .route(
            "/admin/applications/:id/status",
            put(applications::set_status),
        )
        .route("/admin/reports/summary", get(reports::summary))
        .route(
            "/admin/reports/applications.csv",
            get(reports::applications_csv),
        )
        .fallback(core::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
