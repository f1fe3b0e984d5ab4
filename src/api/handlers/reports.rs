use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::error::{ok, ApiError, ApiResult};
use crate::api::extract::AdminUser;
use crate::api::types::AppState;
use crate::scholarships::{self, Application};

pub async fn summary(State(state): State<AppState>, _admin: AdminUser) -> ApiResult {
    let conn = state.db()?;
    let rows = scholarships::summary(&conn)?;
    Ok(ok(json!({ "scholarships": rows })))
}

pub async fn applications_csv(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Response, ApiError> {
    let rows = {
        let conn = state.db()?;
        scholarships::list_applications(&conn, None)?
    };
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
        (
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"applications.csv\"",
        ),
    ];
    Ok((headers, applications_to_csv(&rows)).into_response())
}

const CSV_COLUMNS: [&str; 8] = [
    "applicationId",
    "studentId",
    "studentName",
    "scholarship",
    "status",
    "remarks",
    "createdAt",
    "reviewedAt",
];

fn applications_to_csv(rows: &[Application]) -> String {
    let mut lines = vec![CSV_COLUMNS.join(",")];
    for a in rows {
        let fields = [
            a.id.as_str(),
            a.student_id.as_str(),
            a.student_name.as_str(),
            a.scholarship_title.as_str(),
            a.status.as_str(),
            a.remarks.as_deref().unwrap_or(""),
            a.created_at.as_str(),
            a.reviewed_at.as_deref().unwrap_or(""),
        ];
        lines.push(
            fields
                .iter()
                .map(|f| csv_escape(f))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scholarships::ApplicationStatus;

    #[test]
    fn csv_quotes_only_when_needed() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn csv_has_header_and_one_line_per_application() {
        let rows = vec![Application {
            id: "a1".into(),
            student_id: "s1".into(),
            student_name: "Ana Reyes".into(),
            scholarship_id: "sc1".into(),
            scholarship_title: "Merit, Gold".into(),
            status: ApplicationStatus::Approved,
            essay: None,
            remarks: None,
            created_at: "2025-01-01T00:00:00.000000Z".into(),
            reviewed_at: None,
        }];
        let csv = applications_to_csv(&rows);
        let lines: Vec<&str> = csv.trim_end().split("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("applicationId,studentId"));
        assert_eq!(
            lines[1],
            "a1,s1,Ana Reyes,\"Merit, Gold\",approved,,2025-01-01T00:00:00.000000Z,"
        );
    }
}
