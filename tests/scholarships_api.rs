mod common;

use axum::http::StatusCode;
use common::{admin_token, app, register_student, request, request_ok, request_raw};
use serde_json::{json, Value};

async fn create_scholarship(app: &axum::Router, admin: &str, body: Value) -> String {
    let (status, resp) = request(app, "POST", "/admin/scholarships", Some(admin), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", resp);
    resp["scholarship"]["id"].as_str().expect("scholarship id").to_string()
}

#[tokio::test]
async fn admin_manages_programs() {
    let app = app("scholard-scholarships-crud");
    let admin = admin_token(&app).await;

    let open = create_scholarship(
        &app,
        &admin,
        json!({ "title": "Merit Grant", "amount": 5000.0, "slots": 2, "deadline": "2099-12-31" }),
    )
    .await;
    let closed = create_scholarship(
        &app,
        &admin,
        json!({ "title": "Old Grant", "amount": 100.0, "slots": 1, "status": "closed" }),
    )
    .await;

    let public = request_ok(&app, "GET", "/scholarships", None, None).await;
    let rows = public["scholarships"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(open));

    let all = request_ok(&app, "GET", "/admin/scholarships", Some(&admin), None).await;
    assert_eq!(all["scholarships"].as_array().unwrap().len(), 2);

    let updated = request_ok(
        &app,
        "PUT",
        &format!("/admin/scholarships/{closed}"),
        Some(&admin),
        Some(json!({ "title": "Old Grant", "amount": 100.0, "slots": 1, "status": "open" })),
    )
    .await;
    assert_eq!(updated["scholarship"]["status"], json!("open"));

    request_ok(&app, "DELETE", &format!("/admin/scholarships/{closed}"), Some(&admin), None).await;
    let (status, _) = request(&app, "GET", &format!("/scholarships/{closed}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn program_validation() {
    let app = app("scholard-scholarships-validation");
    let admin = admin_token(&app).await;
    for bad in [
        json!({ "title": "", "amount": 1.0, "slots": 1 }),
        json!({ "title": "X", "amount": -1.0, "slots": 1 }),
        json!({ "title": "X", "amount": 1.0, "slots": 0 }),
        json!({ "title": "X", "amount": 1.0, "slots": 1, "deadline": "31/12/2099" }),
        json!({ "title": "X", "amount": 1.0, "slots": 1, "status": "paused" }),
    ] {
        let (status, body) =
            request(&app, "POST", "/admin/scholarships", Some(&admin), Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    }
}

#[tokio::test]
async fn apply_review_and_report() {
    let app = app("scholard-scholarships-apply");
    let admin = admin_token(&app).await;
    let (_, ana) = register_student(&app, "ana").await;
    let (_, ben) = register_student(&app, "ben").await;

    let grant = create_scholarship(
        &app,
        &admin,
        json!({ "title": "Merit, Gold", "amount": 5000.0, "slots": 1 }),
    )
    .await;
    let closed = create_scholarship(
        &app,
        &admin,
        json!({ "title": "Closed", "amount": 1.0, "slots": 1, "status": "closed" }),
    )
    .await;
    let expired = create_scholarship(
        &app,
        &admin,
        json!({ "title": "Expired", "amount": 1.0, "slots": 1, "deadline": "2000-01-01" }),
    )
    .await;

    let mut application_ids = Vec::new();
    for token in [&ana, &ben] {
        let (status, body) = request(
            &app,
            "POST",
            "/students/applications",
            Some(token.as_str()),
            Some(json!({ "scholarshipId": grant, "essay": "Please." })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["application"]["status"], json!("pending"));
        application_ids.push(body["application"]["id"].as_str().unwrap().to_string());
    }

    let (status, _) = request(
        &app,
        "POST",
        "/students/applications",
        Some(&ana),
        Some(json!({ "scholarshipId": grant })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for id in [&closed, &expired] {
        let (status, _) = request(
            &app,
            "POST",
            "/students/applications",
            Some(&ana),
            Some(json!({ "scholarshipId": id })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let mine = request_ok(&app, "GET", "/students/applications", Some(&ana), None).await;
    assert_eq!(mine["applications"].as_array().unwrap().len(), 1);
    assert_eq!(mine["applications"][0]["scholarshipTitle"], json!("Merit, Gold"));

    // One slot: the second approval is refused.
    let approved = request_ok(
        &app,
        "PUT",
        &format!("/admin/applications/{}/status", application_ids[0]),
        Some(&admin),
        Some(json!({ "status": "approved", "remarks": "Strong record" })),
    )
    .await;
    assert_eq!(approved["application"]["status"], json!("approved"));
    assert!(approved["application"]["reviewedAt"].is_string());

    let (status, body) = request(
        &app,
        "PUT",
        &format!("/admin/applications/{}/status", application_ids[1]),
        Some(&admin),
        Some(json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    request_ok(
        &app,
        "PUT",
        &format!("/admin/applications/{}/status", application_ids[1]),
        Some(&admin),
        Some(json!({ "status": "rejected" })),
    )
    .await;

    let pending = request_ok(&app, "GET", "/admin/applications?status=pending", Some(&admin), None).await;
    assert!(pending["applications"].as_array().unwrap().is_empty());
    let (status, _) = request(&app, "GET", "/admin/applications?status=bogus", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let summary = request_ok(&app, "GET", "/admin/reports/summary", Some(&admin), None).await;
    let merit = summary["scholarships"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["scholarshipId"] == json!(grant))
        .expect("merit row")
        .clone();
    assert_eq!(merit["total"], json!(2));
    assert_eq!(merit["approved"], json!(1));
    assert_eq!(merit["rejected"], json!(1));
    assert_eq!(merit["remainingSlots"], json!(0));

    let (status, csv) = request_raw(&app, "GET", "/admin/reports/applications.csv", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(csv).expect("utf8 csv");
    assert_eq!(csv.trim_end().split("\r\n").count(), 3);
    assert!(csv.contains("\"Merit, Gold\""));

    // Programs with applications cannot be deleted.
    let (status, _) = request(&app, "DELETE", &format!("/admin/scholarships/{grant}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn bad_query_and_path_use_the_json_envelope() {
    let app = app("scholard-scholarships-rejections");
    let admin = admin_token(&app).await;

    let (status, body) = request(
        &app,
        "GET",
        "/admin/applications?status=pending&status=approved",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["message"].is_string());

    let (status, body) = request(&app, "GET", "/scholarships/%FF", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}
