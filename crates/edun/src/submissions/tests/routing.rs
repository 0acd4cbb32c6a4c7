use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::{
    build_service, contact_body, donation_body, read_json_body, router_with_service,
    volunteer_body, FakeGateway, GatewayMode, MemoryMailer, MemoryRepository, ADMIN_TOKEN,
};
use crate::submissions::router::{self, request_metadata};

const SITE_ORIGIN: &str = "https://educatenepal.org";

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::post(uri)
        .header(header::ORIGIN, SITE_ORIGIN)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn contact_route_returns_success_envelope_with_cors() {
    let (service, _, _, _) = build_service(GatewayMode::Succeeds);
    let response = router_with_service(service)
        .oneshot(post_json("/contact", contact_body().to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("*"))
    );
    let body = read_json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "Thank you for contacting us! We will get back to you soon."
    );
    assert!(body["formId"]
        .as_str()
        .expect("form id")
        .starts_with("contact-"));
}

#[tokio::test]
async fn invalid_json_is_a_bad_request() {
    let (service, _, _, _) = build_service(GatewayMode::Succeeds);
    let response = router_with_service(service)
        .oneshot(post_json("/volunteer", "{not json".to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("*"))
    );
    let body = read_json_body(response).await;
    assert_eq!(body, json!({ "success": false, "error": "Invalid JSON in request body" }));
}

#[tokio::test]
async fn empty_body_is_a_bad_request() {
    let (service, _, _, _) = build_service(GatewayMode::Succeeds);
    let response = router_with_service(service)
        .oneshot(post_json("/donation", String::new()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "Request body is required");
}

#[tokio::test]
async fn validation_errors_list_each_issue() {
    let (service, _, _, _) = build_service(GatewayMode::Succeeds);
    let mut contact = contact_body();
    contact["email"] = json!("nobody");
    let response = router_with_service(service)
        .oneshot(post_json("/contact", contact.to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid input data");
    assert_eq!(
        body["errors"],
        json!([{ "path": "email", "message": "Invalid email address" }])
    );
}

#[tokio::test]
async fn preflight_is_answered_without_content() {
    let (service, _, _, _) = build_service(GatewayMode::Succeeds);
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/donation/verify")
        .header(header::ORIGIN, SITE_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .expect("request");
    let response = router_with_service(service)
        .oneshot(request)
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("*"))
    );
    let methods = header_text(headers, header::ACCESS_CONTROL_ALLOW_METHODS);
    for method in ["GET", "POST", "OPTIONS"] {
        assert!(methods.contains(method), "missing {method} in {methods}");
    }
    let allowed = header_text(headers, header::ACCESS_CONTROL_ALLOW_HEADERS).to_ascii_lowercase();
    assert!(allowed.contains("content-type"));
    assert!(allowed.contains("authorization"));
}

#[tokio::test]
async fn preflight_is_answered_on_get_routes_too() {
    let (service, _, _, _) = build_service(GatewayMode::Succeeds);
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/donations")
        .header(header::ORIGIN, SITE_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .expect("request");
    let response = router_with_service(service)
        .oneshot(request)
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

fn header_text(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn bank_transfer_route_returns_instructions() {
    let (service, _, _, _) = build_service(GatewayMode::Succeeds);
    let response = router_with_service(service)
        .oneshot(post_json("/donation", donation_body("bank_transfer").to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["bankDetails"]["accountName"], "Educate Nepal Initiative");
    assert!(body["donationId"].is_string());
}

#[tokio::test]
async fn stripe_route_reports_not_implemented() {
    let (service, _, _, _) = build_service(GatewayMode::Succeeds);
    let response = router_with_service(service)
        .oneshot(post_json("/donation", donation_body("stripe").to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "Stripe integration not yet implemented");
}

#[tokio::test]
async fn donations_listing_needs_a_token() {
    let (service, _, _, _) = build_service(GatewayMode::Succeeds);
    let response = router_with_service(service)
        .oneshot(
            Request::get("/donations")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "No authorization token provided");
}

#[tokio::test]
async fn donations_listing_filters_by_email() {
    let (service, _, _, _) = build_service(GatewayMode::Succeeds);
    let service = Arc::new(service);
    let mut other = donation_body("bank_transfer");
    other["donorEmail"] = json!("other@example.org");
    for body in [donation_body("bank_transfer"), other] {
        service
            .submit_donation(&body, &Default::default())
            .await
            .expect("donation stored");
    }

    let response = router::submission_router(service)
        .oneshot(
            Request::get("/donations?email=other@example.org&limit=5")
                .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let donations = body["donations"].as_array().expect("donations");
    assert_eq!(donations.len(), 1);
    assert_eq!(donations[0]["donorEmail"], "other@example.org");
    assert!(body.get("lastEvaluatedKey").is_none());
}

#[tokio::test]
async fn malformed_listing_query_gets_json_envelope() {
    let (service, _, _, _) = build_service(GatewayMode::Succeeds);
    let response = router_with_service(service)
        .oneshot(
            Request::get("/donations?email=a@example.org&email=b@example.org")
                .header(header::ORIGIN, SITE_ORIGIN)
                .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&HeaderValue::from_static("*"))
    );
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE),
        Some(&HeaderValue::from_static("application/json"))
    );
    let body = read_json_body(response).await;
    assert_eq!(body, json!({ "success": false, "error": "Invalid query parameters" }));
}

#[tokio::test]
async fn verify_handler_rejects_unknown_donation() {
    let service = Arc::new(crate::submissions::SubmissionService::new(
        Arc::new(MemoryRepository::default()),
        Arc::new(MemoryMailer::default()),
        Arc::new(FakeGateway::new(GatewayMode::Succeeds)),
        super::common::settings(),
    ));
    let body = json!({
        "token": "tok",
        "amount": 1000,
        "donationId": "6f1c1f7e-4a4b-4c1d-9a55-0d6f4c1b2e3a"
    });

    let response = router::verify_handler(State(service), Bytes::from(body.to_string())).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "Payment verification failed");
}

#[tokio::test]
async fn volunteer_handler_accepts_direct_calls() {
    let (service, repository, _, _) = build_service(GatewayMode::Succeeds);
    let response = router::volunteer_handler(
        State(Arc::new(service)),
        HeaderMap::new(),
        Bytes::from(volunteer_body().to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(repository.volunteers.lock().expect("lock").len(), 1);
}

#[test]
fn metadata_uses_first_forwarded_address() {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4, 10.0.0.1"));
    headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
    headers.insert("x-request-id", HeaderValue::from_static("abc-123"));

    let metadata = request_metadata(&headers);

    assert_eq!(metadata.source_ip.as_deref(), Some("198.51.100.4"));
    assert_eq!(metadata.user_agent.as_deref(), Some("Mozilla/5.0"));
    assert_eq!(metadata.request_id.as_deref(), Some("abc-123"));
}
