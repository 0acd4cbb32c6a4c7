use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use edun::notifications::Mailer;
use edun::payments::PaymentGateway;
use edun::submissions::{submission_router, SubmissionRepository, SubmissionService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_submission_routes<R, M, P>(
    service: Arc<SubmissionService<R, M, P>>,
) -> axum::Router
where
    R: SubmissionRepository + 'static,
    M: Mailer + 'static,
    P: PaymentGateway + 'static,
{
    submission_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemorySubmissionRepository, LogMailer};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use edun::config::PaymentConfig;
    use edun::notifications::{EmailMessage, MailError, Mailboxes};
    use edun::payments::KhaltiClient;
    use edun::submissions::{BankDetails, SubmissionSettings};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default, Clone)]
    struct RecordingMailer {
        sent: Arc<Mutex<Vec<EmailMessage>>>,
    }

    impl RecordingMailer {
        fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().expect("mailer mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
            self.sent.lock().expect("mailer mutex poisoned").push(message);
            Ok(())
        }
    }

    fn state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    fn app<M: Mailer + 'static>(
        repository: InMemorySubmissionRepository,
        mailer: M,
        ready: bool,
    ) -> axum::Router {
        let payments = KhaltiClient::new(&PaymentConfig {
            khalti_secret_key: None,
            khalti_sandbox: true,
            return_url: "https://educatenepal.org/donation/success".to_string(),
            website_url: "https://educatenepal.org".to_string(),
        })
        .expect("http client builds");
        let service = SubmissionService::new(
            Arc::new(repository),
            Arc::new(mailer),
            Arc::new(payments),
            SubmissionSettings {
                mailboxes: Mailboxes {
                    from: "notifications@educatenepal.org".to_string(),
                    notifications: "notifications@educatenepal.org".to_string(),
                },
                bank_details: BankDetails::default(),
                admin_token: Some("local-admin".to_string()),
            },
        );
        with_submission_routes(Arc::new(service)).layer(Extension(state(ready)))
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let repository = InMemorySubmissionRepository::default();

        let pending = app(repository.clone(), LogMailer, false)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(pending.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(read_json(pending).await["status"], "initializing");

        let ready = app(repository, LogMailer, true)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let response = app(InMemorySubmissionRepository::default(), LogMailer, true)
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).expect("content type"),
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn contact_form_is_stored_and_mailed() {
        let repository = InMemorySubmissionRepository::default();
        let mailer = RecordingMailer::default();
        let body = json!({
            "name": "Sita Sharma",
            "email": "sita@example.org",
            "subject": "School visit",
            "message": "We would love to visit the school next month."
        });

        let response = app(repository.clone(), mailer.clone(), true)
            .oneshot(
                Request::post("/contact")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["success"], true);
        assert_eq!(repository.contact_count(), 1);
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn khalti_without_secret_fails_and_keeps_failed_record() {
        let repository = InMemorySubmissionRepository::default();
        let body = json!({
            "amount": 1000,
            "currency": "NPR",
            "donorName": "Gita Rai",
            "donorEmail": "gita@example.org",
            "paymentMethod": "khalti"
        });

        let response = app(repository.clone(), LogMailer, true)
            .oneshot(
                Request::post("/donation")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            read_json(response).await["error"],
            "Payment provider not configured"
        );

        let listing = repository
            .list_donations(&edun::submissions::DonationQuery::default())
            .await
            .expect("listing");
        assert_eq!(listing.donations.len(), 1);
        assert_eq!(
            listing.donations[0].status,
            edun::submissions::DonationStatus::Failed
        );
    }
}
