use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySubmissionRepository, LogMailer, Outbox, SubmissionStore};
use crate::routes::with_submission_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use edun::config::{AppConfig, EmailBackend, StorageBackend};
use edun::error::AppError;
use edun::notifications::{Mailboxes, SesMailer};
use edun::payments::KhaltiClient;
use edun::submissions::{
    BankDetails, DynamoSubmissionRepository, SubmissionService, SubmissionSettings,
};
use edun::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = match config.storage.backend {
        StorageBackend::Memory => {
            warn!("using in-memory storage; submissions are lost on restart");
            SubmissionStore::Memory(InMemorySubmissionRepository::default())
        }
        StorageBackend::DynamoDb => SubmissionStore::DynamoDb(
            DynamoSubmissionRepository::from_config(&config.storage).await,
        ),
    };
    let mailer = match config.email.backend {
        EmailBackend::Log => Outbox::Log(LogMailer),
        EmailBackend::Ses => Outbox::Ses(SesMailer::from_env().await),
    };
    let payments = KhaltiClient::new(&config.payments)?;
    if config.payments.khalti_secret_key.is_none() {
        warn!("KHALTI_SECRET_KEY is not set; khalti donations will fail");
    }

    let settings = SubmissionSettings {
        mailboxes: Mailboxes::from(&config.email),
        bank_details: BankDetails::default(),
        admin_token: config.admin_token.clone(),
    };
    let submission_service = Arc::new(SubmissionService::new(
        Arc::new(repository),
        Arc::new(mailer),
        Arc::new(payments),
        settings,
    ));

    let app = with_submission_routes(submission_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        storage = ?config.storage.backend,
        email = ?config.email.backend,
        sandbox = config.payments.khalti_sandbox,
        %addr,
        "educate nepal api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
