use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use super::domain::RequestMetadata;
use super::repository::{DonationQuery, SubmissionRepository};
use super::response::{cors_layer, error_response, preflight_no_content, success_response};
use super::service::{SubmissionError, SubmissionService};
use super::validation::parse_body;
use crate::notifications::Mailer;
use crate::payments::PaymentGateway;

/// Router builder exposing the form endpoints used by the website.
pub fn submission_router<R, M, P>(service: Arc<SubmissionService<R, M, P>>) -> Router
where
    R: SubmissionRepository + 'static,
    M: Mailer + 'static,
    P: PaymentGateway + 'static,
{
    Router::new()
        .route("/contact", post(contact_handler::<R, M, P>))
        .route("/volunteer", post(volunteer_handler::<R, M, P>))
        .route("/donation", post(donation_handler::<R, M, P>))
        .route("/donation/verify", post(verify_handler::<R, M, P>))
        .route("/donations", get(list_donations_handler::<R, M, P>))
        .layer(cors_layer())
        .layer(middleware::from_fn(preflight_no_content))
        .with_state(service)
}

/// Pulls the audit fields the records keep from proxy and client headers.
pub fn request_metadata(headers: &HeaderMap) -> RequestMetadata {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    RequestMetadata {
        request_id: text("x-request-id"),
        source_ip: text("x-forwarded-for")
            .and_then(|chain| chain.split(',').next().map(|ip| ip.trim().to_string())),
        user_agent: text(header::USER_AGENT.as_str()),
    }
}

fn respond<T: Serialize>(result: Result<T, SubmissionError>) -> Response {
    match result {
        Ok(data) => success_response(&data),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn contact_handler<R, M, P>(
    State(service): State<Arc<SubmissionService<R, M, P>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: SubmissionRepository + 'static,
    M: Mailer + 'static,
    P: PaymentGateway + 'static,
{
    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(err) => return SubmissionError::from(err).into_response(),
    };
    respond(
        service
            .submit_contact(&body, &request_metadata(&headers))
            .await,
    )
}

pub(crate) async fn volunteer_handler<R, M, P>(
    State(service): State<Arc<SubmissionService<R, M, P>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: SubmissionRepository + 'static,
    M: Mailer + 'static,
    P: PaymentGateway + 'static,
{
    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(err) => return SubmissionError::from(err).into_response(),
    };
    respond(
        service
            .submit_volunteer(&body, &request_metadata(&headers))
            .await,
    )
}

pub(crate) async fn donation_handler<R, M, P>(
    State(service): State<Arc<SubmissionService<R, M, P>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: SubmissionRepository + 'static,
    M: Mailer + 'static,
    P: PaymentGateway + 'static,
{
    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(err) => return SubmissionError::from(err).into_response(),
    };
    respond(
        service
            .submit_donation(&body, &request_metadata(&headers))
            .await,
    )
}

pub(crate) async fn verify_handler<R, M, P>(
    State(service): State<Arc<SubmissionService<R, M, P>>>,
    body: Bytes,
) -> Response
where
    R: SubmissionRepository + 'static,
    M: Mailer + 'static,
    P: PaymentGateway + 'static,
{
    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(err) => return SubmissionError::from(err).into_response(),
    };
    respond(service.verify_khalti_payment(&body).await)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListDonationsParams {
    email: Option<String>,
    cursor: Option<String>,
    limit: Option<String>,
}

impl From<ListDonationsParams> for DonationQuery {
    fn from(params: ListDonationsParams) -> Self {
        Self {
            donor_email: params.email.filter(|email| !email.trim().is_empty()),
            cursor: params.cursor.filter(|cursor| !cursor.is_empty()),
            limit: params.limit.and_then(|raw| raw.trim().parse().ok()),
        }
    }
}

pub(crate) async fn list_donations_handler<R, M, P>(
    State(service): State<Arc<SubmissionService<R, M, P>>>,
    headers: HeaderMap,
    query: Result<Query<ListDonationsParams>, QueryRejection>,
) -> Response
where
    R: SubmissionRepository + 'static,
    M: Mailer + 'static,
    P: PaymentGateway + 'static,
{
    let Query(params) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return error_response(
                "Invalid query parameters",
                StatusCode::BAD_REQUEST,
                Some(rejection.body_text()),
            )
        }
    };
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    respond(
        service
            .list_donations(authorization, &DonationQuery::from(params))
            .await,
    )
}
