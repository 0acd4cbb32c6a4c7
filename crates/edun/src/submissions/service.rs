use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::domain::{
    BankDetails, ContactRecord, DonationRecord, DonationStatus, DonationSummary, PaymentMethod,
    RequestMetadata, SubmissionId, VolunteerRecord,
};
use super::repository::{
    DonationQuery, DonationStatusUpdate, RepositoryError, SubmissionRepository,
};
use super::validation::{self, ValidationError};
use crate::notifications::{deliver, templates, Mailboxes, Mailer};
use crate::payments::{PaymentError, PaymentGateway, PaymentRequest};

/// Per-deployment values the handlers need beyond their collaborators.
#[derive(Debug, Clone)]
pub struct SubmissionSettings {
    pub mailboxes: Mailboxes,
    pub bank_details: BankDetails,
    pub admin_token: Option<String>,
}

/// Acknowledgement returned for contact and volunteer submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub message: String,
    pub form_id: SubmissionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KhaltiCheckout {
    pub payment_url: String,
    pub pidx: String,
    pub message: String,
    pub donation_id: SubmissionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransferInstructions {
    pub message: String,
    pub bank_details: BankDetails,
    pub donation_id: SubmissionId,
}

/// What the donor needs next, depending on the payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DonationOutcome {
    Khalti(KhaltiCheckout),
    BankTransfer(BankTransferInstructions),
}

impl DonationOutcome {
    pub fn donation_id(&self) -> &SubmissionId {
        match self {
            Self::Khalti(checkout) => &checkout.donation_id,
            Self::BankTransfer(instructions) => &instructions.donation_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedPayment {
    pub message: String,
    pub donation_id: SubmissionId,
    pub status: DonationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationListing {
    pub donations: Vec<DonationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<String>,
}

/// Error raised by the submission service.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{context}")]
    Repository {
        context: &'static str,
        #[source]
        source: RepositoryError,
    },
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error("Stripe integration not yet implemented")]
    NotImplemented(PaymentMethod),
    #[error("Payment verification failed")]
    Verification,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("Server configuration error")]
    AdminNotConfigured,
}

impl SubmissionError {
    fn repository(context: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |source| Self::Repository { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Repository {
                source: RepositoryError::Conflict,
                ..
            } => StatusCode::CONFLICT,
            Self::Repository {
                source: RepositoryError::InvalidCursor,
                ..
            } => StatusCode::BAD_REQUEST,
            Self::Repository { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Payment(PaymentError::Verification(_)) | Self::Verification => {
                StatusCode::BAD_REQUEST
            }
            Self::Payment(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::AdminNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Service composing validation, persistence, payment initiation and email.
pub struct SubmissionService<R, M, P> {
    repository: Arc<R>,
    mailer: Arc<M>,
    payments: Arc<P>,
    settings: SubmissionSettings,
}

impl<R, M, P> SubmissionService<R, M, P>
where
    R: SubmissionRepository + 'static,
    M: Mailer + 'static,
    P: PaymentGateway + 'static,
{
    pub fn new(
        repository: Arc<R>,
        mailer: Arc<M>,
        payments: Arc<P>,
        settings: SubmissionSettings,
    ) -> Self {
        Self {
            repository,
            mailer,
            payments,
            settings,
        }
    }

    /// Validate and store a contact form, then notify staff and the sender.
    pub async fn submit_contact(
        &self,
        body: &Value,
        metadata: &RequestMetadata,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        info!(request_id = metadata.request_id.as_deref(), "processing contact form submission");
        let form = validation::contact_form(body).inspect_err(log_validation)?;

        let record = ContactRecord::new(form, metadata, Utc::now());
        self.repository
            .insert_contact(&record)
            .await
            .inspect_err(|err| error!(submission_id = %record.id, error = %err, "error saving contact form submission"))
            .map_err(SubmissionError::repository("Failed to process contact form"))?;
        info!(submission_id = %record.id, "contact form submission saved");

        let mailboxes = &self.settings.mailboxes;
        let id = record.id.as_str();
        deliver(
            self.mailer.as_ref(),
            templates::contact_notification(mailboxes, &record),
            "contact_notification",
            id,
        )
        .await;
        deliver(
            self.mailer.as_ref(),
            templates::contact_confirmation(mailboxes, &record),
            "contact_confirmation",
            id,
        )
        .await;

        Ok(SubmissionReceipt {
            message: "Thank you for contacting us! We will get back to you soon.".to_string(),
            form_id: record.id,
        })
    }

    /// Validate and store a volunteer application, then notify staff and the applicant.
    pub async fn submit_volunteer(
        &self,
        body: &Value,
        metadata: &RequestMetadata,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        info!(request_id = metadata.request_id.as_deref(), "processing volunteer application");
        let application = validation::volunteer_application(body).inspect_err(log_validation)?;

        let record = VolunteerRecord::new(application, Utc::now());
        self.repository
            .insert_volunteer(&record)
            .await
            .inspect_err(|err| error!(submission_id = %record.id, error = %err, "error saving volunteer application"))
            .map_err(SubmissionError::repository("Internal server error"))?;
        info!(submission_id = %record.id, "volunteer application saved");

        let mailboxes = &self.settings.mailboxes;
        let id = record.id.as_str();
        deliver(
            self.mailer.as_ref(),
            templates::volunteer_notification(mailboxes, &record),
            "volunteer_notification",
            id,
        )
        .await;
        deliver(
            self.mailer.as_ref(),
            templates::volunteer_confirmation(mailboxes, &record),
            "volunteer_confirmation",
            id,
        )
        .await;

        Ok(SubmissionReceipt {
            message: "Volunteer application submitted successfully".to_string(),
            form_id: record.id,
        })
    }

    /// Store a pending donation once, then hand off to the chosen payment method.
    pub async fn submit_donation(
        &self,
        body: &Value,
        metadata: &RequestMetadata,
    ) -> Result<DonationOutcome, SubmissionError> {
        info!(request_id = metadata.request_id.as_deref(), "creating new donation");
        let request = validation::donation_request(body).inspect_err(log_validation)?;

        let mut record = DonationRecord::new(request, metadata, Utc::now());
        self.repository
            .insert_donation(&record)
            .await
            .inspect_err(|err| error!(donation_id = %record.id, error = %err, "error saving donation"))
            .map_err(SubmissionError::repository("Failed to save donation"))?;
        info!(donation_id = %record.id, method = ?record.payment_method, "donation saved");

        let outcome = match record.payment_method {
            PaymentMethod::Khalti => DonationOutcome::Khalti(self.start_khalti(&mut record).await?),
            PaymentMethod::Stripe => {
                warn!(donation_id = %record.id, "stripe donation requested");
                return Err(SubmissionError::NotImplemented(PaymentMethod::Stripe));
            }
            PaymentMethod::BankTransfer => {
                self.set_status(&mut record, DonationStatus::Completed, None)
                    .await
                    .map_err(SubmissionError::repository("Failed to save donation"))?;
                DonationOutcome::BankTransfer(BankTransferInstructions {
                    message: "Please transfer your donation to the following bank account"
                        .to_string(),
                    bank_details: self.settings.bank_details.clone(),
                    donation_id: record.id.clone(),
                })
            }
        };

        let mailboxes = &self.settings.mailboxes;
        let id = record.id.as_str();
        deliver(
            self.mailer.as_ref(),
            templates::donation_confirmation(mailboxes, &record),
            "donation_confirmation",
            id,
        )
        .await;
        deliver(
            self.mailer.as_ref(),
            templates::donation_notification(mailboxes, &record),
            "donation_notification",
            id,
        )
        .await;

        Ok(outcome)
    }

    async fn start_khalti(
        &self,
        record: &mut DonationRecord,
    ) -> Result<KhaltiCheckout, SubmissionError> {
        let request = PaymentRequest {
            purchase_order_id: record.id.0.clone(),
            purchase_order_name: format!("Donation-{}", record.id),
            amount_paisa: record.amount_in_paisa(),
            customer_name: record.donor_name.clone(),
            customer_email: record.donor_email.clone(),
        };

        match self.payments.initiate(&request).await {
            Ok(initiation) => Ok(KhaltiCheckout {
                payment_url: initiation.payment_url,
                pidx: initiation.pidx,
                message: initiation
                    .message
                    .unwrap_or_else(|| "Payment initiated successfully".to_string()),
                donation_id: record.id.clone(),
            }),
            Err(err) => {
                error!(
                    donation_id = %record.id,
                    error = %err,
                    detail = err.detail().unwrap_or_default(),
                    "Khalti payment initiation failed"
                );
                if let Err(update_err) = self.set_status(record, DonationStatus::Failed, None).await
                {
                    error!(donation_id = %record.id, error = %update_err, "unable to mark donation failed");
                }
                Err(SubmissionError::Payment(err))
            }
        }
    }

    async fn set_status(
        &self,
        record: &mut DonationRecord,
        status: DonationStatus,
        payment_details: Option<Value>,
    ) -> Result<(), RepositoryError> {
        let updated_at = Utc::now();
        self.repository
            .update_donation_status(DonationStatusUpdate {
                id: record.id.clone(),
                status,
                updated_at,
                payment_details: payment_details.clone(),
            })
            .await?;
        record.status = status;
        record.updated_at = updated_at;
        if payment_details.is_some() {
            record.payment_details = payment_details;
        }
        Ok(())
    }

    /// Confirm a Khalti payment and mark the donation completed.
    pub async fn verify_khalti_payment(
        &self,
        body: &Value,
    ) -> Result<VerifiedPayment, SubmissionError> {
        let verification = validation::payment_verification(body).inspect_err(log_validation)?;

        let mut record = match self.repository.fetch_donation(&verification.donation_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(donation_id = %verification.donation_id, "verification for unknown donation");
                return Err(SubmissionError::Verification);
            }
            Err(err) => {
                error!(donation_id = %verification.donation_id, error = %err, "error loading donation");
                return Err(SubmissionError::Verification);
            }
        };

        if record.amount_in_paisa() != verification.amount {
            warn!(
                donation_id = %record.id,
                expected = record.amount_in_paisa(),
                received = verification.amount,
                "verification amount does not match donation"
            );
            return Err(SubmissionError::Verification);
        }

        let details = self
            .payments
            .verify(&verification.token, verification.amount)
            .await
            .map_err(|err| {
                error!(donation_id = %record.id, error = %err, detail = err.detail().unwrap_or_default(), "error verifying payment");
                SubmissionError::Verification
            })?;

        self.set_status(&mut record, DonationStatus::Completed, Some(details))
            .await
            .map_err(|err| {
                error!(donation_id = %record.id, error = %err, "error updating donation status");
                SubmissionError::Verification
            })?;
        info!(donation_id = %record.id, "donation status updated");

        Ok(VerifiedPayment {
            message: "Payment verified successfully".to_string(),
            donation_id: record.id,
            status: DonationStatus::Completed,
        })
    }

    /// Check a static bearer token against the configured admin token.
    pub fn authorize_admin(&self, authorization: Option<&str>) -> Result<(), SubmissionError> {
        let Some(header) = authorization.map(str::trim).filter(|value| !value.is_empty()) else {
            return Err(SubmissionError::Unauthorized(
                "No authorization token provided",
            ));
        };
        let Some(expected) = self.settings.admin_token.as_deref() else {
            error!("ADMIN_API_TOKEN is not configured");
            return Err(SubmissionError::AdminNotConfigured);
        };

        let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
        if tokens_match(token, expected) {
            Ok(())
        } else {
            warn!("rejected admin token");
            Err(SubmissionError::Unauthorized("Invalid or expired token"))
        }
    }

    /// Admin listing, newest first, with sensitive fields removed.
    pub async fn list_donations(
        &self,
        authorization: Option<&str>,
        query: &DonationQuery,
    ) -> Result<DonationListing, SubmissionError> {
        self.authorize_admin(authorization)?;

        let page = self
            .repository
            .list_donations(query)
            .await
            .inspect_err(|err| error!(error = %err, "error listing donations"))
            .map_err(SubmissionError::repository("Failed to retrieve donations"))?;

        Ok(DonationListing {
            donations: page.donations.iter().map(DonationRecord::sanitized).collect(),
            last_evaluated_key: page.last_evaluated_key,
        })
    }
}

fn log_validation(err: &ValidationError) {
    warn!(error = %err, issues = ?err.issues(), "validation failed");
}

/// Compares every byte so the time taken does not depend on where the first
/// mismatch sits.
fn tokens_match(candidate: &str, expected: &str) -> bool {
    let (candidate, expected) = (candidate.as_bytes(), expected.as_bytes());
    let mut diff = candidate.len() ^ expected.len();
    for (index, byte) in expected.iter().enumerate() {
        let other = candidate.get(index).copied().unwrap_or(!byte);
        diff |= usize::from(byte ^ other);
    }
    diff == 0
}
