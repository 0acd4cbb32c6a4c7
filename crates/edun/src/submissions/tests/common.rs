use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::notifications::{EmailMessage, MailError, Mailboxes, Mailer};
use crate::payments::{PaymentError, PaymentGateway, PaymentInitiation, PaymentRequest};
use crate::submissions::domain::{
    BankDetails, ContactRecord, DonationRecord, SubmissionId, VolunteerRecord,
};
use crate::submissions::repository::{
    DonationPage, DonationQuery, DonationStatusUpdate, RepositoryError, SubmissionRepository,
};
use crate::submissions::{submission_router, SubmissionService, SubmissionSettings};

pub(super) const ADMIN_TOKEN: &str = "admin-secret";

pub(super) fn contact_body() -> Value {
    json!({
        "name": "Sita Sharma",
        "email": "sita@example.org",
        "subject": "School visit",
        "message": "We would love to visit the Sindhupalchok school.",
        "phone": "+977 9800000000",
        "interest": "partnership"
    })
}

pub(super) fn volunteer_body() -> Value {
    json!({
        "name": "Hari Thapa",
        "email": "hari@example.org",
        "phone": "+977 9811111111",
        "skills": ["teaching", "mathematics"],
        "availability": "Weekends",
        "experience": "Two years tutoring",
        "motivation": "Give back to my village"
    })
}

pub(super) fn donation_body(method: &str) -> Value {
    json!({
        "amount": 1500,
        "currency": "NPR",
        "donorName": "Gita Rai",
        "donorEmail": "gita@example.org",
        "paymentMethod": method,
        "purpose": "scholarship",
        "message": "For the scholarship fund"
    })
}

pub(super) fn settings() -> SubmissionSettings {
    SubmissionSettings {
        mailboxes: Mailboxes {
            from: "notifications@educatenepal.org".to_string(),
            notifications: "team@educatenepal.org".to_string(),
        },
        bank_details: BankDetails::default(),
        admin_token: Some(ADMIN_TOKEN.to_string()),
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    pub(super) contacts: Mutex<Vec<ContactRecord>>,
    pub(super) volunteers: Mutex<Vec<VolunteerRecord>>,
    pub(super) donations: Mutex<BTreeMap<SubmissionId, DonationRecord>>,
    pub(super) donation_inserts: AtomicUsize,
    pub(super) status_updates: Mutex<Vec<DonationStatusUpdate>>,
}

impl MemoryRepository {
    pub(super) fn donation(&self, id: &SubmissionId) -> Option<DonationRecord> {
        self.donations
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
    }

    pub(super) fn donation_count(&self) -> usize {
        self.donations.lock().expect("repository mutex poisoned").len()
    }
}

#[async_trait]
impl SubmissionRepository for MemoryRepository {
    async fn insert_contact(&self, record: &ContactRecord) -> Result<(), RepositoryError> {
        self.contacts
            .lock()
            .expect("repository mutex poisoned")
            .push(record.clone());
        Ok(())
    }

    async fn insert_volunteer(&self, record: &VolunteerRecord) -> Result<(), RepositoryError> {
        self.volunteers
            .lock()
            .expect("repository mutex poisoned")
            .push(record.clone());
        Ok(())
    }

    async fn insert_donation(&self, record: &DonationRecord) -> Result<(), RepositoryError> {
        self.donation_inserts.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.donations.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update_donation_status(
        &self,
        update: DonationStatusUpdate,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.donations.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(&update.id).ok_or(RepositoryError::NotFound)?;
        record.status = update.status;
        record.updated_at = update.updated_at;
        if let Some(details) = &update.payment_details {
            record.payment_details = Some(details.clone());
        }
        self.status_updates
            .lock()
            .expect("repository mutex poisoned")
            .push(update);
        Ok(())
    }

    async fn fetch_donation(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<DonationRecord>, RepositoryError> {
        Ok(self.donation(id))
    }

    async fn list_donations(&self, query: &DonationQuery) -> Result<DonationPage, RepositoryError> {
        let guard = self.donations.lock().expect("repository mutex poisoned");
        let mut donations: Vec<DonationRecord> = guard
            .values()
            .filter(|record| match &query.donor_email {
                Some(email) => &record.donor_email == email,
                None => true,
            })
            .cloned()
            .collect();
        donations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        donations.truncate(query.page_size());
        Ok(DonationPage {
            donations,
            last_evaluated_key: None,
        })
    }
}

pub(super) struct UnavailableRepository;

#[async_trait]
impl SubmissionRepository for UnavailableRepository {
    async fn insert_contact(&self, _record: &ContactRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn insert_volunteer(&self, _record: &VolunteerRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn insert_donation(&self, _record: &DonationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn update_donation_status(
        &self,
        _update: DonationStatusUpdate,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn fetch_donation(
        &self,
        _id: &SubmissionId,
    ) -> Result<Option<DonationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn list_donations(
        &self,
        _query: &DonationQuery,
    ) -> Result<DonationPage, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: bool,
}

impl MemoryMailer {
    pub(super) fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub(super) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if self.failing {
            return Err(MailError::Transport("smtp relay down".to_string()));
        }
        self.sent.lock().expect("mailer mutex poisoned").push(message);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum GatewayMode {
    Succeeds,
    NotConfigured,
    ProviderDown,
}

pub(super) struct FakeGateway {
    mode: GatewayMode,
    pub(super) initiations: Mutex<Vec<PaymentRequest>>,
    pub(super) verifications: AtomicUsize,
}

impl FakeGateway {
    pub(super) fn new(mode: GatewayMode) -> Self {
        Self {
            mode,
            initiations: Mutex::new(Vec::new()),
            verifications: AtomicUsize::new(0),
        }
    }

    pub(super) fn initiation_count(&self) -> usize {
        self.initiations.lock().expect("gateway mutex poisoned").len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentInitiation, PaymentError> {
        self.initiations
            .lock()
            .expect("gateway mutex poisoned")
            .push(request.clone());
        match self.mode {
            GatewayMode::Succeeds => Ok(PaymentInitiation {
                payment_url: format!("https://test-pay.khalti.com/?pidx=px-{}", request.purchase_order_id),
                pidx: format!("px-{}", request.purchase_order_id),
                message: None,
            }),
            GatewayMode::NotConfigured => Err(PaymentError::NotConfigured),
            GatewayMode::ProviderDown => {
                Err(PaymentError::Initiation("connection reset".to_string()))
            }
        }
    }

    async fn verify(&self, token: &str, amount_paisa: u64) -> Result<Value, PaymentError> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            GatewayMode::Succeeds => Ok(json!({
                "idx": "verified-idx",
                "token": token,
                "amount": amount_paisa,
                "state": { "name": "Completed" }
            })),
            GatewayMode::NotConfigured => Err(PaymentError::NotConfigured),
            GatewayMode::ProviderDown => {
                Err(PaymentError::Verification("connection reset".to_string()))
            }
        }
    }
}

pub(super) type TestService = SubmissionService<MemoryRepository, MemoryMailer, FakeGateway>;

pub(super) fn build_service(
    mode: GatewayMode,
) -> (
    TestService,
    Arc<MemoryRepository>,
    Arc<MemoryMailer>,
    Arc<FakeGateway>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let mailer = Arc::new(MemoryMailer::default());
    let gateway = Arc::new(FakeGateway::new(mode));
    let service = SubmissionService::new(
        repository.clone(),
        mailer.clone(),
        gateway.clone(),
        settings(),
    );
    (service, repository, mailer, gateway)
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    submission_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
