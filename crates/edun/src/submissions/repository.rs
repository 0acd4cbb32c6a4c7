use async_trait::async_trait;
use serde::Serialize;

use super::domain::{
    ContactRecord, DonationRecord, DonationStatus, SubmissionId, VolunteerRecord,
};

/// Number of donations returned per listing page.
pub const DONATION_PAGE_SIZE: usize = 20;

/// Storage abstraction so the service module can be exercised in isolation.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn insert_contact(&self, record: &ContactRecord) -> Result<(), RepositoryError>;
    async fn insert_volunteer(&self, record: &VolunteerRecord) -> Result<(), RepositoryError>;
    async fn insert_donation(&self, record: &DonationRecord) -> Result<(), RepositoryError>;
    async fn update_donation_status(
        &self,
        update: DonationStatusUpdate,
    ) -> Result<(), RepositoryError>;
    async fn fetch_donation(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<DonationRecord>, RepositoryError>;
    async fn list_donations(&self, query: &DonationQuery) -> Result<DonationPage, RepositoryError>;
}

/// Status transition applied to an existing donation.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationStatusUpdate {
    pub id: SubmissionId,
    pub status: DonationStatus,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub payment_details: Option<serde_json::Value>,
}

/// Listing filter for the admin donations endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationQuery {
    pub donor_email: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

impl DonationQuery {
    pub fn page_size(&self) -> usize {
        self.limit
            .filter(|limit| *limit > 0)
            .map(|limit| limit.min(DONATION_PAGE_SIZE))
            .unwrap_or(DONATION_PAGE_SIZE)
    }
}

/// Newest-first page of donations plus the cursor to resume from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DonationPage {
    pub donations: Vec<DonationRecord>,
    pub last_evaluated_key: Option<String>,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("invalid listing cursor")]
    InvalidCursor,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
