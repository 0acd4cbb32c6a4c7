use async_trait::async_trait;
use edun::notifications::{EmailMessage, MailError, Mailer, SesMailer};
use edun::submissions::{
    ContactRecord, DonationPage, DonationQuery, DonationRecord, DonationStatusUpdate,
    DynamoSubmissionRepository, RepositoryError, SubmissionId, SubmissionRepository,
    VolunteerRecord,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local storage for development and tests.
#[derive(Default, Clone)]
pub(crate) struct InMemorySubmissionRepository {
    contacts: Arc<Mutex<HashMap<SubmissionId, ContactRecord>>>,
    volunteers: Arc<Mutex<HashMap<SubmissionId, VolunteerRecord>>>,
    donations: Arc<Mutex<HashMap<SubmissionId, DonationRecord>>>,
}

impl InMemorySubmissionRepository {
    #[cfg(test)]
    pub(crate) fn contact_count(&self) -> usize {
        self.contacts.lock().expect("repository mutex poisoned").len()
    }
}

fn insert_new<T: Clone>(
    records: &Mutex<HashMap<SubmissionId, T>>,
    id: &SubmissionId,
    record: &T,
) -> Result<(), RepositoryError> {
    let mut guard = records.lock().expect("repository mutex poisoned");
    if guard.contains_key(id) {
        return Err(RepositoryError::Conflict);
    }
    guard.insert(id.clone(), record.clone());
    Ok(())
}

#[async_trait]
impl SubmissionRepository for InMemorySubmissionRepository {
    async fn insert_contact(&self, record: &ContactRecord) -> Result<(), RepositoryError> {
        insert_new(&self.contacts, &record.id, record)
    }

    async fn insert_volunteer(&self, record: &VolunteerRecord) -> Result<(), RepositoryError> {
        insert_new(&self.volunteers, &record.id, record)
    }

    async fn insert_donation(&self, record: &DonationRecord) -> Result<(), RepositoryError> {
        insert_new(&self.donations, &record.id, record)
    }

    async fn update_donation_status(
        &self,
        update: DonationStatusUpdate,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.donations.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(&update.id).ok_or(RepositoryError::NotFound)?;
        record.status = update.status;
        record.updated_at = update.updated_at;
        if update.payment_details.is_some() {
            record.payment_details = update.payment_details;
        }
        Ok(())
    }

    async fn fetch_donation(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<DonationRecord>, RepositoryError> {
        let guard = self.donations.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    /// The cursor is the id of the last donation on the previous page.
    async fn list_donations(&self, query: &DonationQuery) -> Result<DonationPage, RepositoryError> {
        let guard = self.donations.lock().expect("repository mutex poisoned");
        let mut matching: Vec<&DonationRecord> = guard
            .values()
            .filter(|record| {
                query
                    .donor_email
                    .as_ref()
                    .map_or(true, |email| &record.donor_email == email)
            })
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let start = match &query.cursor {
            Some(cursor) => {
                matching
                    .iter()
                    .position(|record| record.id.as_str() == cursor)
                    .ok_or(RepositoryError::InvalidCursor)?
                    + 1
            }
            None => 0,
        };

        let page_size = query.page_size();
        let donations: Vec<DonationRecord> = matching
            .iter()
            .skip(start)
            .take(page_size)
            .map(|record| (*record).clone())
            .collect();
        let last_evaluated_key = if start + donations.len() < matching.len() {
            donations.last().map(|record| record.id.to_string())
        } else {
            None
        };

        Ok(DonationPage {
            donations,
            last_evaluated_key,
        })
    }
}

/// Backing store chosen at startup from `STORAGE_BACKEND`.
pub(crate) enum SubmissionStore {
    Memory(InMemorySubmissionRepository),
    DynamoDb(DynamoSubmissionRepository),
}

#[async_trait]
impl SubmissionRepository for SubmissionStore {
    async fn insert_contact(&self, record: &ContactRecord) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(store) => store.insert_contact(record).await,
            Self::DynamoDb(store) => store.insert_contact(record).await,
        }
    }

    async fn insert_volunteer(&self, record: &VolunteerRecord) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(store) => store.insert_volunteer(record).await,
            Self::DynamoDb(store) => store.insert_volunteer(record).await,
        }
    }

    async fn insert_donation(&self, record: &DonationRecord) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(store) => store.insert_donation(record).await,
            Self::DynamoDb(store) => store.insert_donation(record).await,
        }
    }

    async fn update_donation_status(
        &self,
        update: DonationStatusUpdate,
    ) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(store) => store.update_donation_status(update).await,
            Self::DynamoDb(store) => store.update_donation_status(update).await,
        }
    }

    async fn fetch_donation(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<DonationRecord>, RepositoryError> {
        match self {
            Self::Memory(store) => store.fetch_donation(id).await,
            Self::DynamoDb(store) => store.fetch_donation(id).await,
        }
    }

    async fn list_donations(&self, query: &DonationQuery) -> Result<DonationPage, RepositoryError> {
        match self {
            Self::Memory(store) => store.list_donations(query).await,
            Self::DynamoDb(store) => store.list_donations(query).await,
        }
    }
}

/// Writes outgoing mail to the log instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to.join(", "),
            subject = %message.subject,
            "email suppressed by log backend"
        );
        Ok(())
    }
}

/// Mail transport chosen at startup from `EMAIL_BACKEND`.
pub(crate) enum Outbox {
    Log(LogMailer),
    Ses(SesMailer),
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        match self {
            Self::Log(mailer) => mailer.send(message).await,
            Self::Ses(mailer) => mailer.send(message).await,
        }
    }
}
