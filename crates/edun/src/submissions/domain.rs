use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for persisted submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn contact() -> Self {
        Self(format!("contact-{}", Uuid::new_v4()))
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client details captured from the inbound request for audit purposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    pub request_id: Option<String>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactInterest {
    Volunteer,
    Donation,
    Partnership,
    Other,
}

impl ContactInterest {
    pub fn label(self) -> &'static str {
        match self {
            Self::Volunteer => "volunteer",
            Self::Donation => "donation",
            Self::Partnership => "partnership",
            Self::Other => "other",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "volunteer" => Some(Self::Volunteer),
            "donation" => Some(Self::Donation),
            "partnership" => Some(Self::Partnership),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    New,
    InProgress,
    Resolved,
}

/// Validated contact form payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub phone: Option<String>,
    pub interest: Option<ContactInterest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub id: SubmissionId,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<ContactInterest>,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ContactRecord {
    pub fn new(form: ContactForm, metadata: &RequestMetadata, now: DateTime<Utc>) -> Self {
        Self {
            id: SubmissionId::contact(),
            name: form.name,
            email: form.email,
            subject: form.subject,
            message: form.message,
            phone: form.phone,
            interest: form.interest,
            status: ContactStatus::New,
            created_at: now,
            updated_at: now,
            ip_address: metadata.source_ip.clone(),
            user_agent: metadata.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolunteerStatus {
    PendingReview,
}

/// Validated volunteer application payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolunteerApplication {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub skills: Vec<String>,
    pub availability: String,
    pub experience: String,
    pub motivation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerRecord {
    pub id: SubmissionId,
    pub form_type: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub skills: Vec<String>,
    pub availability: String,
    pub experience: String,
    pub motivation: String,
    pub status: VolunteerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VolunteerRecord {
    pub fn new(application: VolunteerApplication, now: DateTime<Utc>) -> Self {
        Self {
            id: SubmissionId::random(),
            form_type: "volunteer".to_string(),
            name: application.name,
            email: application.email,
            phone: application.phone,
            skills: application.skills,
            availability: application.availability,
            experience: application.experience,
            motivation: application.motivation,
            status: VolunteerStatus::PendingReview,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn skills_line(&self) -> String {
        self.skills.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Khalti,
    Stripe,
    BankTransfer,
}

impl PaymentMethod {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "khalti" => Some(Self::Khalti),
            "stripe" => Some(Self::Stripe),
            "bank_transfer" => Some(Self::BankTransfer),
            _ => None,
        }
    }

    /// Human readable name used in donor-facing copy.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Khalti => "Khalti",
            Self::Stripe => "Credit/Debit Card",
            Self::BankTransfer => "Bank Transfer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationPurpose {
    General,
    Scholarship,
    Infrastructure,
    Other,
}

impl DonationPurpose {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "general" => Some(Self::General),
            "scholarship" => Some(Self::Scholarship),
            "infrastructure" => Some(Self::Infrastructure),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Pending,
    Completed,
    Failed,
}

impl DonationStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Validated donation payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationRequest {
    pub amount: f64,
    pub currency: String,
    pub donor_name: String,
    pub donor_email: String,
    pub payment_method: PaymentMethod,
    pub purpose: Option<DonationPurpose>,
    pub message: Option<String>,
    pub anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRecord {
    pub id: SubmissionId,
    pub amount: f64,
    pub currency: String,
    pub donor_name: String,
    pub donor_email: String,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<DonationPurpose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl DonationRecord {
    pub fn new(request: DonationRequest, metadata: &RequestMetadata, now: DateTime<Utc>) -> Self {
        Self {
            id: SubmissionId::random(),
            amount: request.amount,
            currency: request.currency,
            donor_name: request.donor_name,
            donor_email: request.donor_email,
            payment_method: request.payment_method,
            purpose: request.purpose,
            message: request.message,
            anonymous: request.anonymous,
            status: DonationStatus::Pending,
            created_at: now,
            updated_at: now,
            payment_details: None,
            ip_address: metadata.source_ip.clone(),
            user_agent: metadata.user_agent.clone(),
        }
    }

    /// Khalti expects amounts in paisa.
    pub fn amount_in_paisa(&self) -> u64 {
        (self.amount * 100.0).round().max(0.0) as u64
    }

    /// Public view used by the admin listing: no provider payloads, and no
    /// email address for donors who asked to stay anonymous.
    pub fn sanitized(&self) -> DonationSummary {
        DonationSummary {
            id: self.id.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            donor_name: self.donor_name.clone(),
            donor_email: if self.anonymous {
                None
            } else {
                Some(self.donor_email.clone())
            },
            payment_method: self.payment_method,
            purpose: self.purpose,
            message: self.message.clone(),
            anonymous: self.anonymous,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationSummary {
    pub id: SubmissionId,
    pub amount: f64,
    pub currency: String,
    pub donor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_email: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<DonationPurpose>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub anonymous: bool,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account details returned to donors choosing bank transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub branch: String,
}

impl Default for BankDetails {
    fn default() -> Self {
        Self {
            bank_name: "Global IME Bank".to_string(),
            account_name: "Educate Nepal Initiative".to_string(),
            account_number: "1234567890".to_string(),
            branch: "Kathmandu".to_string(),
        }
    }
}

/// Validated Khalti verification callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentVerification {
    pub token: String,
    pub amount: u64,
    pub donation_id: SubmissionId,
}
