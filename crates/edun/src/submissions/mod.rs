//! Contact, volunteer and donation intake.
//!
//! Each request runs one linear flow: validate the body, persist a single
//! record, optionally call the payment provider once, send at most two
//! emails, and answer with a JSON envelope.

pub mod domain;
pub mod dynamo;
pub mod repository;
pub mod response;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    BankDetails, ContactForm, ContactInterest, ContactRecord, ContactStatus, DonationPurpose,
    DonationRecord, DonationRequest, DonationStatus, DonationSummary, PaymentMethod,
    PaymentVerification, RequestMetadata, SubmissionId, VolunteerApplication, VolunteerRecord,
    VolunteerStatus,
};
pub use dynamo::{DynamoSubmissionRepository, TableNames};
pub use repository::{
    DonationPage, DonationQuery, DonationStatusUpdate, RepositoryError, SubmissionRepository,
    DONATION_PAGE_SIZE,
};
pub use router::submission_router;
pub use service::{
    BankTransferInstructions, DonationListing, DonationOutcome, KhaltiCheckout,
    SubmissionError, SubmissionReceipt, SubmissionService, SubmissionSettings, VerifiedPayment,
};
pub use validation::{ValidationError, ValidationIssue};
