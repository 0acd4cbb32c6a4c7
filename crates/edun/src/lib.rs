//! Backend for the Educate Nepal Initiative website: contact, volunteer and
//! donation handlers with DynamoDB persistence, SES email and Khalti payments.

pub mod config;
pub mod error;
pub mod notifications;
pub mod payments;
pub mod submissions;
pub mod telemetry;
