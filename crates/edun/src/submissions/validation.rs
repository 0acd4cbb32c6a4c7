use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::domain::{
    ContactForm, ContactInterest, DonationPurpose, DonationRequest, PaymentMethod,
    PaymentVerification, SubmissionId, VolunteerApplication,
};

/// Single schema failure, addressed by the offending field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// Errors raised while turning a raw request body into a typed form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Request body is required")]
    MissingBody,
    #[error("Invalid JSON in request body")]
    MalformedJson,
    #[error("{summary}")]
    Invalid {
        summary: &'static str,
        issues: Vec<ValidationIssue>,
    },
}

impl ValidationError {
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Invalid { issues, .. } => issues,
            _ => &[],
        }
    }

    fn incomplete(summary: &'static str) -> Self {
        Self::Invalid {
            summary,
            issues: Vec::new(),
        }
    }
}

const MESSAGE_MAX_CHARS: usize = 500;

const FORM_SUMMARY: &str = "Invalid input data";
const DONATION_SUMMARY: &str = "Invalid input";
const VERIFICATION_SUMMARY: &str = "Invalid verification data";

pub fn parse_body(body: &[u8]) -> Result<Value, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::MissingBody);
    }
    serde_json::from_slice(body).map_err(|_| ValidationError::MalformedJson)
}

pub fn contact_form(body: &Value) -> Result<ContactForm, ValidationError> {
    let mut fields = Fields::new(body, FORM_SUMMARY)?;

    let name = fields.required_string("name");
    fields.min_chars("name", name.as_deref(), 2, "Name must be at least 2 characters");
    let email = fields.required_string("email");
    fields.email("email", email.as_deref());
    let subject = fields.required_string("subject");
    fields.min_chars(
        "subject",
        subject.as_deref(),
        5,
        "Subject must be at least 5 characters",
    );
    let message = fields.required_string("message");
    fields.min_chars(
        "message",
        message.as_deref(),
        10,
        "Message must be at least 10 characters",
    );
    let phone = fields.optional_string("phone");
    let interest = fields.optional_enum(
        "interest",
        ContactInterest::parse,
        "Interest must be one of volunteer, donation, partnership, other",
    );

    fields.finish()?;
    match (name, email, subject, message) {
        (Some(name), Some(email), Some(subject), Some(message)) => Ok(ContactForm {
            name,
            email,
            subject,
            message,
            phone,
            interest,
        }),
        _ => Err(ValidationError::incomplete(FORM_SUMMARY)),
    }
}

pub fn volunteer_application(body: &Value) -> Result<VolunteerApplication, ValidationError> {
    let mut fields = Fields::new(body, FORM_SUMMARY)?;

    let name = fields.required_string("name");
    fields.min_chars("name", name.as_deref(), 2, "Name must be at least 2 characters");
    let email = fields.required_string("email");
    fields.email("email", email.as_deref());
    let phone = fields.required_string("phone");
    fields.min_chars("phone", phone.as_deref(), 1, "Phone number is required");
    let skills = fields.skills("skills");
    let availability = fields.required_string("availability");
    fields.min_chars(
        "availability",
        availability.as_deref(),
        1,
        "Availability is required",
    );
    let experience = fields.required_string("experience");
    fields.min_chars("experience", experience.as_deref(), 1, "Experience is required");
    let motivation = fields.required_string("motivation");
    fields.min_chars("motivation", motivation.as_deref(), 1, "Motivation is required");

    fields.finish()?;
    match (name, email, phone, skills, availability, experience, motivation) {
        (
            Some(name),
            Some(email),
            Some(phone),
            Some(skills),
            Some(availability),
            Some(experience),
            Some(motivation),
        ) => Ok(VolunteerApplication {
            name,
            email,
            phone,
            skills,
            availability,
            experience,
            motivation,
        }),
        _ => Err(ValidationError::incomplete(FORM_SUMMARY)),
    }
}

pub fn donation_request(body: &Value) -> Result<DonationRequest, ValidationError> {
    let mut fields = Fields::new(body, DONATION_SUMMARY)?;

    let amount = fields.required_number("amount");
    if let Some(value) = amount {
        if !(value.is_finite() && value > 0.0) {
            fields.push("amount", "Amount must be a positive number");
        }
    }
    let currency = fields.required_string("currency");
    if let Some(code) = currency.as_deref() {
        if code.chars().count() != 3 {
            fields.push("currency", "Currency must be 3 characters");
        }
    }
    let donor_email = fields.required_string("donorEmail");
    fields.email("donorEmail", donor_email.as_deref());
    let donor_name = fields.required_string("donorName");
    fields.min_chars(
        "donorName",
        donor_name.as_deref(),
        2,
        "Name must be at least 2 characters",
    );
    let payment_method = fields.payment_method("paymentMethod");
    let purpose = fields.optional_enum(
        "purpose",
        DonationPurpose::parse,
        "Purpose must be one of general, scholarship, infrastructure, other",
    );
    let message = fields.optional_string("message");
    if let Some(text) = message.as_deref() {
        if text.chars().count() > MESSAGE_MAX_CHARS {
            fields.push("message", "Message must be at most 500 characters");
        }
    }
    let anonymous = fields.optional_bool("anonymous").unwrap_or(false);

    fields.finish()?;
    match (amount, currency, donor_name, donor_email, payment_method) {
        (Some(amount), Some(currency), Some(donor_name), Some(donor_email), Some(method)) => {
            Ok(DonationRequest {
                amount,
                currency: currency.to_ascii_uppercase(),
                donor_name,
                donor_email,
                payment_method: method,
                purpose,
                message,
                anonymous,
            })
        }
        _ => Err(ValidationError::incomplete(DONATION_SUMMARY)),
    }
}

pub fn payment_verification(body: &Value) -> Result<PaymentVerification, ValidationError> {
    let mut fields = Fields::new(body, VERIFICATION_SUMMARY)?;

    let token = fields.required_string("token");
    let amount = fields.required_number("amount");
    let paisa = match amount {
        Some(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => {
            Some(value as u64)
        }
        Some(_) => {
            fields.push("amount", "Amount must be a whole number of paisa");
            None
        }
        None => None,
    };
    let donation_id = fields.required_string("donationId");
    if let Some(raw) = donation_id.as_deref() {
        if Uuid::parse_str(raw).is_err() {
            fields.push("donationId", "Invalid uuid");
        }
    }

    fields.finish()?;
    match (token, paisa, donation_id) {
        (Some(token), Some(amount), Some(donation_id)) => Ok(PaymentVerification {
            token,
            amount,
            donation_id: SubmissionId(donation_id),
        }),
        _ => Err(ValidationError::incomplete(VERIFICATION_SUMMARY)),
    }
}

/// Loose address check: one `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

/// Field accessor that collects every issue instead of stopping at the first.
struct Fields<'a> {
    object: &'a Map<String, Value>,
    summary: &'static str,
    issues: Vec<ValidationIssue>,
}

impl<'a> Fields<'a> {
    fn new(body: &'a Value, summary: &'static str) -> Result<Self, ValidationError> {
        match body.as_object() {
            Some(object) => Ok(Self {
                object,
                summary,
                issues: Vec::new(),
            }),
            None => Err(ValidationError::Invalid {
                summary,
                issues: vec![ValidationIssue {
                    path: String::new(),
                    message: "Expected object".to_string(),
                }],
            }),
        }
    }

    fn push(&mut self, path: &str, message: &str) {
        self.issues.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
        });
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|value| !value.is_null())
    }

    fn required_string(&mut self, key: &str) -> Option<String> {
        match self.present(key) {
            None => {
                self.push(key, "Required");
                None
            }
            Some(Value::String(text)) => Some(text.trim().to_string()),
            Some(_) => {
                self.push(key, "Expected string");
                None
            }
        }
    }

    fn optional_string(&mut self, key: &str) -> Option<String> {
        match self.present(key) {
            None => None,
            Some(Value::String(text)) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Some(_) => {
                self.push(key, "Expected string");
                None
            }
        }
    }

    fn required_number(&mut self, key: &str) -> Option<f64> {
        match self.present(key) {
            None => {
                self.push(key, "Required");
                None
            }
            Some(Value::Number(number)) => number.as_f64(),
            Some(_) => {
                self.push(key, "Expected number");
                None
            }
        }
    }

    fn optional_bool(&mut self, key: &str) -> Option<bool> {
        match self.present(key) {
            None => None,
            Some(Value::Bool(flag)) => Some(*flag),
            Some(_) => {
                self.push(key, "Expected boolean");
                None
            }
        }
    }

    /// Absent or null is fine; anything present, including `""`, must parse.
    fn optional_enum<T>(
        &mut self,
        key: &str,
        parse: fn(&str) -> Option<T>,
        message: &str,
    ) -> Option<T> {
        match self.present(key) {
            None => None,
            Some(Value::String(raw)) => {
                let parsed = parse(raw.trim());
                if parsed.is_none() {
                    self.push(key, message);
                }
                parsed
            }
            Some(_) => {
                self.push(key, message);
                None
            }
        }
    }

    fn payment_method(&mut self, key: &str) -> Option<PaymentMethod> {
        match self.present(key) {
            None => {
                self.push(key, "Payment method is required");
                None
            }
            Some(Value::String(raw)) => {
                let method = PaymentMethod::parse(raw.trim());
                if method.is_none() {
                    self.push(key, "Invalid payment method");
                }
                method
            }
            Some(_) => {
                self.push(key, "Invalid payment method");
                None
            }
        }
    }

    /// Accepts either a list of skills or a single skill string.
    fn skills(&mut self, key: &str) -> Option<Vec<String>> {
        let skills: Vec<String> = match self.present(key) {
            None => {
                self.push(key, "Required");
                return None;
            }
            Some(Value::String(single)) => vec![single.trim().to_string()],
            Some(Value::Array(items)) => {
                let mut skills = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    match item.as_str() {
                        Some(skill) => skills.push(skill.trim().to_string()),
                        None => self.push(&format!("{key}.{index}"), "Expected string"),
                    }
                }
                skills
            }
            Some(_) => {
                self.push(key, "Expected string or array of strings");
                return None;
            }
        };

        let skills: Vec<String> = skills.into_iter().filter(|s| !s.is_empty()).collect();
        if skills.is_empty() {
            self.push(key, "At least one skill is required");
            return None;
        }
        Some(skills)
    }

    fn min_chars(&mut self, key: &str, value: Option<&str>, min: usize, message: &str) {
        if let Some(text) = value {
            if text.chars().count() < min {
                self.push(key, message);
            }
        }
    }

    fn email(&mut self, key: &str, value: Option<&str>) {
        if let Some(address) = value {
            if !is_valid_email(address) {
                self.push(key, "Invalid email address");
            }
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Invalid {
                summary: self.summary,
                issues: self.issues,
            })
        }
    }
}
