use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::debug;

use super::domain::{ContactRecord, DonationRecord, SubmissionId, VolunteerRecord};
use super::repository::{
    DonationPage, DonationQuery, DonationStatusUpdate, RepositoryError, SubmissionRepository,
};
use crate::config::StorageConfig;

const DONOR_EMAIL_INDEX: &str = "DonorEmailIndex";
const LISTING_INDEX: &str = "GSI1";
const LISTING_PARTITION: &str = "DONATIONS";

type Item = HashMap<String, AttributeValue>;

/// Table names for each form, one table per form type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub contact: String,
    pub volunteer: String,
    pub donations: String,
}

impl From<&StorageConfig> for TableNames {
    fn from(config: &StorageConfig) -> Self {
        Self {
            contact: config.contact_table.clone(),
            volunteer: config.volunteer_table.clone(),
            donations: config.donations_table.clone(),
        }
    }
}

/// DynamoDB-backed repository keyed on the `id` attribute.
#[derive(Debug, Clone)]
pub struct DynamoSubmissionRepository {
    client: Client,
    tables: TableNames,
}

impl DynamoSubmissionRepository {
    pub fn new(client: Client, tables: TableNames) -> Self {
        Self { client, tables }
    }

    /// Build a client from the ambient AWS configuration, honoring the local
    /// endpoint override used with DynamoDB Local.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let shared = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Self::new(Client::from_conf(builder.build()), TableNames::from(config))
    }

    async fn put_new(&self, table: &str, item: Item) -> Result<(), RepositoryError> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
            .map_err(|err| {
                let service_error = err.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    RepositoryError::Conflict
                } else {
                    RepositoryError::Unavailable(DisplayErrorContext(&service_error).to_string())
                }
            })?;
        debug!(table, "item stored");
        Ok(())
    }
}

#[async_trait]
impl SubmissionRepository for DynamoSubmissionRepository {
    async fn insert_contact(&self, record: &ContactRecord) -> Result<(), RepositoryError> {
        let item = to_item(record)?;
        self.put_new(&self.tables.contact, item).await
    }

    async fn insert_volunteer(&self, record: &VolunteerRecord) -> Result<(), RepositoryError> {
        let item = to_item(record)?;
        self.put_new(&self.tables.volunteer, item).await
    }

    async fn insert_donation(&self, record: &DonationRecord) -> Result<(), RepositoryError> {
        let item = donation_item(record)?;
        self.put_new(&self.tables.donations, item).await
    }

    async fn update_donation_status(
        &self,
        update: DonationStatusUpdate,
    ) -> Result<(), RepositoryError> {
        let mut expression = "SET #status = :status, updatedAt = :updatedAt".to_string();
        let mut request = self
            .client
            .update_item()
            .table_name(&self.tables.donations)
            .key("id", AttributeValue::S(update.id.0.clone()))
            .condition_expression("attribute_exists(id)")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(
                ":status",
                AttributeValue::S(update.status.label().to_string()),
            )
            .expression_attribute_values(
                ":updatedAt",
                to_attribute(to_json(&update.updated_at)?),
            );

        if let Some(details) = update.payment_details {
            expression.push_str(", paymentDetails = :details");
            request = request.expression_attribute_values(":details", to_attribute(details));
        }

        request
            .update_expression(expression)
            .send()
            .await
            .map_err(|err| {
                let service_error = err.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    RepositoryError::NotFound
                } else {
                    RepositoryError::Unavailable(DisplayErrorContext(&service_error).to_string())
                }
            })?;
        Ok(())
    }

    async fn fetch_donation(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<DonationRecord>, RepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.tables.donations)
            .key("id", AttributeValue::S(id.0.clone()))
            .send()
            .await
            .map_err(|err| RepositoryError::Unavailable(DisplayErrorContext(&err).to_string()))?;

        output.item().map(from_item).transpose()
    }

    async fn list_donations(&self, query: &DonationQuery) -> Result<DonationPage, RepositoryError> {
        let start_key = query.cursor.as_deref().map(decode_cursor).transpose()?;

        let request = self
            .client
            .query()
            .table_name(&self.tables.donations)
            .limit(query.page_size() as i32)
            .scan_index_forward(false)
            .set_exclusive_start_key(start_key);

        let request = match &query.donor_email {
            Some(email) => request
                .index_name(DONOR_EMAIL_INDEX)
                .key_condition_expression("donorEmail = :email")
                .expression_attribute_values(":email", AttributeValue::S(email.clone())),
            None => request
                .index_name(LISTING_INDEX)
                .key_condition_expression("GSI1PK = :partition")
                .expression_attribute_values(
                    ":partition",
                    AttributeValue::S(LISTING_PARTITION.to_string()),
                ),
        };

        let output = request
            .send()
            .await
            .map_err(|err| RepositoryError::Unavailable(DisplayErrorContext(&err).to_string()))?;

        let donations = output
            .items()
            .iter()
            .map(from_item)
            .collect::<Result<Vec<_>, _>>()?;
        let last_evaluated_key = output.last_evaluated_key().map(encode_cursor);

        Ok(DonationPage {
            donations,
            last_evaluated_key,
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|err| RepositoryError::Unavailable(format!("unable to encode item: {err}")))
}

fn to_item<T: Serialize>(record: &T) -> Result<Item, RepositoryError> {
    match to_json(record)? {
        Value::Object(fields) => Ok(fields
            .into_iter()
            .map(|(key, value)| (key, to_attribute(value)))
            .collect()),
        _ => Err(RepositoryError::Unavailable(
            "records must encode as objects".to_string(),
        )),
    }
}

/// Donation item plus the listing index keys; `GSI1SK` is the stored
/// `createdAt` value so both sort identically.
fn donation_item(record: &DonationRecord) -> Result<Item, RepositoryError> {
    let mut item = to_item(record)?;
    let created_at = item.get("createdAt").cloned().ok_or_else(|| {
        RepositoryError::Unavailable("donation item is missing createdAt".to_string())
    })?;
    item.insert(
        "GSI1PK".to_string(),
        AttributeValue::S(LISTING_PARTITION.to_string()),
    );
    item.insert("GSI1SK".to_string(), created_at);
    Ok(item)
}

fn from_item(item: &Item) -> Result<DonationRecord, RepositoryError> {
    let fields: Map<String, Value> = item
        .iter()
        .map(|(key, value)| (key.clone(), from_attribute(value)))
        .collect();
    serde_json::from_value(Value::Object(fields))
        .map_err(|err| RepositoryError::Unavailable(format!("malformed donation item: {err}")))
}

pub(crate) fn to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(flag) => AttributeValue::Bool(flag),
        Value::Number(number) => AttributeValue::N(number.to_string()),
        Value::String(text) => AttributeValue::S(text),
        Value::Array(items) => AttributeValue::L(items.into_iter().map(to_attribute).collect()),
        Value::Object(fields) => AttributeValue::M(
            fields
                .into_iter()
                .map(|(key, value)| (key, to_attribute(value)))
                .collect(),
        ),
    }
}

pub(crate) fn from_attribute(attribute: &AttributeValue) -> Value {
    match attribute {
        AttributeValue::S(text) => Value::String(text.clone()),
        AttributeValue::N(raw) => parse_number(raw),
        AttributeValue::Bool(flag) => Value::Bool(*flag),
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attribute).collect()),
        AttributeValue::M(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), from_attribute(value)))
                .collect(),
        ),
        AttributeValue::Ss(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        _ => Value::Null,
    }
}

fn parse_number(raw: &str) -> Value {
    if let Ok(integer) = raw.parse::<i64>() {
        return Value::Number(integer.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Cursors are the string-valued key attributes of the last item, as JSON.
fn encode_cursor(key: &Item) -> String {
    let fields: Map<String, Value> = key
        .iter()
        .filter_map(|(name, value)| match value {
            AttributeValue::S(text) => Some((name.clone(), Value::String(text.clone()))),
            _ => None,
        })
        .collect();
    Value::Object(fields).to_string()
}

fn decode_cursor(raw: &str) -> Result<Item, RepositoryError> {
    let fields: Map<String, Value> =
        serde_json::from_str(raw).map_err(|_| RepositoryError::InvalidCursor)?;
    fields
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(text) => Ok((name, AttributeValue::S(text))),
            _ => Err(RepositoryError::InvalidCursor),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submissions::domain::{DonationStatus, PaymentMethod};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn nested_values_survive_attribute_conversion() {
        let value = json!({
            "amount": 1500.5,
            "count": 3,
            "anonymous": false,
            "purpose": null,
            "skills": ["teaching", "design"],
            "paymentDetails": { "idx": "abc", "fee": 0 }
        });

        let attribute = to_attribute(value.clone());
        assert_eq!(from_attribute(&attribute), value);
    }

    #[test]
    fn listing_sort_key_matches_created_at() {
        let created = Utc
            .with_ymd_and_hms(2025, 4, 2, 10, 30, 21)
            .unwrap()
            + Duration::nanoseconds(296_844_397);
        let record = DonationRecord {
            id: SubmissionId::random(),
            amount: 1000.0,
            currency: "NPR".to_string(),
            donor_name: "Gita Rai".to_string(),
            donor_email: "gita@example.org".to_string(),
            payment_method: PaymentMethod::Khalti,
            purpose: None,
            message: None,
            anonymous: false,
            status: DonationStatus::Pending,
            created_at: created,
            updated_at: created,
            payment_details: None,
            ip_address: None,
            user_agent: None,
        };

        let item = donation_item(&record).expect("item encodes");

        assert_eq!(item.get("GSI1SK"), item.get("createdAt"));
        assert_eq!(
            item.get("GSI1PK"),
            Some(&AttributeValue::S("DONATIONS".to_string()))
        );
        let decoded = from_item(&item).expect("item decodes");
        assert_eq!(decoded.created_at, created);
    }

    #[test]
    fn cursor_round_trips_string_keys() {
        let mut key = Item::new();
        key.insert("id".to_string(), AttributeValue::S("d-1".to_string()));
        key.insert("GSI1PK".to_string(), AttributeValue::S("DONATIONS".to_string()));

        let cursor = encode_cursor(&key);
        assert_eq!(decode_cursor(&cursor).expect("cursor decodes"), key);
    }

    #[test]
    fn malformed_cursor_is_rejected() {
        assert!(matches!(
            decode_cursor("not-json"),
            Err(RepositoryError::InvalidCursor)
        ));
        assert!(matches!(
            decode_cursor(r#"{"id": 7}"#),
            Err(RepositoryError::InvalidCursor)
        ));
    }
}
