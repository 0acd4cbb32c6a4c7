use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{PaymentError, PaymentGateway, PaymentInitiation, PaymentRequest};
use crate::config::PaymentConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const SANDBOX_INITIATE_URL: &str = "https://a.khalti.com/api/v2/epayment/initiate/";
const LIVE_INITIATE_URL: &str = "https://khalti.com/api/v2/epayment/initiate/";
const VERIFY_URL: &str = "https://khalti.com/api/v2/payment/verify/";

/// Khalti API locations; sandbox outside production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KhaltiEndpoints {
    pub initiate: String,
    pub verify: String,
}

impl KhaltiEndpoints {
    pub fn for_mode(sandbox: bool) -> Self {
        let initiate = if sandbox {
            SANDBOX_INITIATE_URL
        } else {
            LIVE_INITIATE_URL
        };
        Self {
            initiate: initiate.to_string(),
            verify: VERIFY_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CustomerInfo<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct InitiatePayload<'a> {
    return_url: &'a str,
    website_url: &'a str,
    amount: u64,
    purchase_order_id: &'a str,
    purchase_order_name: &'a str,
    customer_info: CustomerInfo<'a>,
}

#[derive(Debug, Deserialize)]
struct InitiateResponse {
    pidx: String,
    payment_url: String,
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct VerifyPayload<'a> {
    token: &'a str,
    amount: u64,
}

/// Single-attempt Khalti ePayment client.
#[derive(Debug, Clone)]
pub struct KhaltiClient {
    http: Client,
    secret_key: Option<String>,
    endpoints: KhaltiEndpoints,
    return_url: String,
    website_url: String,
}

impl KhaltiClient {
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| PaymentError::Initiation(err.to_string()))?;

        Ok(Self {
            http,
            secret_key: config.khalti_secret_key.clone(),
            endpoints: KhaltiEndpoints::for_mode(config.khalti_sandbox),
            return_url: config.return_url.clone(),
            website_url: config.website_url.clone(),
        })
    }

    pub fn endpoints(&self) -> &KhaltiEndpoints {
        &self.endpoints
    }

    fn authorization(&self) -> Result<String, PaymentError> {
        match &self.secret_key {
            Some(key) => Ok(format!("Key {key}")),
            None => {
                error!("Khalti secret key not configured");
                Err(PaymentError::NotConfigured)
            }
        }
    }

    fn initiate_payload<'a>(&'a self, request: &'a PaymentRequest) -> InitiatePayload<'a> {
        InitiatePayload {
            return_url: &self.return_url,
            website_url: &self.website_url,
            amount: request.amount_paisa,
            purchase_order_id: &request.purchase_order_id,
            purchase_order_name: &request.purchase_order_name,
            customer_info: CustomerInfo {
                name: &request.customer_name,
                email: &request.customer_email,
            },
        }
    }
}

#[async_trait]
impl PaymentGateway for KhaltiClient {
    async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentInitiation, PaymentError> {
        let authorization = self.authorization()?;

        let response = self
            .http
            .post(&self.endpoints.initiate)
            .header(AUTHORIZATION, authorization)
            .json(&self.initiate_payload(request))
            .send()
            .await
            .map_err(|err| PaymentError::Initiation(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Initiation(format!(
                "Khalti API returned status {status}: {body}"
            )));
        }

        let payload: InitiateResponse = response
            .json()
            .await
            .map_err(|err| PaymentError::Initiation(err.to_string()))?;

        info!(
            purchase_order_id = %request.purchase_order_id,
            pidx = %payload.pidx,
            expires_at = payload.expires_at.as_deref().unwrap_or("unknown"),
            "Khalti payment initiated"
        );

        Ok(PaymentInitiation {
            payment_url: payload.payment_url,
            pidx: payload.pidx,
            message: payload.message,
        })
    }

    async fn verify(
        &self,
        token: &str,
        amount_paisa: u64,
    ) -> Result<serde_json::Value, PaymentError> {
        let authorization = self.authorization()?;

        let response = self
            .http
            .post(&self.endpoints.verify)
            .header(AUTHORIZATION, authorization)
            .json(&VerifyPayload {
                token,
                amount: amount_paisa,
            })
            .send()
            .await
            .map_err(|err| PaymentError::Verification(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Verification(format!(
                "Khalti API returned status {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|err| PaymentError::Verification(err.to_string()))
    }
}
