use std::{collections::HashMap, time::Duration};

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error};

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
pub const USER_ID_METADATA_KEY: &str = "userId";

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    webhook_tolerance: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: Option<String>,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StripeSubscriptionItem {
    pub current_period_end: Option<i64>,
    pub price: Option<StripePrice>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StripePrice {
    pub recurring: Option<StripeRecurring>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StripeRecurring {
    pub interval: String,
}

impl StripeSubscription {
    /// Local user id carried in metadata. Missing, non-numeric and non-positive values are `None`.
    pub fn user_id(&self) -> Option<i64> {
        self.metadata
            .get(USER_ID_METADATA_KEY)
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
    }

    /// Billing interval of the first price, e.g. `month` or `year`.
    pub fn interval(&self) -> Option<&str> {
        self.items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .and_then(|price| price.recurring.as_ref())
            .map(|recurring| recurring.interval.as_str())
    }

    /// Returns the period end, falling back to the first item on newer API versions.
    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        self.current_period_end
            .or_else(|| {
                self.items
                    .data
                    .first()
                    .and_then(|item| item.current_period_end)
            })
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StripeInvoice {
    pub id: Option<String>,
    pub subscription: Option<String>,
    pub parent: Option<StripeInvoiceParent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StripeInvoiceParent {
    pub subscription_details: Option<StripeInvoiceSubscriptionDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StripeInvoiceSubscriptionDetails {
    pub subscription: Option<String>,
}

impl StripeInvoice {
    /// Subscription the invoice bills, from the top-level field or `parent.subscription_details`.
    pub fn subscription_id(&self) -> Option<String> {
        self.subscription.clone().or_else(|| {
            self.parent
                .as_ref()
                .and_then(|parent| parent.subscription_details.as_ref())
                .and_then(|details| details.subscription.clone())
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionParams {
    pub customer_id: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub user_id: i64,
}

impl StripeClient {
    pub fn new(secret_key: String, webhook_secret: String, webhook_tolerance: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            webhook_secret,
            webhook_tolerance,
        }
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.as_deref()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
            stripe_error_param = ?details.as_ref().and_then(|d| d.param.as_deref()),
            stripe_error_message = ?details.as_ref().and_then(|d| d.message.as_deref()),
            response_body = %body,
            context = %context,
            "stripe api request failed"
        );

        bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// https://stripe.com/docs/api/customers/create
    pub async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        user_id: i64,
    ) -> Result<String> {
        let mut body = vec![
            ("email".to_string(), email.to_string()),
            (
                format!("metadata[{USER_ID_METADATA_KEY}]"),
                user_id.to_string(),
            ),
        ];
        if let Some(name) = name {
            body.push(("name".to_string(), name.to_string()));
        }

        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/customers"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create customer").await?;

        #[derive(Deserialize)]
        struct CustomerResp {
            id: String,
        }

        let parsed: CustomerResp = resp.json().await?;
        Ok(parsed.id)
    }

    /// Creates a subscription-mode Checkout Session. The user id is written to both the
    /// session and the resulting subscription metadata so webhooks can map it back.
    /// https://stripe.com/docs/api/checkout/sessions/create
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<StripeCheckoutSession> {
        let user_id = params.user_id.to_string();
        let body: Vec<(String, String)> = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("customer".to_string(), params.customer_id.clone()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][price]".to_string(), params.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), params.success_url.clone()),
            ("cancel_url".to_string(), params.cancel_url.clone()),
            (format!("metadata[{USER_ID_METADATA_KEY}]"), user_id.clone()),
            (
                format!("subscription_data[metadata][{USER_ID_METADATA_KEY}]"),
                user_id,
            ),
        ];

        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/checkout/sessions"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        let session: StripeCheckoutSession = resp.json().await?;
        if session.url.is_none() {
            bail!("Stripe Checkout session URL is missing");
        }
        Ok(session)
    }

    /// https://stripe.com/docs/api/customer_portal/sessions/create
    pub async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String> {
        let body = [("customer", customer_id), ("return_url", return_url)];

        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/billing_portal/sessions"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create billing portal session").await?;

        #[derive(Deserialize)]
        struct PortalResp {
            url: String,
        }

        let parsed: PortalResp = resp.json().await?;
        Ok(parsed.url)
    }

    /// Cancels a subscription immediately.
    /// https://stripe.com/docs/api/subscriptions/cancel
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        let resp = self
            .http
            .delete(format!("{STRIPE_API_BASE}/subscriptions/{subscription_id}"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "cancel subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }

    /// https://stripe.com/docs/api/subscriptions/retrieve
    pub async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        let resp = self
            .http
            .get(format!("{STRIPE_API_BASE}/subscriptions/{subscription_id}"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }

    /// Verifies the webhook signature. https://stripe.com/docs/webhooks/signatures
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent> {
        verify_signature(
            self.webhook_secret.as_bytes(),
            payload,
            signature_header,
            self.webhook_tolerance,
            Utc::now().timestamp(),
        )?;

        let event: StripeEvent = serde_json::from_slice(payload)?;
        debug!(event_type = %event.type_, event_id = ?event.id, "stripe webhook verified");
        Ok(event)
    }
}

/// Checks a `t=<unix>,v1=<hex>[,v1=<hex>...]` header against `payload`. Any `v1` entry
/// may match; the timestamp must lie within `tolerance` of `now`.
pub fn verify_signature(
    secret: &[u8],
    payload: &[u8],
    signature_header: &str,
    tolerance: Duration,
    now: i64,
) -> Result<()> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            signatures.push(rest);
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| anyhow!("missing timestamp in stripe-signature"))?;
    if signatures.is_empty() {
        bail!("missing v1 in stripe-signature");
    }

    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| anyhow!("invalid timestamp in stripe-signature"))?;
    if now.abs_diff(signed_at) > tolerance.as_secs() {
        bail!("webhook timestamp outside tolerance");
    }

    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|provided| mac.clone().verify_slice(&provided).is_ok())
            .unwrap_or(false)
    });

    if !matched {
        bail!("invalid webhook signature");
    }

    Ok(())
}
