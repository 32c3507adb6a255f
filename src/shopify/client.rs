// shopify/client.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::Config;

const REQUEST_TIMEOUT_SECS: u64 = 15;
const CONNECT_TIMEOUT_SECS: u64 = 5;
const PAGE_LIMIT: u32 = 250;

pub const INVITER_TAG: &str = "Inviter";

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommerceCustomer {
    pub id: i64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub tags: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metafield {
    pub id: i64,
    pub namespace: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscountRule {
    pub id: i64,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscountCode {
    pub id: i64,
    pub code: String,
}

/// Admin-API verbs the reward pipeline needs. Kept as a trait so the
/// orchestrator can run against a double in tests.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<CommerceCustomer>, CommerceError>;

    async fn get_customer_metafields(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Metafield>, CommerceError>;

    async fn set_customer_metafield(
        &self,
        customer_id: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), CommerceError>;

    /// Returns true when the tag was newly added, false when it was
    /// already present (the operation is idempotent either way).
    async fn add_customer_tag(&self, customer_id: &str, tag: &str)
        -> Result<bool, CommerceError>;

    async fn list_discount_rules(&self) -> Result<Vec<DiscountRule>, CommerceError>;

    async fn list_rule_discount_codes(
        &self,
        rule_id: i64,
    ) -> Result<Vec<DiscountCode>, CommerceError>;

    async fn delete_discount_rule(&self, rule_id: i64) -> Result<(), CommerceError>;

    async fn annotate_order(&self, order_id: i64, note: &str) -> Result<(), CommerceError>;

    /// Removes the one-time discount code auto-applied at checkout: scans
    /// the discount rules for the exact code, deletes the owning rule, and
    /// leaves a note on the order. Returns false when the code is gone
    /// already. Per-rule lookup failures are logged and skipped.
    async fn delete_discount_code(
        &self,
        discount_code: &str,
        order_id: i64,
    ) -> Result<bool, CommerceError> {
        let rules = self.list_discount_rules().await?;

        for rule in rules {
            let codes = match self.list_rule_discount_codes(rule.id).await {
                Ok(codes) => codes,
                Err(e) => {
                    tracing::warn!("🔥 Failed to read discount codes for rule {}: {}", rule.id, e);
                    continue;
                }
            };

            if codes.iter().any(|dc| dc.code == discount_code) {
                self.delete_discount_rule(rule.id).await?;
                tracing::info!("✅ Deleted discount code {} (rule {})", discount_code, rule.id);

                let note = format!(
                    "Referral processed. Discount code {} deleted.",
                    discount_code
                );
                if let Err(e) = self.annotate_order(order_id, &note).await {
                    tracing::warn!("🔥 Failed to annotate order {}: {}", order_id, e);
                }

                return Ok(true);
            }
        }

        tracing::info!("ℹ️ Discount code {} not found in any rule", discount_code);
        Ok(false)
    }
}

/// Shopify Admin REST client.
#[derive(Debug, Clone)]
pub struct ShopifyAdminClient {
    client: reqwest::Client,
    shop_domain: String,
    access_token: String,
    api_version: String,
}

impl ShopifyAdminClient {
    pub fn new(env: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("failed to build the Shopify HTTP client");

        ShopifyAdminClient {
            client,
            shop_domain: env.shop_domain.clone(),
            access_token: env.shopify_access_token.clone(),
            api_version: env.shopify_api_version.clone(),
        }
    }

    fn admin_url(&self, path: &str) -> String {
        format!(
            "https://{}/admin/api/{}/{}",
            self.shop_domain, self.api_version, path
        )
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.admin_url(path))
            .header("Content-Type", "application/json")
            .header("X-Shopify-Access-Token", &self.access_token)
    }

    async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, CommerceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CommerceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    async fn expect_success(response: reqwest::Response) -> Result<(), CommerceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CommerceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn get_customer(&self, customer_id: &str) -> Result<CommerceCustomer, CommerceError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("customers/{}.json", customer_id),
            )
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        let customer: CommerceCustomer = serde_json::from_value(body["customer"].clone())
            .map_err(|e| CommerceError::Api {
                status: 200,
                body: format!("unexpected customer payload: {}", e),
            })?;

        Ok(customer)
    }
}

#[async_trait]
impl CommerceApi for ShopifyAdminClient {
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<CommerceCustomer>, CommerceError> {
        let query = urlencoding::encode(&format!("email:{}", email)).into_owned();
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("customers/search.json?query={}", query),
            )
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        let customers: Vec<CommerceCustomer> =
            serde_json::from_value(body["customers"].clone()).unwrap_or_default();

        Ok(customers.into_iter().next())
    }

    async fn get_customer_metafields(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Metafield>, CommerceError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("customers/{}/metafields.json", customer_id),
            )
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        let metafields: Vec<Metafield> =
            serde_json::from_value(body["metafields"].clone()).unwrap_or_default();

        Ok(metafields)
    }

    async fn set_customer_metafield(
        &self,
        customer_id: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), CommerceError> {
        let payload = json!({
            "metafield": {
                "namespace": namespace,
                "key": key,
                "value": value,
                "type": "single_line_text_field"
            }
        });

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("customers/{}/metafields.json", customer_id),
            )
            .json(&payload)
            .send()
            .await?;

        Self::expect_success(response).await
    }

    async fn add_customer_tag(
        &self,
        customer_id: &str,
        tag: &str,
    ) -> Result<bool, CommerceError> {
        let customer = self.get_customer(customer_id).await?;

        let mut tags: Vec<String> = customer
            .tags
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if tags.iter().any(|t| t == tag) {
            tracing::info!("ℹ️ Customer {} already has the {} tag", customer_id, tag);
            return Ok(false);
        }

        tags.push(tag.to_string());
        let payload = json!({
            "customer": {
                "id": customer.id,
                "tags": tags.join(", ")
            }
        });

        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("customers/{}.json", customer_id),
            )
            .json(&payload)
            .send()
            .await?;

        Self::expect_success(response).await?;
        Ok(true)
    }

    async fn list_discount_rules(&self) -> Result<Vec<DiscountRule>, CommerceError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("price_rules.json?limit={}", PAGE_LIMIT),
            )
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        let rules: Vec<DiscountRule> =
            serde_json::from_value(body["price_rules"].clone()).unwrap_or_default();

        Ok(rules)
    }

    async fn list_rule_discount_codes(
        &self,
        rule_id: i64,
    ) -> Result<Vec<DiscountCode>, CommerceError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("price_rules/{}/discount_codes.json", rule_id),
            )
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        let codes: Vec<DiscountCode> =
            serde_json::from_value(body["discount_codes"].clone()).unwrap_or_default();

        Ok(codes)
    }

    async fn delete_discount_rule(&self, rule_id: i64) -> Result<(), CommerceError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("price_rules/{}.json", rule_id),
            )
            .send()
            .await?;

        Self::expect_success(response).await
    }

    async fn annotate_order(&self, order_id: i64, note: &str) -> Result<(), CommerceError> {
        let payload = json!({
            "order": {
                "id": order_id,
                "note": note
            }
        });

        let response = self
            .request(reqwest::Method::PUT, &format!("orders/{}.json", order_id))
            .json(&payload)
            .send()
            .await?;

        Self::expect_success(response).await
    }
}
