use serde::{Deserialize, Serialize};

/// The slice of Shopify's "order created" webhook body this service reads.
/// Unknown fields are ignored on purpose; the payload carries far more.
#[derive(Debug, Deserialize, Clone)]
pub struct OrderCreatedPayload {
    pub id: i64,
    pub name: Option<String>,
    pub financial_status: Option<String>,
    #[serde(default)]
    pub note_attributes: Vec<NoteAttribute>,
    pub customer: Option<OrderCustomer>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NoteAttribute {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrderCustomer {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Webhook response body. Always paired with HTTP 200 for handled
/// conditions; Shopify retries on anything else.
#[derive(Debug, Serialize, Default)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_referral_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_deleted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inviter_tag_added: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_reached: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_status: Option<String>,
}
