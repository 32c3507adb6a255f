use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::referralmodel::ReferralAccount;

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateReferralDto {
    /// Shopify customer id; resolved from `customerEmail` when absent.
    #[serde(rename = "customerId")]
    pub customer_id: Option<String>,

    #[validate(email(message = "Email is invalid"))]
    #[serde(rename = "customerEmail")]
    pub customer_email: Option<String>,

    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,

    /// Preassigned code from the storefront flow; generated when absent.
    #[serde(rename = "referralCode")]
    pub referral_code: Option<String>,
}

impl CreateReferralDto {
    pub fn validate_referral_code(&self) -> Result<(), ValidationError> {
        if let Some(code) = &self.referral_code {
            let code_regex = regex::Regex::new(r"^[A-Z0-9]{6,12}$")
                .map_err(|_| ValidationError::new("invalid_code_regex"))?;

            if !code_regex.is_match(code) {
                let mut error = ValidationError::new("invalid_referral_code");
                error.message = Some(Cow::from(
                    "Referral code must be 6-12 uppercase letters or digits",
                ));
                return Err(error);
            }
        }
        Ok(())
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SendReferralEmailDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    #[serde(rename = "customerEmail")]
    pub customer_email: String,

    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,

    #[validate(length(min = 1, message = "Referral code is required"))]
    #[serde(rename = "referralCode")]
    pub referral_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferralAccountDto {
    pub referral_code: String,
    pub customer_id: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub referral_count: i32,
    pub referral_link: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl ReferralAccountDto {
    pub fn from_account(account: ReferralAccount, referral_link: String) -> Self {
        ReferralAccountDto {
            referral_code: account.referral_code,
            customer_id: account.customer_id,
            customer_email: account.customer_email,
            customer_name: account.customer_name,
            referral_count: account.referral_count,
            referral_link,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReferralListResponseDto {
    pub success: bool,
    pub count: usize,
    pub data: Vec<ReferralAccountDto>,
}

#[derive(Debug, Serialize)]
pub struct CreateReferralResponseDto {
    pub success: bool,
    pub message: String,
    pub referral_code: String,
    pub referral_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<bool>,
}
