use crate::dtos::webhookdtos::OrderCreatedPayload;

pub const FINANCIAL_STATUS_PAID: &str = "paid";

/// Note-attribute keys written by the checkout extension.
pub const REFERRAL_CODE_ATTR: &str = "referral_code_used";
pub const DISCOUNT_CODE_ATTR: &str = "applied_discount_code";
pub const CLAIM_TOKEN_ATTR: &str = "claim_reward_token";

/// What an inbound order means to the referral program.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderSignal {
    /// Order is not paid yet; nothing to attribute.
    NotPaid { status: String },
    /// The buyer is redeeming a previously issued claim link. Takes
    /// precedence over a referral code present on the same order.
    ClaimRedemption { token: String },
    /// A referred friend checked out with a referral discount applied.
    ReferralUsage {
        referral_code: String,
        discount_code: String,
    },
    /// No referral or claim data on this order.
    NoSignal,
}

pub fn classify(payload: &OrderCreatedPayload) -> OrderSignal {
    if let Some(status) = payload.financial_status.as_deref() {
        if status != FINANCIAL_STATUS_PAID {
            return OrderSignal::NotPaid {
                status: status.to_string(),
            };
        }
    }

    if let Some(token) = attribute_value(payload, CLAIM_TOKEN_ATTR) {
        return OrderSignal::ClaimRedemption { token };
    }

    let referral_code = attribute_value(payload, REFERRAL_CODE_ATTR);
    let discount_code = attribute_value(payload, DISCOUNT_CODE_ATTR);

    match (referral_code, discount_code) {
        (Some(referral_code), Some(discount_code)) => OrderSignal::ReferralUsage {
            referral_code,
            discount_code,
        },
        _ => OrderSignal::NoSignal,
    }
}

fn attribute_value(payload: &OrderCreatedPayload, name: &str) -> Option<String> {
    payload
        .note_attributes
        .iter()
        .find(|attr| attr.name == name)
        .and_then(|attr| attr.value.as_deref())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}
