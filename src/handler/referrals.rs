use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    db::ReferralExt,
    dtos::referraldtos::{
        CreateReferralDto, CreateReferralResponseDto, ReferralAccountDto, ReferralListResponseDto,
        SendReferralEmailDto,
    },
    error::{ErrorMessage, HttpError},
    mail::mails,
    service::referral::{generate_referral_code, shop_referral_link, whatsapp_share_link},
    shopify::CommerceApi,
    AppState,
};

pub fn referrals_handler() -> Router {
    Router::new()
        .route("/", post(create_referral).get(list_referrals))
        .route("/send-email", post(send_referral_email))
        .route("/:code", get(get_referral))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<usize>,
}

pub async fn create_referral(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<CreateReferralDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    body.validate_referral_code()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let mut customer_email = body.customer_email.clone();
    let mut customer_name = body.customer_name.clone();

    // The admin flow only knows the email; resolve the customer id from
    // the platform in that case.
    let customer_id = match body.customer_id.clone().filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => {
            let email = customer_email.as_deref().ok_or_else(|| {
                HttpError::bad_request("Either customerId or customerEmail is required")
            })?;

            let customer = app_state
                .shopify
                .find_customer_by_email(email)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?
                .ok_or_else(|| HttpError::not_found(ErrorMessage::CustomerNotFound.to_str()))?;

            if customer_name.is_none() {
                customer_name = match (customer.first_name, customer.last_name) {
                    (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
                    (Some(first), None) => Some(first),
                    (None, Some(last)) => Some(last),
                    (None, None) => None,
                };
            }
            if customer_email.is_none() {
                customer_email = customer.email;
            }

            customer.id.to_string()
        }
    };

    let referral_code = body
        .referral_code
        .clone()
        .unwrap_or_else(generate_referral_code);

    let saved = app_state
        .db_client
        .save_referral_account(
            &referral_code,
            &customer_id,
            customer_email.as_deref(),
            customer_name.as_deref(),
        )
        .await;

    let referral_link = shop_referral_link(&app_state.env.shop_domain, &referral_code);

    let account = match saved {
        Ok(account) => account,
        Err(e) => {
            // 23505 = unique_violation; an existing code is not an error
            // for the storefront flow.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23505") {
                    return Ok(Json(CreateReferralResponseDto {
                        success: true,
                        message: "Referral code already exists".to_string(),
                        referral_code,
                        referral_link,
                        existing: Some(true),
                    }));
                }
            }
            return Err(HttpError::server_error(e.to_string()));
        }
    };

    // Mirror the code onto the customer record so the storefront can read
    // it back without hitting this service.
    match app_state
        .shopify
        .get_customer_metafields(&account.customer_id)
        .await
    {
        Ok(metafields) => {
            let already_mirrored = metafields
                .iter()
                .any(|mf| mf.namespace == "custom" && mf.key == "referral_code");
            if !already_mirrored {
                if let Err(e) = app_state
                    .shopify
                    .set_customer_metafield(
                        &account.customer_id,
                        "custom",
                        "referral_code",
                        &account.referral_code,
                    )
                    .await
                {
                    tracing::warn!(
                        "🔥 Failed to mirror referral code to customer {}: {}",
                        account.customer_id,
                        e
                    );
                }
            }
        }
        Err(e) => {
            tracing::warn!(
                "🔥 Failed to read metafields for customer {}: {}",
                account.customer_id,
                e
            );
        }
    }

    if let Some(email) = account.customer_email.as_deref() {
        let name = account.customer_name.as_deref().unwrap_or("Customer");
        if let Err(e) = mails::send_referral_code_email(
            app_state.mailer.as_ref(),
            &app_state.env.shop_name,
            &app_state.env.shop_domain,
            email,
            name,
            &account.referral_code,
        )
        .await
        {
            tracing::warn!("🔥 Failed to send referral email to {}: {}", email, e);
        }
    }

    Ok(Json(CreateReferralResponseDto {
        success: true,
        message: "Referral data saved to database".to_string(),
        referral_code: account.referral_code,
        referral_link,
        existing: None,
    }))
}

pub async fn list_referrals(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(50);

    let accounts = app_state
        .db_client
        .get_referral_accounts(page, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let data: Vec<ReferralAccountDto> = accounts
        .into_iter()
        .map(|account| {
            let link = shop_referral_link(&app_state.env.shop_domain, &account.referral_code);
            ReferralAccountDto::from_account(account, link)
        })
        .collect();

    Ok(Json(ReferralListResponseDto {
        success: true,
        count: data.len(),
        data,
    }))
}

pub async fn get_referral(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let account = app_state
        .db_client
        .get_referral_account(&code)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ReferralCodeNotFound.to_str()))?;

    let link = shop_referral_link(&app_state.env.shop_domain, &account.referral_code);

    Ok(Json(json!({
        "success": true,
        "found": true,
        "data": ReferralAccountDto::from_account(account, link),
    })))
}

pub async fn send_referral_email(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<SendReferralEmailDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let name = body.customer_name.as_deref().unwrap_or("Customer");

    tracing::info!("📧 Sending referral email to: {}", body.customer_email);

    mails::send_referral_code_email(
        app_state.mailer.as_ref(),
        &app_state.env.shop_name,
        &app_state.env.shop_domain,
        &body.customer_email,
        name,
        &body.referral_code,
    )
    .await
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Referral email sent successfully",
        "shopLink": shop_referral_link(&app_state.env.shop_domain, &body.referral_code),
        "whatsappLink": whatsapp_share_link(&app_state.env.shop_domain, &body.referral_code),
    })))
}
