use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};
use validator::Validate;

use crate::{
    db::SettingsExt,
    dtos::{
        settingsdtos::{RewardSettingsResponseDto, SaveRewardSettingsDto},
        Response,
    },
    error::HttpError,
    models::settingsmodel::RewardTier,
    service::rewards::dedupe_tiers,
    AppState,
};

pub fn settings_handler() -> Router {
    Router::new().route(
        "/rewards",
        get(get_rewards).put(save_rewards).delete(delete_rewards),
    )
}

pub async fn get_rewards(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let settings = app_state
        .db_client
        .get_referral_settings(&app_state.env.shop_domain)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response = match settings {
        Some(settings) => RewardSettingsResponseDto {
            success: true,
            reward_tiers: settings.reward_tiers.0,
            fixed_referee_product: settings.fixed_referee_product,
        },
        None => RewardSettingsResponseDto {
            success: true,
            reward_tiers: vec![],
            fixed_referee_product: None,
        },
    };

    Ok(Json(response))
}

pub async fn save_rewards(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<SaveRewardSettingsDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    // Duplicate thresholds are collapsed on write; the resolver dedupes
    // again defensively at read time.
    let tiers: Vec<RewardTier> = body.reward_tiers.into_iter().map(RewardTier::from).collect();
    let tiers = dedupe_tiers(&tiers);

    let settings = app_state
        .db_client
        .upsert_referral_settings(
            &app_state.env.shop_domain,
            &tiers,
            body.fixed_referee_product.as_deref(),
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(RewardSettingsResponseDto {
        success: true,
        reward_tiers: settings.reward_tiers.0,
        fixed_referee_product: settings.fixed_referee_product,
    }))
}

pub async fn delete_rewards(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let deleted = app_state
        .db_client
        .delete_referral_settings(&app_state.env.shop_domain)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let message = if deleted {
        "Reward settings deleted"
    } else {
        "No reward settings to delete"
    };

    Ok(Json(Response::ok(message)))
}
