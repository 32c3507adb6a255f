// service/attribution.rs
use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::Config,
    db::{ProcessedOrderExt, RedemptionExt, ReferralExt, SettingsExt},
    dtos::webhookdtos::OrderCreatedPayload,
    mail::{mails, Mailer},
    models::{
        referralmodel::{RewardRedemption, RewardStatus},
        settingsmodel::RewardTier,
    },
    service::{
        claims::{ClaimDenial, ClaimTokenService},
        error::ServiceError,
        rewards::{dedupe_tiers, resolve_exact_milestone, resolve_highest_qualifying},
        signal::{classify, OrderSignal},
    },
    shopify::{client::INVITER_TAG, CommerceApi},
};

/// Everything the webhook handler needs to answer a handled order.
/// Exactly one of these comes back per delivery; all of them map to
/// HTTP 200.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// Duplicate delivery; the order id was already consumed.
    AlreadyProcessed,
    NotPaid {
        status: String,
    },
    NoSignal,
    /// The referral code on the order does not exist in the ledger.
    ReferralCodeUnknown {
        referral_code: String,
    },
    ReferralAttributed {
        referral_code: String,
        new_count: i32,
        discount_deleted: bool,
        inviter_tag_added: bool,
        milestone_reached: Option<i32>,
    },
    ClaimDenied {
        denial: ClaimDenial,
    },
    ClaimRedeemed {
        referral_code: String,
    },
}

/// Result of checking a claim token for the storefront.
#[derive(Debug)]
pub enum ClaimCheck {
    Valid(ClaimVerification),
    Denied(ClaimDenial),
}

#[derive(Debug)]
pub struct ClaimVerification {
    pub redemption: RewardRedemption,
    pub matched_tier: Option<RewardTier>,
    pub fixed_referee_product: Option<String>,
}

/// Sequences the order-webhook side effects. Collaborators are injected so
/// the whole pipeline runs against doubles in tests; external failures are
/// logged and stepped over, never allowed to abort the remaining steps.
#[derive(Debug, Clone)]
pub struct AttributionService<S, C, M> {
    store: Arc<S>,
    commerce: Arc<C>,
    mailer: Arc<M>,
    claims: ClaimTokenService,
    env: Config,
}

impl<S, C, M> AttributionService<S, C, M>
where
    S: ReferralExt + RedemptionExt + SettingsExt + ProcessedOrderExt + Send + Sync,
    C: CommerceApi,
    M: Mailer,
{
    pub fn new(store: Arc<S>, commerce: Arc<C>, mailer: Arc<M>, env: Config) -> Self {
        let claims = ClaimTokenService::new(env.claim_token_secret.clone());
        AttributionService {
            store,
            commerce,
            mailer,
            claims,
            env,
        }
    }

    pub fn claim_tokens(&self) -> &ClaimTokenService {
        &self.claims
    }

    /// Entry point for the order-created webhook. Errors escaping here are
    /// genuine faults (store unreachable); every application-level condition
    /// is a `WebhookOutcome`.
    pub async fn process(
        &self,
        payload: &OrderCreatedPayload,
    ) -> Result<WebhookOutcome, ServiceError> {
        match classify(payload) {
            OrderSignal::NotPaid { status } => {
                tracing::info!(
                    "⏭️ Order {} is not paid ({}), skipping...",
                    payload.id,
                    status
                );
                Ok(WebhookOutcome::NotPaid { status })
            }
            OrderSignal::NoSignal => {
                tracing::info!("ℹ️ No referral/claim data found in order {}", payload.id);
                Ok(WebhookOutcome::NoSignal)
            }
            OrderSignal::ReferralUsage {
                referral_code,
                discount_code,
            } => {
                self.process_referral_usage(payload, &referral_code, &discount_code)
                    .await
            }
            OrderSignal::ClaimRedemption { token } => {
                self.process_claim_redemption(payload, &token).await
            }
        }
    }

    async fn process_referral_usage(
        &self,
        payload: &OrderCreatedPayload,
        referral_code: &str,
        discount_code: &str,
    ) -> Result<WebhookOutcome, ServiceError> {
        // The insert is the check-and-set; losing it means a duplicate
        // delivery already ran (or is running) the side effects.
        if !self.store.try_mark_order_processed(payload.id).await? {
            tracing::info!("⏭️ Order {} already processed, skipping...", payload.id);
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        tracing::info!(
            "🎯 Order {}: referral code {} with discount code {}",
            payload.id,
            referral_code,
            discount_code
        );

        let discount_deleted = match self
            .commerce
            .delete_discount_code(discount_code, payload.id)
            .await
        {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!("🔥 Discount cleanup failed for {}: {}", discount_code, e);
                false
            }
        };

        let Some(account) = self.store.increment_referral_count(referral_code).await? else {
            tracing::warn!(
                "❌ No referral account found for code {}, abandoning attribution",
                referral_code
            );
            return Ok(WebhookOutcome::ReferralCodeUnknown {
                referral_code: referral_code.to_string(),
            });
        };

        let new_count = account.referral_count;
        tracing::info!(
            "📈 Referral count for {} is now {}",
            account.referral_code,
            new_count
        );

        let mut inviter_tag_added = false;
        if new_count == 1 {
            match self
                .commerce
                .add_customer_tag(&account.customer_id, INVITER_TAG)
                .await
            {
                Ok(added) => inviter_tag_added = added,
                Err(e) => {
                    tracing::warn!(
                        "🔥 Failed to tag customer {} as inviter: {}",
                        account.customer_id,
                        e
                    );
                }
            }
        }

        let milestone_reached = self.handle_milestone(&account.referral_code, new_count, &account.customer_email, &account.customer_name).await;

        if let Some(email) = account.customer_email.as_deref().filter(|e| !e.is_empty()) {
            let name = account.customer_name.as_deref().unwrap_or("Customer");
            if let Err(e) = mails::send_referral_used_email(
                self.mailer.as_ref(),
                &self.env.shop_name,
                email,
                name,
                new_count,
            )
            .await
            {
                tracing::warn!("🔥 Failed to send referral-used email to {}: {}", email, e);
            }
        }

        Ok(WebhookOutcome::ReferralAttributed {
            referral_code: account.referral_code,
            new_count,
            discount_deleted,
            inviter_tag_added,
            milestone_reached,
        })
    }

    /// Exact-match milestone check: issues (or refreshes) the claim link and
    /// sends the congratulation + admin emails. Returns the matched
    /// threshold. Silent when no tier matches or none are configured.
    async fn handle_milestone(
        &self,
        referral_code: &str,
        new_count: i32,
        customer_email: &Option<String>,
        customer_name: &Option<String>,
    ) -> Option<i32> {
        let settings = match self.store.get_referral_settings(&self.env.shop_domain).await {
            Ok(settings) => settings?,
            Err(e) => {
                tracing::warn!("🔥 Failed to load reward settings: {}", e);
                return None;
            }
        };

        let tiers = dedupe_tiers(&settings.reward_tiers.0);
        if tiers.is_empty() {
            return None;
        }

        let tier = resolve_exact_milestone(&tiers, new_count)?;

        let token = self.claims.issue(referral_code, Utc::now());
        let claim_link = self.claims.claim_link(&self.env.shop_domain, &token);

        let email = customer_email.clone().unwrap_or_default();
        let name = customer_name
            .clone()
            .unwrap_or_else(|| "Customer".to_string());

        if let Err(e) = self
            .store
            .upsert_pending_redemption(referral_code, &email, &name, new_count, &claim_link)
            .await
        {
            tracing::warn!(
                "🔥 Failed to record reward redemption for {}: {}",
                referral_code,
                e
            );
            return Some(tier.referral_count);
        }

        tracing::info!(
            "🎁 Milestone {} reached for {}; claim link issued",
            tier.referral_count,
            referral_code
        );

        let admin_detail = format!(
            "Referral code {} reached {} referrals. Claim link: {}",
            referral_code, new_count, claim_link
        );

        // The two notifications are independent; send them together.
        let (congrats, admin) = tokio::join!(
            async {
                if email.is_empty() {
                    tracing::warn!(
                        "ℹ️ No email on referral account {}, skipping congratulations",
                        referral_code
                    );
                    return Ok(());
                }
                mails::send_milestone_email(
                    self.mailer.as_ref(),
                    &self.env.shop_name,
                    &email,
                    &name,
                    tier.referral_count,
                    &claim_link,
                )
                .await
            },
            mails::send_admin_notification_email(
                self.mailer.as_ref(),
                &self.env.admin_email,
                "🏆 Referral milestone reached",
                &admin_detail,
            )
        );

        if let Err(e) = congrats {
            tracing::warn!("🔥 Failed to send milestone email for {}: {}", referral_code, e);
        }
        if let Err(e) = admin {
            tracing::warn!("🔥 Failed to send admin milestone notification: {}", e);
        }

        Some(tier.referral_count)
    }

    async fn process_claim_redemption(
        &self,
        payload: &OrderCreatedPayload,
        token: &str,
    ) -> Result<WebhookOutcome, ServiceError> {
        if !self.store.try_mark_order_processed(payload.id).await? {
            tracing::info!("⏭️ Order {} already processed, skipping...", payload.id);
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        let ticket = match self.claims.decode(token, Utc::now()) {
            Ok(ticket) => ticket,
            Err(denial) => {
                tracing::warn!(
                    "❌ Claim token rejected on order {}: {}",
                    payload.id,
                    denial.message()
                );
                return Ok(WebhookOutcome::ClaimDenied { denial });
            }
        };

        let redemption = match self.resolve_active_redemption(&ticket.referral_code).await? {
            Ok(redemption) => redemption,
            Err(denial) => {
                tracing::warn!(
                    "❌ Claim rejected for code {} on order {}: {}",
                    ticket.referral_code,
                    payload.id,
                    denial.message()
                );
                return Ok(WebhookOutcome::ClaimDenied { denial });
            }
        };

        let order_reference = payload
            .name
            .clone()
            .unwrap_or_else(|| payload.id.to_string());

        self.store
            .mark_redemption_redeemed(&ticket.referral_code, &order_reference)
            .await?;

        tracing::info!(
            "✅ Reward redeemed for {} on order {}",
            ticket.referral_code,
            order_reference
        );

        let admin_detail = format!(
            "Reward for referral code {} was redeemed on order {}.",
            ticket.referral_code, order_reference
        );

        let (confirmation, admin) = tokio::join!(
            mails::send_redemption_confirmation_email(
                self.mailer.as_ref(),
                &self.env.shop_name,
                &redemption.customer_email,
                &redemption.customer_name,
            ),
            mails::send_admin_notification_email(
                self.mailer.as_ref(),
                &self.env.admin_email,
                "🎁 Reward redeemed",
                &admin_detail,
            )
        );

        if let Err(e) = confirmation {
            tracing::warn!(
                "🔥 Failed to send redemption confirmation to {}: {}",
                redemption.customer_email,
                e
            );
        }
        if let Err(e) = admin {
            tracing::warn!("🔥 Failed to send admin redemption notification: {}", e);
        }

        Ok(WebhookOutcome::ClaimRedeemed {
            referral_code: ticket.referral_code,
        })
    }

    /// The active-redemption lookup shared by the webhook and the
    /// storefront check. A redeemed record yields `AlreadyRedeemed`; a
    /// missing one yields `NotFound`.
    async fn resolve_active_redemption(
        &self,
        referral_code: &str,
    ) -> Result<Result<RewardRedemption, ClaimDenial>, ServiceError> {
        if let Some(redemption) = self.store.find_active_redemption(referral_code).await? {
            return Ok(Ok(redemption));
        }

        let denial = match self.store.get_redemption(referral_code).await? {
            Some(r) if r.reward_status == RewardStatus::Redeemed => ClaimDenial::AlreadyRedeemed,
            _ => ClaimDenial::NotFound,
        };
        Ok(Err(denial))
    }

    /// Storefront-side token check: validity plus the redemption record and
    /// the highest reward tier the stored count qualifies for.
    pub async fn verify_claim(&self, token: &str) -> Result<ClaimCheck, ServiceError> {
        let ticket = match self.claims.decode(token, Utc::now()) {
            Ok(ticket) => ticket,
            Err(denial) => return Ok(ClaimCheck::Denied(denial)),
        };

        let redemption = match self.resolve_active_redemption(&ticket.referral_code).await? {
            Ok(redemption) => redemption,
            Err(denial) => return Ok(ClaimCheck::Denied(denial)),
        };

        let (matched_tier, fixed_referee_product) = match self
            .store
            .get_referral_settings(&self.env.shop_domain)
            .await
        {
            Ok(Some(settings)) => (
                resolve_highest_qualifying(&settings.reward_tiers.0, redemption.referral_count),
                settings.fixed_referee_product.clone(),
            ),
            Ok(None) => (None, None),
            Err(e) => {
                tracing::warn!("🔥 Failed to load reward settings: {}", e);
                (None, None)
            }
        };

        Ok(ClaimCheck::Valid(ClaimVerification {
            redemption,
            matched_tier,
            fixed_referee_product,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use sqlx::types::Json;
    use uuid::Uuid;

    use crate::dtos::webhookdtos::NoteAttribute;
    use crate::mail::{MailDelivery, MailError};
    use crate::models::referralmodel::{ReferralAccount, RewardStatus};
    use crate::models::settingsmodel::ReferralSettings;
    use crate::service::signal::{CLAIM_TOKEN_ATTR, DISCOUNT_CODE_ATTR, REFERRAL_CODE_ATTR};
    use crate::shopify::client::{
        CommerceCustomer, CommerceError, DiscountCode, DiscountRule, Metafield,
    };

    const SHOP: &str = "test-shop.myshopify.com";

    #[derive(Default)]
    struct MemStore {
        accounts: Mutex<HashMap<String, ReferralAccount>>,
        redemptions: Mutex<HashMap<String, RewardRedemption>>,
        settings: Mutex<Option<ReferralSettings>>,
        processed: Mutex<HashSet<i64>>,
    }

    impl MemStore {
        fn with_account(self, code: &str, count: i32) -> Self {
            let account = ReferralAccount {
                id: Uuid::new_v4(),
                referral_code: code.to_string(),
                customer_id: "9001".to_string(),
                customer_email: Some("referrer@example.com".to_string()),
                customer_name: Some("Rae Ferrer".to_string()),
                referral_count: count,
                created_at: Some(Utc::now()),
                updated_at: Some(Utc::now()),
            };
            self.accounts
                .lock()
                .unwrap()
                .insert(code.to_string(), account);
            self
        }

        fn with_tiers(self, tiers: Vec<(i32, &str)>) -> Self {
            let settings = ReferralSettings {
                id: Uuid::new_v4(),
                shop: SHOP.to_string(),
                reward_tiers: Json(
                    tiers
                        .into_iter()
                        .map(|(count, product)| RewardTier {
                            referral_count: count,
                            referrer_product: product.to_string(),
                        })
                        .collect(),
                ),
                fixed_referee_product: Some("gid://shopify/Product/777".to_string()),
                created_at: Some(Utc::now()),
                updated_at: Some(Utc::now()),
            };
            *self.settings.lock().unwrap() = Some(settings);
            self
        }

        fn count_of(&self, code: &str) -> i32 {
            self.accounts
                .lock()
                .unwrap()
                .get(code)
                .map(|a| a.referral_count)
                .unwrap_or(-1)
        }

        fn redemption_of(&self, code: &str) -> Option<RewardRedemption> {
            self.redemptions.lock().unwrap().get(code).cloned()
        }
    }

    #[async_trait]
    impl ReferralExt for MemStore {
        async fn save_referral_account(
            &self,
            referral_code: &str,
            customer_id: &str,
            customer_email: Option<&str>,
            customer_name: Option<&str>,
        ) -> Result<ReferralAccount, sqlx::Error> {
            let account = ReferralAccount {
                id: Uuid::new_v4(),
                referral_code: referral_code.to_string(),
                customer_id: customer_id.to_string(),
                customer_email: customer_email.map(|e| e.to_string()),
                customer_name: customer_name.map(|n| n.to_string()),
                referral_count: 0,
                created_at: Some(Utc::now()),
                updated_at: Some(Utc::now()),
            };
            self.accounts
                .lock()
                .unwrap()
                .insert(referral_code.to_string(), account.clone());
            Ok(account)
        }

        async fn get_referral_account(
            &self,
            referral_code: &str,
        ) -> Result<Option<ReferralAccount>, sqlx::Error> {
            Ok(self.accounts.lock().unwrap().get(referral_code).cloned())
        }

        async fn get_referral_accounts(
            &self,
            _page: u32,
            _limit: usize,
        ) -> Result<Vec<ReferralAccount>, sqlx::Error> {
            Ok(self.accounts.lock().unwrap().values().cloned().collect())
        }

        async fn increment_referral_count(
            &self,
            referral_code: &str,
        ) -> Result<Option<ReferralAccount>, sqlx::Error> {
            let mut accounts = self.accounts.lock().unwrap();
            Ok(accounts.get_mut(referral_code).map(|account| {
                account.referral_count += 1;
                account.clone()
            }))
        }
    }

    #[async_trait]
    impl RedemptionExt for MemStore {
        async fn upsert_pending_redemption(
            &self,
            referral_code: &str,
            customer_email: &str,
            customer_name: &str,
            referral_count: i32,
            claim_link: &str,
        ) -> Result<RewardRedemption, sqlx::Error> {
            let mut redemptions = self.redemptions.lock().unwrap();
            let redemption = redemptions
                .entry(referral_code.to_string())
                .and_modify(|r| {
                    r.customer_email = customer_email.to_string();
                    r.customer_name = customer_name.to_string();
                    r.referral_count = referral_count;
                    r.reward_status = RewardStatus::Pending;
                    r.claim_link = claim_link.to_string();
                })
                .or_insert_with(|| RewardRedemption {
                    id: Uuid::new_v4(),
                    referral_code: referral_code.to_string(),
                    customer_email: customer_email.to_string(),
                    customer_name: customer_name.to_string(),
                    referral_count,
                    reward_status: RewardStatus::Pending,
                    claim_link: claim_link.to_string(),
                    redeemed_order: None,
                    redeemed_at: None,
                    created_at: Some(Utc::now()),
                    updated_at: Some(Utc::now()),
                });
            Ok(redemption.clone())
        }

        async fn get_redemption(
            &self,
            referral_code: &str,
        ) -> Result<Option<RewardRedemption>, sqlx::Error> {
            Ok(self.redemptions.lock().unwrap().get(referral_code).cloned())
        }

        async fn find_active_redemption(
            &self,
            referral_code: &str,
        ) -> Result<Option<RewardRedemption>, sqlx::Error> {
            Ok(self
                .redemptions
                .lock()
                .unwrap()
                .get(referral_code)
                .filter(|r| r.reward_status != RewardStatus::Redeemed)
                .cloned())
        }

        async fn mark_redemption_redeemed(
            &self,
            referral_code: &str,
            order_reference: &str,
        ) -> Result<Option<RewardRedemption>, sqlx::Error> {
            let mut redemptions = self.redemptions.lock().unwrap();
            match redemptions.get_mut(referral_code) {
                Some(r) if r.reward_status != RewardStatus::Redeemed => {
                    r.reward_status = RewardStatus::Redeemed;
                    r.redeemed_order = Some(order_reference.to_string());
                    r.redeemed_at = Some(Utc::now());
                    Ok(Some(r.clone()))
                }
                _ => Ok(None),
            }
        }

        async fn update_redemption_status(
            &self,
            referral_code: &str,
            status: RewardStatus,
        ) -> Result<Option<RewardRedemption>, sqlx::Error> {
            let mut redemptions = self.redemptions.lock().unwrap();
            Ok(redemptions.get_mut(referral_code).map(|r| {
                r.reward_status = status;
                r.clone()
            }))
        }
    }

    #[async_trait]
    impl SettingsExt for MemStore {
        async fn get_referral_settings(
            &self,
            _shop: &str,
        ) -> Result<Option<ReferralSettings>, sqlx::Error> {
            Ok(self.settings.lock().unwrap().clone())
        }

        async fn upsert_referral_settings(
            &self,
            shop: &str,
            reward_tiers: &[RewardTier],
            fixed_referee_product: Option<&str>,
        ) -> Result<ReferralSettings, sqlx::Error> {
            let settings = ReferralSettings {
                id: Uuid::new_v4(),
                shop: shop.to_string(),
                reward_tiers: Json(reward_tiers.to_vec()),
                fixed_referee_product: fixed_referee_product.map(|p| p.to_string()),
                created_at: Some(Utc::now()),
                updated_at: Some(Utc::now()),
            };
            *self.settings.lock().unwrap() = Some(settings.clone());
            Ok(settings)
        }

        async fn delete_referral_settings(&self, _shop: &str) -> Result<bool, sqlx::Error> {
            Ok(self.settings.lock().unwrap().take().is_some())
        }
    }

    #[async_trait]
    impl ProcessedOrderExt for MemStore {
        async fn try_mark_order_processed(&self, order_id: i64) -> Result<bool, sqlx::Error> {
            Ok(self.processed.lock().unwrap().insert(order_id))
        }

        async fn has_processed_order(&self, order_id: i64) -> Result<bool, sqlx::Error> {
            Ok(self.processed.lock().unwrap().contains(&order_id))
        }
    }

    #[derive(Default)]
    struct FakeCommerce {
        rules: Mutex<Vec<(DiscountRule, Vec<DiscountCode>)>>,
        deleted_rules: Mutex<Vec<i64>>,
        tags: Mutex<Vec<(String, String)>>,
        notes: Mutex<Vec<(i64, String)>>,
    }

    impl FakeCommerce {
        fn with_discount(self, rule_id: i64, code: &str) -> Self {
            self.rules.lock().unwrap().push((
                DiscountRule {
                    id: rule_id,
                    title: Some(format!("rule-{}", rule_id)),
                },
                vec![DiscountCode {
                    id: rule_id * 10,
                    code: code.to_string(),
                }],
            ));
            self
        }
    }

    #[async_trait]
    impl CommerceApi for FakeCommerce {
        async fn find_customer_by_email(
            &self,
            _email: &str,
        ) -> Result<Option<CommerceCustomer>, CommerceError> {
            Ok(None)
        }

        async fn get_customer_metafields(
            &self,
            _customer_id: &str,
        ) -> Result<Vec<Metafield>, CommerceError> {
            Ok(vec![])
        }

        async fn set_customer_metafield(
            &self,
            _customer_id: &str,
            _namespace: &str,
            _key: &str,
            _value: &str,
        ) -> Result<(), CommerceError> {
            Ok(())
        }

        async fn add_customer_tag(
            &self,
            customer_id: &str,
            tag: &str,
        ) -> Result<bool, CommerceError> {
            let mut tags = self.tags.lock().unwrap();
            let entry = (customer_id.to_string(), tag.to_string());
            if tags.contains(&entry) {
                return Ok(false);
            }
            tags.push(entry);
            Ok(true)
        }

        async fn list_discount_rules(&self) -> Result<Vec<DiscountRule>, CommerceError> {
            Ok(self
                .rules
                .lock()
                .unwrap()
                .iter()
                .map(|(rule, _)| rule.clone())
                .collect())
        }

        async fn list_rule_discount_codes(
            &self,
            rule_id: i64,
        ) -> Result<Vec<DiscountCode>, CommerceError> {
            Ok(self
                .rules
                .lock()
                .unwrap()
                .iter()
                .find(|(rule, _)| rule.id == rule_id)
                .map(|(_, codes)| codes.clone())
                .unwrap_or_default())
        }

        async fn delete_discount_rule(&self, rule_id: i64) -> Result<(), CommerceError> {
            self.rules.lock().unwrap().retain(|(rule, _)| rule.id != rule_id);
            self.deleted_rules.lock().unwrap().push(rule_id);
            Ok(())
        }

        async fn annotate_order(&self, order_id: i64, note: &str) -> Result<(), CommerceError> {
            self.notes.lock().unwrap().push((order_id, note.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMailer {
        fn subjects_to(&self, to: &str) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(recipient, _)| recipient == to)
                .map(|(_, subject)| subject.clone())
                .collect()
        }

        fn total(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(
            &self,
            to: &str,
            subject: &str,
            _html_body: &str,
            _text_body: &str,
        ) -> Result<MailDelivery, MailError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string()));
            Ok(MailDelivery {
                provider_message_id: "test".to_string(),
            })
        }
    }

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/test".to_string(),
            app_url: "https://referly.test".to_string(),
            port: 8000,
            shop_domain: SHOP.to_string(),
            shop_name: "Test Shop".to_string(),
            shopify_access_token: "shpat_test".to_string(),
            shopify_api_version: "2024-01".to_string(),
            claim_token_secret: "test-secret".to_string(),
            resend_api_key: "re_test".to_string(),
            from_email: "Test Shop <noreply@test-shop.example>".to_string(),
            admin_email: "admin@test-shop.example".to_string(),
        }
    }

    fn service(
        store: MemStore,
        commerce: FakeCommerce,
    ) -> (
        AttributionService<MemStore, FakeCommerce, RecordingMailer>,
        Arc<MemStore>,
        Arc<FakeCommerce>,
        Arc<RecordingMailer>,
    ) {
        let store = Arc::new(store);
        let commerce = Arc::new(commerce);
        let mailer = Arc::new(RecordingMailer::default());
        let svc = AttributionService::new(
            store.clone(),
            commerce.clone(),
            mailer.clone(),
            test_config(),
        );
        (svc, store, commerce, mailer)
    }

    fn usage_payload(order_id: i64, code: &str, discount: &str) -> OrderCreatedPayload {
        OrderCreatedPayload {
            id: order_id,
            name: Some(format!("#{}", order_id)),
            financial_status: Some("paid".to_string()),
            note_attributes: vec![
                NoteAttribute {
                    name: REFERRAL_CODE_ATTR.to_string(),
                    value: Some(code.to_string()),
                },
                NoteAttribute {
                    name: DISCOUNT_CODE_ATTR.to_string(),
                    value: Some(discount.to_string()),
                },
            ],
            customer: None,
        }
    }

    fn claim_payload(order_id: i64, token: &str) -> OrderCreatedPayload {
        OrderCreatedPayload {
            id: order_id,
            name: Some(format!("#{}", order_id)),
            financial_status: Some("paid".to_string()),
            note_attributes: vec![NoteAttribute {
                name: CLAIM_TOKEN_ATTR.to_string(),
                value: Some(token.to_string()),
            }],
            customer: None,
        }
    }

    #[tokio::test]
    async fn replayed_webhook_increments_exactly_once() {
        let (svc, store, _, mailer) = service(
            MemStore::default().with_account("ABC12345", 4),
            FakeCommerce::default(),
        );
        let payload = usage_payload(1001, "ABC12345", "REF-ABC");

        let first = svc.process(&payload).await.unwrap();
        assert!(matches!(first, WebhookOutcome::ReferralAttributed { new_count: 5, .. }));

        let sends_after_first = mailer.total();
        assert!(sends_after_first > 0);

        let second = svc.process(&payload).await.unwrap();
        assert_eq!(second, WebhookOutcome::AlreadyProcessed);
        assert_eq!(store.count_of("ABC12345"), 5);
        assert_eq!(mailer.total(), sends_after_first);
    }

    #[tokio::test]
    async fn milestone_creates_pending_redemption_with_claim_link() {
        // Scenario A: tiers = [{3, productX}], referrer at count 2.
        let (svc, store, _, mailer) = service(
            MemStore::default()
                .with_account("ABC12345", 2)
                .with_tiers(vec![(3, "gid://shopify/Product/111")]),
            FakeCommerce::default(),
        );

        let outcome = svc
            .process(&usage_payload(1002, "ABC12345", "REF-ABC"))
            .await
            .unwrap();

        match outcome {
            WebhookOutcome::ReferralAttributed {
                new_count,
                milestone_reached,
                ..
            } => {
                assert_eq!(new_count, 3);
                assert_eq!(milestone_reached, Some(3));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let redemption = store.redemption_of("ABC12345").expect("redemption created");
        assert_eq!(redemption.reward_status, RewardStatus::Pending);
        assert_eq!(redemption.referral_count, 3);
        assert!(redemption.claim_link.contains("claim_reward="));

        // The embedded token decodes back to the code.
        let token = redemption.claim_link.split("claim_reward=").nth(1).unwrap();
        let ticket = svc.claim_tokens().decode(token, Utc::now()).unwrap();
        assert_eq!(ticket.referral_code, "ABC12345");

        let referrer_subjects = mailer.subjects_to("referrer@example.com");
        assert!(referrer_subjects.iter().any(|s| s.contains("3 referrals")));
        assert!(!mailer.subjects_to("admin@test-shop.example").is_empty());
    }

    #[tokio::test]
    async fn claim_token_redeems_once_then_not_found() {
        // Scenario B: redeem the claim link from scenario A, then replay
        // the token on another order.
        let (svc, store, _, mailer) = service(
            MemStore::default()
                .with_account("ABC12345", 2)
                .with_tiers(vec![(3, "gid://shopify/Product/111")]),
            FakeCommerce::default(),
        );

        svc.process(&usage_payload(1003, "ABC12345", "REF-ABC"))
            .await
            .unwrap();
        let redemption = store.redemption_of("ABC12345").unwrap();
        let token = redemption
            .claim_link
            .split("claim_reward=")
            .nth(1)
            .unwrap()
            .to_string();

        let outcome = svc.process(&claim_payload(2001, &token)).await.unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::ClaimRedeemed {
                referral_code: "ABC12345".to_string()
            }
        );

        let redeemed = store.redemption_of("ABC12345").unwrap();
        assert_eq!(redeemed.reward_status, RewardStatus::Redeemed);
        assert_eq!(redeemed.redeemed_order.as_deref(), Some("#2001"));
        assert!(redeemed.redeemed_at.is_some());
        assert!(mailer
            .subjects_to("referrer@example.com")
            .iter()
            .any(|s| s.contains("redeemed")));

        let replay = svc.process(&claim_payload(2002, &token)).await.unwrap();
        assert_eq!(
            replay,
            WebhookOutcome::ClaimDenied {
                denial: ClaimDenial::AlreadyRedeemed
            }
        );
    }

    #[tokio::test]
    async fn unpaid_order_changes_nothing() {
        // Scenario C.
        let (svc, store, _, mailer) = service(
            MemStore::default().with_account("ABC12345", 2),
            FakeCommerce::default(),
        );

        let mut payload = usage_payload(1004, "ABC12345", "REF-ABC");
        payload.financial_status = Some("pending".to_string());

        let outcome = svc.process(&payload).await.unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::NotPaid {
                status: "pending".to_string()
            }
        );
        assert_eq!(store.count_of("ABC12345"), 2);
        assert_eq!(mailer.total(), 0);
        assert!(!store.has_processed_order(1004).await.unwrap());
    }

    #[tokio::test]
    async fn order_without_signals_has_no_side_effects() {
        // Scenario D.
        let (svc, store, _, mailer) = service(
            MemStore::default().with_account("ABC12345", 2),
            FakeCommerce::default(),
        );

        let payload = OrderCreatedPayload {
            id: 1005,
            name: Some("#1005".to_string()),
            financial_status: Some("paid".to_string()),
            note_attributes: vec![],
            customer: None,
        };

        let outcome = svc.process(&payload).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::NoSignal);
        assert_eq!(store.count_of("ABC12345"), 2);
        assert_eq!(mailer.total(), 0);
    }

    #[tokio::test]
    async fn duplicate_thresholds_resolve_to_a_single_reward() {
        // Scenario E: two tiers both at 5.
        let (svc, store, _, mailer) = service(
            MemStore::default()
                .with_account("ABC12345", 4)
                .with_tiers(vec![(5, "gid://shopify/Product/a"), (5, "gid://shopify/Product/b")]),
            FakeCommerce::default(),
        );

        let outcome = svc
            .process(&usage_payload(1006, "ABC12345", "REF-ABC"))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            WebhookOutcome::ReferralAttributed {
                milestone_reached: Some(5),
                ..
            }
        ));

        let congrats: Vec<String> = mailer
            .subjects_to("referrer@example.com")
            .into_iter()
            .filter(|s| s.contains("5 referrals"))
            .collect();
        assert_eq!(congrats.len(), 1);
        assert_eq!(mailer.subjects_to("admin@test-shop.example").len(), 1);

        let redemption = store.redemption_of("ABC12345").unwrap();
        assert_eq!(redemption.referral_count, 5);
    }

    #[tokio::test]
    async fn unknown_code_abandons_the_flow() {
        let (svc, store, _, mailer) =
            service(MemStore::default(), FakeCommerce::default());

        let outcome = svc
            .process(&usage_payload(1007, "NOPE0000", "REF-NOPE"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::ReferralCodeUnknown {
                referral_code: "NOPE0000".to_string()
            }
        );
        assert_eq!(mailer.total(), 0);
        assert!(store.redemption_of("NOPE0000").is_none());
    }

    #[tokio::test]
    async fn first_referral_tags_the_inviter() {
        let (svc, _, commerce, _) = service(
            MemStore::default().with_account("ABC12345", 0),
            FakeCommerce::default(),
        );

        let outcome = svc
            .process(&usage_payload(1008, "ABC12345", "REF-ABC"))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            WebhookOutcome::ReferralAttributed {
                new_count: 1,
                inviter_tag_added: true,
                ..
            }
        ));
        assert_eq!(
            commerce.tags.lock().unwrap().as_slice(),
            &[("9001".to_string(), INVITER_TAG.to_string())]
        );
    }

    #[tokio::test]
    async fn applied_discount_rule_is_deleted_and_order_annotated() {
        let (svc, _, commerce, _) = service(
            MemStore::default().with_account("ABC12345", 0),
            FakeCommerce::default().with_discount(42, "REF-ABC"),
        );

        let outcome = svc
            .process(&usage_payload(1009, "ABC12345", "REF-ABC"))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            WebhookOutcome::ReferralAttributed {
                discount_deleted: true,
                ..
            }
        ));
        assert_eq!(commerce.deleted_rules.lock().unwrap().as_slice(), &[42]);

        let notes = commerce.notes.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].1.contains("REF-ABC"));
    }

    #[tokio::test]
    async fn malformed_claim_token_is_denied_not_fatal() {
        let (svc, _, _, mailer) = service(MemStore::default(), FakeCommerce::default());

        let outcome = svc
            .process(&claim_payload(3001, "garbage-token"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::ClaimDenied {
                denial: ClaimDenial::MalformedToken
            }
        );
        assert_eq!(mailer.total(), 0);
    }

    #[tokio::test]
    async fn higher_milestone_refreshes_the_pending_redemption() {
        let (svc, store, _, _) = service(
            MemStore::default()
                .with_account("ABC12345", 2)
                .with_tiers(vec![(3, "p3"), (5, "p5")]),
            FakeCommerce::default(),
        );

        svc.process(&usage_payload(4001, "ABC12345", "REF-1"))
            .await
            .unwrap();
        let first = store.redemption_of("ABC12345").unwrap();
        assert_eq!(first.referral_count, 3);

        svc.process(&usage_payload(4002, "ABC12345", "REF-2"))
            .await
            .unwrap();
        svc.process(&usage_payload(4003, "ABC12345", "REF-3"))
            .await
            .unwrap();

        let refreshed = store.redemption_of("ABC12345").unwrap();
        assert_eq!(refreshed.reward_status, RewardStatus::Pending);
        assert_eq!(refreshed.referral_count, 5);
    }

    #[tokio::test]
    async fn verify_claim_resolves_highest_qualifying_tier() {
        let (svc, store, _, _) = service(
            MemStore::default()
                .with_account("ABC12345", 4)
                .with_tiers(vec![(3, "p3"), (5, "p5")]),
            FakeCommerce::default(),
        );

        svc.process(&usage_payload(5001, "ABC12345", "REF-ABC"))
            .await
            .unwrap();

        let token = {
            let redemption = store.redemption_of("ABC12345").unwrap();
            redemption
                .claim_link
                .split("claim_reward=")
                .nth(1)
                .unwrap()
                .to_string()
        };

        match svc.verify_claim(&token).await.unwrap() {
            ClaimCheck::Valid(verification) => {
                assert_eq!(verification.redemption.referral_count, 5);
                assert_eq!(
                    verification.matched_tier.map(|t| t.referrer_product),
                    Some("p5".to_string())
                );
                assert_eq!(
                    verification.fixed_referee_product.as_deref(),
                    Some("gid://shopify/Product/777")
                );
            }
            ClaimCheck::Denied(denial) => panic!("unexpected denial: {:?}", denial),
        }
    }
}
