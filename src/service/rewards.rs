use crate::models::settingsmodel::RewardTier;

/// Collapses duplicate thresholds (first occurrence wins; repeated settings
/// writes can leave duplicates behind) and returns the tiers sorted by
/// ascending threshold.
pub fn dedupe_tiers(tiers: &[RewardTier]) -> Vec<RewardTier> {
    let mut deduped: Vec<RewardTier> = Vec::with_capacity(tiers.len());

    for tier in tiers {
        if !deduped.iter().any(|t| t.referral_count == tier.referral_count) {
            deduped.push(tier.clone());
        }
    }

    deduped.sort_by_key(|t| t.referral_count);
    deduped
}

/// The redemption-side resolver: the tier with the largest threshold the
/// count meets or exceeds. A customer sitting above several thresholds gets
/// only the highest one; lower tiers are superseded, not stacked.
pub fn resolve_highest_qualifying(tiers: &[RewardTier], count: i32) -> Option<RewardTier> {
    let mut matched = None;

    for tier in dedupe_tiers(tiers) {
        if tier.referral_count <= count {
            matched = Some(tier);
        } else {
            break;
        }
    }

    matched
}

/// The notification-side resolver: fires only when the count lands exactly
/// on a threshold, so later orders past a milestone do not re-trigger it.
pub fn resolve_exact_milestone(tiers: &[RewardTier], count: i32) -> Option<RewardTier> {
    dedupe_tiers(tiers)
        .into_iter()
        .find(|tier| tier.referral_count == count)
}
