//! Entitlement State Machine
//!
//! Maps a business and its latest subscription onto one of seven canonical
//! states. The mapping is a pure function of its inputs, including the
//! timestamp, so it is recomputed on every read and never stored.
//!
//! Callers branch on the derived flags, not on [`EntitlementState`].

use crate::model::{Business, Subscription, SubscriptionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tier label when a trial subscription names no tier
pub const DEFAULT_TRIAL_TIER: &str = "Trial";

/// Tier label when a paid subscription names no tier
pub const DEFAULT_PAID_TIER: &str = "Standard";

const SECONDS_PER_DAY: i64 = 86_400;

/// Canonical entitlement states, in precedence order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementState {
    /// No owner has claimed the listing
    Unclaimed,
    /// Claimed, never subscribed
    NoSub,
    TrialActive,
    TrialExpired,
    PaidActive,
    /// Paid plan paused or canceled
    PaidLapsed,
    /// Any other subscription shape
    SubOther,
}

impl EntitlementState {
    /// Stable wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unclaimed => "UNCLAIMED",
            Self::NoSub => "NO_SUB",
            Self::TrialActive => "TRIAL_ACTIVE",
            Self::TrialExpired => "TRIAL_EXPIRED",
            Self::PaidActive => "PAID_ACTIVE",
            Self::PaidLapsed => "PAID_LAPSED",
            Self::SubOther => "SUB_OTHER",
        }
    }
}

/// Display tone for a badge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

/// Display label/tone pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub label: String,
    pub tone: Tone,
}

impl Badge {
    fn new(label: impl Into<String>, tone: Tone) -> Self {
        Self {
            label: label.into(),
            tone,
        }
    }
}

/// Features gated on billing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingFeature {
    Analytics,
    Notifications,
    AdvancedReporting,
}

impl BillingFeature {
    pub fn all() -> [BillingFeature; 3] {
        [Self::Analytics, Self::Notifications, Self::AdvancedReporting]
    }
}

/// Derived access state for a business
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResult {
    pub state: EntitlementState,
    pub is_claimed: bool,
    pub is_trial_active: bool,
    pub is_paid_active: bool,
    pub should_lock_controls: bool,
    pub should_show_to_users: bool,
    pub badge: Badge,
    /// Tier label, only while a trial or paid plan is active
    pub tier: Option<String>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub period_ends_at: Option<DateTime<Utc>>,
    /// Whole days left in an active trial, rounded up
    pub trial_days_remaining: Option<i64>,
}

impl EntitlementResult {
    fn base(state: EntitlementState, badge: Badge) -> Self {
        Self {
            state,
            is_claimed: state != EntitlementState::Unclaimed,
            is_trial_active: false,
            is_paid_active: false,
            should_lock_controls: false,
            should_show_to_users: false,
            badge,
            tier: None,
            trial_ends_at: None,
            period_ends_at: None,
            trial_days_remaining: None,
        }
    }

    /// Whether a billing-gated feature is available
    pub fn allows(&self, feature: BillingFeature) -> bool {
        match feature {
            BillingFeature::Analytics | BillingFeature::Notifications => {
                self.is_trial_active || self.is_paid_active
            }
            BillingFeature::AdvancedReporting => self.is_paid_active,
        }
    }
}

/// Compute the entitlement state
///
/// `now` is the single clock reading for the whole computation. Any
/// subscription shape that matches no other state lands in
/// [`EntitlementState::SubOther`]; this function never fails.
pub fn compute(business: &Business, subscription: Option<&Subscription>, now: DateTime<Utc>) -> EntitlementResult {
    if business.owner_id.is_none() && business.status.is_unclaimed() {
        let mut result = EntitlementResult::base(EntitlementState::Unclaimed, Badge::new("Unclaimed", Tone::Neutral));
        result.should_lock_controls = true;
        result.should_show_to_users = true;
        return result;
    }

    let Some(sub) = subscription else {
        let mut result = EntitlementResult::base(EntitlementState::NoSub, Badge::new("Free listing", Tone::Neutral));
        result.should_show_to_users = true;
        return result;
    };

    if sub.trial {
        if let Some(trial_end) = sub.trial_end {
            return if trial_end >= now {
                let tier = tier_label(sub, DEFAULT_TRIAL_TIER);
                let mut result = EntitlementResult::base(
                    EntitlementState::TrialActive,
                    Badge::new(format!("{tier} trial"), Tone::Info),
                );
                result.is_trial_active = true;
                result.should_show_to_users = true;
                result.tier = Some(tier);
                result.trial_ends_at = Some(trial_end);
                result.trial_days_remaining = Some(ceil_days(trial_end - now));
                result
            } else {
                let mut result = EntitlementResult::base(
                    EntitlementState::TrialExpired,
                    Badge::new("Trial expired", Tone::Warning),
                );
                result.trial_ends_at = Some(trial_end);
                result
            };
        }
    }

    match &sub.status {
        SubscriptionStatus::Active if sub.current_period_end.map_or(true, |end| end >= now) => {
            let tier = tier_label(sub, DEFAULT_PAID_TIER);
            let mut result = EntitlementResult::base(EntitlementState::PaidActive, Badge::new(tier.clone(), Tone::Success));
            result.is_paid_active = true;
            result.should_show_to_users = true;
            result.tier = Some(tier);
            result.period_ends_at = sub.current_period_end;
            result
        }
        SubscriptionStatus::Paused => {
            let mut result = EntitlementResult::base(EntitlementState::PaidLapsed, Badge::new("Paused", Tone::Warning));
            result.period_ends_at = sub.current_period_end;
            result
        }
        SubscriptionStatus::Canceled => {
            let mut result = EntitlementResult::base(EntitlementState::PaidLapsed, Badge::new("Canceled", Tone::Danger));
            result.period_ends_at = sub.current_period_end;
            result
        }
        _ => EntitlementResult::base(EntitlementState::SubOther, Badge::new("Subscription issue", Tone::Warning)),
    }
}

fn tier_label(sub: &Subscription, default: &str) -> String {
    [sub.tier_name.as_deref(), sub.tier_id.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn ceil_days(remaining: chrono::Duration) -> i64 {
    let secs = remaining.num_seconds().max(0);
    (secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}
