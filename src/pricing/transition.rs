//! Tier change classification and the downgrade confirmation protocol

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::subscription::{Subscription, SubscriptionError, SubscriptionService};
use crate::pricing::tiers::{TierId, TierTable};

/// Word a subscriber must type to confirm a downgrade (case-insensitive)
pub const CONFIRMATION_TOKEN: &str = "DOWNGRADE";

/// Direction of a tier change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierChange {
    Upgrade,
    Downgrade,
}

impl std::fmt::Display for TierChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TierChange::Upgrade => write!(f, "upgrade"),
            TierChange::Downgrade => write!(f, "downgrade"),
        }
    }
}

/// A classified, not yet committed tier change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierChangeRequest {
    pub from: TierId,
    pub to: TierId,
    pub direction: TierChange,
    pub requires_confirmation_token: bool,
}

#[derive(Debug, Error, Diagnostic)]
pub enum TransitionError {
    #[error("unknown tier '{0}'")]
    #[diagnostic(
        code(doorway::tier::unknown),
        help("run `doorway pricing tiers` to list available tiers")
    )]
    UnknownTier(TierId),

    #[error("already on tier '{0}'")]
    #[diagnostic(code(doorway::tier::same))]
    SameTier(TierId),

    #[error("downgrading to '{0}' requires typing DOWNGRADE to confirm")]
    #[diagnostic(
        code(doorway::tier::confirmation_required),
        help("pass --confirm DOWNGRADE or answer the prompt")
    )]
    ConfirmationRequired(TierId),

    #[error("tier '{tier}' allows {ceiling} doors but {doors} are in use")]
    #[diagnostic(
        code(doorway::tier::exceeds_ceiling),
        help("remove properties or choose a larger tier")
    )]
    ExceedsCeiling { tier: TierId, ceiling: u32, doors: u32 },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Subscription(#[from] SubscriptionError),
}

/// Gatekeeper for moving between tiers
#[derive(Debug, Clone, Copy)]
pub struct TierTransitionGuard<'a> {
    table: &'a TierTable,
}

impl<'a> TierTransitionGuard<'a> {
    pub fn new(table: &'a TierTable) -> Self {
        Self { table }
    }

    fn rank(&self, id: &TierId) -> Result<usize, TransitionError> {
        self.table
            .rank(id)
            .ok_or_else(|| TransitionError::UnknownTier(id.clone()))
    }

    /// Upgrade or downgrade, by rank in the tier table
    pub fn classify(&self, from: &TierId, to: &TierId) -> Result<TierChange, TransitionError> {
        let from_rank = self.rank(from)?;
        let to_rank = self.rank(to)?;
        match to_rank.cmp(&from_rank) {
            std::cmp::Ordering::Greater => Ok(TierChange::Upgrade),
            std::cmp::Ordering::Less => Ok(TierChange::Downgrade),
            std::cmp::Ordering::Equal => Err(TransitionError::SameTier(to.clone())),
        }
    }

    /// Build a change request, refusing targets that cannot hold `doors_in_use`
    pub fn request(
        &self,
        from: &TierId,
        to: &TierId,
        doors_in_use: u32,
    ) -> Result<TierChangeRequest, TransitionError> {
        let direction = self.classify(from, to)?;

        if let Some(ceiling) = self.table.get(to).and_then(|t| t.door_ceiling) {
            if doors_in_use > ceiling {
                return Err(TransitionError::ExceedsCeiling {
                    tier: to.clone(),
                    ceiling,
                    doors: doors_in_use,
                });
            }
        }

        Ok(TierChangeRequest {
            from: from.clone(),
            to: to.clone(),
            direction,
            requires_confirmation_token: direction == TierChange::Downgrade,
        })
    }

    /// Upgrades always pass; downgrades need the exact confirmation word
    pub fn can_commit(&self, request: &TierChangeRequest, token: &str) -> bool {
        !request.requires_confirmation_token || token.to_uppercase() == CONFIRMATION_TOKEN
    }

    /// Check the token and hand the change to the subscription service
    pub fn commit(
        &self,
        request: &TierChangeRequest,
        token: &str,
        subscription: &dyn SubscriptionService,
    ) -> Result<Subscription, TransitionError> {
        if !self.can_commit(request, token) {
            tracing::debug!(to = %request.to, "downgrade refused without confirmation");
            return Err(TransitionError::ConfirmationRequired(request.to.clone()));
        }
        let updated = subscription.apply(request)?;
        tracing::info!(
            from = %request.from,
            to = %request.to,
            direction = %request.direction,
            "tier change committed"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::subscription::MemorySubscription;

    fn table() -> TierTable {
        TierTable::builtin().unwrap()
    }

    #[test]
    fn test_classify_by_rank() {
        let table = table();
        let guard = TierTransitionGuard::new(&table);
        assert_eq!(
            guard.classify(&"free".into(), &"growth".into()).unwrap(),
            TierChange::Upgrade
        );
        assert_eq!(
            guard.classify(&"portfolio".into(), &"starter".into()).unwrap(),
            TierChange::Downgrade
        );
        assert!(matches!(
            guard.classify(&"starter".into(), &"starter".into()),
            Err(TransitionError::SameTier(_))
        ));
        assert!(matches!(
            guard.classify(&"starter".into(), &"gold".into()),
            Err(TransitionError::UnknownTier(_))
        ));
    }

    #[test]
    fn test_only_downgrades_require_token() {
        let table = table();
        let guard = TierTransitionGuard::new(&table);
        let up = guard.request(&"free".into(), &"starter".into(), 1).unwrap();
        let down = guard.request(&"growth".into(), &"starter".into(), 1).unwrap();
        assert!(!up.requires_confirmation_token);
        assert!(down.requires_confirmation_token);
        assert!(guard.can_commit(&up, ""));
    }

    #[test]
    fn test_token_matching_is_exact_but_case_insensitive() {
        let table = table();
        let guard = TierTransitionGuard::new(&table);
        let down = guard.request(&"growth".into(), &"starter".into(), 1).unwrap();

        assert!(guard.can_commit(&down, "DOWNGRADE"));
        assert!(guard.can_commit(&down, "downgrade"));
        assert!(guard.can_commit(&down, "DownGrade"));
        assert!(!guard.can_commit(&down, "Down grade"));
        assert!(!guard.can_commit(&down, " downgrade"));
        assert!(!guard.can_commit(&down, "downgrad"));
        assert!(!guard.can_commit(&down, ""));
    }

    #[test]
    fn test_commit_downgrade() {
        let table = table();
        let guard = TierTransitionGuard::new(&table);
        let service = MemorySubscription::new("growth".into());
        let down = guard.request(&"growth".into(), &"starter".into(), 2).unwrap();

        let err = guard.commit(&down, "Down grade", &service).unwrap_err();
        assert!(matches!(err, TransitionError::ConfirmationRequired(_)));
        assert_eq!(service.current().unwrap().tier.as_str(), "growth");

        let updated = guard.commit(&down, "downgrade", &service).unwrap();
        assert_eq!(updated.tier.as_str(), "starter");
        assert_eq!(updated.history[0].direction, TierChange::Downgrade);
    }

    #[test]
    fn test_commit_upgrade_ignores_token() {
        let table = table();
        let guard = TierTransitionGuard::new(&table);
        let service = MemorySubscription::new("free".into());
        let up = guard.request(&"free".into(), &"portfolio".into(), 1).unwrap();
        assert_eq!(
            guard.commit(&up, "", &service).unwrap().tier.as_str(),
            "portfolio"
        );
    }

    #[test]
    fn test_request_refuses_target_below_doors_in_use() {
        let table = table();
        let guard = TierTransitionGuard::new(&table);
        let err = guard
            .request(&"growth".into(), &"starter".into(), 11)
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::ExceedsCeiling { ceiling: 10, doors: 11, .. }
        ));
    }
}
