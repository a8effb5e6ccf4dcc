//! Subscription collaborator: the subscriber's effective tier

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::pricing::{TierChange, TierChangeRequest, TierId};

/// One committed tier change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierChangeRecord {
    pub from: TierId,
    pub to: TierId,
    pub direction: TierChange,
    pub at: DateTime<Utc>,
}

/// Effective tier plus change history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub tier: TierId,

    pub since: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<TierChangeRecord>,
}

impl Subscription {
    /// Fresh subscription on `tier` with no history
    pub fn new(tier: TierId) -> Self {
        Self {
            tier,
            since: Utc::now(),
            history: Vec::new(),
        }
    }

    fn record(&mut self, request: &TierChangeRequest) {
        let now = Utc::now();
        self.history.push(TierChangeRecord {
            from: request.from.clone(),
            to: request.to.clone(),
            direction: request.direction,
            at: now,
        });
        self.tier = request.to.clone();
        self.since = now;
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum SubscriptionError {
    #[error("subscription is on '{actual}', not '{expected}'")]
    #[diagnostic(
        code(doorway::subscription::stale),
        help("run `doorway tier show` and retry the change")
    )]
    Stale { expected: TierId, actual: TierId },

    #[error("failed to read subscription: {0}")]
    #[diagnostic(code(doorway::subscription::io))]
    Io(#[from] std::io::Error),

    #[error("invalid subscription file: {0}")]
    #[diagnostic(code(doorway::subscription::parse))]
    Parse(String),
}

/// Source of truth for the subscriber's tier
pub trait SubscriptionService {
    /// Current subscription
    fn current(&self) -> Result<Subscription, SubscriptionError>;

    /// Apply an already-authorized change and return the updated subscription
    fn apply(&self, request: &TierChangeRequest) -> Result<Subscription, SubscriptionError>;
}

fn check_from(current: &Subscription, request: &TierChangeRequest) -> Result<(), SubscriptionError> {
    if current.tier != request.from {
        return Err(SubscriptionError::Stale {
            expected: request.from.clone(),
            actual: current.tier.clone(),
        });
    }
    Ok(())
}

/// Subscription stored in `.doorway/subscription.yaml`
#[derive(Debug, Clone)]
pub struct FileSubscription {
    path: PathBuf,
    default_tier: TierId,
}

impl FileSubscription {
    /// `default_tier` applies until the first change is written
    pub fn new(path: impl Into<PathBuf>, default_tier: TierId) -> Self {
        Self {
            path: path.into(),
            default_tier,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, subscription: &Subscription) -> Result<(), SubscriptionError> {
        let yaml =
            serde_yml::to_string(subscription).map_err(|e| SubscriptionError::Parse(e.to_string()))?;
        let tmp = self.path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SubscriptionService for FileSubscription {
    fn current(&self) -> Result<Subscription, SubscriptionError> {
        if !self.path.exists() {
            return Ok(Subscription::new(self.default_tier.clone()));
        }
        let content = fs::read_to_string(&self.path)?;
        serde_yml::from_str(&content).map_err(|e| SubscriptionError::Parse(e.to_string()))
    }

    fn apply(&self, request: &TierChangeRequest) -> Result<Subscription, SubscriptionError> {
        let mut subscription = self.current()?;
        check_from(&subscription, request)?;
        subscription.record(request);
        self.write(&subscription)?;
        tracing::info!(from = %request.from, to = %request.to, "subscription tier changed");
        Ok(subscription)
    }
}

/// In-process subscription for tests and embedding callers
#[derive(Debug)]
pub struct MemorySubscription {
    inner: Mutex<Subscription>,
}

impl MemorySubscription {
    pub fn new(tier: TierId) -> Self {
        Self {
            inner: Mutex::new(Subscription::new(tier)),
        }
    }
}

impl SubscriptionService for MemorySubscription {
    fn current(&self) -> Result<Subscription, SubscriptionError> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn apply(&self, request: &TierChangeRequest) -> Result<Subscription, SubscriptionError> {
        let mut subscription = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        check_from(&subscription, request)?;
        subscription.record(request);
        Ok(subscription.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn upgrade(from: &str, to: &str) -> TierChangeRequest {
        TierChangeRequest {
            from: from.into(),
            to: to.into(),
            direction: TierChange::Upgrade,
            requires_confirmation_token: false,
        }
    }

    #[test]
    fn test_file_subscription_defaults_until_written() {
        let tmp = tempdir().unwrap();
        let service = FileSubscription::new(tmp.path().join("subscription.yaml"), "free".into());

        assert_eq!(service.current().unwrap().tier.as_str(), "free");
        assert!(!service.path().exists());

        let updated = service.apply(&upgrade("free", "starter")).unwrap();
        assert_eq!(updated.tier.as_str(), "starter");
        assert_eq!(updated.history.len(), 1);

        let reloaded = service.current().unwrap();
        assert_eq!(reloaded, updated);
    }

    #[test]
    fn test_apply_rejects_stale_request() {
        let service = MemorySubscription::new("growth".into());
        let err = service.apply(&upgrade("free", "starter")).unwrap_err();
        assert!(matches!(err, SubscriptionError::Stale { .. }));
        assert_eq!(service.current().unwrap().tier.as_str(), "growth");
    }
}
