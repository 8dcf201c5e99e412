//! # Role Resolver
//!
//! Resolves a user id to a [`Role`] through an ordered list of backend
//! strategies, normalizing whatever string the backend returns.
//!
//! ## Fallback Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Strategy Fallback                                 │
//! │                                                                         │
//! │  resolve(u1)                                                           │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  ┌──────────┐  Err / None   ┌────────────────┐  Err / None             │
//! │  │   rpc    │ ────────────► │ profile_table  │ ────────────► Resolution │
//! │  └────┬─────┘               └───────┬────────┘               Failed     │
//! │       │ Some(raw)                   │ Some(raw)              (transient)│
//! │       ▼                             ▼                                   │
//! │  Role::normalize(raw)  ◄────────────┘                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A strategy answering `Some("")` has spoken: the user holds no role, and
//! that resolves to [`Role::Unassigned`] without consulting later strategies.
//! `None` means "no answer here" and falls through.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use rxdist_core::{Role, UserId};

use crate::error::{SyncError, SyncResult};

/// One way of asking the backend for a user's role.
#[async_trait]
pub trait RoleStrategy: Send + Sync {
    /// Stable name, matched against `auth.strategies` in the config.
    fn name(&self) -> &str;

    /// Returns the raw role string, or `None` if this source has no record.
    async fn resolve(&self, user_id: &UserId) -> SyncResult<Option<String>>;
}

/// Ordered strategy chain.
#[derive(Clone)]
pub struct RoleResolver {
    strategies: Vec<Arc<dyn RoleStrategy>>,
}

impl RoleResolver {
    /// Builds a resolver trying `strategies` in the given order.
    pub fn new(strategies: Vec<Arc<dyn RoleStrategy>>) -> SyncResult<Self> {
        if strategies.is_empty() {
            return Err(SyncError::NoStrategies);
        }
        Ok(RoleResolver { strategies })
    }

    /// Builds a resolver from the configured strategy names.
    ///
    /// Strategies not named are dropped; names with no matching strategy
    /// are logged and skipped.
    pub fn ordered(strategies: Vec<Arc<dyn RoleStrategy>>, names: &[String]) -> SyncResult<Self> {
        let mut chain = Vec::with_capacity(names.len());
        for name in names {
            match strategies.iter().find(|s| s.name() == name) {
                Some(strategy) => chain.push(strategy.clone()),
                None => warn!(strategy = %name, "Configured role strategy is not available"),
            }
        }
        Self::new(chain)
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolves `user_id`, falling back through the chain.
    pub async fn resolve(&self, user_id: &UserId) -> SyncResult<Role> {
        let mut last_error = None;

        for strategy in &self.strategies {
            match strategy.resolve(user_id).await {
                Ok(Some(raw)) => {
                    let role = Role::normalize(&raw);
                    if !role.is_assigned() && !raw.trim().is_empty() {
                        warn!(
                            user_id = %user_id,
                            strategy = strategy.name(),
                            raw = %raw,
                            "Unrecognized role, treating as unassigned"
                        );
                    }
                    debug!(user_id = %user_id, strategy = strategy.name(), role = %role, "Role resolved");
                    return Ok(role);
                }
                Ok(None) => {
                    debug!(user_id = %user_id, strategy = strategy.name(), "No role from strategy");
                }
                Err(e) => {
                    warn!(user_id = %user_id, strategy = strategy.name(), error = %e, "Role strategy failed");
                    last_error = Some(e);
                }
            }
        }

        Err(SyncError::ResolutionFailed {
            user_id: user_id.to_string(),
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no strategy returned a role".to_string()),
        })
    }
}

impl std::fmt::Debug for RoleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleResolver")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}
