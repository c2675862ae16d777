//! Permission gate consulted before association mutations and management views.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::context::Actor;

/// Action names checked against the gate.
pub mod actions {
    /// Manage a showcase (manage/add datasets views, bulk actions).
    pub const SHOWCASE_UPDATE: &str = "showcase_update";
    /// Read a showcase and its dataset list.
    pub const SHOWCASE_READ: &str = "showcase_read";
    /// Add a dataset to a showcase.
    pub const ASSOCIATION_CREATE: &str = "association_create";
    /// Remove a dataset from a showcase.
    pub const ASSOCIATION_DELETE: &str = "association_delete";
    /// Read a dataset and the showcases it belongs to.
    pub const DATASET_READ: &str = "dataset_read";
}

/// Yes/no authorization gate.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Whether `actor` may perform `action` on `target` (an item id, if any).
    async fn check(&self, action: &str, actor: &Actor, target: Option<&str>) -> Result<bool>;
}

/// Role-based gate.
///
/// Sysadmins (flagged on the actor or named in the configured list) may do
/// everything. Other actors are allowed an action when any of their roles, or
/// the implicit `anonymous`/`authenticated` role, grants it.
#[derive(Clone, Default)]
pub struct RolePermissionGate {
    inner: Arc<RolePermissionGateInner>,
}

#[derive(Default)]
struct RolePermissionGateInner {
    /// role -> granted actions.
    grants: DashMap<String, HashSet<String>>,
    /// Actor names treated as sysadmins.
    sysadmins: HashSet<String>,
}

/// Implicit role held by every visitor.
pub const ANONYMOUS_ROLE: &str = "anonymous";
/// Implicit role held by every authenticated actor.
pub const AUTHENTICATED_ROLE: &str = "authenticated";

impl RolePermissionGate {
    /// Create a gate with the given sysadmin names and no grants.
    pub fn new<I, S>(sysadmins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(RolePermissionGateInner {
                grants: DashMap::new(),
                sysadmins: sysadmins.into_iter().map(Into::into).collect(),
            }),
        }
    }

    /// Gate where anyone may read showcases and datasets; mutations stay
    /// with sysadmins.
    pub fn with_public_read<I, S>(sysadmins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let gate = Self::new(sysadmins);
        gate.grant(ANONYMOUS_ROLE, actions::SHOWCASE_READ);
        gate.grant(ANONYMOUS_ROLE, actions::DATASET_READ);
        gate
    }

    /// Grant an action to a role.
    pub fn grant(&self, role: &str, action: &str) {
        self.inner
            .grants
            .entry(role.to_string())
            .or_default()
            .insert(action.to_string());
    }

    /// Revoke an action from a role.
    pub fn revoke(&self, role: &str, action: &str) {
        if let Some(mut actions) = self.inner.grants.get_mut(role) {
            actions.remove(action);
        }
    }

    fn role_grants(&self, role: &str, action: &str) -> bool {
        self.inner
            .grants
            .get(role)
            .is_some_and(|actions| actions.contains(action))
    }

    fn allows(&self, action: &str, actor: &Actor) -> bool {
        if actor.sysadmin || (actor.authenticated && self.inner.sysadmins.contains(&actor.name)) {
            return true;
        }

        if self.role_grants(ANONYMOUS_ROLE, action) {
            return true;
        }

        if !actor.authenticated {
            return false;
        }

        self.role_grants(AUTHENTICATED_ROLE, action)
            || actor.roles.iter().any(|role| self.role_grants(role, action))
    }
}

#[async_trait]
impl PermissionGate for RolePermissionGate {
    async fn check(&self, action: &str, actor: &Actor, target: Option<&str>) -> Result<bool> {
        let allowed = self.allows(action, actor);
        debug!(
            action = %action,
            actor = %actor.name,
            target = target.unwrap_or("-"),
            allowed,
            "permission check"
        );
        Ok(allowed)
    }
}

impl std::fmt::Debug for RolePermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolePermissionGate")
            .field("roles", &self.inner.grants.len())
            .field("sysadmins", &self.inner.sysadmins.len())
            .finish()
    }
}
