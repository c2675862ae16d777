//! Explicit per-request context.
//!
//! Every entry point takes a `RequestContext` instead of reading ambient
//! request globals. The context is built once per request and never mutated.

/// The actor performing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Actor name (empty for anonymous).
    pub name: String,
    /// Whether the actor is authenticated.
    pub authenticated: bool,
    /// Roles held by the actor.
    pub roles: Vec<String>,
    /// Sysadmins pass every permission check.
    pub sysadmin: bool,
}

impl Actor {
    /// Anonymous visitor.
    pub fn anonymous() -> Self {
        Self {
            name: String::new(),
            authenticated: false,
            roles: Vec::new(),
            sysadmin: false,
        }
    }

    /// Authenticated actor with the given roles.
    pub fn user(name: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            name: name.into(),
            authenticated: true,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            sysadmin: false,
        }
    }

    /// Authenticated sysadmin.
    pub fn sysadmin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authenticated: true,
            roles: Vec::new(),
            sysadmin: true,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Context threaded through every operation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Who is asking.
    pub actor: Actor,
    /// Read-only display request (listing pages) rather than management.
    pub for_view: bool,
}

impl RequestContext {
    /// Context for a management request.
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            for_view: false,
        }
    }

    /// Context for a read-only display request.
    pub fn for_view(actor: Actor) -> Self {
        Self {
            actor,
            for_view: true,
        }
    }
}
