// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authorization hook.
//!
//! Before any operation touches the parambus, the translator checks the
//! resource name against an ordered list of ACL rules. Matching is exact or
//! trailing-`*` prefix; the first matching rule wins. When no rule matches,
//! reads are permitted and writes require an authenticated context.
//!
//! Authentication itself (who produced the context) is out of scope; the
//! uplink session supplies an [`AuthContext`] per request and this module
//! only decides.

use std::fmt;

use serde::{Deserialize, Serialize};

use parb_core::error::AuthError;

// =============================================================================
// Permission
// =============================================================================

/// Permission bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(pub u8);

impl Permission {
    /// Read access.
    pub const READ: Permission = Permission(0b0001);
    /// Write access.
    pub const WRITE: Permission = Permission(0b0010);
    /// Execute access (diagnostics, commands).
    pub const EXECUTE: Permission = Permission(0b0100);
    /// Administrative access.
    pub const ADMIN: Permission = Permission(0b1000);
    /// Every permission.
    pub const ALL: Permission = Permission(0b1111);
    /// No permission.
    pub const NONE: Permission = Permission(0);

    /// Returns `true` when every bit of `other` is present in `self`.
    #[inline]
    pub fn contains(&self, other: Permission) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two masks.
    #[inline]
    pub fn union(&self, other: Permission) -> Permission {
        Permission(self.0 | other.0)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(Permission::READ) {
            parts.push("read");
        }
        if self.contains(Permission::WRITE) {
            parts.push("write");
        }
        if self.contains(Permission::EXECUTE) {
            parts.push("execute");
        }
        if self.contains(Permission::ADMIN) {
            parts.push("admin");
        }
        if parts.is_empty() {
            parts.push("none");
        }
        write!(f, "{}", parts.join("|"))
    }
}

// =============================================================================
// Role
// =============================================================================

/// Ordered role ladder; a rule's minimum role admits that role and above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Unauthenticated or anonymous caller.
    #[default]
    Guest,
    /// Regular user.
    User,
    /// Device operator.
    Operator,
    /// Administrator.
    Admin,
    /// Unrestricted administrator.
    SuperAdmin,
}

// =============================================================================
// AuthContext
// =============================================================================

/// The per-request authorization context handed in by the uplink session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Stable caller identifier.
    pub user_id: String,
    /// Caller role.
    pub role: Role,
    /// Permissions the caller holds.
    pub permissions: Permission,
    /// Whether the caller authenticated at all.
    pub authenticated: bool,
}

impl AuthContext {
    /// An unauthenticated context with read-only reach.
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            role: Role::Guest,
            permissions: Permission::READ,
            authenticated: false,
        }
    }

    /// An authenticated operator context, the default for a trusted uplink.
    pub fn operator(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Operator,
            permissions: Permission::READ.union(Permission::WRITE),
            authenticated: true,
        }
    }

    /// An authenticated administrator context.
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
            permissions: Permission::ALL,
            authenticated: true,
        }
    }
}

// =============================================================================
// AclRule
// =============================================================================

/// One ACL rule.
///
/// `pattern` matches exactly, or by prefix when it ends in `*`. The
/// permission mask is what the rule grants on matching resources; an
/// operation needing more than the mask is denied regardless of the
/// caller's own permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclRule {
    /// Resource pattern.
    pub pattern: String,
    /// Permissions grantable under this rule.
    pub required_permission: Permission,
    /// Minimum role admitted.
    pub minimum_role: Role,
    /// Whether an authenticated context is required.
    pub require_auth: bool,
}

impl AclRule {
    /// Creates a rule requiring authentication.
    pub fn new(pattern: impl Into<String>, permission: Permission, minimum_role: Role) -> Self {
        Self {
            pattern: pattern.into(),
            required_permission: permission,
            minimum_role,
            require_auth: true,
        }
    }

    fn matches(&self, resource: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => resource.starts_with(prefix),
            None => resource == self.pattern,
        }
    }
}

// =============================================================================
// AclSet
// =============================================================================

/// An ordered rule list; first match wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AclSet {
    rules: Vec<AclRule>,
}

impl AclSet {
    /// Creates an empty rule set.
    pub fn new(rules: Vec<AclRule>) -> Self {
        Self { rules }
    }

    /// The stock rule set for a WebPA-managed device tree.
    ///
    /// Specific subtrees come before the `Device.*` catch-all so they can
    /// actually match.
    pub fn default_rules() -> Self {
        Self::new(vec![
            AclRule::new("X_RDKCENTRAL-COM_*", Permission::ALL, Role::Admin),
            AclRule::new("Device.DeviceInfo.*", Permission::READ, Role::User),
            AclRule::new(
                "Device.WiFi.*",
                Permission::READ.union(Permission::WRITE),
                Role::Operator,
            ),
            AclRule::new(
                "Device.Ethernet.*",
                Permission::READ.union(Permission::WRITE),
                Role::Operator,
            ),
            AclRule::new("Device.ManagementServer.*", Permission::ALL, Role::Admin),
            AclRule::new("Device.UserInterface.*", Permission::ALL, Role::Admin),
            AclRule::new(
                "Device.*",
                Permission::READ.union(Permission::WRITE),
                Role::User,
            ),
        ])
    }

    /// Appends a rule.
    pub fn push(&mut self, rule: AclRule) {
        self.rules.push(rule);
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` when no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Checks whether `ctx` may perform `required` on `resource`.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] when the matched rule (or the default
    /// write policy) demands authentication the context lacks;
    /// [`AuthError::Forbidden`] on role or permission shortfall. The caller
    /// must not touch the parambus on either.
    pub fn check(
        &self,
        resource: &str,
        required: Permission,
        ctx: &AuthContext,
    ) -> Result<(), AuthError> {
        for rule in &self.rules {
            if !rule.matches(resource) {
                continue;
            }
            if rule.require_auth && !ctx.authenticated {
                return Err(AuthError::unauthenticated(resource));
            }
            if ctx.role < rule.minimum_role {
                return Err(AuthError::forbidden(resource));
            }
            if !rule.required_permission.contains(required)
                || !ctx.permissions.contains(required)
            {
                return Err(AuthError::forbidden(resource));
            }
            return Ok(());
        }

        // No matching rule: reads pass, writes need authentication.
        if required.contains(Permission::WRITE) && !ctx.authenticated {
            return Err(AuthError::unauthenticated(resource));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
