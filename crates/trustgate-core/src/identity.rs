// crates/trustgate-core/src/identity.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles an authenticated caller may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A platform member. Can only act on their own records.
    User,
    Admin,
    RiskOfficer,
    /// Internal services (the scorer, the attestation relay).
    ServiceRole,
}

/// Things a caller can be allowed to do beyond acting on their own records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read another user's trust data, verification verdicts, or loans.
    ReadAnyUser,
    /// Ingest trust snapshots and link wallets.
    WriteSnapshots,
    /// Relay signed attestations into the registry.
    SubmitAttestations,
}

impl Role {
    /// The capability set granted by this role.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::User => &[],
            Role::Admin => &[
                Capability::ReadAnyUser,
                Capability::WriteSnapshots,
                Capability::SubmitAttestations,
            ],
            Role::RiskOfficer => &[Capability::ReadAnyUser],
            Role::ServiceRole => &[
                Capability::ReadAnyUser,
                Capability::WriteSnapshots,
                Capability::SubmitAttestations,
            ],
        }
    }
}

/// A resolved caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(user_id: Uuid, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    /// Union of the capabilities of all held roles.
    pub fn capabilities(&self) -> BTreeSet<Capability> {
        self.roles
            .iter()
            .flat_map(|r| r.capabilities().iter().copied())
            .collect()
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.roles
            .iter()
            .any(|r| r.capabilities().contains(&capability))
    }

    /// Self access is always allowed; anything else needs `ReadAnyUser`.
    pub fn can_access_user(&self, target: &Uuid) -> bool {
        self.user_id == *target || self.has(Capability::ReadAnyUser)
    }

    /// True when access to `target` is granted only through an elevated role,
    /// which is the case that must be audited.
    pub fn is_override_for(&self, target: &Uuid) -> bool {
        self.user_id != *target && self.has(Capability::ReadAnyUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_access_always_allowed() {
        let id = Uuid::now_v7();
        let p = Principal::new(id, [Role::User]);
        assert!(p.can_access_user(&id));
        assert!(!p.is_override_for(&id));
    }

    #[test]
    fn test_cross_user_requires_elevated_role() {
        let target = Uuid::now_v7();
        let user = Principal::new(Uuid::now_v7(), [Role::User]);
        assert!(!user.can_access_user(&target));

        for role in [Role::Admin, Role::RiskOfficer, Role::ServiceRole] {
            let p = Principal::new(Uuid::now_v7(), [role]);
            assert!(p.can_access_user(&target), "{:?} should read other users", role);
            assert!(p.is_override_for(&target));
        }
    }

    #[test]
    fn test_risk_officer_cannot_write() {
        let p = Principal::new(Uuid::now_v7(), [Role::RiskOfficer]);
        assert!(!p.has(Capability::WriteSnapshots));
        assert!(!p.has(Capability::SubmitAttestations));
    }

    #[test]
    fn test_capabilities_union() {
        let p = Principal::new(Uuid::now_v7(), [Role::User, Role::RiskOfficer]);
        let caps = p.capabilities();
        assert_eq!(caps.len(), 1);
        assert!(caps.contains(&Capability::ReadAnyUser));
    }
}
