use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(alias = "abogado")]
    Lawyer,
    Supervisor,
}

#[derive(Debug, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Lawyer => "lawyer",
            Role::Supervisor => "supervisor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "lawyer" | "abogado" => Ok(Role::Lawyer),
            "supervisor" => Ok(Role::Supervisor),
            _ => Err(UnknownRole(value.to_string())),
        }
    }
}

/// Set of roles allowed through an [`Authorized`](super::Authorized) guard.
pub trait RoleGate: Send + Sync + 'static {
    const ALLOWED: &'static [Role];
}

pub struct AnyStaff;
pub struct CaseWriters;
pub struct AdminOnly;
pub struct LawyerOnly;
pub struct Supervisors;

impl RoleGate for AnyStaff {
    const ALLOWED: &'static [Role] = &[Role::Admin, Role::Lawyer, Role::Supervisor];
}

impl RoleGate for CaseWriters {
    const ALLOWED: &'static [Role] = &[Role::Admin, Role::Lawyer];
}

impl RoleGate for AdminOnly {
    const ALLOWED: &'static [Role] = &[Role::Admin];
}

impl RoleGate for LawyerOnly {
    const ALLOWED: &'static [Role] = &[Role::Lawyer];
}

impl RoleGate for Supervisors {
    const ALLOWED: &'static [Role] = &[Role::Supervisor, Role::Admin];
}
