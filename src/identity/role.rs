use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The five roles the application operates on once a backend role string has been normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum CanonicalRole {
    Admin,
    Director,
    Pmo,
    Leader,
    Staff,
}

impl CanonicalRole {
    pub const ALL: [CanonicalRole; 5] = [
        CanonicalRole::Admin,
        CanonicalRole::Director,
        CanonicalRole::Pmo,
        CanonicalRole::Leader,
        CanonicalRole::Staff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalRole::Admin => "admin",
            CanonicalRole::Director => "director",
            CanonicalRole::Pmo => "pmo",
            CanonicalRole::Leader => "leader",
            CanonicalRole::Staff => "staff",
        }
    }

    /// Human-readable label for page frames.
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalRole::Admin => "Administrator",
            CanonicalRole::Director => "Director",
            CanonicalRole::Pmo => "PMO",
            CanonicalRole::Leader => "Team leader",
            CanonicalRole::Staff => "Staff",
        }
    }
}

impl Display for CanonicalRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{raw}'")]
pub struct UnknownRoleError {
    pub raw: String,
}

/// Backend role tokens and the canonical role each one maps to.
/// Lookups are exact after trimming and ASCII lowercasing.
const ROLE_ALIASES: &[(&str, CanonicalRole)] = &[
    ("admin", CanonicalRole::Admin),
    ("administrator", CanonicalRole::Admin),
    ("system", CanonicalRole::Admin),
    ("user", CanonicalRole::Staff),
    ("nhanvien", CanonicalRole::Staff),
    ("employee", CanonicalRole::Staff),
    ("staff", CanonicalRole::Staff),
    ("manager", CanonicalRole::Leader),
    ("truongphong", CanonicalRole::Leader),
    ("leader", CanonicalRole::Leader),
    ("sep", CanonicalRole::Director),
    ("director", CanonicalRole::Director),
    ("pmo", CanonicalRole::Pmo),
];

/// Map a raw backend role token onto a canonical role.
///
/// Unrecognized tokens are rejected rather than passed through, so callers
/// fail closed instead of carrying a role nothing else knows about.
pub fn normalize_role(raw: &str) -> Result<CanonicalRole, UnknownRoleError> {
    let token = raw.trim().to_ascii_lowercase();
    ROLE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, role)| *role)
        .ok_or_else(|| UnknownRoleError { raw: raw.to_string() })
}

impl FromStr for CanonicalRole {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_role(s)
    }
}

impl TryFrom<String> for CanonicalRole {
    type Error = UnknownRoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize_role(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_aliases_any_case() {
        for raw in ["admin", "ADMIN", "System", "administrator", "  Administrator "] {
            assert_eq!(normalize_role(raw), Ok(CanonicalRole::Admin), "{raw}");
        }
    }

    #[test]
    fn backend_vocabulary_maps_to_canonical() {
        assert_eq!(normalize_role("nhanvien"), Ok(CanonicalRole::Staff));
        assert_eq!(normalize_role("Employee"), Ok(CanonicalRole::Staff));
        assert_eq!(normalize_role("user"), Ok(CanonicalRole::Staff));
        assert_eq!(normalize_role("TruongPhong"), Ok(CanonicalRole::Leader));
        assert_eq!(normalize_role("manager"), Ok(CanonicalRole::Leader));
        assert_eq!(normalize_role("sep"), Ok(CanonicalRole::Director));
        assert_eq!(normalize_role("PMO"), Ok(CanonicalRole::Pmo));
    }

    #[test]
    fn canonical_names_are_fixed_points() {
        for role in CanonicalRole::ALL {
            assert_eq!(normalize_role(role.as_str()), Ok(role));
            assert_eq!(role.to_string().parse::<CanonicalRole>(), Ok(role));
        }
    }

    #[test]
    fn no_substring_guessing() {
        for raw in ["", "superadmin", "admins", "project_manager", "sep2", "guest"] {
            let err = normalize_role(raw).unwrap_err();
            assert_eq!(err.raw, raw);
        }
    }

    #[test]
    fn serde_uses_canonical_name_and_accepts_aliases() {
        assert_eq!(serde_json::to_string(&CanonicalRole::Pmo).unwrap(), "\"pmo\"");
        let r: CanonicalRole = serde_json::from_str("\"truongphong\"").unwrap();
        assert_eq!(r, CanonicalRole::Leader);
        assert!(serde_json::from_str::<CanonicalRole>("\"guest\"").is_err());
    }
}
