use serde::{Deserialize, Serialize};

/// Ordering is load-bearing: `guest < user < admin < owner` is used directly
/// by the Tool Registry's permission filter and the module manifest gate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Guest,
    User,
    Admin,
    Owner,
}

impl PermissionLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::User => "user",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Whether a caller at `self` may invoke something gated at `required`.
    #[must_use]
    pub const fn satisfies(self, required: Self) -> bool {
        (self as u8) >= (required as u8)
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            other => Err(format!("unknown permission level: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_spec() {
        assert!(PermissionLevel::Guest < PermissionLevel::User);
        assert!(PermissionLevel::User < PermissionLevel::Admin);
        assert!(PermissionLevel::Admin < PermissionLevel::Owner);
    }

    #[test]
    fn satisfies_is_reflexive_and_monotonic() {
        assert!(PermissionLevel::Admin.satisfies(PermissionLevel::Admin));
        assert!(PermissionLevel::Owner.satisfies(PermissionLevel::Guest));
        assert!(!PermissionLevel::Guest.satisfies(PermissionLevel::User));
    }
}
