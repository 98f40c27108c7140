//! Account roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three capability partitions of the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Buyer, Self::Seller, Self::Admin];

    /// Value stored under the `userRole` session key
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }

    /// REST collection serving this role's auth endpoints
    pub const fn api_prefix(self) -> &'static str {
        match self {
            Self::Buyer => "buyers",
            Self::Seller => "sellers",
            Self::Admin => "admin",
        }
    }

    /// Role owning the top-level segment of an application path
    pub fn from_path(path: &str) -> Option<Self> {
        let segment = path
            .trim_start_matches('/')
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();

        match segment {
            "buyer" => Some(Self::Buyer),
            "seller" => Some(Self::Seller),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role string is not one of the known roles
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Buyer".parse::<Role>().unwrap(), Role::Buyer);
        assert_eq!(" SELLER ".parse::<Role>().unwrap(), Role::Seller);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("broker".parse::<Role>().is_err());
    }

    #[test]
    fn test_from_path_uses_top_level_segment() {
        assert_eq!(Role::from_path("/buyer/deals"), Some(Role::Buyer));
        assert_eq!(Role::from_path("/seller"), Some(Role::Seller));
        assert_eq!(Role::from_path("/admin?tab=users"), Some(Role::Admin));
        assert_eq!(Role::from_path("/deals/buyer"), None);
        assert_eq!(Role::from_path("/buyers/login"), None);
        assert_eq!(Role::from_path("/"), None);
    }

    #[test]
    fn test_serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Seller).unwrap(), "\"seller\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
