//! Login entry points per role

use crate::role::Role;
use serde::{Deserialize, Serialize};

/// Login page for each role plus a generic fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRoutes {
    pub buyer: String,
    pub seller: String,
    pub admin: String,
    pub generic: String,
}

impl Default for LoginRoutes {
    fn default() -> Self {
        Self {
            buyer: "/buyer/login".to_string(),
            seller: "/seller/login".to_string(),
            admin: "/admin/login".to_string(),
            generic: "/login".to_string(),
        }
    }
}

impl LoginRoutes {
    pub fn for_role(&self, role: Role) -> &str {
        match role {
            Role::Buyer => &self.buyer,
            Role::Seller => &self.seller,
            Role::Admin => &self.admin,
        }
    }

    /// Login page for a requested application path, chosen by its top-level segment
    pub fn for_path(&self, path: &str) -> &str {
        Role::from_path(path).map_or(self.generic.as_str(), |role| self.for_role(role))
    }

    /// Login page for an optional role, falling back to the generic page
    pub fn for_optional_role(&self, role: Option<Role>) -> &str {
        role.map_or(self.generic.as_str(), |role| self.for_role(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_path_selects_by_prefix() {
        let routes = LoginRoutes::default();
        assert_eq!(routes.for_path("/buyer/deals/12"), "/buyer/login");
        assert_eq!(routes.for_path("/seller/dashboard"), "/seller/login");
        assert_eq!(routes.for_path("/admin"), "/admin/login");
        assert_eq!(routes.for_path("/about"), "/login");
        assert_eq!(routes.for_path(""), "/login");
    }

    #[test]
    fn test_custom_routes() {
        let routes = LoginRoutes {
            buyer: "/b/signin".into(),
            ..LoginRoutes::default()
        };
        assert_eq!(routes.for_role(Role::Buyer), "/b/signin");
        assert_eq!(routes.for_optional_role(None), "/login");
    }
}
