use serde::{Deserialize, Serialize};

use bizdesk_core::{CompanyId, UserId};

use crate::{JwtClaims, Role};

/// The authenticated user performing an operation.
///
/// Passed explicitly into every inventory operation; there is no ambient
/// "current user". The company is the tenant boundary for everything the
/// actor reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub display_name: String,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(
        user_id: UserId,
        company_id: CompanyId,
        display_name: impl Into<String>,
        roles: Vec<Role>,
    ) -> Self {
        Self {
            user_id,
            company_id,
            display_name: display_name.into(),
            roles,
        }
    }
}

impl From<JwtClaims> for Actor {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            company_id: claims.company_id,
            display_name: claims.name,
            roles: claims.roles,
        }
    }
}
