use thiserror::Error;

use crate::{Actor, Permission, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Default role→permission mapping.
///
/// `admin` grants everything in the actor's company, `manager` runs the
/// inventory, `employee` may look things up. Unknown roles grant nothing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut granted: Vec<Permission> = Vec::new();
    for role in roles {
        let perms: &[Permission] = match role.as_str() {
            "admin" => &[Permission::ALL],
            "manager" => &[
                Permission::INVENTORY_READ,
                Permission::INVENTORY_WRITE,
                Permission::INVENTORY_ASSIGN,
                Permission::MEMBERS_READ,
            ],
            "employee" => &[Permission::INVENTORY_READ, Permission::MEMBERS_READ],
            _ => &[],
        };
        for p in perms {
            if !granted.contains(p) {
                granted.push(p.clone());
            }
        }
    }
    granted
}

/// Authorize an actor within its own company.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(actor: &Actor, required: &Permission) -> Result<(), AuthzError> {
    let granted = permissions_for_roles(&actor.roles);

    if granted.iter().any(|p| p.is_wildcard() || p == required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_core::{CompanyId, UserId};

    fn actor(roles: Vec<Role>) -> Actor {
        Actor::new(UserId::new(), CompanyId::new(), "Test User", roles)
    }

    #[test]
    fn admin_is_allowed_everything() {
        let a = actor(vec![Role::ADMIN]);
        assert!(authorize(&a, &Permission::INVENTORY_WRITE).is_ok());
        assert!(authorize(&a, &Permission::new("anything.else")).is_ok());
    }

    #[test]
    fn manager_can_assign_but_employee_cannot() {
        assert!(authorize(&actor(vec![Role::MANAGER]), &Permission::INVENTORY_ASSIGN).is_ok());
        let err = authorize(&actor(vec![Role::EMPLOYEE]), &Permission::INVENTORY_ASSIGN).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("inventory.assign".to_string()));
    }

    #[test]
    fn employee_can_read() {
        assert!(authorize(&actor(vec![Role::EMPLOYEE]), &Permission::INVENTORY_READ).is_ok());
    }

    #[test]
    fn unknown_roles_grant_nothing() {
        let a = actor(vec![Role::new("auditor")]);
        assert!(permissions_for_roles(&a.roles).is_empty());
        assert!(authorize(&a, &Permission::INVENTORY_READ).is_err());
    }

    #[test]
    fn overlapping_roles_are_deduplicated() {
        let perms = permissions_for_roles(&[Role::MANAGER, Role::EMPLOYEE]);
        assert_eq!(perms.len(), 4);
    }
}
