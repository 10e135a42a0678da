use crate::{
    error::{AppError, AppResult},
    messages,
    models::{Role, User},
};

/// Allows an operation only for the listed roles
#[derive(Debug, Clone, Copy)]
pub struct RoleChecker {
    allowed: &'static [Role],
}

pub const ADMIN_ONLY: RoleChecker = RoleChecker::new(&[Role::Administrator]);
pub const ADMIN_OR_MODERATOR: RoleChecker =
    RoleChecker::new(&[Role::Administrator, Role::Moderator]);

impl RoleChecker {
    pub const fn new(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, user: &User) -> bool {
        self.allowed.contains(&user.role)
    }

    pub fn check(&self, user: &User) -> AppResult<()> {
        if self.allows(user) {
            Ok(())
        } else {
            tracing::debug!(user_id = user.id, role = %user.role, "Role check failed");
            Err(AppError::Forbidden(messages::OPERATION_FORBIDDEN.to_string()))
        }
    }
}

/// Owners and administrators may change or delete a photo
pub fn can_modify_photo(user: &User, owner_id: i64) -> bool {
    user.is_admin() || user.id == owner_id
}
