use super::{
    error::{AuthError, AuthResult},
    role::Role,
};

/// Check `role` against a route's allow-list.
///
/// [`Role::System`] is a trusted internal caller and always passes, which is what
/// gives the empty `SYSTEM` list its meaning. Bearer tokens never carry the system
/// role past session matching, so the bypass only applies to principals built
/// in-process.
///
/// # Errors
/// Returns `Forbidden` when the role is neither system nor listed.
pub fn authorize(role: Role, allowed: &[Role]) -> AuthResult<()> {
    if role == Role::System || allowed.contains(&role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}
