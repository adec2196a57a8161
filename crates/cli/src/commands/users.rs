//! Registered user management.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli users list
//! bazaar-cli users promote owner@example.com
//! bazaar-cli users demote owner@example.com
//! ```

use bazaar_core::{Email, Role, User};
use bazaar_storefront::db::{LocalStore, UserRepository};

use super::{CommandError, connect};

/// One line per user: id, email, role, name.
#[must_use]
pub fn format_user(user: &User) -> String {
    format!("{}\t{}\t{}\t{}", user.id, user.email, user.role, user.name)
}

/// Print every registered user.
///
/// # Errors
///
/// Returns `CommandError` if the users cannot be read.
pub async fn list() -> Result<(), CommandError> {
    let store = LocalStore::new(connect().await?);
    let users = UserRepository::new(&store).all().await?;

    if users.is_empty() {
        tracing::info!("No registered users");
        return Ok(());
    }

    #[allow(clippy::print_stdout)]
    for user in &users {
        println!("{}", format_user(user));
    }
    Ok(())
}

/// Change a user's role.
///
/// # Errors
///
/// Returns `CommandError::InvalidEmail` for a malformed address, or a
/// repository error if no user has that email.
pub async fn set_role(email: &str, role: Role) -> Result<(), CommandError> {
    let email = Email::parse(email).map_err(|_| CommandError::InvalidEmail(email.to_owned()))?;
    let store = LocalStore::new(connect().await?);

    let user = UserRepository::new(&store).set_role(&email, role).await?;
    tracing::info!("{} is now {}", user.email, user.role);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::UserId;
    use chrono::Utc;

    #[test]
    fn test_format_user() {
        let user = User {
            id: UserId::new("u1"),
            name: "Ada".to_owned(),
            email: Email::parse("ada@example.com").unwrap(),
            phone: String::new(),
            password_hash: None,
            profile_picture: None,
            role: Role::Admin,
            created_at: Utc::now(),
        };
        assert_eq!(format_user(&user), "u1\tada@example.com\tadmin\tAda");
    }
}
