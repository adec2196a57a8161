//! Authentication service.
//!
//! Email and password accounts stored in the registered users container.
//! Passwords are hashed with Argon2id; the plain password is never stored.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;

use bazaar_core::{Email, Role, User, UserId};

use crate::config::StorefrontConfig;
use crate::db::{LocalStore, RepositoryError, UserRepository};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Signup form input.
#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

/// Profile form input. A blank password leaves the current one unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub name: String,
    pub phone: String,
    pub profile_picture: String,
    pub password: String,
    pub confirm_password: String,
}

/// Authentication service.
///
/// Handles signup, login, and profile edits.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    config: &'a StorefrontConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a LocalStore, config: &'a StorefrontConfig) -> Self {
        Self {
            users: UserRepository::new(store),
            config,
        }
    }

    /// Register a new user.
    ///
    /// Every check runs before anything is written. Emails listed in
    /// `ADMIN_EMAILS` sign up as admins.
    ///
    /// # Errors
    ///
    /// In order of precedence: `AuthError::InvalidEmail`,
    /// `AuthError::PasswordMismatch`, `AuthError::WeakPassword`,
    /// `AuthError::UserAlreadyExists`.
    pub async fn signup(&self, input: &SignupInput) -> Result<User, AuthError> {
        let email = Email::parse(&input.email)?;

        if input.password != input.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(&input.password)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let name = match input.name.trim() {
            "" => email.as_str().split('@').next().unwrap_or_default().to_string(),
            name => name.to_string(),
        };
        let role = if self.config.is_admin_email(&email) {
            Role::Admin
        } else {
            Role::User
        };

        let user = User {
            id: UserId::generate(),
            name,
            email,
            phone: input.phone.trim().to_string(),
            password_hash: Some(hash_password(&input.password)?),
            profile_picture: None,
            role,
            created_at: Utc::now(),
        };

        let user = self.users.create(user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        tracing::info!(user_id = %user.id, role = %user.role, "User signed up");
        Ok(user)
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email, a wrong
    /// password, or an account without a password.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: &UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update name, phone, picture and optionally the password. Email is fixed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword` for a
    /// bad new password, or `AuthError::UserNotFound`.
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        input: &ProfileInput,
    ) -> Result<User, AuthError> {
        let mut user = self.get_user(user_id).await?;

        if !input.password.is_empty() || !input.confirm_password.is_empty() {
            if input.password != input.confirm_password {
                return Err(AuthError::PasswordMismatch);
            }
            validate_password(&input.password)?;
            user.password_hash = Some(hash_password(&input.password)?);
        }

        let name = input.name.trim();
        if !name.is_empty() {
            name.clone_into(&mut user.name);
        }
        input.phone.trim().clone_into(&mut user.phone);
        user.profile_picture = Some(input.profile_picture.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        let user = self.users.update(user).await.map_err(|e| match e {
            RepositoryError::NotFound(_) => AuthError::UserNotFound,
            other => AuthError::Repository(other),
        })?;

        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::db::{create_memory_pool, migrate};

    async fn store() -> LocalStore {
        let pool = create_memory_pool().await.unwrap();
        migrate(&pool).await.unwrap();
        LocalStore::new(pool)
    }

    fn signup(email: &str, password: &str, confirm: &str) -> SignupInput {
        SignupInput {
            name: "Ada".to_string(),
            email: email.to_string(),
            phone: "555".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_errors_in_order() {
        let store = store().await;
        let config = test_config();
        let auth = AuthService::new(&store, &config);

        // Invalid email wins over a mismatched, short password.
        let err = auth.signup(&signup("nope", "a", "b")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));

        let err = auth
            .signup(&signup("ada@example.com", "a", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordMismatch));

        let err = auth
            .signup(&signup("ada@example.com", "short", "short"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));

        assert!(UserRepository::new(&store).all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_without_writes() {
        let store = store().await;
        let config = test_config();
        let auth = AuthService::new(&store, &config);

        auth.signup(&signup("ada@example.com", "password1", "password1"))
            .await
            .unwrap();
        let err = auth
            .signup(&signup("Ada@Example.com", "password2", "password2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));

        let users = UserRepository::new(&store).all().await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_login_and_admin_signup() {
        let store = store().await;
        let config = test_config();
        let auth = AuthService::new(&store, &config);

        let admin = auth
            .signup(&signup("admin@example.com", "password1", "password1"))
            .await
            .unwrap();
        assert!(admin.is_admin());
        assert_ne!(admin.password_hash.as_deref(), Some("password1"));

        let logged_in = auth.login("ADMIN@example.com", "password1").await.unwrap();
        assert_eq!(logged_in.id, admin.id);

        let wrong = auth.login("admin@example.com", "password2").await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        let unknown = auth.login("nobody@example.com", "password1").await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_update_profile_keeps_email() {
        let store = store().await;
        let config = test_config();
        let auth = AuthService::new(&store, &config);

        let user = auth
            .signup(&signup("ada@example.com", "password1", "password1"))
            .await
            .unwrap();

        let short = ProfileInput {
            password: "short".to_string(),
            confirm_password: "short".to_string(),
            ..ProfileInput::default()
        };
        assert!(matches!(
            auth.update_profile(&user.id, &short).await,
            Err(AuthError::WeakPassword(_))
        ));

        let updated = auth
            .update_profile(
                &user.id,
                &ProfileInput {
                    name: "Ada L.".to_string(),
                    phone: "777".to_string(),
                    profile_picture: "https://img.example/ada.png".to_string(),
                    password: "newpassword".to_string(),
                    confirm_password: "newpassword".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Ada L.");
        assert_eq!(updated.email, user.email);
        assert_eq!(
            updated.profile_picture.as_deref(),
            Some("https://img.example/ada.png")
        );
        auth.login("ada@example.com", "newpassword").await.unwrap();
    }
}
