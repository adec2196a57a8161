//! Registered users, stored under [`keys::REGISTERED_USERS`].

use bazaar_core::{Email, Role, User, UserId};

use super::{LocalStore, RepositoryError, keys};

/// Repository for registered users.
pub struct UserRepository<'a> {
    store: &'a LocalStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    /// Every registered user, in signup order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<User>, RepositoryError> {
        self.store.load(keys::REGISTERED_USERS).await
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.all().await?.into_iter().find(|u| &u.email == email))
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.all().await?.into_iter().find(|u| &u.id == id))
    }

    /// Add a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered;
    /// nothing is written in that case.
    pub async fn create(&self, user: User) -> Result<User, RepositoryError> {
        self.store
            .update(keys::REGISTERED_USERS, |users: &mut Vec<User>| {
                if users.iter().any(|u| u.email == user.email) {
                    return Err(RepositoryError::Conflict(user.email.to_string()));
                }
                users.push(user.clone());
                Ok(user)
            })
            .await
    }

    /// Replace a user record, matched by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that id.
    pub async fn update(&self, user: User) -> Result<User, RepositoryError> {
        self.store
            .update(keys::REGISTERED_USERS, |users: &mut Vec<User>| {
                let slot = users
                    .iter_mut()
                    .find(|u| u.id == user.id)
                    .ok_or_else(|| RepositoryError::NotFound(user.id.to_string()))?;
                *slot = user.clone();
                Ok(user)
            })
            .await
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that email.
    pub async fn set_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError> {
        self.store
            .update(keys::REGISTERED_USERS, |users: &mut Vec<User>| {
                let user = users
                    .iter_mut()
                    .find(|u| &u.email == email)
                    .ok_or_else(|| RepositoryError::NotFound(email.to_string()))?;
                user.role = role;
                Ok(user.clone())
            })
            .await
    }
}
