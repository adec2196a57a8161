//! Authentication extractors.
//!
//! The logged-in user is a [`CurrentUser`] stored in the session. Handlers ask
//! for [`RequireAuth`] or [`OptionalAuth`] instead of reading the session.
//!
//! The session only names the user. Role, name and email are re-read from the
//! registered users on every request, so a role change made with the CLI takes
//! effect immediately and a removed account is logged out.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// If nobody is logged in, redirects to the login screen.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but nobody is logged in.
pub enum AuthRejection {
    /// Redirect to the login screen.
    RedirectToLogin,
    /// Session layer missing from the stack.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth?screen=login").into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// The session's user, refreshed from the registered users.
async fn session_user(session: &Session, state: &AppState) -> Option<CurrentUser> {
    let cached = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()?;

    let stored = match UserRepository::new(state.store()).get_by_id(&cached.id).await {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(user_id = %cached.id, error = %e, "Failed to load session user");
            return None;
        }
    };

    let Some(stored) = stored else {
        tracing::info!(user_id = %cached.id, "Session user no longer exists, logging out");
        if let Err(e) = clear_current_user(session).await {
            tracing::warn!(error = %e, "Failed to clear stale session user");
        }
        return None;
    };

    let current = CurrentUser::from(&stored);
    if current != cached {
        tracing::debug!(user_id = %current.id, role = %current.role, "Refreshing session user");
        if let Err(e) = session.insert(session_keys::CURRENT_USER, &current).await {
            tracing::warn!(error = %e, "Failed to refresh session user");
        }
    }
    Some(current)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        session_user(session, &AppState::from_ref(state))
            .await
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session_user(session, &AppState::from_ref(state)).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// Log `user` in for this session.
///
/// The session ID is cycled to prevent fixation. Cart and wishlist carry over.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Log out. Cart and wishlist stay in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
