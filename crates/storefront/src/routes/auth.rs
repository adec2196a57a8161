//! Authentication route handlers.
//!
//! A single `/auth` page hosts three screens (login, signup and profile)
//! selected by `?screen=`. Form errors re-render the screen with a flash
//! message and the visitor's input; they never produce an error page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::layout::Layout;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Flash};
use crate::services::auth::{AuthService, ProfileInput, SignupInput};
use crate::state::AppState;

/// Screens of the auth wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScreen {
    #[default]
    Login,
    Signup,
    Profile,
}

impl AuthScreen {
    /// Parse `?screen=`. Unknown values fall back to login.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("signup") => Self::Signup,
            Some("profile") => Self::Profile,
            _ => Self::Login,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Profile => "profile",
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Login => "Log in",
            Self::Signup => "Create account",
            Self::Profile => "Your profile",
        }
    }
}

/// `?screen=` query.
#[derive(Debug, Default, Deserialize)]
pub struct ScreenQuery {
    pub screen: Option<String>,
}

/// Fields of every auth screen. Each screen posts the subset it shows.
#[derive(Debug, Default, Deserialize)]
pub struct AuthForm {
    #[serde(default)]
    pub screen: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Values echoed back into the form. Passwords are never echoed.
#[derive(Debug, Default)]
pub struct AuthFormView {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub profile_picture: String,
}

impl From<&AuthForm> for AuthFormView {
    fn from(form: &AuthForm) -> Self {
        Self {
            name: form.name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            profile_picture: form.profile_picture.clone(),
        }
    }
}

/// Auth page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    pub layout: Layout,
    pub screen: AuthScreen,
    pub form: AuthFormView,
}

/// Display an auth screen.
///
/// Logged-in visitors always see their profile; the profile screen sends
/// everyone else to login.
///
/// # Errors
///
/// Returns an error if the profile's user cannot be loaded.
#[instrument(skip(state, session, user))]
pub async fn page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ScreenQuery>,
) -> Result<Response> {
    let requested = AuthScreen::from_query(query.screen.as_deref());

    let (screen, form) = match &user {
        Some(current) => {
            let auth = AuthService::new(state.store(), state.config());
            let stored = auth.get_user(&current.id).await?;
            let form = AuthFormView {
                name: stored.name,
                email: stored.email.to_string(),
                phone: stored.phone,
                profile_picture: stored.profile_picture.unwrap_or_default(),
            };
            (AuthScreen::Profile, form)
        }
        None if requested == AuthScreen::Profile => {
            return Ok(Redirect::to("/auth?screen=login").into_response());
        }
        None => (requested, AuthFormView::default()),
    };

    Ok(AuthTemplate {
        layout: Layout::load(&state, &session, user, screen.title()).await,
        screen,
        form,
    }
    .into_response())
}

/// Handle a submitted auth screen.
///
/// # Errors
///
/// Returns an error for storage or session failures. Invalid input is shown
/// on the re-rendered screen instead.
#[instrument(skip(state, session, user, form), fields(screen = %form.screen))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<AuthForm>,
) -> Result<Response> {
    let screen = AuthScreen::from_query(Some(form.screen.as_str()));
    let auth = AuthService::new(state.store(), state.config());

    let outcome = match (screen, &user) {
        (AuthScreen::Profile, None) => {
            return Ok(Redirect::to("/auth?screen=login").into_response());
        }
        (AuthScreen::Profile, Some(current)) => {
            let input = ProfileInput {
                name: form.name.clone(),
                phone: form.phone.clone(),
                profile_picture: form.profile_picture.clone(),
                password: form.password.clone(),
                confirm_password: form.confirm_password.clone(),
            };
            auth.update_profile(&current.id, &input)
                .await
                .map(|updated| (updated, "Profile updated"))
        }
        (AuthScreen::Signup, _) => {
            let input = SignupInput {
                name: form.name.clone(),
                email: form.email.clone(),
                phone: form.phone.clone(),
                password: form.password.clone(),
                confirm_password: form.confirm_password.clone(),
            };
            auth.signup(&input)
                .await
                .map(|created| (created, "Welcome! Your account is ready"))
        }
        (AuthScreen::Login, _) => auth
            .login(&form.email, &form.password)
            .await
            .map(|found| (found, "Welcome back")),
    };

    match outcome {
        Ok((stored, message)) => {
            let current = CurrentUser::from(&stored);
            set_current_user(&session, &current).await?;
            set_sentry_user(&current.id, Some(current.email.as_str()));
            crate::services::visitor::flash(&session, Flash::success(message)).await;

            let target = if screen == AuthScreen::Profile {
                "/auth?screen=profile"
            } else {
                "/"
            };
            Ok(Redirect::to(target).into_response())
        }
        Err(e) if e.is_user_facing() => {
            tracing::info!(screen = screen.as_str(), error = %e, "Auth form rejected");
            let mut view = AuthFormView::from(&form);
            if let Some(current) = &user {
                view.email = current.email.to_string();
            }
            let layout = Layout::load(&state, &session, user, screen.title()).await;

            Ok(AuthTemplate {
                layout: layout.with_flash(Flash::error(e.to_string())),
                screen,
                form: view,
            }
            .into_response())
        }
        Err(e) => Err(AppError::from(e)),
    }
}

/// Log out. Cart and wishlist stay with the visitor.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}
