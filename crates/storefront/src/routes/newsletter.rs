//! Newsletter signup.
//!
//! The address goes to the form relay in the background; the visitor is sent
//! straight back to the home page with the outcome in the query string.

use axum::{Form, extract::State, response::Redirect};
use bazaar_core::Email;
use serde::Deserialize;
use tracing::instrument;

use crate::services::RelayMessage;
use crate::state::AppState;

/// Newsletter form data.
#[derive(Debug, Deserialize)]
pub struct NewsletterForm {
    #[serde(default)]
    pub email: String,
}

/// Subscribe an email address.
#[instrument(skip(state, form))]
pub async fn subscribe(State(state): State<AppState>, Form(form): Form<NewsletterForm>) -> Redirect {
    let Ok(email) = Email::parse(&form.email) else {
        return Redirect::to("/?subscribed=0");
    };

    tracing::info!(domain = email.domain(), "Newsletter signup");
    state.relay().dispatch(
        RelayMessage::new(format!("Newsletter signup: {}", state.config().store_name))
            .field("email", email.to_string())
            .field("message", format!("{email} subscribed to the newsletter")),
    );

    Redirect::to("/?subscribed=1")
}
