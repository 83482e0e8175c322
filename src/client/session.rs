//! Session Store
//!
//! Holds the current authenticated identity and is the only place that talks
//! to the auth provider. It is constructed explicitly and handed to the
//! components that need it; dependents observe changes through
//! [`SessionStore::subscribe`].
//!
//! # Lifecycle
//!
//! - [`SessionStore::init`] on start: restore the stored session, refresh it if
//!   it is about to expire and check it with the provider
//! - sign-in / sign-up: publish the session, share its token with the REST
//!   client, persist it and upsert the user's profile row
//! - [`SessionStore::sign_out`]: end the session with the provider, clear
//!   everything and notify subscribers

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::client::error::ClientError;
use crate::client::rest::AccessToken;
use crate::client::store::{AuthProvider, UserDirectory};
use crate::client::token_store::SessionFile;
use crate::shared::{AuthUser, ProfileUpsert, Session, SharedError, SignUpRequest};

/// Tokens expiring within this window are refreshed before use
const REFRESH_MARGIN_SECS: i64 = 60;
/// Shortest password the provider accepts
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// `init` has not finished yet
    #[default]
    Loading,
    SignedOut,
    SignedIn(Session),
}

impl SessionState {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::SignedIn(session) => Some(&session.user),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

pub struct SessionStore {
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn UserDirectory>,
    token: AccessToken,
    persistence: Option<SessionFile>,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn UserDirectory>,
        token: AccessToken,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            auth,
            profiles,
            token,
            persistence: None,
            state,
        }
    }

    /// Keep the session in `file` across restarts
    pub fn with_persistence(mut self, file: SessionFile) -> Self {
        self.persistence = Some(file);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().user().cloned()
    }

    /// The signed-in user, or `NotAuthenticated`
    pub fn require_user(&self) -> Result<AuthUser, ClientError> {
        self.current_user().ok_or(ClientError::NotAuthenticated)
    }

    /// Restore the stored session, if any, and publish the result
    pub async fn init(&self) -> SessionState {
        let Some(stored) = self.persistence.as_ref().and_then(SessionFile::load) else {
            self.publish_signed_out().await;
            return self.state();
        };

        let now = chrono::Utc::now();
        let mut session = if stored.is_expired(now, chrono::Duration::seconds(REFRESH_MARGIN_SECS)) {
            match self.auth.refresh(&stored.refresh_token).await {
                Ok(fresh) => fresh,
                Err(err) => {
                    warn!(error = %err, "stored session could not be refreshed");
                    self.forget_stored();
                    self.publish_signed_out().await;
                    return self.state();
                }
            }
        } else {
            stored
        };

        match self.auth.get_user(&session.access_token).await {
            Ok(user) => session.user = user,
            Err(err @ ClientError::StoreError { .. }) => {
                // Provider unreachable: keep the stored identity until it says otherwise
                warn!(error = %err, "could not verify stored session");
            }
            Err(err) => {
                warn!(error = %err, "stored session rejected");
                self.forget_stored();
                self.publish_signed_out().await;
                return self.state();
            }
        }

        info!(user_id = %session.user.id, "session restored");
        self.publish_signed_in(session).await;
        self.state()
    }

    /// Register a new account. Returns the user when the provider signs them in
    /// right away, `None` when the email must be confirmed first.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<AuthUser>, ClientError> {
        validate_email(&request.email)?;
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SharedError::validation(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            )
            .into());
        }
        if request.username.trim().is_empty() {
            return Err(SharedError::validation("username", "Username is required").into());
        }

        match self.auth.sign_up(request).await? {
            Some(session) => {
                let user = session.user.clone();
                self.on_signed_in(session).await;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ClientError> {
        validate_email(email)?;
        let session = self.auth.sign_in(email, password).await?;
        let user = session.user.clone();
        self.on_signed_in(session).await;
        Ok(user)
    }

    /// End the session with the provider, then clear it locally.
    ///
    /// A provider failure leaves the local session in place.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        if let Some(token) = self.token.get().await {
            self.auth.sign_out(&token).await?;
        }
        self.forget_stored();
        self.publish_signed_out().await;
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), ClientError> {
        validate_email(email)?;
        self.auth.reset_password(email).await
    }

    async fn on_signed_in(&self, session: Session) {
        if let Some(file) = &self.persistence {
            if let Err(err) = file.save(&session) {
                warn!(error = %err, "could not persist session");
            }
        }

        self.publish_signed_in(session.clone()).await;

        if let Some(profile) = ProfileUpsert::from_auth_user(&session.user) {
            if let Err(err) = self.profiles.upsert_profile(&profile).await {
                warn!(user_id = %profile.id, error = %err, "error creating user profile");
            }
        }
    }

    async fn publish_signed_in(&self, session: Session) {
        self.token.set(Some(session.access_token.clone())).await;
        self.state.send_replace(SessionState::SignedIn(session));
    }

    async fn publish_signed_out(&self) {
        self.token.set(None).await;
        self.state.send_replace(SessionState::SignedOut);
    }

    fn forget_stored(&self) {
        if let Some(file) = &self.persistence {
            if let Err(err) = file.clear() {
                warn!(error = %err, "could not remove stored session");
            }
        }
    }
}

fn validate_email(email: &str) -> Result<(), ClientError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        });
    if valid {
        Ok(())
    } else {
        Err(SharedError::validation("email", "Please enter a valid email address").into())
    }
}
