//! Register → verify → login state machine.
//!
//! The flow owns only the UI-facing state. The credential itself lives in the
//! [`SessionStore`], which the gateway may clear on its own after a 401; the
//! flow notices that on the next [`AuthFlow::state`] call.

use parking_lot::Mutex;
use std::sync::Arc;

use protocol::{AuthPayload, LoginRequest, RegisterRequest, ResendCodeRequest, UserProfile, VerifyEmailRequest};

use crate::api::Api;
use crate::error::{ClientError, Result};
use crate::session::SessionStore;

const VERIFICATION_CODE_LEN: usize = 6;
const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Option<String>,
}

impl UserIdentity {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    fn from_auth(payload: &AuthPayload, fallback_email: &str) -> Self {
        Self {
            id: payload.id.clone(),
            username: payload.username.clone(),
            email: if payload.email.is_empty() {
                fallback_email.to_string()
            } else {
                payload.email.clone()
            },
            role: payload.role.clone(),
        }
    }
}

impl From<UserProfile> for UserIdentity {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            email: profile.email,
            role: profile.role,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Anonymous,
    /// Registration accepted, waiting for the emailed code.
    Registered { pending_email: String },
    /// Address confirmed but no session was issued; the user still has to log in.
    Verified { email: String },
    LoggedIn(UserIdentity),
}

impl AuthState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, AuthState::LoggedIn(_))
    }

    pub fn pending_email(&self) -> Option<&str> {
        match self {
            AuthState::Registered { pending_email } => Some(pending_email),
            _ => None,
        }
    }
}

pub struct AuthFlow {
    api: Api,
    session: Arc<SessionStore>,
    state: Mutex<AuthState>,
}

impl AuthFlow {
    pub fn new(api: Api) -> Self {
        let session = api.gateway().session().clone();
        Self {
            api,
            session,
            state: Mutex::new(AuthState::Anonymous),
        }
    }

    /// Current state. A `LoggedIn` whose credential has since been cleared
    /// (logout elsewhere, or a 401) reads as `Anonymous`.
    pub fn state(&self) -> AuthState {
        let mut state = self.state.lock();
        if state.is_logged_in() && !self.session.get().is_authenticated() {
            log::info!("Session no longer holds a token, dropping to anonymous");
            *state = AuthState::Anonymous;
        }
        state.clone()
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        match self.state() {
            AuthState::LoggedIn(user) => Some(user),
            _ => None,
        }
    }

    /// The signed-in user, provided they hold the admin role.
    pub fn require_admin(&self) -> Result<UserIdentity> {
        match self.current_user() {
            Some(user) if user.is_admin() => Ok(user),
            Some(_) => Err(ClientError::Auth("Admin access required.".to_string())),
            None => Err(ClientError::AuthExpired),
        }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthState> {
        if self.state().is_logged_in() {
            return Err(ClientError::Validation(
                "Already logged in. Log out first.".to_string(),
            ));
        }

        let (username, email) = (username.trim(), email.trim());
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "Username, email and password are required.".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(ClientError::Validation("Enter a valid email address.".to_string()));
        }

        log::info!("Registering account for {}", email);

        self.api
            .register(&RegisterRequest {
                username,
                email,
                password,
            })
            .await
            .map_err(|err| match err {
                ClientError::Rejected { message, .. } => ClientError::Validation(message),
                other => other,
            })?;

        Ok(self.transition(AuthState::Registered {
            pending_email: email.to_string(),
        }))
    }

    pub async fn verify(&self, code: &str) -> Result<AuthState> {
        let email = self.state().pending_email().map(str::to_string).ok_or_else(|| {
            ClientError::Validation("No pending email. Please register first.".to_string())
        })?;

        let code = code.trim();
        if code.chars().count() != VERIFICATION_CODE_LEN {
            return Err(ClientError::Verification("Enter 6-digit code.".to_string()));
        }

        let payload = self
            .api
            .verify_email(&VerifyEmailRequest {
                email: &email,
                code,
            })
            .await
            .map_err(|err| match err {
                ClientError::Rejected { message, .. } => {
                    log::warn!("Verification rejected for {}", email);
                    ClientError::Verification(message)
                }
                other => other,
            })?;

        match payload.token.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                self.open_session(token, &payload)?;
                log::info!("Email verified and logged in: {}", email);
                Ok(self.transition(AuthState::LoggedIn(UserIdentity::from_auth(&payload, &email))))
            }
            None => {
                log::info!("Email verified for {}, login required", email);
                Ok(self.transition(AuthState::Verified { email }))
            }
        }
    }

    /// Picks up a registration made earlier (another process, or before a
    /// restart) so the code for `email` can be verified.
    pub fn resume_registration(&self, email: &str) -> Result<AuthState> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(ClientError::Validation("Enter a valid email address.".to_string()));
        }
        if self.state().is_logged_in() {
            return Err(ClientError::Validation(
                "Already logged in. Log out first.".to_string(),
            ));
        }
        Ok(self.transition(AuthState::Registered {
            pending_email: email.to_string(),
        }))
    }

    pub async fn resend_code(&self) -> Result<()> {
        let email = self.state().pending_email().map(str::to_string).ok_or_else(|| {
            ClientError::Validation("No pending email. Please register first.".to_string())
        })?;

        self.api
            .resend_code(&ResendCodeRequest { email: &email })
            .await?;
        log::info!("Verification code re-sent to {}", email);
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthState> {
        if self.state().is_logged_in() {
            return Err(ClientError::Validation(
                "Already logged in. Log out first.".to_string(),
            ));
        }

        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "Email and password are required.".to_string(),
            ));
        }

        log::info!("Login attempt for {}", email);

        let payload = self
            .api
            .login(&LoginRequest { email, password })
            .await
            .map_err(|err| match err {
                ClientError::Rejected { message, .. } => {
                    log::warn!("Failed login attempt for {}", email);
                    ClientError::Auth(message)
                }
                other => other,
            })?;

        let token = payload
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ClientError::Auth("No token returned by backend.".to_string()))?;

        self.open_session(token, &payload)?;
        log::info!("Successful login for {}", email);

        Ok(self.transition(AuthState::LoggedIn(UserIdentity::from_auth(&payload, email))))
    }

    pub fn logout(&self) -> AuthState {
        self.session.clear();
        log::info!("Logged out");
        self.transition(AuthState::Anonymous)
    }

    /// Re-establishes `LoggedIn` from a persisted session by asking the
    /// backend who the token belongs to. A rejected token discards the
    /// session. Network failures keep it and are returned so the caller can
    /// retry.
    pub async fn restore(&self) -> Result<AuthState> {
        let session = self.session.get();
        let Some(token) = session.token().map(str::to_string) else {
            return Ok(self.transition(AuthState::Anonymous));
        };

        match self.api.me().await {
            Ok(profile) => {
                if session.user_id().is_none() && !profile.id.is_empty() {
                    if let Err(err) = self.session.set(&token, Some(&profile.id)) {
                        log::warn!("Could not record user id for restored session: {}", err);
                    }
                }
                log::info!("Restored session for {}", profile.email);
                Ok(self.transition(AuthState::LoggedIn(profile.into())))
            }
            Err(err @ ClientError::Network { .. }) => {
                log::warn!("Could not confirm stored session, keeping it: {}", err);
                self.transition(AuthState::Anonymous);
                Err(err)
            }
            Err(err) => {
                log::warn!("Stored session is no longer valid: {}", err);
                self.session.clear_if(&token);
                Ok(self.transition(AuthState::Anonymous))
            }
        }
    }

    fn open_session(&self, token: &str, payload: &AuthPayload) -> Result<()> {
        let user_id = Some(payload.id.as_str()).filter(|id| !id.is_empty());
        self.session.set(token, user_id)
    }

    fn transition(&self, next: AuthState) -> AuthState {
        *self.state.lock() = next.clone();
        next
    }
}
