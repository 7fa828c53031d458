//! Client for the ClutchDen wallet and betting backend.
//!
//! [`Client`] wires the pieces together: a [`SessionStore`] persisted to disk,
//! the [`RequestGateway`] that every call goes through, the typed [`Api`], the
//! [`AuthFlow`] state machine and the [`Dashboard`] aggregate.

pub mod aggregate;
pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod session;

use std::sync::Arc;

pub use aggregate::{
    AggregateResult, AggregateWarning, AggregationLoader, FetchFailure, FetchOutcome, FetchSpec,
    PayloadShape,
};
pub use api::{Api, ProfilePicture};
pub use auth::{AuthFlow, AuthState, UserIdentity};
pub use config::{ClientConfig, PictureFormat};
pub use dashboard::{Dashboard, DashboardView};
pub use error::{ClientError, FailureKind, Result};
pub use gateway::{Credentials, Payload, RequestBody, RequestGateway, RequestOptions};
pub use session::{FileSessionPersistence, Session, SessionStore};

pub struct Client {
    config: ClientConfig,
    session: Arc<SessionStore>,
    api: Api,
    auth: AuthFlow,
    dashboard: Dashboard,
}

impl Client {
    /// Builds a client whose session survives restarts in
    /// [`ClientConfig::session_file_path`].
    pub fn new(config: ClientConfig) -> Result<Self> {
        let path = config.session_file_path();
        log::debug!("Session file: {}", path.display());
        let persistence = Arc::new(FileSessionPersistence::new(path));
        let session = Arc::new(SessionStore::open(persistence, &config.auth_scheme));
        Self::with_session(config, session)
    }

    pub fn with_session(config: ClientConfig, session: Arc<SessionStore>) -> Result<Self> {
        let gateway = RequestGateway::new(&config, session.clone())?;
        let api = Api::new(gateway, &config);

        Ok(Self {
            auth: AuthFlow::new(api.clone()),
            dashboard: Dashboard::new(api.clone()),
            config,
            session,
            api,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn auth(&self) -> &AuthFlow {
        &self.auth
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }
}
