use std::sync::Arc;

use chrono::Duration;
use sea_orm::DatabaseConnection;

use crate::config::Settings;
use crate::security::TokenIssuer;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub settings: Arc<Settings>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    /// Wraps the connection and settings and builds the token issuer from
    /// `SECRET_KEY` and `ALGORITHM`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use seatmap::{connect, router, AppState, Settings};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let settings = Settings::from_env()?;
    /// let db = connect(&settings).await?;
    /// let app = router(AppState::new(db, settings));
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(db: DatabaseConnection, settings: Settings) -> Self {
        let tokens = TokenIssuer::new(settings.secret_key.as_bytes(), settings.algorithm);
        Self {
            db,
            settings: Arc::new(settings),
            tokens: Arc::new(tokens),
        }
    }

    /// Lifetime of tokens handed out by `/login` and `/register`.
    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.settings.access_token_expire_minutes)
    }
}
