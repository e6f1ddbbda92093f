//! # seatmap
//!
//! Backend for a crowdsourced map of public seating: benches and gazebos
//! with coordinates, reviews, photos and admin-managed lookup tables.
//!
//! The crate is an [axum](https://crates.io/crates/axum) JSON API over
//! [Sea-ORM](https://crates.io/crates/sea-orm). The public API authenticates
//! with bearer tokens; the `/admin` console keeps a server-side session in
//! the database through [`SeaOrmStore`], a
//! [`tower-sessions`](https://crates.io/crates/tower-sessions) store.
//!
//! ## Quick Start
//!
//! ```no_run
//! use seatmap::{connect, router, AppState, Settings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::from_env()?;
//! let db = connect(&settings).await?;
//! let app = router(AppState::new(db, settings.clone()));
//!
//! let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

pub mod auth;
pub mod cascade;
pub mod config;
pub mod entity;
pub mod error;
#[cfg(feature = "migration")]
pub mod migration;
pub mod routes;
pub mod schemas;
pub mod security;
pub mod seed;
mod session_store;
pub mod state;

pub use config::{ConfigError, Settings};
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use session_store::SeaOrmStore;
pub use state::AppState;

/// Opens the connection pool described by `settings`.
///
/// # Parameters
///
/// * `settings` - Supplies `database_url` and `db_max_connections`; the
///   remaining pool timeouts are fixed.
///
/// # Returns
///
/// A pooled `DatabaseConnection`. Migrations are not run here; the binary's
/// `serve` and `migrate` commands do that.
///
/// # Examples
///
/// ```no_run
/// use seatmap::{connect, Settings};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = Settings::from_env()?;
/// let db = connect(&settings).await?;
/// # Ok(())
/// # }
/// ```
pub async fn connect(settings: &Settings) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(settings.database_url.clone());
    opt.max_connections(settings.db_max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(10 * 60))
        .sqlx_logging(false);
    Database::connect(opt).await
}
