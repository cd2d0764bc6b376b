//! Game Store library - catalog and purchase backend
//!
//! Lists games, filters them by genre, deletes them, registers users with
//! salted password hashes and records purchases, all over a single SQLite
//! file.
//!
//! # Architecture
//!
//! - **Db**: diesel schema, models and a repository that opens one
//!   connection per operation
//! - **Service**: validation, hashing and the referential policy
//! - **Server**: axum routes mapping service errors to HTTP statuses
//! - **Config**: defaults, TOML file and environment overrides
//!
//! # Example
//!
//! ```no_run
//! use game_store::{StoreConfig, prepare_service, router};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = StoreConfig::default();
//! let service = prepare_service(&config)?;
//! let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
//! axum::serve(listener, router(service)).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod bootstrap;
mod config;
mod db;
mod error;
mod password;
mod server;
mod service;

// Crate-level exports - Persistence
pub use db::{
    DbError, DbErrorKind, DeleteOutcome, Game, NewGame, NewPurchase, NewUser, Purchase,
    PurchaseOutcome, ReferentialPolicy, StoreRepository, User,
};

// Crate-level exports - Errors
pub use error::{StoreError, StoreErrorKind};

// Crate-level exports - Services
pub use bootstrap::prepare_service;
pub use password::{MAX_PASSWORD_BYTES, hash_password, verify_password};
pub use service::{StoreService, starter_catalog};

// Crate-level exports - HTTP
pub use server::{AddGameRequest, Credentials, MessageResponse, router};

// Crate-level exports - Configuration
pub use config::{ConfigError, ENV_DATABASE_URL, ENV_HOST, ENV_PORT, StoreConfig};
