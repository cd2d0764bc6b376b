//! Process start-up: schema creation and catalog seeding.

use tracing::{info, instrument};

use crate::{StoreConfig, StoreError, StoreRepository, StoreService};

/// Opens the configured database, creates missing tables, seeds the starter
/// catalog when enabled and returns a ready service.
///
/// Must complete before any handler is live.
///
/// # Errors
///
/// Returns [`StoreError`] if the database cannot be prepared.
#[instrument(skip(config), fields(database_url = %config.database_url()))]
pub fn prepare_service(config: &StoreConfig) -> Result<StoreService, StoreError> {
    let repository = StoreRepository::new(config.database_url().clone())?
        .with_busy_timeout(*config.busy_timeout_ms());
    repository.initialize()?;

    let service = StoreService::new(
        repository,
        *config.referential_policy(),
        *config.bcrypt_cost(),
    );

    if *config.seed_catalog() {
        let seeded = service.seed_starter_catalog()?;
        info!(seeded, "Starter catalog checked");
    }

    Ok(service)
}
