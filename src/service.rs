//! Store business logic layer.

use tracing::{debug, info, instrument, warn};

use crate::password::{MAX_PASSWORD_BYTES, hash_password};
use crate::{
    DeleteOutcome, Game, NewGame, NewPurchase, NewUser, Purchase, PurchaseOutcome,
    ReferentialPolicy, StoreError, StoreRepository,
};

/// The catalog the store starts with when the games table is empty.
pub fn starter_catalog() -> Vec<NewGame> {
    vec![
        NewGame::new("The Witcher 3: Wild Hunt".to_string(), "RPG".to_string(), 30),
        NewGame::new("Grand Theft Auto V".to_string(), "Action".to_string(), 20),
        NewGame::new("Overwatch".to_string(), "Shooter".to_string(), 25),
    ]
}

/// Service layer for catalog, registration and purchase operations.
///
/// Wraps [`StoreRepository`] with input validation, credential hashing and
/// the configured [`ReferentialPolicy`]. Cloning is cheap; each call opens
/// and releases its own database connection.
#[derive(Debug, Clone)]
pub struct StoreService {
    repository: StoreRepository,
    policy: ReferentialPolicy,
    bcrypt_cost: u32,
}

impl StoreService {
    /// Creates a new store service backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: StoreRepository, policy: ReferentialPolicy, bcrypt_cost: u32) -> Self {
        info!(policy = %policy, "Creating StoreService");
        Self {
            repository,
            policy,
            bcrypt_cost,
        }
    }

    /// Returns the underlying repository.
    pub fn repository(&self) -> &StoreRepository {
        &self.repository
    }

    /// Returns the active referential policy.
    pub fn policy(&self) -> ReferentialPolicy {
        self.policy
    }

    /// Lists every game in the catalog.
    #[instrument(skip(self))]
    pub fn list_games(&self) -> Result<Vec<Game>, StoreError> {
        Ok(self.repository.list_games()?)
    }

    /// Lists games whose genre matches exactly. No match is an empty list.
    #[instrument(skip(self))]
    pub fn list_games_by_genre(&self, genre: &str) -> Result<Vec<Game>, StoreError> {
        Ok(self.repository.list_games_by_genre(genre)?)
    }

    /// Adds a game to the catalog and returns it with its new identity.
    ///
    /// # Errors
    ///
    /// Validation error for a blank name or genre, or a negative price.
    #[instrument(skip(self))]
    pub fn add_game(&self, name: String, genre: String, price: i32) -> Result<Game, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::validation("Game name must not be empty"));
        }
        if genre.trim().is_empty() {
            return Err(StoreError::validation("Game genre must not be empty"));
        }
        if price < 0 {
            return Err(StoreError::validation("Game price must not be negative"));
        }

        let game = self.repository.create_game(NewGame::new(name, genre, price))?;
        info!(game_id = game.id(), "Game added");
        Ok(game)
    }

    /// Permanently removes a game.
    ///
    /// # Errors
    ///
    /// Not found when no game has this identity. Conflict when the strict
    /// policy is active and purchases reference the game.
    #[instrument(skip(self))]
    pub fn delete_game(&self, game_id: i32) -> Result<(), StoreError> {
        match self.repository.delete_game(game_id, self.policy)? {
            DeleteOutcome::Deleted => {
                info!(game_id, "Game deleted");
                Ok(())
            }
            DeleteOutcome::NotFound => Err(StoreError::not_found("Game not found")),
            DeleteOutcome::Referenced(count) => {
                warn!(game_id, purchases = count, "Refusing to delete purchased game");
                Err(StoreError::conflict(format!(
                    "Game has {} recorded purchase(s) and cannot be deleted",
                    count
                )))
            }
        }
    }

    /// Registers a user and returns the new identity.
    ///
    /// The password is hashed before it reaches storage.
    ///
    /// # Errors
    ///
    /// Validation error for a blank username, or for a password that is empty
    /// or longer than [`MAX_PASSWORD_BYTES`]. Conflict when
    /// the username is already registered.
    #[instrument(skip(self, password))]
    pub fn register_user(&self, username: String, password: String) -> Result<i32, StoreError> {
        if username.trim().is_empty() {
            return Err(StoreError::validation("Username must not be empty"));
        }
        if password.is_empty() {
            return Err(StoreError::validation("Password must not be empty"));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(StoreError::validation(format!(
                "Password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }

        // Skip the hash cost when the name is obviously taken.
        if self.repository.get_user_by_name(&username)?.is_some() {
            debug!("Username already registered");
            return Err(StoreError::conflict("Username already exists"));
        }

        let password_hash = hash_password(&password, self.bcrypt_cost)?;
        match self
            .repository
            .create_user_if_absent(NewUser::new(username, password_hash))
        {
            Ok(Some(user)) => {
                info!(user_id = user.id(), "User registered");
                Ok(*user.id())
            }
            Ok(None) => Err(StoreError::conflict("Username already exists")),
            Err(e) if e.is_unique_violation() => {
                Err(StoreError::conflict("Username already exists"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Records a purchase and returns its identity.
    ///
    /// # Errors
    ///
    /// Under the strict policy, a validation error when the user or game does
    /// not exist. Under the permissive policy only storage failures are
    /// reported.
    #[instrument(skip(self))]
    pub fn purchase_game(&self, user_id: i32, game_id: i32) -> Result<i32, StoreError> {
        let purchase = NewPurchase::new(user_id, game_id);
        match self.repository.record_purchase(purchase, self.policy)? {
            PurchaseOutcome::Recorded(p) => Ok(*p.id()),
            PurchaseOutcome::UnknownUser => Err(StoreError::validation(format!(
                "User {} does not exist",
                user_id
            ))),
            PurchaseOutcome::UnknownGame => Err(StoreError::validation(format!(
                "Game {} does not exist",
                game_id
            ))),
        }
    }

    /// Lists purchases recorded for a user, oldest first.
    #[instrument(skip(self))]
    pub fn purchases_for_user(&self, user_id: i32) -> Result<Vec<Purchase>, StoreError> {
        Ok(self.repository.list_purchases_for_user(user_id)?)
    }

    /// Seeds the starter catalog if no games exist. Returns rows inserted.
    #[instrument(skip(self))]
    pub fn seed_starter_catalog(&self) -> Result<usize, StoreError> {
        Ok(self.repository.seed_games_if_empty(&starter_catalog())?)
    }
}
