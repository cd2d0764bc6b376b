//! Database repository for the catalog, user accounts and purchases.

use diesel::connection::SimpleConnection;
use diesel::dsl::{exists, select};
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};

use crate::db::{
    DbError, DbErrorKind, DeleteOutcome, Game, NewGame, NewPurchase, NewUser, Purchase,
    PurchaseOutcome, ReferentialPolicy, User, schema,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Database repository for store operations.
///
/// Holds only the database location. Every operation opens its own
/// connection and drops it before returning, so no handle is ever shared
/// between requests.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    db_path: String,
    busy_timeout_ms: u64,
}

impl StoreRepository {
    /// Creates a new repository for the database at the given path.
    ///
    /// Use `":memory:"` only for single-call checks: every operation opens a
    /// fresh connection, so an in-memory database does not outlive the call.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new(
                DbErrorKind::Connection,
                "Database path must not be empty",
            ));
        }
        info!(path = %db_path, "Creating StoreRepository");
        Ok(Self {
            db_path,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        })
    }

    /// Sets how long a connection waits on a locked database before failing.
    #[instrument(skip(self))]
    pub fn with_busy_timeout(mut self, busy_timeout_ms: u64) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }

    /// Returns the configured database path.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path).map_err(|e| {
            DbError::new(
                DbErrorKind::Connection,
                format!("Failed to connect to '{}': {}", self.db_path, e),
            )
        })?;
        conn.batch_execute(&format!("PRAGMA busy_timeout = {};", self.busy_timeout_ms))?;
        Ok(conn)
    }

    /// Creates any missing tables by applying pending migrations.
    ///
    /// Safe to call on every start; already applied migrations are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or a migration fails.
    #[instrument(skip(self))]
    pub fn initialize(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(DbErrorKind::Migration, e.to_string()))?;
        info!(applied = applied.len(), "Schema ready");
        Ok(())
    }

    /// Inserts the given games only when the catalog is empty.
    ///
    /// Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, games), fields(count = games.len()))]
    pub fn seed_games_if_empty(&self, games: &[NewGame]) -> Result<usize, DbError> {
        let mut conn = self.connection()?;

        conn.immediate_transaction::<_, DbError, _>(|conn| {
            let existing: i64 = schema::games::table.count().get_result(conn)?;
            if existing > 0 {
                debug!(existing, "Catalog already populated, skipping seed");
                return Ok(0);
            }

            let inserted = diesel::insert_into(schema::games::table)
                .values(games)
                .execute(conn)?;
            info!(inserted, "Catalog seeded");
            Ok(inserted)
        })
    }

    /// Lists every game, ordered by identity.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_games(&self) -> Result<Vec<Game>, DbError> {
        let mut conn = self.connection()?;

        let games = schema::games::table
            .order(schema::games::id.asc())
            .select(Game::as_select())
            .load(&mut conn)?;

        debug!(count = games.len(), "Games loaded");
        Ok(games)
    }

    /// Lists games whose genre equals `genre` exactly (case-sensitive).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_games_by_genre(&self, genre: &str) -> Result<Vec<Game>, DbError> {
        let mut conn = self.connection()?;

        // SQLite `=` on TEXT uses BINARY collation, so this is case-sensitive.
        let games = schema::games::table
            .filter(schema::games::genre.eq(genre))
            .order(schema::games::id.asc())
            .select(Game::as_select())
            .load(&mut conn)?;

        debug!(genre = %genre, count = games.len(), "Games filtered by genre");
        Ok(games)
    }

    /// Gets a game by identity. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_game(&self, game_id: i32) -> Result<Option<Game>, DbError> {
        let mut conn = self.connection()?;

        let game = schema::games::table
            .find(game_id)
            .select(Game::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(game)
    }

    /// Inserts a new game and returns it with its assigned identity.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, game), fields(name = %game.name(), genre = %game.genre()))]
    pub fn create_game(&self, game: NewGame) -> Result<Game, DbError> {
        let mut conn = self.connection()?;

        let game = diesel::insert_into(schema::games::table)
            .values(&game)
            .returning(Game::as_returning())
            .get_result(&mut conn)?;

        info!(game_id = game.id(), "Game created");
        Ok(game)
    }

    /// Deletes a game by identity.
    ///
    /// Under [`ReferentialPolicy::Strict`] a game that has purchases is kept
    /// and [`DeleteOutcome::Referenced`] is returned. Under
    /// [`ReferentialPolicy::Permissive`] the purchases are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs. The transaction is
    /// rolled back in that case.
    #[instrument(skip(self))]
    pub fn delete_game(
        &self,
        game_id: i32,
        policy: ReferentialPolicy,
    ) -> Result<DeleteOutcome, DbError> {
        let mut conn = self.connection()?;

        let outcome = conn.immediate_transaction::<_, DbError, _>(|conn| {
            let found: bool = select(exists(schema::games::table.find(game_id))).get_result(conn)?;
            if !found {
                return Ok(DeleteOutcome::NotFound);
            }

            let references: i64 = schema::purchases::table
                .filter(schema::purchases::game_id.eq(game_id))
                .count()
                .get_result(conn)?;

            if references > 0 {
                if policy == ReferentialPolicy::Strict {
                    return Ok(DeleteOutcome::Referenced(references));
                }
                warn!(game_id, references, "Deleting game with recorded purchases");
            }

            diesel::delete(schema::games::table.find(game_id)).execute(conn)?;
            Ok(DeleteOutcome::Deleted)
        })?;

        debug!(game_id, outcome = ?outcome, "Delete finished");
        Ok(outcome)
    }

    /// Creates a user unless the username is already registered.
    ///
    /// The lookup and the insert share one write transaction. Returns `None`
    /// when the name is taken.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs. A concurrent insert of
    /// the same name surfaces as [`DbErrorKind::UniqueViolation`].
    #[instrument(skip(self, user), fields(username = %user.username()))]
    pub fn create_user_if_absent(&self, user: NewUser) -> Result<Option<User>, DbError> {
        let mut conn = self.connection()?;

        let created = conn.immediate_transaction::<_, DbError, _>(|conn| {
            let taken: bool = select(exists(
                schema::users::table.filter(schema::users::username.eq(user.username())),
            ))
            .get_result(conn)?;
            if taken {
                return Ok(None);
            }

            let created = diesel::insert_into(schema::users::table)
                .values(&user)
                .returning(User::as_returning())
                .get_result(conn)?;
            Ok(Some(created))
        })?;

        match &created {
            Some(u) => info!(user_id = u.id(), "User created"),
            None => debug!("Username already registered"),
        }
        Ok(created)
    }

    /// Gets a user by username. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_user_by_name(&self, username: &str) -> Result<Option<User>, DbError> {
        let mut conn = self.connection()?;

        let user = schema::users::table
            .filter(schema::users::username.eq(username))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(user)
    }

    /// Records a purchase.
    ///
    /// Under [`ReferentialPolicy::Strict`] both identities are checked inside
    /// the write transaction before inserting. Duplicate purchases of the same
    /// game by the same user are accepted under either policy.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, purchase), fields(user_id = purchase.user_id(), game_id = purchase.game_id()))]
    pub fn record_purchase(
        &self,
        purchase: NewPurchase,
        policy: ReferentialPolicy,
    ) -> Result<PurchaseOutcome, DbError> {
        let mut conn = self.connection()?;

        let outcome = conn.immediate_transaction::<_, DbError, _>(|conn| {
            if policy == ReferentialPolicy::Strict {
                let user_found: bool =
                    select(exists(schema::users::table.find(*purchase.user_id())))
                        .get_result(conn)?;
                if !user_found {
                    return Ok(PurchaseOutcome::UnknownUser);
                }

                let game_found: bool =
                    select(exists(schema::games::table.find(*purchase.game_id())))
                        .get_result(conn)?;
                if !game_found {
                    return Ok(PurchaseOutcome::UnknownGame);
                }
            }

            let recorded = diesel::insert_into(schema::purchases::table)
                .values(&purchase)
                .returning(Purchase::as_returning())
                .get_result(conn)?;
            Ok(PurchaseOutcome::Recorded(recorded))
        })?;

        if let PurchaseOutcome::Recorded(p) = &outcome {
            info!(purchase_id = p.id(), "Purchase recorded");
        }
        Ok(outcome)
    }

    /// Lists a user's purchases, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_purchases_for_user(&self, user_id: i32) -> Result<Vec<Purchase>, DbError> {
        let mut conn = self.connection()?;

        let purchases = schema::purchases::table
            .filter(schema::purchases::user_id.eq(user_id))
            .order((
                schema::purchases::purchased_at.asc(),
                schema::purchases::id.asc(),
            ))
            .select(Purchase::as_select())
            .load(&mut conn)?;

        debug!(user_id, count = purchases.len(), "Purchases loaded");
        Ok(purchases)
    }
}
