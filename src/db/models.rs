//! Database models and domain types.

use chrono::{DateTime, NaiveDateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::{Deserialize, Serialize, Serializer};

use crate::db::schema;

/// Catalog entry for a purchasable game.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Selectable, Getters, Serialize,
)]
#[diesel(table_name = schema::games)]
pub struct Game {
    id: i32,
    name: String,
    genre: String,
    price: i32,
}

/// Insertable game model for adding catalog entries.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::games)]
pub struct NewGame {
    name: String,
    genre: String,
    price: i32,
}

/// Registered store account.
///
/// Only the salted hash of the password is kept; the plaintext never reaches
/// this type.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::users)]
pub struct User {
    id: i32,
    username: String,
    password_hash: String,
    created_at: NaiveDateTime,
}

/// Insertable user model for registration.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::users)]
pub struct NewUser {
    username: String,
    password_hash: String,
}

/// A recorded purchase of a game by a user.
///
/// `purchased_at` is assigned by the database at insert time (UTC).
#[derive(
    Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters, Serialize,
)]
#[diesel(table_name = schema::purchases)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Game))]
pub struct Purchase {
    id: i32,
    user_id: i32,
    game_id: i32,
    #[serde(serialize_with = "serialize_as_utc")]
    purchased_at: NaiveDateTime,
}

impl Purchase {
    /// Purchase time as a UTC instant. SQLite stores it without an offset.
    pub fn purchased_at_utc(&self) -> DateTime<Utc> {
        self.purchased_at.and_utc()
    }
}

/// Writes a stored UTC timestamp as RFC 3339 with a `Z` suffix.
fn serialize_as_utc<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    ts.and_utc().serialize(serializer)
}

/// Insertable purchase model.
#[derive(Debug, Clone, Copy, Insertable, new, Getters)]
#[diesel(table_name = schema::purchases)]
pub struct NewPurchase {
    user_id: i32,
    game_id: i32,
}

/// How writes treat references to users and games that may not exist.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReferentialPolicy {
    /// Purchases must name an existing user and game, and games with
    /// recorded purchases cannot be deleted.
    #[default]
    Strict,
    /// Purchases are stored as given and deletes leave dangling references.
    Permissive,
}

/// Result of a game deletion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The row was removed.
    Deleted,
    /// No game has that identity.
    NotFound,
    /// The game is referenced by this many purchases and was kept.
    Referenced(i64),
}

/// Result of a purchase attempt.
#[derive(Debug, Clone)]
pub enum PurchaseOutcome {
    /// The purchase row was inserted.
    Recorded(Purchase),
    /// The user identity does not exist.
    UnknownUser,
    /// The game identity does not exist.
    UnknownGame,
}
