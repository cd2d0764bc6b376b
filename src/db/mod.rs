//! Database persistence layer for the game catalog, users and purchases.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::{DbError, DbErrorKind};
pub use models::{
    DeleteOutcome, Game, NewGame, NewPurchase, NewUser, Purchase, PurchaseOutcome,
    ReferentialPolicy, User,
};
pub use repository::StoreRepository;
