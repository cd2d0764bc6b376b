//! HTTP surface: routes, handlers and error mapping.

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tracing::{debug, error, info, instrument};

use crate::{Game, Purchase, StoreError, StoreErrorKind, StoreService};

/// Body returned by successful mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    /// Human-readable acknowledgment.
    pub message: String,
    /// Identity of the created row, when the operation creates one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            id: None,
        }
    }

    fn with_id(message: &str, id: i32) -> Self {
        Self {
            message: message.to_string(),
            id: Some(id),
        }
    }
}

/// JSON body for `POST /games/add`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddGameRequest {
    /// Display name.
    pub name: String,
    /// Genre label, matched exactly by the filter routes.
    pub genre: String,
    /// Price in whole currency units.
    pub price: i32,
}

/// Registration credentials, accepted as query parameters or a JSON body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    /// Requested username.
    pub username: Option<String>,
    /// Plaintext password; hashed before storage.
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenreQuery {
    genre: Option<String>,
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match self.kind {
            StoreErrorKind::NotFound => StatusCode::NOT_FOUND,
            StoreErrorKind::Conflict => StatusCode::BAD_REQUEST,
            StoreErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            StoreErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.kind == StoreErrorKind::Internal {
            error!(
                error = %self,
                cause = self.source_message.as_deref().unwrap_or(""),
                "Request failed"
            );
        } else {
            debug!(kind = %self.kind, message = %self.message, "Request rejected");
        }

        (status, Json(json!({ "detail": self.message }))).into_response()
    }
}

/// Builds the store router with request logging.
#[instrument(skip(service))]
pub fn router(service: StoreService) -> Router {
    Router::new()
        .route("/games", get(list_games))
        .route("/games/filter", get(filter_games))
        .route("/games/add", get(games_in_add_genre).post(add_game))
        .route("/games/{key}", get(games_by_genre).delete(delete_game))
        .route("/register", post(register_user))
        .route("/purchase/{user_id}/{game_id}", post(purchase_game))
        .route("/users/{user_id}/purchases", get(user_purchases))
        .layer(ServiceBuilder::new().map_request(log_request))
        .with_state(service)
}

fn log_request(req: Request<Body>) -> Request<Body> {
    info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
    req
}

/// Runs blocking storage work off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) => Err(StoreError::internal(format!("Worker task failed: {}", e))),
    }
}

async fn list_games(State(service): State<StoreService>) -> Result<Json<Vec<Game>>, StoreError> {
    let games = run_blocking(move || service.list_games()).await?;
    Ok(Json(games))
}

async fn games_by_genre(
    State(service): State<StoreService>,
    Path(genre): Path<String>,
) -> Result<Json<Vec<Game>>, StoreError> {
    let games = run_blocking(move || service.list_games_by_genre(&genre)).await?;
    Ok(Json(games))
}

/// `GET /games/add` would otherwise hit the static add route.
async fn games_in_add_genre(
    State(service): State<StoreService>,
) -> Result<Json<Vec<Game>>, StoreError> {
    let games = run_blocking(move || service.list_games_by_genre("add")).await?;
    Ok(Json(games))
}

async fn filter_games(
    State(service): State<StoreService>,
    query: Result<Query<GenreQuery>, QueryRejection>,
) -> Result<Json<Vec<Game>>, StoreError> {
    let Query(query) = query.map_err(|e| StoreError::validation(e.body_text()))?;
    let genre = query
        .genre
        .ok_or_else(|| StoreError::validation("Query parameter 'genre' is required"))?;
    let games = run_blocking(move || service.list_games_by_genre(&genre)).await?;
    Ok(Json(games))
}

async fn delete_game(
    State(service): State<StoreService>,
    game_id: Result<Path<i32>, PathRejection>,
) -> Result<Json<MessageResponse>, StoreError> {
    let Path(game_id) =
        game_id.map_err(|_| StoreError::validation("Game id must be an integer"))?;
    run_blocking(move || service.delete_game(game_id)).await?;
    Ok(Json(MessageResponse::new("Game deleted successfully")))
}

async fn add_game(
    State(service): State<StoreService>,
    body: Result<Json<AddGameRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), StoreError> {
    let Json(req) = body.map_err(|e| StoreError::validation(e.body_text()))?;
    let game = run_blocking(move || service.add_game(req.name, req.genre, req.price)).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id("Game added successfully", *game.id())),
    ))
}

async fn register_user(
    State(service): State<StoreService>,
    query: Result<Query<Credentials>, QueryRejection>,
    body: Bytes,
) -> Result<Json<MessageResponse>, StoreError> {
    let Query(from_query) = query.map_err(|e| StoreError::validation(e.body_text()))?;
    let from_body = if body.is_empty() {
        Credentials::default()
    } else {
        serde_json::from_slice::<Credentials>(&body)
            .map_err(|e| StoreError::validation(format!("Invalid JSON body: {}", e)))?
    };

    let username = from_body
        .username
        .or(from_query.username)
        .ok_or_else(|| StoreError::validation("Field 'username' is required"))?;
    let password = from_body
        .password
        .or(from_query.password)
        .ok_or_else(|| StoreError::validation("Field 'password' is required"))?;

    let user_id = run_blocking(move || service.register_user(username, password)).await?;
    Ok(Json(MessageResponse::with_id(
        "User registered successfully",
        user_id,
    )))
}

async fn purchase_game(
    State(service): State<StoreService>,
    ids: Result<Path<(i32, i32)>, PathRejection>,
) -> Result<Json<MessageResponse>, StoreError> {
    let Path((user_id, game_id)) =
        ids.map_err(|_| StoreError::validation("User id and game id must be integers"))?;
    let purchase_id = run_blocking(move || service.purchase_game(user_id, game_id)).await?;
    Ok(Json(MessageResponse::with_id(
        "Game purchased successfully",
        purchase_id,
    )))
}

async fn user_purchases(
    State(service): State<StoreService>,
    user_id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Vec<Purchase>>, StoreError> {
    let Path(user_id) =
        user_id.map_err(|_| StoreError::validation("User id must be an integer"))?;
    let purchases = run_blocking(move || service.purchases_for_user(user_id)).await?;
    Ok(Json(purchases))
}
