use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, cancel_reservation, create_reservation, delete_reservation, get_reservation,
    list_reservations, reserve_book, update_reservation,
};

/// Creates the API router with all reservation endpoints
///
/// CRUD:
/// - GET /reservations - List reservations with their books
/// - POST /reservations - Create a reservation
/// - GET /reservations/:id - Get a reservation
/// - PUT /reservations/:id - Update dates or status
/// - DELETE /reservations/:id - Delete a reservation
///
/// Domain operations:
/// - POST /books/:id/reserve - Reserve an available book
/// - POST /reservations/:id/cancel - Cancel a reservation and release its book
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route(
            "/reservations",
            get(list_reservations).post(create_reservation),
        )
        .route(
            "/reservations/:id",
            get(get_reservation)
                .put(update_reservation)
                .delete(delete_reservation),
        )
        .route("/reservations/:id/cancel", post(cancel_reservation))
        .route("/books/:id/reserve", post(reserve_book))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
