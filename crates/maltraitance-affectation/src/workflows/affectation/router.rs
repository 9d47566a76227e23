use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::domain::Situation;
use super::geo::GeoResolver;
use super::repository::{EntiteResolver, RequeteRepository};
use super::service::{simulate, AffectationError, AffectationService};

/// Router builder exposing the assignment and simulation endpoints.
pub fn affectation_router<R, G, E>(service: Arc<AffectationService<R, G, E>>) -> Router
where
    R: RequeteRepository + 'static,
    G: GeoResolver + 'static,
    E: EntiteResolver + 'static,
{
    Router::new()
        .route(
            "/api/v1/requetes/:requete_id/affectation",
            post(assign_handler::<R, G, E>),
        )
        .route("/api/v1/affectation/simulate", post(simulate_handler))
        .with_state(service)
}

pub(crate) async fn assign_handler<R, G, E>(
    State(service): State<Arc<AffectationService<R, G, E>>>,
    Path(requete_id): Path<String>,
) -> Response
where
    R: RequeteRepository + 'static,
    G: GeoResolver + 'static,
    E: EntiteResolver + 'static,
{
    match service.assign_entites_to_requete(&requete_id) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(AffectationError::RequeteNotFound(reference)) => {
            let payload = json!({
                "error": "requete not found",
                "requeteId": reference,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn simulate_handler(axum::Json(situation): axum::Json<Situation>) -> Response {
    match simulate(&situation).await {
        Ok(simulation) => (StatusCode::OK, axum::Json(simulation)).into_response(),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}
