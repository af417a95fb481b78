use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use preclinitrain::workflows::competency::{CompetencyCheck, RecyclingReport, TutorValidity};
use preclinitrain::workflows::continuous_training::ComplianceSnapshot;
use preclinitrain::workflows::time::parse_instant;
use preclinitrain::workflows::{EngineError, RepositoryError, SkillId, UserId};
use serde::Deserialize;
use serde_json::json;

use crate::infra::{AppState, Engine};

/// Engine failures translated into HTTP responses.
#[derive(Debug)]
pub(crate) struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(value: EngineError) -> Self {
        Self(value)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            EngineError::NotFound { .. } | EngineError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            EngineError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Conflict { .. } | EngineError::Repository(RepositoryError::Conflict) => {
                StatusCode::CONFLICT
            }
            EngineError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            EngineError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AsOfQuery {
    #[serde(default)]
    pub(crate) as_of: Option<String>,
}

impl AsOfQuery {
    fn resolve(&self) -> Result<DateTime<Utc>, ApiError> {
        match self.as_of.as_deref() {
            Some(raw) => Ok(parse_instant(raw)?),
            None => Ok(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompetencyCheckRequest {
    pub(crate) user_ids: Vec<UserId>,
    pub(crate) skill_ids: Vec<SkillId>,
    #[serde(default)]
    pub(crate) as_of: Option<String>,
}

pub(crate) fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/users/:user_id/compliance", get(compliance_endpoint))
        .route(
            "/api/v1/users/:user_id/competencies/recycling",
            get(recycling_endpoint),
        )
        .route(
            "/api/v1/skills/:skill_id/tutors/validity",
            get(skill_tutors_endpoint),
        )
        .route(
            "/api/v1/tutors/:tutor_id/skills/:skill_id/validity",
            get(tutor_validity_endpoint),
        )
        .route("/api/v1/competency-checks", post(competency_check_endpoint))
        .with_state(engine)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn compliance_endpoint(
    State(engine): State<Arc<Engine>>,
    Path(user_id): Path<u64>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<ComplianceSnapshot>, ApiError> {
    let now = query.resolve()?;
    Ok(Json(engine.training.snapshot(UserId(user_id), now)?))
}

pub(crate) async fn recycling_endpoint(
    State(engine): State<Arc<Engine>>,
    Path(user_id): Path<u64>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<RecyclingReport>, ApiError> {
    let now = query.resolve()?;
    Ok(Json(
        engine.competencies.recycling_report(UserId(user_id), now)?,
    ))
}

pub(crate) async fn skill_tutors_endpoint(
    State(engine): State<Arc<Engine>>,
    Path(skill_id): Path<u64>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<Vec<TutorValidity>>, ApiError> {
    let as_of = query.resolve()?;
    Ok(Json(
        engine
            .competencies
            .tutor_validity_all(SkillId(skill_id), as_of)?,
    ))
}

pub(crate) async fn tutor_validity_endpoint(
    State(engine): State<Arc<Engine>>,
    Path((tutor_id, skill_id)): Path<(u64, u64)>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<TutorValidity>, ApiError> {
    let as_of = query.resolve()?;
    Ok(Json(engine.competencies.tutor_validity(
        UserId(tutor_id),
        SkillId(skill_id),
        as_of,
    )?))
}

pub(crate) async fn competency_check_endpoint(
    State(engine): State<Arc<Engine>>,
    Json(request): Json<CompetencyCheckRequest>,
) -> Result<Json<Vec<CompetencyCheck>>, ApiError> {
    let now = AsOfQuery {
        as_of: request.as_of,
    }
    .resolve()?;
    Ok(Json(engine.competencies.check_competency(
        &request.user_ids,
        &request.skill_ids,
        now,
    )?))
}
