//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Request payloads and the optional HTTP surface of the engine."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use crate::model::{Catalogs, NetworkPoint, ScenarioParams};

#[cfg(feature = "rest-api")]
pub use rest::router;

#[cfg(feature = "rest-api")]
mod rest {
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use std::sync::Arc;

    use crate::{
        errors::CalcEngineError, monte_carlo::RiskSummary, optimizer::OptimizationOutcome,
        CalculationResult, Engine, EngineSettings,
    };

    use super::{CalculationRequest, MonteCarloRequest};

    pub fn router(settings: EngineSettings) -> Router {
        Router::new()
            .route("/api/lvnet/calculate", post(calculate))
            .route("/api/lvnet/optimize", post(optimize))
            .route("/api/lvnet/montecarlo", post(monte_carlo))
            .with_state(Arc::new(Engine::new(settings)))
    }

    async fn calculate(
        State(engine): State<Arc<Engine>>,
        Json(payload): Json<CalculationRequest>,
    ) -> Result<Json<CalculationResult>, StatusCode> {
        engine
            .calculate(
                &payload.scenario_id,
                &payload.nodes,
                &payload.params,
                &payload.catalogs,
            )
            .map(Json)
            .map_err(map_err)
    }

    async fn optimize(
        State(engine): State<Arc<Engine>>,
        Json(payload): Json<CalculationRequest>,
    ) -> Result<Json<OptimizationOutcome>, StatusCode> {
        engine
            .optimize_with_report(
                &payload.scenario_id,
                &payload.nodes,
                &payload.params,
                &payload.catalogs,
            )
            .map(Json)
            .map_err(map_err)
    }

    async fn monte_carlo(
        State(engine): State<Arc<Engine>>,
        Json(payload): Json<MonteCarloRequest>,
    ) -> Result<Json<RiskSummary>, StatusCode> {
        let request = payload.scenario;
        engine
            .run_monte_carlo(
                &request.nodes,
                &request.params,
                &request.catalogs,
                payload.iterations,
            )
            .map(Json)
            .map_err(map_err)
    }

    fn map_err(err: CalcEngineError) -> StatusCode {
        match err {
            CalcEngineError::MissingSource
            | CalcEngineError::InvalidInput(_)
            | CalcEngineError::InvalidIterations => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CalculationRequest {
    #[serde(default)]
    pub scenario_id: String,
    pub nodes: Vec<NetworkPoint>,
    pub params: ScenarioParams,
    pub catalogs: Catalogs,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MonteCarloRequest {
    #[serde(flatten)]
    pub scenario: CalculationRequest,
    pub iterations: usize,
}
