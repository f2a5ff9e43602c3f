use axum::{extract::Query, Json};
use serde::{Deserialize, Serialize};

use crate::services::breathing::{pattern, phase_at, BreathingPattern, PhaseTick};
use crate::services::crisis::{crisis_directory, CrisisResourceView};

#[derive(Debug, Deserialize)]
pub struct BreathingQuery {
    /// Seconds since the client started the timer.
    pub elapsed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct BreathingResponse {
    #[serde(flatten)]
    pub pattern: BreathingPattern,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<PhaseTick>,
}

pub async fn crisis_resources() -> Json<Vec<CrisisResourceView>> {
    Json(crisis_directory())
}

pub async fn breathing_exercise(Query(query): Query<BreathingQuery>) -> Json<BreathingResponse> {
    Json(BreathingResponse {
        pattern: pattern(),
        current: query.elapsed.map(phase_at),
    })
}
