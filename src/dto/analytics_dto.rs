use serde::{Deserialize, Serialize};

use crate::services::scoring_service::ForecastPoint;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ForecastQuery {
    pub series: Option<String>,
    pub months: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub series_type: String,
    pub horizon_months: u32,
    pub trend: String,
    pub points: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOverviewResponse {
    pub total_jobs: i64,
    pub open_jobs: i64,
    pub total_applications: i64,
    pub total_interviews: i64,
    pub avg_match_score: Option<f64>,
}
