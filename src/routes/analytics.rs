use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};

use crate::{
    dto::analytics_dto::{ForecastQuery, ForecastResponse, MarketOverviewResponse},
    error::Result,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/analytics/forecast",
    params(
        ("series" = Option<String>, Query, description = "applications, interviews or jobs"),
        ("months" = Option<u32>, Query, description = "Forecast horizon, 1-12 months")
    ),
    responses(
        (status = 200, description = "Forecast for the requested series", body = Json<ForecastResponse>),
        (status = 400, description = "Unknown series or horizon out of range")
    )
)]
#[axum::debug_handler]
pub async fn forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Result<impl IntoResponse> {
    let response = state
        .analytics_service
        .forecast(query.series, query.months)
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/analytics/overview",
    responses(
        (status = 200, description = "Marketplace totals", body = Json<MarketOverviewResponse>)
    )
)]
#[axum::debug_handler]
pub async fn overview(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let response = state.analytics_service.overview().await?;
    Ok(Json(response))
}
