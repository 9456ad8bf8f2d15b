use crate::dto::analytics_dto::{ForecastResponse, MarketOverviewResponse};
use crate::error::{Error, Result};
use crate::services::scoring_service::{ScoringProvider, SeriesPoint};
use sqlx::{PgPool, Row};
use std::sync::Arc;

const DEFAULT_HORIZON_MONTHS: u32 = 3;
const MAX_HORIZON_MONTHS: u32 = 12;
const HISTORY_MONTHS: i32 = 12;

/// Market analytics built on monthly aggregates, with forecasting delegated
/// to the scoring provider.
#[derive(Clone)]
pub struct AnalyticsService {
    pool: PgPool,
    scoring: Arc<dyn ScoringProvider>,
}

impl AnalyticsService {
    pub fn new(pool: PgPool, scoring: Arc<dyn ScoringProvider>) -> Self {
        Self { pool, scoring }
    }

    pub async fn forecast(
        &self,
        series: Option<String>,
        months: Option<u32>,
    ) -> Result<ForecastResponse> {
        let series_type = series.unwrap_or_else(|| "applications".to_string());
        let horizon = months.unwrap_or(DEFAULT_HORIZON_MONTHS);
        if horizon == 0 || horizon > MAX_HORIZON_MONTHS {
            return Err(Error::BadRequest(format!(
                "Forecast horizon must be between 1 and {MAX_HORIZON_MONTHS} months"
            )));
        }

        let table = match series_type.as_str() {
            "applications" => "applications",
            "interviews" => "interviews",
            "jobs" => "jobs",
            other => {
                return Err(Error::BadRequest(format!("Unknown forecast series: {other}")));
            }
        };
        let timestamp_column = match table {
            "applications" => "submitted_at",
            "interviews" => "scheduled_at",
            _ => "created_at",
        };

        let history = self.monthly_counts(table, timestamp_column).await?;
        let points = self.scoring.forecast(&series_type, &history, horizon).await?;

        let trend = match (points.first(), points.last()) {
            (Some(first), Some(last)) if last.predicted_value > first.predicted_value => "up",
            (Some(first), Some(last)) if last.predicted_value < first.predicted_value => "down",
            _ => "flat",
        };

        Ok(ForecastResponse {
            series_type,
            horizon_months: horizon,
            trend: trend.to_string(),
            points,
        })
    }

    pub async fn overview(&self) -> Result<MarketOverviewResponse> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM jobs) AS total_jobs,
                (SELECT COUNT(*) FROM jobs WHERE status = 'open') AS open_jobs,
                (SELECT COUNT(*) FROM applications) AS total_applications,
                (SELECT COUNT(*) FROM interviews) AS total_interviews,
                (SELECT AVG(ai_match_score) FROM applications WHERE ai_match_score IS NOT NULL)
                    AS avg_match_score
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(MarketOverviewResponse {
            total_jobs: row.get("total_jobs"),
            open_jobs: row.get("open_jobs"),
            total_applications: row.get("total_applications"),
            total_interviews: row.get("total_interviews"),
            avg_match_score: row.get("avg_match_score"),
        })
    }

    async fn monthly_counts(&self, table: &str, timestamp_column: &str) -> Result<Vec<SeriesPoint>> {
        // Table and column names come from the fixed match above, never from
        // user input.
        let sql = format!(
            r#"
            SELECT TO_CHAR(DATE_TRUNC('month', {timestamp_column}), 'YYYY-MM') AS period,
                   COUNT(*) AS cnt
            FROM {table}
            WHERE {timestamp_column} >= NOW() - INTERVAL '{HISTORY_MONTHS} months'
            GROUP BY 1
            ORDER BY 1
            "#
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| SeriesPoint {
                period: row.get("period"),
                value: row.get::<i64, _>("cnt") as f64,
            })
            .collect())
    }
}
