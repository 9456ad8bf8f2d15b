use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;

/// Candidate attributes handed to the provider. Assembled from the profile
/// record by the lifecycle engines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateAttributes {
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub education: Vec<JsonValue>,
    pub experience: Vec<JsonValue>,
    pub certifications: Vec<JsonValue>,
    pub languages: Vec<JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRequirements {
    pub title: String,
    pub description: Option<String>,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub experience_years_min: i32,
    pub experience_years_max: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub score: f64,
    pub analysis: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAnalysis {
    pub review: JsonValue,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub month: u32,
    pub predicted_value: f64,
    pub lower: f64,
    pub upper: f64,
}

/// External scoring capability. Implementations are swappable; callers treat
/// every failure as "no score yet" rather than a fatal error.
#[async_trait]
pub trait ScoringProvider: Send + Sync {
    async fn score_profile(&self, profile: &CandidateAttributes) -> Result<ScoreOutcome>;

    async fn score_match(
        &self,
        candidate: &CandidateAttributes,
        job: &JobRequirements,
    ) -> Result<ScoreOutcome>;

    async fn analyze_interview_media(&self, media_url: &str) -> Result<MediaAnalysis>;

    async fn forecast(
        &self,
        series_type: &str,
        historical: &[SeriesPoint],
        horizon_months: u32,
    ) -> Result<Vec<ForecastPoint>>;
}

pub fn clamp_score(score: f64) -> f64 {
    (score.max(0.0).min(100.0) * 100.0).round() / 100.0
}

pub fn provider_from_config() -> Arc<dyn ScoringProvider> {
    let config = crate::config::get_config();
    match config.ai_provider.as_str() {
        "openai" => {
            let client = Client::builder()
                .timeout(Duration::from_secs(config.ai_timeout_secs))
                .build()
                .expect("reqwest client");
            Arc::new(OpenAiScoringProvider::new(
                config.openai_api_key.clone(),
                client,
            ))
        }
        _ => Arc::new(LocalScoringProvider),
    }
}

/// Deterministic heuristic provider. Default in development and in tests;
/// encodes the match-weighting policy (required 60% / preferred 20% /
/// experience 20%, plus small education and certification bonuses).
#[derive(Debug, Clone, Default)]
pub struct LocalScoringProvider;

#[async_trait]
impl ScoringProvider for LocalScoringProvider {
    async fn score_profile(&self, profile: &CandidateAttributes) -> Result<ScoreOutcome> {
        let mut score = 0.0;
        let mut strengths: Vec<&str> = vec![];
        let mut weaknesses: Vec<&str> = vec![];
        let mut recommendations: Vec<&str> = vec![];

        if profile.bio.as_deref().map(str::trim).filter(|b| !b.is_empty()).is_some() {
            score += 15.0;
        } else {
            weaknesses.push("Missing bio/summary");
            recommendations.push("Add a professional summary");
        }

        if profile.skills.is_empty() {
            weaknesses.push("No skills listed");
        } else {
            score += 20.0;
            if profile.skills.len() >= 5 {
                score += 10.0;
                strengths.push("Good variety of skills");
            } else {
                recommendations.push("Add more skills to improve visibility");
            }
        }

        if profile.experience.is_empty() {
            weaknesses.push("No work experience listed");
        } else {
            score += 25.0;
            if profile.experience.len() >= 2 {
                score += 10.0;
                strengths.push("Strong work experience");
            }
        }

        if profile.education.is_empty() {
            recommendations.push("Add educational background");
        } else {
            score += 20.0;
            strengths.push("Education background provided");
        }

        if !profile.certifications.is_empty() {
            score += 10.0;
            strengths.push("Professional certifications");
        }

        Ok(ScoreOutcome {
            score: clamp_score(score),
            analysis: json!({
                "strengths": strengths,
                "weaknesses": weaknesses,
                "recommendations": recommendations,
            }),
        })
    }

    async fn score_match(
        &self,
        candidate: &CandidateAttributes,
        job: &JobRequirements,
    ) -> Result<ScoreOutcome> {
        let mut score = 0.0;
        let mut recommendations: Vec<&str> = vec![];

        let matching_required: Vec<&String> = job
            .required_skills
            .iter()
            .filter(|s| contains_skill(&candidate.skills, s))
            .collect();
        let missing_required: Vec<&String> = job
            .required_skills
            .iter()
            .filter(|s| !contains_skill(&candidate.skills, s))
            .collect();
        let matching_preferred = job
            .preferred_skills
            .iter()
            .filter(|s| contains_skill(&candidate.skills, s))
            .count();

        if !job.required_skills.is_empty() {
            let pct = matching_required.len() as f64 / job.required_skills.len() as f64 * 100.0;
            score += pct * 0.6;
        }
        if !job.preferred_skills.is_empty() {
            let pct = matching_preferred as f64 / job.preferred_skills.len() as f64 * 100.0;
            score += pct * 0.2;
        }

        let experience_match;
        if candidate.experience.len() as i32 >= job.experience_years_min {
            score += 20.0;
            experience_match = "Meets experience requirements";
        } else {
            experience_match = "Below required experience level";
            recommendations.push("Gain more experience in relevant field");
        }

        if !candidate.education.is_empty() {
            score += 10.0;
        }
        if !candidate.certifications.is_empty() {
            score += 5.0;
        }

        Ok(ScoreOutcome {
            score: clamp_score(score),
            analysis: json!({
                "matching_skills": matching_required,
                "missing_skills": missing_required,
                "experience_match": experience_match,
                "recommendations": recommendations,
            }),
        })
    }

    async fn analyze_interview_media(&self, media_url: &str) -> Result<MediaAnalysis> {
        // Derive stable pseudo-features from the media reference so repeated
        // analysis of the same recording writes the same result.
        let seed = stable_seed(media_url);
        let confidence = unit_range(seed, 0, 0.60, 0.95);
        let engaged = unit_range(seed, 1, 0.60, 0.95);
        let clarity = unit_range(seed, 2, 0.70, 0.95);
        let pace = unit_range(seed, 3, 0.60, 0.90);
        let fluency = unit_range(seed, 4, 0.65, 0.92);
        let sentiment = match seed % 3 {
            0 => "positive",
            1 => "neutral",
            _ => "negative",
        };

        let review = json!({
            "sentiment": sentiment,
            "confidence_level": confidence,
            "key_phrases": [
                "team player",
                "problem solving",
                "communication skills",
                "leadership experience",
            ],
            "facial_expressions": {
                "smiling": unit_range(seed, 5, 0.50, 0.90),
                "engaged": engaged,
                "confident": unit_range(seed, 6, 0.50, 0.85),
            },
            "speech_analysis": {
                "clarity": clarity,
                "pace": pace,
                "fluency": fluency,
            },
        });

        let score =
            confidence * 30.0 + engaged * 25.0 + clarity * 25.0 + fluency * 20.0;

        Ok(MediaAnalysis {
            review,
            score: clamp_score(score),
        })
    }

    async fn forecast(
        &self,
        series_type: &str,
        historical: &[SeriesPoint],
        horizon_months: u32,
    ) -> Result<Vec<ForecastPoint>> {
        Ok(trend_forecast(series_type, historical, horizon_months))
    }
}

fn contains_skill(skills: &[String], wanted: &str) -> bool {
    skills.iter().any(|s| s.eq_ignore_ascii_case(wanted))
}

fn stable_seed(input: &str) -> u64 {
    // FNV-1a; stability matters here, not distribution quality.
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn unit_range(seed: u64, lane: u64, low: f64, high: f64) -> f64 {
    let mixed = seed.rotate_left((lane as u32 % 63) + 1) ^ lane.wrapping_mul(0x9e3779b97f4a7c15);
    let unit = (mixed % 10_000) as f64 / 10_000.0;
    let value = low + unit * (high - low);
    (value * 100.0).round() / 100.0
}

/// Linear-trend projection over the historical series with a flat +/-10%
/// confidence band. Shared by both providers; forecasting never goes over
/// the network.
pub fn trend_forecast(
    _series_type: &str,
    historical: &[SeriesPoint],
    horizon_months: u32,
) -> Vec<ForecastPoint> {
    let base_value = historical.first().map(|p| p.value).unwrap_or(100.0);

    let avg_delta = if historical.len() >= 2 {
        let mut total = 0.0;
        for pair in historical.windows(2) {
            total += pair[1].value - pair[0].value;
        }
        total / (historical.len() - 1) as f64
    } else {
        0.0
    };

    let last = historical.last().map(|p| p.value).unwrap_or(base_value);

    (1..=horizon_months)
        .map(|month| {
            let predicted = (last + avg_delta * month as f64).max(0.0);
            let predicted = (predicted * 100.0).round() / 100.0;
            ForecastPoint {
                month,
                predicted_value: predicted,
                lower: (predicted * 0.9 * 100.0).round() / 100.0,
                upper: (predicted * 1.1 * 100.0).round() / 100.0,
            }
        })
        .collect()
}

/// Remote provider backed by the OpenAI chat API. One attempt per call with a
/// bounded timeout; transport failures surface as `ProviderUnavailable`.
#[derive(Clone)]
pub struct OpenAiScoringProvider {
    client: Client,
    api_key: String,
}

impl OpenAiScoringProvider {
    pub fn new(api_key: String, client: Client) -> Self {
        Self { client, api_key }
    }

    async fn chat_openai(&self, payload: JsonValue) -> Result<JsonValue> {
        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    Error::ProviderUnavailable(e.to_string())
                } else {
                    Error::Provider(e.to_string())
                }
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "OpenAI API Error {}: {}",
                status, text
            )));
        }

        let body: JsonValue = res
            .json()
            .await
            .map_err(|e| Error::Provider(e.to_string()))?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| Error::Provider("Invalid OpenAI response format".to_string()))
    }

    fn parse_outcome(&self, resp: JsonValue) -> Result<ScoreOutcome> {
        let score = resp
            .get("score")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| Error::Provider("Missing score in provider response".to_string()))?;
        let analysis = resp.get("analysis").cloned().unwrap_or_else(|| json!({}));
        Ok(ScoreOutcome {
            score: clamp_score(score),
            analysis,
        })
    }
}

#[async_trait]
impl ScoringProvider for OpenAiScoringProvider {
    async fn score_profile(&self, profile: &CandidateAttributes) -> Result<ScoreOutcome> {
        let system_prompt = "You are a senior career advisor. Score the completeness and quality of the \
            candidate profile from 0 to 100. Return a JSON object: \
            { \"score\": <0-100>, \"analysis\": { \"strengths\": [], \"weaknesses\": [], \"recommendations\": [] } }";

        let payload = json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": serde_json::to_string(profile)?}
            ],
            "response_format": { "type": "json_object" },
        });

        let resp = self.chat_openai(payload).await?;
        self.parse_outcome(resp)
    }

    async fn score_match(
        &self,
        candidate: &CandidateAttributes,
        job: &JobRequirements,
    ) -> Result<ScoreOutcome> {
        let system_prompt = "You are a strict technical recruiter. Score how well the candidate matches \
            the job from 0 to 100. Weight required skills most heavily, then preferred skills, then \
            experience sufficiency. Return a JSON object: \
            { \"score\": <0-100>, \"analysis\": { \"matching_skills\": [], \"missing_skills\": [], \
            \"experience_match\": \"\", \"recommendations\": [] } }";

        let user_data = json!({
            "candidate": candidate,
            "job": job,
        });

        let payload = json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": serde_json::to_string(&user_data)?}
            ],
            "response_format": { "type": "json_object" },
        });

        let resp = self.chat_openai(payload).await?;
        self.parse_outcome(resp)
    }

    async fn analyze_interview_media(&self, media_url: &str) -> Result<MediaAnalysis> {
        let system_prompt = "You review recorded job interviews. Given a recording reference, return a \
            JSON object { \"score\": <0-100>, \"review\": { \"sentiment\": \"\", \"confidence_level\": 0.0, \
            \"key_phrases\": [], \"speech_analysis\": {} } }";

        let payload = json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": json!({"media_url": media_url}).to_string()}
            ],
            "response_format": { "type": "json_object" },
        });

        let resp = self.chat_openai(payload).await?;
        let score = resp
            .get("score")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| Error::Provider("Missing score in provider response".to_string()))?;
        let review = resp.get("review").cloned().unwrap_or_else(|| json!({}));
        Ok(MediaAnalysis {
            review,
            score: clamp_score(score),
        })
    }

    async fn forecast(
        &self,
        series_type: &str,
        historical: &[SeriesPoint],
        horizon_months: u32,
    ) -> Result<Vec<ForecastPoint>> {
        Ok(trend_forecast(series_type, historical, horizon_months))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(skills: &[&str], experience_entries: usize) -> CandidateAttributes {
        CandidateAttributes {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience: (0..experience_entries).map(|_| json!({})).collect(),
            ..Default::default()
        }
    }

    fn job(required: &[&str], preferred: &[&str], min_years: i32) -> JobRequirements {
        JobRequirements {
            title: "Backend Engineer".into(),
            required_skills: required.iter().map(|s| s.to_string()).collect(),
            preferred_skills: preferred.iter().map(|s| s.to_string()).collect(),
            experience_years_min: min_years,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn full_required_match_with_experience_scores_eighty() {
        let provider = LocalScoringProvider;
        let outcome = provider
            .score_match(&candidate(&["Go", "SQL"], 3), &job(&["Go", "SQL"], &[], 2))
            .await
            .unwrap();
        // 100% required * 0.6 + experience 20
        assert_eq!(outcome.score, 80.0);
        assert_eq!(outcome.analysis["missing_skills"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn missing_required_skills_are_reported() {
        let provider = LocalScoringProvider;
        let outcome = provider
            .score_match(&candidate(&["Go"], 0), &job(&["Go", "SQL"], &[], 5))
            .await
            .unwrap();
        assert_eq!(outcome.score, 30.0);
        let missing = outcome.analysis["missing_skills"].as_array().unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0], "SQL");
        assert_eq!(
            outcome.analysis["experience_match"],
            "Below required experience level"
        );
    }

    #[tokio::test]
    async fn skill_matching_is_case_insensitive() {
        let provider = LocalScoringProvider;
        let outcome = provider
            .score_match(&candidate(&["rust", "sql"], 1), &job(&["Rust", "SQL"], &[], 1))
            .await
            .unwrap();
        assert_eq!(outcome.score, 80.0);
    }

    #[tokio::test]
    async fn score_never_exceeds_one_hundred() {
        let provider = LocalScoringProvider;
        let mut full = candidate(&["Go", "SQL", "Docker"], 5);
        full.education = vec![json!({"degree": "BSc"})];
        full.certifications = vec![json!({"name": "CKA"})];
        let outcome = provider
            .score_match(&full, &job(&["Go", "SQL"], &["Docker"], 1))
            .await
            .unwrap();
        assert!(outcome.score <= 100.0);
    }

    #[tokio::test]
    async fn profile_score_rewards_completeness() {
        let provider = LocalScoringProvider;
        let empty = provider
            .score_profile(&CandidateAttributes::default())
            .await
            .unwrap();
        assert_eq!(empty.score, 0.0);

        let mut full = candidate(&["a", "b", "c", "d", "e"], 2);
        full.bio = Some("Seasoned engineer".into());
        full.education = vec![json!({})];
        full.certifications = vec![json!({})];
        let scored = provider.score_profile(&full).await.unwrap();
        assert_eq!(scored.score, 100.0);
    }

    #[tokio::test]
    async fn media_analysis_is_deterministic_and_bounded() {
        let provider = LocalScoringProvider;
        let first = provider
            .analyze_interview_media("https://cdn.example.com/iv/42.webm")
            .await
            .unwrap();
        let second = provider
            .analyze_interview_media("https://cdn.example.com/iv/42.webm")
            .await
            .unwrap();
        assert_eq!(first.score, second.score);
        assert_eq!(first.review, second.review);
        assert!(first.score >= 0.0 && first.score <= 100.0);
    }

    #[test]
    fn forecast_has_requested_horizon_and_ordered_bounds() {
        let series = vec![
            SeriesPoint { period: "2026-01".into(), value: 100.0 },
            SeriesPoint { period: "2026-02".into(), value: 110.0 },
            SeriesPoint { period: "2026-03".into(), value: 120.0 },
        ];
        let points = trend_forecast("applications", &series, 4);
        assert_eq!(points.len(), 4);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.month, (i + 1) as u32);
            assert!(point.lower <= point.predicted_value);
            assert!(point.upper >= point.predicted_value);
        }
        // Rising history projects a rising forecast.
        assert!(points[3].predicted_value > points[0].predicted_value);
    }

    #[test]
    fn forecast_with_empty_history_uses_baseline() {
        let points = trend_forecast("unemployment", &[], 2);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].predicted_value, 100.0);
    }

    #[test]
    fn clamp_score_bounds_and_rounds() {
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(146.2), 100.0);
        assert_eq!(clamp_score(73.456), 73.46);
    }
}
