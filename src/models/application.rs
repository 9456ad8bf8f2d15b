use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle states for a job application. Stored as text in the
/// `applications` table; the transition table below is the single source of
/// truth for which employer-driven moves are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Shortlisted,
    InterviewScheduled,
    Interviewed,
    OfferSent,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Shortlisted => "shortlisted",
            Self::InterviewScheduled => "interview_scheduled",
            Self::Interviewed => "interviewed",
            Self::OfferSent => "offer_sent",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "submitted" => Some(Self::Submitted),
            "under_review" => Some(Self::UnderReview),
            "shortlisted" => Some(Self::Shortlisted),
            "interview_scheduled" => Some(Self::InterviewScheduled),
            "interviewed" => Some(Self::Interviewed),
            "offer_sent" => Some(Self::OfferSent),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }

    /// Targets an employer may move this status to. Terminal states have none.
    pub fn allowed_targets(&self) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match self {
            Submitted => &[UnderReview, Rejected],
            UnderReview => &[Shortlisted, Rejected],
            Shortlisted => &[InterviewScheduled, Rejected],
            InterviewScheduled => &[Interviewed, Rejected],
            Interviewed => &[OfferSent, Rejected],
            OfferSent => &[Accepted, Rejected],
            Accepted | Rejected | Withdrawn => &[],
        }
    }

    /// A transition to the current state is always accepted as a logged no-op.
    pub fn can_transition_to(&self, target: ApplicationStatus) -> bool {
        target == *self || self.allowed_targets().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Withdrawn)
    }

    /// Candidates may withdraw from any non-terminal state.
    pub fn can_withdraw(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub cover_letter: Option<String>,
    pub cv_url: Option<String>,
    pub status: String,
    pub ai_match_score: Option<f64>,
    pub ai_analysis: Option<JsonValue>,
    pub ai_analyzed_at: Option<DateTime<Utc>>,
    pub employer_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Application {
    pub fn status(&self) -> ApplicationStatus {
        ApplicationStatus::parse(&self.status).unwrap_or(ApplicationStatus::Submitted)
    }
}

/// Append-only audit log of status changes. Rows are never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationStatusHistory {
    pub id: i64,
    pub application_id: Uuid,
    pub old_status: String,
    pub new_status: String,
    pub changed_by: Option<Uuid>,
    pub comment: Option<String>,
    pub changed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationNote {
    pub id: i64,
    pub application_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::ApplicationStatus::{self, *};

    const ALL: [ApplicationStatus; 9] = [
        Submitted,
        UnderReview,
        Shortlisted,
        InterviewScheduled,
        Interviewed,
        OfferSent,
        Accepted,
        Rejected,
        Withdrawn,
    ];

    #[test]
    fn forward_path_is_allowed() {
        assert!(Submitted.can_transition_to(UnderReview));
        assert!(UnderReview.can_transition_to(Shortlisted));
        assert!(Shortlisted.can_transition_to(InterviewScheduled));
        assert!(InterviewScheduled.can_transition_to(Interviewed));
        assert!(Interviewed.can_transition_to(OfferSent));
        assert!(OfferSent.can_transition_to(Accepted));
    }

    #[test]
    fn skipping_stages_is_rejected() {
        assert!(!Submitted.can_transition_to(Shortlisted));
        assert!(!Submitted.can_transition_to(OfferSent));
        assert!(!UnderReview.can_transition_to(Interviewed));
        assert!(!Shortlisted.can_transition_to(Accepted));
    }

    #[test]
    fn rejection_is_allowed_from_every_active_state() {
        for status in [Submitted, UnderReview, Shortlisted, InterviewScheduled, Interviewed, OfferSent] {
            assert!(status.can_transition_to(Rejected), "{status} -> rejected");
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for terminal in [Accepted, Rejected, Withdrawn] {
            assert!(terminal.is_terminal());
            for target in ALL {
                if target != terminal {
                    assert!(!terminal.can_transition_to(target), "{terminal} -> {target}");
                }
            }
        }
    }

    #[test]
    fn self_transition_is_a_no_op_everywhere() {
        for status in ALL {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn withdraw_only_from_non_terminal_states() {
        for status in [Submitted, UnderReview, Shortlisted, InterviewScheduled, Interviewed, OfferSent] {
            assert!(status.can_withdraw());
        }
        for status in [Accepted, Rejected, Withdrawn] {
            assert!(!status.can_withdraw());
        }
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in ALL {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApplicationStatus::parse("no_show"), None);
        assert_eq!(ApplicationStatus::parse(""), None);
    }
}
