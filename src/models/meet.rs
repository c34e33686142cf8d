//! Meet lifecycle models: phases, candidates, votes, date polling, Top 5.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a meet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MeetPhase {
    Draft,
    Voting,
    Reading,
    Completed,
    Cancelled,
}

impl MeetPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetPhase::Draft => "draft",
            MeetPhase::Voting => "voting",
            MeetPhase::Reading => "reading",
            MeetPhase::Completed => "completed",
            MeetPhase::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(MeetPhase::Draft),
            "voting" => Some(MeetPhase::Voting),
            "reading" => Some(MeetPhase::Reading),
            "completed" => Some(MeetPhase::Completed),
            "cancelled" => Some(MeetPhase::Cancelled),
            _ => None,
        }
    }

    /// The set of phases this phase may transition to. `completed` and
    /// `cancelled` are terminal.
    pub fn allowed_transitions(&self) -> &'static [MeetPhase] {
        match self {
            MeetPhase::Draft => &[MeetPhase::Voting, MeetPhase::Reading, MeetPhase::Cancelled],
            MeetPhase::Voting => &[MeetPhase::Reading, MeetPhase::Cancelled],
            MeetPhase::Reading => &[MeetPhase::Completed, MeetPhase::Cancelled],
            MeetPhase::Completed | MeetPhase::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: MeetPhase) -> bool {
        self.allowed_transitions().contains(&target)
    }
}

/// Per-member availability for a proposed meeting date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    NotAvailable,
    Maybe,
    NoResponse,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::NotAvailable => "not_available",
            Availability::Maybe => "maybe",
            Availability::NoResponse => "no_response",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Availability::Available),
            "not_available" => Some(Availability::NotAvailable),
            "maybe" => Some(Availability::Maybe),
            "no_response" => Some(Availability::NoResponse),
            _ => None,
        }
    }
}

/// A scheduled book club gathering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meet {
    pub id: String,
    pub host_id: String,
    pub host_username: String,
    pub phase: MeetPhase,
    pub selected_book_id: Option<String>,
    pub selected_book_title: Option<String>,
    /// Snapshot of the chosen date option's datetime, not a live reference.
    pub selected_date: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub voting_points_revealed: bool,
    pub label: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Human-readable label shown in meet lists.
pub fn meet_label(host_username: &str, selected_book_title: Option<&str>) -> String {
    match selected_book_title {
        Some(title) => format!("{} at {}", title, host_username),
        None => format!("Draft Meet by {}", host_username),
    }
}

/// Request body for creating a meet. The caller becomes host, phase starts at draft.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetRequest {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for updating meet info. Book and date selection go through
/// their dedicated operations, never through this update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeetRequest {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for a phase transition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePhaseRequest {
    pub phase: MeetPhase,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseChangedResponse {
    pub phase: MeetPhase,
}

/// A book nominated for a meet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub meet_id: String,
    pub book_id: String,
    pub book_title: String,
    pub book_author: String,
    pub motivation: Option<String>,
    pub added_by: String,
    pub added_by_username: String,
    /// Advisory: this book is already the selected book of another completed meet.
    pub already_selected_in_meet: bool,
    /// Aggregate vote points, present only once scores are visible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCandidateRequest {
    pub book_id: String,
    #[serde(default)]
    pub motivation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBookRequest {
    pub book_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBookResponse {
    pub selected_book_id: String,
    pub already_selected_in_meet: bool,
}

/// One member's point allocation to one candidate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteAllocation {
    pub candidate_id: String,
    pub points: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVotesRequest {
    pub votes: Vec<VoteAllocation>,
}

/// Whether a roster member has cast votes in a meet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub member_id: String,
    pub username: String,
    pub has_voted: bool,
}

/// The calling member's own vote row, always visible to them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyVote {
    pub candidate_id: String,
    pub points: i64,
}

/// A proposed meeting time with the availability votes cast on it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateOption {
    pub id: String,
    pub meet_id: String,
    pub date_time: String,
    pub votes: Vec<DateVote>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateVote {
    pub member_id: String,
    pub username: String,
    pub availability: Availability,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDateOptionRequest {
    pub date_time: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityVote {
    pub date_option_id: String,
    pub availability: Availability,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAvailabilityRequest {
    pub votes: Vec<AvailabilityVote>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDateRequest {
    pub date_option_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDateResponse {
    pub selected_date: String,
}

/// One ranked entry of a member's Top 5 for a meet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Top5Entry {
    pub id: String,
    pub meet_id: String,
    pub member_id: String,
    pub username: String,
    pub book_id: String,
    pub book_title: String,
    pub book_author: String,
    pub rank: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Top5Submission {
    pub book_id: String,
    pub rank: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTop5Request {
    pub entries: Vec<Top5Submission>,
}

/// Cross-meet leaderboard row.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRanking {
    pub book_id: String,
    pub book_title: String,
    pub book_author: String,
    pub total_points: i64,
    pub appearances: i64,
}

/// Full meet detail payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetDetail {
    #[serde(flatten)]
    pub meet: Meet,
    pub candidates: Vec<Candidate>,
    pub date_options: Vec<DateOption>,
    pub top5_entries: Vec<Top5Entry>,
    pub vote_status: Vec<VoteStatus>,
    pub my_votes: Vec<MyVote>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_roundtrip() {
        for phase in [
            MeetPhase::Draft,
            MeetPhase::Voting,
            MeetPhase::Reading,
            MeetPhase::Completed,
            MeetPhase::Cancelled,
        ] {
            assert_eq!(MeetPhase::from_str(phase.as_str()), Some(phase));
        }
        assert_eq!(MeetPhase::from_str("archived"), None);
    }

    #[test]
    fn test_transition_table() {
        use MeetPhase::*;

        assert!(Draft.can_transition_to(Voting));
        assert!(Draft.can_transition_to(Reading));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(!Draft.can_transition_to(Completed));
        assert!(!Draft.can_transition_to(Draft));

        assert!(Voting.can_transition_to(Reading));
        assert!(Voting.can_transition_to(Cancelled));
        assert!(!Voting.can_transition_to(Draft));
        assert!(!Voting.can_transition_to(Completed));

        assert!(Reading.can_transition_to(Completed));
        assert!(Reading.can_transition_to(Cancelled));
        assert!(!Reading.can_transition_to(Voting));

        // Terminal phases allow nothing, including self-transitions.
        for target in [Draft, Voting, Reading, Completed, Cancelled] {
            assert!(!Completed.can_transition_to(target));
            assert!(!Cancelled.can_transition_to(target));
        }
    }

    #[test]
    fn test_availability_roundtrip() {
        for a in [
            Availability::Available,
            Availability::NotAvailable,
            Availability::Maybe,
            Availability::NoResponse,
        ] {
            assert_eq!(Availability::from_str(a.as_str()), Some(a));
        }
        assert_eq!(Availability::from_str("busy"), None);
    }

    #[test]
    fn test_meet_label() {
        assert_eq!(meet_label("anna", Some("Dune")), "Dune at anna");
        assert_eq!(meet_label("anna", None), "Draft Meet by anna");
    }
}
