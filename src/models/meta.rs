//! Meta payloads: revision info for poll/refetch clients and club constants.

use serde::{Deserialize, Serialize};

/// Current datastore revision. Clients poll this to decide when to refetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}

/// Fixed club-wide constants surfaced to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubConfig {
    pub voting_points_total: i64,
}
