//! Book models matching the frontend BookResponse interfaces.

use serde::{Deserialize, Serialize};

/// A book on the shared reading list.
///
/// `is_read` and `candidate_count` are derived at query time: a book counts
/// as read iff it is the selected book of a completed meet, and the candidate
/// count is the number of meets it was nominated in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub book_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introduction: Option<String>,
    pub added_by: String,
    pub added_by_username: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub candidate_count: i64,
}

/// Book detail payload: the book plus the meets it appeared in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub selected_in_meets: Vec<MeetSummary>,
    pub candidate_in_meets: Vec<MeetSummary>,
}

/// Compact meet reference used in book detail payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetSummary {
    pub id: String,
    pub label: String,
    pub phase: super::MeetPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_date: Option<String>,
}

/// Request body for creating a book.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(rename = "type", default)]
    pub book_type: Option<String>,
    #[serde(default)]
    pub introduction: Option<String>,
}

/// Request body for updating a book. Absent fields are left unchanged.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(rename = "type", default)]
    pub book_type: Option<String>,
    #[serde(default)]
    pub introduction: Option<String>,
}

/// Request body for bulk import of pre-parsed rows (admin only).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBooksRequest {
    pub books: Vec<CreateBookRequest>,
}

/// Per-row outcome of a bulk import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBooksResponse {
    pub imported: usize,
    pub errors: Vec<ImportRowError>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowError {
    pub row: usize,
    pub error: String,
}
