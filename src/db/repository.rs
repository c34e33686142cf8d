//! Database repository for the entity store.
//!
//! Uses prepared statements and transactions for data integrity. Multi-row
//! submissions (vote sets, availability sets, Top 5 lists) are replaced
//! atomically so readers never observe a partial set.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    AvailabilityVote, Availability, Book, Candidate, CreateBookRequest, CreateMeetRequest,
    CreateMemberRequest, DateOption, DateVote, Meet, MeetPhase, MeetSummary, Member, MyVote,
    RevisionInfo, Top5Entry, Top5Submission, UpdateBookRequest, UpdateMeetRequest, VoteAllocation,
    meet_label,
};

/// A date option row without its votes.
#[derive(Debug, Clone)]
pub struct DateOptionRow {
    pub id: String,
    pub meet_id: String,
    pub date_time: String,
}

/// A Top 5 entry reduced to what the cross-meet aggregation needs.
#[derive(Debug, Clone)]
pub struct RankedBook {
    pub book_id: String,
    pub book_title: String,
    pub book_author: String,
    pub rank: i64,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    // ==================== MEMBER OPERATIONS ====================

    /// List all members.
    pub async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query(
            "SELECT id, username, email, is_admin, is_temporary, created_at, updated_at FROM members ORDER BY username"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    /// List permanent (non-temporary) members: the voting roster.
    pub async fn list_permanent_members(&self) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query(
            "SELECT id, username, email, is_admin, is_temporary, created_at, updated_at FROM members WHERE is_temporary = 0 ORDER BY username"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    /// Get a member by ID.
    pub async fn get_member(&self, id: &str) -> Result<Option<Member>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, email, is_admin, is_temporary, created_at, updated_at FROM members WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(member_from_row))
    }

    /// Create a new member.
    pub async fn create_member(&self, request: &CreateMemberRequest) -> Result<Member, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO members (id, username, email, is_admin, is_temporary, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(&request.username)
        .bind(&request.email)
        .bind(request.is_admin as i32)
        .bind(request.is_temporary as i32)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Member {
            id,
            username: request.username.clone(),
            email: request.email.clone(),
            is_admin: request.is_admin,
            is_temporary: request.is_temporary,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Delete a member.
    pub async fn delete_member(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== BOOK OPERATIONS ====================

    /// List all books.
    pub async fn list_books(&self) -> Result<Vec<Book>, AppError> {
        let rows = sqlx::query(
            r#"SELECT b.id, b.title, b.author, b.year, b.country, b.original_language, b.type,
                      b.introduction, b.added_by, u.username AS added_by_username,
                      b.created_at, b.updated_at
               FROM books b LEFT JOIN members u ON b.added_by = u.id
               ORDER BY b.title"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(book_from_row).collect())
    }

    /// Get a book by ID.
    pub async fn get_book(&self, id: &str) -> Result<Option<Book>, AppError> {
        let row = sqlx::query(
            r#"SELECT b.id, b.title, b.author, b.year, b.country, b.original_language, b.type,
                      b.introduction, b.added_by, u.username AS added_by_username,
                      b.created_at, b.updated_at
               FROM books b LEFT JOIN members u ON b.added_by = u.id
               WHERE b.id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(book_from_row))
    }

    /// Create a new book.
    pub async fn create_book(
        &self,
        request: &CreateBookRequest,
        added_by: &str,
        added_by_username: &str,
    ) -> Result<Book, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO books (id, title, author, year, country, original_language, type,
                                  introduction, added_by, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&request.title)
        .bind(&request.author)
        .bind(&request.year)
        .bind(&request.country)
        .bind(&request.original_language)
        .bind(&request.book_type)
        .bind(&request.introduction)
        .bind(added_by)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Book {
            id,
            title: request.title.clone(),
            author: request.author.clone(),
            year: request.year.clone(),
            country: request.country.clone(),
            original_language: request.original_language.clone(),
            book_type: request.book_type.clone(),
            introduction: request.introduction.clone(),
            added_by: added_by.to_string(),
            added_by_username: added_by_username.to_string(),
            created_at: now.clone(),
            updated_at: now,
            is_read: false,
            candidate_count: 0,
        })
    }

    /// Update a book. Absent request fields keep their current value.
    pub async fn update_book(&self, id: &str, request: &UpdateBookRequest) -> Result<Book, AppError> {
        let existing = self
            .get_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        let now = Utc::now().to_rfc3339();
        let title = request.title.as_ref().unwrap_or(&existing.title);
        let author = request.author.as_ref().unwrap_or(&existing.author);
        let year = request.year.clone().or(existing.year.clone());
        let country = request.country.clone().or(existing.country.clone());
        let original_language = request
            .original_language
            .clone()
            .or(existing.original_language.clone());
        let book_type = request.book_type.clone().or(existing.book_type.clone());
        let introduction = request
            .introduction
            .clone()
            .or(existing.introduction.clone());

        sqlx::query(
            r#"UPDATE books SET title = ?, author = ?, year = ?, country = ?,
                                original_language = ?, type = ?, introduction = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(title)
        .bind(author)
        .bind(&year)
        .bind(&country)
        .bind(&original_language)
        .bind(&book_type)
        .bind(&introduction)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Book {
            id: id.to_string(),
            title: title.clone(),
            author: author.clone(),
            year,
            country,
            original_language,
            book_type,
            introduction,
            added_by: existing.added_by,
            added_by_username: existing.added_by_username,
            created_at: existing.created_at,
            updated_at: now,
            is_read: false,
            candidate_count: 0,
        })
    }

    /// Delete a book. Eligibility guards live in the service layer.
    pub async fn delete_book(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    /// Selected book ids of all meets currently in the given phase.
    pub async fn selected_book_ids_in_phase(
        &self,
        phase: MeetPhase,
    ) -> Result<HashSet<String>, AppError> {
        let rows = sqlx::query(
            "SELECT selected_book_id FROM meets WHERE phase = ? AND selected_book_id IS NOT NULL",
        )
        .bind(phase.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("selected_book_id")).collect())
    }

    /// Number of meets each book appears in as a candidate.
    pub async fn candidate_counts(&self) -> Result<HashMap<String, i64>, AppError> {
        let rows =
            sqlx::query("SELECT book_id, COUNT(*) AS count FROM meet_candidates GROUP BY book_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .iter()
            .map(|r| (r.get("book_id"), r.get("count")))
            .collect())
    }

    /// True if the book is the selected book of any meet, cancelled ones included.
    pub async fn book_selected_in_any_meet(&self, book_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT id FROM meets WHERE selected_book_id = ? LIMIT 1")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// True if the book is a candidate in any meet, cancelled ones included.
    pub async fn book_candidate_in_any_meet(&self, book_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT id FROM meet_candidates WHERE book_id = ? LIMIT 1")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// True if the book is already the selected book of a completed meet.
    pub async fn book_selected_in_completed_meet(&self, book_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT id FROM meets WHERE selected_book_id = ? AND phase = 'completed' LIMIT 1",
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Non-cancelled meets where this book is the selected book.
    pub async fn meets_with_selected_book(
        &self,
        book_id: &str,
    ) -> Result<Vec<MeetSummary>, AppError> {
        let rows = sqlx::query(
            r#"SELECT m.id, m.phase, m.selected_date, u.username AS host_username,
                      b.title AS selected_book_title
               FROM meets m
               LEFT JOIN members u ON m.host_id = u.id
               LEFT JOIN books b ON m.selected_book_id = b.id
               WHERE m.selected_book_id = ? AND m.phase != 'cancelled'"#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(meet_summary_from_row).collect())
    }

    /// Non-cancelled meets where this book is a candidate.
    pub async fn meets_with_candidate_book(
        &self,
        book_id: &str,
    ) -> Result<Vec<MeetSummary>, AppError> {
        let rows = sqlx::query(
            r#"SELECT m.id, m.phase, m.selected_date, u.username AS host_username,
                      b.title AS selected_book_title
               FROM meet_candidates c
               JOIN meets m ON c.meet_id = m.id
               LEFT JOIN members u ON m.host_id = u.id
               LEFT JOIN books b ON m.selected_book_id = b.id
               WHERE c.book_id = ? AND m.phase != 'cancelled'"#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(meet_summary_from_row).collect())
    }

    // ==================== MEET OPERATIONS ====================

    /// List all meets.
    pub async fn list_meets(&self) -> Result<Vec<Meet>, AppError> {
        let rows = sqlx::query(&meet_select("ORDER BY m.created_at DESC"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(meet_from_row).collect())
    }

    /// Get a meet by ID.
    pub async fn get_meet(&self, id: &str) -> Result<Option<Meet>, AppError> {
        let row = sqlx::query(&meet_select("WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(meet_from_row))
    }

    /// Create a new meet in the draft phase with the caller as host.
    pub async fn create_meet(
        &self,
        host_id: &str,
        host_username: &str,
        request: &CreateMeetRequest,
    ) -> Result<Meet, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO meets (id, host_id, phase, location, description, voting_points_revealed, created_at, updated_at)
               VALUES (?, ?, 'draft', ?, ?, 0, ?, ?)"#,
        )
        .bind(&id)
        .bind(host_id)
        .bind(&request.location)
        .bind(&request.description)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Meet {
            id,
            host_id: host_id.to_string(),
            host_username: host_username.to_string(),
            phase: MeetPhase::Draft,
            selected_book_id: None,
            selected_book_title: None,
            selected_date: None,
            location: request.location.clone(),
            description: request.description.clone(),
            voting_points_revealed: false,
            label: meet_label(host_username, None),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Update location/description of a meet.
    pub async fn update_meet_info(
        &self,
        id: &str,
        request: &UpdateMeetRequest,
    ) -> Result<(), AppError> {
        let existing = self
            .get_meet(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meet {} not found", id)))?;

        let location = request.location.clone().or(existing.location);
        let description = request.description.clone().or(existing.description);
        let now = Utc::now().to_rfc3339();

        sqlx::query("UPDATE meets SET location = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(&location)
            .bind(&description)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;
        Ok(())
    }

    /// Set the meet phase.
    pub async fn set_meet_phase(&self, id: &str, phase: MeetPhase) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meets SET phase = ?, updated_at = ? WHERE id = ?")
            .bind(phase.as_str())
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;
        Ok(())
    }

    /// Set the selected book.
    pub async fn set_selected_book(&self, id: &str, book_id: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meets SET selected_book_id = ?, updated_at = ? WHERE id = ?")
            .bind(book_id)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;
        Ok(())
    }

    /// Snapshot a date option's datetime into the meet.
    pub async fn set_selected_date(&self, id: &str, date_time: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meets SET selected_date = ?, updated_at = ? WHERE id = ?")
            .bind(date_time)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;
        Ok(())
    }

    /// Mark voting points as revealed. Idempotent.
    pub async fn set_points_revealed(&self, id: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meets SET voting_points_revealed = 1, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;
        Ok(())
    }

    /// Delete a meet and all dependent rows in one transaction.
    pub async fn delete_meet(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM meet_date_votes WHERE date_option_id IN (SELECT id FROM meet_date_options WHERE meet_id = ?)"
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM meet_date_options WHERE meet_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM meet_candidate_votes WHERE meet_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM meet_candidates WHERE meet_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM meet_top5 WHERE meet_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM meets WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Meet {} not found", id)));
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    // ==================== CANDIDATE OPERATIONS ====================

    /// List candidates of a meet with book and member joins.
    pub async fn list_candidates(&self, meet_id: &str) -> Result<Vec<Candidate>, AppError> {
        let rows = sqlx::query(
            r#"SELECT c.id, c.meet_id, c.book_id, b.title AS book_title, b.author AS book_author,
                      c.motivation, c.added_by, u.username AS added_by_username
               FROM meet_candidates c
               LEFT JOIN books b ON c.book_id = b.id
               LEFT JOIN members u ON c.added_by = u.id
               WHERE c.meet_id = ?"#,
        )
        .bind(meet_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(candidate_from_row).collect())
    }

    /// Get a candidate of a meet by ID.
    pub async fn get_candidate(
        &self,
        meet_id: &str,
        candidate_id: &str,
    ) -> Result<Option<Candidate>, AppError> {
        let row = sqlx::query(
            r#"SELECT c.id, c.meet_id, c.book_id, b.title AS book_title, b.author AS book_author,
                      c.motivation, c.added_by, u.username AS added_by_username
               FROM meet_candidates c
               LEFT JOIN books b ON c.book_id = b.id
               LEFT JOIN members u ON c.added_by = u.id
               WHERE c.meet_id = ? AND c.id = ?"#,
        )
        .bind(meet_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(candidate_from_row))
    }

    /// Insert a candidate nomination and return its generated id.
    pub async fn insert_candidate(
        &self,
        meet_id: &str,
        book_id: &str,
        motivation: Option<&str>,
        added_by: &str,
    ) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO meet_candidates (id, meet_id, book_id, motivation, added_by) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(meet_id)
        .bind(book_id)
        .bind(motivation)
        .bind(added_by)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;
        Ok(id)
    }

    /// Delete a candidate and its votes.
    pub async fn delete_candidate(&self, candidate_id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM meet_candidate_votes WHERE candidate_id = ?")
            .bind(candidate_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM meet_candidates WHERE id = ?")
            .bind(candidate_id)
            .execute(&mut *tx)
            .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    // ==================== CANDIDATE VOTE OPERATIONS ====================

    /// Total points per candidate in a meet. Candidates without vote rows are
    /// absent here; callers must treat missing entries as 0.
    pub async fn candidate_point_totals(
        &self,
        meet_id: &str,
    ) -> Result<HashMap<String, i64>, AppError> {
        let rows = sqlx::query(
            "SELECT candidate_id, SUM(points) AS total FROM meet_candidate_votes WHERE meet_id = ? GROUP BY candidate_id"
        )
        .bind(meet_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| (r.get("candidate_id"), r.get("total")))
            .collect())
    }

    /// Members who have cast at least one vote row in a meet.
    pub async fn voted_member_ids(&self, meet_id: &str) -> Result<HashSet<String>, AppError> {
        let rows =
            sqlx::query("SELECT DISTINCT user_id FROM meet_candidate_votes WHERE meet_id = ?")
                .bind(meet_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.iter().map(|r| r.get("user_id")).collect())
    }

    /// A member's own vote rows in a meet.
    pub async fn my_votes(&self, meet_id: &str, member_id: &str) -> Result<Vec<MyVote>, AppError> {
        let rows = sqlx::query(
            "SELECT candidate_id, points FROM meet_candidate_votes WHERE meet_id = ? AND user_id = ?"
        )
        .bind(meet_id)
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| MyVote {
                candidate_id: r.get("candidate_id"),
                points: r.get("points"),
            })
            .collect())
    }

    /// Atomically replace a member's vote set for a meet. Zero-point
    /// allocations are not persisted.
    pub async fn replace_candidate_votes(
        &self,
        meet_id: &str,
        member_id: &str,
        votes: &[VoteAllocation],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM meet_candidate_votes WHERE meet_id = ? AND user_id = ?")
            .bind(meet_id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;

        for vote in votes {
            if vote.points > 0 {
                sqlx::query(
                    "INSERT INTO meet_candidate_votes (id, meet_id, candidate_id, user_id, points) VALUES (?, ?, ?, ?, ?)"
                )
                .bind(uuid::Uuid::new_v4().to_string())
                .bind(meet_id)
                .bind(&vote.candidate_id)
                .bind(member_id)
                .bind(vote.points)
                .execute(&mut *tx)
                .await?;
            }
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    // ==================== DATE OPTION OPERATIONS ====================

    /// List a meet's date options with their availability votes.
    pub async fn list_date_options(&self, meet_id: &str) -> Result<Vec<DateOption>, AppError> {
        let option_rows =
            sqlx::query("SELECT id, meet_id, date_time FROM meet_date_options WHERE meet_id = ?")
                .bind(meet_id)
                .fetch_all(&self.pool)
                .await?;

        let vote_rows = sqlx::query(
            r#"SELECT v.date_option_id, v.user_id, u.username, v.availability
               FROM meet_date_votes v
               LEFT JOIN members u ON v.user_id = u.id
               WHERE v.date_option_id IN (SELECT id FROM meet_date_options WHERE meet_id = ?)"#,
        )
        .bind(meet_id)
        .fetch_all(&self.pool)
        .await?;

        let mut votes_by_option: HashMap<String, Vec<DateVote>> = HashMap::new();
        for row in &vote_rows {
            let option_id: String = row.get("date_option_id");
            let availability: String = row.get("availability");
            let username: Option<String> = row.get("username");
            votes_by_option.entry(option_id).or_default().push(DateVote {
                member_id: row.get("user_id"),
                username: username.unwrap_or_default(),
                availability: Availability::from_str(&availability)
                    .unwrap_or(Availability::NoResponse),
            });
        }

        Ok(option_rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                let votes = votes_by_option.remove(&id).unwrap_or_default();
                DateOption {
                    id,
                    meet_id: row.get("meet_id"),
                    date_time: row.get("date_time"),
                    votes,
                }
            })
            .collect())
    }

    /// Get a date option row by ID.
    pub async fn get_date_option(&self, option_id: &str) -> Result<Option<DateOptionRow>, AppError> {
        let row = sqlx::query("SELECT id, meet_id, date_time FROM meet_date_options WHERE id = ?")
            .bind(option_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| DateOptionRow {
            id: r.get("id"),
            meet_id: r.get("meet_id"),
            date_time: r.get("date_time"),
        }))
    }

    /// Insert a date option.
    pub async fn insert_date_option(
        &self,
        meet_id: &str,
        date_time: &str,
    ) -> Result<DateOption, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO meet_date_options (id, meet_id, date_time) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(meet_id)
            .bind(date_time)
            .execute(&self.pool)
            .await?;

        self.increment_revision().await?;

        Ok(DateOption {
            id,
            meet_id: meet_id.to_string(),
            date_time: date_time.to_string(),
            votes: Vec::new(),
        })
    }

    /// Delete a date option and its votes. The meet's selected date is a
    /// snapshot and stays untouched.
    pub async fn delete_date_option(&self, option_id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM meet_date_votes WHERE date_option_id = ?")
            .bind(option_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM meet_date_options WHERE id = ?")
            .bind(option_id)
            .execute(&mut *tx)
            .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Upsert a member's availability votes in one transaction: one row per
    /// (option, member), later submissions overwrite.
    pub async fn upsert_date_votes(
        &self,
        member_id: &str,
        votes: &[AvailabilityVote],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for vote in votes {
            sqlx::query(
                r#"INSERT INTO meet_date_votes (id, date_option_id, user_id, availability)
                   VALUES (?, ?, ?, ?)
                   ON CONFLICT(date_option_id, user_id)
                   DO UPDATE SET availability = excluded.availability"#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&vote.date_option_id)
            .bind(member_id)
            .bind(vote.availability.as_str())
            .execute(&mut *tx)
            .await?;
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    // ==================== TOP 5 OPERATIONS ====================

    /// List a meet's Top 5 entries with member and book joins.
    pub async fn list_top5(&self, meet_id: &str) -> Result<Vec<Top5Entry>, AppError> {
        let rows = sqlx::query(
            r#"SELECT t.id, t.meet_id, t.user_id, u.username, t.book_id,
                      b.title AS book_title, b.author AS book_author, t.rank
               FROM meet_top5 t
               LEFT JOIN members u ON t.user_id = u.id
               LEFT JOIN books b ON t.book_id = b.id
               WHERE t.meet_id = ?
               ORDER BY u.username, t.rank"#,
        )
        .bind(meet_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(top5_from_row).collect())
    }

    /// Every Top 5 entry across all meets, reduced for aggregation.
    pub async fn all_top5_entries(&self) -> Result<Vec<RankedBook>, AppError> {
        let rows = sqlx::query(
            r#"SELECT t.book_id, b.title AS book_title, b.author AS book_author, t.rank
               FROM meet_top5 t
               LEFT JOIN books b ON t.book_id = b.id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                let title: Option<String> = r.get("book_title");
                let author: Option<String> = r.get("book_author");
                RankedBook {
                    book_id: r.get("book_id"),
                    book_title: title.unwrap_or_default(),
                    book_author: author.unwrap_or_default(),
                    rank: r.get("rank"),
                }
            })
            .collect())
    }

    /// Atomically replace a member's Top 5 entries for a meet.
    pub async fn replace_top5(
        &self,
        meet_id: &str,
        member_id: &str,
        entries: &[Top5Submission],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM meet_top5 WHERE meet_id = ? AND user_id = ?")
            .bind(meet_id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                "INSERT INTO meet_top5 (id, meet_id, user_id, book_id, rank) VALUES (?, ?, ?, ?, ?)"
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(meet_id)
            .bind(member_id)
            .bind(&entry.book_id)
            .bind(entry.rank)
            .execute(&mut *tx)
            .await?;
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Bump the revision counter inside an open transaction.
async fn bump_revision(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(&now)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn meet_select(suffix: &str) -> String {
    format!(
        r#"SELECT m.id, m.host_id, u.username AS host_username, m.phase, m.selected_book_id,
                  b.title AS selected_book_title, m.selected_date, m.location, m.description,
                  m.voting_points_revealed, m.created_at, m.updated_at
           FROM meets m
           LEFT JOIN members u ON m.host_id = u.id
           LEFT JOIN books b ON m.selected_book_id = b.id
           {}"#,
        suffix
    )
}

// Helper functions for row conversion

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Member {
    let is_admin: i32 = row.get("is_admin");
    let is_temporary: i32 = row.get("is_temporary");
    Member {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        is_admin: is_admin != 0,
        is_temporary: is_temporary != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn book_from_row(row: &sqlx::sqlite::SqliteRow) -> Book {
    let added_by_username: Option<String> = row.get("added_by_username");
    Book {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        year: row.get("year"),
        country: row.get("country"),
        original_language: row.get("original_language"),
        book_type: row.get("type"),
        introduction: row.get("introduction"),
        added_by: row.get("added_by"),
        added_by_username: added_by_username.unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        is_read: false,
        candidate_count: 0,
    }
}

fn meet_from_row(row: &sqlx::sqlite::SqliteRow) -> Meet {
    let phase: String = row.get("phase");
    let revealed: i32 = row.get("voting_points_revealed");
    let host_username: Option<String> = row.get("host_username");
    let host_username = host_username.unwrap_or_default();
    let selected_book_title: Option<String> = row.get("selected_book_title");
    let label = meet_label(&host_username, selected_book_title.as_deref());

    Meet {
        id: row.get("id"),
        host_id: row.get("host_id"),
        host_username,
        phase: MeetPhase::from_str(&phase).unwrap_or(MeetPhase::Draft),
        selected_book_id: row.get("selected_book_id"),
        selected_book_title,
        selected_date: row.get("selected_date"),
        location: row.get("location"),
        description: row.get("description"),
        voting_points_revealed: revealed != 0,
        label,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn meet_summary_from_row(row: &sqlx::sqlite::SqliteRow) -> MeetSummary {
    let phase: String = row.get("phase");
    let host_username: Option<String> = row.get("host_username");
    let selected_book_title: Option<String> = row.get("selected_book_title");
    MeetSummary {
        id: row.get("id"),
        label: meet_label(
            &host_username.unwrap_or_default(),
            selected_book_title.as_deref(),
        ),
        phase: MeetPhase::from_str(&phase).unwrap_or(MeetPhase::Draft),
        selected_date: row.get("selected_date"),
    }
}

fn candidate_from_row(row: &sqlx::sqlite::SqliteRow) -> Candidate {
    let book_title: Option<String> = row.get("book_title");
    let book_author: Option<String> = row.get("book_author");
    let added_by_username: Option<String> = row.get("added_by_username");
    Candidate {
        id: row.get("id"),
        meet_id: row.get("meet_id"),
        book_id: row.get("book_id"),
        book_title: book_title.unwrap_or_default(),
        book_author: book_author.unwrap_or_default(),
        motivation: row.get("motivation"),
        added_by: row.get("added_by"),
        added_by_username: added_by_username.unwrap_or_default(),
        already_selected_in_meet: false,
        points: None,
    }
}

fn top5_from_row(row: &sqlx::sqlite::SqliteRow) -> Top5Entry {
    let username: Option<String> = row.get("username");
    let book_title: Option<String> = row.get("book_title");
    let book_author: Option<String> = row.get("book_author");
    Top5Entry {
        id: row.get("id"),
        meet_id: row.get("meet_id"),
        member_id: row.get("user_id"),
        username: username.unwrap_or_default(),
        book_id: row.get("book_id"),
        book_title: book_title.unwrap_or_default(),
        book_author: book_author.unwrap_or_default(),
        rank: row.get("rank"),
    }
}
