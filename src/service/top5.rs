//! The Top 5 aggregator: per-member ranked lists and the cross-meet
//! leaderboard.

use std::collections::HashMap;

use super::require_meet;
use crate::auth::Actor;
use crate::db::{RankedBook, Repository};
use crate::errors::AppError;
use crate::models::{AggregatedRanking, MeetPhase, SubmitTop5Request};

/// Submit a member's Top 5 for a meet. Allowed during reading or completed.
/// Every entry must reference a book selected in a completed or reading
/// meet; ranks are 1..=5 and distinct; the whole set replaces prior entries.
pub async fn submit_top5(
    repo: &Repository,
    actor: &Actor,
    meet_id: &str,
    request: &SubmitTop5Request,
) -> Result<(), AppError> {
    let meet = require_meet(repo, meet_id).await?;
    if meet.phase != MeetPhase::Reading && meet.phase != MeetPhase::Completed {
        return Err(AppError::InvalidPhase(
            "Top 5 can only be submitted during the reading or completed phase".to_string(),
        ));
    }

    // Eligible books: selected in completed meets, plus selected in meets
    // still being read (the current meet's own book included).
    let mut eligible = repo.selected_book_ids_in_phase(MeetPhase::Completed).await?;
    eligible.extend(repo.selected_book_ids_in_phase(MeetPhase::Reading).await?);

    let mut seen_ranks = std::collections::HashSet::new();
    for entry in &request.entries {
        if !eligible.contains(&entry.book_id) {
            return Err(AppError::Validation(
                "Only books that have been selected in completed or current meets can be in your Top 5"
                    .to_string(),
            ));
        }
        if entry.rank < 1 || entry.rank > 5 {
            return Err(AppError::Validation(
                "Rank must be between 1 and 5".to_string(),
            ));
        }
        if !seen_ranks.insert(entry.rank) {
            return Err(AppError::Validation(format!(
                "Rank {} is used more than once",
                entry.rank
            )));
        }
    }

    let max_entries = eligible.len().min(5);
    if request.entries.len() > max_entries {
        return Err(AppError::Validation(format!(
            "You can only select up to {} books",
            max_entries
        )));
    }

    repo.replace_top5(meet_id, &actor.id, &request.entries).await
}

/// Cross-meet leaderboard over every Top 5 entry.
pub async fn aggregate_ranking(repo: &Repository) -> Result<Vec<AggregatedRanking>, AppError> {
    let entries = repo.all_top5_entries().await?;
    Ok(score_entries(&entries))
}

/// Score and sort ranked entries: rank 1 earns 5 points down to rank 5
/// earning 1; totals summed per book, appearances counted. Sorted by total
/// points, then appearances, then title for a stable order.
fn score_entries(entries: &[RankedBook]) -> Vec<AggregatedRanking> {
    let mut by_book: HashMap<&str, AggregatedRanking> = HashMap::new();

    for entry in entries {
        let points = 6 - entry.rank;
        by_book
            .entry(entry.book_id.as_str())
            .and_modify(|agg| {
                agg.total_points += points;
                agg.appearances += 1;
            })
            .or_insert_with(|| AggregatedRanking {
                book_id: entry.book_id.clone(),
                book_title: entry.book_title.clone(),
                book_author: entry.book_author.clone(),
                total_points: points,
                appearances: 1,
            });
    }

    let mut result: Vec<AggregatedRanking> = by_book.into_values().collect();
    result.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then(b.appearances.cmp(&a.appearances))
            .then_with(|| a.book_title.cmp(&b.book_title))
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(book_id: &str, title: &str, rank: i64) -> RankedBook {
        RankedBook {
            book_id: book_id.to_string(),
            book_title: title.to_string(),
            book_author: "author".to_string(),
            rank,
        }
    }

    #[test]
    fn test_score_entries_points_and_appearances() {
        // memberA: book1 rank1, book2 rank2; memberB: book1 rank2
        let entries = vec![
            entry("book1", "One", 1),
            entry("book2", "Two", 2),
            entry("book1", "One", 2),
        ];

        let result = score_entries(&entries);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].book_id, "book1");
        assert_eq!(result[0].total_points, 9);
        assert_eq!(result[0].appearances, 2);
        assert_eq!(result[1].book_id, "book2");
        assert_eq!(result[1].total_points, 4);
        assert_eq!(result[1].appearances, 1);
    }

    #[test]
    fn test_score_entries_rank_weights() {
        let result = score_entries(&[entry("b", "B", 5)]);
        assert_eq!(result[0].total_points, 1);
        let result = score_entries(&[entry("b", "B", 1)]);
        assert_eq!(result[0].total_points, 5);
    }

    #[test]
    fn test_score_entries_tie_break_is_deterministic() {
        // Equal points and appearances: ordered by title.
        let entries = vec![entry("b2", "Beta", 3), entry("b1", "Alpha", 3)];
        let result = score_entries(&entries);
        assert_eq!(result[0].book_title, "Alpha");
        assert_eq!(result[1].book_title, "Beta");
    }

    #[test]
    fn test_score_entries_empty() {
        assert!(score_entries(&[]).is_empty());
    }
}
