//! Book catalogue rules: derived read/candidate markers, edit and delete
//! guards, bulk import.

use crate::auth::Actor;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    Book, BookDetail, CreateBookRequest, ImportBooksRequest, ImportBooksResponse, ImportRowError,
    MeetPhase, UpdateBookRequest,
};

fn validate_book_fields(
    title: Option<&str>,
    author: Option<&str>,
    year: Option<&str>,
    country: Option<&str>,
    original_language: Option<&str>,
    introduction: Option<&str>,
) -> Result<(), AppError> {
    if let Some(title) = title {
        if title.trim().is_empty() || title.len() > 500 {
            return Err(AppError::Validation(
                "Title must be between 1 and 500 characters".to_string(),
            ));
        }
    }
    if let Some(author) = author {
        if author.trim().is_empty() || author.len() > 200 {
            return Err(AppError::Validation(
                "Author must be between 1 and 200 characters".to_string(),
            ));
        }
    }
    if year.is_some_and(|s| s.len() > 30) {
        return Err(AppError::Validation(
            "Year must be under 30 characters".to_string(),
        ));
    }
    if country.is_some_and(|s| s.len() > 50) {
        return Err(AppError::Validation(
            "Country must be under 50 characters".to_string(),
        ));
    }
    if original_language.is_some_and(|s| s.len() > 50) {
        return Err(AppError::Validation(
            "Original language must be under 50 characters".to_string(),
        ));
    }
    if introduction.is_some_and(|s| s.len() > 5000) {
        return Err(AppError::Validation(
            "Introduction must be under 5000 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_create(request: &CreateBookRequest) -> Result<(), AppError> {
    validate_book_fields(
        Some(&request.title),
        Some(&request.author),
        request.year.as_deref(),
        request.country.as_deref(),
        request.original_language.as_deref(),
        request.introduction.as_deref(),
    )
}

/// List all books with derived `isRead` and `candidateCount`.
pub async fn list_books(repo: &Repository) -> Result<Vec<Book>, AppError> {
    let mut books = repo.list_books().await?;
    let read_ids = repo.selected_book_ids_in_phase(MeetPhase::Completed).await?;
    let counts = repo.candidate_counts().await?;

    for book in &mut books {
        book.is_read = read_ids.contains(&book.id);
        book.candidate_count = counts.get(&book.id).copied().unwrap_or(0);
    }
    Ok(books)
}

/// Book detail: the enriched book plus the non-cancelled meets it appears in.
pub async fn get_book_detail(repo: &Repository, book_id: &str) -> Result<BookDetail, AppError> {
    let mut book = repo
        .get_book(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

    let read_ids = repo.selected_book_ids_in_phase(MeetPhase::Completed).await?;
    let counts = repo.candidate_counts().await?;
    book.is_read = read_ids.contains(&book.id);
    book.candidate_count = counts.get(&book.id).copied().unwrap_or(0);

    Ok(BookDetail {
        selected_in_meets: repo.meets_with_selected_book(book_id).await?,
        candidate_in_meets: repo.meets_with_candidate_book(book_id).await?,
        book,
    })
}

/// Add a book to the shared list. Any member may contribute.
pub async fn create_book(
    repo: &Repository,
    actor: &Actor,
    request: &CreateBookRequest,
) -> Result<Book, AppError> {
    validate_create(request)?;
    repo.create_book(request, &actor.id, &actor.username).await
}

/// Edit a book. Creator or admin only.
pub async fn update_book(
    repo: &Repository,
    actor: &Actor,
    book_id: &str,
    request: &UpdateBookRequest,
) -> Result<Book, AppError> {
    let book = repo
        .get_book(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

    if book.added_by != actor.id && !actor.is_admin {
        return Err(AppError::Forbidden(
            "Only the person who added this book or an admin can edit it".to_string(),
        ));
    }

    validate_book_fields(
        request.title.as_deref(),
        request.author.as_deref(),
        request.year.as_deref(),
        request.country.as_deref(),
        request.original_language.as_deref(),
        request.introduction.as_deref(),
    )?;

    repo.update_book(book_id, request).await
}

/// Delete a book. Creator or admin only, and never while the book is a
/// selected book or candidate in any meet, cancelled meets included.
pub async fn delete_book(repo: &Repository, actor: &Actor, book_id: &str) -> Result<(), AppError> {
    let book = repo
        .get_book(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

    if book.added_by != actor.id && !actor.is_admin {
        return Err(AppError::Forbidden(
            "Only the person who added this book or an admin can delete it".to_string(),
        ));
    }

    if repo.book_selected_in_any_meet(book_id).await? {
        return Err(AppError::Validation(
            "Cannot delete this book because it is selected in a Meet".to_string(),
        ));
    }
    if repo.book_candidate_in_any_meet(book_id).await? {
        return Err(AppError::Validation(
            "Cannot delete this book because it is a candidate in a Meet".to_string(),
        ));
    }

    repo.delete_book(book_id).await
}

/// Bulk import of pre-parsed book rows. Admin only; failed rows are reported
/// individually, the rest are imported.
pub async fn import_books(
    repo: &Repository,
    actor: &Actor,
    request: &ImportBooksRequest,
) -> Result<ImportBooksResponse, AppError> {
    if !actor.is_admin {
        return Err(AppError::Forbidden(
            "Only an admin can import books".to_string(),
        ));
    }

    let mut imported = 0;
    let mut errors = Vec::new();

    for (i, row) in request.books.iter().enumerate() {
        match validate_create(row) {
            Ok(()) => {
                repo.create_book(row, &actor.id, &actor.username).await?;
                imported += 1;
            }
            Err(e) => errors.push(ImportRowError {
                row: i + 1,
                error: e.message(),
            }),
        }
    }

    Ok(ImportBooksResponse { imported, errors })
}
