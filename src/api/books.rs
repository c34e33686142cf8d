//! Book catalogue endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::auth::Actor;
use crate::models::{
    Book, BookDetail, CreateBookRequest, ImportBooksRequest, ImportBooksResponse,
    UpdateBookRequest,
};
use crate::service;
use crate::AppState;

/// GET /api/books - List all books with read/candidate enrichment.
pub async fn list_books(State(state): State<AppState>, _actor: Actor) -> ApiResult<Vec<Book>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::books::list_books(&state.repo).await {
        Ok(books) => success(books, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/books/{id} - Book detail with meet references.
pub async fn get_book(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<BookDetail> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::books::get_book_detail(&state.repo, &id).await {
        Ok(detail) => success(detail, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/books - Create a book.
pub async fn create_book(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateBookRequest>,
) -> ApiResult<Book> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::books::create_book(&state.repo, &actor, &request).await {
        Ok(book) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(book, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/books/{id} - Update a book (creator or admin).
pub async fn update_book(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(request): Json<UpdateBookRequest>,
) -> ApiResult<Book> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::books::update_book(&state.repo, &actor, &id, &request).await {
        Ok(book) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(book, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/books/{id} - Delete a book (creator or admin, never in use).
pub async fn delete_book(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::books::delete_book(&state.repo, &actor, &id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/books/import - Bulk import pre-parsed rows (admin only).
pub async fn import_books(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<ImportBooksRequest>,
) -> ApiResult<ImportBooksResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match service::books::import_books(&state.repo, &actor, &request).await {
        Ok(report) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(report, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
