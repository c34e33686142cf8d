//! Integration tests for the Reading Circle backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::models::CreateMemberRequest;
use crate::{create_router, AppState};

/// Test fixture for integration tests. Seeds an admin, a host, and a plain
/// member so requests can act under different privilege levels.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    admin_id: String,
    host_id: String,
    member_id: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Seed the roster
        let admin = repo
            .create_member(&CreateMemberRequest {
                username: "admin".to_string(),
                email: None,
                is_admin: true,
                is_temporary: false,
            })
            .await
            .expect("Failed to seed admin");
        let host = repo
            .create_member(&CreateMemberRequest {
                username: "host".to_string(),
                email: None,
                is_admin: false,
                is_temporary: false,
            })
            .await
            .expect("Failed to seed host");
        let member = repo
            .create_member(&CreateMemberRequest {
                username: "carol".to_string(),
                email: None,
                is_admin: false,
                is_temporary: false,
            })
            .await
            .expect("Failed to seed member");

        // Create config
        let config = Config {
            api_psk: Some("test-api-key".to_string()),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let state = AppState {
            repo: repo.clone(),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-api-key", "test-api-key".parse().unwrap());

        TestFixture {
            client: Client::builder().default_headers(headers).build().unwrap(),
            base_url,
            repo,
            admin_id: admin.id,
            host_id: host.id,
            member_id: member.id,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_as(&self, actor: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("x-member-id", actor)
            .send()
            .await
            .unwrap()
    }

    async fn post_as(&self, actor: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("x-member-id", actor)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn put_as(&self, actor: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .header("x-member-id", actor)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn delete_as(&self, actor: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .header("x-member-id", actor)
            .send()
            .await
            .unwrap()
    }

    /// Create a book as the given member and return its id.
    async fn create_book(&self, actor: &str, title: &str) -> String {
        let resp = self
            .post_as(
                actor,
                "/api/books",
                json!({ "title": title, "author": "Test Author" }),
            )
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Create a draft meet hosted by `host_id` and return its id.
    async fn create_meet(&self) -> String {
        let resp = self
            .post_as(&self.host_id, "/api/meets", json!({}))
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Nominate a book for a meet (as host) and return the candidate id.
    async fn add_candidate(&self, meet_id: &str, book_id: &str) -> String {
        let resp = self
            .post_as(
                &self.host_id,
                &format!("/api/meets/{}/candidates", meet_id),
                json!({ "bookId": book_id }),
            )
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Transition a meet's phase as host, asserting success.
    async fn set_phase(&self, meet_id: &str, phase: &str) {
        let resp = self
            .post_as(
                &self.host_id,
                &format!("/api/meets/{}/phase", meet_id),
                json!({ "phase": phase }),
            )
            .await;
        assert_eq!(resp.status(), 200, "phase change to {} failed", phase);
    }

    async fn meet_detail(&self, actor: &str, meet_id: &str) -> Value {
        let resp = self.get_as(actor, &format!("/api/meets/{}", meet_id)).await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    /// A meet in voting phase with two candidates. Returns
    /// (meet_id, candidate1_id, book1_id, candidate2_id, book2_id).
    async fn voting_meet(&self) -> (String, String, String, String, String) {
        let book1 = self.create_book(&self.member_id, "First Book").await;
        let book2 = self.create_book(&self.member_id, "Second Book").await;
        let meet = self.create_meet().await;
        let cand1 = self.add_candidate(&meet, &book1).await;
        let cand2 = self.add_candidate(&meet, &book2).await;
        self.set_phase(&meet, "voting").await;
        (meet, cand1, book1, cand2, book2)
    }

    /// A meet in reading phase with a selected book and date. Returns
    /// (meet_id, book_id).
    async fn reading_meet(&self, title: &str) -> (String, String) {
        let book = self.create_book(&self.member_id, title).await;
        let meet = self.create_meet().await;
        self.add_candidate(&meet, &book).await;

        let resp = self
            .post_as(
                &self.host_id,
                &format!("/api/meets/{}/select-book", meet),
                json!({ "bookId": book }),
            )
            .await;
        assert_eq!(resp.status(), 200);

        let option_resp = self
            .post_as(
                &self.host_id,
                &format!("/api/meets/{}/date-options", meet),
                json!({ "dateTime": "2026-09-01T18:00:00Z" }),
            )
            .await;
        assert_eq!(option_resp.status(), 200);
        let option_body: Value = option_resp.json().await.unwrap();
        let option_id = option_body["data"]["id"].as_str().unwrap();

        let date_resp = self
            .post_as(
                &self.host_id,
                &format!("/api/meets/{}/select-date", meet),
                json!({ "dateOptionId": option_id }),
            )
            .await;
        assert_eq!(date_resp.status(), 200);

        self.set_phase(&meet, "reading").await;
        (meet, book)
    }
}

async fn body_of(resp: reqwest::Response) -> Value {
    resp.json().await.unwrap()
}

// ==================== AUTH ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::new().await;

    // Bare client without the default x-api-key header
    let resp = Client::new()
        .get(fixture.url("/api/books"))
        .header("x-member-id", &fixture.member_id)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body = body_of(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/books"))
        .header("x-api-key", "wrong-key")
        .header("x-member-id", &fixture.member_id)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_auth_unknown_member() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get_as("no-such-member", "/api/books").await;
    assert_eq!(resp.status(), 401);
    let body = body_of(resp).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

// ==================== META ====================

#[tokio::test]
async fn test_revision_and_config() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/revision"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = body_of(resp).await;
    assert_eq!(body["success"], true);
    assert!(body["data"]["revisionId"].is_number());

    let config_resp = fixture
        .client
        .get(fixture.url("/api/config"))
        .send()
        .await
        .unwrap();
    let config_body = body_of(config_resp).await;
    assert_eq!(config_body["data"]["votingPointsTotal"], 15);
}

#[tokio::test]
async fn test_revision_increments_on_writes() {
    let fixture = TestFixture::new().await;

    let initial = body_of(
        fixture
            .client
            .get(fixture.url("/api/revision"))
            .send()
            .await
            .unwrap(),
    )
    .await["data"]["revisionId"]
        .as_i64()
        .unwrap();

    let resp = fixture
        .post_as(
            &fixture.member_id,
            "/api/books",
            json!({ "title": "Revision Test", "author": "A" }),
        )
        .await;
    let body = body_of(resp).await;
    assert_eq!(body["revisionId"].as_i64().unwrap(), initial + 1);
}

// ==================== MEMBERS ====================

#[tokio::test]
async fn test_member_create_requires_admin() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post_as(
            &fixture.member_id,
            "/api/members",
            json!({ "username": "newbie" }),
        )
        .await;
    assert_eq!(resp.status(), 403);
    let body = body_of(resp).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let admin_resp = fixture
        .post_as(
            &fixture.admin_id,
            "/api/members",
            json!({ "username": "newbie" }),
        )
        .await;
    assert_eq!(admin_resp.status(), 200);
    let admin_body = body_of(admin_resp).await;
    assert_eq!(admin_body["data"]["username"], "newbie");
    assert_eq!(admin_body["data"]["isAdmin"], false);
}

// ==================== BOOKS ====================

#[tokio::test]
async fn test_book_crud() {
    let fixture = TestFixture::new().await;

    let create_resp = fixture
        .post_as(
            &fixture.member_id,
            "/api/books",
            json!({
                "title": "The Master and Margarita",
                "author": "Mikhail Bulgakov",
                "year": "1967",
                "country": "Russia"
            }),
        )
        .await;
    assert_eq!(create_resp.status(), 200);
    let create_body = body_of(create_resp).await;
    let book_id = create_body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(create_body["data"]["addedByUsername"], "carol");
    assert_eq!(create_body["data"]["isRead"], false);

    // Detail includes empty meet references
    let get_resp = fixture
        .get_as(&fixture.member_id, &format!("/api/books/{}", book_id))
        .await;
    assert_eq!(get_resp.status(), 200);
    let get_body = body_of(get_resp).await;
    assert_eq!(get_body["data"]["title"], "The Master and Margarita");
    assert_eq!(get_body["data"]["selectedInMeets"].as_array().unwrap().len(), 0);

    // Creator may update
    let update_resp = fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/books/{}", book_id),
            json!({ "introduction": "A devilish satire." }),
        )
        .await;
    assert_eq!(update_resp.status(), 200);

    // Another non-admin member may not
    let forbidden_resp = fixture
        .put_as(
            &fixture.host_id,
            &format!("/api/books/{}", book_id),
            json!({ "title": "Hijacked" }),
        )
        .await;
    assert_eq!(forbidden_resp.status(), 403);

    // Creator may delete while the book is unused
    let delete_resp = fixture
        .delete_as(&fixture.member_id, &format!("/api/books/{}", book_id))
        .await;
    assert_eq!(delete_resp.status(), 200);

    let gone_resp = fixture
        .get_as(&fixture.member_id, &format!("/api/books/{}", book_id))
        .await;
    assert_eq!(gone_resp.status(), 404);
}

#[tokio::test]
async fn test_book_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post_as(
            &fixture.member_id,
            "/api/books",
            json!({ "title": "", "author": "Someone" }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    let body = body_of(resp).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_book_delete_blocked_when_in_use() {
    let fixture = TestFixture::new().await;

    let book_id = fixture
        .create_book(&fixture.member_id, "Nominated Book")
        .await;
    let meet_id = fixture.create_meet().await;
    fixture.add_candidate(&meet_id, &book_id).await;

    let resp = fixture
        .delete_as(&fixture.member_id, &format!("/api/books/{}", book_id))
        .await;
    assert_eq!(resp.status(), 400);
    let body = body_of(resp).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_book_import_admin_only() {
    let fixture = TestFixture::new().await;

    let rows = json!({
        "books": [
            { "title": "Good Row", "author": "Author" },
            { "title": "", "author": "Missing Title" }
        ]
    });

    let denied = fixture
        .post_as(&fixture.member_id, "/api/books/import", rows.clone())
        .await;
    assert_eq!(denied.status(), 403);

    let resp = fixture
        .post_as(&fixture.admin_id, "/api/books/import", rows)
        .await;
    assert_eq!(resp.status(), 200);
    let body = body_of(resp).await;
    assert_eq!(body["data"]["imported"], 1);
    let errors = body["data"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["row"], 2);
}

// ==================== MEETS ====================

#[tokio::test]
async fn test_meet_create_and_update() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post_as(
            &fixture.host_id,
            "/api/meets",
            json!({ "location": "Library" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body = body_of(resp).await;
    let meet_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["phase"], "draft");
    assert_eq!(body["data"]["hostUsername"], "host");
    assert_eq!(body["data"]["label"], "Draft Meet by host");
    assert_eq!(body["data"]["votingPointsRevealed"], false);

    // Non-host cannot update meet info
    let denied = fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}", meet_id),
            json!({ "location": "My place" }),
        )
        .await;
    assert_eq!(denied.status(), 403);

    // Host can
    let updated = fixture
        .put_as(
            &fixture.host_id,
            &format!("/api/meets/{}", meet_id),
            json!({ "location": "Cafe", "description": "Bring snacks" }),
        )
        .await;
    assert_eq!(updated.status(), 200);
    let updated_body = body_of(updated).await;
    assert_eq!(updated_body["data"]["location"], "Cafe");
}

#[tokio::test]
async fn test_meet_delete_cascades() {
    let fixture = TestFixture::new().await;

    let (meet_id, cand1, _, _, _) = fixture.voting_meet().await;
    fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/votes", meet_id),
            json!({ "votes": [{ "candidateId": cand1, "points": 15 }] }),
        )
        .await;

    let resp = fixture
        .delete_as(&fixture.host_id, &format!("/api/meets/{}", meet_id))
        .await;
    assert_eq!(resp.status(), 200);

    let gone = fixture
        .get_as(&fixture.member_id, &format!("/api/meets/{}", meet_id))
        .await;
    assert_eq!(gone.status(), 404);
}

// ==================== PHASE TRANSITIONS ====================

#[tokio::test]
async fn test_phase_transition_rules() {
    let fixture = TestFixture::new().await;

    let meet_id = fixture.create_meet().await;

    // draft -> completed is not legal
    let resp = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/phase", meet_id),
            json!({ "phase": "completed" }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    let body = body_of(resp).await;
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    // draft -> voting is, but not for a plain member
    let denied = fixture
        .post_as(
            &fixture.member_id,
            &format!("/api/meets/{}/phase", meet_id),
            json!({ "phase": "voting" }),
        )
        .await;
    assert_eq!(denied.status(), 403);

    fixture.set_phase(&meet_id, "voting").await;

    // voting -> draft never goes back
    let back = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/phase", meet_id),
            json!({ "phase": "draft" }),
        )
        .await;
    assert_eq!(back.status(), 400);

    // cancelled is terminal
    fixture.set_phase(&meet_id, "cancelled").await;
    let from_terminal = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/phase", meet_id),
            json!({ "phase": "voting" }),
        )
        .await;
    assert_eq!(from_terminal.status(), 400);
    let terminal_body = body_of(from_terminal).await;
    assert_eq!(terminal_body["error"]["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_reading_requires_book_then_date() {
    let fixture = TestFixture::new().await;

    let book_id = fixture
        .create_book(&fixture.member_id, "Precondition Book")
        .await;
    let meet_id = fixture.create_meet().await;
    fixture.add_candidate(&meet_id, &book_id).await;

    let option_resp = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/date-options", meet_id),
            json!({ "dateTime": "2026-09-15T19:00:00Z" }),
        )
        .await;
    let option_id = body_of(option_resp).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Neither book nor date: the book complaint comes first
    let no_book = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/phase", meet_id),
            json!({ "phase": "reading" }),
        )
        .await;
    assert_eq!(no_book.status(), 400);
    let no_book_body = body_of(no_book).await;
    assert_eq!(no_book_body["error"]["code"], "PRECONDITION_FAILED");
    assert!(no_book_body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("book"));

    // Book selected, date still missing
    fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/select-book", meet_id),
            json!({ "bookId": book_id }),
        )
        .await;
    let no_date = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/phase", meet_id),
            json!({ "phase": "reading" }),
        )
        .await;
    assert_eq!(no_date.status(), 400);
    let no_date_body = body_of(no_date).await;
    assert!(no_date_body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("date"));

    // Both set: transition succeeds
    fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/select-date", meet_id),
            json!({ "dateOptionId": option_id }),
        )
        .await;
    fixture.set_phase(&meet_id, "reading").await;

    let detail = fixture.meet_detail(&fixture.member_id, &meet_id).await;
    assert_eq!(detail["phase"], "reading");
}

// ==================== CANDIDATES & SELECTION ====================

#[tokio::test]
async fn test_candidates_draft_only() {
    let fixture = TestFixture::new().await;

    let (meet_id, _, _, _, _) = fixture.voting_meet().await;
    let late_book = fixture
        .create_book(&fixture.member_id, "Too Late")
        .await;

    let resp = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/candidates", meet_id),
            json!({ "bookId": late_book }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    let body = body_of(resp).await;
    assert_eq!(body["error"]["code"], "INVALID_PHASE");
}

#[tokio::test]
async fn test_draft_selection_single_candidate() {
    let fixture = TestFixture::new().await;

    let book_id = fixture
        .create_book(&fixture.member_id, "Sole Candidate")
        .await;
    let other_book = fixture
        .create_book(&fixture.member_id, "Never Nominated")
        .await;
    let meet_id = fixture.create_meet().await;
    fixture.add_candidate(&meet_id, &book_id).await;

    // A book that isn't the sole candidate is rejected
    let wrong = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/select-book", meet_id),
            json!({ "bookId": other_book }),
        )
        .await;
    assert_eq!(wrong.status(), 400);
    let wrong_body = body_of(wrong).await;
    assert_eq!(wrong_body["error"]["code"], "INVALID_SELECTION");

    // The sole candidate selects fine
    let resp = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/select-book", meet_id),
            json!({ "bookId": book_id }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body = body_of(resp).await;
    assert_eq!(body["data"]["selectedBookId"], book_id);

    let detail = fixture.meet_detail(&fixture.member_id, &meet_id).await;
    assert_eq!(detail["selectedBookId"], book_id);
    assert_eq!(detail["label"], "Sole Candidate at host");
}

#[tokio::test]
async fn test_draft_selection_rejected_with_multiple_candidates() {
    let fixture = TestFixture::new().await;

    let book1 = fixture.create_book(&fixture.member_id, "Book One").await;
    let book2 = fixture.create_book(&fixture.member_id, "Book Two").await;
    let meet_id = fixture.create_meet().await;
    fixture.add_candidate(&meet_id, &book1).await;
    fixture.add_candidate(&meet_id, &book2).await;

    // Two candidates in draft mean voting, never direct selection
    for book in [&book1, &book2] {
        let resp = fixture
            .post_as(
                &fixture.host_id,
                &format!("/api/meets/{}/select-book", meet_id),
                json!({ "bookId": book }),
            )
            .await;
        assert_eq!(resp.status(), 400);
        let body = body_of(resp).await;
        assert_eq!(body["error"]["code"], "INVALID_SELECTION");
    }
}

#[tokio::test]
async fn test_selection_requires_reveal() {
    let fixture = TestFixture::new().await;

    let (meet_id, cand1, book1, cand2, book2) = fixture.voting_meet().await;

    fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/votes", meet_id),
            json!({ "votes": [
                { "candidateId": cand1, "points": 10 },
                { "candidateId": cand2, "points": 5 }
            ] }),
        )
        .await;

    // Selection before reveal is blocked
    let early = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/select-book", meet_id),
            json!({ "bookId": book1 }),
        )
        .await;
    assert_eq!(early.status(), 400);
    let early_body = body_of(early).await;
    assert_eq!(early_body["error"]["code"], "INVALID_STATE");

    let reveal = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/reveal", meet_id),
            json!({}),
        )
        .await;
    assert_eq!(reveal.status(), 200);

    // The runner-up is still not selectable
    let runner_up = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/select-book", meet_id),
            json!({ "bookId": book2 }),
        )
        .await;
    assert_eq!(runner_up.status(), 400);
    let runner_up_body = body_of(runner_up).await;
    assert_eq!(runner_up_body["error"]["code"], "INVALID_SELECTION");

    // The top scorer is
    let top = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/select-book", meet_id),
            json!({ "bookId": book1 }),
        )
        .await;
    assert_eq!(top.status(), 200);
}

#[tokio::test]
async fn test_tied_candidates_both_selectable() {
    let fixture = TestFixture::new().await;

    let (meet_id, cand1, _book1, cand2, book2) = fixture.voting_meet().await;

    // Two voters produce a 15-15 tie
    fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/votes", meet_id),
            json!({ "votes": [{ "candidateId": cand1, "points": 15 }] }),
        )
        .await;
    fixture
        .put_as(
            &fixture.admin_id,
            &format!("/api/meets/{}/votes", meet_id),
            json!({ "votes": [{ "candidateId": cand2, "points": 15 }] }),
        )
        .await;

    fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/reveal", meet_id),
            json!({}),
        )
        .await;

    // The host breaks the tie with either book
    let resp = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/select-book", meet_id),
            json!({ "bookId": book2 }),
        )
        .await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_resolve_tie_is_unrestricted() {
    let fixture = TestFixture::new().await;

    let (meet_id, _, _, _, _) = fixture.voting_meet().await;
    let outsider = fixture
        .create_book(&fixture.member_id, "Outsider Book")
        .await;

    // resolve-tie bypasses reveal and candidate membership entirely
    let resp = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/resolve-tie", meet_id),
            json!({ "bookId": outsider }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body = body_of(resp).await;
    assert_eq!(body["data"]["selectedBookId"], outsider);

    // But never for a plain member
    let denied = fixture
        .post_as(
            &fixture.member_id,
            &format!("/api/meets/{}/resolve-tie", meet_id),
            json!({ "bookId": outsider }),
        )
        .await;
    assert_eq!(denied.status(), 403);
}

// ==================== POINT VOTING ====================

#[tokio::test]
async fn test_vote_allocation_must_sum_to_budget() {
    let fixture = TestFixture::new().await;

    let (meet_id, cand1, _, cand2, _) = fixture.voting_meet().await;

    let resp = fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/votes", meet_id),
            json!({ "votes": [
                { "candidateId": cand1, "points": 7 },
                { "candidateId": cand2, "points": 5 }
            ] }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    let body = body_of(resp).await;
    assert_eq!(body["error"]["code"], "INVALID_ALLOCATION");

    // The failed submission left no vote rows behind
    let detail = fixture.meet_detail(&fixture.member_id, &meet_id).await;
    let status = detail["voteStatus"].as_array().unwrap();
    let mine = status
        .iter()
        .find(|s| s["memberId"] == fixture.member_id.as_str())
        .unwrap();
    assert_eq!(mine["hasVoted"], false);
}

#[tokio::test]
async fn test_vote_rejects_unknown_candidate_and_negatives() {
    let fixture = TestFixture::new().await;

    let (meet_id, cand1, _, _, _) = fixture.voting_meet().await;

    let unknown = fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/votes", meet_id),
            json!({ "votes": [{ "candidateId": "bogus", "points": 15 }] }),
        )
        .await;
    assert_eq!(unknown.status(), 404);

    let negative = fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/votes", meet_id),
            json!({ "votes": [
                { "candidateId": cand1, "points": 20 },
                { "candidateId": cand1, "points": -5 }
            ] }),
        )
        .await;
    assert_eq!(negative.status(), 400);
}

#[tokio::test]
async fn test_vote_resubmission_replaces() {
    let fixture = TestFixture::new().await;

    let (meet_id, cand1, _, cand2, _) = fixture.voting_meet().await;
    let votes_url = format!("/api/meets/{}/votes", meet_id);

    fixture
        .put_as(
            &fixture.member_id,
            &votes_url,
            json!({ "votes": [
                { "candidateId": cand1, "points": 10 },
                { "candidateId": cand2, "points": 5 }
            ] }),
        )
        .await;

    // Resubmission replaces wholesale; zero-point rows disappear
    let resp = fixture
        .put_as(
            &fixture.member_id,
            &votes_url,
            json!({ "votes": [
                { "candidateId": cand1, "points": 0 },
                { "candidateId": cand2, "points": 15 }
            ] }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let detail = fixture.meet_detail(&fixture.member_id, &meet_id).await;
    let my_votes = detail["myVotes"].as_array().unwrap();
    assert_eq!(my_votes.len(), 1);
    assert_eq!(my_votes[0]["candidateId"], cand2);
    assert_eq!(my_votes[0]["points"], 15);
}

#[tokio::test]
async fn test_points_hidden_until_reveal() {
    let fixture = TestFixture::new().await;

    let (meet_id, cand1, _, cand2, _) = fixture.voting_meet().await;

    fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/votes", meet_id),
            json!({ "votes": [
                { "candidateId": cand1, "points": 12 },
                { "candidateId": cand2, "points": 3 }
            ] }),
        )
        .await;

    // Before reveal: vote status visible, points absent
    let detail = fixture.meet_detail(&fixture.member_id, &meet_id).await;
    for candidate in detail["candidates"].as_array().unwrap() {
        assert!(candidate.get("points").is_none() || candidate["points"].is_null());
    }

    // Only host/admin may reveal
    let denied = fixture
        .post_as(
            &fixture.member_id,
            &format!("/api/meets/{}/reveal", meet_id),
            json!({}),
        )
        .await;
    assert_eq!(denied.status(), 403);

    fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/reveal", meet_id),
            json!({}),
        )
        .await;

    // After reveal: every candidate has a total, zero included
    let detail = fixture.meet_detail(&fixture.member_id, &meet_id).await;
    let candidates = detail["candidates"].as_array().unwrap();
    let c1 = candidates.iter().find(|c| c["id"] == cand1.as_str()).unwrap();
    let c2 = candidates.iter().find(|c| c["id"] == cand2.as_str()).unwrap();
    assert_eq!(c1["points"], 12);
    assert_eq!(c2["points"], 3);
    assert_eq!(detail["votingPointsRevealed"], true);
}

#[tokio::test]
async fn test_vote_status_roster_excludes_guests() {
    let fixture = TestFixture::new().await;

    // A temporary guest is not part of the voting roster
    fixture
        .repo
        .create_member(&CreateMemberRequest {
            username: "guest".to_string(),
            email: None,
            is_admin: false,
            is_temporary: true,
        })
        .await
        .unwrap();

    let (meet_id, _, _, _, _) = fixture.voting_meet().await;

    let resp = fixture
        .get_as(
            &fixture.member_id,
            &format!("/api/meets/{}/vote-status", meet_id),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body = body_of(resp).await;
    let status = body["data"].as_array().unwrap();
    assert_eq!(status.len(), 3);
    assert!(status.iter().all(|s| s["username"] != "guest"));
}

// ==================== DATE POLLING ====================

#[tokio::test]
async fn test_availability_upsert() {
    let fixture = TestFixture::new().await;

    let book = fixture.create_book(&fixture.member_id, "Dated Book").await;
    let meet_id = fixture.create_meet().await;
    fixture.add_candidate(&meet_id, &book).await;

    let option_resp = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/date-options", meet_id),
            json!({ "dateTime": "2026-10-01T18:00:00Z" }),
        )
        .await;
    let option_id = body_of(option_resp).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Availability voting only opens in the voting phase
    let early = fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/availability", meet_id),
            json!({ "votes": [{ "dateOptionId": option_id, "availability": "available" }] }),
        )
        .await;
    assert_eq!(early.status(), 400);

    fixture.set_phase(&meet_id, "voting").await;

    fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/availability", meet_id),
            json!({ "votes": [{ "dateOptionId": option_id, "availability": "available" }] }),
        )
        .await;

    // Resubmitting for the same option overwrites, not duplicates
    fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/availability", meet_id),
            json!({ "votes": [{ "dateOptionId": option_id, "availability": "maybe" }] }),
        )
        .await;

    let detail = fixture.meet_detail(&fixture.member_id, &meet_id).await;
    let options = detail["dateOptions"].as_array().unwrap();
    let votes = options[0]["votes"].as_array().unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0]["availability"], "maybe");
    assert_eq!(votes[0]["username"], "carol");
}

#[tokio::test]
async fn test_availability_rejects_foreign_option() {
    let fixture = TestFixture::new().await;

    // Option belongs to another meet
    let other_meet = fixture.create_meet().await;
    let option_resp = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/date-options", other_meet),
            json!({ "dateTime": "2026-10-02T18:00:00Z" }),
        )
        .await;
    let foreign_option = body_of(option_resp).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (meet_id, _, _, _, _) = fixture.voting_meet().await;

    let resp = fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/availability", meet_id),
            json!({ "votes": [{ "dateOptionId": foreign_option, "availability": "available" }] }),
        )
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_selected_date_is_a_snapshot() {
    let fixture = TestFixture::new().await;

    let meet_id = fixture.create_meet().await;
    let option_resp = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/date-options", meet_id),
            json!({ "dateTime": "2026-11-05T18:00:00Z" }),
        )
        .await;
    let option_id = body_of(option_resp).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let select_resp = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/select-date", meet_id),
            json!({ "dateOptionId": option_id }),
        )
        .await;
    assert_eq!(select_resp.status(), 200);
    let select_body = body_of(select_resp).await;
    assert_eq!(select_body["data"]["selectedDate"], "2026-11-05T18:00:00Z");

    // Deleting the option afterwards leaves the snapshot in place
    let delete_resp = fixture
        .delete_as(
            &fixture.host_id,
            &format!("/api/meets/{}/date-options/{}", meet_id, option_id),
        )
        .await;
    assert_eq!(delete_resp.status(), 200);

    let detail = fixture.meet_detail(&fixture.member_id, &meet_id).await;
    assert_eq!(detail["selectedDate"], "2026-11-05T18:00:00Z");
    assert_eq!(detail["dateOptions"].as_array().unwrap().len(), 0);
}

// ==================== TOP 5 ====================

#[tokio::test]
async fn test_top5_eligibility_and_limits() {
    let fixture = TestFixture::new().await;

    let (meet_id, book_id) = fixture.reading_meet("Current Read").await;
    let never_read = fixture
        .create_book(&fixture.member_id, "Never Read")
        .await;
    let top5_url = format!("/api/meets/{}/top5", meet_id);

    // A book that was never selected anywhere is not eligible
    let ineligible = fixture
        .put_as(
            &fixture.member_id,
            &top5_url,
            json!({ "entries": [{ "bookId": never_read, "rank": 1 }] }),
        )
        .await;
    assert_eq!(ineligible.status(), 400);

    // Rank outside 1..=5 is rejected
    let bad_rank = fixture
        .put_as(
            &fixture.member_id,
            &top5_url,
            json!({ "entries": [{ "bookId": book_id, "rank": 6 }] }),
        )
        .await;
    assert_eq!(bad_rank.status(), 400);

    // With a single eligible book, at most one entry is allowed
    let too_many = fixture
        .put_as(
            &fixture.member_id,
            &top5_url,
            json!({ "entries": [
                { "bookId": book_id, "rank": 1 },
                { "bookId": book_id, "rank": 2 }
            ] }),
        )
        .await;
    assert_eq!(too_many.status(), 400);

    // The meet's own book is eligible while it is being read
    let ok = fixture
        .put_as(
            &fixture.member_id,
            &top5_url,
            json!({ "entries": [{ "bookId": book_id, "rank": 1 }] }),
        )
        .await;
    assert_eq!(ok.status(), 200);

    let entries_resp = fixture.get_as(&fixture.member_id, &top5_url).await;
    let entries_body = body_of(entries_resp).await;
    let entries = entries_body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[0]["username"], "carol");
}

#[tokio::test]
async fn test_top5_phase_gate() {
    let fixture = TestFixture::new().await;

    let book = fixture.create_book(&fixture.member_id, "Draft Book").await;
    let meet_id = fixture.create_meet().await;
    fixture.add_candidate(&meet_id, &book).await;

    let resp = fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/top5", meet_id),
            json!({ "entries": [{ "bookId": book, "rank": 1 }] }),
        )
        .await;
    assert_eq!(resp.status(), 400);
    let body = body_of(resp).await;
    assert_eq!(body["error"]["code"], "INVALID_PHASE");
}

#[tokio::test]
async fn test_aggregate_ranking() {
    let fixture = TestFixture::new().await;

    // Two completed meets, two selected books
    let (meet1, book1) = fixture.reading_meet("Alpha Read").await;
    fixture.set_phase(&meet1, "completed").await;
    let (meet2, book2) = fixture.reading_meet("Beta Read").await;
    fixture.set_phase(&meet2, "completed").await;

    // carol: book1 rank 1, book2 rank 2; admin: book1 rank 2
    fixture
        .put_as(
            &fixture.member_id,
            &format!("/api/meets/{}/top5", meet1),
            json!({ "entries": [
                { "bookId": book1, "rank": 1 },
                { "bookId": book2, "rank": 2 }
            ] }),
        )
        .await;
    fixture
        .put_as(
            &fixture.admin_id,
            &format!("/api/meets/{}/top5", meet2),
            json!({ "entries": [{ "bookId": book1, "rank": 2 }] }),
        )
        .await;

    let resp = fixture.get_as(&fixture.member_id, "/api/rankings").await;
    assert_eq!(resp.status(), 200);
    let body = body_of(resp).await;
    let ranking = body["data"].as_array().unwrap();
    assert_eq!(ranking.len(), 2);

    // book1: 5 + 4 = 9 points over two lists; book2: 4 points over one
    assert_eq!(ranking[0]["bookId"], book1);
    assert_eq!(ranking[0]["totalPoints"], 9);
    assert_eq!(ranking[0]["appearances"], 2);
    assert_eq!(ranking[1]["bookId"], book2);
    assert_eq!(ranking[1]["totalPoints"], 4);
    assert_eq!(ranking[1]["appearances"], 1);
}

#[tokio::test]
async fn test_top5_resubmission_replaces() {
    let fixture = TestFixture::new().await;

    let (meet1, book1) = fixture.reading_meet("First Read").await;
    fixture.set_phase(&meet1, "completed").await;
    let (meet2, book2) = fixture.reading_meet("Second Read").await;
    let top5_url = format!("/api/meets/{}/top5", meet2);

    fixture
        .put_as(
            &fixture.member_id,
            &top5_url,
            json!({ "entries": [
                { "bookId": book1, "rank": 1 },
                { "bookId": book2, "rank": 2 }
            ] }),
        )
        .await;

    // The new set replaces the old wholesale
    fixture
        .put_as(
            &fixture.member_id,
            &top5_url,
            json!({ "entries": [{ "bookId": book2, "rank": 1 }] }),
        )
        .await;

    let resp = fixture.get_as(&fixture.member_id, &top5_url).await;
    let body = body_of(resp).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["bookId"], book2);
    assert_eq!(entries[0]["rank"], 1);
}

// ==================== BOOK ENRICHMENT ====================

#[tokio::test]
async fn test_book_read_flag_and_candidate_count() {
    let fixture = TestFixture::new().await;

    let (meet_id, book_id) = fixture.reading_meet("Finished Book").await;

    // Still reading: not yet marked read
    let before = fixture.get_as(&fixture.member_id, "/api/books").await;
    let before_body = body_of(before).await;
    let book = before_body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["id"] == book_id.as_str())
        .unwrap()
        .clone();
    assert_eq!(book["isRead"], false);
    assert_eq!(book["candidateCount"], 1);

    fixture.set_phase(&meet_id, "completed").await;

    let after = fixture.get_as(&fixture.member_id, "/api/books").await;
    let after_body = body_of(after).await;
    let book = after_body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["id"] == book_id.as_str())
        .unwrap()
        .clone();
    assert_eq!(book["isRead"], true);

    // Detail payload lists the meet under selectedInMeets
    let detail_resp = fixture
        .get_as(&fixture.member_id, &format!("/api/books/{}", book_id))
        .await;
    let detail_body = body_of(detail_resp).await;
    let selected_in = detail_body["data"]["selectedInMeets"].as_array().unwrap();
    assert_eq!(selected_in.len(), 1);
    assert_eq!(selected_in[0]["id"], meet_id.as_str());
}

#[tokio::test]
async fn test_candidate_reuse_warning() {
    let fixture = TestFixture::new().await;

    // Finish a meet with the book
    let (meet1, book_id) = fixture.reading_meet("Re-read Candidate").await;
    fixture.set_phase(&meet1, "completed").await;

    // Nominating it again warns about the earlier read
    let meet2 = fixture.create_meet().await;
    let resp = fixture
        .post_as(
            &fixture.host_id,
            &format!("/api/meets/{}/candidates", meet2),
            json!({ "bookId": book_id }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body = body_of(resp).await;
    assert_eq!(body["data"]["alreadySelectedInMeet"], true);
}
