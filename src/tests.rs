//! Integration tests for the FaithConnect backup backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    pool: SqlitePool,
    snapshot_dir: std::path::PathBuf,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::build(None).await
    }

    async fn with_backup_key(key: &str) -> Self {
        Self::build(Some(key.to_string())).await
    }

    async fn build(backup_key: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let snapshot_dir = temp_dir.path().join("snapshots");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool.clone()));

        // Create config
        let config = Config {
            api_psk: Some("test-api-key".to_string()),
            db_path,
            snapshot_dir: snapshot_dir.clone(),
            backup_key,
            backup_interval_minutes: None,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let state = AppState {
            repo,
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
        let client = Client::builder().default_headers(headers).build().unwrap();

        TestFixture {
            client,
            base_url,
            pool,
            snapshot_dir,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a restore payload for a tenant and return the response body.
    async fn restore(&self, tenant: i64, payload: &Value) -> Value {
        let resp = self
            .client
            .post(self.url(&format!("/api/backup/restore?tenantId={}", tenant)))
            .json(payload)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    /// GET an export for a tenant and return the snapshot data.
    async fn export(&self, tenant: Option<i64>) -> Value {
        let url = match tenant {
            Some(t) => self.url(&format!("/api/backup/export?tenantId={}", t)),
            None => self.url("/api/backup/export"),
        };
        let resp = self.client.get(url).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }
}

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

    // Request without API key
    let client = Client::new();
    let resp = client
        .get(fixture.url("/api/backup/snapshots"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_restore_requires_tenant() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/backup/restore"))
        .json(&json!({ "members": [] }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_restore_creates_then_updates_same_member() {
    let fixture = TestFixture::new().await;

    let payload = json!({
        "members": [{ "firstName": "Jane", "lastName": "Doe" }]
    });

    // First restore into an empty tenant creates exactly one member
    let first = fixture.restore(1, &payload).await;
    assert_eq!(first["success"], true);
    assert_eq!(first["data"]["counts"]["members"], 1);

    // Restoring the identical payload again reconciles the same member
    let second = fixture.restore(1, &payload).await;
    assert_eq!(second["data"]["counts"]["members"], 1);

    let snapshot = fixture.export(Some(1)).await;
    let members = snapshot["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["firstName"], "Jane");
}

#[tokio::test]
async fn test_member_natural_key_collapses_across_restores() {
    let fixture = TestFixture::new().await;

    fixture
        .restore(
            1,
            &json!({
                "members": [{ "firstName": "Ann", "lastName": "Lee", "dob": "1990-04-01" }]
            }),
        )
        .await;
    fixture
        .restore(
            1,
            &json!({
                "members": [{
                    "firstName": "Ann",
                    "lastName": "Lee",
                    "dob": "1990-04-01",
                    "phone": "555-0101"
                }]
            }),
        )
        .await;

    let snapshot = fixture.export(Some(1)).await;
    let members = snapshot["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    // Mutable descriptive fields are refreshed on the matched row
    assert_eq!(members[0]["phone"], "555-0101");
}

#[tokio::test]
async fn test_restore_forces_requesting_tenant() {
    let fixture = TestFixture::new().await;

    // Payload rows claim tenant 99; the restore targets tenant 1
    fixture
        .restore(
            1,
            &json!({
                "members": [{ "tenantId": 99, "firstName": "Jane", "lastName": "Doe" }]
            }),
        )
        .await;

    let tenant_1 = fixture.export(Some(1)).await;
    assert_eq!(tenant_1["members"].as_array().unwrap().len(), 1);
    assert_eq!(tenant_1["members"][0]["tenantId"], 1);

    let tenant_99 = fixture.export(Some(99)).await;
    assert_eq!(tenant_99["members"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_export_restore_round_trip() {
    let fixture = TestFixture::new().await;

    fixture
        .restore(
            1,
            &json!({
                "departments": [
                    { "id": 10, "name": "Choir" },
                    { "id": 11, "name": "Ushering" }
                ],
                "members": [
                    { "firstName": "Jane", "lastName": "Doe" },
                    { "firstName": "John", "lastName": "Smith" }
                ],
                "events": [
                    { "title": "Spring Retreat", "date": "2025-05-01", "departmentId": 10 }
                ]
            }),
        )
        .await;

    // Export tenant 1 and replay it into an empty tenant
    let exported = fixture.export(Some(1)).await;
    let summary = fixture.restore(2, &exported).await;
    assert_eq!(summary["data"]["counts"]["members"], 2);
    assert_eq!(summary["data"]["counts"]["departments"], 2);
    assert_eq!(summary["data"]["counts"]["events"], 1);

    let replica = fixture.export(Some(2)).await;
    assert_eq!(replica["members"].as_array().unwrap().len(), 2);
    assert_eq!(replica["departments"].as_array().unwrap().len(), 2);
    assert_eq!(replica["events"].as_array().unwrap().len(), 1);

    // The event's department reference was remapped onto the replica's rows
    let resp = fixture
        .client
        .get(fixture.url("/api/backup/consistency?tenantId=2"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["issues"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_users_reconcile_before_members() {
    let fixture = TestFixture::new().await;

    // The member links to the payload user id; the live id is assigned fresh
    let summary = fixture
        .restore(
            1,
            &json!({
                "users": [{ "id": 7, "email": "jane@example.com", "name": "Jane Doe" }],
                "members": [{ "userId": 7, "firstName": "Jane", "lastName": "Doe" }]
            }),
        )
        .await;
    assert_eq!(summary["data"]["counts"]["users"], 1);
    assert_eq!(summary["data"]["counts"]["members"], 1);

    let snapshot = fixture.export(Some(1)).await;
    let user_id = snapshot["users"][0]["id"].as_i64().unwrap();
    assert_eq!(snapshot["members"][0]["userId"].as_i64().unwrap(), user_id);

    // The link resolves, so the validator stays clean
    let resp = fixture
        .client
        .get(fixture.url("/api/backup/consistency?tenantId=1"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["issues"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_council_links_remap_and_upsert() {
    let fixture = TestFixture::new().await;

    let payload = json!({
        "members": [{ "id": 5, "firstName": "Ann", "lastName": "Lee" }],
        "councils": [{
            "name": "Elders",
            "year": 2025,
            "members": [{ "memberId": 5, "role": "chair" }]
        }]
    });

    fixture.restore(1, &payload).await;
    // Second run must not duplicate the join row
    fixture.restore(1, &payload).await;

    let snapshot = fixture.export(Some(1)).await;
    let councils = snapshot["councils"].as_array().unwrap();
    assert_eq!(councils.len(), 1);
    assert_eq!(councils[0]["members"].as_array().unwrap().len(), 1);

    let resp = fixture
        .client
        .get(fixture.url("/api/backup/consistency?tenantId=1"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["issues"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_announcements_match_but_never_update() {
    let fixture = TestFixture::new().await;

    fixture
        .restore(
            1,
            &json!({
                "announcements": [{
                    "title": "Service moved",
                    "createdAt": "2025-01-05T09:00:00Z",
                    "body": "original wording"
                }]
            }),
        )
        .await;
    let second = fixture
        .restore(
            1,
            &json!({
                "announcements": [{
                    "title": "Service moved",
                    "createdAt": "2025-01-05T09:00:00Z",
                    "body": "tampered wording"
                }]
            }),
        )
        .await;

    // The match is counted but the stored body is untouched
    assert_eq!(second["data"]["counts"]["announcements"], 1);
    let snapshot = fixture.export(Some(1)).await;
    let announcements = snapshot["announcements"].as_array().unwrap();
    assert_eq!(announcements.len(), 1);
    assert_eq!(announcements[0]["body"], "original wording");
}

#[tokio::test]
async fn test_dry_run_reports_skips_and_commits_nothing() {
    let fixture = TestFixture::new().await;

    let body = fixture
        .restore(
            1,
            &json!({
                "members": [
                    { "firstName": "Jane", "lastName": "Doe" },
                    { "firstName": "Bob" }
                ]
            }),
        )
        .await;
    // Without dry-run the malformed row is dropped silently
    assert_eq!(body["data"]["counts"]["members"], 1);
    assert!(body["data"]["skipped"].is_null());

    let fixture = TestFixture::new().await;
    let resp = fixture
        .client
        .post(fixture.url("/api/backup/restore?tenantId=1&dryRun=true"))
        .json(&json!({
            "members": [
                { "firstName": "Jane", "lastName": "Doe" },
                { "firstName": "Bob" }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["data"]["dryRun"], true);
    assert_eq!(body["data"]["counts"]["members"], 1);
    let skipped = body["data"]["skipped"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["collection"], "members");
    assert_eq!(skipped[0]["index"], 1);

    // The transaction rolled back: nothing was written
    let snapshot = fixture.export(Some(1)).await;
    assert_eq!(snapshot["members"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_absent_collections_are_skipped() {
    let fixture = TestFixture::new().await;

    let body = fixture
        .restore(1, &json!({ "settings": [{ "key": "locale", "value": "ko" }] }))
        .await;

    let counts = body["data"]["counts"].as_object().unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts["settings"], 1);
}

#[tokio::test]
async fn test_export_includes_all_collections() {
    let fixture = TestFixture::new().await;

    let snapshot = fixture.export(Some(1)).await;
    assert_eq!(snapshot["meta"]["version"], "1.0");
    assert!(snapshot["meta"]["createdAt"].is_string());

    for collection in [
        "settings",
        "users",
        "members",
        "departments",
        "events",
        "announcements",
        "sermons",
        "financeRecords",
        "attendanceRecords",
        "councils",
        "committees",
        "boardMinutes",
        "businessMinutes",
        "programs",
        "cellGroups",
        "cellGroupMemberships",
    ] {
        assert!(
            snapshot[collection].is_array(),
            "missing collection {}",
            collection
        );
    }
}

#[tokio::test]
async fn test_validator_detects_dangling_user_link() {
    let fixture = TestFixture::new().await;

    // A member pointing at a user id that was deleted out from under it
    sqlx::query(
        "INSERT INTO members (tenant_id, user_id, first_name, last_name) VALUES (1, 999, 'Jane', 'Doe')",
    )
    .execute(&fixture.pool)
    .await
    .unwrap();

    let resp = fixture
        .client
        .get(fixture.url("/api/backup/consistency?tenantId=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    let issues = body["data"]["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    let issue = issues[0].as_str().unwrap();
    assert!(issue.contains("member"), "unexpected issue: {}", issue);
    assert!(issue.contains("999"), "unexpected issue: {}", issue);
}

#[tokio::test]
async fn test_validator_detects_orphan_committee_link() {
    let fixture = TestFixture::new().await;

    sqlx::query("INSERT INTO committees (tenant_id, name) VALUES (1, 'Finance')")
        .execute(&fixture.pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO committee_members (committee_id, member_id) VALUES (1, 42)")
        .execute(&fixture.pool)
        .await
        .unwrap();

    let resp = fixture
        .client
        .get(fixture.url("/api/backup/consistency?tenantId=1"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();

    let issues = body["data"]["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].as_str().unwrap().contains("committee membership"));
}

#[tokio::test]
async fn test_persist_and_list_snapshots() {
    let fixture = TestFixture::new().await;

    fixture
        .restore(1, &json!({ "members": [{ "firstName": "Jane", "lastName": "Doe" }] }))
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/backup/export?tenantId=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let path = body["data"]["path"].as_str().unwrap().to_string();
    assert!(path.ends_with(".json"));
    assert!(body["data"]["sizeBytes"].as_u64().unwrap() > 0);

    let resp = fixture
        .client
        .get(fixture.url("/api/backup/snapshots"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let files = body["data"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["path"], path.as_str());
    assert!(files[0]["createdAt"].is_string());
}

#[tokio::test]
async fn test_snapshots_listed_newest_first() {
    let fixture = TestFixture::new().await;

    for _ in 0..3 {
        let resp = fixture
            .client
            .post(fixture.url("/api/backup/export"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    let resp = fixture
        .client
        .get(fixture.url("/api/backup/snapshots"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let files = body["data"].as_array().unwrap();
    assert_eq!(files.len(), 3);

    let stamps: Vec<&str> = files
        .iter()
        .map(|f| f["createdAt"].as_str().unwrap())
        .collect();
    let mut sorted = stamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(stamps, sorted);
}

#[tokio::test]
async fn test_encrypted_snapshot_format_and_recovery() {
    let fixture = TestFixture::with_backup_key("0123456789abcdef0123456789abcdef").await;

    fixture
        .restore(1, &json!({
            "users": [{ "id": 3, "email": "jane@example.com" }],
            "members": [{ "userId": 3, "firstName": "Jane", "lastName": "Doe" }]
        }))
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/backup/export?tenantId=1"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let path = body["data"]["path"].as_str().unwrap().to_string();
    assert!(path.ends_with(".fcbk"));

    // magic || nonce(12) || tag(16) || ciphertext
    let bytes = tokio::fs::read(&path).await.unwrap();
    assert_eq!(&bytes[..4], b"FCBK");
    assert!(bytes.len() >= 4 + 12 + 16);

    // Recovery decrypts the archive to find the member and restore the subset
    let resp = fixture
        .client
        .post(fixture.url("/api/backup/restore/member"))
        .json(&json!({ "name": "jane doe", "tenantId": 2, "strategy": "latest" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["sourceFile"], path.as_str());
    assert_eq!(body["data"]["summary"]["counts"]["members"], 1);

    let snapshot = fixture.export(Some(2)).await;
    assert_eq!(snapshot["members"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_restore_by_member_name_not_found() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/backup/restore/member"))
        .json(&json!({ "name": "Jane Doe", "tenantId": 1 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_restore_by_member_name_short_circuits_on_first_match() {
    let fixture = TestFixture::new().await;
    tokio::fs::create_dir_all(&fixture.snapshot_dir).await.unwrap();

    let with_jane = json!({
        "meta": { "createdAt": "2025-01-01T00:00:00Z", "version": "1.0" },
        "users": [],
        "members": [{ "firstName": "Jane", "lastName": "Doe" }],
        "departments": []
    });
    let without_jane = json!({
        "meta": { "createdAt": "2025-01-02T00:00:00Z", "version": "1.0" },
        "members": [{ "firstName": "John", "lastName": "Smith" }]
    });

    // Oldest file is the only one containing Jane; a corrupt file is skipped
    let oldest = fixture.snapshot_dir.join("snapshot-a.json");
    tokio::fs::write(&oldest, with_jane.to_string()).await.unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    tokio::fs::write(
        fixture.snapshot_dir.join("snapshot-b.json"),
        without_jane.to_string(),
    )
    .await
    .unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    tokio::fs::write(fixture.snapshot_dir.join("snapshot-c.json"), "{not json")
        .await
        .unwrap();

    let resp = fixture
        .client
        .post(fixture.url("/api/backup/restore/member"))
        .json(&json!({ "name": "Jane Doe", "tenantId": 1, "strategy": "latest" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    // The newest-first scan only matches in the oldest file
    assert_eq!(
        body["data"]["sourceFile"],
        oldest.display().to_string().as_str()
    );
    assert_eq!(body["data"]["summary"]["counts"]["members"], 1);
}

#[tokio::test]
async fn test_consistency_clean_on_empty_store() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/backup/consistency"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["issues"].as_array().unwrap().len(), 0);
}
