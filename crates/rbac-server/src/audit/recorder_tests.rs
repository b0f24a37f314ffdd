//! Recorder behaviour against in-memory sinks and loaders
//!
//! Writes are simulated through [`AuditedDb`] with closures standing in for
//! SQL, so none of these tests need a database.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use std::sync::{Arc, Mutex};

use super::{
    models::{AuditAction, NewAuditEntry},
    recorder::AuditRecorder,
    sink::AuditSink,
};
use crate::{
    context::AuditContext,
    db::{
        AuditedDb, DbError, DbResult, LoadScope, PriorStateLoader, WriteKind, WriteStatement,
    },
    models::{Role, User, UserRole},
};

#[derive(Default)]
struct MemorySink {
    entries: Mutex<Vec<NewAuditEntry>>,
}

impl MemorySink {
    fn entries(&self) -> Vec<NewAuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn append(&self, entry: NewAuditEntry) -> DbResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Sink whose connection is gone
struct BrokenSink;

#[async_trait]
impl AuditSink for BrokenSink {
    async fn append(&self, _entry: NewAuditEntry) -> DbResult<()> {
        Err(DbError::Sqlx(sqlx::Error::PoolClosed))
    }
}

/// Loader serving fixed states per scope and remembering what was asked
#[derive(Default)]
struct FixedLoader {
    live: Option<JsonValue>,
    unscoped: Option<JsonValue>,
    fail: bool,
    calls: Mutex<Vec<(i64, LoadScope)>>,
}

#[async_trait]
impl PriorStateLoader for FixedLoader {
    async fn load(&self, id: i64, scope: LoadScope) -> Result<Option<JsonValue>, sqlx::Error> {
        self.calls.lock().unwrap().push((id, scope));
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(match scope {
            LoadScope::Live => self.live.clone(),
            LoadScope::Unscoped => self.unscoped.clone(),
        })
    }
}

fn lazy_pool() -> PgPool {
    sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/rbac_unused")
        .unwrap()
}

fn audited(sink: Arc<dyn AuditSink>) -> AuditedDb {
    AuditedDb::new(lazy_pool()).with_interceptor(Arc::new(AuditRecorder::new(sink)))
}

fn role(id: i64, name: &str) -> Role {
    Role {
        id,
        name: name.to_string(),
        display_name: format!("{} role", name),
        description: String::new(),
        status: 1,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
    }
}

fn parse(values: &str) -> JsonValue {
    serde_json::from_str(values).unwrap()
}

#[tokio::test]
async fn test_create_update_delete_lifecycle() {
    let sink = Arc::new(MemorySink::default());
    let db = audited(sink.clone());
    let ctx = AuditContext::new(Some(5), Some("203.0.113.9".to_string()));

    // create {name: "A"} -> id 7
    let created: Option<Role> = db
        .create(&ctx, WriteStatement::for_entity::<Role>(WriteKind::Create), || async {
            Ok(Some(role(7, "A")))
        })
        .await
        .unwrap();
    assert_eq!(created.unwrap().id, 7);

    // update name A -> B
    let before_update = Arc::new(FixedLoader {
        live: Some(serde_json::to_value(role(7, "A")).unwrap()),
        ..Default::default()
    });
    let statement = WriteStatement::for_entity::<Role>(WriteKind::Update)
        .param(7)
        .loader(before_update.clone());
    let _: Option<Role> = db
        .update(&ctx, statement, || async { Ok(Some(role(7, "B"))) })
        .await
        .unwrap();
    assert_eq!(*before_update.calls.lock().unwrap(), vec![(7, LoadScope::Live)]);

    // delete id 7
    let before_delete = Arc::new(FixedLoader {
        live: Some(serde_json::to_value(role(7, "B")).unwrap()),
        ..Default::default()
    });
    let statement = WriteStatement::for_entity::<Role>(WriteKind::Delete)
        .param(7)
        .loader(before_delete);
    let _: Option<Role> = db
        .delete(&ctx, statement, || async {
            let mut deleted = role(7, "B");
            deleted.deleted_at = Some(Utc::now());
            Ok(Some(deleted))
        })
        .await
        .unwrap();

    let entries = sink.entries();
    assert_eq!(entries.len(), 3);

    let create = &entries[0];
    assert_eq!(create.action, AuditAction::Create);
    assert_eq!(create.table_name, "roles");
    assert_eq!(create.record_id, 7);
    assert_eq!(create.old_values, "");
    assert_eq!(parse(&create.new_values)["name"], "A");
    assert_eq!(create.user_id, 5);
    assert_eq!(create.ip, "203.0.113.9");

    let update = &entries[1];
    assert_eq!(update.action, AuditAction::Update);
    assert_eq!(update.record_id, 7);
    assert_eq!(parse(&update.old_values)["name"], "A");
    assert_eq!(parse(&update.new_values)["name"], "B");

    let delete = &entries[2];
    assert_eq!(delete.action, AuditAction::Delete);
    assert_eq!(delete.record_id, 7);
    assert_eq!(parse(&delete.old_values)["name"], "B");
    assert_eq!(delete.new_values, "");
}

#[tokio::test]
async fn test_audit_table_is_never_audited() {
    let sink = Arc::new(MemorySink::default());
    let db = audited(sink.clone());
    let ctx = AuditContext::system();
    let loader = Arc::new(FixedLoader::default());

    let statement = WriteStatement::new("audit_logs", WriteKind::Create).param(1);
    let _: Option<Role> = db
        .create(&ctx, statement, || async { Ok(Some(role(1, "x"))) })
        .await
        .unwrap();

    let statement = WriteStatement::new("audit_logs", WriteKind::Delete)
        .param(1)
        .loader(loader.clone());
    let _: Option<Role> = db
        .delete(&ctx, statement, || async { Ok(Some(role(1, "x"))) })
        .await
        .unwrap();

    assert!(sink.entries().is_empty());
    assert!(loader.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unresolvable_record_is_skipped() {
    let sink = Arc::new(MemorySink::default());
    let db = audited(sink.clone());
    let ctx = AuditContext::system();

    let created: Option<Role> = db
        .create(&ctx, WriteStatement::for_entity::<Role>(WriteKind::Create), || async {
            Ok(Some(role(0, "zero")))
        })
        .await
        .unwrap();

    assert!(created.is_some());
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn test_excluded_fields_never_recorded() {
    let sink = Arc::new(MemorySink::default());
    let db = audited(sink.clone());
    let ctx = AuditContext::system();

    let user = User {
        id: 3,
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password_hash: "$2b$04$secret".to_string(),
        nickname: None,
        status: 1,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: Some(Utc::now()),
    };
    let loader = Arc::new(FixedLoader {
        live: Some(json!({"id": 3, "username": "alice", "password": "plain", "deleted_at": null})),
        ..Default::default()
    });

    let statement = WriteStatement::for_entity::<User>(WriteKind::Update)
        .param(3)
        .loader(loader);
    let _: Option<User> = db
        .update(&ctx, statement, move || async move { Ok(Some(user)) })
        .await
        .unwrap();

    let entry = &sink.entries()[0];
    for values in [&entry.old_values, &entry.new_values] {
        let state = parse(values);
        assert_eq!(state["username"], "alice");
        assert!(state.get("password").is_none());
        assert!(state.get("password_hash").is_none());
        assert!(state.get("deleted_at").is_none());
    }
    assert!(parse(&entry.new_values).get("nickname").unwrap().is_null());
}

#[tokio::test]
async fn test_sink_failure_does_not_fail_write() {
    let db = audited(Arc::new(BrokenSink));
    let ctx = AuditContext::system();

    let result: Result<Option<Role>, _> = db
        .create(&ctx, WriteStatement::for_entity::<Role>(WriteKind::Create), || async {
            Ok(Some(role(8, "kept")))
        })
        .await;

    assert_eq!(result.unwrap().unwrap().name, "kept");
}

#[tokio::test]
async fn test_prior_state_lookup_failure_degrades_to_empty() {
    let sink = Arc::new(MemorySink::default());
    let db = audited(sink.clone());
    let ctx = AuditContext::system();
    let loader = Arc::new(FixedLoader {
        fail: true,
        ..Default::default()
    });

    let statement = WriteStatement::for_entity::<Role>(WriteKind::Update)
        .param(4)
        .loader(loader.clone());
    let _: Option<Role> = db
        .update(&ctx, statement, || async { Ok(Some(role(4, "after"))) })
        .await
        .unwrap();

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].old_values, "");
    assert_eq!(parse(&entries[0].new_values)["name"], "after");
    // Staging failed, so the after hook tried the unscoped reload too
    assert_eq!(
        *loader.calls.lock().unwrap(),
        vec![(4, LoadScope::Live), (4, LoadScope::Unscoped)]
    );
}

#[tokio::test]
async fn test_missing_prior_state_falls_back_to_unscoped_reload() {
    let sink = Arc::new(MemorySink::default());
    let db = audited(sink.clone());
    let ctx = AuditContext::system();
    let loader = Arc::new(FixedLoader {
        live: None,
        unscoped: Some(json!({"id": 6, "name": "soft-deleted"})),
        ..Default::default()
    });

    let statement = WriteStatement::for_entity::<Role>(WriteKind::Update)
        .param(6)
        .loader(loader);
    let _: Option<Role> = db
        .update(&ctx, statement, || async { Ok(Some(role(6, "restored"))) })
        .await
        .unwrap();

    let entry = &sink.entries()[0];
    assert_eq!(parse(&entry.old_values)["name"], "soft-deleted");
}

#[tokio::test]
async fn test_untouched_update_is_not_audited() {
    let sink = Arc::new(MemorySink::default());
    let db = audited(sink.clone());
    let ctx = AuditContext::system();

    let statement = WriteStatement::for_entity::<Role>(WriteKind::Update).param(99);
    let out: Option<Role> = db.update(&ctx, statement, || async { Ok(None) }).await.unwrap();

    assert!(out.is_none());
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn test_collection_write_uses_bound_owner_id() {
    let sink = Arc::new(MemorySink::default());
    let db = audited(sink.clone());
    let ctx = AuditContext::new(Some(1), None);

    let rows = vec![
        UserRole {
            id: 31,
            user_id: 12,
            role_id: 2,
            created_at: Utc::now(),
        },
        UserRole {
            id: 32,
            user_id: 12,
            role_id: 3,
            created_at: Utc::now(),
        },
    ];
    let statement = WriteStatement::for_entity::<UserRole>(WriteKind::Create).params([12, 2, 3]);
    let _: Vec<UserRole> = db
        .create(&ctx, statement, move || async move { Ok(rows) })
        .await
        .unwrap();

    let entry = &sink.entries()[0];
    assert_eq!(entry.table_name, "user_roles");
    assert_eq!(entry.record_id, 12);
    assert_eq!(entry.ip, "");

    let state = parse(&entry.new_values);
    let rows = state.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["role_id"], 2);
    assert_eq!(rows[1]["role_id"], 3);
}

#[test]
fn test_record_id_resolution_order() {
    let statement = WriteStatement::new("roles", WriteKind::Update)
        .primary_key(3)
        .params([9])
        .record(json!({"id": 11}));
    assert_eq!(AuditRecorder::resolve_record_id(&statement), Some(3));

    let statement = WriteStatement::new("roles", WriteKind::Update)
        .primary_key(0)
        .params([0, -2, 9, 10])
        .record(json!({"id": 11}));
    assert_eq!(AuditRecorder::resolve_record_id(&statement), Some(9));

    let statement = WriteStatement::new("roles", WriteKind::Update).record(json!({"id": 11}));
    assert_eq!(AuditRecorder::resolve_record_id(&statement), Some(11));

    let statement = WriteStatement::new("roles", WriteKind::Update)
        .primary_key(-1)
        .record(json!({"id": 0}));
    assert_eq!(AuditRecorder::resolve_record_id(&statement), None);
}
