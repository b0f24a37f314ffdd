//! Database queries for audit logs

use sqlx::PgPool;
use tracing::debug;

use super::models::{
    AuditEntry, AuditQuery, NewAuditEntry, DEFAULT_AUDIT_QUERY_LIMIT, MAX_AUDIT_QUERY_LIMIT,
};
use crate::db::DbResult;

const AUDIT_COLUMNS: &str =
    "id, created_at, table_name, record_id, action, old_values, new_values, user_id, ip";

/// Insert a new audit entry
///
/// Runs on its own pool connection; never pass a business transaction here.
pub async fn create_audit_entry(pool: &PgPool, entry: &NewAuditEntry) -> DbResult<AuditEntry> {
    let record = sqlx::query_as::<_, AuditEntry>(&format!(
        r#"
        INSERT INTO audit_logs (
            table_name, record_id, action, old_values, new_values, user_id, ip
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        AUDIT_COLUMNS
    ))
    .bind(&entry.table_name)
    .bind(entry.record_id)
    .bind(entry.action.as_str())
    .bind(&entry.old_values)
    .bind(&entry.new_values)
    .bind(entry.user_id)
    .bind(&entry.ip)
    .fetch_one(pool)
    .await?;

    debug!(
        audit_id = record.id,
        action = %entry.action,
        table = %entry.table_name,
        record_id = entry.record_id,
        "Created audit log entry"
    );

    Ok(record)
}

/// WHERE clause for the filters set on `query`, with `$n` placeholders
fn filter_clause(query: &AuditQuery) -> (String, usize) {
    let mut bind_count = 1;
    let mut conditions = Vec::new();

    if query.table_name.is_some() {
        conditions.push(format!("table_name = ${}", bind_count));
        bind_count += 1;
    }
    if query.record_id.is_some() {
        conditions.push(format!("record_id = ${}", bind_count));
        bind_count += 1;
    }
    if query.action.is_some() {
        conditions.push(format!("action = ${}", bind_count));
        bind_count += 1;
    }
    if query.user_id.is_some() {
        conditions.push(format!("user_id = ${}", bind_count));
        bind_count += 1;
    }

    let mut clause = String::from(" WHERE 1=1");
    for condition in conditions {
        clause.push_str(" AND ");
        clause.push_str(&condition);
    }

    (clause, bind_count)
}

/// Query audit logs with filters, newest first
pub async fn query_audit_logs(pool: &PgPool, query: &AuditQuery) -> DbResult<Vec<AuditEntry>> {
    let limit = query.limit.clamp(1, MAX_AUDIT_QUERY_LIMIT);
    let (clause, bind_count) = filter_clause(query);

    let sql = format!(
        "SELECT {} FROM audit_logs{} ORDER BY id DESC LIMIT ${} OFFSET ${}",
        AUDIT_COLUMNS,
        clause,
        bind_count,
        bind_count + 1
    );

    let mut query_builder = sqlx::query_as::<_, AuditEntry>(&sql);

    // Bind parameters in order
    if let Some(ref table_name) = query.table_name {
        query_builder = query_builder.bind(table_name);
    }
    if let Some(record_id) = query.record_id {
        query_builder = query_builder.bind(record_id);
    }
    if let Some(action) = query.action {
        query_builder = query_builder.bind(action.as_str());
    }
    if let Some(user_id) = query.user_id {
        query_builder = query_builder.bind(user_id);
    }

    let records = query_builder
        .bind(limit)
        .bind(query.offset.max(0))
        .fetch_all(pool)
        .await?;

    debug!(count = records.len(), "Queried audit logs");

    Ok(records)
}

/// Count audit logs matching the filters of `query`
pub async fn count_audit_logs(pool: &PgPool, query: &AuditQuery) -> DbResult<i64> {
    let (clause, _) = filter_clause(query);
    let sql = format!("SELECT COUNT(*) FROM audit_logs{}", clause);

    let mut count_query = sqlx::query_scalar::<_, i64>(&sql);
    if let Some(ref table_name) = query.table_name {
        count_query = count_query.bind(table_name);
    }
    if let Some(record_id) = query.record_id {
        count_query = count_query.bind(record_id);
    }
    if let Some(action) = query.action {
        count_query = count_query.bind(action.as_str());
    }
    if let Some(user_id) = query.user_id {
        count_query = count_query.bind(user_id);
    }

    Ok(count_query.fetch_one(pool).await?)
}

/// Get the audit trail of one record, oldest first
pub async fn get_audit_trail(
    pool: &PgPool,
    table_name: &str,
    record_id: i64,
    limit: Option<i64>,
) -> DbResult<Vec<AuditEntry>> {
    let limit = limit
        .unwrap_or(DEFAULT_AUDIT_QUERY_LIMIT)
        .clamp(1, MAX_AUDIT_QUERY_LIMIT);

    let records = sqlx::query_as::<_, AuditEntry>(&format!(
        r#"
        SELECT {}
        FROM audit_logs
        WHERE table_name = $1 AND record_id = $2
        ORDER BY id ASC
        LIMIT $3
        "#,
        AUDIT_COLUMNS
    ))
    .bind(table_name)
    .bind(record_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    debug!(
        table = table_name,
        record_id,
        count = records.len(),
        "Retrieved audit trail"
    );

    Ok(records)
}

/// Get recent audit logs for a specific acting user
pub async fn get_user_audit_logs(
    pool: &PgPool,
    user_id: i64,
    limit: Option<i64>,
) -> DbResult<Vec<AuditEntry>> {
    query_audit_logs(
        pool,
        &AuditQuery {
            user_id: Some(user_id),
            limit: limit.unwrap_or(DEFAULT_AUDIT_QUERY_LIMIT),
            ..Default::default()
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::models::AuditAction;

    fn entry(table: &str, record_id: i64, action: AuditAction, user_id: i64) -> NewAuditEntry {
        NewAuditEntry {
            table_name: table.to_string(),
            record_id,
            action,
            old_values: String::new(),
            new_values: r#"{"name":"A"}"#.to_string(),
            user_id,
            ip: "127.0.0.1".to_string(),
        }
    }

    #[test]
    fn test_filter_clause_numbers_placeholders() {
        let query = AuditQuery {
            table_name: Some("roles".to_string()),
            action: Some(AuditAction::Delete),
            ..Default::default()
        };
        let (clause, next) = filter_clause(&query);
        assert_eq!(clause, " WHERE 1=1 AND table_name = $1 AND action = $2");
        assert_eq!(next, 3);

        let (clause, next) = filter_clause(&AuditQuery::default());
        assert_eq!(clause, " WHERE 1=1");
        assert_eq!(next, 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_create_audit_entry(pool: PgPool) -> sqlx::Result<()> {
        let created = create_audit_entry(&pool, &entry("roles", 7, AuditAction::Create, 3))
            .await
            .unwrap();

        assert!(created.id > 0);
        assert_eq!(created.action, "create");
        assert_eq!(created.table_name, "roles");
        assert_eq!(created.record_id, 7);
        assert_eq!(created.old_values, "");
        assert_eq!(created.ip, "127.0.0.1");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_query_audit_logs(pool: PgPool) -> sqlx::Result<()> {
        for i in 1..=5 {
            create_audit_entry(&pool, &entry("permissions", i, AuditAction::Create, 1))
                .await
                .unwrap();
        }
        create_audit_entry(&pool, &entry("roles", 1, AuditAction::Update, 2))
            .await
            .unwrap();

        let all = query_audit_logs(&pool, &AuditQuery::default()).await.unwrap();
        assert_eq!(all.len(), 6);
        assert!(all.windows(2).all(|w| w[0].id > w[1].id));

        let filtered = AuditQuery {
            table_name: Some("permissions".to_string()),
            limit: 2,
            ..Default::default()
        };
        let page = query_audit_logs(&pool, &filtered).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.iter().all(|e| e.table_name == "permissions"));
        assert_eq!(count_audit_logs(&pool, &filtered).await.unwrap(), 5);

        let by_user = get_user_audit_logs(&pool, 2, None).await.unwrap();
        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].action, "update");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_get_audit_trail(pool: PgPool) -> sqlx::Result<()> {
        for action in [AuditAction::Create, AuditAction::Update, AuditAction::Delete] {
            create_audit_entry(&pool, &entry("users", 9, action, 0)).await.unwrap();
        }
        create_audit_entry(&pool, &entry("users", 10, AuditAction::Create, 0))
            .await
            .unwrap();

        let trail = get_audit_trail(&pool, "users", 9, None).await.unwrap();
        let actions: Vec<_> = trail.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["create", "update", "delete"]);

        Ok(())
    }
}
