use serde::Deserialize;

use crate::{
    audit::{AuditAction, AuditQuery},
    features::shared::PaginationParams,
};

/// Query string of `GET /audit-logs`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogQueryParams {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub per_page: Option<i64>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub record_id: Option<i64>,
    #[serde(default)]
    pub action: Option<AuditAction>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl AuditLogQueryParams {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }

    pub fn to_query(&self) -> AuditQuery {
        let pagination = self.pagination();
        AuditQuery {
            table_name: self.table_name.clone().filter(|s| !s.is_empty()),
            record_id: self.record_id,
            action: self.action,
            user_id: self.user_id,
            limit: pagination.limit(),
            offset: pagination.offset(),
        }
    }
}

/// Query string of the per-record and per-user endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitParams {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_query() {
        let params = AuditLogQueryParams {
            page: Some(3),
            per_page: Some(10),
            table_name: Some("roles".to_string()),
            action: Some(AuditAction::Delete),
            ..Default::default()
        };
        let query = params.to_query();
        assert_eq!(query.limit, 10);
        assert_eq!(query.offset, 20);
        assert_eq!(query.table_name.as_deref(), Some("roles"));
        assert_eq!(query.action, Some(AuditAction::Delete));
    }

    #[test]
    fn test_empty_table_name_is_ignored() {
        let params = AuditLogQueryParams {
            table_name: Some(String::new()),
            ..Default::default()
        };
        assert!(params.to_query().table_name.is_none());
    }
}
