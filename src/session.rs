//! Session state shared across tool calls.

use tokio::sync::Mutex;

use crate::error::DbResult;
use crate::models::{HistoryEntry, ResultSet};
use crate::registry::{Database, DatabaseRegistry};

#[derive(Default)]
struct SessionState {
    last_query: Option<String>,
    last_result: Option<ResultSet>,
    history: Vec<HistoryEntry>,
}

/// One per server lifetime: the registry plus mutable session state.
///
/// The protocol layer serializes calls per session, but state still sits
/// behind a `Mutex` so the shared service stays `Send + Sync` even when a
/// client pipelines requests.
pub struct SessionContext {
    registry: DatabaseRegistry,
    state: Mutex<SessionState>,
}

impl SessionContext {
    pub fn new(registry: DatabaseRegistry) -> Self {
        Self {
            registry,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn registry(&self) -> &DatabaseRegistry {
        &self.registry
    }

    /// Run a query on one database, recording it in the session.
    ///
    /// On success the last query and result are replaced and exactly one
    /// history entry is appended. Failed queries leave the session untouched.
    pub async fn execute(&self, database: &Database, query: &str) -> DbResult<ResultSet> {
        let result = database.runner.run_query(query).await?;

        let mut state = self.state.lock().await;
        state.last_query = Some(query.to_string());
        state.last_result = Some(result.clone());
        state.history.push(HistoryEntry::new(
            &database.id,
            &database.description,
            query,
        ));

        Ok(result)
    }

    /// History log snapshot in insertion order.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.state.lock().await.history.clone()
    }

    pub async fn last_query(&self) -> Option<String> {
        self.state.lock().await.last_query.clone()
    }

    pub async fn last_result(&self) -> Option<ResultSet> {
        self.state.lock().await.last_result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{Map, json};
    use tokio::sync::RwLock;

    use crate::error::DbError;
    use crate::models::{DatabaseType, ResultColumn, TableSchema};
    use crate::runner::QueryRunner;

    /// Runner that returns one fixed row, or an error when the query
    /// contains "boom".
    struct ScriptedRunner;

    #[async_trait]
    impl QueryRunner for ScriptedRunner {
        async fn test_connection(&self) -> DbResult<()> {
            Ok(())
        }

        async fn fetch_schema(&self) -> DbResult<Vec<TableSchema>> {
            Ok(Vec::new())
        }

        async fn run_query(&self, sql: &str) -> DbResult<ResultSet> {
            if sql.contains("boom") {
                return Err(DbError::engine("scripted failure"));
            }
            let mut row = Map::new();
            row.insert("id".to_string(), json!(1));
            Ok(ResultSet::new(vec![ResultColumn::new("id")], vec![row]))
        }

        async fn table_columns(&self, _table: &str) -> DbResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn table_types(&self, _table: &str) -> DbResult<HashMap<String, String>> {
            Ok(HashMap::new())
        }
    }

    fn scripted_database(id: &str, description: &str) -> Arc<Database> {
        Arc::new(Database {
            id: id.to_string(),
            db_type: "sqlite".to_string(),
            engine: DatabaseType::SQLite,
            description: description.to_string(),
            configuration: Map::new(),
            schema: RwLock::new(None),
            runner: Arc::new(ScriptedRunner),
        })
    }

    fn context_with(databases: Vec<Arc<Database>>) -> SessionContext {
        SessionContext::new(DatabaseRegistry::from_databases(databases))
    }

    #[tokio::test]
    async fn test_execute_records_session_state() {
        let db = scripted_database("sq_test_0", "Test DB");
        let ctx = context_with(vec![Arc::clone(&db)]);

        let result = ctx.execute(&db, "SELECT id FROM users").await.unwrap();
        assert_eq!(result.row_count(), 1);

        assert_eq!(ctx.last_query().await.as_deref(), Some("SELECT id FROM users"));
        assert_eq!(ctx.last_result().await.unwrap().row_count(), 1);

        let history = ctx.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0].to_string(),
            "[sq_test_0] [Test DB] SELECT id FROM users"
        );
    }

    #[tokio::test]
    async fn test_failed_execute_leaves_session_untouched() {
        let db = scripted_database("sq_test_0", "Test DB");
        let ctx = context_with(vec![Arc::clone(&db)]);

        assert!(ctx.execute(&db, "SELECT boom").await.is_err());

        assert!(ctx.last_query().await.is_none());
        assert!(ctx.last_result().await.is_none());
        assert!(ctx.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_preserves_order() {
        let db = scripted_database("sq_test_0", "Test DB");
        let ctx = context_with(vec![Arc::clone(&db)]);

        ctx.execute(&db, "SELECT 1").await.unwrap();
        ctx.execute(&db, "SELECT 2").await.unwrap();
        ctx.execute(&db, "SELECT 3").await.unwrap();

        let queries: Vec<String> =
            ctx.history().await.iter().map(|e| e.query.clone()).collect();
        assert_eq!(queries, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }
}
