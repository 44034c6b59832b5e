//! Database registry: configured descriptors and their query runners.
//!
//! The registry is built once at startup and shared read-only behind an
//! `Arc`; the only mutable state per descriptor is the cached schema.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::DatabaseSpec;
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, TableSchema};
use crate::runner::{QueryRunner, SqlxRunner};

/// One configured database: identity, connection settings, cached schema,
/// and the runner that executes against it.
pub struct Database {
    pub id: String,
    /// Engine tag exactly as configured ("pg", "mysql", ...), shown in
    /// listings verbatim.
    pub db_type: String,
    /// Parsed engine, used for identifier quoting.
    pub engine: DatabaseType,
    pub description: String,
    /// Connection parameters as loaded; the runner holds the live pool.
    pub configuration: Map<String, Value>,
    /// Cached table layout. `None` until a fetch succeeds.
    pub schema: RwLock<Option<Vec<TableSchema>>>,
    pub runner: Arc<dyn QueryRunner>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("id", &self.id)
            .field("db_type", &self.db_type)
            .field("engine", &self.engine)
            .field("description", &self.description)
            .field("configuration", &self.configuration)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Current cached schema, if any fetch has succeeded.
    pub async fn cached_schema(&self) -> Option<Vec<TableSchema>> {
        self.schema.read().await.clone()
    }

    /// Fetch the schema from the live database and update the cache.
    pub async fn refresh_schema(&self) -> DbResult<Vec<TableSchema>> {
        let schema = self.runner.fetch_schema().await?;
        *self.schema.write().await = Some(schema.clone());
        Ok(schema)
    }
}

/// Insertion-order-preserving map of database ID to descriptor.
pub struct DatabaseRegistry {
    databases: Vec<Arc<Database>>,
    index: HashMap<String, usize>,
}

impl DatabaseRegistry {
    /// Connect every configured database and probe it once.
    ///
    /// Runner construction failures are fatal. Connection tests and initial
    /// schema fetches are best-effort: failures are logged and the
    /// descriptor stays usable.
    pub async fn connect(specs: Vec<DatabaseSpec>) -> DbResult<Self> {
        let mut databases = Vec::with_capacity(specs.len());

        for spec in specs {
            info!(
                database_id = %spec.id,
                db_type = %spec.db_type,
                "Initializing query runner"
            );
            let runner = SqlxRunner::connect(spec.engine, &spec.configuration).await?;

            databases.push(Arc::new(Database {
                id: spec.id,
                db_type: spec.db_type,
                engine: spec.engine,
                description: spec.description,
                configuration: spec.configuration,
                schema: RwLock::new(None),
                runner: Arc::new(runner),
            }));
        }

        let registry = Self::from_databases(databases);
        registry.probe_databases().await;
        Ok(registry)
    }

    /// Build a registry from already-constructed descriptors.
    pub fn from_databases(databases: Vec<Arc<Database>>) -> Self {
        let index = databases
            .iter()
            .enumerate()
            .map(|(position, database)| (database.id.clone(), position))
            .collect();
        Self { databases, index }
    }

    /// Look up a database by ID.
    pub fn lookup(&self, database_id: &str) -> DbResult<Arc<Database>> {
        self.index
            .get(database_id)
            .map(|&position| Arc::clone(&self.databases[position]))
            .ok_or_else(|| DbError::unknown_database(database_id))
    }

    /// The first-configured database, used when no ID is given.
    pub fn default_database(&self) -> DbResult<Arc<Database>> {
        self.databases
            .first()
            .map(Arc::clone)
            .ok_or(DbError::EmptyRegistry)
    }

    /// All databases in configuration order.
    pub fn all(&self) -> &[Arc<Database>] {
        &self.databases
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Close every connection pool. Called once at shutdown.
    pub async fn close_all(&self) {
        for database in &self.databases {
            database.runner.close().await;
        }
    }

    /// Test every connection and fetch every schema once, concurrently.
    async fn probe_databases(&self) {
        let probes = self.databases.iter().map(|database| {
            let database = Arc::clone(database);
            async move {
                match database.runner.test_connection().await {
                    Ok(()) => {
                        info!(database_id = %database.id, "Database connection OK");
                    }
                    Err(e) => {
                        warn!(
                            database_id = %database.id,
                            error = %e,
                            "Database connection test failed"
                        );
                    }
                }

                if let Err(e) = database.refresh_schema().await {
                    warn!(
                        database_id = %database.id,
                        error = %e,
                        "Failed to fetch initial schema"
                    );
                }
            }
        });
        join_all(probes).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnSchema, ResultSet};
    use async_trait::async_trait;

    struct FixedSchemaRunner {
        tables: Vec<TableSchema>,
    }

    #[async_trait]
    impl QueryRunner for FixedSchemaRunner {
        async fn test_connection(&self) -> DbResult<()> {
            Ok(())
        }

        async fn fetch_schema(&self) -> DbResult<Vec<TableSchema>> {
            Ok(self.tables.clone())
        }

        async fn run_query(&self, _sql: &str) -> DbResult<ResultSet> {
            Ok(ResultSet::default())
        }

        async fn table_columns(&self, _table: &str) -> DbResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn table_types(
            &self,
            _table: &str,
        ) -> DbResult<HashMap<String, String>> {
            Ok(HashMap::new())
        }
    }

    fn database(id: &str, description: &str) -> Arc<Database> {
        Arc::new(Database {
            id: id.to_string(),
            db_type: "sqlite".to_string(),
            engine: DatabaseType::SQLite,
            description: description.to_string(),
            configuration: Map::new(),
            schema: RwLock::new(None),
            runner: Arc::new(FixedSchemaRunner {
                tables: vec![
                    TableSchema::new("users")
                        .with_column(ColumnSchema::new("id", Some("INTEGER".to_string()))),
                ],
            }),
        })
    }

    #[tokio::test]
    async fn test_lookup_by_id() {
        let registry =
            DatabaseRegistry::from_databases(vec![database("a_0", "A"), database("b_1", "B")]);

        assert_eq!(registry.lookup("b_1").unwrap().description, "B");
        assert!(matches!(
            registry.lookup("nope"),
            Err(DbError::UnknownDatabase { .. })
        ));
    }

    #[tokio::test]
    async fn test_default_database_is_first_configured() {
        let registry =
            DatabaseRegistry::from_databases(vec![database("a_0", "A"), database("b_1", "B")]);

        assert_eq!(registry.default_database().unwrap().id, "a_0");
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let registry = DatabaseRegistry::from_databases(Vec::new());

        assert!(registry.is_empty());
        assert!(matches!(
            registry.default_database(),
            Err(DbError::EmptyRegistry)
        ));
    }

    #[tokio::test]
    async fn test_all_preserves_insertion_order() {
        let registry = DatabaseRegistry::from_databases(vec![
            database("c_0", "C"),
            database("a_1", "A"),
            database("b_2", "B"),
        ]);

        let ids: Vec<&str> = registry.all().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c_0", "a_1", "b_2"]);
    }

    #[tokio::test]
    async fn test_refresh_schema_updates_cache() {
        let db = database("a_0", "A");
        assert!(db.cached_schema().await.is_none());

        let schema = db.refresh_schema().await.unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(db.cached_schema().await.unwrap()[0].name, "users");
    }
}
