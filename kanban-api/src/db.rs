//! Database Connection Pool Module
//!
//! PostgreSQL implementation of the ordered collection store, using
//! deadpool-postgres for pooling. Each transaction owns one pooled
//! connection for its lifetime and serializes writers per container with
//! transaction-scoped advisory locks keyed on the container's text form.
//!
//! Projects and their members are stored in the same database, so the
//! [`DbClient`] is also the access gate for the containers it holds.

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use kanban_core::{
    AccessGate, Container, ContainerKey, EntityIdType, ItemId, ItemPayload, KanbanError,
    KanbanResult, NotFoundError, PositionPatch, PositionedItem, Principal, ProjectId, StatusId,
    StorageError,
};
use kanban_storage::{OrderedRepository, StoreTransaction, TransactionCoordinator};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_postgres::{error::SqlState, NoTls, Row};
use uuid::Uuid;

use crate::auth::{check_member, check_owner, Project, ProjectDirectory};
use crate::error::{ApiError, ApiResult};

/// Schema applied by [`DbClient::migrate`]. Every statement is idempotent.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kanban_containers (
    key         TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,
    project_id  UUID NULL,
    name        TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS kanban_items (
    item_id        UUID PRIMARY KEY,
    container_key  TEXT NOT NULL REFERENCES kanban_containers (key) ON DELETE CASCADE,
    position       BIGINT NOT NULL CHECK (position >= 0),
    payload        JSONB NOT NULL,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS kanban_items_container_position_idx
    ON kanban_items (container_key, position);

CREATE INDEX IF NOT EXISTS kanban_items_linked_status_idx
    ON kanban_items ((payload->>'status_id'))
    WHERE payload->>'kind' = 'board_column';

CREATE TABLE IF NOT EXISTS kanban_projects (
    project_id  UUID PRIMARY KEY,
    name        TEXT NOT NULL,
    owner       TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS kanban_project_members (
    project_id  UUID NOT NULL REFERENCES kanban_projects (project_id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL,
    PRIMARY KEY (project_id, user_id)
);

INSERT INTO kanban_containers (key, kind, project_id, name)
VALUES ('skills', 'skills', NULL, 'skills')
ON CONFLICT (key) DO NOTHING;
"#;

const ITEM_COLUMNS: &str = "item_id, container_key, position, payload, created_at, updated_at";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "kanban".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("KANBAN_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("KANBAN_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("KANBAN_DB_NAME").unwrap_or_else(|_| "kanban".to_string()),
            user: std::env::var("KANBAN_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("KANBAN_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("KANBAN_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("KANBAN_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(deadpool_postgres::PoolConfig::new(self.max_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn pg_error(err: tokio_postgres::Error) -> KanbanError {
    if let Some(db_error) = err.as_db_error() {
        if db_error.code() == &SqlState::UNIQUE_VIOLATION {
            return StorageError::InsertFailed {
                entity: db_error.table().unwrap_or("row").to_string(),
                reason: db_error.message().to_string(),
            }
            .into();
        }
    }
    tracing::error!("Database error: {:?}", err);
    StorageError::Backend {
        reason: err.to_string(),
    }
    .into()
}

fn pool_error(err: deadpool_postgres::PoolError) -> KanbanError {
    tracing::error!("Connection pool error: {:?}", err);
    StorageError::Backend {
        reason: format!("failed to acquire connection: {}", err),
    }
    .into()
}

fn corrupt(id: impl ToString, reason: impl ToString) -> KanbanError {
    StorageError::Corrupt {
        id: id.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn item_from_row(row: &Row) -> KanbanResult<PositionedItem> {
    let item_id: Uuid = row.try_get("item_id").map_err(pg_error)?;
    let container_key: String = row.try_get("container_key").map_err(pg_error)?;
    let payload: serde_json::Value = row.try_get("payload").map_err(pg_error)?;

    Ok(PositionedItem {
        item_id: ItemId::new(item_id),
        container: container_key
            .parse()
            .map_err(|e: kanban_core::ValidationError| corrupt(item_id, e))?,
        position: row.try_get("position").map_err(pg_error)?,
        payload: serde_json::from_value(payload).map_err(|e| corrupt(item_id, e))?,
        created_at: row.try_get("created_at").map_err(pg_error)?,
        updated_at: row.try_get("updated_at").map_err(pg_error)?,
    })
}

fn container_from_row(row: &Row) -> KanbanResult<Container> {
    let key: String = row.try_get("key").map_err(pg_error)?;
    let project_id: Option<Uuid> = row.try_get("project_id").map_err(pg_error)?;

    Ok(Container {
        key: key
            .parse()
            .map_err(|e: kanban_core::ValidationError| corrupt(&key, e))?,
        project_id: project_id.map(ProjectId::new),
        name: row.try_get("name").map_err(pg_error)?,
        created_at: row.try_get("created_at").map_err(pg_error)?,
    })
}

fn payload_json(payload: &ItemPayload) -> KanbanResult<serde_json::Value> {
    serde_json::to_value(payload).map_err(|e| {
        StorageError::Backend {
            reason: format!("failed to encode payload: {}", e),
        }
        .into()
    })
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool and hands out transactions.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> KanbanResult<Object> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Create the tables and the global skill list if missing.
    pub async fn migrate(&self) -> KanbanResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA).await.map_err(pg_error)?;
        tracing::info!("Database schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl TransactionCoordinator for DbClient {
    async fn begin(&self) -> KanbanResult<Box<dyn StoreTransaction>> {
        let conn = self.get_conn().await?;
        conn.batch_execute("BEGIN").await.map_err(pg_error)?;
        Ok(Box::new(PgTransaction { conn: Some(conn) }))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> KanbanResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(pg_error)?;
        Ok(())
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// An open `BEGIN` block on one pooled connection.
///
/// If dropped before commit or rollback, the connection is detached from
/// the pool and closed, which makes the server abort the transaction.
pub struct PgTransaction {
    conn: Option<Object>,
}

impl PgTransaction {
    fn client(&self) -> KanbanResult<&Object> {
        self.conn.as_ref().ok_or_else(|| {
            StorageError::TransactionFailed {
                reason: "transaction already finished".to_string(),
            }
            .into()
        })
    }

    async fn require_container(&self, key: ContainerKey) -> KanbanResult<()> {
        let row = self
            .client()?
            .query_opt(
                "SELECT 1 FROM kanban_containers WHERE key = $1",
                &[&key.to_string()],
            )
            .await
            .map_err(pg_error)?;
        match row {
            Some(_) => Ok(()),
            None => Err(NotFoundError::Container { key }.into()),
        }
    }

    async fn finish(mut self: Box<Self>, statement: &str) -> KanbanResult<()> {
        let conn = self.conn.take().ok_or_else(|| StorageError::TransactionFailed {
            reason: "transaction already finished".to_string(),
        })?;
        match conn.batch_execute(statement).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Never hand a connection in an unknown transaction state back to the pool.
                drop(Object::take(conn));
                Err(StorageError::TransactionFailed {
                    reason: format!("{} failed: {}", statement, e),
                }
                .into())
            }
        }
    }
}

// ============================================================================
// PROJECT DIRECTORY
// ============================================================================

impl DbClient {
    async fn load_project(&self, project_id: ProjectId) -> KanbanResult<Option<Project>> {
        let conn = self.get_conn().await?;
        let Some(row) = conn
            .query_opt(
                "SELECT name, owner, created_at FROM kanban_projects WHERE project_id = $1",
                &[&project_id.as_uuid()],
            )
            .await
            .map_err(pg_error)?
        else {
            return Ok(None);
        };

        let members = conn
            .query(
                "SELECT user_id FROM kanban_project_members WHERE project_id = $1",
                &[&project_id.as_uuid()],
            )
            .await
            .map_err(pg_error)?
            .iter()
            .map(|row| row.try_get::<_, String>("user_id").map_err(pg_error))
            .collect::<KanbanResult<BTreeSet<String>>>()?;

        Ok(Some(Project {
            project_id,
            name: row.try_get("name").map_err(pg_error)?,
            owner: row.try_get("owner").map_err(pg_error)?,
            members,
            created_at: row.try_get("created_at").map_err(pg_error)?,
        }))
    }
}

#[async_trait]
impl ProjectDirectory for DbClient {
    async fn register_project(&self, owner: &Principal, name: &str) -> KanbanResult<Project> {
        let project = Project::new(owner, name);
        self.get_conn()
            .await?
            .execute(
                "INSERT INTO kanban_projects (project_id, name, owner, created_at) \
                 VALUES ($1, $2, $3, $4)",
                &[
                    &project.project_id.as_uuid(),
                    &project.name,
                    &project.owner,
                    &project.created_at,
                ],
            )
            .await
            .map_err(pg_error)?;
        tracing::info!(
            project_id = %project.project_id,
            owner = %project.owner,
            "Registered project"
        );
        Ok(project)
    }

    async fn add_member(&self, project_id: ProjectId, user_id: &str) -> KanbanResult<Project> {
        // The owner never appears in the member table.
        let inserted = self
            .get_conn()
            .await?
            .execute(
                "INSERT INTO kanban_project_members (project_id, user_id) \
                 SELECT project_id, $2::text FROM kanban_projects \
                 WHERE project_id = $1 AND owner <> $2::text \
                 ON CONFLICT (project_id, user_id) DO NOTHING",
                &[&project_id.as_uuid(), &user_id],
            )
            .await
            .map_err(pg_error)?;
        tracing::debug!(project_id = %project_id, user_id, inserted, "Upserted project member");

        self.load_project(project_id)
            .await?
            .ok_or_else(|| NotFoundError::Project { project_id }.into())
    }

    async fn get_project(&self, project_id: ProjectId) -> KanbanResult<Option<Project>> {
        self.load_project(project_id).await
    }

    async fn remove_project(&self, project_id: ProjectId) -> KanbanResult<()> {
        self.get_conn()
            .await?
            .execute(
                "DELETE FROM kanban_projects WHERE project_id = $1",
                &[&project_id.as_uuid()],
            )
            .await
            .map_err(pg_error)?;
        Ok(())
    }
}

#[async_trait]
impl AccessGate for DbClient {
    async fn assert_member(&self, principal: &Principal, project_id: ProjectId) -> KanbanResult<()> {
        let project = self.load_project(project_id).await?;
        check_member(project.as_ref(), principal, project_id)
    }

    async fn assert_owner(&self, principal: &Principal, project_id: ProjectId) -> KanbanResult<()> {
        let project = self.load_project(project_id).await?;
        check_owner(project.as_ref(), principal, project_id)
    }
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("Transaction dropped without commit or rollback; closing connection");
            drop(Object::take(conn));
        }
    }
}

#[async_trait]
impl OrderedRepository for PgTransaction {
    async fn container_get(&mut self, key: ContainerKey) -> KanbanResult<Option<Container>> {
        let row = self
            .client()?
            .query_opt(
                "SELECT key, project_id, name, created_at FROM kanban_containers WHERE key = $1",
                &[&key.to_string()],
            )
            .await
            .map_err(pg_error)?;
        row.as_ref().map(container_from_row).transpose()
    }

    async fn container_insert(&mut self, container: &Container) -> KanbanResult<()> {
        let project_id = container.project_id.map(|p| p.as_uuid());
        self.client()?
            .execute(
                "INSERT INTO kanban_containers (key, kind, project_id, name, created_at) \
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &container.key.to_string(),
                    &container.key.kind().as_str(),
                    &project_id,
                    &container.name,
                    &container.created_at,
                ],
            )
            .await
            .map_err(pg_error)?;
        Ok(())
    }

    async fn container_delete(&mut self, key: ContainerKey) -> KanbanResult<Vec<PositionedItem>> {
        self.require_container(key).await?;
        let key_text = key.to_string();
        let client = self.client()?;
        let rows = client
            .query(
                &*format!(
                    "DELETE FROM kanban_items WHERE container_key = $1 RETURNING {}",
                    ITEM_COLUMNS
                ),
                &[&key_text],
            )
            .await
            .map_err(pg_error)?;
        client
            .execute("DELETE FROM kanban_containers WHERE key = $1", &[&key_text])
            .await
            .map_err(pg_error)?;

        let mut removed = rows
            .iter()
            .map(item_from_row)
            .collect::<KanbanResult<Vec<_>>>()?;
        removed.sort_by_key(|item| (item.position, item.item_id));
        Ok(removed)
    }

    async fn lock_containers(&mut self, keys: &[ContainerKey]) -> KanbanResult<()> {
        let mut keys: Vec<String> = keys.iter().map(ContainerKey::to_string).collect();
        keys.sort();
        keys.dedup();
        let client = self.client()?;
        for key in &keys {
            client
                .execute(
                    "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))",
                    &[key],
                )
                .await
                .map_err(pg_error)?;
        }
        tracing::debug!(containers = ?keys, "Acquired container locks");
        Ok(())
    }

    async fn list_by_container(&mut self, key: ContainerKey) -> KanbanResult<Vec<PositionedItem>> {
        self.require_container(key).await?;
        let rows = self
            .client()?
            .query(
                &*format!(
                    "SELECT {} FROM kanban_items WHERE container_key = $1 \
                     ORDER BY position ASC, item_id ASC",
                    ITEM_COLUMNS
                ),
                &[&key.to_string()],
            )
            .await
            .map_err(pg_error)?;
        rows.iter().map(item_from_row).collect()
    }

    async fn max_position(&mut self, key: ContainerKey) -> KanbanResult<i64> {
        self.require_container(key).await?;
        let row = self
            .client()?
            .query_one(
                "SELECT COALESCE(MAX(position), -1) FROM kanban_items WHERE container_key = $1",
                &[&key.to_string()],
            )
            .await
            .map_err(pg_error)?;
        row.try_get(0).map_err(pg_error)
    }

    async fn item_get(&mut self, item_id: ItemId) -> KanbanResult<Option<PositionedItem>> {
        let row = self
            .client()?
            .query_opt(
                &*format!("SELECT {} FROM kanban_items WHERE item_id = $1", ITEM_COLUMNS),
                &[&item_id.as_uuid()],
            )
            .await
            .map_err(pg_error)?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn item_insert(&mut self, item: &PositionedItem) -> KanbanResult<()> {
        self.require_container(item.container).await?;
        let payload = payload_json(&item.payload)?;
        self.client()?
            .execute(
                &*format!(
                    "INSERT INTO kanban_items ({}) VALUES ($1, $2, $3, $4, $5, $6)",
                    ITEM_COLUMNS
                ),
                &[
                    &item.item_id.as_uuid(),
                    &item.container.to_string(),
                    &item.position,
                    &payload,
                    &item.created_at,
                    &item.updated_at,
                ],
            )
            .await
            .map_err(pg_error)?;
        Ok(())
    }

    async fn item_delete(&mut self, item_id: ItemId) -> KanbanResult<()> {
        let deleted = self
            .client()?
            .execute(
                "DELETE FROM kanban_items WHERE item_id = $1",
                &[&item_id.as_uuid()],
            )
            .await
            .map_err(pg_error)?;
        if deleted == 0 {
            return Err(NotFoundError::Item { item_id }.into());
        }
        Ok(())
    }

    async fn item_update_payload(
        &mut self,
        item_id: ItemId,
        payload: &ItemPayload,
    ) -> KanbanResult<PositionedItem> {
        let payload = payload_json(payload)?;
        let row = self
            .client()?
            .query_opt(
                &*format!(
                    "UPDATE kanban_items SET payload = $2, updated_at = now() \
                     WHERE item_id = $1 RETURNING {}",
                    ITEM_COLUMNS
                ),
                &[&item_id.as_uuid(), &payload],
            )
            .await
            .map_err(pg_error)?;
        match row {
            Some(row) => item_from_row(&row),
            None => Err(NotFoundError::Item { item_id }.into()),
        }
    }

    async fn set_positions(&mut self, patches: &[PositionPatch]) -> KanbanResult<()> {
        for patch in patches {
            if let Some(target) = patch.container {
                self.require_container(target).await?;
            }
            let container = patch.container.map(|key| key.to_string());
            let updated = self
                .client()?
                .execute(
                    "UPDATE kanban_items \
                     SET position = $2, \
                         container_key = COALESCE($3, container_key), \
                         updated_at = CASE WHEN $4 THEN now() ELSE updated_at END \
                     WHERE item_id = $1",
                    &[
                        &patch.item_id.as_uuid(),
                        &patch.position,
                        &container,
                        &patch.touch,
                    ],
                )
                .await
                .map_err(pg_error)?;
            if updated == 0 {
                return Err(NotFoundError::Item {
                    item_id: patch.item_id,
                }
                .into());
            }
        }
        Ok(())
    }

    async fn links_to(&mut self, status_id: StatusId) -> KanbanResult<Vec<PositionedItem>> {
        let rows = self
            .client()?
            .query(
                &*format!(
                    "SELECT {} FROM kanban_items \
                     WHERE payload->>'kind' = 'board_column' AND payload->>'status_id' = $1 \
                     ORDER BY container_key, position, item_id",
                    ITEM_COLUMNS
                ),
                &[&status_id.to_string()],
            )
            .await
            .map_err(pg_error)?;
        rows.iter().map(item_from_row).collect()
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn commit(self: Box<Self>) -> KanbanResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(self: Box<Self>) -> KanbanResult<()> {
        self.finish("ROLLBACK").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "kanban");
        assert_eq!(config.max_size, 16);
    }

    #[test]
    fn test_schema_is_idempotent_text() {
        for statement in ["CREATE TABLE IF NOT EXISTS", "CREATE INDEX IF NOT EXISTS"] {
            assert!(SCHEMA.contains(statement));
        }
        assert!(SCHEMA.contains("ON CONFLICT (key) DO NOTHING"));
        for table in ["kanban_projects", "kanban_project_members"] {
            assert!(SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {}", table)));
        }
        assert!(!SCHEMA.contains("DROP"));
    }

    #[tokio::test]
    async fn test_pool_creation_is_lazy() {
        // Building the pool never dials the server.
        let client = DbClient::from_config(&DbConfig::default());
        assert!(client.is_ok());
    }
}
