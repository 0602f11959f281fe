//! PostgreSQL document store.
//!
//! Each collection is a table `(id UUID PRIMARY KEY, doc JSONB NOT NULL)`,
//! created on first use. Filters compile to conditions on `doc -> field`
//! with every field name and value passed as a bind parameter. Unique
//! indexes are expression indexes on `doc ->> field`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info};

use sleepr_core::config::DatabaseConfig;
use sleepr_core::error::{AppError, ErrorKind};
use sleepr_core::traits::store::{StoreClient, StoreError};
use sleepr_core::types::{Filter, FilterOp, StoredDocument, UpdateQuery};

/// SQLSTATE raised by PostgreSQL when a unique index rejects a write.
const UNIQUE_VIOLATION: &str = "23505";

type Row = Json<Map<String, Value>>;

/// [`StoreClient`] backed by PostgreSQL JSONB tables.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    /// Tables already created by this process.
    tables: Arc<DashSet<String>>,
}

impl PostgresStore {
    /// Connect a pool from configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            url = %mask_password(&config.url),
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        info!("Successfully connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tables: Default::default(),
        }
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }

    /// Create the collection table if this process has not done so yet and
    /// return its quoted name.
    async fn table(&self, collection: &str) -> Result<String, StoreError> {
        let table = quote_ident(checked_ident("collection", collection)?);
        if self.tables.contains(collection) {
            return Ok(table);
        }

        sqlx::query(&create_table_sql(&table))
            .execute(&self.pool)
            .await
            .map_err(|e| classify_ddl(e, "Failed to create collection table"))?;
        self.tables.insert(collection.to_string());
        debug!(collection, "Collection table ready");
        Ok(table)
    }
}

#[async_trait]
impl StoreClient for PostgresStore {
    async fn insert(
        &self,
        collection: &str,
        document: StoredDocument,
    ) -> Result<StoredDocument, StoreError> {
        let table = self.table(collection).await?;
        let id = document
            .id()
            .ok_or_else(|| StoreError::backend("Document is missing a valid _id"))?;

        let sql = format!("INSERT INTO {table} (id, doc) VALUES ($1, $2) RETURNING doc");
        let row: Row = sqlx::query_scalar::<_, Row>(&sql)
            .bind(id.into_uuid())
            .bind(Json(document.into_fields()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "Failed to insert document"))?;
        Ok(StoredDocument::from_fields(row.0))
    }

    async fn query_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let table = self.table(collection).await?;
        let mut query = select_query(&table, filter, true)?;
        let row: Option<Row> = query
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "Failed to query document"))?;
        Ok(row.map(|r| StoredDocument::from_fields(r.0)))
    }

    async fn query_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let table = self.table(collection).await?;
        let mut query = select_query(&table, filter, false)?;
        let rows: Vec<Row> = query
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(e, "Failed to query documents"))?;
        Ok(rows
            .into_iter()
            .map(|r| StoredDocument::from_fields(r.0))
            .collect())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateQuery,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let table = self.table(collection).await?;
        let mut query = update_query(&table, filter, update)?;
        let row: Option<Row> = query
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "Failed to update document"))?;
        Ok(row.map(|r| StoredDocument::from_fields(r.0)))
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let table = self.table(collection).await?;
        let mut query = delete_query(&table, filter)?;
        let row: Option<Row> = query
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, "Failed to delete document"))?;
        Ok(row.map(|r| StoredDocument::from_fields(r.0)))
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        let table = self.table(collection).await?;
        let sql = unique_index_sql(collection, &table, field)?;
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_ddl(e, "Failed to create unique index"))?;
        debug!(collection, field, "Unique index ready");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| classify(e, "Health check failed"))
    }
}

/// Map a driver error onto the store-client vocabulary.
///
/// Only data statements go through here; schema statements use
/// [`classify_ddl`].
pub(crate) fn classify(err: sqlx::Error, context: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::DuplicateKey {
                index: db_err.constraint().unwrap_or("unknown").to_string(),
            };
        }
    }
    StoreError::backend_with_source(format!("{context}: {err}"), err)
}

/// Map a schema-statement error onto the store-client vocabulary.
///
/// DDL can raise `23505` without any document colliding: concurrent
/// `CREATE TABLE IF NOT EXISTS` races on the catalog, and `CREATE UNIQUE
/// INDEX` fails over rows that already hold duplicates. Neither is a
/// duplicate-key write, so both surface as backend failures.
pub(crate) fn classify_ddl(err: sqlx::Error, context: &str) -> StoreError {
    StoreError::backend_with_source(format!("{context}: {err}"), err)
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*`, the names safe to embed in DDL.
fn checked_ident<'a>(kind: &str, name: &'a str) -> Result<&'a str, StoreError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::backend(format!("Invalid {kind} name: {name:?}")))
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

fn create_table_sql(table: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS {table} (id UUID PRIMARY KEY, doc JSONB NOT NULL)")
}

fn unique_index_sql(collection: &str, table: &str, field: &str) -> Result<String, StoreError> {
    let field = checked_ident("field", field)?;
    let index = quote_ident(&format!("{collection}_{field}_key"));
    Ok(format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {index} ON {table} ((doc ->> '{field}'))"
    ))
}

fn select_query(
    table: &str,
    filter: &Filter,
    first_only: bool,
) -> Result<QueryBuilder<'static, Postgres>, StoreError> {
    let mut query = QueryBuilder::new(format!("SELECT doc FROM {table} WHERE "));
    push_filter(&mut query, filter)?;
    if first_only {
        query.push(" LIMIT 1");
    }
    Ok(query)
}

fn update_query(
    table: &str,
    filter: &Filter,
    update: &UpdateQuery,
) -> Result<QueryBuilder<'static, Postgres>, StoreError> {
    let mut query = QueryBuilder::new(format!("UPDATE {table} SET doc = (doc || "));
    query
        .push_bind(Json(Value::Object(update.set_object())))
        .push(") - ")
        .push_bind(update.unset_fields().to_vec())
        .push("::text[]");
    push_single_row_target(&mut query, table, filter)?;
    query.push(" RETURNING doc");
    Ok(query)
}

fn delete_query(table: &str, filter: &Filter) -> Result<QueryBuilder<'static, Postgres>, StoreError> {
    let mut query = QueryBuilder::new(format!("DELETE FROM {table}"));
    push_single_row_target(&mut query, table, filter)?;
    query.push(" RETURNING doc");
    Ok(query)
}

/// Restrict a write to the first row matching `filter`, locking it.
fn push_single_row_target(
    query: &mut QueryBuilder<'static, Postgres>,
    table: &str,
    filter: &Filter,
) -> Result<(), StoreError> {
    query.push(format!(" WHERE id = (SELECT id FROM {table} WHERE "));
    push_filter(query, filter)?;
    query.push(" LIMIT 1 FOR UPDATE)");
    Ok(())
}

/// Missing fields compare as JSON `null`, and ordering operators only match
/// values of the same JSON type.
fn push_filter(query: &mut QueryBuilder<'static, Postgres>, filter: &Filter) -> Result<(), StoreError> {
    if filter.is_empty() {
        query.push("TRUE");
        return Ok(());
    }

    for (i, condition) in filter.conditions().iter().enumerate() {
        if i > 0 {
            query.push(" AND ");
        }
        let field = condition.field.clone();
        let value = condition.value.clone();
        match condition.op {
            FilterOp::Eq | FilterOp::Ne => {
                let op = if condition.op == FilterOp::Eq { "=" } else { "<>" };
                query
                    .push("COALESCE(doc -> ")
                    .push_bind(field)
                    .push(format!(", 'null'::jsonb) {op} "))
                    .push_bind(Json(value));
            }
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let op = match condition.op {
                    FilterOp::Gt => ">",
                    FilterOp::Gte => ">=",
                    FilterOp::Lt => "<",
                    _ => "<=",
                };
                query
                    .push("(jsonb_typeof(doc -> ")
                    .push_bind(field.clone())
                    .push(") = jsonb_typeof(")
                    .push_bind(Json(value.clone()))
                    .push(") AND doc -> ")
                    .push_bind(field)
                    .push(format!(" {op} "))
                    .push_bind(Json(value))
                    .push(")");
            }
            FilterOp::In => {
                if !value.is_array() {
                    return Err(malformed(&condition.field, condition.op, "an array"));
                }
                query
                    .push("COALESCE(doc -> ")
                    .push_bind(field)
                    .push(", 'null'::jsonb) IN (SELECT jsonb_array_elements(")
                    .push_bind(Json(value))
                    .push("))");
            }
            FilterOp::Exists => {
                let Some(present) = value.as_bool() else {
                    return Err(malformed(&condition.field, condition.op, "a boolean"));
                };
                if !present {
                    query.push("NOT ");
                }
                query.push("(doc ? ").push_bind(field).push(")");
            }
        }
    }
    Ok(())
}

fn malformed(field: &str, op: FilterOp, expected: &str) -> StoreError {
    StoreError::backend(format!(
        "Malformed filter on {field}: {op} requires {expected}"
    ))
}

/// Mask the password portion of a database URL for safe logging.
fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
