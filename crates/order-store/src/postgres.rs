use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderError};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{Result, StoreError};
use crate::store::{OrderFilter, OrderPage, OrderStore, Page};

/// Upper bound on optimistic-concurrency retries per update.
const MAX_UPDATE_ATTEMPTS: u32 = 5;

/// PostgreSQL-backed order store.
///
/// The full order record lives in a JSONB `payload` column; `status` and
/// `payment_status` are denormalized for filtering. Updates use optimistic
/// versioning: read the current payload and version, apply the mutation,
/// then write back guarded by the version. A lost race re-reads and
/// re-applies, up to [`MAX_UPDATE_ATTEMPTS`].
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let payload: serde_json::Value = row.try_get("payload")?;
        Ok(serde_json::from_value(payload)?)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, order: Order) -> Result<()> {
        let order_id = order.order_id().clone();
        let payload = serde_json::to_value(&order)?;

        sqlx::query(
            r#"
            INSERT INTO orders (order_id, payload, version, status, payment_status, created_at, updated_at)
            VALUES ($1, $2, 1, $3, $4, $5, $6)
            "#,
        )
        .bind(order_id.as_str())
        .bind(&payload)
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::DuplicateOrder(order_id.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query("SELECT payload FROM orders WHERE order_id = $1")
            .bind(order_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_order(&row)?)),
            None => Ok(None),
        }
    }

    async fn update<T, F>(&self, order_id: &OrderId, mut mutation: F) -> Result<(T, Order)>
    where
        T: Send,
        F: FnMut(&mut Order) -> std::result::Result<T, OrderError> + Send,
    {
        for _attempt in 0..MAX_UPDATE_ATTEMPTS {
            let row: Option<PgRow> =
                sqlx::query("SELECT payload, version FROM orders WHERE order_id = $1")
                    .bind(order_id.as_str())
                    .fetch_optional(&self.pool)
                    .await?;
            let Some(row) = row else {
                return Err(StoreError::NotFound(order_id.clone()));
            };

            let mut order = Self::row_to_order(&row)?;
            let version: i64 = row.try_get("version")?;

            let value = mutation(&mut order)?;
            order.touch();
            let payload = serde_json::to_value(&order)?;

            let result = sqlx::query(
                r#"
                UPDATE orders
                SET payload = $1, version = version + 1, status = $2,
                    payment_status = $3, updated_at = $4
                WHERE order_id = $5 AND version = $6
                "#,
            )
            .bind(&payload)
            .bind(order.status().as_str())
            .bind(order.payment_status().as_str())
            .bind(order.updated_at())
            .bind(order_id.as_str())
            .bind(version)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                return Ok((value, order));
            }
            // Lost the race; another writer advanced the version. Re-read
            // and re-apply against the fresh state.
            metrics::counter!("order_store_version_conflicts_total").increment(1);
            tracing::debug!(order_id = %order_id, "version conflict, retrying update");
        }

        Err(StoreError::VersionConflict {
            order_id: order_id.clone(),
            attempts: MAX_UPDATE_ATTEMPTS,
        })
    }

    async fn list(&self, filter: OrderFilter, page: Page) -> Result<OrderPage> {
        let mut where_clause = String::from(" WHERE 1=1");
        let mut param_count = 0;

        if filter.status.is_some() {
            param_count += 1;
            where_clause.push_str(&format!(" AND status = ${param_count}"));
        }
        if filter.payment_status.is_some() {
            param_count += 1;
            where_clause.push_str(&format!(" AND payment_status = ${param_count}"));
        }

        let count_sql = format!("SELECT COUNT(*) FROM orders{where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(status) = filter.status {
            count_query = count_query.bind(status.as_str());
        }
        if let Some(payment_status) = filter.payment_status {
            count_query = count_query.bind(payment_status.as_str());
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?;

        let select_sql = format!(
            "SELECT payload FROM orders{where_clause} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2,
        );
        let mut select_query = sqlx::query(&select_sql);
        if let Some(status) = filter.status {
            select_query = select_query.bind(status.as_str());
        }
        if let Some(payment_status) = filter.payment_status {
            select_query = select_query.bind(payment_status.as_str());
        }
        let rows = select_query
            .bind(i64::from(page.per_page))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let orders = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderPage {
            orders,
            page: page.page,
            per_page: page.per_page,
            total: total as u64,
        })
    }
}
