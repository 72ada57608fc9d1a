use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    Money, Order, OrderId, OrderStatus, OrderStoreError, Result,
    saga_log::{SagaLog, SagaLogEntry, SagaStep},
    store::OrderStore,
};

/// Connection settings for [`PostgresOrderStore::connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub url: String,
    pub max_connections: u32,
    /// Total connection attempts before giving up.
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Per-attempt timeout for acquiring a connection.
    pub acquire_timeout: Duration,
}

impl ConnectOptions {
    /// Options for `url` with the default retry schedule
    /// (10 attempts, 1s doubling, capped at 30s).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }
}

/// PostgreSQL-backed order store and saga log.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database, retrying with exponential backoff.
    #[tracing::instrument(skip(options), fields(max_attempts = options.max_attempts))]
    pub async fn connect(options: &ConnectOptions) -> Result<Self> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(options.initial_backoff)
            .with_max_delay(options.max_backoff)
            .with_max_times(options.max_attempts.saturating_sub(1))
            .build();

        let mut last_error = None;

        for (attempt, delay) in std::iter::once(Duration::ZERO).chain(backoff).enumerate() {
            if attempt > 0 {
                metrics::counter!("order_store_connect_retries_total").increment(1);
                tokio::time::sleep(delay).await;
            }

            let pool = PgPoolOptions::new()
                .max_connections(options.max_connections)
                .acquire_timeout(options.acquire_timeout)
                .connect(&options.url)
                .await;

            match pool {
                Ok(pool) => {
                    tracing::info!(attempt = attempt + 1, "connected to database");
                    return Ok(Self::new(pool));
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = options.max_attempts,
                        error = %e,
                        "database connection attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => OrderStoreError::Database(e),
            None => OrderStoreError::Unavailable("no connection attempts made".to_string()),
        })
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
            user_id: row.try_get("user_id")?,
            amount: Money::from_cents(row.try_get("amount_cents")?),
            status: status.parse().map_err(OrderStoreError::Corrupt)?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_entry(row: PgRow) -> Result<SagaLogEntry> {
        let step: String = row.try_get("last_step")?;
        Ok(SagaLogEntry {
            order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
            last_step: step.parse().map_err(OrderStoreError::Corrupt)?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.order_id))]
    async fn create_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, user_id, amount_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.order_id.as_str())
        .bind(&order.user_id)
        .bind(order.amount.cents())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return OrderStoreError::DuplicateOrder(order.order_id.clone());
            }
            OrderStoreError::Database(e)
        })?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<()> {
        let allowed_from: Vec<String> = [
            OrderStatus::Pending,
            OrderStatus::Completed,
            OrderStatus::Failed,
        ]
        .into_iter()
        .filter(|from| from.can_transition_to(status))
        .map(|from| from.as_str().to_string())
        .collect();

        let updated = sqlx::query(
            r#"
            UPDATE orders SET status = $1
            WHERE order_id = $2 AND status = ANY($3)
            "#,
        )
        .bind(status.as_str())
        .bind(order_id.as_str())
        .bind(&allowed_from)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing matched: either the order is missing or its status forbids the move.
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE order_id = $1")
                .bind(order_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match current {
            None => Err(OrderStoreError::OrderNotFound(order_id.clone())),
            Some(from) => Err(OrderStoreError::InvalidTransition {
                order_id: order_id.clone(),
                from: from.parse().map_err(OrderStoreError::Corrupt)?,
                to: status,
            }),
        }
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT order_id, user_id, amount_cents, status, created_at
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, user_id, amount_cents, status, created_at
            FROM orders
            ORDER BY created_at DESC, order_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl SagaLog for PostgresOrderStore {
    async fn record(&self, order_id: &OrderId, step: SagaStep) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO saga_log (order_id, last_step, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id) DO UPDATE SET
                last_step = EXCLUDED.last_step,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(order_id.as_str())
        .bind(step.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn last_step(&self, order_id: &OrderId) -> Result<Option<SagaStep>> {
        let step: Option<String> =
            sqlx::query_scalar("SELECT last_step FROM saga_log WHERE order_id = $1")
                .bind(order_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        step.map(|s| s.parse().map_err(OrderStoreError::Corrupt))
            .transpose()
    }

    async fn stranded(&self, older_than: DateTime<Utc>) -> Result<Vec<SagaLogEntry>> {
        let steps: Vec<String> = [
            SagaStep::OrderPersisted,
            SagaStep::PaymentDispatched,
            SagaStep::CompensationPending,
        ]
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();

        let rows = sqlx::query(
            r#"
            SELECT order_id, last_step, updated_at
            FROM saga_log
            WHERE last_step = ANY($1) AND updated_at < $2
            ORDER BY updated_at ASC
            "#,
        )
        .bind(&steps)
        .bind(older_than)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }
}
