use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    CustomerId, LineId, Money, OrderId, OrderStatus, OrderStatusCode, ProductId, UserId,
};
use sea_query::{Expr, Iden, Order as SortOrder, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use sqlx::types::Json;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    Address, HistoryQuery, LineFilter, OrderLineRecord, OrderRecord, OrderRepository,
    ProductStockRecord, ProductStockRepository, Result, StatusHistoryEntry,
    StatusHistoryRepository, StoreError,
};

#[derive(Iden)]
enum OrderLines {
    Table,
    Id,
    OrderId,
    ProductId,
    ProductName,
    Quantity,
    UnitPriceCents,
    VatRate,
    Discount,
    SubtotalCents,
    Status,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum OrderStatusHistory {
    Table,
    Id,
    Sequence,
    OrderId,
    LineId,
    PreviousStatus,
    NewStatus,
    Comment,
    UserId,
    CreatedAt,
}

const LINE_COLUMNS: [OrderLines; 12] = [
    OrderLines::Id,
    OrderLines::OrderId,
    OrderLines::ProductId,
    OrderLines::ProductName,
    OrderLines::Quantity,
    OrderLines::UnitPriceCents,
    OrderLines::VatRate,
    OrderLines::Discount,
    OrderLines::SubtotalCents,
    OrderLines::Status,
    OrderLines::CreatedAt,
    OrderLines::UpdatedAt,
];

const HISTORY_COLUMNS: [OrderStatusHistory; 8] = [
    OrderStatusHistory::Id,
    OrderStatusHistory::OrderId,
    OrderStatusHistory::LineId,
    OrderStatusHistory::PreviousStatus,
    OrderStatusHistory::NewStatus,
    OrderStatusHistory::Comment,
    OrderStatusHistory::UserId,
    OrderStatusHistory::CreatedAt,
];

/// PostgreSQL-backed relational store.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of up to `max_connections` to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
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

    fn row_to_order(row: PgRow) -> Result<OrderRecord> {
        Ok(OrderRecord {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: row.try_get("order_number")?,
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            status: OrderStatus::from_code(status_from_db(row.try_get("status")?)?)
                .map_err(|e| StoreError::InvalidRecord(e.to_string()))?,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            tax_amount: Money::from_cents(row.try_get("tax_amount_cents")?),
            shipping_cost: Money::from_cents(row.try_get("shipping_cost_cents")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            billing_address: row.try_get::<Json<Address>, _>("billing_address")?.0,
            shipping_address: row.try_get::<Json<Address>, _>("shipping_address")?.0,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLineRecord> {
        Ok(OrderLineRecord {
            id: LineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: non_negative(row.try_get("quantity")?, "quantity")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            vat_rate: non_negative(row.try_get("vat_rate")?, "vat_rate")?,
            discount: non_negative(row.try_get("discount")?, "discount")?,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            status: OrderStatusCode::from_code(status_from_db(row.try_get("status")?)?)
                .map_err(|e| StoreError::InvalidRecord(e.to_string()))?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_history(row: PgRow) -> Result<StatusHistoryEntry> {
        let previous: Option<i16> = row.try_get("previous_status")?;
        Ok(StatusHistoryEntry {
            id: row.try_get("id")?,
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            line_id: row.try_get::<Option<Uuid>, _>("line_id")?.map(LineId::from_uuid),
            previous_status: previous.map(status_from_db).transpose()?,
            new_status: status_from_db(row.try_get("new_status")?)?,
            comment: row.try_get("comment")?,
            user_id: row.try_get::<Option<String>, _>("user_id")?.map(UserId::new),
            created_at: row.try_get("created_at")?,
        })
    }
}

// Status codes are all below 100, so they fit a SMALLINT.
fn status_to_db(code: u16) -> i16 {
    code as i16
}

fn status_from_db(raw: i16) -> Result<u16> {
    u16::try_from(raw).map_err(|_| StoreError::InvalidRecord(format!("negative status code {raw}")))
}

fn non_negative(raw: i32, field: &str) -> Result<u32> {
    u32::try_from(raw).map_err(|_| StoreError::InvalidRecord(format!("negative {field}: {raw}")))
}

fn to_db_int(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("{field} out of range: {value}")))
}

#[async_trait]
impl ProductStockRepository for PostgresRepository {
    async fn get_stock(&self, product_id: ProductId) -> Result<Option<ProductStockRecord>> {
        let row: Option<PgRow> = sqlx::query(
            "SELECT product_id, physical_stock, committed_stock \
             FROM product_stock WHERE product_id = $1",
        )
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(ProductStockRecord {
                product_id: ProductId::new(row.try_get("product_id")?),
                physical_stock: row.try_get("physical_stock")?,
                committed_stock: row.try_get("committed_stock")?,
            })),
            None => Ok(None),
        }
    }

    async fn increment_committed_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE product_stock SET committed_stock = committed_stock + $2 WHERE product_id = $1",
        )
        .bind(product_id.as_i64())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_stock(&self, record: ProductStockRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product_stock (product_id, physical_stock, committed_stock)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id) DO UPDATE SET
                physical_stock = EXCLUDED.physical_stock,
                committed_stock = EXCLUDED.committed_stock
            "#,
        )
        .bind(record.product_id.as_i64())
        .bind(record.physical_stock)
        .bind(record.committed_stock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresRepository {
    async fn insert_order(&self, order: &OrderRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, customer_id, status, subtotal_cents, tax_amount_cents,
                shipping_cost_cents, total_cents, billing_address, shipping_address, note,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.customer_id.as_uuid())
        .bind(status_to_db(order.status.code()))
        .bind(order.subtotal.cents())
        .bind(order.tax_amount.cents())
        .bind(order.shipping_cost.cents())
        .bind(order.total.cents())
        .bind(Json(&order.billing_address))
        .bind(Json(&order.shipping_address))
        .bind(&order.note)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, order_number, customer_id, status, subtotal_cents, tax_amount_cents,
                   shipping_cost_cents, total_cents, billing_address, shipping_address, note,
                   created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn update_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<bool> {
        let result =
            sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(order_id.as_uuid())
                .bind(status_to_db(status.code()))
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_order_shipping(
        &self,
        order_id: OrderId,
        shipping_cost: Money,
        total: Money,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE orders SET shipping_cost_cents = $2, total_cents = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(order_id.as_uuid())
        .bind(shipping_cost.cents())
        .bind(total.cents())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn order_number_exists(&self, order_number: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1)")
                .bind(order_number)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn count_orders_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn insert_lines(&self, lines: &[OrderLineRecord]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        // One multi-row INSERT, so the lines land together or not at all.
        let mut insert = Query::insert();
        insert.into_table(OrderLines::Table).columns(LINE_COLUMNS);
        for line in lines {
            insert
                .values([
                    line.id.as_uuid().into(),
                    line.order_id.as_uuid().into(),
                    line.product_id.as_i64().into(),
                    line.product_name.clone().into(),
                    to_db_int(line.quantity, "quantity")?.into(),
                    line.unit_price.cents().into(),
                    to_db_int(line.vat_rate, "vat_rate")?.into(),
                    to_db_int(line.discount, "discount")?.into(),
                    line.subtotal.cents().into(),
                    status_to_db(line.status.code()).into(),
                    line.created_at.into(),
                    line.updated_at.into(),
                ])
                .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        }

        let (sql, values) = insert.build_sqlx(PostgresQueryBuilder);
        sqlx::query_with(&sql, values).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_line(&self, line_id: LineId) -> Result<Option<OrderLineRecord>> {
        let (sql, values) = Query::select()
            .columns(LINE_COLUMNS)
            .from(OrderLines::Table)
            .and_where(Expr::col(OrderLines::Id).eq(line_id.as_uuid()))
            .build_sqlx(PostgresQueryBuilder);

        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_line).transpose()
    }

    async fn find_lines(&self, filter: LineFilter) -> Result<Vec<OrderLineRecord>> {
        let mut select = Query::select();
        select.columns(LINE_COLUMNS).from(OrderLines::Table);

        if let Some(order_id) = filter.order_id {
            select.and_where(Expr::col(OrderLines::OrderId).eq(order_id.as_uuid()));
        }
        if let Some(product_id) = filter.product_id {
            select.and_where(Expr::col(OrderLines::ProductId).eq(product_id.as_i64()));
        }
        if let Some(status) = filter.status {
            select.and_where(Expr::col(OrderLines::Status).eq(status_to_db(status.code())));
        }
        select.order_by(OrderLines::Position, SortOrder::Asc);

        let (sql, values) = select.build_sqlx(PostgresQueryBuilder);
        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_line).collect()
    }

    async fn update_line_status(
        &self,
        line_id: LineId,
        from: OrderStatusCode,
        to: OrderStatusCode,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE order_lines SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(line_id.as_uuid())
        .bind(status_to_db(from.code()))
        .bind(status_to_db(to.code()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_lines(&self, order_id: OrderId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl StatusHistoryRepository for PostgresRepository {
    async fn append_history(&self, entry: &StatusHistoryEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_status_history
                (id, order_id, line_id, previous_status, new_status, comment, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.order_id.as_uuid())
        .bind(entry.line_id.map(|id| id.as_uuid()))
        .bind(entry.previous_status.map(status_to_db))
        .bind(status_to_db(entry.new_status))
        .bind(&entry.comment)
        .bind(entry.user_id.as_ref().map(|u| u.as_str().to_string()))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query_history(&self, query: HistoryQuery) -> Result<Vec<StatusHistoryEntry>> {
        let mut select = Query::select();
        select
            .columns(HISTORY_COLUMNS)
            .from(OrderStatusHistory::Table);

        if let Some(order_id) = query.order_id {
            select.and_where(Expr::col(OrderStatusHistory::OrderId).eq(order_id.as_uuid()));
        }
        if let Some(line_id) = query.line_id {
            select.and_where(Expr::col(OrderStatusHistory::LineId).eq(line_id.as_uuid()));
        }
        if query.order_level_only {
            select.and_where(Expr::col(OrderStatusHistory::LineId).is_null());
        }
        select.order_by(OrderStatusHistory::Sequence, SortOrder::Desc);
        if let Some(limit) = query.limit {
            select.limit(limit as u64);
        }

        let (sql, values) = select.build_sqlx(PostgresQueryBuilder);
        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_history).collect()
    }
}
