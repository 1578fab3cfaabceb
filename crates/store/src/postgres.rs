//! PostgreSQL store implementation.
//!
//! Each mutating operation runs in one transaction. Products touched
//! by a stock commit are locked with `SELECT ... FOR UPDATE` in id
//! order, so concurrent commits against overlapping carts serialize
//! instead of deadlocking.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, OrderId, ProductId};
use domain::{
    Money, NewProduct, Order, OrderChannel, OrderLine, OrderRequest, OrderStatus, PaymentMethod,
    Product, ProductPatch, plan_consumption,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{OrderFilter, ProductFilter, StateFilter, Store},
};

const PRODUCT_COLUMNS: &str =
    "id, name, price_cents, detail, photo, listed, stock, min_stock, active";
const ORDER_COLUMNS: &str = "id, customer_id, order_date, observation, total_quantity, \
     confirmed, registered, paid, payment_method, channel";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
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

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            detail: row.try_get("detail")?,
            photo: row.try_get("photo")?,
            listed: row.try_get("listed")?,
            stock: row.try_get::<i32, _>("stock")? as u32,
            min_stock: row.try_get::<i32, _>("min_stock")? as u32,
            active: row.try_get("active")?,
        })
    }

    fn row_to_order_header(row: PgRow) -> Result<Order> {
        let payment_method = row
            .try_get::<Option<String>, _>("payment_method")?
            .map(|s| s.parse::<PaymentMethod>())
            .transpose()?;
        let channel = match row.try_get::<String, _>("channel")?.as_str() {
            "online" => OrderChannel::Online,
            "register" => OrderChannel::Register,
            other => {
                return Err(StoreError::Storage(sqlx::Error::Decode(
                    format!("unknown channel tag {other:?}").into(),
                )));
            }
        };

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer: row
                .try_get::<Option<Uuid>, _>("customer_id")?
                .map(CustomerId::from_uuid),
            date: row.try_get("order_date")?,
            observation: row.try_get("observation")?,
            total_quantity: row.try_get::<i32, _>("total_quantity")? as u32,
            status: OrderStatus {
                confirmed: row.try_get("confirmed")?,
                registered: row.try_get("registered")?,
                paid: row.try_get("paid")?,
            },
            payment_method,
            channel,
            lines: Vec::new(),
        })
    }

    fn row_to_line(row: PgRow) -> Result<(OrderId, OrderLine)> {
        let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?);
        let product = Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            detail: row.try_get("detail")?,
            photo: row.try_get("photo")?,
            listed: row.try_get("listed")?,
            stock: row.try_get::<i32, _>("stock")? as u32,
            min_stock: row.try_get::<i32, _>("min_stock")? as u32,
            active: row.try_get("active")?,
        };
        let line = OrderLine {
            line_no: row.try_get::<i32, _>("line_no")? as u32,
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            product,
        };
        Ok((order_id, line))
    }

    /// Loads the lines for a set of orders, joined with their current
    /// product rows, grouped by order id.
    async fn load_lines<'e, E>(
        executor: E,
        order_ids: &[Uuid],
    ) -> Result<HashMap<OrderId, Vec<OrderLine>>>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query(
            r#"
            SELECT l.order_id, l.line_no, l.quantity, l.unit_price_cents,
                   p.id AS product_id, p.name, p.price_cents, p.detail, p.photo,
                   p.listed, p.stock, p.min_stock, p.active
            FROM order_lines l
            JOIN products p ON p.id = l.product_id
            WHERE l.order_id = ANY($1)
            ORDER BY l.order_id, l.line_no
            "#,
        )
        .bind(order_ids)
        .fetch_all(executor)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let (order_id, line) = Self::row_to_line(row)?;
            grouped.entry(order_id).or_default().push(line);
        }
        Ok(grouped)
    }

    /// Locks the given products for update, in id order, and returns
    /// them keyed by id. Ids absent from the table are simply missing
    /// from the map.
    async fn lock_products(
        tx: &mut Transaction<'_, Postgres>,
        ids: &[Uuid],
    ) -> Result<HashMap<ProductId, Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;

        let mut products = HashMap::with_capacity(rows.len());
        for row in rows {
            let product = Self::row_to_product(row)?;
            products.insert(product.id, product);
        }
        Ok(products)
    }

    async fn apply_decrements(
        tx: &mut Transaction<'_, Postgres>,
        decrements: &[domain::StockDecrement],
    ) -> Result<()> {
        for decrement in decrements {
            sqlx::query("UPDATE products SET stock = $2 WHERE id = $1")
                .bind(decrement.product_id.as_uuid())
                .bind(decrement.new_stock as i32)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    async fn load_order(&self, id: OrderId) -> Result<Order> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::OrderNotFound(id))?;

        let mut order = Self::row_to_order_header(row)?;
        let mut lines = Self::load_lines(&self.pool, &[id.as_uuid()]).await?;
        order.lines = lines.remove(&id).unwrap_or_default();
        Ok(order)
    }

    fn map_name_conflict(name: &str, e: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.constraint() == Some("products_name_key")
        {
            return StoreError::NameConflict {
                name: name.to_string(),
            };
        }
        StoreError::Storage(e)
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn create_product(&self, new: NewProduct) -> Result<Product> {
        new.validate()?;
        let id = ProductId::new();

        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, detail, photo, listed, stock, min_stock, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&new.name)
        .bind(new.price.cents())
        .bind(&new.detail)
        .bind(&new.photo)
        .bind(new.listed)
        .bind(new.stock as i32)
        .bind(new.min_stock as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_name_conflict(&new.name, e))?;

        Ok(new.into_product(id))
    }

    async fn product(&self, id: ProductId) -> Result<Product> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::ProductNotFound(id))?;

        Self::row_to_product(row)
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products");
        if filter == ProductFilter::ActiveOnly {
            sql.push_str(" WHERE active");
        }
        sql.push_str(" ORDER BY name");

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        patch.validate()?;

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::ProductNotFound(id))?;

        let mut product = Self::row_to_product(row)?;
        patch.apply_to(&mut product);

        sqlx::query(
            r#"
            UPDATE products
            SET name = $2, price_cents = $3, detail = $4, photo = $5,
                listed = $6, stock = $7, min_stock = $8
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(&product.detail)
        .bind(&product.photo)
        .bind(product.listed)
        .bind(product.stock as i32)
        .bind(product.min_stock as i32)
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::map_name_conflict(&product.name, e))?;

        tx.commit().await?;
        Ok(product)
    }

    async fn deactivate_product(&self, id: ProductId) -> Result<Product> {
        let row = sqlx::query(&format!(
            "UPDATE products SET active = FALSE WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::ProductNotFound(id))?;

        Self::row_to_product(row)
    }

    async fn create_order(
        &self,
        request: OrderRequest,
        customer: Option<CustomerId>,
    ) -> Result<Order> {
        request.validate()?;

        let mut tx = self.pool.begin().await?;

        let mut ids: Vec<Uuid> = request
            .lines
            .iter()
            .map(|l| l.product_id.as_uuid())
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let products = Self::lock_products(&mut tx, &ids).await?;

        let mut resolved = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = products
                .get(&line.product_id)
                .ok_or(StoreError::ProductNotFound(line.product_id))?;
            if !product.active {
                return Err(domain::InventoryError::ProductUnavailable {
                    product_id: product.id,
                }
                .into());
            }
            resolved.push((product.clone(), line.quantity));
        }

        // Register sales commit consumption at creation; online
        // orders consume nothing until registration.
        let decrements = match request.channel {
            OrderChannel::Register => plan_consumption(resolved.iter().map(|(p, q)| (p, *q)))?,
            OrderChannel::Online => Vec::new(),
        };

        let order = Order::assemble(
            OrderId::new(),
            customer,
            Utc::now().date_naive(),
            &request,
            resolved,
        );

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, order_date, observation, total_quantity,
                                confirmed, registered, paid, payment_method, channel)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer.map(|c| c.as_uuid()))
        .bind(order.date)
        .bind(&order.observation)
        .bind(order.total_quantity as i32)
        .bind(order.status.confirmed)
        .bind(order.status.registered)
        .bind(order.status.paid)
        .bind(order.payment_method.map(|m| m.as_str()))
        .bind(order.channel.as_str())
        .execute(&mut *tx)
        .await?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, line_no, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line.line_no as i32)
            .bind(line.product.id.as_uuid())
            .bind(line.quantity as i32)
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        Self::apply_decrements(&mut tx, &decrements).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn order(&self, id: OrderId) -> Result<Order> {
        self.load_order(id).await
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        match filter.state {
            Some(StateFilter::Solicited) => sql.push_str(" AND NOT confirmed AND NOT registered"),
            Some(StateFilter::PendingPickup) => sql.push_str(" AND confirmed AND NOT registered"),
            Some(StateFilter::Finalized) => sql.push_str(" AND registered"),
            None => {}
        }
        let mut param_count = 0;
        if filter.customer.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_id = ${param_count}"));
        }
        if filter.date.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND order_date = ${param_count}"));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let mut query = sqlx::query(&sql);
        if let Some(customer) = filter.customer {
            query = query.bind(customer.as_uuid());
        }
        if let Some(date) = filter.date {
            query = query.bind(date);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut orders = rows
            .into_iter()
            .map(Self::row_to_order_header)
            .collect::<Result<Vec<Order>>>()?;

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let mut lines = Self::load_lines(&self.pool, &ids).await?;
        for order in &mut orders {
            order.lines = lines.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }

    async fn confirm_order(&self, id: OrderId) -> Result<Order> {
        let updated = sqlx::query("UPDATE orders SET confirmed = TRUE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        self.load_order(id).await
    }

    async fn register_order(&self, id: OrderId) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::OrderNotFound(id))?;
        let header = Self::row_to_order_header(row)?;

        let mut status = header.status;
        let first_registration = status.register()?;
        if !first_registration {
            // Already fulfilled: no state change, no second decrement.
            tx.commit().await?;
            return self.load_order(id).await;
        }

        let line_rows = sqlx::query(
            "SELECT product_id, quantity FROM order_lines WHERE order_id = $1 ORDER BY line_no",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;

        let mut demands = Vec::with_capacity(line_rows.len());
        for row in line_rows {
            let product_id = ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?);
            let quantity = row.try_get::<i32, _>("quantity")? as u32;
            demands.push((product_id, quantity));
        }

        let mut ids: Vec<Uuid> = demands.iter().map(|(p, _)| p.as_uuid()).collect();
        ids.sort_unstable();
        ids.dedup();
        let products = Self::lock_products(&mut tx, &ids).await?;

        // Re-validate activity and stock against current product rows;
        // time has passed since the order was created.
        let mut pairs = Vec::with_capacity(demands.len());
        for (product_id, quantity) in &demands {
            let product = products
                .get(product_id)
                .ok_or(StoreError::ProductNotFound(*product_id))?;
            pairs.push((product, *quantity));
        }
        let decrements = plan_consumption(pairs)?;

        Self::apply_decrements(&mut tx, &decrements).await?;
        sqlx::query("UPDATE orders SET registered = TRUE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.load_order(id).await
    }

    async fn mark_paid(&self, id: OrderId) -> Result<Order> {
        let updated = sqlx::query("UPDATE orders SET paid = TRUE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        self.load_order(id).await
    }
}
