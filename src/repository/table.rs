//! Database table operations and implementations.

use chrono::DateTime;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::model::BroadcastModel;
use crate::model::ReferrerEntry;
use crate::model::ServiceStateModel;
use crate::model::SubscriberModel;
use crate::model::SubscriberStats;
use crate::repository::error::DatabaseError;

/// Base table struct providing database pool access.
#[derive(Clone)]
pub struct BaseTable {
    pub pool: SqlitePool,
}

impl BaseTable {
    /// Creates a new base table with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Base trait for table operations.
#[async_trait::async_trait]
pub trait TableBase {
    /// Drops the table.
    async fn drop_table(&self) -> Result<(), DatabaseError>;
    /// Deletes all rows from the table.
    async fn delete_all(&self) -> Result<(), DatabaseError>;
}

/// Trait for tables with CRUD operations.
#[async_trait::async_trait]
pub trait Table<T, ID>: TableBase {
    async fn select_all(&self) -> Result<Vec<T>, DatabaseError>;
    async fn insert(&self, model: &T) -> Result<ID, DatabaseError>;
    async fn select(&self, id: &ID) -> Result<Option<T>, DatabaseError>;
    async fn update(&self, model: &T) -> Result<(), DatabaseError>;
    async fn delete(&self, id: &ID) -> Result<(), DatabaseError>;
    async fn replace(&self, model: &T) -> Result<ID, DatabaseError>;
}

macro_rules! impl_table {
    (
        $struct_name:ident,
        $model:ty,
        $table:expr,
        $pk:ident,
        $id_type:ty,
        $cols:expr,
        $vals:expr,
        [ $( $field:ident ),+ ],
        $update_set:expr,
        [ $( $update_field:ident ),+ ]
    ) => {
        #[derive(Clone)]
        pub struct $struct_name {
            base: BaseTable,
        }

        impl $struct_name {
            pub fn new(pool: SqlitePool) -> Self {
                Self {
                    base: BaseTable::new(pool),
                }
            }
        }

        #[async_trait::async_trait]
        impl TableBase for $struct_name {
            async fn drop_table(&self) -> Result<(), DatabaseError> {
                sqlx::query(concat!("DROP TABLE IF EXISTS ", $table))
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }

            async fn delete_all(&self) -> Result<(), DatabaseError> {
                sqlx::query(concat!("DELETE FROM ", $table))
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }
        }

        #[async_trait::async_trait]
        impl Table<$model, $id_type> for $struct_name {
            async fn select_all(&self) -> Result<Vec<$model>, DatabaseError> {
                Ok(sqlx::query_as::<_, $model>(concat!("SELECT * FROM ", $table))
                    .fetch_all(&self.base.pool)
                    .await?)
            }

            async fn select(&self, id: &$id_type) -> Result<Option<$model>, DatabaseError> {
                Ok(sqlx::query_as::<_, $model>(concat!(
                    "SELECT * FROM ", $table, " WHERE ", stringify!($pk), " = ?"
                ))
                .bind(id)
                .fetch_optional(&self.base.pool)
                .await?)
            }

            async fn insert(&self, model: &$model) -> Result<$id_type, DatabaseError> {
                let mut query = sqlx::query_as::<_, ($id_type,)>(concat!(
                    "INSERT INTO ", $table, " (", $cols, ") VALUES (", $vals, ") RETURNING ",
                    stringify!($pk)
                ));
                $(
                    query = query.bind(&model.$field);
                )+
                let row = query.fetch_one(&self.base.pool).await?;
                Ok(row.0)
            }

            async fn update(&self, model: &$model) -> Result<(), DatabaseError> {
                let mut query = sqlx::query(concat!(
                    "UPDATE ", $table, " SET ", $update_set, " WHERE ", stringify!($pk), " = ?"
                ));
                $(
                    query = query.bind(&model.$update_field);
                )+
                query = query.bind(&model.$pk);
                query.execute(&self.base.pool).await?;
                Ok(())
            }

            async fn delete(&self, id: &$id_type) -> Result<(), DatabaseError> {
                sqlx::query(concat!("DELETE FROM ", $table, " WHERE ", stringify!($pk), " = ?"))
                    .bind(id)
                    .execute(&self.base.pool)
                    .await?;
                Ok(())
            }

            async fn replace(&self, model: &$model) -> Result<$id_type, DatabaseError> {
                let mut query = sqlx::query_as::<_, ($id_type,)>(concat!(
                    "REPLACE INTO ", $table, " (", $cols, ") VALUES (", $vals, ") RETURNING ",
                    stringify!($pk)
                ));
                $(
                    query = query.bind(&model.$field);
                )+
                let row = query.fetch_one(&self.base.pool).await?;
                Ok(row.0)
            }
        }
    };
}

// ============================================================================
// SubscriberTable
// ============================================================================

impl_table!(
    SubscriberTable,
    SubscriberModel,
    "subscribers",
    id,
    i64,
    "id, name, referrer_id, joined_at, is_blocked",
    "?, ?, ?, ?, ?",
    [id, name, referrer_id, joined_at, is_blocked],
    "name = ?, referrer_id = ?, joined_at = ?, is_blocked = ?",
    [name, referrer_id, joined_at, is_blocked]
);

impl SubscriberTable {
    /// Inserts the subscriber unless a row with the same id exists.
    ///
    /// Returns `true` when a row was created.
    pub async fn insert_if_absent(&self, model: &SubscriberModel) -> Result<bool, DatabaseError> {
        let res = sqlx::query(
            r#"
            INSERT OR IGNORE INTO subscribers (id, name, referrer_id, joined_at, is_blocked)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(model.id)
        .bind(&model.name)
        .bind(model.referrer_id)
        .bind(model.joined_at)
        .bind(model.is_blocked)
        .execute(&self.base.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Sets the blocked flag. Returns `false` if the subscriber doesn't exist.
    pub async fn mark_blocked(&self, id: i64) -> Result<bool, DatabaseError> {
        let res = sqlx::query("UPDATE subscribers SET is_blocked = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.base.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn update_name(&self, id: i64, name: Option<&str>) -> Result<bool, DatabaseError> {
        let res = sqlx::query("UPDATE subscribers SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.base.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Ids of every subscriber that has not blocked the bot, in ascending order.
    pub async fn select_active_ids(&self) -> Result<Vec<i64>, DatabaseError> {
        Ok(
            sqlx::query_scalar::<_, i64>(
                "SELECT id FROM subscribers WHERE is_blocked = 0 ORDER BY id",
            )
            .fetch_all(&self.base.pool)
            .await?,
        )
    }

    pub async fn count_by_referrer(&self, referrer_id: i64) -> Result<i64, DatabaseError> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscribers WHERE referrer_id = ?")
                .bind(referrer_id)
                .fetch_one(&self.base.pool)
                .await?,
        )
    }

    /// Referrers ordered by referral count, highest first. Ties are ordered by id.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of entries, or `None` for all of them.
    pub async fn select_referrer_ranking(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<ReferrerEntry>, DatabaseError> {
        // SQLite treats a negative LIMIT as "no limit"
        let limit = limit.map_or(-1, i64::from);
        Ok(sqlx::query_as::<_, ReferrerEntry>(
            r#"
            SELECT r.referrer_id AS id, s.name AS name, COUNT(*) AS count
            FROM subscribers r
            LEFT JOIN subscribers s ON s.id = r.referrer_id
            WHERE r.referrer_id IS NOT NULL
            GROUP BY r.referrer_id
            ORDER BY count DESC, r.referrer_id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.base.pool)
        .await?)
    }

    /// Counts subscribers in total, blocked, and joined after each of the given instants.
    pub async fn select_stats(
        &self,
        today_start: DateTime<Utc>,
        week_start: DateTime<Utc>,
        month_start: DateTime<Utc>,
    ) -> Result<SubscriberStats, DatabaseError> {
        Ok(sqlx::query_as::<_, SubscriberStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN is_blocked THEN 1 ELSE 0 END), 0) AS blocked,
                COALESCE(SUM(CASE WHEN joined_at >= ? THEN 1 ELSE 0 END), 0) AS new_today,
                COALESCE(SUM(CASE WHEN joined_at >= ? THEN 1 ELSE 0 END), 0) AS new_this_week,
                COALESCE(SUM(CASE WHEN joined_at >= ? THEN 1 ELSE 0 END), 0) AS new_this_month
            FROM subscribers
            "#,
        )
        .bind(today_start)
        .bind(week_start)
        .bind(month_start)
        .fetch_one(&self.base.pool)
        .await?)
    }
}

// ============================================================================
// BroadcastTable
// ============================================================================

impl_table!(
    BroadcastTable,
    BroadcastModel,
    "broadcasts",
    id,
    i64,
    "text, created_at",
    "?, ?",
    [text, created_at],
    "text = ?, created_at = ?",
    [text, created_at]
);

impl BroadcastTable {
    /// Most recent broadcasts, newest first.
    pub async fn select_recent(&self, limit: u32) -> Result<Vec<BroadcastModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, BroadcastModel>(
            "SELECT * FROM broadcasts ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.base.pool)
        .await?)
    }

    /// Broadcasts created at or after `since`, newest first.
    pub async fn select_recent_since(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<BroadcastModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, BroadcastModel>(
            r#"
            SELECT * FROM broadcasts
            WHERE created_at >= ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.base.pool)
        .await?)
    }

    /// Deletes every broadcast created before `cutoff`. Returns the number of deleted rows.
    pub async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let res = sqlx::query("DELETE FROM broadcasts WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.base.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

// ============================================================================
// ServiceStateTable
// ============================================================================

impl_table!(
    ServiceStateTable,
    ServiceStateModel,
    "service_states",
    name,
    String,
    "name, is_failing, hourly_count, daily_count, updated_at",
    "?, ?, ?, ?, ?",
    [name, is_failing, hourly_count, daily_count, updated_at],
    "is_failing = ?, hourly_count = ?, daily_count = ?, updated_at = ?",
    [is_failing, hourly_count, daily_count, updated_at]
);
