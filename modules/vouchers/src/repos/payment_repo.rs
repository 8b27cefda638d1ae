use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{ManagerPayment, PaymentMethod, PaymentStatus};

/// Revenue chart granularity. The period picks both the lookback window and
/// the bucket key: day buckets 30 days, week buckets 12 ISO weeks, month
/// buckets 12 months, year buckets 5 years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RevenuePeriod {
    Day,
    Week,
    Month,
    Year,
}

/// One revenue bucket: completed payment sum and count keyed by period label
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct RevenueBucket {
    pub bucket: String,
    pub total_minor: i64,
    pub count: i64,
}

/// Rolled-up totals over completed payments
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentTotals {
    pub total_payments: i64,
    pub total_revenue_minor: i64,
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    manager_id: Uuid,
    amount_minor: i64,
    months: i32,
    method: PaymentMethod,
    status: PaymentStatus,
    transaction_id: Option<&str>,
    notes: Option<&str>,
) -> Result<ManagerPayment, sqlx::Error> {
    sqlx::query_as::<_, ManagerPayment>(
        r#"
        INSERT INTO manager_payments
            (manager_id, amount_minor, months, method, status, transaction_id, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING
            id, manager_id, amount_minor, months, method, status,
            transaction_id, notes, created_at
        "#,
    )
    .bind(manager_id)
    .bind(amount_minor)
    .bind(months)
    .bind(method)
    .bind(status)
    .bind(transaction_id)
    .bind(notes)
    .fetch_one(&mut **tx)
    .await
}

pub async fn list_for_manager(
    pool: &PgPool,
    manager_id: Uuid,
    limit: i64,
) -> Result<Vec<ManagerPayment>, sqlx::Error> {
    sqlx::query_as::<_, ManagerPayment>(
        r#"
        SELECT
            id, manager_id, amount_minor, months, method, status,
            transaction_id, notes, created_at
        FROM manager_payments
        WHERE manager_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(manager_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Count and revenue sum over all completed payments, for the dashboard
pub async fn completed_totals(pool: &PgPool) -> Result<PaymentTotals, sqlx::Error> {
    sqlx::query_as::<_, PaymentTotals>(
        r#"
        SELECT
            COUNT(*) AS total_payments,
            COALESCE(SUM(amount_minor), 0)::BIGINT AS total_revenue_minor
        FROM manager_payments
        WHERE status = 'completed'
        "#,
    )
    .fetch_one(pool)
    .await
}

/// Bucketed revenue over completed payments, ascending by bucket label.
/// ISO year-week keys keep week buckets sortable as text.
pub async fn revenue_series(
    pool: &PgPool,
    period: RevenuePeriod,
) -> Result<Vec<RevenueBucket>, sqlx::Error> {
    let sql = match period {
        RevenuePeriod::Day => {
            r#"
            SELECT to_char(created_at, 'YYYY-MM-DD') AS bucket,
                   SUM(amount_minor)::BIGINT AS total_minor,
                   COUNT(*) AS count
            FROM manager_payments
            WHERE status = 'completed'
              AND created_at >= NOW() - INTERVAL '30 days'
            GROUP BY bucket
            ORDER BY bucket ASC
            "#
        }
        RevenuePeriod::Week => {
            r#"
            SELECT to_char(created_at, 'IYYY-"W"IW') AS bucket,
                   SUM(amount_minor)::BIGINT AS total_minor,
                   COUNT(*) AS count
            FROM manager_payments
            WHERE status = 'completed'
              AND created_at >= NOW() - INTERVAL '84 days'
            GROUP BY bucket
            ORDER BY bucket ASC
            "#
        }
        RevenuePeriod::Month => {
            r#"
            SELECT to_char(created_at, 'YYYY-MM') AS bucket,
                   SUM(amount_minor)::BIGINT AS total_minor,
                   COUNT(*) AS count
            FROM manager_payments
            WHERE status = 'completed'
              AND created_at >= NOW() - INTERVAL '12 months'
            GROUP BY bucket
            ORDER BY bucket ASC
            "#
        }
        RevenuePeriod::Year => {
            r#"
            SELECT to_char(created_at, 'YYYY') AS bucket,
                   SUM(amount_minor)::BIGINT AS total_minor,
                   COUNT(*) AS count
            FROM manager_payments
            WHERE status = 'completed'
              AND created_at >= NOW() - INTERVAL '5 years'
            GROUP BY bucket
            ORDER BY bucket ASC
            "#
        }
    };

    sqlx::query_as::<_, RevenueBucket>(sql).fetch_all(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_period_wire_casing() {
        for (wire, period) in [
            ("\"day\"", RevenuePeriod::Day),
            ("\"week\"", RevenuePeriod::Week),
            ("\"month\"", RevenuePeriod::Month),
            ("\"year\"", RevenuePeriod::Year),
        ] {
            let parsed: RevenuePeriod = serde_json::from_str(wire).unwrap();
            assert_eq!(parsed, period);
            assert_eq!(serde_json::to_string(&period).unwrap(), wire);
        }
    }

    #[test]
    fn test_revenue_period_rejects_unknown_value() {
        assert!(serde_json::from_str::<RevenuePeriod>("\"quarter\"").is_err());
    }
}
