use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewPayment, Payment, PaymentId, PaymentStatus},
};

const PAYMENT_COLUMNS: &str = "id, order_id, final_amount, method, gateway_type, status, gateway_id, agent, created_at, \
                               updated_at, purchased_at";

/// Stores a new payment with status `Paying`. Not atomic; see [`super::orders::insert_order_with_item`].
pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, SqliteDatabaseError> {
    if fetch_payment(&payment.id, conn).await?.is_some() {
        return Err(SqliteDatabaseError::DuplicatePayment(payment.id));
    }
    let sql = format!(
        r#"
            INSERT INTO payments (id, order_id, final_amount, method, gateway_type, status, gateway_id, agent, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {PAYMENT_COLUMNS};
        "#
    );
    let record = sqlx::query_as::<_, Payment>(&sql)
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(payment.final_amount)
        .bind(&payment.method)
        .bind(&payment.gateway_type)
        .bind(PaymentStatus::Paying)
        .bind(&payment.gateway_id)
        .bind(&payment.agent)
        .bind(payment.created_at)
        .fetch_one(conn)
        .await?;
    debug!("🗃️ Payment {} for order {} saved (remote order {}, agent {})", record.id, record.order_id, record.gateway_id, record.agent);
    Ok(record)
}

pub async fn fetch_payment(
    payment_id: &PaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SqliteDatabaseError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
    let payment = sqlx::query_as::<_, Payment>(&sql).bind(payment_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payments_by_status(
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, SqliteDatabaseError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE status = $1 ORDER BY created_at ASC");
    let payments = sqlx::query_as::<_, Payment>(&sql).bind(status).fetch_all(conn).await?;
    trace!("🗃️ {} payments with status {status}", payments.len());
    Ok(payments)
}

/// Moves the payment from `from` to `to`. Returns `None`, and changes nothing, if the payment is not in state `from`.
///
/// `purchased_at` is only written when moving to `Payed`.
pub async fn transition_status(
    payment_id: &PaymentId,
    from: PaymentStatus,
    to: PaymentStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SqliteDatabaseError> {
    let purchased_at = (to == PaymentStatus::Payed).then_some(now);
    let sql = format!(
        r#"
            UPDATE payments SET status = $1, updated_at = $2, purchased_at = COALESCE($3, purchased_at)
            WHERE id = $4 AND status = $5
            RETURNING {PAYMENT_COLUMNS}
        "#
    );
    let payment = sqlx::query_as::<_, Payment>(&sql)
        .bind(to)
        .bind(now)
        .bind(purchased_at)
        .bind(payment_id)
        .bind(from)
        .fetch_optional(conn)
        .await?;
    if payment.is_some() {
        trace!("🗃️ Payment {payment_id} moved from {from} to {to}");
    }
    Ok(payment)
}
