//! Recharge business logic: the three-entity transaction
//!
//! A recharge advances the voucher, settles the reseller and appends a ledger
//! row. All three land in one Postgres transaction; a recharge credited to a
//! reseller without an advancing voucher (or the reverse) is a correctness
//! bug, not a degraded mode. Both rows are locked FOR UPDATE first, so a
//! recharge racing the expiry sweep or another recharge serializes cleanly.

use sqlx::PgPool;
use uuid::Uuid;

use crate::events;
use crate::models::{Recharge, RechargeMethod, Voucher, VoucherStatus};
use crate::repos::reseller_repo::{self, ResellerError};
use crate::repos::{manager_repo, recharge_repo, voucher_repo};

/// Errors that can occur during a recharge
#[derive(Debug, thiserror::Error)]
pub enum RechargeError {
    #[error("Voucher not found: {0}")]
    VoucherNotFound(String),

    #[error("Voucher {code} is not rechargeable from {status}")]
    NotRechargeable { code: String, status: VoucherStatus },

    #[error("Reseller error: {0}")]
    Reseller(#[from] ResellerError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for recharge operations
pub type RechargeResult<T> = Result<T, RechargeError>;

/// Parameters for one recharge
#[derive(Debug, Clone)]
pub struct RechargeRequest {
    pub voucher_code: String,
    pub reseller_id: Uuid,
    pub amount_minor: i64,
    pub data_added_gb: i32,
    /// Explicit commission wins; otherwise computed from the reseller's rate
    pub commission_minor: Option<i64>,
    pub system_fee_minor: i64,
    pub payment_method: RechargeMethod,
    pub notes: Option<String>,
}

/// What a completed recharge looks like to the caller
#[derive(Debug, Clone)]
pub struct RechargeOutcome {
    pub recharge: Recharge,
    pub voucher: Voucher,
    /// Signed change applied to the reseller balance: -(amount - commission)
    pub reseller_balance_delta: i64,
    pub reseller_balance_minor: i64,
}

/// Commission from the reseller's rate when the caller does not fix it
pub fn commission_for(amount_minor: i64, rate: f64) -> i64 {
    (amount_minor as f64 * rate).round() as i64
}

/// Execute a recharge
///
/// Transition rules: only `used` and `expired` vouchers can be recharged.
/// The reseller pays `amount - commission` out of their balance and the
/// voucher's full validity window restarts from now.
pub async fn execute(pool: &PgPool, request: &RechargeRequest) -> RechargeResult<RechargeOutcome> {
    if request.amount_minor <= 0 {
        return Err(RechargeError::Validation(format!(
            "amount_minor must be positive, got {}",
            request.amount_minor
        )));
    }
    if request.data_added_gb < 0 {
        return Err(RechargeError::Validation(format!(
            "data_added_gb must not be negative, got {}",
            request.data_added_gb
        )));
    }
    if request.system_fee_minor < 0 {
        return Err(RechargeError::Validation(format!(
            "system_fee_minor must not be negative, got {}",
            request.system_fee_minor
        )));
    }

    let mut tx = pool.begin().await?;

    let code = request.voucher_code.trim().to_uppercase();
    let voucher = voucher_repo::lock_by_code_tx(&mut tx, &code)
        .await?
        .ok_or_else(|| RechargeError::VoucherNotFound(code.clone()))?;

    if !matches!(voucher.status, VoucherStatus::Used | VoucherStatus::Expired) {
        return Err(RechargeError::NotRechargeable {
            code,
            status: voucher.status,
        });
    }

    let reseller = reseller_repo::lock_by_id_tx(&mut tx, request.reseller_id)
        .await?
        .filter(|r| r.manager_id == voucher.manager_id)
        .ok_or(RechargeError::Reseller(ResellerError::NotFound(
            request.reseller_id,
        )))?;

    let commission = match request.commission_minor {
        Some(explicit) => explicit,
        None => commission_for(request.amount_minor, reseller.commission_rate),
    };
    if commission < 0 || commission > request.amount_minor {
        return Err(RechargeError::Validation(format!(
            "commission_minor must be between 0 and the amount, got {}",
            commission
        )));
    }

    // The reseller keeps their commission, so the balance debit is net of it
    let cost = request.amount_minor - commission;

    let settled = reseller_repo::apply_recharge_settlement_tx(
        &mut tx,
        reseller.id,
        cost,
        commission,
        request.amount_minor,
    )
    .await?;

    let voucher = voucher_repo::recharge_reset_tx(&mut tx, voucher.id).await?;

    let ledger = recharge_repo::insert_tx(
        &mut tx,
        &recharge_repo::NewRecharge {
            voucher_id: voucher.id,
            reseller_id: reseller.id,
            manager_id: voucher.manager_id,
            amount_minor: request.amount_minor,
            data_added_gb: request.data_added_gb,
            commission_minor: commission,
            system_fee_minor: request.system_fee_minor,
            payment_method: request.payment_method,
            notes: request.notes.clone(),
        },
    )
    .await?;

    manager_repo::touch_activity_tx(&mut tx, voucher.manager_id).await?;

    events::emit_tx(
        &mut tx,
        events::VOUCHER_RECHARGED,
        voucher.manager_id,
        events::VoucherRecharged {
            voucher_id: voucher.id,
            code: voucher.code.clone(),
            reseller_id: reseller.id,
            amount_minor: request.amount_minor,
            commission_minor: commission,
            expires_at: voucher.expires_at,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        code = %voucher.code,
        reseller_id = %reseller.id,
        amount_minor = request.amount_minor,
        commission_minor = commission,
        "Voucher recharged"
    );

    Ok(RechargeOutcome {
        recharge: ledger,
        voucher,
        reseller_balance_delta: -cost,
        reseller_balance_minor: settled.balance_minor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_rounds_to_nearest() {
        assert_eq!(commission_for(1000, 0.10), 100);
        assert_eq!(commission_for(999, 0.10), 100);
        assert_eq!(commission_for(994, 0.10), 99);
        assert_eq!(commission_for(1000, 0.0), 0);
    }

    #[test]
    fn test_commission_full_rate() {
        assert_eq!(commission_for(2500, 1.0), 2500);
    }
}
