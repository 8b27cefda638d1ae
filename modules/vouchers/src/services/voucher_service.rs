//! Voucher lifecycle business logic
//!
//! Batch creation, device usage stamps, print tracking and manual disable.
//! Codes are upper-case everywhere; lookups normalize their input the same
//! way so hand-typed codes match regardless of case.

use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Voucher, VoucherStatus};
use crate::repos::{manager_repo, reseller_repo, voucher_repo};

/// Voucher codes avoid visually ambiguous characters; these get hand-typed
/// from printed cards.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 10;

/// Attempts per voucher before giving up on a unique code
const CODE_RETRIES: usize = 3;

pub const MAX_BATCH: i32 = 500;

/// Errors that can occur during voucher operations
#[derive(Debug, thiserror::Error)]
pub enum VoucherError {
    #[error("Voucher not found: {0}")]
    NotFound(String),

    #[error("Invalid status for voucher {code}: {status}")]
    InvalidStatus { code: String, status: VoucherStatus },

    #[error("Manager not found: {0}")]
    ManagerNotFound(Uuid),

    #[error("Reseller not found: {0}")]
    ResellerNotFound(Uuid),

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for voucher operations
pub type VoucherResult<T> = Result<T, VoucherError>;

/// Parameters for one batch of vouchers
#[derive(Debug, Clone)]
pub struct VoucherBatch {
    pub count: i32,
    pub profile_name: String,
    pub data_limit_gb: i32,
    pub time_limit_hours: i32,
    pub validity_days: i32,
    pub shelf_id: Option<String>,
    pub reseller_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Create a batch of vouchers in one transaction
///
/// The batch is all-or-nothing: a failed insert rolls back every voucher
/// created before it. Creating vouchers counts as manager activity.
pub async fn create_batch(
    pool: &PgPool,
    manager_id: Uuid,
    batch: &VoucherBatch,
) -> VoucherResult<Vec<Voucher>> {
    if batch.count < 1 || batch.count > MAX_BATCH {
        return Err(VoucherError::InvalidBatch(format!(
            "count must be between 1 and {}, got {}",
            MAX_BATCH, batch.count
        )));
    }
    if batch.validity_days < 1 {
        return Err(VoucherError::InvalidBatch(format!(
            "validity_days must be at least 1, got {}",
            batch.validity_days
        )));
    }
    if batch.data_limit_gb < 0 || batch.time_limit_hours < 0 {
        return Err(VoucherError::InvalidBatch(
            "data and time limits must not be negative".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    manager_repo::lock_by_id_tx(&mut tx, manager_id)
        .await?
        .ok_or(VoucherError::ManagerNotFound(manager_id))?;

    if let Some(reseller_id) = batch.reseller_id {
        reseller_repo::find_for_manager_tx(&mut tx, reseller_id, manager_id)
            .await?
            .ok_or(VoucherError::ResellerNotFound(reseller_id))?;
    }

    let shelf_id = batch.shelf_id.clone().unwrap_or_else(|| "default".to_string());

    let mut vouchers = Vec::with_capacity(batch.count as usize);
    for _ in 0..batch.count {
        let voucher = insert_with_fresh_code(&mut tx, manager_id, batch, &shelf_id).await?;
        vouchers.push(voucher);
    }

    manager_repo::touch_activity_tx(&mut tx, manager_id).await?;

    tx.commit().await?;

    tracing::info!(
        manager_id = %manager_id,
        count = vouchers.len(),
        profile = %batch.profile_name,
        "Voucher batch created"
    );

    Ok(vouchers)
}

/// Insert one voucher, regenerating the code on a unique collision
async fn insert_with_fresh_code(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    manager_id: Uuid,
    batch: &VoucherBatch,
    shelf_id: &str,
) -> VoucherResult<Voucher> {
    let mut last_err = None;

    for _ in 0..CODE_RETRIES {
        let new_voucher = voucher_repo::NewVoucher {
            code: generate_code(),
            profile_name: batch.profile_name.clone(),
            data_limit_gb: batch.data_limit_gb,
            time_limit_hours: batch.time_limit_hours,
            validity_days: batch.validity_days,
            shelf_id: shelf_id.to_string(),
            reseller_id: batch.reseller_id,
            notes: batch.notes.clone(),
        };

        match voucher_repo::insert_tx(tx, manager_id, &new_voucher).await {
            Ok(voucher) => return Ok(voucher),
            Err(e)
                if e.as_database_error()
                    .is_some_and(|db| db.is_unique_violation()) =>
            {
                last_err = Some(e);
            }
            Err(e) => return Err(VoucherError::Database(e)),
        }
    }

    // Repeated unique collisions; surface the last database error
    Err(VoucherError::Database(last_err.unwrap_or(
        sqlx::Error::RowNotFound,
    )))
}

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

pub async fn get(pool: &PgPool, code: &str) -> VoucherResult<Voucher> {
    let code = normalize_code(code);
    voucher_repo::find_by_code(pool, &code)
        .await?
        .ok_or(VoucherError::NotFound(code))
}

/// Stamp a voucher as used by a device
///
/// Repeat calls overwrite the previous stamp; captive portals retry and there
/// is no exactly-once guarantee at this boundary.
pub async fn mark_used(
    pool: &PgPool,
    code: &str,
    mac: Option<&str>,
    ip: Option<&str>,
    device: Option<&str>,
) -> VoucherResult<Voucher> {
    let code = normalize_code(code);
    let voucher = voucher_repo::mark_used(pool, &code, mac, ip, device)
        .await?
        .ok_or(VoucherError::NotFound(code))?;

    tracing::info!(code = %voucher.code, "Voucher marked used");

    Ok(voucher)
}

/// Record a print run; reprints allowed in any status
pub async fn mark_printed(pool: &PgPool, code: &str) -> VoucherResult<Voucher> {
    let code = normalize_code(code);
    let voucher = voucher_repo::mark_printed(pool, &code)
        .await?
        .ok_or(VoucherError::NotFound(code))?;

    Ok(voucher)
}

/// Manual disable, only from active
pub async fn disable(pool: &PgPool, code: &str) -> VoucherResult<Voucher> {
    let code = normalize_code(code);

    if let Some(voucher) = voucher_repo::disable_guarded(pool, &code).await? {
        tracing::info!(code = %voucher.code, "Voucher disabled");
        return Ok(voucher);
    }

    // Guard matched nothing: unknown code or a status with no disable edge
    match voucher_repo::find_by_code(pool, &code).await? {
        None => Err(VoucherError::NotFound(code)),
        Some(v) => Err(VoucherError::InvalidStatus {
            code,
            status: v.status,
        }),
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_upper_alphanumeric() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
            assert_eq!(code, code.to_uppercase());
        }
    }

    #[test]
    fn test_generated_codes_differ() {
        let a = generate_code();
        let b = generate_code();
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  ab2c  "), "AB2C");
        assert_eq!(normalize_code("XYZ234"), "XYZ234");
    }
}
