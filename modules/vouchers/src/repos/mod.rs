pub mod manager_repo;
pub mod outbox_repo;
pub mod payment_repo;
pub mod recharge_repo;
pub mod reseller_repo;
pub mod voucher_repo;
