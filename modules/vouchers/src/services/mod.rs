pub mod recharge_service;
pub mod stats_service;
pub mod subscription_service;
pub mod subscription_state;
pub mod token_codec;
pub mod voucher_service;
