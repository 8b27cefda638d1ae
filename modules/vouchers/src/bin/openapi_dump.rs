//! Prints the API schema document to stdout, for contract checks and client
//! generation.

use utoipa::OpenApi;

use vouchers_rs::contracts::{
    ActivateManagerRequestV1, ActivateManagerResponseV1, BalanceChangeRequestV1,
    CreateManagerRequestV1, CreateRechargeRequestV1, CreateResellerRequestV1,
    CreateVoucherBatchRequestV1, GenerateTokenRequestV1, GenerateTokenResponseV1,
    ManagerListResponseV1, ManagerResponseV1, MarkVoucherUsedRequestV1, RechargeResponseV1,
    RedeemTokenRequestV1, ResellerDetailResponseV1, SuspendManagerRequestV1,
    VoucherBatchResponseV1,
};
use vouchers_rs::models::{
    Manager, ManagerPayment, ManagerStatus, PaymentMethod, PaymentStatus, Recharge,
    RechargeMethod, RechargeStatus, Reseller, ResellerStatus, Voucher, VoucherStatus,
};
use vouchers_rs::repos::payment_repo::{RevenueBucket, RevenuePeriod};
use vouchers_rs::repos::recharge_repo::{ManagerRechargeRollup, ResellerRechargeRollup};
use vouchers_rs::services::stats_service::{
    DashboardStats, ExpiringManager, ManagerCounts, ManagerDetail, RecentManager, StatsPeriod,
    VoucherStatusRollup,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vouchers API",
        description = "Subscription lifecycle, voucher resale and reseller settlement"
    ),
    components(schemas(
        CreateManagerRequestV1,
        ActivateManagerRequestV1,
        ActivateManagerResponseV1,
        SuspendManagerRequestV1,
        ManagerResponseV1,
        ManagerListResponseV1,
        GenerateTokenRequestV1,
        GenerateTokenResponseV1,
        RedeemTokenRequestV1,
        CreateVoucherBatchRequestV1,
        VoucherBatchResponseV1,
        MarkVoucherUsedRequestV1,
        CreateResellerRequestV1,
        BalanceChangeRequestV1,
        ResellerDetailResponseV1,
        CreateRechargeRequestV1,
        RechargeResponseV1,
        Manager,
        ManagerPayment,
        Reseller,
        Voucher,
        Recharge,
        ManagerStatus,
        PaymentMethod,
        PaymentStatus,
        ResellerStatus,
        VoucherStatus,
        RechargeMethod,
        RechargeStatus,
        DashboardStats,
        ManagerCounts,
        RecentManager,
        ExpiringManager,
        VoucherStatusRollup,
        ManagerDetail,
        StatsPeriod,
        RevenueBucket,
        RevenuePeriod,
        ManagerRechargeRollup,
        ResellerRechargeRollup,
    ))
)]
struct ApiDoc;

fn main() {
    let doc = ApiDoc::openapi();
    println!(
        "{}",
        doc.to_pretty_json()
            .expect("Failed to serialize OpenAPI document")
    );
}
