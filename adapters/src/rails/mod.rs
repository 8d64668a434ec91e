//! Rail modules
//!
//! One module per clearing rail. Shared transport behaviour lives in
//! [`crate::framework::RailClient`]; these modules only produce the rail's
//! wire format and interpret its acknowledgements.

pub mod bankserv;
pub mod payshap;
pub mod rtc;
pub mod samos;
pub mod swift;

use crate::{
    clearing::ClearingAdapter,
    framework::{RailClient, RailInfra},
    Result,
};
use payment_core::Payment;
use serde_json::json;
use std::sync::Arc;
use tenant_config::{ClearingAdapterConfig, Rail};

/// Build the adapter for a configured rail
pub fn build_adapter(
    config: ClearingAdapterConfig,
    infra: RailInfra,
) -> Result<Arc<dyn ClearingAdapter>> {
    let client = RailClient::new(config.clone(), infra)?;
    Ok(match config.rail {
        Rail::Samos => Arc::new(samos::SamosAdapter::new(client)),
        Rail::Bankserv => Arc::new(bankserv::BankservAdapter::new(client)),
        Rail::Rtc => Arc::new(rtc::RtcAdapter::new(client)),
        Rail::PayShap => Arc::new(payshap::PayShapAdapter::new(client)),
        Rail::Swift => Arc::new(swift::SwiftAdapter::new(client)),
    })
}

/// Canonical JSON document used as the source for request payload mappings
pub(crate) fn canonical_document(payment: &Payment) -> serde_json::Value {
    json!({
        "paymentId": payment.payment_id.to_string(),
        "uetr": payment.uetr.as_str(),
        "endToEndId": payment.end_to_end_id,
        "amount": {
            "value": payment.amount.amount.to_string(),
            "currency": payment.amount.currency.as_str(),
        },
        "debtor": {
            "account": payment.debtor.account,
            "bic": payment.debtor.agent_bic,
            "name": payment.debtor.name,
        },
        "creditor": {
            "account": payment.creditor.account,
            "bic": payment.creditor.agent_bic,
            "name": payment.creditor.name,
        },
        "paymentType": payment.payment_type.as_str(),
        "localInstrument": payment.local_instrument,
    })
}
