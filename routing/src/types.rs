//! Routing request and decision types

use payment_core::Money;

/// Attributes the resolver routes on
#[derive(Debug, Clone)]
pub struct RoutingRequest {
    /// Tenant
    pub tenant_id: String,
    /// Payment type code
    pub payment_type: String,
    /// Local instrument, when supplied
    pub local_instrument: Option<String>,
    /// Amount and currency
    pub amount: Money,
    /// Whether either agent sits outside the domestic clearing area
    pub cross_border: bool,
}

/// Which resolution tier produced the decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    /// Explicit tenant routing rule
    TenantRule,
    /// Payment-type default adapter
    PaymentTypeDefault,
    /// Currency/amount heuristic
    Heuristic,
    /// Tenant default adapter
    TenantDefault,
}

/// Ranked adapter candidates
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    /// Adapter ids in preference order; degraded candidates sort last
    pub candidates: Vec<String>,
    /// Resolution tier that matched
    pub source: RouteSource,
}
