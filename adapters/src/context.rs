//! Tenant/service context headers
//!
//! Several downstream systems share a host:port behind a bank gateway; these
//! headers are how the gateway demultiplexes. They are set on every outbound
//! call, no exceptions.

/// Downstream service class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    /// Fraud scoring service
    Fraud,
    /// Clearing rail gateway
    Clearing,
    /// Core banking ledger
    Ledger,
}

impl ServiceType {
    /// Header value
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Fraud => "fraud",
            ServiceType::Clearing => "clearing",
            ServiceType::Ledger => "ledger",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Context header set injected on every outbound call
pub fn context_headers(tenant_id: &str, service: ServiceType) -> Vec<(&'static str, String)> {
    vec![
        ("X-Tenant-ID", tenant_id.to_string()),
        ("X-Service-Type", service.as_str().to_string()),
        ("X-Route-Context", format!("{}-{}", tenant_id, service)),
        ("X-Downstream-Route", format!("{}-system", service)),
        ("X-Bank-Route", format!("/{}/{}", service, tenant_id)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_contract() {
        let headers = context_headers("T1", ServiceType::Clearing);
        let get = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("X-Tenant-ID"), "T1");
        assert_eq!(get("X-Service-Type"), "clearing");
        assert_eq!(get("X-Route-Context"), "T1-clearing");
        assert_eq!(get("X-Downstream-Route"), "clearing-system");
        assert_eq!(get("X-Bank-Route"), "/clearing/T1");
    }
}
