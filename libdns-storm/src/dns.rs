use async_trait::async_trait;
use hickory_resolver::{
    config::{LookupIpStrategy, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
    proto::rr::{RData, RecordType as WireType},
    ResolveError, TokioResolver,
};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("{0}")]
    Failed(String),
}

/// The four record queries a candidate is probed with.
///
/// An `Ok` with an empty list and an `Err` mean the same thing to the
/// resolver: the record type contributes no finding.
#[async_trait]
pub trait RecordSource: Send + Sync + 'static {
    async fn lookup_ns(&self, name: &str) -> Result<Vec<String>, LookupError>;
    async fn lookup_ip(&self, name: &str) -> Result<Vec<String>, LookupError>;
    async fn lookup_cname(&self, name: &str) -> Result<Vec<String>, LookupError>;
    async fn lookup_mx(&self, name: &str) -> Result<Vec<String>, LookupError>;
}

pub fn create_dns_resolver(timeout: Duration) -> TokioResolver {
    let mut builder = match TokioResolver::builder_tokio() {
        Ok(builder) => builder,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read system DNS config, using defaults");
            TokioResolver::builder_with_config(
                ResolverConfig::default(),
                TokioConnectionProvider::default(),
            )
        }
    };

    apply_options(builder.options_mut(), timeout);
    builder.build()
}

fn apply_options(opts: &mut ResolverOpts, timeout: Duration) {
    opts.timeout = timeout;
    opts.attempts = 1;
    opts.ndots = 0;
    // Both address families, like a host lookup.
    opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
}

/// Absolute form of a candidate, so the resolver never tries it with the
/// host's search domains appended.
fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

pub struct HickorySource {
    resolver: TokioResolver,
}

impl HickorySource {
    pub fn new(timeout: Duration) -> Self {
        Self::from_resolver(create_dns_resolver(timeout))
    }

    pub fn from_resolver(resolver: TokioResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl RecordSource for HickorySource {
    async fn lookup_ns(&self, name: &str) -> Result<Vec<String>, LookupError> {
        let lookup = self.resolver.ns_lookup(fqdn(name)).await?;
        Ok(lookup.iter().map(|ns| ns.0.to_string()).collect())
    }

    async fn lookup_ip(&self, name: &str) -> Result<Vec<String>, LookupError> {
        let lookup = self.resolver.lookup_ip(fqdn(name)).await?;
        Ok(lookup.iter().map(|ip| ip.to_string()).collect())
    }

    async fn lookup_cname(&self, name: &str) -> Result<Vec<String>, LookupError> {
        let lookup = self.resolver.lookup(fqdn(name), WireType::CNAME).await?;
        Ok(lookup
            .iter()
            .filter_map(|rdata| match rdata {
                RData::CNAME(cname) => Some(cname.0.to_string()),
                _ => None,
            })
            .collect())
    }

    async fn lookup_mx(&self, name: &str) -> Result<Vec<String>, LookupError> {
        let lookup = self.resolver.mx_lookup(fqdn(name)).await?;
        Ok(lookup.iter().map(|mx| mx.exchange().to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_resolve_both_address_families() {
        let mut opts = ResolverOpts::default();
        apply_options(&mut opts, Duration::from_secs(3));

        assert_eq!(opts.ip_strategy, LookupIpStrategy::Ipv4AndIpv6);
        assert_eq!(opts.timeout, Duration::from_secs(3));
        assert_eq!(opts.attempts, 1);
        assert_eq!(opts.ndots, 0);
    }

    #[test]
    fn test_candidates_are_queried_fully_qualified() {
        assert_eq!(fqdn("foo.com"), "foo.com.");
        assert_eq!(fqdn("a0"), "a0.");
        assert_eq!(fqdn("already.example."), "already.example.");
    }
}
