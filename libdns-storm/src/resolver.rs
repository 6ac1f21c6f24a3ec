use crate::{
    dns::{LookupError, RecordSource},
    types::{ProbeConfig, RecordFinding, RecordType},
};
use std::sync::Arc;
use tracing::debug;

/// Turns the four raw record queries into ordered findings for one candidate.
pub struct Resolver<S> {
    source: Arc<S>,
    config: Arc<ProbeConfig>,
}

impl<S: RecordSource> Resolver<S> {
    pub fn new(source: Arc<S>, config: Arc<ProbeConfig>) -> Self {
        Self { source, config }
    }

    /// Findings come back in NS, A, CNAME, MX order no matter which queries
    /// finish first. Failed lookups are logged and dropped.
    pub async fn resolve(&self, candidate: &str) -> Vec<RecordFinding> {
        let (ns, a, cname, mx) = tokio::join!(
            self.query(RecordType::Ns, candidate),
            self.query(RecordType::A, candidate),
            self.query(RecordType::Cname, candidate),
            self.query(RecordType::Mx, candidate),
        );

        [ns, a, cname, mx].into_iter().flatten().collect()
    }

    async fn query(&self, record_type: RecordType, candidate: &str) -> Option<RecordFinding> {
        if !self.config.in_lookups(record_type) {
            return None;
        }

        let result = match record_type {
            RecordType::Ns => self.source.lookup_ns(candidate).await,
            RecordType::A => self.source.lookup_ip(candidate).await,
            RecordType::Cname => self.source.lookup_cname(candidate).await,
            RecordType::Mx => self.source.lookup_mx(candidate).await,
        };

        let values = match result {
            Ok(values) if !values.is_empty() => values,
            Ok(_) => return None,
            Err(e) => {
                log_absorbed(record_type, candidate, &e);
                return None;
            }
        };

        if !self.config.show_values {
            return Some(RecordFinding::tag(record_type));
        }

        Some(RecordFinding::with_values(record_type, shape_values(record_type, values)))
    }
}

/// NS and MX hosts are sorted; addresses keep resolver order and only the
/// first canonical name is kept.
fn shape_values(record_type: RecordType, mut values: Vec<String>) -> Vec<String> {
    match record_type {
        RecordType::Ns | RecordType::Mx => values.sort(),
        RecordType::Cname => values.truncate(1),
        RecordType::A => {}
    }
    values
}

fn log_absorbed(record_type: RecordType, candidate: &str, error: &LookupError) {
    debug!(candidate = %candidate, record = %record_type, error = %error, "lookup yielded no finding");
}

impl<S> Clone for Resolver<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            config: Arc::clone(&self.config),
        }
    }
}
