mod cancel;
mod dns;
pub mod pattern;
mod prober;
mod resolver;
mod types;

pub use cancel::{Controller, RunState};
pub use dns::{create_dns_resolver, HickorySource, LookupError, RecordSource};
pub use pattern::{Pattern, PatternError};
pub use prober::{Counter, Outcome, Progress, Prober, ProberError, RunReport, QUEUE_CAPACITY};
pub use resolver::Resolver;
pub use types::{ConfigError, ProbeConfig, ProbeResult, RecordFinding, RecordType};

use std::sync::Arc;

/// Expands `pattern` and runs every candidate through `source` to completion,
/// without progress reporting or signal handling.
pub async fn run_pattern<S: RecordSource>(
    pattern: &Pattern,
    config: ProbeConfig,
    source: S,
) -> Result<RunReport, ProberError> {
    let prober = Prober::with_source(config, source)?;
    prober
        .run(pattern.candidates(), &Controller::new(), Arc::new(Counter::new()))
        .await
}
