use std::{collections::HashSet, fmt, str::FromStr, time::Duration};
use thiserror::Error;

/// Record types probed for every candidate, in output priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Ns,
    A,
    Cname,
    Mx,
}

impl RecordType {
    pub const ALL: [RecordType; 4] = [RecordType::Ns, RecordType::A, RecordType::Cname, RecordType::Mx];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Ns => "NS",
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownLookup(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFinding {
    pub record_type: RecordType,
    pub values: Vec<String>,
}

impl RecordFinding {
    pub fn tag(record_type: RecordType) -> Self {
        Self { record_type, values: Vec::new() }
    }

    pub fn with_values(record_type: RecordType, values: Vec<String>) -> Self {
        Self { record_type, values }
    }
}

impl fmt::Display for RecordFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.is_empty() {
            f.write_str(self.record_type.as_str())
        } else {
            write!(f, "{}: {}", self.record_type, self.values.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub candidate: String,
    pub findings: Vec<RecordFinding>,
}

impl ProbeResult {
    pub fn is_registered(&self) -> bool {
        !self.findings.is_empty()
    }

    /// The line this result contributes to the output buffer, if any.
    ///
    /// Candidates without findings only show up when running verbose, as the
    /// bare candidate string.
    pub fn output_line(&self, verbose: bool) -> Option<String> {
        if self.is_registered() {
            Some(self.to_string())
        } else if verbose {
            Some(self.candidate.clone())
        } else {
            None
        }
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.candidate)?;
        for (i, finding) in self.findings.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", finding)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Worker count must be at least 1")]
    NoWorkers,
    #[error("Unknown lookup type: {0} (expected NS, A, CNAME, MX or ALL)")]
    UnknownLookup(String),
    #[error("Timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub workers: usize,
    pub verbose: bool,
    pub show_values: bool,
    pub whitelist: HashSet<String>,
    pub lookups: Vec<String>,
    pub timeout: Duration,
}

impl ProbeConfig {
    pub fn in_whitelist(&self, candidate: &str) -> bool {
        self.whitelist.contains(candidate)
    }

    /// No lookups configured, or an `ALL` entry, enables every record type.
    pub fn in_lookups(&self, record_type: RecordType) -> bool {
        self.lookups.is_empty()
            || self.lookups.iter().any(|l| {
                let l = l.trim();
                l.eq_ignore_ascii_case("all") || l.eq_ignore_ascii_case(record_type.as_str())
            })
    }

    pub fn enabled_lookups(&self) -> impl Iterator<Item = RecordType> + '_ {
        RecordType::ALL.into_iter().filter(|t| self.in_lookups(*t))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        for lookup in &self.lookups {
            if !lookup.trim().eq_ignore_ascii_case("all") {
                lookup.parse::<RecordType>()?;
            }
        }
        Ok(())
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            workers: 16,
            verbose: false,
            show_values: false,
            whitelist: HashSet::new(),
            lookups: Vec::new(),
            timeout: Duration::from_secs(5),
        }
    }
}
