#![allow(dead_code)]

use async_trait::async_trait;
use libdns_storm::{Controller, LookupError, RecordSource};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// In-memory DNS zone
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FixtureRecords {
    pub ns: Vec<String>,
    pub ip: Vec<String>,
    pub cname: Vec<String>,
    pub mx: Vec<String>,
}

impl FixtureRecords {
    pub fn a(ips: &[&str]) -> Self {
        Self {
            ip: strings(ips),
            ..Self::default()
        }
    }

    pub fn full(ns: &[&str], ip: &[&str], cname: &[&str], mx: &[&str]) -> Self {
        Self {
            ns: strings(ns),
            ip: strings(ip),
            cname: strings(cname),
            mx: strings(mx),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Answers lookups from a fixed table. Unknown names return an empty answer,
/// names registered with `fail` return an error for every record type.
pub struct FixtureSource {
    zone: HashMap<String, FixtureRecords>,
    failing: HashSet<String>,
    queried: Mutex<HashSet<String>>,
    calls: AtomicU64,
    delay: Option<Duration>,
    cancel_on: Option<(String, Controller)>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self {
            zone: HashMap::new(),
            failing: HashSet::new(),
            queried: Mutex::new(HashSet::new()),
            calls: AtomicU64::new(0),
            delay: None,
            cancel_on: None,
        }
    }

    pub fn with(mut self, name: &str, records: FixtureRecords) -> Self {
        self.zone.insert(name.to_string(), records);
        self
    }

    pub fn fail(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Interrupts `controller` the first time `name` is looked up.
    pub fn cancel_on(mut self, name: &str, controller: &Controller) -> Self {
        self.cancel_on = Some((name.to_string(), controller.clone()));
        self
    }

    pub fn queried(&self) -> HashSet<String> {
        self.queried.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    async fn answer<F>(&self, name: &str, pick: F) -> Result<Vec<String>, LookupError>
    where
        F: Fn(&FixtureRecords) -> &Vec<String>,
    {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.queried.lock().unwrap().insert(name.to_string());

        if let Some((trigger, controller)) = &self.cancel_on {
            if trigger == name {
                controller.interrupt();
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(name) {
            return Err(LookupError::Failed(format!("SERVFAIL for {name}")));
        }
        Ok(self.zone.get(name).map(|r| pick(r).clone()).unwrap_or_default())
    }
}

#[async_trait]
impl RecordSource for FixtureSource {
    async fn lookup_ns(&self, name: &str) -> Result<Vec<String>, LookupError> {
        self.answer(name, |r| &r.ns).await
    }

    async fn lookup_ip(&self, name: &str) -> Result<Vec<String>, LookupError> {
        self.answer(name, |r| &r.ip).await
    }

    async fn lookup_cname(&self, name: &str) -> Result<Vec<String>, LookupError> {
        self.answer(name, |r| &r.cname).await
    }

    async fn lookup_mx(&self, name: &str) -> Result<Vec<String>, LookupError> {
        self.answer(name, |r| &r.mx).await
    }
}
