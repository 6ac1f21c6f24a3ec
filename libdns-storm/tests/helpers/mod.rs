mod fixture_source;

pub use fixture_source::{FixtureRecords, FixtureSource};
