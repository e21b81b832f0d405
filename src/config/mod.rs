//! Declarative metric configuration.
//!
//! The config file is a YAML document with a top-level `config` list; each
//! entry names a metric, its kind, its label dimensions and an ordered list
//! of time-boxed sequence steps. [`parse`] lowers that document into
//! validated [`MetricSpec`] values; [`load`] reads it from disk first.
//!
//! Validation is fail-fast for anything that would make a metric behave
//! unpredictably (gauge steps without an operation, label mismatches,
//! malformed ranges) and lenient only for unknown metric kinds, which are
//! skipped with a warning so one typo does not take down the whole fleet.

mod model;
mod schema;

pub use model::{
    load, parse, ConfigError, GaugeOp, MetricKind, MetricSpec, Sample, SequenceStep, ValueSource,
};
