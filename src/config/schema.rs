//! Raw on-disk shapes of the configuration document.
//!
//! These structs mirror the YAML layout exactly; all semantic validation
//! happens in [`super::model`] when the raw document is lowered into
//! [`crate::config::MetricSpec`] values.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Top-level configuration document.
#[derive(Debug, Deserialize)]
pub(super) struct ConfigFile {
    /// The list of configured metrics.
    pub config: Vec<RawMetric>,
}

/// One metric entry as written in the config file.
#[derive(Debug, Deserialize)]
pub(super) struct RawMetric {
    pub name: String,
    pub description: String,
    /// Metric kind, case-insensitive ("counter", "gauge", "summary", "histogram").
    #[serde(rename = "type")]
    pub kind: String,
    /// Declared label names, in exposition order.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub sequence: Vec<RawStep>,
}

/// One sequence step as written in the config file.
#[derive(Debug, Deserialize)]
pub(super) struct RawStep {
    /// Wall-clock window for this step, in seconds.
    pub eval_time: Option<f64>,
    /// Sleep between mutations, in seconds.
    pub interval: Option<f64>,
    /// Label name → value mapping for this step.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Fixed mutation value.
    pub value: Option<RawValue>,
    /// Uniform range as a `"low-high"` string.
    pub values: Option<String>,
    /// Gauge operation ("inc", "dec", "set"); required for gauges.
    pub operation: Option<String>,
}

/// A numeric literal, typed by its YAML syntax: `1` is an integer,
/// `1.0` a float.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub(super) enum RawValue {
    Int(i64),
    Float(f64),
}
