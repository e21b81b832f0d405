//! Validated metric specifications.
//!
//! Lowers the raw YAML document into typed specs. Kind and operation
//! strings are resolved to closed enums here, once, so no string matching
//! survives into the mutation path.

use super::schema::{ConfigFile, RawMetric, RawStep, RawValue};
use rand::Rng;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("duplicate metric name `{0}`")]
    DuplicateMetric(String),

    #[error("metric `{metric}`: gauge steps require an explicit operation")]
    MissingGaugeOperation { metric: String },

    #[error("metric `{metric}`: unknown gauge operation `{operation}`")]
    UnknownGaugeOperation { metric: String, operation: String },

    #[error("metric `{metric}`: step has neither `value` nor `values`")]
    MissingValue { metric: String },

    #[error("metric `{metric}`: step has both `value` and `values`")]
    AmbiguousValue { metric: String },

    #[error("metric `{metric}`: malformed range `{raw}`: {reason}")]
    InvalidRange {
        metric: String,
        raw: String,
        reason: String,
    },

    #[error("metric `{metric}`: counter values must be non-negative")]
    NegativeCounterValue { metric: String },

    #[error("metric `{metric}`: `{field}` must be a positive number")]
    InvalidDuration { metric: String, field: &'static str },

    #[error("metric `{metric}`: step is missing a value for label `{label}`")]
    MissingLabelValue { metric: String, label: String },

    #[error("metric `{metric}`: step sets undeclared label `{label}`")]
    UndeclaredLabel { metric: String, label: String },
}

/// The kind of instrument a metric maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically increasing counter.
    Counter,
    /// Freely settable gauge.
    Gauge,
    /// Observation summary (count and sum).
    Summary,
    /// Bucketed observation histogram.
    Histogram,
}

impl MetricKind {
    /// Resolves a config `type` string, case-insensitively.
    fn from_config(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "counter" => Some(Self::Counter),
            "gauge" => Some(Self::Gauge),
            "summary" => Some(Self::Summary),
            "histogram" => Some(Self::Histogram),
            _ => None,
        }
    }
}

/// How a gauge step mutates its instrument. Counters always add and
/// summaries/histograms always observe, so only gauges carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeOp {
    /// Add the resolved value.
    Inc,
    /// Subtract the resolved value.
    Dec,
    /// Overwrite with the resolved value.
    Set,
}

impl GaugeOp {
    fn from_config(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "inc" => Some(Self::Inc),
            "dec" => Some(Self::Dec),
            "set" => Some(Self::Set),
            _ => None,
        }
    }
}

/// A numeric literal, keeping the int/float distinction from the config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Sample {
    /// Written without a decimal point.
    Int(i64),
    /// Written with a decimal point.
    Float(f64),
}

impl Sample {
    /// The value as a float, for instrument mutation.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl From<RawValue> for Sample {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Int(v) => Self::Int(v),
            RawValue::Float(v) => Self::Float(v),
        }
    }
}

/// Where a step's mutation values come from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// The same value on every mutation.
    Fixed(Sample),
    /// A fresh uniform sample from `[low, high)` on every mutation.
    /// Both endpoints share one type; a decimal point in the range
    /// string makes the whole range a float range.
    Range {
        /// Inclusive lower bound.
        low: Sample,
        /// Exclusive upper bound.
        high: Sample,
    },
}

impl ValueSource {
    /// Resolves the next mutation value.
    pub fn resolve(&self) -> f64 {
        match *self {
            Self::Fixed(sample) => sample.as_f64(),
            Self::Range {
                low: Sample::Int(low),
                high: Sample::Int(high),
            } => rand::rng().random_range(low..high) as f64,
            Self::Range { low, high } => rand::rng().random_range(low.as_f64()..high.as_f64()),
        }
    }

    /// Smallest value this source can ever produce.
    fn min_value(&self) -> f64 {
        match *self {
            Self::Fixed(sample) => sample.as_f64(),
            Self::Range { low, .. } => low.as_f64(),
        }
    }
}

/// One time-boxed phase of a metric's evolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceStep {
    /// Wall-clock window during which this step is active, in seconds.
    pub eval_time: f64,
    /// Sleep between successive mutations, in seconds.
    pub interval: f64,
    /// Label values in declaration order; empty for unlabeled metrics.
    pub label_values: Vec<String>,
    /// Fixed value or uniform range.
    pub source: ValueSource,
    /// Gauge operation; always `Some` for gauge metrics, `None` otherwise.
    pub operation: Option<GaugeOp>,
}

/// One fully validated metric definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSpec {
    /// Unique metric name; identity key for its instrument.
    pub name: String,
    /// Help text for the exposition output.
    pub description: String,
    /// Instrument kind.
    pub kind: MetricKind,
    /// Declared label names, in exposition order.
    pub label_names: Vec<String>,
    /// The cycle of steps the sequence runner walks forever. An empty
    /// list makes the runner idle until its generation is torn down.
    pub sequences: Vec<SequenceStep>,
}

/// Reads and validates the configuration file at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<MetricSpec>, ConfigError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse(&content)
}

/// Validates a configuration document.
///
/// Metrics with an unknown `type` are dropped with a warning; all other
/// validation failures abort the parse. See [`ConfigError`].
pub fn parse(content: &str) -> Result<Vec<MetricSpec>, ConfigError> {
    let file: ConfigFile = serde_yaml::from_str(content)?;

    let mut specs: Vec<MetricSpec> = Vec::with_capacity(file.config.len());
    for raw in file.config {
        let Some(kind) = MetricKind::from_config(&raw.kind) else {
            warn!(metric = %raw.name, kind = %raw.kind, "Unknown metric type, skipping");
            continue;
        };
        if specs.iter().any(|spec| spec.name == raw.name) {
            return Err(ConfigError::DuplicateMetric(raw.name));
        }
        specs.push(validate_metric(raw, kind)?);
    }
    Ok(specs)
}

fn validate_metric(raw: RawMetric, kind: MetricKind) -> Result<MetricSpec, ConfigError> {
    let mut sequences = Vec::with_capacity(raw.sequence.len());
    for step in raw.sequence {
        sequences.push(validate_step(&raw.name, kind, &raw.labels, step)?);
    }
    Ok(MetricSpec {
        name: raw.name,
        description: raw.description,
        kind,
        label_names: raw.labels,
        sequences,
    })
}

fn validate_step(
    metric: &str,
    kind: MetricKind,
    label_names: &[String],
    raw: RawStep,
) -> Result<SequenceStep, ConfigError> {
    let operation = match kind {
        MetricKind::Gauge => match raw.operation.as_deref() {
            Some(op) => Some(GaugeOp::from_config(op).ok_or_else(|| {
                ConfigError::UnknownGaugeOperation {
                    metric: metric.to_owned(),
                    operation: op.to_owned(),
                }
            })?),
            None => {
                return Err(ConfigError::MissingGaugeOperation {
                    metric: metric.to_owned(),
                })
            }
        },
        MetricKind::Counter | MetricKind::Summary | MetricKind::Histogram => None,
    };

    let source = match (raw.value, raw.values) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::AmbiguousValue {
                metric: metric.to_owned(),
            })
        }
        (Some(value), None) => ValueSource::Fixed(value.into()),
        (None, Some(range)) => parse_range(metric, &range)?,
        (None, None) => {
            return Err(ConfigError::MissingValue {
                metric: metric.to_owned(),
            })
        }
    };
    if kind == MetricKind::Counter && source.min_value() < 0.0 {
        return Err(ConfigError::NegativeCounterValue {
            metric: metric.to_owned(),
        });
    }

    // Zero is as bad as negative here: a zero interval turns the runner's
    // mutate-then-sleep loop into a busy spin for the whole step window.
    let eval_time = raw.eval_time.unwrap_or(1.0);
    let interval = raw.interval.unwrap_or(1.0);
    for (field, seconds) in [("eval_time", eval_time), ("interval", interval)] {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(ConfigError::InvalidDuration {
                metric: metric.to_owned(),
                field,
            });
        }
    }

    // Step labels are written as a name → value mapping; the exposition
    // side wants them positional, in declaration order.
    let mut label_values = Vec::with_capacity(label_names.len());
    for name in label_names {
        match raw.labels.get(name) {
            Some(value) => label_values.push(value.clone()),
            None => {
                return Err(ConfigError::MissingLabelValue {
                    metric: metric.to_owned(),
                    label: name.clone(),
                })
            }
        }
    }
    if let Some(extra) = raw.labels.keys().find(|key| !label_names.contains(key)) {
        return Err(ConfigError::UndeclaredLabel {
            metric: metric.to_owned(),
            label: extra.clone(),
        });
    }

    Ok(SequenceStep {
        eval_time,
        interval,
        label_values,
        source,
        operation,
    })
}

/// Parses a `"low-high"` range string.
///
/// The string is split on a single `-`, so a negative lower bound cannot
/// be expressed with this syntax; a leading `-` is rejected rather than
/// guessed at.
fn parse_range(metric: &str, raw: &str) -> Result<ValueSource, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidRange {
        metric: metric.to_owned(),
        raw: raw.to_owned(),
        reason: reason.to_owned(),
    };

    let mut parts = raw.splitn(2, '-');
    let (low, high) = match (parts.next(), parts.next()) {
        (Some(low), Some(high)) if !low.trim().is_empty() && !high.trim().is_empty() => {
            (low.trim(), high.trim())
        }
        _ => return Err(invalid("expected `low-high` with non-negative bounds")),
    };

    if raw.contains('.') {
        let low: f64 = low.parse().map_err(|_| invalid("bounds must be numbers"))?;
        let high: f64 = high.parse().map_err(|_| invalid("bounds must be numbers"))?;
        if !(low < high) {
            return Err(invalid("low must be less than high"));
        }
        Ok(ValueSource::Range {
            low: Sample::Float(low),
            high: Sample::Float(high),
        })
    } else {
        let low: i64 = low.parse().map_err(|_| invalid("bounds must be numbers"))?;
        let high: i64 = high.parse().map_err(|_| invalid("bounds must be numbers"))?;
        if low >= high {
            return Err(invalid("low must be less than high"));
        }
        Ok(ValueSource::Range {
            low: Sample::Int(low),
            high: Sample::Int(high),
        })
    }
}
