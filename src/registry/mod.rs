//! Live metric instruments and text exposition.
//!
//! One [`InstrumentRegistry`] exists per configuration generation: it
//! creates exactly one [`Instrument`] per metric spec and renders them all
//! on demand. The instrument math itself lives in the prometheus crate;
//! this module only adapts specs onto it and dispatches mutations on the
//! closed kind enum.

use crate::config::{GaugeOp, MetricKind, MetricSpec};
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

mod summary;

pub use summary::SummaryVec;

/// Errors raised while building or rendering a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// One live, mutable metric.
///
/// Clones are cheap handles onto the same underlying series, so a sequence
/// runner can own one while the registry keeps rendering it.
#[derive(Clone)]
pub enum Instrument {
    /// Monotonic counter; mutations always add.
    Counter(CounterVec),
    /// Gauge; mutations add, subtract or overwrite per the step operation.
    Gauge(GaugeVec),
    /// Summary; mutations are recorded as observations.
    Summary(SummaryVec),
    /// Histogram; mutations are recorded as observations.
    Histogram(HistogramVec),
}

impl Instrument {
    /// Applies one resolved mutation to this instrument.
    ///
    /// `label_values` must match the declared label arity; validation
    /// guarantees this for every configured step.
    pub fn apply(&self, operation: Option<GaugeOp>, value: f64, label_values: &[String]) {
        let labels: Vec<&str> = label_values.iter().map(String::as_str).collect();
        match self {
            Self::Counter(counter) => {
                if value < 0.0 {
                    warn!(value, "Skipping negative counter increment");
                    return;
                }
                counter.with_label_values(&labels).inc_by(value);
            }
            Self::Gauge(gauge) => {
                let child = gauge.with_label_values(&labels);
                match operation {
                    Some(GaugeOp::Inc) => child.add(value),
                    Some(GaugeOp::Dec) => child.sub(value),
                    Some(GaugeOp::Set) => child.set(value),
                    // Validation requires an operation on every gauge step.
                    None => warn!("Gauge mutation without operation ignored"),
                }
            }
            Self::Summary(summary) => summary.observe(&labels, value),
            Self::Histogram(histogram) => histogram.with_label_values(&labels).observe(value),
        }
    }
}

/// Creates and holds the instruments for one configuration generation.
pub struct InstrumentRegistry {
    registry: Registry,
    instruments: HashMap<String, Instrument>,
}

impl InstrumentRegistry {
    /// Creates one instrument per spec and registers it for exposition.
    ///
    /// Spec names are unique per generation (validation enforces it), so
    /// a registration collision here is a programming error and surfaces
    /// as a [`RegistryError`].
    pub fn build(specs: &[MetricSpec]) -> Result<Self, RegistryError> {
        let registry = Registry::new();
        let mut instruments = HashMap::with_capacity(specs.len());

        for spec in specs {
            let labels: Vec<&str> = spec.label_names.iter().map(String::as_str).collect();
            let instrument = match spec.kind {
                MetricKind::Counter => {
                    let counter = CounterVec::new(
                        Opts::new(spec.name.as_str(), spec.description.as_str()),
                        &labels,
                    )?;
                    registry.register(Box::new(counter.clone()))?;
                    Instrument::Counter(counter)
                }
                MetricKind::Gauge => {
                    let gauge = GaugeVec::new(
                        Opts::new(spec.name.as_str(), spec.description.as_str()),
                        &labels,
                    )?;
                    registry.register(Box::new(gauge.clone()))?;
                    Instrument::Gauge(gauge)
                }
                MetricKind::Summary => {
                    let summary = SummaryVec::new(
                        spec.name.as_str(),
                        spec.description.as_str(),
                        &spec.label_names,
                    )?;
                    registry.register(Box::new(summary.clone()))?;
                    Instrument::Summary(summary)
                }
                MetricKind::Histogram => {
                    let histogram = HistogramVec::new(
                        HistogramOpts::new(spec.name.as_str(), spec.description.as_str()),
                        &labels,
                    )?;
                    registry.register(Box::new(histogram.clone()))?;
                    Instrument::Histogram(histogram)
                }
            };
            instruments.insert(spec.name.clone(), instrument);
        }

        Ok(Self {
            registry,
            instruments,
        })
    }

    /// Returns a handle to the instrument created for `name`, if any.
    pub fn instrument(&self, name: &str) -> Option<Instrument> {
        self.instruments.get(name).cloned()
    }

    /// Renders every registered instrument in text exposition format.
    ///
    /// Safe to call concurrently with in-flight mutations; the output
    /// reflects the latest mutation visible at gather time.
    pub fn render(&self) -> Result<String, RegistryError> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
