//! Synthetic Metrics Generator
//!
//! A configuration-driven generator of fake Prometheus metrics. A YAML
//! config declares named metrics (counters, gauges, summaries, histograms);
//! each one gets an independent worker that walks a list of time-boxed
//! value-mutation steps forever, and the accumulated state is served on a
//! pull-based `/metrics` endpoint. Useful for exercising dashboards,
//! alerting rules and monitoring pipelines without instrumenting real code.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! config file → metric specs → instrument registry
//!                    ↓               ↑
//!            sequence runners (one per metric, mutating over time)
//!                    ↓               ↓
//!            fleet supervisor → HTTP exposition
//! ```
//!
//! # Design Principles
//!
//! - **One generation at a time**: a config snapshot, its instruments and
//!   its workers live and die together; reload fully drains the old fleet
//!   before the new one starts.
//! - **Bounded shutdown**: workers poll cancellation around every sleep,
//!   so stop and reload wait at most one interval, never a full step.
//! - **Fail-fast validation**: ambiguous config (gauges without an
//!   operation, label mismatches) is rejected at parse time, not at
//!   mutation time.
//!
//! # Example
//!
//! ```no_run
//! use synthmetrics::fleet::FleetSupervisor;
//!
//! # async fn demo() -> Result<(), synthmetrics::fleet::FleetError> {
//! let fleet = FleetSupervisor::new("config.yaml");
//! fleet.start().await?;
//!
//! // Serve this from an HTTP handler:
//! let exposition = fleet.render().await?;
//!
//! // Operator changed the file? Drain and rebuild everything:
//! fleet.reload().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod fleet;
pub mod registry;
pub mod runner;
pub mod server;

// Re-export commonly used types at crate root
pub use config::{ConfigError, GaugeOp, MetricKind, MetricSpec, SequenceStep, ValueSource};
pub use fleet::{FleetError, FleetSupervisor};
pub use registry::{Instrument, InstrumentRegistry};
pub use server::{AppState, WebPing};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
