//! Per-metric sequence workers.
//!
//! One runner per configured metric walks that metric's sequence list
//! forever: each step computes a deadline `now + eval_time`, then mutates
//! the instrument and sleeps `interval` until the deadline passes, at which
//! point the next step (wrapping back to the first) takes over.
//!
//! Cancellation is cooperative. The token is checked at the top of the
//! outer cycle, at the top of each step and immediately after each sleep,
//! so shutdown latency is bounded by one interval rather than one full
//! step window.

use crate::config::MetricSpec;
use crate::registry::Instrument;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Spawns the worker task for one metric.
///
/// The task runs until `token` is cancelled; the supervisor keeps the
/// returned handle so it can join the worker during a drain.
pub fn spawn(spec: MetricSpec, instrument: Instrument, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(run(spec, instrument, token))
}

async fn run(spec: MetricSpec, instrument: Instrument, token: CancellationToken) {
    debug!(metric = %spec.name, steps = spec.sequences.len(), "Sequence runner started");

    if spec.sequences.is_empty() {
        // Nothing to generate; park until the generation is torn down.
        token.cancelled().await;
        debug!(metric = %spec.name, "Sequence runner stopped");
        return;
    }

    'cycle: while !token.is_cancelled() {
        for (index, step) in spec.sequences.iter().enumerate() {
            if token.is_cancelled() {
                break 'cycle;
            }

            trace!(
                metric = %spec.name,
                step = index,
                eval_time = step.eval_time,
                interval = step.interval,
                "Entering sequence step"
            );
            let deadline = Instant::now() + Duration::from_secs_f64(step.eval_time);

            while Instant::now() < deadline {
                let value = step.source.resolve();
                instrument.apply(step.operation, value, &step.label_values);

                tokio::time::sleep(Duration::from_secs_f64(step.interval)).await;
                if token.is_cancelled() {
                    break 'cycle;
                }
            }
        }
    }

    debug!(metric = %spec.name, "Sequence runner stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::registry::InstrumentRegistry;

    fn fixture(yaml: &str) -> (MetricSpec, InstrumentRegistry) {
        let mut specs = config::parse(yaml).unwrap();
        let registry = InstrumentRegistry::build(&specs).unwrap();
        (specs.remove(0), registry)
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_step_paces_increments() {
        // Four increments fit in a 2s window at 0.5s spacing.
        let (spec, registry) = fixture(
            r#"
config:
  - name: requests_total
    description: d
    type: counter
    sequence: [{eval_time: 2, interval: 0.5, value: 1}]
"#,
        );
        let token = CancellationToken::new();
        let instrument = registry.instrument(&spec.name).unwrap();
        let handle = spawn(spec, instrument, token.clone());

        tokio::time::sleep(Duration::from_millis(1900)).await;
        token.cancel();
        handle.await.unwrap();

        let output = registry.render().unwrap();
        assert!(output.contains("requests_total 4"), "got:\n{output}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_cycles_back_to_first_step() {
        let (spec, registry) = fixture(
            r#"
config:
  - name: cycling_total
    description: d
    type: counter
    sequence: [{eval_time: 1, interval: 1, value: 1}]
"#,
        );
        let token = CancellationToken::new();
        let instrument = registry.instrument(&spec.name).unwrap();
        let handle = spawn(spec, instrument, token.clone());

        // One mutation per 1s cycle; after 3.5s the step has restarted
        // three times on top of its first run.
        tokio::time::sleep(Duration::from_millis(3500)).await;
        token.cancel();
        handle.await.unwrap();

        let output = registry.render().unwrap();
        assert!(output.contains("cycling_total 4"), "got:\n{output}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_gauge_two_step_sequence() {
        // Step one sets 10, step two adds 5; after one full cycle the
        // rendered value reflects the second step having run last.
        let (spec, registry) = fixture(
            r#"
config:
  - name: temp
    description: d
    type: gauge
    sequence:
      - {eval_time: 1, interval: 1, operation: set, value: 10}
      - {eval_time: 1, interval: 1, operation: inc, value: 5}
"#,
        );
        let token = CancellationToken::new();
        let instrument = registry.instrument(&spec.name).unwrap();
        let handle = spawn(spec, instrument, token.clone());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        token.cancel();
        handle.await.unwrap();

        let output = registry.render().unwrap();
        assert!(output.contains("temp 15"), "got:\n{output}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_latency_bounded_by_interval() {
        // A 300s step must not delay shutdown: the runner wakes from its
        // 0.1s interval sleep, sees the cancellation and exits.
        let (spec, registry) = fixture(
            r#"
config:
  - name: slow_total
    description: d
    type: counter
    sequence: [{eval_time: 300, interval: 0.1, value: 1}]
"#,
        );
        let token = CancellationToken::new();
        let instrument = registry.instrument(&spec.name).unwrap();
        let handle = spawn(spec, instrument, token.clone());

        tokio::time::sleep(Duration::from_millis(250)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .expect("runner should stop within one interval, not eval_time")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_sequence_idles_until_cancelled() {
        let (spec, registry) = fixture(
            r#"
config:
  - name: idle_total
    description: d
    type: counter
"#,
        );
        let token = CancellationToken::new();
        let instrument = registry.instrument(&spec.name).unwrap();
        let handle = spawn(spec, instrument, token.clone());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!handle.is_finished());

        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("idle runner should stop promptly")
            .unwrap();

        // Never mutated: no series to render.
        let output = registry.render().unwrap();
        assert!(!output.contains("idle_total 0"), "got:\n{output}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_labeled_steps_target_their_series() {
        let (spec, registry) = fixture(
            r#"
config:
  - name: http_total
    description: d
    type: counter
    labels: [method]
    sequence:
      - {eval_time: 1, interval: 0.5, value: 1, labels: {method: GET}}
      - {eval_time: 1, interval: 0.5, value: 1, labels: {method: POST}}
"#,
        );
        let token = CancellationToken::new();
        let instrument = registry.instrument(&spec.name).unwrap();
        let handle = spawn(spec, instrument, token.clone());

        tokio::time::sleep(Duration::from_millis(1900)).await;
        token.cancel();
        handle.await.unwrap();

        let output = registry.render().unwrap();
        assert!(output.contains(r#"http_total{method="GET"} 2"#), "got:\n{output}");
        assert!(output.contains(r#"http_total{method="POST"} 2"#), "got:\n{output}");
    }
}
