//! Sum/count summary instruments.
//!
//! The prometheus crate ships no summary type. Generated summaries only
//! need the `_sum` and `_count` series (no quantiles), which a small
//! custom [`Collector`] over the protobuf exposition types can provide.

use prometheus::core::{Collector, Desc};
use prometheus::proto;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// A labeled summary tracking observation count and sum per label set.
///
/// Clones share the same underlying series, matching the behavior of the
/// built-in metric vec types.
#[derive(Clone)]
pub struct SummaryVec {
    desc: Arc<Desc>,
    series: Arc<Mutex<BTreeMap<Vec<String>, Series>>>,
}

#[derive(Debug, Default)]
struct Series {
    count: u64,
    sum: f64,
}

impl SummaryVec {
    /// Creates a summary with the given label dimensions.
    pub fn new(name: &str, help: &str, label_names: &[String]) -> Result<Self, prometheus::Error> {
        let desc = Desc::new(
            name.to_owned(),
            help.to_owned(),
            label_names.to_vec(),
            HashMap::new(),
        )?;
        Ok(Self {
            desc: Arc::new(desc),
            series: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    /// Records one observation for the given label values.
    pub fn observe(&self, label_values: &[&str], value: f64) {
        let key: Vec<String> = label_values.iter().map(|v| (*v).to_owned()).collect();
        let mut series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        let entry = series.entry(key).or_default();
        entry.count += 1;
        entry.sum += value;
    }
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let series = self.series.lock().unwrap_or_else(|e| e.into_inner());

        let mut family = proto::MetricFamily::default();
        family.set_name(self.desc.fq_name.clone());
        family.set_help(self.desc.help.clone());
        family.set_field_type(proto::MetricType::SUMMARY);

        for (label_values, data) in series.iter() {
            let mut summary = proto::Summary::default();
            summary.set_sample_count(data.count);
            summary.set_sample_sum(data.sum);

            let mut metric = proto::Metric::default();
            for (name, value) in self.desc.variable_labels.iter().zip(label_values) {
                let mut pair = proto::LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                metric.mut_label().push(pair);
            }
            metric.set_summary(summary);
            family.mut_metric().push(metric);
        }

        vec![family]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, Registry, TextEncoder};

    fn render(registry: &Registry) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_summary_renders_sum_and_count() {
        let registry = Registry::new();
        let summary = SummaryVec::new("payload_bytes", "Payload sizes", &[]).unwrap();
        registry.register(Box::new(summary.clone())).unwrap();

        summary.observe(&[], 3.0);
        summary.observe(&[], 4.0);

        let output = render(&registry);
        assert!(output.contains("# TYPE payload_bytes summary"));
        assert!(output.contains("payload_bytes_sum 7"));
        assert!(output.contains("payload_bytes_count 2"));
    }

    #[test]
    fn test_summary_tracks_label_sets_independently() {
        let registry = Registry::new();
        let summary =
            SummaryVec::new("rpc_bytes", "RPC sizes", &["method".to_owned()]).unwrap();
        registry.register(Box::new(summary.clone())).unwrap();

        summary.observe(&["get"], 1.0);
        summary.observe(&["get"], 2.0);
        summary.observe(&["put"], 10.0);

        let output = render(&registry);
        assert!(output.contains(r#"rpc_bytes_sum{method="get"} 3"#));
        assert!(output.contains(r#"rpc_bytes_count{method="get"} 2"#));
        assert!(output.contains(r#"rpc_bytes_sum{method="put"} 10"#));
        assert!(output.contains(r#"rpc_bytes_count{method="put"} 1"#));
    }

    #[test]
    fn test_clones_share_series() {
        let summary = SummaryVec::new("shared", "Shared", &[]).unwrap();
        let clone = summary.clone();
        clone.observe(&[], 5.0);

        let families = summary.collect();
        assert_eq!(families[0].get_metric()[0].get_summary().get_sample_count(), 1);
    }
}
