use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    pub value: f64,
}

/// A single series returned by a datasource, independent of the engine
/// that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metric {
    pub labels: BTreeMap<String, String>,
    pub samples: Vec<Sample>,
}

impl Metric {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self {
            labels,
            samples: Vec::new(),
        }
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Inserts the label, replacing the previous value if any.
    pub fn set_label(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(name.into(), value.into());
    }

    pub fn del_label(&mut self, name: &str) -> Option<String> {
        self.labels.remove(name)
    }

    pub fn push_sample(&mut self, timestamp: i64, value: f64) {
        self.samples.push(Sample { timestamp, value });
    }

    pub fn with_sample(mut self, timestamp: i64, value: f64) -> Self {
        self.push_sample(timestamp, value);
        self
    }

    /// The most recent sample, which is the only one for instant queries.
    pub fn last_sample(&self) -> Option<&Sample> {
        self.samples.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn labels_are_unique() {
        let mut metric = Metric::default();
        metric.set_label("job", "node");
        metric.set_label("job", "vmagent");
        assert_eq!(metric.labels.len(), 1);
        assert_eq!(metric.label("job"), Some("vmagent"));

        assert_eq!(metric.del_label("job"), Some("vmagent".to_string()));
        assert_eq!(metric.label("job"), None);
    }

    #[test]
    fn samples_keep_insertion_order() {
        let metric = Metric::default()
            .with_sample(20, 2.0)
            .with_sample(10, 1.0);
        let timestamps: Vec<_> = metric.samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![20, 10]);
        assert_eq!(metric.last_sample().map(|s| s.value), Some(1.0));
    }
}
