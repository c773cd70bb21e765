//! Metric series extracted from training log lines.
//!
//! The training CLI prints one dict per logging step, e.g.
//! `{'loss': 1.23, 'learning_rate': 1e-05, 'global_step/max_steps': '5/100'}`.

use serde::Serialize;
use serde_json::{Map, Value};

/// Metrics plotted for a running job, in display order.
pub const PLOT_METRICS: &[&str] = &["loss", "acc", "learning_rate", "eval_loss", "eval_acc", "grad_norm"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    pub name: String,
    /// `(step, value)` pairs in log order.
    pub points: Vec<(u64, f64)>,
}

/// Parse a single log line into a metric map, if it is one.
#[must_use]
pub fn parse_metric_line(line: &str) -> Option<Map<String, Value>> {
    let line = line.trim();
    if !(line.starts_with('{') && line.ends_with('}')) {
        return None;
    }
    let normalized = line
        .replace('\'', "\"")
        .replace(": True", ": true")
        .replace(": False", ": false")
        .replace(": None", ": null");
    match serde_json::from_str::<Value>(&normalized) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn step_of(metrics: &Map<String, Value>) -> Option<u64> {
    let progress = metrics.get("global_step/max_steps")?.as_str()?;
    progress.split('/').next()?.trim().parse().ok()
}

/// Accumulates plotted metrics one log line at a time.
///
/// Lines without a `global_step/max_steps` entry are numbered by their
/// position among metric lines.
#[derive(Debug, Clone)]
pub struct PlotCollector {
    series: Vec<PlotSeries>,
    ordinal: u64,
}

impl Default for PlotCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotCollector {
    #[must_use]
    pub fn new() -> Self {
        let series = PLOT_METRICS
            .iter()
            .map(|name| PlotSeries { name: (*name).to_string(), points: Vec::new() })
            .collect();
        Self { series, ordinal: 0 }
    }

    /// Add the metrics of `line`, if it is a metric line.
    pub fn push(&mut self, line: &str) {
        let Some(metrics) = parse_metric_line(line) else {
            return;
        };
        self.ordinal += 1;
        let step = step_of(&metrics).unwrap_or(self.ordinal);
        for s in &mut self.series {
            if let Some(value) = metrics.get(&s.name).and_then(Value::as_f64) {
                s.points.push((step, value));
            }
        }
    }

    #[must_use]
    pub fn series(&self) -> &[PlotSeries] {
        &self.series
    }

    #[must_use]
    pub fn into_series(self) -> Vec<PlotSeries> {
        self.series
    }
}

/// Collect one series per plotted metric from the given lines.
#[must_use]
pub fn collect_plots<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<PlotSeries> {
    let mut collector = PlotCollector::new();
    for line in lines {
        collector.push(line);
    }
    collector.into_series()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metric_line() {
        let m = parse_metric_line("{'loss': 1.5, 'learning_rate': 1e-05, 'global_step/max_steps': '3/10'}").unwrap();
        assert_eq!(m["loss"].as_f64(), Some(1.5));
        assert_eq!(step_of(&m), Some(3));
        assert!(parse_metric_line("[INFO] training started").is_none());
    }

    #[test]
    fn test_collect_plots() {
        let lines = [
            "starting",
            "{'loss': 2.0, 'global_step/max_steps': '1/4'}",
            "{'loss': 1.0, 'grad_norm': 0.5, 'global_step/max_steps': '2/4'}",
            "{'eval_loss': 1.2}",
        ];
        let plots = collect_plots(lines);
        let loss = plots.iter().find(|p| p.name == "loss").unwrap();
        assert_eq!(loss.points, vec![(1, 2.0), (2, 1.0)]);
        let eval = plots.iter().find(|p| p.name == "eval_loss").unwrap();
        assert_eq!(eval.points, vec![(3, 1.2)]);
        assert_eq!(plots.len(), PLOT_METRICS.len());
    }

    #[test]
    fn test_collector_keeps_full_history() {
        let mut collector = PlotCollector::new();
        collector.push("{'loss': 3.0}");
        collector.push("noise");
        collector.push("{'loss': 2.0}");
        let loss = collector.series().iter().find(|p| p.name == "loss").unwrap();
        assert_eq!(loss.points, vec![(1, 3.0), (2, 2.0)]);
    }
}
