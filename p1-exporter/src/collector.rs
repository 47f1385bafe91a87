use std::{fmt::Write, time::Instant};

use meter_domain::domain::Reading;
use tokio::sync::Mutex;

use crate::pipeline::{LineSource, Pipeline, PipelineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
        }
    }
}

/// Static description of one metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub label_names: &'static [&'static str],
}

/// One value of a metric family, with label values in `label_names` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub desc: MetricDesc,
    pub label_values: Vec<String>,
    pub value: f64,
}

#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    #[error("reading unavailable: {0}")]
    ReadingUnavailable(#[from] PipelineError),
}

/// Pull-side contract used by the scrape endpoint.
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    /// Metric families this collector can produce. Never touches the device.
    fn describe(&self) -> Vec<MetricDesc>;

    /// Take a fresh reading and turn it into samples.
    async fn collect(&self) -> Result<Vec<Sample>, CollectError>;
}

/// Collects the meter's cumulative totals, one telegram per scrape.
pub struct MeterCollector<S> {
    pipeline: Pipeline<S>,
    electricity: MetricDesc,
    gas: MetricDesc,
    // Serialises scrapes so the device is only ever opened once at a time.
    flight: Mutex<()>,
}

impl<S> MeterCollector<S>
where
    S: LineSource,
{
    pub fn new(pipeline: Pipeline<S>) -> Self {
        Self {
            pipeline,
            electricity: MetricDesc {
                name: "energy_electricity_total",
                help: "Electricity usage",
                kind: MetricKind::Counter,
                label_names: &["type"],
            },
            gas: MetricDesc {
                name: "energy_gas_total",
                help: "Gas usage",
                kind: MetricKind::Counter,
                label_names: &[],
            },
            flight: Mutex::new(()),
        }
    }

    /// Run one collection cycle and return the reading.
    pub async fn read(&self) -> Result<Reading, CollectError> {
        let _flight = self.flight.lock().await;
        let started = Instant::now();
        let source = self.pipeline.source.name();

        let res = self.pipeline.run().await;
        metrics::histogram!("p1_collection_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match res {
            Ok(reading) => {
                metrics::counter!("p1_collections_total", "outcome" => "ok").increment(1);
                tracing::debug!(
                    source,
                    electricity_low = reading.electricity_low,
                    electricity_normal = reading.electricity_normal,
                    gas = reading.gas,
                    "collected meter reading"
                );
                Ok(reading)
            }
            Err(e) => {
                metrics::counter!("p1_collections_total", "outcome" => "unavailable").increment(1);
                tracing::warn!(source, error = %e, "meter reading unavailable");
                Err(e.into())
            }
        }
    }

    fn samples(&self, reading: &Reading) -> Vec<Sample> {
        vec![
            Sample {
                desc: self.electricity,
                label_values: vec!["low".to_string()],
                value: reading.electricity_low,
            },
            Sample {
                desc: self.electricity,
                label_values: vec!["normal".to_string()],
                value: reading.electricity_normal,
            },
            Sample {
                desc: self.gas,
                label_values: Vec::new(),
                value: reading.gas,
            },
        ]
    }
}

#[async_trait::async_trait]
impl<S> Collector for MeterCollector<S>
where
    S: LineSource,
{
    fn describe(&self) -> Vec<MetricDesc> {
        vec![self.electricity, self.gas]
    }

    async fn collect(&self) -> Result<Vec<Sample>, CollectError> {
        let reading = self.read().await?;
        Ok(self.samples(&reading))
    }
}

/// Render samples in the Prometheus text exposition format.
///
/// Families are written in `descs` order; samples whose family is not
/// described are skipped.
pub fn render_exposition(descs: &[MetricDesc], samples: &[Sample]) -> String {
    let mut out = String::new();

    for desc in descs {
        let _ = writeln!(out, "# HELP {} {}", desc.name, escape_help(desc.help));
        let _ = writeln!(out, "# TYPE {} {}", desc.name, desc.kind.as_str());

        for sample in samples.iter().filter(|s| s.desc.name == desc.name) {
            out.push_str(desc.name);
            if !desc.label_names.is_empty() {
                out.push('{');
                let labels = desc.label_names.iter().zip(&sample.label_values);
                for (i, (name, value)) in labels.enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{name}=\"{}\"", escape_label_value(value));
                }
                out.push('}');
            }
            out.push(' ');
            out.push_str(&format_value(sample.value));
            out.push('\n');
        }
    }

    out
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

fn escape_help(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}
