//! Prometheus counters for metered generation.

use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};

/// Generation outcomes, labelled by operation (`generate`, `refine`,
/// `persona`, `plan`).
pub struct Metrics {
    registry: Registry,
    generations: IntCounterVec,
    failures: IntCounterVec,
    quota_refusals: IntCounterVec,
}

fn counter(
    registry: &Registry,
    name: &str,
    help: &str,
) -> Result<IntCounterVec, prometheus::Error> {
    let counter = IntCounterVec::new(Opts::new(name, help), &["operation"])?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("mindful".to_string()), None)?;

        Ok(Self {
            generations: counter(
                &registry,
                "generations_total",
                "Generations recorded against a quota",
            )?,
            failures: counter(
                &registry,
                "generation_failures_total",
                "Generation calls that failed or returned unusable output",
            )?,
            quota_refusals: counter(
                &registry,
                "quota_refusals_total",
                "Requests refused because the monthly allotment was used up",
            )?,
            registry,
        })
    }

    pub fn generation_succeeded(&self, operation: &str) {
        self.generations.with_label_values(&[operation]).inc();
    }

    pub fn generation_failed(&self, operation: &str) {
        self.failures.with_label_values(&[operation]).inc();
    }

    pub fn quota_refused(&self, operation: &str) {
        self.quota_refusals.with_label_values(&[operation]).inc();
    }

    pub fn generations(&self, operation: &str) -> u64 {
        self.generations.with_label_values(&[operation]).get()
    }

    pub fn failures(&self, operation: &str) -> u64 {
        self.failures.with_label_values(&[operation]).get()
    }

    pub fn quota_refusals(&self, operation: &str) -> u64 {
        self.quota_refusals.with_label_values(&[operation]).get()
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_labelled_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.generation_succeeded("generate");
        metrics.generation_succeeded("generate");
        metrics.generation_failed("plan");
        metrics.quota_refused("refine");

        let text = metrics.render().unwrap();
        assert!(text.contains("mindful_generations_total{operation=\"generate\"} 2"));
        assert!(text.contains("mindful_generation_failures_total{operation=\"plan\"} 1"));
        assert!(text.contains("# TYPE mindful_quota_refusals_total counter"));
        assert!(text.contains("mindful_quota_refusals_total{operation=\"refine\"} 1"));
    }

    #[test]
    fn test_instances_are_independent() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.quota_refused("refine");

        assert_eq!(first.quota_refusals("refine"), 1);
        assert_eq!(second.quota_refusals("refine"), 0);
    }
}
