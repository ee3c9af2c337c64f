/*!
Logging setup and optional Prometheus metrics.

The library only emits `tracing` events; binaries decide where they go by
calling [`init_logging`] or [`init_observability`] once at startup. With the
`metrics` feature every context carries its own [`PrefsMetrics`] registry.
*/

#[cfg(feature = "metrics")]
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};
use tracing::subscriber::set_global_default;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{PrefsError, Result};

/// Counters and histograms of one preferences context
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct PrefsMetrics {
    pub snapshots_total: Counter,
    pub restores_total: Counter,
    pub callback_failures_total: Counter,
    pub document_bytes: Histogram,

    registry: Registry,
}

#[cfg(feature = "metrics")]
impl PrefsMetrics {
    pub(crate) fn new() -> Result<Self> {
        let registry = Registry::new();

        let snapshots_total = Counter::new("prefs_snapshots_total", "Objects converted to nodes")
            .map_err(|e| PrefsError::custom(format!("Failed to create snapshots_total metric: {e}")))?;

        let restores_total = Counter::new("prefs_restores_total", "Objects created from nodes")
            .map_err(|e| PrefsError::custom(format!("Failed to create restores_total metric: {e}")))?;

        let callback_failures_total = Counter::new(
            "prefs_callback_failures_total",
            "Class callbacks that returned an error",
        )
        .map_err(|e| {
            PrefsError::custom(format!("Failed to create callback_failures_total metric: {e}"))
        })?;

        let buckets = prometheus::exponential_buckets(64.0, 4.0, 8)
            .map_err(|e| PrefsError::custom(format!("Invalid document_bytes buckets: {e}")))?;
        let document_bytes = Histogram::with_opts(
            HistogramOpts::new("prefs_document_bytes", "Size of encoded documents in bytes").buckets(buckets),
        )
        .map_err(|e| PrefsError::custom(format!("Failed to create document_bytes metric: {e}")))?;

        for (name, collector) in [
            ("snapshots_total", Box::new(snapshots_total.clone()) as Box<dyn prometheus::core::Collector>),
            ("restores_total", Box::new(restores_total.clone())),
            ("callback_failures_total", Box::new(callback_failures_total.clone())),
            ("document_bytes", Box::new(document_bytes.clone())),
        ] {
            registry
                .register(collector)
                .map_err(|e| PrefsError::custom(format!("Failed to register {name}: {e}")))?;
        }

        Ok(Self {
            snapshots_total,
            restores_total,
            callback_failures_total,
            document_bytes,
            registry,
        })
    }

    /// Gather metrics in Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| PrefsError::custom(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer)
            .map_err(|e| PrefsError::custom(format!("Failed to convert metrics to string: {e}")))
    }
}

fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

fn env_filter(default_level: &str) -> Result<EnvFilter> {
    let directive: Directive = format!("prefs={default_level}")
        .parse()
        .map_err(|e| PrefsError::validation(format!("Invalid log directive: {e}")))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Install a human-readable subscriber
///
/// `verbose` lowers the default level of the `prefs` targets to `debug`;
/// `RUST_LOG` still overrides everything.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = env_filter(default_level(verbose))?;
    let subscriber = TracingRegistry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false));

    set_global_default(subscriber)
        .map_err(|e| PrefsError::custom(format!("Failed to set global tracing subscriber: {e}")))
}

/// Install the global subscriber, optionally emitting JSON lines
///
/// `verbose` selects the default level as for [`init_logging`].
///
/// # Errors
/// Fails if a global subscriber has been installed already.
pub fn init_observability(json: bool, verbose: bool) -> Result<()> {
    if !json {
        return init_logging(verbose);
    }

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(false);
    let subscriber = TracingRegistry::default().with(env_filter(default_level(verbose))?).with(fmt_layer);

    set_global_default(subscriber)
        .map_err(|e| PrefsError::custom(format!("Failed to set global tracing subscriber: {e}")))?;

    tracing::info!("Prefs observability initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_levels() {
        assert!(env_filter("info").is_ok());
        assert!(env_filter("debug").is_ok());
    }

    #[test]
    fn test_verbose_selects_debug_level() {
        assert_eq!(default_level(true), "debug");
        assert_eq!(default_level(false), "info");
        assert!(env_filter(default_level(true)).unwrap().to_string().contains("prefs=debug"));
    }

    #[test]
    fn test_second_global_subscriber_is_rejected() {
        // whichever call comes first in this process wins
        let first = init_logging(false);
        let second = init_observability(true, true);
        assert!(first.is_err() || second.is_err());
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_metrics_are_per_context() {
        use crate::{Node, Prefs, PrefsClass};

        struct Unit;
        impl PrefsClass for Unit {
            type Object = ();
            fn from_object(&self, _: &mut Prefs, _: &Node, _: &(), _: &mut ()) -> Result<()> {
                Ok(())
            }
        }

        let mut a: Prefs = Prefs::new().unwrap();
        let b: Prefs = Prefs::new().unwrap();
        a.register_class("unit", Unit).unwrap();
        a.obj_to_buffer("unit", &(), &mut ()).unwrap();

        assert_eq!(a.metrics().snapshots_total.get(), 1.0);
        assert_eq!(b.metrics().snapshots_total.get(), 0.0);

        let text = a.metrics().gather_metrics().unwrap();
        assert!(text.contains("prefs_snapshots_total 1"));
        assert!(text.contains("prefs_document_bytes"));
    }
}
