//! Tracer setup and management

use nlq_core::ObservabilityConfig;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SimpleSpanProcessor, TracerProvider};
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static TRACER_PROVIDER: OnceLock<Arc<TracerProvider>> = OnceLock::new();

/// Span processors waiting for [`init_telemetry`]; `None` once it has run.
type ProcessorBuilder = Box<dyn FnOnce() -> SimpleSpanProcessor + Send>;
static SPAN_PROCESSOR_BUILDERS: Mutex<Option<Vec<ProcessorBuilder>>> = Mutex::new(Some(Vec::new()));

/// Add an exporter-backed span processor. Only effective before [`init_telemetry`].
///
/// ```ignore
/// register_span_processor(Box::new(|| SimpleSpanProcessor::new(Box::new(exporter))));
/// init_telemetry(&config.observability);
/// ```
pub fn register_span_processor(builder: ProcessorBuilder) {
    let Ok(mut builders) = SPAN_PROCESSOR_BUILDERS.lock() else {
        tracing::warn!("Span processor registry poisoned, processor dropped");
        return;
    };

    if let Some(pending) = builders.as_mut() {
        pending.push(builder);
    } else {
        tracing::warn!("Attempted to register span processor after telemetry initialization");
    }
}

/// Install the global subscriber: env filter, pretty or JSON fmt layer, and
/// an OpenTelemetry layer over the registered span processors.
///
/// `RUST_LOG` overrides `config.log_filter`. A second call keeps the first subscriber.
///
/// ```rust,no_run
/// nlq_telemetry::init_telemetry(&nlq_core::ObservabilityConfig::default());
/// ```
pub fn init_telemetry(config: &ObservabilityConfig) {
    let builders = SPAN_PROCESSOR_BUILDERS
        .lock()
        .ok()
        .and_then(|mut guard| guard.take())
        .unwrap_or_default();

    let mut provider_builder = TracerProvider::builder();
    for builder in builders {
        provider_builder = provider_builder.with_span_processor(builder());
    }
    let tracer_provider = provider_builder.build();

    let service_name = config
        .service_name
        .clone()
        .unwrap_or_else(|| crate::attributes::SYSTEM_NAME.to_string());
    let tracer = tracer_provider.tracer(service_name);

    let _ = TRACER_PROVIDER.set(Arc::new(tracer_provider));

    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));

    let fmt_layer = if config.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .boxed()
    };

    let result = tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(fmt_layer)
        .with(filter)
        .try_init();

    if result.is_err() {
        tracing::debug!("Telemetry already initialized");
    }
}

pub fn tracer_provider() -> Option<Arc<TracerProvider>> {
    TRACER_PROVIDER.get().cloned()
}
