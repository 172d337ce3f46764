use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

pub struct TracerOptions {
    pub level: LevelFilter,
}

impl TracerOptions {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

/// This object initialises the stderr tracer, given a TracerOptions struct.
pub struct TracerEngine {
    service_name: String,
}

impl TracerEngine {
    /// Initialises the stderr tracer for the binary
    /// #Arguments
    /// * `options` - The caller-specified instance of TracerOptions.
    /// * `service_name` - The name of the binary, recorded on start-up.
    /// #Returns
    /// An instance of TracerEngine
    pub fn new(options: TracerOptions, service_name: &str) -> Self {
        let stderr_tracer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

        // RUST_LOG takes precedence over the caller's default level
        let log_filter = EnvFilter::builder()
            .with_default_directive(options.level.into())
            .from_env_lossy();

        let subscriber =
            tracing_subscriber::Registry::default().with(stderr_tracer.with_filter(log_filter));

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::warn!("A global tracing subscriber was already installed");
        }
        tracing::debug!("Tracer initialised for {service_name}");

        Self {
            service_name: service_name.to_owned(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}
