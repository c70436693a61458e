use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TELEMETRY: OnceLock<()> = OnceLock::new();

const DEFAULT_FILTER: &str = "info,tower_http=info";

/// JSON logs by default; `RELAY_LOG_FORMAT=pretty` for local runs.
pub fn init() {
    TELEMETRY.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let pretty = std::env::var("RELAY_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("pretty"))
            .unwrap_or(false);

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = if pretty {
            registry.with(fmt::layer().pretty()).try_init()
        } else {
            registry.with(fmt::layer().json()).try_init()
        };
        if let Err(err) = result {
            eprintln!("telemetry already initialised: {err}");
        }
    });
}
