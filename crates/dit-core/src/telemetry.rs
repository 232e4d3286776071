use std::env;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Env var holding an `EnvFilter` directive string.
pub const LOG_ENV: &str = "DIT_LOG";
/// Env var selecting the output format: `json` or `compact` (default).
pub const LOG_FORMAT_ENV: &str = "DIT_LOG_FORMAT";

fn default_directives(debug: bool) -> &'static str {
    if debug { "dit=debug,info" } else { "dit=info,warn" }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// leave the first subscriber in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directives(env::var("DEBUG").is_ok())));

    let format = env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    let result = match format.as_str() {
        "json" => registry.with(fmt::layer().json().with_ansi(false)).try_init(),
        _ => registry.with(fmt::layer().compact()).try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
