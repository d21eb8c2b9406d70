//! Tracing subscriber setup

use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// Crates that log far more than we care about at info level.
const NOISY_TARGETS: &[(&str, &str)] = &[("sqlx", "warn"), ("sqlparser", "warn")];

fn build_env_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut directives = vec![level.to_string()];
    for (target, lvl) in NOISY_TARGETS {
        directives.push(format!("{}={}", target, lvl));
    }

    EnvFilter::try_new(directives.join(",")).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(level))
        .with_timer(ChronoLocal::rfc_3339())
        .with_target(true)
        .with_ansi(true)
        .try_init();
}
