//! # Tracing Module
//!
//! Environment-aware console logging using the tracing ecosystem.
//! Designed for containerized deployments where logs go to stdout.
//!
//! ## Correlation IDs
//!
//! Every request published to the user exchange carries (or is assigned) a
//! correlation id. It is the first field of every delivery log line and of the
//! per-delivery span, so one request can be followed from receipt through
//! dispatch, the domain call and the reply.
//!
//! ## Environment
//!
//! - `USER_RPC_ENV` / `APP_ENV`: `test`, `development` (default), `production`
//! - `LOG_LEVEL` then `RUST_LOG`: explicit filter, wins over the environment default
//! - `LOG_FORMAT=json`: JSON lines instead of the human-readable format

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console tracing once per process
///
/// Safe to call repeatedly and from tests; if another global subscriber was
/// installed first it is kept.
pub fn init_tracing() {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let json = use_json_format();
        let use_ansi = IsTerminal::is_terminal(&std::io::stdout()) && !json;

        let console_layer = if json {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        };

        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                log_level = %log_level,
                json_format = json,
                ansi_colors = use_ansi,
                "Console logging initialized"
            );
        }
    });
}

fn get_environment() -> String {
    std::env::var("USER_RPC_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> String {
    resolve_log_level(
        environment,
        std::env::var("LOG_LEVEL").ok(),
        std::env::var("RUST_LOG").ok(),
    )
}

/// `LOG_LEVEL` wins over `RUST_LOG`, which wins over the environment default
fn resolve_log_level(
    environment: &str,
    log_level: Option<String>,
    rust_log: Option<String>,
) -> String {
    if let Some(level) = log_level.or(rust_log) {
        return level.to_lowercase();
    }

    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn use_json_format() -> bool {
    std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log a delivery-scoped event with the correlation id first
///
/// ```rust
/// use user_service_rpc::log_delivery;
///
/// let correlation_id = "8d5c6c1e";
/// log_delivery!(info, "Message received", correlation_id: correlation_id, routing_key: "user.api.paciente.create");
/// log_delivery!(warn, "Reply skipped", correlation_id: correlation_id);
/// ```
#[macro_export]
macro_rules! log_delivery {
    ($level:ident, $message:expr, correlation_id: $correlation_id:expr, $($key:ident: $value:expr),* $(,)?) => {
        tracing::$level!(
            correlation_id = %$correlation_id,
            $($key = %$value,)*
            "{}", $message
        );
    };
    ($level:ident, $message:expr, correlation_id: $correlation_id:expr $(,)?) => {
        tracing::$level!(correlation_id = %$correlation_id, "{}", $message);
    };
}
