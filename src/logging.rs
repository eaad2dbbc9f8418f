//! Timestamped stderr logging.
//!
//! Lines look like `14:02:07.481  INFO [registrar] walked: site (/srv/site): 12 files`.
//! Levels come from `[logging]`; `RUST_LOG`, when set, replaces them entirely.
//!
//! ```toml
//! [logging]
//! default = "info"
//!
//! [logging.modules]
//! "amigo::watcher" = "debug"
//! ```

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

/// `HH:MM:SS.mmm` in local time.
struct ClockTime;

impl FormatTime for ClockTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// `default[,module=level...]` as understood by `EnvFilter`.
fn filter_directives(config: &LoggingConfig) -> String {
    std::iter::once(config.default.clone())
        .chain(
            config
                .modules
                .iter()
                .map(|(module, level)| format!("{module}={level}")),
        )
        .collect::<Vec<_>>()
        .join(",")
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(filter_directives(config)),
    }
}

/// Install the global subscriber.
///
/// Writes to stderr so `amigo list --json` stays pipeable. Returns `false`
/// if a subscriber was already installed, in which case nothing changes.
pub fn init_with_config(config: &LoggingConfig) -> bool {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(ClockTime)
        .with_filter(env_filter(config));

    tracing_subscriber::registry().with(layer).try_init().is_ok()
}

/// Shared body of [`log_event!`] and [`debug_event!`].
#[doc(hidden)]
#[macro_export]
macro_rules! component_event {
    ($level:ident, $component:expr, $event:expr) => {
        tracing::event!(tracing::Level::$level, "[{}] {}", $component, $event)
    };
    ($level:ident, $component:expr, $event:expr, $($arg:tt)+) => {
        tracing::event!(tracing::Level::$level, "[{}] {}: {}", $component, $event, format!($($arg)+))
    };
}

/// `[component] event: detail` at info level.
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr $(, $($arg:tt)+)?) => {
        $crate::component_event!(INFO, $component, $event $(, $($arg)+)?)
    };
}

/// `[component] event: detail` at debug level.
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr $(, $($arg:tt)+)?) => {
        $crate::component_event!(DEBUG, $component, $event $(, $($arg)+)?)
    };
}
