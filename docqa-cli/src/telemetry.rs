//! Log subscriber setup.
//!
//! `RUST_LOG` overrides the default filter:
//! ```bash
//! RUST_LOG=docqa_rag=debug docqa notes.txt -q "What color is the sky?"
//! ```

use std::sync::Once;

use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::args::LogFormat;

/// Filter used when `RUST_LOG` is unset. Matches every `docqa*` target.
pub const DEFAULT_FILTER: &str = "warn,docqa=info";

static INIT: Once = Once::new();

/// HH:MM:SS.mmm in local time.
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Install the global subscriber, writing to stderr. Only the first call has any effect.
pub fn init(format: LogFormat) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = tracing_subscriber::registry().with(filter);

        match format {
            LogFormat::Pretty => registry
                .with(fmt::layer().with_writer(std::io::stderr).with_timer(CompactTime).with_target(true))
                .init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(std::io::stderr).with_current_span(false))
                .init(),
        }
    });
}
