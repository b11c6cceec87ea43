//! Diagnostics setup
//!
//! Everything goes to stderr so stdout stays reserved for the rendered
//! script or JSON report.
//!
//! | Variable                  | Effect                                        |
//! |---------------------------|-----------------------------------------------|
//! | `HUBPACK_LOG`             | filter directive, then `RUST_LOG`, then `info` |
//! | `HUBPACK_LOG_FORMAT`      | `text` or `json` when no format is passed      |
//! | `HUBPACK_LOG_SPAN_EVENTS` | span events, e.g. `new,close` or `full`        |

use anyhow::Result;
use std::{io, sync::Once};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Unknown names fall back to text.
    fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Install the global subscriber. Only the first call has any effect.
///
/// ```rust
/// hubpack_core::logging::init(Some("text")).unwrap();
/// ```
pub fn init(format: Option<&str>) -> Result<()> {
    INIT.call_once(|| {
        let env_format = std::env::var("HUBPACK_LOG_FORMAT").ok();
        let format = LogFormat::from_name(format.or(env_format.as_deref()).unwrap_or("text"));
        let span_events = span_events(format);
        let (filter, rejected) = filter();
        let registry = tracing_subscriber::registry().with(filter);

        match format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_span_events(span_events)
                        .with_writer(io::stderr),
                )
                .init(),
            LogFormat::Text => registry
                .with(
                    fmt::layer()
                        .with_span_events(span_events)
                        .with_writer(io::stderr),
                )
                .init(),
        }

        if let Some(directive) = rejected {
            tracing::warn!("Ignoring invalid HUBPACK_LOG '{}', using 'info'", directive);
        }
        tracing::debug!("Logging initialized ({:?})", format);
    });

    Ok(())
}

pub fn is_initialized() -> bool {
    INIT.is_completed()
}

/// Filter from the environment, plus the `HUBPACK_LOG` directive if it was
/// rejected.
fn filter() -> (EnvFilter, Option<String>) {
    match std::env::var("HUBPACK_LOG") {
        Ok(directive) => match EnvFilter::try_new(&directive) {
            Ok(filter) => (filter, None),
            Err(_) => (EnvFilter::new("info"), Some(directive)),
        },
        Err(_) => (
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            None,
        ),
    }
}

fn span_events(format: LogFormat) -> FmtSpan {
    let Ok(raw) = std::env::var("HUBPACK_LOG_SPAN_EVENTS") else {
        return match format {
            LogFormat::Json => FmtSpan::NEW | FmtSpan::CLOSE,
            LogFormat::Text => FmtSpan::NONE,
        };
    };

    raw.split([',', '|'])
        .map(|name| match name.trim().to_ascii_lowercase().as_str() {
            "new" => FmtSpan::NEW,
            "close" => FmtSpan::CLOSE,
            "enter" => FmtSpan::ENTER,
            "exit" => FmtSpan::EXIT,
            "active" => FmtSpan::ACTIVE,
            "full" => FmtSpan::FULL,
            _ => FmtSpan::NONE,
        })
        .fold(FmtSpan::NONE, |acc, span| acc | span)
}
