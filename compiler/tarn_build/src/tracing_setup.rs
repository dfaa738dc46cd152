//! Tracing subscriber setup for binaries and tests embedding the build.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a global subscriber, once.
///
/// Does nothing unless `RUST_LOG` is set. With `TARN_LOG_TREE` also set, spans
/// are rendered as an indented tree instead of flat lines.
///
/// ```text
/// RUST_LOG=tarn_build=debug                 flat output
/// RUST_LOG=tarn_build=trace TARN_LOG_TREE=1 tree output
/// ```
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        if std::env::var("TARN_LOG_TREE").is_ok() {
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
