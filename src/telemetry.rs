//! Tracing initialization. `fmt` + `EnvFilter` only, no OTLP export (see
//! DESIGN.md for why the OTel stack was dropped).

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::util;

pub fn init_tracing(cfg: &Config) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(cfg.verbose)
        .with_level(true);

    let filter = EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|e| {
        eprintln!("Warning: invalid RUST_LOG '{}': {e}", cfg.log_filter);
        EnvFilter::new("input_dispatch=info")
    });

    tracing_subscriber::registry().with(fmt_layer).with(filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_sha = option_env!("VERGEN_GIT_SHA_SHORT").unwrap_or("unknown"),
        build_ts = option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
        "input-dispatch starting"
    );

    info!(
        combo_window = %util::format_duration(cfg.combo_window()),
        chord_tail_throttle = %util::format_duration(cfg.chord_tail_throttle()),
        default_throttle_ms = cfg.default_throttle_ms,
        default_debounce_ms = cfg.default_debounce_ms,
        verbose = cfg.verbose,
        log_filter = %cfg.log_filter,
        "configuration loaded"
    );
}
