// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tracing-subscriber` setup (§4.8): an `EnvFilter` seeded from
//! `log.level` (overridable by `RUST_LOG`), rendered `pretty` or `json`
//! per `log.format`.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = fmt().with_env_filter(filter).with_target(true);
    match format {
        "json" => subscriber.json().init(),
        _ => subscriber.pretty().init(),
    }
}
