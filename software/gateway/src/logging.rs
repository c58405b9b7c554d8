// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <logging.rs>

/// `RUST_LOG` wins over `default_filter`.
pub fn init_logging(default_filter: &str) {
    use env_logger::Env;
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .format_target(false)
        .init();
}
