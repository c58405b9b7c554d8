// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <error.rs>

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Write timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("Port is closed")]
    PortClosed,

    #[error("Receiver is missing")]
    MissingReceiver,

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Bus error: {0}")]
    Bus(#[from] redis::RedisError),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
