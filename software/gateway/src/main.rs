// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <main.rs>

mod bus;
mod config;
mod console;
mod error;
mod event;
mod logging;
mod message;
mod modem;
mod parser;
mod port_handler;
mod relay;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use tokio::io::BufReader;
use tokio::sync::mpsc;

use crate::bus::RedisBus;
use crate::config::Config;
use crate::console::run_console;
use crate::message::SmsMessage;
use crate::port_handler::start_modem;
use crate::relay::Relay;
use logging::init_logging;

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Could not load .env: {e}");
        }
    }
    init_logging("info");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let (tx, rx) = mpsc::unbounded_channel::<SmsMessage>();
    let modem = start_modem(&config.modem, tx).await;

    let bus = match RedisBus::connect(&config.redis_url).await {
        Ok(bus) => bus,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    let payloads = bus.subscribe(&config.channels.send);

    let relay = Arc::new(Relay::new(bus, modem.clone(), config.channels.clone()));

    let inbound_relay = Arc::clone(&relay);
    tokio::spawn(async move {
        inbound_relay.forward_inbound(rx).await;
    });

    let send_relay = Arc::clone(&relay);
    tokio::spawn(async move {
        send_relay.consume_send(payloads).await;
    });

    println!("Type QUIT to exit");
    let stdin = BufReader::new(tokio::io::stdin());
    if let Err(e) = run_console(stdin, modem.as_deref()).await {
        log::error!("[Console] {}", e);
    }

    if let Some(modem) = modem {
        if let Err(e) = modem.close().await {
            log::warn!("Closing modem failed: {}", e);
        }
    }
    log::info!("Main loop finished");
}
