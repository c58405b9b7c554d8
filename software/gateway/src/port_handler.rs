// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// src/port_handler.rs

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, WriteHalf};
use tokio::sync::mpsc::UnboundedSender;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tokio_stream::StreamExt;
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::config::ModemConfig;
use crate::error::{GatewayError, Result};
use crate::event::ResponseBuffer;
use crate::message::SmsMessage;
use crate::modem::Modem;

pub type SerialModem = Modem<WriteHalf<SerialStream>>;

pub fn open_port(config: &ModemConfig) -> Result<SerialStream> {
    let port_name = config
        .port_name
        .as_deref()
        .ok_or_else(|| GatewayError::Config("MODEM_PORTNAME is not set".into()))?;

    log::info!(
        "[Port] Opening \"{}\" at {} baud (8N1, no flow control)",
        port_name,
        config.baud_rate
    );
    let port = tokio_serial::new(port_name, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()?;
    Ok(port)
}

/// Opens and initializes the modem, then spawns its reader task.
///
/// Returns `None` when the port cannot be opened; the gateway keeps running
/// without SMS traffic in that case.
pub async fn start_modem(
    config: &ModemConfig,
    inbound: UnboundedSender<SmsMessage>,
) -> Option<Arc<SerialModem>> {
    let port = match open_port(config) {
        Ok(port) => port,
        Err(e) => {
            log::error!("[Port] Error opening serial port: {}", e);
            return None;
        }
    };

    let (reader, writer) = tokio::io::split(port);
    let modem = Arc::new(Modem::new(writer, config.write_timeout));

    if let Err(e) = modem.initialize().await {
        log::error!("[Port] Modem initialization failed: {}", e);
    }

    log::info!("[Port] Listening for modem output");
    tokio::spawn(read_port(reader, Arc::clone(&modem), inbound));
    Some(modem)
}

/// Hands every chunk of available bytes to the modem driver until the port
/// reaches EOF or fails.
pub async fn read_port<R, W>(reader: R, modem: Arc<Modem<W>>, inbound: UnboundedSender<SmsMessage>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send,
{
    let mut chunks = FramedRead::new(reader, BytesCodec::new());
    let mut responses = ResponseBuffer::new();
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(bytes) => {
                log::debug!("[Port] {} bytes available", bytes.len());
                if let Some(text) = responses.push(&String::from_utf8_lossy(&bytes)) {
                    modem.handle_notification(&text, &inbound).await;
                }
            }
            Err(e) => {
                log::warn!("[Port] Read error: {:?}", e);
                break;
            }
        }
    }
    if let Some(text) = responses.flush() {
        log::warn!("[Port] Port closed mid-response, handling partial text");
        modem.handle_notification(&text, &inbound).await;
    }
    log::warn!("[Port] Reader stopped, no further modem output will be handled");
}
