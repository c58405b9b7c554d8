// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <modem.rs>

//! AT command driver. Owns the write side of the modem channel and reacts to
//! chunks of modem output.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;

use crate::error::{GatewayError, Result};
use crate::event::ModemEvent;
use crate::message::SmsMessage;
use crate::parser::parse_listing;

pub const LINE_TERMINATOR: &str = "\r\n";
/// Ends a text-mode message body.
pub const CTRL_Z: u8 = 0x1A;
/// Aborts a text-mode message at the `>` prompt.
pub const ESC: u8 = 0x1B;

pub const SELECT_STORAGE_ME: &str = "AT+CPMS=\"ME\"";
pub const SELECT_TEXT_MODE: &str = "AT+CMGF=1";
pub const SET_TEXT_PARAMS: &str = "AT+CSMP=17,167,0,0";
pub const LIST_ALL: &str = "AT+CMGL=\"ALL\"";
pub const DELETE_READ: &str = "AT+CMGD=,2";

pub struct Modem<W> {
    // `None` once closed.
    writer: Mutex<Option<W>>,
    write_timeout: Duration,
}

impl<W> Modem<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, write_timeout: Duration) -> Self {
        Modem {
            writer: Mutex::new(Some(writer)),
            write_timeout,
        }
    }

    /// Storage, text mode and text parameters, in that order.
    pub async fn initialize(&self) -> Result<()> {
        log::info!("[Modem] Select message storage ME");
        self.write_line(SELECT_STORAGE_ME).await?;
        log::info!("[Modem] Select text message format");
        self.write_line(SELECT_TEXT_MODE).await?;
        log::info!("[Modem] Set text mode parameters");
        self.write_line(SET_TEXT_PARAMS).await?;
        Ok(())
    }

    pub async fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        self.write_locked(&mut writer, format!("{line}{LINE_TERMINATOR}").as_bytes())
            .await
    }

    async fn write_locked(&self, writer: &mut Option<W>, bytes: &[u8]) -> Result<()> {
        let writer = writer.as_mut().ok_or(GatewayError::PortClosed)?;
        let write = async {
            writer.write_all(bytes).await?;
            writer.flush().await
        };
        match timeout(self.write_timeout, write).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(GatewayError::WriteTimeout(self.write_timeout)),
        }
    }

    /// Composes one text message. Both steps run under a single lock so no
    /// other command can land between the header and the body.
    pub async fn send_sms(&self, message: &SmsMessage) -> Result<()> {
        let receiver = message.receiver().ok_or(GatewayError::MissingReceiver)?;

        let mut writer = self.writer.lock().await;
        let header = format!("AT+CMGS=\"{receiver}\"{LINE_TERMINATOR}");
        self.write_locked(&mut writer, header.as_bytes()).await?;

        let mut body = Vec::with_capacity(message.content.len() + 1);
        body.extend_from_slice(message.content.as_bytes());
        body.push(CTRL_Z);
        if let Err(e) = self.write_locked(&mut writer, &body).await {
            // Leave the prompt, or the next command becomes part of the body.
            if let Err(cancel) = self.write_locked(&mut writer, &[ESC]).await {
                log::warn!("[Modem] Could not cancel message to {}: {}", receiver, cancel);
            }
            return Err(e);
        }

        log::info!("[Modem] Message sent to {}: {}", receiver, message.content);
        Ok(())
    }

    /// Reacts to one chunk of modem output. Unread messages from a listing
    /// are pushed to `inbound` in listing order.
    pub async fn handle_notification(
        &self,
        text: &str,
        inbound: &UnboundedSender<SmsMessage>,
    ) -> ModemEvent {
        let event = ModemEvent::classify(text);
        match event {
            ModemEvent::NewMessage => {
                log::info!("[Modem] New message received, reading all messages…");
                if let Err(e) = self.write_line(LIST_ALL).await {
                    log::error!("[Modem] Listing request failed: {}", e);
                }
            }
            ModemEvent::Listing => {
                // Delete first: the listing is already in hand.
                log::info!("[Modem] Removing read messages");
                if let Err(e) = self.write_line(DELETE_READ).await {
                    log::error!("[Modem] Delete request failed: {}", e);
                }

                let messages = parse_listing(text);
                log::info!("[Modem] Handling {} unread message(s)", messages.len());
                for message in messages {
                    if inbound.send(message).is_err() {
                        log::warn!("[Modem] Relay is gone, dropping inbound messages");
                        break;
                    }
                }
            }
            ModemEvent::Info => log::info!("[Modem] {}", text.trim()),
        }
        event
    }

    pub async fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        if let Some(mut w) = writer.take() {
            w.shutdown().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
impl Modem<Vec<u8>> {
    /// Everything written so far.
    pub(crate) async fn written(&self) -> String {
        let writer = self.writer.lock().await;
        String::from_utf8(writer.clone().unwrap_or_default()).unwrap()
    }
}
