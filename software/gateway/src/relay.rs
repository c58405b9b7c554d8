// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <relay.rs>

//! Moves messages between the modem and the bus channels.

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::{Stream, StreamExt};

use crate::bus::Bus;
use crate::config::Channels;
use crate::error::Result;
use crate::message::SmsMessage;
use crate::modem::Modem;

pub struct Relay<B, W> {
    bus: B,
    modem: Option<Arc<Modem<W>>>,
    channels: Channels,
}

impl<B, W> Relay<B, W>
where
    B: Bus,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(bus: B, modem: Option<Arc<Modem<W>>>, channels: Channels) -> Self {
        Relay {
            bus,
            modem,
            channels,
        }
    }

    pub async fn publish_received(&self, message: &SmsMessage) -> Result<()> {
        let payload = message.to_payload()?;
        self.bus.publish(&self.channels.received, payload).await
    }

    /// Publishes inbound messages in arrival order until the modem side hangs up.
    pub async fn forward_inbound(&self, mut inbound: UnboundedReceiver<SmsMessage>) {
        while let Some(message) = inbound.recv().await {
            match self.publish_received(&message).await {
                Ok(()) => log::info!(
                    "[Relay] Published message from {} to {}",
                    message.sender.as_deref().unwrap_or("?"),
                    self.channels.received
                ),
                Err(e) => log::error!("[Relay] Publishing to {} failed: {}", self.channels.received, e),
            }
        }
        log::info!("[Relay] Inbound channel closed");
    }

    /// Decodes one send-channel payload and hands it to the modem.
    /// Returns `Ok(false)` for blank payloads.
    pub async fn dispatch(&self, payload: &str) -> Result<bool> {
        let Some(message) = SmsMessage::from_payload(payload)? else {
            return Ok(false);
        };
        match &self.modem {
            Some(modem) => modem.send_sms(&message).await?,
            None => log::warn!("[Relay] Modem unavailable, dropping message for {:?}", message.receiver),
        }
        Ok(true)
    }

    /// Consumes the send-channel subscription. Errors are logged per payload.
    pub async fn consume_send<S>(&self, mut payloads: S)
    where
        S: Stream<Item = String> + Unpin,
    {
        while let Some(payload) = payloads.next().await {
            if let Err(e) = self.dispatch(&payload).await {
                log::error!("[Relay] Error processing message on channel {}: {}", self.channels.send, e);
            }
        }
        log::warn!("[Relay] Subscription to {} ended", self.channels.send);
    }
}
