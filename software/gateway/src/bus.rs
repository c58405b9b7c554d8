// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Filename: <bus.rs>

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::error::Result;

pub type PayloadStream = Pin<Box<dyn Stream<Item = String> + Send>>;

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(2);

/// Publishing side of the message bus.
pub trait Bus: Send + Sync {
    fn publish(&self, channel: &str, payload: String) -> impl Future<Output = Result<()>> + Send;
}

pub struct RedisBus {
    client: redis::Client,
    // Reconnects on its own after the server goes away.
    connection: ConnectionManager,
}

impl RedisBus {
    pub async fn connect(url: &str) -> Result<Self> {
        log::info!("[Bus] Connecting to Redis: {}", url);
        let client = redis::Client::open(url)?;
        let connection = client.get_connection_manager().await?;
        Ok(RedisBus { client, connection })
    }

    /// Payloads published to one literal channel. The subscription is
    /// re-established whenever its connection drops.
    pub fn subscribe(&self, channel: &str) -> PayloadStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let channel = channel.to_string();
        tokio::spawn(forward_with_retry(
            move || open_subscription(client.clone(), channel.clone()),
            tx,
            RESUBSCRIBE_DELAY,
        ));
        Box::pin(UnboundedReceiverStream::new(rx))
    }
}

impl Bus for RedisBus {
    async fn publish(&self, channel: &str, payload: String) -> Result<()> {
        let mut connection = self.connection.clone();
        connection.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }
}

async fn open_subscription(client: redis::Client, channel: String) -> Result<PayloadStream> {
    log::info!("[Bus] Subscribing to channel {}", channel);
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(&channel).await?;

    let payloads = pubsub
        .into_on_message()
        .filter_map(|msg| match msg.get_payload::<String>() {
            Ok(payload) => Some(payload),
            Err(e) => {
                log::warn!("[Bus] Unreadable payload on {}: {}", msg.get_channel_name(), e);
                None
            }
        });
    Ok(Box::pin(payloads))
}

/// Drains subscriptions from `connect` into `payloads`, reconnecting after
/// `retry_delay` whenever one ends or fails to open. Stops once nobody
/// listens on `payloads`.
pub async fn forward_with_retry<F, Fut, S>(
    mut connect: F,
    payloads: UnboundedSender<String>,
    retry_delay: Duration,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S>>,
    S: Stream<Item = String> + Unpin,
{
    loop {
        match connect().await {
            Ok(mut stream) => {
                while let Some(payload) = stream.next().await {
                    if payloads.send(payload).is_err() {
                        return;
                    }
                }
                log::warn!("[Bus] Subscription ended, resubscribing in {:?}…", retry_delay);
            }
            Err(e) => log::warn!("[Bus] Subscribe failed: {}, retry in {:?}…", e, retry_delay),
        }
        if payloads.is_closed() {
            return;
        }
        tokio::time::sleep(retry_delay).await;
    }
}
