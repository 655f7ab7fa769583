use anyhow::Context;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use serde::Serialize;

use crate::types::Event;

/// Topic-exchange publisher for the domain event bus.
///
/// The engine only publishes; consumers live in downstream services bound to
/// the same exchange.
#[derive(Clone)]
pub struct EventBus {
    channel: Channel,
    exchange: String,
}

impl EventBus {
    pub async fn connect(url: &str, exchange: &str) -> anyhow::Result<Self> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .context("amqp connect")?;
        let channel = connection.create_channel().await.context("amqp channel")?;

        let options = ExchangeDeclareOptions {
            durable: true,
            ..Default::default()
        };
        channel
            .exchange_declare(exchange, ExchangeKind::Topic, options, FieldTable::default())
            .await
            .context("exchange declare")?;

        tracing::info!(exchange = %exchange, "event bus connected");
        Ok(Self {
            channel,
            exchange: exchange.to_string(),
        })
    }

    /// Publish one envelope as persistent JSON and wait for the broker
    /// confirmation.
    pub async fn publish<T: Serialize>(
        &self,
        routing_key: &str,
        event: &Event<T>,
    ) -> anyhow::Result<()> {
        let body = serde_json::to_vec(event).context("serialize event")?;

        self.channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(2),
            )
            .await
            .context("basic publish")?
            .await
            .context("publish confirm")?;

        tracing::debug!(routing_key = %routing_key, event_id = %event.id, "event published");
        Ok(())
    }
}
