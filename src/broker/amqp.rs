//! AMQP 0-9-1 broker client (RabbitMQ) on top of `amiquip`

use super::{BrokerClient, BrokerError, DeliveryHandler, Disposition, Outbound, QueueSpec};
use crate::config::BrokerConfig;
use amiquip::{
    Channel, Connection, ConsumerMessage, ConsumerOptions, Exchange, Publish,
    QueueDeclareOptions,
};
use std::time::Duration;
use tracing::{debug, info};

fn protocol(err: amiquip::Error) -> BrokerError {
    BrokerError::Protocol(err.to_string())
}

pub struct AmqpBroker {
    connection: Connection,
    channel: Channel,
}

impl AmqpBroker {
    /// Open one connection and one channel.
    pub fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        info!(host = %config.host, port = config.port, "connecting to broker");

        let mut connection = Connection::insecure_open(&config.url())
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        let channel = match connection.open_channel(None) {
            Ok(channel) => channel,
            Err(err) => {
                let _ = connection.close();
                return Err(BrokerError::Connect(err.to_string()));
            }
        };

        Ok(Self {
            connection,
            channel,
        })
    }
}

impl BrokerClient for AmqpBroker {
    fn consume(
        &mut self,
        queue: &QueueSpec,
        poll_interval: Duration,
        handler: &mut dyn DeliveryHandler,
    ) -> Result<(), BrokerError> {
        let declared = self
            .channel
            .queue_declare(
                queue.name.as_str(),
                QueueDeclareOptions {
                    durable: queue.durable,
                    exclusive: queue.exclusive,
                    auto_delete: queue.auto_delete,
                    ..QueueDeclareOptions::default()
                },
            )
            .map_err(protocol)?;
        let consumer = declared
            .consume(ConsumerOptions {
                no_ack: false,
                ..ConsumerOptions::default()
            })
            .map_err(protocol)?;
        let exchange = Exchange::direct(&self.channel);

        info!(queue = %queue.name, "waiting for messages");

        loop {
            match consumer.receiver().recv_timeout(poll_interval) {
                Ok(ConsumerMessage::Delivery(delivery)) => {
                    let settled = match handler.handle(&delivery.body) {
                        Disposition::Ack => consumer.ack(delivery),
                        Disposition::Requeue => consumer.nack(delivery, true),
                    };
                    settled.map_err(protocol)?;
                }
                Ok(ConsumerMessage::ServerClosedChannel(err))
                | Ok(ConsumerMessage::ServerClosedConnection(err)) => {
                    return Err(protocol(err));
                }
                Ok(_) => return Err(BrokerError::Closed("consumer cancelled".into())),
                Err(err) if err.is_timeout() => {}
                Err(_) => return Err(BrokerError::Closed("consumer channel disconnected".into())),
            }

            for message in handler.drain_outbound() {
                debug!(routing_key = %message.routing_key, "publishing");
                exchange
                    .publish(Publish::new(&message.body, message.routing_key.as_str()))
                    .map_err(protocol)?;
            }

            if handler.should_stop() {
                consumer.cancel().map_err(protocol)?;
                return Ok(());
            }
        }
    }

    fn publish(&mut self, message: &Outbound) -> Result<(), BrokerError> {
        Exchange::direct(&self.channel)
            .publish(Publish::new(&message.body, message.routing_key.as_str()))
            .map_err(protocol)
    }

    fn close(self) -> Result<(), BrokerError> {
        let channel = self.channel.close().map_err(protocol);
        let connection = self.connection.close().map_err(protocol);
        channel.and(connection)
    }
}
