//! message broker seam
//!
//! The bridge only talks to [`BrokerClient`]; the AMQP implementation lives in
//! [`amqp`] behind the `amqp` feature.

#[cfg(feature = "amqp")]
pub mod amqp;

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("failed to connect to broker: {0}")]
    Connect(String),

    #[error("broker protocol error: {0}")]
    Protocol(String),

    #[error("broker closed the consumer: {0}")]
    Closed(String),
}

/// Queue to declare and consume from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSpec {
    pub name: String,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
}

/// How a delivery is settled with the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    /// negative acknowledgement, put back for redelivery
    Requeue,
}

/// Message to publish on the default exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub routing_key: String,
    pub body: Vec<u8>,
}

/// Consumer-side logic driven by a [`BrokerClient`].
pub trait DeliveryHandler {
    /// Decide the fate of one delivered message body.
    fn handle(&mut self, body: &[u8]) -> Disposition;

    /// Messages to publish, polled after every delivery or receive timeout.
    fn drain_outbound(&mut self) -> Vec<Outbound>;

    /// Checked after every delivery or receive timeout.
    fn should_stop(&self) -> bool;
}

/// One open broker connection with one channel.
pub trait BrokerClient {
    /// Declare `queue`, consume it with manual acknowledgements and feed every
    /// delivery to `handler` until it asks to stop (`Ok`) or the broker fails
    /// (`Err`). `poll_interval` bounds how long a receive blocks.
    fn consume(
        &mut self,
        queue: &QueueSpec,
        poll_interval: Duration,
        handler: &mut dyn DeliveryHandler,
    ) -> Result<(), BrokerError>;

    /// Publish one message outside of a `consume` call.
    fn publish(&mut self, message: &Outbound) -> Result<(), BrokerError>;

    /// Close the channel and the connection.
    fn close(self) -> Result<(), BrokerError>;
}
