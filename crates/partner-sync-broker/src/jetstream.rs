// crates/partner-sync-broker/src/jetstream.rs
// ============================================================================
// Module: NATS JetStream Transport
// Description: Durable pull consumers and publishing over NATS JetStream.
// Purpose: Connect the engine to the production message stream.
// Dependencies: async-nats, async-trait, futures, partner-sync-core
// ============================================================================

//! ## Overview
//! [`JetStreamTransport`] binds one durable pull consumer per subscription on
//! an existing stream with explicit acks. Handler dispositions map to `ack`,
//! `nak`, and `term`. [`JetStreamPublisher`] publishes envelopes and derived
//! events and waits for the stream's publish ack.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_nats::jetstream;
use async_nats::jetstream::AckKind;
use async_nats::jetstream::consumer::AckPolicy;
use async_nats::jetstream::consumer::pull;
use async_trait::async_trait;
use futures::StreamExt;
use partner_sync_core::Disposition;
use partner_sync_core::EventPublisher;
use partner_sync_core::PublishError;

use crate::policy::ConsumerPolicy;
use crate::policy::DeliverPolicy;
use crate::policy::SubscriptionSpec;
use crate::transport::Acker;
use crate::transport::Delivery;
use crate::transport::DeliveryStream;
use crate::transport::StreamTransport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Connects to NATS and returns a `JetStream` context.
async fn connect_context(url: &str) -> Result<jetstream::Context, TransportError> {
    let client =
        async_nats::connect(url).await.map_err(|err| TransportError::Connect(err.to_string()))?;
    Ok(jetstream::new(client))
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// `JetStream` transport bound to one stream.
#[derive(Clone)]
pub struct JetStreamTransport {
    /// `JetStream` context.
    context: jetstream::Context,
    /// Stream holding the inbound subjects.
    stream: String,
}

impl JetStreamTransport {
    /// Connects to `url` and targets `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the server is unreachable.
    pub async fn connect(url: &str, stream: impl Into<String>) -> Result<Self, TransportError> {
        Ok(Self {
            context: connect_context(url).await?,
            stream: stream.into(),
        })
    }

    /// Returns a publisher sharing this transport's connection.
    #[must_use]
    pub fn publisher(&self) -> JetStreamPublisher {
        JetStreamPublisher {
            context: self.context.clone(),
        }
    }
}

/// Maps the consumer policy onto a pull consumer config.
fn consumer_config(spec: &SubscriptionSpec, policy: &ConsumerPolicy) -> pull::Config {
    pull::Config {
        durable_name: Some(spec.durable.clone()),
        name: Some(spec.durable.clone()),
        description: Some(format!("partner sync {}", spec.handler.label())),
        ack_policy: AckPolicy::Explicit,
        ack_wait: policy.ack_wait,
        max_deliver: i64::from(policy.max_deliver),
        deliver_policy: match policy.deliver_policy {
            DeliverPolicy::New => jetstream::consumer::DeliverPolicy::New,
            DeliverPolicy::All => jetstream::consumer::DeliverPolicy::All,
        },
        filter_subject: spec.subject.clone(),
        ..Default::default()
    }
}

#[async_trait]
impl StreamTransport for JetStreamTransport {
    async fn bind(
        &self,
        spec: &SubscriptionSpec,
        policy: &ConsumerPolicy,
    ) -> Result<Box<dyn DeliveryStream>, TransportError> {
        let bind_error = |message: String| TransportError::Bind {
            durable: spec.durable.clone(),
            message,
        };
        let stream = self
            .context
            .get_stream(&self.stream)
            .await
            .map_err(|err| bind_error(err.to_string()))?;
        let consumer = stream
            .get_or_create_consumer(&spec.durable, consumer_config(spec, policy))
            .await
            .map_err(|err| bind_error(err.to_string()))?;
        let messages = consumer.messages().await.map_err(|err| bind_error(err.to_string()))?;
        Ok(Box::new(JetStreamDeliveries {
            messages,
        }))
    }
}

// ============================================================================
// SECTION: Deliveries
// ============================================================================

/// Pull message stream for one durable.
struct JetStreamDeliveries {
    /// Underlying pull stream.
    messages: pull::Stream,
}

#[async_trait]
impl DeliveryStream for JetStreamDeliveries {
    async fn next_delivery(&mut self) -> Option<Result<Delivery, TransportError>> {
        let next = self.messages.next().await?;
        Some(next.map_err(|err| TransportError::Receive(err.to_string())).map(|message| {
            let attempt = message
                .info()
                .ok()
                .and_then(|info| u64::try_from(info.delivered).ok())
                .unwrap_or(1);
            let subject = message.subject.to_string();
            let payload = message.payload.to_vec();
            Delivery::new(
                subject,
                payload,
                attempt,
                Box::new(JetStreamAcker {
                    message,
                }),
            )
        }))
    }
}

/// Settles one `JetStream` message.
struct JetStreamAcker {
    /// Delivered message.
    message: jetstream::Message,
}

#[async_trait]
impl Acker for JetStreamAcker {
    async fn settle(self: Box<Self>, disposition: Disposition) -> Result<(), TransportError> {
        let result = match disposition {
            Disposition::Ack => self.message.ack().await,
            Disposition::Redeliver => self.message.ack_with(AckKind::Nak(None)).await,
            Disposition::Terminate => self.message.ack_with(AckKind::Term).await,
        };
        result.map_err(|err| TransportError::Ack(err.to_string()))
    }
}

// ============================================================================
// SECTION: Publisher
// ============================================================================

/// Publishes to `JetStream` and awaits the stream ack.
#[derive(Clone)]
pub struct JetStreamPublisher {
    /// `JetStream` context.
    context: jetstream::Context,
}

impl JetStreamPublisher {
    /// Connects a standalone publisher to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            context: connect_context(url).await?,
        })
    }
}

#[async_trait]
impl EventPublisher for JetStreamPublisher {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let broker_error = |message: String| PublishError::Broker {
            subject: subject.to_string(),
            message,
        };
        let ack = self
            .context
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|err| broker_error(err.to_string()))?;
        ack.await.map_err(|err| broker_error(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
