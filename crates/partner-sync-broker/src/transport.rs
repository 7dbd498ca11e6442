// crates/partner-sync-broker/src/transport.rs
// ============================================================================
// Module: Stream Transport
// Description: Transport seam between the subscription manager and a broker.
// Purpose: Bind durable consumers and settle individual deliveries.
// Dependencies: async-trait, partner-sync-core, thiserror
// ============================================================================

//! ## Overview
//! A [`StreamTransport`] binds a [`SubscriptionSpec`] under a
//! [`ConsumerPolicy`] and yields a [`DeliveryStream`]. Each [`Delivery`] owns
//! an [`Acker`] that settles it exactly once with the handler's
//! [`Disposition`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use partner_sync_core::Disposition;
use thiserror::Error;

use crate::policy::ConsumerPolicy;
use crate::policy::SubscriptionSpec;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by stream transports.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connecting to the broker failed.
    #[error("broker connect failed: {0}")]
    Connect(String),
    /// Binding a durable consumer failed.
    #[error("bind of durable {durable} failed: {message}")]
    Bind {
        /// Durable consumer name.
        durable: String,
        /// Broker error message.
        message: String,
    },
    /// Pulling the next delivery failed.
    #[error("receive failed: {0}")]
    Receive(String),
    /// Settling a delivery failed.
    #[error("ack failed: {0}")]
    Ack(String),
}

// ============================================================================
// SECTION: Deliveries
// ============================================================================

/// Settles one delivery with the broker.
#[async_trait]
pub trait Acker: Send {
    /// Acks, naks, or terminates the delivery.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Ack`] when the broker rejects the request.
    async fn settle(self: Box<Self>, disposition: Disposition) -> Result<(), TransportError>;
}

/// One message handed to a worker.
pub struct Delivery {
    /// Subject the message was published on.
    pub subject: String,
    /// Raw envelope bytes.
    pub payload: Vec<u8>,
    /// Delivery attempt, starting at 1.
    pub attempt: u64,
    /// Settlement handle.
    acker: Box<dyn Acker>,
}

impl Delivery {
    /// Creates a delivery settled through `acker`.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        payload: Vec<u8>,
        attempt: u64,
        acker: Box<dyn Acker>,
    ) -> Self {
        Self {
            subject: subject.into(),
            payload,
            attempt,
            acker,
        }
    }

    /// Settles the delivery, consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Ack`] when the broker rejects the request.
    pub async fn settle(self, disposition: Disposition) -> Result<(), TransportError> {
        self.acker.settle(disposition).await
    }
}

// ============================================================================
// SECTION: Transport Traits
// ============================================================================

/// Ordered source of deliveries for one bound durable.
#[async_trait]
pub trait DeliveryStream: Send {
    /// Returns the next delivery, or `None` once the subscription closes.
    async fn next_delivery(&mut self) -> Option<Result<Delivery, TransportError>>;
}

/// Broker connection able to bind durable consumers.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Binds (creating if needed) the durable described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] when the broker rejects the consumer.
    async fn bind(
        &self,
        spec: &SubscriptionSpec,
        policy: &ConsumerPolicy,
    ) -> Result<Box<dyn DeliveryStream>, TransportError>;
}
