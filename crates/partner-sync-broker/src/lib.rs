// crates/partner-sync-broker/src/lib.rs
// ============================================================================
// Module: Partner Sync Broker Library
// Description: Durable subscriptions and consumer loops for the sync engine.
// Purpose: Bind handlers to stream subjects and settle deliveries.
// Dependencies: partner-sync-core, async-nats, tokio
// ============================================================================

//! ## Overview
//! Partner Sync Broker binds one durable consumer per handler to its inbound
//! subject and drives [`partner_sync_core::SyncEngine`] from the delivered
//! messages. Transports sit behind [`StreamTransport`]: [`JetStreamTransport`]
//! talks to NATS `JetStream`, [`InMemoryBroker`] serves tests and local runs.
//! Invariants:
//! - Every consumer uses manual acknowledgement.
//! - A bind failure at startup aborts the whole subscription set.
//! - Handler dispositions map to exactly one ack, nak, or term per delivery.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod jetstream;
pub mod manager;
pub mod memory;
pub mod policy;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use jetstream::JetStreamPublisher;
pub use jetstream::JetStreamTransport;
pub use manager::RunningSubscriptions;
pub use manager::SubscriptionError;
pub use manager::SubscriptionManager;
pub use memory::GivenUpMessage;
pub use memory::InMemoryBroker;
pub use policy::ConsumerPolicy;
pub use policy::DEFAULT_ACK_WAIT;
pub use policy::DEFAULT_MAX_DELIVER;
pub use policy::DEFAULT_MAX_IN_FLIGHT;
pub use policy::DeliverPolicy;
pub use policy::SubscriptionSpec;
pub use transport::Acker;
pub use transport::Delivery;
pub use transport::DeliveryStream;
pub use transport::StreamTransport;
pub use transport::TransportError;
