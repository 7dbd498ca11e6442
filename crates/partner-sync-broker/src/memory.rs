// crates/partner-sync-broker/src/memory.rs
// ============================================================================
// Module: In-Memory Broker
// Description: Process-local stream with durable consumers and redelivery.
// Purpose: Exercise the subscription manager without a NATS server.
// Dependencies: async-trait, partner-sync-core, tokio
// ============================================================================

//! ## Overview
//! [`InMemoryBroker`] models the parts of a durable stream the engine relies
//! on: subject fan-out to every durable bound on a subject, competing
//! consumers on one durable, nak-driven redelivery up to `max_deliver`, and
//! terminal handling for terminated or exhausted messages. Ack-wait expiry is
//! not simulated.
//!
//! The broker also implements [`EventPublisher`], so producers, recovery, and
//! derived events can publish into it directly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use async_trait::async_trait;
use partner_sync_core::Disposition;
use partner_sync_core::EventPublisher;
use partner_sync_core::PublishError;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::WeakUnboundedSender;

use crate::policy::ConsumerPolicy;
use crate::policy::DeliverPolicy;
use crate::policy::SubscriptionSpec;
use crate::transport::Acker;
use crate::transport::Delivery;
use crate::transport::DeliveryStream;
use crate::transport::StreamTransport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A message the broker stopped delivering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GivenUpMessage {
    /// Durable that held the message.
    pub durable: String,
    /// Subject the message was published on.
    pub subject: String,
    /// Raw payload.
    pub payload: Vec<u8>,
    /// Delivery attempts made.
    pub attempts: u64,
}

/// A message waiting in a durable's queue.
#[derive(Debug, Clone)]
struct Queued {
    /// Publish subject.
    subject: String,
    /// Raw payload.
    payload: Vec<u8>,
    /// Attempt number of the next delivery.
    attempt: u64,
}

/// One durable consumer.
struct Durable {
    /// Subject filter.
    subject: String,
    /// Delivery ceiling.
    max_deliver: u32,
    /// Queue sender; dropped on close.
    sender: Option<UnboundedSender<Queued>>,
    /// Queue receiver shared by competing binds.
    receiver: Arc<AsyncMutex<UnboundedReceiver<Queued>>>,
}

/// Mutable broker state.
#[derive(Default)]
struct State {
    /// Durables keyed by name.
    durables: BTreeMap<String, Durable>,
    /// Every published message in order.
    published: Vec<(String, Vec<u8>)>,
    /// Ack counts per durable.
    acked: BTreeMap<String, u64>,
    /// Messages that exhausted `max_deliver`.
    given_up: Vec<GivenUpMessage>,
    /// Messages terminated by handlers.
    terminated: Vec<GivenUpMessage>,
    /// Durables whose bind is forced to fail.
    failing_binds: BTreeSet<String>,
}

// ============================================================================
// SECTION: Broker
// ============================================================================

/// Process-local durable stream.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    /// Shared state.
    state: Arc<Mutex<State>>,
}

impl InMemoryBroker {
    /// Creates an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state.
    fn lock(&self) -> Result<MutexGuard<'_, State>, String> {
        self.state.lock().map_err(|_| "in-memory broker mutex poisoned".to_string())
    }

    /// Locks the state for inspection, recovering from poisoning.
    fn inspect(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every later bind of `durable` fail.
    pub fn fail_bind(&self, durable: impl Into<String>) {
        self.inspect().failing_binds.insert(durable.into());
    }

    /// Closes every durable queue; streams end once drained.
    pub fn close(&self) {
        for durable in self.inspect().durables.values_mut() {
            durable.sender = None;
        }
    }

    /// Returns payloads published on `subject`, oldest first.
    #[must_use]
    pub fn published(&self, subject: &str) -> Vec<Vec<u8>> {
        self.inspect()
            .published
            .iter()
            .filter(|(published, _)| published == subject)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Returns the number of acks recorded for `durable`.
    #[must_use]
    pub fn acked(&self, durable: &str) -> u64 {
        self.inspect().acked.get(durable).copied().unwrap_or_default()
    }

    /// Returns messages that exhausted their delivery ceiling.
    #[must_use]
    pub fn given_up(&self) -> Vec<GivenUpMessage> {
        self.inspect().given_up.clone()
    }

    /// Returns messages terminated by handlers.
    #[must_use]
    pub fn terminated(&self) -> Vec<GivenUpMessage> {
        self.inspect().terminated.clone()
    }

    /// Returns the number of deliveries that reached a final outcome.
    #[must_use]
    pub fn settled(&self) -> u64 {
        let state = self.inspect();
        let acked: u64 = state.acked.values().sum();
        let given_up = u64::try_from(state.given_up.len()).unwrap_or(u64::MAX);
        let terminated = u64::try_from(state.terminated.len()).unwrap_or(u64::MAX);
        acked.saturating_add(given_up).saturating_add(terminated)
    }
}

#[async_trait]
impl EventPublisher for InMemoryBroker {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let mut state = self.lock().map_err(PublishError::Unavailable)?;
        let mut closed = Vec::new();
        for (name, durable) in state.durables.iter().filter(|(_, d)| d.subject == subject) {
            let Some(sender) = &durable.sender else {
                continue;
            };
            let queued = Queued {
                subject: subject.to_string(),
                payload: payload.clone(),
                attempt: 1,
            };
            if sender.send(queued).is_err() {
                closed.push(name.clone());
            }
        }
        state.published.push((subject.to_string(), payload));
        if closed.is_empty() {
            Ok(())
        } else {
            Err(PublishError::Broker {
                subject: subject.to_string(),
                message: format!("durable queue closed: {}", closed.join(", ")),
            })
        }
    }
}

#[async_trait]
impl StreamTransport for InMemoryBroker {
    async fn bind(
        &self,
        spec: &SubscriptionSpec,
        policy: &ConsumerPolicy,
    ) -> Result<Box<dyn DeliveryStream>, TransportError> {
        let mut state = self.lock().map_err(|message| TransportError::Bind {
            durable: spec.durable.clone(),
            message,
        })?;
        if state.failing_binds.contains(&spec.durable) {
            return Err(TransportError::Bind {
                durable: spec.durable.clone(),
                message: "bind rejected".to_string(),
            });
        }
        if let Some(existing) = state.durables.get(&spec.durable) {
            if existing.subject != spec.subject {
                return Err(TransportError::Bind {
                    durable: spec.durable.clone(),
                    message: format!("durable already filters {}", existing.subject),
                });
            }
            let Some(sender) = &existing.sender else {
                return Err(TransportError::Bind {
                    durable: spec.durable.clone(),
                    message: "broker closed".to_string(),
                });
            };
            return Ok(Box::new(MemoryStream {
                durable: spec.durable.clone(),
                receiver: Arc::clone(&existing.receiver),
                requeue: sender.downgrade(),
                max_deliver: existing.max_deliver,
                state: Arc::clone(&self.state),
            }));
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        if policy.deliver_policy == DeliverPolicy::All {
            for (subject, payload) in state.published.iter().filter(|(s, _)| s == &spec.subject) {
                let queued = Queued {
                    subject: subject.clone(),
                    payload: payload.clone(),
                    attempt: 1,
                };
                sender.send(queued).map_err(|_| TransportError::Bind {
                    durable: spec.durable.clone(),
                    message: "replay queue closed".to_string(),
                })?;
            }
        }
        let requeue = sender.downgrade();
        let receiver = Arc::new(AsyncMutex::new(receiver));
        state.durables.insert(
            spec.durable.clone(),
            Durable {
                subject: spec.subject.clone(),
                max_deliver: policy.max_deliver,
                sender: Some(sender),
                receiver: Arc::clone(&receiver),
            },
        );
        Ok(Box::new(MemoryStream {
            durable: spec.durable.clone(),
            receiver,
            requeue,
            max_deliver: policy.max_deliver,
            state: Arc::clone(&self.state),
        }))
    }
}

// ============================================================================
// SECTION: Streams
// ============================================================================

/// Delivery stream over one durable queue.
struct MemoryStream {
    /// Durable name.
    durable: String,
    /// Shared queue receiver.
    receiver: Arc<AsyncMutex<UnboundedReceiver<Queued>>>,
    /// Weak handle used to requeue naked deliveries.
    requeue: WeakUnboundedSender<Queued>,
    /// Delivery ceiling.
    max_deliver: u32,
    /// Broker state for settlement records.
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl DeliveryStream for MemoryStream {
    async fn next_delivery(&mut self) -> Option<Result<Delivery, TransportError>> {
        let queued = self.receiver.lock().await.recv().await?;
        let acker = MemoryAcker {
            durable: self.durable.clone(),
            queued: queued.clone(),
            requeue: self.requeue.upgrade(),
            max_deliver: self.max_deliver,
            state: Arc::clone(&self.state),
        };
        Some(Ok(Delivery::new(queued.subject, queued.payload, queued.attempt, Box::new(acker))))
    }
}

/// Settles one in-memory delivery.
struct MemoryAcker {
    /// Durable name.
    durable: String,
    /// The delivered message.
    queued: Queued,
    /// Queue sender for redelivery; absent once the broker is closed.
    requeue: Option<UnboundedSender<Queued>>,
    /// Delivery ceiling.
    max_deliver: u32,
    /// Broker state for settlement records.
    state: Arc<Mutex<State>>,
}

impl MemoryAcker {
    /// Builds the record kept for a message that stops here.
    fn final_record(&self) -> GivenUpMessage {
        GivenUpMessage {
            durable: self.durable.clone(),
            subject: self.queued.subject.clone(),
            payload: self.queued.payload.clone(),
            attempts: self.queued.attempt,
        }
    }
}

#[async_trait]
impl Acker for MemoryAcker {
    async fn settle(self: Box<Self>, disposition: Disposition) -> Result<(), TransportError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| TransportError::Ack("in-memory broker mutex poisoned".to_string()))?;
        match disposition {
            Disposition::Ack => {
                *state.acked.entry(self.durable.clone()).or_default() += 1;
            }
            Disposition::Terminate => state.terminated.push(self.final_record()),
            Disposition::Redeliver => {
                let mut next = self.queued.clone();
                next.attempt = next.attempt.saturating_add(1);
                let requeued = self.queued.attempt < u64::from(self.max_deliver)
                    && self.requeue.as_ref().is_some_and(|sender| sender.send(next).is_ok());
                if !requeued {
                    state.given_up.push(self.final_record());
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
