// crates/partner-sync-broker/src/manager.rs
// ============================================================================
// Module: Subscription Manager
// Description: Binds durable consumers and runs one worker loop per binding.
// Purpose: Drive the sync engine from broker deliveries.
// Dependencies: partner-sync-core, thiserror, tokio
// ============================================================================

//! ## Overview
//! [`SubscriptionManager::start`] binds every [`SubscriptionSpec`] before any
//! message is processed; the first bind error aborts startup. Each binding
//! then gets a worker task that pulls deliveries, hands them to
//! [`SyncEngine::handle_delivery`], and settles them with the returned
//! [`partner_sync_core::Disposition`]. A process-wide semaphore bounds the
//! number of deliveries handled at once.
//! Invariants:
//! - Each delivery is handled by exactly one task to completion.
//! - Ack failures and receive errors are reported as engine events and never
//!   stop a worker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::pin::pin;
use std::sync::Arc;

use partner_sync_core::EngineEvent;
use partner_sync_core::HandlerKind;
use partner_sync_core::SyncEngine;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::policy::ConsumerPolicy;
use crate::policy::SubscriptionSpec;
use crate::transport::DeliveryStream;
use crate::transport::StreamTransport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while starting subscriptions.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// No subscriptions were configured.
    #[error("no subscriptions configured")]
    Empty,
    /// Two specs share a durable name.
    #[error("durable {0} is bound by more than one handler")]
    DuplicateDurable(String),
    /// Concurrency limit is zero.
    #[error("max_in_flight must be greater than zero")]
    InvalidConcurrency,
    /// The broker rejected a binding.
    #[error("subscription bind failed: {0}")]
    Bind(#[from] TransportError),
}

// ============================================================================
// SECTION: Manager
// ============================================================================

/// Binds durable consumers and runs their worker loops.
pub struct SubscriptionManager {
    /// Broker transport.
    transport: Arc<dyn StreamTransport>,
    /// Engine handling each delivery.
    engine: Arc<SyncEngine>,
    /// Policy applied to every consumer.
    policy: ConsumerPolicy,
    /// Bindings to create.
    specs: Vec<SubscriptionSpec>,
}

impl SubscriptionManager {
    /// Creates a manager for `specs`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        engine: Arc<SyncEngine>,
        policy: ConsumerPolicy,
        specs: Vec<SubscriptionSpec>,
    ) -> Self {
        Self {
            transport,
            engine,
            policy,
            specs,
        }
    }

    /// Returns the bindings this manager creates.
    #[must_use]
    pub fn specs(&self) -> &[SubscriptionSpec] {
        &self.specs
    }

    /// Binds every subscription, then spawns the worker loops.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError`] when the spec set is invalid or any bind
    /// fails. No worker is started in that case.
    pub async fn start(self) -> Result<RunningSubscriptions, SubscriptionError> {
        if self.specs.is_empty() {
            return Err(SubscriptionError::Empty);
        }
        if let Some(durable) = SubscriptionSpec::duplicate_durable(&self.specs) {
            return Err(SubscriptionError::DuplicateDurable(durable.to_string()));
        }
        if self.policy.max_in_flight == 0 {
            return Err(SubscriptionError::InvalidConcurrency);
        }
        let mut bound = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let stream = self.transport.bind(spec, &self.policy).await?;
            emit(
                &self.engine,
                "subscription_bound",
                spec.handler,
                format!("durable {} on {}", spec.durable, spec.subject),
            );
            bound.push((spec.handler, stream));
        }
        let permits = Arc::new(Semaphore::new(self.policy.max_in_flight));
        let mut workers = JoinSet::new();
        for (handler, stream) in bound {
            workers.spawn(run_worker(
                handler,
                stream,
                Arc::clone(&self.engine),
                Arc::clone(&permits),
            ));
        }
        Ok(RunningSubscriptions {
            workers,
        })
    }
}

/// Handle over the spawned worker loops.
pub struct RunningSubscriptions {
    /// One task per binding.
    workers: JoinSet<()>,
}

impl RunningSubscriptions {
    /// Returns the number of live worker loops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns true when no worker loop is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Waits until every delivery stream closes and in-flight work settles.
    pub async fn wait(mut self) {
        while self.workers.join_next().await.is_some() {}
    }

    /// Aborts every worker loop and waits for them to stop.
    pub async fn shutdown(mut self) {
        self.workers.shutdown().await;
    }

    /// Waits until every stream closes or `shutdown` resolves.
    ///
    /// Workers still running when `shutdown` resolves are aborted.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) {
        let mut shutdown = pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                next = self.workers.join_next() => {
                    if next.is_none() {
                        return;
                    }
                }
            }
        }
        self.workers.shutdown().await;
    }
}

// ============================================================================
// SECTION: Worker Loop
// ============================================================================

/// Pulls deliveries for one binding until its stream closes.
async fn run_worker(
    handler: HandlerKind,
    mut stream: Box<dyn DeliveryStream>,
    engine: Arc<SyncEngine>,
    permits: Arc<Semaphore>,
) {
    let mut in_flight = JoinSet::new();
    while let Some(next) = stream.next_delivery().await {
        match next {
            Ok(delivery) => {
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                    break;
                };
                let engine = Arc::clone(&engine);
                in_flight.spawn(async move {
                    let disposition = engine.handle_delivery(handler, &delivery.payload).await;
                    if let Err(err) = delivery.settle(disposition).await {
                        emit(&engine, "ack_failed", handler, err.to_string());
                    }
                    drop(permit);
                });
            }
            Err(err) => emit(&engine, "transport_error", handler, err.to_string()),
        }
        while in_flight.try_join_next().is_some() {}
    }
    while in_flight.join_next().await.is_some() {}
    emit(&engine, "worker_stopped", handler, "delivery stream closed".to_string());
}

/// Records a process-level event through the engine's telemetry sink.
fn emit(engine: &SyncEngine, event: &'static str, handler: HandlerKind, message: String) {
    engine.telemetry().record_engine(&EngineEvent {
        event,
        timestamp_ms: engine.service().clock().now().as_unix_millis(),
        handler: Some(handler.label()),
        message,
    });
}
