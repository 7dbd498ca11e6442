// crates/partner-sync-broker/src/policy.rs
// ============================================================================
// Module: Consumer Policy
// Description: Uniform consumer settings and per-handler subscription specs.
// Purpose: Describe what the subscription manager binds at startup.
// Dependencies: partner-sync-core, serde
// ============================================================================

//! ## Overview
//! Every durable consumer shares one [`ConsumerPolicy`]: manual ack, a bounded
//! delivery count, an ack wait, and a deliver policy. A [`SubscriptionSpec`]
//! pairs one handler with its inbound subject and durable name. Instances that
//! bind the same durable compete for its messages, which is how work is shared
//! across processes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::time::Duration;

use partner_sync_core::HandlerKind;
use partner_sync_core::InboundSubjects;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Delivery attempts before the broker gives up on a message.
pub const DEFAULT_MAX_DELIVER: u32 = 10;
/// Time the broker waits for an ack before redelivering.
pub const DEFAULT_ACK_WAIT: Duration = Duration::from_secs(30);
/// Deliveries handled concurrently per process.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Where a fresh durable starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliverPolicy {
    /// Only messages published after the durable is created.
    #[default]
    New,
    /// Every message retained by the stream.
    All,
}

/// Settings applied to every durable consumer.
///
/// # Invariants
/// - Acknowledgement is always manual; handlers settle each delivery.
/// - `max_deliver` and `max_in_flight` are non-zero once validated by config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerPolicy {
    /// Delivery attempts before the broker gives up.
    pub max_deliver: u32,
    /// Ack wait before the broker redelivers.
    pub ack_wait: Duration,
    /// Starting position for fresh durables.
    pub deliver_policy: DeliverPolicy,
    /// Deliveries handled concurrently across all subscriptions.
    pub max_in_flight: usize,
}

impl Default for ConsumerPolicy {
    fn default() -> Self {
        Self {
            max_deliver: DEFAULT_MAX_DELIVER,
            ack_wait: DEFAULT_ACK_WAIT,
            deliver_policy: DeliverPolicy::New,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

// ============================================================================
// SECTION: Subscriptions
// ============================================================================

/// One durable consumer binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSpec {
    /// Handler driven by this consumer.
    pub handler: HandlerKind,
    /// Inbound subject filter.
    pub subject: String,
    /// Durable consumer name shared by competing instances.
    pub durable: String,
}

impl SubscriptionSpec {
    /// Returns the default durable name for `handler`.
    #[must_use]
    pub fn default_durable(handler: HandlerKind) -> String {
        format!("durable-{}", handler.label())
    }

    /// Builds one spec per handler using default durable names.
    #[must_use]
    pub fn for_handlers(subjects: &InboundSubjects) -> Vec<Self> {
        HandlerKind::ALL
            .into_iter()
            .map(|handler| Self {
                handler,
                subject: subjects.name(handler.inbound()).to_string(),
                durable: Self::default_durable(handler),
            })
            .collect()
    }

    /// Returns the first durable name used by more than one spec.
    #[must_use]
    pub fn duplicate_durable(specs: &[Self]) -> Option<&str> {
        let mut seen = BTreeSet::new();
        specs.iter().map(|spec| spec.durable.as_str()).find(|durable| !seen.insert(*durable))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use partner_sync_core::InboundSubject;

    use super::*;

    #[test]
    fn default_policy_matches_partner_contract() {
        let policy = ConsumerPolicy::default();
        assert_eq!(policy.max_deliver, 10);
        assert_eq!(policy.ack_wait, Duration::from_secs(30));
        assert_eq!(policy.deliver_policy, DeliverPolicy::New);
    }

    #[test]
    fn every_handler_gets_a_unique_durable() {
        let specs = SubscriptionSpec::for_handlers(&InboundSubjects::default());
        assert_eq!(specs.len(), HandlerKind::ALL.len());
        assert_eq!(SubscriptionSpec::duplicate_durable(&specs), None);
        let course = specs.iter().find(|spec| spec.handler == HandlerKind::Course);
        assert_eq!(course.map(|spec| spec.durable.as_str()), Some("durable-sync-course"));
    }

    #[test]
    fn master_registration_subject_is_shared_by_five_durables() {
        let subjects = InboundSubjects::default();
        let master = subjects.name(InboundSubject::MasterRegistration).to_string();
        let specs = SubscriptionSpec::for_handlers(&subjects);
        assert_eq!(specs.iter().filter(|spec| spec.subject == master).count(), 5);
    }

    #[test]
    fn duplicate_durables_are_reported() {
        let mut specs = SubscriptionSpec::for_handlers(&InboundSubjects::default());
        specs[1].durable = specs[0].durable.clone();
        assert_eq!(SubscriptionSpec::duplicate_durable(&specs), Some("durable-sync-course"));
    }
}
