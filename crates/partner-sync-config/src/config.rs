// crates/partner-sync-config/src/config.rs
// ============================================================================
// Module: Partner Sync Configuration
// Description: Configuration loading and validation for the sync engine.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: partner-sync-core, partner-sync-broker, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file yields a working in-memory
//! setup against a local broker. Missing or invalid values fail closed.
//!
//! The `*_ms` and `*_minutes` fields stay integers on disk; accessor methods
//! convert them into the runtime types the engine and broker crates consume.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use partner_sync_broker::ConsumerPolicy;
use partner_sync_broker::DEFAULT_MAX_DELIVER;
use partner_sync_broker::DEFAULT_MAX_IN_FLIGHT;
use partner_sync_broker::DeliverPolicy;
use partner_sync_broker::SubscriptionSpec;
use partner_sync_core::DEFAULT_CHUNK_SIZE;
use partner_sync_core::DEFAULT_MAX_RANGE_DAYS;
use partner_sync_core::DEFAULT_RECOVER_MAX_RETRY;
use partner_sync_core::HandlerKind;
use partner_sync_core::InboundSubjects;
use partner_sync_core::RetryPolicy;
use partner_sync_core::SyncSettings;
use partner_sync_store_sqlite::SqliteStoreConfig;
use partner_sync_store_sqlite::SqliteStoreMode;
use partner_sync_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "partner-sync.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PARTNER_SYNC_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum broker ack wait in milliseconds.
pub(crate) const MIN_ACK_WAIT_MS: u64 = 1_000;
/// Maximum broker ack wait in milliseconds.
pub(crate) const MAX_ACK_WAIT_MS: u64 = 600_000;
/// Maximum records per chunk.
pub(crate) const MAX_CHUNK_SIZE: usize = 10_000;
/// Maximum span accepted for reports and recovery.
pub(crate) const MAX_REPORT_RANGE_DAYS: u32 = 366;
/// Maximum publish attempts.
pub(crate) const MAX_PUBLISH_ATTEMPTS: u32 = 20;
/// Maximum entries in the static class-course table.
pub(crate) const MAX_CLASS_COURSE_ENTRIES: usize = 100_000;
/// Default broker URL.
pub(crate) const DEFAULT_BROKER_URL: &str = "nats://127.0.0.1:4222";
/// Default `JetStream` stream name.
pub(crate) const DEFAULT_STREAM_NAME: &str = "partner-sync";
/// Default derived student package subject.
pub(crate) const DEFAULT_STUDENT_PACKAGE_SUBJECT: &str = "SyncJprepStudentPackage.Synced";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Partner sync configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartnerSyncConfig {
    /// Broker connection and consumer policy.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Subject and durable naming.
    #[serde(default)]
    pub subjects: SubjectsConfig,
    /// Handler, report, and recovery tunables.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Sync log store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Telemetry output.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Static class to course table keyed by class id.
    #[serde(default)]
    pub class_courses: BTreeMap<String, Vec<String>>,
}

impl PartnerSyncConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then `PARTNER_SYNC_CONFIG`, then
    /// `./partner-sync.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker.validate()?;
        self.subjects.validate()?;
        self.sync.validate()?;
        if self.sync.handler_timeout_ms > self.broker.ack_wait_ms {
            return Err(ConfigError::Invalid(
                "sync.handler_timeout_ms must not exceed broker.ack_wait_ms".to_string(),
            ));
        }
        self.store.validate()?;
        self.telemetry.validate()?;
        self.class_course_map()?;
        Ok(())
    }

    /// Returns the consumer policy shared by every durable.
    #[must_use]
    pub const fn consumer_policy(&self) -> ConsumerPolicy {
        ConsumerPolicy {
            max_deliver: self.broker.max_deliver,
            ack_wait: Duration::from_millis(self.broker.ack_wait_ms),
            deliver_policy: self.broker.deliver_policy,
            max_in_flight: self.broker.max_in_flight,
        }
    }

    /// Returns the inbound subject names.
    #[must_use]
    pub fn inbound_subjects(&self) -> InboundSubjects {
        InboundSubjects {
            master_registration: self.subjects.master_registration.clone(),
            user_registration: self.subjects.user_registration.clone(),
            user_course: self.subjects.user_course.clone(),
        }
    }

    /// Returns one subscription spec per handler with durable overrides applied.
    #[must_use]
    pub fn subscription_specs(&self) -> Vec<SubscriptionSpec> {
        let mut specs = SubscriptionSpec::for_handlers(&self.inbound_subjects());
        for spec in &mut specs {
            if let Some(durable) = self.subjects.durables.get(spec.handler.label()) {
                spec.durable.clone_from(durable);
            }
        }
        specs
    }

    /// Returns the handler tunables.
    #[must_use]
    pub const fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            chunk_size: self.sync.chunk_size,
            staleness_window: Duration::from_secs(
                self.sync.staleness_window_minutes.saturating_mul(60),
            ),
            handler_timeout: Duration::from_millis(self.sync.handler_timeout_ms),
        }
    }

    /// Returns the publish retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.sync.publish_retry.policy()
    }

    /// Returns the static class to course table keyed by numeric class id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a key is not an integer or the
    /// table is too large.
    pub fn class_course_map(&self) -> Result<BTreeMap<i64, Vec<String>>, ConfigError> {
        if self.class_courses.len() > MAX_CLASS_COURSE_ENTRIES {
            return Err(ConfigError::Invalid("class_courses has too many entries".to_string()));
        }
        self.class_courses
            .iter()
            .map(|(class_id, courses)| {
                let parsed = class_id.trim().parse::<i64>().map_err(|_| {
                    ConfigError::Invalid(format!("class_courses key {class_id} must be an integer"))
                })?;
                if courses.iter().any(|course| course.trim().is_empty()) {
                    return Err(ConfigError::Invalid(format!(
                        "class_courses.{class_id} contains an empty course id"
                    )));
                }
                Ok((parsed, courses.clone()))
            })
            .collect()
    }
}

/// Broker connection and consumer policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// NATS server URL.
    #[serde(default = "default_broker_url")]
    pub url: String,
    /// `JetStream` stream holding the inbound subjects.
    #[serde(default = "default_stream_name")]
    pub stream: String,
    /// Delivery attempts before the broker gives up.
    #[serde(default = "default_max_deliver")]
    pub max_deliver: u32,
    /// Ack wait in milliseconds.
    #[serde(default = "default_ack_wait_ms")]
    pub ack_wait_ms: u64,
    /// Starting position for fresh durables.
    #[serde(default)]
    pub deliver_policy: DeliverPolicy,
    /// Deliveries handled concurrently across all subscriptions.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            stream: default_stream_name(),
            max_deliver: DEFAULT_MAX_DELIVER,
            ack_wait_ms: default_ack_wait_ms(),
            deliver_policy: DeliverPolicy::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl BrokerConfig {
    /// Validates broker configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_non_empty("broker.url", &self.url)?;
        validate_non_empty("broker.stream", &self.stream)?;
        if self.max_deliver == 0 {
            return Err(ConfigError::Invalid(
                "broker.max_deliver must be greater than zero".to_string(),
            ));
        }
        if !(MIN_ACK_WAIT_MS ..= MAX_ACK_WAIT_MS).contains(&self.ack_wait_ms) {
            return Err(ConfigError::Invalid(format!(
                "broker.ack_wait_ms must be between {MIN_ACK_WAIT_MS} and {MAX_ACK_WAIT_MS}"
            )));
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "broker.max_in_flight must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Subject and durable naming.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectsConfig {
    /// Course, class, lesson, academic year, and staff batches.
    #[serde(default = "default_master_registration")]
    pub master_registration: String,
    /// Student batches.
    #[serde(default = "default_user_registration")]
    pub user_registration: String,
    /// Student lesson batches.
    #[serde(default = "default_user_course")]
    pub user_course: String,
    /// Derived student package events.
    #[serde(default = "default_student_package_subject")]
    pub student_package: String,
    /// Durable name overrides keyed by handler label.
    #[serde(default)]
    pub durables: BTreeMap<String, String>,
}

impl Default for SubjectsConfig {
    fn default() -> Self {
        let inbound = InboundSubjects::default();
        Self {
            master_registration: inbound.master_registration,
            user_registration: inbound.user_registration,
            user_course: inbound.user_course,
            student_package: default_student_package_subject(),
            durables: BTreeMap::new(),
        }
    }
}

impl SubjectsConfig {
    /// Validates subject names and durable overrides.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_non_empty("subjects.master_registration", &self.master_registration)?;
        validate_non_empty("subjects.user_registration", &self.user_registration)?;
        validate_non_empty("subjects.user_course", &self.user_course)?;
        validate_non_empty("subjects.student_package", &self.student_package)?;
        let inbound = [&self.master_registration, &self.user_registration, &self.user_course];
        if inbound.contains(&&self.student_package) {
            return Err(ConfigError::Invalid(
                "subjects.student_package must differ from inbound subjects".to_string(),
            ));
        }
        for (label, durable) in &self.durables {
            if HandlerKind::parse(label).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "subjects.durables has unknown handler {label}"
                )));
            }
            validate_non_empty(&format!("subjects.durables.{label}"), durable)?;
        }
        let mut seen = BTreeSet::new();
        for handler in HandlerKind::ALL {
            let durable = self
                .durables
                .get(handler.label())
                .cloned()
                .unwrap_or_else(|| SubscriptionSpec::default_durable(handler));
            if !seen.insert(durable.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "durable {durable} is used by more than one handler"
                )));
            }
        }
        Ok(())
    }
}

/// Handler, report, and recovery tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Records per chunk on both the producer and handler sides.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Maximum log age in minutes before a student lesson batch is stale.
    #[serde(default = "default_staleness_window_minutes")]
    pub staleness_window_minutes: u64,
    /// Hard deadline for one delivery in milliseconds.
    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,
    /// Recovery attempts per split before it is abandoned.
    #[serde(default = "default_recover_max_retry")]
    pub recover_max_retry: u32,
    /// Widest date range accepted by report and recovery.
    #[serde(default = "default_report_max_range_days")]
    pub report_max_range_days: u32,
    /// Publish retry policy.
    #[serde(default)]
    pub publish_retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            staleness_window_minutes: default_staleness_window_minutes(),
            handler_timeout_ms: default_handler_timeout_ms(),
            recover_max_retry: DEFAULT_RECOVER_MAX_RETRY,
            report_max_range_days: DEFAULT_MAX_RANGE_DAYS,
            publish_retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Validates sync tunables.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "sync.chunk_size must be between 1 and {MAX_CHUNK_SIZE}"
            )));
        }
        if self.staleness_window_minutes == 0 {
            return Err(ConfigError::Invalid(
                "sync.staleness_window_minutes must be greater than zero".to_string(),
            ));
        }
        if self.handler_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "sync.handler_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.report_max_range_days == 0 || self.report_max_range_days > MAX_REPORT_RANGE_DAYS {
            return Err(ConfigError::Invalid(format!(
                "sync.report_max_range_days must be between 1 and {MAX_REPORT_RANGE_DAYS}"
            )));
        }
        self.publish_retry.validate()
    }
}

/// Publish retry policy in config units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum attempts, including the first.
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt in milliseconds.
    #[serde(default = "default_retry_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay in milliseconds.
    #[serde(default = "default_retry_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            initial_backoff_ms: default_retry_initial_backoff_ms(),
            max_backoff_ms: default_retry_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Converts to the runtime retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }

    /// Validates retry limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_PUBLISH_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "sync.publish_retry.max_attempts must be between 1 and {MAX_PUBLISH_ATTEMPTS}"
            )));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "sync.publish_retry.initial_backoff_ms must not exceed max_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sync log store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store config when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_limits("store path", path)
            }
        }
    }
}

/// Sync log store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Process-local store; history is lost on restart.
    #[default]
    Memory,
    /// `SQLite`-backed durable store.
    Sqlite,
}

/// Telemetry output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Where JSON-line events are written.
    #[serde(default)]
    pub sink: TelemetrySink,
    /// Output file when `sink = "file"`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl TelemetryConfig {
    /// Validates telemetry configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (TelemetrySink::File, Some(path)) => validate_path_limits("telemetry path", path),
            (TelemetrySink::File, None) => {
                Err(ConfigError::Invalid("file telemetry requires path".to_string()))
            }
            (_, Some(_)) => Err(ConfigError::Invalid(
                "telemetry path is only valid with sink = \"file\"".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

/// Telemetry destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TelemetrySink {
    /// JSON lines on standard error.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Drop every event.
    None,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured file path against length limits.
fn validate_path_limits(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} component too long")));
        }
    }
    Ok(())
}

/// Rejects blank string settings.
fn validate_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Default broker URL.
fn default_broker_url() -> String {
    DEFAULT_BROKER_URL.to_string()
}

/// Default stream name.
fn default_stream_name() -> String {
    DEFAULT_STREAM_NAME.to_string()
}

/// Default delivery ceiling.
const fn default_max_deliver() -> u32 {
    DEFAULT_MAX_DELIVER
}

/// Default ack wait in milliseconds.
const fn default_ack_wait_ms() -> u64 {
    30_000
}

/// Default concurrency limit.
const fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

/// Default master registration subject.
fn default_master_registration() -> String {
    InboundSubjects::default().master_registration
}

/// Default user registration subject.
fn default_user_registration() -> String {
    InboundSubjects::default().user_registration
}

/// Default user course subject.
fn default_user_course() -> String {
    InboundSubjects::default().user_course
}

/// Default derived student package subject.
fn default_student_package_subject() -> String {
    DEFAULT_STUDENT_PACKAGE_SUBJECT.to_string()
}

/// Default chunk size.
const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Default staleness window in minutes.
const fn default_staleness_window_minutes() -> u64 {
    60
}

/// Default handler timeout in milliseconds.
const fn default_handler_timeout_ms() -> u64 {
    30_000
}

/// Default recovery attempts per split.
const fn default_recover_max_retry() -> u32 {
    DEFAULT_RECOVER_MAX_RETRY
}

/// Default report range in days.
const fn default_report_max_range_days() -> u32 {
    DEFAULT_MAX_RANGE_DAYS
}

/// Default publish attempts.
const fn default_retry_max_attempts() -> u32 {
    3
}

/// Default initial publish backoff.
const fn default_retry_initial_backoff_ms() -> u64 {
    100
}

/// Default maximum publish backoff.
const fn default_retry_max_backoff_ms() -> u64 {
    2_000
}

/// Default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_runtime_defaults() {
        let config = PartnerSyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.consumer_policy(), ConsumerPolicy::default());
        assert_eq!(config.sync_settings(), SyncSettings::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.inbound_subjects(), InboundSubjects::default());
    }

    #[test]
    fn durable_override_replaces_only_its_handler() {
        let mut config = PartnerSyncConfig::default();
        config.subjects.durables.insert("sync-staff".to_string(), "staff-v2".to_string());
        let specs = config.subscription_specs();
        assert_eq!(specs.len(), HandlerKind::ALL.len());
        let staff = specs.iter().find(|spec| spec.handler == HandlerKind::Staff).unwrap();
        assert_eq!(staff.durable, "staff-v2");
        let course = specs.iter().find(|spec| spec.handler == HandlerKind::Course).unwrap();
        assert_eq!(course.durable, "durable-sync-course");
    }

    #[test]
    fn staleness_window_is_converted_from_minutes() {
        let mut config = PartnerSyncConfig::default();
        config.sync.staleness_window_minutes = 5;
        assert_eq!(config.sync_settings().staleness_window, Duration::from_secs(300));
    }

    #[test]
    fn sqlite_store_config_requires_sqlite_backend() {
        let mut store = StoreConfig {
            path: Some(PathBuf::from("sync.db")),
            ..StoreConfig::default()
        };
        assert!(store.sqlite().is_none());
        store.store_type = StoreType::Sqlite;
        let sqlite = store.sqlite().unwrap();
        assert_eq!(sqlite.path, PathBuf::from("sync.db"));
        assert_eq!(sqlite.busy_timeout_ms, 5_000);
    }
}
