// crates/partner-sync-cli/src/lib.rs
// ============================================================================
// Module: Partner Sync CLI Library
// Description: Wiring shared by the partner-sync binary and its tests.
// Purpose: Build stores, telemetry, engines, and output views from config.
// Dependencies: partner-sync-core, partner-sync-config, partner-sync-broker
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) parses arguments and dispatches
//! commands. Everything it assembles from a [`PartnerSyncConfig`] lives here
//! so the same wiring can be driven against the in-memory broker in tests.
//!
//! [`PartnerSyncConfig`]: partner_sync_config::PartnerSyncConfig

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Reference appliers that journal applied records.
pub mod journal;
/// JSON views printed by the query commands.
pub mod render;
/// Config-driven assembly of stores, telemetry, and services.
pub mod runtime;
