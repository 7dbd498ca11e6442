// crates/partner-sync-config/src/lib.rs
// ============================================================================
// Module: Partner Sync Config Library
// Description: Canonical config model, validation, and example output.
// Purpose: Single source of truth for partner-sync.toml semantics.
// Dependencies: partner-sync-core, partner-sync-broker, serde, toml
// ============================================================================

//! ## Overview
//! `partner-sync-config` defines the configuration model for the partner sync
//! engine. Loading is strict and fail-closed: oversized files, non-UTF-8
//! input, unknown handler labels, and inconsistent timing limits are all
//! rejected before any consumer binds.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
