//! # Sweepr Core
//!
//! The scan-engine abstractions every probe protocol plugs into:
//!
//! * **[`validate`]**: the stateless validation engine. Maps a flow tuple
//!   plus a process-lifetime secret to 16 deterministic pseudo-random
//!   bytes, so a reply can be authenticated without a connection table.
//! * **[`probe`]**: the probe-module lifecycle contract and descriptor.
//!   Concrete wire protocols live in `sweepr-probes`.
//! * **[`config`]**: the run configuration handed to module construction.
//! * **[`fieldset`]**: the ordered output record handed to the reporting
//!   collaborator.
//!
//! High-level code should depend on the [`probe::ProbeModule`] trait, never
//! on a concrete module type.

pub mod config;
pub mod fieldset;
pub mod probe;
pub mod validate;
