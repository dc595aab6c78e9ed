//! Workspace placeholder crate.
//!
//! This crate exists to expose feature flags that map to the individual
//! workspace crates (`core-service`, `core-ambience`, `core-playback`). Host
//! applications can depend on `murmur-workspace` and enable the documented
//! features without wiring each crate individually.

#[cfg(feature = "ambience")]
pub use core_ambience as ambience;
#[cfg(feature = "playback")]
pub use core_playback as playback;
#[cfg(feature = "service")]
pub use core_service as service;
