//! # DCacheLib
//!
//! DCacheLib simulates a data cache hierarchy: an L1 and an optional L2, fed by a stream of memory
//! accesses, classifying every line touched as a hit or a miss
//!
//! It provides a generic set associative cache parameterised by a replacement policy, a column
//! associative alternative, a simulator which splits accesses into lines and keeps statistics,
//! and a replay path for recorded traces
//!
//! The simulator owns all of its state and is driven one access at a time, so a host serialises
//! calls if it observes several threads

/// Line, set and tag arithmetic for a validated cache geometry
pub mod addressing;

/// Contains the set associative cache, and a utility enum over every cache organisation
pub mod cache;

/// A direct mapped cache with a second probe location
pub mod column_associative;

/// Contains definitions for the JSON configuration format, and its validation
pub mod config;

pub mod error;

/// Puts the levels together: L2 is only consulted on an L1 miss
pub mod hierarchy;

/// Loading trace files
pub mod io;

/// Contains the provided replacement policies, with a trait for implementing custom replacement
/// policies
pub mod replacement_policies;

/// Text rendering of the final report
pub mod report;

pub mod set;

/// Contains the simulator used to run an access stream through a hierarchy
pub mod simulator;

/// Decides how a memory operation is split into line accesses
pub mod splitter;

/// Hit and miss counters, and the report built from them
pub mod stats;

/// The fixed width trace record format
pub mod trace;

// Generated from the build.rs, private
mod hex {
    include!(concat!(env!("OUT_DIR"), "/hex.rs"));
}

/// Contains utilities for running recorded cases and benchmarks.
pub mod util;

pub use config::{CacheConfig, HierarchyConfig};
pub use error::{AccessError, ConfigError, SimulationError, TraceError};
pub use simulator::Simulator;
pub use splitter::{AccessEvent, AccessReason};
pub use stats::{AccessKind, StatsReport};
