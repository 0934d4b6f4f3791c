use serde::{Deserialize, Serialize};
use crate::addressing::CacheGeometry;
use crate::error::AccessError;
use crate::stats::AccessKind;

/// Why an access happened
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessReason {
    #[default]
    Demand,
    Prefetch,
}

/// One memory operation as reported by the host. Built per operation and consumed straight away.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AccessEvent {
    pub address: u64,
    pub size: u32,
    pub kind: AccessKind,
    pub reason: AccessReason,
    /// Address of the instruction performing the access
    pub ip: u64,
}

impl AccessEvent {
    pub fn load(address: u64, size: u32) -> Self {
        Self { address, size, kind: AccessKind::Load, reason: AccessReason::Demand, ip: 0 }
    }

    pub fn store(address: u64, size: u32) -> Self {
        Self { address, size, kind: AccessKind::Store, reason: AccessReason::Demand, ip: 0 }
    }

    pub fn prefetch(address: u64, size: u32) -> Self {
        Self { address, size, kind: AccessKind::Load, reason: AccessReason::Prefetch, ip: 0 }
    }

    pub fn at_ip(mut self, ip: u64) -> Self {
        self.ip = ip;
        self
    }
}

/// Thresholds used when deciding how an access reaches the caches
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SplitterSettings {
    pub single_line_threshold: u32,
    pub prefetch_size: u32,
}

/// How an access will be fed to the hierarchy, in L1 lines
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccessPlan {
    /// Small and inside one line, takes the fast path
    SingleLine { address: u64, kind: AccessKind },
    /// `line_count` consecutive lines starting at the line address `first_line`, each probed once
    MultiLine { first_line: u64, line_count: u64, kind: AccessKind },
}

impl AccessPlan {
    pub fn kind(&self) -> AccessKind {
        match self {
            AccessPlan::SingleLine { kind, .. } | AccessPlan::MultiLine { kind, .. } => *kind,
        }
    }

    pub fn line_count(&self) -> u64 {
        match self {
            AccessPlan::SingleLine { .. } => 1,
            AccessPlan::MultiLine { line_count, .. } => *line_count,
        }
    }

    /// The address to probe for each touched line, in order
    pub fn line_addresses(&self, line_size: u64) -> impl Iterator<Item = u64> {
        let (first, count) = match *self {
            AccessPlan::SingleLine { address, .. } => (address, 1),
            AccessPlan::MultiLine { first_line, line_count, .. } => (first_line, line_count),
        };
        (0..count).map(move |i| first.wrapping_add(i * line_size))
    }
}

/// Decides how one memory operation is fed to the caches
///
/// Prefetches are loads of `prefetch_size` bytes whatever their operand size. Anything no larger
/// than the single line threshold that fits in an L1 line takes the single line path, everything
/// else is split into every L1 line it touches, so a straddling access counts once per line and a
/// contained one counts once.
///
/// # Arguments
///
/// * `event`: The access reported by the host
/// * `geometry`: The L1 geometry, which sets the line granularity
/// * `settings`: Single line threshold and prefetch footprint
///
/// returns: Result<AccessPlan, AccessError>
pub fn plan_access(event: &AccessEvent, geometry: &CacheGeometry, settings: &SplitterSettings) -> Result<AccessPlan, AccessError> {
    // The reported size is checked before a prefetch swaps in its own footprint
    if event.size == 0 {
        return Err(AccessError::EmptyAccess { address: event.address });
    }
    let (size, kind) = match event.reason {
        AccessReason::Prefetch => (settings.prefetch_size, AccessKind::Load),
        AccessReason::Demand => (event.size, event.kind),
    };
    if size == 0 {
        return Err(AccessError::EmptyAccess { address: event.address });
    }
    if size <= settings.single_line_threshold && geometry.is_single_line(event.address, size) {
        return Ok(AccessPlan::SingleLine { address: event.address, kind });
    }
    Ok(AccessPlan::MultiLine {
        first_line: geometry.line_address(event.address),
        line_count: geometry.lines_spanned(event.address, size),
        kind,
    })
}
