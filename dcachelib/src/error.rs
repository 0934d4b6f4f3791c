use thiserror::Error;

/// Raised while turning a configuration into a cache. Construction fails rather than clamping.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name}: line size {line_size} is not a power of two")]
    LineSizeNotPowerOfTwo { name: String, line_size: u64 },

    #[error("{name}: cache size of {size_kb} KB is not a finite, non-negative size")]
    InvalidSize { name: String, size_kb: f32 },

    #[error("{name}: cache size of {size_kb} KB is not a whole number of bytes")]
    FractionalSize { name: String, size_kb: f32 },

    #[error("{name}: cache size {size} must be a positive multiple of the line size {line_size}")]
    SizeNotMultipleOfLine { name: String, size: u64, line_size: u64 },

    #[error("{name}: associativity must be at least 1")]
    ZeroAssociativity { name: String },

    #[error("{name}: associativity {associativity} does not divide {lines} lines into whole sets")]
    AssociativityDoesNotDivide { name: String, associativity: u32, lines: u64 },

    #[error("{name}: set count {sets} is not a power of two")]
    SetsNotPowerOfTwo { name: String, sets: u64 },

    #[error("{name}: {sets} sets exceeds the maximum of {max}")]
    TooManySets { name: String, sets: u64, max: u64 },

    #[error("{name}: associativity {associativity} exceeds the maximum of {max}")]
    AssociativityTooLarge { name: String, associativity: u32, max: u32 },

    #[error("{name}: a column associative cache needs associativity 1 and at least 2 sets, got {associativity} ways and {sets} sets")]
    InvalidColumnAssociative { name: String, associativity: u32, sets: u64 },

    #[error("L2 line size {l2} is smaller than the L1 line size {l1}")]
    L2LineSmallerThanL1 { l1: u64, l2: u64 },

    #[error("prefetch size must be at least 1 byte")]
    ZeroPrefetchSize,
}

/// Raised when the host reports an access that breaks the access contract
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("access of zero bytes at {address:#x}")]
    EmptyAccess { address: u64 },

    #[error("access of {size} bytes at {address:#x} spans more than one {line_size} byte line")]
    NotSingleLine { address: u64, size: u32, line_size: u64 },
}

/// Raised when a trace buffer does not follow the record format
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("trace length {0} is not a multiple of the record length")]
    PartialRecord(usize),

    #[error("record {record}: invalid {field}")]
    InvalidField { record: usize, field: &'static str },

    #[error("access size {size} does not fit a record, the largest is {max}")]
    SizeTooLarge { size: u32, max: u32 },
}

/// Anything that can stop a trace replay
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("record {record} (ip {ip:#x}): {source}")]
    Access { record: usize, ip: u64, source: AccessError },
}
