use serde::{Deserialize, Serialize};
use crate::addressing::CacheGeometry;
use crate::error::ConfigError;

/// Upper bound on the number of sets in one level
pub const MAX_SETS: u64 = 1024;

/// Upper bound on the number of ways in one set
pub const MAX_ASSOCIATIVITY: u32 = 256;

/// A data cache hierarchy: a mandatory L1 and an optional L2
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HierarchyConfig {
    pub l1: CacheConfig,
    #[serde(default)]
    pub l2: Option<CacheConfig>,
    /// Accesses of at most this many bytes take the single line fast path when they fit in a line
    #[serde(default = "default_single_line_threshold")]
    pub single_line_threshold: u32,
    /// The footprint, in bytes, of a prefetch instruction
    #[serde(default = "default_prefetch_size")]
    pub prefetch_size: u32,
}

/// A configuration for a single cache level
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub size_kb: f32,
    pub line_size: u64,
    pub associativity: u32,
    #[serde(default)]
    pub replacement_policy: ReplacementPolicyConfig,
    #[serde(default)]
    pub organisation: OrganisationConfig,
    #[serde(default)]
    pub store_allocation: StoreAllocation,
}

/// The replacement policy used by each set. Defaults to round robin.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementPolicyConfig {
    #[default]
    #[serde(alias = "rr")]
    RoundRobin,
    #[serde(alias = "lru")]
    LeastRecentlyUsed,
}

/// How lines are placed. Column associative caches are direct mapped with a second probe location.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganisationConfig {
    #[default]
    SetAssociative,
    #[serde(alias = "column")]
    ColumnAssociative,
}

/// Whether a store miss installs the line
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreAllocation {
    #[default]
    Allocate,
    NoAllocate,
}

fn default_name() -> String {
    String::from("Data Cache")
}

fn default_single_line_threshold() -> u32 {
    4
}

fn default_prefetch_size() -> u32 {
    64
}

impl CacheConfig {
    pub fn new(name: impl Into<String>, size_kb: f32, line_size: u64, associativity: u32) -> Self {
        Self {
            name: name.into(),
            size_kb,
            line_size,
            associativity,
            replacement_policy: ReplacementPolicyConfig::default(),
            organisation: OrganisationConfig::default(),
            store_allocation: StoreAllocation::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReplacementPolicyConfig) -> Self {
        self.replacement_policy = policy;
        self
    }

    pub fn with_organisation(mut self, organisation: OrganisationConfig) -> Self {
        self.organisation = organisation;
        self
    }

    pub fn with_store_allocation(mut self, store_allocation: StoreAllocation) -> Self {
        self.store_allocation = store_allocation;
        self
    }

    /// The capacity in bytes. Fractional kilobyte sizes are fine as long as they land on a whole byte
    pub fn size_bytes(&self) -> Result<u64, ConfigError> {
        let bytes = self.size_kb as f64 * 1024.0;
        if !bytes.is_finite() || bytes < 0.0 {
            return Err(ConfigError::InvalidSize { name: self.name.clone(), size_kb: self.size_kb });
        }
        if bytes.fract() != 0.0 {
            return Err(ConfigError::FractionalSize { name: self.name.clone(), size_kb: self.size_kb });
        }
        Ok(bytes as u64)
    }

    /// Checks every constraint on the level and returns its geometry
    pub fn validate(&self) -> Result<CacheGeometry, ConfigError> {
        let name = || self.name.clone();
        let size = self.size_bytes()?;
        if self.line_size == 0 || !self.line_size.is_power_of_two() {
            return Err(ConfigError::LineSizeNotPowerOfTwo { name: name(), line_size: self.line_size });
        }
        if size == 0 || size % self.line_size != 0 {
            return Err(ConfigError::SizeNotMultipleOfLine { name: name(), size, line_size: self.line_size });
        }
        if self.associativity == 0 {
            return Err(ConfigError::ZeroAssociativity { name: name() });
        }
        if self.associativity > MAX_ASSOCIATIVITY {
            return Err(ConfigError::AssociativityTooLarge {
                name: name(),
                associativity: self.associativity,
                max: MAX_ASSOCIATIVITY,
            });
        }
        let lines = size / self.line_size;
        if lines % self.associativity as u64 != 0 {
            return Err(ConfigError::AssociativityDoesNotDivide {
                name: name(),
                associativity: self.associativity,
                lines,
            });
        }
        let sets = lines / self.associativity as u64;
        if !sets.is_power_of_two() {
            return Err(ConfigError::SetsNotPowerOfTwo { name: name(), sets });
        }
        if sets > MAX_SETS {
            return Err(ConfigError::TooManySets { name: name(), sets, max: MAX_SETS });
        }
        if self.organisation == OrganisationConfig::ColumnAssociative && (self.associativity != 1 || sets < 2) {
            return Err(ConfigError::InvalidColumnAssociative {
                name: name(),
                associativity: self.associativity,
                sets,
            });
        }
        Ok(CacheGeometry::new(self.line_size, sets, self.associativity))
    }
}

impl HierarchyConfig {
    pub fn new(l1: CacheConfig, l2: Option<CacheConfig>) -> Self {
        Self {
            l1,
            l2,
            single_line_threshold: default_single_line_threshold(),
            prefetch_size: default_prefetch_size(),
        }
    }

    /// Validates both levels and the constraints between them
    pub fn validate(&self) -> Result<(CacheGeometry, Option<CacheGeometry>), ConfigError> {
        if self.prefetch_size == 0 {
            return Err(ConfigError::ZeroPrefetchSize);
        }
        let l1 = self.l1.validate()?;
        let l2 = match &self.l2 {
            Some(config) => {
                let l2 = config.validate()?;
                if l2.line_size() < l1.line_size() {
                    return Err(ConfigError::L2LineSmallerThanL1 { l1: l1.line_size(), l2: l2.line_size() });
                }
                Some(l2)
            }
            None => None,
        };
        Ok((l1, l2))
    }
}
