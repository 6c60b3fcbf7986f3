//! Product master records as supplied by the catalog collaborator.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{SkuCode, SupplierId};

/// Demand variability tier, maintained by the catalog.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandVariability {
    Low,
    Medium,
    High,
}

/// Out-of-stock boost applied to the demand forecast.
///
/// `Inherit` defers to the global setting; `Override` pins a per-SKU
/// percentage. Legacy catalog data encoded "inherit" as a zero percent,
/// see [`Boost::from_legacy_percent`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boost {
    #[default]
    Inherit,
    Override(u8),
}

impl Boost {
    /// Interpret a legacy 0-100 percentage where `0` meant "inherit".
    pub fn from_legacy_percent(percent: u8) -> DomainResult<Self> {
        match percent {
            0 => Ok(Self::Inherit),
            1..=100 => Ok(Self::Override(percent)),
            _ => Err(DomainError::validation("boost percent must be 0-100")),
        }
    }

    /// Resolve against the configured global boost percent.
    pub fn effective_percent(self, global_percent: u8) -> u8 {
        match self {
            Self::Inherit => global_percent,
            Self::Override(percent) => percent,
        }
    }
}

/// Product master record.
///
/// Created and edited by an external catalog collaborator; the engine
/// only reads it. Quantities are `i64` to match the ledger arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuRecord {
    pub code: SkuCode,
    pub description: String,
    #[serde(default)]
    pub ean: Option<String>,
    pub moq: i64,
    pub pack_size: i64,
    pub lead_time_days: u32,
    pub review_period_days: u32,
    pub safety_stock: i64,
    pub max_stock: i64,
    #[serde(default)]
    pub reorder_point: i64,
    pub supplier: SupplierId,
    pub demand_variability: DemandVariability,
    #[serde(default)]
    pub oos_boost: Boost,
}

impl SkuRecord {
    /// Check the catalog invariants.
    ///
    /// The in-memory catalog calls this on insert, so a record obtained
    /// through a [`crate::Catalog`] lookup is known valid.
    pub fn validate(&self) -> DomainResult<()> {
        if self.pack_size < 1 {
            return Err(DomainError::validation("pack_size must be at least 1"));
        }
        if self.moq < 0 {
            return Err(DomainError::validation("moq cannot be negative"));
        }
        if self.safety_stock < 0 {
            return Err(DomainError::validation("safety_stock cannot be negative"));
        }
        if self.max_stock < self.moq {
            return Err(DomainError::validation("max_stock must be at least moq"));
        }
        if let Boost::Override(percent) = self.oos_boost {
            if percent > 100 {
                return Err(DomainError::validation("boost percent must be 0-100"));
            }
        }
        Ok(())
    }
}
