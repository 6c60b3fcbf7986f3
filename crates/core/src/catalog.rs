//! Read-only access to the product catalog.
//!
//! SKU records are owned by an external collaborator; the engine only
//! looks them up by code.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use crate::error::{DomainError, DomainResult};
use crate::id::SkuCode;
use crate::sku::SkuRecord;

/// Catalog lookup abstraction.
pub trait Catalog: Send + Sync {
    fn sku(&self, code: &SkuCode) -> Option<SkuRecord>;

    /// Lookup that fails with `UnknownSku` when the code is absent.
    fn require_sku(&self, code: &SkuCode) -> DomainResult<SkuRecord> {
        self.sku(code)
            .ok_or_else(|| DomainError::UnknownSku(code.clone()))
    }
}

impl<S> Catalog for Arc<S>
where
    S: Catalog + ?Sized,
{
    fn sku(&self, code: &SkuCode) -> Option<SkuRecord> {
        (**self).sku(code)
    }
}

/// In-memory catalog for tests/dev.
///
/// Records are validated on insert, so a successful lookup always
/// returns an invariant-respecting record.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<HashMap<SkuCode, SkuRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, record: SkuRecord) -> DomainResult<()> {
        record.validate()?;
        if let Ok(mut map) = self.inner.write() {
            map.insert(record.code.clone(), record);
        }
        Ok(())
    }
}

impl Catalog for InMemoryCatalog {
    fn sku(&self, code: &SkuCode) -> Option<SkuRecord> {
        let map = self.inner.read().ok()?;
        map.get(code).cloned()
    }
}
