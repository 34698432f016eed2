use crate::errors::CoreError;
use crate::records::Certification;
use orivon_canonical::CertificationId;
use orivon_store::{EntityKind, Filter, RecordAdapter};
use tracing::debug;

/// Read-only certification lookups.
#[derive(Debug, Clone)]
pub struct Catalog {
    store: RecordAdapter,
}

impl Catalog {
    /// Creates a catalog over the store.
    pub fn new(store: RecordAdapter) -> Self {
        Self { store }
    }

    /// Loads a certification; absence is `NotFound`.
    pub fn certification(&self, id: &CertificationId) -> Result<Certification, CoreError> {
        self.store
            .find_as(EntityKind::Certification, &Filter::new().eq("id", id.as_str()))?
            .ok_or_else(|| CoreError::not_found("certification", id))
    }

    /// Title of a certification, if it can be resolved right now.
    pub fn title_of(&self, id: &CertificationId) -> Option<String> {
        match self.certification(id) {
            Ok(cert) => cert.title,
            Err(e) => {
                debug!(certification_id = %id, error = %e, "certification title unavailable");
                None
            }
        }
    }
}
