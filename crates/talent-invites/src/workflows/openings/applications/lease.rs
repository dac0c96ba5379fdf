use std::collections::HashSet;
use std::sync::Mutex;

use super::domain::OpeningId;

/// Per-opening exclusion tokens held for the whole select-send-persist sequence.
#[derive(Debug, Default)]
pub struct DispatchLeases {
    active: Mutex<HashSet<OpeningId>>,
}

#[derive(Debug, thiserror::Error)]
pub enum LeaseError {
    #[error("an invite dispatch is already running for opening {0}")]
    Busy(OpeningId),
    #[error("dispatch lease table poisoned")]
    Poisoned,
}

impl DispatchLeases {
    pub fn acquire(&self, opening: &OpeningId) -> Result<DispatchLease<'_>, LeaseError> {
        let mut active = self.active.lock().map_err(|_| LeaseError::Poisoned)?;
        if !active.insert(opening.clone()) {
            return Err(LeaseError::Busy(opening.clone()));
        }

        Ok(DispatchLease {
            leases: self,
            opening: opening.clone(),
        })
    }

    pub fn is_held(&self, opening: &OpeningId) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(opening))
            .unwrap_or(false)
    }
}

/// Released on drop, including when the dispatch returns early with an error.
#[derive(Debug)]
pub struct DispatchLease<'a> {
    leases: &'a DispatchLeases,
    opening: OpeningId,
}

impl Drop for DispatchLease<'_> {
    fn drop(&mut self) {
        let mut active = match self.leases.active.lock() {
            Ok(active) => active,
            Err(poisoned) => poisoned.into_inner(),
        };
        active.remove(&self.opening);
    }
}
