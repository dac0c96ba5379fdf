use chrono::{DateTime, Utc};

use super::domain::{ApplicationRecord, CandidateProfile, CandidateRef, Opening, OpeningId};

/// Document store holding openings with their embedded application records.
///
/// Every method is an atomic read-modify-write on a single opening document.
pub trait OpeningRepository: Send + Sync {
    fn insert(&self, opening: Opening) -> Result<Opening, RepositoryError>;
    fn fetch(&self, id: &OpeningId) -> Result<Option<Opening>, RepositoryError>;

    /// Append a record. Must fail with `Conflict` when the candidate already applied.
    fn add_application(
        &self,
        id: &OpeningId,
        record: ApplicationRecord,
    ) -> Result<(), RepositoryError>;

    /// Apply `change` to the stored record of `candidate` and return the updated copy.
    fn modify_application(
        &self,
        id: &OpeningId,
        candidate: &CandidateRef,
        change: &mut dyn FnMut(&mut ApplicationRecord),
    ) -> Result<ApplicationRecord, RepositoryError>;

    /// Move `last_invite_at` forward to `at`; never moves it backwards.
    fn advance_invite_cursor(
        &self,
        id: &OpeningId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    fn openings_for_candidate(
        &self,
        candidate: &CandidateRef,
    ) -> Result<Vec<Opening>, RepositoryError>;
}

/// Lookup of candidate accounts used to address invites.
pub trait CandidateDirectory: Send + Sync {
    fn find(&self, id: &CandidateRef) -> Result<Option<CandidateProfile>, RepositoryError>;

    /// Resolve the given ids; unknown ids are omitted from the result.
    fn find_many(&self, ids: &[CandidateRef]) -> Result<Vec<CandidateProfile>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
