//! Candidate applications to job openings and bulk invite dispatch.
//!
//! Records move `applied -> link_sent -> completed`. The selector decides who receives an
//! invite on each call, the dispatcher sends and records per-candidate outcomes, and the
//! opening's `last_invite_at` cursor bounds what auto-selection treats as new.

pub mod clock;
pub mod dispatch;
pub mod domain;
pub mod lease;
pub mod repository;
pub mod router;
pub mod selection;
pub mod service;
pub mod settings;
pub mod templates;
pub mod transport;

#[cfg(test)]
mod tests;

pub use clock::{Clock, SystemClock};
pub use dispatch::{BulkDispatcher, Delivery, DeliveryOutcome, DispatchReport};
pub use domain::{
    ActiveStatus, ApplicationRecord, ApplicationStatus, ApplicationStatusView,
    ApplicationSubmission, AppliedOpeningView, CandidateOverview, CandidateProfile, CandidateRef,
    CompletionChange, DuplicateApplication, LegacyStatus, MailStatus, Opening, OpeningId, UserRef,
};
pub use lease::{DispatchLease, DispatchLeases, LeaseError};
pub use repository::{CandidateDirectory, OpeningRepository, RepositoryError};
pub use router::invite_router;
pub use selection::{CandidateScope, EligibilitySelector, ExclusionReason, IdleReason, Selection};
pub use service::{
    CandidateLookup, CompletionReceipt, DispatchSummary, InviteServiceError,
    OpeningInviteService, ValidationError, RECENT_APPLICATIONS,
};
pub use settings::InviteSettings;
pub use templates::{ExamWindow, InviteKind, InviteTemplate};
pub use transport::{
    ChannelKey, MailTransport, NotificationError, NotificationEvent, NotificationSink,
    OutboundMail, TransportError,
};
