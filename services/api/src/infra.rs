use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use talent_invites::workflows::openings::applications::{
    ApplicationRecord, CandidateDirectory, CandidateProfile, CandidateRef, ChannelKey,
    MailTransport, NotificationError, NotificationEvent, NotificationSink, Opening, OpeningId,
    OpeningInviteService, OpeningRepository, OutboundMail, RepositoryError, TransportError,
};
use tracing::{debug, info};

pub(crate) type InviteService = OpeningInviteService<
    InMemoryOpeningRepository,
    InMemoryCandidateDirectory,
    OutboxMailTransport,
    InMemoryNotificationHub,
>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Handles the admin routes need next to the invite service.
#[derive(Clone)]
pub(crate) struct Stores {
    pub(crate) openings: Arc<InMemoryOpeningRepository>,
    pub(crate) directory: Arc<InMemoryCandidateDirectory>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryOpeningRepository {
    openings: Arc<Mutex<BTreeMap<OpeningId, Opening>>>,
}

impl OpeningRepository for InMemoryOpeningRepository {
    fn insert(&self, opening: Opening) -> Result<Opening, RepositoryError> {
        let mut guard = lock(&self.openings)?;
        if guard.contains_key(&opening.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(opening.id.clone(), opening.clone());
        Ok(opening)
    }

    fn fetch(&self, id: &OpeningId) -> Result<Option<Opening>, RepositoryError> {
        let guard = lock(&self.openings)?;
        Ok(guard.get(id).cloned())
    }

    fn add_application(
        &self,
        id: &OpeningId,
        record: ApplicationRecord,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.openings)?;
        let opening = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        opening.admit(record).map_err(|_| RepositoryError::Conflict)
    }

    fn modify_application(
        &self,
        id: &OpeningId,
        candidate: &CandidateRef,
        change: &mut dyn FnMut(&mut ApplicationRecord),
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = lock(&self.openings)?;
        let record = guard
            .get_mut(id)
            .and_then(|opening| opening.application_mut(candidate))
            .ok_or(RepositoryError::NotFound)?;
        change(record);
        Ok(record.clone())
    }

    fn advance_invite_cursor(
        &self,
        id: &OpeningId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.openings)?;
        let opening = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        opening.advance_invite_cursor(at);
        Ok(())
    }

    fn openings_for_candidate(
        &self,
        candidate: &CandidateRef,
    ) -> Result<Vec<Opening>, RepositoryError> {
        let guard = lock(&self.openings)?;
        Ok(guard
            .values()
            .filter(|opening| opening.application(candidate).is_some())
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCandidateDirectory {
    profiles: Arc<Mutex<HashMap<CandidateRef, CandidateProfile>>>,
}

impl InMemoryCandidateDirectory {
    /// Insert or replace a profile.
    pub(crate) fn register(&self, profile: CandidateProfile) -> Result<(), RepositoryError> {
        lock(&self.profiles)?.insert(profile.id.clone(), profile);
        Ok(())
    }
}

impl CandidateDirectory for InMemoryCandidateDirectory {
    fn find(&self, id: &CandidateRef) -> Result<Option<CandidateProfile>, RepositoryError> {
        Ok(lock(&self.profiles)?.get(id).cloned())
    }

    fn find_many(&self, ids: &[CandidateRef]) -> Result<Vec<CandidateProfile>, RepositoryError> {
        let guard = lock(&self.profiles)?;
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }
}

/// Mail transport that keeps rendered invites in an outbox instead of relaying them.
///
/// Addresses under the reserved `.invalid` TLD are rejected so failure handling can be
/// exercised locally.
#[derive(Default, Clone)]
pub(crate) struct OutboxMailTransport {
    outbox: Arc<Mutex<Vec<OutboundMail>>>,
}

impl OutboxMailTransport {
    pub(crate) fn outbox(&self) -> Vec<OutboundMail> {
        self.outbox
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl MailTransport for OutboxMailTransport {
    fn send(&self, mail: &OutboundMail) -> Result<(), TransportError> {
        if mail.to.trim_end().ends_with(".invalid") {
            return Err(TransportError::Rejected(format!(
                "{} is not deliverable",
                mail.to
            )));
        }

        let mut guard = self
            .outbox
            .lock()
            .map_err(|_| TransportError::Unavailable("outbox poisoned".to_string()))?;
        guard.push(mail.clone());
        info!(to = %mail.to, subject = %mail.subject, "invite queued in outbox");
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationHub {
    events: Arc<Mutex<Vec<(ChannelKey, NotificationEvent)>>>,
}

impl InMemoryNotificationHub {
    pub(crate) fn events(&self) -> Vec<(ChannelKey, NotificationEvent)> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for InMemoryNotificationHub {
    fn notify(
        &self,
        channel: &ChannelKey,
        event: NotificationEvent,
    ) -> Result<(), NotificationError> {
        debug!(channel = %channel.0, message = %event.message, "live notification");
        let mut guard = self
            .events
            .lock()
            .map_err(|_| NotificationError::Unavailable("hub poisoned".to_string()))?;
        guard.push((channel.clone(), event));
        Ok(())
    }
}
