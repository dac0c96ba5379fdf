use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::openings::applications::clock::Clock;
use crate::workflows::openings::applications::domain::{
    ApplicationRecord, ApplicationStatus, ApplicationSubmission, CandidateProfile, CandidateRef,
    MailStatus, Opening, OpeningId, UserRef,
};
use crate::workflows::openings::applications::repository::{
    CandidateDirectory, OpeningRepository, RepositoryError,
};
use crate::workflows::openings::applications::transport::{
    ChannelKey, MailTransport, NotificationError, NotificationEvent, NotificationSink,
    OutboundMail, TransportError,
};
use crate::workflows::openings::applications::{
    invite_router, InviteSettings, OpeningInviteService,
};

pub(super) type TestService =
    OpeningInviteService<MemoryOpenings, MemoryDirectory, ScriptedMailer, MemoryNotifications>;

pub(super) fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 4, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn opening_id() -> OpeningId {
    OpeningId("op-42".to_string())
}

pub(super) fn cand(id: &str) -> CandidateRef {
    CandidateRef(id.to_string())
}

pub(super) fn opening() -> Opening {
    Opening::new(
        opening_id(),
        "Backend Engineer",
        "Acme Labs",
        UserRef("hr-7".to_string()),
    )
}

pub(super) fn profile(id: &str) -> CandidateProfile {
    CandidateProfile {
        id: cand(id),
        name: format!("Candidate {id}"),
        email: format!("{id}@example.com"),
    }
}

pub(super) fn submission(id: &str) -> ApplicationSubmission {
    let profile = profile(id);
    ApplicationSubmission {
        candidate: profile.id,
        name: profile.name,
        email: profile.email,
        phone: Some("555-0100".to_string()),
        resume: Some(format!("resumes/{id}.pdf")),
        reallocate: false,
    }
}

/// Record for `id` applied at `hour` with the given lifecycle state.
pub(super) fn record(id: &str, hour: u32, status: ApplicationStatus) -> ApplicationRecord {
    let mut record = ApplicationRecord::new(&submission(id), at(hour));
    record.status = status;
    record
}

pub(super) fn invited(id: &str, hour: u32) -> ApplicationRecord {
    let mut record = record(id, hour, ApplicationStatus::LINK_SENT);
    record.mail_status = MailStatus::Sent;
    record.mail_sent_at = Some(at(hour) + Duration::minutes(5));
    record.invited_at = record.mail_sent_at;
    record
}

pub(super) fn completed(id: &str, hour: u32) -> ApplicationRecord {
    let mut record = record(id, hour, ApplicationStatus::COMPLETED);
    record.test_completed_at = Some(at(hour) + Duration::minutes(30));
    record
}

pub(super) fn opening_with(records: Vec<ApplicationRecord>) -> Opening {
    let mut opening = opening();
    opening.applications = records;
    opening
}

pub(super) struct Fixture {
    pub(super) service: TestService,
    pub(super) openings: Arc<MemoryOpenings>,
    pub(super) mailer: Arc<ScriptedMailer>,
    pub(super) notifications: Arc<MemoryNotifications>,
}

/// Service over in-memory doubles seeded with `opening`; every record's candidate is
/// registered in the directory. The clock reads `now_hour`.
pub(super) fn build_service(opening: Opening, now_hour: u32) -> Fixture {
    let directory = MemoryDirectory::default();
    for record in &opening.applications {
        directory.register(CandidateProfile {
            id: record.candidate.clone(),
            name: record.name.clone(),
            email: record.email.clone(),
        });
    }
    build_service_with(opening, directory, ScriptedMailer::default(), now_hour)
}

pub(super) fn build_service_with(
    opening: Opening,
    directory: MemoryDirectory,
    mailer: ScriptedMailer,
    now_hour: u32,
) -> Fixture {
    let openings = Arc::new(MemoryOpenings::default());
    openings.insert(opening).expect("seed opening");
    let mailer = Arc::new(mailer);
    let notifications = Arc::new(MemoryNotifications::default());
    let service = OpeningInviteService::with_clock(
        openings.clone(),
        Arc::new(directory),
        mailer.clone(),
        notifications.clone(),
        InviteSettings::default(),
        Arc::new(FixedClock(at(now_hour))),
    );

    Fixture {
        service,
        openings,
        mailer,
        notifications,
    }
}

pub(super) fn stored(openings: &MemoryOpenings) -> Opening {
    openings
        .fetch(&opening_id())
        .expect("fetch succeeds")
        .expect("opening present")
}

pub(super) struct FixedClock(pub(super) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryOpenings {
    openings: Arc<Mutex<HashMap<OpeningId, Opening>>>,
}

impl OpeningRepository for MemoryOpenings {
    fn insert(&self, opening: Opening) -> Result<Opening, RepositoryError> {
        let mut guard = self.openings.lock().expect("repository mutex poisoned");
        if guard.contains_key(&opening.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(opening.id.clone(), opening.clone());
        Ok(opening)
    }

    fn fetch(&self, id: &OpeningId) -> Result<Option<Opening>, RepositoryError> {
        let guard = self.openings.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn add_application(
        &self,
        id: &OpeningId,
        record: ApplicationRecord,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.openings.lock().expect("repository mutex poisoned");
        let opening = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        opening.admit(record).map_err(|_| RepositoryError::Conflict)
    }

    fn modify_application(
        &self,
        id: &OpeningId,
        candidate: &CandidateRef,
        change: &mut dyn FnMut(&mut ApplicationRecord),
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.openings.lock().expect("repository mutex poisoned");
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
        let mut guard = self.openings.lock().expect("repository mutex poisoned");
        let opening = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        opening.advance_invite_cursor(at);
        Ok(())
    }

    fn openings_for_candidate(
        &self,
        candidate: &CandidateRef,
    ) -> Result<Vec<Opening>, RepositoryError> {
        let guard = self.openings.lock().expect("repository mutex poisoned");
        let mut openings: Vec<Opening> = guard
            .values()
            .filter(|opening| opening.application(candidate).is_some())
            .cloned()
            .collect();
        openings.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(openings)
    }
}

/// Store that persists nothing after a fixed number of record writes.
pub(super) struct FlakyOpenings {
    pub(super) inner: MemoryOpenings,
    pub(super) writes_before_failure: Mutex<usize>,
}

impl FlakyOpenings {
    pub(super) fn new(opening: Opening, writes_before_failure: usize) -> Self {
        let inner = MemoryOpenings::default();
        inner.insert(opening).expect("seed opening");
        Self {
            inner,
            writes_before_failure: Mutex::new(writes_before_failure),
        }
    }
}

impl OpeningRepository for FlakyOpenings {
    fn insert(&self, opening: Opening) -> Result<Opening, RepositoryError> {
        self.inner.insert(opening)
    }

    fn fetch(&self, id: &OpeningId) -> Result<Option<Opening>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn add_application(
        &self,
        id: &OpeningId,
        record: ApplicationRecord,
    ) -> Result<(), RepositoryError> {
        self.inner.add_application(id, record)
    }

    fn modify_application(
        &self,
        id: &OpeningId,
        candidate: &CandidateRef,
        change: &mut dyn FnMut(&mut ApplicationRecord),
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut remaining = self.writes_before_failure.lock().expect("counter poisoned");
        if *remaining == 0 {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }
        *remaining -= 1;
        self.inner.modify_application(id, candidate, change)
    }

    fn advance_invite_cursor(
        &self,
        id: &OpeningId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.inner.advance_invite_cursor(id, at)
    }

    fn openings_for_candidate(
        &self,
        candidate: &CandidateRef,
    ) -> Result<Vec<Opening>, RepositoryError> {
        self.inner.openings_for_candidate(candidate)
    }
}

pub(super) struct UnavailableRepository;

impl OpeningRepository for UnavailableRepository {
    fn insert(&self, _opening: Opening) -> Result<Opening, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &OpeningId) -> Result<Option<Opening>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn add_application(
        &self,
        _id: &OpeningId,
        _record: ApplicationRecord,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn modify_application(
        &self,
        _id: &OpeningId,
        _candidate: &CandidateRef,
        _change: &mut dyn FnMut(&mut ApplicationRecord),
    ) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn advance_invite_cursor(
        &self,
        _id: &OpeningId,
        _at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn openings_for_candidate(
        &self,
        _candidate: &CandidateRef,
    ) -> Result<Vec<Opening>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    profiles: Arc<Mutex<HashMap<CandidateRef, CandidateProfile>>>,
}

impl MemoryDirectory {
    pub(super) fn register(&self, profile: CandidateProfile) {
        self.profiles
            .lock()
            .expect("directory mutex poisoned")
            .insert(profile.id.clone(), profile);
    }
}

impl CandidateDirectory for MemoryDirectory {
    fn find(&self, id: &CandidateRef) -> Result<Option<CandidateProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_many(&self, ids: &[CandidateRef]) -> Result<Vec<CandidateProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("directory mutex poisoned");
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }
}

/// Mailer that records every attempt and rejects the configured addresses.
#[derive(Default, Clone)]
pub(super) struct ScriptedMailer {
    rejected: Arc<Mutex<HashSet<String>>>,
    attempts: Arc<Mutex<Vec<OutboundMail>>>,
}

impl ScriptedMailer {
    pub(super) fn rejecting(addresses: &[&str]) -> Self {
        let mailer = Self::default();
        mailer
            .rejected
            .lock()
            .expect("mailer mutex poisoned")
            .extend(addresses.iter().map(|address| address.to_string()));
        mailer
    }

    pub(super) fn attempts(&self) -> Vec<OutboundMail> {
        self.attempts.lock().expect("mailer mutex poisoned").clone()
    }

    pub(super) fn recipients(&self) -> Vec<String> {
        self.attempts().into_iter().map(|mail| mail.to).collect()
    }
}

impl MailTransport for ScriptedMailer {
    fn send(&self, mail: &OutboundMail) -> Result<(), TransportError> {
        self.attempts
            .lock()
            .expect("mailer mutex poisoned")
            .push(mail.clone());
        if self
            .rejected
            .lock()
            .expect("mailer mutex poisoned")
            .contains(&mail.to)
        {
            return Err(TransportError::Rejected(format!("{} bounced", mail.to)));
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<(ChannelKey, NotificationEvent)>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<(ChannelKey, NotificationEvent)> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }

    pub(super) fn messages_for(&self, channel: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(key, _)| key.0 == channel)
            .map(|(_, event)| event.message)
            .collect()
    }
}

impl NotificationSink for MemoryNotifications {
    fn notify(
        &self,
        channel: &ChannelKey,
        event: NotificationEvent,
    ) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push((channel.clone(), event));
        Ok(())
    }
}

pub(super) struct OfflineNotifications;

impl NotificationSink for OfflineNotifications {
    fn notify(
        &self,
        _channel: &ChannelKey,
        _event: NotificationEvent,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::Unavailable("socket hub down".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    invite_router(Arc::new(service))
}

/// Clock that moves forward one hour after every reading.
pub(super) struct SteppingClock(Mutex<DateTime<Utc>>);

impl SteppingClock {
    pub(super) fn starting_at(hour: u32) -> Self {
        Self(Mutex::new(at(hour)))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.0.lock().expect("clock mutex poisoned");
        let reading = *current;
        *current = reading + Duration::hours(1);
        reading
    }
}

/// Store that commits one more application, stamped by `clock`, right after the first fetch.
pub(super) struct LateApplicantOpenings {
    pub(super) inner: MemoryOpenings,
    clock: Arc<SteppingClock>,
    late: Mutex<Option<String>>,
}

impl LateApplicantOpenings {
    pub(super) fn new(opening: Opening, late_candidate: &str, clock: Arc<SteppingClock>) -> Self {
        let inner = MemoryOpenings::default();
        inner.insert(opening).expect("seed opening");
        Self {
            inner,
            clock,
            late: Mutex::new(Some(late_candidate.to_string())),
        }
    }
}

impl OpeningRepository for LateApplicantOpenings {
    fn insert(&self, opening: Opening) -> Result<Opening, RepositoryError> {
        self.inner.insert(opening)
    }

    fn fetch(&self, id: &OpeningId) -> Result<Option<Opening>, RepositoryError> {
        let snapshot = self.inner.fetch(id)?;
        let late = self.late.lock().expect("late mutex poisoned").take();
        if let Some(candidate) = late {
            let mut late_record = record(&candidate, 0, ApplicationStatus::APPLIED);
            late_record.applied_at = self.clock.now();
            self.inner.add_application(id, late_record)?;
        }
        Ok(snapshot)
    }

    fn add_application(
        &self,
        id: &OpeningId,
        record: ApplicationRecord,
    ) -> Result<(), RepositoryError> {
        self.inner.add_application(id, record)
    }

    fn modify_application(
        &self,
        id: &OpeningId,
        candidate: &CandidateRef,
        change: &mut dyn FnMut(&mut ApplicationRecord),
    ) -> Result<ApplicationRecord, RepositoryError> {
        self.inner.modify_application(id, candidate, change)
    }

    fn advance_invite_cursor(
        &self,
        id: &OpeningId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.inner.advance_invite_cursor(id, at)
    }

    fn openings_for_candidate(
        &self,
        candidate: &CandidateRef,
    ) -> Result<Vec<Opening>, RepositoryError> {
        self.inner.openings_for_candidate(candidate)
    }
}

type SendHook = Box<dyn FnOnce(&OutboundMail) + Send>;

/// Mailer that accepts everything and runs a one-shot hook inside the first send.
#[derive(Default, Clone)]
pub(super) struct HookedMailer {
    hook: Arc<Mutex<Option<SendHook>>>,
    attempts: Arc<Mutex<Vec<OutboundMail>>>,
}

impl HookedMailer {
    pub(super) fn on_first_send(&self, hook: impl FnOnce(&OutboundMail) + Send + 'static) {
        *self.hook.lock().expect("mailer mutex poisoned") = Some(Box::new(hook));
    }

    pub(super) fn recipients(&self) -> Vec<String> {
        self.attempts
            .lock()
            .expect("mailer mutex poisoned")
            .iter()
            .map(|mail| mail.to.clone())
            .collect()
    }
}

impl MailTransport for HookedMailer {
    fn send(&self, mail: &OutboundMail) -> Result<(), TransportError> {
        self.attempts
            .lock()
            .expect("mailer mutex poisoned")
            .push(mail.clone());
        let hook = self.hook.lock().expect("mailer mutex poisoned").take();
        if let Some(hook) = hook {
            hook(mail);
        }
        Ok(())
    }
}

pub(super) type HookedService =
    OpeningInviteService<MemoryOpenings, MemoryDirectory, HookedMailer, MemoryNotifications>;

/// Service over `openings` whose mailer runs a hook during the first send.
pub(super) fn hooked_service(openings: &[Opening]) -> (Arc<HookedService>, HookedMailer) {
    let store = Arc::new(MemoryOpenings::default());
    let directory = MemoryDirectory::default();
    for opening in openings {
        for record in &opening.applications {
            directory.register(profile(&record.candidate.0));
        }
        store.insert(opening.clone()).expect("seed opening");
    }
    let mailer = HookedMailer::default();
    let service = OpeningInviteService::with_clock(
        store,
        Arc::new(directory),
        Arc::new(mailer.clone()),
        Arc::new(MemoryNotifications::default()),
        InviteSettings::default(),
        Arc::new(FixedClock(at(10))),
    );
    (Arc::new(service), mailer)
}
