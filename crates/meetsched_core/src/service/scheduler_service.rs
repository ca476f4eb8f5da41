//! Scheduler facade: the operation boundary consumed by front ends.
//!
//! # Responsibility
//! - Validate raw input and route writes through the integrity engine.
//! - Serve list/join reads and live views from the same store.
//!
//! # Invariants
//! - The entity store is the only owner of scheduler state; every read is a
//!   query, never a cached copy mutated alongside writes.
//! - No method panics on bad input; failures come back as `SchedulerError`.

use crate::config::StoreConfig;
use crate::error::SchedulerResult;
use crate::integrity::{self, CascadeReport, SubmitOutcome, SweepReport};
use crate::model::host::{Host, NewHost};
use crate::model::meeting::{Meeting, NewMeeting};
use crate::model::participant::{NewParticipant, Participant};
use crate::model::response::{Response, ResponseKind};
use crate::model::{HostId, MeetingId, ParticipantId, ResponseId};
use crate::schema::Table;
use crate::store::EntityStore;
use crate::views::{self, LiveView, MeetingOverview, ResponseEntry};
use chrono::NaiveDate;
use log::info;

/// Use-case facade over one entity store.
pub struct Scheduler {
    store: EntityStore,
}

impl Scheduler {
    /// Wraps an already opened store.
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    /// Opens the store described by `config`.
    pub fn open(config: &StoreConfig) -> SchedulerResult<Self> {
        Ok(Self::new(EntityStore::open(config)?))
    }

    pub fn open_in_memory() -> SchedulerResult<Self> {
        Ok(Self::new(EntityStore::open_in_memory()?))
    }

    /// Underlying store, for read-only inspection.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Adds a host. `email` is optional.
    pub fn add_host(&mut self, name: &str, email: Option<&str>) -> SchedulerResult<HostId> {
        let new = NewHost::new(name, email)?;
        let host_id = self.store.create::<Host>(&new)?;
        info!("event=host_add module=service status=ok host_id={host_id}");
        Ok(host_id)
    }

    /// Adds a participant. `email` is optional.
    pub fn add_participant(
        &mut self,
        name: &str,
        email: Option<&str>,
    ) -> SchedulerResult<ParticipantId> {
        let new = NewParticipant::new(name, email)?;
        let participant_id = self.store.create::<Participant>(&new)?;
        info!("event=participant_add module=service status=ok participant_id={participant_id}");
        Ok(participant_id)
    }

    /// Schedules a meeting for an existing host.
    pub fn schedule_meeting(
        &mut self,
        name: &str,
        host_id: HostId,
        location: &str,
        date: NaiveDate,
    ) -> SchedulerResult<MeetingId> {
        let new = NewMeeting::new(name, host_id, location, date)?;
        integrity::schedule_meeting(&mut self.store, &new)
    }

    /// Records or replaces a participant's answer to a meeting.
    pub fn submit_response(
        &mut self,
        meeting_id: MeetingId,
        participant_id: ParticipantId,
        response: ResponseKind,
    ) -> SchedulerResult<SubmitOutcome> {
        integrity::submit_response(&mut self.store, meeting_id, participant_id, response)
    }

    pub fn delete_host(&mut self, host_id: HostId) -> SchedulerResult<CascadeReport> {
        integrity::delete_host(&mut self.store, host_id)
    }

    pub fn delete_meeting(&mut self, meeting_id: MeetingId) -> SchedulerResult<CascadeReport> {
        integrity::delete_meeting(&mut self.store, meeting_id)
    }

    pub fn delete_participant(
        &mut self,
        participant_id: ParticipantId,
    ) -> SchedulerResult<CascadeReport> {
        integrity::delete_participant(&mut self.store, participant_id)
    }

    /// Repairs reference violations left by older data.
    pub fn sweep_orphans(&mut self) -> SchedulerResult<SweepReport> {
        integrity::sweep_orphans(&mut self.store)
    }

    pub fn get_host(&self, host_id: HostId) -> SchedulerResult<Option<Host>> {
        Ok(self.store.get(host_id)?)
    }

    pub fn get_meeting(&self, meeting_id: MeetingId) -> SchedulerResult<Option<Meeting>> {
        Ok(self.store.get(meeting_id)?)
    }

    pub fn get_participant(
        &self,
        participant_id: ParticipantId,
    ) -> SchedulerResult<Option<Participant>> {
        Ok(self.store.get(participant_id)?)
    }

    pub fn get_response(&self, response_id: ResponseId) -> SchedulerResult<Option<Response>> {
        Ok(self.store.get(response_id)?)
    }

    pub fn list_hosts(&self) -> SchedulerResult<Vec<Host>> {
        Ok(views::list_hosts(&self.store.reader())?)
    }

    pub fn list_meetings(&self) -> SchedulerResult<Vec<Meeting>> {
        Ok(views::list_meetings(&self.store.reader())?)
    }

    pub fn list_participants(&self) -> SchedulerResult<Vec<Participant>> {
        Ok(views::list_participants(&self.store.reader())?)
    }

    /// Responses to one meeting with participant names. Empty for unknown
    /// meetings.
    pub fn responses_for(&self, meeting_id: MeetingId) -> SchedulerResult<Vec<ResponseEntry>> {
        Ok(views::responses_for(&self.store.reader(), meeting_id)?)
    }

    pub fn meeting_overviews(&self) -> SchedulerResult<Vec<MeetingOverview>> {
        Ok(views::meeting_overviews(&self.store.reader())?)
    }

    pub fn watch_hosts(&mut self) -> SchedulerResult<LiveView<Vec<Host>>> {
        Ok(views::watch(
            &mut self.store,
            "hosts",
            &[Table::Hosts],
            views::list_hosts,
        )?)
    }

    pub fn watch_meetings(&mut self) -> SchedulerResult<LiveView<Vec<Meeting>>> {
        Ok(views::watch(
            &mut self.store,
            "meetings",
            &[Table::Meetings],
            views::list_meetings,
        )?)
    }

    pub fn watch_participants(&mut self) -> SchedulerResult<LiveView<Vec<Participant>>> {
        Ok(views::watch(
            &mut self.store,
            "participants",
            &[Table::Participants],
            views::list_participants,
        )?)
    }

    /// Live joined responses for one meeting.
    pub fn watch_responses_for(
        &mut self,
        meeting_id: MeetingId,
    ) -> SchedulerResult<LiveView<Vec<ResponseEntry>>> {
        Ok(views::watch(
            &mut self.store,
            "responses_for",
            &[Table::Meetings, Table::Participants, Table::Responses],
            move |reader| views::responses_for(reader, meeting_id),
        )?)
    }

    pub fn watch_meeting_overviews(&mut self) -> SchedulerResult<LiveView<Vec<MeetingOverview>>> {
        Ok(views::watch(
            &mut self.store,
            "meeting_overviews",
            &Table::ALL,
            views::meeting_overviews,
        )?)
    }
}
