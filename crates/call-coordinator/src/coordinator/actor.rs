//! Call coordinator actor - per-party state machine owner.
//!
//! One coordinator task runs per connected party (doctor-side,
//! patient-side). The task owns the single optional session handle and
//! serializes every transition: local operations arrive through the
//! mailbox, remote events through the channel subscription, and the
//! pending-expiry deadline through a timer, all multiplexed in one
//! `select!` loop. A remote event arriving while a local operation is in
//! flight is therefore applied only after that operation settles.
//!
//! Ordering rules enforced here:
//!
//! - Write-then-notify: a channel event is emitted only after the
//!   authoritative store write succeeded.
//! - Proposal in, canonical out: every emitted `call.started` is built
//!   from the store's create response, never from the pre-create proposal.

use super::messages::{CoordinatorMessage, CoordinatorState, UiEvent};
use crate::channel::{CallEvent, CallStarted, EventSubscription, RealtimeChannel};
use crate::config::Config;
use crate::errors::CoordinatorError;
use crate::metrics::CallMetrics;
use crate::room::MeetingRoomProvider;
use crate::session::{CallStatus, SessionHandle};
use crate::store::{NewCallSession, SessionStore, StoreError};
use common::types::{AppointmentId, DoctorId, PatientId, RoomName};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Retry interval when the expiry path cannot settle the record at the
/// deadline (store unavailable or event unannounced).
const EXPIRY_RETRY: Duration = Duration::from_secs(5);

/// Handle to a coordinator task.
///
/// Clonable facade over the mailbox; dropping all handles closes the
/// mailbox and stops the task, as does [`CallCoordinatorHandle::shutdown`].
#[derive(Clone)]
pub struct CallCoordinatorHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
    cancel_token: CancellationToken,
}

impl CallCoordinatorHandle {
    /// Spawn a coordinator task and return its handle plus the UI event
    /// stream.
    ///
    /// The channel subscription is acquired before the task starts, so no
    /// event published after `spawn` returns can be missed. The
    /// subscription is owned by the task and dropped when it exits; that
    /// drop is the deregistration point.
    #[must_use]
    pub fn spawn(
        config: Config,
        store: Arc<dyn SessionStore>,
        channel: Arc<dyn RealtimeChannel>,
        room: Arc<dyn MeetingRoomProvider>,
        metrics: Arc<CallMetrics>,
    ) -> (Self, mpsc::Receiver<UiEvent>) {
        let (sender, mailbox) = mpsc::channel(config.mailbox_buffer);
        let (ui_tx, ui_rx) = mpsc::channel(config.ui_event_buffer);
        let cancel_token = CancellationToken::new();

        let events = channel.subscribe();
        let actor = CallCoordinatorActor {
            config,
            store,
            channel,
            room,
            ui_tx,
            metrics,
            session: None,
            ui_visible: false,
            pending_deadline: None,
        };
        tokio::spawn(actor.run(mailbox, events, cancel_token.clone()));

        (
            Self {
                sender,
                cancel_token,
            },
            ui_rx,
        )
    }

    /// Initiate a consultation call for an appointment.
    ///
    /// Suspends on the store create call; on success the returned handle
    /// carries the canonical id and room name echoed by the store.
    pub async fn start(
        &self,
        appointment_id: AppointmentId,
        patient_id: PatientId,
        doctor_id: DoctorId,
        reason: String,
    ) -> Result<SessionHandle, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Start {
                appointment_id,
                patient_id,
                doctor_id,
                reason,
                respond_to: tx,
            })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("mailbox send failed: {e}")))?;

        rx.await
            .map_err(|e| CoordinatorError::Internal(format!("response receive failed: {e}")))?
    }

    /// Accept the pending incoming call.
    pub async fn accept(&self) -> Result<SessionHandle, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Accept { respond_to: tx })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("mailbox send failed: {e}")))?;

        rx.await
            .map_err(|e| CoordinatorError::Internal(format!("response receive failed: {e}")))?
    }

    /// Decline the pending incoming call.
    pub async fn reject(&self) -> Result<(), CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Reject { respond_to: tx })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("mailbox send failed: {e}")))?;

        rx.await
            .map_err(|e| CoordinatorError::Internal(format!("response receive failed: {e}")))?
    }

    /// End the current call. Idempotent: ending with no call is a no-op.
    pub async fn end(&self) -> Result<(), CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::End { respond_to: tx })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("mailbox send failed: {e}")))?;

        rx.await
            .map_err(|e| CoordinatorError::Internal(format!("response receive failed: {e}")))?
    }

    /// Hide the local call UI. The session handle is retained and the
    /// remote party sees no status change.
    pub async fn close(&self) -> Result<(), CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Close { respond_to: tx })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("mailbox send failed: {e}")))?;

        rx.await
            .map_err(|e| CoordinatorError::Internal(format!("response receive failed: {e}")))
    }

    /// Restore the call UI from the cached handle, without any store or
    /// channel calls. Returns `None` when there is no active call.
    pub async fn rejoin(&self) -> Result<Option<SessionHandle>, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Rejoin { respond_to: tx })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("mailbox send failed: {e}")))?;

        rx.await
            .map_err(|e| CoordinatorError::Internal(format!("response receive failed: {e}")))
    }

    /// Get the coordinator's current local state.
    pub async fn state(&self) -> Result<CoordinatorState, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::GetState { respond_to: tx })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("mailbox send failed: {e}")))?;

        rx.await
            .map_err(|e| CoordinatorError::Internal(format!("response receive failed: {e}")))
    }

    /// Stop the coordinator task and release its channel subscription.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

/// Client-local call cache: the session handle plus the room display URL
/// that accompanies it.
#[derive(Debug, Clone)]
struct LocalCall {
    handle: SessionHandle,
    meeting_url: String,
}

/// The coordinator task state. Only [`CallCoordinatorActor::run`] touches it.
struct CallCoordinatorActor {
    config: Config,
    store: Arc<dyn SessionStore>,
    channel: Arc<dyn RealtimeChannel>,
    room: Arc<dyn MeetingRoomProvider>,
    ui_tx: mpsc::Sender<UiEvent>,
    metrics: Arc<CallMetrics>,
    /// The one call this party is involved in, or `None`.
    session: Option<LocalCall>,
    /// UI visibility, orthogonal to the session lifecycle (`close()`).
    ui_visible: bool,
    /// Initiator-armed expiry for an unanswered pending call.
    pending_deadline: Option<Instant>,
}

impl CallCoordinatorActor {
    async fn run(
        mut self,
        mut mailbox: mpsc::Receiver<CoordinatorMessage>,
        mut events: EventSubscription,
        cancel_token: CancellationToken,
    ) {
        let mut events_open = true;
        loop {
            let deadline = self.pending_deadline;
            tokio::select! {
                () = cancel_token.cancelled() => {
                    debug!("coordinator cancelled");
                    break;
                }
                message = mailbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            debug!("coordinator mailbox closed");
                            break;
                        }
                    }
                }
                event = events.next(), if events_open => {
                    match event {
                        Some(event) => self.handle_remote_event(event).await,
                        None => {
                            warn!("event subscription closed, remote events unavailable");
                            events_open = false;
                        }
                    }
                }
                () = sleep_until_deadline(deadline), if deadline.is_some() => {
                    self.handle_pending_expiry().await;
                }
            }
        }
    }

    async fn handle_message(&mut self, message: CoordinatorMessage) {
        match message {
            CoordinatorMessage::Start {
                appointment_id,
                patient_id,
                doctor_id,
                reason,
                respond_to,
            } => {
                let result = self
                    .handle_start(appointment_id, patient_id, doctor_id, reason)
                    .await;
                if let Err(err) = &result {
                    self.notify_failure(err).await;
                }
                let _ = respond_to.send(result);
            }
            CoordinatorMessage::Accept { respond_to } => {
                let result = self.handle_accept().await;
                if let Err(err) = &result {
                    self.notify_failure(err).await;
                }
                let _ = respond_to.send(result);
            }
            CoordinatorMessage::Reject { respond_to } => {
                let result = self.handle_reject().await;
                if let Err(err) = &result {
                    self.notify_failure(err).await;
                }
                let _ = respond_to.send(result);
            }
            CoordinatorMessage::End { respond_to } => {
                let result = self.handle_end().await;
                if let Err(err) = &result {
                    self.notify_failure(err).await;
                }
                let _ = respond_to.send(result);
            }
            CoordinatorMessage::Close { respond_to } => {
                self.handle_close().await;
                let _ = respond_to.send(());
            }
            CoordinatorMessage::Rejoin { respond_to } => {
                let restored = self.handle_rejoin().await;
                let _ = respond_to.send(restored);
            }
            CoordinatorMessage::GetState { respond_to } => {
                let _ = respond_to.send(CoordinatorState {
                    handle: self.session.as_ref().map(|call| call.handle.clone()),
                    ui_visible: self.ui_visible,
                });
            }
        }
    }

    /// `start()`: Idle -> Initiating -> Pending.
    ///
    /// On any store or channel failure the local state is left untouched
    /// (fail closed); the caller sees the error and the UI remains in its
    /// pre-call state.
    async fn handle_start(
        &mut self,
        appointment_id: AppointmentId,
        patient_id: PatientId,
        doctor_id: DoctorId,
        reason: String,
    ) -> Result<SessionHandle, CoordinatorError> {
        if let Some(call) = &self.session {
            if !call.handle.is_terminal() {
                return Err(CoordinatorError::InvalidState(
                    "a call is already in progress".to_string(),
                ));
            }
        }

        let created = self
            .store
            .create(NewCallSession {
                appointment_id,
                patient_id,
                doctor_id,
                room_name_proposal: RoomName::proposal(),
                meeting_url_proposal: String::new(),
            })
            .await?;

        // The store response is canonical: the emitted event carries the
        // echoed room name, never the proposal.
        let event = CallEvent::Started(CallStarted {
            id: created.id,
            appointment_id: created.appointment_id.clone(),
            patient_id: created.patient_id.clone(),
            doctor_id: created.doctor_id.clone(),
            room_name: created.room_name.clone(),
            meeting_url: created.meeting_url.clone(),
            doctor_name: self.config.display_name.clone(),
            reason,
        });

        if let Err(err) = self.channel.publish(event).await {
            // The record exists but was never announced; end it so no
            // unreachable pending session lingers in the store.
            if let Err(cleanup) = self.store.set_status(created.id, CallStatus::Ended).await {
                warn!(
                    call_id = %created.id,
                    error = %cleanup,
                    "failed to end unannounced session"
                );
            }
            return Err(err.into());
        }

        let handle = SessionHandle::from_session(&created);
        self.session = Some(LocalCall {
            handle: handle.clone(),
            meeting_url: created.meeting_url,
        });
        self.ui_visible = true;
        self.pending_deadline = self
            .config
            .pending_timeout()
            .map(|timeout| Instant::now() + timeout);
        self.metrics.record_started();
        info!(call_id = %handle.id, room_name = %handle.room_name, "call started");

        self.emit_ui(UiEvent::OutgoingCall {
            id: handle.id,
            room_name: handle.room_name.clone(),
        })
        .await;

        Ok(handle)
    }

    /// `accept()`: Pending -> Active on the receiving side.
    ///
    /// A publish failure after the store write leaves the record `active`
    /// while the local handle stays `pending`. Retrying `accept()`
    /// converges: the same-status store write is an idempotent no-op and
    /// only the publish is repeated.
    async fn handle_accept(&mut self) -> Result<SessionHandle, CoordinatorError> {
        let (id, room_name, meeting_url) = match &self.session {
            Some(call) if call.handle.status == CallStatus::Pending => (
                call.handle.id,
                call.handle.room_name.clone(),
                call.meeting_url.clone(),
            ),
            _ => {
                return Err(CoordinatorError::InvalidState(
                    "no pending call to accept".to_string(),
                ))
            }
        };

        let updated = self.store.set_status(id, CallStatus::Active).await?;
        if updated.room_name != room_name {
            // room_name is write-once; a store violating that is a bug
            // worth surfacing loudly in the logs.
            warn!(
                call_id = %id,
                cached = %room_name,
                stored = %updated.room_name,
                "store changed a write-once room name"
            );
        }
        self.channel.publish(CallEvent::Accepted { id }).await?;

        if let Some(call) = self.session.as_mut() {
            call.handle.status = CallStatus::Active;
        }
        self.pending_deadline = None;
        self.ui_visible = true;
        self.metrics.record_accepted();
        info!(call_id = %id, room_name = %room_name, "call accepted");

        self.join_room(&room_name).await;
        self.emit_ui(UiEvent::MeetingJoined {
            id,
            room_name: room_name.clone(),
            meeting_url,
        })
        .await;

        Ok(SessionHandle {
            id,
            room_name,
            status: CallStatus::Active,
        })
    }

    /// `reject()`: Pending -> Rejected on the receiving side.
    async fn handle_reject(&mut self) -> Result<(), CoordinatorError> {
        let id = match &self.session {
            Some(call) if call.handle.status == CallStatus::Pending => call.handle.id,
            _ => {
                return Err(CoordinatorError::InvalidState(
                    "no pending call to reject".to_string(),
                ))
            }
        };

        self.store.set_status(id, CallStatus::Rejected).await?;
        self.channel.publish(CallEvent::Rejected { id }).await?;

        self.session = None;
        self.ui_visible = false;
        self.pending_deadline = None;
        self.metrics.record_rejected();
        info!(call_id = %id, "call rejected");

        self.emit_ui(UiEvent::CallRejected { id }).await;
        Ok(())
    }

    /// `end()`: terminating, authoritative, propagated, idempotent.
    async fn handle_end(&mut self) -> Result<(), CoordinatorError> {
        let Some(call) = &self.session else {
            debug!("end with no call, no-op");
            return Ok(());
        };
        let id = call.handle.id;
        let was_active = call.handle.status == CallStatus::Active;

        self.store.set_status(id, CallStatus::Ended).await?;
        self.channel.publish(CallEvent::Ended { id }).await?;

        self.session = None;
        self.ui_visible = false;
        self.pending_deadline = None;
        self.metrics.record_ended(was_active);
        info!(call_id = %id, "call ended");

        self.emit_ui(UiEvent::CallEnded { id }).await;
        Ok(())
    }

    /// `close()`: hide the UI only. Silent to the remote party.
    async fn handle_close(&mut self) {
        if self.ui_visible {
            self.ui_visible = false;
            self.emit_ui(UiEvent::MeetingHidden).await;
        }
        debug!("call UI closed, handle retained");
    }

    /// `rejoin()`: restore UI from the cached handle, trusting it without
    /// pre-validating staleness against the store. If the session died
    /// remotely while this client was away, the room provider reports it
    /// downstream.
    async fn handle_rejoin(&mut self) -> Option<SessionHandle> {
        match &self.session {
            Some(call) if !call.handle.is_terminal() => {
                let handle = call.handle.clone();
                let meeting_url = call.meeting_url.clone();
                self.ui_visible = true;
                info!(call_id = %handle.id, status = %handle.status, "rejoining cached call");

                if handle.status == CallStatus::Active {
                    self.join_room(&handle.room_name).await;
                }
                self.emit_ui(UiEvent::CallRestored {
                    id: handle.id,
                    room_name: handle.room_name.clone(),
                    meeting_url,
                    status: handle.status,
                })
                .await;
                Some(handle)
            }
            _ => {
                debug!("rejoin with no active call, no-op");
                None
            }
        }
    }

    /// Initiator-side expiry of an unanswered pending call. Runs the
    /// normal end path, write-then-notify included: the `call.ended`
    /// emission and the local clear both wait for the store write to
    /// succeed. The receiver converges via the `call.ended` event.
    ///
    /// A failed write or publish re-arms a short retry deadline instead of
    /// clearing the handle; clearing with the record still `pending` would
    /// strand it behind the one-open-session-per-appointment check with no
    /// party left to end it.
    async fn handle_pending_expiry(&mut self) {
        self.pending_deadline = None;
        let Some(call) = &self.session else {
            return;
        };
        if call.handle.status != CallStatus::Pending {
            return;
        }
        let id = call.handle.id;
        warn!(call_id = %id, "pending call expired without an answer");

        match self.store.set_status(id, CallStatus::Ended).await {
            Ok(_) => {
                if let Err(err) = self.channel.publish(CallEvent::Ended { id }).await {
                    // Terminal in the store but unannounced. Retry; the
                    // same-status write is an idempotent no-op then.
                    warn!(
                        call_id = %id,
                        error = %err,
                        "failed to announce expired session, retrying"
                    );
                    self.pending_deadline = Some(Instant::now() + EXPIRY_RETRY);
                    return;
                }
            }
            Err(StoreError::Unavailable(msg)) => {
                warn!(
                    call_id = %id,
                    error = %msg,
                    "failed to end expired session, retrying"
                );
                self.pending_deadline = Some(Instant::now() + EXPIRY_RETRY);
                return;
            }
            Err(err) => {
                // Lost a race with a concurrent terminal write; the winning
                // writer already announced it, so no publish here.
                debug!(call_id = %id, error = %err, "expired session already settled");
            }
        }

        self.session = None;
        self.ui_visible = false;
        self.metrics.record_timed_out();
        self.metrics.record_ended(false);

        self.emit_ui(UiEvent::CallTimedOut { id }).await;
    }

    /// Apply a remote event. Application is idempotent: events that do not
    /// advance the local machine (self-echoes, duplicates, stale ids) are
    /// ignored, which keeps both parties convergent regardless of delivery
    /// order.
    async fn handle_remote_event(&mut self, event: CallEvent) {
        match event {
            CallEvent::Started(started) => {
                if let Some(call) = &self.session {
                    if !call.handle.is_terminal() {
                        if call.handle.id != started.id {
                            warn!(
                                call_id = %call.handle.id,
                                incoming = %started.id,
                                "ignoring call.started while another call is open"
                            );
                        }
                        return;
                    }
                }

                info!(
                    call_id = %started.id,
                    room_name = %started.room_name,
                    "incoming call"
                );
                self.session = Some(LocalCall {
                    handle: SessionHandle {
                        id: started.id,
                        room_name: started.room_name.clone(),
                        status: CallStatus::Pending,
                    },
                    meeting_url: started.meeting_url.clone(),
                });
                self.ui_visible = true;
                self.emit_ui(UiEvent::IncomingCall {
                    id: started.id,
                    room_name: started.room_name,
                    doctor_name: started.doctor_name,
                    reason: started.reason,
                })
                .await;
            }
            CallEvent::Accepted { id } => {
                let applicable = matches!(
                    &self.session,
                    Some(call)
                        if call.handle.id == id && call.handle.status == CallStatus::Pending
                );
                if !applicable {
                    debug!(call_id = %id, "ignoring stale call.accepted");
                    return;
                }

                let room_name = match self.session.as_mut() {
                    Some(call) => {
                        call.handle.status = CallStatus::Active;
                        call.handle.room_name.clone()
                    }
                    None => return,
                };
                let meeting_url = self
                    .session
                    .as_ref()
                    .map(|call| call.meeting_url.clone())
                    .unwrap_or_default();
                self.pending_deadline = None;
                self.ui_visible = true;
                self.metrics.record_accepted();
                info!(call_id = %id, "remote party accepted");

                self.join_room(&room_name).await;
                self.emit_ui(UiEvent::MeetingJoined {
                    id,
                    room_name,
                    meeting_url,
                })
                .await;
            }
            CallEvent::Rejected { id } => {
                let applicable = matches!(
                    &self.session,
                    Some(call)
                        if call.handle.id == id && call.handle.status == CallStatus::Pending
                );
                if !applicable {
                    debug!(call_id = %id, "ignoring stale call.rejected");
                    return;
                }

                self.session = None;
                self.ui_visible = false;
                self.pending_deadline = None;
                self.metrics.record_rejected();
                info!(call_id = %id, "remote party rejected");

                self.emit_ui(UiEvent::CallRejected { id }).await;
            }
            CallEvent::Ended { id } => {
                let was_active = match &self.session {
                    Some(call) if call.handle.id == id && !call.handle.is_terminal() => {
                        call.handle.status == CallStatus::Active
                    }
                    _ => {
                        debug!(call_id = %id, "ignoring stale call.ended");
                        return;
                    }
                };

                // The remote party already made the authoritative store
                // write; only the local cache changes here.
                self.session = None;
                self.ui_visible = false;
                self.pending_deadline = None;
                self.metrics.record_ended(was_active);
                info!(call_id = %id, "remote party ended the call");

                self.emit_ui(UiEvent::CallEnded { id }).await;
            }
        }
    }

    /// Surface connectivity/persistence failures to the UI as client-safe
    /// notifications. Invalid-state and not-found conditions are the
    /// caller's to handle; they short-circuited before any side effect.
    async fn notify_failure(&self, err: &CoordinatorError) {
        warn!(error = %err, "call operation failed");
        if matches!(
            err,
            CoordinatorError::Connectivity(_) | CoordinatorError::Persistence(_)
        ) {
            self.emit_ui(UiEvent::CallError {
                message: err.user_message(),
            })
            .await;
        }
    }

    async fn join_room(&self, room_name: &RoomName) {
        if let Err(err) = self
            .room
            .join(room_name, &self.config.display_name)
            .await
        {
            // Opaque provider failures surface as a generic connectivity
            // problem; the call state itself is unaffected.
            warn!(room_name = %room_name, error = %err, "meeting room join failed");
            let message = CoordinatorError::Connectivity(err.to_string()).user_message();
            self.emit_ui(UiEvent::CallError { message }).await;
        }
    }

    async fn emit_ui(&self, event: UiEvent) {
        if self.ui_tx.send(event).await.is_err() {
            debug!("ui event receiver dropped");
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
