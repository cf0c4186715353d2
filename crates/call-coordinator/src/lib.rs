//! Teleclinic call-session coordinator.
//!
//! The coordination core that lets a doctor and a patient, each connected
//! independently to a realtime event channel, agree on when a consultation
//! call exists, which meeting room both must join, and how its lifecycle
//! stays consistent across two independently failing clients.
//!
//! # Architecture
//!
//! One coordinator task runs per connected party:
//!
//! ```text
//! UI action ──> CallCoordinatorHandle ──> coordinator task
//!                                             │
//!                              SessionStore (authoritative write)
//!                                             │
//!                              RealtimeChannel (notify)
//!                                             │
//!                              remote coordinator ──> remote UI events
//! ```
//!
//! # Key design decisions
//!
//! - **Single handle, not flags**: the coordinator caches exactly one
//!   optional `{id, room_name, status}` value, so impossible combinations
//!   (a room name with no id) cannot be represented.
//! - **Proposal in, canonical out**: a locally generated room name is only
//!   a proposal; the store's create response supersedes it everywhere,
//!   including every channel emission.
//! - **Write-then-notify**: a channel event is emitted only after the
//!   authoritative store write succeeded.
//! - **Serialized transitions**: local operations, remote events, and the
//!   pending-expiry timer multiplex into one task, so an interrupt arriving
//!   mid-transition is applied only after the transition settles.
//! - **Convergent terminals**: `ended`/`rejected` are absorbing and
//!   same-status store writes are idempotent, so concurrent terminal writes
//!   from both parties need no conflict resolution.
//!
//! # Modules
//!
//! - [`coordinator`] - the per-party actor, its mailbox, and UI events
//! - [`session`] - session records and the status transition graph
//! - [`store`] - authoritative persistence contract (+ in-memory impl)
//! - [`channel`] - realtime event protocol (+ in-process impl)
//! - [`room`] - opaque meeting room provider contract
//! - [`config`] - environment configuration
//! - [`errors`] - error taxonomy with client-safe messages
//! - [`metrics`] - lock-free call lifecycle counters

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod metrics;
pub mod room;
pub mod session;
pub mod store;

pub use channel::{CallEvent, CallStarted, LocalChannel, RealtimeChannel};
pub use config::Config;
pub use coordinator::{CallCoordinatorHandle, CoordinatorState, UiEvent};
pub use errors::CoordinatorError;
pub use metrics::{CallMetrics, CallMetricsSnapshot};
pub use room::{MeetingRoomProvider, TracingRoomProvider};
pub use session::{CallSession, CallStatus, SessionHandle};
pub use store::{InMemorySessionStore, NewCallSession, SessionStore, StoreError};
