//! In-memory live attendance session state.
//!
//! A [`SessionStore`] keys sessions by class id and guarantees at most one
//! open session per class. All mutation goes through the store, so a mark
//! and a restart for the same class serialize on that class's entry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attendance status recorded for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    /// The wire/database representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }
}

/// Aggregate counts over one session's records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub present: usize,
    pub absent: usize,
    pub total: usize,
}

/// One open attendance session for a class.
#[derive(Debug, Clone)]
pub struct LiveSession {
    pub class_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// studentId → status, last write per student wins.
    pub records: HashMap<Uuid, AttendanceStatus>,
}

impl LiveSession {
    /// Count present/absent entries in this session's records.
    #[must_use]
    pub fn summarize(&self) -> Summary {
        let present = self
            .records
            .values()
            .filter(|s| **s == AttendanceStatus::Present)
            .count();
        let total = self.records.len();
        Summary {
            present,
            absent: total - present,
            total,
        }
    }
}

/// A command required an open session but none exists for the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoActiveSession;

/// Keyed store of live attendance sessions: `class_id` → at most one open session.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, LiveSession>>,
}

impl SessionStore {
    /// Create a new empty session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Open a session for a class, returning its start time.
    ///
    /// Always overwrites: an already-open session for the same class is
    /// replaced with a fresh one and its in-flight records are discarded.
    /// Callers that need the records must `close` first.
    pub fn start(&self, class_id: Uuid) -> DateTime<Utc> {
        let started_at = Utc::now();
        self.sessions.insert(
            class_id,
            LiveSession {
                class_id,
                started_at,
                records: HashMap::new(),
            },
        );
        started_at
    }

    /// Upsert a student's status into the class's open session.
    ///
    /// # Errors
    ///
    /// Returns [`NoActiveSession`] if no session is open for the class.
    pub fn mark(
        &self,
        class_id: Uuid,
        student_id: Uuid,
        status: AttendanceStatus,
    ) -> Result<(), NoActiveSession> {
        self.sessions.get_mut(&class_id).map_or(
            Err(NoActiveSession),
            |mut session| {
                session.records.insert(student_id, status);
                Ok(())
            },
        )
    }

    /// Aggregate counts for the class's open session.
    ///
    /// Defined even when no session is open or it has no records: `{0,0,0}`.
    #[must_use]
    pub fn summarize(&self, class_id: Uuid) -> Summary {
        self.sessions
            .get(&class_id)
            .map(|session| session.summarize())
            .unwrap_or_default()
    }

    /// Look up one student's recorded status; `None` means "not recorded".
    #[must_use]
    pub fn status_of(&self, class_id: Uuid, student_id: Uuid) -> Option<AttendanceStatus> {
        self.sessions
            .get(&class_id)
            .and_then(|session| session.records.get(&student_id).copied())
    }

    /// Clone the class's open session, leaving it in the store.
    ///
    /// Used by the close path: the archive works from this snapshot and the
    /// session is only removed once the records are durably stored.
    #[must_use]
    pub fn snapshot(&self, class_id: Uuid) -> Option<LiveSession> {
        self.sessions
            .get(&class_id)
            .map(|session| session.value().clone())
    }

    /// Whether a session is currently open for the class.
    #[must_use]
    pub fn is_open(&self, class_id: Uuid) -> bool {
        self.sessions.contains_key(&class_id)
    }

    /// Close the class's session, removing and returning it for archiving.
    pub fn close(&self, class_id: Uuid) -> Option<LiveSession> {
        self.sessions.remove(&class_id).map(|(_, session)| session)
    }
}
