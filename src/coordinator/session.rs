//! Server-side memory of what an edit form was rendered from.
//!
//! Opening the edit form issues a random token bound to one department. The
//! form sends the token back on submit, and the coordinator uses the stored
//! snapshot to know which manager to release and whether the department has
//! changed in between. Entries are independent per token, so editors of
//! different departments (or the same one) never see each other's state.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::models::department::{Department, DepartmentId};
use crate::models::employee::EmployeeId;

/// What the department looked like when its edit form was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSnapshot {
    pub department_id: DepartmentId,
    pub previous_manager_id: Option<EmployeeId>,
    pub row_version: i32,
}

impl From<&Department> for EditSnapshot {
    fn from(department: &Department) -> Self {
        Self {
            department_id: department.department_id,
            previous_manager_id: department.manager_id,
            row_version: department.row_version,
        }
    }
}

struct Entry {
    snapshot: EditSnapshot,
    issued_at: Instant,
}

pub struct EditSessions {
    ttl: Duration,
    entries: Mutex<HashMap<(DepartmentId, Uuid), Entry>>,
}

impl EditSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<(DepartmentId, Uuid), Entry>> {
        // The map holds plain values, so a panic elsewhere cannot leave it torn.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn issue(&self, snapshot: EditSnapshot) -> Uuid {
        let token = Uuid::new_v4();
        let now = Instant::now();
        let mut entries = self.entries();
        entries.retain(|_, entry| now.duration_since(entry.issued_at) < self.ttl);
        entries.insert(
            (snapshot.department_id, token),
            Entry {
                snapshot,
                issued_at: now,
            },
        );
        token
    }

    /// Looks up a live session without consuming it.
    pub fn get(&self, department_id: DepartmentId, token: Uuid) -> Option<EditSnapshot> {
        let mut entries = self.entries();
        let key = (department_id, token);
        let expired = entries
            .get(&key)
            .map(|entry| entry.issued_at.elapsed() >= self.ttl)?;
        if expired {
            entries.remove(&key);
            return None;
        }
        entries.get(&key).map(|entry| entry.snapshot)
    }

    pub fn discard(&self, department_id: DepartmentId, token: Uuid) {
        self.entries().remove(&(department_id, token));
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
