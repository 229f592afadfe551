//! Raw record store and dataset loading.

pub mod loader;
pub mod records;

pub use loader::{DatasetLoader, SourceSettings};
pub use records::RecordBatch;

use crate::models::{EnrolmentEvent, EventKind, UpdateEvent};

/// In-memory raw transaction collections, one per event kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    pub enrolment: Vec<EnrolmentEvent>,
    pub demographic: Vec<UpdateEvent>,
    pub biometric: Vec<UpdateEvent>,
}

impl RecordStore {
    /// Append one decoded source unit to the matching collection.
    pub fn extend(&mut self, batch: RecordBatch) {
        match batch {
            RecordBatch::Enrolment(rows) => self.enrolment.extend(rows),
            RecordBatch::Demographic(rows) => self.demographic.extend(rows),
            RecordBatch::Biometric(rows) => self.biometric.extend(rows),
        }
    }

    pub fn len(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Enrolment => self.enrolment.len(),
            EventKind::Demographic => self.demographic.len(),
            EventKind::Biometric => self.biometric.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.enrolment.is_empty() && self.demographic.is_empty() && self.biometric.is_empty()
    }
}
