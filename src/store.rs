// ============================================================================
// NOTE STORE - Single owner of the note collection and the active note
// ============================================================================

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::note::Note;
use crate::storage::KeyValueSlot;

pub const STORAGE_KEY: &str = "cybernotes_app_data_v1";

/// Caller-supplied answer to "really delete this note?".
pub trait DeleteConfirmation {
    fn confirm(&mut self, note: &Note) -> bool;
}

impl<F> DeleteConfirmation for F
where
    F: FnMut(&Note) -> bool,
{
    fn confirm(&mut self, note: &Note) -> bool {
        self(note)
    }
}

pub struct NoteStore<S: KeyValueSlot> {
    notes: Vec<Note>,
    active_id: Option<String>,
    slot: S,
}

impl<S: KeyValueSlot> NoteStore<S> {
    /// Restore the collection from `slot`, seeding the welcome note when
    /// nothing readable is stored.
    pub fn load(slot: S) -> Self {
        // a failed read leaves the stored data alone; only bad JSON is replaced
        let mut read_failed = false;
        let saved = match slot.get(STORAGE_KEY) {
            Ok(saved) => saved,
            Err(e) => {
                warn!(error = %e, "Failed to read saved notes");
                read_failed = true;
                None
            }
        };

        let parsed = saved.and_then(|raw| match serde_json::from_str::<Vec<Note>>(&raw) {
            Ok(notes) => Some(notes),
            Err(e) => {
                warn!(error = %e, "Saved notes are unreadable, reseeding");
                None
            }
        });

        let mut store = Self {
            notes: Vec::new(),
            active_id: None,
            slot,
        };

        match parsed {
            Some(mut notes) => {
                for note in &mut notes {
                    note.updated_at = note.updated_at.max(note.created_at);
                }
                info!(count = notes.len(), "Loaded notes");
                store.notes = notes;
                store.active_id = store.notes.first().map(|n| n.id.clone());
            }
            None => {
                let welcome = Note::welcome();
                store.active_id = Some(welcome.id.clone());
                store.notes.push(welcome);
                info!("Seeded welcome note");
                if !read_failed {
                    if let Err(e) = store.persist() {
                        warn!(error = %e, "Failed to persist seeded notes");
                    }
                }
            }
        }

        store
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&Note> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    #[cfg(test)]
    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Make `id` the active note. Unknown ids are ignored.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_some() {
            self.active_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Insert an empty note at the front and make it active.
    pub fn create(&mut self) -> Result<String> {
        let note = Note::new();
        let id = note.id.clone();
        self.notes.insert(0, note);
        self.active_id = Some(id.clone());
        debug!(note_id = %id, "Created note");
        self.persist()?;
        Ok(id)
    }

    /// Replace the stored note with the same id. Returns `false` when the id
    /// is unknown.
    pub fn update(&mut self, mut note: Note) -> Result<bool> {
        let Some(slot) = self.notes.iter_mut().find(|n| n.id == note.id) else {
            return Ok(false);
        };
        // id and creation time are fixed for the life of a note
        note.created_at = slot.created_at;
        note.updated_at = note.updated_at.max(note.created_at);
        *slot = note;
        self.persist()?;
        Ok(true)
    }

    /// Remove a note once `confirm` agrees. When the active note goes away the
    /// first remaining note becomes active.
    pub fn delete(&mut self, id: &str, mut confirm: impl DeleteConfirmation) -> Result<bool> {
        let Some(pos) = self.notes.iter().position(|n| n.id == id) else {
            return Ok(false);
        };
        if !confirm.confirm(&self.notes[pos]) {
            return Ok(false);
        }

        self.notes.remove(pos);
        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.notes.first().map(|n| n.id.clone());
        }
        debug!(note_id = %id, "Deleted note");
        self.persist()?;
        Ok(true)
    }

    fn persist(&mut self) -> Result<()> {
        let serialized = serde_json::to_string(&self.notes)?;
        self.slot.set(STORAGE_KEY, &serialized)
    }
}
