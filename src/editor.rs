// ============================================================================
// EDITOR BINDING - Local title/content buffers with debounced commits
// ============================================================================

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::debug;

use crate::note::Note;
use crate::storage::KeyValueSlot;
use crate::store::NoteStore;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct EditorBuffer {
    note_id: Option<String>,
    title: String,
    content: String,
    last_edit: Option<Instant>,
    debounce: Duration,
}

impl EditorBuffer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            note_id: None,
            title: String::new(),
            content: String::new(),
            last_edit: None,
            debounce,
        }
    }

    /// Reset the buffers to `note`. Pending edits are dropped, so flush first.
    pub fn load(&mut self, note: Option<&Note>) {
        self.note_id = note.map(|n| n.id.clone());
        self.title = note.map(|n| n.title.clone()).unwrap_or_default();
        self.content = note.map(|n| n.content.clone()).unwrap_or_default();
        self.last_edit = None;
    }

    pub fn note_id(&self) -> Option<&str> {
        self.note_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_title(&mut self, title: impl Into<String>, now: Instant) {
        self.title = title.into();
        self.last_edit = Some(now);
    }

    pub fn set_content(&mut self, content: impl Into<String>, now: Instant) {
        self.content = content.into();
        self.last_edit = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_edit.is_some()
    }

    /// Time left before a pending commit fires.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.last_edit
            .map(|at| self.debounce.saturating_sub(now.saturating_duration_since(at)))
    }

    /// Commit once input has paused for the debounce interval.
    pub fn flush_due<S: KeyValueSlot>(
        &mut self,
        now: Instant,
        store: &mut NoteStore<S>,
    ) -> Result<bool> {
        match self.last_edit {
            Some(at) if now.saturating_duration_since(at) >= self.debounce => self.flush(store),
            _ => Ok(false),
        }
    }

    /// Commit pending edits right away.
    pub fn flush<S: KeyValueSlot>(&mut self, store: &mut NoteStore<S>) -> Result<bool> {
        if self.last_edit.take().is_none() {
            return Ok(false);
        }
        let Some(mut note) = self.stored_note(store) else {
            return Ok(false);
        };
        if note.title == self.title && note.content == self.content {
            return Ok(false);
        }
        note.title = self.title.clone();
        note.content = self.content.clone();
        note.touch();
        debug!(note_id = %note.id, "Committing editor buffers");
        store.update(note)
    }

    /// Drop a tag and commit the current buffers with it, without waiting
    /// for the debounce.
    pub fn remove_tag<S: KeyValueSlot>(
        &mut self,
        tag: &str,
        store: &mut NoteStore<S>,
    ) -> Result<bool> {
        let Some(mut note) = self.stored_note(store) else {
            return Ok(false);
        };
        if !note.remove_tag(tag) {
            return Ok(false);
        }
        self.commit_with(note, store)
    }

    /// Union `tags` into the note and commit the current buffers with them.
    pub fn merge_tags<S: KeyValueSlot>(
        &mut self,
        tags: &[String],
        store: &mut NoteStore<S>,
    ) -> Result<bool> {
        let Some(mut note) = self.stored_note(store) else {
            return Ok(false);
        };
        note.merge_tags(tags.iter().cloned());
        self.commit_with(note, store)
    }

    fn commit_with<S: KeyValueSlot>(
        &mut self,
        mut note: Note,
        store: &mut NoteStore<S>,
    ) -> Result<bool> {
        note.title = self.title.clone();
        note.content = self.content.clone();
        note.touch();
        self.last_edit = None;
        store.update(note)
    }

    fn stored_note<S: KeyValueSlot>(&self, store: &NoteStore<S>) -> Option<Note> {
        self.note_id.as_deref().and_then(|id| store.get(id)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySlot;
    use crate::store::STORAGE_KEY;

    fn setup() -> (NoteStore<MemorySlot>, EditorBuffer) {
        let mut store = NoteStore::load(MemorySlot::with_value(STORAGE_KEY, "[]"));
        store.create().unwrap();
        let mut editor = EditorBuffer::new(DEFAULT_DEBOUNCE);
        editor.load(store.active());
        (store, editor)
    }

    #[test]
    fn load_copies_the_note_into_buffers() {
        let (store, editor) = setup();
        assert_eq!(editor.note_id(), store.active_id());
        assert!(editor.title().is_empty());
        assert!(!editor.is_pending());
    }

    #[test]
    fn nothing_commits_inside_the_window() {
        let (mut store, mut editor) = setup();
        let start = Instant::now();
        editor.set_title("Draft", start);
        let writes = store.slot().writes;

        assert!(!editor.flush_due(start + Duration::from_millis(499), &mut store).unwrap());
        assert_eq!(store.slot().writes, writes);
        assert!(store.active().unwrap().title.is_empty());
    }

    #[test]
    fn rapid_edits_produce_one_commit_with_final_values() {
        let (mut store, mut editor) = setup();
        let start = Instant::now();
        let writes = store.slot().writes;

        for (i, text) in ["H", "He", "Hel", "Hell", "Hello"].iter().enumerate() {
            let at = start + Duration::from_millis(100 * i as u64);
            editor.set_content(*text, at);
            editor.flush_due(at, &mut store).unwrap();
        }
        editor.set_title("Greeting", start + Duration::from_millis(450));

        let late = start + Duration::from_millis(450) + DEFAULT_DEBOUNCE;
        assert!(editor.flush_due(late, &mut store).unwrap());
        assert!(!editor.flush_due(late + DEFAULT_DEBOUNCE, &mut store).unwrap());

        assert_eq!(store.slot().writes, writes + 1);
        let note = store.active().unwrap();
        assert_eq!(note.content, "Hello");
        assert_eq!(note.title, "Greeting");
        assert!(note.updated_at >= note.created_at);
    }

    #[test]
    fn unchanged_buffers_do_not_commit() {
        let (mut store, mut editor) = setup();
        let start = Instant::now();
        editor.set_content("x", start);
        editor.set_content("", start);
        let writes = store.slot().writes;
        assert!(!editor.flush_due(start + DEFAULT_DEBOUNCE, &mut store).unwrap());
        assert_eq!(store.slot().writes, writes);
        assert!(!editor.is_pending());
    }

    #[test]
    fn flush_commits_immediately() {
        let (mut store, mut editor) = setup();
        editor.set_content("before switching", Instant::now());
        assert!(editor.flush(&mut store).unwrap());
        assert_eq!(store.active().unwrap().content, "before switching");
    }

    #[test]
    fn remove_tag_is_not_debounced() {
        let (mut store, mut editor) = setup();
        let id = store.active_id().unwrap().to_string();
        editor.merge_tags(&["keep".into(), "drop".into()], &mut store).unwrap();
        editor.set_title("Unsaved title", Instant::now());

        assert!(editor.remove_tag("drop", &mut store).unwrap());
        let note = store.get(&id).unwrap();
        assert_eq!(note.tags, vec!["keep"]);
        assert_eq!(note.title, "Unsaved title");
        assert!(!editor.is_pending());
    }

    #[test]
    fn tag_commits_keep_set_semantics() {
        let (mut store, mut editor) = setup();
        let id = store.active_id().unwrap().to_string();
        editor.merge_tags(&["a".into(), "b".into()], &mut store).unwrap();
        editor.merge_tags(&["b".into(), "c".into()], &mut store).unwrap();
        assert_eq!(store.get(&id).unwrap().tags, vec!["a", "b", "c"]);

        assert!(editor.remove_tag("b", &mut store).unwrap());
        assert!(!editor.remove_tag("zzz", &mut store).unwrap());
        let note = store.get(&id).unwrap();
        assert_eq!(note.tags, vec!["a", "c"]);
        assert!(note.updated_at >= note.created_at);
    }

    #[test]
    fn time_until_due_counts_down() {
        let (_, mut editor) = setup();
        let start = Instant::now();
        assert!(editor.time_until_due(start).is_none());
        editor.set_title("t", start);
        assert_eq!(
            editor.time_until_due(start + Duration::from_millis(200)),
            Some(Duration::from_millis(300))
        );
        assert_eq!(
            editor.time_until_due(start + Duration::from_secs(2)),
            Some(Duration::ZERO)
        );
    }
}
