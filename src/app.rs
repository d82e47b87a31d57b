// ============================================================================
// APP STATE & EVENT HANDLING
// ============================================================================

use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{info, warn};
use tui_textarea::{CursorMove, Input, Key, TextArea};

use crate::ai::AiTask;
use crate::assistant::{AiCompletion, Assistant, DirectEdit};
use crate::dispatch::Dispatcher;
use crate::editor::EditorBuffer;
use crate::note::Note;
use crate::search::filter_notes;
use crate::storage::KeyValueSlot;
use crate::store::NoteStore;

pub type Store = NoteStore<Box<dyn KeyValueSlot>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Search,
    Title,
    Tags,
    Content,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Sidebar => Focus::Title,
            Focus::Search => Focus::Sidebar,
            Focus::Title => Focus::Tags,
            Focus::Tags => Focus::Content,
            Focus::Content => Focus::Sidebar,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Sidebar => Focus::Content,
            Focus::Search => Focus::Sidebar,
            Focus::Title => Focus::Sidebar,
            Focus::Tags => Focus::Title,
            Focus::Content => Focus::Tags,
        }
    }
}

pub struct App {
    pub store: Store,
    pub editor: EditorBuffer,
    pub assistant: Assistant,
    dispatcher: Dispatcher,
    pub textarea: TextArea<'static>,
    pub focus: Focus,
    pub search_query: String,
    pub show_ai_menu: bool,
    pub ai_menu_selected: usize,
    /// Note waiting on the delete confirmation popup.
    pub pending_delete: Option<String>,
    pub selected_tag: usize,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(store: Store, editor: EditorBuffer, dispatcher: Dispatcher) -> Self {
        let mut app = Self {
            store,
            editor,
            assistant: Assistant::new(),
            dispatcher,
            textarea: TextArea::default(),
            focus: Focus::Sidebar,
            search_query: String::new(),
            show_ai_menu: false,
            ai_menu_selected: 0,
            pending_delete: None,
            selected_tag: 0,
            status_message: None,
        };
        app.editor.load(app.store.active());
        app.reset_textarea();
        app
    }

    pub fn active_note(&self) -> Option<&Note> {
        self.store.active()
    }

    pub fn visible_notes(&self) -> Vec<&Note> {
        filter_notes(self.store.notes(), &self.search_query)
    }

    // ------------------------------------------------------------------------
    // Note selection
    // ------------------------------------------------------------------------

    /// Rebind the editor when the store's active note changed underneath it.
    fn sync_active(&mut self) {
        if self.store.active_id() != self.editor.note_id() {
            self.rebind_editor();
        }
    }

    /// Drop the editor buffers and AI state and load the active note.
    fn rebind_editor(&mut self) {
        self.editor.load(self.store.active());
        self.assistant.reset();
        self.selected_tag = 0;
        self.show_ai_menu = false;
        self.reset_textarea();
    }

    pub fn select_note(&mut self, id: &str) {
        if self.store.active_id() == Some(id) {
            return;
        }
        let flushed = self.editor.flush(&mut self.store);
        self.report(flushed);
        self.store.select(id);
        self.sync_active();
    }

    /// Step through the filtered list relative to the active note.
    pub fn move_selection(&mut self, delta: isize) {
        let ids: Vec<String> = self.visible_notes().iter().map(|n| n.id.clone()).collect();
        if ids.is_empty() {
            return;
        }
        let current = self
            .store
            .active_id()
            .and_then(|id| ids.iter().position(|v| v == id));
        let next = match current {
            Some(pos) => (pos as isize + delta).clamp(0, ids.len() as isize - 1) as usize,
            None => 0,
        };
        self.select_note(&ids[next]);
    }

    pub fn create_note(&mut self) {
        let flushed = self.editor.flush(&mut self.store);
        self.report(flushed);
        let created = self.store.create();
        self.report(created);
        self.sync_active();
        self.focus = Focus::Title;
    }

    pub fn request_delete(&mut self) {
        self.pending_delete = self.store.active_id().map(str::to_string);
    }

    /// Answer the delete popup.
    pub fn confirm_delete(&mut self, approved: bool) {
        let Some(id) = self.pending_delete.take() else {
            return;
        };
        let deleted = self.store.delete(&id, |_: &Note| approved);
        if let Ok(true) = deleted {
            info!(note_id = %id, "Note deleted");
        }
        self.report(deleted);
        if self.editor.note_id() == Some(id.as_str()) && self.store.get(&id).is_none() {
            // pending edits belonged to the deleted note
            self.rebind_editor();
        } else {
            self.sync_active();
        }
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    /// Load the editor content into the textarea, cursor at the end.
    pub fn reset_textarea(&mut self) {
        let lines: Vec<String> = self.editor.content().split('\n').map(str::to_string).collect();
        let last_row = lines.len().saturating_sub(1);
        let last_col = lines.last().map(|l| l.chars().count()).unwrap_or(0);
        self.textarea = TextArea::new(lines);
        self.textarea
            .move_cursor(CursorMove::Jump(last_row as u16, last_col as u16));
    }

    fn content_edited(&mut self, now: Instant) {
        let text = self.textarea.lines().join("\n");
        if text != self.editor.content() {
            self.editor.set_content(text, now);
        }
    }

    pub fn remove_selected_tag(&mut self) {
        let Some(tag) = self
            .active_note()
            .and_then(|n| n.tags.get(self.selected_tag))
            .cloned()
        else {
            return;
        };
        let removed = self.editor.remove_tag(&tag, &mut self.store);
        self.report(removed);
        let remaining = self.active_note().map(|n| n.tags.len()).unwrap_or(0);
        self.selected_tag = self.selected_tag.min(remaining.saturating_sub(1));
    }

    /// Commit buffers whose debounce window has elapsed and pick up finished
    /// AI requests.
    pub fn tick(&mut self, now: Instant) {
        let flushed = self.editor.flush_due(now, &mut self.store);
        self.report(flushed);
        while let Some(completion) = self.dispatcher.try_next() {
            self.apply_completion(completion, now);
        }
    }

    pub fn shutdown(&mut self) {
        let flushed = self.editor.flush(&mut self.store);
        self.report(flushed);
    }

    // ------------------------------------------------------------------------
    // AI workflow
    // ------------------------------------------------------------------------

    pub fn run_ai(&mut self, task: AiTask) {
        self.show_ai_menu = false;
        let Some(note_id) = self.editor.note_id().map(str::to_string) else {
            return;
        };
        if let Some(ticket) = self.assistant.begin(task, &note_id, self.editor.content()) {
            info!(?task, note_id = %note_id, "AI request started");
            self.dispatcher.dispatch(
                ticket,
                self.editor.content().to_string(),
                self.editor.title().to_string(),
            );
        }
    }

    pub fn apply_completion(&mut self, completion: AiCompletion, now: Instant) {
        let active = self.store.active_id().map(str::to_string);
        match self.assistant.complete(completion, active.as_deref()) {
            Some(DirectEdit::Title(title)) => self.editor.set_title(title, now),
            Some(DirectEdit::Tags(tags)) => {
                let merged = self.editor.merge_tags(&tags, &mut self.store);
                self.report(merged);
            }
            None => {}
        }
    }

    pub fn accept_suggestion(&mut self, now: Instant) {
        if let Some(merged) = self.assistant.accept(self.editor.content()) {
            self.editor.set_content(merged, now);
            self.reset_textarea();
        }
    }

    pub fn discard_suggestion(&mut self) {
        self.assistant.discard();
    }

    fn report<T>(&mut self, result: Result<T>) {
        if let Err(e) = result {
            warn!(error = %e, "Failed to save notes");
            self.status_message = Some(format!("Save failed: {}", e));
        }
    }

    // ------------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------------

    /// Handle one key press. Returns `true` when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            return true;
        }

        // Delete confirmation popup
        if self.pending_delete.is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.confirm_delete(true)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.confirm_delete(false)
                }
                _ => {}
            }
            return false;
        }

        // AI tools menu
        if self.show_ai_menu {
            match key.code {
                KeyCode::Esc => self.show_ai_menu = false,
                KeyCode::Up => self.ai_menu_selected = self.ai_menu_selected.saturating_sub(1),
                KeyCode::Down => {
                    self.ai_menu_selected = (self.ai_menu_selected + 1).min(AiTask::ALL.len() - 1)
                }
                KeyCode::Enter => self.run_ai(AiTask::ALL[self.ai_menu_selected]),
                KeyCode::Char(c @ '1'..='5') => {
                    let idx = c as usize - '1' as usize;
                    self.run_ai(AiTask::ALL[idx]);
                }
                _ => {}
            }
            return false;
        }

        if ctrl {
            match key.code {
                KeyCode::Char('n') => {
                    self.create_note();
                    return false;
                }
                KeyCode::Char('f') => {
                    self.focus = Focus::Search;
                    return false;
                }
                KeyCode::Char('g') => {
                    if self.editor.note_id().is_some() {
                        self.show_ai_menu = true;
                        self.ai_menu_selected = 0;
                    }
                    return false;
                }
                KeyCode::Char('y') if self.assistant.suggestion().is_some() => {
                    self.accept_suggestion(now);
                    return false;
                }
                KeyCode::Char('d') if self.assistant.suggestion().is_some() => {
                    self.discard_suggestion();
                    return false;
                }
                _ => {}
            }
        }

        if key.code == KeyCode::Esc {
            if self.assistant.error().is_some() {
                self.assistant.dismiss_error();
            } else if self.status_message.is_some() {
                self.status_message = None;
            } else {
                self.focus = Focus::Sidebar;
            }
            return false;
        }

        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return false;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                return false;
            }
            _ => {}
        }

        // Editing panes need a note
        if matches!(self.focus, Focus::Title | Focus::Tags | Focus::Content)
            && self.editor.note_id().is_none()
        {
            self.focus = Focus::Sidebar;
        }

        match self.focus {
            Focus::Sidebar => return self.handle_sidebar_key(key),
            Focus::Search => self.handle_search_key(key),
            Focus::Title => self.handle_title_key(key, now),
            Focus::Tags => self.handle_tags_key(key),
            Focus::Content => self.handle_content_key(key, now),
        }
        false
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Enter => {
                if self.editor.note_id().is_some() {
                    self.focus = Focus::Content;
                }
            }
            KeyCode::Char('n') => self.create_note(),
            KeyCode::Char('/') => self.focus = Focus::Search,
            KeyCode::Char('a') => {
                if self.editor.note_id().is_some() {
                    self.show_ai_menu = true;
                    self.ai_menu_selected = 0;
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => self.request_delete(),
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.focus = Focus::Sidebar,
            KeyCode::Backspace => {
                self.search_query.pop();
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search_query.push(c)
            }
            _ => {}
        }
    }

    fn handle_title_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Enter | KeyCode::Down => self.focus = Focus::Tags,
            KeyCode::Backspace => {
                let mut title = self.editor.title().to_string();
                if title.pop().is_some() {
                    self.editor.set_title(title, now);
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let title = format!("{}{}", self.editor.title(), c);
                self.editor.set_title(title, now);
            }
            _ => {}
        }
    }

    fn handle_tags_key(&mut self, key: KeyEvent) {
        let count = self.active_note().map(|n| n.tags.len()).unwrap_or(0);
        match key.code {
            KeyCode::Left => self.selected_tag = self.selected_tag.saturating_sub(1),
            KeyCode::Right => {
                self.selected_tag = (self.selected_tag + 1).min(count.saturating_sub(1))
            }
            KeyCode::Up => self.focus = Focus::Title,
            KeyCode::Enter | KeyCode::Down => self.focus = Focus::Content,
            KeyCode::Delete | KeyCode::Backspace => self.remove_selected_tag(),
            _ => {}
        }
    }

    fn handle_content_key(&mut self, key: KeyEvent, now: Instant) {
        // Forward key events to the textarea for normal text editing
        let input = Input {
            key: match key.code {
                KeyCode::Char(c) => Key::Char(c),
                KeyCode::Enter => Key::Enter,
                KeyCode::Backspace => Key::Backspace,
                KeyCode::Delete => Key::Delete,
                KeyCode::Left => Key::Left,
                KeyCode::Right => Key::Right,
                KeyCode::Up => Key::Up,
                KeyCode::Down => Key::Down,
                KeyCode::Home => Key::Home,
                KeyCode::End => Key::End,
                KeyCode::PageUp => Key::PageUp,
                KeyCode::PageDown => Key::PageDown,
                KeyCode::F(n) => Key::F(n),
                _ => Key::Null,
            },
            ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
            alt: key.modifiers.contains(KeyModifiers::ALT),
        };
        self.textarea.input(input);
        self.content_edited(now);
    }
}
