// ============================================================================
// NOTE RECORD
// ============================================================================

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const WELCOME_TITLE: &str = "Welcome to Cybernotes";

const WELCOME_CONTENT: &str = "Welcome! This is a simple, AI-powered note taking app.

Press Ctrl+G to open the AI Tools menu and:
- Fix grammar
- Continue your writing
- Summarize long notes
- Auto-generate tags

Enjoy writing!";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Note {
    pub fn new() -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            content: String::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn welcome() -> Self {
        let mut note = Self::new();
        note.title = WELCOME_TITLE.to_string();
        note.content = WELCOME_CONTENT.to_string();
        note.tags = vec!["welcome".to_string(), "guide".to_string()];
        note
    }

    /// Stamp a fresh modification time, never earlier than creation.
    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.created_at);
    }

    /// Title for list and editor display.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Untitled Note"
        } else {
            &self.title
        }
    }

    /// Add tags that are not already present, keeping insertion order.
    pub fn merge_tags<I, S>(&mut self, tags: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut changed = false;
        for tag in tags {
            let tag = tag.into();
            if !tag.is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
                changed = true;
            }
        }
        changed
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}
