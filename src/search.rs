use crate::note::Note;

/// Notes matching `query`, most recently modified first.
///
/// The query is compared case-insensitively as a substring of the title, the
/// content, or any tag. An empty query matches everything.
pub fn filter_notes<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    let needle = query.to_lowercase();
    let mut hits: Vec<&Note> = notes.iter().filter(|n| matches(n, &needle)).collect();
    hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    hits
}

fn matches(note: &Note, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    note.title.to_lowercase().contains(needle)
        || note.content.to_lowercase().contains(needle)
        || note.tags.iter().any(|t| t.to_lowercase().contains(needle))
}
