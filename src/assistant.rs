// ============================================================================
// AI SUGGESTION WORKFLOW - Request state, staleness checks, merge rules
// ============================================================================

use tracing::{debug, warn};

use crate::ai::{AiError, AiOutput, AiTask};

pub const EMPTY_CONTENT_MESSAGE: &str = "Content is empty";
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate AI response. Please try again.";

const SUMMARY_HEADING: &str = "\n\n**Summary:**\n";

/// Suggestions that wait for the user to accept or discard them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Fix,
    Continuation,
    Summary,
}

impl SuggestionKind {
    fn for_task(task: AiTask) -> Option<Self> {
        match task {
            AiTask::FixGrammar => Some(SuggestionKind::Fix),
            AiTask::Continue => Some(SuggestionKind::Continuation),
            AiTask::Summarize => Some(SuggestionKind::Summary),
            AiTask::GenerateTitle | AiTask::GenerateTags => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SuggestionKind::Fix => "Grammar Fix",
            SuggestionKind::Continuation => "Continuation",
            SuggestionKind::Summary => "Summary",
        }
    }

    pub fn action_label(self) -> &'static str {
        match self {
            SuggestionKind::Fix => "Replace Content",
            SuggestionKind::Continuation | SuggestionKind::Summary => "Append",
        }
    }

    /// Combine an accepted suggestion with the current content.
    pub fn merge(self, content: &str, suggestion: &str) -> String {
        match self {
            SuggestionKind::Fix => suggestion.to_string(),
            SuggestionKind::Continuation => {
                if content.ends_with(' ') {
                    format!("{}{}", content, suggestion)
                } else {
                    format!("{} {}", content, suggestion)
                }
            }
            SuggestionKind::Summary => format!("{}{}{}", content, SUMMARY_HEADING, suggestion),
        }
    }
}

/// Identifies one in-flight request and the note it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub request_id: u64,
    pub note_id: String,
    pub task: AiTask,
}

#[derive(Debug)]
pub struct AiCompletion {
    pub ticket: Ticket,
    pub result: Result<AiOutput, AiError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiState {
    Idle,
    Pending(Ticket),
    Suggestion { kind: SuggestionKind, text: String },
    Error(String),
}

/// Results applied straight to the note without a confirmation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectEdit {
    Title(String),
    Tags(Vec<String>),
}

pub struct Assistant {
    state: AiState,
    next_request_id: u64,
}

impl Assistant {
    pub fn new() -> Self {
        Self {
            state: AiState::Idle,
            next_request_id: 1,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &AiState {
        &self.state
    }

    pub fn is_generating(&self) -> bool {
        matches!(self.state, AiState::Pending(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            AiState::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn suggestion(&self) -> Option<(SuggestionKind, &str)> {
        match &self.state {
            AiState::Suggestion { kind, text } => Some((*kind, text)),
            _ => None,
        }
    }

    /// Validate and start a request. Returns the ticket to dispatch, or
    /// `None` when validation failed and the error state is set.
    ///
    /// A new ticket supersedes any request still in flight.
    pub fn begin(&mut self, task: AiTask, note_id: &str, content: &str) -> Option<Ticket> {
        if task.requires_content() && content.trim().is_empty() {
            self.state = AiState::Error(EMPTY_CONTENT_MESSAGE.to_string());
            return None;
        }

        let ticket = Ticket {
            request_id: self.next_request_id,
            note_id: note_id.to_string(),
            task,
        };
        self.next_request_id += 1;
        self.state = AiState::Pending(ticket.clone());
        Some(ticket)
    }

    /// Resolve a finished request. Completions for a superseded request or
    /// for a note that is no longer active are dropped.
    pub fn complete(
        &mut self,
        completion: AiCompletion,
        active_note: Option<&str>,
    ) -> Option<DirectEdit> {
        let AiCompletion { ticket, result } = completion;

        let current = matches!(&self.state, AiState::Pending(pending) if *pending == ticket);
        if !current || active_note != Some(ticket.note_id.as_str()) {
            debug!(
                request_id = ticket.request_id,
                note_id = %ticket.note_id,
                "Discarding stale AI completion"
            );
            return None;
        }

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, task = ?ticket.task, "AI request failed");
                self.state = AiState::Error(GENERIC_FAILURE_MESSAGE.to_string());
                return None;
            }
        };

        match (ticket.task, output) {
            (AiTask::GenerateTitle, AiOutput::Text(title)) => {
                self.state = AiState::Idle;
                Some(DirectEdit::Title(title))
            }
            (AiTask::GenerateTags, AiOutput::Tags(tags)) => {
                self.state = AiState::Idle;
                Some(DirectEdit::Tags(tags))
            }
            (task, AiOutput::Text(text)) => match SuggestionKind::for_task(task) {
                Some(kind) => {
                    self.state = AiState::Suggestion { kind, text };
                    None
                }
                None => self.fail_mismatch(task),
            },
            (task, AiOutput::Tags(_)) => self.fail_mismatch(task),
        }
    }

    /// Merge the pending suggestion into `content`. Returns the new content,
    /// or `None` when nothing was pending.
    pub fn accept(&mut self, content: &str) -> Option<String> {
        let (kind, text) = self.suggestion()?;
        let merged = kind.merge(content, text);
        self.state = AiState::Idle;
        Some(merged)
    }

    pub fn discard(&mut self) {
        if self.suggestion().is_some() {
            self.state = AiState::Idle;
        }
    }

    pub fn dismiss_error(&mut self) {
        if self.error().is_some() {
            self.state = AiState::Idle;
        }
    }

    /// Forget everything, e.g. when another note becomes active.
    pub fn reset(&mut self) {
        self.state = AiState::Idle;
    }

    fn fail_mismatch(&mut self, task: AiTask) -> Option<DirectEdit> {
        warn!(?task, "AI output did not match the task");
        self.state = AiState::Error(GENERIC_FAILURE_MESSAGE.to_string());
        None
    }
}

impl Default for Assistant {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(ticket: &Ticket, output: AiOutput) -> AiCompletion {
        AiCompletion {
            ticket: ticket.clone(),
            result: Ok(output),
        }
    }

    fn text(s: &str) -> AiOutput {
        AiOutput::Text(s.to_string())
    }

    #[test]
    fn continuation_adds_a_single_space() {
        let kind = SuggestionKind::Continuation;
        assert_eq!(kind.merge("Hello", "world"), "Hello world");
        assert_eq!(kind.merge("Hello ", "world"), "Hello world");
        assert_eq!(kind.merge("", "Once upon"), " Once upon");
    }

    #[test]
    fn fix_replaces_and_summary_appends_under_heading() {
        assert_eq!(SuggestionKind::Fix.merge("teh cat", "the cat"), "the cat");
        assert_eq!(
            SuggestionKind::Summary.merge("Long note", "Short."),
            "Long note\n\n**Summary:**\nShort."
        );
    }

    #[test]
    fn empty_content_fails_validation_for_every_task_but_continue() {
        for task in AiTask::ALL {
            let mut assistant = Assistant::new();
            let ticket = assistant.begin(task, "n1", "   ");
            if task == AiTask::Continue {
                assert!(ticket.is_some());
                assert!(assistant.is_generating());
            } else {
                assert!(ticket.is_none());
                assert_eq!(assistant.error(), Some(EMPTY_CONTENT_MESSAGE));
            }
        }
    }

    #[test]
    fn pending_state_has_no_suggestion_or_error() {
        let mut assistant = Assistant::new();
        assistant.begin(AiTask::Continue, "n1", "");
        assert!(assistant.is_generating());
        assert!(assistant.error().is_none());
        assert!(assistant.suggestion().is_none());
    }

    #[test]
    fn suggestion_waits_for_accept() {
        let mut assistant = Assistant::new();
        let ticket = assistant.begin(AiTask::Continue, "n1", "Hello").unwrap();
        assert!(assistant.complete(done(&ticket, text("world")), Some("n1")).is_none());
        assert_eq!(
            assistant.suggestion(),
            Some((SuggestionKind::Continuation, "world"))
        );

        assert_eq!(assistant.accept("Hello").as_deref(), Some("Hello world"));
        assert_eq!(assistant.state(), &AiState::Idle);
        assert!(assistant.accept("Hello").is_none());
    }

    #[test]
    fn discard_clears_without_merging() {
        let mut assistant = Assistant::new();
        let ticket = assistant.begin(AiTask::FixGrammar, "n1", "teh").unwrap();
        assistant.complete(done(&ticket, text("the")), Some("n1"));
        assistant.discard();
        assert_eq!(assistant.state(), &AiState::Idle);
    }

    #[test]
    fn title_and_tags_are_direct_edits() {
        let mut assistant = Assistant::new();
        let ticket = assistant.begin(AiTask::GenerateTitle, "n1", "body").unwrap();
        assert_eq!(
            assistant.complete(done(&ticket, text("Nice Title")), Some("n1")),
            Some(DirectEdit::Title("Nice Title".into()))
        );
        assert_eq!(assistant.state(), &AiState::Idle);

        let ticket = assistant.begin(AiTask::GenerateTags, "n1", "body").unwrap();
        let tags = AiOutput::Tags(vec!["b".into(), "c".into()]);
        assert_eq!(
            assistant.complete(done(&ticket, tags), Some("n1")),
            Some(DirectEdit::Tags(vec!["b".into(), "c".into()]))
        );
    }

    #[test]
    fn failures_become_the_generic_message() {
        let mut assistant = Assistant::new();
        let ticket = assistant.begin(AiTask::Summarize, "n1", "body").unwrap();
        let failed = AiCompletion {
            ticket,
            result: Err(AiError::EmptyResponse),
        };
        assert!(assistant.complete(failed, Some("n1")).is_none());
        assert_eq!(assistant.error(), Some(GENERIC_FAILURE_MESSAGE));

        assistant.dismiss_error();
        assert_eq!(assistant.state(), &AiState::Idle);
    }

    #[test]
    fn completion_for_another_note_is_dropped() {
        let mut assistant = Assistant::new();
        let ticket = assistant.begin(AiTask::GenerateTitle, "n1", "body").unwrap();
        assert!(assistant.complete(done(&ticket, text("T")), Some("n2")).is_none());
        // still waiting; the switch itself is what resets the state
        assert!(assistant.is_generating());
    }

    #[test]
    fn superseded_request_is_dropped() {
        let mut assistant = Assistant::new();
        let first = assistant.begin(AiTask::Summarize, "n1", "body").unwrap();
        let second = assistant.begin(AiTask::FixGrammar, "n1", "body").unwrap();
        assert_ne!(first.request_id, second.request_id);

        assistant.complete(done(&first, text("old")), Some("n1"));
        assert!(assistant.is_generating());

        assistant.complete(done(&second, text("new")), Some("n1"));
        assert_eq!(assistant.suggestion(), Some((SuggestionKind::Fix, "new")));
    }

    #[test]
    fn completion_after_reset_is_dropped() {
        let mut assistant = Assistant::new();
        let ticket = assistant.begin(AiTask::Continue, "n1", "x").unwrap();
        assistant.reset();
        assistant.complete(done(&ticket, text("late")), Some("n1"));
        assert_eq!(assistant.state(), &AiState::Idle);
    }

    #[test]
    fn wrong_output_shape_is_an_error() {
        let mut assistant = Assistant::new();
        let ticket = assistant.begin(AiTask::Summarize, "n1", "body").unwrap();
        assistant.complete(done(&ticket, AiOutput::Tags(vec![])), Some("n1"));
        assert_eq!(assistant.error(), Some(GENERIC_FAILURE_MESSAGE));
    }
}
