// ============================================================================
// RENDERING (DRAWING)
// ============================================================================

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::ai::AiTask;
use crate::app::{App, Focus};

const HELP_LINE: &str =
    "Ctrl+N new | Ctrl+F search | Ctrl+G AI tools | Tab focus | d delete | Ctrl+Q quit";

/// Get centered popup area for overlays
fn get_popup_area(frame_width: u16, frame_height: u16, width_percent: u16, height_percent: u16) -> Rect {
    let width = frame_width.saturating_mul(width_percent) / 100;
    let height = frame_height.saturating_mul(height_percent) / 100;
    let x = (frame_width.saturating_sub(width)) / 2;
    let y = (frame_height.saturating_sub(height)) / 2;
    Rect { x, y, width, height }
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)])
        .split(frame.size());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(chunks[0]);

    draw_sidebar(frame, app, body[0]);
    draw_editor(frame, app, body[1]);
    draw_status_line(frame, app, chunks[1]);

    if app.show_ai_menu {
        draw_ai_menu(frame, app);
    }

    if app.assistant.error().is_some() {
        draw_error_popup(frame, app);
    }

    if app.pending_delete.is_some() {
        draw_delete_confirmation(frame, app);
    }
}

fn draw_sidebar(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let query_text = if app.search_query.is_empty() && app.focus != Focus::Search {
        Span::styled("Search notes...", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.search_query.clone())
    };
    let search = Paragraph::new(Line::from(query_text)).block(
        Block::default()
            .title("Search")
            .borders(Borders::ALL)
            .border_style(border_style(app.focus == Focus::Search)),
    );
    frame.render_widget(search, chunks[0]);

    let block = Block::default()
        .title(format!("Cybernotes ({})", app.store.len()))
        .borders(Borders::ALL)
        .border_style(border_style(app.focus == Focus::Sidebar));

    let visible = app.visible_notes();
    if visible.is_empty() {
        let mut lines = vec![Line::from("No notes found")];
        if app.store.is_empty() {
            lines.push(Line::from("Press Ctrl+N to create one".italic()));
        }
        let hint = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(hint, chunks[1]);
        return;
    }

    let active_id = app.store.active_id();
    let mut selected = None;
    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .map(|(idx, note)| {
            if Some(note.id.as_str()) == active_id {
                selected = Some(idx);
            }

            let preview = note.content.lines().next().unwrap_or("");
            let preview = if preview.is_empty() { "No content..." } else { preview };

            let mut tag_spans: Vec<Span> = note
                .tags
                .iter()
                .take(2)
                .map(|t| Span::styled(format!("#{} ", t), Style::default().fg(Color::Magenta)))
                .collect();
            if note.tags.len() > 2 {
                tag_spans.push(Span::styled(
                    format!("+{}", note.tags.len() - 2),
                    Style::default().fg(Color::DarkGray),
                ));
            }

            ListItem::new(vec![
                Line::from(Span::styled(
                    note.display_title().to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    preview.to_string(),
                    Style::default().fg(Color::Gray),
                )),
                Line::from(tag_spans),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
    let mut state = ListState::default();
    state.select(selected);
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

fn draw_editor(frame: &mut Frame, app: &mut App, area: Rect) {
    if app.editor.note_id().is_none() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from("Select a note to view"),
            Line::from("Press Ctrl+N to create a new note".italic()),
        ])
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let suggestion_height = if app.assistant.suggestion().is_some() { 8 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(suggestion_height),
        ])
        .split(area);

    // Title
    let title_span = if app.editor.title().is_empty() {
        Span::styled("Untitled Note", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            app.editor.title().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )
    };
    let mut title_line = vec![title_span];
    if app.focus == Focus::Title {
        title_line.push(Span::styled("|", Style::default().fg(Color::Yellow)));
    }
    let title = Paragraph::new(Line::from(title_line)).block(
        Block::default()
            .title("Title")
            .borders(Borders::ALL)
            .border_style(border_style(app.focus == Focus::Title)),
    );
    frame.render_widget(title, chunks[0]);

    // Tags
    let tags = app
        .active_note()
        .map(|n| n.tags.clone())
        .unwrap_or_default();
    let tag_line = if tags.is_empty() {
        Line::from(Span::styled("No tags", Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)))
    } else {
        let spans: Vec<Span> = tags
            .iter()
            .enumerate()
            .map(|(idx, tag)| {
                let style = if app.focus == Focus::Tags && idx == app.selected_tag {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else {
                    Style::default().fg(Color::Magenta)
                };
                Span::styled(format!(" #{} ", tag), style)
            })
            .collect();
        Line::from(spans)
    };
    let tags_title = if app.focus == Focus::Tags {
        "Tags (Left/Right pick, Del remove)"
    } else {
        "Tags"
    };
    let tag_row = Paragraph::new(tag_line).block(
        Block::default()
            .title(tags_title)
            .borders(Borders::ALL)
            .border_style(border_style(app.focus == Focus::Tags)),
    );
    frame.render_widget(tag_row, chunks[1]);

    // Content
    render_content(frame, app, chunks[2]);

    if suggestion_height > 0 {
        draw_suggestion_panel(frame, app, chunks[3]);
    }
}

fn textarea_lines_with_cursor(app: &App, height: u16) -> Vec<Line<'static>> {
    let (cursor_row, cursor_col) = app.textarea.cursor();
    let mut lines = Vec::new();
    let text_lines = app.textarea.lines();

    if text_lines.is_empty() {
        lines.push(Line::from("|"));
        return lines;
    }

    for (idx, line) in text_lines.iter().enumerate() {
        if idx == cursor_row {
            let char_col = cursor_col.min(line.chars().count());
            let mut new_line = String::new();
            for (i, c) in line.chars().enumerate() {
                if i == char_col {
                    new_line.push('|');
                }
                new_line.push(c);
            }
            if char_col == line.chars().count() {
                new_line.push('|');
            }
            lines.push(Line::from(Span::styled(
                new_line,
                Style::default().fg(Color::Yellow).bg(Color::Rgb(30, 30, 40)),
            )));
        } else {
            lines.push(Line::from(line.clone()));
        }
    }
    let view_height = height.max(1) as usize;
    if lines.len() > view_height {
        let start = cursor_row.saturating_sub(view_height.saturating_sub(1));
        let end = (start + view_height).min(lines.len());
        lines[start..end].to_vec()
    } else {
        lines
    }
}

fn render_content(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Content;
    let block = Block::default()
        .title("Content")
        .borders(Borders::ALL)
        .border_style(border_style(focused));

    let panel = if focused {
        let inner_height = area.height.saturating_sub(2); // account for borders
        Paragraph::new(textarea_lines_with_cursor(app, inner_height))
    } else if app.editor.content().is_empty() {
        Paragraph::new(Line::from(Span::styled(
            "Start typing...",
            Style::default().fg(Color::DarkGray),
        )))
    } else {
        Paragraph::new(app.editor.content().to_string())
    };

    frame.render_widget(panel.block(block).wrap(Wrap { trim: false }), area);
}

fn draw_suggestion_panel(frame: &mut Frame, app: &App, area: Rect) {
    let Some((kind, text)) = app.assistant.suggestion() else {
        return;
    };

    let block = Block::default()
        .title(format!("{} Suggestion", kind.label()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let body = Paragraph::new(text.to_string())
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));
    frame.render_widget(body, chunks[0]);

    let actions = Paragraph::new(format!(
        "Ctrl+Y {}  |  Ctrl+D Discard",
        kind.action_label()
    ))
    .alignment(Alignment::Right)
    .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));
    frame.render_widget(actions, chunks[1]);
}

fn draw_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(30)])
        .split(area);

    let left = match &app.status_message {
        Some(message) => Paragraph::new(message.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(HELP_LINE).style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(left, chunks[0]);

    let state = if app.assistant.is_generating() {
        Span::styled("AI Thinking...", Style::default().fg(Color::Magenta))
    } else if app.editor.is_pending() {
        Span::styled("Editing...", Style::default().fg(Color::Yellow))
    } else {
        Span::styled("Saved", Style::default().fg(Color::Green))
    };
    frame.render_widget(
        Paragraph::new(Line::from(state)).alignment(Alignment::Right),
        chunks[1],
    );
}

fn draw_ai_menu(frame: &mut Frame, app: &App) {
    let size = frame.size();
    let area = get_popup_area(size.width, size.height, 40, 40);

    let block = Block::default()
        .title("AI Tools (1-5 or Enter, Esc to close)")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Cyan).bg(Color::Black));
    frame.render_widget(Clear, area);

    let items: Vec<ListItem> = AiTask::ALL
        .iter()
        .enumerate()
        .map(|(idx, task)| ListItem::new(format!("{}. {}", idx + 1, task.label())))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(app.ai_menu_selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_error_popup(frame: &mut Frame, app: &App) {
    let Some(message) = app.assistant.error() else {
        return;
    };
    let size = frame.size();
    let area = get_popup_area(size.width, size.height, 50, 25);

    let block = Block::default()
        .title("[!] AI Error")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Red).bg(Color::Black));

    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(1)])
        .split(inner);

    let para = Paragraph::new(message)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White));
    frame.render_widget(para, chunks[0]);

    let hint = Paragraph::new("Press Esc to dismiss")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));
    frame.render_widget(hint, chunks[1]);
}

fn draw_delete_confirmation(frame: &mut Frame, app: &App) {
    let title = app
        .pending_delete
        .as_deref()
        .and_then(|id| app.store.get(id))
        .map(|n| n.display_title().to_string())
        .unwrap_or_default();

    let size = frame.size();
    let area = get_popup_area(size.width, size.height, 50, 25);

    let block = Block::default()
        .title("Delete Note")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Yellow).bg(Color::Black));

    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(1)])
        .split(inner);

    let para = Paragraph::new(format!("Are you sure you want to delete \"{}\"?", title))
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White));
    frame.render_widget(para, chunks[0]);

    let hint = Paragraph::new("y: delete   n/Esc: keep")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));
    frame.render_widget(hint, chunks[1]);
}
