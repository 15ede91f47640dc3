//! Multi-select picker for organizations and repositories.
//!
//! The full-screen picker draws on stderr so that reports piped from
//! stdout stay intact. [`parse_selection`] backs the line-based fallback.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::collections::BTreeSet;
use std::io;

/// Result of the picker interaction
#[derive(Debug, PartialEq, Eq)]
pub enum PickerResult {
    /// Indices of the chosen items, ascending
    Selected(Vec<usize>),
    /// User cancelled (Esc or Ctrl+C)
    Cancelled,
}

struct MultiPicker {
    title: String,
    items: Vec<String>,
    filter: String,
    filtered_indices: Vec<usize>,
    chosen: BTreeSet<usize>,
    list_state: ListState,
}

impl MultiPicker {
    fn new(title: impl Into<String>, items: Vec<String>) -> Self {
        let filtered_indices: Vec<usize> = (0..items.len()).collect();
        let mut list_state = ListState::default();
        if !filtered_indices.is_empty() {
            list_state.select(Some(0));
        }
        Self {
            title: title.into(),
            items,
            filter: String::new(),
            filtered_indices,
            chosen: BTreeSet::new(),
            list_state,
        }
    }

    fn update_filter(&mut self) {
        let needle = self.filter.to_lowercase();
        self.filtered_indices = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| needle.is_empty() || item.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();

        if self.filtered_indices.is_empty() {
            self.list_state.select(None);
        } else {
            self.list_state.select(Some(0));
        }
    }

    fn select_previous(&mut self) {
        let len = self.filtered_indices.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn select_next(&mut self) {
        let len = self.filtered_indices.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    fn highlighted(&self) -> Option<usize> {
        self.list_state
            .selected()
            .and_then(|i| self.filtered_indices.get(i).copied())
    }

    fn toggle_highlighted(&mut self) {
        if let Some(idx) = self.highlighted()
            && !self.chosen.remove(&idx)
        {
            self.chosen.insert(idx);
        }
    }

    /// Chooses every visible item, or clears them when all are already chosen.
    fn toggle_visible(&mut self) {
        let all_chosen = self
            .filtered_indices
            .iter()
            .all(|idx| self.chosen.contains(idx));
        for idx in &self.filtered_indices {
            if all_chosen {
                self.chosen.remove(idx);
            } else {
                self.chosen.insert(*idx);
            }
        }
    }

    /// Items to return on Enter. With nothing toggled the highlighted item counts.
    fn confirmed(&self) -> Option<Vec<usize>> {
        if self.chosen.is_empty() {
            return self.highlighted().map(|idx| vec![idx]);
        }
        Some(self.chosen.iter().copied().collect())
    }
}

/// Run the interactive multi-select picker.
///
/// # Errors
///
/// Returns an error if the terminal cannot be put into raw mode or drawn to.
pub fn run_multi_picker(title: &str, items: Vec<String>) -> io::Result<PickerResult> {
    if items.is_empty() {
        return Ok(PickerResult::Cancelled);
    }

    enable_raw_mode()?;
    let mut stderr = io::stderr();
    execute!(stderr, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stderr);
    let mut terminal = Terminal::new(backend)?;

    let mut picker = MultiPicker::new(title, items);
    let result = run_event_loop(&mut terminal, &mut picker);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stderr>>,
    picker: &mut MultiPicker,
) -> io::Result<PickerResult> {
    loop {
        terminal.draw(|f| draw_ui(f, picker))?;

        if !event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Esc => return Ok(PickerResult::Cancelled),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(PickerResult::Cancelled);
            }
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                picker.toggle_visible();
            }
            KeyCode::Enter => {
                if let Some(chosen) = picker.confirmed() {
                    return Ok(PickerResult::Selected(chosen));
                }
            }
            KeyCode::Char(' ') | KeyCode::Tab => picker.toggle_highlighted(),
            KeyCode::Up => picker.select_previous(),
            KeyCode::Down => picker.select_next(),
            KeyCode::Char(c) => {
                picker.filter.push(c);
                picker.update_filter();
            }
            KeyCode::Backspace => {
                picker.filter.pop();
                picker.update_filter();
            }
            _ => {}
        }
    }
}

fn draw_ui(f: &mut Frame, picker: &mut MultiPicker) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(5),
        Constraint::Length(1),
    ])
    .split(f.area());

    draw_filter_input(f, picker, chunks[0]);
    draw_item_list(f, picker, chunks[1]);
    draw_help_footer(f, chunks[2]);
}

fn draw_filter_input(f: &mut Frame, picker: &MultiPicker, area: Rect) {
    let (text, style) = if picker.filter.is_empty() {
        (
            "Type to filter...".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (picker.filter.clone(), Style::default().fg(Color::Cyan))
    };

    let title = format!(
        " {} ({}/{} selected) ",
        picker.title,
        picker.chosen.len(),
        picker.items.len()
    );
    let input = Paragraph::new(text).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(input, area);

    let offset = u16::try_from(picker.filter.chars().count()).unwrap_or(u16::MAX);
    let cursor_x = area.x.saturating_add(1).saturating_add(offset);
    let max_x = (area.x + area.width).saturating_sub(2);
    f.set_cursor_position((cursor_x.min(max_x), area.y + 1));
}

fn draw_item_list(f: &mut Frame, picker: &mut MultiPicker, area: Rect) {
    let items: Vec<ListItem> = picker
        .filtered_indices
        .iter()
        .map(|&idx| {
            let (mark, mark_style) = if picker.chosen.contains(&idx) {
                ("[x] ", Style::default().fg(Color::Green))
            } else {
                ("[ ] ", Style::default().fg(Color::DarkGray))
            };
            ListItem::new(Line::from(vec![
                Span::styled(mark, mark_style),
                Span::styled(picker.items[idx].as_str(), Style::default().fg(Color::Cyan)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::RIGHT)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, &mut picker.list_state);
}

fn draw_help_footer(f: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Cyan);
    let help = Line::from(vec![
        Span::styled("↑/↓", key),
        Span::raw(" navigate │ "),
        Span::styled("space", key),
        Span::raw(" toggle │ "),
        Span::styled("ctrl+a", key),
        Span::raw(" all │ "),
        Span::styled("enter", key),
        Span::raw(" confirm │ "),
        Span::styled("esc", key),
        Span::raw(" cancel"),
    ]);
    let footer = Paragraph::new(help)
        .style(Style::default().fg(Color::DarkGray))
        .centered();
    f.render_widget(footer, area);
}

/// Parses a line-based selection such as `1,3,5`, `2-4` or `all`.
///
/// Numbers are 1-based; the result is 0-based, ascending and free of
/// duplicates.
///
/// # Errors
///
/// Returns a message describing the first invalid token.
pub fn parse_selection(input: &str, len: usize) -> Result<Vec<usize>, String> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return Ok((0..len).collect());
    }

    let mut chosen = BTreeSet::new();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (first, last) = match token.split_once('-') {
            Some((a, b)) => (parse_index(a, len)?, parse_index(b, len)?),
            None => {
                let i = parse_index(token, len)?;
                (i, i)
            }
        };
        if first > last {
            return Err(format!("Invalid range: {token}"));
        }
        chosen.extend(first..=last);
    }

    if chosen.is_empty() {
        return Err("Select at least one item".to_string());
    }
    Ok(chosen.into_iter().collect())
}

fn parse_index(token: &str, len: usize) -> Result<usize, String> {
    match token.trim().parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Ok(n - 1),
        _ => Err(format!("Invalid choice: {} (1-{len})", token.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<String> {
        ["acme/app", "acme/api", "labs/bug-crawler"]
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    #[test]
    fn test_filter_and_toggle_visible() {
        let mut picker = MultiPicker::new("Repositories", items());
        picker.filter = "acme".to_string();
        picker.update_filter();
        assert_eq!(picker.filtered_indices, vec![0, 1]);

        picker.toggle_visible();
        assert_eq!(picker.confirmed(), Some(vec![0, 1]));

        picker.toggle_visible();
        assert!(picker.chosen.is_empty());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut picker = MultiPicker::new("Repositories", items());
        picker.select_previous();
        assert_eq!(picker.list_state.selected(), Some(2));
        picker.select_next();
        assert_eq!(picker.list_state.selected(), Some(0));
    }

    #[test]
    fn test_enter_without_toggles_takes_highlighted() {
        let mut picker = MultiPicker::new("Repositories", items());
        picker.select_next();
        assert_eq!(picker.confirmed(), Some(vec![1]));

        picker.toggle_highlighted();
        picker.select_next();
        picker.toggle_highlighted();
        assert_eq!(picker.confirmed(), Some(vec![1, 2]));
    }

    #[test]
    fn test_empty_filter_result_confirms_nothing() {
        let mut picker = MultiPicker::new("Repositories", items());
        picker.filter = "zzz".to_string();
        picker.update_filter();
        assert_eq!(picker.confirmed(), None);
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("all", 3), Ok(vec![0, 1, 2]));
        assert_eq!(parse_selection(" 3, 1 ,3", 3), Ok(vec![0, 2]));
        assert_eq!(parse_selection("2-4", 5), Ok(vec![1, 2, 3]));
        assert!(parse_selection("0", 3).is_err());
        assert!(parse_selection("4", 3).is_err());
        assert!(parse_selection("3-1", 3).is_err());
        assert!(parse_selection("", 3).is_err());
        assert!(parse_selection("x", 3).is_err());
    }
}
