//! Full-screen review session: browse transactions, select ranges, search,
//! and assign categories by typing.
//!
//! Key handling never touches storage. `handle_key` moves the session between
//! modes and returns an [`Effect`]; the event loop carries the effect out
//! against the store and reloads. Rendering reads state only.

use std::collections::{BTreeSet, HashMap};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table, TableState},
    DefaultTerminal, Frame,
};
use tracing::{info, warn};

use crate::error::Result;
use crate::fmt::{decimal, truncate};
use crate::models::{Category, Transaction, TransactionFilter};
use crate::resolver::{resolve, suggest};
use crate::store::TransactionStore;
use crate::tui::{install_panic_hook, Theme};

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_SUGGESTIONS: usize = 5;

const MIN_DESCRIPTION: u16 = 20;
const MIN_ACCOUNT: u16 = 12;
const MIN_CATEGORY: u16 = 12;
const DATE_WIDTH: u16 = 10;
const AMOUNT_WIDTH: u16 = 12;
const MARKER_WIDTH: u16 = 1;
// title, header + margin, status, keys, and room for the suggestion panel
const CHROME_HEIGHT: u16 = 1 + 2 + 1 + 1 + 1 + MAX_SUGGESTIONS as u16;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Normal,
    VisualSelect { anchor: usize },
    Search { buffer: String },
    /// Typing a category name for `targets` (transaction ids).
    InputEdit { buffer: String, targets: Vec<String> },
}

/// What the event loop must do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Quit,
    Categorize {
        targets: Vec<String>,
        category_id: i64,
        name: String,
    },
    Uncategorize { targets: Vec<String> },
    MarkTransfer { targets: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Info(String),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct BrowseRow {
    pub txn: Transaction,
    pub account_name: String,
    pub category_name: Option<String>,
}

impl BrowseRow {
    fn matches(&self, needle: &str) -> bool {
        self.txn.description.to_lowercase().contains(needle)
            || self.account_name.to_lowercase().contains(needle)
            || self
                .category_name
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(needle))
            || decimal(self.txn.amount).contains(needle)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub term: String,
    /// Row indices that match `term`, in list order.
    pub matches: Vec<usize>,
    /// Position in `matches` of the current hit.
    pub current: usize,
}

/// Column widths and page size, fixed on the first observed terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub description: u16,
    pub account: u16,
    pub category: u16,
    pub page_size: usize,
}

impl TableLayout {
    pub fn compute(width: u16, height: u16) -> Self {
        let fixed = MARKER_WIDTH + DATE_WIDTH + AMOUNT_WIDTH + 5; // 6 columns, 5 gaps
        let available = width.saturating_sub(fixed);
        let description = (available / 2).max(MIN_DESCRIPTION);
        let account = (available / 4).max(MIN_ACCOUNT);
        let category = available
            .saturating_sub(description + account)
            .max(MIN_CATEGORY);
        let page_size = (height.saturating_sub(CHROME_HEIGHT) as usize).clamp(5, 200);
        Self {
            description,
            account,
            category,
            page_size,
        }
    }
}

fn range_selection(anchor: usize, cursor: usize) -> BTreeSet<usize> {
    (anchor.min(cursor)..=anchor.max(cursor)).collect()
}

/// Fetch transactions for `filter` with account and category names resolved.
pub fn load_rows(
    store: &dyn TransactionStore,
    filter: &TransactionFilter,
) -> Result<(Vec<BrowseRow>, Vec<Category>)> {
    let categories = store.list_categories()?;
    let names: HashMap<i64, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();
    let mut accounts: HashMap<String, String> = HashMap::new();

    let mut rows = Vec::new();
    for txn in store.list_transactions(filter)? {
        let account_name = match accounts.get(&txn.account_id) {
            Some(name) => name.clone(),
            None => {
                let name = store.account_display_name(&txn.account_id)?;
                accounts.insert(txn.account_id.clone(), name.clone());
                name
            }
        };
        let category_name = txn
            .category_id
            .and_then(|id| names.get(&id).map(|n| n.to_string()));
        rows.push(BrowseRow {
            txn,
            account_name,
            category_name,
        });
    }
    Ok((rows, categories))
}

pub struct CategoryBrowser {
    rows: Vec<BrowseRow>,
    categories: Vec<Category>,
    filter: TransactionFilter,
    mode: Mode,
    cursor: usize,
    offset: usize,
    selection: BTreeSet<usize>,
    search: SearchState,
    status: Option<Status>,
    layout: Option<TableLayout>,
}

impl CategoryBrowser {
    pub fn new(rows: Vec<BrowseRow>, categories: Vec<Category>, filter: TransactionFilter) -> Self {
        Self {
            rows,
            categories,
            filter,
            mode: Mode::Normal,
            cursor: 0,
            offset: 0,
            selection: BTreeSet::new(),
            search: SearchState::default(),
            status: None,
            layout: None,
        }
    }

    pub fn load(store: &dyn TransactionStore, filter: TransactionFilter) -> Result<Self> {
        let (rows, categories) = load_rows(store, &filter)?;
        Ok(Self::new(rows, categories, filter))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn page_size(&self) -> usize {
        self.layout.map(|l| l.page_size).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Fix the layout the first time the terminal size is known. Later
    /// resizes keep it.
    pub fn on_resize(&mut self, width: u16, height: u16) {
        if self.layout.is_none() {
            self.layout = Some(TableLayout::compute(width, height));
            self.set_cursor(self.cursor);
        }
    }

    fn set_cursor(&mut self, idx: usize) {
        if self.rows.is_empty() {
            self.cursor = 0;
            self.offset = 0;
            return;
        }
        self.cursor = idx.min(self.rows.len() - 1);
        let page = self.page_size();
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + page {
            self.offset = self.cursor + 1 - page;
        }
        if let Mode::VisualSelect { anchor } = self.mode {
            self.selection = range_selection(anchor, self.cursor);
        }
    }

    /// Cursor movement shared by Normal and VisualSelect. Returns false for
    /// keys that are not movement.
    fn navigate(&mut self, code: KeyCode) -> bool {
        let page = self.page_size();
        let last = self.rows.len().saturating_sub(1);
        let target = match code {
            KeyCode::Down | KeyCode::Char('j') => self.cursor.saturating_add(1),
            KeyCode::Up | KeyCode::Char('k') => self.cursor.saturating_sub(1),
            KeyCode::PageDown => self.cursor.saturating_add(page),
            KeyCode::PageUp => self.cursor.saturating_sub(page),
            KeyCode::Home | KeyCode::Char('g') => 0,
            KeyCode::End | KeyCode::Char('G') => last,
            _ => return false,
        };
        self.set_cursor(target);
        true
    }

    fn id_at(&self, idx: usize) -> Option<String> {
        self.rows.get(idx).map(|r| r.txn.id.clone())
    }

    fn selected_ids(&self) -> Vec<String> {
        self.selection.iter().filter_map(|&i| self.id_at(i)).collect()
    }

    fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Effect {
        self.status = None;
        match self.mode {
            Mode::Normal => self.normal_key(code),
            Mode::VisualSelect { .. } => self.visual_key(code),
            Mode::Search { .. } => self.search_key(code),
            Mode::InputEdit { .. } => self.input_key(code),
        }
    }

    fn normal_key(&mut self, code: KeyCode) -> Effect {
        if self.navigate(code) {
            return Effect::None;
        }
        match code {
            KeyCode::Char('q') => return Effect::Quit,
            KeyCode::Char('/') => {
                self.mode = Mode::Search { buffer: String::new() };
            }
            KeyCode::Char('n') => self.next_match(),
            KeyCode::Char('N') => self.prev_match(),
            KeyCode::Esc => self.search = SearchState::default(),
            _ => {
                let Some(id) = self.id_at(self.cursor) else {
                    return Effect::None;
                };
                match code {
                    KeyCode::Char('v') => {
                        self.mode = Mode::VisualSelect { anchor: self.cursor };
                        self.selection = BTreeSet::from([self.cursor]);
                    }
                    KeyCode::Char('c') | KeyCode::Enter => {
                        self.mode = Mode::InputEdit {
                            buffer: String::new(),
                            targets: vec![id],
                        };
                    }
                    KeyCode::Char('u') => return Effect::Uncategorize { targets: vec![id] },
                    KeyCode::Char('t') => return Effect::MarkTransfer { targets: vec![id] },
                    _ => {}
                }
            }
        }
        Effect::None
    }

    fn visual_key(&mut self, code: KeyCode) -> Effect {
        if self.navigate(code) {
            return Effect::None;
        }
        match code {
            KeyCode::Char('q') => return Effect::Quit,
            KeyCode::Esc | KeyCode::Char('v') => {
                self.mode = Mode::Normal;
                self.clear_selection();
            }
            KeyCode::Char('/') => {
                self.clear_selection();
                self.mode = Mode::Search { buffer: String::new() };
            }
            KeyCode::Char('c') | KeyCode::Enter => {
                self.mode = Mode::InputEdit {
                    buffer: String::new(),
                    targets: self.selected_ids(),
                };
            }
            KeyCode::Char('u') => {
                let targets = self.selected_ids();
                self.mode = Mode::Normal;
                self.clear_selection();
                return Effect::Uncategorize { targets };
            }
            KeyCode::Char('t') => {
                let targets = self.selected_ids();
                self.mode = Mode::Normal;
                self.clear_selection();
                return Effect::MarkTransfer { targets };
            }
            _ => {}
        }
        Effect::None
    }

    fn search_key(&mut self, code: KeyCode) -> Effect {
        match code {
            KeyCode::Char(c) => {
                if let Mode::Search { buffer } = &mut self.mode {
                    buffer.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Mode::Search { buffer } = &mut self.mode {
                    buffer.pop();
                }
            }
            KeyCode::Enter => {
                let mode = std::mem::replace(&mut self.mode, Mode::Normal);
                if let Mode::Search { buffer } = mode {
                    self.run_search(&buffer);
                }
            }
            KeyCode::Esc => {
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        Effect::None
    }

    fn input_key(&mut self, code: KeyCode) -> Effect {
        match code {
            KeyCode::Char(c) => {
                if let Mode::InputEdit { buffer, .. } = &mut self.mode {
                    buffer.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Mode::InputEdit { buffer, .. } = &mut self.mode {
                    buffer.pop();
                }
            }
            KeyCode::Tab => {
                let first = self.suggestions().first().map(|s| s.to_string());
                if let (Some(name), Mode::InputEdit { buffer, .. }) = (first, &mut self.mode) {
                    *buffer = name;
                }
            }
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.clear_selection();
            }
            KeyCode::Enter => return self.submit_category(),
            _ => {}
        }
        Effect::None
    }

    fn submit_category(&mut self) -> Effect {
        let Mode::InputEdit { buffer, targets } = &self.mode else {
            return Effect::None;
        };
        if buffer.trim().is_empty() {
            return Effect::None;
        }
        match resolve(buffer, &self.categories) {
            Some(category) => {
                let effect = Effect::Categorize {
                    targets: targets.clone(),
                    category_id: category.id,
                    name: category.name.clone(),
                };
                self.mode = Mode::Normal;
                self.clear_selection();
                effect
            }
            None => {
                self.status = Some(Status::Error(format!("No match for \"{}\"", buffer.trim())));
                Effect::None
            }
        }
    }

    /// Up to five category names containing the InputEdit buffer.
    pub fn suggestions(&self) -> Vec<&str> {
        match &self.mode {
            Mode::InputEdit { buffer, .. } => suggest(buffer, &self.categories, MAX_SUGGESTIONS),
            _ => vec![],
        }
    }

    fn compute_matches(&self, term: &str) -> Vec<usize> {
        let needle = term.to_lowercase();
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.matches(&needle))
            .map(|(i, _)| i)
            .collect()
    }

    fn run_search(&mut self, term: &str) {
        if term.is_empty() {
            self.search = SearchState::default();
            return;
        }
        let matches = self.compute_matches(term);
        if let Some(&first) = matches.first() {
            self.set_cursor(first);
            self.status = Some(Status::Info(format!("Match 1 of {}", matches.len())));
        } else {
            self.status = Some(Status::Info(format!("No matches for \"{term}\"")));
        }
        self.search = SearchState {
            term: term.to_string(),
            matches,
            current: 0,
        };
    }

    fn jump_to_match(&mut self, current: usize) {
        self.search.current = current;
        let idx = self.search.matches[current];
        self.set_cursor(idx);
        self.status = Some(Status::Info(format!(
            "Match {} of {}",
            current + 1,
            self.search.matches.len()
        )));
    }

    fn next_match(&mut self) {
        let len = self.search.matches.len();
        if len > 0 {
            self.jump_to_match((self.search.current + 1) % len);
        }
    }

    fn prev_match(&mut self) {
        let len = self.search.matches.len();
        if len > 0 {
            self.jump_to_match((self.search.current + len - 1) % len);
        }
    }

    /// Re-read the list from the store. Cursor keeps its position (clamped),
    /// selection is dropped and search hits are recomputed for the same term.
    pub fn reload(&mut self, store: &dyn TransactionStore) -> Result<()> {
        let (rows, categories) = load_rows(store, &self.filter)?;
        self.rows = rows;
        self.categories = categories;
        self.clear_selection();
        let term = std::mem::take(&mut self.search.term);
        if term.is_empty() {
            self.search = SearchState::default();
        } else {
            let matches = self.compute_matches(&term);
            let current = self.search.current.min(matches.len().saturating_sub(1));
            self.search = SearchState { term, matches, current };
        }
        self.set_cursor(self.cursor);
        Ok(())
    }

    fn write(store: &dyn TransactionStore, effect: &Effect) -> Result<()> {
        match effect {
            Effect::Categorize { targets, category_id, .. } => {
                for id in targets {
                    store.set_category(id, *category_id)?;
                }
            }
            Effect::Uncategorize { targets } => {
                for id in targets {
                    store.clear_category(id)?;
                    store.clear_transfer_flag(id)?;
                }
            }
            Effect::MarkTransfer { targets } => {
                for id in targets {
                    store.set_transfer_flag(id)?;
                }
            }
            Effect::None | Effect::Quit => {}
        }
        Ok(())
    }

    /// Carry out a mutation and reload. The list is reloaded even when a
    /// write fails part way so the screen shows what was stored.
    pub fn apply(&mut self, store: &dyn TransactionStore, effect: Effect) -> Result<()> {
        let message = match &effect {
            Effect::Categorize { targets, name, .. } => {
                format!("Set {} transaction(s) to {name}", targets.len())
            }
            Effect::Uncategorize { targets } => {
                format!("Cleared {} transaction(s)", targets.len())
            }
            Effect::MarkTransfer { targets } => {
                format!("Marked {} transaction(s) as transfer", targets.len())
            }
            Effect::None | Effect::Quit => return Ok(()),
        };
        let written = Self::write(store, &effect);
        let reloaded = self.reload(store);
        written?;
        reloaded?;
        info!(action = %message, "Review update");
        self.status = Some(Status::Info(message));
        Ok(())
    }

    pub fn set_error(&mut self, msg: String) {
        self.status = Some(Status::Error(msg));
    }

    fn mode_label(&self) -> &'static str {
        match self.mode {
            Mode::Normal => "NORMAL",
            Mode::VisualSelect { .. } => "VISUAL",
            Mode::Search { .. } => "SEARCH",
            Mode::InputEdit { .. } => "CATEGORY",
        }
    }

    /// Draw the session. Reads state only.
    pub fn render(&self, frame: &mut Frame, theme: &Theme) {
        let area = frame.area();
        let layout = self
            .layout
            .unwrap_or_else(|| TableLayout::compute(area.width, area.height));
        let suggestions = self.suggestions();

        let panel_height: u16 = match &self.mode {
            Mode::InputEdit { .. } => 1 + suggestions.len() as u16,
            Mode::Search { .. } => 1,
            _ => 0,
        };

        let [title_area, table_area, panel_area, status_area, keys_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(panel_height),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let uncategorized = self
            .rows
            .iter()
            .filter(|r| r.txn.category_id.is_none() && !r.txn.is_transfer)
            .count();
        let title = Line::from(vec![
            Span::styled("Categorize transactions", theme.header),
            Span::styled(format!("  [{}]", self.mode_label()), theme.muted),
            Span::styled(format!("  {uncategorized} uncategorized"), theme.muted),
        ]);
        frame.render_widget(Paragraph::new(title), title_area);

        let matches: BTreeSet<usize> = self.search.matches.iter().copied().collect();
        let visible = self
            .rows
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(layout.page_size);
        let rendered_rows: Vec<Row> = visible
            .map(|(i, row)| {
                let marker = if self.selection.contains(&i) { "\u{258c}" } else { " " };
                let category = if row.txn.is_transfer {
                    Span::styled("(transfer)", theme.transfer)
                } else {
                    match &row.category_name {
                        Some(name) => Span::raw(truncate(name, layout.category as usize)),
                        None => Span::styled("\u{2014}", theme.muted),
                    }
                };
                let description = truncate(&row.txn.description, layout.description as usize);
                let description = if matches.contains(&i) {
                    Span::styled(description, theme.search_match)
                } else {
                    Span::raw(description)
                };
                let row_widget = Row::new(vec![
                    Cell::from(marker),
                    Cell::from(row.txn.posted.clone()),
                    Cell::from(description),
                    Cell::from(theme.money_span(row.txn.amount)),
                    Cell::from(truncate(&row.account_name, layout.account as usize)),
                    Cell::from(category),
                ]);
                if self.selection.contains(&i) {
                    row_widget.style(theme.selected)
                } else {
                    row_widget
                }
            })
            .collect();

        let widths = [
            Constraint::Length(MARKER_WIDTH),
            Constraint::Length(DATE_WIDTH),
            Constraint::Length(layout.description),
            Constraint::Length(AMOUNT_WIDTH),
            Constraint::Length(layout.account),
            Constraint::Length(layout.category),
        ];
        let header = Row::new(vec!["", "Date", "Description", "Amount", "Account", "Category"])
            .style(theme.header)
            .bottom_margin(1);
        let table = Table::new(rendered_rows, widths)
            .header(header)
            .column_spacing(1)
            .row_highlight_style(theme.cursor);
        let mut state = TableState::default();
        if !self.rows.is_empty() {
            state.select(Some(self.cursor - self.offset));
        }
        frame.render_stateful_widget(table, table_area, &mut state);

        if panel_height > 0 {
            let lines: Vec<Line> = match &self.mode {
                Mode::Search { buffer } => vec![Line::from(format!("/{buffer}\u{2588}"))],
                Mode::InputEdit { buffer, targets } => {
                    let mut lines = vec![Line::from(format!(
                        "  Category for {} transaction(s): {buffer}\u{2588}",
                        targets.len()
                    ))];
                    for name in &suggestions {
                        lines.push(Line::from(Span::styled(format!("    {name}"), theme.muted)));
                    }
                    lines
                }
                _ => vec![],
            };
            frame.render_widget(Paragraph::new(lines), panel_area);
        }

        let status = match &self.status {
            Some(Status::Error(msg)) => Paragraph::new(msg.as_str()).style(theme.error),
            Some(Status::Info(msg)) => Paragraph::new(msg.as_str()).style(theme.footer),
            None => {
                let mut parts = vec![format!(
                    "Row {} of {}",
                    if self.rows.is_empty() { 0 } else { self.cursor + 1 },
                    self.rows.len()
                )];
                if !self.selection.is_empty() {
                    parts.push(format!("{} selected", self.selection.len()));
                }
                if !self.search.term.is_empty() {
                    parts.push(format!(
                        "/{} ({} matches)",
                        self.search.term,
                        self.search.matches.len()
                    ));
                }
                Paragraph::new(parts.join(" | ")).style(theme.footer)
            }
        };
        frame.render_widget(status, status_area);

        let keys = match &self.mode {
            Mode::Normal => {
                "j/k:move  v:select  c:categorize  u:clear  t:transfer  /:search  n/N:next/prev  q:quit"
            }
            Mode::VisualSelect { .. } => {
                "j/k:extend  c:categorize  u:clear  t:transfer  /:search  Esc:cancel  q:quit"
            }
            Mode::Search { .. } => "Type to search, Enter=find, Esc=cancel",
            Mode::InputEdit { .. } => "Type a category, Tab=complete, Enter=apply, Esc=cancel",
        };
        frame.render_widget(Paragraph::new(keys).style(theme.footer), keys_area);
    }

    pub fn run(&mut self, store: &dyn TransactionStore, theme: &Theme) -> Result<()> {
        install_panic_hook();
        let mut terminal = ratatui::init();
        let result = self.event_loop(&mut terminal, store, theme);
        ratatui::restore();
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut DefaultTerminal,
        store: &dyn TransactionStore,
        theme: &Theme,
    ) -> Result<()> {
        let size = terminal.size()?;
        self.on_resize(size.width, size.height);

        loop {
            terminal.draw(|frame| self.render(frame, theme))?;

            match event::read()? {
                Event::Key(KeyEvent {
                    code,
                    modifiers,
                    kind,
                    ..
                }) => {
                    if kind != KeyEventKind::Press {
                        continue;
                    }
                    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
                        break;
                    }
                    match self.handle_key(code) {
                        Effect::Quit => break,
                        Effect::None => {}
                        effect => {
                            if let Err(e) = self.apply(store, effect) {
                                warn!(error = %e, "Review update failed");
                                self.set_error(format!("Update failed: {e}"));
                            }
                        }
                    }
                }
                Event::Resize(width, height) => self.on_resize(width, height),
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn row(i: usize, description: &str) -> BrowseRow {
        BrowseRow {
            txn: Transaction {
                id: format!("t{i}"),
                account_id: "a1".into(),
                posted: "2025-01-15".into(),
                amount: -450,
                description: description.to_string(),
                is_pending: false,
                is_transfer: false,
                category_id: None,
            },
            account_name: "Checking".into(),
            category_name: None,
        }
    }

    fn categories() -> Vec<Category> {
        ["Dining", "Gas", "Groceries", "Transfer"]
            .iter()
            .enumerate()
            .map(|(i, n)| Category {
                id: i as i64 + 1,
                name: n.to_string(),
                is_internal: *n == "Transfer",
            })
            .collect()
    }

    fn browser_with(descriptions: &[&str]) -> CategoryBrowser {
        let rows = descriptions.iter().enumerate().map(|(i, d)| row(i, d)).collect();
        CategoryBrowser::new(rows, categories(), TransactionFilter::default())
    }

    fn browser(n: usize) -> CategoryBrowser {
        let rows = (0..n).map(|i| row(i, &format!("Transaction {i}"))).collect();
        CategoryBrowser::new(rows, categories(), TransactionFilter::default())
    }

    fn press(b: &mut CategoryBrowser, keys: &str) {
        for c in keys.chars() {
            b.handle_key(KeyCode::Char(c));
        }
    }

    fn set(items: &[usize]) -> BTreeSet<usize> {
        items.iter().copied().collect()
    }

    impl CategoryBrowser {
        pub fn mode(&self) -> &Mode {
            &self.mode
        }

        pub fn cursor(&self) -> usize {
            self.cursor
        }

        pub fn selection(&self) -> &BTreeSet<usize> {
            &self.selection
        }

        pub fn search(&self) -> &SearchState {
            &self.search
        }

        pub fn status(&self) -> Option<&Status> {
            self.status.as_ref()
        }

        pub fn rows(&self) -> &[BrowseRow] {
            &self.rows
        }
    }

    #[test]
    fn test_starts_in_normal() {
        let b = browser(3);
        assert_eq!(b.mode(), &Mode::Normal);
        assert_eq!(b.cursor(), 0);
        assert!(b.selection().is_empty());
    }

    #[test]
    fn test_cursor_moves_and_clamps() {
        let mut b = browser(3);
        b.handle_key(KeyCode::Down);
        press(&mut b, "j");
        assert_eq!(b.cursor(), 2);
        b.handle_key(KeyCode::Down);
        assert_eq!(b.cursor(), 2);
        press(&mut b, "kkk");
        assert_eq!(b.cursor(), 0);
        press(&mut b, "G");
        assert_eq!(b.cursor(), 2);
        press(&mut b, "g");
        assert_eq!(b.cursor(), 0);
    }

    #[test]
    fn test_visual_range_follows_cursor() {
        let mut b = browser(10);
        press(&mut b, "jjj");
        press(&mut b, "v");
        assert_eq!(b.mode(), &Mode::VisualSelect { anchor: 3 });
        assert_eq!(b.selection(), &set(&[3]));
        press(&mut b, "jjjj");
        assert_eq!(b.cursor(), 7);
        assert_eq!(b.selection(), &set(&[3, 4, 5, 6, 7]));
        press(&mut b, "kkkkkk");
        assert_eq!(b.cursor(), 1);
        assert_eq!(b.selection(), &set(&[1, 2, 3]));
    }

    #[test]
    fn test_visual_cancel_clears_selection() {
        let mut b = browser(5);
        press(&mut b, "vjj");
        b.handle_key(KeyCode::Esc);
        assert_eq!(b.mode(), &Mode::Normal);
        assert!(b.selection().is_empty());
    }

    #[test]
    fn test_visual_categorize_targets_selection() {
        let mut b = browser(6);
        press(&mut b, "jvjj");
        press(&mut b, "c");
        match b.mode() {
            Mode::InputEdit { targets, buffer } => {
                assert_eq!(targets, &vec!["t1".to_string(), "t2".into(), "t3".into()]);
                assert!(buffer.is_empty());
            }
            other => panic!("expected InputEdit, got {other:?}"),
        }
    }

    #[test]
    fn test_visual_uncategorize_returns_to_normal() {
        let mut b = browser(6);
        press(&mut b, "vj");
        let effect = b.handle_key(KeyCode::Char('u'));
        assert_eq!(
            effect,
            Effect::Uncategorize { targets: vec!["t0".into(), "t1".into()] }
        );
        assert_eq!(b.mode(), &Mode::Normal);
        assert!(b.selection().is_empty());
    }

    #[test]
    fn test_visual_search_clears_selection() {
        let mut b = browser(6);
        press(&mut b, "vjj/");
        assert_eq!(b.mode(), &Mode::Search { buffer: String::new() });
        assert!(b.selection().is_empty());
    }

    #[test]
    fn test_normal_uncategorize_and_transfer_target_cursor() {
        let mut b = browser(4);
        press(&mut b, "jj");
        assert_eq!(
            b.handle_key(KeyCode::Char('u')),
            Effect::Uncategorize { targets: vec!["t2".into()] }
        );
        assert_eq!(
            b.handle_key(KeyCode::Char('t')),
            Effect::MarkTransfer { targets: vec!["t2".into()] }
        );
        assert_eq!(b.mode(), &Mode::Normal);
    }

    #[test]
    fn test_quit() {
        let mut b = browser(2);
        assert_eq!(b.handle_key(KeyCode::Char('q')), Effect::Quit);
        let mut b = browser(2);
        press(&mut b, "v");
        assert_eq!(b.handle_key(KeyCode::Char('q')), Effect::Quit);
    }

    #[test]
    fn test_q_is_text_while_typing() {
        let mut b = browser(2);
        press(&mut b, "/q");
        assert_eq!(b.mode(), &Mode::Search { buffer: "q".into() });

        let mut b = browser(2);
        press(&mut b, "c");
        assert_eq!(b.handle_key(KeyCode::Char('q')), Effect::None);
        assert!(matches!(b.mode(), Mode::InputEdit { buffer, .. } if buffer == "q"));
    }

    #[test]
    fn test_search_and_cycle_matches() {
        let mut b = browser_with(&["Safeway", "Shell Gas", "Salary"]);
        press(&mut b, "/sa");
        b.handle_key(KeyCode::Enter);
        assert_eq!(b.mode(), &Mode::Normal);
        assert_eq!(b.search().matches, vec![0, 2]);
        assert_eq!(b.cursor(), 0);
        assert!(b.compute_matches("SA").contains(&0));
        // "Starbucks" has no "sa" run, so it is not a hit
        let b2 = browser_with(&["Starbucks"]);
        assert!(b2.compute_matches("sa").is_empty());
        press(&mut b, "n");
        assert_eq!(b.search().current, 1);
        assert_eq!(b.cursor(), 2);
        press(&mut b, "n");
        assert_eq!(b.search().current, 0);
        assert_eq!(b.cursor(), 0);
        press(&mut b, "N");
        assert_eq!(b.cursor(), 2);
    }

    #[test]
    fn test_search_jumps_to_first_match() {
        let mut b = browser_with(&["Coffee", "Rent", "Coffee again", "Payroll"]);
        press(&mut b, "/PAY");
        b.handle_key(KeyCode::Enter);
        assert_eq!(b.cursor(), 3);
        assert_eq!(b.search().term, "PAY");
    }

    #[test]
    fn test_search_matches_amount_account_and_category() {
        let mut b = browser_with(&["One", "Two", "Three"]);
        b.rows[1].txn.amount = -1234;
        b.rows[2].account_name = "Vacation Fund".into();
        b.rows[0].category_name = Some("Groceries".into());
        assert_eq!(b.compute_matches("-12.34"), vec![1]);
        assert_eq!(b.compute_matches("vacation"), vec![2]);
        assert_eq!(b.compute_matches("grocer"), vec![0]);
    }

    #[test]
    fn test_search_backspace_and_escape() {
        let mut b = browser_with(&["Alpha", "Beta", "Gamma"]);
        press(&mut b, "jj/bx");
        b.handle_key(KeyCode::Backspace);
        assert_eq!(b.mode(), &Mode::Search { buffer: "b".into() });
        b.handle_key(KeyCode::Esc);
        assert_eq!(b.mode(), &Mode::Normal);
        assert_eq!(b.cursor(), 2);
        assert!(b.search().matches.is_empty());
        // a new search starts from an empty buffer
        press(&mut b, "/");
        assert_eq!(b.mode(), &Mode::Search { buffer: String::new() });
    }

    #[test]
    fn test_search_without_matches_keeps_cursor() {
        let mut b = browser_with(&["Alpha", "Beta"]);
        press(&mut b, "j/zzz");
        b.handle_key(KeyCode::Enter);
        assert_eq!(b.cursor(), 1);
        assert!(matches!(b.status(), Some(Status::Info(m)) if m.contains("No matches")));
        press(&mut b, "n");
        assert_eq!(b.cursor(), 1);
    }

    #[test]
    fn test_input_edit_suggestions() {
        let mut b = browser(2);
        press(&mut b, "cg");
        assert_eq!(b.suggestions(), vec!["Dining", "Gas", "Groceries"]);
        press(&mut b, "r");
        assert_eq!(b.suggestions(), vec!["Groceries"]);
        b.handle_key(KeyCode::Backspace);
        b.handle_key(KeyCode::Backspace);
        assert!(b.suggestions().is_empty());
    }

    #[test]
    fn test_input_edit_resolves_and_applies() {
        let mut b = browser(3);
        press(&mut b, "jcgroc");
        let effect = b.handle_key(KeyCode::Enter);
        assert_eq!(
            effect,
            Effect::Categorize {
                targets: vec!["t1".into()],
                category_id: 3,
                name: "Groceries".into(),
            }
        );
        assert_eq!(b.mode(), &Mode::Normal);
    }

    #[test]
    fn test_input_edit_no_match_stays() {
        let mut b = browser(3);
        press(&mut b, "cxyz");
        assert_eq!(b.handle_key(KeyCode::Enter), Effect::None);
        assert!(matches!(b.mode(), Mode::InputEdit { buffer, .. } if buffer == "xyz"));
        assert!(matches!(b.status(), Some(Status::Error(m)) if m.contains("xyz")));
    }

    #[test]
    fn test_input_edit_empty_enter_does_nothing() {
        let mut b = browser(3);
        press(&mut b, "c");
        assert_eq!(b.handle_key(KeyCode::Enter), Effect::None);
        assert!(matches!(b.mode(), Mode::InputEdit { .. }));
    }

    #[test]
    fn test_input_edit_escape_discards() {
        let mut b = browser(5);
        press(&mut b, "vjcgas");
        b.handle_key(KeyCode::Esc);
        assert_eq!(b.mode(), &Mode::Normal);
        assert!(b.selection().is_empty());
    }

    #[test]
    fn test_input_edit_tab_completes() {
        let mut b = browser(1);
        press(&mut b, "ctran");
        b.handle_key(KeyCode::Tab);
        assert!(matches!(b.mode(), Mode::InputEdit { buffer, .. } if buffer == "Transfer"));
    }

    #[test]
    fn test_empty_list_ignores_actions() {
        let mut b = browser(0);
        for c in ['v', 'c', 'u', 't', 'j'] {
            assert_eq!(b.handle_key(KeyCode::Char(c)), Effect::None);
        }
        assert_eq!(b.mode(), &Mode::Normal);
    }

    #[test]
    fn test_layout_computed_once() {
        let mut b = browser(100);
        b.on_resize(120, 40);
        let first = b.layout;
        b.on_resize(60, 10);
        assert_eq!(b.layout, first);
        let layout = first.unwrap();
        assert_eq!(layout.page_size, 40 - CHROME_HEIGHT as usize);
        assert!(layout.description >= MIN_DESCRIPTION);
    }

    #[test]
    fn test_layout_minimums_and_page_clamp() {
        let layout = TableLayout::compute(20, 3);
        assert_eq!(layout.description, MIN_DESCRIPTION);
        assert_eq!(layout.account, MIN_ACCOUNT);
        assert_eq!(layout.category, MIN_CATEGORY);
        assert_eq!(layout.page_size, 5);
        assert_eq!(TableLayout::compute(200, 1000).page_size, 200);
    }

    #[test]
    fn test_paging_keeps_cursor_visible() {
        let mut b = browser(100);
        b.on_resize(120, 5 + CHROME_HEIGHT);
        b.handle_key(KeyCode::PageDown);
        assert_eq!(b.cursor(), 5);
        assert_eq!(b.offset, 1);
        press(&mut b, "G");
        assert_eq!(b.offset, 95);
        press(&mut b, "g");
        assert_eq!(b.offset, 0);
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_render_shows_rows_and_suggestions() {
        let mut b = browser_with(&["WHOLE FOODS", "SHELL OIL"]);
        b.on_resize(120, 30);
        press(&mut b, "cgr");
        let theme = Theme::default();
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| b.render(frame, &theme)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("WHOLE FOODS"));
        assert!(text.contains("SHELL OIL"));
        assert!(text.contains("[CATEGORY]"));
        assert!(text.contains("Groceries"));
    }

    #[test]
    fn test_render_is_repeatable() {
        let mut b = browser(30);
        b.on_resize(100, 25);
        press(&mut b, "jjvj");
        let theme = Theme::default();
        let mut first = Terminal::new(TestBackend::new(100, 25)).unwrap();
        let mut second = Terminal::new(TestBackend::new(100, 25)).unwrap();
        first.draw(|frame| b.render(frame, &theme)).unwrap();
        second.draw(|frame| b.render(frame, &theme)).unwrap();
        assert_eq!(first.backend().buffer(), second.backend().buffer());
        assert!(buffer_text(&first).contains("2 selected"));
    }

    fn seeded() -> (tempfile::TempDir, crate::store::SqliteStore) {
        let (dir, store) = test_store();
        add_account(&store, "a1", "CHASE CHECKING", Some("Everyday"));
        add_txn(&store, "t1", "a1", "2025-01-03", "WHOLE FOODS", -8421);
        add_txn(&store, "t2", "a1", "2025-01-02", "SAFEWAY", -4200);
        add_txn(&store, "t3", "a1", "2025-01-01", "ONLINE TRANSFER", -50000);
        (dir, store)
    }

    #[test]
    fn test_load_resolves_names() {
        let (_dir, store) = seeded();
        let b = CategoryBrowser::load(&store, TransactionFilter::default()).unwrap();
        assert_eq!(b.rows().len(), 3);
        assert_eq!(b.rows()[0].account_name, "Everyday");
        assert_eq!(b.rows()[0].txn.id, "t1");
        assert!(b.rows()[0].category_name.is_none());
    }

    #[test]
    fn test_categorize_selection_writes_and_reloads() {
        let (_dir, store) = seeded();
        let mut b = CategoryBrowser::load(&store, TransactionFilter::default()).unwrap();
        press(&mut b, "vjcgroceries");
        let effect = b.handle_key(KeyCode::Enter);
        b.apply(&store, effect).unwrap();

        let groceries = store.get_or_create_category("Groceries").unwrap();
        assert_eq!(category_of(&store, "t1"), Some(groceries));
        assert_eq!(category_of(&store, "t2"), Some(groceries));
        assert_eq!(category_of(&store, "t3"), None);
        assert_eq!(b.rows()[0].category_name.as_deref(), Some("Groceries"));
        assert!(b.selection().is_empty());
        assert_eq!(b.mode(), &Mode::Normal);
        assert!(matches!(b.status(), Some(Status::Info(m)) if m.contains("Groceries")));
    }

    #[test]
    fn test_uncategorize_clears_transfer_and_category() {
        let (_dir, store) = seeded();
        store.set_transfer_flag("t3").unwrap();
        store.set_category("t3", store.get_or_create_category("Transfer").unwrap()).unwrap();
        let mut b = CategoryBrowser::load(&store, TransactionFilter::default()).unwrap();
        press(&mut b, "G");
        let effect = b.handle_key(KeyCode::Char('u'));
        b.apply(&store, effect).unwrap();
        assert_eq!(category_of(&store, "t3"), None);
        assert!(!is_transfer(&store, "t3"));
        assert!(!b.rows()[2].txn.is_transfer);
    }

    #[test]
    fn test_mark_transfer_from_session() {
        let (_dir, store) = seeded();
        let mut b = CategoryBrowser::load(&store, TransactionFilter::default()).unwrap();
        press(&mut b, "G");
        let effect = b.handle_key(KeyCode::Char('t'));
        b.apply(&store, effect).unwrap();
        assert!(is_transfer(&store, "t3"));
        assert!(b.rows()[2].txn.is_transfer);
        assert_eq!(b.cursor(), 2);
    }

    #[test]
    fn test_failed_write_reports_and_keeps_session() {
        let (_dir, store) = seeded();
        let mut b = CategoryBrowser::load(&store, TransactionFilter::default()).unwrap();
        let effect = Effect::MarkTransfer { targets: vec!["missing".into()] };
        assert!(b.apply(&store, effect).is_err());
        assert_eq!(b.rows().len(), 3);
    }

    #[test]
    fn test_reload_recomputes_search_by_position() {
        let (_dir, store) = seeded();
        let mut b = CategoryBrowser::load(&store, TransactionFilter::default()).unwrap();
        press(&mut b, "/safeway");
        b.handle_key(KeyCode::Enter);
        assert_eq!(b.search().matches, vec![1]);
        add_txn(&store, "t0", "a1", "2025-02-01", "SAFEWAY FUEL", -3000);
        b.reload(&store).unwrap();
        assert_eq!(b.search().matches, vec![0, 2]);
        assert_eq!(b.cursor(), 1);
    }
}
