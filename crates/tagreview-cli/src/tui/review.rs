//! Review table view.
//!
//! Full-screen table of tag mappings in frequency order with:
//! - stats header and action filter
//! - right-side detail pane with the AI's reasoning and notes
//! - note editor modal
//! - transient save toast in the status bar
//! - key bindings: j/k move, a/x/u set action, space cycle, n note, s save,
//!   r reload, f filter, enter detail, q quit

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use std::time::{Duration, Instant};
use tagreview_core::model::{Action, RowId, TagMapping};
use tagreview_core::session::{Phase, RowView, ToastKind};
use tagreview_core::store::RemoteStore;
use tagreview_core::{Reconciler, ReviewError, ReviewEvent, ReviewSession};

const STATUS_MSG_TTL: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Filters and modes
// ---------------------------------------------------------------------------

/// Which rows the table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowFilter {
    #[default]
    All,
    Approved,
    Rejected,
    Unset,
    /// Rows with unsaved edits.
    Pending,
}

impl RowFilter {
    const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Unset => "unset",
            Self::Pending => "pending",
        }
    }

    const fn next(self) -> Self {
        match self {
            Self::All => Self::Approved,
            Self::Approved => Self::Rejected,
            Self::Rejected => Self::Unset,
            Self::Unset => Self::Pending,
            Self::Pending => Self::All,
        }
    }

    fn matches(self, view: &RowView<'_>) -> bool {
        match self {
            Self::All => true,
            Self::Approved => view.row.action == Action::Approved,
            Self::Rejected => view.row.action == Action::Reject,
            Self::Unset => view.row.action.is_unset(),
            Self::Pending => view.has_changes,
        }
    }
}

/// Operation waiting on a y/n answer because it would drop unsaved edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Confirm {
    Quit,
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum InputMode {
    #[default]
    Normal,
    NoteModal,
    Confirm(Confirm),
}

// ---------------------------------------------------------------------------
// Note editor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteAction {
    None,
    Submit,
    Cancel,
}

/// Multiline editor for one row's notes. Cursor positions are in chars.
#[derive(Debug, Clone)]
struct NoteModalState {
    id: RowId,
    lines: Vec<String>,
    row: usize,
    col: usize,
}

impl NoteModalState {
    fn open(id: RowId, text: &str) -> Self {
        let lines: Vec<String> = if text.is_empty() {
            vec![String::new()]
        } else {
            text.split('\n').map(str::to_string).collect()
        };
        let row = lines.len() - 1;
        let col = char_len(&lines[row]);
        Self {
            id,
            lines,
            row,
            col,
        }
    }

    fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn handle_key(&mut self, key: KeyEvent) -> NoteAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => NoteAction::Cancel,
            KeyCode::Char('s') | KeyCode::Enter if ctrl => NoteAction::Submit,
            _ => {
                self.edit(key.code);
                NoteAction::None
            }
        }
    }

    fn edit(&mut self, code: KeyCode) {
        let line_len = char_len(&self.lines[self.row]);
        match code {
            KeyCode::Left if self.col > 0 => self.col -= 1,
            KeyCode::Left if self.row > 0 => {
                self.row -= 1;
                self.col = char_len(&self.lines[self.row]);
            }
            KeyCode::Right if self.col < line_len => self.col += 1,
            KeyCode::Right if self.row + 1 < self.lines.len() => {
                self.row += 1;
                self.col = 0;
            }
            KeyCode::Up if self.row > 0 => {
                self.row -= 1;
                self.col = self.col.min(char_len(&self.lines[self.row]));
            }
            KeyCode::Down if self.row + 1 < self.lines.len() => {
                self.row += 1;
                self.col = self.col.min(char_len(&self.lines[self.row]));
            }
            KeyCode::Home => self.col = 0,
            KeyCode::End => self.col = line_len,
            KeyCode::Enter => {
                let at = byte_index(&self.lines[self.row], self.col);
                let tail = self.lines[self.row].split_off(at);
                self.row += 1;
                self.col = 0;
                self.lines.insert(self.row, tail);
            }
            KeyCode::Backspace if self.col > 0 => {
                self.col -= 1;
                let line = &mut self.lines[self.row];
                let start = byte_index(line, self.col);
                let end = byte_index(line, self.col + 1);
                line.replace_range(start..end, "");
            }
            KeyCode::Backspace if self.row > 0 => {
                let current = self.lines.remove(self.row);
                self.row -= 1;
                self.col = char_len(&self.lines[self.row]);
                self.lines[self.row].push_str(&current);
            }
            KeyCode::Delete if self.col < line_len => {
                let line = &mut self.lines[self.row];
                let start = byte_index(line, self.col);
                let end = byte_index(line, self.col + 1);
                line.replace_range(start..end, "");
            }
            KeyCode::Delete if self.row + 1 < self.lines.len() => {
                let next = self.lines.remove(self.row + 1);
                self.lines[self.row].push_str(&next);
            }
            KeyCode::Char(ch) => {
                let at = byte_index(&self.lines[self.row], self.col);
                self.lines[self.row].insert(at, ch);
                self.col += 1;
            }
            _ => {}
        }
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn byte_index(value: &str, char_idx: usize) -> usize {
    value
        .char_indices()
        .nth(char_idx)
        .map_or(value.len(), |(idx, _)| idx)
}

fn with_cursor(value: &str, char_idx: usize) -> String {
    let at = byte_index(value, char_idx);
    format!("{}█{}", &value[..at], &value[at..])
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

pub struct ReviewView<S: RemoteStore> {
    store: S,
    reconciler: Reconciler,
    session: ReviewSession,
    toast_ttl: Duration,
    filter: RowFilter,
    /// Ids of rows passing the filter, in table order.
    visible: Vec<RowId>,
    table_state: TableState,
    input_mode: InputMode,
    note_modal: Option<NoteModalState>,
    show_detail: bool,
    should_quit: bool,
    status_msg: Option<(String, Instant)>,
    /// Number of rows in a save requested but not yet dispatched.
    pending_save: Option<usize>,
}

impl<S: RemoteStore> ReviewView<S> {
    pub fn new(store: S, reconciler: Reconciler, toast_ttl: Duration) -> Self {
        Self {
            store,
            reconciler,
            session: ReviewSession::new(),
            toast_ttl,
            filter: RowFilter::default(),
            visible: Vec::new(),
            table_state: TableState::default(),
            input_mode: InputMode::Normal,
            note_modal: None,
            show_detail: false,
            should_quit: false,
            status_msg: None,
            pending_save: None,
        }
    }

    /// Fetch all rows, discarding any pending edits.
    pub fn reload(&mut self) {
        self.dispatch(ReviewEvent::Reload);
        if *self.session.phase() == Phase::Ready {
            self.table_state.select(if self.visible.is_empty() { None } else { Some(0) });
        }
    }

    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// A save was requested and waits for [`Self::run_pending_save`].
    pub const fn has_pending_save(&self) -> bool {
        self.pending_save.is_some()
    }

    /// Dispatch the requested save. Call after a frame showing the saving
    /// status has been drawn; the store calls block until all complete.
    pub fn run_pending_save(&mut self) {
        if self.pending_save.take().is_some() {
            self.dispatch(ReviewEvent::Save);
        }
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_msg = Some((msg.into(), Instant::now()));
    }

    /// Expire the save toast.
    pub fn tick(&mut self) {
        if self
            .session
            .toast()
            .is_some_and(|toast| toast.is_expired(self.toast_ttl))
        {
            self.dispatch(ReviewEvent::DismissToast);
        }
    }

    fn dispatch(&mut self, event: ReviewEvent) {
        match self.session.apply(event, &self.store, &self.reconciler) {
            // Surfaced through the toast or the error page.
            Ok(()) | Err(ReviewError::Save { .. } | ReviewError::Load(_)) => {}
            Err(err) => self.set_status(err.to_string()),
        }
        self.refresh_visible();
    }

    fn refresh_visible(&mut self) {
        let selected_id = self.selected_id();
        let visible: Vec<RowId> = self
            .session
            .row_views()
            .filter(|view| self.filter.matches(view))
            .map(|view| view.row.id)
            .collect();
        self.visible = visible;

        if self.visible.is_empty() {
            self.table_state.select(None);
            return;
        }
        let last = self.visible.len() - 1;
        let index = selected_id
            .and_then(|id| self.visible.iter().position(|&v| v == id))
            .or_else(|| self.table_state.selected().map(|idx| idx.min(last)))
            .unwrap_or(0);
        self.table_state.select(Some(index));
    }

    fn selected_id(&self) -> Option<RowId> {
        self.table_state
            .selected()
            .and_then(|idx| self.visible.get(idx).copied())
    }

    fn selected_row(&self) -> Option<&TagMapping> {
        self.selected_id().and_then(|id| self.session.row(id))
    }

    fn select_by(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        let next = current
            .saturating_add_signed(delta)
            .min(self.visible.len() - 1);
        self.table_state.select(Some(next));
    }

    fn select_first(&mut self) {
        if !self.visible.is_empty() {
            self.table_state.select(Some(0));
        }
    }

    fn select_last(&mut self) {
        if !self.visible.is_empty() {
            self.table_state.select(Some(self.visible.len() - 1));
        }
    }

    fn set_selected_action(&mut self, choose: impl FnOnce(Action) -> Action) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let id = row.id;
        let action = choose(row.action);
        self.dispatch(ReviewEvent::SetAction { id, action });
    }

    fn open_note_modal(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        self.note_modal = Some(NoteModalState::open(row.id, row.notes_text()));
        self.input_mode = InputMode::NoteModal;
    }

    fn save(&mut self) {
        if self.session.tracker().is_empty() {
            self.set_status("No changes to save");
            return;
        }
        if self.session.toast().is_some() {
            self.dispatch(ReviewEvent::DismissToast);
        }
        self.pending_save = Some(self.session.tracker().len());
    }

    /// Run `confirm` now, or ask first when it would drop unsaved edits.
    fn guarded(&mut self, confirm: Confirm) {
        if self.session.tracker().is_empty() {
            self.run_confirmed(confirm);
        } else {
            self.input_mode = InputMode::Confirm(confirm);
        }
    }

    fn run_confirmed(&mut self, confirm: Confirm) {
        self.input_mode = InputMode::Normal;
        match confirm {
            Confirm::Quit => self.should_quit = true,
            Confirm::Reload => self.reload(),
        }
    }

    // -----------------------------------------------------------------------
    // Key handling
    // -----------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.input_mode {
            InputMode::NoteModal => self.handle_note_modal_key(key),
            InputMode::Confirm(confirm) => self.handle_confirm_key(key, confirm),
            InputMode::Normal if *self.session.phase() == Phase::Ready => {
                self.handle_normal_key(key);
            }
            InputMode::Normal => self.handle_error_page_key(key),
        }
    }

    fn handle_error_page_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, confirm: Confirm) {
        match key.code {
            KeyCode::Char('y' | 'Y') => self.run_confirmed(confirm),
            KeyCode::Char('n' | 'N') | KeyCode::Esc => self.input_mode = InputMode::Normal,
            _ => {}
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.guarded(Confirm::Quit),
            KeyCode::Char('r') => self.guarded(Confirm::Reload),

            KeyCode::Char('j') | KeyCode::Down => self.select_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.select_by(-1),
            KeyCode::PageDown => self.select_by(10),
            KeyCode::PageUp => self.select_by(-10),
            KeyCode::Char('g') | KeyCode::Home => self.select_first(),
            KeyCode::Char('G') | KeyCode::End => self.select_last(),

            KeyCode::Char('a') => self.set_selected_action(|_| Action::Approved),
            KeyCode::Char('x') => self.set_selected_action(|_| Action::Reject),
            KeyCode::Char('u') => self.set_selected_action(|_| Action::Unset),
            KeyCode::Char(' ') => self.set_selected_action(Action::cycle),
            KeyCode::Char('n') => self.open_note_modal(),
            KeyCode::Char('s') => self.save(),

            KeyCode::Char('f') => {
                self.filter = self.filter.next();
                self.refresh_visible();
            }
            KeyCode::Enter => self.show_detail = !self.show_detail,
            KeyCode::Esc => self.show_detail = false,
            _ => {}
        }
    }

    fn handle_note_modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.note_modal.as_mut() else {
            self.input_mode = InputMode::Normal;
            return;
        };

        match modal.handle_key(key) {
            NoteAction::None => {}
            NoteAction::Cancel => {
                self.note_modal = None;
                self.input_mode = InputMode::Normal;
            }
            NoteAction::Submit => {
                let id = modal.id;
                let notes = modal.text();
                self.note_modal = None;
                self.input_mode = InputMode::Normal;
                self.dispatch(ReviewEvent::SetNotes { id, notes });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    pub fn render(&mut self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        match self.session.phase().clone() {
            Phase::Loading => render_loading(frame, chunks[0]),
            Phase::LoadFailed(message) => render_error_page(frame, &message, chunks[0]),
            Phase::Ready => self.render_table_and_detail(frame, chunks[0]),
        }

        let status = build_status_bar(self, chunks[1].width);
        frame.render_widget(Paragraph::new(status).alignment(Alignment::Left), chunks[1]);

        match self.input_mode {
            InputMode::NoteModal => render_note_modal(frame, self, area),
            InputMode::Confirm(confirm) => render_confirm(frame, self, confirm, area),
            InputMode::Normal => {}
        }
    }

    fn render_table_and_detail(&mut self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(3)])
            .split(area);
        frame.render_widget(Paragraph::new(stats_line(self)), chunks[0]);

        let panes = if self.show_detail {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
                .split(chunks[1])
        } else {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(100), Constraint::Percentage(0)])
                .split(chunks[1])
        };

        let rows: Vec<Row<'static>> = self
            .visible
            .iter()
            .filter_map(|&id| self.session.row(id).map(|row| (row, self.session.has_changes(id))))
            .map(|(row, dirty)| build_row(row, dirty))
            .collect();

        let header = Row::new(["", "Old Tag", "New Tag", "Freq", "AI", "AI Name", "Action"])
            .style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );
        let widths = [
            Constraint::Length(1),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Length(6),
            Constraint::Percentage(15),
            Constraint::Percentage(20),
            Constraint::Length(9),
        ];
        let title = format!(
            " tagreview: {} of {} rows  [filter: {}] ",
            self.visible.len(),
            self.session.rows().len(),
            self.filter.label()
        );
        let table = Table::new(rows, widths)
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_set(border::ROUNDED)
                    .border_style(Style::default().fg(if self.show_detail {
                        Color::DarkGray
                    } else {
                        Color::Green
                    }))
                    .title(title)
                    .title_style(
                        Style::default()
                            .fg(Color::White)
                            .add_modifier(Modifier::BOLD),
                    ),
            )
            .row_highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(" ");
        frame.render_stateful_widget(table, panes[0], &mut self.table_state);

        if self.show_detail && panes[1].width > 0 {
            render_detail_panel(frame, self, panes[1]);
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering helpers
// ---------------------------------------------------------------------------

const fn action_color(action: Action) -> Color {
    match action {
        Action::Approved => Color::Green,
        Action::Reject => Color::Red,
        Action::Unset => Color::DarkGray,
    }
}

fn text_or_blank(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn build_row(row: &TagMapping, dirty: bool) -> Row<'static> {
    Row::new(vec![
        Cell::from(Span::styled(
            if dirty { "●" } else { " " },
            Style::default().fg(Color::Yellow),
        )),
        Cell::from(text_or_blank(row.old_tag.as_deref())),
        Cell::from(text_or_blank(row.new_tag.as_deref())),
        Cell::from(row.frequency.map_or_else(String::new, |f| f.to_string())),
        Cell::from(text_or_blank(row.ai_suggestion.as_deref())),
        Cell::from(text_or_blank(row.ai_new_name.as_deref())),
        Cell::from(Span::styled(
            row.action.to_string(),
            Style::default().fg(action_color(row.action)),
        )),
    ])
}

fn stats_line<S: RemoteStore>(app: &ReviewView<S>) -> Line<'static> {
    let stats = app.session.stats();
    let label = Style::default().fg(Color::DarkGray);
    let mut spans = vec![
        Span::styled(" total ", label),
        Span::raw(stats.total.to_string()),
        Span::styled("  approved ", label),
        Span::styled(stats.approved.to_string(), Style::default().fg(Color::Green)),
        Span::styled("  rejected ", label),
        Span::styled(stats.rejected.to_string(), Style::default().fg(Color::Red)),
        Span::styled("  unset ", label),
        Span::raw(stats.unset.to_string()),
    ];
    if stats.pending > 0 {
        spans.push(Span::styled("  unsaved ", label));
        spans.push(Span::styled(
            stats.pending.to_string(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn render_loading(frame: &mut ratatui::Frame<'_>, area: Rect) {
    frame.render_widget(
        Paragraph::new("Loading tag mappings...")
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_set(border::ROUNDED)
                    .border_style(Style::default().fg(Color::DarkGray)),
            ),
        area,
    );
}

fn render_error_page(frame: &mut ratatui::Frame<'_>, message: &str, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("r", Style::default().fg(Color::Cyan)),
            Span::styled(" retry  ", Style::default().fg(Color::DarkGray)),
            Span::styled("q", Style::default().fg(Color::Cyan)),
            Span::styled(" quit", Style::default().fg(Color::DarkGray)),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_set(border::ROUNDED)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" Error "),
            ),
        area,
    );
}

fn detail_lines(row: &TagMapping, dirty: bool) -> Vec<Line<'static>> {
    let heading = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);
    let label = Style::default().fg(Color::DarkGray);
    let field = |name: &'static str, value: Option<&str>| {
        Line::from(vec![
            Span::styled(format!("{name:<14}"), label),
            Span::raw(text_or_blank(value)),
        ])
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!(
                "{} -> {}",
                text_or_blank(row.old_tag.as_deref()),
                text_or_blank(row.new_tag.as_deref())
            ),
            heading,
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("{:<14}", "Action"), label),
            Span::styled(
                row.action.to_string(),
                Style::default().fg(action_color(row.action)),
            ),
            Span::styled(
                if dirty { "  (unsaved)" } else { "" },
                Style::default().fg(Color::Yellow),
            ),
        ]),
        field("AI suggestion", row.ai_suggestion.as_deref()),
        field("AI new name", row.ai_new_name.as_deref()),
        Line::from(""),
        Line::from(Span::styled("Reasoning", heading)),
    ];
    lines.extend(
        row.ai_reasoning
            .as_deref()
            .unwrap_or("-")
            .lines()
            .map(|line| Line::from(line.to_string())),
    );
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Notes", heading)));
    if row.notes_text().is_empty() {
        lines.push(Line::from(Span::styled("(none, press n to add)", label)));
    } else {
        lines.extend(row.notes_text().lines().map(|line| Line::from(line.to_string())));
    }
    lines
}

fn render_detail_panel<S: RemoteStore>(frame: &mut ratatui::Frame<'_>, app: &ReviewView<S>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(Color::Green))
        .title(" Detail ");
    let lines = app.selected_row().map_or_else(
        || vec![Line::from("No row selected")],
        |row| detail_lines(row, app.session.has_changes(row.id)),
    );
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    )
}

fn render_note_modal<S: RemoteStore>(frame: &mut ratatui::Frame<'_>, app: &ReviewView<S>, area: Rect) {
    let Some(modal) = app.note_modal.as_ref() else {
        return;
    };
    let modal_area = centered(area, area.width.saturating_sub(8).min(80), 12);
    frame.render_widget(Clear, modal_area);

    let title = app.session.row(modal.id).map_or_else(
        || format!(" Notes #{} ", modal.id),
        |row| format!(" Notes: {} ", text_or_blank(row.old_tag.as_deref())),
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(Color::Green))
        .title(title)
        .title_style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    let lines: Vec<Line<'static>> = modal
        .lines
        .iter()
        .enumerate()
        .map(|(row, line)| {
            if row == modal.row {
                Line::from(with_cursor(line, modal.col))
            } else {
                Line::from(line.clone())
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), chunks[0]);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Ctrl+S", Style::default().fg(Color::Cyan)),
            Span::styled(" keep  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Esc", Style::default().fg(Color::Cyan)),
            Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
        ])),
        chunks[1],
    );
}

fn render_confirm<S: RemoteStore>(
    frame: &mut ratatui::Frame<'_>,
    app: &ReviewView<S>,
    confirm: Confirm,
    area: Rect,
) {
    let verb = match confirm {
        Confirm::Quit => "Quit",
        Confirm::Reload => "Reload",
    };
    let question = format!(
        "{verb} and discard {} unsaved change(s)?",
        app.session.tracker().len()
    );
    let popup = centered(area, (question.chars().count() + 6).try_into().unwrap_or(u16::MAX), 5);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(vec![
            Line::from(question),
            Line::from(vec![
                Span::styled("y", Style::default().fg(Color::Cyan)),
                Span::styled(" yes  ", Style::default().fg(Color::DarkGray)),
                Span::styled("n", Style::default().fg(Color::Cyan)),
                Span::styled(" no", Style::default().fg(Color::DarkGray)),
            ]),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Unsaved changes "),
        ),
        popup,
    );
}

fn build_status_bar<S: RemoteStore>(app: &ReviewView<S>, width: u16) -> Line<'static> {
    if let Some(count) = app.pending_save {
        return Line::from(Span::styled(
            format!("Saving {count} change(s)..."),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(toast) = app.session.toast() {
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
        };
        return Line::from(Span::styled(
            toast.message.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }
    if let Some((ref msg, at)) = app.status_msg
        && at.elapsed() < STATUS_MSG_TTL
    {
        return Line::from(Span::styled(msg.clone(), Style::default().fg(Color::Cyan)));
    }

    let key_style = Style::default().fg(Color::Cyan);
    let dim_style = Style::default().fg(Color::DarkGray);
    let hints: &[(&str, &str)] = match (app.input_mode, app.session.phase()) {
        (InputMode::NoteModal, _) => &[("CTRL+S", "keep note"), ("ESC", "cancel")],
        (InputMode::Confirm(_), _) => &[("y", "discard"), ("n/ESC", "keep editing")],
        (InputMode::Normal, Phase::Ready) => &[
            ("j/k", "nav"),
            ("a/x/u", "approve/reject/unset"),
            ("space", "cycle"),
            ("n", "note"),
            ("enter", "detail"),
            ("f", "filter"),
            ("s", "save"),
            ("r", "reload"),
            ("q", "quit"),
        ],
        (InputMode::Normal, _) => &[("r", "retry"), ("q", "quit")],
    };

    let mut spans: Vec<Span<'static>> = Vec::new();
    for (key, desc) in hints {
        spans.push(Span::styled((*key).to_string(), key_style));
        spans.push(Span::styled(format!(" {desc}  "), dim_style));
    }

    let version = format!("tagreview {}", env!("CARGO_PKG_VERSION"));
    let left_len: usize = spans.iter().map(|span| span.content.chars().count()).sum();
    let right_len = version.chars().count();
    if usize::from(width) > left_len + right_len + 1 {
        spans.push(Span::raw(" ".repeat(usize::from(width) - left_len - right_len)));
    } else {
        spans.push(Span::raw("  "));
    }
    spans.push(Span::styled(version, dim_style));
    Line::from(spans)
}
