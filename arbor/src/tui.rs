#![allow(clippy::collapsible_if)]

use std::io;
use std::sync::Arc;

use arbor_browser::{Browser, Fetch, TransformError, Transformer};
use arbor_fs::LocalSource;
use arbor_store::OutputsStore;
use arbor_tree::TreeNode;
use arbor_view::{Decorators, RowKind, TreeRow, TreeView};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    CompletedFrame, DefaultTerminal, Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::info;

use crate::config::Config;
use crate::fetch::Fetcher;

#[derive(Error, Debug)]
pub enum TuiError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

pub async fn tui(config: &Config) -> Result<(), TuiError> {
    info!(root = %config.root.display(), "browsing outputs");

    let source = Arc::new(LocalSource::new(&config.root, config.preview_max_bytes));
    let (action_tx, mut action_rx) = unbounded_channel();
    let fetcher = Fetcher::new(source, action_tx);

    let mut terminal = TerminalSession::init();
    let mut app = TuiApp::new(config);

    if let Some(fetch) = app.browser.mount() {
        fetcher.dispatch(fetch);
    }

    let mut events = read_events();
    let mut should_quit = false;

    loop {
        let data = app.browser.data()?;
        if let Some(data) = data.as_ref() {
            for fetch in app.open_default_expanded(data) {
                fetcher.dispatch(fetch);
            }
        }
        terminal.draw(|frame| draw_ui(frame, &mut app, data.as_ref()))?;

        tokio::select! {
            Some(action) = action_rx.recv() => {
                app.store.reduce(action);
                app.browser.observe(app.store.tree(), app.store.file());
            }

            Some(event) = events.recv() => {
                should_quit = app.handle_event(event, data.as_ref(), &fetcher);
            }

            else => should_quit = true,
        }

        if should_quit {
            break;
        }
    }

    Ok(())
}

struct TerminalSession {
    terminal: DefaultTerminal,
}

impl TerminalSession {
    fn init() -> Self {
        let terminal = ratatui::init();
        Self { terminal }
    }

    pub fn draw<F>(&mut self, render_callback: F) -> Result<CompletedFrame<'_>, TuiError>
    where
        F: FnOnce(&mut Frame),
    {
        Ok(self.terminal.draw(render_callback)?)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        ratatui::restore();
    }
}

fn read_events() -> UnboundedReceiver<Event> {
    let (event_tx, event_rx) = unbounded_channel();

    std::thread::spawn(move || {
        loop {
            if let Ok(event) = crossterm::event::read() {
                if event_tx.send(event).is_err() {
                    break;
                }
            }
        }
    });

    event_rx
}

/// Cursor over the visible rows, tracked by node id so it survives rows
/// appearing and disappearing around it.
#[derive(Debug, Default, Clone)]
struct TreeCursor {
    selected_id: Option<String>,
    list_offset: usize,
}

impl TreeCursor {
    fn selected_row(&self, rows: &[TreeRow<'_>]) -> Option<usize> {
        let selected_id = self.selected_id.as_deref()?;
        rows.iter()
            .position(|row| row.kind == RowKind::Node && row.node.id == selected_id)
    }

    fn move_by(&mut self, rows: &[TreeRow<'_>], delta: isize) {
        let nodes: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.kind == RowKind::Node)
            .map(|(index, _)| index)
            .collect();

        if nodes.is_empty() {
            self.selected_id = None;
            self.list_offset = 0;
            return;
        }

        let current = self
            .selected_row(rows)
            .and_then(|row| nodes.iter().position(|index| *index == row))
            .unwrap_or(0);
        let next = current
            .saturating_add_signed(delta)
            .min(nodes.len() - 1);

        self.selected_id = Some(rows[nodes[next]].node.id.clone());
    }

    fn ensure_visible_row(&mut self, selected_row: usize, height: usize) {
        if height == 0 {
            return;
        }

        let bottom = self.list_offset + height.saturating_sub(1);

        if selected_row < self.list_offset {
            self.list_offset = selected_row;
        } else if selected_row > bottom {
            self.list_offset = selected_row.saturating_sub(height.saturating_sub(1));
        }
    }
}

struct TuiApp {
    store: OutputsStore,
    browser: Browser,
    decorators: Decorators,
    default_expand_depth: usize,
    cursor: TreeCursor,
    preview_scroll: u16,
}

impl TuiApp {
    fn new(config: &Config) -> Self {
        Self {
            store: OutputsStore::new(),
            browser: Browser::new(Transformer::new(config.order)),
            decorators: Decorators::default(),
            default_expand_depth: config.default_expand_depth,
            cursor: TreeCursor::default(),
            preview_scroll: 0,
        }
    }

    fn tree_view<'a>(&self, data: &'a TreeNode) -> TreeView<'a> {
        TreeView::new(data, self.decorators).with_default_expand_depth(self.default_expand_depth)
    }

    /// Returns true when the user asked to quit.
    fn handle_event(&mut self, event: Event, data: Option<&TreeNode>, fetcher: &Fetcher) -> bool {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return false;
        };

        if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
            return true;
        }
        if modifiers != KeyModifiers::NONE {
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,

            KeyCode::PageUp => self.preview_scroll = self.preview_scroll.saturating_sub(10),
            KeyCode::PageDown => self.preview_scroll = self.preview_scroll.saturating_add(10),

            _ => {
                if let Some(fetch) = data.and_then(|data| self.handle_tree_key(code, data)) {
                    fetcher.dispatch(fetch);
                }
            }
        }

        false
    }

    fn handle_tree_key(&mut self, code: KeyCode, data: &TreeNode) -> Option<Fetch> {
        let rows = self.tree_view(data).rows();

        match code {
            KeyCode::Down | KeyCode::Char('j') => self.cursor.move_by(&rows, 1),
            KeyCode::Up | KeyCode::Char('k') => self.cursor.move_by(&rows, -1),
            KeyCode::Enter | KeyCode::Char(' ') => {
                let row = self.current_row(&rows)?;
                if row.node.is_branch() {
                    return self.toggle(row.node, !row.is_expanded);
                }
                return self.select(row.node);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                let row = self.current_row(&rows)?;
                // A loading node may already be drawn expanded by default.
                if row.node.is_branch() && (!row.is_expanded || row.node.loading) {
                    return self.toggle(row.node, true);
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                let row = self.current_row(&rows)?;
                if row.node.is_branch() && row.is_expanded {
                    return self.toggle(row.node, false);
                }
            }
            _ => {}
        }

        None
    }

    /// Nodes expanded only by `default_expand_depth` were never toggled, so
    /// nothing has fetched them yet. Open them through the session so the
    /// loading row belongs to a fetch in flight.
    fn open_default_expanded(&mut self, data: &TreeNode) -> Vec<Fetch> {
        self.tree_view(data)
            .rows()
            .into_iter()
            .filter(|row| row.kind == RowKind::Loading && row.node.toggled.is_none())
            .filter_map(|row| self.browser.toggle(row.node, true))
            .collect()
    }

    fn current_row<'a>(&self, rows: &[TreeRow<'a>]) -> Option<TreeRow<'a>> {
        let index = self.cursor.selected_row(rows).or_else(|| {
            rows.iter().position(|row| row.kind == RowKind::Node)
        })?;
        rows.get(index).cloned()
    }

    fn toggle(&mut self, node: &TreeNode, toggled: bool) -> Option<Fetch> {
        self.cursor.selected_id = Some(node.id.clone());
        self.browser.toggle(node, toggled)
    }

    fn select(&mut self, node: &TreeNode) -> Option<Fetch> {
        self.cursor.selected_id = Some(node.id.clone());
        self.preview_scroll = 0;
        self.browser.select(node)
    }
}

fn draw_ui(frame: &mut Frame, app: &mut TuiApp, data: Option<&TreeNode>) {
    let outer = Block::bordered().title_top("outputs");
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)].as_ref())
        .split(outer.inner(frame.area()));

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(34), Constraint::Percentage(66)].as_ref())
        .split(layout[0]);

    frame.render_widget(outer, frame.area());
    match data {
        Some(data) => draw_tree(frame, panes[0], app, data),
        None => draw_placeholder(frame, panes[0], "Waiting for outputs listing..."),
    }
    draw_preview(frame, panes[1], app);
    draw_help(frame, layout[1]);
}

fn draw_tree(frame: &mut Frame<'_>, area: Rect, app: &mut TuiApp, data: &TreeNode) {
    let view = app.tree_view(data);
    let rows = view.rows();

    if app.cursor.selected_id.is_none() {
        app.cursor.move_by(&rows, 0);
    }

    let selected_row = app.cursor.selected_row(&rows);

    let items = rows
        .iter()
        .map(|row| ListItem::new(view.line(row)))
        .collect::<Vec<_>>();

    let mut list_state = ListState::default();
    list_state.select(selected_row);
    *list_state.offset_mut() = app.cursor.list_offset;

    let inner_height = area.height.saturating_sub(2) as usize;
    if let Some(selected_row) = selected_row {
        app.cursor.ensure_visible_row(selected_row, inner_height);
        *list_state.offset_mut() = app.cursor.list_offset;
    }

    let requested = app.browser.session().requested_count();
    let title = format!("tree ({requested} requested)");

    let widget = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray));

    frame.render_stateful_widget(widget, area, &mut list_state);
}

fn draw_preview(frame: &mut Frame<'_>, area: Rect, app: &TuiApp) {
    let file = app.browser.outputs_file();
    let title = if file.is_empty() { "preview" } else { file };

    let widget = match app.store.file_content() {
        Some(content) if !file.is_empty() => Paragraph::new(content)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false })
            .scroll((app.preview_scroll, 0)),
        _ => Paragraph::new("Select a file to preview it.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray)),
    };

    frame.render_widget(widget, area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let hints = "Up/Down move  Enter toggle/open  Right expand  Left collapse  PgUp/PgDn scroll  q quit";

    let lines = vec![Line::from(Span::styled(
        hints,
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    ))];

    let widget = Paragraph::new(Text::from(lines))
        .block(Block::default())
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    frame.render_widget(widget, area);
}

fn draw_placeholder(frame: &mut Frame<'_>, area: Rect, text: &str) {
    let widget = Paragraph::new(Text::from(text))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(widget, area);
}
