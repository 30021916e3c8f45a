use arbor_tree::TreeNode;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::IconKind;

pub trait Render {
    fn render(&self) -> Vec<Span<'static>>;
}

/// Renders the header of a single node.
pub type HeaderDecorator = fn(&TreeNode) -> Line<'static>;

/// Renders the placeholder row under a node whose children are being fetched.
pub type LoadingDecorator = fn(&TreeNode) -> Line<'static>;

/// Renderers handed to [`TreeView`] for each render pass.
#[derive(Debug, Clone, Copy)]
pub struct Decorators {
    pub header: HeaderDecorator,
    pub loading: LoadingDecorator,
}

impl Default for Decorators {
    fn default() -> Self {
        Self {
            header: header_decorator,
            loading: loading_decorator,
        }
    }
}

/// Icon followed by the node name. The active node is emphasized.
pub fn header_decorator(node: &TreeNode) -> Line<'static> {
    let mut spans = IconKind::classify(node).render();
    spans.push(Span::raw(" "));

    let style = if node.active {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    spans.push(Span::styled(node.name.clone(), style));

    Line::from(spans)
}

pub fn loading_decorator(_node: &TreeNode) -> Line<'static> {
    Line::from(Span::styled(
        "⟳ loading...",
        Style::default().fg(Color::DarkGray),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Node,
    Loading,
}

/// One visible line of the tree view.
#[derive(Debug, Clone)]
pub struct TreeRow<'a> {
    pub node: &'a TreeNode,
    pub depth: usize,
    pub kind: RowKind,
    pub is_expanded: bool,
}

/// Lays out a transformed tree as visible rows.
///
/// The top-level node is the synthetic root wrapper and is not shown; its
/// children sit at depth 0. A node whose `toggled` is unset is expanded when
/// its depth is below `default_expand_depth`.
#[derive(Debug, Clone)]
pub struct TreeView<'a> {
    data: &'a TreeNode,
    decorators: Decorators,
    default_expand_depth: usize,
}

impl<'a> TreeView<'a> {
    pub fn new(data: &'a TreeNode, decorators: Decorators) -> Self {
        Self {
            data,
            decorators,
            default_expand_depth: 0,
        }
    }

    pub fn with_default_expand_depth(mut self, depth: usize) -> Self {
        self.default_expand_depth = depth;
        self
    }

    pub fn is_expanded(&self, node: &TreeNode, depth: usize) -> bool {
        node.is_branch() && node.toggled.unwrap_or(depth < self.default_expand_depth)
    }

    pub fn rows(&self) -> Vec<TreeRow<'a>> {
        let mut out = Vec::new();
        for child in self.data.children() {
            self.rows_rec(child, 0, &mut out);
        }
        out
    }

    fn rows_rec(&self, node: &'a TreeNode, depth: usize, out: &mut Vec<TreeRow<'a>>) {
        let is_expanded = self.is_expanded(node, depth);

        out.push(TreeRow {
            node,
            depth,
            kind: RowKind::Node,
            is_expanded,
        });

        if !is_expanded {
            return;
        }

        if node.loading {
            out.push(TreeRow {
                node,
                depth: depth + 1,
                kind: RowKind::Loading,
                is_expanded: false,
            });
            return;
        }

        for child in node.children() {
            self.rows_rec(child, depth + 1, out);
        }
    }

    pub fn line(&self, row: &TreeRow<'_>) -> Line<'static> {
        let mut spans = vec![Span::raw("  ".repeat(row.depth))];

        let mut line = match row.kind {
            RowKind::Loading => (self.decorators.loading)(row.node),
            RowKind::Node => {
                if row.node.is_branch() {
                    spans.push(Span::styled(
                        format!("{} ", if row.is_expanded { "▼" } else { "▶" }),
                        Style::default().fg(Color::Yellow),
                    ));
                } else {
                    spans.push(Span::raw("  "));
                }
                (self.decorators.header)(row.node)
            }
        };

        spans.append(&mut line.spans);
        line.spans = spans;
        line
    }
}
