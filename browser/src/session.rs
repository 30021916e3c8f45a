use std::collections::{HashMap, HashSet};

use arbor_tree::TreeNode;
use serde::{Deserialize, Serialize};

/// A request for the outputs transport. Fire-and-forget: the result comes
/// back later as a store update, never as a return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fetch {
    /// List the directory at `path`.
    Tree { path: String },
    /// Load the file at `path` as the open outputs file.
    Files { path: String },
}

impl Fetch {
    pub fn path(&self) -> &str {
        match self {
            Fetch::Tree { path } | Fetch::Files { path } => path,
        }
    }
}

/// Inputs of the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Mount,
    Toggle {
        id: String,
        loading: bool,
        toggled: bool,
    },
    Select {
        id: String,
        is_file: bool,
    },
}

impl SessionEvent {
    pub fn toggle(node: &TreeNode, toggled: bool) -> Self {
        SessionEvent::Toggle {
            id: node.id.clone(),
            loading: node.loading,
            toggled,
        }
    }

    pub fn select(node: &TreeNode) -> Self {
        SessionEvent::Select {
            id: node.id.clone(),
            is_file: !node.is_branch(),
        }
    }
}

/// Expand/collapse, selection and request bookkeeping for one browsing
/// session.
///
/// `requested_node_ids` only grows: once a listing has been requested for an
/// id it is never requested again in the same session, whether or not the
/// request succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    toggled_node_ids: HashMap<String, bool>,
    active_node_id: Option<String>,
    requested_node_ids: HashSet<String>,
    mounted: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit toggle state, `None` when the node was never toggled.
    pub fn toggled(&self, id: &str) -> Option<bool> {
        self.toggled_node_ids.get(id).copied()
    }

    pub fn active_node_id(&self) -> Option<&str> {
        self.active_node_id.as_deref()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_node_id.as_deref() == Some(id)
    }

    pub fn is_requested(&self, id: &str) -> bool {
        self.requested_node_ids.contains(id)
    }

    pub fn requested_count(&self) -> usize {
        self.requested_node_ids.len()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn update(self, event: SessionEvent) -> (Self, Option<Fetch>) {
        match event {
            SessionEvent::Mount => self.mount(),
            SessionEvent::Toggle {
                id,
                loading,
                toggled,
            } => self.toggle_id(id, loading, toggled),
            SessionEvent::Select { id, is_file } => self.select_id(id, is_file),
        }
    }

    /// Bootstrap the root listing. Only the first mount fetches.
    pub fn mount(mut self) -> (Self, Option<Fetch>) {
        if self.mounted {
            return (self, None);
        }
        self.mounted = true;
        (
            self,
            Some(Fetch::Tree {
                path: String::new(),
            }),
        )
    }

    pub fn toggle(self, node: &TreeNode, toggled: bool) -> (Self, Option<Fetch>) {
        self.toggle_id(node.id.clone(), node.loading, toggled)
    }

    pub fn select(self, node: &TreeNode) -> (Self, Option<Fetch>) {
        self.select_id(node.id.clone(), !node.is_branch())
    }

    fn toggle_id(mut self, id: String, loading: bool, toggled: bool) -> (Self, Option<Fetch>) {
        let fetch = if toggled && loading && self.requested_node_ids.insert(id.clone()) {
            Some(Fetch::Tree { path: id.clone() })
        } else {
            None
        };
        self.toggled_node_ids.insert(id, toggled);
        (self, fetch)
    }

    fn select_id(mut self, id: String, is_file: bool) -> (Self, Option<Fetch>) {
        let fetch = is_file.then(|| Fetch::Files { path: id.clone() });
        self.active_node_id = Some(id);
        (self, fetch)
    }
}
