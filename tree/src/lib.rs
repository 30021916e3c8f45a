//! Server-shaped and view-shaped outputs trees.
//!
//! Two nested representations of the same directory hierarchy:
//! - [`OutputsNode`] mirrors what the outputs server returns. Children are an
//!   ordered mapping keyed by child name, and may be known-but-unfetched.
//! - [`TreeNode`] is what the tree view consumes. It is derived from an
//!   [`OutputsNode`] on every render pass and never stored.
//!
//! Node ids are paths relative to the outputs root. The root itself has the
//! empty path and is never shown.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Key of the root node in a store's outputs tree mapping.
pub const ROOT_KEY: &str = "root";

/// Ordered mapping of child name to child node.
pub type OutputsChildren = IndexMap<String, OutputsNode>;

/// A node of the outputs tree as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputsNode {
    pub path: String,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<OutputsChildren>,
    #[serde(default)]
    pub is_loaded: bool,
}

impl OutputsNode {
    /// The synthetic top-level container, before its listing arrives.
    pub fn root() -> Self {
        Self {
            path: String::new(),
            is_root: true,
            children: None,
            is_loaded: false,
        }
    }

    /// A directory whose existence is known but whose contents are not.
    pub fn placeholder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_root: false,
            children: Some(OutputsChildren::new()),
            is_loaded: false,
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_root: false,
            children: None,
            is_loaded: true,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.children.is_some()
    }

    /// True for a directory whose children have not been fetched yet.
    pub fn is_loading(&self) -> bool {
        self.children.is_some() && !self.is_loaded
    }

    /// Walk `path` one segment at a time from this node.
    pub fn find(&self, path: &str) -> Option<&OutputsNode> {
        segments(path).try_fold(self, |node, name| node.children.as_ref()?.get(name))
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut OutputsNode> {
        segments(path).try_fold(self, |node, name| node.children.as_mut()?.get_mut(name))
    }
}

/// Path of a child named `name` under `parent`.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// One directory listing as returned by the outputs server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputsListing {
    #[serde(default)]
    pub dirs: Vec<String>,
    #[serde(default)]
    pub files: Vec<OutputsFileEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputsFileEntry {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// A node as consumed by the tree view.
///
/// `toggled` is tri-state: `None` leaves the expansion decision to the view's
/// default, which is not the same as an explicit collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toggled: Option<bool>,
    pub active: bool,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn is_branch(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children().iter().rev());
            Some(node)
        })
    }

    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        self.iter().find(|node| node.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_value};

    fn sample() -> OutputsNode {
        let mut logs = OutputsNode::placeholder("logs");
        logs.is_loaded = true;
        logs.children
            .as_mut()
            .unwrap()
            .insert("run.log".into(), OutputsNode::file("logs/run.log"));

        let mut root = OutputsNode::root();
        root.is_loaded = true;
        root.children = Some(IndexMap::from([
            ("logs".to_string(), logs),
            ("plots".to_string(), OutputsNode::placeholder("plots")),
        ]));
        root
    }

    #[test]
    fn find_walks_segments() {
        let root = sample();
        assert_eq!(root.find("logs/run.log").unwrap().path, "logs/run.log");
        assert_eq!(root.find("").unwrap().path, "");
        assert!(root.find("logs/missing").is_none());
        assert!(root.find("logs/run.log/deeper").is_none());
    }

    #[test]
    fn placeholder_is_loading_until_loaded() {
        let mut node = OutputsNode::placeholder("plots");
        assert!(node.is_loading());
        node.is_loaded = true;
        assert!(!node.is_loading());
        assert!(!OutputsNode::file("a.txt").is_loading());
    }

    #[test]
    fn join_path_at_root() {
        assert_eq!(join_path("", "logs"), "logs");
        assert_eq!(join_path("logs", "run.log"), "logs/run.log");
    }

    #[test]
    fn outputs_node_uses_server_field_names() {
        let node: OutputsNode = from_str(
            r#"{
                "path": "plots",
                "children": {},
                "isLoaded": false
            }"#,
        )
        .unwrap();
        assert_eq!(node, OutputsNode::placeholder("plots"));

        let value = to_value(OutputsNode::file("a.png")).unwrap();
        assert_eq!(
            value,
            json!({ "path": "a.png", "isRoot": false, "isLoaded": true })
        );
    }

    #[test]
    fn listing_defaults_missing_fields() {
        let listing: OutputsListing = from_str(r#"{ "files": [{ "name": "a.txt" }] }"#).unwrap();
        assert!(listing.dirs.is_empty());
        assert_eq!(listing.files[0].size, 0);
    }

    #[test]
    fn tree_node_iter_is_pre_order() {
        let tree = TreeNode {
            id: "a".into(),
            children: Some(vec![
                TreeNode {
                    id: "a/b".into(),
                    children: Some(vec![TreeNode {
                        id: "a/b/c".into(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                },
                TreeNode {
                    id: "a/d".into(),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        let ids: Vec<_> = tree.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, ["a", "a/b", "a/b/c", "a/d"]);
        assert!(tree.find("a/d").is_some());
    }
}
