//! Canonical outputs state and the reducer that folds fetch responses into it.
//!
//! The store owns the server-shaped tree. Everything else reads it and sends
//! [`OutputsAction`]s back. Responses are merged by node id: a listing for a
//! path that is no longer in the tree is dropped, and children that survive a
//! re-listing keep their already-fetched subtrees.

use arbor_tree::{OutputsChildren, OutputsListing, OutputsNode, join_path};
pub use arbor_tree::ROOT_KEY;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Store inputs, produced by the fetch transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputsAction {
    TreeRequested {
        path: String,
    },
    TreeReceived {
        path: String,
        listing: OutputsListing,
    },
    FileRequested {
        path: String,
    },
    FileReceived {
        path: String,
        content: String,
    },
    FetchFailed {
        path: String,
        error: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputsStore {
    tree: IndexMap<String, OutputsNode>,
    file: String,
    file_content: Option<String>,
    requested_file: Option<String>,
}

impl OutputsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &IndexMap<String, OutputsNode> {
        &self.tree
    }

    pub fn root(&self) -> Option<&OutputsNode> {
        self.tree.get(ROOT_KEY)
    }

    /// Path of the currently open file, empty when none is open.
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn file_content(&self) -> Option<&str> {
        self.file_content.as_deref()
    }

    pub fn reduce(&mut self, action: OutputsAction) {
        match action {
            OutputsAction::TreeRequested { path } => debug!(%path, "outputs tree requested"),
            OutputsAction::FileRequested { path } => {
                debug!(%path, "outputs file requested");
                self.requested_file = Some(path);
            }
            OutputsAction::TreeReceived { path, listing } => self.receive_tree(path, listing),
            OutputsAction::FileReceived { path, content } => {
                if self.requested_file.as_ref().is_some_and(|latest| *latest != path) {
                    debug!(%path, "dropping file superseded by a later request");
                    return;
                }
                debug!(%path, bytes = content.len(), "outputs file received");
                self.file = path;
                self.file_content = Some(content);
            }
            OutputsAction::FetchFailed { path, error } => {
                warn!(%path, %error, "outputs fetch failed");
            }
        }
    }

    fn receive_tree(&mut self, path: String, listing: OutputsListing) {
        let node = if path.is_empty() {
            self.tree
                .entry(ROOT_KEY.to_string())
                .or_insert_with(OutputsNode::root)
        } else {
            let Some(node) = self
                .tree
                .get_mut(ROOT_KEY)
                .and_then(|root| root.find_mut(&path))
            else {
                debug!(%path, "dropping listing for node no longer in tree");
                return;
            };
            node
        };

        if !node.is_root && !node.is_dir() {
            debug!(%path, "dropping listing for file node");
            return;
        }

        debug!(
            %path,
            dirs = listing.dirs.len(),
            files = listing.files.len(),
            "outputs tree received"
        );
        merge_listing(node, listing);
    }
}

fn merge_listing(node: &mut OutputsNode, listing: OutputsListing) {
    let mut previous = node.children.take().unwrap_or_default();
    let mut children = OutputsChildren::with_capacity(listing.dirs.len() + listing.files.len());

    for name in listing.dirs {
        let child = previous
            .swap_remove(&name)
            .filter(OutputsNode::is_dir)
            .unwrap_or_else(|| OutputsNode::placeholder(join_path(&node.path, &name)));
        children.insert(name, child);
    }

    for file in listing.files {
        let child = previous
            .swap_remove(&file.name)
            .filter(|child| !child.is_dir())
            .unwrap_or_else(|| OutputsNode::file(join_path(&node.path, &file.name)));
        children.insert(file.name, child);
    }

    node.children = Some(children);
    node.is_loaded = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_tree::OutputsFileEntry;

    fn listing(dirs: &[&str], files: &[&str]) -> OutputsListing {
        OutputsListing {
            dirs: dirs.iter().map(|d| d.to_string()).collect(),
            files: files
                .iter()
                .map(|f| OutputsFileEntry {
                    name: f.to_string(),
                    size: 0,
                })
                .collect(),
        }
    }

    fn received(path: &str, dirs: &[&str], files: &[&str]) -> OutputsAction {
        OutputsAction::TreeReceived {
            path: path.into(),
            listing: listing(dirs, files),
        }
    }

    #[test]
    fn root_listing_creates_root() {
        let mut store = OutputsStore::new();
        assert!(store.root().is_none());

        store.reduce(received("", &["logs"], &["model.pt"]));

        let root = store.root().unwrap();
        assert!(root.is_root);
        assert!(root.is_loaded);
        let children = root.children.as_ref().unwrap();
        assert_eq!(children["logs"], OutputsNode::placeholder("logs"));
        assert_eq!(children["model.pt"], OutputsNode::file("model.pt"));
    }

    #[test]
    fn nested_listing_loads_placeholder() {
        let mut store = OutputsStore::new();
        store.reduce(received("", &["logs"], &[]));
        store.reduce(received("logs", &["2024"], &["run.log"]));

        let logs = store.root().unwrap().find("logs").unwrap();
        assert!(logs.is_loaded);
        assert!(!logs.is_loading());
        assert_eq!(
            logs.find("2024").unwrap(),
            &OutputsNode::placeholder("logs/2024")
        );
        assert_eq!(logs.find("run.log").unwrap().path, "logs/run.log");
    }

    #[test]
    fn empty_listing_still_marks_loaded() {
        let mut store = OutputsStore::new();
        store.reduce(received("", &["empty"], &[]));
        store.reduce(received("empty", &[], &[]));

        let empty = store.root().unwrap().find("empty").unwrap();
        assert!(empty.is_loaded);
        assert_eq!(empty.children.as_ref().map(|c| c.len()), Some(0));
    }

    #[test]
    fn relisting_keeps_loaded_subtrees() {
        let mut store = OutputsStore::new();
        store.reduce(received("", &["logs", "old"], &[]));
        store.reduce(received("logs", &[], &["run.log"]));
        store.reduce(received("", &["logs", "new"], &[]));

        let root = store.root().unwrap();
        let logs = root.find("logs").unwrap();
        assert!(logs.is_loaded);
        assert!(logs.find("run.log").is_some());
        assert!(root.find("old").is_none());
        assert!(root.find("new").unwrap().is_loading());
    }

    #[test]
    fn listing_for_unknown_path_is_ignored() {
        let mut store = OutputsStore::new();
        store.reduce(received("", &["logs"], &[]));
        let before = store.clone();

        store.reduce(received("gone", &[], &["a.txt"]));
        store.reduce(received("logs/deeper", &[], &["a.txt"]));

        assert_eq!(store, before);
    }

    #[test]
    fn listing_before_root_is_ignored() {
        let mut store = OutputsStore::new();
        store.reduce(received("logs", &[], &["a.txt"]));
        assert!(store.tree().is_empty());
    }

    #[test]
    fn failed_fetch_leaves_placeholder_loading() {
        let mut store = OutputsStore::new();
        store.reduce(received("", &["logs"], &[]));
        store.reduce(OutputsAction::FetchFailed {
            path: "logs".into(),
            error: "connection reset".into(),
        });

        assert!(store.root().unwrap().find("logs").unwrap().is_loading());
    }

    #[test]
    fn file_received_opens_file() {
        let mut store = OutputsStore::new();
        store.reduce(OutputsAction::FileReceived {
            path: "logs/run.log".into(),
            content: "epoch 1".into(),
        });

        assert_eq!(store.file(), "logs/run.log");
        assert_eq!(store.file_content(), Some("epoch 1"));
    }

    #[test]
    fn stale_file_response_is_dropped() {
        let mut store = OutputsStore::new();
        for path in ["a.txt", "b.txt"] {
            store.reduce(OutputsAction::FileRequested { path: path.into() });
        }

        store.reduce(OutputsAction::FileReceived {
            path: "b.txt".into(),
            content: "bee".into(),
        });
        store.reduce(OutputsAction::FileReceived {
            path: "a.txt".into(),
            content: "ay".into(),
        });

        assert_eq!(store.file(), "b.txt");
        assert_eq!(store.file_content(), Some("bee"));
    }
}
