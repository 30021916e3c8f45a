use arbor_tree::{OutputsNode, ROOT_KEY, TreeNode};
use indexmap::IndexMap;
use tracing::debug;

use crate::{Fetch, Session, SessionEvent, TransformError, Transformer};

/// The browser's working copy of the store plus its session.
///
/// The copy is refreshed only when the store's tree or open file differ
/// structurally from what was last observed.
#[derive(Debug, Clone, Default)]
pub struct Browser {
    session: Session,
    transformer: Transformer,
    outputs_tree: IndexMap<String, OutputsNode>,
    outputs_file: String,
}

impl Browser {
    pub fn new(transformer: Transformer) -> Self {
        Self {
            transformer,
            ..Default::default()
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn outputs_file(&self) -> &str {
        &self.outputs_file
    }

    /// Returns true when the working copy changed.
    pub fn observe(
        &mut self,
        outputs_tree: &IndexMap<String, OutputsNode>,
        outputs_file: &str,
    ) -> bool {
        if self.outputs_tree == *outputs_tree && self.outputs_file == outputs_file {
            return false;
        }
        self.outputs_tree = outputs_tree.clone();
        self.outputs_file = outputs_file.to_string();
        true
    }

    /// The view tree, or `None` until the root listing has arrived.
    pub fn data(&self) -> Result<Option<TreeNode>, TransformError> {
        self.outputs_tree
            .get(ROOT_KEY)
            .map(|root| self.transformer.transform(root, &self.session))
            .transpose()
    }

    pub fn mount(&mut self) -> Option<Fetch> {
        self.apply(SessionEvent::Mount)
    }

    pub fn toggle(&mut self, node: &TreeNode, toggled: bool) -> Option<Fetch> {
        self.apply(SessionEvent::toggle(node, toggled))
    }

    pub fn select(&mut self, node: &TreeNode) -> Option<Fetch> {
        self.apply(SessionEvent::select(node))
    }

    pub fn apply(&mut self, event: SessionEvent) -> Option<Fetch> {
        let session = std::mem::take(&mut self.session);
        let (session, fetch) = session.update(event);
        self.session = session;

        if let Some(fetch) = &fetch {
            debug!(?fetch, "issuing outputs fetch");
        }
        fetch
    }
}
