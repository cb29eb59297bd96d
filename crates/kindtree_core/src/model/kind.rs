//! Kind taxonomy domain model.
//!
//! # Responsibility
//! - Define the normalized kind identifier and the kind node record.
//! - Own the in-memory rooted tree and every structural mutation on it.
//!
//! # Invariants
//! - The root kind `Kind` always exists and is created with no properties.
//! - Kind names are unique across the whole tree.
//! - Every non-root node has exactly one parent that is present in the tree.
//! - Child order is insertion order and is stable across persistence.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Identifier of the sentinel root kind.
pub const ROOT_KIND: &str = "Kind";

/// Property names attached to a kind.
pub type PropertySet = BTreeSet<String>;

/// Validation error for kind identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindNameError {
    /// Identifier is empty after trim.
    Blank,
    /// Case mapping did not settle on a stable spelling.
    Unstable(String),
}

impl Display for KindNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "kind name must not be blank"),
            Self::Unstable(raw) => write!(f, "kind name `{raw}` has no stable capitalized form"),
        }
    }
}

impl Error for KindNameError {}

/// Upper bound on capitalization passes before a name is rejected.
const MAX_CAPITALIZE_PASSES: usize = 4;

/// Normalized kind identifier.
///
/// Names are trimmed and case-folded to capitalized form, so `person`,
/// `PERSON` and ` Person ` all resolve to the same kind.
///
/// Normalizing an already normalized name returns it unchanged. Characters
/// whose uppercase form expands (`ß` -> `SS`, `ﬁ` -> `FI`) are capitalized
/// again until the spelling settles, so `ßeta` and `SSETA` are both `Sseta`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct KindName(String);

impl KindName {
    /// Normalizes raw input into a kind identifier.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, KindNameError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(KindNameError::Blank);
        }

        let mut current = trimmed.to_string();
        for _ in 0..MAX_CAPITALIZE_PASSES {
            let next = capitalize(&current);
            if next == current {
                return Ok(Self(current));
            }
            current = next;
        }
        Err(KindNameError::Unstable(trimmed.to_string()))
    }

    /// Returns the root identifier.
    pub fn root() -> Self {
        Self(ROOT_KIND.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_KIND
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for KindName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    let mut capitalized = String::with_capacity(value.len());
    if let Some(first) = chars.next() {
        capitalized.extend(first.to_uppercase());
        capitalized.push_str(&chars.as_str().to_lowercase());
    }
    capitalized
}

/// One kind in the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindNode {
    name: KindName,
    properties: PropertySet,
    parent: Option<KindName>,
    children: Vec<KindName>,
}

impl KindNode {
    pub fn name(&self) -> &KindName {
        &self.name
    }

    /// Properties instances of this kind may carry.
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Parent kind. `None` only for the root.
    pub fn parent(&self) -> Option<&KindName> {
        self.parent.as_ref()
    }

    /// Direct children in insertion order.
    pub fn children(&self) -> &[KindName] {
        &self.children
    }
}

/// Structural errors raised by tree mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// A node with this name already exists somewhere in the tree.
    DuplicateKind(KindName),
    /// Referenced parent is not in the tree.
    ParentNotFound(KindName),
    /// Referenced kind is not in the tree.
    KindNotFound(KindName),
    /// The root kind cannot be removed.
    RootRemoval,
    /// Rebuilt tree does not start with a parentless root.
    InvalidRoot(KindName),
    /// Rebuilt root record carries properties.
    RootHasProperties(PropertySet),
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKind(name) => write!(f, "kind already exists: {name}"),
            Self::ParentNotFound(name) => write!(f, "parent kind not found: {name}"),
            Self::KindNotFound(name) => write!(f, "kind not found: {name}"),
            Self::RootRemoval => write!(f, "root kind `{ROOT_KIND}` cannot be removed"),
            Self::InvalidRoot(name) => {
                write!(f, "tree must start with parentless `{ROOT_KIND}`, got `{name}`")
            }
            Self::RootHasProperties(properties) => write!(
                f,
                "root kind `{ROOT_KIND}` must have no properties, got {properties:?}"
            ),
        }
    }
}

impl Error for TreeError {}

/// Rooted kind tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OntologyTree {
    nodes: BTreeMap<KindName, KindNode>,
}

impl OntologyTree {
    /// Creates a tree holding only the propertyless root.
    pub fn with_root() -> Self {
        let root = KindName::root();
        let mut nodes = BTreeMap::new();
        nodes.insert(
            root.clone(),
            KindNode {
                name: root,
                properties: PropertySet::new(),
                parent: None,
                children: Vec::new(),
            },
        );
        Self { nodes }
    }

    /// Rebuilds a tree from `(name, parent, properties)` records in pre-order.
    ///
    /// The first record must be the parentless, propertyless root; every
    /// later record must name a parent that was already seen.
    pub fn from_preorder<I>(records: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = (KindName, Option<KindName>, PropertySet)>,
    {
        let mut records = records.into_iter();
        let mut tree = match records.next() {
            Some((name, None, properties)) if name.is_root() => {
                if !properties.is_empty() {
                    return Err(TreeError::RootHasProperties(properties));
                }
                Self::with_root()
            }
            Some((name, _, _)) => return Err(TreeError::InvalidRoot(name)),
            None => return Err(TreeError::InvalidRoot(KindName::root())),
        };

        for (name, parent, properties) in records {
            let parent = parent.ok_or_else(|| TreeError::InvalidRoot(name.clone()))?;
            tree.insert_child(&parent, name, properties)?;
        }
        Ok(tree)
    }

    pub fn root(&self) -> &KindNode {
        &self.nodes[&KindName::root()]
    }

    pub fn get(&self, name: &KindName) -> Option<&KindNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &KindName) -> bool {
        self.nodes.contains_key(name)
    }

    /// Number of kinds, root included.
    pub fn kind_count(&self) -> usize {
        self.nodes.len()
    }

    /// Direct children of `name`, or `None` when the kind is absent.
    pub fn children(&self, name: &KindName) -> Option<&[KindName]> {
        self.nodes.get(name).map(KindNode::children)
    }

    pub fn properties_mut(&mut self, name: &KindName) -> Option<&mut PropertySet> {
        self.nodes.get_mut(name).map(|node| &mut node.properties)
    }

    /// Appends a new child under `parent`.
    ///
    /// Duplicate names are checked before the parent lookup, so a duplicate
    /// is reported even when the requested parent does not exist.
    pub fn insert_child(
        &mut self,
        parent: &KindName,
        name: KindName,
        properties: PropertySet,
    ) -> Result<(), TreeError> {
        if self.nodes.contains_key(&name) {
            return Err(TreeError::DuplicateKind(name));
        }
        let parent_node = self
            .nodes
            .get_mut(parent)
            .ok_or_else(|| TreeError::ParentNotFound(parent.clone()))?;
        parent_node.children.push(name.clone());

        self.nodes.insert(
            name.clone(),
            KindNode {
                name,
                properties,
                parent: Some(parent.clone()),
                children: Vec::new(),
            },
        );
        Ok(())
    }

    /// Removes `name` together with all of its descendants.
    ///
    /// Returns removed names in breadth-first order, starting with `name`.
    pub fn remove_subtree(&mut self, name: &KindName) -> Result<Vec<KindName>, TreeError> {
        if name.is_root() {
            return Err(TreeError::RootRemoval);
        }
        let parent = self
            .nodes
            .get(name)
            .ok_or_else(|| TreeError::KindNotFound(name.clone()))?
            .parent
            .clone();
        if let Some(parent_node) = parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            parent_node.children.retain(|child| child != name);
        }

        let mut removed = Vec::new();
        let mut queue = VecDeque::from([name.clone()]);
        while let Some(current) = queue.pop_front() {
            if let Some(node) = self.nodes.remove(&current) {
                queue.extend(node.children);
                removed.push(current);
            }
        }
        Ok(removed)
    }

    /// Walks the tree depth-first from the root, parents before children.
    pub fn iter_preorder(&self) -> PreorderIter<'_> {
        PreorderIter {
            tree: self,
            stack: vec![self.root()],
        }
    }
}

impl Default for OntologyTree {
    fn default() -> Self {
        Self::with_root()
    }
}

/// Pre-order iterator over tree nodes.
pub struct PreorderIter<'tree> {
    tree: &'tree OntologyTree,
    stack: Vec<&'tree KindNode>,
}

impl<'tree> Iterator for PreorderIter<'tree> {
    type Item = &'tree KindNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let tree = self.tree;
        self.stack.extend(
            node.children
                .iter()
                .rev()
                .filter_map(|child| tree.nodes.get(child)),
        );
        Some(node)
    }
}
