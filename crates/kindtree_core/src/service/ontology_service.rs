//! Ontology tree use-case service.
//!
//! # Responsibility
//! - Run every taxonomy operation as one load -> mutate -> save cycle.
//! - Translate expected domain conditions into logged sentinel results.
//!
//! # Invariants
//! - Properties are copied from the parent exactly once, at creation time.
//! - Creating an existing kind never touches the stored tree.
//! - Failed updates and lookups never persist anything.
//! - Mutating cycles are serialized within one service instance. Separate
//!   processes sharing a store still race: the later save wins.

use crate::model::kind::{
    KindName, KindNameError, KindNode, OntologyTree, PropertySet, TreeError,
};
use crate::repo::ontology_repo::{OntologyStore, StoreError};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by ontology service operations.
pub type OntologyResult<T> = Result<T, OntologyError>;

/// Failures that cannot be expressed as a sentinel result.
#[derive(Debug)]
pub enum OntologyError {
    /// Kind argument is blank after trim.
    InvalidKindName(KindNameError),
    /// Tree structure rejected a mutation the service did not anticipate.
    Tree(TreeError),
    /// Store-level failure.
    Store(StoreError),
}

impl Display for OntologyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKindName(err) => write!(f, "{err}"),
            Self::Tree(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OntologyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidKindName(err) => Some(err),
            Self::Tree(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<KindNameError> for OntologyError {
    fn from(value: KindNameError) -> Self {
        Self::InvalidKindName(value)
    }
}

impl From<TreeError> for OntologyError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

impl From<StoreError> for OntologyError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Kind taxonomy service facade.
pub struct OntologyService<S: OntologyStore> {
    store: S,
    cycle_lock: Mutex<()>,
}

impl<S: OntologyStore> OntologyService<S> {
    /// Creates service from store implementation.
    pub fn new(store: S) -> Self {
        Self {
            store,
            cycle_lock: Mutex::new(()),
        }
    }

    /// Adds `kind` under `parent`, initializing the tree on first write.
    ///
    /// A missing parent is first added as a child of the root. The new kind
    /// receives `properties` plus every property its parent has right now.
    /// If `kind` already exists anywhere, nothing changes.
    ///
    /// Returns the tree as it stands after the call.
    pub fn create_kind<I>(
        &self,
        kind: &str,
        parent: &str,
        properties: I,
    ) -> OntologyResult<OntologyTree>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let kind = KindName::new(kind)?;
        let parent = KindName::new(parent)?;
        let properties: PropertySet = properties.into_iter().map(Into::into).collect();

        let _cycle = self.cycle_lock.lock();
        let tree = match self.store.load_ontology_graph()? {
            Some(tree) => tree,
            None => {
                info!(
                    "event=ontology_init module=service status=ok root={}",
                    KindName::root()
                );
                OntologyTree::with_root()
            }
        };
        self.insert_kind(tree, kind, parent, properties)
    }

    /// Same as [`Self::create_kind`] but starts from an already loaded tree.
    ///
    /// Lets batch callers chain creations without reloading in between.
    pub fn create_kind_on<I>(
        &self,
        tree: OntologyTree,
        kind: &str,
        parent: &str,
        properties: I,
    ) -> OntologyResult<OntologyTree>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let kind = KindName::new(kind)?;
        let parent = KindName::new(parent)?;
        let properties: PropertySet = properties.into_iter().map(Into::into).collect();

        let _cycle = self.cycle_lock.lock();
        self.insert_kind(tree, kind, parent, properties)
    }

    /// Removes `kind` and its whole subtree.
    ///
    /// Returns `false` when the tree or kind is absent, or when `kind` is the
    /// root.
    pub fn remove_kind(&self, kind: &str) -> OntologyResult<bool> {
        let kind = KindName::new(kind)?;

        let _cycle = self.cycle_lock.lock();
        let Some(mut tree) = self.load_existing()? else {
            return Ok(false);
        };

        match tree.remove_subtree(&kind) {
            Ok(removed) => {
                self.store.save_ontology_graph(&tree)?;
                info!(
                    "event=kind_remove module=service status=ok kind={kind} removed_count={}",
                    removed.len()
                );
                Ok(true)
            }
            Err(TreeError::KindNotFound(_)) => {
                error!("event=kind_remove module=service status=error error_code=kind_not_found kind={kind}");
                Ok(false)
            }
            Err(TreeError::RootRemoval) => {
                error!("event=kind_remove module=service status=error error_code=root_removal kind={kind}");
                Ok(false)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Renames properties of `kind` pairwise: `old[i]` becomes `new[i]`.
    ///
    /// Pairs apply in order, so a later pair sees earlier renames. Either all
    /// pairs apply and the tree is saved once, or nothing is saved. Returns
    /// `false` when the lists differ in length, the kind is absent, or an old
    /// property is missing.
    ///
    /// Descendants keep the copies they inherited at creation.
    pub fn update_properties_of_kind<O, N>(
        &self,
        kind: &str,
        old_properties: &[O],
        new_properties: &[N],
    ) -> OntologyResult<bool>
    where
        O: AsRef<str>,
        N: AsRef<str>,
    {
        let kind = KindName::new(kind)?;
        if old_properties.len() != new_properties.len() {
            error!(
                "event=kind_update_properties module=service status=error error_code=length_mismatch kind={kind} old_count={} new_count={}",
                old_properties.len(),
                new_properties.len()
            );
            return Ok(false);
        }

        let _cycle = self.cycle_lock.lock();
        let Some(mut tree) = self.load_existing()? else {
            return Ok(false);
        };
        let Some(node) = lookup_kind(&tree, &kind) else {
            return Ok(false);
        };

        let mut updated = node.properties().clone();
        for (old, new) in old_properties.iter().zip(new_properties) {
            let old = old.as_ref();
            if !updated.remove(old) {
                error!(
                    "event=kind_update_properties module=service status=error error_code=property_not_found kind={kind} property={old}"
                );
                return Ok(false);
            }
            updated.insert(new.as_ref().to_string());
        }

        if let Some(slot) = tree.properties_mut(&kind) {
            *slot = updated;
        }
        self.store.save_ontology_graph(&tree)?;
        info!(
            "event=kind_update_properties module=service status=ok kind={kind} pair_count={}",
            old_properties.len()
        );
        Ok(true)
    }

    /// Lists direct children of `kind` in insertion order.
    ///
    /// Returns an empty list when no tree exists yet, and `None` when the
    /// tree exists but `kind` does not.
    pub fn get_descendant_kinds(&self, kind: &str) -> OntologyResult<Option<Vec<String>>> {
        let kind = KindName::new(kind)?;
        let Some(tree) = self.store.load_ontology_graph()? else {
            return Ok(Some(Vec::new()));
        };

        Ok(lookup_kind(&tree, &kind).map(|node| {
            node.children()
                .iter()
                .map(|child| child.as_str().to_string())
                .collect()
        }))
    }

    /// Returns the stored properties of `kind`.
    pub fn get_kind_properties(&self, kind: &str) -> OntologyResult<Option<PropertySet>> {
        let kind = KindName::new(kind)?;
        let Some(tree) = self.load_existing()? else {
            return Ok(None);
        };
        Ok(lookup_kind(&tree, &kind).map(|node| node.properties().clone()))
    }

    /// Checks that every entry of `properties` is a property of `kind`.
    ///
    /// An absent kind yields `false`.
    pub fn are_properties_in_kind<P: AsRef<str>>(
        &self,
        properties: &[P],
        kind: &str,
    ) -> OntologyResult<bool> {
        let kind = KindName::new(kind)?;
        let Some(tree) = self.load_existing()? else {
            return Ok(false);
        };
        let Some(node) = lookup_kind(&tree, &kind) else {
            return Ok(false);
        };
        let kind_properties = node.properties();

        if let Some(missing) = properties
            .iter()
            .map(AsRef::as_ref)
            .find(|property| !kind_properties.contains(*property))
        {
            error!(
                "event=kind_check_properties module=service status=error error_code=property_not_found kind={kind} property={missing}"
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Loads the full tree as currently persisted.
    pub fn ontology_graph(&self) -> OntologyResult<Option<OntologyTree>> {
        Ok(self.store.load_ontology_graph()?)
    }

    fn insert_kind(
        &self,
        mut tree: OntologyTree,
        kind: KindName,
        parent: KindName,
        mut properties: PropertySet,
    ) -> OntologyResult<OntologyTree> {
        let mut changed = false;

        // The root always exists, so one repair step reaches a valid parent.
        if !tree.contains(&parent) {
            let root = KindName::root();
            let inherited = tree.root().properties().clone();
            tree.insert_child(&root, parent.clone(), inherited)?;
            changed = true;
            warn!(
                "event=kind_create module=service status=parent_added kind={parent} parent={root}"
            );
        }

        if let Some(parent_node) = tree.get(&parent) {
            properties.extend(parent_node.properties().iter().cloned());
        }

        match tree.insert_child(&parent, kind.clone(), properties) {
            Ok(()) => {
                changed = true;
                info!("event=kind_create module=service status=ok kind={kind} parent={parent}");
            }
            Err(TreeError::DuplicateKind(_)) => {
                info!("event=kind_create module=service status=exists kind={kind}");
            }
            Err(other) => return Err(other.into()),
        }

        if changed {
            self.store.save_ontology_graph(&tree)?;
        }
        Ok(tree)
    }

    fn load_existing(&self) -> OntologyResult<Option<OntologyTree>> {
        let tree = self.store.load_ontology_graph()?;
        if tree.is_none() {
            error!("event=ontology_load module=service status=error error_code=ontology_empty");
        }
        Ok(tree)
    }
}

fn lookup_kind<'tree>(tree: &'tree OntologyTree, kind: &KindName) -> Option<&'tree KindNode> {
    let node = tree.get(kind);
    if node.is_none() {
        error!("event=kind_lookup module=service status=error error_code=kind_not_found kind={kind}");
    }
    node
}

#[cfg(test)]
mod tests {
    use super::OntologyService;
    use crate::model::kind::{KindName, OntologyTree, PropertySet, ROOT_KIND};
    use crate::repo::ontology_repo::MemoryOntologyStore;

    const NO_PROPERTIES: [&str; 0] = [];

    #[test]
    fn create_kind_on_threads_tree_without_reloading() {
        let store = MemoryOntologyStore::new();
        let service = OntologyService::new(&store);

        let tree = service
            .create_kind("Person", ROOT_KIND, NO_PROPERTIES)
            .unwrap();
        let tree = service
            .create_kind_on(tree, "Employee", "Person", ["salary"])
            .unwrap();

        assert_eq!(tree.kind_count(), 3);
        assert_eq!(store.snapshot(), Some(tree));
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn blank_kind_name_is_rejected() {
        let service = OntologyService::new(MemoryOntologyStore::new());
        assert!(service.create_kind("  ", ROOT_KIND, NO_PROPERTIES).is_err());
        assert!(service.remove_kind("").is_err());
    }

    #[test]
    fn length_mismatch_does_not_touch_store() {
        let store = MemoryOntologyStore::new();
        let service = OntologyService::new(&store);
        service.create_kind("Person", ROOT_KIND, ["name"]).unwrap();

        let applied = service
            .update_properties_of_kind("Person", &["name"], &["full_name", "extra"])
            .unwrap();
        assert!(!applied);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn seeded_store_is_read_without_saving_again() {
        let mut seeded = OntologyTree::with_root();
        seeded
            .insert_child(
                &KindName::root(),
                KindName::new("Person").unwrap(),
                ["name".to_string()].into_iter().collect::<PropertySet>(),
            )
            .unwrap();
        let store = MemoryOntologyStore::with_snapshot(seeded.clone());
        let service = OntologyService::new(&store);

        assert_eq!(
            service.get_descendant_kinds(ROOT_KIND).unwrap(),
            Some(vec!["Person".to_string()])
        );
        let tree = service
            .create_kind("person", ROOT_KIND, ["age"])
            .unwrap();
        assert_eq!(tree, seeded);
        assert_eq!(store.save_count(), 0);
    }
}
