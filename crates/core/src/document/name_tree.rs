//! Name and number trees.
//!
//! Both are sorted maps stored as a hierarchy of `/Kids` nodes with
//! `/Limits`, or as one flat `/Names` (`/Nums`) array at the root. The
//! mapping is flattened on first access, kept in memory, and rebuilt into
//! the physical form only when the document is written.

use super::registry::ObjectRegistry;
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfDict, PdfObject};
use itertools::Itertools;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Entries per leaf, and kids per intermediate node.
pub const NODE_SIZE: usize = 40;

/// Key type of a tree: byte strings for name trees, integers for number trees.
pub trait TreeKey: Ord + Clone + Debug {
    /// Name of the array holding key/value pairs.
    const ARRAY_KEY: &'static str;

    fn from_object(obj: &PdfObject) -> Option<Self>;
    fn to_object(&self) -> PdfObject;
    fn describe(&self) -> String;
}

impl TreeKey for Vec<u8> {
    const ARRAY_KEY: &'static str = "Names";

    fn from_object(obj: &PdfObject) -> Option<Self> {
        match obj {
            PdfObject::String(s) => Some(s.clone()),
            // some writers use names as keys
            PdfObject::Name(n) => Some(n.as_bytes().to_vec()),
            _ => None,
        }
    }

    fn to_object(&self) -> PdfObject {
        PdfObject::String(self.clone())
    }

    fn describe(&self) -> String {
        String::from_utf8_lossy(self).into_owned()
    }
}

impl TreeKey for i64 {
    const ARRAY_KEY: &'static str = "Nums";

    fn from_object(obj: &PdfObject) -> Option<Self> {
        match obj {
            PdfObject::Int(n) => Some(*n),
            PdfObject::Real(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    fn to_object(&self) -> PdfObject {
        PdfObject::Int(*self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// A name or number tree of one document.
#[derive(Debug, Clone)]
pub struct PdfTree<K: TreeKey> {
    /// Root value as found in the file (reference or direct dictionary)
    source: Option<PdfObject>,
    /// Legacy `/Dests` dictionary merged into the Dests name tree
    legacy: Option<PdfObject>,
    entries: Option<BTreeMap<K, PdfObject>>,
    /// Indirect nodes of the tree as read, replaced on rebuild
    nodes: Vec<ObjRef>,
    modified: bool,
}

pub type PdfNameTree = PdfTree<Vec<u8>>;
pub type PdfNumberTree = PdfTree<i64>;

impl<K: TreeKey> PdfTree<K> {
    /// Tree backed by `source`, which may be absent for a new tree.
    pub fn new(source: Option<PdfObject>) -> Self {
        Self {
            source,
            legacy: None,
            entries: None,
            nodes: Vec::new(),
            modified: false,
        }
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn source(&self) -> Option<&PdfObject> {
        self.source.as_ref()
    }

    /// The flattened mapping, read from the file on first call.
    pub fn entries(&mut self, registry: &ObjectRegistry) -> &BTreeMap<K, PdfObject> {
        self.load(registry)
    }

    /// Current entries without caching them; for read-only callers.
    pub fn snapshot(&self, registry: &ObjectRegistry) -> BTreeMap<K, PdfObject> {
        match &self.entries {
            Some(entries) => entries.clone(),
            None => flatten::<K>(registry, self.source.as_ref(), self.legacy.as_ref()).0,
        }
    }

    pub fn get(&mut self, registry: &ObjectRegistry, key: &K) -> Option<&PdfObject> {
        self.load(registry).get(key)
    }

    /// Adds an entry; existing keys (read from the file or added earlier) are rejected.
    pub fn add_entry(&mut self, registry: &ObjectRegistry, key: K, value: PdfObject) -> Result<()> {
        let entries = self.load(registry);
        if entries.contains_key(&key) {
            return Err(PdfError::DuplicateKey(key.describe()));
        }
        entries.insert(key, value);
        self.modified = true;
        Ok(())
    }

    /// Removes `key`; returns the old value.
    pub fn remove_entry(&mut self, registry: &ObjectRegistry, key: &K) -> Option<PdfObject> {
        let removed = self.load(registry).remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    fn load(&mut self, registry: &ObjectRegistry) -> &mut BTreeMap<K, PdfObject> {
        if self.entries.is_none() {
            let (entries, nodes) = flatten::<K>(registry, self.source.as_ref(), self.legacy.as_ref());
            self.nodes = nodes;
            self.entries = Some(entries);
        }
        self.entries.get_or_insert_with(BTreeMap::new)
    }

    /// Writes the tree into indirect objects and returns the root reference.
    ///
    /// Nodes of the previous physical form are released.
    pub fn build(&mut self, registry: &mut ObjectRegistry) -> Result<ObjRef> {
        let entries: Vec<(K, PdfObject)> = self
            .load(registry)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let root_ref = match self.source {
            Some(PdfObject::Ref(r)) if registry.contains(r) => r,
            _ => registry.allocate()?,
        };
        for node in std::mem::take(&mut self.nodes) {
            if node != root_ref {
                registry.free(node);
            }
        }

        let mut root = PdfDict::new();
        if entries.len() <= NODE_SIZE {
            root.insert(K::ARRAY_KEY.into(), pairs_array(&entries));
        } else {
            let mut level: Vec<(ObjRef, K, K)> = Vec::new();
            for chunk in &entries.iter().chunks(NODE_SIZE) {
                let chunk: Vec<&(K, PdfObject)> = chunk.collect();
                let (Some(first), Some(last)) = (chunk.first(), chunk.last()) else {
                    continue;
                };
                let (low, high) = (first.0.clone(), last.0.clone());
                let mut leaf = PdfDict::new();
                leaf.insert("Limits".into(), limits(&low, &high));
                leaf.insert(
                    K::ARRAY_KEY.into(),
                    PdfObject::Array(
                        chunk
                            .iter()
                            .flat_map(|(k, v)| [k.to_object(), v.clone()])
                            .collect(),
                    ),
                );
                level.push((registry.register(leaf)?, low, high));
            }
            while level.len() > NODE_SIZE {
                let mut parents = Vec::new();
                for group in &level.into_iter().chunks(NODE_SIZE) {
                    let group: Vec<(ObjRef, K, K)> = group.collect();
                    let (Some(first), Some(last)) = (group.first(), group.last()) else {
                        continue;
                    };
                    let (low, high) = (first.1.clone(), last.2.clone());
                    let node = crate::pdf_dict! {
                        "Limits" => limits(&low, &high),
                        "Kids" => PdfObject::Array(group.iter().map(|(r, _, _)| PdfObject::Ref(*r)).collect()),
                    };
                    parents.push((registry.register(node)?, low, high));
                }
                level = parents;
            }
            root.insert(
                "Kids".into(),
                PdfObject::Array(level.iter().map(|(r, _, _)| PdfObject::Ref(*r)).collect()),
            );
        }

        registry.set(root_ref, root)?;
        self.source = Some(PdfObject::Ref(root_ref));
        self.modified = false;
        Ok(root_ref)
    }
}

impl PdfNameTree {
    /// Name tree that also reads a legacy `/Dests` dictionary.
    pub fn with_legacy(source: Option<PdfObject>, legacy: Option<PdfObject>) -> Self {
        Self {
            legacy,
            ..Self::new(source)
        }
    }

    pub fn has_legacy(&self) -> bool {
        self.legacy.is_some()
    }
}

/// A tree together with the registry it reads from.
pub struct TreeView<'a, K: TreeKey> {
    pub(crate) tree: &'a mut PdfTree<K>,
    pub(crate) registry: &'a ObjectRegistry,
}

impl<K: TreeKey> TreeView<'_, K> {
    pub fn get_entries(&mut self) -> &BTreeMap<K, PdfObject> {
        self.tree.entries(self.registry)
    }

    pub fn get(&mut self, key: &K) -> Option<&PdfObject> {
        self.tree.get(self.registry, key)
    }

    pub fn add_entry(&mut self, key: K, value: impl Into<PdfObject>) -> Result<()> {
        self.tree.add_entry(self.registry, key, value.into())
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<PdfObject> {
        self.tree.remove_entry(self.registry, key)
    }

    pub fn is_modified(&self) -> bool {
        self.tree.is_modified()
    }
}

impl TreeView<'_, Vec<u8>> {
    pub fn get_names(&mut self) -> &BTreeMap<Vec<u8>, PdfObject> {
        self.get_entries()
    }
}

impl TreeView<'_, i64> {
    pub fn get_numbers(&mut self) -> &BTreeMap<i64, PdfObject> {
        self.get_entries()
    }
}

fn pairs_array<K: TreeKey>(entries: &[(K, PdfObject)]) -> PdfObject {
    PdfObject::Array(
        entries
            .iter()
            .flat_map(|(k, v)| [k.to_object(), v.clone()])
            .collect(),
    )
}

fn limits<K: TreeKey>(low: &K, high: &K) -> PdfObject {
    PdfObject::Array(vec![low.to_object(), high.to_object()])
}

/// Walks the tree without recursion. The first occurrence of a key wins.
fn flatten<K: TreeKey>(
    registry: &ObjectRegistry,
    source: Option<&PdfObject>,
    legacy: Option<&PdfObject>,
) -> (BTreeMap<K, PdfObject>, Vec<ObjRef>) {
    let mut entries = BTreeMap::new();
    let mut nodes = Vec::new();
    let mut visited = FxHashSet::default();
    let mut stack: Vec<&PdfObject> = source.into_iter().collect();

    while let Some(node) = stack.pop() {
        if let PdfObject::Ref(r) = node {
            if !visited.insert(*r) {
                tracing::warn!(node = %r, "cycle in tree kids");
                continue;
            }
            nodes.push(*r);
        }
        let Some(dict) = registry.resolve_dict(node) else {
            continue;
        };
        if let Some(PdfObject::Array(pairs)) = registry.get_in(dict, K::ARRAY_KEY) {
            for pair in pairs.chunks_exact(2) {
                match K::from_object(registry.resolve(&pair[0])) {
                    Some(key) => {
                        entries.entry(key).or_insert_with(|| pair[1].clone());
                    }
                    None => tracing::warn!(key = ?pair[0], "ignoring malformed tree key"),
                }
            }
        }
        if let Some(PdfObject::Array(kids)) = registry.get_in(dict, "Kids") {
            stack.extend(kids.iter().rev());
        }
    }

    if let Some(dict) = legacy.and_then(|l| registry.resolve_dict(l)) {
        for (name, value) in dict {
            if let Some(key) = K::from_object(&PdfObject::Name(name.clone())) {
                entries.entry(key).or_insert_with(|| value.clone());
            }
        }
    }
    (entries, nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let registry = ObjectRegistry::new();
        let mut tree = PdfNameTree::new(None);
        tree.add_entry(&registry, key("a"), PdfObject::Int(1)).unwrap();
        let err = tree.add_entry(&registry, key("a"), PdfObject::Int(2)).unwrap_err();
        assert!(matches!(err, PdfError::DuplicateKey(k) if k == "a"));
        assert_eq!(tree.entries(&registry).len(), 1);
    }

    #[test]
    fn test_flatten_kids_and_limits() {
        let mut registry = ObjectRegistry::new();
        let leaf1 = registry
            .register(crate::pdf_dict! {
                "Limits" => PdfObject::Array(vec![PdfObject::string("a"), PdfObject::string("b")]),
                "Names" => PdfObject::Array(vec![
                    PdfObject::string("a"), PdfObject::Int(1),
                    PdfObject::string("b"), PdfObject::Int(2),
                ]),
            })
            .unwrap();
        let leaf2 = registry
            .register(crate::pdf_dict! {
                "Names" => PdfObject::Array(vec![PdfObject::string("c"), PdfObject::Int(3)]),
            })
            .unwrap();
        let root = registry
            .register(crate::pdf_dict! {
                "Kids" => PdfObject::Array(vec![leaf1.into(), leaf2.into(), leaf1.into()]),
            })
            .unwrap();
        let mut tree = PdfNameTree::new(Some(root.into()));
        let keys: Vec<Vec<u8>> = tree.entries(&registry).keys().cloned().collect();
        assert_eq!(keys, vec![key("a"), key("b"), key("c")]);
    }

    #[test]
    fn test_small_tree_builds_flat() {
        let mut registry = ObjectRegistry::new();
        let mut tree = PdfNumberTree::new(None);
        tree.add_entry(&registry, 5, PdfObject::name("x")).unwrap();
        tree.add_entry(&registry, 0, PdfObject::name("y")).unwrap();
        let root = tree.build(&mut registry).unwrap();
        assert_eq!(
            registry.get(root).unwrap().get("Nums"),
            Some(&PdfObject::Array(vec![
                PdfObject::Int(0),
                PdfObject::name("y"),
                PdfObject::Int(5),
                PdfObject::name("x"),
            ]))
        );
        assert!(!tree.is_modified());
    }

    #[test]
    fn test_large_tree_builds_levels() {
        let mut registry = ObjectRegistry::new();
        let mut tree = PdfNumberTree::new(None);
        for i in 0..2000 {
            tree.add_entry(&registry, i, PdfObject::Int(i)).unwrap();
        }
        let root = tree.build(&mut registry).unwrap();
        let kids = registry.get(root).unwrap().get("Kids").unwrap().as_array().unwrap();
        // 50 leaves grouped under 2 intermediate nodes
        assert_eq!(kids.len(), 2);
        let first = registry.resolve(&kids[0]);
        assert_eq!(
            first.get("Limits"),
            Some(&PdfObject::Array(vec![PdfObject::Int(0), PdfObject::Int(1599)]))
        );

        let mut reread = PdfNumberTree::new(Some(root.into()));
        let entries = reread.entries(&registry);
        assert_eq!(entries.len(), 2000);
        assert_eq!(entries.get(&1234), Some(&PdfObject::Int(1234)));
    }

    #[test]
    fn test_legacy_dests_merged() {
        let mut registry = ObjectRegistry::new();
        let legacy = registry
            .register(crate::pdf_dict! { "Old" => PdfObject::Array(vec![]) })
            .unwrap();
        let mut tree = PdfNameTree::with_legacy(None, Some(legacy.into()));
        assert!(tree.get(&registry, &key("Old")).is_some());
        assert!(tree.add_entry(&registry, key("Old"), PdfObject::Null).is_err());
    }
}
