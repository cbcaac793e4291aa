//! Document outline (bookmarks).
//!
//! Outline items live in an arena; each node keeps the index of its parent
//! and the dictionary it was read from. Reading walks the linked
//! `/First`/`/Next`/`/Parent` structure without recursion, and edits relink
//! the dictionaries in place so nothing needs rebuilding at close.

use super::destination::PdfDestination;
use super::registry::ObjectRegistry;
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfObject};
use crate::utils::decode_text;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// Index of an outline item inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutlineId(usize);

impl OutlineId {
    pub const ROOT: Self = Self(0);
}

#[derive(Debug, Clone)]
pub struct PdfOutline {
    pub title: String,
    /// Backing dictionary; `None` for a root that has not been written yet
    pub objref: Option<ObjRef>,
    pub parent: Option<OutlineId>,
    pub children: Vec<OutlineId>,
    pub destination: Option<PdfDestination>,
    removed: bool,
}

impl PdfOutline {
    fn new(title: String, objref: Option<ObjRef>, parent: Option<OutlineId>) -> Self {
        Self {
            title,
            objref,
            parent,
            children: Vec::new(),
            destination: None,
            removed: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PdfOutlineTree {
    nodes: Vec<PdfOutline>,
    /// Page each item points to, for removal together with the page
    by_page: FxHashMap<ObjRef, Vec<OutlineId>>,
}

impl PdfOutlineTree {
    /// A root without any item and without a dictionary.
    pub fn empty() -> Self {
        Self {
            nodes: vec![PdfOutline::new("Outlines".into(), None, None)],
            by_page: FxHashMap::default(),
        }
    }

    /// Reads the tree under the `/Outlines` dictionary `root`.
    pub fn read(
        registry: &ObjectRegistry,
        root: ObjRef,
        dests: &BTreeMap<Vec<u8>, PdfObject>,
        pages: &[ObjRef],
    ) -> Self {
        let mut tree = Self::empty();
        tree.nodes[0].objref = Some(root);
        let mut visited = FxHashSet::default();
        visited.insert(root);

        let first_of = |r: ObjRef| match registry.lookup(r).get("First") {
            Some(PdfObject::Ref(first)) => Some(*first),
            _ => None,
        };
        let next_of = |r: ObjRef| match registry.lookup(r).get("Next") {
            Some(PdfObject::Ref(next)) => Some(*next),
            _ => None,
        };

        let mut parent = OutlineId::ROOT;
        let mut current = first_of(root);
        while let Some(item) = current {
            if !visited.insert(item) {
                tracing::warn!(item = %item, "outline item visited twice, stopping");
                break;
            }
            let id = tree.push_item(registry, item, parent, dests, pages);

            if let Some(first) = first_of(item) {
                parent = id;
                current = Some(first);
                continue;
            }
            // no children: move to the next sibling, or climb until an ancestor has one
            let mut node = id;
            current = None;
            loop {
                let Some(r) = tree.nodes[node.0].objref else {
                    break;
                };
                if let Some(next) = next_of(r) {
                    current = Some(next);
                    parent = tree.nodes[node.0].parent.unwrap_or(OutlineId::ROOT);
                    break;
                }
                match tree.nodes[node.0].parent {
                    Some(p) if p != OutlineId::ROOT => node = p,
                    _ => break,
                }
            }
        }
        tree
    }

    fn push_item(
        &mut self,
        registry: &ObjectRegistry,
        item: ObjRef,
        parent: OutlineId,
        dests: &BTreeMap<Vec<u8>, PdfObject>,
        pages: &[ObjRef],
    ) -> OutlineId {
        let obj = registry.lookup(item);
        let title = obj
            .get("Title")
            .map(|t| registry.resolve(t))
            .and_then(|t| t.as_string().ok())
            .map(decode_text)
            .unwrap_or_default();
        let id = OutlineId(self.nodes.len());
        let mut node = PdfOutline::new(title, Some(item), Some(parent));
        node.destination = PdfDestination::from_item(registry, obj);
        if let Some(page) = node
            .destination
            .as_ref()
            .and_then(|d| d.page_ref(registry, dests, pages))
        {
            self.by_page.entry(page).or_default().push(id);
        }
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> &PdfOutline {
        &self.nodes[0]
    }

    pub fn get(&self, id: OutlineId) -> Option<&PdfOutline> {
        self.nodes.get(id.0).filter(|n| !n.removed)
    }

    /// Items in document order.
    pub fn iter(&self) -> impl Iterator<Item = (OutlineId, &PdfOutline)> {
        let mut order = Vec::new();
        let mut stack = vec![OutlineId::ROOT];
        while let Some(id) = stack.pop() {
            if id != OutlineId::ROOT {
                order.push(id);
            }
            stack.extend(self.nodes[id.0].children.iter().rev());
        }
        order.into_iter().map(|id| (id, &self.nodes[id.0]))
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().skip(1).filter(|n| !n.removed).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn outlines_for_page(&self, page: ObjRef) -> &[OutlineId] {
        self.by_page.get(&page).map_or(&[], Vec::as_slice)
    }

    /// Root dictionary, created on first use. Returns it and whether it is new.
    pub(crate) fn ensure_root(&mut self, registry: &mut ObjectRegistry) -> Result<(ObjRef, bool)> {
        if let Some(r) = self.nodes[0].objref {
            return Ok((r, false));
        }
        let r = registry.register(crate::pdf_dict! {
            "Type" => PdfObject::name("Outlines"),
            "Count" => 0,
        })?;
        self.nodes[0].objref = Some(r);
        Ok((r, true))
    }

    /// Appends a child under `parent`, linking it after the current last child.
    pub fn add_outline(
        &mut self,
        registry: &mut ObjectRegistry,
        parent: OutlineId,
        title: &str,
        destination: Option<PdfDestination>,
    ) -> Result<OutlineId> {
        if self.get(parent).is_none() && parent != OutlineId::ROOT {
            return Err(PdfError::InvalidArgument("unknown outline item".into()));
        }
        let parent_ref = match parent {
            OutlineId::ROOT => self.ensure_root(registry)?.0,
            _ => self.nodes[parent.0]
                .objref
                .ok_or_else(|| PdfError::InvalidArgument("outline item has no dictionary".into()))?,
        };
        let mut dict = crate::pdf_dict! {
            "Title" => PdfObject::text(title),
            "Parent" => parent_ref,
        };
        if let Some(dest) = &destination {
            dict.insert("Dest".into(), dest.to_object());
        }
        let last = self.nodes[parent.0].children.last().copied();
        if let Some(last_ref) = last.and_then(|l| self.nodes[l.0].objref) {
            dict.insert("Prev".into(), PdfObject::Ref(last_ref));
        }
        let item = registry.register(dict)?;

        if let Some(last_ref) = last.and_then(|l| self.nodes[l.0].objref) {
            registry.get_dict_mut(last_ref)?.insert("Next".into(), PdfObject::Ref(item));
        }
        let parent_dict = registry.get_dict_mut(parent_ref)?;
        if last.is_none() {
            parent_dict.insert("First".into(), PdfObject::Ref(item));
        }
        parent_dict.insert("Last".into(), PdfObject::Ref(item));

        let id = OutlineId(self.nodes.len());
        let mut node = PdfOutline::new(title.to_string(), Some(item), Some(parent));
        if let Some(PdfDestination::Explicit(arr)) = &destination
            && let Some(PdfObject::Ref(page)) = arr.first()
        {
            self.by_page.entry(*page).or_default().push(id);
        }
        node.destination = destination;
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        self.update_counts(registry, parent)?;
        Ok(id)
    }

    /// Unlinks `id` (and its subtree) from its siblings and parent.
    pub fn remove_outline(&mut self, registry: &mut ObjectRegistry, id: OutlineId) -> Result<()> {
        if id == OutlineId::ROOT || self.get(id).is_none() {
            return Ok(());
        }
        let Some(parent) = self.nodes[id.0].parent else {
            return Ok(());
        };
        let siblings = &mut self.nodes[parent.0].children;
        let Some(pos) = siblings.iter().position(|&c| c == id) else {
            return Ok(());
        };
        siblings.remove(pos);
        let prev = pos.checked_sub(1).map(|p| siblings[p]);
        let next = siblings.get(pos).copied();
        let prev_ref = prev.and_then(|p| self.nodes[p.0].objref);
        let next_ref = next.and_then(|n| self.nodes[n.0].objref);

        if let Some(prev_ref) = prev_ref {
            let dict = registry.get_dict_mut(prev_ref)?;
            match next_ref {
                Some(n) => dict.insert("Next".into(), PdfObject::Ref(n)),
                None => dict.shift_remove("Next"),
            };
        }
        if let Some(next_ref) = next_ref {
            let dict = registry.get_dict_mut(next_ref)?;
            match prev_ref {
                Some(p) => dict.insert("Prev".into(), PdfObject::Ref(p)),
                None => dict.shift_remove("Prev"),
            };
        }
        if let Some(parent_ref) = self.nodes[parent.0].objref {
            let first = self.nodes[parent.0].children.first().and_then(|c| self.nodes[c.0].objref);
            let last = self.nodes[parent.0].children.last().and_then(|c| self.nodes[c.0].objref);
            let dict = registry.get_dict_mut(parent_ref)?;
            match (first, last) {
                (Some(first), Some(last)) => {
                    dict.insert("First".into(), PdfObject::Ref(first));
                    dict.insert("Last".into(), PdfObject::Ref(last));
                }
                _ => {
                    dict.shift_remove("First");
                    dict.shift_remove("Last");
                }
            }
        }

        // release the subtree
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            self.nodes[node.0].removed = true;
            stack.extend(self.nodes[node.0].children.iter().copied());
            if let Some(r) = self.nodes[node.0].objref {
                registry.free(r);
            }
        }
        for ids in self.by_page.values_mut() {
            ids.retain(|i| !self.nodes[i.0].removed);
        }
        self.update_counts(registry, parent)
    }

    /// Removes every item pointing at `page`.
    pub fn remove_outlines_for_page(&mut self, registry: &mut ObjectRegistry, page: ObjRef) -> Result<()> {
        let ids = self.by_page.remove(&page).unwrap_or_default();
        for id in ids {
            self.remove_outline(registry, id)?;
        }
        Ok(())
    }

    /// Rewrites `/Count` from `from` up to the root: open descendants for items,
    /// all visible items for the root.
    fn update_counts(&mut self, registry: &mut ObjectRegistry, from: OutlineId) -> Result<()> {
        let mut current = Some(from);
        while let Some(id) = current {
            let count = self.visible_descendants(id) as i64;
            if let Some(r) = self.nodes[id.0].objref {
                let dict = registry.get_dict_mut(r)?;
                if count == 0 && id != OutlineId::ROOT {
                    dict.shift_remove("Count");
                } else {
                    dict.insert("Count".into(), PdfObject::Int(count));
                }
            }
            current = self.nodes[id.0].parent;
        }
        Ok(())
    }

    fn visible_descendants(&self, id: OutlineId) -> usize {
        let mut count = 0;
        let mut stack: Vec<OutlineId> = self.nodes[id.0].children.clone();
        while let Some(child) = stack.pop() {
            count += 1;
            stack.extend(self.nodes[child.0].children.iter().copied());
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_file_outline(registry: &mut ObjectRegistry) -> ObjRef {
        // root -> [A -> [A1], B]
        let root = registry.allocate().unwrap();
        let a = registry.allocate().unwrap();
        let a1 = registry.allocate().unwrap();
        let b = registry.allocate().unwrap();
        registry
            .set(root, crate::pdf_dict! { "First" => a, "Last" => b, "Count" => 3 })
            .unwrap();
        registry
            .set(a, crate::pdf_dict! {
                "Title" => PdfObject::text("A"), "Parent" => root,
                "First" => a1, "Last" => a1, "Next" => b,
            })
            .unwrap();
        registry
            .set(a1, crate::pdf_dict! { "Title" => PdfObject::text("A1"), "Parent" => a })
            .unwrap();
        registry
            .set(b, crate::pdf_dict! { "Title" => PdfObject::text("B"), "Parent" => root, "Prev" => a })
            .unwrap();
        root
    }

    #[test]
    fn test_read_iteratively() {
        let mut registry = ObjectRegistry::new();
        let root = build_file_outline(&mut registry);
        let tree = PdfOutlineTree::read(&registry, root, &BTreeMap::new(), &[]);
        let titles: Vec<&str> = tree.iter().map(|(_, o)| o.title.as_str()).collect();
        assert_eq!(titles, ["A", "A1", "B"]);
        let (a1_id, a1) = tree.iter().nth(1).unwrap();
        assert_eq!(tree.get(a1.parent.unwrap()).unwrap().title, "A");
        assert_ne!(a1_id, OutlineId::ROOT);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut registry = ObjectRegistry::new();
        let root = registry.allocate().unwrap();
        let a = registry.allocate().unwrap();
        registry.set(root, crate::pdf_dict! { "First" => a }).unwrap();
        registry
            .set(a, crate::pdf_dict! { "Title" => PdfObject::text("A"), "Parent" => root, "Next" => a })
            .unwrap();
        let tree = PdfOutlineTree::read(&registry, root, &BTreeMap::new(), &[]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_add_and_remove_relink() {
        let mut registry = ObjectRegistry::new();
        let page = registry.register(crate::pdf_dict! {}).unwrap();
        let mut tree = PdfOutlineTree::empty();
        let dest = PdfDestination::explicit(page, "Fit", &[]);
        let first = tree
            .add_outline(&mut registry, OutlineId::ROOT, "one", Some(dest))
            .unwrap();
        let second = tree.add_outline(&mut registry, OutlineId::ROOT, "two", None).unwrap();
        let root_ref = tree.root().objref.unwrap();
        assert_eq!(registry.get(root_ref).unwrap().get("Count"), Some(&PdfObject::Int(2)));

        tree.remove_outlines_for_page(&mut registry, page).unwrap();
        let root_dict = registry.get(root_ref).unwrap();
        let second_ref = tree.get(second).unwrap().objref.unwrap();
        assert_eq!(root_dict.get("First"), Some(&PdfObject::Ref(second_ref)));
        assert_eq!(root_dict.get("Count"), Some(&PdfObject::Int(1)));
        assert!(registry.get(second_ref).unwrap().get("Prev").is_none());
        assert!(tree.get(first).is_none());
    }
}
