//! Page tree.
//!
//! Pages are collected in document order by walking `/Kids` with an
//! explicit stack. When the page set changes, the tree is written back flat:
//! every page becomes a direct kid of the root `/Pages` node.

use super::registry::ObjectRegistry;
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfDict, PdfObject};
use crate::utils::Rect;
use rustc_hash::FxHashSet;

/// Page attributes a page inherits from its ancestors.
pub const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// A4 portrait, in points.
pub const DEFAULT_PAGE_SIZE: Rect = (0.0, 0.0, 595.0, 842.0);

/// Handle to a page of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PdfPage(pub(crate) ObjRef);

impl PdfPage {
    pub fn objref(&self) -> ObjRef {
        self.0
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PageTree {
    pub root: ObjRef,
    pages: Vec<ObjRef>,
    /// Intermediate `/Pages` nodes below the root
    nodes: Vec<ObjRef>,
    modified: bool,
}

impl PageTree {
    pub fn new(root: ObjRef) -> Self {
        Self {
            root,
            pages: Vec::new(),
            nodes: Vec::new(),
            modified: false,
        }
    }

    /// Collects the pages under `root`. Falls back to every `/Type /Page`
    /// object when the tree yields none.
    pub fn read(registry: &ObjectRegistry, root: ObjRef) -> Self {
        let mut tree = Self::new(root);
        let mut stack = vec![root];
        let mut visited = FxHashSet::default();

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                tracing::warn!(node = %node, "page tree node visited twice");
                continue;
            }
            let Some(dict) = registry.resolve_dict(registry.lookup(node)) else {
                continue;
            };
            let is_page = match dict.get("Type") {
                Some(PdfObject::Name(name)) => name == "Page",
                // untyped leaves without kids are pages
                _ => !dict.contains_key("Kids"),
            };
            if is_page && node != root {
                tree.pages.push(node);
                continue;
            }
            if node != root {
                tree.nodes.push(node);
            }
            if let Some(PdfObject::Array(kids)) = registry.get_in(dict, "Kids") {
                stack.extend(kids.iter().rev().filter_map(|k| k.as_ref().ok()));
            }
        }

        if tree.pages.is_empty() {
            tree.pages = registry
                .live_refs()
                .into_iter()
                .filter(|r| registry.lookup(*r).is_type("Page"))
                .collect();
            if !tree.pages.is_empty() {
                tracing::warn!(pages = tree.pages.len(), "page tree empty, using every page object");
                tree.modified = true;
            }
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn get(&self, index: usize) -> Option<ObjRef> {
        self.pages.get(index).copied()
    }

    pub fn position(&self, page: ObjRef) -> Option<usize> {
        self.pages.iter().position(|&p| p == page)
    }

    pub fn refs(&self) -> &[ObjRef] {
        &self.pages
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Inserts an already registered page dictionary at `index`.
    pub fn insert(&mut self, registry: &mut ObjectRegistry, index: usize, page: ObjRef) -> Result<()> {
        if index > self.pages.len() {
            return Err(PdfError::PageIndexOutOfRange(index));
        }
        registry
            .get_dict_mut(page)?
            .insert("Parent".into(), PdfObject::Ref(self.root));
        self.pages.insert(index, page);
        self.modified = true;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<ObjRef> {
        if index >= self.pages.len() {
            return Err(PdfError::PageIndexOutOfRange(index));
        }
        self.modified = true;
        Ok(self.pages.remove(index))
    }

    /// Rewrites the tree flat under the root when pages were added, removed or moved.
    pub fn write(&mut self, registry: &mut ObjectRegistry) -> Result<()> {
        if !self.modified {
            return Ok(());
        }
        let nodes: FxHashSet<ObjRef> = self.nodes.iter().copied().collect();
        for &page in &self.pages {
            if registry.is_flushed(page) {
                continue;
            }
            let parent = registry.lookup(page).get("Parent").and_then(|p| p.as_ref().ok());
            if parent == Some(self.root) {
                continue;
            }
            // attributes held by intermediate nodes are lost with them
            let mut inherited = Vec::new();
            for key in INHERITABLE {
                if registry.lookup(page).get(key).is_none()
                    && let Some(value) = inherited_from(registry, page, key, |n| nodes.contains(&n))
                {
                    inherited.push((key, value));
                }
            }
            let dict = registry.get_dict_mut(page)?;
            for (key, value) in inherited {
                dict.insert(key.into(), value);
            }
            dict.insert("Parent".into(), PdfObject::Ref(self.root));
        }
        for node in std::mem::take(&mut self.nodes) {
            registry.free(node);
        }

        let kids = self.pages.iter().map(|&p| PdfObject::Ref(p)).collect();
        let root = registry.get_dict_mut(self.root)?;
        root.insert("Kids".into(), PdfObject::Array(kids));
        root.insert("Count".into(), PdfObject::from(self.pages.len()));
        self.modified = false;
        Ok(())
    }
}

/// Dictionary of a fresh page with the given media box.
pub(crate) fn new_page_dict(size: Rect, resources: ObjRef) -> PdfDict {
    crate::pdf_dict! {
        "Type" => PdfObject::name("Page"),
        "MediaBox" => PdfObject::numbers(&[size.0, size.1, size.2, size.3]),
        "Resources" => resources,
    }
}

/// Value of `key` on `page` or the nearest ancestor that has it.
pub fn inherited_attribute(registry: &ObjectRegistry, page: ObjRef, key: &str) -> Option<PdfObject> {
    if let Some(value) = registry.lookup(page).get(key) {
        return Some(value.clone());
    }
    inherited_from(registry, page, key, |_| true)
}

/// Walks `/Parent` links above `page`, only looking at nodes accepted by `filter`.
fn inherited_from(
    registry: &ObjectRegistry,
    page: ObjRef,
    key: &str,
    filter: impl Fn(ObjRef) -> bool,
) -> Option<PdfObject> {
    let mut visited = FxHashSet::default();
    let mut current = registry.lookup(page).get("Parent")?.as_ref().ok()?;
    while visited.insert(current) {
        let node = registry.lookup(current);
        if filter(current)
            && let Some(value) = node.get(key)
        {
            return Some(value.clone());
        }
        current = node.get("Parent")?.as_ref().ok()?;
    }
    None
}

/// Reads a rectangle array.
pub(crate) fn rect_from(registry: &ObjectRegistry, obj: &PdfObject) -> Option<Rect> {
    let arr = registry.resolve(obj).as_array().ok()?;
    let values: Vec<f64> = arr
        .iter()
        .map(|v| registry.resolve(v).as_num())
        .collect::<Result<_>>()
        .ok()?;
    let [x0, y0, x1, y1] = values[..] else {
        return None;
    };
    Some((x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)))
}
