//! Document catalog.
//!
//! `PdfCatalog` is a borrowed view over a [`PdfDocument`]; the lazily built
//! parts of the catalog (name trees, page labels, outlines, optional content)
//! are cached in [`CatalogState`] and written back when the document closes.

use super::destination::PdfDestination;
use super::layers::PdfOcProperties;
use super::name_tree::{PdfNameTree, PdfNumberTree, TreeView};
use super::outline::{OutlineId, PdfOutlineTree};
use super::pdf_document::PdfDocument;
use super::registry::ObjectRegistry;
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfDict, PdfObject};
use crate::utils::{decode_text, format_int_alpha, format_int_roman};
use indexmap::IndexMap;
use std::collections::BTreeMap;

pub const PAGE_MODES: [&str; 6] = [
    "UseNone",
    "UseOutlines",
    "UseThumbs",
    "FullScreen",
    "UseOC",
    "UseAttachments",
];

pub const PAGE_LAYOUTS: [&str; 6] = [
    "SinglePage",
    "OneColumn",
    "TwoColumnLeft",
    "TwoColumnRight",
    "TwoPageLeft",
    "TwoPageRight",
];

/// Trigger events of document-level additional actions.
pub const DOCUMENT_ACTION_EVENTS: [&str; 5] = ["WC", "WS", "DS", "WP", "DP"];

/// Numbering style of a page label range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLabelStyle {
    Decimal,
    UpperRoman,
    LowerRoman,
    UpperAlpha,
    LowerAlpha,
}

impl PageLabelStyle {
    fn name(self) -> &'static str {
        match self {
            Self::Decimal => "D",
            Self::UpperRoman => "R",
            Self::LowerRoman => "r",
            Self::UpperAlpha => "A",
            Self::LowerAlpha => "a",
        }
    }
}

/// Catalog parts that are read on demand and kept until close.
#[derive(Debug, Default)]
pub(crate) struct CatalogState {
    pub name_trees: IndexMap<String, PdfNameTree>,
    pub page_labels: Option<PdfNumberTree>,
    pub oc_properties: Option<PdfOcProperties>,
    pub outlines: Option<PdfOutlineTree>,
}

pub struct PdfCatalog<'a> {
    pub(crate) doc: &'a mut PdfDocument,
}

impl PdfCatalog<'_> {
    pub fn objref(&self) -> ObjRef {
        self.doc.catalog_ref
    }

    fn dict(&self) -> Option<&PdfDict> {
        self.doc.registry.lookup(self.doc.catalog_ref).as_dict().ok()
    }

    fn dict_mut(&mut self) -> Result<&mut PdfDict> {
        self.doc.ensure_writable()?;
        self.doc.registry.get_dict_mut(self.doc.catalog_ref)
    }

    /// Resolved catalog entry.
    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        let dict = self.dict()?;
        self.doc.registry.get_in(dict, key)
    }

    pub fn put(&mut self, key: &str, value: impl Into<PdfObject>) -> Result<()> {
        self.dict_mut()?.insert(key.to_string(), value.into());
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<PdfObject>> {
        Ok(self.dict_mut()?.shift_remove(key))
    }

    pub fn page_mode(&self) -> Option<&str> {
        self.get("PageMode").and_then(|m| m.as_name().ok())
    }

    pub fn set_page_mode(&mut self, mode: &str) -> Result<()> {
        if !PAGE_MODES.contains(&mode) {
            return Err(PdfError::InvalidArgument(format!("page mode {mode}")));
        }
        self.put("PageMode", PdfObject::name(mode))
    }

    pub fn page_layout(&self) -> Option<&str> {
        self.get("PageLayout").and_then(|m| m.as_name().ok())
    }

    pub fn set_page_layout(&mut self, layout: &str) -> Result<()> {
        if !PAGE_LAYOUTS.contains(&layout) {
            return Err(PdfError::InvalidArgument(format!("page layout {layout}")));
        }
        self.put("PageLayout", PdfObject::name(layout))
    }

    pub fn viewer_preferences(&self) -> Option<&PdfDict> {
        self.get("ViewerPreferences").and_then(|v| v.as_dict().ok())
    }

    pub fn set_viewer_preferences(&mut self, prefs: PdfDict) -> Result<()> {
        self.put("ViewerPreferences", prefs)
    }

    /// Sets `/OpenAction` to a destination.
    pub fn set_open_action(&mut self, destination: &PdfDestination) -> Result<()> {
        self.put("OpenAction", destination.to_object())
    }

    /// Sets `/OpenAction` to an action dictionary.
    pub fn set_open_action_dict(&mut self, action: PdfDict) -> Result<()> {
        self.put("OpenAction", action)
    }

    /// Document-level additional actions (`/AA`), keyed by trigger event.
    pub fn additional_actions(&self) -> Option<&PdfDict> {
        self.get("AA").and_then(|a| a.as_dict().ok())
    }

    /// Sets the action run on `event` (`WC`, `WS`, `DS`, `WP` or `DP`).
    pub fn set_additional_action(&mut self, event: &str, action: PdfDict) -> Result<()> {
        if !DOCUMENT_ACTION_EVENTS.contains(&event) {
            return Err(PdfError::InvalidArgument(format!("document action event {event}")));
        }
        self.doc.ensure_writable()?;
        let registry = &mut self.doc.registry;
        let catalog = registry.get_dict_mut(self.doc.catalog_ref)?;
        let actions_ref = match catalog.get("AA") {
            Some(PdfObject::Ref(r)) => Some(*r),
            _ => None,
        };
        if let Some(r) = actions_ref {
            registry.get_dict_mut(r)?.insert(event.to_string(), action.into());
        } else if let Some(PdfObject::Dict(actions)) = catalog.get_mut("AA") {
            actions.insert(event.to_string(), action.into());
        } else {
            catalog.insert("AA".into(), PdfObject::Dict(crate::pdf_dict! { event => action }));
        }
        Ok(())
    }

    /// Portable collection dictionary (`/Collection`).
    pub fn collection(&self) -> Option<&PdfDict> {
        self.get("Collection").and_then(|c| c.as_dict().ok())
    }

    pub fn set_collection(&mut self, collection: PdfDict) -> Result<()> {
        self.put("Collection", collection)
    }

    pub fn lang(&self) -> Option<String> {
        self.get("Lang").and_then(|l| l.as_string().ok()).map(decode_text)
    }

    pub fn set_lang(&mut self, lang: &str) -> Result<()> {
        self.put("Lang", PdfObject::text(lang))
    }

    /// Records a developer extension. An entry with the same prefix is only
    /// replaced by a newer base version or extension level.
    pub fn add_developer_extension(&mut self, prefix: &str, base_version: &str, level: i64) -> Result<()> {
        let existing = self
            .get("Extensions")
            .and_then(|e| e.as_dict().ok())
            .and_then(|e| e.get(prefix))
            .and_then(|e| self.doc.registry.resolve_dict(e))
            .map(|e| {
                let version = e.get("BaseVersion").and_then(|v| v.as_name().ok()).unwrap_or("");
                let level = e.get("ExtensionLevel").and_then(|l| l.as_int().ok()).unwrap_or(0);
                (version.to_string(), level)
            });
        if let Some((version, old_level)) = existing
            && (version.as_str(), old_level) >= (base_version, level)
        {
            tracing::debug!(prefix, "developer extension not newer, ignored");
            return Ok(());
        }

        let extension = crate::pdf_dict! {
            "BaseVersion" => PdfObject::name(base_version),
            "ExtensionLevel" => level,
        };
        let registry = &mut self.doc.registry;
        let catalog = registry.get_dict_mut(self.doc.catalog_ref)?;
        let extensions_ref = match catalog.get("Extensions") {
            Some(PdfObject::Ref(r)) => Some(*r),
            _ => None,
        };
        if let Some(r) = extensions_ref {
            registry.get_dict_mut(r)?.insert(prefix.to_string(), extension.into());
        } else if let Some(PdfObject::Dict(extensions)) = catalog.get_mut("Extensions") {
            extensions.insert(prefix.to_string(), extension.into());
        } else {
            catalog.insert(
                "Extensions".into(),
                PdfObject::Dict(crate::pdf_dict! { prefix => extension }),
            );
        }
        Ok(())
    }

    /// Name tree of `tree_type` under `/Names` (Dests, EmbeddedFiles, JavaScript, ...).
    ///
    /// The Dests tree also contains the entries of a legacy catalog `/Dests` dictionary.
    pub fn get_name_tree(&mut self, tree_type: &str) -> TreeView<'_, Vec<u8>> {
        let doc = &mut *self.doc;
        let registry = &doc.registry;
        let catalog = registry.lookup(doc.catalog_ref);
        let tree = doc
            .state
            .name_trees
            .entry(tree_type.to_string())
            .or_insert_with(|| {
                let source = catalog
                    .get("Names")
                    .and_then(|n| registry.resolve_dict(n))
                    .and_then(|n| n.get(tree_type))
                    .cloned();
                let legacy = (tree_type == "Dests")
                    .then(|| catalog.get("Dests").cloned())
                    .flatten();
                PdfNameTree::with_legacy(source, legacy)
            });
        TreeView { tree, registry }
    }

    /// Names the document holds trees for, read or created.
    pub fn name_tree_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .get("Names")
            .and_then(|n| n.as_dict().ok())
            .map(|n| n.keys().cloned().collect())
            .unwrap_or_default();
        for key in self.doc.state.name_trees.keys() {
            if !types.contains(key) {
                types.push(key.clone());
            }
        }
        types
    }

    /// Adds `name` to the Dests name tree.
    pub fn add_named_destination(&mut self, name: impl AsRef<[u8]>, destination: impl Into<PdfObject>) -> Result<()> {
        self.doc.ensure_writable()?;
        self.get_name_tree("Dests")
            .add_entry(name.as_ref().to_vec(), destination)
    }

    /// Page labels number tree (`/PageLabels`).
    pub fn page_labels_tree(&mut self) -> TreeView<'_, i64> {
        let doc = &mut *self.doc;
        let registry = &doc.registry;
        let catalog = registry.lookup(doc.catalog_ref);
        let tree = doc
            .state
            .page_labels
            .get_or_insert_with(|| PdfNumberTree::new(catalog.get("PageLabels").cloned()));
        TreeView { tree, registry }
    }

    /// Starts a label range at `page_index` (0-based).
    pub fn add_page_label(
        &mut self,
        page_index: usize,
        style: Option<PageLabelStyle>,
        prefix: Option<&str>,
        start: i64,
    ) -> Result<()> {
        self.doc.ensure_writable()?;
        let mut label = crate::pdf_dict! { "Type" => PdfObject::name("PageLabel") };
        if let Some(style) = style {
            label.insert("S".into(), PdfObject::name(style.name()));
        }
        if let Some(prefix) = prefix {
            label.insert("P".into(), PdfObject::text(prefix));
        }
        if start != 1 {
            label.insert("St".into(), PdfObject::Int(start));
        }
        let mut tree = self.page_labels_tree();
        tree.remove_entry(&(page_index as i64));
        tree.add_entry(page_index as i64, label)
    }

    /// Outline tree, read on first call or when `update` is set.
    ///
    /// A document without `/Outlines` yields `None` unless it is writable, in
    /// which case an empty tree is started.
    pub fn get_outlines(&mut self, update: bool) -> Option<&PdfOutlineTree> {
        if update || self.doc.state.outlines.is_none() {
            self.doc.state.outlines = self.read_outlines();
        }
        self.doc.state.outlines.as_ref()
    }

    fn read_outlines(&mut self) -> Option<PdfOutlineTree> {
        let root = match self.dict()?.get("Outlines") {
            Some(PdfObject::Ref(r)) => Some(*r),
            _ => None,
        };
        match root {
            Some(root) => {
                let dests = self.get_name_tree("Dests").get_names().clone();
                Some(PdfOutlineTree::read(&self.doc.registry, root, &dests, self.doc.pages.refs()))
            }
            None if self.doc.is_writable() => Some(PdfOutlineTree::empty()),
            None => None,
        }
    }

    /// Adds an outline item under `parent` (use [`OutlineId::ROOT`] for top level).
    pub fn add_outline(
        &mut self,
        parent: OutlineId,
        title: &str,
        destination: Option<PdfDestination>,
    ) -> Result<OutlineId> {
        self.doc.ensure_writable()?;
        if self.get_outlines(false).is_none() {
            return Err(PdfError::NotWritable);
        }
        let doc = &mut *self.doc;
        let Some(tree) = doc.state.outlines.as_mut() else {
            return Err(PdfError::NotWritable);
        };
        let (root, created) = tree.ensure_root(&mut doc.registry)?;
        if created {
            doc.registry
                .get_dict_mut(doc.catalog_ref)?
                .insert("Outlines".into(), PdfObject::Ref(root));
        }
        tree.add_outline(&mut doc.registry, parent, title, destination)
    }

    pub fn remove_outline(&mut self, id: OutlineId) -> Result<()> {
        self.doc.ensure_writable()?;
        let doc = &mut *self.doc;
        match doc.state.outlines.as_mut() {
            Some(tree) => tree.remove_outline(&mut doc.registry, id),
            None => Ok(()),
        }
    }

    /// Removes the outline items whose destination is `page`.
    pub fn remove_outlines_for_page(&mut self, page: ObjRef) -> Result<()> {
        if self.doc.state.outlines.is_none() && self.get("Outlines").is_none() {
            return Ok(());
        }
        self.get_outlines(false);
        let doc = &mut *self.doc;
        match doc.state.outlines.as_mut() {
            Some(tree) => tree.remove_outlines_for_page(&mut doc.registry, page),
            None => Ok(()),
        }
    }

    /// Optional content properties, read from `/OCProperties`.
    ///
    /// Without an existing dictionary a new one is only started when
    /// `create_if_missing` is set and the document is writable.
    pub fn get_oc_properties(&mut self, create_if_missing: bool) -> Option<&mut PdfOcProperties> {
        if self.doc.state.oc_properties.is_none() {
            match self.dict().and_then(|d| d.get("OCProperties")).cloned() {
                Some(ocprops) => {
                    self.doc.state.oc_properties = Some(PdfOcProperties::read(&self.doc.registry, &ocprops));
                }
                None if create_if_missing && self.doc.is_writable() => {
                    self.doc.state.oc_properties = Some(PdfOcProperties::default());
                }
                None => {}
            }
        }
        self.doc.state.oc_properties.as_mut()
    }

    /// Creates an optional content group and returns its reference.
    pub fn add_layer(&mut self, name: &str) -> Result<ObjRef> {
        self.doc.ensure_writable()?;
        if self.get_oc_properties(true).is_none() {
            return Err(PdfError::NotWritable);
        }
        let doc = &mut *self.doc;
        match doc.state.oc_properties.as_mut() {
            Some(props) => props.add_layer(&mut doc.registry, name),
            None => Err(PdfError::NotWritable),
        }
    }
}

/// Writes cached catalog parts back into the object graph.
pub(crate) fn write_catalog_state(
    registry: &mut ObjectRegistry,
    catalog_ref: ObjRef,
    state: &mut CatalogState,
) -> Result<()> {
    for (tree_type, tree) in state.name_trees.iter_mut() {
        if !tree.is_modified() {
            continue;
        }
        let root = tree.build(registry)?;
        set_in_names(registry, catalog_ref, tree_type, root)?;
        if tree_type == "Dests" && tree.has_legacy() {
            registry.get_dict_mut(catalog_ref)?.shift_remove("Dests");
        }
        tracing::debug!(tree = tree_type.as_str(), "name tree rebuilt");
    }

    if let Some(labels) = state.page_labels.as_mut()
        && labels.is_modified()
    {
        let root = labels.build(registry)?;
        registry
            .get_dict_mut(catalog_ref)?
            .insert("PageLabels".into(), PdfObject::Ref(root));
    }

    if let Some(props) = state.oc_properties.as_ref()
        && props.is_modified()
    {
        let dict = props.to_dict();
        let catalog = registry.get_dict_mut(catalog_ref)?;
        match catalog.get("OCProperties") {
            Some(PdfObject::Ref(r)) => {
                let r = *r;
                registry.set(r, dict)?;
            }
            _ => {
                catalog.insert("OCProperties".into(), PdfObject::Dict(dict));
            }
        }
    }
    Ok(())
}

/// Points `/Names /<tree_type>` of the catalog at `root`.
fn set_in_names(registry: &mut ObjectRegistry, catalog_ref: ObjRef, tree_type: &str, root: ObjRef) -> Result<()> {
    let catalog = registry.get_dict_mut(catalog_ref)?;
    let names_ref = match catalog.get_mut("Names") {
        Some(PdfObject::Ref(r)) => *r,
        Some(PdfObject::Dict(names)) => {
            names.insert(tree_type.to_string(), PdfObject::Ref(root));
            return Ok(());
        }
        _ => {
            catalog.insert(
                "Names".into(),
                PdfObject::Dict(crate::pdf_dict! { tree_type => root }),
            );
            return Ok(());
        }
    };
    match registry.get_dict_mut(names_ref) {
        Ok(names) => {
            names.insert(tree_type.to_string(), PdfObject::Ref(root));
        }
        Err(err) => {
            tracing::warn!(error = %err, "unusable /Names dictionary replaced");
            registry
                .get_dict_mut(catalog_ref)?
                .insert("Names".into(), PdfObject::Dict(crate::pdf_dict! { tree_type => root }));
        }
    }
    Ok(())
}

/// Labels for `page_count` pages from the page-label ranges.
///
/// Pages before the first range get an empty label.
pub(crate) fn format_page_labels(
    registry: &ObjectRegistry,
    ranges: &BTreeMap<i64, PdfObject>,
    page_count: usize,
) -> Vec<String> {
    let mut ranges: Vec<(i64, Option<&PdfDict>)> = ranges
        .iter()
        .map(|(start, label)| (*start, registry.resolve_dict(label)))
        .collect();
    if ranges.first().is_none_or(|(start, _)| *start != 0) {
        ranges.insert(0, (0, None));
    }

    let mut labels = Vec::with_capacity(page_count);
    for (i, (start, label)) in ranges.iter().enumerate() {
        let end = ranges
            .get(i + 1)
            .map_or(page_count as i64, |(next, _)| (*next).min(page_count as i64));
        let style = label.and_then(|l| l.get("S")).and_then(|s| s.as_name().ok());
        let prefix = label
            .and_then(|l| registry.get_in(l, "P"))
            .and_then(|p| p.as_string().ok())
            .map(decode_text)
            .unwrap_or_default();
        let first = label
            .and_then(|l| registry.get_in(l, "St"))
            .and_then(|s| s.as_int().ok())
            .unwrap_or(1);
        for page in (*start).max(0)..end {
            let value = (first + page - start).max(0) as u32;
            let number = match style {
                Some("D") => value.to_string(),
                Some("R") => format_int_roman(value).to_uppercase(),
                Some("r") => format_int_roman(value),
                Some("A") => format_int_alpha(value).to_uppercase(),
                Some("a") => format_int_alpha(value),
                _ => String::new(),
            };
            labels.push(format!("{prefix}{number}"));
        }
    }
    labels
}
