//! Optional content (layers).
//!
//! `PdfOcProperties` is read lazily from the catalog `/OCProperties` and is
//! the source of truth afterwards: the dictionary is rebuilt from it when the
//! document is closed.

use super::registry::ObjectRegistry;
use crate::error::Result;
use crate::model::objects::{ObjRef, PdfDict, PdfObject};
use crate::utils::decode_text;
use rustc_hash::FxHashSet;

/// One optional content group.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLayer {
    pub objref: ObjRef,
    pub name: String,
    pub on: bool,
    pub locked: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PdfOcProperties {
    layers: Vec<PdfLayer>,
    /// Entries of the default configuration that are carried over untouched
    config_extras: PdfDict,
    modified: bool,
}

impl PdfOcProperties {
    /// Reads `/OCProperties`; groups missing from `/OCGs` are ignored.
    pub fn read(registry: &ObjectRegistry, ocprops: &PdfObject) -> Self {
        let mut props = Self::default();
        let Some(dict) = registry.resolve_dict(ocprops) else {
            return props;
        };
        let config = dict.get("D").and_then(|d| registry.resolve_dict(d));
        let ref_set = |key: &str| -> FxHashSet<ObjRef> {
            config
                .and_then(|c| c.get(key))
                .and_then(|v| registry.resolve(v).as_array().ok())
                .map(|arr| arr.iter().filter_map(|o| o.as_ref().ok()).collect())
                .unwrap_or_default()
        };
        let off = ref_set("OFF");
        let locked = ref_set("Locked");

        if let Some(PdfObject::Array(ocgs)) = dict.get("OCGs").map(|o| registry.resolve(o)) {
            for ocg in ocgs {
                let Ok(objref) = ocg.as_ref() else {
                    continue;
                };
                let name = registry
                    .lookup(objref)
                    .get("Name")
                    .and_then(|n| registry.resolve(n).as_string().ok())
                    .map(decode_text)
                    .unwrap_or_default();
                props.layers.push(PdfLayer {
                    objref,
                    name,
                    on: !off.contains(&objref),
                    locked: locked.contains(&objref),
                });
            }
        }
        if let Some(config) = config {
            props.config_extras = config
                .iter()
                .filter(|(k, _)| !matches!(k.as_str(), "Order" | "ON" | "OFF" | "Locked"))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        props
    }

    pub fn layers(&self) -> &[PdfLayer] {
        &self.layers
    }

    pub fn layer(&self, objref: ObjRef) -> Option<&PdfLayer> {
        self.layers.iter().find(|l| l.objref == objref)
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Creates a new group, visible by default.
    pub fn add_layer(&mut self, registry: &mut ObjectRegistry, name: &str) -> Result<ObjRef> {
        let objref = registry.register(crate::pdf_dict! {
            "Type" => PdfObject::name("OCG"),
            "Name" => PdfObject::text(name),
        })?;
        self.layers.push(PdfLayer {
            objref,
            name: name.to_string(),
            on: true,
            locked: false,
        });
        self.modified = true;
        Ok(objref)
    }

    pub fn set_on(&mut self, objref: ObjRef, on: bool) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.objref == objref) {
            layer.on = on;
            self.modified = true;
        }
    }

    pub fn set_locked(&mut self, objref: ObjRef, locked: bool) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.objref == objref) {
            layer.locked = locked;
            self.modified = true;
        }
    }

    /// The `/OCProperties` dictionary for the current layers.
    pub fn to_dict(&self) -> PdfDict {
        let refs = |pred: fn(&PdfLayer) -> bool| {
            PdfObject::Array(
                self.layers
                    .iter()
                    .filter(|l| pred(l))
                    .map(|l| PdfObject::Ref(l.objref))
                    .collect(),
            )
        };
        let mut config = self.config_extras.clone();
        config.insert("Order".into(), refs(|_| true));
        config.insert("ON".into(), refs(|l| l.on));
        config.insert("OFF".into(), refs(|l| !l.on));
        let locked = refs(|l| l.locked);
        if locked.as_array().is_ok_and(|a| !a.is_empty()) {
            config.insert("Locked".into(), locked);
        }
        crate::pdf_dict! {
            "OCGs" => refs(|_| true),
            "D" => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_back_state() {
        let mut registry = ObjectRegistry::new();
        let mut props = PdfOcProperties::default();
        let a = props.add_layer(&mut registry, "Background").unwrap();
        let b = props.add_layer(&mut registry, "Notes").unwrap();
        props.set_on(b, false);
        props.set_locked(a, true);

        let dict = PdfObject::Dict(props.to_dict());
        let reread = PdfOcProperties::read(&registry, &dict);
        assert_eq!(reread.layers().len(), 2);
        assert_eq!(reread.layer(a).unwrap().name, "Background");
        assert!(reread.layer(a).unwrap().locked);
        assert!(!reread.layer(b).unwrap().on);
        assert!(!reread.is_modified());
    }
}
