//! Reading an existing file into an object registry.
//!
//! Cross-reference sections are followed from `startxref` through `/Prev`
//! and `/XRefStm` links; classic tables and xref streams are both
//! understood. When the declared sections cannot be used the file is
//! scanned once for `N G obj` headers and the table is rebuilt from that.

use super::registry::ObjectRegistry;
use super::xref::{CrossReferenceTable, XrefEntry};
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfDict, PdfObject, PdfStream};
use crate::utils::nunpack;
use crate::parser::lexer::{Keyword, PSBaseParser};
use crate::parser::pdf_parser::PdfParser;
use bytes::Bytes;
use regex::bytes::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::LazyLock;

static OBJ_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+(\d+)\s+obj\b").unwrap_or_else(|_| unreachable!())
});

/// Trailer keys that only describe one section and are not carried over.
const SECTION_KEYS: [&str; 9] = [
    "Prev", "XRefStm", "Size", "Type", "W", "Index", "Length", "Filter", "DecodeParms",
];

/// Everything recovered from an existing file.
#[derive(Debug)]
pub(crate) struct LoadedDocument {
    pub registry: ObjectRegistry,
    /// Merged trailer, newest section first
    pub trailer: PdfDict,
    pub has_rebuilt_xref: bool,
    /// Whether the newest section is an xref stream
    pub uses_xref_stream: bool,
    /// Offset of the newest section, the `/Prev` of an appended one
    pub startxref: u64,
    /// Version from the `%PDF-x.y` header
    pub version: Option<String>,
    /// Object streams and xref streams; their content lives on as plain objects
    pub containers: Vec<ObjRef>,
}

struct XrefSection {
    entries: Vec<(u32, XrefEntry)>,
    trailer: PdfDict,
    is_stream: bool,
}

pub(crate) struct PdfReader {
    data: Bytes,
}

impl PdfReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn read(self) -> Result<LoadedDocument> {
        let declared = self
            .find_startxref()
            .and_then(|pos| Ok((pos, self.load_xrefs(pos)?)));
        let attempt = match declared {
            Ok((startxref, sections)) if !sections.is_empty() => {
                let uses_xref_stream = sections[0].is_stream;
                match self.load_objects(sections) {
                    Ok(loaded) => Some((loaded, startxref, uses_xref_stream)),
                    Err(err) => {
                        tracing::warn!(error = %err, "declared cross-reference table is unusable");
                        None
                    }
                }
            }
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "no usable cross-reference section");
                None
            }
        };

        let (loaded, startxref, uses_xref_stream, rebuilt) = match attempt {
            Some((loaded, startxref, uses_xref_stream)) => {
                (loaded, startxref, uses_xref_stream, false)
            }
            None => {
                let section = self.rebuild_xref()?;
                let uses_xref_stream = section.is_stream;
                let loaded = self.load_objects(vec![section])?;
                let startxref = self.find_startxref().unwrap_or(0);
                (loaded, startxref, uses_xref_stream, true)
            }
        };
        let (registry, mut trailer, containers) = loaded;

        if !trailer.contains_key("Root")
            && let Some(root) = find_catalog(&registry)
        {
            tracing::warn!(root = %root, "trailer has no /Root, using the first catalog found");
            trailer.insert("Root".into(), PdfObject::Ref(root));
        }
        if !trailer.contains_key("Root") {
            return Err(PdfError::NoCatalog);
        }
        if trailer.contains_key("Encrypt") {
            tracing::warn!("encrypted documents are loaded without decryption");
        }

        Ok(LoadedDocument {
            registry,
            trailer,
            has_rebuilt_xref: rebuilt,
            uses_xref_stream,
            startxref: startxref as u64,
            version: self.header_version(),
            containers,
        })
    }

    fn header_version(&self) -> Option<String> {
        let head = &self.data[..self.data.len().min(1024)];
        let start = head.windows(5).position(|w| w == b"%PDF-")? + 5;
        let version: String = head[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b'.')
            .map(|&b| b as char)
            .collect();
        (!version.is_empty()).then_some(version)
    }

    /// Finds the offset after the last `startxref` keyword.
    fn find_startxref(&self) -> Result<usize> {
        let needle = b"startxref";
        let data = &self.data[..];
        if data.len() < needle.len() {
            return Err(PdfError::SyntaxError("PDF too small".into()));
        }
        let search_start = data.len().saturating_sub(2048);
        let found = data[search_start..]
            .windows(needle.len())
            .rposition(|w| w == needle)
            .ok_or(PdfError::NoValidXRef)?;
        let rest = &data[search_start + found + needle.len()..];
        let digits: Vec<u8> = rest
            .iter()
            .skip_while(|b| PSBaseParser::is_whitespace(**b))
            .take_while(|b| b.is_ascii_digit())
            .copied()
            .collect();
        std::str::from_utf8(&digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&pos: &usize| pos < data.len())
            .ok_or(PdfError::NoValidXRef)
    }

    /// Loads the section chain, newest first.
    fn load_xrefs(&self, mut pos: usize) -> Result<Vec<XrefSection>> {
        let mut sections = Vec::new();
        let mut visited = FxHashSet::default();

        while visited.insert(pos) {
            let section = self.load_xref_at(pos)?;
            let xref_stm = section
                .trailer
                .get("XRefStm")
                .and_then(|p| p.as_int().ok())
                .map(|n| n as usize);
            let prev = section
                .trailer
                .get("Prev")
                .and_then(|p| p.as_int().ok())
                .map(|n| n as usize);
            sections.push(section);

            if let Some(stm_pos) = xref_stm
                && visited.insert(stm_pos)
            {
                match self.load_xref_stream(stm_pos) {
                    Ok(stm) => sections.push(stm),
                    Err(err) => tracing::warn!(error = %err, offset = stm_pos, "bad /XRefStm"),
                }
            }

            match prev {
                Some(prev_pos) if prev_pos < self.data.len() => pos = prev_pos,
                _ => break,
            }
        }

        Ok(sections)
    }

    fn load_xref_at(&self, pos: usize) -> Result<XrefSection> {
        let data = self.data.get(pos..).ok_or(PdfError::NoValidXRef)?;
        if data.starts_with(b"xref") {
            self.load_traditional_xref(pos)
        } else {
            self.load_xref_stream(pos)
        }
    }

    fn load_traditional_xref(&self, pos: usize) -> Result<XrefSection> {
        let mut lexer = PSBaseParser::new(&self.data[pos + 4..]);
        let mut entries = Vec::new();

        loop {
            lexer.skip_whitespace();
            if lexer.remaining().starts_with(b"trailer") {
                lexer.set_pos(lexer.tell() + 7);
                break;
            }
            let Some(start) = read_number(&mut lexer) else {
                return Err(PdfError::SyntaxError("bad xref subsection header".into()));
            };
            let count = read_number(&mut lexer)
                .ok_or_else(|| PdfError::SyntaxError("bad xref subsection count".into()))?;

            let mut base = start;
            for i in 0..count {
                let offset = read_number(&mut lexer)
                    .ok_or_else(|| PdfError::SyntaxError("bad xref entry".into()))?;
                let genno = read_number(&mut lexer)
                    .ok_or_else(|| PdfError::SyntaxError("bad xref entry".into()))?;
                lexer.skip_whitespace();
                let marker = lexer.remaining().first().copied().unwrap_or(b'f');
                lexer.set_pos(lexer.tell() + 1);

                // subsections that start at 1 but still carry the free head
                if i == 0 && base > 0 && marker == b'f' && offset == 0 && genno == 65535 {
                    base -= 1;
                }
                let objid = (base + i) as u32;
                let genno = genno.min(u16::MAX as u64) as u16;
                let entry = match marker {
                    b'n' => XrefEntry::InUse {
                        genno,
                        offset: Some(offset),
                    },
                    _ => XrefEntry::Free { next_genno: genno },
                };
                entries.push((objid, entry));
            }
        }

        let mut parser = PdfParser::new(lexer.remaining());
        let trailer = parser.parse_object()?.as_dict()?.clone();
        Ok(XrefSection {
            entries,
            trailer,
            is_stream: false,
        })
    }

    fn load_xref_stream(&self, pos: usize) -> Result<XrefSection> {
        let (_, obj) = self.parse_object_at(pos, None)?;
        let stream = obj.as_stream()?;
        if !obj.is_type("XRef") {
            return Err(PdfError::SyntaxError(format!(
                "no cross-reference stream at offset {}",
                pos
            )));
        }

        let w: Vec<usize> = stream
            .get("W")
            .ok_or_else(|| PdfError::SyntaxError("missing W in xref stream".into()))?
            .as_array()?
            .iter()
            .map(|v| v.as_int().map(|n| n.clamp(0, 8) as usize))
            .collect::<Result<_>>()?;
        let [w0, w1, w2] = w[..] else {
            return Err(PdfError::SyntaxError("W must have 3 elements".into()));
        };
        let size = stream
            .get("Size")
            .ok_or_else(|| PdfError::SyntaxError("missing Size in xref stream".into()))?
            .as_int()? as u64;
        let index: Vec<(u64, u64)> = match stream.get("Index") {
            Some(idx) => idx
                .as_array()?
                .chunks_exact(2)
                .map(|pair| Ok((pair[0].as_int()? as u64, pair[1].as_int()? as u64)))
                .collect::<Result<_>>()?,
            None => vec![(0, size)],
        };

        let data = stream.decode()?;
        let entry_size = w0 + w1 + w2;
        let mut rows = data.chunks_exact(entry_size.max(1));
        let mut entries = Vec::new();

        'sections: for (start, count) in index {
            for i in 0..count {
                let Some(row) = rows.next() else {
                    break 'sections;
                };
                let objid = start + i;
                if objid > u32::MAX as u64 {
                    break 'sections;
                }
                let kind = nunpack(&row[..w0], 1);
                let field1 = nunpack(&row[w0..w0 + w1], 0);
                let field2 = nunpack(&row[w0 + w1..], 0);
                let entry = match kind {
                    0 => XrefEntry::Free {
                        next_genno: field2.min(u16::MAX as u64) as u16,
                    },
                    1 => XrefEntry::InUse {
                        genno: field2.min(u16::MAX as u64) as u16,
                        offset: Some(field1),
                    },
                    2 => XrefEntry::Compressed {
                        stream: field1 as u32,
                        index: field2 as u32,
                    },
                    _ => continue,
                };
                entries.push((objid as u32, entry));
            }
        }

        Ok(XrefSection {
            entries,
            trailer: stream.attrs.clone(),
            is_stream: true,
        })
    }

    /// Scans the whole file for object headers. Later definitions win.
    fn rebuild_xref(&self) -> Result<XrefSection> {
        let mut found: FxHashMap<u32, XrefEntry> = FxHashMap::default();
        for cap in OBJ_HEADER.captures_iter(&self.data) {
            let (Some(objid), Some(genno), Some(whole)) = (
                parse_capture(cap.get(1).map(|m| m.as_bytes())),
                parse_capture(cap.get(2).map(|m| m.as_bytes())),
                cap.get(0),
            ) else {
                continue;
            };
            if objid == 0 || objid > u32::MAX as u64 || genno > u16::MAX as u64 {
                continue;
            }
            found.insert(
                objid as u32,
                XrefEntry::InUse {
                    genno: genno as u16,
                    offset: Some(whole.start() as u64),
                },
            );
        }
        if found.is_empty() {
            return Err(PdfError::NoValidXRef);
        }

        let mut trailer = PdfDict::new();
        let mut is_stream = false;
        if let Some(pos) = self.data.windows(7).rposition(|w| w == b"trailer") {
            let mut parser = PdfParser::new(&self.data[pos + 7..]);
            if let Ok(PdfObject::Dict(dict)) = parser.parse_object() {
                trailer = dict;
            }
        }
        if trailer.is_empty() {
            // no classic trailer: take the newest xref stream dictionary
            for entry in found.values() {
                if let XrefEntry::InUse {
                    offset: Some(offset),
                    ..
                } = entry
                    && let Ok((_, obj)) = self.parse_object_at(*offset as usize, None)
                    && obj.is_type("XRef")
                    && let Ok(attrs) = obj.as_dict()
                    && attrs.contains_key("Root")
                {
                    trailer = attrs.clone();
                    is_stream = true;
                }
            }
        }

        let mut entries: Vec<(u32, XrefEntry)> = found.into_iter().collect();
        entries.sort_unstable_by_key(|(objid, _)| *objid);
        tracing::warn!(objects = entries.len(), "rebuilt cross-reference table by scanning");
        Ok(XrefSection {
            entries,
            trailer,
            is_stream,
        })
    }

    /// Merges sections (newest wins), then parses every object eagerly.
    fn load_objects(
        &self,
        sections: Vec<XrefSection>,
    ) -> Result<(ObjectRegistry, PdfDict, Vec<ObjRef>)> {
        let mut table = CrossReferenceTable::new();
        let mut seen = FxHashSet::default();
        let mut trailer = PdfDict::new();
        for section in sections {
            for (objid, entry) in section.entries {
                if seen.insert(objid) {
                    table.insert(objid, entry)?;
                }
            }
            for (key, value) in section.trailer {
                if !SECTION_KEYS.contains(&key.as_str()) && !trailer.contains_key(&key) {
                    trailer.insert(key, value);
                }
            }
        }

        let mut registry = ObjectRegistry::new();
        let mut containers = Vec::new();
        let mut compressed: Vec<(u32, u32, u32)> = Vec::new();
        for objid in 1..table.size() {
            match table.get(objid).copied() {
                Some(XrefEntry::InUse {
                    genno,
                    offset: Some(offset),
                }) => {
                    let r = ObjRef::new(objid, genno);
                    let (found, obj) = self.parse_object_at(offset as usize, Some(&table))?;
                    if found.objid != objid {
                        return Err(PdfError::DocumentCorrupted(format!(
                            "object {} expected at offset {}, found {}",
                            objid, offset, found.objid
                        )));
                    }
                    if matches!(obj, PdfObject::Stream(_))
                        && (obj.is_type("ObjStm") || obj.is_type("XRef"))
                    {
                        containers.push(r);
                    }
                    registry.insert_loaded(r, obj);
                }
                Some(XrefEntry::Compressed { stream, index }) => {
                    compressed.push((objid, stream, index));
                }
                _ => {}
            }
        }

        let mut unpacked: FxHashMap<u32, Vec<(u32, PdfObject)>> = FxHashMap::default();
        for (objid, stream, index) in compressed {
            if !unpacked.contains_key(&stream) {
                let members = match registry.lookup(ObjRef::new(stream, 0)) {
                    PdfObject::Stream(objstm) => parse_object_stream(objstm)?,
                    _ => {
                        return Err(PdfError::DocumentCorrupted(format!(
                            "object {} refers to missing object stream {}",
                            objid, stream
                        )));
                    }
                };
                unpacked.insert(stream, members);
            }
            let member = unpacked
                .get(&stream)
                .and_then(|members| members.get(index as usize))
                .filter(|(id, _)| *id == objid);
            match member {
                Some((_, obj)) => registry.insert_loaded(ObjRef::new(objid, 0), obj.clone()),
                None => tracing::warn!(objid, stream, index, "compressed object not found"),
            }
        }

        if seen.is_empty() {
            return Err(PdfError::NoValidXRef);
        }
        // rebuilt tables only list direct objects; pick up object stream members too
        for container in containers.clone() {
            let container_obj = registry.lookup(container).clone();
            if let PdfObject::Stream(objstm) = &container_obj
                && container_obj.is_type("ObjStm")
                && !unpacked.contains_key(&container.objid)
            {
                for (objid, obj) in parse_object_stream(objstm)? {
                    if table.get(objid).is_none_or(|e| !e.is_in_use()) {
                        table.insert(objid, XrefEntry::Compressed {
                            stream: container.objid,
                            index: 0,
                        })?;
                        registry.insert_loaded(ObjRef::new(objid, 0), obj);
                    }
                }
            }
        }

        table.collect_free_numbers();
        *registry.xref_mut() = table;
        Ok((registry, trailer, containers))
    }

    /// Parses `N G obj ... endobj` at `offset`.
    ///
    /// An indirect `/Length` is looked up through `table` when one is given.
    fn parse_object_at(
        &self,
        offset: usize,
        table: Option<&CrossReferenceTable>,
    ) -> Result<(ObjRef, PdfObject)> {
        let data = self.data.get(offset..).ok_or_else(|| {
            PdfError::SyntaxError(format!(
                "object offset {} exceeds file size {}",
                offset,
                self.data.len()
            ))
        })?;
        let mut parser = PdfParser::new(data);
        let objid = parser.parse_object()?.as_int()?;
        let genno = parser.parse_object()?.as_int()?;
        if parser.next_keyword()? != Some(Keyword::Obj) {
            return Err(PdfError::SyntaxError(format!(
                "expected 'obj' at offset {}",
                offset
            )));
        }
        let r = ObjRef::new(
            u32::try_from(objid).map_err(|_| PdfError::SyntaxError("bad object number".into()))?,
            u16::try_from(genno).unwrap_or(u16::MAX),
        );
        let obj = parser.parse_object()?;

        let PdfObject::Dict(dict) = obj else {
            return Ok((r, obj));
        };
        if parser.next_keyword()? != Some(Keyword::Stream) {
            return Ok((r, PdfObject::Dict(dict)));
        }

        let mut start = offset + parser.tell();
        if self.data.get(start) == Some(&b'\r') {
            start += 1;
        }
        if self.data.get(start) == Some(&b'\n') {
            start += 1;
        }
        let declared = dict
            .get("Length")
            .and_then(|len| self.resolve_length(len, table))
            .filter(|&len| self.length_matches(start, len));
        let end = match declared {
            Some(len) => start + len,
            None => {
                let end = find_endstream(&self.data[start..])
                    .map(|n| start + n)
                    .unwrap_or(self.data.len());
                tracing::warn!(object = %r, "stream /Length unusable, scanned for endstream");
                end
            }
        };
        let rawdata = self.data.slice(start..end);
        Ok((r, PdfObject::from(PdfStream::new(dict, rawdata))))
    }

    fn resolve_length(&self, len: &PdfObject, table: Option<&CrossReferenceTable>) -> Option<usize> {
        match len {
            PdfObject::Int(n) => usize::try_from(*n).ok(),
            PdfObject::Ref(r) => match table?.get(r.objid)? {
                XrefEntry::InUse {
                    offset: Some(offset),
                    ..
                } => {
                    let (_, obj) = self.parse_object_at(*offset as usize, None).ok()?;
                    usize::try_from(obj.as_int().ok()?).ok()
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn length_matches(&self, start: usize, len: usize) -> bool {
        let Some(after) = start.checked_add(len).and_then(|end| self.data.get(end..)) else {
            return false;
        };
        let trimmed = after
            .iter()
            .position(|b| !PSBaseParser::is_whitespace(*b))
            .map_or(&after[after.len()..], |n| &after[n..]);
        trimmed.starts_with(b"endstream")
    }
}

/// Members of an object stream, in index order.
pub(crate) fn parse_object_stream(objstm: &PdfStream) -> Result<Vec<(u32, PdfObject)>> {
    let data = objstm.decode()?;
    let n = objstm
        .get("N")
        .ok_or_else(|| PdfError::SyntaxError("missing N in ObjStm".into()))?
        .as_int()? as usize;
    let first = objstm
        .get("First")
        .ok_or_else(|| PdfError::SyntaxError("missing First in ObjStm".into()))?
        .as_int()? as usize;
    let header = data
        .get(..first)
        .ok_or_else(|| PdfError::SyntaxError("ObjStm First beyond data".into()))?;

    let mut header_parser = PdfParser::new(header);
    let mut members = Vec::with_capacity(n);
    for _ in 0..n {
        let objid = header_parser.parse_object()?.as_int()?;
        let offset = header_parser.parse_object()?.as_int()? as usize;
        let body = data
            .get(first + offset..)
            .ok_or_else(|| PdfError::SyntaxError("ObjStm offset beyond data".into()))?;
        let obj = PdfParser::new(body).parse_object()?;
        members.push((objid as u32, obj));
    }
    Ok(members)
}

fn find_catalog(registry: &ObjectRegistry) -> Option<ObjRef> {
    registry
        .live_refs()
        .into_iter()
        .find(|r| registry.lookup(*r).is_type("Catalog"))
}

/// Offset of `endstream`, with the end-of-line before it excluded.
fn find_endstream(data: &[u8]) -> Option<usize> {
    let pos = data.windows(9).position(|w| w == b"endstream")?;
    let mut end = pos;
    if end > 0 && data[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && data[end - 1] == b'\r' {
        end -= 1;
    }
    Some(end)
}

fn read_number(lexer: &mut PSBaseParser<'_>) -> Option<u64> {
    lexer.skip_whitespace();
    let digits = lexer
        .remaining()
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    let value = std::str::from_utf8(&lexer.remaining()[..digits])
        .ok()?
        .parse()
        .ok()?;
    lexer.set_pos(lexer.tell() + digits);
    Some(value)
}

fn parse_capture(bytes: Option<&[u8]>) -> Option<u64> {
    std::str::from_utf8(bytes?).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let o1 = out.len();
        out.extend_from_slice(b"1 0 obj\n<</Type/Catalog/Pages 2 0 R>>\nendobj\n");
        let o2 = out.len();
        out.extend_from_slice(b"2 0 obj\n<</Type/Pages/Kids[]/Count 0>>\nendobj\n");
        let o3 = out.len();
        out.extend_from_slice(b"3 0 obj\n<</Length 4 0 R>>\nstream\nhello\nendstream\nendobj\n");
        let o4 = out.len();
        out.extend_from_slice(b"4 0 obj\n5\nendobj\n");
        let xref = out.len();
        out.extend_from_slice(b"xref\n0 5\n0000000000 65535 f\r\n");
        for off in [o1, o2, o3, o4] {
            out.extend_from_slice(format!("{:010} 00000 n\r\n", off).as_bytes());
        }
        out.extend_from_slice(b"trailer\n<</Size 5/Root 1 0 R>>\nstartxref\n");
        out.extend_from_slice(format!("{}\n%%EOF\n", xref).as_bytes());
        out
    }

    #[test]
    fn test_read_classic_table() {
        let loaded = PdfReader::new(sample()).read().unwrap();
        assert!(!loaded.has_rebuilt_xref);
        assert!(!loaded.uses_xref_stream);
        assert_eq!(loaded.version.as_deref(), Some("1.4"));
        assert_eq!(loaded.trailer["Root"], PdfObject::Ref(ObjRef::new(1, 0)));
        let stream = loaded.registry.lookup(ObjRef::new(3, 0)).as_stream().unwrap();
        assert_eq!(stream.rawdata(), b"hello");
    }

    #[test]
    fn test_bad_startxref_rebuilds() {
        let text = String::from_utf8(sample()).unwrap();
        let (head, _) = text.rsplit_once("startxref\n").unwrap();
        let data = format!("{}startxref\n9999\n%%EOF\n", head);
        let loaded = PdfReader::new(data.into_bytes()).read().unwrap();
        assert!(loaded.has_rebuilt_xref);
        assert!(loaded.registry.lookup(ObjRef::new(2, 0)).is_type("Pages"));
    }

    #[test]
    fn test_wrong_offsets_rebuild() {
        let text = String::from_utf8(sample()).unwrap();
        // the table now points at an unrelated object
        let broken = text.replacen("%PDF-1.4\n", "%PDF-1.4\n0 0 obj\nnull\nendobj\n", 1);
        let loaded = PdfReader::new(broken.into_bytes()).read().unwrap();
        assert!(loaded.has_rebuilt_xref);
        assert!(loaded.registry.lookup(ObjRef::new(1, 0)).is_type("Catalog"));
        let stream = loaded.registry.lookup(ObjRef::new(3, 0)).as_stream().unwrap();
        assert_eq!(stream.rawdata(), b"hello");
    }

    #[test]
    fn test_xref_stream_without_type_field() {
        // W[0 2 1]: every row is an in-use entry
        let mut out = b"%PDF-1.5\n".to_vec();
        let o1 = out.len();
        out.extend_from_slice(b"1 0 obj\n<</Type/Catalog/Pages 2 0 R>>\nendobj\n");
        let o2 = out.len();
        out.extend_from_slice(b"2 0 obj\n<</Type/Pages/Kids[]/Count 0>>\nendobj\n");
        let o3 = out.len();
        let mut rows = Vec::new();
        for off in [o1, o2, o3] {
            rows.extend_from_slice(&(off as u16).to_be_bytes());
            rows.push(0);
        }
        out.extend_from_slice(
            format!(
                "3 0 obj\n<</Type/XRef/Size 4/Index[1 3]/W[0 2 1]/Root 1 0 R/Length {}>>\nstream\n",
                rows.len()
            )
            .as_bytes(),
        );
        out.extend_from_slice(&rows);
        out.extend_from_slice(b"\nendstream\nendobj\n");
        out.extend_from_slice(format!("startxref\n{}\n%%EOF\n", o3).as_bytes());

        let loaded = PdfReader::new(out).read().unwrap();
        assert!(loaded.uses_xref_stream);
        assert!(!loaded.has_rebuilt_xref);
        assert!(loaded.registry.lookup(ObjRef::new(1, 0)).is_type("Catalog"));
        assert!(loaded.registry.lookup(ObjRef::new(2, 0)).is_type("Pages"));
    }

    #[test]
    fn test_find_endstream() {
        assert_eq!(find_endstream(b"abc\r\nendstream"), Some(3));
        assert_eq!(find_endstream(b"abcendstream"), Some(3));
        assert_eq!(find_endstream(b"abc"), None);
    }
}
