//! Cross-reference table.
//!
//! Tracks, for every object number, whether it is free, where it was written
//! and with which generation. Entry 0 is always the head of the free list.
//! The table writes itself either as a classic `xref` section or as the rows
//! of a cross-reference stream.

use crate::error::{PdfError, Result};
use crate::model::objects::ObjRef;

/// Highest object number a conforming writer may use.
pub const MAX_OBJECT_NUMBER: u32 = 8_388_607;

/// Generation reserved for the head of the free list and exhausted numbers.
pub const MAX_GENERATION: u16 = 65_535;

/// Location of one object number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free; `next_genno` is the generation the number gets when reused
    Free { next_genno: u16 },
    /// In use; `offset` is set once the object has been written
    InUse { genno: u16, offset: Option<u64> },
    /// Stored inside an object stream
    Compressed { stream: u32, index: u32 },
}

impl XrefEntry {
    pub const fn is_in_use(&self) -> bool {
        !matches!(self, Self::Free { .. })
    }

    pub const fn genno(&self) -> u16 {
        match self {
            Self::Free { next_genno } => *next_genno,
            Self::InUse { genno, .. } => *genno,
            Self::Compressed { .. } => 0,
        }
    }
}

/// Cross-reference table indexed by object number.
#[derive(Debug, Clone)]
pub struct CrossReferenceTable {
    entries: Vec<XrefEntry>,
    /// Freed numbers available for reuse, smallest last
    reusable: Vec<u32>,
    max_objid: u32,
}

impl Default for CrossReferenceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossReferenceTable {
    pub fn new() -> Self {
        Self {
            entries: vec![XrefEntry::Free {
                next_genno: MAX_GENERATION,
            }],
            reusable: Vec::new(),
            max_objid: MAX_OBJECT_NUMBER,
        }
    }

    /// One past the highest object number (the trailer /Size).
    pub fn size(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn get(&self, objid: u32) -> Option<&XrefEntry> {
        self.entries.get(objid as usize)
    }

    /// Hands out a fresh reference, reusing a freed number when one is available.
    pub fn allocate(&mut self) -> Result<ObjRef> {
        if let Some(objid) = self.reusable.pop() {
            let genno = self.entries[objid as usize].genno();
            self.entries[objid as usize] = XrefEntry::InUse {
                genno,
                offset: None,
            };
            return Ok(ObjRef::new(objid, genno));
        }
        let objid = self.entries.len() as u64;
        if objid > self.max_objid as u64 {
            return Err(PdfError::ObjectNumberOverflow(objid));
        }
        self.entries.push(XrefEntry::InUse {
            genno: 0,
            offset: None,
        });
        Ok(ObjRef::new(objid as u32, 0))
    }

    /// Records an entry read from an existing file.
    pub fn insert(&mut self, objid: u32, entry: XrefEntry) -> Result<()> {
        if objid == 0 {
            return Ok(());
        }
        if objid > self.max_objid {
            return Err(PdfError::ObjectNumberOverflow(objid as u64));
        }
        let idx = objid as usize;
        if idx >= self.entries.len() {
            self.entries.resize(
                idx + 1,
                XrefEntry::Free {
                    next_genno: 0,
                },
            );
        }
        self.entries[idx] = entry;
        Ok(())
    }

    /// Marks `r` free; the number is handed out again with the next generation.
    pub fn free(&mut self, r: ObjRef) {
        let Some(entry) = self.entries.get_mut(r.objid as usize) else {
            return;
        };
        if r.objid == 0 || !entry.is_in_use() {
            return;
        }
        let next_genno = r.genno.saturating_add(1);
        *entry = XrefEntry::Free { next_genno };
        if next_genno < MAX_GENERATION {
            self.reusable.push(r.objid);
            self.reusable.sort_unstable_by(|a, b| b.cmp(a));
        }
    }

    /// Rebuilds the reuse list from free entries, after loading a file.
    pub fn collect_free_numbers(&mut self) {
        self.reusable = self
            .entries
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(objid, entry)| match entry {
                XrefEntry::Free { next_genno } if *next_genno < MAX_GENERATION => {
                    Some(objid as u32)
                }
                _ => None,
            })
            .rev()
            .collect();
    }

    pub fn set_offset(&mut self, r: ObjRef, offset: u64) {
        if let Some(entry) = self.entries.get_mut(r.objid as usize) {
            *entry = XrefEntry::InUse {
                genno: r.genno,
                offset: Some(offset),
            };
        }
    }

    pub fn mark_compressed(&mut self, r: ObjRef, stream: u32, index: u32) {
        if let Some(entry) = self.entries.get_mut(r.objid as usize) {
            *entry = XrefEntry::Compressed { stream, index };
        }
    }

    /// In-use object numbers, ascending.
    pub fn in_use(&self) -> impl Iterator<Item = ObjRef> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_in_use())
            .map(|(objid, e)| ObjRef::new(objid as u32, e.genno()))
    }

    /// Next free object number after `objid` in the free-list chain (0 terminates).
    fn next_free(&self, objid: u32) -> u32 {
        self.entries
            .iter()
            .enumerate()
            .skip(objid as usize + 1)
            .find(|(_, e)| !e.is_in_use())
            .map(|(n, _)| n as u32)
            .unwrap_or(0)
    }

    fn check_written(&self, objid: u32) -> Result<()> {
        match self.entries.get(objid as usize) {
            Some(XrefEntry::InUse { offset: None, .. }) => Err(PdfError::DocumentCorrupted(
                format!("object {} is in use but was never written", objid),
            )),
            None => Err(PdfError::DocumentCorrupted(format!(
                "object {} has no cross-reference entry",
                objid
            ))),
            _ => Ok(()),
        }
    }

    /// Groups `numbers` (ascending) into contiguous (first, count) runs.
    fn subsections(numbers: &[u32]) -> Vec<(u32, u32)> {
        let mut sections: Vec<(u32, u32)> = Vec::new();
        for &n in numbers {
            match sections.last_mut() {
                Some((first, count)) if *first + *count == n => *count += 1,
                _ => sections.push((n, 1)),
            }
        }
        sections
    }

    fn section_numbers(&self, only: Option<&[u32]>) -> Vec<u32> {
        match only {
            Some(numbers) => {
                let mut numbers: Vec<u32> = numbers
                    .iter()
                    .copied()
                    .filter(|&n| (n as usize) < self.entries.len())
                    .collect();
                numbers.push(0);
                numbers.sort_unstable();
                numbers.dedup();
                numbers
            }
            None => (0..self.size()).collect(),
        }
    }

    /// Writes a classic `xref` section.
    ///
    /// With `only`, just those numbers (plus entry 0) are written, as an
    /// incremental update section.
    pub fn write_classic(&self, out: &mut Vec<u8>, only: Option<&[u32]>) -> Result<()> {
        let numbers = self.section_numbers(only);
        out.extend_from_slice(b"xref\n");
        let mut cursor = 0;
        for (first, count) in Self::subsections(&numbers) {
            out.extend_from_slice(format!("{} {}\n", first, count).as_bytes());
            for &objid in &numbers[cursor..cursor + count as usize] {
                self.check_written(objid)?;
                let line = match self.entries[objid as usize] {
                    XrefEntry::Free { next_genno } => {
                        format!("{:010} {:05} f\r\n", self.next_free(objid), next_genno)
                    }
                    XrefEntry::InUse { genno, offset } => {
                        format!("{:010} {:05} n\r\n", offset.unwrap_or(0), genno)
                    }
                    XrefEntry::Compressed { .. } => {
                        return Err(PdfError::DocumentCorrupted(format!(
                            "object {} is compressed but the table is classic",
                            objid
                        )));
                    }
                };
                out.extend_from_slice(line.as_bytes());
            }
            cursor += count as usize;
        }
        Ok(())
    }

    /// Builds the rows of a cross-reference stream.
    ///
    /// Returns the packed data, the `/W` widths and the `/Index` array pairs.
    pub fn stream_rows(&self, only: Option<&[u32]>) -> Result<(Vec<u8>, [usize; 3], Vec<(u32, u32)>)> {
        let numbers = self.section_numbers(only);
        let mut rows: Vec<(u8, u64, u64)> = Vec::with_capacity(numbers.len());
        for &objid in &numbers {
            self.check_written(objid)?;
            rows.push(match self.entries[objid as usize] {
                XrefEntry::Free { next_genno } => {
                    (0, self.next_free(objid) as u64, next_genno as u64)
                }
                XrefEntry::InUse { genno, offset } => (1, offset.unwrap_or(0), genno as u64),
                XrefEntry::Compressed { stream, index } => (2, stream as u64, index as u64),
            });
        }
        let max_field = rows.iter().map(|r| r.1).max().unwrap_or(0);
        let w1 = byte_width(max_field);
        let w2 = 2;
        let mut data = Vec::with_capacity(rows.len() * (1 + w1 + w2));
        for (kind, field1, field2) in rows {
            data.push(kind);
            data.extend_from_slice(&field1.to_be_bytes()[8 - w1..]);
            data.extend_from_slice(&(field2.min(u16::MAX as u64) as u16).to_be_bytes());
        }
        Ok((data, [1, w1, w2], Self::subsections(&numbers)))
    }
}

fn byte_width(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_sequential() {
        let mut xref = CrossReferenceTable::new();
        assert_eq!(xref.allocate().unwrap(), ObjRef::new(1, 0));
        assert_eq!(xref.allocate().unwrap(), ObjRef::new(2, 0));
        assert_eq!(xref.size(), 3);
    }

    #[test]
    fn test_free_then_reuse_bumps_generation() {
        let mut xref = CrossReferenceTable::new();
        let a = xref.allocate().unwrap();
        xref.allocate().unwrap();
        xref.free(a);
        assert_eq!(xref.allocate().unwrap(), ObjRef::new(1, 1));
    }

    #[test]
    fn test_overflow() {
        let mut xref = CrossReferenceTable::new();
        xref.max_objid = 2;
        xref.allocate().unwrap();
        xref.allocate().unwrap();
        assert!(matches!(
            xref.allocate(),
            Err(PdfError::ObjectNumberOverflow(_))
        ));
    }

    #[test]
    fn test_classic_entries_are_twenty_bytes() {
        let mut xref = CrossReferenceTable::new();
        let a = xref.allocate().unwrap();
        let b = xref.allocate().unwrap();
        xref.set_offset(a, 15);
        xref.set_offset(b, 1234);
        let mut out = Vec::new();
        xref.write_classic(&mut out, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "xref\n0 3\n0000000000 65535 f\r\n0000000015 00000 n\r\n0000001234 00000 n\r\n"
        );
    }

    #[test]
    fn test_unwritten_object_is_corruption() {
        let mut xref = CrossReferenceTable::new();
        xref.allocate().unwrap();
        let mut out = Vec::new();
        let err = xref.write_classic(&mut out, None).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_incremental_subsections() {
        let mut xref = CrossReferenceTable::new();
        for offset in [10, 20, 30, 40] {
            let r = xref.allocate().unwrap();
            xref.set_offset(r, offset);
        }
        let mut out = Vec::new();
        xref.write_classic(&mut out, Some(&[3, 4])).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("xref\n0 1\n0000000000 65535 f\r\n3 2\n"));
    }

    #[test]
    fn test_free_list_chain() {
        let mut xref = CrossReferenceTable::new();
        let refs: Vec<ObjRef> = (0..3).map(|_| xref.allocate().unwrap()).collect();
        for (i, r) in refs.iter().enumerate() {
            xref.set_offset(*r, 100 + i as u64);
        }
        xref.free(refs[1]);
        let mut out = Vec::new();
        xref.write_classic(&mut out, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("0000000002 65535 f\r\n"));
        assert!(text.contains("0000000000 00001 f\r\n"));
    }

    #[test]
    fn test_stream_rows() {
        let mut xref = CrossReferenceTable::new();
        let a = xref.allocate().unwrap();
        let b = xref.allocate().unwrap();
        xref.set_offset(a, 300);
        xref.mark_compressed(b, 1, 0);
        let (data, w, index) = xref.stream_rows(None).unwrap();
        assert_eq!(w, [1, 2, 2]);
        assert_eq!(index, vec![(0, 3)]);
        assert_eq!(hex::encode(data), "000000ffff01012c00000200010000");
    }
}
