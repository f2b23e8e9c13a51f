//! Library-local blocks carried in `LOK` fields.
//!
//! Each `LOK` field embeds a nested field: its contents start with
//! `"  " 0x1F "0"`, followed by a 3-character local tag and two local
//! indicators. Several independent blocks may follow each other; a new block
//! starts wherever the local tag is smaller than the previous one.
//!
//! ```
//! use marcio::{BibliographicLevel, Field, Record, TypeOfRecord, LOCAL_BLOCK_TAG};
//!
//! let mut record = Record::new(
//!     TypeOfRecord::LanguageMaterial,
//!     BibliographicLevel::MonographOrItem,
//!     Some("1"),
//! );
//! for local_tag in ["001", "852", "001", "852"] {
//!     record.append_field(Field::new(LOCAL_BLOCK_TAG, format!("  \x1f0{local_tag}  \x1fax")));
//! }
//!
//! assert_eq!(record.find_all_local_blocks(), vec![1..3, 3..5]);
//! ```

use crate::field::Field;
use crate::record::Record;
use crate::tag::{Tag, TAG_LENGTH};
use std::ops::Range;

/// Tag of the fields that carry local blocks.
pub const LOCAL_BLOCK_TAG: Tag = Tag::literal(b"LOK");

/// Matches any local indicator in [`Record::find_fields_in_local_block`].
pub const INDICATOR_WILDCARD: char = '?';

const LOCAL_FIELD_PREFIX: &str = "  \x1f0";
const LOCAL_TAG_START: usize = LOCAL_FIELD_PREFIX.len();
const LOCAL_INDICATORS_START: usize = LOCAL_TAG_START + TAG_LENGTH;

/// Local tag of a `LOK` field, or `""` if the contents are too short.
#[must_use]
pub fn local_tag(field: &Field) -> &str {
    field
        .contents()
        .get(LOCAL_TAG_START..LOCAL_INDICATORS_START)
        .unwrap_or_default()
}

fn local_indicators_match(field: &Field, indicator1: char, indicator2: char) -> bool {
    let mut indicators = field
        .contents()
        .get(LOCAL_INDICATORS_START..)
        .unwrap_or_default()
        .chars();
    let matches = |pattern: char, actual: Option<char>| {
        pattern == INDICATOR_WILDCARD || actual == Some(pattern)
    };
    matches(indicator1, indicators.next()) && matches(indicator2, indicators.next())
}

/// Finds where local blocks start in a run of `LOK` fields.
///
/// The only state is the last local tag seen: a field whose local tag is
/// smaller starts a new block. The first field always starts a block.
#[derive(Debug, Clone)]
pub struct LocalBlockScanner<'a> {
    fields: &'a [Field],
    offset: usize,
    position: usize,
    last_local_tag: Option<&'a str>,
}

impl<'a> LocalBlockScanner<'a> {
    /// Scan the contiguous `LOK` fields of `record`.
    #[must_use]
    pub fn new(record: &'a Record) -> Self {
        let range = record.tag_range(LOCAL_BLOCK_TAG);
        LocalBlockScanner {
            fields: &record.fields()[range.clone()],
            offset: range.start,
            position: 0,
            last_local_tag: None,
        }
    }

    /// True if a field with `local_tag` starts a new block, updating the state.
    fn starts_block(&mut self, local_tag: &'a str) -> bool {
        let starts = self.last_local_tag.is_none_or(|last| local_tag < last);
        self.last_local_tag = Some(local_tag);
        starts
    }
}

impl<'a> Iterator for LocalBlockScanner<'a> {
    /// Index of a block's first field within the record.
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let fields: &'a [Field] = self.fields;
        while self.position < fields.len() {
            let index = self.position;
            self.position += 1;
            if self.starts_block(local_tag(&fields[index])) {
                return Some(self.offset + index);
            }
        }
        None
    }
}

/// Merge block ranges that touch into minimal contiguous deletion ranges.
///
/// Input ranges may come in any order; the result is sorted and disjoint.
#[must_use]
pub fn coalesce_local_block_deletions(blocks: &[Range<usize>]) -> Vec<Range<usize>> {
    let mut sorted = blocks.to_vec();
    sorted.sort_by_key(|block| block.start);

    let mut coalesced: Vec<Range<usize>> = Vec::with_capacity(sorted.len());
    for block in sorted {
        match coalesced.last_mut() {
            Some(last) if block.start <= last.end => last.end = last.end.max(block.end),
            _ => coalesced.push(block),
        }
    }
    coalesced
}

impl Record {
    /// Indices of the first field of every local block.
    #[must_use]
    pub fn find_start_of_all_local_blocks(&self) -> Vec<usize> {
        LocalBlockScanner::new(self).collect()
    }

    /// Field index ranges of all local blocks, in record order.
    #[must_use]
    pub fn find_all_local_blocks(&self) -> Vec<Range<usize>> {
        let end = self.tag_range(LOCAL_BLOCK_TAG).end;
        let starts = self.find_start_of_all_local_blocks();
        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| start..starts.get(i + 1).copied().unwrap_or(end))
            .collect()
    }

    /// The run of fields in `block` with `local_tag` and matching indicators.
    ///
    /// Either indicator may be [`INDICATOR_WILDCARD`]. Returns an empty range at
    /// `block.end` if nothing matches.
    #[must_use]
    pub fn find_fields_in_local_block(
        &self,
        local_tag_to_find: &str,
        indicator1: char,
        indicator2: char,
        block: Range<usize>,
    ) -> Range<usize> {
        let end = block.end.min(self.len());
        let fields = &self.fields()[block.start.min(end)..end];
        let is_match = |field: &Field| {
            local_tag(field) == local_tag_to_find
                && local_indicators_match(field, indicator1, indicator2)
        };

        let Some(first) = fields.iter().position(|field| is_match(field)) else {
            return end..end;
        };
        let run = fields[first..].iter().take_while(|field| is_match(field)).count();
        let start = block.start + first;
        start..start + run
    }

    /// Delete the local blocks starting at `block_starts`.
    ///
    /// Indices that do not start a block are ignored. Adjacent blocks are
    /// removed as one range, last range first.
    pub fn delete_local_blocks(&mut self, block_starts: &[usize]) {
        let doomed: Vec<Range<usize>> = self
            .find_all_local_blocks()
            .into_iter()
            .filter(|block| block_starts.contains(&block.start))
            .collect();

        for range in coalesce_local_block_deletions(&doomed).into_iter().rev() {
            self.delete_field_range(range);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::{BibliographicLevel, TypeOfRecord};

    fn lok(local_tag: &str, indicators: &str) -> Field {
        Field::new(LOCAL_BLOCK_TAG, format!("  \x1f0{local_tag}{indicators}\x1fax"))
    }

    fn record_with_local_tags(local_tags: &[&str]) -> Record {
        let mut record = Record::new(
            TypeOfRecord::LanguageMaterial,
            BibliographicLevel::MonographOrItem,
            Some("ctrl"),
        );
        record
            .insert_field(Tag::new("245").unwrap(), "10\x1faTitle")
            .unwrap();
        for local_tag in local_tags {
            record.append_field(lok(local_tag, "  "));
        }
        record
    }

    #[test]
    fn test_blocks_split_where_local_tag_decreases() {
        let record = record_with_local_tags(&["100", "200", "150", "300"]);
        assert_eq!(record.find_start_of_all_local_blocks(), vec![2, 4]);
        assert_eq!(record.find_all_local_blocks(), vec![2..4, 4..6]);
    }

    #[test]
    fn test_equal_local_tags_stay_in_block() {
        let record = record_with_local_tags(&["000", "852", "852", "866", "000", "852"]);
        assert_eq!(record.find_all_local_blocks(), vec![2..6, 6..8]);
    }

    #[test]
    fn test_no_local_fields() {
        let record = record_with_local_tags(&[]);
        assert!(record.find_start_of_all_local_blocks().is_empty());
        assert!(record.find_all_local_blocks().is_empty());
    }

    #[test]
    fn test_find_fields_with_wildcard_indicators() {
        let mut record = record_with_local_tags(&["000"]);
        record.append_field(lok("852", "1 "));
        record.append_field(lok("852", "2 "));
        record.append_field(lok("866", "  "));

        let block = record.find_all_local_blocks()[0].clone();
        assert_eq!(record.find_fields_in_local_block("852", '?', '?', block.clone()), 3..5);
        assert_eq!(record.find_fields_in_local_block("852", '2', ' ', block.clone()), 4..5);
        assert_eq!(record.find_fields_in_local_block("852", '3', '?', block.clone()), 6..6);
        assert_eq!(record.find_fields_in_local_block("935", '?', '?', block), 6..6);
    }

    #[test]
    fn test_find_fields_stays_inside_block() {
        let record = record_with_local_tags(&["000", "852", "000", "866"]);
        let blocks = record.find_all_local_blocks();
        assert_eq!(record.find_fields_in_local_block("866", '?', '?', blocks[0].clone()), 4..4);
        assert_eq!(record.find_fields_in_local_block("866", '?', '?', blocks[1].clone()), 5..6);
    }

    #[test]
    fn test_coalesce_adjacent_deletions() {
        assert_eq!(
            coalesce_local_block_deletions(&[7..9, 2..4, 4..7, 12..15]),
            vec![2..9, 12..15]
        );
        assert!(coalesce_local_block_deletions(&[]).is_empty());
    }

    #[test]
    fn test_delete_local_blocks() {
        let mut record = record_with_local_tags(&["000", "852", "000", "866", "000", "935"]);
        let starts = record.find_start_of_all_local_blocks();
        assert_eq!(starts, vec![2, 4, 6]);

        record.delete_local_blocks(&[starts[0], starts[2]]);
        let remaining: Vec<&str> = record.fields()[2..].iter().map(local_tag).collect();
        assert_eq!(remaining, vec!["000", "866"]);

        let size_before = record.size();
        record.delete_local_blocks(&[2]);
        assert_eq!(record.len(), 2);
        assert!(record.size() < size_before);
    }

    #[test]
    fn test_delete_adjacent_blocks_together() {
        let mut record = record_with_local_tags(&["100", "200", "150", "300"]);
        record.delete_local_blocks(&[2, 4]);
        assert_eq!(record.len(), 2);
        assert!(!record.has_tag(LOCAL_BLOCK_TAG));
    }
}
