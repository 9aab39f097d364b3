//! Stream-scoped schema dictionaries.
//!
//! The encode side keeps a [`SchemaDictionary`] keyed by property name, the
//! decode side a [`ColumnTable`] keyed by column index. Both start empty at
//! the beginning of a stream, only ever grow, and are owned by the single
//! frame encoder/decoder worker of that stream.

use crate::error::{DecodeError, EncodeError};
use crate::value::TypeTag;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};

/// Type and index flag fixed for a column at its first sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub tag: TypeTag,
    pub indexed: bool,
}

/// Append-only `name → (column index, spec)` mapping.
///
/// The column index is the insertion position and never changes.
#[derive(Debug, Default, Clone)]
pub struct SchemaDictionary {
    columns: IndexMap<String, ColumnSpec>,
}

impl SchemaDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    pub fn get(&self, name: &str) -> Option<(usize, &ColumnSpec)> {
        self.columns.get_full(name).map(|(idx, _, spec)| (idx, spec))
    }

    /// Column index for `name`, appending a new column when unseen.
    ///
    /// Returns the index and whether the column was created by this call.
    ///
    /// # Errors
    /// [`EncodeError::TypeConflict`] when `name` already exists with another tag.
    pub fn resolve(
        &mut self,
        name: &str,
        tag: TypeTag,
        indexed: bool,
    ) -> Result<(usize, bool), EncodeError> {
        if let Some((idx, spec)) = self.get(name) {
            if spec.tag != tag {
                return Err(EncodeError::TypeConflict {
                    name: name.to_string(),
                    expected: spec.tag,
                    got: tag,
                });
            }
            return Ok((idx, false));
        }
        let (idx, _) = self
            .columns
            .insert_full(name.to_string(), ColumnSpec { tag, indexed });
        Ok((idx, true))
    }

    /// Columns in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &ColumnSpec)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, (name, spec))| (idx, name.as_str(), spec))
    }
}

/// A column registered from a schema increment frame.
///
/// `tag` is `None` when the raw tag is not one this crate can decode; the
/// column stays usable for `null` cells and fails on the first value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub raw_tag: String,
    pub tag: Option<TypeTag>,
    pub indexed: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, raw_tag: impl Into<String>, indexed: bool) -> Self {
        let raw_tag = raw_tag.into();
        Self {
            name: name.into(),
            tag: raw_tag.parse().ok(),
            raw_tag,
            indexed,
        }
    }
}

/// Decode-side `column index → definition` table.
///
/// Indices come from the input and may be sparse, so only registered
/// columns take space.
#[derive(Debug, Default, Clone)]
pub struct ColumnTable {
    columns: BTreeMap<usize, ColumnDef>,
    tags_by_name: HashMap<String, String>,
}

impl ColumnTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(&index)
    }

    /// Register `def` at `index`.
    ///
    /// Re-announcing an identical column is accepted.
    ///
    /// # Errors
    /// - [`DecodeError::ColumnRedefined`] when `index` already holds a different column
    /// - [`DecodeError::TypeConflict`] when the name is known under another tag
    pub fn register(&mut self, index: usize, def: ColumnDef) -> Result<(), DecodeError> {
        if let Some(existing) = self.get(index) {
            if *existing == def {
                return Ok(());
            }
            return Err(DecodeError::ColumnRedefined {
                index,
                name: def.name,
                old_tag: existing.raw_tag.clone(),
                new_tag: def.raw_tag,
            });
        }
        if let Some(old_tag) = self.tags_by_name.get(&def.name)
            && *old_tag != def.raw_tag
        {
            return Err(DecodeError::TypeConflict {
                name: def.name,
                old_tag: old_tag.clone(),
                new_tag: def.raw_tag,
            });
        }
        self.tags_by_name
            .insert(def.name.clone(), def.raw_tag.clone());
        self.columns.insert(index, def);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_first_sighting() {
        let mut d = SchemaDictionary::new();
        assert_eq!(d.resolve("b", TypeTag::Int64, true).unwrap(), (0, true));
        assert_eq!(d.resolve("a", TypeTag::String, false).unwrap(), (1, true));
        assert_eq!(d.resolve("b", TypeTag::Int64, false).unwrap(), (0, false));
        assert_eq!(d.len(), 2);
        assert_eq!(d.index_of("a"), Some(1));
        // indexed flag stays as first seen
        assert!(d.get("b").unwrap().1.indexed);
        let names: Vec<_> = d.iter().map(|(_, n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn conflicting_type_is_rejected() {
        let mut d = SchemaDictionary::new();
        d.resolve("x", TypeTag::Int64, true).unwrap();
        let err = d.resolve("x", TypeTag::String, true).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::TypeConflict {
                expected: TypeTag::Int64,
                got: TypeTag::String,
                ..
            }
        ));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn column_table_registration() {
        let mut t = ColumnTable::new();
        t.register(0, ColumnDef::new("a", "int64", true)).unwrap();
        t.register(2, ColumnDef::new("c", "geo", true)).unwrap();
        assert_eq!(t.len(), 2);
        assert!(t.get(1).is_none());
        assert_eq!(t.get(0).unwrap().tag, Some(TypeTag::Int64));
        assert_eq!(t.get(2).unwrap().tag, None);

        // identical re-announcement is fine
        t.register(0, ColumnDef::new("a", "int64", true)).unwrap();
        assert!(matches!(
            t.register(0, ColumnDef::new("z", "int64", true)),
            Err(DecodeError::ColumnRedefined { index: 0, .. })
        ));
        assert!(matches!(
            t.register(5, ColumnDef::new("a", "string", true)),
            Err(DecodeError::TypeConflict { .. })
        ));
    }

    #[test]
    fn far_indices_stay_sparse() {
        let mut t = ColumnTable::new();
        t.register(usize::MAX, ColumnDef::new("last", "bool", false)).unwrap();
        t.register(4_000_000_000_000, ColumnDef::new("far", "int64", true)).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(usize::MAX).unwrap().name, "last");
        assert!(t.get(0).is_none());
    }
}
