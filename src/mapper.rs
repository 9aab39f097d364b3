//! Projection of decoded entities onto caller-declared record types.
//!
//! A record type lists its assignable fields once, in a [`FieldTable`]; a
//! [`Reflector`] then populates a scratch instance property by property:
//!
//! ```
//! use entline::field_table;
//! use entline::mapper::{FieldTable, MappedRecord, Reflector};
//! use entline::Value;
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! impl MappedRecord for Person {
//!     fn fields() -> FieldTable<Self> {
//!         field_table!(Person { "Name" => name, "Age" => age })
//!     }
//! }
//!
//! let mut r = Reflector::<Person>::new();
//! r.set("Name", &Value::from("Ada")).unwrap();
//! r.set("Age", &Value::Int(36)).unwrap();
//! assert_eq!(r.make_copy(), Person { name: "Ada".into(), age: 36 });
//! ```
//!
//! Zero values (`""`, `0`, `0.0`, `false`) are never assigned: the field keeps
//! whatever it held before. After [`Reflector::reset`] that is the type's
//! default, so a stored zero and an absent property map to the same record.

use crate::config::TransferConfig;
use crate::error::{BoxError, Result, TransferError};
use crate::model::{Entity, Value};
use crate::pipeline::{ImportSummary, run_import};
use crate::store::{BatchCounts, BatchSink};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use tracing::{debug, warn};

/// A field type that a [`Value`] can be coerced into.
pub trait Settable {
    /// Overwrite `slot` with `value`.
    ///
    /// # Errors
    /// A short reason when the value cannot be represented by this type.
    fn assign(slot: &mut Self, value: &Value) -> std::result::Result<(), String>;
}

fn mismatch(value: &Value, target: &str) -> String {
    format!("cannot assign {} to {target}", value.type_tag())
}

impl Settable for bool {
    fn assign(slot: &mut Self, value: &Value) -> std::result::Result<(), String> {
        match value {
            Value::Bool(b) => *slot = *b,
            other => return Err(mismatch(other, "bool")),
        }
        Ok(())
    }
}

macro_rules! settable_int {
    ($($t:ty),*) => {$(
        impl Settable for $t {
            fn assign(slot: &mut Self, value: &Value) -> std::result::Result<(), String> {
                match value {
                    Value::Int(i) => {
                        *slot = <$t>::try_from(*i).map_err(|_| {
                            format!("{i} is out of range for {}", stringify!($t))
                        })?;
                        Ok(())
                    }
                    other => Err(mismatch(other, stringify!($t))),
                }
            }
        }
    )*};
}

settable_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Settable for f64 {
    fn assign(slot: &mut Self, value: &Value) -> std::result::Result<(), String> {
        match value {
            Value::Float(f) => *slot = *f,
            Value::Int(i) => *slot = *i as f64,
            other => return Err(mismatch(other, "f64")),
        }
        Ok(())
    }
}

impl Settable for f32 {
    fn assign(slot: &mut Self, value: &Value) -> std::result::Result<(), String> {
        match value {
            Value::Float(f) => *slot = *f as f32,
            Value::Int(i) => *slot = *i as f32,
            other => return Err(mismatch(other, "f32")),
        }
        Ok(())
    }
}

impl Settable for String {
    fn assign(slot: &mut Self, value: &Value) -> std::result::Result<(), String> {
        match value {
            Value::String(s) => slot.clone_from(s),
            other => return Err(mismatch(other, "String")),
        }
        Ok(())
    }
}

impl Settable for Vec<u8> {
    fn assign(slot: &mut Self, value: &Value) -> std::result::Result<(), String> {
        match value {
            Value::Bytes(b) => slot.clone_from(b),
            other => return Err(mismatch(other, "Vec<u8>")),
        }
        Ok(())
    }
}

impl Settable for DateTime<Utc> {
    fn assign(slot: &mut Self, value: &Value) -> std::result::Result<(), String> {
        match value {
            Value::Timestamp(ts) => *slot = *ts,
            other => return Err(mismatch(other, "DateTime<Utc>")),
        }
        Ok(())
    }
}

impl<T: Settable + Default> Settable for Option<T> {
    fn assign(slot: &mut Self, value: &Value) -> std::result::Result<(), String> {
        let mut inner = slot.take().unwrap_or_default();
        T::assign(&mut inner, value)?;
        *slot = Some(inner);
        Ok(())
    }
}

type Setter<T> = Box<dyn Fn(&mut T, &Value) -> std::result::Result<(), String> + Send + Sync>;

/// Property name → setter registry for one record type.
pub struct FieldTable<T> {
    setters: HashMap<String, Setter<T>>,
}

impl<T> Default for FieldTable<T> {
    fn default() -> Self {
        Self {
            setters: HashMap::new(),
        }
    }
}

impl<T> FieldTable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register property `name` as assigning into the field returned by `access`.
    #[must_use]
    pub fn field<F, A>(mut self, name: impl Into<String>, access: A) -> Self
    where
        F: Settable,
        A: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        self.setters.insert(
            name.into(),
            Box::new(move |record: &mut T, value: &Value| F::assign(access(record), value)),
        );
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.setters.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.setters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.setters.is_empty()
    }
}

/// Build a [`FieldTable`] from `"PropertyName" => field` pairs.
#[macro_export]
macro_rules! field_table {
    ($ty:ty { $($name:literal => $field:ident),* $(,)? }) => {
        $crate::mapper::FieldTable::<$ty>::new()
            $(.field($name, |r: &mut $ty| &mut r.$field))*
    };
}

/// A record type the mapper can populate.
pub trait MappedRecord: Default + Clone + Send {
    fn fields() -> FieldTable<Self>;
}

/// Scratch-instance populator for one record type.
pub struct Reflector<T> {
    scratch: T,
    fields: FieldTable<T>,
    unknown: HashSet<String>,
}

impl<T: MappedRecord> Default for Reflector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: MappedRecord> Reflector<T> {
    pub fn new() -> Self {
        Self {
            scratch: T::default(),
            fields: T::fields(),
            unknown: HashSet::new(),
        }
    }

    /// Put the scratch instance back to `T::default()`.
    pub fn reset(&mut self) {
        self.scratch = T::default();
    }

    /// Assign one property. Zero values and unknown names are skipped.
    ///
    /// # Errors
    /// [`TransferError::Mapping`] when the value cannot be coerced into the field.
    pub fn set(&mut self, name: &str, value: &Value) -> Result<()> {
        let Some(setter) = self.fields.setters.get(name) else {
            if self.unknown.insert(name.to_string()) {
                warn!(field = name, "skipping unknown field");
            }
            return Ok(());
        };
        if value.is_zero() {
            return Ok(());
        }
        setter(&mut self.scratch, value).map_err(|reason| TransferError::Mapping {
            field: name.to_string(),
            reason,
        })
    }

    /// Assign all properties of `entity` on top of the current scratch state.
    ///
    /// # Errors
    /// See [`Reflector::set`].
    pub fn apply(&mut self, entity: &Entity) -> Result<()> {
        for p in &entity.properties {
            self.set(&p.name, &p.value)?;
        }
        Ok(())
    }

    /// An owned copy of the scratch instance.
    pub fn make_copy(&self) -> T {
        self.scratch.clone()
    }

    pub fn scratch(&self) -> &T {
        &self.scratch
    }
}

/// Per-kind record sink behind a [`ModelMapping`].
trait KindSink: Send {
    fn accept(&mut self, entity: &Entity) -> Result<()>;
    fn finish(self: Box<Self>) -> Result<BatchCounts>;
}

struct TypedSink<T, F> {
    reflector: Reflector<T>,
    batch: BatchSink<T, F>,
}

impl<T, F> KindSink for TypedSink<T, F>
where
    T: MappedRecord,
    F: FnMut(Vec<T>) -> std::result::Result<(), BoxError> + Send,
{
    fn accept(&mut self, entity: &Entity) -> Result<()> {
        self.reflector.reset();
        self.reflector.apply(entity)?;
        self.batch.push(self.reflector.make_copy())
    }

    fn finish(self: Box<Self>) -> Result<BatchCounts> {
        self.batch.finish()
    }
}

/// Binds an entity kind to a record type and a batch callback.
pub struct ModelMapping<'a> {
    kind: String,
    sink: Box<dyn KindSink + 'a>,
}

impl<'a> ModelMapping<'a> {
    /// Map entities of `kind` onto `T`, calling `on_batch(kind, records)` with
    /// up to `batch_size` records at a time.
    pub fn new<T, F>(kind: impl Into<String>, batch_size: usize, mut on_batch: F) -> Self
    where
        T: MappedRecord + 'a,
        F: FnMut(&str, Vec<T>) -> std::result::Result<(), BoxError> + Send + 'a,
    {
        let kind = kind.into();
        let batch_kind = kind.clone();
        let flush = move |records: Vec<T>| on_batch(&batch_kind, records);
        Self {
            kind,
            sink: Box::new(TypedSink {
                reflector: Reflector::<T>::new(),
                batch: BatchSink::new(batch_size, flush),
            }),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

/// Import a frame stream through a set of model mappings.
///
/// Each entity is routed by its key's innermost kind.
///
/// # Errors
/// [`TransferError::UnknownKind`] for an entity whose kind has no mapping,
/// [`TransferError::Mapping`] for a value a field cannot hold, and
/// [`TransferError::Sink`] when a batch callback fails; otherwise as
/// [`run_import`].
pub fn import_mapped<R: Read>(
    reader: R,
    mappings: Vec<ModelMapping<'_>>,
    cfg: &TransferConfig,
) -> Result<ImportSummary> {
    run_import(reader, cfg, move |entities| {
        let mut by_kind = HashMap::new();
        let mut sinks = Vec::with_capacity(mappings.len());
        for (idx, m) in mappings.into_iter().enumerate() {
            by_kind.insert(m.kind, idx);
            sinks.push(m.sink);
        }
        for entity in entities {
            let idx = *by_kind
                .get(entity.key.kind())
                .ok_or_else(|| TransferError::UnknownKind(entity.key.kind().to_string()))?;
            sinks[idx].accept(&entity)?;
        }
        let mut total = BatchCounts::default();
        for sink in sinks {
            let counts = sink.finish()?;
            total.items += counts.items;
            total.batches += counts.batches;
        }
        debug!(records = total.items, batches = total.batches, "mapped import done");
        Ok(total)
    })
}
