//! Two-pass row materialization.
//!
//! A row mapper is an ordinary closure `FnMut(&mut Row) -> T` that calls
//! one accessor per column it needs:
//!
//! ```rust,ignore
//! let users = q.fetch_all(Some(&db), |row| User {
//!     id: row.int64(&u.user_id),
//!     name: row.string(&u.displayname),
//!     email: row.null_string(&u.email),
//! }).await?;
//! ```
//!
//! The mapper runs once before the query is sent, in [`Phase::Declaring`].
//! Accessors then return zero values and record the field plus the slot
//! kind; the recorded fields become the SELECT (or RETURNING) list. For
//! every result row the mapper runs again in [`Phase::Materializing`] and
//! the accessors return the scanned values, in the same order.
//!
//! The mapper must call the same accessors in the same order on every
//! invocation. Conversion failures do not interrupt the mapper; the first
//! one is kept and reported once the mapper returns.

use crate::error::{SqError, SqResult};
use crate::field::{Field, Fields, NumberField, StringField, TimeField};
use crate::predicate::Predicate;
use crate::value::{FromValue, ScanKind, Value};
use chrono::{DateTime, Utc};
use std::panic::Location;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting fields; no values are available.
    Declaring,
    /// Reading the values of one result row.
    Materializing,
}

/// Accessor handle passed to row mappers.
#[derive(Debug)]
pub struct Row {
    phase: Phase,
    fields: Vec<Arc<dyn Field>>,
    kinds: Vec<ScanKind>,
    slots: Vec<Value>,
    index: usize,
    error: Option<SqError>,
}

/// Fields and slot kinds declared by a mapper.
#[derive(Debug, Clone, Default)]
pub(crate) struct RowShape {
    pub(crate) fields: Fields,
    kinds: Vec<ScanKind>,
}

impl RowShape {
    /// Declare pass: run `mapper` once and keep what it asked for.
    pub(crate) fn declare<T>(mapper: &mut impl FnMut(&mut Row) -> T) -> Self {
        let mut row = Row::new(Phase::Declaring, Vec::new());
        let _ = mapper(&mut row);
        RowShape {
            fields: Fields(row.fields),
            kinds: row.kinds,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Normalize one driver row into typed slots.
    pub(crate) fn scan(&self, values: Vec<Value>, caller: &Location<'_>) -> SqResult<Vec<Value>> {
        if values.len() != self.kinds.len() {
            return Err(SqError::scan(
                caller,
                format!(
                    "expected {} columns, got {}",
                    self.kinds.len(),
                    values.len()
                ),
            ));
        }
        values
            .into_iter()
            .zip(&self.kinds)
            .enumerate()
            .map(|(i, (value, kind))| {
                kind.scan(value)
                    .map_err(|msg| SqError::scan(caller, format!("column {i}: {msg}")))
            })
            .collect()
    }

    /// Human-readable label per field: alias, else name, else SQL.
    pub(crate) fn labels(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| {
                if !f.alias().is_empty() {
                    return f.alias().to_string();
                }
                let mut w = crate::dialect::SqlWriter::new(crate::dialect::Dialect::MySql);
                f.append_sql(&mut w, &[]);
                w.sql().to_string()
            })
            .collect()
    }

    /// Value pass: run `mapper` on one scanned row.
    pub(crate) fn materialize<T>(
        &self,
        slots: Vec<Value>,
        mapper: &mut impl FnMut(&mut Row) -> T,
        caller: &Location<'_>,
    ) -> SqResult<T> {
        let mut row = Row::new(Phase::Materializing, slots);
        let item = mapper(&mut row);
        if let Some(err) = row.error.take() {
            return Err(err);
        }
        if row.index != self.kinds.len() {
            return Err(SqError::scan(
                caller,
                format!(
                    "mapper read {} columns but declared {}",
                    row.index,
                    self.kinds.len()
                ),
            ));
        }
        Ok(item)
    }
}

impl Row {
    fn new(phase: Phase, slots: Vec<Value>) -> Self {
        Self {
            phase,
            fields: Vec::new(),
            kinds: Vec::new(),
            slots,
            index: 0,
            error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of accessor calls made so far on this row.
    pub fn index(&self) -> usize {
        match self.phase {
            Phase::Declaring => self.kinds.len(),
            Phase::Materializing => self.index,
        }
    }

    #[track_caller]
    fn fail(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(SqError::scan(Location::caller(), message));
        }
    }

    #[track_caller]
    fn read<F>(&mut self, field: &F, kind: ScanKind) -> Option<Value>
    where
        F: Field + Clone + 'static,
    {
        match self.phase {
            Phase::Declaring => {
                self.fields.push(Arc::new(field.clone()));
                self.kinds.push(kind);
                None
            }
            Phase::Materializing => {
                let index = self.index;
                self.index += 1;
                if index < self.slots.len() {
                    return Some(std::mem::take(&mut self.slots[index]));
                }
                self.fail(format!(
                    "column {index} requested but only {} were declared",
                    self.slots.len()
                ));
                None
            }
        }
    }

    #[track_caller]
    fn get<T, F>(&mut self, field: &F) -> T
    where
        T: FromValue + Default,
        F: Field + Clone + 'static,
    {
        let Some(value) = self.read(field, T::KIND) else {
            return T::default();
        };
        match T::from_nullable(value) {
            Ok(v) => v,
            Err(msg) => {
                self.fail(msg);
                T::default()
            }
        }
    }

    /// Scan `field` into `dest` through its [`FromValue`] impl.
    ///
    /// `dest` is left untouched in the declare phase.
    #[track_caller]
    pub fn scan_into<T, F>(&mut self, dest: &mut T, field: &F)
    where
        T: FromValue,
        F: Field + Clone + 'static,
    {
        let Some(value) = self.read(field, T::KIND) else {
            return;
        };
        match T::from_nullable(value) {
            Ok(v) => *dest = v,
            Err(msg) => self.fail(msg),
        }
    }

    /// Raw column value.
    #[track_caller]
    pub fn value<F: Field + Clone + 'static>(&mut self, field: &F) -> Value {
        self.get(field)
    }

    /// Boolean result of a predicate (or boolean column). NULL is `false`.
    #[track_caller]
    pub fn bool<P: Predicate + Clone + 'static>(&mut self, predicate: &P) -> bool {
        self.get(predicate)
    }

    /// Whether the predicate result is non-NULL.
    #[track_caller]
    pub fn bool_valid<P: Predicate + Clone + 'static>(&mut self, predicate: &P) -> bool {
        self.get::<Option<bool>, P>(predicate).is_some()
    }

    #[track_caller]
    pub fn null_bool<P: Predicate + Clone + 'static>(&mut self, predicate: &P) -> Option<bool> {
        self.get(predicate)
    }

    #[track_caller]
    pub fn float64(&mut self, field: &NumberField) -> f64 {
        self.get(field)
    }

    #[track_caller]
    pub fn float64_valid(&mut self, field: &NumberField) -> bool {
        self.get::<Option<f64>, _>(field).is_some()
    }

    #[track_caller]
    pub fn null_float64(&mut self, field: &NumberField) -> Option<f64> {
        self.get(field)
    }

    #[track_caller]
    pub fn int32(&mut self, field: &NumberField) -> i32 {
        self.get(field)
    }

    #[track_caller]
    pub fn null_int32(&mut self, field: &NumberField) -> Option<i32> {
        self.get(field)
    }

    #[track_caller]
    pub fn int64(&mut self, field: &NumberField) -> i64 {
        self.get(field)
    }

    #[track_caller]
    pub fn int64_valid(&mut self, field: &NumberField) -> bool {
        self.get::<Option<i64>, _>(field).is_some()
    }

    #[track_caller]
    pub fn null_int64(&mut self, field: &NumberField) -> Option<i64> {
        self.get(field)
    }

    #[track_caller]
    pub fn string(&mut self, field: &StringField) -> String {
        self.get(field)
    }

    #[track_caller]
    pub fn string_valid(&mut self, field: &StringField) -> bool {
        self.get::<Option<String>, _>(field).is_some()
    }

    #[track_caller]
    pub fn null_string(&mut self, field: &StringField) -> Option<String> {
        self.get(field)
    }

    #[track_caller]
    pub fn time(&mut self, field: &TimeField) -> DateTime<Utc> {
        self.get(field)
    }

    #[track_caller]
    pub fn time_valid(&mut self, field: &TimeField) -> bool {
        self.get::<Option<DateTime<Utc>>, _>(field).is_some()
    }

    #[track_caller]
    pub fn null_time(&mut self, field: &TimeField) -> Option<DateTime<Utc>> {
        self.get(field)
    }
}
