//! Typed field model.
//!
//! A field is one of:
//! 1. a literal value, rendered as a single placeholder with one argument,
//! 2. a table-qualified column reference,
//! 3. a derived expression ([`CustomField`]) or verbatim SQL
//!    ([`FieldLiteral`]).
//!
//! Typed wrappers ([`BooleanField`], [`NumberField`], [`StringField`],
//! [`TimeField`]) only differ in which comparison builders they expose.

mod assignment;
mod boolean;
mod custom;
mod number;
mod string;
mod time;

pub use assignment::{FieldAssignment, FieldAssignments, excluded, values};
pub use boolean::BooleanField;
pub use custom::{Arg, CustomField, FieldLiteral, fieldf};
pub(crate) use custom::append_template;
pub use number::NumberField;
pub use string::StringField;
pub use time::TimeField;

use crate::dialect::SqlWriter;
use crate::table::Table;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A renderable SQL expression.
pub trait Field: Send + Sync + fmt::Debug {
    /// Render into `w`, dropping the table qualifier of any column whose
    /// qualifier appears in `excluded`.
    fn append_sql(&self, w: &mut SqlWriter, excluded: &[String]);

    /// Alias used as `field AS alias` in a SELECT list. Empty when unset.
    fn alias(&self) -> &str {
        ""
    }

    /// Column name. Empty for expressions.
    fn name(&self) -> &str {
        ""
    }
}

impl<F: Field + ?Sized> Field for Arc<F> {
    fn append_sql(&self, w: &mut SqlWriter, excluded: &[String]) {
        (**self).append_sql(w, excluded)
    }

    fn alias(&self) -> &str {
        (**self).alias()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Shared state behind every typed field.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldCore {
    pub(crate) value: Option<Value>,
    pub(crate) qualifier: String,
    pub(crate) name: String,
    pub(crate) alias: String,
    pub(crate) descending: Option<bool>,
    pub(crate) nulls_first: Option<bool>,
}

impl FieldCore {
    pub(crate) fn column(name: &str, table: &dyn Table) -> Self {
        let qualifier = if table.alias().is_empty() {
            table.name()
        } else {
            table.alias()
        };
        Self {
            qualifier: qualifier.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn literal(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub(crate) fn append_base(&self, w: &mut SqlWriter, excluded: &[String]) {
        if let Some(value) = &self.value {
            w.push_arg(value.clone());
            return;
        }
        if !self.qualifier.is_empty() && !excluded.iter().any(|q| *q == self.qualifier) {
            w.push_ident(&self.qualifier);
            w.push('.');
        }
        w.push_ident(&self.name);
    }

    pub(crate) fn append_ordering(&self, w: &mut SqlWriter) {
        match self.descending {
            Some(true) => w.push_str(" DESC"),
            Some(false) => w.push_str(" ASC"),
            None => {}
        }
        match self.nulls_first {
            Some(true) => w.push_str(" NULLS FIRST"),
            Some(false) => w.push_str(" NULLS LAST"),
            None => {}
        }
    }
}

/// Ordered list of fields rendered comma-separated.
#[derive(Debug, Clone, Default)]
pub struct Fields(pub Vec<Arc<dyn Field>>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, field: Arc<dyn Field>) {
        self.0.push(field);
    }

    pub fn extend(&mut self, other: Fields) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Field>> {
        self.0.iter()
    }

    pub fn append_sql(&self, w: &mut SqlWriter, excluded: &[String]) {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                w.push_str(", ");
            }
            field.append_sql(w, excluded);
        }
    }

    /// SELECT-list rendering: aliased fields get ` AS alias`.
    pub fn append_sql_with_alias(&self, w: &mut SqlWriter, excluded: &[String]) {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                w.push_str(", ");
            }
            field.append_sql(w, excluded);
            let alias = field.alias();
            if !alias.is_empty() {
                w.push_str(" AS ");
                w.push_ident(alias);
            }
        }
    }
}

impl From<Vec<Arc<dyn Field>>> for Fields {
    fn from(fields: Vec<Arc<dyn Field>>) -> Self {
        Self(fields)
    }
}

/// Build a [`Fields`] list from field values (each is cloned).
///
/// ```ignore
/// let q = postgres::select(fields![u.user_id, u.email]).from(u.table());
/// ```
#[macro_export]
macro_rules! fields {
    () => { $crate::field::Fields::new() };
    ($($field:expr),+ $(,)?) => {
        $crate::field::Fields(vec![
            $(::std::sync::Arc::new(::std::clone::Clone::clone(&$field))
                as ::std::sync::Arc<dyn $crate::field::Field>),+
        ])
    };
}

/// Builders shared by all typed column wrappers.
macro_rules! impl_typed_field {
    ($ty:ident) => {
        impl $ty {
            /// Column `name` qualified by `table` (its alias, else its name).
            pub fn new(name: &str, table: &dyn $crate::table::Table) -> Self {
                Self {
                    core: $crate::field::FieldCore::column(name, table),
                    ..Self::default()
                }
            }

            /// Unqualified column.
            pub fn bare(name: &str) -> Self {
                Self {
                    core: $crate::field::FieldCore {
                        name: name.to_string(),
                        ..$crate::field::FieldCore::default()
                    },
                    ..Self::default()
                }
            }

            /// `field AS alias`
            pub fn as_(mut self, alias: &str) -> Self {
                self.core.alias = alias.to_string();
                self
            }

            /// `ORDER BY field ASC`
            pub fn asc(mut self) -> Self {
                self.core.descending = Some(false);
                self
            }

            /// `ORDER BY field DESC`
            pub fn desc(mut self) -> Self {
                self.core.descending = Some(true);
                self
            }

            /// `ORDER BY field NULLS FIRST`
            pub fn nulls_first(mut self) -> Self {
                self.core.nulls_first = Some(true);
                self
            }

            /// `ORDER BY field NULLS LAST`
            pub fn nulls_last(mut self) -> Self {
                self.core.nulls_first = Some(false);
                self
            }

            pub fn is_null(&self) -> $crate::predicate::CustomPredicate {
                $crate::predicate::CustomPredicate::new(
                    "? IS NULL",
                    vec![$crate::field::Arg::field(self.clone())],
                )
            }

            pub fn is_not_null(&self) -> $crate::predicate::CustomPredicate {
                $crate::predicate::CustomPredicate::new(
                    "? IS NOT NULL",
                    vec![$crate::field::Arg::field(self.clone())],
                )
            }

            /// `field = other`
            pub fn eq(&self, other: &$ty) -> $crate::predicate::CustomPredicate {
                self.compare("=", $crate::field::Arg::field(other.clone()))
            }

            /// `field <> other`
            pub fn ne(&self, other: &$ty) -> $crate::predicate::CustomPredicate {
                self.compare("<>", $crate::field::Arg::field(other.clone()))
            }

            /// `field IN (?, ?, ...)`
            pub fn in_values<V: Into<$crate::value::Value>>(
                &self,
                values: impl IntoIterator<Item = V>,
            ) -> $crate::predicate::CustomPredicate {
                $crate::predicate::CustomPredicate::new(
                    "? IN ?",
                    vec![
                        $crate::field::Arg::field(self.clone()),
                        $crate::field::Arg::List(values.into_iter().map(Into::into).collect()),
                    ],
                )
            }

            /// `field NOT IN (?, ?, ...)`
            pub fn not_in_values<V: Into<$crate::value::Value>>(
                &self,
                values: impl IntoIterator<Item = V>,
            ) -> $crate::predicate::CustomPredicate {
                $crate::predicate::CustomPredicate::new(
                    "? NOT IN ?",
                    vec![
                        $crate::field::Arg::field(self.clone()),
                        $crate::field::Arg::List(values.into_iter().map(Into::into).collect()),
                    ],
                )
            }

            /// `field IN (subquery)`
            pub fn in_query(
                &self,
                query: impl $crate::query::Query + 'static,
            ) -> $crate::predicate::CustomPredicate {
                $crate::predicate::CustomPredicate::new(
                    "? IN ?",
                    vec![
                        $crate::field::Arg::field(self.clone()),
                        $crate::field::Arg::query(query),
                    ],
                )
            }

            /// `field = value` assignment for SET clauses.
            pub fn set(&self, value: impl Into<$crate::value::Value>) -> $crate::field::FieldAssignment {
                $crate::field::FieldAssignment::new(
                    self.clone(),
                    $crate::field::Arg::Value(value.into()),
                )
            }

            /// `field = expression` assignment for SET clauses.
            pub fn set_to(&self, field: impl $crate::field::Field + 'static) -> $crate::field::FieldAssignment {
                $crate::field::FieldAssignment::new(self.clone(), $crate::field::Arg::field(field))
            }

            pub(crate) fn compare(
                &self,
                op: &str,
                rhs: $crate::field::Arg,
            ) -> $crate::predicate::CustomPredicate {
                $crate::predicate::CustomPredicate::new(
                    format!("? {op} ?"),
                    vec![$crate::field::Arg::field(self.clone()), rhs],
                )
            }
        }
    };
}

/// `<`, `<=`, `>`, `>=` against a field of the same type.
macro_rules! impl_ordered_compare {
    ($ty:ident) => {
        impl $ty {
            /// `field < other`
            pub fn lt(&self, other: &$ty) -> $crate::predicate::CustomPredicate {
                self.compare("<", $crate::field::Arg::field(other.clone()))
            }

            /// `field <= other`
            pub fn le(&self, other: &$ty) -> $crate::predicate::CustomPredicate {
                self.compare("<=", $crate::field::Arg::field(other.clone()))
            }

            /// `field > other`
            pub fn gt(&self, other: &$ty) -> $crate::predicate::CustomPredicate {
                self.compare(">", $crate::field::Arg::field(other.clone()))
            }

            /// `field >= other`
            pub fn ge(&self, other: &$ty) -> $crate::predicate::CustomPredicate {
                self.compare(">=", $crate::field::Arg::field(other.clone()))
            }
        }
    };
}

pub(crate) use impl_ordered_compare;
pub(crate) use impl_typed_field;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::table::BaseTable;

    fn render(field: &dyn Field, excluded: &[String]) -> (String, Vec<Value>) {
        let mut w = SqlWriter::new(Dialect::MySql);
        field.append_sql(&mut w, excluded);
        w.into_parts()
    }

    #[test]
    fn column_uses_alias_then_name_as_qualifier() {
        let users = BaseTable::new("public", "users");
        assert_eq!(render(&NumberField::new("id", &users), &[]).0, "users.id");

        let u = users.as_("u");
        assert_eq!(render(&NumberField::new("id", &u), &[]).0, "u.id");
    }

    #[test]
    fn excluded_qualifier_is_dropped() {
        let t = BaseTable::new("", "t");
        let f = StringField::new("name", &t);
        assert_eq!(render(&f, &["t".to_string()]).0, "name");
        assert_eq!(render(&f, &["other".to_string()]).0, "t.name");
    }

    #[test]
    fn whitespace_identifiers_are_quoted() {
        let t = BaseTable::new("", "order items").as_("line item");
        let f = NumberField::new("unit price", &t);
        assert_eq!(render(&f, &[]).0, "\"line item\".\"unit price\"");
    }

    #[test]
    fn literal_renders_one_placeholder() {
        let (sql, args) = render(&NumberField::int(42), &[]);
        assert_eq!(sql, "?");
        assert_eq!(args, vec![Value::Int(42)]);
    }

    #[test]
    fn ordering_modifiers_stack() {
        let t = BaseTable::new("", "t");
        let f = TimeField::new("created_at", &t).desc().nulls_last();
        assert_eq!(render(&f, &[]).0, "t.created_at DESC NULLS LAST");
        let f = TimeField::new("created_at", &t).asc().nulls_first();
        assert_eq!(render(&f, &[]).0, "t.created_at ASC NULLS FIRST");
    }

    #[test]
    fn select_list_appends_aliases() {
        let t = BaseTable::new("", "t");
        let list = fields![NumberField::new("id", &t).as_("user id"), StringField::new("name", &t)];
        let mut w = SqlWriter::new(Dialect::MySql);
        list.append_sql_with_alias(&mut w, &[]);
        assert_eq!(w.sql(), "t.id AS \"user id\", t.name");
    }
}
