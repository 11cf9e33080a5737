use super::{Field, FieldCore};
use crate::dialect::SqlWriter;
use crate::predicate::CustomPredicate;
use crate::query::Query;
use crate::value::Value;
use std::sync::Arc;

/// One substitution for a `?` in a format template.
#[derive(Debug, Clone)]
pub enum Arg {
    /// Bound as a placeholder.
    Value(Value),
    /// Rendered inline.
    Field(Arc<dyn Field>),
    /// Rendered as a parenthesized subquery.
    Query(Arc<dyn Query>),
    /// Rendered as `(?, ?, ...)`, or `(NULL)` when empty.
    List(Vec<Value>),
}

impl Arg {
    pub fn value(value: impl Into<Value>) -> Self {
        Arg::Value(value.into())
    }

    pub fn field(field: impl Field + 'static) -> Self {
        Arg::Field(Arc::new(field))
    }

    pub fn query(query: impl Query + 'static) -> Self {
        Arg::Query(Arc::new(query))
    }

    pub(crate) fn append_sql(&self, w: &mut SqlWriter, excluded: &[String]) {
        match self {
            Arg::Value(v) => w.push_arg(v.clone()),
            Arg::Field(f) => f.append_sql(w, excluded),
            Arg::Query(q) => {
                w.push('(');
                q.append_sql(w);
                w.push(')');
            }
            Arg::List(values) if values.is_empty() => w.push_str("(NULL)"),
            Arg::List(values) => {
                w.push('(');
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        w.push_str(", ");
                    }
                    w.push_arg(v.clone());
                }
                w.push(')');
            }
        }
    }
}

/// Expand `format`, replacing each `?` with the next argument.
///
/// `??` writes a literal `?`. Placeholders left over once the arguments are
/// exhausted are written as-is.
pub(crate) fn append_template(w: &mut SqlWriter, format: &str, args: &[Arg], excluded: &[String]) {
    let mut args = args.iter();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '?' {
            w.push(c);
            continue;
        }
        if chars.peek() == Some(&'?') {
            chars.next();
            w.push('?');
            continue;
        }
        match args.next() {
            Some(arg) => arg.append_sql(w, excluded),
            None => w.push('?'),
        }
    }
}

/// A derived expression built from a format template.
///
/// ```ignore
/// let full_name = fieldf("CONCAT(?, ' ', ?)", vec![Arg::field(u.first.clone()), Arg::field(u.last.clone())])
///     .as_("full_name");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CustomField {
    core: FieldCore,
    format: String,
    values: Vec<Arg>,
}

/// Shorthand for [`CustomField::new`].
pub fn fieldf(format: impl Into<String>, values: Vec<Arg>) -> CustomField {
    CustomField::new(format, values)
}

impl CustomField {
    pub fn new(format: impl Into<String>, values: Vec<Arg>) -> Self {
        Self {
            core: FieldCore::default(),
            format: format.into(),
            values,
        }
    }

    /// Untyped `qualifier.name` column.
    pub(crate) fn column(qualifier: &str, name: &str) -> Self {
        Self {
            core: FieldCore {
                qualifier: qualifier.to_string(),
                name: name.to_string(),
                ..FieldCore::default()
            },
            ..Self::default()
        }
    }

    pub fn as_(mut self, alias: &str) -> Self {
        self.core.alias = alias.to_string();
        self
    }

    pub fn asc(mut self) -> Self {
        self.core.descending = Some(false);
        self
    }

    pub fn desc(mut self) -> Self {
        self.core.descending = Some(true);
        self
    }

    pub fn nulls_first(mut self) -> Self {
        self.core.nulls_first = Some(true);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.core.nulls_first = Some(false);
        self
    }

    fn compare(&self, op: &str, rhs: Arg) -> CustomPredicate {
        CustomPredicate::new(format!("? {op} ?"), vec![Arg::field(self.clone()), rhs])
    }

    pub fn eq(&self, field: impl Field + 'static) -> CustomPredicate {
        self.compare("=", Arg::field(field))
    }

    pub fn ne(&self, field: impl Field + 'static) -> CustomPredicate {
        self.compare("<>", Arg::field(field))
    }

    pub fn lt(&self, field: impl Field + 'static) -> CustomPredicate {
        self.compare("<", Arg::field(field))
    }

    pub fn le(&self, field: impl Field + 'static) -> CustomPredicate {
        self.compare("<=", Arg::field(field))
    }

    pub fn gt(&self, field: impl Field + 'static) -> CustomPredicate {
        self.compare(">", Arg::field(field))
    }

    pub fn ge(&self, field: impl Field + 'static) -> CustomPredicate {
        self.compare(">=", Arg::field(field))
    }

    pub fn eq_value(&self, value: impl Into<Value>) -> CustomPredicate {
        self.compare("=", Arg::value(value))
    }

    pub fn ne_value(&self, value: impl Into<Value>) -> CustomPredicate {
        self.compare("<>", Arg::value(value))
    }

    pub fn lt_value(&self, value: impl Into<Value>) -> CustomPredicate {
        self.compare("<", Arg::value(value))
    }

    pub fn gt_value(&self, value: impl Into<Value>) -> CustomPredicate {
        self.compare(">", Arg::value(value))
    }

    pub fn is_null(&self) -> CustomPredicate {
        CustomPredicate::new("? IS NULL", vec![Arg::field(self.clone())])
    }

    pub fn is_not_null(&self) -> CustomPredicate {
        CustomPredicate::new("? IS NOT NULL", vec![Arg::field(self.clone())])
    }

    pub fn in_values<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> CustomPredicate {
        CustomPredicate::new(
            "? IN ?",
            vec![
                Arg::field(self.clone()),
                Arg::List(values.into_iter().map(Into::into).collect()),
            ],
        )
    }
}

impl Field for CustomField {
    fn append_sql(&self, w: &mut SqlWriter, excluded: &[String]) {
        if self.format.is_empty() {
            self.core.append_base(w, excluded);
        } else {
            append_template(w, &self.format, &self.values, excluded);
        }
        self.core.append_ordering(w);
    }

    fn alias(&self) -> &str {
        &self.core.alias
    }

    fn name(&self) -> &str {
        &self.core.name
    }
}

/// Raw SQL inserted verbatim, e.g. `COUNT(*)` or `1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLiteral(pub String);

impl FieldLiteral {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }
}

impl Field for FieldLiteral {
    fn append_sql(&self, w: &mut SqlWriter, _excluded: &[String]) {
        w.push_str(&self.0);
    }

    fn name(&self) -> &str {
        &self.0
    }
}
