//! Boolean expressions for WHERE, HAVING and JOIN ... ON.

use crate::dialect::SqlWriter;
use crate::field::{Arg, Field, append_template};
use crate::query::Query;
use std::sync::Arc;

/// A field that evaluates to a boolean and can be negated.
pub trait Predicate: Field {
    /// Logical negation. Negating twice yields the original rendering.
    fn not(&self) -> Arc<dyn Predicate>;
}

impl<P: Predicate + ?Sized> Predicate for Arc<P> {
    fn not(&self) -> Arc<dyn Predicate> {
        (**self).not()
    }
}

/// A predicate built from a format template, e.g. `"? = ?"`.
#[derive(Debug, Clone)]
pub struct CustomPredicate {
    format: String,
    values: Vec<Arg>,
    negative: bool,
    alias: String,
}

/// Shorthand for [`CustomPredicate::new`].
pub fn predicatef(format: impl Into<String>, values: Vec<Arg>) -> CustomPredicate {
    CustomPredicate::new(format, values)
}

impl CustomPredicate {
    pub fn new(format: impl Into<String>, values: Vec<Arg>) -> Self {
        Self {
            format: format.into(),
            values,
            negative: false,
            alias: String::new(),
        }
    }

    pub fn as_(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }
}

impl Field for CustomPredicate {
    fn append_sql(&self, w: &mut SqlWriter, excluded: &[String]) {
        if self.negative {
            w.push_str("NOT ");
        }
        append_template(w, &self.format, &self.values, excluded);
    }

    fn alias(&self) -> &str {
        &self.alias
    }
}

impl Predicate for CustomPredicate {
    fn not(&self) -> Arc<dyn Predicate> {
        let mut negated = self.clone();
        negated.negative = !negated.negative;
        Arc::new(negated)
    }
}

/// Free-function form of [`Predicate::not`].
pub fn not(predicate: &dyn Predicate) -> Arc<dyn Predicate> {
    predicate.not()
}

/// `EXISTS (subquery)`
pub fn exists(query: impl Query + 'static) -> CustomPredicate {
    CustomPredicate::new("EXISTS ?", vec![Arg::query(query)])
}

/// `NOT EXISTS (subquery)`
pub fn not_exists(query: impl Query + 'static) -> CustomPredicate {
    CustomPredicate::new("NOT EXISTS ?", vec![Arg::query(query)])
}

/// A list of predicates joined by AND or OR.
///
/// Parenthesized when it has more than one member, unless it is the
/// top-level predicate of a WHERE or HAVING clause.
#[derive(Debug, Clone, Default)]
pub struct VariadicPredicate {
    pub(crate) predicates: Vec<Arc<dyn Predicate>>,
    pub(crate) is_or: bool,
    pub(crate) toplevel: bool,
    negative: bool,
    alias: String,
}

/// Conjunction of `predicates`.
pub fn and(predicates: Vec<Arc<dyn Predicate>>) -> VariadicPredicate {
    VariadicPredicate {
        predicates,
        ..VariadicPredicate::default()
    }
}

/// Disjunction of `predicates`.
pub fn or(predicates: Vec<Arc<dyn Predicate>>) -> VariadicPredicate {
    VariadicPredicate {
        predicates,
        is_or: true,
        ..VariadicPredicate::default()
    }
}

/// `and![a, b, c]` builds a [`VariadicPredicate`] joined by AND.
#[macro_export]
macro_rules! and {
    ($($p:expr),* $(,)?) => {
        $crate::predicate::and(vec![
            $(::std::sync::Arc::new($p) as ::std::sync::Arc<dyn $crate::predicate::Predicate>),*
        ])
    };
}

/// `or![a, b, c]` builds a [`VariadicPredicate`] joined by OR.
#[macro_export]
macro_rules! or {
    ($($p:expr),* $(,)?) => {
        $crate::predicate::or(vec![
            $(::std::sync::Arc::new($p) as ::std::sync::Arc<dyn $crate::predicate::Predicate>),*
        ])
    };
}

impl VariadicPredicate {
    pub(crate) fn toplevel_and() -> Self {
        Self {
            toplevel: true,
            ..Self::default()
        }
    }

    pub fn push(&mut self, predicate: impl Predicate + 'static) {
        self.predicates.push(Arc::new(predicate));
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn as_(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }
}

impl Field for VariadicPredicate {
    fn append_sql(&self, w: &mut SqlWriter, excluded: &[String]) {
        if self.predicates.is_empty() {
            return;
        }
        if self.negative {
            w.push_str("NOT ");
        }
        if self.predicates.len() == 1 {
            self.predicates[0].append_sql(w, excluded);
            return;
        }
        let parens = !self.toplevel || self.negative;
        if parens {
            w.push('(');
        }
        let sep = if self.is_or { " OR " } else { " AND " };
        for (i, p) in self.predicates.iter().enumerate() {
            if i > 0 {
                w.push_str(sep);
            }
            p.append_sql(w, excluded);
        }
        if parens {
            w.push(')');
        }
    }

    fn alias(&self) -> &str {
        &self.alias
    }
}

impl Predicate for VariadicPredicate {
    fn not(&self) -> Arc<dyn Predicate> {
        let mut negated = self.clone();
        negated.negative = !negated.negative;
        negated.toplevel = false;
        Arc::new(negated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::field::{BooleanField, NumberField, StringField};
    use crate::table::BaseTable;
    use crate::value::Value;

    fn render(p: &dyn Field) -> (String, Vec<Value>) {
        let mut w = SqlWriter::new(Dialect::MySql);
        p.append_sql(&mut w, &[]);
        w.into_parts()
    }

    #[test]
    fn nested_groups_are_parenthesized() {
        let t = BaseTable::new("", "t");
        let a = NumberField::new("a", &t);
        let b = NumberField::new("b", &t);
        let c = NumberField::new("c", &t);
        let p = and![a.eq_int(1), or![b.eq_int(2), c.eq_int(3)]];
        let (sql, args) = render(&p);
        assert_eq!(sql, "(t.a = ? AND (t.b = ? OR t.c = ?))");
        assert_eq!(args, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn toplevel_group_has_no_parens() {
        let t = BaseTable::new("", "t");
        let mut p = VariadicPredicate::toplevel_and();
        p.push(NumberField::new("a", &t).eq_int(1));
        p.push(NumberField::new("b", &t).eq_int(2));
        assert_eq!(render(&p).0, "t.a = ? AND t.b = ?");
    }

    #[test]
    fn single_member_is_not_wrapped() {
        let t = BaseTable::new("", "t");
        let p = or![StringField::new("name", &t).eq_string("x")];
        assert_eq!(render(&p).0, "t.name = ?");
        assert_eq!(render(&and![]).0, "");
    }

    #[test]
    fn double_negation_restores_rendering() {
        let t = BaseTable::new("", "t");
        let p = NumberField::new("a", &t).eq_int(1);
        assert_eq!(render(&p.not()).0, "NOT t.a = ?");
        assert_eq!(render(&p.not().not()).0, render(&p).0);
        assert_eq!(render(&not(&p)).0, "NOT t.a = ?");
    }

    #[test]
    fn negated_group_keeps_parens() {
        let t = BaseTable::new("", "t");
        let p = and![BooleanField::new("x", &t), BooleanField::new("y", &t)];
        assert_eq!(render(&p.not()).0, "NOT (t.x AND t.y)");
    }
}
