use super::{Arg, Field, FieldCore};
use crate::dialect::SqlWriter;
use crate::predicate::CustomPredicate;

/// An integer or floating point column or literal.
#[derive(Debug, Clone, Default)]
pub struct NumberField {
    pub(crate) core: FieldCore,
}

impl NumberField {
    /// Integer literal bound as a placeholder.
    pub fn int(value: i64) -> Self {
        Self {
            core: FieldCore::literal(value),
        }
    }

    /// Float literal bound as a placeholder.
    pub fn float(value: f64) -> Self {
        Self {
            core: FieldCore::literal(value),
        }
    }

    pub fn eq_int(&self, n: i64) -> CustomPredicate {
        self.compare("=", Arg::Value(n.into()))
    }

    pub fn ne_int(&self, n: i64) -> CustomPredicate {
        self.compare("<>", Arg::Value(n.into()))
    }

    pub fn lt_int(&self, n: i64) -> CustomPredicate {
        self.compare("<", Arg::Value(n.into()))
    }

    pub fn le_int(&self, n: i64) -> CustomPredicate {
        self.compare("<=", Arg::Value(n.into()))
    }

    pub fn gt_int(&self, n: i64) -> CustomPredicate {
        self.compare(">", Arg::Value(n.into()))
    }

    pub fn ge_int(&self, n: i64) -> CustomPredicate {
        self.compare(">=", Arg::Value(n.into()))
    }

    pub fn eq_float(&self, n: f64) -> CustomPredicate {
        self.compare("=", Arg::Value(n.into()))
    }

    pub fn ne_float(&self, n: f64) -> CustomPredicate {
        self.compare("<>", Arg::Value(n.into()))
    }

    pub fn lt_float(&self, n: f64) -> CustomPredicate {
        self.compare("<", Arg::Value(n.into()))
    }

    pub fn le_float(&self, n: f64) -> CustomPredicate {
        self.compare("<=", Arg::Value(n.into()))
    }

    pub fn gt_float(&self, n: f64) -> CustomPredicate {
        self.compare(">", Arg::Value(n.into()))
    }

    pub fn ge_float(&self, n: f64) -> CustomPredicate {
        self.compare(">=", Arg::Value(n.into()))
    }

    /// `field BETWEEN low AND high`
    pub fn between(&self, low: i64, high: i64) -> CustomPredicate {
        CustomPredicate::new(
            "? BETWEEN ? AND ?",
            vec![
                Arg::field(self.clone()),
                Arg::Value(low.into()),
                Arg::Value(high.into()),
            ],
        )
    }
}

super::impl_typed_field!(NumberField);
super::impl_ordered_compare!(NumberField);

impl Field for NumberField {
    fn append_sql(&self, w: &mut SqlWriter, excluded: &[String]) {
        self.core.append_base(w, excluded);
        self.core.append_ordering(w);
    }

    fn alias(&self) -> &str {
        &self.core.alias
    }

    fn name(&self) -> &str {
        &self.core.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::table::BaseTable;
    use crate::value::Value;

    fn render(f: &dyn Field) -> (String, Vec<Value>) {
        let mut w = SqlWriter::new(Dialect::Postgres);
        f.append_sql(&mut w, &[]);
        w.into_parts()
    }

    #[test]
    fn literal_comparisons_bind() {
        let t = BaseTable::new("", "orders");
        let total = NumberField::new("total", &t);
        let (sql, args) = render(&total.ge_float(9.5));
        assert_eq!(sql, "orders.total >= $1");
        assert_eq!(args, vec![Value::Float(9.5)]);

        let (sql, args) = render(&total.between(1, 10));
        assert_eq!(sql, "orders.total BETWEEN $1 AND $2");
        assert_eq!(args, vec![Value::Int(1), Value::Int(10)]);
    }

    #[test]
    fn field_to_field_comparison() {
        let a = BaseTable::new("", "a");
        let b = BaseTable::new("", "b");
        let (sql, args) = render(&NumberField::new("id", &a).lt(&NumberField::new("id", &b)));
        assert_eq!(sql, "a.id < b.id");
        assert!(args.is_empty());
    }

    #[test]
    fn in_values_expands_list() {
        let t = BaseTable::new("", "t");
        let (sql, args) = render(&NumberField::new("id", &t).in_values([1, 2, 3]));
        assert_eq!(sql, "t.id IN ($1, $2, $3)");
        assert_eq!(args.len(), 3);

        let (sql, args) = render(&NumberField::new("id", &t).not_in_values(Vec::<i64>::new()));
        assert_eq!(sql, "t.id NOT IN (NULL)");
        assert!(args.is_empty());
    }
}
