use super::{Arg, CustomField, Field};
use crate::dialect::SqlWriter;
use std::sync::Arc;

/// `field = value` used by UPDATE SET, ON CONFLICT DO UPDATE SET and
/// ON DUPLICATE KEY UPDATE.
#[derive(Debug, Clone)]
pub struct FieldAssignment {
    pub(crate) field: Arc<dyn Field>,
    pub(crate) value: Arg,
}

impl FieldAssignment {
    pub fn new(field: impl Field + 'static, value: Arg) -> Self {
        Self {
            field: Arc::new(field),
            value,
        }
    }

    /// The assignment target is rendered without any qualifier in
    /// `excluded`; the value side keeps its qualifiers.
    pub fn append_sql(&self, w: &mut SqlWriter, excluded: &[String]) {
        self.field.append_sql(w, excluded);
        w.push_str(" = ");
        self.value.append_sql(w, &[]);
    }
}

/// Comma-separated list of assignments.
#[derive(Debug, Clone, Default)]
pub struct FieldAssignments(pub Vec<FieldAssignment>);

impl FieldAssignments {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn append_sql(&self, w: &mut SqlWriter, excluded: &[String]) {
        for (i, assignment) in self.0.iter().enumerate() {
            if i > 0 {
                w.push_str(", ");
            }
            assignment.append_sql(w, excluded);
        }
    }
}

impl From<Vec<FieldAssignment>> for FieldAssignments {
    fn from(v: Vec<FieldAssignment>) -> Self {
        Self(v)
    }
}

/// PostgreSQL `EXCLUDED.column`, the row proposed for insertion inside
/// `ON CONFLICT DO UPDATE`.
pub fn excluded(field: &dyn Field) -> CustomField {
    CustomField::column("EXCLUDED", field.name())
}

/// MySQL `VALUES(column)` inside `ON DUPLICATE KEY UPDATE`.
pub fn values(field: &dyn Field) -> CustomField {
    let mut w = SqlWriter::new(crate::dialect::Dialect::MySql);
    w.push_str("VALUES(");
    w.push_ident(field.name());
    w.push(')');
    CustomField::new(w.sql().replace('?', "??"), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::field::{NumberField, StringField};
    use crate::table::BaseTable;
    use crate::value::Value;

    #[test]
    fn assignment_excludes_target_qualifier_only() {
        let t = BaseTable::new("", "users");
        let other = BaseTable::new("", "staging");
        let a = StringField::new("name", &t).set_to(StringField::new("name", &other));
        let mut w = SqlWriter::new(Dialect::Postgres);
        a.append_sql(&mut w, &["users".to_string()]);
        assert_eq!(w.sql(), "name = staging.name");
    }

    #[test]
    fn list_binds_values_in_order() {
        let t = BaseTable::new("", "users");
        let list = FieldAssignments(vec![
            StringField::new("name", &t).set("bob"),
            NumberField::new("age", &t).set(30),
        ]);
        let mut w = SqlWriter::new(Dialect::Postgres);
        list.append_sql(&mut w, &["users".to_string()]);
        assert_eq!(w.sql(), "name = $1, age = $2");
        assert_eq!(w.args(), &[Value::Text("bob".into()), Value::Int(30)]);
    }

    #[test]
    fn upsert_helpers() {
        let t = BaseTable::new("", "users");
        let name = StringField::new("name", &t);

        let mut w = SqlWriter::new(Dialect::Postgres);
        excluded(&name).append_sql(&mut w, &[]);
        assert_eq!(w.sql(), "EXCLUDED.name");

        let mut w = SqlWriter::new(Dialect::MySql);
        values(&name).append_sql(&mut w, &[]);
        assert_eq!(w.sql(), "VALUES(name)");
    }
}
