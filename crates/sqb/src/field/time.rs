use super::{Arg, Field, FieldCore};
use crate::dialect::SqlWriter;
use crate::predicate::CustomPredicate;
use chrono::{DateTime, Utc};

/// A timestamp column or literal.
#[derive(Debug, Clone, Default)]
pub struct TimeField {
    pub(crate) core: FieldCore,
}

impl TimeField {
    pub fn literal(value: DateTime<Utc>) -> Self {
        Self {
            core: FieldCore::literal(value),
        }
    }

    pub fn eq_time(&self, t: DateTime<Utc>) -> CustomPredicate {
        self.compare("=", Arg::Value(t.into()))
    }

    pub fn ne_time(&self, t: DateTime<Utc>) -> CustomPredicate {
        self.compare("<>", Arg::Value(t.into()))
    }

    /// `field < t`
    pub fn before(&self, t: DateTime<Utc>) -> CustomPredicate {
        self.compare("<", Arg::Value(t.into()))
    }

    /// `field > t`
    pub fn after(&self, t: DateTime<Utc>) -> CustomPredicate {
        self.compare(">", Arg::Value(t.into()))
    }

    /// `field BETWEEN start AND end`
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> CustomPredicate {
        CustomPredicate::new(
            "? BETWEEN ? AND ?",
            vec![
                Arg::field(self.clone()),
                Arg::Value(start.into()),
                Arg::Value(end.into()),
            ],
        )
    }
}

super::impl_typed_field!(TimeField);
super::impl_ordered_compare!(TimeField);

impl Field for TimeField {
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
    use chrono::TimeZone;

    #[test]
    fn between_binds_both_bounds() {
        let t = BaseTable::new("", "events");
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut w = SqlWriter::new(Dialect::Postgres);
        TimeField::new("at", &t).between(start, end).append_sql(&mut w, &[]);
        assert_eq!(w.sql(), "events.at BETWEEN $1 AND $2");
        assert_eq!(w.args(), &[Value::Time(start), Value::Time(end)]);
    }
}
