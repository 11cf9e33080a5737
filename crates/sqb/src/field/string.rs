use super::{Arg, Field, FieldCore};
use crate::dialect::SqlWriter;
use crate::predicate::CustomPredicate;
use crate::value::Value;

/// A text column or literal.
#[derive(Debug, Clone, Default)]
pub struct StringField {
    pub(crate) core: FieldCore,
}

impl StringField {
    /// String literal bound as a placeholder.
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            core: FieldCore::literal(Value::Text(value.into())),
        }
    }

    pub fn eq_string(&self, s: impl Into<String>) -> CustomPredicate {
        self.compare("=", Arg::Value(Value::Text(s.into())))
    }

    pub fn ne_string(&self, s: impl Into<String>) -> CustomPredicate {
        self.compare("<>", Arg::Value(Value::Text(s.into())))
    }

    pub fn lt_string(&self, s: impl Into<String>) -> CustomPredicate {
        self.compare("<", Arg::Value(Value::Text(s.into())))
    }

    pub fn le_string(&self, s: impl Into<String>) -> CustomPredicate {
        self.compare("<=", Arg::Value(Value::Text(s.into())))
    }

    pub fn gt_string(&self, s: impl Into<String>) -> CustomPredicate {
        self.compare(">", Arg::Value(Value::Text(s.into())))
    }

    pub fn ge_string(&self, s: impl Into<String>) -> CustomPredicate {
        self.compare(">=", Arg::Value(Value::Text(s.into())))
    }

    /// `field LIKE pattern`
    pub fn like(&self, pattern: impl Into<String>) -> CustomPredicate {
        self.compare("LIKE", Arg::Value(Value::Text(pattern.into())))
    }

    /// `field NOT LIKE pattern`
    pub fn not_like(&self, pattern: impl Into<String>) -> CustomPredicate {
        self.compare("NOT LIKE", Arg::Value(Value::Text(pattern.into())))
    }

    /// `field ILIKE pattern` (PostgreSQL)
    pub fn ilike(&self, pattern: impl Into<String>) -> CustomPredicate {
        self.compare("ILIKE", Arg::Value(Value::Text(pattern.into())))
    }

    /// `field NOT ILIKE pattern` (PostgreSQL)
    pub fn not_ilike(&self, pattern: impl Into<String>) -> CustomPredicate {
        self.compare("NOT ILIKE", Arg::Value(Value::Text(pattern.into())))
    }
}

super::impl_typed_field!(StringField);
super::impl_ordered_compare!(StringField);

impl Field for StringField {
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
