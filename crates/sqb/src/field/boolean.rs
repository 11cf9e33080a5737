use super::{Arg, Field, FieldCore};
use crate::dialect::SqlWriter;
use crate::predicate::{CustomPredicate, Predicate};
use std::sync::Arc;

/// A boolean column or literal. Usable directly as a predicate.
#[derive(Debug, Clone, Default)]
pub struct BooleanField {
    pub(crate) core: FieldCore,
    pub(crate) negative: bool,
}

impl BooleanField {
    /// Boolean literal bound as a placeholder.
    pub fn literal(value: bool) -> Self {
        Self {
            core: FieldCore::literal(value),
            negative: false,
        }
    }

    /// `field = value`
    pub fn eq_bool(&self, value: bool) -> CustomPredicate {
        self.compare("=", Arg::Value(value.into()))
    }

    /// `field <> value`
    pub fn ne_bool(&self, value: bool) -> CustomPredicate {
        self.compare("<>", Arg::Value(value.into()))
    }
}

super::impl_typed_field!(BooleanField);

impl Field for BooleanField {
    fn append_sql(&self, w: &mut SqlWriter, excluded: &[String]) {
        if self.negative {
            w.push_str("NOT ");
        }
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

impl Predicate for BooleanField {
    fn not(&self) -> Arc<dyn Predicate> {
        let mut negated = self.clone();
        negated.negative = !negated.negative;
        Arc::new(negated)
    }
}
