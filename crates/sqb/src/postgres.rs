//! PostgreSQL entry points. Placeholders are `$1, $2, ...`.

crate::query::entry_points!(crate::dialect::Dialect::Postgres);

/// `SELECT DISTINCT ON (on) fields`
pub fn select_distinct_on(on: Fields, fields: Fields) -> SelectQuery {
    base().select(fields).distinct_on(on)
}
