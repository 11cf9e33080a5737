//! MySQL entry points. Placeholders are `?`.

crate::query::entry_points!(crate::dialect::Dialect::MySql);

/// `INSERT IGNORE INTO table`
pub fn insert_ignore_into(table: BaseTable) -> InsertQuery {
    base().insert_ignore_into(table)
}
