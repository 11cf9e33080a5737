//! SQL dialects and the render sink shared by every AST node.

use crate::value::Value;

/// Target SQL dialect.
///
/// The dialect only decides the placeholder syntax: `?` for MySQL and
/// `$1, $2, ...` for PostgreSQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    MySql,
    Postgres,
}

/// Output buffer plus the positional arguments collected while rendering.
///
/// Placeholder numbering comes from the argument count, so nested fragments
/// (subqueries, CTE bodies) get correct `$n` offsets in a single pass without
/// rewriting already-emitted SQL.
#[derive(Debug, Clone)]
pub struct SqlWriter {
    buf: String,
    args: Vec<Value>,
    dialect: Dialect,
}

impl SqlWriter {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            buf: String::new(),
            args: Vec::new(),
            dialect,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    pub fn push(&mut self, c: char) {
        self.buf.push(c);
    }

    /// Write an identifier, double-quoting it when it contains whitespace.
    pub fn push_ident(&mut self, ident: &str) {
        if ident.contains([' ', '\t']) {
            self.buf.push('"');
            self.buf.push_str(ident);
            self.buf.push('"');
        } else {
            self.buf.push_str(ident);
        }
    }

    /// Bind one argument, writing exactly one placeholder token.
    pub fn push_arg(&mut self, value: impl Into<Value>) {
        self.args.push(value.into());
        match self.dialect {
            Dialect::MySql => self.buf.push('?'),
            Dialect::Postgres => {
                self.buf.push('$');
                self.buf.push_str(&self.args.len().to_string());
            }
        }
    }

    pub fn sql(&self) -> &str {
        &self.buf
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.buf, self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_uses_question_marks() {
        let mut w = SqlWriter::new(Dialect::MySql);
        w.push_str("a = ");
        w.push_arg(1i64);
        w.push_str(" AND b = ");
        w.push_arg("x");
        assert_eq!(w.sql(), "a = ? AND b = ?");
        assert_eq!(w.args(), &[Value::Int(1), Value::Text("x".into())]);
    }

    #[test]
    fn postgres_numbers_by_argument_count() {
        let mut w = SqlWriter::new(Dialect::Postgres);
        w.push_arg(1i64);
        w.push(',');
        w.push_arg(2i64);
        assert_eq!(w.sql(), "$1,$2");
    }

    #[test]
    fn identifiers_with_whitespace_are_quoted() {
        let mut w = SqlWriter::new(Dialect::Postgres);
        w.push_ident("order items");
        w.push('.');
        w.push_ident("id");
        assert_eq!(w.sql(), "\"order items\".id");
    }
}
