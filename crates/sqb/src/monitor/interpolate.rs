use crate::dialect::Dialect;
use crate::value::Value;

/// Inline `args` into `sql` for display.
///
/// Placeholders inside quoted strings or quoted identifiers are left
/// alone, as are placeholders without a matching argument. The result is
/// for logs only and must never be executed.
pub fn interpolate(sql: &str, args: &[Value], dialect: Dialect) -> String {
    let mut out = String::with_capacity(sql.len() + args.len() * 4);
    let mut chars = sql.char_indices().peekable();
    let mut quote: Option<char> = None;
    let mut next_arg = 0;

    while let Some((_, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '?' if dialect == Dialect::MySql => {
                match args.get(next_arg) {
                    Some(v) => out.push_str(&v.to_sql_literal()),
                    None => out.push('?'),
                }
                next_arg += 1;
            }
            '$' if dialect == Dialect::Postgres => {
                let mut digits = String::new();
                while let Some((_, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(*d);
                    chars.next();
                }
                let arg = digits
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| args.get(i));
                match arg {
                    Some(v) => out.push_str(&v.to_sql_literal()),
                    None => {
                        out.push('$');
                        out.push_str(&digits);
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_positional() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = ?";
        let out = interpolate(sql, &[Value::Int(1), Value::from("x'y")], Dialect::MySql);
        assert_eq!(out, "SELECT * FROM t WHERE a = 1 AND b = 'x''y'");
    }

    #[test]
    fn postgres_numbered_out_of_order() {
        let sql = "SELECT $2, $1, $10";
        let out = interpolate(sql, &[Value::Int(1), Value::Bool(true)], Dialect::Postgres);
        assert_eq!(out, "SELECT TRUE, 1, $10");
    }

    #[test]
    fn quoted_text_is_untouched() {
        let sql = "SELECT '?' , \"a?\" FROM t WHERE x = ?";
        let out = interpolate(sql, &[Value::Null], Dialect::MySql);
        assert_eq!(out, "SELECT '?' , \"a?\" FROM t WHERE x = NULL");
    }
}
