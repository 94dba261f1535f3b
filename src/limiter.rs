//! Result Limiter
//!
//! Appends `LIMIT n` to a validated query when it carries no row cap.
//! Textual check only: a whitespace-delimited `LIMIT` anywhere in the text,
//! including inside a subquery, counts as a cap and leaves the query
//! untouched. The cap is appended after the last byte of the query, so a
//! trailing `--` comment swallows it.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ROW_CAP_CLAUSE: Regex = Regex::new(r"(?i)\slimit\s").unwrap();
}

/// Apply `limit` to `sql`. `None` or `0` keeps the generator's own limiting.
pub fn apply_row_cap(sql: &str, limit: Option<u32>) -> String {
    let limit = match limit {
        Some(n) if n > 0 => n,
        _ => return sql.to_string(),
    };

    if ROW_CAP_CLAUSE.is_match(sql) {
        return sql.to_string();
    }

    let body = sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    format!("{} LIMIT {};", body, limit)
}
