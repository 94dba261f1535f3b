//! Safety Validator
//!
//! Syntactic gate in front of the store: a candidate must open with SELECT
//! and hold a single statement. It does not parse SQL, and the prompt's style
//! rules (no CTEs, ORDER BY placement) are not enforced here.

use crate::error::{Result, ValidationError};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref READ_ONLY_KEYWORD: Regex = Regex::new(r"(?i)^select\b").unwrap();
}

const TERMINATOR: char = ';';

/// Approve `sql` unchanged or report the first violated rule.
pub fn validate_query(sql: &str) -> Result<&str> {
    let body = strip_terminators(sql);

    if !READ_ONLY_KEYWORD.is_match(strip_enclosing_parens(body)) {
        return Err(ValidationError::NonSelect {
            sql: sql.to_string(),
        }
        .into());
    }

    if body.contains(TERMINATOR) {
        return Err(ValidationError::MultipleStatements {
            sql: sql.to_string(),
        }
        .into());
    }

    Ok(sql)
}

fn strip_terminators(sql: &str) -> &str {
    sql.trim()
        .trim_end_matches(|c: char| c == TERMINATOR || c.is_whitespace())
}

/// Remove at most one layer of `( ... )`.
fn strip_enclosing_parens(body: &str) -> &str {
    match body.strip_prefix('(') {
        Some(inner) => inner.strip_suffix(')').unwrap_or(inner).trim(),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Text2SqlError;

    fn rule(sql: &str) -> Option<ValidationError> {
        match validate_query(sql) {
            Ok(_) => None,
            Err(Text2SqlError::Validation(v)) => Some(v),
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_select_accepted_unchanged() {
        let sql = "SELECT COUNT(*) FROM SALES_LOGISTICS;";
        assert_eq!(validate_query(sql).unwrap(), sql);
        assert!(rule("select Plant from SALES_LOGISTICS").is_none());
        assert!(rule("  SeLeCt 1 ;  ").is_none());
    }

    #[test]
    fn test_parenthesized_select_accepted() {
        assert!(rule("(SELECT 1) UNION (SELECT 2);").is_none());
        assert!(rule("( SELECT SalesOrder FROM SALES_LOGISTICS );").is_none());
    }

    #[test]
    fn test_only_one_paren_layer_stripped() {
        assert!(matches!(
            rule("((SELECT 1));"),
            Some(ValidationError::NonSelect { .. })
        ));
    }

    #[test]
    fn test_mutating_statements_rejected() {
        for sql in [
            "DELETE FROM SALES_LOGISTICS; -- oops;",
            "UPDATE SALES_LOGISTICS SET OrderQty = 0;",
            "INSERT INTO t VALUES (1);",
            "DROP TABLE WAREHOUSE_STOCK;",
            "WITH x AS (SELECT 1) SELECT * FROM x;",
            "PRAGMA table_info(SALES_LOGISTICS);",
        ] {
            assert!(
                matches!(rule(sql), Some(ValidationError::NonSelect { .. })),
                "accepted {:?}",
                sql
            );
        }
    }

    #[test]
    fn test_keyword_needs_word_boundary() {
        assert!(matches!(
            rule("SELECTED_ROWS;"),
            Some(ValidationError::NonSelect { .. })
        ));
        assert!(rule("SELECT*FROM SALES_LOGISTICS;").is_none());
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = rule("SELECT 1; SELECT 2;").unwrap();
        assert_eq!(
            err,
            ValidationError::MultipleStatements {
                sql: "SELECT 1; SELECT 2;".to_string()
            }
        );
        assert!(matches!(
            rule("SELECT 1; DELETE FROM SALES_LOGISTICS"),
            Some(ValidationError::MultipleStatements { .. })
        ));
    }

    #[test]
    fn test_terminator_inside_literal_is_rejected() {
        assert!(matches!(
            rule("SELECT * FROM SALES_LOGISTICS WHERE NameSoldtoParty = 'A;B';"),
            Some(ValidationError::MultipleStatements { .. })
        ));
    }

    #[test]
    fn test_non_select_checked_before_multiple_statements() {
        assert!(matches!(
            rule("DROP TABLE a; SELECT 1;"),
            Some(ValidationError::NonSelect { .. })
        ));
    }
}
