//! Target table detection for DML statements.
//!
//! A whitespace-token heuristic, not a SQL parser: schema-qualified or
//! otherwise unusual names are returned as they are written.

const PUNCTUATION: &[char] = &['(', ')', ',', ';'];

/// Table written by an `INSERT INTO`, `UPDATE`, `DELETE FROM` or
/// `MERGE INTO` statement.
pub fn extract_table_name(sql: &str) -> Option<String> {
    let tokens: Vec<&str> = sql.split_whitespace().take(3).collect();
    let first = tokens.first()?.to_ascii_uppercase();
    let second_is = |kw: &str| tokens.get(1).is_some_and(|t| t.eq_ignore_ascii_case(kw));

    let position = match first.as_str() {
        "INSERT" | "MERGE" if second_is("INTO") => 2,
        "DELETE" if second_is("FROM") => 2,
        "UPDATE" => 1,
        _ => return None,
    };

    // `T(A, B)` names the table before the column list.
    let token = tokens.get(position)?;
    let name = token
        .split('(')
        .next()
        .unwrap_or_default()
        .trim_matches(PUNCTUATION);

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(sql: &str) -> Option<String> {
        extract_table_name(sql)
    }

    #[test]
    fn test_dml_forms() {
        assert_eq!(extract("INSERT INTO CUSTOMERS (ID) VALUES (1)").as_deref(), Some("CUSTOMERS"));
        assert_eq!(extract("insert into customers values (1)").as_deref(), Some("customers"));
        assert_eq!(extract("UPDATE ORDERS SET A = 1").as_deref(), Some("ORDERS"));
        assert_eq!(extract("DELETE FROM ITEMS WHERE ID = 3").as_deref(), Some("ITEMS"));
        assert_eq!(
            extract("MERGE INTO STOCK S USING NEW_STOCK N ON S.ID = N.ID").as_deref(),
            Some("STOCK")
        );
    }

    #[test]
    fn test_alias_and_punctuation() {
        assert_eq!(extract("UPDATE ORDERS O SET O.A = 1").as_deref(), Some("ORDERS"));
        assert_eq!(extract("INSERT INTO T(A, B) VALUES (1, 2)").as_deref(), Some("T"));
        assert_eq!(extract("DELETE FROM T;").as_deref(), Some("T"));
        assert_eq!(extract("INSERT INTO\n  T\n(A) VALUES (1)").as_deref(), Some("T"));
    }

    #[test]
    fn test_non_dml_is_none() {
        assert_eq!(extract("SELECT * FROM T"), None);
        assert_eq!(extract("CREATE TABLE T (A INT)"), None);
        assert_eq!(extract("INSERT T VALUES (1)"), None);
        assert_eq!(extract("DELETE T"), None);
        assert_eq!(extract("UPDATE"), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn test_quoted_name_kept_verbatim() {
        assert_eq!(extract("INSERT INTO \"Orders\" VALUES (1)").as_deref(), Some("\"Orders\""));
    }
}
