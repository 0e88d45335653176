//! Default string-function library registered on every fixture.

use rusqlite::types::Value;

use super::{FunctionError, FunctionSet};

pub const OWNER: &str = "dal_fixture::functions::string";

/// Largest result, in bytes, the functions build. Matches SQLite's default
/// `SQLITE_MAX_LENGTH`.
pub const MAX_RESULT_LEN: usize = 1_000_000_000;

/// `REVERSE(s)`, `LPAD(s, len, pad)`, `RPAD(s, len, pad)` and `REPEAT(s, n)`.
/// A NULL argument yields NULL.
pub fn string_functions() -> FunctionSet {
    FunctionSet::new(OWNER)
        .scalar("reverse", 1, |args: &[Value]| {
            Ok(text(args, 0).map_or(Value::Null, |s| Value::Text(s.chars().rev().collect())))
        })
        .scalar("lpad", 3, |args: &[Value]| pad(args, Side::Left))
        .scalar("rpad", 3, |args: &[Value]| pad(args, Side::Right))
        .scalar("repeat", 2, |args: &[Value]| {
            match (text(args, 0), integer(args, 1)?) {
                (Some(s), Some(n)) => {
                    let n = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
                    check_len(s.len().saturating_mul(n))?;
                    Ok(Value::Text(s.repeat(n)))
                }
                _ => Ok(Value::Null),
            }
        })
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Pad to `len` characters, truncating longer input.
fn pad(args: &[Value], side: Side) -> Result<Value, FunctionError> {
    let (Some(s), Some(len), Some(fill)) = (text(args, 0), integer(args, 1)?, text(args, 2)) else {
        return Ok(Value::Null);
    };

    let len = usize::try_from(len.max(0)).unwrap_or(usize::MAX);
    let current = s.chars().count();
    if current >= len {
        return Ok(Value::Text(s.chars().take(len).collect()));
    }
    if fill.is_empty() {
        return Ok(Value::Null);
    }

    let widest = fill.chars().map(char::len_utf8).max().unwrap_or(1);
    check_len(s.len().saturating_add((len - current).saturating_mul(widest)))?;

    let padding: String = fill.chars().cycle().take(len - current).collect();
    Ok(Value::Text(match side {
        Side::Left => padding + &s,
        Side::Right => s + &padding,
    }))
}

fn check_len(bytes: usize) -> Result<(), FunctionError> {
    if bytes > MAX_RESULT_LEN {
        return Err(format!("result of {bytes} bytes exceeds the {MAX_RESULT_LEN} byte limit").into());
    }
    Ok(())
}

fn text(args: &[Value], idx: usize) -> Option<String> {
    match args.get(idx)? {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s.clone()),
        Value::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
    }
}

fn integer(args: &[Value], idx: usize) -> Result<Option<i64>, FunctionError> {
    match args.get(idx) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Integer(i)) => Ok(Some(*i)),
        Some(Value::Real(f)) => Ok(Some(f.trunc() as i64)),
        Some(Value::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("argument {} is not an integer: '{s}'", idx + 1).into()),
        Some(Value::Blob(_)) => Err(format!("argument {} is not an integer: blob", idx + 1).into()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use db_infra::{DataSourceManager, TestDataSourceManager};

    use super::*;
    use crate::functions::FunctionDefiner;
    use crate::raw::{RawDao, SqliteRawDao};

    fn eval(sql: &str) -> Value {
        let manager: Arc<dyn DataSourceManager> = Arc::new(TestDataSourceManager::default());
        FunctionDefiner::new(manager.clone())
            .define("main", &string_functions())
            .unwrap();
        let rows = SqliteRawDao::new(manager).execute_query("main", sql).unwrap();
        let value = rows[0].values().next().cloned().unwrap();
        value
    }

    fn text_of(sql: &str) -> String {
        match eval(sql) {
            Value::Text(s) => s,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_reverse() {
        assert_eq!(text_of("SELECT REVERSE('ab')"), "ba");
        assert_eq!(text_of("SELECT reverse('héllo')"), "olléh");
        assert_eq!(text_of("SELECT reverse(123)"), "321");
        assert_eq!(eval("SELECT reverse(NULL)"), Value::Null);
    }

    #[test]
    fn test_lpad_and_rpad() {
        assert_eq!(text_of("SELECT LPAD('7', 3, '0')"), "007");
        assert_eq!(text_of("SELECT RPAD('ab', 5, 'xy')"), "abxyx");
        assert_eq!(text_of("SELECT LPAD('abcdef', 3, '*')"), "abc");
        assert_eq!(eval("SELECT LPAD('a', 3, '')"), Value::Null);
        assert_eq!(eval("SELECT RPAD(NULL, 3, '-')"), Value::Null);
    }

    #[test]
    fn test_repeat() {
        assert_eq!(text_of("SELECT REPEAT('ab', 3)"), "ababab");
        assert_eq!(text_of("SELECT REPEAT('ab', -1)"), "");
        assert_eq!(text_of("SELECT REPEAT('ab', '2')"), "abab");
    }

    #[test]
    fn test_oversized_results_are_rejected_before_allocating() {
        let manager: Arc<dyn DataSourceManager> = Arc::new(TestDataSourceManager::default());
        FunctionDefiner::new(manager.clone())
            .define("main", &string_functions())
            .unwrap();
        let dao = SqliteRawDao::new(manager);

        for sql in [
            "SELECT REPEAT('a', 3000000000)",
            "SELECT LPAD('a', 3000000000, '*')",
            "SELECT RPAD('a', 9223372036854775807, 'xy')",
        ] {
            let err = dao.execute_query("main", sql).unwrap_err();
            assert!(err.to_string().contains("byte limit"), "{sql}: {err}");
        }
        assert_eq!(text_of("SELECT REPEAT('ab', 2)"), "abab");
    }

    #[test]
    fn test_bad_integer_argument_is_an_error() {
        let manager: Arc<dyn DataSourceManager> = Arc::new(TestDataSourceManager::default());
        FunctionDefiner::new(manager.clone())
            .define("main", &string_functions())
            .unwrap();
        let err = SqliteRawDao::new(manager)
            .execute_query("main", "SELECT REPEAT('ab', 'many')")
            .unwrap_err();
        assert!(err.to_string().contains("not an integer"));
    }
}
