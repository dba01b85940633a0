//! SQL helpers shared by the list queries.
//!
//! Every list query runs twice with the same predicate: once to count, once to
//! fetch the page the count resolves to. Predicates take nullable parameters
//! (`$1::text IS NULL OR ...`) so a single static statement serves every
//! combination of search and status filter.

use larder_core::listing::PageWindow;

use super::RepositoryError;

/// Turn a search term into an `ILIKE` pattern matching it as a literal
/// substring. Used with `ESCAPE '\'`.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Convert a `COUNT(*)` result into a row total.
pub(crate) fn row_total(count: i64) -> Result<u64, RepositoryError> {
    u64::try_from(count)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative row count {count}")))
}

/// `LIMIT` and `OFFSET` bind values for a window.
pub(crate) fn limit_offset(window: &PageWindow) -> Result<(i64, i64), RepositoryError> {
    let offset = i64::try_from(window.offset)
        .map_err(|_| RepositoryError::DataCorruption("page offset overflow".to_string()))?;
    Ok((i64::from(window.limit), offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_wraps_term() {
        assert_eq!(like_pattern("anna"), "%anna%");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }

    #[test]
    fn test_limit_offset() {
        let window = PageWindow::resolve(3, 5, 12);
        assert_eq!(limit_offset(&window).ok(), Some((5, 10)));
    }

    #[test]
    fn test_row_total_rejects_negative() {
        assert!(row_total(-1).is_err());
        assert_eq!(row_total(7).ok(), Some(7));
    }
}
