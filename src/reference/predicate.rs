use std::cmp::Ordering;
use std::ops::Range;
use crate::core::error::Result;
use crate::reference::sort_key::RefKey;

/// Typed filter over the four sort-key columns.
///
/// `Prefix` and `Range` compare only as many levels as the reference(s) they
/// were built from carry, so `1.2*` matches `1.2.7` and the range `1.1-1.5`
/// includes `1.5.3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefPredicate {
    All,
    Exact(RefKey),
    Prefix { key: RefKey, depth: usize },
    Range { start: RefKey, start_depth: usize, end: RefKey, end_depth: usize },
}

impl RefPredicate {
    pub fn exact(reference: &str) -> Result<Self> {
        Ok(RefPredicate::Exact(RefKey::parse(reference)?))
    }

    pub fn prefix(reference: &str) -> Result<Self> {
        let key = RefKey::parse(reference)?;
        let depth = key.depth();
        Ok(RefPredicate::Prefix { key, depth })
    }

    pub fn range(start: &str, end: &str) -> Result<Self> {
        let start = RefKey::parse(start)?;
        let end = RefKey::parse(end)?;
        Ok(RefPredicate::Range {
            start_depth: start.depth(),
            end_depth: end.depth(),
            start,
            end,
        })
    }

    pub fn is_all(&self) -> bool {
        matches!(self, RefPredicate::All)
    }

    pub fn matches(&self, key: &RefKey) -> bool {
        !self.before(key) && !self.after(key)
    }

    /// Row sorts before every match
    fn before(&self, key: &RefKey) -> bool {
        match self {
            RefPredicate::All => false,
            RefPredicate::Exact(target) => key < target,
            RefPredicate::Prefix { key: target, depth } => {
                key.cmp_prefix(target, *depth) == Ordering::Less
            }
            RefPredicate::Range { start, start_depth, .. } => {
                key.cmp_prefix(start, *start_depth) == Ordering::Less
            }
        }
    }

    /// Row sorts after every match
    fn after(&self, key: &RefKey) -> bool {
        match self {
            RefPredicate::All => false,
            RefPredicate::Exact(target) => key > target,
            RefPredicate::Prefix { key: target, depth } => {
                key.cmp_prefix(target, *depth) == Ordering::Greater
            }
            RefPredicate::Range { end, end_depth, .. } => {
                key.cmp_prefix(end, *end_depth) == Ordering::Greater
            }
        }
    }

    /// Index range of matches in `rows`, which must be sorted by key ascending.
    /// An inverted range yields an empty slice.
    pub fn scan<'k, T, F>(&self, rows: &[T], key_of: F) -> Range<usize>
    where
        F: Fn(&T) -> &'k RefKey,
    {
        let lo = rows.partition_point(|row| self.before(key_of(row)));
        let hi = rows.partition_point(|row| !self.after(key_of(row)));
        lo..hi.max(lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(refs: &[&str]) -> Vec<RefKey> {
        let mut keys: Vec<RefKey> = refs.iter().map(|r| RefKey::parse(r).unwrap()).collect();
        keys.sort();
        keys
    }

    /// Scan row numbers, the way the passage index does
    fn scan(pred: &RefPredicate, rows: &[RefKey]) -> Range<usize> {
        let ids: Vec<usize> = (0..rows.len()).collect();
        pred.scan(&ids, |i| &rows[*i])
    }

    fn scanned(pred: &RefPredicate, rows: &[RefKey]) -> usize {
        scan(pred, rows).len()
    }

    #[test]
    fn exact_requires_all_levels() {
        let pred = RefPredicate::exact("1.2").unwrap();
        assert!(pred.matches(&RefKey::parse("1.2").unwrap()));
        assert!(!pred.matches(&RefKey::parse("1.2.1").unwrap()));
    }

    #[test]
    fn prefix_matches_descendants() {
        let rows = keys(&["1.1.1", "1.2.1", "1.2.2", "1.2.10", "1.3.1", "2.2.1"]);
        let pred = RefPredicate::prefix("1.2").unwrap();
        assert_eq!(scanned(&pred, &rows), 3);
        assert!(!pred.matches(&RefKey::parse("2.2.1").unwrap()));
    }

    #[test]
    fn range_is_inclusive_at_endpoint_depth() {
        let rows = keys(&["1.1", "1.2", "1.5", "1.5.3", "1.6", "1.10"]);
        let pred = RefPredicate::range("1.2", "1.5").unwrap();
        let hits = scan(&pred, &rows);
        let refs: Vec<&RefKey> = rows[hits].iter().collect();
        assert_eq!(refs.len(), 3);
        assert!(pred.matches(&RefKey::parse("1.5.3").unwrap()));
        assert!(!pred.matches(&RefKey::parse("1.10").unwrap()));
    }

    #[test]
    fn range_uses_natural_order() {
        let rows = keys(&["2.8", "2.9", "2.10", "2.11", "3.1"]);
        let pred = RefPredicate::range("2.9", "2.10").unwrap();
        assert_eq!(scanned(&pred, &rows), 2);
    }

    #[test]
    fn inverted_range_is_empty() {
        let rows = keys(&["1", "2", "3"]);
        let pred = RefPredicate::range("3", "1").unwrap();
        assert_eq!(scanned(&pred, &rows), 0);
    }

    #[test]
    fn all_scans_everything() {
        let rows = keys(&["1", "2", "3"]);
        assert_eq!(scanned(&RefPredicate::All, &rows), 3);
    }
}
