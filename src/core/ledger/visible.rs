use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Order ids on screen, index 0 = top row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisibleRows(Vec<String>);

impl VisibleRows {
    pub fn new(ids: Vec<String>) -> Self {
        Self(ids)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|v| v == id)
    }

    /// Keep rows above `start` and append freshly read ids below them.
    pub fn replace_from(&self, start: usize, ids: Vec<String>) -> VisibleRows {
        let mut rows = self.0[..start.min(self.0.len())].to_vec();
        rows.extend(ids);
        VisibleRows(rows)
    }

    /// `(old row, id)` for ids that are not in `next`.
    pub fn departed(&self, next: &VisibleRows) -> Vec<(usize, String)> {
        Self::missing_from(self, next)
    }

    /// `(new row, id)` for ids of `next` that were not visible before.
    pub fn arrived(&self, next: &VisibleRows) -> Vec<(usize, String)> {
        Self::missing_from(next, self)
    }

    fn missing_from(from: &VisibleRows, other: &VisibleRows) -> Vec<(usize, String)> {
        let present: HashSet<&str> = other.0.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for (row, id) in from.0.iter().enumerate() {
            if !present.contains(id.as_str()) && seen.insert(id.as_str()) {
                missing.push((row, id.clone()));
            }
        }
        missing
    }
}

/// True when no id occurs twice.
pub fn all_distinct(ids: &[String]) -> bool {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().all(|id| seen.insert(id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(ids: &[&str]) -> VisibleRows {
        VisibleRows::new(ids.iter().map(|s| s.to_string()).collect())
    }

    fn owned(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_replace_from_keeps_prefix() {
        let visible = rows(&["1", "2", "3"]);
        assert_eq!(visible.replace_from(1, owned(&["4"])), rows(&["1", "4"]));
        assert_eq!(visible.replace_from(9, owned(&["4"])), rows(&["1", "2", "3", "4"]));
        assert_eq!(visible.replace_from(0, owned(&[])), rows(&[]));
    }

    #[test]
    fn test_departed_and_arrived() {
        let before = rows(&["1", "2", "3"]);
        let after = rows(&["2", "3", "4", "5"]);

        assert_eq!(before.departed(&after), vec![(0, "1".to_string())]);
        assert_eq!(
            before.arrived(&after),
            vec![(2, "4".to_string()), (3, "5".to_string())]
        );
        assert!(before.departed(&before).is_empty());
        assert_eq!(after.row_of("4"), Some(2));
    }

    #[test]
    fn test_distinct_ids() {
        assert!(all_distinct(&owned(&["7", "8"])));
        assert!(!all_distinct(&owned(&["7", "7"])));
        assert!(all_distinct(&[]));
    }

    #[test]
    fn test_serializes_as_list() {
        let json = serde_json::to_string(&rows(&["7", "8"])).unwrap();
        assert_eq!(json, r#"["7","8"]"#);
    }
}
