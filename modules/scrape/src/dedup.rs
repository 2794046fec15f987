use std::collections::HashSet;

/// Exact-string set of every match written during one run.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `text` is offered.
    pub fn insert_if_absent(&mut self, text: &str) -> bool {
        if self.seen.contains(text) {
            return false;
        }
        self.seen.insert(text.to_owned())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins() {
        let mut d = DedupIndex::new();
        assert!(d.insert_if_absent("http://a:21|u|p"));
        assert!(!d.insert_if_absent("http://a:21|u|p"));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn identity_is_exact_text() {
        let mut d = DedupIndex::new();
        assert!(d.insert_if_absent("http://a:21|u|p"));
        assert!(d.insert_if_absent("http://A:21|u|p"));
        assert!(d.insert_if_absent("http://a:21|u|p "));
        assert_eq!(d.len(), 3);
    }
}
