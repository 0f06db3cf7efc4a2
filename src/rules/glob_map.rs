use hashlink::LinkedHashMap;
use hashlink::linked_hash_map::Entry;
use regex::Regex;

/// A map keyed by single path-segment patterns.
///
/// Literal keys live in an exact-match table that is always consulted first.
/// Keys containing `*` (any run of characters, possibly empty) or `?` (exactly
/// one character) are compiled once, when inserted, into an anchored matcher
/// and kept in insertion order. Lookups that miss the exact table return the
/// first pattern that accepts the key.
#[derive(Debug, Clone)]
pub struct GlobMap<V> {
    exact: LinkedHashMap<String, V>,
    patterns: LinkedHashMap<String, PatternEntry<V>>,
}

#[derive(Debug, Clone)]
struct PatternEntry<V> {
    matcher: Regex,
    value: V,
}

pub fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    let body = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("(?s)^{body}$"))
}

impl<V> Default for GlobMap<V> {
    fn default() -> Self {
        Self {
            exact: LinkedHashMap::new(),
            patterns: LinkedHashMap::new(),
        }
    }
}

impl<V> GlobMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `pattern`, replacing a previous value stored under
    /// the same pattern text.
    #[cfg(test)]
    pub fn insert(&mut self, pattern: &str, value: V) -> Result<Option<V>, regex::Error> {
        if !is_wildcard(pattern) {
            return Ok(self.exact.insert(pattern.to_owned(), value));
        }
        let matcher = compile(pattern)?;
        Ok(self
            .patterns
            .insert(pattern.to_owned(), PatternEntry { matcher, value })
            .map(|previous| previous.value))
    }

    /// Returns the value stored under exactly this pattern text, creating it
    /// with `make` first if needed. Never falls back to pattern matching.
    pub fn get_or_insert_with(
        &mut self,
        pattern: &str,
        make: impl FnOnce() -> V,
    ) -> Result<&mut V, regex::Error> {
        if !is_wildcard(pattern) {
            return Ok(self.exact.entry(pattern.to_owned()).or_insert_with(make));
        }
        match self.patterns.entry(pattern.to_owned()) {
            Entry::Occupied(entry) => Ok(&mut entry.into_mut().value),
            Entry::Vacant(entry) => {
                let matcher = compile(pattern)?;
                Ok(&mut entry
                    .insert(PatternEntry {
                        matcher,
                        value: make(),
                    })
                    .value)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        if let Some(value) = self.exact.get(key) {
            return Some(value);
        }
        self.patterns
            .values()
            .find(|entry| entry.matcher.is_match(key))
            .map(|entry| &entry.value)
    }

    #[cfg(test)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.exact.contains_key(key)
            || self.patterns.values().any(|entry| entry.matcher.is_match(key))
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    /// Exact entries first, then patterns, each in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.exact
            .iter()
            .map(|(key, value)| (key.as_str(), value))
            .chain(
                self.patterns
                    .iter()
                    .map(|(key, entry)| (key.as_str(), &entry.value)),
            )
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Keeps only the entries for which `keep` returns true, in both tables.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &mut V) -> bool) {
        self.exact.retain(|key, value| keep(key, value));
        self.patterns.retain(|key, entry| keep(key, &mut entry.value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn map(entries: &[(&str, u32)]) -> GlobMap<u32> {
        let mut map = GlobMap::new();
        for (pattern, value) in entries {
            map.insert(pattern, *value).unwrap();
        }
        map
    }

    #[test]
    fn exact_key_wins_over_overlapping_pattern() {
        let map = map(&[("a*", 1), ("abc", 2)]);
        assert_eq!(map.get("abc"), Some(&2));
        assert_eq!(map.get("abd"), Some(&1));
    }

    #[rstest]
    #[case("axxxb", true)]
    #[case("ab", true)]
    #[case("a/b", true)]
    #[case("xab", false)]
    #[case("abx", false)]
    fn star_matches_any_run(#[case] key: &str, #[case] matches: bool) {
        let map = map(&[("a*b", 7)]);
        assert_eq!(map.get(key).is_some(), matches);
        assert_eq!(map.contains_key(key), matches);
    }

    #[rstest]
    #[case("file1.log", true)]
    #[case("file.log", false)]
    #[case("file12.log", false)]
    fn question_mark_matches_one_character(#[case] key: &str, #[case] matches: bool) {
        let map = map(&[("file?.log", 3)]);
        assert_eq!(map.contains_key(key), matches);
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let map = map(&[("v1.*", 1), ("(x)+?", 2)]);
        assert!(map.contains_key("v1.0"));
        assert!(!map.contains_key("v10"));
        assert!(map.contains_key("(x)+y"));
        assert!(!map.contains_key("xx"));
    }

    #[test]
    fn first_inserted_pattern_wins() {
        let map = map(&[("*.rs", 1), ("main*", 2)]);
        assert_eq!(map.get("main.rs"), Some(&1));
        assert_eq!(map.get("main.c"), Some(&2));
    }

    #[test]
    fn empty_map() {
        let map: GlobMap<u32> = GlobMap::new();
        assert!(map.is_empty());
        assert_eq!(map.get("anything"), None);
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn get_or_insert_with_uses_pattern_text_not_matching() {
        let mut map = map(&[("a*", 1)]);
        *map.get_or_insert_with("abc", || 10).unwrap() += 1;
        *map.get_or_insert_with("a*", || 20).unwrap() += 1;
        assert_eq!(map.get("abc"), Some(&11));
        assert_eq!(map.get("axe"), Some(&2));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn retain_removes_from_both_tables() {
        let mut map = map(&[("one", 1), ("t*", 2), ("three", 3), ("f?ve", 5)]);
        map.retain(|_, value| *value % 2 == 1);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("one", &1), ("three", &3), ("f?ve", &5)]);
        assert!(!map.contains_key("two"));
    }

    #[test]
    fn iteration_lists_exact_entries_before_patterns() {
        let map = map(&[("b*", 1), ("a", 2), ("?", 3), ("c", 4)]);
        let keys = map.iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert_eq!(keys, vec!["a", "c", "b*", "?"]);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec![2, 4, 1, 3]);
    }

    #[test]
    fn insert_replaces_same_pattern() {
        let mut map = map(&[("x*", 1)]);
        assert_eq!(map.insert("x*", 2).unwrap(), Some(1));
        assert_eq!(map.get("xy"), Some(&2));
        assert_eq!(map.len(), 1);
    }
}
