use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard};

use ahash::AHashMap;
use regex::Regex;

const DEFAULT_MAX_REGEXP_CACHE_SIZE: usize = 2048;

/// Cache of compiled, fully anchored regexes keyed by the source pattern.
pub struct RegexpCache {
    requests: AtomicU64,
    misses: AtomicU64,
    inner: Mutex<AHashMap<String, Regex>>,
    max_entries: usize,
}

impl RegexpCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            requests: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inner: Mutex::new(AHashMap::new()),
            max_entries,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AHashMap<String, Regex>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Regex> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let item = self.lock().get(key).cloned();
        if item.is_none() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        item
    }

    pub fn put(&self, key: &str, value: Regex) {
        let mut inner = self.lock();
        if inner.len() >= self.max_entries {
            inner.clear();
        }
        inner.insert(key.to_string(), value);
    }

    /// returns the number of cached regexps.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

static REGEX_CACHE: LazyLock<RegexpCache> =
    LazyLock::new(|| RegexpCache::new(DEFAULT_MAX_REGEXP_CACHE_SIZE));

pub fn get_regexp_cache() -> &'static RegexpCache {
    &REGEX_CACHE
}

/// Compiles `pattern` so that it must match the whole input, the way label
/// matchers and `label_replace` treat their regexes.
pub fn compile_anchored_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let cache = get_regexp_cache();
    if let Some(re) = cache.get(pattern) {
        return Ok(re);
    }
    let re = Regex::new(&format!("^(?s:{pattern})$"))?;
    cache.put(pattern, re.clone());
    Ok(re)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_both_ends() {
        let re = compile_anchored_regex("foo|bar").unwrap();
        assert!(re.is_match("foo"));
        assert!(re.is_match("bar"));
        assert!(!re.is_match("foobar"));
        assert!(!re.is_match("xfoo"));
    }

    #[test]
    fn dot_matches_newline() {
        let re = compile_anchored_regex("a.b").unwrap();
        assert!(re.is_match("a\nb"));
    }

    #[test]
    fn empty_pattern_matches_only_empty() {
        let re = compile_anchored_regex("").unwrap();
        assert!(re.is_match(""));
        assert!(!re.is_match("x"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(compile_anchored_regex("(").is_err());
    }

    #[test]
    fn cache_counts_misses() {
        let cache = RegexpCache::new(2);
        assert!(cache.get("a").is_none());
        cache.put("a", Regex::new("^a$").unwrap());
        assert!(cache.get("a").is_some());
        assert_eq!(cache.requests(), 2);
        assert_eq!(cache.misses(), 1);

        cache.put("b", Regex::new("^b$").unwrap());
        cache.put("c", Regex::new("^c$").unwrap());
        assert_eq!(cache.len(), 1);
    }
}
