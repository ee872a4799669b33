// Label composer
// Merges ambient context labels with call-site labels into a canonical,
// key-sorted label set and derives order-insensitive fingerprints for the
// collector cache.
//
// Numan Thabit 2025 Nov

use rustc_hash::FxHasher;
use std::cell::RefCell;
use std::hash::Hasher;

/// Canonical label set built from flat `key, value, ...` lists.
///
/// Slots are reused across [`LabelSet::reset`] so a pooled set stops
/// allocating once it has seen the widest label list of its thread.
#[derive(Debug, Default)]
pub struct LabelSet {
    slots: Vec<(String, String)>,
    len: usize,
    key_fingerprint: u64,
}

impl LabelSet {
    /// Builds a fresh set from ambient and call-site pairs.
    ///
    /// # Panics
    ///
    /// Panics if either list has an odd length or contains an empty key.
    pub fn compose<A: AsRef<str>, C: AsRef<str>>(ambient: &[A], call_site: &[C]) -> Self {
        let mut set = Self::default();
        set.fill(ambient, call_site);
        set
    }

    /// Replaces the content of `self` with the merge of both lists; call-site
    /// pairs override ambient pairs sharing a key.
    pub fn fill<A: AsRef<str>, C: AsRef<str>>(&mut self, ambient: &[A], call_site: &[C]) {
        validate_pairs(ambient);
        validate_pairs(call_site);

        self.reset();
        for pair in ambient.chunks_exact(2) {
            self.insert(pair[0].as_ref(), pair[1].as_ref());
        }
        for pair in call_site.chunks_exact(2) {
            self.insert(pair[0].as_ref(), pair[1].as_ref());
        }

        self.slots[..self.len].sort_unstable_by(|a, b| a.0.cmp(&b.0));
        self.key_fingerprint = self
            .keys()
            .fold(0, |acc, key| acc ^ digest(&[key.as_bytes()]));
    }

    /// Clears every used slot so no key or value survives into the next use.
    pub fn reset(&mut self) {
        for (key, value) in &mut self.slots[..self.len] {
            key.clear();
            value.clear();
        }
        self.len = 0;
        self.key_fingerprint = 0;
    }

    fn insert(&mut self, key: &str, value: &str) {
        if let Some((_, existing)) = self.slots[..self.len].iter_mut().find(|(k, _)| k == key) {
            existing.clear();
            existing.push_str(value);
            return;
        }
        if self.len == self.slots.len() {
            self.slots.push(Default::default());
        }
        let (k, v) = &mut self.slots[self.len];
        k.clear();
        k.push_str(key);
        v.clear();
        v.push_str(value);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Label keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots[..self.len].iter().map(|(k, _)| k.as_str())
    }

    /// Label values ordered by their keys.
    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots[..self.len].iter().map(|(_, v)| v.as_str())
    }

    /// Key/value pairs in ascending key order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.slots[..self.len]
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Digest of the key set only; identifies a collector.
    ///
    /// XOR of per-key digests, so distinct key sets may collide. Callers that
    /// need exactness compare [`LabelSet::keys`] as well.
    pub fn key_fingerprint(&self) -> u64 {
        self.key_fingerprint
    }

    /// Digest of keys and values; identifies a single series.
    pub fn fingerprint(&self) -> u64 {
        self.pairs()
            .fold(0, |acc, (k, v)| acc ^ digest(&[k.as_bytes(), v.as_bytes()]))
    }

    /// True when the key set equals `keys`, which must be sorted.
    pub fn has_keys<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        keys.len() == self.len && self.keys().zip(keys).all(|(a, b)| a == b.as_ref())
    }
}

impl PartialEq for LabelSet {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.pairs().eq(other.pairs())
    }
}

impl Eq for LabelSet {}

fn digest(parts: &[&[u8]]) -> u64 {
    let mut hasher = FxHasher::default();
    for part in parts {
        hasher.write(part);
        // separator keeps ("ab", "c") apart from ("a", "bc")
        hasher.write_u8(0xff);
    }
    hasher.finish()
}

/// Checks a flat `key, value, ...` list.
///
/// # Panics
///
/// Malformed lists are caller defects: an odd number of elements or an
/// empty key panics instead of recording corrupt series.
pub fn validate_pairs<S: AsRef<str>>(labels_and_values: &[S]) {
    if labels_and_values.len() % 2 != 0 {
        panic!(
            "malformed label pairs: odd number of elements ({})",
            labels_and_values.len()
        );
    }
    if labels_and_values
        .iter()
        .step_by(2)
        .any(|key| key.as_ref().is_empty())
    {
        panic!("empty key received in labels");
    }
}

thread_local! {
    static LABEL_BUFFER: RefCell<LabelSet> = RefCell::new(LabelSet::default());
}

/// Runs `f` with this thread's pooled label set, reset before and after use.
///
/// Re-entrant calls (and calls during thread teardown) get a fresh set.
pub(crate) fn with_pooled<R>(f: impl FnOnce(&mut LabelSet) -> R) -> R {
    let mut f = Some(f);
    let pooled = LABEL_BUFFER.try_with(|cell| {
        let mut set = cell.try_borrow_mut().ok()?;
        let f = f.take()?;
        set.reset();
        let out = f(&mut set);
        set.reset();
        Some(out)
    });
    match (pooled, f) {
        (Ok(Some(out)), _) => out,
        (_, Some(f)) => f(&mut LabelSet::default()),
        (_, None) => unreachable!("pooled closure consumed without a result"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[test]
    fn call_site_overrides_ambient() {
        let set = LabelSet::compose(&["l", "0", "l", "v", "name", "ctx"], &["name", "call"]);
        assert_eq!(set.pairs().collect::<Vec<_>>(), [("l", "v"), ("name", "call")]);
    }

    #[test]
    fn keys_are_sorted() {
        let set = LabelSet::compose(&["zeta", "1"], &["alpha", "2", "mid", "3"]);
        assert_eq!(set.keys().collect::<Vec<_>>(), ["alpha", "mid", "zeta"]);
        assert_eq!(set.values().collect::<Vec<_>>(), ["2", "3", "1"]);
        assert_eq!(set.get("mid"), Some("3"));
        assert_eq!(set.get("none"), None);
        assert!(set.has_keys(&["alpha", "mid", "zeta"]));
        assert!(!set.has_keys(&["alpha", "mid"]));
    }

    #[test]
    fn key_fingerprint_ignores_values() {
        let a = LabelSet::compose::<&str, &str>(&[], &["name", "a", "other", "b"]);
        let b = LabelSet::compose::<&str, &str>(&[], &["other", "x", "name", "y"]);
        assert_eq!(a.key_fingerprint(), b.key_fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());

        let c = LabelSet::compose::<&str, &str>(&[], &["name", "a"]);
        assert_ne!(a.key_fingerprint(), c.key_fingerprint());
    }

    #[test]
    fn empty_set_has_zero_fingerprint() {
        let set = LabelSet::compose::<&str, &str>(&[], &[]);
        assert!(set.is_empty());
        assert_eq!(set.key_fingerprint(), 0);
        assert_eq!(set.fingerprint(), 0);
    }

    #[test]
    fn reset_drops_previous_labels() {
        let mut set = LabelSet::compose::<&str, &str>(&[], &["a", "1", "b", "2", "c", "3"]);
        set.fill::<&str, &str>(&[], &["b", "9"]);
        assert_eq!(set.pairs().collect::<Vec<_>>(), [("b", "9")]);
        assert!(set.slots[1..].iter().all(|(k, v)| k.is_empty() && v.is_empty()));
    }

    #[test]
    fn pooled_set_is_clean_between_uses() {
        with_pooled(|set| set.fill::<&str, &str>(&[], &["leak", "x"]));
        with_pooled(|set| {
            assert!(set.is_empty());
            set.fill::<&str, &str>(&[], &["k", "v"]);
            assert_eq!(set.get("leak"), None);
        });
    }

    #[test]
    fn nested_pool_use_gets_fresh_set() {
        with_pooled(|outer| {
            outer.fill::<&str, &str>(&[], &["outer", "1"]);
            with_pooled(|inner| {
                assert!(inner.is_empty());
                inner.fill::<&str, &str>(&[], &["inner", "2"]);
            });
            assert_eq!(outer.get("outer"), Some("1"));
        });
    }

    #[test]
    #[should_panic(expected = "odd number of elements")]
    fn odd_list_panics() {
        LabelSet::compose::<&str, &str>(&[], &["key"]);
    }

    #[test]
    #[should_panic(expected = "empty key")]
    fn empty_key_panics() {
        LabelSet::compose::<&str, &str>(&["", "value"], &[]);
    }

    fn flatten(pairs: &[(String, String)]) -> Vec<String> {
        pairs
            .iter()
            .flat_map(|(k, v)| [k.clone(), v.clone()])
            .collect()
    }

    proptest! {
        #[test]
        fn disjoint_lists_compose_to_union(
            ambient in prop::collection::btree_map("a[a-z]{0,6}", "[a-z0-9]{0,6}", 0..6),
            call_site in prop::collection::btree_map("c[a-z]{0,6}", "[a-z0-9]{0,6}", 0..6),
        ) {
            let ambient: Vec<_> = ambient.into_iter().collect();
            let call_site: Vec<_> = call_site.into_iter().collect();
            let forward = LabelSet::compose(&flatten(&ambient), &flatten(&call_site));

            let mut reversed_ambient = ambient.clone();
            reversed_ambient.reverse();
            let mut reversed_call_site = call_site.clone();
            reversed_call_site.reverse();
            let backward = LabelSet::compose(&flatten(&reversed_call_site), &flatten(&reversed_ambient));

            let expected: BTreeMap<_, _> = ambient.iter().chain(&call_site).cloned().collect();
            let got: BTreeMap<_, _> = forward
                .pairs()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();

            prop_assert_eq!(got, expected);
            prop_assert!(forward == backward);
            prop_assert_eq!(forward.fingerprint(), backward.fingerprint());
            prop_assert_eq!(forward.key_fingerprint(), backward.key_fingerprint());
        }

        #[test]
        fn shared_key_takes_call_site_value(
            key in "[a-z]{1,8}",
            ambient_value in "[a-z0-9]{0,8}",
            call_value in "[a-z0-9]{0,8}",
        ) {
            let set = LabelSet::compose(
                &[key.as_str(), ambient_value.as_str()],
                &[key.as_str(), call_value.as_str()],
            );
            prop_assert_eq!(set.len(), 1);
            prop_assert_eq!(set.get(&key), Some(call_value.as_str()));
        }
    }
}
