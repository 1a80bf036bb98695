use std::collections::HashMap;
use std::hash::Hash;

/// Replaces `old` with `new` and reports the difference as `(set, deleted)`.
/// A key present in both maps lands in `set` only if its value changed.
/// Callers hold their provider's write lock for the duration of the call so
/// the snapshot swap is atomic; order within the returned lists is
/// unspecified.
pub fn apply_snapshot<K, V>(old: &mut HashMap<K, V>, new: HashMap<K, V>) -> (Vec<V>, Vec<V>)
where
    K: Eq + Hash,
    V: Clone + PartialEq,
{
    let mut set = Vec::new();
    let mut deleted = Vec::new();

    for (key, value) in new.iter() {
        match old.get(key) {
            Some(existing) if existing == value => {}
            _ => set.push(value.clone()),
        }
    }

    for (key, value) in old.iter() {
        if !new.contains_key(key) {
            deleted.push(value.clone());
        }
    }

    *old = new;
    (set, deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, i32)]) -> HashMap<String, i32> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn first_snapshot_is_all_sets() {
        let mut old = HashMap::new();
        let (set, deleted) = apply_snapshot(&mut old, map(&[("a", 1), ("b", 2)]));
        assert_eq!(set.len(), 2);
        assert!(deleted.is_empty());
    }

    #[test]
    fn unchanged_values_are_not_reemitted() {
        let mut old = map(&[("a", 1), ("b", 2)]);
        let (set, deleted) = apply_snapshot(&mut old, map(&[("a", 1), ("b", 3)]));
        assert_eq!(set, vec![3]);
        assert!(deleted.is_empty());
    }

    #[test]
    fn missing_keys_are_deleted() {
        let mut old = map(&[("a", 1), ("b", 2)]);
        let (set, deleted) = apply_snapshot(&mut old, map(&[("a", 1)]));
        assert!(set.is_empty());
        assert_eq!(deleted, vec![2]);
    }

    #[test]
    fn diff_applied_to_old_yields_new() {
        let s1 = map(&[("a", 1), ("b", 2), ("c", 3)]);
        let s2 = map(&[("a", 1), ("b", 9), ("d", 4)]);

        let mut state = s1.clone();
        let (set, deleted) = apply_snapshot(&mut state, s2.clone());

        // replay the diff on top of s1 and compare against s2
        let mut replayed = s1;
        for v in &deleted {
            replayed.retain(|_, existing| *existing != *v);
        }
        for v in set {
            let key = s2
                .iter()
                .find(|(_, value)| **value == v)
                .map(|(k, _)| k.clone())
                .unwrap();
            replayed.insert(key, v);
        }
        assert_eq!(replayed, s2);
    }
}
