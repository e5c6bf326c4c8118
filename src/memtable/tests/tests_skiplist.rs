//! Arena-backed skip list internals.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::comparator::bytewise_comparator;
    use crate::memtable::skiplist::{HEAD, NIL, SkipList};

    fn collect(list: &SkipList) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut node = list.next(HEAD, 0);
        while node != NIL {
            out.push(list.key(node).to_vec());
            node = list.next(node, 0);
        }
        out
    }

    #[test]
    fn random_inserts_match_sorted_set() {
        let list = SkipList::new(bytewise_comparator());
        let mut model = BTreeSet::new();
        let mut rng = StdRng::seed_from_u64(301);
        // Crosses several arena segments.
        while model.len() < 5000 {
            let key = rng.random_range(0u32..1_000_000).to_be_bytes().to_vec();
            if model.insert(key.clone()) {
                list.insert(key, Vec::new());
            }
        }
        assert_eq!(list.len(), model.len());
        assert_eq!(collect(&list), model.iter().cloned().collect::<Vec<_>>());
    }

    #[test]
    fn searches() {
        let list = SkipList::new(bytewise_comparator());
        for k in [10u8, 20, 30, 40] {
            list.insert(vec![k], vec![k + 1]);
        }

        let ge = list.find_greater_or_equal(&[20], None);
        assert_eq!(list.key(ge), [20u8]);
        assert_eq!(list.value(ge), [21u8]);
        assert_eq!(list.key(list.find_greater_or_equal(&[21], None)), [30u8]);
        assert_eq!(list.find_greater_or_equal(&[41], None), NIL);

        assert_eq!(list.find_less_than(&[10]), HEAD);
        assert_eq!(list.key(list.find_less_than(&[25])), [20u8]);
        assert_eq!(list.key(list.find_last()), [40u8]);
    }

    #[test]
    fn empty_list() {
        let list = SkipList::new(bytewise_comparator());
        assert!(list.is_empty());
        assert_eq!(list.next(HEAD, 0), NIL);
        assert_eq!(list.find_last(), HEAD);
        assert_eq!(list.find_less_than(b"x"), HEAD);
        assert_eq!(list.find_greater_or_equal(b"", None), NIL);
        assert!(list.key(HEAD).is_empty());
        assert!(list.key(NIL).is_empty());
    }

    #[test]
    fn memory_usage_counts_payloads() {
        let list = SkipList::new(bytewise_comparator());
        let base = list.memory_usage();
        list.insert(vec![1; 100], vec![2; 900]);
        assert!(list.memory_usage() >= base + 1000);
    }
}
