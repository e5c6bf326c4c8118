//! Merging iterator: global order across children, direction switches,
//! newest-version-first for internal keys, and status propagation.

#[cfg(test)]
mod tests {
    use crate::comparator::{Comparator, ReverseComparator, bytewise_comparator};
    use crate::error::Error;
    use crate::iterator::tests::helpers::*;
    use crate::iterator::{MergingIterator, StorageIterator};
    use crate::keys::InternalKeyComparator;
    use std::sync::Arc;

    fn merged(children: Vec<Vec<(Vec<u8>, Vec<u8>)>>) -> MergingIterator {
        let cmp = bytewise_comparator();
        let iters = children
            .into_iter()
            .map(|entries| VecIterator::boxed(cmp.clone(), entries))
            .collect();
        MergingIterator::new(cmp, iters)
    }

    fn keys(entries: &[(Vec<u8>, Vec<u8>)]) -> Vec<Vec<u8>> {
        entries.iter().map(|(k, _)| k.clone()).collect()
    }

    #[test]
    fn no_children() {
        let mut iter = merged(vec![]);
        iter.seek_to_first();
        assert!(!iter.valid());
        iter.seek_to_last();
        assert!(!iter.valid());
        iter.seek(b"a");
        assert!(!iter.valid());
        iter.status().unwrap();
    }

    #[test]
    fn interleaves_children() {
        let mut iter = merged(vec![
            vec![kv(b"a", b"1"), kv(b"d", b"4")],
            vec![],
            vec![kv(b"b", b"2"), kv(b"e", b"5")],
            vec![kv(b"c", b"3")],
        ]);
        let forward = scan_forward(&mut iter);
        assert_eq!(
            keys(&forward),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec(), b"e".to_vec()]
        );

        let mut backward = scan_backward(&mut iter);
        backward.reverse();
        assert_eq!(backward, forward);
    }

    #[test]
    fn seek_lands_on_smallest_candidate() {
        let mut iter = merged(vec![
            vec![kv(b"a", b"1"), kv(b"x", b"24")],
            vec![kv(b"m", b"13"), kv(b"q", b"17")],
        ]);
        iter.seek(b"n");
        assert_eq!(iter.key(), b"q");
        iter.seek(b"y");
        assert!(!iter.valid());
    }

    #[test]
    fn direction_switches() {
        let mut iter = merged(vec![
            vec![kv(b"a", b""), kv(b"c", b""), kv(b"e", b"")],
            vec![kv(b"b", b""), kv(b"d", b""), kv(b"f", b"")],
        ]);
        iter.seek(b"c");
        assert_eq!(iter.key(), b"c");
        iter.prev();
        assert_eq!(iter.key(), b"b");
        iter.prev();
        assert_eq!(iter.key(), b"a");
        iter.next();
        assert_eq!(iter.key(), b"b");
        iter.next();
        assert_eq!(iter.key(), b"c");
        iter.next();
        assert_eq!(iter.key(), b"d");
        iter.prev();
        assert_eq!(iter.key(), b"c");
    }

    #[test]
    fn prev_from_child_with_nothing_at_or_after_key() {
        let mut iter = merged(vec![vec![kv(b"a", b"")], vec![kv(b"z", b"")]]);
        iter.seek(b"z");
        iter.prev();
        assert_eq!(iter.key(), b"a");
    }

    #[test]
    fn newest_version_first_across_sources() {
        let cmp: Arc<dyn Comparator> =
            Arc::new(InternalKeyComparator::new(bytewise_comparator()));
        let older = VecIterator::boxed(cmp.clone(), vec![put(b"k", 5, b"old"), put(b"z", 1, b"z")]);
        let newer = VecIterator::boxed(cmp.clone(), vec![put(b"k", 9, b"new")]);
        let mut iter = MergingIterator::new(cmp, vec![older, newer]);

        iter.seek_to_first();
        assert_eq!(iter.value(), b"new");
        iter.next();
        assert_eq!(iter.value(), b"old");
        iter.next();
        assert_eq!(iter.value(), b"z");
    }

    #[test]
    fn reverse_comparator_order() {
        let cmp: Arc<dyn Comparator> = Arc::new(ReverseComparator::default());
        let a = VecIterator::boxed(cmp.clone(), vec![kv(b"ba", b""), kv(b"ab", b"")]);
        let b = VecIterator::boxed(cmp.clone(), vec![kv(b"ca", b"")]);
        let mut iter = MergingIterator::new(cmp, vec![a, b]);
        let forward = scan_forward(&mut iter);
        assert_eq!(keys(&forward), vec![b"ba".to_vec(), b"ca".to_vec(), b"ab".to_vec()]);
    }

    #[test]
    fn child_error_surfaces_in_status() {
        let cmp = bytewise_comparator();
        let ok = VecIterator::boxed(cmp.clone(), vec![kv(b"a", b"")]);
        let bad: Box<dyn StorageIterator> = Box::new(
            VecIterator::new(cmp.clone(), vec![]).with_error(Error::corruption("bad block")),
        );
        let mut iter = MergingIterator::new(cmp, vec![ok, bad]);
        iter.seek_to_first();
        assert!(iter.valid());
        assert!(iter.status().unwrap_err().is_corruption());
    }
}
