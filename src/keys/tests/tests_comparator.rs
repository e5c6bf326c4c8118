//! Internal key ordering and the separator/successor hooks that append the
//! maximal seek tag.

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use crate::comparator::{Comparator, bytewise_comparator};
    use crate::keys::*;

    fn icmp() -> InternalKeyComparator {
        InternalKeyComparator::new(bytewise_comparator())
    }

    fn ikey(user_key: &[u8], seq: u64, t: ValueType) -> Vec<u8> {
        InternalKey::new(user_key, seq, t).encode().to_vec()
    }

    fn shorten(start: Vec<u8>, limit: Vec<u8>) -> Vec<u8> {
        let mut s = start;
        icmp().find_shortest_separator(&mut s, &limit);
        s
    }

    fn short_successor(key: Vec<u8>) -> Vec<u8> {
        let mut k = key;
        icmp().find_short_successor(&mut k);
        k
    }

    #[test]
    fn orders_by_user_key_then_newest_first() {
        let cmp = icmp();
        let a100 = ikey(b"a", 100, ValueType::Value);
        let a99 = ikey(b"a", 99, ValueType::Value);
        let a100_del = ikey(b"a", 100, ValueType::Deletion);
        let b1 = ikey(b"b", 1, ValueType::Value);

        assert_eq!(cmp.compare(&a100, &a99), Ordering::Less);
        assert_eq!(cmp.compare(&a99, &b1), Ordering::Less);
        assert_eq!(cmp.compare(&a100, &a100_del), Ordering::Less);
        assert_eq!(cmp.compare(&a100, &a100), Ordering::Equal);
        assert_eq!(cmp.name(), "leveldb.InternalKeyComparator");
    }

    #[test]
    fn separator_same_user_key() {
        let v = ValueType::Value;
        assert_eq!(
            shorten(ikey(b"foo", 100, v), ikey(b"foo", 99, v)),
            ikey(b"foo", 100, v)
        );
        assert_eq!(
            shorten(ikey(b"foo", 100, v), ikey(b"foo", 101, v)),
            ikey(b"foo", 100, v)
        );
        assert_eq!(
            shorten(ikey(b"foo", 100, v), ikey(b"foo", 100, v)),
            ikey(b"foo", 100, v)
        );
        assert_eq!(
            shorten(ikey(b"foo", 100, v), ikey(b"foo", 100, ValueType::Deletion)),
            ikey(b"foo", 100, v)
        );
    }

    #[test]
    fn separator_misordered_is_unchanged() {
        let v = ValueType::Value;
        assert_eq!(
            shorten(ikey(b"foo", 100, v), ikey(b"bar", 99, v)),
            ikey(b"foo", 100, v)
        );
    }

    #[test]
    fn separator_different_user_keys() {
        let v = ValueType::Value;
        assert_eq!(
            shorten(ikey(b"foo", 100, v), ikey(b"hello", 200, v)),
            ikey(b"g", MAX_SEQUENCE_NUMBER, VALUE_TYPE_FOR_SEEK)
        );
    }

    #[test]
    fn separator_prefix_relations_are_unchanged() {
        let v = ValueType::Value;
        assert_eq!(
            shorten(ikey(b"foo", 100, v), ikey(b"foobar", 200, v)),
            ikey(b"foo", 100, v)
        );
        assert_eq!(
            shorten(ikey(b"foobar", 100, v), ikey(b"foo", 200, v)),
            ikey(b"foobar", 100, v)
        );
    }

    #[test]
    fn short_successor_appends_seek_tag() {
        assert_eq!(
            short_successor(ikey(b"foo", 100, ValueType::Value)),
            ikey(b"g", MAX_SEQUENCE_NUMBER, VALUE_TYPE_FOR_SEEK)
        );
        assert_eq!(
            short_successor(ikey(b"\xff\xff", 100, ValueType::Value)),
            ikey(b"\xff\xff", 100, ValueType::Value)
        );
    }
}
