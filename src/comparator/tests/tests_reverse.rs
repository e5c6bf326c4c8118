//! Reverse comparator: order and shortening hooks in the reversed space.

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use crate::comparator::{Comparator, ReverseComparator};

    #[test]
    fn compares_reversed_keys() {
        let cmp = ReverseComparator::default();
        assert_eq!(cmp.compare(b"ba", b"ab"), Ordering::Less);
        assert_eq!(cmp.compare(b"a", b"ba"), Ordering::Less);
        assert_eq!(cmp.compare(b"xy", b"xy"), Ordering::Equal);
        assert_eq!(cmp.name(), "leveldb.ReverseBytewiseComparator");
    }

    #[test]
    fn separator_stays_between_bounds() {
        let cmp = ReverseComparator::default();
        let limit = b"gfedcbz".to_vec();
        let mut start = b"gfedcba".to_vec();
        let original = start.clone();
        cmp.find_shortest_separator(&mut start, &limit);
        assert_ne!(cmp.compare(&start, &original), Ordering::Less);
        assert_eq!(cmp.compare(&start, &limit), Ordering::Less);
    }

    #[test]
    fn separator_shortens_from_the_end() {
        let cmp = ReverseComparator::default();
        let mut start = b"xxxa1".to_vec();
        cmp.find_shortest_separator(&mut start, b"yyya3");
        // Reversed: "1axxx" vs "3ayyy" -> "2", reversed back.
        assert_eq!(start, b"2");
    }

    #[test]
    fn successor_in_reversed_space() {
        let cmp = ReverseComparator::default();
        let mut key = b"cba".to_vec();
        let original = key.clone();
        cmp.find_short_successor(&mut key);
        assert_eq!(key, b"b");
        assert_ne!(cmp.compare(&key, &original), Ordering::Less);
    }
}
