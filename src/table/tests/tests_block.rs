//! Block builder layout and block iterator behaviour.

#[cfg(test)]
mod tests {
    use crate::comparator::bytewise_comparator;
    use crate::encoding::decode_fixed32;
    use crate::iterator::StorageIterator;
    use crate::table::tests::helpers::{
        Entries, build_block, check_against_model, comparators, init_tracing, sample_entries,
        sorted,
    };
    use crate::table::{Block, BlockBuilder};

    fn fruit() -> Entries {
        vec![
            (b"apple".to_vec(), b"1".to_vec()),
            (b"apricot".to_vec(), b"2".to_vec()),
            (b"banana".to_vec(), b"3".to_vec()),
        ]
    }

    #[test]
    fn empty_block_layout() {
        init_tracing();
        let mut builder = BlockBuilder::new(bytewise_comparator(), 16);
        assert!(builder.is_empty());
        assert_eq!(builder.current_size_estimate(), 8);
        // One restart at offset 0, then the count.
        assert_eq!(builder.finish(), b"\x00\x00\x00\x00\x01\x00\x00\x00");

        let block = Block::new(builder.finish().to_vec()).unwrap();
        let mut iter = block.iter(bytewise_comparator());
        iter.seek_to_first();
        assert!(!iter.valid());
        iter.seek_to_last();
        assert!(!iter.valid());
        iter.seek(b"anything");
        assert!(!iter.valid());
        iter.status().unwrap();
    }

    #[test]
    fn prefix_compressed_entries() {
        init_tracing();
        let block = build_block(bytewise_comparator(), 16, &fruit());
        let mut expected = Vec::new();
        expected.extend_from_slice(b"\x00\x05\x01apple1");
        expected.extend_from_slice(b"\x02\x05\x01ricot2");
        expected.extend_from_slice(b"\x00\x06\x01banana3");
        expected.extend_from_slice(b"\x00\x00\x00\x00\x01\x00\x00\x00");

        let mut builder = BlockBuilder::new(bytewise_comparator(), 16);
        for (k, v) in fruit() {
            builder.add(&k, &v);
        }
        assert_eq!(builder.current_size_estimate(), expected.len());
        assert_eq!(builder.finish(), expected.as_slice());
        assert_eq!(block.size(), expected.len());
        assert_eq!(block.num_restarts(), 1);
    }

    #[test]
    fn restart_points_recur_every_interval() {
        init_tracing();
        let entries = sample_entries(10);
        for (interval, restarts) in [(1, 10), (3, 4), (5, 2), (16, 1)] {
            let mut builder = BlockBuilder::new(bytewise_comparator(), interval);
            for (k, v) in &entries {
                builder.add(k, v);
            }
            let contents = builder.finish().to_vec();
            let count = decode_fixed32(&contents[contents.len() - 4..]).unwrap();
            assert_eq!(count as usize, restarts, "interval {interval}");
            assert_eq!(decode_fixed32(&contents[contents.len() - 4 * (1 + restarts)..]).unwrap(), 0);
        }
    }

    #[test]
    fn reset_allows_reuse() {
        init_tracing();
        let mut builder = BlockBuilder::new(bytewise_comparator(), 16);
        builder.add(b"zzz", b"1");
        let _ = builder.finish();
        builder.reset();
        assert!(builder.is_empty());
        for (k, v) in fruit() {
            builder.add(&k, &v);
        }
        let block = Block::new(builder.finish().to_vec()).unwrap();
        let mut iter = block.iter(bytewise_comparator());
        iter.seek_to_first();
        assert_eq!(iter.key(), b"apple");
    }

    #[test]
    fn matches_model_for_every_comparator_and_interval() {
        init_tracing();
        for cmp in comparators() {
            let model = sorted(cmp.as_ref(), sample_entries(200));
            for interval in [1, 2, 16, 1024] {
                let block = build_block(cmp.clone(), interval, &model);
                let mut iter = block.iter(cmp.clone());
                check_against_model(cmp.as_ref(), &mut iter, &model);
            }
        }
    }

    #[test]
    fn empty_key_and_value() {
        init_tracing();
        let entries: Entries = vec![
            (Vec::new(), Vec::new()),
            (b"\x00".to_vec(), b"v".to_vec()),
            (b"\xff\xff".to_vec(), Vec::new()),
        ];
        let cmp = bytewise_comparator();
        let block = build_block(cmp.clone(), 2, &entries);
        let mut iter = block.iter(cmp.clone());
        check_against_model(cmp.as_ref(), &mut iter, &entries);
    }

    #[test]
    fn repeated_seeks_reuse_position() {
        init_tracing();
        let cmp = bytewise_comparator();
        let model = sample_entries(100);
        let block = build_block(cmp.clone(), 4, &model);
        let mut iter = block.iter(cmp);

        for (k, v) in model.iter().step_by(3) {
            iter.seek(k);
            assert_eq!(iter.key(), k.as_slice());
            assert_eq!(iter.value(), v.as_slice());
        }
        for (k, _) in model.iter().rev().step_by(5) {
            iter.seek(k);
            assert_eq!(iter.key(), k.as_slice());
        }
        // Equal to the current key: stays put.
        iter.seek(&model[10].0);
        iter.seek(&model[10].0);
        assert_eq!(iter.key(), model[10].0.as_slice());
    }

    #[test]
    fn zero_restarts_is_always_invalid() {
        init_tracing();
        let block = Block::new(vec![0, 0, 0, 0]).unwrap();
        assert_eq!(block.num_restarts(), 0);
        let mut iter = block.iter(bytewise_comparator());
        assert!(!iter.valid());
        iter.seek_to_first();
        assert!(!iter.valid());
        iter.seek_to_last();
        assert!(!iter.valid());
        iter.seek(b"foo");
        assert!(!iter.valid());
        iter.seek(b"");
        assert!(!iter.valid());
        iter.status().unwrap();
    }

    #[test]
    fn rejects_malformed_trailer() {
        init_tracing();
        for contents in [vec![], vec![1, 0, 0], vec![0, 0, 0, 0, 5, 0, 0, 0]] {
            let err = Block::new(contents).unwrap_err();
            assert!(err.is_corruption(), "{err}");
        }
    }

    #[test]
    fn bad_entry_is_reported_through_status() {
        init_tracing();
        let mut builder = BlockBuilder::new(bytewise_comparator(), 16);
        for (k, v) in fruit() {
            builder.add(&k, &v);
        }
        let mut contents = builder.finish().to_vec();
        // Second entry claims a shared prefix longer than the previous key.
        contents[9] = 0x7f;
        let block = Block::new(contents).unwrap();

        let mut iter = block.iter(bytewise_comparator());
        iter.seek_to_first();
        assert!(iter.valid());
        assert_eq!(iter.key(), b"apple");
        iter.status().unwrap();

        iter.next();
        assert!(!iter.valid());
        let err = iter.status().unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("bad entry in block"));
    }

    #[test]
    fn value_running_past_restarts_is_corruption() {
        init_tracing();
        let mut builder = BlockBuilder::new(bytewise_comparator(), 16);
        builder.add(b"k", b"v");
        let mut contents = builder.finish().to_vec();
        contents[2] = 0x40;
        let block = Block::new(contents).unwrap();
        let mut iter = block.iter(bytewise_comparator());
        iter.seek_to_first();
        assert!(!iter.valid());
        assert!(iter.status().unwrap_err().is_corruption());
    }
}
