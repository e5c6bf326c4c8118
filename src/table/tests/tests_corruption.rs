//! Damaged tables: open-time validation and deferred iterator errors.
//!
//! ## Layout reference
//! ```text
//! [data block | type | crc] x N
//! [filter block | type | crc]
//! [metaindex block | type | crc]
//! [index block | type | crc]
//! [footer 48B]
//! ```

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::comparator::bytewise_comparator;
    use crate::encoding::{Decode, decode_fixed32, encode_to_vec};
    use crate::filter::{BloomFilterPolicy, FilterPolicy};
    use crate::iterator::StorageIterator;
    use crate::options::{CompressionType, Options, ReadOptions};
    use crate::table::{Block, BlockHandle};
    use crate::table::format::{FOOTER_ENCODED_LEN, Footer};
    use crate::table::tests::helpers::{
        build_table, init_tracing, open_table, sample_entries, table_iter,
    };

    fn footer_of(bytes: &[u8]) -> Footer {
        Footer::decode_from(&bytes[bytes.len() - FOOTER_ENCODED_LEN..])
            .unwrap()
            .0
    }

    fn plain_options() -> Options {
        Options {
            block_size: 256,
            compression: CompressionType::None,
            ..Options::default()
        }
    }

    #[test]
    fn too_short_file() {
        init_tracing();
        let err = open_table(&Options::default(), vec![0u8; 10]).unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("file is too short to be an sstable"));
    }

    #[test]
    fn bad_magic() {
        init_tracing();
        let options = Options::default();
        let mut bytes = build_table(&options, &sample_entries(10));
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let err = open_table(&options, bytes).unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("bad magic number"));
    }

    #[test]
    fn footer_pointing_past_end() {
        init_tracing();
        let bytes = encode_to_vec(&Footer {
            metaindex_handle: BlockHandle::default(),
            index_handle: BlockHandle::new(0, 1000),
        });
        let err = open_table(&Options::default(), bytes).unwrap_err();
        assert!(err.to_string().contains("truncated block read"));
    }

    #[test]
    fn corrupt_index_block_fails_open() {
        init_tracing();
        let options = plain_options();
        let mut bytes = build_table(&options, &sample_entries(50));
        let index = footer_of(&bytes).index_handle;
        bytes[index.offset as usize + 1] ^= 0x55;
        let err = open_table(&options, bytes).unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("block checksum mismatch"));
    }

    #[test]
    fn corrupt_data_block_is_deferred_to_status() {
        init_tracing();
        let options = plain_options();
        let model = sample_entries(100);
        let mut bytes = build_table(&options, &model);

        // Locate the second data block through the index.
        let table = open_table(&options, bytes.clone()).unwrap();
        let second_block = {
            let mut offsets: Vec<u64> = model
                .iter()
                .map(|(k, _)| table.approximate_offset_of(k))
                .collect();
            offsets.dedup();
            assert!(offsets.len() > 3, "expected several data blocks");
            offsets[1]
        };
        bytes[second_block as usize + 2] ^= 0x01;

        let table = open_table(&options, bytes).unwrap();
        let mut iter = table_iter(&table);
        let mut seen = Vec::new();
        iter.seek_to_first();
        while iter.valid() {
            seen.push((iter.key().to_vec(), iter.value().to_vec()));
            iter.next();
        }
        let err = iter.status().unwrap_err();
        assert!(err.to_string().contains("block checksum mismatch"));

        // Entries before the damaged block are intact, and later blocks
        // are still visited.
        assert!(!seen.is_empty());
        assert!(seen.len() < model.len());
        assert_eq!(seen[0], model[0]);
        assert_eq!(seen.last(), model.last());

        // Point lookups into the damaged block fail loudly.
        let victim = model
            .iter()
            .find(|(k, _)| table.approximate_offset_of(k) == second_block)
            .unwrap();
        let verify = ReadOptions {
            verify_checksums: true,
        };
        assert!(table.get(&verify, &victim.0).unwrap_err().is_corruption());
    }

    #[test]
    fn corrupt_meta_block_drops_filter_unless_paranoid() {
        init_tracing();
        let options = Options {
            filter_policy: Some(Arc::new(BloomFilterPolicy::new(10))),
            ..plain_options()
        };
        let model = sample_entries(40);
        let mut bytes = build_table(&options, &model);

        // Damage only the metaindex checksum, not its contents.
        let meta = footer_of(&bytes).metaindex_handle;
        bytes[(meta.offset + meta.size) as usize + 1] ^= 0xff;

        let table = open_table(&options, bytes.clone()).unwrap();
        assert!(format!("{table:?}").contains("has_filter: false"));
        for entry in &model {
            assert_eq!(
                table.get(&ReadOptions::default(), &entry.0).unwrap(),
                Some(entry.clone())
            );
        }

        let paranoid = Options {
            paranoid_checks: true,
            ..options
        };
        let err = open_table(&paranoid, bytes).unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("block checksum mismatch"));
    }

    /// Locates the filter block through the metaindex.
    fn filter_handle(bytes: &[u8], policy: &dyn FilterPolicy) -> BlockHandle {
        let meta = footer_of(bytes).metaindex_handle;
        let start = meta.offset as usize;
        let block = Block::new(bytes[start..start + meta.size as usize].to_vec()).unwrap();
        let key = format!("filter.{}", policy.name());
        let mut iter = block.iter(bytewise_comparator());
        iter.seek(key.as_bytes());
        assert!(iter.valid());
        assert_eq!(iter.key(), key.as_bytes());
        BlockHandle::decode_from(iter.value()).unwrap().0
    }

    #[test]
    fn cleared_filter_bits_never_hide_present_keys() {
        init_tracing();
        let policy = Arc::new(BloomFilterPolicy::new(10));
        let options = Options {
            filter_policy: Some(policy.clone()),
            ..plain_options()
        };
        let model = sample_entries(200);
        let mut bytes = build_table(&options, &model);

        // Zero every filter's bit array but keep its trailing probe count,
        // so the damaged filters would reject every key if trusted.
        let handle = filter_handle(&bytes, policy.as_ref());
        let base = handle.offset as usize;
        let end = base + handle.size as usize;
        let array_start = decode_fixed32(&bytes[end - 5..end - 1]).unwrap() as usize;
        let num_filters = (handle.size as usize - 5 - array_start) / 4;
        assert!(num_filters > 1);
        for i in 0..num_filters {
            let at = base + array_start + 4 * i;
            let start = decode_fixed32(&bytes[at..at + 4]).unwrap() as usize;
            let limit = if i + 1 < num_filters {
                decode_fixed32(&bytes[at + 4..at + 8]).unwrap() as usize
            } else {
                array_start
            };
            if limit > start {
                bytes[base + start..base + limit - 1].fill(0);
            }
        }

        let table = open_table(&options, bytes.clone()).unwrap();
        let verify = ReadOptions {
            verify_checksums: true,
        };
        for entry in &model {
            assert_eq!(table.get(&verify, &entry.0).unwrap(), Some(entry.clone()));
            assert_eq!(
                table.get(&ReadOptions::default(), &entry.0).unwrap(),
                Some(entry.clone())
            );
        }

        let paranoid = Options {
            paranoid_checks: true,
            ..options
        };
        let err = open_table(&paranoid, bytes).unwrap_err();
        assert!(err.to_string().contains("block checksum mismatch"));
    }
}
