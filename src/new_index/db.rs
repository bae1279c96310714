use std::path::Path;

use crate::errors::*;
use crate::util::{bincode, Bytes};

/// Bumped whenever the on-disk row format changes.
static DB_VERSION: u32 = 1;

#[derive(Debug, Eq, PartialEq)]
pub struct DBRow {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Copy, Clone, Debug)]
pub enum DBFlush {
    Disable,
    Enable,
}

/// Ordered byte-string store. A batch handed to `write` becomes visible to
/// readers all at once or not at all.
pub struct DB {
    db: rocksdb::DB,
    read_only: bool,
}

impl DB {
    pub fn open(path: &Path) -> Result<DB> {
        debug!("opening DB at {:?}", path);
        let db = rocksdb::DB::open(&db_options(), path)
            .chain_err(|| format!("failed to open RocksDB at {:?}", path))?;
        let db = DB {
            db,
            read_only: false,
        };
        db.verify_compatibility()?;
        Ok(db)
    }

    /// Opens an existing DB for queries only. Any write will fail.
    pub fn open_read_only(path: &Path) -> Result<DB> {
        debug!("opening DB at {:?} (read-only)", path);
        let db = rocksdb::DB::open_for_read_only(&db_options(), path, false)
            .chain_err(|| format!("failed to open RocksDB at {:?}", path))?;
        let db = DB {
            db,
            read_only: true,
        };
        db.verify_compatibility()?;
        Ok(db)
    }

    pub fn write(&self, mut rows: Vec<DBRow>, flush: DBFlush) -> Result<()> {
        debug!(
            "writing {} rows to {:?}, flush={:?}",
            rows.len(),
            self.db,
            flush
        );
        rows.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        let mut batch = rocksdb::WriteBatch::default();
        for row in rows {
            batch.put(&row.key, &row.value);
        }
        let do_flush = match flush {
            DBFlush::Enable => true,
            DBFlush::Disable => false,
        };
        let mut opts = rocksdb::WriteOptions::new();
        opts.set_sync(do_flush);
        opts.disable_wal(!do_flush);
        self.db
            .write_opt(batch, &opts)
            .chain_err(|| ErrorKind::IndexWriteFailure(format!("{:?}", self.db.path())))
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.db
            .get(key)
            .chain_err(|| ErrorKind::IndexReadFailure(hex::encode(key)))
    }

    pub fn flush(&self) -> Result<()> {
        if self.read_only {
            return Ok(());
        }
        self.db
            .flush()
            .chain_err(|| ErrorKind::IndexWriteFailure("flush failed".to_string()))
    }

    fn verify_compatibility(&self) -> Result<()> {
        let compatibility_bytes = bincode::serialize_little(&DB_VERSION)
            .chain_err(|| "failed to serialize DB version")?;

        match self.get(b"V")? {
            None if self.read_only => Ok(()),
            None => self.write(
                vec![DBRow {
                    key: b"V".to_vec(),
                    value: compatibility_bytes,
                }],
                DBFlush::Enable,
            ),
            Some(ref x) if x != &compatibility_bytes => bail!(ErrorKind::IncompatibleDatabase),
            Some(_) => Ok(()),
        }
    }
}

fn db_options() -> rocksdb::Options {
    let mut db_opts = rocksdb::Options::default();
    db_opts.create_if_missing(true);
    db_opts.set_max_open_files(1_000);
    db_opts.set_compaction_style(rocksdb::DBCompactionStyle::Level);
    db_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
    db_opts.set_write_buffer_size(64 << 20);

    let mut block_opts = rocksdb::BlockBasedOptions::default();
    block_opts.set_block_size(64 << 10);
    db_opts.set_block_based_table_factory(&block_opts);
    db_opts
}
