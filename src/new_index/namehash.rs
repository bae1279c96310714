use std::path::Path;

use bitcoin::hashes::Hash;
use itertools::Itertools;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec};
use rayon::prelude::*;

use crate::chain::{Block, BlockHash};
use crate::errors::*;
use crate::metrics::{MetricOpts, Metrics};
use crate::names::{encode_name_for_message, name_outputs};
use crate::new_index::db::{DBFlush, DBRow, DB};
use crate::util::{bincode, compute_name_hash, full_hash, Bytes, FullHash};

const DB_HASH: u8 = b'h';
const DB_TIP: &[u8] = b"T";

/// Hooks called by the chain-indexing framework, strictly in chain order and
/// never concurrently for the same index.
pub trait BlockIndex {
    fn name(&self) -> &'static str;

    /// Whether the index can cope with block data being pruned away.
    fn allow_prune(&self) -> bool;

    fn connect_block(&self, block: &Block, height: u32) -> Result<()>;

    fn disconnect_block(&self, block: &Block, height: u32) -> Result<()>;
}

/// Last block handed to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexTip {
    #[serde(rename = "best_block_height")]
    pub height: u32,
    #[serde(rename = "best_block_hash")]
    pub hash: BlockHash,
}

#[derive(Serialize, Deserialize)]
struct TipValue {
    height: u32,
    hash: FullHash,
}

impl IndexTip {
    fn into_row(self) -> Result<DBRow> {
        let value = TipValue {
            height: self.height,
            hash: self.hash.into_inner(),
        };
        Ok(DBRow {
            key: DB_TIP.to_vec(),
            value: bincode::serialize_little(&value).chain_err(|| "failed to serialize tip")?,
        })
    }

    fn from_value(value: &[u8]) -> Result<IndexTip> {
        let value: TipValue =
            bincode::deserialize_little(value).chain_err(|| "failed to parse tip")?;
        Ok(IndexTip {
            height: value.height,
            hash: BlockHash::from_inner(value.hash),
        })
    }
}

struct NameHashRow {
    hash: FullHash,
    name: Bytes,
}

impl NameHashRow {
    fn key(hash: &FullHash) -> Bytes {
        [&[DB_HASH][..], &hash[..]].concat()
    }

    fn into_row(self) -> DBRow {
        DBRow {
            key: NameHashRow::key(&self.hash),
            value: self.name,
        }
    }
}

/// Maps the SHA-256d hash of every registered name to the name itself, so
/// that a node can be asked about a name without learning it unless it exists.
///
/// Entries only ever go from unknown to known. Disconnecting a block leaves
/// everything it introduced in place, and the index never allows pruning:
/// "not found" must only ever mean "never registered".
pub struct NameHashIndex {
    db: DB,

    blocks: IntCounterVec,
    entries: IntCounter,
    latency: HistogramVec,
}

impl NameHashIndex {
    pub fn open(path: &Path, metrics: &Metrics) -> Result<Self> {
        Ok(NameHashIndex::new(DB::open(path)?, metrics))
    }

    /// Opens the index for lookups only, e.g. from a separate query process.
    pub fn open_read_only(path: &Path, metrics: &Metrics) -> Result<Self> {
        Ok(NameHashIndex::new(DB::open_read_only(path)?, metrics))
    }

    fn new(db: DB, metrics: &Metrics) -> Self {
        NameHashIndex {
            db,
            blocks: metrics.counter_vec(
                MetricOpts::new("namehash_blocks", "# of blocks seen by the name-hash index"),
                &["type"],
            ),
            entries: metrics.counter(MetricOpts::new(
                "namehash_entries",
                "# of name-hash entries written",
            )),
            latency: metrics.histogram_vec(
                HistogramOpts::new(
                    "namehash_latency",
                    "Name-hash index latency (in seconds)",
                ),
                &["part"],
            ),
        }
    }

    /// Looks up the name whose hash is `hash`. `None` means the name was
    /// never registered in a block seen by this index.
    pub fn find_name_preimage(&self, hash: &FullHash) -> Result<Option<Bytes>> {
        let _timer = self.latency.with_label_values(&["lookup"]).start_timer();
        self.db.get(&NameHashRow::key(hash))
    }

    pub fn tip(&self) -> Result<Option<IndexTip>> {
        match self.db.get(DB_TIP)? {
            Some(value) => Ok(Some(IndexTip::from_value(&value)?)),
            None => Ok(None),
        }
    }

    /// The tip as `{"best_block_height", "best_block_hash"}`, or `{}` if no
    /// block was connected yet.
    pub fn info(&self) -> Result<serde_json::Value> {
        match self.tip()? {
            Some(tip) => serde_json::to_value(tip).chain_err(|| "failed to serialize tip"),
            None => Ok(json!({})),
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()
    }
}

/// `(hash, name)` for every name registered in `block`, in block order and
/// without duplicates.
fn block_registrations(block: &Block) -> Vec<(FullHash, Bytes)> {
    block
        .txdata
        .par_iter()
        .map(|tx| {
            name_outputs(tx)
                .filter(|(_, op)| op.is_register())
                .map(|(_, op)| (compute_name_hash(&op.name), op.name))
                .collect::<Vec<_>>()
        })
        .flatten()
        .collect::<Vec<_>>()
        .into_iter()
        .unique_by(|(hash, _)| *hash)
        .collect()
}

impl BlockIndex for NameHashIndex {
    fn name(&self) -> &'static str {
        "namehash"
    }

    fn allow_prune(&self) -> bool {
        false
    }

    fn connect_block(&self, block: &Block, height: u32) -> Result<()> {
        let _timer = self.latency.with_label_values(&["connect"]).start_timer();
        let blockhash = block.block_hash();

        let registrations = block_registrations(block);
        for (_, name) in &registrations {
            trace!("indexing name {}", encode_name_for_message(name));
        }
        debug!(
            "indexing {} names from block {} at height {}",
            registrations.len(),
            blockhash,
            height
        );

        let count = registrations.len() as u64;
        let mut rows: Vec<DBRow> = registrations
            .into_iter()
            .map(|(hash, name)| NameHashRow { hash, name }.into_row())
            .collect();
        rows.push(
            IndexTip {
                height,
                hash: blockhash,
            }
            .into_row()?,
        );

        // entries and tip go into the same batch
        self.db.write(rows, DBFlush::Disable)?;

        self.entries.inc_by(count);
        self.blocks.with_label_values(&["connected"]).inc();
        Ok(())
    }

    fn disconnect_block(&self, block: &Block, height: u32) -> Result<()> {
        debug!(
            "disconnecting block {} at height {}, name hashes are kept",
            block.block_hash(),
            height
        );
        self.blocks.with_label_values(&["disconnected"]).inc();

        let height = match height.checked_sub(1) {
            Some(height) => height,
            None => return Ok(()),
        };
        let tip = IndexTip {
            height,
            hash: block.header.prev_blockhash,
        };
        self.db.write(vec![tip.into_row()?], DBFlush::Disable)
    }
}

/// Parses a hex-encoded name hash. The digest is taken in its natural byte
/// order, not reversed like block hashes are for display.
pub fn parse_name_hash(text: &str) -> Result<FullHash> {
    let bytes = hex::decode(text)
        .chain_err(|| ErrorKind::InvalidNameHash(format!("{} is not a hex string", text)))?;
    if bytes.len() != 32 {
        bail!(ErrorKind::InvalidNameHash(format!(
            "hash must be 32 bytes long, got {}",
            bytes.len()
        )));
    }
    Ok(full_hash(&bytes))
}
