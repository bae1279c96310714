use std::sync::Arc;
use std::thread;

use bitcoin::TxMerkleNode;

use namesindex::chain::hashes::Hash;
use namesindex::chain::{script::Builder, Block, BlockHash, BlockHeader, Script, Transaction, TxOut};
use namesindex::errors::ErrorKind;
use namesindex::metrics::Metrics;
use namesindex::names::{build_name_script, encode_name, NameEncoding, NameOpKind, NameScript};
use namesindex::new_index::{BlockIndex, NameHashIndex};
use namesindex::util::compute_name_hash;

fn owner() -> Script {
    Builder::new()
        .push_int(0)
        .push_slice(&[0x42; 20])
        .into_script()
}

fn name_tx(kind: NameOpKind, name: &str, value: &str) -> Transaction {
    Transaction {
        version: 0x7100,
        lock_time: 0,
        input: vec![],
        output: vec![
            TxOut {
                value: 50_000,
                script_pubkey: owner(),
            },
            TxOut {
                value: 1_000_000,
                script_pubkey: build_name_script(kind, name.as_bytes(), value.as_bytes(), &owner()),
            },
        ],
    }
}

fn make_block(prev: BlockHash, nonce: u32, txdata: Vec<Transaction>) -> Block {
    Block {
        header: BlockHeader {
            version: 1,
            prev_blockhash: prev,
            merkle_root: TxMerkleNode::from_inner([0; 32]),
            time: 1_600_000_000 + nonce,
            bits: 0x207fffff,
            nonce,
        },
        txdata,
    }
}

fn genesis() -> BlockHash {
    BlockHash::from_inner([0; 32])
}

#[test]
fn test_register_roundtrip_and_index() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = Metrics::new(None);
    let index = NameHashIndex::open(dir.path(), &metrics).unwrap();

    let tx = name_tx(NameOpKind::Register, "d/example", "{}");
    let op = NameScript::parse(&tx.output[1].script_pubkey)
        .into_op()
        .unwrap();
    let again = NameScript::parse(&op.to_script()).into_op().unwrap();
    assert_eq!(again.name, b"d/example");
    assert_eq!(again.value, b"{}");
    assert_eq!(encode_name(&again.name, NameEncoding::Ascii).unwrap(), "d/example");

    let block = make_block(genesis(), 1, vec![tx]);
    index.connect_block(&block, 1).unwrap();

    let hash = compute_name_hash(b"d/example");
    assert_eq!(
        index.find_name_preimage(&hash).unwrap(),
        Some(b"d/example".to_vec())
    );
    assert!(metrics.gather().unwrap().contains("namehash_entries 1"));
}

#[test]
fn test_update_is_not_indexed() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = Metrics::new(None);
    let index = NameHashIndex::open(dir.path(), &metrics).unwrap();

    let block = make_block(
        genesis(),
        1,
        vec![name_tx(NameOpKind::Update, "d/example", "{\"x\":1}")],
    );
    index.connect_block(&block, 1).unwrap();

    assert_eq!(
        index
            .find_name_preimage(&compute_name_hash(b"d/example"))
            .unwrap(),
        None
    );
    assert!(metrics.gather().unwrap().contains("namehash_entries 0"));
    assert_eq!(index.tip().unwrap().unwrap().hash, block.block_hash());
}

#[test]
fn test_disconnect_keeps_entries() {
    let dir = tempfile::tempdir().unwrap();
    let index = NameHashIndex::open(dir.path(), &Metrics::new(None)).unwrap();

    let b1 = make_block(genesis(), 1, vec![name_tx(NameOpKind::Register, "p/alice", "{}")]);
    let b2 = make_block(b1.block_hash(), 2, vec![name_tx(NameOpKind::Register, "p/bob", "{}")]);
    index.connect_block(&b1, 1).unwrap();
    index.connect_block(&b2, 2).unwrap();

    index.disconnect_block(&b2, 2).unwrap();
    index.disconnect_block(&b1, 1).unwrap();

    for name in ["p/alice", "p/bob"].iter() {
        assert_eq!(
            index
                .find_name_preimage(&compute_name_hash(name.as_bytes()))
                .unwrap(),
            Some(name.as_bytes().to_vec())
        );
    }
    assert_eq!(index.tip().unwrap().unwrap().height, 0);

    // a competing block registering the same name again is harmless
    let b1b = make_block(genesis(), 3, vec![name_tx(NameOpKind::Register, "p/alice", "{}")]);
    index.connect_block(&b1b, 1).unwrap();
    assert_eq!(
        index
            .find_name_preimage(&compute_name_hash(b"p/alice"))
            .unwrap(),
        Some(b"p/alice".to_vec())
    );
    assert!(!index.allow_prune());
}

#[test]
fn test_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let b1 = make_block(genesis(), 1, vec![name_tx(NameOpKind::Register, "x/persist", "")]);
    {
        let index = NameHashIndex::open(dir.path(), &Metrics::new(None)).unwrap();
        index.connect_block(&b1, 1).unwrap();
        index.flush().unwrap();
    }

    let index = NameHashIndex::open_read_only(dir.path(), &Metrics::new(None)).unwrap();
    assert_eq!(
        index
            .find_name_preimage(&compute_name_hash(b"x/persist"))
            .unwrap(),
        Some(b"x/persist".to_vec())
    );
    assert_eq!(index.tip().unwrap().unwrap().hash, b1.block_hash());
}

#[test]
fn test_write_failure_is_propagated() {
    let dir = tempfile::tempdir().unwrap();
    {
        NameHashIndex::open(dir.path(), &Metrics::new(None)).unwrap();
    }
    let index = NameHashIndex::open_read_only(dir.path(), &Metrics::new(None)).unwrap();

    let block = make_block(genesis(), 1, vec![name_tx(NameOpKind::Register, "x/lost", "")]);
    let err = index.connect_block(&block, 1).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::IndexWriteFailure(_)));
    assert_eq!(
        index
            .find_name_preimage(&compute_name_hash(b"x/lost"))
            .unwrap(),
        None
    );
}

#[test]
fn test_lookups_during_writes() {
    const BLOCKS: u32 = 50;

    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(NameHashIndex::open(dir.path(), &Metrics::new(None)).unwrap());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            thread::spawn(move || loop {
                let height = match index.tip().unwrap() {
                    Some(tip) => tip.height,
                    None => continue,
                };
                // everything up to the visible tip was written in the same batches
                for h in 1..=height {
                    let name = format!("x/{}", h);
                    assert_eq!(
                        index
                            .find_name_preimage(&compute_name_hash(name.as_bytes()))
                            .unwrap(),
                        Some(name.into_bytes())
                    );
                }
                if height == BLOCKS {
                    break;
                }
            })
        })
        .collect();

    let mut prev = genesis();
    for h in 1..=BLOCKS {
        let name = format!("x/{}", h);
        let block = make_block(prev, h, vec![name_tx(NameOpKind::Register, &name, "{}")]);
        index.connect_block(&block, h).unwrap();
        prev = block.block_hash();
    }

    for reader in readers {
        reader.join().unwrap();
    }
}
