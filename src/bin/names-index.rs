#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;

extern crate namesindex;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process;

use error_chain::ChainedError;
use serde_json::{Map, Value};

use namesindex::{
    chain::{deserialize, Block},
    config::Config,
    errors::*,
    metrics::Metrics,
    names::add_encoded_name,
    new_index::{parse_name_hash, BlockIndex, NameHashIndex},
};

fn index_blocks(index: &NameHashIndex, path: &Path) -> Result<()> {
    let file = File::open(path).chain_err(|| format!("failed to open {:?}", path))?;
    let mut height = 0;
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.chain_err(|| format!("failed to read {:?}", path))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let bytes =
            hex::decode(line).chain_err(|| format!("invalid hex on line {}", lineno + 1))?;
        let block: Block =
            deserialize(&bytes).chain_err(|| format!("invalid block on line {}", lineno + 1))?;
        index.connect_block(&block, height)?;
        height += 1;
    }
    index.flush()?;
    info!("indexed {} blocks from {:?}", height, path);
    Ok(())
}

fn lookup(index: &NameHashIndex, hash: &str, config: &Config) -> Result<Value> {
    let hash = parse_name_hash(hash)?;
    let name = index
        .find_name_preimage(&hash)?
        .chain_err(|| "name hash not found")?;

    let mut obj = Map::new();
    obj.insert("hash".to_string(), Value::String(hex::encode(hash)));
    add_encoded_name(&mut obj, "name", &name, config.encodings.name);
    Ok(Value::Object(obj))
}

fn run_server(config: &Config) -> Result<()> {
    let metrics = Metrics::new(config.monitoring_addr);
    metrics.start()?;

    if !config.namehash_index {
        if config.blocks_file.is_some() || config.lookup.is_some() {
            bail!(ErrorKind::IndexDisabled);
        }
        info!("namehash index is not enabled, nothing to do");
        return Ok(());
    }

    let path = config.namehash_path();
    let index = match config.blocks_file {
        Some(ref blocks) => {
            let index = NameHashIndex::open(&path, &metrics)?;
            index_blocks(&index, blocks)?;
            index
        }
        None => NameHashIndex::open_read_only(&path, &metrics)?,
    };

    if let Some(ref hash) = config.lookup {
        println!("{}", lookup(&index, hash, config)?);
    }
    println!("{}", index.info()?);
    Ok(())
}

fn main() {
    let config = match Config::from_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.display_chain());
            process::exit(1);
        }
    };
    debug!("{:?}", config);
    if let Err(e) = run_server(&config) {
        error!("server failed: {}", e.display_chain());
        process::exit(1);
    }
}
