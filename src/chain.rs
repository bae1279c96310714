pub use bitcoin::{
    blockdata::{opcodes, script},
    consensus::deserialize,
    hashes, Block, BlockHash, BlockHeader, OutPoint, Script, Transaction, TxIn, TxOut, Txid,
};

#[derive(Debug, Copy, Clone, PartialEq, Hash, Serialize, Ord, PartialOrd, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    pub fn is_regtest(self) -> bool {
        matches!(self, Network::Regtest)
    }

    /// Subdirectory of the data directory holding this network's indexes.
    pub fn subdir(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }

    pub fn names() -> Vec<String> {
        vec![
            "mainnet".to_string(),
            "testnet".to_string(),
            "regtest".to_string(),
        ]
    }
}

impl From<&str> for Network {
    fn from(network_name: &str) -> Self {
        match network_name {
            "mainnet" => Network::Mainnet,
            "testnet" => Network::Testnet,
            "regtest" => Network::Regtest,

            _ => panic!("unsupported network: {:?}", network_name),
        }
    }
}
