pub mod db;
pub mod namehash;

pub use self::db::{DBFlush, DBRow, DB};
pub use self::namehash::{parse_name_hash, BlockIndex, IndexTip, NameHashIndex};
