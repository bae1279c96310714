#![recursion_limit = "1024"]

extern crate rocksdb;

#[macro_use]
extern crate clap;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;

pub mod chain;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod names;
pub mod new_index;
pub mod util;
