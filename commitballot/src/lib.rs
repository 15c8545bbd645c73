#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

mod audit;
mod ballot;
mod commitment;
mod config;
mod election;
mod error;
mod protocol;
mod record;
mod store;
mod tally;

pub use audit::*;
pub use ballot::*;
pub use commitment::*;
pub use config::*;
pub use election::*;
pub use error::*;
pub use protocol::*;
pub use record::*;
pub use store::*;
pub use tally::*;
