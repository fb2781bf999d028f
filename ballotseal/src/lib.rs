//! Vote encryption and threshold key custody for an e-voting platform.
//!
//! Ballots are sealed with ephemeral AES-256-CBC keys wrapped by an election RSA key
//! (RSA-OAEP/SHA-256). The election private key is split among custodians with Shamir secret
//! sharing and only reconstructed, under audit, for the length of a tally session.

#[macro_use]
extern crate serde;

mod audit;
mod config;
mod custody;
mod error;
mod integrity;
mod keygen;
mod offline;
mod receipt;
mod secret_share;
mod serde_wire;
mod store;
mod tally;
mod util;
mod vote;

pub use audit::*;
pub use config::*;
pub use custody::*;
pub use error::*;
pub use integrity::*;
pub use keygen::*;
pub use offline::*;
pub use receipt::*;
pub use secret_share::{deal_secret_shares, recover_secret_shares, KeyShare};
pub use serde_wire::*;
pub use store::*;
pub use tally::*;
pub use util::*;
pub use vote::*;

pub(crate) use secret_share::{combine_private_key, split_private_key};

#[cfg(test)]
mod tests;
