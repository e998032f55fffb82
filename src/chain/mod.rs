//! Module provides structs and traits which allow other structs to interact with the blockchain
//! and the key material which commits to it.

pub mod keysinterface;
pub mod transaction;
