#![crate_name = "lightning_prob"]

//! Probabilistic one-satoshi payments over a two-party payment channel.
//!
//! Implements the four-message push protocol in which a sender commits one
//! satoshi with probability 1/N by having the counterparty stake N candidate
//! outcomes, plus the witness scripts which make the outcomes enforceable
//! on-chain. Does most of the hard work, without implying a specific runtime,
//! requiring clients implement the network transport, chain interactions and
//! disk storage.

#![cfg_attr(not(test), deny(missing_docs))]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]

#![forbid(unsafe_code)]

extern crate bitcoin;
#[cfg(test)] extern crate hex;

#[macro_use]
pub mod util;
pub mod chain;
pub mod ln;
