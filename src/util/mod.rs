//! Some utility modules live here. See individual sub-modules for more info.

pub mod events;
pub mod errors;
pub mod ser;

pub(crate) mod byte_utils;

#[macro_use]
pub(crate) mod macro_logger;

// These have to come after macro_logger to build
pub mod logger;

#[cfg(test)]
pub(crate) mod test_utils;
