//! Shared foundations for the cryfs storage stack.
//!
//! This crate collects everything the block store layers and the config
//! subsystem both need but that is not block-store specific:
//!
//! - [`data`]: owned byte buffers, fixed-size byte arrays with a hex codec,
//!   and a small binary serializer for on-disk records
//! - [`random`]: OS and pseudo randomness behind an object-safe trait
//! - [`crypto`]: the symmetric cipher family and the scrypt KDF
//! - [`thread`]: managed worker threads with stop/restart around `fork()`
//! - [`console`]: the interactive/noninteractive console abstraction

pub mod console;
pub mod crypto;
pub mod data;
pub mod random;
pub mod thread;

pub use data::{Data, FixedSizeData};
