//! Deterministic spec hashing and HMAC-signed verification receipts.
//!
//! Hashing and canonicalization follow a `canonicalize`/`compute_hash`/
//! `verify_hash` shape; signing pairs `hmac` with `sha2` on top of that.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod error;
mod hash;
mod key;
mod sign;

pub use builder::ReceiptBuilder;
pub use error::ReceiptError;
pub use hash::{canonicalize, compute_hash, compute_spec_hash};
pub use key::load_or_create_signing_key;
pub use sign::{sign_receipt, verify_receipt};
