//! One-time secret exchange.
//!
//! ## Key splitting
//!
//! Each secret is encrypted under 16 random characters of signing material.
//! The first 6 travel inside the token together with the public lookup key;
//! the remaining 10 stay in storage. Neither the token holder nor the storage
//! operator alone can decrypt a record.
//!
//! ## Retrieval
//!
//! ```text
//! token --decode--> lookup key + exposed part
//!       --find--> record --expiry/passphrase gate--> decrypt --guarded delete--> message
//! ```
//!
//! Every "cannot give you this secret" outcome (absent, expired, consumed,
//! wrong or missing passphrase) is reported as [`SecretError::NotFound`].

pub mod clock;
pub mod error;
pub mod service;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SecretError, SecretResult};
pub use service::{CreatedSecret, RevealedSecret, SecretLimits, SecretService};
pub use token::{PublicToken, ServerRemainder};
