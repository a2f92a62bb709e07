//! # valise-shared
//!
//! Types and cryptography shared between the local store and the backup
//! archive engine: service identifiers, the domain content model (message
//! payloads, recipient details, account settings), and the per-frame
//! encryption / stream-MAC primitives used by encrypted archives.

pub mod constants;
pub mod content;
pub mod crypto;
pub mod identifiers;

mod error;

pub use error::{CryptoError, IdentifierError};
pub use identifiers::{Aci, E164, LocalIdentifiers, Pni};
