//! Token-domain models: redacted secrets, cached token records, and the exchange credential.

pub mod credential;
pub mod record;
pub mod secret;

pub use credential::*;
pub use record::*;
pub use secret::*;
