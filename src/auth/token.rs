//! Bearer token model and the redacting secret wrapper it is built on.

pub mod bearer;
pub mod secret;
