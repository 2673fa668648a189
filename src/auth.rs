//! Auth-domain identifiers, client credentials, and the singleton credential model.

pub mod client;
pub mod id;
pub mod token;

pub use client::*;
pub use id::*;
pub use token::{credential::*, secret::*};
