//! The Strand federation protocol core.
//!
//! [`Dispatcher::receive`] is the single inbound entry point: it decodes one
//! XML document, checks the claimed sender against the embedded author, and
//! applies the message at most once. The handshake operations for local users
//! ([`Dispatcher::send_request`], [`Dispatcher::accept_request`],
//! [`Dispatcher::ignore_request`]) and [`outbound::serialize`] cover the
//! outbound direction.
//!
//! All persistence goes through [`strand_core::store::FederationStore`].

mod content;
pub mod dispatch;
pub mod error;
mod handshake;
pub mod locks;
pub mod outbound;
pub mod profile;
pub mod registry;
pub mod resolver;
pub mod retraction;

pub use dispatch::{Applied, DispatchConfig, Dispatcher, Outcome};
pub use error::{Error, Result};
pub use resolver::{IdentityLookup, IdentityResolver, NoLookup, RemoteIdentity};
pub use retraction::ContactRetraction;
