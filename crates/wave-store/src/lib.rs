//! # wave-store
//!
//! Contracts for the hosted services Wave runs on, plus local
//! implementations of them.
//!
//! The application never talks to a concrete backend directly: a document
//! store ([`DocumentStore`]), a blob store ([`BlobStore`]) and an identity
//! provider ([`IdentityProvider`]) are handed to the client as trait objects.
//! [`MemoryStore`] and [`FsBlobStore`] implement those contracts locally and
//! back the test-suite.
//!
//! [`RemoteStore`] layers typed CRUD helpers for every domain model on top
//! of a raw [`DocumentStore`].

pub mod blobs;
pub mod chats;
pub mod document;
pub mod identity;
pub mod memory;
pub mod messages;
pub mod models;
pub mod query;
pub mod remote;
pub mod store;
pub mod users;

mod error;

pub use blobs::{BlobHandle, BlobStore, FsBlobStore};
pub use document::{Document, Fields};
pub use error::{Result, StoreError};
pub use identity::{IdentityProvider, SessionIdentity};
pub use memory::{MemoryStore, Op};
pub use models::*;
pub use query::{Direction, Filter, Query};
pub use remote::RemoteStore;
pub use store::{DocumentStore, Snapshot, Subscription, Watch, WriteMode};
