//! Domain primitives shared by the credsync cache and agent.

pub mod errors;
pub mod labels;
pub mod lister;
pub mod store;
pub mod types;

pub use errors::{Error, Result};
pub use labels::{Labels, Selector};
pub use lister::{Lister, NamespaceLister};
pub use store::{ObjectStore, StoredObject};
pub use types::{Partition, PartitionState};
