pub mod error;
pub mod filter;
pub mod memory;
pub mod mongo;
pub mod store;
pub mod update;

pub use error::{StoreError, StoreResult};
pub use filter::match_all_regex;
pub use memory::MemoryStore;
pub use mongo::{MongoConfig, MongoStore};
pub use store::{find_by_id, DocumentStore, Page, UpdateOutcome};
pub use update::{update_and_stamp, update_one, FieldValue, Operation, UpdateRequest};

pub use mongodb::bson;
