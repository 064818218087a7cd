pub mod coordinator;

pub use coordinator::{BatchedUpdateCoordinator, FieldUpdates};
