//! Live subscription management — handles and the registry.

pub mod handle;
pub mod registry;

pub use handle::{SubscriptionHandle, SubscriptionId};
pub use registry::SubscriptionRegistry;
