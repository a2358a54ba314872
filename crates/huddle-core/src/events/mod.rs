//! Change events published by write transactions and consumed by the
//! realtime fan-out.

pub mod change;

pub use change::{ChangeEvent, ChangeKind};
