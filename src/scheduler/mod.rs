pub mod batch_scheduler;

pub use batch_scheduler::{run_batches, BatchProgress};
