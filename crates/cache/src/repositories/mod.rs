pub mod batch_repo;
pub mod queue_repo;

pub use batch_repo::{BatchErrorRepo, BatchProgressRepo};
pub use queue_repo::QueueRepo;
