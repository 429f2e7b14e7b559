pub mod stage_log_repo;

pub use stage_log_repo::StageLogRepo;
