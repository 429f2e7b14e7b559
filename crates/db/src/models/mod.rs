pub mod stage_log;
