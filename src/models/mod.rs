pub mod credential;
pub mod enums;
pub mod job;
pub mod job_summary;
