pub mod amend;
pub mod init;
pub mod plan;
pub mod platform;
pub mod status;
pub mod sync;
pub mod task;
