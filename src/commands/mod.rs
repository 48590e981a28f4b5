pub mod common;
pub mod feature;
pub mod init;
pub mod plan;
