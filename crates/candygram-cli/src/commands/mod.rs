pub mod host;
pub mod init;
pub mod read;
pub mod show_key;
pub mod write;
