//! Install logic.

pub mod backend;
pub mod checksum;
pub mod error;
pub mod fetch;
pub mod file_lock;
pub mod history;
pub mod installer;
pub mod link;
pub mod metadata;
pub mod paths;
pub mod pip;
pub mod template;
pub mod unpack;
pub mod verify;
