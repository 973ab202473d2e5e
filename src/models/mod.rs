pub mod image;
pub mod job;
pub mod search;
