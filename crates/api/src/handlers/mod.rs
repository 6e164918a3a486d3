pub mod index;
pub mod jobs;
