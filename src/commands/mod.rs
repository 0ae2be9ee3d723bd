pub mod annotate;
pub mod profile;
pub mod scan;
pub mod split;

mod report;
mod source;
