pub mod binder;
pub mod identity;
pub mod markers;
pub mod normalize;
pub mod page_store;
pub mod process;
pub mod sanitize;
pub mod segment;
#[cfg(test)]
mod tests;

pub use binder::{DirectoryNamespace, MemoryNamespace, OutputNamespace, placement_rect};
pub use page_store::PageTextStore;
pub use process::{LabelPipeline, ProcessMode, process};
