pub mod editor;
pub mod qr;

pub use editor::{PdfEditor, save_new_document};
#[cfg(test)]
pub(crate) use editor::sample_document;
pub use qr::render_qr;
