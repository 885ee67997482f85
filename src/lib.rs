//! pdf-cropper
//!
//! Extracts rectangular regions ("crops") of existing PDF pages and
//! assembles them into a new PDF, optionally rotating each result:
//! - fractional margins per region, in the screen convention used by
//!   selection UIs (split a two-column scan into two pages, trim margins)
//! - many crops per source page, sharing the page's content rather than
//!   duplicating it
//! - interchangeable PDF backends (`lopdf` by default, `qpdf` behind the
//!   `backend-qpdf` feature), chosen explicitly at construction
//!
//! ```no_run
//! use pdf_cropper::{Backend, BackendChoice, CropMargins, Rotation};
//!
//! # fn main() -> pdf_cropper::Result<()> {
//! let backend = Backend::new(BackendChoice::Auto)?;
//! let document = backend.load_from_path("scan.pdf")?;
//!
//! let mut writer = backend.writer()?;
//! // left and right halves of page 1, as two output pages
//! let halves = [
//!     CropMargins::new(0.0, 0.0, 0.5, 0.0),
//!     CropMargins::new(0.5, 0.0, 0.0, 0.0),
//! ];
//! writer.add_page_cropped(&document, 1, &halves, Rotation::None)?;
//! writer.write_to_path("split.pdf")?;
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(feature = "backend-lopdf", feature = "backend-qpdf")))]
compile_error!(
    "no usable PDF backend: enable `backend-lopdf` (default) or `backend-qpdf`"
);

pub mod backend;
pub mod error;
pub mod geom;
mod limits;

pub use backend::{Backend, BackendChoice, BackendKind, CropWriter, Document};
pub use error::{Error, Result};
pub use geom::{CropMargins, PageBoxes, Rect, Rotation};
