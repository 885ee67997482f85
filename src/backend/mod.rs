//! Backend abstraction over interchangeable PDF libraries.
//!
//! Two structurally equivalent backends implement the reader/writer pair:
//! `lopdf` (pure Rust, the preferred default) and `qpdf` (vendored FFI).
//! The backend is chosen once, by an explicit [`BackendChoice`] passed to
//! [`Backend::new`]; documents and writers are tagged variants, so a
//! document can only be cropped by a writer from the same backend.

#[cfg(feature = "backend-lopdf")]
mod lopdf_impl;
#[cfg(feature = "backend-qpdf")]
mod qpdf_impl;

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geom::{CropMargins, PageBoxes, Rect, Rotation};
#[cfg(feature = "backend-lopdf")]
use crate::limits;

/// Configuration toggle selecting the PDF library to use.
///
/// `Auto` probes compiled-in backends in fixed preference order
/// (lopdf first, then qpdf).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    #[default]
    Auto,
    Lopdf,
    Qpdf,
}

impl std::str::FromStr for BackendChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(BackendChoice::Auto),
            "lopdf" => Ok(BackendChoice::Lopdf),
            "qpdf" => Ok(BackendChoice::Qpdf),
            other => Err(Error::MissingBackend {
                reason: format!("unknown backend '{other}' (expected auto, lopdf, or qpdf)"),
            }),
        }
    }
}

impl std::fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BackendChoice::Auto => "auto",
            BackendChoice::Lopdf => "lopdf",
            BackendChoice::Qpdf => "qpdf",
        })
    }
}

/// The concrete backend a [`Backend`], [`Document`], or [`CropWriter`]
/// is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Lopdf,
    Qpdf,
}

impl BackendKind {
    /// Stable lowercase name, used in errors and logs.
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Lopdf => "lopdf",
            BackendKind::Qpdf => "qpdf",
        }
    }

    /// Whether this backend was compiled in.
    pub fn available(self) -> bool {
        match self {
            BackendKind::Lopdf => cfg!(feature = "backend-lopdf"),
            BackendKind::Qpdf => cfg!(feature = "backend-qpdf"),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Entry point bound to one concrete PDF library.
///
/// Resolved once at construction; there is no ambient global state.
#[derive(Debug, Clone, Copy)]
pub struct Backend {
    kind: BackendKind,
}

impl Backend {
    /// Resolve `choice` against the compiled-in backends.
    ///
    /// # Errors
    ///
    /// [`Error::MissingBackend`] when the named backend is not compiled in,
    /// or when `Auto` finds none at all.
    pub fn new(choice: BackendChoice) -> Result<Self> {
        let kind = match choice {
            BackendChoice::Auto => {
                if BackendKind::Lopdf.available() {
                    BackendKind::Lopdf
                } else if BackendKind::Qpdf.available() {
                    BackendKind::Qpdf
                } else {
                    return Err(Error::MissingBackend {
                        reason: "no backend features enabled".into(),
                    });
                }
            }
            BackendChoice::Lopdf => BackendKind::Lopdf,
            BackendChoice::Qpdf => BackendKind::Qpdf,
        };
        if !kind.available() {
            return Err(Error::MissingBackend {
                reason: format!("{kind} backend not compiled in"),
            });
        }
        Ok(Self { kind })
    }

    /// The resolved backend.
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Parse a PDF from a byte slice.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] when the bytes are not a well-formed PDF; no
    /// partial document is returned.
    pub fn load_from_bytes(&self, bytes: &[u8]) -> Result<Document> {
        let inner = match self.kind {
            #[cfg(feature = "backend-lopdf")]
            BackendKind::Lopdf => SourceInner::Lopdf(lopdf_impl::LopdfSource::load(bytes)?),
            #[cfg(feature = "backend-qpdf")]
            BackendKind::Qpdf => SourceInner::Qpdf(qpdf_impl::QpdfSource::load(bytes)?),
            #[allow(unreachable_patterns)]
            kind => {
                return Err(Error::MissingBackend {
                    reason: format!("{kind} backend not compiled in"),
                })
            }
        };
        let document = Document { inner };
        debug!(
            backend = self.kind.name(),
            pages = document.page_count(),
            "PDF loaded"
        );
        Ok(document)
    }

    /// Read a PDF from an arbitrary stream.
    pub fn load_from_reader<R: Read>(&self, reader: &mut R) -> Result<Document> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.load_from_bytes(&bytes)
    }

    /// Open `path` as a scoped file handle and parse it.
    pub fn load_from_path<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let mut file = File::open(path)?;
        self.load_from_reader(&mut file)
    }

    /// Create an empty output writer for this backend.
    pub fn writer(&self) -> Result<CropWriter> {
        let inner = match self.kind {
            #[cfg(feature = "backend-lopdf")]
            BackendKind::Lopdf => WriterInner::Lopdf(lopdf_impl::LopdfCropper::new()),
            #[cfg(feature = "backend-qpdf")]
            BackendKind::Qpdf => WriterInner::Qpdf(qpdf_impl::QpdfCropper::new()),
            #[allow(unreachable_patterns)]
            kind => {
                return Err(Error::MissingBackend {
                    reason: format!("{kind} backend not compiled in"),
                })
            }
        };
        Ok(CropWriter {
            inner,
            strict: false,
        })
    }
}

enum SourceInner {
    #[cfg(feature = "backend-lopdf")]
    Lopdf(lopdf_impl::LopdfSource),
    #[cfg(feature = "backend-qpdf")]
    Qpdf(qpdf_impl::QpdfSource),
}

/// A parsed source document: an ordered page collection, read-only.
///
/// Pages are addressed by 1-based index. Cropping never mutates the
/// source, so one document can feed any number of writers.
pub struct Document {
    inner: SourceInner,
}

impl Document {
    /// Backend this document was parsed by.
    pub fn backend(&self) -> BackendKind {
        match &self.inner {
            #[cfg(feature = "backend-lopdf")]
            SourceInner::Lopdf(_) => BackendKind::Lopdf,
            #[cfg(feature = "backend-qpdf")]
            SourceInner::Qpdf(_) => BackendKind::Qpdf,
        }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        match &self.inner {
            #[cfg(feature = "backend-lopdf")]
            SourceInner::Lopdf(source) => source.page_count(),
            #[cfg(feature = "backend-qpdf")]
            SourceInner::Qpdf(source) => source.page_count(),
        }
    }

    /// Boundary boxes of the page at 1-based `page`.
    ///
    /// # Errors
    ///
    /// [`Error::PageOutOfBounds`] outside `[1, page_count]`.
    pub fn page_boxes(&self, page: usize) -> Result<PageBoxes> {
        self.check_page(page)?;
        match &self.inner {
            #[cfg(feature = "backend-lopdf")]
            SourceInner::Lopdf(source) => source.page_boxes(page),
            #[cfg(feature = "backend-qpdf")]
            SourceInner::Qpdf(source) => source.page_boxes(page),
        }
    }

    /// Effective `/Rotate` value (degrees clockwise) of the page at
    /// 1-based `page`; 0 when unset.
    pub fn page_rotation(&self, page: usize) -> Result<i64> {
        self.check_page(page)?;
        match &self.inner {
            #[cfg(feature = "backend-lopdf")]
            SourceInner::Lopdf(source) => source.page_rotation(page),
            #[cfg(feature = "backend-qpdf")]
            SourceInner::Qpdf(source) => source.page_rotation(page),
        }
    }

    fn check_page(&self, page: usize) -> Result<()> {
        let total = self.page_count();
        if page == 0 || page > total {
            return Err(Error::PageOutOfBounds { page, total });
        }
        Ok(())
    }
}

enum WriterInner {
    #[cfg(feature = "backend-lopdf")]
    Lopdf(lopdf_impl::LopdfCropper),
    #[cfg(feature = "backend-qpdf")]
    Qpdf(qpdf_impl::QpdfCropper),
}

impl WriterInner {
    fn kind(&self) -> BackendKind {
        match self {
            #[cfg(feature = "backend-lopdf")]
            WriterInner::Lopdf(_) => BackendKind::Lopdf,
            #[cfg(feature = "backend-qpdf")]
            WriterInner::Qpdf(_) => BackendKind::Qpdf,
        }
    }
}

/// Accumulates cropped pages and serializes them as a new PDF.
///
/// Output order is exactly call order: every [`add_page_cropped`] call
/// appends its regions left to right, across any number of source
/// documents. Not safe for concurrent use; one writer per logical output.
///
/// [`add_page_cropped`]: CropWriter::add_page_cropped
pub struct CropWriter {
    inner: WriterInner,
    strict: bool,
}

impl CropWriter {
    /// Backend this writer emits through.
    pub fn backend(&self) -> BackendKind {
        self.inner.kind()
    }

    /// Opt into rejecting margins that collapse or invert a page.
    ///
    /// Off by default: degenerate geometry is propagated silently, matching
    /// the behavior selection UIs have historically relied on.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        match &self.inner {
            #[cfg(feature = "backend-lopdf")]
            WriterInner::Lopdf(cropper) => cropper.page_count(),
            #[cfg(feature = "backend-qpdf")]
            WriterInner::Qpdf(cropper) => cropper.page_count(),
        }
    }

    /// Append one cropped clone of `document`'s page per entry in `crops`.
    ///
    /// For each margin set, in order: the source page is cloned, all five
    /// boundary boxes of the clone are rewritten to the cropped rectangle
    /// (computed from the page's MediaBox), `rotation` is composed into the
    /// clone's `/Rotate`, and the clone is appended to the output. An empty
    /// `crops` slice is a strict no-op. The source document is never
    /// modified.
    ///
    /// # Errors
    ///
    /// [`Error::PageOutOfBounds`] for an invalid `page`,
    /// [`Error::BackendMismatch`] when `document` belongs to the other
    /// backend, and [`Error::DegenerateCrop`] in strict mode - all raised
    /// before anything is appended.
    pub fn add_page_cropped(
        &mut self,
        document: &Document,
        page: usize,
        crops: &[CropMargins],
        rotation: Rotation,
    ) -> Result<()> {
        if crops.is_empty() {
            return Ok(());
        }

        let boxes = document.page_boxes(page)?;
        let rotate = rotation.compose(document.page_rotation(page)?);

        // Compute every rectangle up front so strict-mode failures leave
        // the output sequence untouched.
        let mut rects: Vec<Rect> = Vec::with_capacity(crops.len());
        for margins in crops {
            let rect = margins.apply_to(boxes.media);
            if self.strict && rect.is_degenerate() {
                return Err(Error::DegenerateCrop { page });
            }
            rects.push(rect);
        }

        match (&mut self.inner, &document.inner) {
            #[cfg(feature = "backend-lopdf")]
            (WriterInner::Lopdf(cropper), SourceInner::Lopdf(source)) => {
                for rect in &rects {
                    cropper.append_clone(source, page, *rect, rotate)?;
                }
            }
            #[cfg(feature = "backend-qpdf")]
            (WriterInner::Qpdf(cropper), SourceInner::Qpdf(source)) => {
                for rect in &rects {
                    cropper.append_clone(source, page, *rect, rotate)?;
                }
            }
            #[cfg(all(feature = "backend-lopdf", feature = "backend-qpdf"))]
            (writer_inner, _) => {
                return Err(Error::BackendMismatch {
                    document: document.backend().name(),
                    writer: writer_inner.kind().name(),
                })
            }
        }

        debug!(
            page,
            regions = crops.len(),
            rotate,
            total = self.page_count(),
            "page cropped into output"
        );
        Ok(())
    }

    /// Serialize the accumulated pages into a byte vector.
    ///
    /// Runs under the enlarged-stack serialization guard where the backend
    /// library traverses object graphs on the Rust stack.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let bytes = match &mut self.inner {
            #[cfg(feature = "backend-lopdf")]
            WriterInner::Lopdf(cropper) => limits::with_enlarged_stack(|| cropper.to_bytes())?,
            // qpdf serializes inside the C++ library; no Rust-stack traversal.
            #[cfg(feature = "backend-qpdf")]
            WriterInner::Qpdf(cropper) => cropper.to_bytes()?,
        };
        info!(
            pages = self.page_count(),
            bytes = bytes.len(),
            "output PDF serialized"
        );
        Ok(bytes)
    }

    /// Serialize into `sink`.
    ///
    /// # Errors
    ///
    /// [`Error::Serialization`] on structural failure, [`Error::Io`] on sink
    /// failure; on error the sink contents are undefined and should be
    /// discarded.
    pub fn write_to<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        sink.write_all(&bytes)?;
        Ok(())
    }

    /// Create `path` as a scoped file handle and serialize into it.
    pub fn write_to_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        self.write_to(&mut file)
    }
}
