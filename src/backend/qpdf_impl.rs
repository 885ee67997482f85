//! qpdf backend: FFI wrapper over the vendored qpdf library.
//!
//! Mirrors the lopdf backend's reader/writer pair through qpdf's
//! conventions: pages are cloned by copying them into the destination
//! document, and serialization happens inside the C++ library.

use qpdf::{QPdf, QPdfArray, QPdfDictionary, QPdfObject, QPdfObjectLike, QPdfObjectType};

use crate::error::{Error, Result};
use crate::geom::{PageBoxes, Rect};

/// Map qpdf crate errors to our error types
fn map_qpdf_error(e: qpdf::QPdfError) -> Error {
    Error::Parse {
        reason: e.to_string(),
    }
}

/// A parsed source document.
pub(crate) struct QpdfSource {
    /// Raw bytes, reparsed per clone: qpdf caches foreign copies by source
    /// object, so copying one parsed page twice would alias (and `add_page`
    /// rejects duplicates). A fresh parse gives each clone its own identity.
    data: Vec<u8>,
    qpdf: QPdf,
    page_count: usize,
}

impl QpdfSource {
    pub(crate) fn load(bytes: &[u8]) -> Result<Self> {
        let qpdf = QPdf::read_from_memory(bytes).map_err(map_qpdf_error)?;
        let page_count = qpdf.get_num_pages().map_err(map_qpdf_error)? as usize;
        Ok(Self {
            data: bytes.to_vec(),
            qpdf,
            page_count,
        })
    }

    pub(crate) fn page_count(&self) -> usize {
        self.page_count
    }

    fn page(&self, page: usize) -> Result<QPdfObject> {
        if page == 0 || page > self.page_count {
            return Err(Error::PageOutOfBounds {
                page,
                total: self.page_count,
            });
        }
        self.qpdf
            .get_page((page - 1) as u32)
            .ok_or(Error::PageOutOfBounds {
                page,
                total: self.page_count,
            })
    }

    pub(crate) fn page_boxes(&self, page: usize) -> Result<PageBoxes> {
        let page_obj = self.page(page)?;
        let media = inherited_key(&page_obj, "/MediaBox").ok_or_else(|| Error::Parse {
            reason: format!("page {page} has no /MediaBox on the page or its ancestors"),
        })?;
        Ok(PageBoxes {
            media: rect_from_array(&media)?,
            crop: boxed(inherited_key(&page_obj, "/CropBox"))?,
            bleed: boxed(inherited_key(&page_obj, "/BleedBox"))?,
            trim: boxed(inherited_key(&page_obj, "/TrimBox"))?,
            art: boxed(inherited_key(&page_obj, "/ArtBox"))?,
        })
    }

    pub(crate) fn page_rotation(&self, page: usize) -> Result<i64> {
        let page_obj = self.page(page)?;
        match inherited_key(&page_obj, "/Rotate") {
            Some(obj) => Ok(obj.as_i64()),
            None => Ok(0),
        }
    }
}

/// Look up a key on the page dictionary, walking up the page tree via
/// /Parent when the page itself does not carry it.
fn inherited_key(page: &QPdfObject, key: &str) -> Option<QPdfObject> {
    let mut current = QPdfDictionary::from(page.clone());
    loop {
        if let Some(value) = present(current.get(key)) {
            return Some(value);
        }
        match present(current.get("/Parent")) {
            Some(parent) => current = QPdfDictionary::from(parent),
            None => return None,
        }
    }
}

/// qpdf hands back a null object for absent keys; treat it as absent.
fn present(obj: Option<QPdfObject>) -> Option<QPdfObject> {
    obj.filter(|o| o.get_type() != QPdfObjectType::Null)
}

fn boxed(obj: Option<QPdfObject>) -> Result<Option<Rect>> {
    match obj {
        Some(obj) => Ok(Some(rect_from_array(&obj)?)),
        None => Ok(None),
    }
}

fn rect_from_array(obj: &QPdfObject) -> Result<Rect> {
    let array = QPdfArray::from(obj.clone());
    let corners: Vec<f64> = array.iter().map(|item| item.as_f64()).collect();
    if corners.len() != 4 {
        return Err(Error::Parse {
            reason: format!("boundary box has {} elements, expected 4", corners.len()),
        });
    }
    Ok(Rect::new(corners[0], corners[1], corners[2], corners[3]))
}

/// Accumulates cropped page clones in a fresh destination document.
pub(crate) struct QpdfCropper {
    dest: QPdf,
    page_count: usize,
}

impl QpdfCropper {
    pub(crate) fn new() -> Self {
        Self {
            dest: QPdf::empty(),
            page_count: 0,
        }
    }

    pub(crate) fn page_count(&self) -> usize {
        self.page_count
    }

    /// Append one clone of the source page, with all five boundary boxes
    /// set to `rect` and `/Rotate` set to `rotate`.
    pub(crate) fn append_clone(
        &mut self,
        source: &QpdfSource,
        page: usize,
        rect: Rect,
        rotate: i64,
    ) -> Result<()> {
        let fresh = QPdf::read_from_memory(&source.data).map_err(map_qpdf_error)?;
        let total = fresh.get_num_pages().map_err(map_qpdf_error)? as usize;
        let page_obj = fresh
            .get_page((page - 1) as u32)
            .ok_or(Error::PageOutOfBounds { page, total })?;

        // Rewrite the boxes on the freshly parsed page before copying it
        // into the destination; the original source handle is untouched.
        let dict = QPdfDictionary::from(page_obj.clone());
        let box_array = fresh
            .parse_object(&format!(
                "[{} {} {} {}]",
                rect.llx, rect.lly, rect.urx, rect.ury
            ))
            .map_err(map_qpdf_error)?;
        for key in ["/MediaBox", "/CropBox", "/BleedBox", "/TrimBox", "/ArtBox"] {
            dict.set(key, &box_array);
        }
        let rotate_obj = fresh
            .parse_object(&rotate.to_string())
            .map_err(map_qpdf_error)?;
        dict.set("/Rotate", &rotate_obj);

        let copied = self.dest.copy_from_foreign(&page_obj);
        self.dest.add_page(&copied, false).map_err(map_qpdf_error)?;
        self.page_count += 1;
        Ok(())
    }

    /// Serialize the destination document.
    pub(crate) fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut writer = self.dest.writer();
        writer.preserve_encryption(false);
        writer
            .write_to_memory()
            .map_err(|e| Error::Serialization {
                reason: e.to_string(),
            })
    }
}
