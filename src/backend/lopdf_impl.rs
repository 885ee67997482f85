//! lopdf backend: pure-Rust PDF parsing and output assembly.
//!
//! The writer keeps one output `lopdf::Document` with a single flat page
//! tree. Cloning a source page imports its transitively referenced objects
//! (content streams, resources, fonts) into the output exactly once per
//! source page; every crop of that page is a fresh page dictionary that
//! shares those imported objects and owns only its boundary boxes and
//! `/Rotate` entry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use lopdf::{dictionary, Dictionary, Object, ObjectId};
use tracing::warn;

use crate::error::{Error, Result};
use crate::geom::{PageBoxes, Rect};

/// Identity for the writer-side import memo. Two loads of the same bytes
/// are distinct sources.
static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(0);

/// A parsed source document.
pub(crate) struct LopdfSource {
    doc: lopdf::Document,
    /// Page object ids in document order (index 0 = page 1).
    page_ids: Vec<ObjectId>,
    source_id: u64,
}

impl LopdfSource {
    pub(crate) fn load(bytes: &[u8]) -> Result<Self> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| Error::Parse {
            reason: format!("failed to parse PDF: {e}"),
        })?;
        // get_pages returns BTreeMap<u32, ObjectId> keyed by 1-based page number
        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        Ok(Self {
            doc,
            page_ids,
            source_id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    pub(crate) fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        self.page_ids
            .get(page.wrapping_sub(1))
            .copied()
            .ok_or(Error::PageOutOfBounds {
                page,
                total: self.page_ids.len(),
            })
    }

    pub(crate) fn page_boxes(&self, page: usize) -> Result<PageBoxes> {
        let page_id = self.page_id(page)?;
        let media = resolve_inherited(&self.doc, page_id, b"MediaBox")?.ok_or_else(|| {
            Error::Parse {
                reason: format!("page {page} has no /MediaBox on the page or its ancestors"),
            }
        })?;
        Ok(PageBoxes {
            media: rect_from_object(media)?,
            crop: optional_box(&self.doc, page_id, b"CropBox")?,
            bleed: optional_box(&self.doc, page_id, b"BleedBox")?,
            trim: optional_box(&self.doc, page_id, b"TrimBox")?,
            art: optional_box(&self.doc, page_id, b"ArtBox")?,
        })
    }

    pub(crate) fn page_rotation(&self, page: usize) -> Result<i64> {
        let page_id = self.page_id(page)?;
        match resolve_inherited(&self.doc, page_id, b"Rotate")? {
            Some(obj) => obj.as_i64().map_err(|e| Error::Parse {
                reason: format!("/Rotate is not an integer: {e}"),
            }),
            None => Ok(0),
        }
    }
}

/// Look up a key in the page dictionary, walking up the page tree
/// (via /Parent) if the key is not found on the page itself.
fn resolve_inherited<'a>(
    doc: &'a lopdf::Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut current_id = page_id;
    loop {
        let dict = doc
            .get_object(current_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| Error::Parse {
                reason: format!("failed to get page dictionary: {e}"),
            })?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(parent_obj) => {
                current_id = parent_obj.as_reference().map_err(|e| Error::Parse {
                    reason: format!("invalid /Parent reference: {e}"),
                })?;
            }
            Err(_) => return Ok(None),
        }
    }
}

fn optional_box(doc: &lopdf::Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Rect>> {
    match resolve_inherited(doc, page_id, key)? {
        Some(obj) => Ok(Some(rect_from_object(obj)?)),
        None => Ok(None),
    }
}

fn rect_from_object(obj: &Object) -> Result<Rect> {
    let array = obj.as_array().map_err(|e| Error::Parse {
        reason: format!("boundary box is not an array: {e}"),
    })?;
    if array.len() != 4 {
        return Err(Error::Parse {
            reason: format!("boundary box has {} elements, expected 4", array.len()),
        });
    }
    let mut corners = [0.0f64; 4];
    for (slot, item) in corners.iter_mut().zip(array) {
        *slot = object_to_f64(item)?;
    }
    Ok(Rect::new(corners[0], corners[1], corners[2], corners[3]))
}

/// Convert a lopdf numeric object (Integer or Real) to f64.
fn object_to_f64(obj: &Object) -> Result<f64> {
    match obj {
        Object::Integer(i) => Ok(*i as f64),
        Object::Real(f) => Ok(*f as f64),
        _ => Err(Error::Parse {
            reason: format!("expected number in boundary box, got {obj:?}"),
        }),
    }
}

fn rect_to_array(rect: Rect) -> Object {
    Object::Array(vec![
        Object::Real(rect.llx as f32),
        Object::Real(rect.lly as f32),
        Object::Real(rect.urx as f32),
        Object::Real(rect.ury as f32),
    ])
}

/// Accumulates cropped page clones in a fresh output document.
pub(crate) struct LopdfCropper {
    doc: lopdf::Document,
    pages_id: ObjectId,
    page_count: usize,
    /// Page dictionary with all references remapped into the output
    /// document and /Parent dropped, one per cloned source page.
    templates: HashMap<(u64, ObjectId), Dictionary>,
    /// Source object id -> output object id, one map per source document
    /// so pages sharing resources share the imported copies too.
    id_maps: HashMap<u64, HashMap<ObjectId, ObjectId>>,
}

impl LopdfCropper {
    pub(crate) fn new() -> Self {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Object::Array(Vec::new()),
                "Count" => 0i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        Self {
            doc,
            pages_id,
            page_count: 0,
            templates: HashMap::new(),
            id_maps: HashMap::new(),
        }
    }

    pub(crate) fn page_count(&self) -> usize {
        self.page_count
    }

    /// Append one clone of the source page, with all five boundary boxes
    /// set to `rect` and `/Rotate` set to `rotate`.
    pub(crate) fn append_clone(
        &mut self,
        source: &LopdfSource,
        page: usize,
        rect: Rect,
        rotate: i64,
    ) -> Result<()> {
        let page_id = source.page_id(page)?;
        let key = (source.source_id, page_id);
        if !self.templates.contains_key(&key) {
            let template = self.import_page(source, page_id)?;
            self.templates.insert(key, template);
        }
        let mut page_dict = self.templates[&key].clone();

        let box_array = rect_to_array(rect);
        for box_key in ["MediaBox", "CropBox", "BleedBox", "TrimBox", "ArtBox"] {
            page_dict.set(box_key, box_array.clone());
        }
        page_dict.set("Rotate", Object::Integer(rotate));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        let clone_id = self.doc.add_object(Object::Dictionary(page_dict));

        // Register the clone in the flat page tree.
        if let Ok(Object::Dictionary(pages)) = self.doc.get_object_mut(self.pages_id) {
            if let Ok(Object::Array(kids)) = pages.get_mut(b"Kids") {
                kids.push(Object::Reference(clone_id));
            }
            if let Ok(Object::Integer(count)) = pages.get_mut(b"Count") {
                *count += 1;
            }
        }
        self.page_count += 1;
        Ok(())
    }

    /// Serialize the output document.
    pub(crate) fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| Error::Serialization {
                reason: e.to_string(),
            })?;
        Ok(bytes)
    }

    /// Import every object the page references into the output document and
    /// return the page dictionary with references remapped.
    ///
    /// The reference graph is walked with an explicit worklist (no
    /// recursion over reference chains, which is the unbounded dimension in
    /// large documents). /Parent entries are dropped; the clone is
    /// reparented on append.
    fn import_page(&mut self, source: &LopdfSource, page_id: ObjectId) -> Result<Dictionary> {
        let page_dict = source
            .doc
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| Error::Parse {
                reason: format!("cannot read page object {page_id:?}: {e}"),
            })?;

        let id_map = self.id_maps.entry(source.source_id).or_default();

        let mut worklist: Vec<ObjectId> = Vec::new();
        let mut found: Vec<ObjectId> = Vec::new();
        for (key, value) in page_dict.iter() {
            if key == b"Parent" {
                continue;
            }
            collect_refs(value, &mut found);
        }
        for id in found.drain(..) {
            if !id_map.contains_key(&id) {
                id_map.insert(id, self.doc.new_object_id());
                worklist.push(id);
            }
        }

        while let Some(source_ref) = worklist.pop() {
            let object = match source.doc.get_object(source_ref) {
                Ok(object) => object,
                Err(err) => {
                    warn!(?source_ref, %err, "unresolvable reference, importing as null");
                    self.doc.objects.insert(id_map[&source_ref], Object::Null);
                    continue;
                }
            };
            collect_refs(object, &mut found);
            for id in found.drain(..) {
                if !id_map.contains_key(&id) {
                    id_map.insert(id, self.doc.new_object_id());
                    worklist.push(id);
                }
            }
            let translated = translate(object, id_map);
            self.doc.objects.insert(id_map[&source_ref], translated);
        }

        let mut template = Dictionary::new();
        for (key, value) in page_dict.iter() {
            if key == b"Parent" {
                continue;
            }
            template.set(key.clone(), translate(value, id_map));
        }
        Ok(template)
    }
}

/// Push every reference id inside `object` onto `out`, skipping /Parent
/// entries. Direct nesting is walked with an explicit stack.
fn collect_refs(object: &Object, out: &mut Vec<ObjectId>) {
    let mut stack = vec![object];
    while let Some(object) = stack.pop() {
        match object {
            Object::Reference(id) => out.push(*id),
            Object::Array(items) => stack.extend(items.iter()),
            Object::Dictionary(dict) => {
                for (key, value) in dict.iter() {
                    if key != b"Parent" {
                        stack.push(value);
                    }
                }
            }
            Object::Stream(stream) => {
                for (key, value) in stream.dict.iter() {
                    if key != b"Parent" {
                        stack.push(value);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Rebuild `object` for the output document, rewriting references through
/// `id_map`. References are never followed here - `import_page`'s worklist
/// has already scheduled every reachable object.
fn translate(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(id) => match id_map.get(id) {
            Some(mapped) => Object::Reference(*mapped),
            None => Object::Null,
        },
        Object::Array(items) => {
            Object::Array(items.iter().map(|item| translate(item, id_map)).collect())
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                new_dict.set(key.clone(), translate(value, id_map));
            }
            Object::Dictionary(new_dict)
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                new_dict.set(key.clone(), translate(value, id_map));
            }
            Object::Stream(lopdf::Stream::new(new_dict, stream.content.clone()))
        }
        other => other.clone(),
    }
}
