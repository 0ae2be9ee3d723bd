use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result, bail};
use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info};

use crate::model::PlacementRect;
use crate::pdf::qr::QrRaster;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub width: f32,
    pub height: f32,
}

pub struct PdfEditor {
    document: Document,
    page_ids: BTreeMap<u32, ObjectId>,
}

impl PdfEditor {
    pub fn open(path: &Path) -> Result<Self> {
        let document = Document::load(path)
            .with_context(|| format!("failed to parse PDF {}", path.display()))?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: Document) -> Self {
        let page_ids = document.get_pages();
        Self { document, page_ids }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn page_box(&self, page_index: usize) -> Result<PageBox> {
        let page_id = self.page_id(page_index)?;
        let media_box = resolve_inherited(&self.document, page_id, b"MediaBox")?
            .with_context(|| format!("page {page_index} has no MediaBox"))?;
        let values = self
            .resolve(media_box)
            .as_array()
            .with_context(|| format!("page {page_index} MediaBox is not an array"))?;
        if values.len() != 4 {
            bail!(
                "page {page_index} MediaBox has {} entries, expected 4",
                values.len()
            );
        }

        let mut coords = [0f32; 4];
        for (slot, value) in coords.iter_mut().zip(values) {
            *slot = self
                .resolve(value)
                .as_float()
                .with_context(|| format!("page {page_index} MediaBox entry is not a number"))?;
        }

        Ok(PageBox {
            x0: coords[0].min(coords[2]),
            y0: coords[1].min(coords[3]),
            width: (coords[2] - coords[0]).abs(),
            height: (coords[3] - coords[1]).abs(),
        })
    }

    pub fn insert_qr(
        &mut self,
        page_index: usize,
        raster: &QrRaster,
        rect: PlacementRect,
        page_box: PageBox,
    ) -> Result<()> {
        let page_id = self.page_id(page_index)?;

        let mut image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(raster.width()),
                "Height" => i64::from(raster.height()),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8_i64,
            },
            raster.image.as_raw().clone(),
        );
        image
            .compress()
            .context("failed to compress QR image stream")?;

        let image_id = self.document.add_object(image);
        let image_name = format!("Qr{}", image_id.0);
        self.document
            .add_xobject(page_id, image_name.as_bytes(), image_id)
            .with_context(|| format!("failed to register QR image on page {page_index}"))?;

        let (x, y) = rect.pdf_origin(page_box.height);
        let x = page_box.x0 + x;
        let y = page_box.y0 + y;

        let mut content = self
            .document
            .get_and_decode_page_content(page_id)
            .with_context(|| format!("failed to decode content of page {page_index}"))?;
        content.operations.push(Operation::new("q", vec![]));
        content.operations.push(Operation::new(
            "cm",
            vec![
                rect.width().into(),
                0_i64.into(),
                0_i64.into(),
                rect.height().into(),
                x.into(),
                y.into(),
            ],
        ));
        content.operations.push(Operation::new(
            "Do",
            vec![Object::Name(image_name.as_bytes().to_vec())],
        ));
        content.operations.push(Operation::new("Q", vec![]));

        let encoded = content
            .encode()
            .with_context(|| format!("failed to encode content of page {page_index}"))?;
        self.document
            .change_page_content(page_id, encoded)
            .with_context(|| format!("failed to update content of page {page_index}"))?;

        debug!(
            page = page_index,
            x,
            y,
            size = rect.width(),
            image = %image_name,
            "embedded QR image"
        );
        Ok(())
    }

    pub fn extract_range(&self, pages: Range<usize>) -> Result<Document> {
        if pages.start == 0 || pages.start >= pages.end || pages.end > self.page_count() + 1 {
            bail!(
                "page range {}..{} is outside 1..={}",
                pages.start,
                pages.end,
                self.page_count()
            );
        }

        let mut document = self.document.clone();
        let removed = self
            .page_ids
            .keys()
            .copied()
            .filter(|number| !pages.contains(&(*number as usize)))
            .collect::<Vec<u32>>();
        document.delete_pages(&removed);
        document.prune_objects();
        document.renumber_objects();
        document.compress();

        debug!(
            start_page = pages.start,
            end_page = pages.end,
            removed = removed.len(),
            "extracted page range"
        );
        Ok(document)
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        save_document(&mut self.document, path)
    }

    fn page_id(&self, page_index: usize) -> Result<ObjectId> {
        u32::try_from(page_index)
            .ok()
            .and_then(|number| self.page_ids.get(&number).copied())
            .with_context(|| {
                format!(
                    "page {page_index} does not exist (document has {} pages)",
                    self.page_count()
                )
            })
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(object),
            _ => object,
        }
    }
}

pub fn save_document(document: &mut Document, path: &Path) -> Result<()> {
    document
        .save(path)
        .with_context(|| format!("failed to write PDF {}", path.display()))?;
    info!(path = %path.display(), "wrote PDF");
    Ok(())
}

// Fails instead of truncating when `path` already exists.
pub fn save_new_document(document: &mut Document, path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to create PDF {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    document
        .save_to(&mut writer)
        .with_context(|| format!("failed to write PDF {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to finalize PDF {}", path.display()))?;
    info!(path = %path.display(), "wrote PDF");
    Ok(())
}

fn resolve_inherited<'a>(
    document: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut current = page_id;
    loop {
        let dict: &Dictionary = document
            .get_object(current)
            .and_then(Object::as_dict)
            .with_context(|| format!("object {current:?} is not a page dictionary"))?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => current = parent,
            Err(_) => return Ok(None),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_document(page_count: usize) -> Document {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let mut kids = Vec::new();

    for index in 0..page_count {
        let content = lopdf::content::Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tj", vec![Object::string_literal(format!("page {}", index + 1))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id =
            document.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
        "MediaBox" => vec![0_i64.into(), 0_i64.into(), 842_i64.into(), 595_i64.into()],
    };
    document.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);
    document
}
