//! PDF serialisation of a [`DocumentLayout`] with `lopdf`.
//!
//! The writer emits exactly what the layout describes, in order: one content
//! stream per page, `Link` annotations for table-of-contents entries and
//! external URLs, and a document outline with one bookmark per story. No
//! creation dates or random document ids are written, so equal layouts give
//! equal bytes.

use crate::error::{DigestError, Result};
use crate::outputs::fonts::{Font, encode_win_ansi};
use crate::outputs::layout::{
    Color, DocumentLayout, Element, Link, LinkTarget, PAGE_HEIGHT, PAGE_WIDTH, Page,
    SectionAnchor,
};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, instrument};

const PRODUCER: &str = concat!("hn_daily_digest ", env!("CARGO_PKG_VERSION"));

fn pdf_error(e: impl std::fmt::Display) -> DigestError {
    DigestError::Pdf(e.to_string())
}

/// Serialise the laid-out digest into PDF bytes.
#[instrument(level = "info", skip_all, fields(pages = layout.pages.len()))]
pub fn render_pdf(layout: &DocumentLayout) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let page_ids: Vec<ObjectId> = layout.pages.iter().map(|_| doc.new_object_id()).collect();

    for (page, &page_id) in layout.pages.iter().zip(&page_ids) {
        let content = Content {
            operations: page_operations(page),
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().map_err(pdf_error)?,
        ));

        let mut annotations = Vec::with_capacity(page.links.len());
        for link in &page.links {
            let annotation = link_annotation(link, &layout.sections, &page_ids)?;
            annotations.push(Object::Reference(doc.add_object(annotation)));
        }

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if !annotations.is_empty() {
            page_dict.set("Annots", annotations);
        }
        doc.objects.insert(page_id, Object::Dictionary(page_dict));
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_ids.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            PAGE_WIDTH.into(),
            PAGE_HEIGHT.into(),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if let Some(outline_id) = build_outline(&mut doc, &layout.sections, &page_ids)? {
        catalog.set("Outlines", outline_id);
        catalog.set("PageMode", "UseOutlines");
    }
    let catalog_id = doc.add_object(catalog);

    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(&layout.title),
        "Producer" => Object::string_literal(PRODUCER),
    });

    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(pdf_error)?;
    debug!(bytes = bytes.len(), "Serialised PDF");
    Ok(bytes)
}

fn rgb(color: Color) -> Vec<Object> {
    vec![color.0.into(), color.1.into(), color.2.into()]
}

fn page_operations(page: &Page) -> Vec<Operation> {
    let mut ops = Vec::new();
    for element in &page.elements {
        match element {
            Element::Fill {
                x,
                y,
                width,
                height,
                color,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new("rg", rgb(*color)));
                ops.push(Operation::new(
                    "re",
                    vec![(*x).into(), (*y).into(), (*width).into(), (*height).into()],
                ));
                ops.push(Operation::new("f", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
            Element::Rule {
                from,
                to,
                width,
                color,
            } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new("RG", rgb(*color)));
                ops.push(Operation::new("w", vec![(*width).into()]));
                ops.push(Operation::new("m", vec![from.0.into(), from.1.into()]));
                ops.push(Operation::new("l", vec![to.0.into(), to.1.into()]));
                ops.push(Operation::new("S", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
            Element::Text {
                x,
                y,
                font,
                size,
                color,
                text,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("rg", rgb(*color)));
                ops.push(Operation::new(
                    "Tf",
                    vec![font.resource_name().into(), (*size).into()],
                ));
                ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(encode_win_ansi(text))],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
        }
    }
    ops
}

/// `[page /XYZ null top null]`: show the section's top edge at the current zoom.
fn destination(anchor: &SectionAnchor, page_ids: &[ObjectId]) -> Result<Vec<Object>> {
    let page_id = page_ids
        .get(anchor.page)
        .ok_or_else(|| pdf_error(format!("section page {} out of range", anchor.page)))?;
    Ok(vec![
        Object::Reference(*page_id),
        "XYZ".into(),
        Object::Null,
        anchor.top.into(),
        Object::Null,
    ])
}

fn link_annotation(
    link: &Link,
    sections: &[SectionAnchor],
    page_ids: &[ObjectId],
) -> Result<Dictionary> {
    let [x1, y1, x2, y2] = link.rect;
    let mut annotation = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => vec![x1.into(), y1.into(), x2.into(), y2.into()],
        "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
    };
    match &link.target {
        LinkTarget::Section(index) => {
            let anchor = sections
                .get(*index)
                .ok_or_else(|| pdf_error(format!("link to unknown section {index}")))?;
            annotation.set("Dest", destination(anchor, page_ids)?);
        }
        LinkTarget::Uri(uri) => {
            annotation.set(
                "A",
                dictionary! {
                    "S" => "URI",
                    "URI" => Object::string_literal(uri.as_bytes().to_vec()),
                },
            );
        }
    }
    Ok(annotation)
}

/// Outline with one top-level bookmark per section, or `None` without sections.
fn build_outline(
    doc: &mut Document,
    sections: &[SectionAnchor],
    page_ids: &[ObjectId],
) -> Result<Option<ObjectId>> {
    if sections.is_empty() {
        return Ok(None);
    }

    let outline_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = sections.iter().map(|_| doc.new_object_id()).collect();

    for (i, (section, &item_id)) in sections.iter().zip(&item_ids).enumerate() {
        let mut item = dictionary! {
            "Title" => text_string(&section.title),
            "Parent" => outline_id,
            "Dest" => destination(section, page_ids)?,
        };
        if i > 0 {
            item.set("Prev", item_ids[i - 1]);
        }
        if let Some(&next) = item_ids.get(i + 1) {
            item.set("Next", next);
        }
        doc.objects.insert(item_id, Object::Dictionary(item));
    }

    let outline = dictionary! {
        "Type" => "Outlines",
        "First" => item_ids[0],
        "Last" => item_ids[item_ids.len() - 1],
        "Count" => item_ids.len() as i64,
    };
    doc.objects.insert(outline_id, Object::Dictionary(outline));
    Ok(Some(outline_id))
}

/// A PDF text string in UTF-16BE with byte-order mark, so bookmark titles
/// keep characters the WinAnsi page fonts cannot show.
fn text_string(text: &str) -> Object {
    let mut bytes = vec![0xfe, 0xff];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::entry;
    use crate::models::{Article, Digest};
    use crate::outputs::layout::layout_digest;
    use chrono::NaiveDate;

    fn digest() -> Digest {
        let mut first = entry(1, 100);
        first.story.title = "Ünïcode “title” 日本".to_string();
        first.article = Article {
            story_id: 1,
            text: Some("Body text.".to_string()),
        };
        Digest::new(
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            vec![first, entry(2, 80), entry(3, 50)],
        )
    }

    #[test]
    fn test_render_is_byte_identical() {
        let a = render_pdf(&layout_digest(&digest())).unwrap();
        let b = render_pdf(&layout_digest(&digest())).unwrap();
        assert!(a.starts_with(b"%PDF-1.5"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_rendered_document_structure() {
        let layout = layout_digest(&digest());
        let bytes = render_pdf(&layout).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), layout.pages.len());

        let catalog = doc.catalog().unwrap();
        assert!(catalog.has(b"Outlines"));

        let outline_id = catalog.get(b"Outlines").unwrap().as_reference().unwrap();
        let outline = doc.get_dictionary(outline_id).unwrap();
        assert_eq!(outline.get(b"Count").unwrap().as_i64().unwrap(), 3);
    }

    #[test]
    fn test_toc_links_point_at_sections() {
        let layout = layout_digest(&digest());
        let bytes = render_pdf(&layout).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();

        let pages = doc.get_pages();
        let first_page_id = pages[&1];
        let first_page = doc.get_dictionary(first_page_id).unwrap();
        let annots = first_page.get(b"Annots").unwrap().as_array().unwrap();
        assert_eq!(annots.len(), 3);

        let link = doc
            .get_dictionary(annots[0].as_reference().unwrap())
            .unwrap();
        let dest = link.get(b"Dest").unwrap().as_array().unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), pages[&2]);
    }

    #[test]
    fn test_text_string_is_utf16() {
        match text_string("Hé") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(bytes, vec![0xfe, 0xff, 0x00, b'H', 0x00, 0xe9]);
            }
            other => panic!("unexpected object {other:?}"),
        }
    }
}
