//! # Layout Computation Engine
//!
//! This is the heart of etikett and the reason it exists.
//!
//! ## The Problem With Two Renderers
//!
//! A label system has two outputs: the printable PDF and the on-screen
//! preview the operator inspects before committing tape to a cable. The
//! moment each renderer does its own coordinate math, they drift — a port
//! line sits 1 mm lower on paper than on screen and nobody notices until a
//! thousand labels are printed.
//!
//! ## How etikett Works
//!
//! Layout math runs in exactly one place: [`compute_layout`]. It walks a
//! schema's segments and flattens them into absolutely-positioned
//! [`Instruction`]s in physical millimetres. Both render adapters are pure
//! instruction interpreters — they draw what the list says and never
//! recompute a position. What the operator previews is therefore
//! structurally identical to what gets printed.
//!
//! The function is pure and total: identical inputs yield deep-equal
//! output, unresolvable keys become empty text, and unknown segment kinds
//! are skipped rather than failing the whole label.

pub mod resolve;

use serde::{Deserialize, Serialize};

use crate::schema::{
    Align, BackgroundRegion, Block, Card, Decorator, DividerStyle, FontWeight, PageMm, QrDef,
    Schema, Segment,
};

/// Caller-supplied label content for one row: an arbitrary string-keyed
/// mapping. The engine is schema-driven and places no fixed shape
/// requirement on it; any key a schema references that is absent here
/// resolves to empty text.
pub type DataRow = serde_json::Map<String, serde_json::Value>;

/// The engine's sole output unit: one fully-resolved drawing operation in
/// physical units, carrying no further business logic. Render adapters
/// pattern-match on the tag and draw — nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Instruction {
    #[serde(rename_all = "camelCase")]
    Text {
        id: String,
        text: String,
        x_mm: f64,
        y_mm: f64,
        width_mm: f64,
        font_size_pt: f64,
        font_weight: FontWeight,
        align: Align,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decorator: Option<Decorator>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decorator_color: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decorator_thickness_mm: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decorator_gap_mm: Option<f64>,
    },

    #[serde(rename_all = "camelCase")]
    Divider {
        y_mm: f64,
        width_mm: f64,
        style: DividerStyle,
        color: String,
    },

    #[serde(rename_all = "camelCase")]
    Qr {
        payload: String,
        x_mm: f64,
        y_mm: f64,
        size_mm: f64,
    },
}

/// The computed result for one schema instance and one data row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedLayout {
    pub page: PageMm,
    pub background: Vec<BackgroundRegion>,
    pub instructions: Vec<Instruction>,
}

/// Compute the complete instruction list for a schema and a data row.
///
/// `page_override` wins over the schema's page when it carries a positive
/// width (a stored template's page configuration, typically).
pub fn compute_layout(
    schema: &Schema,
    row: &DataRow,
    page_override: Option<PageMm>,
) -> ComputedLayout {
    let page = match page_override {
        Some(p) if p.width_mm > 0.0 => p,
        _ => schema.page,
    };

    let mut instructions = Vec::new();

    for segment in &schema.segments {
        match segment {
            Segment::Block {
                y_mm,
                height_mm,
                block,
            } => match block.positioning {
                crate::schema::Positioning::Centered => {
                    centered_block(block, *y_mm, *height_mm, row, page, &mut instructions);
                }
                crate::schema::Positioning::Flow => {
                    flow_block(block, *y_mm, row, page, &mut instructions);
                }
            },

            Segment::Divider { y_mm, style, color } => {
                instructions.push(Instruction::Divider {
                    y_mm: *y_mm,
                    width_mm: page.width_mm,
                    style: *style,
                    color: color.clone(),
                });
            }

            Segment::Qr {
                y_mm,
                height_mm,
                qr,
            } => {
                qr_segment(qr, *y_mm, *height_mm, row, page, &mut instructions);
            }

            Segment::Grid {
                y_mm,
                height_mm,
                rows,
                cols,
                card,
            } => {
                grid_segment(*y_mm, *height_mm, *rows, *cols, card, row, page, &mut instructions);
            }

            // Forward compatibility, not an error.
            Segment::Unknown => {}
        }
    }

    ComputedLayout {
        page,
        background: schema.background.clone(),
        instructions,
    }
}

/// The horizontally-centered content region of a block.
fn content_region(block: &Block, page: PageMm) -> (f64, f64) {
    let width = page.width_mm * block.content_width_ratio;
    let x = (page.width_mm - width) / 2.0;
    (x, width)
}

/// Flow positioning: a vertical cursor advances element by element. This is
/// where elision happens — a conditional element that resolves empty is
/// skipped together with the space it would have consumed.
fn flow_block(
    block: &Block,
    segment_y_mm: f64,
    row: &DataRow,
    page: PageMm,
    out: &mut Vec<Instruction>,
) {
    let (x_mm, width_mm) = content_region(block, page);
    let mut cursor = segment_y_mm + block.padding_top_mm;

    for el in &block.elements {
        let text = resolve::resolve_text(row, el);
        if el.conditional && text.is_empty() {
            continue;
        }

        out.push(Instruction::Text {
            id: el.id.clone(),
            text,
            x_mm,
            y_mm: cursor,
            width_mm,
            font_size_pt: el.font_size_pt,
            font_weight: el.font_weight,
            align: el.align,
            decorator: el.decorator,
            decorator_color: el.decorator_color.clone(),
            decorator_thickness_mm: el.decorator_thickness_mm,
            decorator_gap_mm: el.decorator_gap_mm,
        });

        cursor += el.height_mm + el.spacing_after_mm;
    }
}

/// Centered positioning: a fixed-height content region is vertically
/// centered within the segment and each element sits at its own offset.
/// Overlap between offsets is the schema author's responsibility.
fn centered_block(
    block: &Block,
    segment_y_mm: f64,
    segment_height_mm: f64,
    row: &DataRow,
    page: PageMm,
    out: &mut Vec<Instruction>,
) {
    let (x_mm, width_mm) = content_region(block, page);
    let y_start = segment_y_mm + (segment_height_mm - block.content_height_mm) / 2.0;

    for el in &block.elements {
        let text = resolve::resolve_text(row, el);

        out.push(Instruction::Text {
            id: el.id.clone(),
            text,
            x_mm,
            y_mm: y_start + el.offset_mm,
            width_mm,
            font_size_pt: el.font_size_pt,
            font_weight: el.font_weight,
            align: el.align,
            decorator: None,
            decorator_color: None,
            decorator_thickness_mm: None,
            decorator_gap_mm: None,
        });
    }
}

/// QR positioning: the code region is centered both ways within the segment
/// at the schema-declared size. The instruction carries the already-composed
/// payload so both adapters encode the same bytes.
fn qr_segment(
    def: &QrDef,
    segment_y_mm: f64,
    segment_height_mm: f64,
    row: &DataRow,
    page: PageMm,
    out: &mut Vec<Instruction>,
) {
    out.push(Instruction::Qr {
        payload: resolve::qr_payload(def, row),
        x_mm: (page.width_mm - def.size_mm) / 2.0,
        y_mm: segment_y_mm + (segment_height_mm - def.size_mm) / 2.0,
        size_mm: def.size_mm,
    });
}

/// Grid positioning: the page width divides into `cols` equal cells and the
/// segment height into `rows`; the card template is centered within each
/// cell. Ids gain a `_r{row}c{col}` suffix so the flattened list stays
/// unique.
#[allow(clippy::too_many_arguments)]
fn grid_segment(
    segment_y_mm: f64,
    segment_height_mm: f64,
    rows: u32,
    cols: u32,
    card: &Card,
    row: &DataRow,
    page: PageMm,
    out: &mut Vec<Instruction>,
) {
    if rows == 0 || cols == 0 {
        return;
    }

    let cell_width = page.width_mm / cols as f64;
    let cell_height = segment_height_mm / rows as f64;

    for r in 0..rows {
        for c in 0..cols {
            let card_x = c as f64 * cell_width + (cell_width - card.width_mm) / 2.0;
            let card_y =
                segment_y_mm + r as f64 * cell_height + (cell_height - card.height_mm) / 2.0;

            for el in &card.elements {
                out.push(Instruction::Text {
                    id: format!("{}_r{}c{}", el.id, r, c),
                    text: resolve::resolve_text(row, el),
                    x_mm: card_x,
                    y_mm: card_y + el.offset_mm,
                    width_mm: card.width_mm,
                    font_size_pt: el.font_size_pt,
                    font_weight: el.font_weight,
                    align: el.align,
                    decorator: None,
                    decorator_color: None,
                    decorator_thickness_mm: None,
                    decorator_gap_mm: None,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::{SchemaRegistry, CABLE_PAGE, SEGMENT_HEIGHT_MM};
    use serde_json::json;

    fn full_row() -> DataRow {
        let mut row = DataRow::new();
        row.insert("additionalText".to_string(), json!("DC-01"));
        row.insert("aSide".to_string(), json!("Switch-A"));
        row.insert("portA".to_string(), json!("1/0/1"));
        row.insert("zSide".to_string(), json!("Switch-B"));
        row.insert("portB".to_string(), json!("1/0/2"));
        row.insert("lineName".to_string(), json!("Line-1"));
        row.insert("lineId".to_string(), json!("LID-7"));
        row.insert("serial".to_string(), json!("SN-100"));
        row
    }

    fn compute(slug: &str, row: &DataRow) -> ComputedLayout {
        let reg = SchemaRegistry::builtin();
        compute_layout(reg.get(slug).unwrap(), row, None)
    }

    fn text_ids(layout: &ComputedLayout) -> Vec<String> {
        layout
            .instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Text { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_page_defaults_from_schema() {
        let result = compute("layout-a", &full_row());
        assert_eq!(result.page, CABLE_PAGE);
    }

    #[test]
    fn test_page_override_wins() {
        let reg = SchemaRegistry::builtin();
        let result = compute_layout(
            reg.get("layout-a").unwrap(),
            &full_row(),
            Some(PageMm {
                width_mm: 50.0,
                height_mm: 120.0,
            }),
        );
        assert_eq!(result.page.width_mm, 50.0);
        assert_eq!(result.page.height_mm, 120.0);
    }

    #[test]
    fn test_zero_width_override_falls_back_to_schema() {
        let reg = SchemaRegistry::builtin();
        let result = compute_layout(
            reg.get("layout-a").unwrap(),
            &full_row(),
            Some(PageMm {
                width_mm: 0.0,
                height_mm: 120.0,
            }),
        );
        assert_eq!(result.page, CABLE_PAGE);
    }

    #[test]
    fn test_flow_cursor_advances_by_height_and_spacing() {
        let result = compute("layout-a", &full_row());
        let ys: Vec<f64> = result
            .instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Text { id, y_mm, .. } if !id.is_empty() => Some(*y_mm),
                _ => None,
            })
            .take(3)
            .collect();
        // additionalText at padding top, aSide after 2.2 + 1.6, portA after 2.8 + 1.2.
        assert!((ys[0] - 2.0).abs() < 1e-9);
        assert!((ys[1] - 5.8).abs() < 1e-9);
        assert!((ys[2] - 9.8).abs() < 1e-9);
    }

    #[test]
    fn test_elision_skips_element_and_its_space() {
        let mut row = DataRow::new();
        row.insert("aSide".to_string(), json!("A"));
        row.insert("zSide".to_string(), json!("B"));
        let result = compute("layout-a", &row);

        let ids = text_ids(&result);
        assert!(!ids.contains(&"additionalText".to_string()));
        assert!(!ids.contains(&"portA".to_string()));
        assert!(!ids.contains(&"portB".to_string()));

        // With additionalText elided, aSide moves up to the padding top.
        let first_y = result.instructions.iter().find_map(|i| match i {
            Instruction::Text { id, y_mm, .. } if id == "aSide" => Some(*y_mm),
            _ => None,
        });
        assert!((first_y.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_divider_spans_page_width() {
        let result = compute("layout-a", &full_row());
        let divider = result
            .instructions
            .iter()
            .find(|i| matches!(i, Instruction::Divider { .. }))
            .unwrap();
        match divider {
            Instruction::Divider { y_mm, width_mm, .. } => {
                assert_eq!(*y_mm, SEGMENT_HEIGHT_MM);
                assert_eq!(*width_mm, CABLE_PAGE.width_mm);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_centered_block_positions_from_content_height() {
        let result = compute("layout-b", &full_row());
        // yStart = (25.4 - 12.8) / 2 = 6.3; aSide at offset 0.
        let a_side_y = result.instructions.iter().find_map(|i| match i {
            Instruction::Text { id, y_mm, .. } if id == "aSide" => Some(*y_mm),
            _ => None,
        });
        assert!((a_side_y.unwrap() - 6.3).abs() < 1e-9);
    }

    #[test]
    fn test_centered_block_emits_all_elements_for_empty_row() {
        let result = compute("layout-b", &DataRow::new());
        assert_eq!(result.instructions.len(), 6);
    }

    #[test]
    fn test_qr_centered_in_segment() {
        let result = compute("layout-a-qr", &full_row());
        let qr = result
            .instructions
            .iter()
            .find(|i| matches!(i, Instruction::Qr { .. }))
            .unwrap();
        match qr {
            Instruction::Qr {
                x_mm, y_mm, size_mm, ..
            } => {
                assert!((x_mm - (CABLE_PAGE.width_mm - 21.0) / 2.0).abs() < 1e-9);
                assert!((y_mm - (SEGMENT_HEIGHT_MM + (SEGMENT_HEIGHT_MM - 21.0) / 2.0)).abs() < 1e-9);
                assert_eq!(*size_mm, 21.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_grid_ids_encode_row_and_column() {
        let result = compute("layout-c", &full_row());
        let ids = text_ids(&result);
        assert_eq!(ids.len(), 12);
        assert!(ids.contains(&"lineName_r0c0".to_string()));
        assert!(ids.contains(&"lineName_r1c1".to_string()));
        assert!(ids.contains(&"zSide_r1c0".to_string()));
    }

    #[test]
    fn test_determinism() {
        let row = full_row();
        for slug in ["layout-a", "layout-a-qr", "layout-b", "layout-c"] {
            assert_eq!(compute(slug, &row), compute(slug, &row));
        }
    }

    #[test]
    fn test_instruction_wire_tags() {
        let result = compute("layout-a-qr", &full_row());
        let v = serde_json::to_value(&result.instructions).unwrap();
        let types: Vec<&str> = v
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["type"].as_str().unwrap())
            .collect();
        assert!(types.contains(&"text"));
        assert!(types.contains(&"divider"));
        assert!(types.contains(&"qr"));
        // Field names are the shared wire contract.
        let text = v.as_array().unwrap().iter().find(|i| i["type"] == "text").unwrap();
        assert!(text.get("xMm").is_some());
        assert!(text.get("fontSizePt").is_some());
    }
}
