//! # Preview Adapter — Scaled Visual Tree
//!
//! Renders the same instruction list the print adapter consumes into a
//! serializable tree of absolutely-positioned nodes in device pixels, for
//! on-screen inspection while the operator edits label data.
//!
//! Geometry is a pure scaling of the instruction coordinates — physical
//! millimetres times a pixel ratio — so the preview is provably congruent
//! with the printed page; only rasterization differs. The adapter never
//! recomputes a position.
//!
//! QR regions degrade gracefully: an empty payload or an encoding failure
//! produces a placeholder box rather than blocking the preview.

use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};

use crate::layout::{compute_layout, ComputedLayout, DataRow, Instruction};
use crate::schema::registry::SchemaRegistry;
use crate::schema::{Align, Decorator};

/// One typographic point in millimetres.
const PT_TO_MM: f64 = 25.4 / 72.0;

/// Scaling options for the preview surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOptions {
    /// Device pixels per physical millimetre. The default is the CSS
    /// reference ratio (96 dpi), matching a 1:1 on-screen label.
    pub px_per_mm: f64,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            px_per_mm: 96.0 / 25.4,
        }
    }
}

/// The rendered preview for one label: page box plus positioned nodes in
/// paint order (background regions first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPage {
    pub width_px: f64,
    pub height_px: f64,
    pub nodes: Vec<PreviewNode>,
}

/// One absolutely-positioned visual element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PreviewNode {
    /// A background fill band.
    #[serde(rename_all = "camelCase")]
    Region {
        x_px: f64,
        y_px: f64,
        width_px: f64,
        height_px: f64,
        color: String,
    },

    /// A single line of text. Decorator metadata rides along for the
    /// consumer to interpret (flanking rules around the text).
    #[serde(rename_all = "camelCase")]
    Text {
        id: String,
        text: String,
        x_px: f64,
        y_px: f64,
        width_px: f64,
        font_size_px: f64,
        bold: bool,
        align: Align,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decorator: Option<Decorator>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decorator_color: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decorator_thickness_px: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decorator_gap_px: Option<f64>,
    },

    /// A horizontal rule spanning the page.
    #[serde(rename_all = "camelCase")]
    Rule {
        x_px: f64,
        y_px: f64,
        width_px: f64,
        thickness_px: f64,
        dashed: bool,
        color: String,
    },

    /// An encoded QR matrix: `dark` is row-major, `modules_per_side²` long.
    #[serde(rename_all = "camelCase")]
    QrMatrix {
        x_px: f64,
        y_px: f64,
        size_px: f64,
        modules_per_side: usize,
        dark: Vec<bool>,
    },

    /// Shown when the payload is empty or QR encoding failed.
    #[serde(rename_all = "camelCase")]
    QrPlaceholder { x_px: f64, y_px: f64, size_px: f64 },
}

/// Render one data row through the named layout as a preview tree.
/// Returns `None` for an unknown layout key — the caller decides how to
/// surface that.
pub fn render_row(
    registry: &SchemaRegistry,
    slug: &str,
    row: &DataRow,
    options: PreviewOptions,
) -> Option<PreviewPage> {
    let schema = registry.get(slug)?;
    Some(render_computed(
        &compute_layout(schema, row, None),
        options,
    ))
}

/// Render an already-computed layout as a preview tree.
pub fn render_computed(computed: &ComputedLayout, options: PreviewOptions) -> PreviewPage {
    let s = options.px_per_mm;
    let page = computed.page;
    let mut nodes = Vec::with_capacity(computed.background.len() + computed.instructions.len());

    for bg in &computed.background {
        nodes.push(PreviewNode::Region {
            x_px: 0.0,
            y_px: bg.y_mm * s,
            width_px: page.width_mm * s,
            height_px: bg.height_mm * s,
            color: bg.color.clone(),
        });
    }

    for instr in &computed.instructions {
        nodes.push(node_for(instr, s));
    }

    PreviewPage {
        width_px: page.width_mm * s,
        height_px: page.height_mm * s,
        nodes,
    }
}

fn node_for(instr: &Instruction, s: f64) -> PreviewNode {
    match instr {
        Instruction::Text {
            id,
            text,
            x_mm,
            y_mm,
            width_mm,
            font_size_pt,
            font_weight,
            align,
            decorator,
            decorator_color,
            decorator_thickness_mm,
            decorator_gap_mm,
        } => PreviewNode::Text {
            id: id.clone(),
            text: text.clone(),
            x_px: x_mm * s,
            y_px: y_mm * s,
            width_px: width_mm * s,
            font_size_px: font_size_pt * PT_TO_MM * s,
            bold: *font_weight == crate::schema::FontWeight::Bold,
            align: *align,
            decorator: *decorator,
            decorator_color: decorator_color.clone(),
            decorator_thickness_px: decorator_thickness_mm.map(|t| t * s),
            decorator_gap_px: decorator_gap_mm.map(|g| g * s),
        },

        Instruction::Divider {
            y_mm,
            width_mm,
            style,
            color,
        } => PreviewNode::Rule {
            x_px: 0.0,
            y_px: y_mm * s,
            width_px: width_mm * s,
            thickness_px: 0.2 * s,
            dashed: *style == crate::schema::DividerStyle::Dashed,
            color: color.clone(),
        },

        Instruction::Qr {
            payload,
            x_mm,
            y_mm,
            size_mm,
        } => qr_node(payload, *x_mm * s, *y_mm * s, *size_mm * s),
    }
}

/// Encode the payload into a module matrix; degrade to a placeholder when
/// the payload is empty or encoding fails.
fn qr_node(payload: &str, x_px: f64, y_px: f64, size_px: f64) -> PreviewNode {
    if payload.is_empty() {
        return PreviewNode::QrPlaceholder { x_px, y_px, size_px };
    }

    match QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M) {
        Ok(code) => {
            let modules_per_side = code.width();
            let dark = code
                .to_colors()
                .into_iter()
                .map(|c| c == qrcode::Color::Dark)
                .collect();
            PreviewNode::QrMatrix {
                x_px,
                y_px,
                size_px,
                modules_per_side,
                dark,
            }
        }
        Err(err) => {
            log::warn!("qr preview encoding failed: {}", err);
            PreviewNode::QrPlaceholder { x_px, y_px, size_px }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_row() -> DataRow {
        let mut row = DataRow::new();
        row.insert("additionalText".to_string(), json!("DC-01"));
        row.insert("aSide".to_string(), json!("Switch-A"));
        row.insert("zSide".to_string(), json!("Switch-B"));
        row
    }

    #[test]
    fn test_unknown_layout_returns_none() {
        let reg = SchemaRegistry::builtin();
        assert!(render_row(&reg, "layout-z", &full_row(), PreviewOptions::default()).is_none());
    }

    #[test]
    fn test_page_box_scales_with_pixel_ratio() {
        let reg = SchemaRegistry::builtin();
        let opts = PreviewOptions { px_per_mm: 2.0 };
        let page = render_row(&reg, "layout-a", &full_row(), opts).unwrap();
        assert!((page.width_px - 76.2).abs() < 1e-9);
        assert!((page.height_px - 203.2).abs() < 1e-9);
    }

    #[test]
    fn test_geometry_equals_instructions_times_scale() {
        let reg = SchemaRegistry::builtin();
        let schema = reg.get("layout-a").unwrap();
        let computed = compute_layout(schema, &full_row(), None);
        let opts = PreviewOptions { px_per_mm: 3.0 };
        let page = render_computed(&computed, opts);

        for (instr, node) in computed
            .instructions
            .iter()
            .zip(page.nodes.iter().skip(computed.background.len()))
        {
            if let (
                Instruction::Text { x_mm, y_mm, .. },
                PreviewNode::Text { x_px, y_px, .. },
            ) = (instr, node)
            {
                assert!((x_px - x_mm * 3.0).abs() < 1e-9);
                assert!((y_px - y_mm * 3.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_background_region_precedes_instructions() {
        let reg = SchemaRegistry::builtin();
        let page = render_row(&reg, "layout-a", &full_row(), PreviewOptions::default()).unwrap();
        assert!(matches!(page.nodes[0], PreviewNode::Region { .. }));
    }

    #[test]
    fn test_empty_payload_degrades_to_placeholder() {
        let reg = SchemaRegistry::builtin();
        let page =
            render_row(&reg, "layout-a-qr", &DataRow::new(), PreviewOptions::default()).unwrap();
        assert!(page
            .nodes
            .iter()
            .any(|n| matches!(n, PreviewNode::QrPlaceholder { .. })));
        assert!(!page
            .nodes
            .iter()
            .any(|n| matches!(n, PreviewNode::QrMatrix { .. })));
    }

    #[test]
    fn test_non_empty_payload_produces_matrix() {
        let reg = SchemaRegistry::builtin();
        let page =
            render_row(&reg, "layout-a-qr", &full_row(), PreviewOptions::default()).unwrap();
        let matrix = page
            .nodes
            .iter()
            .find(|n| matches!(n, PreviewNode::QrMatrix { .. }))
            .expect("expected a qr matrix node");
        if let PreviewNode::QrMatrix {
            modules_per_side,
            dark,
            ..
        } = matrix
        {
            assert_eq!(dark.len(), modules_per_side * modules_per_side);
            assert!(dark.iter().any(|d| *d));
        }
    }

    #[test]
    fn test_font_size_converts_through_physical_units() {
        // 8 pt at 96 dpi: 8 * (25.4/72) mm * (96/25.4) px/mm = 8 * 96/72 px.
        let reg = SchemaRegistry::builtin();
        let page = render_row(&reg, "layout-a", &full_row(), PreviewOptions::default()).unwrap();
        let a_side = page.nodes.iter().find_map(|n| match n {
            PreviewNode::Text { id, font_size_px, .. } if id == "aSide" => Some(*font_size_px),
            _ => None,
        });
        assert!((a_side.unwrap() - 8.0 * 96.0 / 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_preview_tree_serializes_with_kind_tags() {
        let reg = SchemaRegistry::builtin();
        let page = render_row(&reg, "layout-a", &full_row(), PreviewOptions::default()).unwrap();
        let v = serde_json::to_value(&page).unwrap();
        assert_eq!(v["nodes"][0]["kind"], "region");
        assert!(v["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["kind"] == "rule"));
    }
}
