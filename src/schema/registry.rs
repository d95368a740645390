//! # Schema Registry
//!
//! An explicit, immutable configuration object holding every known layout
//! schema. Built once at startup with [`SchemaRegistry::builtin`] and passed
//! by reference into the render adapters — there is no process-wide global.
//!
//! The built-in cable layouts are the single source of truth for both render
//! targets; every dimension below is load-bearing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    Align, BackgroundRegion, Block, Card, Decorator, DividerStyle, Element, FieldSource,
    FontWeight, PageMm, PayloadField, Positioning, QrDef, Schema, Segment, TextSource,
};

/// Standard cable wrap label stock.
pub const CABLE_PAGE: PageMm = PageMm {
    width_mm: 38.1,
    height_mm: 101.6,
};

/// Each printable segment is a quarter of the page height.
pub const SEGMENT_HEIGHT_MM: f64 = 25.4;

/// Registry of layout schemas, keyed by slug.
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
}

/// Listing entry describing one registered layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSummary {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub page_defaults: PageMm,
    pub preview_columns: Vec<String>,
}

impl SchemaRegistry {
    /// An empty registry. Useful for tests and for callers that load
    /// schemas from external configuration.
    pub fn new() -> Self {
        Self {
            schemas: BTreeMap::new(),
        }
    }

    /// The registry of built-in cable layouts (A, A+QR, B, C).
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.register(layout_a());
        reg.register(layout_a_qr());
        reg.register(layout_b());
        reg.register(layout_c());
        reg
    }

    /// Register a schema under its own id. Re-registering a slug replaces
    /// the previous schema.
    pub fn register(&mut self, schema: Schema) {
        if self.schemas.contains_key(&schema.id) {
            log::warn!("overwriting layout: {}", schema.id);
        }
        self.schemas.insert(schema.id.clone(), schema);
    }

    /// Look up a schema by slug. `None` means "unknown layout" — the caller
    /// decides how to surface that.
    pub fn get(&self, slug: &str) -> Option<&Schema> {
        self.schemas.get(slug)
    }

    /// List all registered layouts with their display metadata.
    pub fn list(&self) -> Vec<LayoutSummary> {
        self.schemas
            .values()
            .map(|s| LayoutSummary {
                slug: s.id.clone(),
                name: s.name.clone(),
                description: s.description.clone(),
                page_defaults: s.page,
                preview_columns: s.preview_columns.clone(),
            })
            .collect()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ── Element constructors ────────────────────────────────────────────

fn base_element(id: &str, source: TextSource, font_size_pt: f64, weight: FontWeight) -> Element {
    Element {
        id: id.to_string(),
        source,
        prefix: None,
        font_size_pt,
        font_weight: weight,
        align: Align::Center,
        conditional: false,
        decorator: None,
        decorator_color: None,
        decorator_thickness_mm: None,
        decorator_gap_mm: None,
        height_mm: 0.0,
        spacing_after_mm: 0.0,
        offset_mm: 0.0,
    }
}

fn flow_key(
    id: &str,
    key: &str,
    font_size_pt: f64,
    weight: FontWeight,
    height_mm: f64,
    spacing_after_mm: f64,
) -> Element {
    Element {
        height_mm,
        spacing_after_mm,
        ..base_element(id, TextSource::Key(key.to_string()), font_size_pt, weight)
    }
}

fn offset_key(id: &str, key: &str, font_size_pt: f64, weight: FontWeight, offset_mm: f64) -> Element {
    Element {
        offset_mm,
        ..base_element(id, TextSource::Key(key.to_string()), font_size_pt, weight)
    }
}

// ── Layout A — Standard Cable ───────────────────────────────────────

fn layout_a_block() -> Block {
    Block {
        content_width_ratio: 0.92,
        positioning: Positioning::Flow,
        padding_top_mm: 2.0,
        content_height_mm: 0.0,
        elements: vec![
            Element {
                conditional: true,
                decorator: Some(Decorator::DividerLine),
                decorator_color: Some("#000000".to_string()),
                decorator_thickness_mm: Some(0.3),
                decorator_gap_mm: Some(1.0),
                height_mm: 2.2,
                spacing_after_mm: 1.6,
                ..base_element(
                    "additionalText",
                    TextSource::ResolveKeys(vec![
                        "additionalText".to_string(),
                        "serial".to_string(),
                        "lineId".to_string(),
                    ]),
                    6.2,
                    FontWeight::Bold,
                )
            },
            flow_key("aSide", "aSide", 8.0, FontWeight::Bold, 2.8, 1.2),
            Element {
                prefix: Some("Port ".to_string()),
                conditional: true,
                ..flow_key("portA", "portA", 6.0, FontWeight::Normal, 2.1, 1.2)
            },
            Element {
                height_mm: 2.3,
                spacing_after_mm: 1.2,
                ..base_element("arrow", TextSource::StaticText(json!("<->")), 6.5, FontWeight::Normal)
            },
            flow_key("zSide", "zSide", 8.0, FontWeight::Bold, 2.8, 1.2),
            Element {
                prefix: Some("Port ".to_string()),
                conditional: true,
                ..flow_key("portB", "portB", 6.0, FontWeight::Normal, 2.1, 0.0)
            },
        ],
    }
}

fn divider_segment() -> Segment {
    Segment::Divider {
        y_mm: SEGMENT_HEIGHT_MM,
        style: DividerStyle::Dashed,
        color: "#94a3b8".to_string(),
    }
}

/// Laminate zone: the lower half of the label wraps over the print and is
/// tinted in previews.
fn laminate_background() -> Vec<BackgroundRegion> {
    vec![BackgroundRegion {
        y_mm: 50.8,
        height_mm: 50.8,
        color: "#f1f5f9".to_string(),
    }]
}

fn layout_a() -> Schema {
    Schema {
        id: "layout-a".to_string(),
        name: "Standard Cable (A)".to_string(),
        description: "A/B port mapping with separate port lines.".to_string(),
        page: CABLE_PAGE,
        background: laminate_background(),
        segments: vec![
            Segment::Block {
                y_mm: 0.0,
                height_mm: SEGMENT_HEIGHT_MM,
                block: layout_a_block(),
            },
            divider_segment(),
            Segment::Block {
                y_mm: SEGMENT_HEIGHT_MM,
                height_mm: SEGMENT_HEIGHT_MM,
                block: layout_a_block(),
            },
        ],
        preview_columns: preview_columns(&["A-Side", "Port A", "Z-Side", "Port B", "Line ID"]),
    }
}

// ── Layout A + QR ───────────────────────────────────────────────────

fn qr_segment_def() -> QrDef {
    QrDef {
        size_mm: 21.0,
        payload_fields: vec![
            PayloadField {
                source: FieldSource::ResolveKeys(vec![
                    "additionalText".to_string(),
                    "serial".to_string(),
                    "lineId".to_string(),
                ]),
                prefix: None,
            },
            prefixed_field("aSide", "Device A: "),
            prefixed_field("portA", "Port A: "),
            prefixed_field("zSide", "Device B: "),
            prefixed_field("portB", "Port B: "),
        ],
    }
}

fn prefixed_field(key: &str, prefix: &str) -> PayloadField {
    PayloadField {
        source: FieldSource::Key(key.to_string()),
        prefix: Some(prefix.to_string()),
    }
}

fn layout_a_qr() -> Schema {
    Schema {
        id: "layout-a-qr".to_string(),
        name: "Standard Cable Label + QR".to_string(),
        description: "Standard A layout with QR code at bottom.".to_string(),
        page: CABLE_PAGE,
        background: laminate_background(),
        segments: vec![
            Segment::Block {
                y_mm: 0.0,
                height_mm: SEGMENT_HEIGHT_MM,
                block: layout_a_block(),
            },
            divider_segment(),
            Segment::Qr {
                y_mm: SEGMENT_HEIGHT_MM,
                height_mm: SEGMENT_HEIGHT_MM,
                qr: qr_segment_def(),
            },
        ],
        preview_columns: preview_columns(&["A-Side", "Port A", "Z-Side", "Port B", "Line ID"]),
    }
}

// ── Layout B — Compact Cable ────────────────────────────────────────

fn layout_b_block() -> Block {
    Block {
        content_width_ratio: 0.86,
        positioning: Positioning::Centered,
        padding_top_mm: 0.0,
        content_height_mm: 12.8,
        elements: vec![
            offset_key("aSide", "aSide", 7.6, FontWeight::Bold, 0.0),
            Element {
                offset_mm: 4.2,
                ..base_element("arrow", TextSource::StaticText(json!("<->")), 6.6, FontWeight::Normal)
            },
            offset_key("zSide", "zSide", 7.6, FontWeight::Bold, 8.5),
        ],
    }
}

fn layout_b() -> Schema {
    Schema {
        id: "layout-b".to_string(),
        name: "Compact Cable (B)".to_string(),
        description: "Compact A/Z endpoint layout with inline port mapping.".to_string(),
        page: CABLE_PAGE,
        background: vec![],
        segments: vec![
            Segment::Block {
                y_mm: 0.0,
                height_mm: SEGMENT_HEIGHT_MM,
                block: layout_b_block(),
            },
            Segment::Block {
                y_mm: SEGMENT_HEIGHT_MM,
                height_mm: SEGMENT_HEIGHT_MM,
                block: layout_b_block(),
            },
        ],
        preview_columns: preview_columns(&["A-Side", "Z-Side", "Line ID"]),
    }
}

// ── Layout C — Grid Cable (2 × 2 cards) ─────────────────────────────

fn layout_c_card() -> Card {
    Card {
        width_mm: 16.0,
        height_mm: 13.0,
        elements: vec![
            offset_key("lineName", "lineName", 5.8, FontWeight::Bold, 0.0),
            offset_key("aSide", "aSide", 5.4, FontWeight::Normal, 4.1),
            offset_key("zSide", "zSide", 5.4, FontWeight::Normal, 8.2),
        ],
    }
}

fn layout_c() -> Schema {
    Schema {
        id: "layout-c".to_string(),
        name: "Grid Cable (C)".to_string(),
        description: "Four-up compact card layout with line name and endpoints.".to_string(),
        page: CABLE_PAGE,
        background: vec![],
        segments: vec![Segment::Grid {
            y_mm: 0.0,
            height_mm: SEGMENT_HEIGHT_MM * 2.0,
            rows: 2,
            cols: 2,
            card: layout_c_card(),
        }],
        preview_columns: preview_columns(&["Line Name", "A-Side", "Z-Side"]),
    }
}

fn preview_columns(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}
