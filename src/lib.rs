//! # Etikett
//!
//! A schema-driven cable label engine.
//!
//! Label systems usually grow two copies of their layout math: one inside
//! the print path and one inside the on-screen preview. The copies drift,
//! and the operator eventually prints a thousand labels that don't look
//! like what they approved.
//!
//! Etikett does the opposite: **layout is computed exactly once.** A
//! declarative schema plus a row of label data goes through one pure
//! function and comes out as a flat list of absolutely-positioned drawing
//! instructions in physical millimetres. Both render targets — the PDF
//! print adapter and the scaled preview tree — are instruction
//! interpreters that never do coordinate math of their own, so what the
//! operator previews is structurally identical to what gets printed.
//!
//! ## Architecture
//!
//! ```text
//! SchemaRegistry + DataRow
//!       ↓
//!   [schema]   — declarative layout definitions (page, segments, elements)
//!       ↓
//!   [layout]   — compute_layout: segments → positioned instructions (mm)
//!       ↓
//!   [pdf]      — print adapter: instructions → PDF bytes
//!   [preview]  — preview adapter: instructions → scaled visual tree
//! ```
//!
//! The engine is synchronous, side-effect-free, and total: missing row
//! keys resolve to empty text, unknown segment kinds are skipped, and
//! `compute_layout` never fails.

pub mod error;
pub mod layout;
pub mod pdf;
pub mod preview;
pub mod schema;

pub use error::LabelError;
pub use layout::{compute_layout, ComputedLayout, DataRow, Instruction};
pub use pdf::{render_batch, render_batch_to, render_batch_with, BatchSummary, RowFailure};
pub use preview::{render_row, PreviewNode, PreviewOptions, PreviewPage};
pub use schema::registry::{LayoutSummary, SchemaRegistry};
pub use schema::{PageMm, Schema};

use serde::{Deserialize, Serialize};

/// A print job as submitted by callers (and the CLI): a layout key, an
/// optional page override from a stored template, and the data rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub layout: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageMm>,
    pub rows: Vec<DataRow>,
}

/// Render a print job described as JSON to PDF bytes.
pub fn render_job_json(
    registry: &SchemaRegistry,
    json: &str,
) -> Result<(Vec<u8>, BatchSummary), LabelError> {
    let job: PrintJob = serde_json::from_str(json)?;
    render_batch(registry, &job.layout, &job.rows, job.page)
}
