//! # Etikett CLI
//!
//! Usage:
//!   etikett job.json -o labels.pdf
//!   echo '{ ... }' | etikett -o labels.pdf
//!   etikett --layouts
//!   etikett --example > job.json

use std::env;
use std::fs;
use std::io::{self, Read};

use etikett::SchemaRegistry;

fn main() {
    let args: Vec<String> = env::args().collect();
    let registry = SchemaRegistry::builtin();

    if args.iter().any(|a| a == "--layouts") {
        for layout in registry.list() {
            println!(
                "{:<14} {:<28} {}x{} mm  [{}]",
                layout.slug,
                layout.name,
                layout.page_defaults.width_mm,
                layout.page_defaults.height_mm,
                layout.preview_columns.join(", ")
            );
        }
        return;
    }

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_job_json());
        return;
    }

    // Read input
    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1]).expect("Failed to read input file")
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .expect("Failed to read stdin");
        buf
    };

    // Parse output path
    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| "labels.pdf".to_string());

    // Render
    match etikett::render_job_json(&registry, &input) {
        Ok((pdf_bytes, summary)) => {
            fs::write(&output_path, &pdf_bytes).expect("Failed to write PDF");
            eprintln!(
                "✓ Written {} pages ({} bytes) to {}",
                summary.pages,
                pdf_bytes.len(),
                output_path
            );
            for failure in &summary.failures {
                eprintln!(
                    "  ! row {} fell back: {}",
                    failure.row_index, failure.message
                );
            }
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    }
}

fn example_job_json() -> &'static str {
    r##"{
  "layout": "layout-a-qr",
  "rows": [
    {
      "aSide": "FRA1-LEAF-01",
      "portA": "1",
      "zSide": "FRA1-SPINE-01",
      "portB": "1",
      "serial": "FRA1-001-A",
      "lineId": "LINE-001"
    },
    {
      "aSide": "FRA1-LEAF-01",
      "portA": "2",
      "zSide": "FRA1-SPINE-01",
      "portB": "2",
      "serial": "FRA1-002-A",
      "lineId": "LINE-002"
    }
  ]
}
"##
}
