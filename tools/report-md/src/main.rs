//! report-md: render a test-run summary as Markdown
//!
//! Usage:
//!   report-md <summary.json>   # render to stdout
//!   report-md                  # read the summary from stdin
//!
//! Accepts either a bare summary object or the full engine output
//! ({"summary": ..., "ai": ...}); only the summary section is rendered.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

#[derive(serde::Deserialize)]
struct Summary {
    total: u32,
    passed: u32,
    failed: u32,
    skipped: u32,
    #[serde(default)]
    notes: Vec<String>,
}

#[derive(serde::Deserialize)]
struct EngineOutput {
    summary: Summary,
}

fn load_summary(contents: &str) -> Summary {
    if let Ok(wrapped) = serde_json::from_str::<EngineOutput>(contents) {
        return wrapped.summary;
    }
    serde_json::from_str(contents).unwrap_or_else(|e| {
        eprintln!("report-md: invalid summary JSON: {}", e);
        process::exit(2);
    })
}

fn to_markdown(summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str("# Test Summary\n\n");
    out.push_str(&format!("- Total: {}\n", summary.total));
    out.push_str(&format!("- Passed: {}\n", summary.passed));
    out.push_str(&format!("- Failed: {}\n", summary.failed));
    out.push_str(&format!("- Skipped: {}\n", summary.skipped));
    out.push_str("\n## Notes\n\n");
    if summary.notes.is_empty() {
        out.push_str("(none)\n");
    } else {
        for note in &summary.notes {
            out.push_str(&format!("- {}\n", note));
        }
    }
    out
}

fn main() {
    let contents = match env::args().nth(1) {
        Some(path) => fs::read_to_string(&path).unwrap_or_else(|e| {
            eprintln!("report-md: cannot read {}: {}", path, e);
            process::exit(2);
        }),
        None => {
            let mut buf = String::new();
            if let Err(e) = io::stdin().lock().read_to_string(&mut buf) {
                eprintln!("report-md: cannot read stdin: {}", e);
                process::exit(2);
            }
            buf
        }
    };

    let summary = load_summary(&contents);
    print!("{}", to_markdown(&summary));
}
