//! Binary entrypoint: read one report JSON document, write one JSON object.
//!
//! Usage:
//!   report-engine [path]   # read the report from a file, else from stdin
//!
//! Output is {"summary": ..., "ai": ...} on stdout. A document that yields
//! no test cases is fatal (exit 1): there is nothing to summarize, and
//! "no data" must stay distinguishable from "zero tests ran".

use report_engine::{normalize, summary, AiAnalyzer, AiConfig};
use serde_json::{json, Value};
use std::io::{self, Read, Write};

#[tokio::main]
async fn main() {
  if let Err(e) = run().await {
    let _ = writeln!(io::stderr(), "report-engine error: {}", e);
    std::process::exit(1);
  }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
  let raw = match std::env::args().nth(1) {
    Some(path) => std::fs::read_to_string(path)?,
    None => {
      let mut buf = String::new();
      io::stdin().lock().read_to_string(&mut buf)?;
      buf
    }
  };

  let doc: Value = serde_json::from_str(&raw)?;
  let report = normalize::normalize(&doc)?;
  let run_summary = summary::summarize(&report);

  // Configuration is read once here; core logic never touches the env.
  let config = AiConfig::from_env();
  let analyzer = AiAnalyzer::from_config(&config);
  let ai = analyzer.analyze(&report).await;

  let out = json!({ "summary": run_summary, "ai": ai });
  let stdout = io::stdout();
  let mut handle = stdout.lock();
  serde_json::to_writer(&mut handle, &out)?;
  writeln!(handle)?;
  Ok(())
}
