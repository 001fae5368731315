//! Prints the building energy API document as JSON.
//!
//! With a path argument the document is written to that file instead,
//! creating missing parent directories:
//!   cargo run --bin generate_openapi -- docs/openapi.json

use std::{
    env, fs,
    io::{self, Write},
    path::Path,
};

use anyhow::{Context, Result};
use building_energy_service::api::handlers::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<()> {
    let doc = ApiDoc::openapi();
    let json = doc.to_pretty_json()?;

    let Some(target) = env::args_os().nth(1) else {
        let mut out = io::stdout().lock();
        return writeln!(out, "{json}").context("failed to write to stdout");
    };

    let target = Path::new(&target);
    if let Some(dir) = target.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    fs::write(target, &json).with_context(|| format!("failed to write {}", target.display()))?;
    eprintln!("{} {} -> {}", doc.info.title, doc.info.version, target.display());
    Ok(())
}
