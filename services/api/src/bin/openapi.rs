//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the training API to disk so the frontend
//! can generate its client. Usage: `openapi [output-path]`.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn write_document(doc: &utoipa::openapi::OpenApi, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, doc.to_pretty_json()?)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let doc = ApiDoc::openapi();
    write_document(&doc, &path)?;
    println!(
        "Wrote {} v{} ({} paths) to {}",
        doc.info.title,
        doc.info.version,
        doc.paths.paths.len(),
        path
    );
    Ok(())
}
