//! services/api/src/bin/openapi.rs
//!
//! Generates the OpenAPI 3.0 specification for the Practice Lab API (case
//! retrieval, generation, and grading endpoints) and writes it to disk, for
//! clients that want the schema without running the server.
//!
//! Usage: `openapi [output-path]` (defaults to `openapi.json`).

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn write_spec(
    api_doc: utoipa::openapi::OpenApi,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, api_doc.to_pretty_json()?)?;
    println!("OpenAPI specification written to {}", path);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    write_spec(ApiDoc::openapi(), &path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_documents_the_pipeline_routes() {
        let json = ApiDoc::openapi().to_pretty_json().expect("spec serializes");
        for route in ["/cases/next", "/cases/generate", "/evaluate", "/health"] {
            assert!(json.contains(route), "missing route {}", route);
        }
    }

    #[test]
    fn spec_writes_to_the_given_path() {
        let path = std::env::temp_dir().join("practice_lab_openapi_test.json");
        let path_str = path.to_str().expect("utf-8 temp path");
        write_spec(ApiDoc::openapi(), path_str).expect("spec written");
        let written = std::fs::read_to_string(&path).expect("file readable");
        assert!(written.contains("Practice Lab API"));
        std::fs::remove_file(&path).ok();
    }
}
