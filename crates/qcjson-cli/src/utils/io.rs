use crate::error::{CliError, Result};
use qcjson::core::document::Document;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn read_document(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path)?;
    Document::from_json_str(&content).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Where the output for `input` goes.
///
/// A single input writes to `output` itself; several inputs treat `output` as a
/// directory and keep each input's file name.
pub fn output_path(output: &Path, input: &Path, multiple: bool) -> Result<PathBuf> {
    if !multiple {
        return Ok(output.to_path_buf());
    }
    let name = input.file_name().ok_or_else(|| {
        CliError::Argument(format!("Input path has no file name: {}", input.display()))
    })?;
    Ok(output.join(name))
}

/// Writes completed documents either to files or, one per line, to stdout.
pub fn write_documents(
    documents: &[(PathBuf, Document)],
    output: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let multiple = documents.len() > 1;
    match output {
        Some(output) => {
            if multiple {
                std::fs::create_dir_all(output)?;
            }
            for (input, document) in documents {
                let path = output_path(output, input, multiple)?;
                std::fs::write(&path, document.to_json_string(pretty)? + "\n")?;
                info!("Wrote {} to {:?}", input.display(), path);
            }
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            for (_, document) in documents {
                writeln!(handle, "{}", document.to_json_string(pretty)?)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn read_document_reports_the_offending_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        match read_document(&path) {
            Err(CliError::FileParsing { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected a parsing error, got {other:?}"),
        }
    }

    #[test]
    fn single_output_is_the_path_itself() {
        let path = output_path(Path::new("out.json"), Path::new("jobs/he.json"), false).unwrap();
        assert_eq!(path, PathBuf::from("out.json"));
    }

    #[test]
    fn several_outputs_go_into_a_directory() {
        let dir = tempdir().unwrap();
        let out_dir = dir.path().join("results");
        let documents = vec![
            (
                PathBuf::from("jobs/a.json"),
                Document::from_value(json!({"success": true})).unwrap(),
            ),
            (
                PathBuf::from("jobs/b.json"),
                Document::from_value(json!({"success": false})).unwrap(),
            ),
        ];

        write_documents(&documents, Some(&out_dir), false).unwrap();

        let b = std::fs::read_to_string(out_dir.join("b.json")).unwrap();
        assert_eq!(b.trim(), r#"{"success":false}"#);
        assert!(out_dir.join("a.json").exists());
    }
}
