//! Reading documents for the CLI.
//!
//! Files are taken as UTF-8 plain text. Anything richer (PDF, Office)
//! must be converted beforehand.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use docchat_core::context::ProjectDocument;

use crate::chat::ChatContext;

/// Read one document. Blank files come back with `content: None`.
pub fn read_document(path: &Path) -> Result<ProjectDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let content = (!text.trim().is_empty()).then_some(text);
    Ok(ProjectDocument::new(name, content))
}

pub fn read_documents(paths: &[PathBuf]) -> Result<Vec<ProjectDocument>> {
    paths.iter().map(|p| read_document(p)).collect()
}

/// Turn loaded documents into a conversation context.
///
/// In document mode the texts are concatenated, separated by blank lines.
pub fn chat_context(docs: Vec<ProjectDocument>, project: bool) -> ChatContext {
    if project {
        return ChatContext::Project(docs);
    }
    let texts: Vec<String> = docs.into_iter().filter_map(|d| d.content).collect();
    if texts.is_empty() {
        ChatContext::Document(None)
    } else {
        ChatContext::Document(Some(texts.join("\n\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_document_uses_file_name() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "Quarterly revenue grew.").unwrap();
        let doc = read_document(file.path()).unwrap();
        assert!(doc.name.ends_with(".txt"));
        assert_eq!(doc.content.as_deref(), Some("Quarterly revenue grew.\n"));
    }

    #[test]
    fn test_blank_file_has_no_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "  \n\t").unwrap();
        assert_eq!(read_document(file.path()).unwrap().content, None);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(read_document(Path::new("/nonexistent/notes.txt")).is_err());
    }

    #[test]
    fn test_document_mode_joins_texts() {
        let docs = vec![
            ProjectDocument::new("a", Some("alpha".into())),
            ProjectDocument::new("b", None),
            ProjectDocument::new("c", Some("gamma".into())),
        ];
        match chat_context(docs, false) {
            ChatContext::Document(Some(text)) => assert_eq!(text, "alpha\n\ngamma"),
            other => panic!("unexpected context: {:?}", other),
        }
    }

    #[test]
    fn test_project_mode_keeps_documents() {
        let docs = vec![ProjectDocument::new("a", None)];
        assert!(matches!(chat_context(docs, true), ChatContext::Project(d) if d.len() == 1));
        assert!(matches!(chat_context(Vec::new(), false), ChatContext::Document(None)));
    }
}
