//! Context assembly for project-wide conversations.
//!
//! A project chat is answered from one synthetic text built from an
//! excerpt of every project document that has content.

/// A project document as handed over by the document store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDocument {
    pub name: String,
    /// Extracted plain text, or `None` if the document was never opened.
    pub content: Option<String>,
}

impl ProjectDocument {
    pub fn new(name: impl Into<String>, content: Option<String>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Default number of characters taken from each project document.
pub const DEFAULT_EXCERPT_CHARS: usize = 1000;

/// Build the context for a project conversation.
///
/// Each document with content contributes
/// `Document "{name}": {first excerpt_chars characters}...`; entries are
/// separated by blank lines. Returns `None` when no document has content.
pub fn build_project_context(docs: &[ProjectDocument], excerpt_chars: usize) -> Option<String> {
    let parts: Vec<String> = docs
        .iter()
        .filter_map(|doc| {
            doc.text().map(|text| {
                let excerpt: String = text.chars().take(excerpt_chars).collect();
                format!("Document \"{}\": {}...", doc.name, excerpt)
            })
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}
