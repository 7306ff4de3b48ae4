//! System prompt assembly.
//!
//! Two shapes: the full corpus pasted after the persona preamble, or only the
//! retrieved fragments with an instruction to stay within them.

use crate::document::Document;
use crate::retrieve::RetrievalHit;

/// Instruction placed before the retrieved fragments.
pub const GROUNDING_INSTRUCTION: &str = "Answer only from the relevant fragments below. \
     If the answer is not in them, say so clearly.";

/// A system prompt template.
pub trait PromptTemplate {
    /// Render the system prompt.
    fn render(&self) -> String;
}

/// Persona preamble followed by every document.
#[derive(Debug, Clone, Copy)]
pub struct CorpusPrompt<'a> {
    pub preamble: &'a str,
    pub documents: &'a [Document],
}

impl PromptTemplate for CorpusPrompt<'_> {
    fn render(&self) -> String {
        if self.documents.is_empty() {
            return self.preamble.to_string();
        }
        let joined = self
            .documents
            .iter()
            .map(|d| format!("### {}\n{}", d.name, d.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("{}\n\nReference texts:\n{}", self.preamble, joined)
    }
}

/// Persona preamble, grounding instruction, query and ranked fragments.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalPrompt<'a> {
    pub preamble: &'a str,
    pub query: &'a str,
    pub hits: &'a [RetrievalHit],
}

impl PromptTemplate for RetrievalPrompt<'_> {
    fn render(&self) -> String {
        let refs = self
            .hits
            .iter()
            .map(|h| {
                format!(
                    "### {} [chunk {}]\n{}",
                    h.chunk.section, h.chunk.chunk_id, h.chunk.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        format!(
            "{}\n\n{}\n\nQuery: {}\n\nRelevant fragments:\n{}",
            self.preamble, GROUNDING_INSTRUCTION, self.query, refs
        )
    }
}

/// Full-corpus system prompt.
pub fn assemble(preamble: &str, documents: &[Document]) -> String {
    CorpusPrompt {
        preamble,
        documents,
    }
    .render()
}

/// Retrieval system prompt.
pub fn assemble_rag(preamble: &str, query: &str, hits: &[RetrievalHit]) -> String {
    RetrievalPrompt {
        preamble,
        query,
        hits,
    }
    .render()
}

/// The user turn sent alongside either system prompt.
pub fn user_message(question: &str, instruction: Option<&str>) -> String {
    match instruction.map(str::trim).filter(|s| !s.is_empty()) {
        Some(instruction) => format!("User question: {question}\n{instruction}"),
        None => format!("User question: {question}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Chunk;

    fn hit(section: &str, chunk_id: usize, text: &str, score: f32) -> RetrievalHit {
        RetrievalHit {
            score,
            chunk: Chunk {
                section: section.into(),
                chunk_id,
                text: text.into(),
            },
        }
    }

    #[test]
    fn test_corpus_prompt_without_documents_is_preamble() {
        assert_eq!(assemble("You are helpful.", &[]), "You are helpful.");
    }

    #[test]
    fn test_corpus_prompt_lists_documents_in_order() {
        let docs = vec![
            Document::new("01_about.txt", "About text"),
            Document::new("02_cv.txt", "CV text"),
        ];
        assert_eq!(
            assemble("P", &docs),
            "P\n\nReference texts:\n### 01_about.txt\nAbout text\n\n### 02_cv.txt\nCV text"
        );
    }

    #[test]
    fn test_retrieval_prompt_rank_order() {
        let hits = vec![hit("b.txt", 3, "second doc", 0.9), hit("a.txt", 0, "first doc", 0.4)];
        let prompt = assemble_rag("P", "what?", &hits);
        assert_eq!(
            prompt,
            format!(
                "P\n\n{GROUNDING_INSTRUCTION}\n\nQuery: what?\n\nRelevant fragments:\n\
                 ### b.txt [chunk 3]\nsecond doc\n\n### a.txt [chunk 0]\nfirst doc"
            )
        );
    }

    #[test]
    fn test_retrieval_prompt_without_hits() {
        let prompt = assemble_rag("Persona here.", "where is the fox?", &[]);
        assert!(prompt.starts_with("Persona here."));
        assert!(prompt.contains("where is the fox?"));
        assert!(prompt.ends_with("Relevant fragments:\n"));
    }

    #[test]
    fn test_user_message() {
        assert_eq!(user_message("Hi?", None), "User question: Hi?");
        assert_eq!(user_message("Hi?", Some("  ")), "User question: Hi?");
        assert_eq!(
            user_message("Hi?", Some("Answer in 3 to 6 lines.")),
            "User question: Hi?\nAnswer in 3 to 6 lines."
        );
    }
}
