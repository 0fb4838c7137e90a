//! Prompt formatting over retrieval results.
//!
//! These helpers turn ranked chunks into the page-citing context block that
//! question answering runs on, and into the citations returned to users.

use serde::{Deserialize, Serialize};

use crate::document::RetrievalResult;
use crate::review::AssembledContext;

/// Characters of chunk text kept in a citation snippet.
pub const SNIPPET_CHARS: usize = 200;

const CHAT_INSTRUCTIONS: &str = "You are a helpful educational assistant. Answer the student's \
question based on the provided context from their coursebook. Always cite page numbers when \
referencing specific information. Use format: \"According to page X: [brief quote]\"";

const RESUME_INSTRUCTIONS: &str = "You are an expert resume reviewer and career coach. Answer \
the candidate's question using their resume and their most recent review. Refer to resume pages \
when quoting. Use format: \"According to page X: [brief quote]\"";

/// A page reference shown next to an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    pub page_number: usize,
    pub snippet: String,
}

/// Render results as numbered, page-tagged quotes separated by blank lines.
///
/// ```
/// use coursemate_rag::RetrievalResult;
/// use coursemate_rag::context::format_context;
///
/// let results = vec![RetrievalResult {
///     text: "Stacks are LIFO.".into(),
///     page_number: 4,
///     document_id: "d1".into(),
///     document_title: "Data Structures".into(),
///     similarity: 0.9,
/// }];
/// assert_eq!(format_context(&results), "[1] From page 4: \"Stacks are LIFO.\"");
/// ```
pub fn format_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] From page {}: \"{}\"", i + 1, r.page_number, r.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The full question-answering prompt for a coursebook question.
pub fn chat_prompt(context: &str, question: &str) -> String {
    format!(
        "{CHAT_INSTRUCTIONS}\n\nContext from coursebook:\n{context}\n\nStudent's question: {question}"
    )
}

/// One citation per result, in rank order.
pub fn citations(results: &[RetrievalResult]) -> Vec<Citation> {
    results
        .iter()
        .map(|r| Citation {
            page_number: r.page_number,
            snippet: format!("{}...", r.text.chars().take(SNIPPET_CHARS).collect::<String>()),
        })
        .collect()
}

/// A resume question prompt enriched with the latest review findings.
pub fn resume_chat_prompt(assembled: &AssembledContext, question: &str) -> String {
    let mut prompt = String::from(RESUME_INSTRUCTIONS);
    prompt.push_str("\n\nResume excerpts:\n");
    prompt.push_str(&format_context(&assembled.chunks));

    for review in &assembled.reviews {
        prompt.push_str("\n\nLatest review");
        if let Some(role) = &review.target_role {
            prompt.push_str(&format!(" (target role: {role})"));
        }
        prompt.push_str(":\n");
        let scores = [
            ("Overall", review.overall_score),
            ("ATS compatibility", review.ats_score),
            ("Content quality", review.content_score),
            ("Formatting", review.formatting_score),
        ];
        for (label, score) in scores {
            if let Some(score) = score {
                prompt.push_str(&format!("- {label}: {score}/100\n"));
            }
        }
        if !review.critical_improvements.is_empty() {
            prompt.push_str("Critical improvements:\n");
            for item in &review.critical_improvements {
                prompt.push_str(&format!("- {item}\n"));
            }
        }
    }

    prompt.push_str(&format!("\n\nCandidate's question: {question}"));
    prompt
}
