//! Prompt templates for answering from retrieved context.
//!
//! All styles share the same layout: the retrieved chunks as labelled
//! `Source:` blocks, the question, and an instruction to answer in German.
//! They differ in how strictly the model is held to the context and how it
//! is asked to cite.

use crate::store::SearchResult;
use std::fmt;
use std::str::FromStr;

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

pub const MISSING_INFO_SENTENCE: &str = "Diese Information steht nicht in den Dokumenten.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    /// Expert persona, bracketed `[filename.md]` citations.
    #[default]
    Cite,
    /// Expert persona, mention the source where possible.
    Guided,
    OnlyContext,
    ContextPlus,
    CiteEveryFact,
}

impl PromptStyle {
    pub const ALL: [PromptStyle; 5] = [
        PromptStyle::Cite,
        PromptStyle::Guided,
        PromptStyle::OnlyContext,
        PromptStyle::ContextPlus,
        PromptStyle::CiteEveryFact,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PromptStyle::Cite => "cite",
            PromptStyle::Guided => "guided",
            PromptStyle::OnlyContext => "only-context",
            PromptStyle::ContextPlus => "context-plus",
            PromptStyle::CiteEveryFact => "cite-every-fact",
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PromptStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        PromptStyle::ALL
            .into_iter()
            .find(|style| style.name() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = PromptStyle::ALL.iter().map(|s| s.name()).collect();
                format!("unknown prompt style '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Formats retrieved chunks as `Source: <filename>` blocks.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("Source: {}\n{}", r.filename, r.chunk_text))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

pub fn compose_prompt(style: PromptStyle, query: &str, results: &[SearchResult]) -> String {
    let context = build_context(results);
    match style {
        PromptStyle::Cite => format!(
            "Du bist ein Cybersecurity-Experte. Beantworte die Frage basierend auf dem Kontext.\n\n\
             Kontext:\n{context}\n\n\
             Frage: {query}\n\n\
             WICHTIG:\n\
             - Antworte auf Deutsch\n\
             - Zitiere Quellen in Klammern: [filename.md]\n\
             - Sei präzise und konkret\n\
             - Falls der Kontext die Antwort nicht enthält, sag das\n\n\
             Antwort:"
        ),
        PromptStyle::Guided => format!(
            "Du bist ein Cybersecurity-Experte. Beantworte die Frage basierend auf dem \
             bereitgestellten Kontext.\n\n\
             Kontext:\n{context}\n\n\
             Frage: {query}\n\n\
             Anleitung:\n\
             - Antworte auf Deutsch\n\
             - Sei präzise und konkret\n\
             - Falls der Kontext die Antwort nicht enthält, sag das\n\
             - Erwähne die Quelle, wenn möglich\n\n\
             Antwort:"
        ),
        PromptStyle::OnlyContext => format!(
            "Answer based ONLY on the context. \
             If info is missing, say \"{MISSING_INFO_SENTENCE}\"\n\n\
             Context:\n{context}\n\n\
             Question: {query}\n\n\
             Answer in German:"
        ),
        PromptStyle::ContextPlus => format!(
            "Answer using context as primary source. You may add general knowledge if helpful, \
             but mark it as \"[Zusätzlich:]\"\n\n\
             Context:\n{context}\n\n\
             Question: {query}\n\n\
             Answer in German:"
        ),
        PromptStyle::CiteEveryFact => format!(
            "Answer and cite sources in brackets for every fact, like: \
             \"MFA reduces breaches [password_security.md]\"\n\n\
             Context:\n{context}\n\n\
             Question: {query}\n\n\
             Answer in German with citations:"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> Vec<SearchResult> {
        vec![
            SearchResult {
                chunk_text: "MFA kombiniert mehrere Faktoren.".to_string(),
                filename: "password_security.md".to_string(),
                distance: 0.4,
            },
            SearchResult {
                chunk_text: "Phishing-Mails erzeugen Zeitdruck.".to_string(),
                filename: "phishing.md".to_string(),
                distance: 0.9,
            },
        ]
    }

    #[test]
    fn context_blocks_are_labelled_and_separated() {
        assert_eq!(
            build_context(&results()),
            "Source: password_security.md\nMFA kombiniert mehrere Faktoren.\n\n---\n\n\
             Source: phishing.md\nPhishing-Mails erzeugen Zeitdruck."
        );
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn every_style_embeds_context_and_question() {
        let query = "Was ist MFA?";
        for style in PromptStyle::ALL {
            let prompt = compose_prompt(style, query, &results());
            assert!(prompt.contains(&build_context(&results())), "{}", style);
            assert!(prompt.contains(query), "{}", style);
            assert!(prompt.contains("German") || prompt.contains("Deutsch"), "{}", style);
        }
    }

    #[test]
    fn default_style_asks_for_citations_and_admitting_gaps() {
        let prompt = compose_prompt(PromptStyle::default(), "Was ist ein VPN?", &results());
        assert!(prompt.starts_with("Du bist ein Cybersecurity-Experte."));
        assert!(prompt.contains("- Zitiere Quellen in Klammern: [filename.md]\n"));
        assert!(prompt.contains("- Falls der Kontext die Antwort nicht enthält, sag das\n"));
        assert!(prompt.ends_with("\n\nAntwort:"));
    }

    #[test]
    fn only_context_style_names_refusal_sentence() {
        let prompt =
            compose_prompt(PromptStyle::OnlyContext, "Welcher Passwort-Manager?", &results());
        assert!(prompt.contains(MISSING_INFO_SENTENCE));
    }

    #[test]
    fn parses_style_names() {
        assert_eq!("cite".parse::<PromptStyle>(), Ok(PromptStyle::Cite));
        assert_eq!("Only_Context".parse::<PromptStyle>(), Ok(PromptStyle::OnlyContext));
        assert_eq!(" context-plus ".parse::<PromptStyle>(), Ok(PromptStyle::ContextPlus));
        assert!("haiku".parse::<PromptStyle>().is_err());
        for style in PromptStyle::ALL {
            assert_eq!(style.to_string().parse::<PromptStyle>(), Ok(style));
        }
    }
}
