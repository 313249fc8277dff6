//! Filename-based document classification.

use crate::types::DocumentType;

/// Keyword sets in precedence order. The first set with a match wins.
const RULES: &[(DocumentType, &[&str])] = &[
    (DocumentType::Invoice, &["請求書", "invoice"]),
    (DocumentType::Receipt, &["領収書", "receipt"]),
    (DocumentType::Contract, &["契約書", "contract"]),
    (DocumentType::TaxReturn, &["申告書", "tax"]),
];

/// Classify a document by its file name.
///
/// Matching is a case-insensitive substring search. Names that match no
/// keyword are [`DocumentType::Other`].
pub fn classify_document(name: &str) -> DocumentType {
    let lowered = name.to_lowercase();

    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
        .map(|(doc_type, _)| *doc_type)
        .unwrap_or(DocumentType::Other)
}
