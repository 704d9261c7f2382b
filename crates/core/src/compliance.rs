//! Rule-based checks applied to generated application text.
//!
//! The checklist is keyword presence only. It does not judge quality, it only
//! flags sections that never mention one of the elements Erasmus+ evaluators
//! look for.

use crate::domain::application::ComplianceDetails;

struct ComplianceRule {
    keywords: &'static [&'static str],
    strength: &'static str,
    missing: &'static str,
}

const RULES: &[ComplianceRule] = &[
    ComplianceRule {
        keywords: &["european", "europe"],
        strength: "Strong European dimension clearly articulated",
        missing: "European dimension needs stronger emphasis",
    },
    ComplianceRule {
        keywords: &["participants", "youth", "young people", "target group"],
        strength: "Target group clearly defined",
        missing: "Target group definition could be clearer",
    },
    ComplianceRule {
        keywords: &["innovative", "innovation", "new approach"],
        strength: "Innovation elements present",
        missing: "Consider adding more innovation elements",
    },
];

pub const IMPROVEMENT_SUGGESTIONS: [&str; 3] = [
    "Consider adding specific quantifiable outcomes",
    "Include references to relevant EU policies or priorities",
    "Ensure clear link between activities and expected results",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComplianceReport {
    pub compliant: bool,
    pub details: ComplianceDetails,
}

impl ComplianceReport {
    /// Missing elements followed by the standing suggestions, as stored on a
    /// persisted section.
    pub fn suggestions(&self) -> Vec<String> {
        self.details
            .missing_elements
            .iter()
            .chain(self.details.improvement_suggestions.iter())
            .cloned()
            .collect()
    }
}

pub fn check(content: &str) -> ComplianceReport {
    let lowered = content.to_lowercase();
    let mut details = ComplianceDetails {
        improvement_suggestions: IMPROVEMENT_SUGGESTIONS.iter().map(ToString::to_string).collect(),
        ..ComplianceDetails::default()
    };

    for rule in RULES {
        if rule.keywords.iter().any(|keyword| lowered.contains(keyword)) {
            details.strength_areas.push(rule.strength.to_string());
        } else {
            details.missing_elements.push(rule.missing.to_string());
        }
    }

    ComplianceReport { compliant: details.missing_elements.is_empty(), details }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Cuts `text` down to at most `limit` whitespace-separated words. A cut is
/// marked with a trailing ellipsis glued to the last kept word so the count
/// does not grow.
pub fn truncate_to_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        return text.trim().to_string();
    }
    if limit == 0 {
        return String::new();
    }

    let mut truncated = words[..limit].join(" ");
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::{check, truncate_to_words, word_count, IMPROVEMENT_SUGGESTIONS};

    #[test]
    fn fully_compliant_text_has_no_missing_elements() {
        let report = check(
            "This innovative European exchange gives young people from five countries a voice.",
        );
        assert!(report.compliant);
        assert!(report.details.missing_elements.is_empty());
        assert_eq!(report.details.strength_areas.len(), 3);
    }

    #[test]
    fn missing_elements_are_listed_in_checklist_order() {
        let report = check("A local workshop series on gardening.");
        assert!(!report.compliant);
        assert_eq!(
            report.details.missing_elements,
            vec![
                "European dimension needs stronger emphasis",
                "Target group definition could be clearer",
                "Consider adding more innovation elements",
            ]
        );
    }

    #[test]
    fn suggestions_combine_missing_elements_and_standing_advice() {
        let report = check("Participants across Europe.");
        let suggestions = report.suggestions();
        assert_eq!(suggestions.first().map(String::as_str), Some("Consider adding more innovation elements"));
        assert_eq!(suggestions.len(), 1 + IMPROVEMENT_SUGGESTIONS.len());
    }

    #[test]
    fn truncation_never_exceeds_limit() {
        let text = "one two three four five six seven eight nine ten";
        for limit in 1..=12 {
            let truncated = truncate_to_words(text, limit);
            assert!(word_count(&truncated) <= limit, "limit {limit} exceeded: {truncated}");
        }
        assert_eq!(truncate_to_words(text, 3), "one two three...");
        assert_eq!(truncate_to_words("  short text ", 5), "short text");
    }

    #[test]
    fn word_count_ignores_repeated_whitespace() {
        assert_eq!(word_count("  alpha\n\nbeta\tgamma  "), 3);
        assert_eq!(word_count(""), 0);
    }
}
