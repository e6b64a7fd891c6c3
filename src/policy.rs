use serde::Deserialize;

/// Wording that marks a posting as excluded. Matched as lower-case substrings.
const NO_AI_MARKERS: &[&str] = &[
    "no ai",
    "no a.i",
    "no-ai",
    "no artificial intelligence",
    "without ai",
    "ai-free",
];

/// What the pipeline does with a policy-excluded posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Skip the posting.
    #[default]
    Drop,
    /// Keep it with `policy_flag` set so a reviewer sees the decision.
    Flag,
}

/// Substring match, not word boundary: "no ai" also hits inside longer words.
pub fn is_policy_excluded(title: &str, description: &str) -> bool {
    let text = format!("{} {}", title, description).to_lowercase();
    NO_AI_MARKERS.iter().any(|marker| text.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenated_marker_in_description() {
        assert!(is_policy_excluded("Senior Designer", "This role has a no-ai policy"));
    }

    #[test]
    fn plain_ai_mentions_pass() {
        assert!(!is_policy_excluded("AI Designer", "works on AI products"));
    }

    #[test]
    fn case_insensitive_across_title_and_description() {
        assert!(is_policy_excluded("Illustrator (No AI)", ""));
        assert!(is_policy_excluded("", "Portfolio must be made WITHOUT AI assistance"));
        assert!(is_policy_excluded("Designer", "An AI-free studio"));
        assert!(is_policy_excluded("Designer", "No A.I. generated work"));
        assert!(is_policy_excluded("Designer", "no artificial intelligence tools"));
    }

    #[test]
    fn substring_matches_inside_longer_words() {
        // "piano aide" contains "no ai" once lower-cased.
        assert!(is_policy_excluded("Piano Aide", ""));
    }
}
