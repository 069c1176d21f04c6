// src/controller/diagnostics.rs

use protondrive_common::ControllerError;

/// Phrases rclone and the Proton backend use when the one-time code is the
/// problem. Matched case-insensitively, as whole words only.
const TWO_FACTOR_MARKERS: &[&str] = &["2fa", "two-factor", "two factor", "second factor", "one-time", "otp"];

pub const FRESH_CODE_HINT: &str =
    "Two-factor code was rejected. Codes expire after about 10 minutes and cannot be reused; run the configuration again with a fresh code.";

pub fn mentions_two_factor(text: &str) -> bool {
    let lower = text.to_lowercase();
    TWO_FACTOR_MARKERS.iter().any(|m| contains_word(&lower, m))
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Classify a failed probe by its diagnostic text.
pub fn probe_error(diagnostic: String) -> ControllerError {
    if mentions_two_factor(&diagnostic) {
        ControllerError::ProbeFailedTwoFactor(diagnostic)
    } else {
        ControllerError::ProbeFailed(diagnostic)
    }
}

/// Replace every occurrence of `secret` in tool output with `***`.
pub fn scrub_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        text.to_string()
    } else {
        text.replace(secret, "***")
    }
}
