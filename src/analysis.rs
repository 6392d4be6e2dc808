//! Text helpers over model-written analyses and feedback
//!
//! Paper analyses are free text. These functions pull out the parts the
//! store keeps track of: the "areas for improvement" list, a correct or
//! incorrect verdict from practice feedback, and marks or percentages.

use once_cell::sync::Lazy;
use regex::Regex;

static IMPROVEMENT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)AREAS?\s+FOR\s+IMPROVEMENT[:\-–]*\s*").expect("valid regex"));

/// Next numbered section, e.g. "5. Recommendations"
static NEXT_SECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d+\.\s+[A-Z]").expect("valid regex"));

static BULLETS_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\*•\-]+$").expect("valid regex"));
static EXCLAMATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z][a-z]+.*!$").expect("valid regex"));
static NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[\.)]\s+[A-Z]").expect("valid regex"));
static BULLET_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[•\-*]\s*").expect("valid regex"));

static NEGATIVE_FEEDBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(incorrect|wrong|not correct|not right)\b").expect("valid regex"));
static POSITIVE_FEEDBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(^correct|right|well done|excellent|perfect|great job)\b").expect("valid regex"));

static MARKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:out of|/)\s*(\d+)").expect("valid regex"));
static PERCENTAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("valid regex"));

/// Topic names listed under the first "AREAS FOR IMPROVEMENT" heading.
///
/// The section runs until the next numbered heading or the end of the text.
/// Bullet markers are stripped; reading stops at encouragement lines, table
/// rows and numbered recommendations. Lines of 100 characters or more are
/// not topic names and are skipped.
pub fn extract_weak_areas(analysis: &str) -> Vec<String> {
    let Some(header) = IMPROVEMENT_HEADER.find(analysis) else {
        return Vec::new();
    };
    let rest = &analysis[header.end()..];
    let section = match NEXT_SECTION.find(rest) {
        Some(next) => &rest[..next.start()],
        None => rest,
    };

    let mut areas = Vec::new();
    for line in section.trim().lines() {
        let line = line.trim();
        if line.is_empty() || BULLETS_ONLY.is_match(line) {
            continue;
        }
        if line.starts_with("You're") || EXCLAMATION.is_match(line) {
            break;
        }
        if line.starts_with('|') || NUMBERED_ITEM.is_match(line) {
            break;
        }

        let cleaned = BULLET_PREFIX.replace(line, "");
        let cleaned = cleaned.trim();
        if !cleaned.is_empty() && cleaned.chars().count() < 100 {
            areas.push(cleaned.to_string());
        }
    }
    areas
}

/// Decide whether practice feedback marks the answer correct.
///
/// Leading verdict words win; otherwise negative phrases are checked before
/// positive ones, and anything unrecognised counts as incorrect.
pub fn classify_feedback(feedback: &str) -> bool {
    let text = feedback.trim().to_lowercase();

    if text.starts_with("correct") {
        return true;
    }
    if text.starts_with("partially") || text.starts_with("incorrect") || text.starts_with("wrong") {
        return false;
    }
    if NEGATIVE_FEEDBACK.is_match(&text) {
        return false;
    }
    POSITIVE_FEEDBACK.is_match(&text)
}

/// First "N out of M" or "N/M" in the text, as (obtained, total)
pub fn extract_marks(analysis: &str) -> Option<(String, String)> {
    let caps = MARKS.captures(analysis)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// First percentage figure in the text, without the sign
pub fn extract_percentage(analysis: &str) -> Option<String> {
    PERCENTAGE.captures(analysis).map(|caps| caps[1].to_string())
}
