//! Response Parser — recovers structured fields from raw provider output.
//!
//! The provider is asked for a fixed JSON schema but is never trusted to
//! follow it. Fields are located by canonicalized key name (case, `_`, `-`
//! and spaces ignored) against an alias table; unknown keys are ignored.
//! When no JSON object is recovered at all, explicitly labelled scores
//! ("ATS score: 72") are scanned out of the prose instead; a payload cut off
//! mid-object only yields its complete `"key": number` lines. Output with no
//! recoverable score fails, and a recovered object is never topped up from
//! numbers in its own text.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

lazy_static! {
    /// A string score value such as "85", "85/100" or "72%", and nothing else.
    static ref SCORE_STRING_PATTERN: Regex =
        Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*(?:/\s*100|%)?\s*$").unwrap();

    /// A label immediately followed by its number: "Overall Score: 82/100",
    /// "**ATS score** - 70", "match score is 64%". A leading `-` belongs to the
    /// number unless whitespace follows it.
    static ref PROSE_SCORE_PATTERN: Regex = Regex::new(
        r#"(?:^|[^a-z])(?P<label>ats\s+compatibility\s+score|ats\s+score|job\s+match\s+score|match\s+score|compatibility(?:\s+score)?|overall\s+score|resume\s+score|score)[\s*"'`]*(?:[:=–]|-\s|\bis\b|\bof\b)?[\s*"'`]*(?P<number>-?\d{1,3}(?:\.\d+)?)(?:\s*/\s*100|\s*%)?(?:$|[^\w%/])"#
    )
    .unwrap();

    /// One complete `"key": number` line of a JSON payload that was cut off.
    static ref JSON_SCORE_LINE_PATTERN: Regex =
        Regex::new(r#"^\s*\{?\s*"([^"]+)"\s*:\s*(-?\d+(?:\.\d+)?)\s*,?\s*$"#).unwrap();

    /// Leading bullet or enumeration marker on a list line.
    static ref BULLET_PATTERN: Regex = Regex::new(r"^\s*(?:[-*•·]|\d{1,2}[.)])\s+").unwrap();
}

const SCORE_KEYS: &[&str] = &["score", "overallscore", "resumescore", "qualityscore", "overall"];
const ATS_KEYS: &[&str] = &["atsscore", "ats", "atscompatibilityscore", "atscompatibility"];
const COMPATIBILITY_KEYS: &[&str] = &[
    "compatibilityscore",
    "compatibility",
    "matchscore",
    "jobmatchscore",
    "match",
    "fitscore",
    "matchpercentage",
];
const SUGGESTION_KEYS: &[&str] = &["suggestions", "improvements", "improvementsuggestions", "feedback"];
const GRAMMAR_KEYS: &[&str] = &[
    "grammarfixes",
    "grammarfix",
    "grammar",
    "correctedresume",
    "correctedtext",
    "grammarcorrected",
];
const MATCHING_KEYS: &[&str] = &["matchingskills", "matchedskills", "skillsmatched", "matching"];
const MISSING_KEYS: &[&str] = &["missingskills", "skillgaps", "gaps", "missing", "lackingskills"];
const RECOMMENDATION_KEYS: &[&str] = &["recommendations", "recommendation", "recs"];
const POLISHED_KEYS: &[&str] = &[
    "polishedresume",
    "tailoredresume",
    "optimizedresume",
    "rewrittenresume",
    "improvedresume",
];

/// Keys inside list items that hold the item's text.
const ITEM_TEXT_KEYS: &[&str] = &[
    "text",
    "suggestion",
    "recommendation",
    "skill",
    "name",
    "title",
    "description",
    "value",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("provider returned empty output")]
    Empty { raw: String },

    #[error("no score could be recovered from provider output")]
    NoScore { raw: String },
}

/// Everything recovered from one provider answer. Scores are unclamped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFields {
    pub score: Option<f64>,
    pub ats_score: Option<f64>,
    pub compatibility_score: Option<f64>,
    pub suggestions: Vec<String>,
    pub grammar_fixes: Option<String>,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub recommendations: Vec<String>,
    pub polished_resume: Option<String>,
}

impl ParsedFields {
    pub fn has_score(&self) -> bool {
        self.score.is_some() || self.ats_score.is_some() || self.compatibility_score.is_some()
    }
}

pub fn parse(raw: &str) -> Result<ParsedFields, ParseError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ParseError::Empty {
            raw: raw.to_string(),
        });
    }

    let unfenced = strip_json_fences(text);
    let fields = match find_fields_object(text) {
        Some(object) => extract_object(&object),
        None if unfenced.starts_with('{') => scan_truncated_json(unfenced),
        None => scan_prose_scores(text),
    };

    if !fields.has_score() {
        return Err(ParseError::NoScore {
            raw: raw.to_string(),
        });
    }

    Ok(fields)
}

// ────────────────────────────────────────────────────────────────────────────
// Locating the JSON payload
// ────────────────────────────────────────────────────────────────────────────

/// Returns the JSON object that most likely holds the analysis: the whole
/// (fence-stripped) text if it parses, otherwise the first balanced `{…}`
/// that parses. Nested wrappers like `{"analysis": {...}}` are descended.
fn find_fields_object(text: &str) -> Option<Map<String, Value>> {
    let mut candidates = Vec::new();
    if let Ok(Value::Object(object)) = serde_json::from_str(strip_json_fences(text)) {
        candidates.push(object);
    }
    candidates.extend(embedded_objects(text));

    let mut fallback = None;
    for candidate in candidates {
        if let Some(found) = object_with_recognized_keys(&candidate) {
            if has_any_key(found, &[SCORE_KEYS, ATS_KEYS, COMPATIBILITY_KEYS]) {
                return Some(found.clone());
            }
            if fallback.is_none() {
                fallback = Some(found.clone());
            }
        }
    }
    fallback
}

/// Depth-first search for the first object that has any recognized key.
fn object_with_recognized_keys(object: &Map<String, Value>) -> Option<&Map<String, Value>> {
    const ALL: &[&[&str]] = &[
        SCORE_KEYS,
        ATS_KEYS,
        COMPATIBILITY_KEYS,
        SUGGESTION_KEYS,
        GRAMMAR_KEYS,
        MATCHING_KEYS,
        MISSING_KEYS,
        RECOMMENDATION_KEYS,
        POLISHED_KEYS,
    ];
    if has_any_key(object, ALL) {
        return Some(object);
    }
    object.values().find_map(|value| match value {
        Value::Object(inner) => object_with_recognized_keys(inner),
        _ => None,
    })
}

fn has_any_key(object: &Map<String, Value>, groups: &[&[&str]]) -> bool {
    object.keys().any(|key| {
        let key = canonical_key(key);
        groups.iter().any(|group| group.contains(&key.as_str()))
    })
}

/// All balanced `{…}` spans in `text` that parse as JSON objects.
fn embedded_objects(text: &str) -> Vec<Map<String, Value>> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = matching_brace(bytes, i) {
                if let Ok(Value::Object(object)) = serde_json::from_str(&text[i..=end]) {
                    found.push(object);
                    i = end + 1;
                    continue;
                }
            }
        }
        i += 1;
    }

    found
}

/// Index of the `}` closing the `{` at `start`, honouring JSON strings.
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }

    None
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Field extraction
// ────────────────────────────────────────────────────────────────────────────

fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn extract_object(object: &Map<String, Value>) -> ParsedFields {
    let by_key: HashMap<String, &Value> = object
        .iter()
        .map(|(key, value)| (canonical_key(key), value))
        .collect();

    // Aliases are listed in priority order; the first present one wins.
    let lookup = |aliases: &[&str]| aliases.iter().find_map(|alias| by_key.get(*alias).copied());

    ParsedFields {
        score: lookup(SCORE_KEYS).and_then(score_value),
        ats_score: lookup(ATS_KEYS).and_then(score_value),
        compatibility_score: lookup(COMPATIBILITY_KEYS).and_then(score_value),
        suggestions: lookup(SUGGESTION_KEYS).map(|v| list_value(v, false)).unwrap_or_default(),
        grammar_fixes: lookup(GRAMMAR_KEYS).and_then(text_value),
        matching_skills: lookup(MATCHING_KEYS).map(|v| list_value(v, true)).unwrap_or_default(),
        missing_skills: lookup(MISSING_KEYS).map(|v| list_value(v, true)).unwrap_or_default(),
        recommendations: lookup(RECOMMENDATION_KEYS)
            .map(|v| list_value(v, false))
            .unwrap_or_default(),
        polished_resume: lookup(POLISHED_KEYS).and_then(text_value),
    }
}

fn score_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => SCORE_STRING_PATTERN
            .captures(s)
            .and_then(|c| c[1].parse::<f64>().ok()),
        Value::Object(inner) => ["score", "value"]
            .iter()
            .find_map(|k| inner.get(*k))
            .and_then(score_value),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Reads a list field. Anything malformed degrades to fewer (or zero) items.
fn list_value(value: &Value, split_commas: bool) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(item_text).collect(),
        Value::String(s) => split_list_string(s, split_commas),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn item_text(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(object) => ITEM_TEXT_KEYS
            .iter()
            .find_map(|k| object.get(*k).and_then(Value::as_str))
            .or_else(|| object.values().find_map(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

fn split_list_string(s: &str, split_commas: bool) -> Vec<String> {
    let lines: Vec<&str> = s.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() > 1 {
        return lines
            .into_iter()
            .map(|line| BULLET_PATTERN.replace(line, "").into_owned())
            .collect();
    }
    if split_commas {
        return s.split([',', ';']).map(str::to_string).collect();
    }
    vec![BULLET_PATTERN.replace(s, "").into_owned()]
}

// ────────────────────────────────────────────────────────────────────────────
// Prose fallback
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreLabel {
    Overall,
    Ats,
    Compatibility,
}

impl ScoreLabel {
    fn slot(self, fields: &mut ParsedFields) -> &mut Option<f64> {
        match self {
            ScoreLabel::Overall => &mut fields.score,
            ScoreLabel::Ats => &mut fields.ats_score,
            ScoreLabel::Compatibility => &mut fields.compatibility_score,
        }
    }
}

fn label_for_key(key: &str) -> Option<ScoreLabel> {
    let key = canonical_key(key);
    if SCORE_KEYS.contains(&key.as_str()) {
        Some(ScoreLabel::Overall)
    } else if ATS_KEYS.contains(&key.as_str()) {
        Some(ScoreLabel::Ats)
    } else if COMPATIBILITY_KEYS.contains(&key.as_str()) {
        Some(ScoreLabel::Compatibility)
    } else {
        None
    }
}

/// First value wins per slot.
fn fill_slot(fields: &mut ParsedFields, label: ScoreLabel, number: f64) {
    let slot = label.slot(fields);
    if slot.is_none() && number.is_finite() {
        *slot = Some(number);
    }
}

/// Recovers score keys from the complete lines of an unterminated object.
fn scan_truncated_json(text: &str) -> ParsedFields {
    let mut fields = ParsedFields::default();
    for line in text.lines() {
        let Some(captures) = JSON_SCORE_LINE_PATTERN.captures(line) else {
            continue;
        };
        let (Some(label), Ok(number)) = (label_for_key(&captures[1]), captures[2].parse()) else {
            continue;
        };
        fill_slot(&mut fields, label, number);
    }
    fields
}

/// Scans line by line for a score label directly followed by its number.
fn scan_prose_scores(text: &str) -> ParsedFields {
    let mut fields = ParsedFields::default();
    for line in text.lines() {
        let lower = line.to_lowercase();
        let Some(captures) = PROSE_SCORE_PATTERN.captures(&lower) else {
            continue;
        };
        let Ok(number) = captures["number"].parse::<f64>() else {
            continue;
        };
        let label = &captures["label"];
        let label = if label.starts_with("ats") {
            ScoreLabel::Ats
        } else if label.contains("match") || label.contains("compatibility") {
            ScoreLabel::Compatibility
        } else {
            ScoreLabel::Overall
        };
        fill_slot(&mut fields, label, number);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_schema() {
        let fields = parse(
            r#"{"score": 78, "atsScore": 71, "suggestions": ["Add metrics"], "grammarFixes": "Fixed."}"#,
        )
        .unwrap();
        assert_eq!(fields.score, Some(78.0));
        assert_eq!(fields.ats_score, Some(71.0));
        assert_eq!(fields.suggestions, vec!["Add metrics"]);
        assert_eq!(fields.grammar_fixes.as_deref(), Some("Fixed."));
        assert!(fields.compatibility_score.is_none());
    }

    #[test]
    fn test_prose_around_json_is_ignored() {
        let raw = "Sure! Here is the analysis you asked for:\n\n\
                   {\"score\": 64, \"atsScore\": 58, \"suggestions\": []}\n\n\
                   Let me know if you need anything else {or more detail}.";
        let fields = parse(raw).unwrap();
        assert_eq!(fields.score, Some(64.0));
        assert_eq!(fields.ats_score, Some(58.0));
    }

    #[test]
    fn test_code_fences_are_stripped() {
        let raw = "```json\n{\"score\": 90, \"atsScore\": 85}\n```";
        assert_eq!(parse(raw).unwrap().score, Some(90.0));
    }

    #[test]
    fn test_key_name_drift() {
        let raw = r#"{
            "Overall Score": "82/100",
            "ats_score": "75%",
            "match_score": 61,
            "Matched Skills": ["Rust"],
            "skill-gaps": "Kafka, Terraform",
            "tailored_resume": "Tailored text",
            "corrected_resume": "Corrected text",
            "improvements": ["Shorter summary"],
            "unrelated": {"foo": 1}
        }"#;
        let fields = parse(raw).unwrap();
        assert_eq!(fields.score, Some(82.0));
        assert_eq!(fields.ats_score, Some(75.0));
        assert_eq!(fields.compatibility_score, Some(61.0));
        assert_eq!(fields.matching_skills, vec!["Rust"]);
        assert_eq!(fields.missing_skills, vec!["Kafka", "Terraform"]);
        assert_eq!(fields.polished_resume.as_deref(), Some("Tailored text"));
        assert_eq!(fields.grammar_fixes.as_deref(), Some("Corrected text"));
        assert_eq!(fields.suggestions, vec!["Shorter summary"]);
    }

    #[test]
    fn test_missing_optional_fields_become_empty() {
        let fields = parse(r#"{"score": 55}"#).unwrap();
        assert_eq!(fields.score, Some(55.0));
        assert!(fields.suggestions.is_empty());
        assert!(fields.matching_skills.is_empty());
        assert!(fields.missing_skills.is_empty());
        assert!(fields.recommendations.is_empty());
        assert!(fields.grammar_fixes.is_none());
        assert!(fields.polished_resume.is_none());
    }

    #[test]
    fn test_malformed_lists_degrade_gracefully() {
        let raw = r#"{"score": 70, "atsScore": 60, "suggestions": 42, "recommendations": {"a": null}}"#;
        let fields = parse(raw).unwrap();
        assert!(fields.suggestions.is_empty());
        assert!(fields.recommendations.is_empty());
    }

    #[test]
    fn test_list_items_as_objects() {
        let raw = r#"{"score": 70, "suggestions": [
            {"suggestion": "Use action verbs", "priority": "high"},
            {"priority": 2, "detail": "Trim references"},
            null,
            ""
        ]}"#;
        let fields = parse(raw).unwrap();
        assert_eq!(fields.suggestions, vec!["Use action verbs", "Trim references"]);
    }

    #[test]
    fn test_list_as_bulleted_string() {
        let raw = r#"{"score": 70, "suggestions": "- Add metrics\n- Fix dates\n\n3. Remove photo"}"#;
        let fields = parse(raw).unwrap();
        assert_eq!(fields.suggestions, vec!["Add metrics", "Fix dates", "Remove photo"]);
    }

    #[test]
    fn test_nested_wrapper_object() {
        let raw = r#"{"analysis": {"score": 66, "atsScore": 70}, "model": "x"}"#;
        let fields = parse(raw).unwrap();
        assert_eq!(fields.score, Some(66.0));
        assert_eq!(fields.ats_score, Some(70.0));
    }

    #[test]
    fn test_out_of_range_scores_are_kept_for_the_normalizer() {
        let fields = parse(r#"{"score": 145, "atsScore": -5}"#).unwrap();
        assert_eq!(fields.score, Some(145.0));
        assert_eq!(fields.ats_score, Some(-5.0));
    }

    #[test]
    fn test_prose_scores_fallback() {
        let raw = "**Overall Score:** 82/100\n\
                   **ATS Compatibility Score:** 70\n\
                   Job match score - 64%\n\
                   The resume is strong but lacks metrics.";
        let fields = parse(raw).unwrap();
        assert_eq!(fields.score, Some(82.0));
        assert_eq!(fields.ats_score, Some(70.0));
        assert_eq!(fields.compatibility_score, Some(64.0));
    }

    #[test]
    fn test_truncated_json_recovers_scores() {
        let raw = "{\n  \"score\": 77,\n  \"atsScore\": 69,\n  \"suggestions\": [\"Add a summ";
        let fields = parse(raw).unwrap();
        assert_eq!(fields.score, Some(77.0));
        assert_eq!(fields.ats_score, Some(69.0));
        assert!(fields.suggestions.is_empty());
    }

    #[test]
    fn test_prose_without_numbers_fails_closed() {
        let raw = "I'm sorry, but I can't evaluate this resume. It looks great overall, \
                   though the score depends on the role.";
        assert!(matches!(parse(raw), Err(ParseError::NoScore { .. })));
    }

    #[test]
    fn test_refusal_with_incidental_numbers_fails_closed() {
        let raw = "I'm sorry, but I can't provide a rating here. The score is based on 3 \
                   factors, and a match needs at least 2 job descriptions to compare.";
        assert!(matches!(parse(raw), Err(ParseError::NoScore { .. })));
    }

    #[test]
    fn test_json_without_scores_ignores_numbers_in_its_strings() {
        let raw = r#"{"suggestions": ["Improve your ATS score by adding 5 keywords"], "grammarFixes": "Overall score: 40"}"#;
        assert!(matches!(parse(raw), Err(ParseError::NoScore { .. })));
    }

    #[test]
    fn test_prose_number_must_stand_alone() {
        assert!(parse("Your SAT score of 1450 is irrelevant here.").is_err());
        assert_eq!(parse("Overall score: -5").unwrap().score, Some(-5.0));
        assert_eq!(parse("ATS score is 71.").unwrap().ats_score, Some(71.0));
        assert_eq!(
            parse("Compatibility: 64% overall").unwrap().compatibility_score,
            Some(64.0)
        );
    }

    #[test]
    fn test_string_score_must_be_numeric() {
        let raw = r#"{"score": "based on 3 factors", "atsScore": "68 / 100"}"#;
        let fields = parse(raw).unwrap();
        assert_eq!(fields.score, None);
        assert_eq!(fields.ats_score, Some(68.0));
    }

    #[test]
    fn test_json_without_scores_fails_closed() {
        let raw = r#"{"suggestions": ["Add metrics"], "grammarFixes": "text"}"#;
        assert!(matches!(parse(raw), Err(ParseError::NoScore { .. })));
    }

    #[test]
    fn test_empty_output_fails() {
        assert!(matches!(parse("   \n"), Err(ParseError::Empty { .. })));
    }

    #[test]
    fn test_parse_error_keeps_raw_output() {
        match parse("no numbers here") {
            Err(ParseError::NoScore { raw }) => assert_eq!(raw, "no numbers here"),
            other => panic!("expected NoScore, got {other:?}"),
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_scanner() {
        let raw = r#"Result: {"score": 50, "grammarFixes": "Use {braces} and \"quotes\" }"} done"#;
        let fields = parse(raw).unwrap();
        assert_eq!(fields.score, Some(50.0));
        assert_eq!(
            fields.grammar_fixes.as_deref(),
            Some("Use {braces} and \"quotes\" }")
        );
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("ATS Score"), "atsscore");
        assert_eq!(canonical_key("ats_score"), "atsscore");
        assert_eq!(canonical_key("atsScore"), "atsscore");
        assert_eq!(canonical_key("missing-skills"), "missingskills");
    }
}
