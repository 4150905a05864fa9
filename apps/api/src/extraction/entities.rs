//! Entity Extractor — heuristic résumé structure from plain text: name,
//! email, phone, location, experience, education. Skill extraction is
//! composed in by the caller so the text is not scanned twice.
//!
//! Absent fields are `None`, never an empty-string sentinel.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extraction::skills::title_case;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").expect("valid email pattern"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d \-()]{7,}\d").expect("valid phone pattern"));
static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?: [A-Z][a-z]+)?, (?:[A-Z]{2}|[A-Z][a-z]+(?: [A-Z][a-z]+)?))\b")
        .expect("valid location pattern")
});
static EMPLOYER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z\s&.]+(?:Inc\.?|LLC|Ltd\.?|Corp\.?|Company|Technologies|Solutions)?$")
        .expect("valid employer pattern")
});
static ROLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Engineer|Developer|Manager|Analyst|Consultant|Specialist|Lead|Architect)")
        .expect("valid role pattern")
});

/// Lines that are résumé section headings, never names.
const SECTION_HEADERS: &[&str] = &[
    "key skills",
    "experience",
    "education",
    "summary",
    "objective",
    "performance",
    "dashboards",
    "projects",
    "achievements",
    "certifications",
    "technical skills",
    "professional experience",
    "work experience",
];

/// Words that disqualify a candidate name span.
const NON_NAME_WORDS: &[&str] = &[
    "resume",
    "cv",
    "curriculum vitae",
    "llama",
    "gpt",
    "chat",
    "ai",
    "machine learning",
    "artificial intelligence",
    "data science",
];

const DEGREE_KEYWORDS: &[&str] = &[
    "bachelor", "master", "phd", "bca", "mca", "b.tech", "m.tech",
];

/// One employment entry, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub role: String,
}

/// Everything parsed from one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub skills: BTreeSet<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<String>,
}

/// Builds the full profile from plain text plus the already-extracted skill
/// set.
pub fn extract_profile(text: &str, skills: BTreeSet<String>) -> ExtractedProfile {
    let email = extract_email(text);
    ExtractedProfile {
        name: extract_name(text, email.as_deref()),
        phone: extract_phone(text),
        location: extract_location(text),
        experience: extract_experience(text),
        education: extract_education(text),
        email,
        skills,
    }
}

pub fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

pub fn extract_phone(text: &str) -> Option<String> {
    PHONE.find(text).map(|m| m.as_str().to_string())
}

/// First "City, Region" mention. A deterministic stand-in for place NER; a
/// real recognizer can replace this behind the same signature.
pub fn extract_location(text: &str) -> Option<String> {
    LOCATION
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Name resolution, first success wins: the email local part, then lines
/// adjacent to the email, then the first ten non-empty lines.
pub fn extract_name(text: &str, email: Option<&str>) -> Option<String> {
    name_from_email(email)
        .or_else(|| name_near_email(text, email))
        .or_else(|| name_from_first_lines(text))
}

fn name_from_email(email: Option<&str>) -> Option<String> {
    let local = email?.split('@').next()?;
    let cleaned: String = local
        .chars()
        .map(|c| {
            if c == '.' || c == '_' || c.is_ascii_digit() {
                ' '
            } else {
                c
            }
        })
        .collect();
    let parts: Vec<String> = cleaned.split_whitespace().map(capitalize).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn name_near_email(text: &str, email: Option<&str>) -> Option<String> {
    let email = email?;
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if !line.contains(email) {
            continue;
        }
        let mut context: Vec<&str> = Vec::new();
        if i > 0 {
            context.push(lines[i - 1]);
        }
        context.push(line);
        if i + 1 < lines.len() {
            context.push(lines[i + 1]);
        }
        for candidate_line in context {
            if let Some(name) = probable_name_span(candidate_line) {
                return Some(name);
            }
        }
    }
    None
}

fn name_from_first_lines(text: &str) -> Option<String> {
    for line in text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(10)
    {
        let lowered = line.to_lowercase();
        if SECTION_HEADERS.iter().any(|h| lowered.contains(h)) {
            continue;
        }
        if NON_NAME_WORDS.iter().any(|w| lowered.contains(w)) {
            continue;
        }
        if line.split_whitespace().count() > 4 {
            continue;
        }
        if let Some(name) = probable_name_span(line) {
            return Some(name);
        }
    }
    None
}

/// Longest run (up to three words) of capitalized alphabetic words that
/// clears both denylists.
fn probable_name_span(line: &str) -> Option<String> {
    let words: Vec<String> = line
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphabetic())
                .to_string()
        })
        .filter(|w| !w.is_empty())
        .collect();

    for start in 0..words.len() {
        let max_len = 3.min(words.len() - start);
        for len in (1..=max_len).rev() {
            let span = &words[start..start + len];
            if !span.iter().all(|w| is_capitalized_word(w)) {
                continue;
            }
            let candidate = span.join(" ");
            let lowered = candidate.to_lowercase();
            if SECTION_HEADERS.iter().any(|h| lowered.contains(h)) {
                continue;
            }
            if NON_NAME_WORDS.iter().any(|w| lowered.contains(w)) {
                continue;
            }
            return Some(candidate);
        }
    }
    None
}

fn is_capitalized_word(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.is_uppercase() && word.chars().all(char::is_alphabetic),
        None => false,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Single top-to-bottom scan pairing employer-looking lines (all caps with
/// an optional corporate suffix) with job-title lines. A new employer while
/// both are pending emits the pair and clears the role; a trailing pair is
/// emitted at end of scan.
pub fn extract_experience(text: &str) -> Vec<ExperienceEntry> {
    let mut entries = Vec::new();
    let mut company: Option<String> = None;
    let mut role: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if EMPLOYER.is_match(line) {
            if let (Some(c), Some(r)) = (&company, &role) {
                entries.push(ExperienceEntry {
                    company: c.clone(),
                    role: r.clone(),
                });
            }
            company = Some(line.to_string());
            role = None;
        } else if ROLE.is_match(line) {
            role = Some(line.to_string());
        }
    }
    if let (Some(c), Some(r)) = (company, role) {
        entries.push(ExperienceEntry {
            company: c,
            role: r,
        });
    }
    entries
}

/// Every line containing a degree keyword, title-cased and deduplicated in
/// first-seen order so repeated parses stay idempotent.
pub fn extract_education(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let line = raw.trim();
        let lowered = line.to_lowercase();
        if DEGREE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            let entry = title_case(line);
            if !lines.contains(&entry) {
                lines.push(entry);
            }
        }
    }
    lines
}
