//! Categorical parsing with explicit fallback policies.
//!
//! Every parser here is total: unrecognized input lands in a defined
//! fallback bucket (`Other`, `Invalid`, `Missing`, `false`) instead of
//! raising. Timestamps are the one typed field; parse failures become
//! `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{gpu, taxonomy};

/// Issue state derived from free text.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Status {
    Open,
    Closed,
    Other,
}

impl Status {
    /// Trim + lowercase; anything that is not `open` or `closed` is `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "open" => Status::Open,
            "closed" => Status::Closed,
            _ => Status::Other,
        }
    }
}

/// Three-level compile-time taxonomy class.
///
/// Values outside `{A, B, C}` are flagged `Invalid` with the cleaned raw
/// text retained for diagnostics; invalid records are excluded from
/// classification aggregates but stay in the dataset.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CtClass {
    /// Compile-time avoidable.
    A,
    /// Potentially compile-time detectable.
    B,
    /// Runtime-only.
    C,
    /// Out-of-taxonomy value (trimmed, uppercased).
    Invalid(String),
}

impl CtClass {
    /// Trim + uppercase, then match against the fixed taxonomy.
    pub fn parse(raw: &str) -> Self {
        let cleaned = raw.trim().to_uppercase();
        match cleaned.as_str() {
            "A" => CtClass::A,
            "B" => CtClass::B,
            "C" => CtClass::C,
            _ => CtClass::Invalid(cleaned),
        }
    }

    /// True for `A`, `B`, or `C`.
    pub fn is_valid(&self) -> bool {
        !matches!(self, CtClass::Invalid(_))
    }

    /// Canonical label, or the cleaned raw text for invalid values.
    pub fn label(&self) -> &str {
        match self {
            CtClass::A => "A",
            CtClass::B => "B",
            CtClass::C => "C",
            CtClass::Invalid(raw) => raw,
        }
    }
}

/// Refinement of class `B` issues.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CtSubtype {
    /// Configuration/metadata constraint violation.
    B1,
    /// Contract/typestate violation.
    B2,
    /// Absent or unrecognized subtype.
    Missing,
}

impl CtSubtype {
    /// Case-insensitive prefix match on `B1`/`B2`; everything else
    /// (including an absent value) is `Missing`.
    pub fn parse(raw: Option<&str>) -> Self {
        let cleaned = raw.unwrap_or("").trim().to_uppercase();
        if cleaned.starts_with(taxonomy::SUBTYPE_B1_PREFIX) {
            CtSubtype::B1
        } else if cleaned.starts_with(taxonomy::SUBTYPE_B2_PREFIX) {
            CtSubtype::B2
        } else {
            CtSubtype::Missing
        }
    }

    /// Canonical label.
    pub fn label(&self) -> &'static str {
        match self {
            CtSubtype::B1 => "B1",
            CtSubtype::B2 => "B2",
            CtSubtype::Missing => taxonomy::SUBTYPE_MISSING,
        }
    }
}

/// GPU-relevance resolution rule.
///
/// The two rules coexist on purpose: per-source counting accepts the full
/// synonym table, while the tabulation and significance analyses only
/// accept the strict `X` marking. Which rule governs an analysis is fixed
/// by that analysis, not by the data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpuRule {
    /// Accept the boolean synonym table; unknown values resolve to `false`.
    Synonyms,
    /// Only a trimmed `X` (any case) marks relevance.
    StrictX,
}

impl GpuRule {
    /// Resolve a raw flag value. Absent values resolve to `false`; a record
    /// with no GPU column at all is handled upstream (defaults to
    /// relevant).
    ///
    /// Fail-closed: any value outside the recognized sets is `false`,
    /// never `true`.
    pub fn is_relevant(self, raw: Option<&str>) -> bool {
        let value = raw.unwrap_or("");
        match self {
            GpuRule::Synonyms => {
                let cleaned = value.trim().to_lowercase();
                gpu::TRUE_SYNONYMS.contains(&cleaned.as_str())
            }
            GpuRule::StrictX => value.trim().to_uppercase() == gpu::STRICT_MARKER,
        }
    }
}

/// Best-effort timestamp parse; failures become `None`, never an error.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn status_parse_covers_open_closed_other() {
        assert_eq!(Status::parse(" Open "), Status::Open);
        assert_eq!(Status::parse("CLOSED"), Status::Closed);
        assert_eq!(Status::parse("in progress"), Status::Other);
        assert_eq!(Status::parse(""), Status::Other);
    }

    #[test]
    fn ct_class_parse_uppercases_and_flags_invalid() {
        assert_eq!(CtClass::parse(" a"), CtClass::A);
        assert_eq!(CtClass::parse("b "), CtClass::B);
        assert_eq!(CtClass::parse("C"), CtClass::C);
        assert_eq!(CtClass::parse("d"), CtClass::Invalid("D".to_string()));
        assert_eq!(CtClass::parse(""), CtClass::Invalid(String::new()));
        assert!(!CtClass::parse("?").is_valid());
    }

    #[test]
    fn ct_subtype_matches_by_prefix() {
        assert_eq!(CtSubtype::parse(Some("b1")), CtSubtype::B1);
        assert_eq!(CtSubtype::parse(Some("B1: config")), CtSubtype::B1);
        assert_eq!(CtSubtype::parse(Some(" b2 contract")), CtSubtype::B2);
        assert_eq!(CtSubtype::parse(Some("other")), CtSubtype::Missing);
        assert_eq!(CtSubtype::parse(None), CtSubtype::Missing);
    }

    #[test]
    fn gpu_synonyms_accept_the_documented_true_set() {
        for value in ["true", "1", "yes", "Y", " x ", "GPU", "g"] {
            assert!(GpuRule::Synonyms.is_relevant(Some(value)), "{value}");
        }
        for value in ["false", "0", "no", "N", ""] {
            assert!(!GpuRule::Synonyms.is_relevant(Some(value)), "{value}");
        }
    }

    #[test]
    fn gpu_resolution_fails_closed_on_unknown_values() {
        assert!(!GpuRule::Synonyms.is_relevant(Some("maybe")));
        assert!(!GpuRule::Synonyms.is_relevant(Some("relevant?")));
        assert!(!GpuRule::Synonyms.is_relevant(None));
        assert!(!GpuRule::StrictX.is_relevant(Some("yes")));
        assert!(!GpuRule::StrictX.is_relevant(Some("true")));
        assert!(!GpuRule::StrictX.is_relevant(None));
    }

    #[test]
    fn gpu_strict_rule_accepts_only_the_x_marker() {
        assert!(GpuRule::StrictX.is_relevant(Some("X")));
        assert!(GpuRule::StrictX.is_relevant(Some(" x ")));
        assert!(!GpuRule::StrictX.is_relevant(Some("xx")));
    }

    #[test]
    fn created_at_parses_common_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_created_at("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_created_at("2024-03-01 12:30:00+0000"), Some(expected));
        assert_eq!(parse_created_at("2024-03-01T12:30:00"), Some(expected));
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_created_at("2024-03-01"), Some(midnight));
    }

    #[test]
    fn created_at_failures_become_none() {
        assert_eq!(parse_created_at(""), None);
        assert_eq!(parse_created_at("yesterday"), None);
        assert_eq!(parse_created_at("03/2024"), None);
    }
}
