use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A grade as students enter it: usually numeric, sometimes a mark such as `"INC"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GradeValue {
    Number(f64),
    Text(String),
}

impl GradeValue {
    pub fn numeric(&self) -> Option<f64> {
        let v = match self {
            GradeValue::Number(n) => *n,
            GradeValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub subject: String,
    pub grade: GradeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<f64>,
}

pub fn round_off_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Arithmetic mean of the numeric grades, unweighted by units.
/// `None` when no subject carries a numeric grade.
pub fn grade_average(subjects: &[Subject]) -> Option<f64> {
    let grades: Vec<f64> = subjects.iter().filter_map(|s| s.grade.numeric()).collect();
    if grades.is_empty() {
        return None;
    }
    let sum: f64 = grades.iter().sum();
    Some(round_off_2_decimals(sum / grades.len() as f64))
}

fn semester_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{4}-S[12]$").expect("semester regex"))
}

pub fn is_valid_semester(label: &str) -> bool {
    semester_re().is_match(label)
}

/// July onwards belongs to the second semester of the calendar year.
pub fn semester_for_date(date: NaiveDate) -> String {
    let half = if date.month() >= 7 { "S2" } else { "S1" };
    format!("{}-{}", date.year(), half)
}

pub fn validate_subjects(subjects: &[Subject]) -> Result<(), String> {
    for (i, s) in subjects.iter().enumerate() {
        if s.subject.trim().is_empty() {
            return Err(format!("subjects[{}].subject must not be empty", i));
        }
        if let GradeValue::Text(t) = &s.grade {
            if t.trim().is_empty() {
                return Err(format!("subjects[{}].grade must not be empty", i));
            }
        }
        if let GradeValue::Number(n) = s.grade {
            if !n.is_finite() {
                return Err(format!("subjects[{}].grade must be a finite number", i));
            }
        }
        if let Some(unit) = s.unit {
            if !unit.is_finite() || unit < 0.0 {
                return Err(format!("subjects[{}].unit must be >= 0", i));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subj(name: &str, grade: GradeValue) -> Subject {
        Subject {
            subject: name.into(),
            grade,
            unit: Some(3.0),
        }
    }

    #[test]
    fn average_skips_non_numeric_and_rounds() {
        let subjects = vec![
            subj("Math", GradeValue::Number(1.25)),
            subj("Science", GradeValue::Text("1.5".into())),
            subj("PE", GradeValue::Text("INC".into())),
            subj("English", GradeValue::Number(2.0)),
        ];
        // (1.25 + 1.5 + 2.0) / 3 = 1.58333...
        assert_eq!(grade_average(&subjects), Some(1.58));
    }

    #[test]
    fn average_is_none_without_numeric_grades() {
        assert_eq!(grade_average(&[]), None);
        assert_eq!(
            grade_average(&[subj("PE", GradeValue::Text("P".into()))]),
            None
        );
    }

    #[test]
    fn semester_label_format() {
        assert!(is_valid_semester("2025-S1"));
        assert!(is_valid_semester("2025-S2"));
        assert!(!is_valid_semester("2025-S3"));
        assert!(!is_valid_semester("25-S1"));
        assert!(!is_valid_semester("2025-s1"));
        assert!(!is_valid_semester(" 2025-S1"));
    }

    #[test]
    fn semester_from_date_splits_at_july() {
        let june = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let july = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        assert_eq!(semester_for_date(june), "2025-S1");
        assert_eq!(semester_for_date(july), "2025-S2");
    }

    #[test]
    fn subjects_accept_numeric_and_text_grades() {
        let parsed: Vec<Subject> = serde_json::from_value(json!([
            { "subject": "Math", "grade": 1.75, "unit": 3 },
            { "subject": "PE", "grade": "INC" }
        ]))
        .expect("parse subjects");
        assert_eq!(parsed[0].grade, GradeValue::Number(1.75));
        assert_eq!(parsed[1].grade, GradeValue::Text("INC".into()));
        assert_eq!(parsed[1].unit, None);
        assert!(validate_subjects(&parsed).is_ok());

        let bad = vec![Subject {
            subject: "  ".into(),
            grade: GradeValue::Number(1.0),
            unit: None,
        }];
        assert!(validate_subjects(&bad).is_err());
    }
}
