//! Registration Intake and Roster
//!
//! Intake rules produce structured violations; the roster only accepts a
//! form when no rule reports an error.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{CertError, Result};

/// Category used when a record carries none.
pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrantRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roll_no: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub batch: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

impl RegistrantRecord {
    /// The category used for grouping, never empty.
    pub fn effective_category(&self) -> &str {
        let trimmed = self.category.trim();
        if trimmed.is_empty() {
            DEFAULT_CATEGORY
        } else {
            trimmed
        }
    }
}

/// Raw registration as submitted, before trimming and stamping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub name: String,
    pub roll_no: String,
    pub department: String,
    pub batch: String,
    pub category: String,
}

impl RegistrationForm {
    fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            roll_no: self.roll_no.trim().to_string(),
            department: self.department.trim().to_string(),
            batch: self.batch.trim().to_string(),
            category: self.category.trim().to_string(),
        }
    }
}

/// Splits a comma separated category list, dropping blanks.
pub fn parse_categories(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntakeSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeViolation {
    pub rule: String,
    pub severity: IntakeSeverity,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeResult {
    pub accepted: bool,
    pub violations: Vec<IntakeViolation>,
}

/// A single intake check over a trimmed form.
pub trait IntakeRule {
    fn name(&self) -> &'static str;
    fn check(&self, form: &RegistrationForm, categories: &[String]) -> Vec<IntakeViolation>;
}

pub struct RequiredFieldsRule;

impl IntakeRule for RequiredFieldsRule {
    fn name(&self) -> &'static str { "required_fields" }

    fn check(&self, form: &RegistrationForm, _categories: &[String]) -> Vec<IntakeViolation> {
        [
            ("name", "Full Name", &form.name),
            ("roll_no", "Roll No", &form.roll_no),
            ("department", "Department", &form.department),
            ("batch", "Batch", &form.batch),
        ]
        .into_iter()
        .filter(|(_, _, value)| value.is_empty())
        .map(|(field, label, _)| IntakeViolation {
            rule: self.name().to_string(),
            severity: IntakeSeverity::Error,
            field: field.to_string(),
            message: format!("{} is required", label),
        })
        .collect()
    }
}

pub struct KnownCategoryRule;

impl IntakeRule for KnownCategoryRule {
    fn name(&self) -> &'static str { "known_category" }

    fn check(&self, form: &RegistrationForm, categories: &[String]) -> Vec<IntakeViolation> {
        if categories.is_empty() || categories.iter().any(|c| *c == form.category) {
            return vec![];
        }
        vec![IntakeViolation {
            rule: self.name().to_string(),
            severity: IntakeSeverity::Warning,
            field: "category".to_string(),
            message: format!(
                "category {:?} is not one of: {}",
                form.category,
                categories.join(", ")
            ),
        }]
    }
}

/// Runs every intake rule over a form.
pub struct Intake {
    rules: Vec<Box<dyn IntakeRule>>,
}

impl Intake {
    pub fn new() -> Self {
        Self {
            rules: vec![Box::new(RequiredFieldsRule), Box::new(KnownCategoryRule)],
        }
    }

    pub fn check(&self, form: &RegistrationForm, categories: &[String]) -> IntakeResult {
        let form = form.trimmed();
        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.check(&form, categories))
            .collect();
        let accepted = !violations.iter().any(|v| v.severity == IntakeSeverity::Error);
        IntakeResult { accepted, violations }
    }
}

impl Default for Intake {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-category head count with `name [roll_no]` members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorySummary {
    pub category: String,
    pub count: usize,
    pub members: Vec<String>,
}

/// Ordered list of registrations, persisted as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    records: Vec<RegistrantRecord>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<RegistrantRecord>) -> Self {
        Self { records }
    }

    /// Loads a roster file; a missing file is an empty roster.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn records(&self) -> &[RegistrantRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Validates, trims and stamps a form, then appends it.
    ///
    /// Returns the stored record with any warning-level violations.
    pub fn register(
        &mut self,
        form: &RegistrationForm,
        event: &str,
        categories: &[String],
        now: NaiveDateTime,
    ) -> Result<(&RegistrantRecord, Vec<IntakeViolation>)> {
        let result = Intake::new().check(form, categories);
        if !result.accepted {
            let messages: Vec<_> = result
                .violations
                .iter()
                .filter(|v| v.severity == IntakeSeverity::Error)
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            return Err(CertError::Registration(messages.join("; ")));
        }
        for warning in &result.violations {
            tracing::warn!(rule = %warning.rule, "{}", warning.message);
        }
        let form = form.trimmed();
        self.records.push(RegistrantRecord {
            name: form.name,
            roll_no: form.roll_no,
            department: form.department,
            batch: form.batch,
            category: form.category,
            event: event.to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
        });
        let record = &self.records[self.records.len() - 1];
        Ok((record, result.violations))
    }

    /// Drops every record, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        removed
    }

    pub fn filter(&self, category: &str) -> Vec<&RegistrantRecord> {
        self.records
            .iter()
            .filter(|r| r.effective_category() == category)
            .collect()
    }

    /// Category summary in first-seen order.
    pub fn summary(&self) -> Vec<CategorySummary> {
        let mut summary: Vec<CategorySummary> = Vec::new();
        for record in &self.records {
            let member = format!("{} [{}]", record.name, record.roll_no);
            let category = record.effective_category();
            match summary.iter_mut().find(|s| s.category == category) {
                Some(entry) => {
                    entry.count += 1;
                    entry.members.push(member);
                }
                None => summary.push(CategorySummary {
                    category: category.to_string(),
                    count: 1,
                    members: vec![member],
                }),
            }
        }
        summary
    }

    /// One `name | roll_no | department | batch | category` line per record.
    pub fn to_text(&self) -> String {
        self.records
            .iter()
            .map(|r| {
                format!(
                    "{} | {} | {} | {} | {}",
                    r.name, r.roll_no, r.department, r.batch, r.category
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(14, 3, 9)
            .unwrap()
    }

    fn form(name: &str, roll: &str, category: &str) -> RegistrationForm {
        RegistrationForm {
            name: name.to_string(),
            roll_no: roll.to_string(),
            department: "Computer Science".to_string(),
            batch: "2024".to_string(),
            category: category.to_string(),
        }
    }

    #[test]
    fn test_parse_categories() {
        assert_eq!(parse_categories(" Participate, Teacher ,,"), vec!["Participate", "Teacher"]);
        assert!(parse_categories("").is_empty());
    }

    #[test]
    fn test_register_trims_and_stamps() {
        let mut roster = Roster::new();
        let cats = parse_categories("Participant,Teacher");
        let (record, warnings) = roster
            .register(&form("  Ali Khan ", " 24-BSCS-45", "Participant"), "Tech Fest", &cats, now())
            .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(record.name, "Ali Khan");
        assert_eq!(record.roll_no, "24-BSCS-45");
        assert_eq!(record.event, "Tech Fest");
        assert_eq!(record.date, "2024-05-02");
        assert_eq!(record.time, "14:03:09");
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut roster = Roster::new();
        let mut f = form(" ", "", "Participant");
        f.batch = String::new();
        let err = roster.register(&f, "E", &[], now()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Full Name is required"));
        assert!(msg.contains("Roll No is required"));
        assert!(msg.contains("Batch is required"));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_unknown_category_is_warning_only() {
        let intake = Intake::new();
        let cats = parse_categories("Participant");
        let result = intake.check(&form("A", "1", "Judge"), &cats);
        assert!(result.accepted);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].severity, IntakeSeverity::Warning);
    }

    #[test]
    fn test_register_reports_warnings() {
        let mut roster = Roster::new();
        let cats = parse_categories("Participant,Teacher");
        let (record, warnings) = roster.register(&form("A", "1", "Judge"), "E", &cats, now()).unwrap();
        assert_eq!(record.category, "Judge");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].rule, "known_category");
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_clear_empties_roster() {
        let mut roster = Roster::new();
        roster.register(&form("A", "1", "Teacher"), "E", &[], now()).unwrap();
        roster.register(&form("B", "2", "Teacher"), "E", &[], now()).unwrap();
        assert_eq!(roster.clear(), 2);
        assert!(roster.is_empty());
        assert_eq!(roster.clear(), 0);
    }

    #[test]
    fn test_summary_and_text() {
        let mut roster = Roster::new();
        roster.register(&form("A", "1", "Teacher"), "E", &[], now()).unwrap();
        roster.register(&form("B", "2", "Participant"), "E", &[], now()).unwrap();
        roster.register(&form("C", "3", "Teacher"), "E", &[], now()).unwrap();

        let summary = roster.summary();
        assert_eq!(summary[0].category, "Teacher");
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[0].members, vec!["A [1]", "C [3]"]);
        assert_eq!(summary[1].category, "Participant");

        assert_eq!(roster.filter("Teacher").len(), 2);
        let text = roster.to_text();
        assert_eq!(text.lines().next().unwrap(), "A | 1 | Computer Science | 2024 | Teacher");
    }

    #[test]
    fn test_blank_category_groups_as_other() {
        let record = RegistrantRecord { name: "Z".into(), ..Default::default() };
        assert_eq!(record.effective_category(), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_load_missing_and_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registrations.json");
        assert!(Roster::load(&path).unwrap().is_empty());

        let mut roster = Roster::new();
        roster.register(&form("A", "1", "Teacher"), "E", &[], now()).unwrap();
        roster.save(&path).unwrap();
        assert_eq!(Roster::load(&path).unwrap(), roster);
    }
}
