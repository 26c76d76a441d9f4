use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// A draft holds at most this many subjects before it must be finalized.
pub const MAX_SUBJECTS: usize = 20;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("score must be between 0 and 10, got {0}")]
    ScoreOutOfRange(f64),
    #[error("weight must be 1, 2 or 3, got {0}")]
    InvalidWeight(i64),
    #[error("subject name must not be empty")]
    EmptySubjectName,
    #[error("subject '{0}' already entered for this record")]
    DuplicateSubject(String),
    #[error("a record holds at most {MAX_SUBJECTS} subjects")]
    TooManySubjects,
    #[error("student id must be 6-10 uppercase letters or digits, got '{0}'")]
    InvalidStudentId(String),
    #[error("full name must be at least two characters of letters and spaces, got '{0}'")]
    InvalidFullName(String),
    #[error("class name must look like 10A1, got '{0}'")]
    InvalidClassName(String),
}

/// Six-level qualitative classification, ordered by descending minimum score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GradeBand {
    Outstanding,
    Excellent,
    Good,
    Average,
    Weak,
    Poor,
}

const GRADE_BANDS: [(f64, GradeBand); 6] = [
    (9.0, GradeBand::Outstanding),
    (8.0, GradeBand::Excellent),
    (6.5, GradeBand::Good),
    (5.0, GradeBand::Average),
    (3.5, GradeBand::Weak),
    (0.0, GradeBand::Poor),
];

/// Highest satisfied threshold wins; Poor is the floor.
pub fn grade_band_for(score: f64) -> GradeBand {
    GRADE_BANDS
        .iter()
        .find(|(min_score, _)| score >= *min_score)
        .map(|(_, band)| *band)
        .unwrap_or(GradeBand::Poor)
}

impl GradeBand {
    pub fn label(&self) -> &'static str {
        match self {
            GradeBand::Outstanding => "Outstanding",
            GradeBand::Excellent => "Excellent",
            GradeBand::Good => "Good",
            GradeBand::Average => "Average",
            GradeBand::Weak => "Weak",
            GradeBand::Poor => "Poor",
        }
    }
}

impl std::fmt::Display for GradeBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum Semester {
    #[value(name = "1", alias = "i")]
    #[serde(rename = "Semester I")]
    First,
    #[value(name = "2", alias = "ii")]
    #[serde(rename = "Semester II")]
    Second,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::First => "Semester I",
            Semester::Second => "Semester II",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Semester I" => Some(Semester::First),
            "Semester II" => Some(Semester::Second),
            _ => None,
        }
    }
}

impl std::fmt::Display for Semester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum ExamType {
    Midterm,
    Final,
    Summary,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Midterm => "Midterm",
            ExamType::Final => "Final",
            ExamType::Summary => "Summary",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Midterm" => Some(ExamType::Midterm),
            "Final" => Some(ExamType::Final),
            "Summary" => Some(ExamType::Summary),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectEntry {
    pub name: String,
    pub score: f64,
    pub weight: i64,
    pub category: Option<String>,
    pub notes: Option<String>,
}

impl SubjectEntry {
    pub fn new(
        name: impl Into<String>,
        score: f64,
        weight: i64,
        category: Option<String>,
        notes: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name: String = name.into();
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptySubjectName);
        }
        if !(0.0..=10.0).contains(&score) {
            return Err(ValidationError::ScoreOutOfRange(score));
        }
        if !(1..=3).contains(&weight) {
            return Err(ValidationError::InvalidWeight(weight));
        }
        Ok(Self {
            name,
            score,
            weight,
            category,
            notes,
        })
    }

    pub fn weighted_score(&self) -> f64 {
        self.score * self.weight as f64
    }

    pub fn grade_band(&self) -> GradeBand {
        grade_band_for(self.score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentInfo {
    pub student_id: String,
    pub full_name: String,
    pub class_name: String,
    pub academic_year: String,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl StudentInfo {
    pub fn new(
        student_id: impl Into<String>,
        full_name: impl Into<String>,
        class_name: impl Into<String>,
        academic_year: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let student_id: String = student_id.into();
        let full_name: String = full_name.into();
        let full_name = full_name.trim().to_string();
        let class_name: String = class_name.into();

        if !valid_student_id(&student_id) {
            return Err(ValidationError::InvalidStudentId(student_id));
        }
        if !valid_full_name(&full_name) {
            return Err(ValidationError::InvalidFullName(full_name));
        }
        if !valid_class_name(&class_name) {
            return Err(ValidationError::InvalidClassName(class_name));
        }

        Ok(Self {
            student_id,
            full_name,
            class_name,
            academic_year: academic_year.into(),
            date_of_birth: None,
            gender: None,
            email: None,
            phone: None,
        })
    }
}

fn valid_student_id(id: &str) -> bool {
    (6..=10).contains(&id.len())
        && id.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn valid_full_name(name: &str) -> bool {
    name.chars().count() >= 2 && name.chars().all(|c| c.is_alphabetic() || c == ' ')
}

/// One or two digits, one uppercase letter, one or two digits (e.g. 10A1).
fn valid_class_name(class: &str) -> bool {
    let chars: Vec<char> = class.chars().collect();
    let leading = chars.iter().take_while(|c| c.is_ascii_digit()).count();
    if !(1..=2).contains(&leading) {
        return false;
    }
    let Some(letter) = chars.get(leading) else {
        return false;
    };
    if !letter.is_ascii_uppercase() {
        return false;
    }
    let trailing = &chars[leading + 1..];
    (1..=2).contains(&trailing.len()) && trailing.iter().all(|c| c.is_ascii_digit())
}

/// One exam pass for one student. Entries are fixed once constructed;
/// a correction means building a new record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcademicRecord {
    pub record_id: String,
    pub student: StudentInfo,
    pub semester: Semester,
    pub exam_type: ExamType,
    pub subjects: Vec<SubjectEntry>,
    pub created_at: DateTime<Utc>,
}

impl AcademicRecord {
    pub fn new(
        student: StudentInfo,
        semester: Semester,
        exam_type: ExamType,
        subjects: Vec<SubjectEntry>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            student,
            semester,
            exam_type,
            subjects,
            created_at: Utc::now(),
        }
    }

    /// Rebuild a record that already has a durable identity (store reloads).
    pub fn from_parts(
        record_id: String,
        student: StudentInfo,
        semester: Semester,
        exam_type: ExamType,
        subjects: Vec<SubjectEntry>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            record_id,
            student,
            semester,
            exam_type,
            subjects,
            created_at,
        }
    }

    /// Arithmetic mean of raw scores, weights ignored. 0.0 with no subjects.
    pub fn simple_gpa(&self) -> f64 {
        if self.subjects.is_empty() {
            return 0.0;
        }
        let total: f64 = self.subjects.iter().map(|s| s.score).sum();
        round2(total / self.subjects.len() as f64)
    }

    /// Credit-weighted mean. 0.0 with no subjects.
    pub fn weighted_gpa(&self) -> f64 {
        if self.subjects.is_empty() {
            return 0.0;
        }
        let total_weighted: f64 = self.subjects.iter().map(|s| s.weighted_score()).sum();
        let total_weights: i64 = self.subjects.iter().map(|s| s.weight).sum();
        round2(total_weighted / total_weights as f64)
    }

    /// The record's band is looked up on the weighted GPA.
    pub fn grade_band(&self) -> GradeBand {
        grade_band_for(self.weighted_gpa())
    }
}

/// One row of the store's record-summary table, as listed by history queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub record_id: String,
    pub student_id: String,
    pub semester: String,
    pub exam_type: String,
    pub simple_gpa: f64,
    pub weighted_gpa: f64,
    pub grade_level: String,
    pub total_subjects: i64,
    pub created_at: DateTime<Utc>,
}

/// Draft state of a record: entries being collected, duplicates rejected,
/// count bounded. Finalizing hands the entry list over unchanged.
#[derive(Debug, Default)]
pub struct RecordDraft {
    entries: Vec<SubjectEntry>,
}

impl RecordDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: SubjectEntry) -> Result<(), ValidationError> {
        if self.entries.len() >= MAX_SUBJECTS {
            return Err(ValidationError::TooManySubjects);
        }
        let normalized = entry.name.to_lowercase();
        if self.entries.iter().any(|e| e.name.to_lowercase() == normalized) {
            return Err(ValidationError::DuplicateSubject(entry.name));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// The original input loop's "undo".
    pub fn remove_last(&mut self) -> Option<SubjectEntry> {
        self.entries.pop()
    }

    pub fn entries(&self) -> &[SubjectEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finalize(
        self,
        student: StudentInfo,
        semester: Semester,
        exam_type: ExamType,
    ) -> AcademicRecord {
        AcademicRecord::new(student, semester, exam_type, self.entries)
    }
}
