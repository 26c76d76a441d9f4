use std::fmt::Write;

use crate::analytics::RecordSnapshot;
use crate::models::RecordSummary;

/// Render the full terminal report for one record snapshot.
pub fn build_report(snapshot: &RecordSnapshot) -> String {
    let record = &snapshot.record;
    let mut output = String::new();

    let _ = writeln!(output, "# Academic Record Report");
    let _ = writeln!(output);
    let _ = writeln!(output, "Student:       {}", record.student.full_name);
    let _ = writeln!(output, "Student id:    {}", record.student.student_id);
    let _ = writeln!(output, "Class:         {}", record.student.class_name);
    let _ = writeln!(output, "Academic year: {}", record.student.academic_year);
    let _ = writeln!(output, "Semester:      {}", record.semester);
    let _ = writeln!(output, "Exam type:     {}", record.exam_type);
    let _ = writeln!(
        output,
        "Created:       {}",
        record.created_at.format("%Y-%m-%d %H:%M UTC")
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");

    if record.subjects.is_empty() {
        let _ = writeln!(output, "No subjects recorded.");
    } else {
        let _ = writeln!(
            output,
            "{:<4} {:<25} {:>6} {:>7} {:>9}  {}",
            "#", "Subject", "Score", "Weight", "Weighted", "Band"
        );
        for (idx, subject) in record.subjects.iter().enumerate() {
            let _ = writeln!(
                output,
                "{:<4} {:<25} {:>6.2} {:>7} {:>9.2}  {}",
                idx + 1,
                subject.name,
                subject.score,
                subject.weight,
                subject.weighted_score(),
                subject.grade_band()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "Subjects:     {}", record.subjects.len());
    let _ = writeln!(output, "Simple GPA:   {:.2}", snapshot.simple_gpa);
    let _ = writeln!(output, "Weighted GPA: {:.2}", snapshot.weighted_gpa);
    let _ = writeln!(output, "Grade:        {}", snapshot.grade_band);

    if let Some(stats) = &snapshot.statistics {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Statistics");
        let _ = writeln!(output, "Highest:     {:.2} ({})", stats.max, stats.max_subject);
        let _ = writeln!(output, "Lowest:      {:.2} ({})", stats.min, stats.min_subject);
        let _ = writeln!(output, "Median:      {:.2}", stats.median);
        let _ = writeln!(output, "Std dev:     {:.2}", stats.std_dev);
        let _ = writeln!(output, "Excellence:  {:.0}%", stats.excellence_rate);
        let _ = writeln!(output, "Pass rate:   {:.0}%", stats.pass_rate);
        let _ = writeln!(output, "Consistency: {:.0}%", stats.consistency_score);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Observations");
    for insight in &snapshot.insights {
        let _ = writeln!(output, "- {insight}");
    }

    let projection = &snapshot.projection;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Next-period outlook");
    let _ = writeln!(output, "Current GPA:    {:.2}", projection.current_gpa);
    let _ = writeln!(output, "Predicted next: {:.2}", projection.predicted_next);
    let _ = writeln!(output, "Potential gain: +{:.2}", projection.improvement_potential);
    let _ = writeln!(output, "Confidence:     {}", projection.confidence.as_str());
    let _ = writeln!(output, "Recommendation: {}", projection.recommendation.as_str());
    if !projection.focus_areas.is_empty() {
        let _ = writeln!(output, "Focus on:       {}", projection.focus_areas.join(", "));
    }

    output
}

/// Render a student's record history, one line per summary.
pub fn build_history(student_id: &str, summaries: &[RecordSummary]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Records for {student_id}:");
    if summaries.is_empty() {
        let _ = writeln!(output, "No records found.");
        return output;
    }

    for (idx, summary) in summaries.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. {} - {} - {} | GPA {:.2} ({}) | {} subjects | {}",
            idx + 1,
            summary.created_at.format("%Y-%m-%d"),
            summary.semester,
            summary.exam_type,
            summary.weighted_gpa,
            summary.grade_level,
            summary.total_subjects,
            summary.record_id
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AcademicRecord, ExamType, Semester, StudentInfo, SubjectEntry};

    fn sample_snapshot() -> RecordSnapshot {
        let record = AcademicRecord::new(
            StudentInfo::new("HS123456", "An Nguyen", "10A1", "2025-2026").unwrap(),
            Semester::First,
            ExamType::Final,
            vec![
                SubjectEntry::new("Math", 10.0, 2, None, None).unwrap(),
                SubjectEntry::new("Lit", 8.0, 2, None, None).unwrap(),
                SubjectEntry::new("Eng", 7.0, 2, None, None).unwrap(),
            ],
        );
        RecordSnapshot::build(record)
    }

    #[test]
    fn report_includes_all_sections() {
        let report = build_report(&sample_snapshot());
        assert!(report.contains("# Academic Record Report"));
        assert!(report.contains("An Nguyen"));
        assert!(report.contains("## Subjects"));
        assert!(report.contains("Math"));
        assert!(report.contains("Weighted GPA: 8.33"));
        assert!(report.contains("Grade:        Excellent"));
        assert!(report.contains("## Observations"));
        assert!(report.contains("## Next-period outlook"));
    }

    #[test]
    fn empty_record_report_degrades_cleanly() {
        let record = AcademicRecord::new(
            StudentInfo::new("HS123456", "An Nguyen", "10A1", "2025-2026").unwrap(),
            Semester::Second,
            ExamType::Summary,
            Vec::new(),
        );
        let report = build_report(&RecordSnapshot::build(record));
        assert!(report.contains("No subjects recorded."));
        assert!(report.contains("Weighted GPA: 0.00"));
        assert!(!report.contains("## Statistics"));
    }

    #[test]
    fn history_handles_empty_and_populated_lists() {
        assert!(build_history("HS123456", &[]).contains("No records found."));
    }
}
