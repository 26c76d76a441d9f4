use serde::Serialize;

use crate::models::{round2, AcademicRecord, GradeBand, SubjectEntry};

/// Descriptive statistics over one record's subject scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub min_subject: String,
    pub max_subject: String,
    pub excellent_count: usize,
    pub good_count: usize,
    pub average_count: usize,
    pub poor_count: usize,
    pub excellence_rate: f64,
    pub pass_rate: f64,
    pub consistency_score: f64,
}

/// None on an empty subject list; the degenerate case is defined, not an error.
pub fn compute_statistics(subjects: &[SubjectEntry]) -> Option<ScoreStatistics> {
    if subjects.is_empty() {
        return None;
    }

    let scores: Vec<f64> = subjects.iter().map(|s| s.score).collect();
    let count = scores.len();
    let mean = scores.iter().sum::<f64>() / count as f64;

    let mut sorted = scores.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if count % 2 == 1 {
        sorted[count / 2]
    } else {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    };

    // Sample variance; zero when a single score leaves no spread to measure.
    let variance = if count > 1 {
        scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (count - 1) as f64
    } else {
        0.0
    };
    let std_dev = variance.sqrt();

    // First occurrence wins on ties, so selection is stable in input order.
    let mut min_entry = &subjects[0];
    let mut max_entry = &subjects[0];
    for entry in &subjects[1..] {
        if entry.score < min_entry.score {
            min_entry = entry;
        }
        if entry.score > max_entry.score {
            max_entry = entry;
        }
    }

    // Coarser four-way banding than GradeBand; both are kept on purpose.
    let excellent_count = scores.iter().filter(|s| **s >= 9.0).count();
    let good_count = scores.iter().filter(|s| (8.0..9.0).contains(*s)).count();
    let average_count = scores.iter().filter(|s| (5.0..8.0).contains(*s)).count();
    let poor_count = scores.iter().filter(|s| **s < 5.0).count();

    let excellence_rate =
        scores.iter().filter(|s| **s >= 8.0).count() as f64 / count as f64 * 100.0;
    let pass_rate = scores.iter().filter(|s| **s >= 5.0).count() as f64 / count as f64 * 100.0;

    // Heuristic spread-relative-to-average, not a rigorous measure. A single
    // score or an all-zero set has no meaningful spread and counts as fully
    // consistent.
    let consistency_score = if count == 1 || mean == 0.0 {
        100.0
    } else {
        100.0 - (std_dev / mean * 100.0)
    };

    Some(ScoreStatistics {
        count,
        mean,
        median,
        variance,
        std_dev,
        min: min_entry.score,
        max: max_entry.score,
        range: max_entry.score - min_entry.score,
        min_subject: min_entry.name.clone(),
        max_subject: max_entry.name.clone(),
        excellent_count,
        good_count,
        average_count,
        poor_count,
        excellence_rate,
        pass_rate,
        consistency_score,
    })
}

/// Threshold-rule observations in a fixed order. Every applicable rule fires;
/// only the GPA tier remark is mutually exclusive.
pub fn generate_insights(
    stats: Option<&ScoreStatistics>,
    record: &AcademicRecord,
) -> Vec<String> {
    let mut insights = Vec::new();
    let gpa = record.weighted_gpa();

    insights.push(if gpa >= 9.0 {
        "Outstanding result! Among the very top of the class.".to_string()
    } else if gpa >= 8.0 {
        "Strong result. A little more push reaches outstanding.".to_string()
    } else if gpa >= 6.5 {
        "Decent standing. Focus on lifting the weaker subjects.".to_string()
    } else {
        "Results need improvement. Keep at it and don't be discouraged.".to_string()
    });

    let Some(stats) = stats else {
        return insights;
    };

    if stats.consistency_score >= 90.0 {
        insights.push("Scores are very even across subjects. Steady study habits.".to_string());
    } else if stats.consistency_score < 70.0 {
        insights.push("Scores vary widely. Rebalance study time across subjects.".to_string());
    }

    if stats.max == 10.0 {
        insights.push(format!("Perfect score in {}!", stats.max_subject));
    }

    if stats.min < 5.0 {
        insights.push(format!("Prioritize {} before the next exam.", stats.min_subject));
    }

    if stats.excellence_rate >= 70.0 {
        insights.push(format!(
            "{:.0}% of subjects scored at the excellent level!",
            stats.excellence_rate
        ));
    }

    insights
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    Maintain,
    Improve,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Maintain => "Maintain",
            Recommendation::Improve => "Improve",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceProjection {
    pub current_gpa: f64,
    pub predicted_next: f64,
    pub improvement_potential: f64,
    pub confidence: Confidence,
    pub recommendation: Recommendation,
    pub focus_areas: Vec<String>,
}

/// Closed-form next-period estimate. Deterministic; there is no model behind it.
pub fn project_performance(
    record: &AcademicRecord,
    stats: Option<&ScoreStatistics>,
) -> PerformanceProjection {
    let current_gpa = record.weighted_gpa();
    let consistency = stats.map(|s| s.consistency_score).unwrap_or(0.0);

    let improvement = (10.0 - current_gpa) * (consistency / 100.0) * 0.3;
    let predicted_next = (current_gpa + improvement).min(10.0);

    let confidence = if consistency > 80.0 {
        Confidence::High
    } else if consistency > 60.0 {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    let recommendation = if current_gpa >= 8.0 {
        Recommendation::Maintain
    } else {
        Recommendation::Improve
    };

    // Stable sort keeps input order among equal scores.
    let mut by_score: Vec<&SubjectEntry> = record.subjects.iter().collect();
    by_score.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
    let focus_areas = by_score.into_iter().take(3).map(|s| s.name.clone()).collect();

    PerformanceProjection {
        current_gpa,
        predicted_next: round2(predicted_next),
        improvement_potential: round2(improvement),
        confidence,
        recommendation,
        focus_areas,
    }
}

/// Everything a renderer needs, computed once and read-only from there on.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSnapshot {
    pub record: AcademicRecord,
    pub simple_gpa: f64,
    pub weighted_gpa: f64,
    pub grade_band: GradeBand,
    pub statistics: Option<ScoreStatistics>,
    pub insights: Vec<String>,
    pub projection: PerformanceProjection,
}

impl RecordSnapshot {
    pub fn build(record: AcademicRecord) -> Self {
        let statistics = compute_statistics(&record.subjects);
        let insights = generate_insights(statistics.as_ref(), &record);
        let projection = project_performance(&record, statistics.as_ref());
        Self {
            simple_gpa: record.simple_gpa(),
            weighted_gpa: record.weighted_gpa(),
            grade_band: record.grade_band(),
            record,
            statistics,
            insights,
            projection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExamType, Semester, StudentInfo};

    fn subject(name: &str, score: f64, weight: i64) -> SubjectEntry {
        SubjectEntry::new(name, score, weight, None, None).unwrap()
    }

    fn record_with(subjects: Vec<SubjectEntry>) -> AcademicRecord {
        AcademicRecord::new(
            StudentInfo::new("HS123456", "An Nguyen", "10A1", "2025-2026").unwrap(),
            Semester::First,
            ExamType::Final,
            subjects,
        )
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn statistics_on_known_scores() {
        let stats = compute_statistics(&[
            subject("Math", 7.0, 2),
            subject("Lit", 8.0, 2),
            subject("Eng", 9.0, 2),
        ])
        .unwrap();

        assert_eq!(stats.count, 3);
        assert_close(stats.mean, 8.0);
        assert_close(stats.median, 8.0);
        assert_close(stats.variance, 1.0);
        assert_close(stats.std_dev, 1.0);
        assert_close(stats.min, 7.0);
        assert_close(stats.max, 9.0);
        assert_close(stats.range, 2.0);
        assert_eq!(stats.min_subject, "Math");
        assert_eq!(stats.max_subject, "Eng");
        assert_eq!(stats.excellent_count, 1);
        assert_eq!(stats.good_count, 1);
        assert_eq!(stats.average_count, 1);
        assert_eq!(stats.poor_count, 0);
        assert_close(stats.pass_rate, 100.0);
        assert_close(stats.consistency_score, 87.5);
    }

    #[test]
    fn median_of_even_count_averages_the_middle_pair() {
        let stats = compute_statistics(&[
            subject("A", 4.0, 1),
            subject("B", 6.0, 1),
            subject("C", 9.0, 1),
            subject("D", 10.0, 1),
        ])
        .unwrap();
        assert_close(stats.median, 7.5);
    }

    #[test]
    fn extreme_subjects_break_ties_by_input_order() {
        let stats = compute_statistics(&[
            subject("A", 5.0, 1),
            subject("B", 5.0, 1),
            subject("C", 9.0, 1),
            subject("D", 9.0, 1),
        ])
        .unwrap();
        assert_eq!(stats.min_subject, "A");
        assert_eq!(stats.max_subject, "C");
    }

    #[test]
    fn single_subject_has_zero_spread_and_full_consistency() {
        let stats = compute_statistics(&[subject("Art", 4.0, 1)]).unwrap();
        assert_close(stats.variance, 0.0);
        assert_close(stats.std_dev, 0.0);
        assert_close(stats.consistency_score, 100.0);
        assert_close(stats.min, 4.0);
        assert_close(stats.max, 4.0);
    }

    #[test]
    fn all_zero_scores_count_as_fully_consistent() {
        let stats =
            compute_statistics(&[subject("A", 0.0, 1), subject("B", 0.0, 1)]).unwrap();
        assert_close(stats.consistency_score, 100.0);
    }

    #[test]
    fn empty_subject_list_yields_no_statistics() {
        assert_eq!(compute_statistics(&[]), None);
    }

    #[test]
    fn insights_for_excellent_tier_with_perfect_score() {
        let record = record_with(vec![
            subject("Math", 10.0, 2),
            subject("Lit", 8.0, 2),
            subject("Eng", 7.0, 2),
        ]);
        assert_eq!(record.weighted_gpa(), 8.33);

        let stats = compute_statistics(&record.subjects);
        let insights = generate_insights(stats.as_ref(), &record);

        assert!(insights[0].starts_with("Strong result"));
        assert!(insights.iter().any(|i| i.contains("Perfect score in Math")));
        assert!(!insights.iter().any(|i| i.contains("Prioritize")));
    }

    #[test]
    fn insights_for_single_weak_subject() {
        let record = record_with(vec![subject("Art", 4.0, 1)]);
        let stats = compute_statistics(&record.subjects);
        let insights = generate_insights(stats.as_ref(), &record);

        assert!(insights[0].starts_with("Results need improvement"));
        // consistency is 100 for a single score, so the even-scores remark fires
        assert!(insights.iter().any(|i| i.contains("very even")));
        assert!(insights.iter().any(|i| i.contains("Prioritize Art")));
        assert!(!insights.iter().any(|i| i.contains("Perfect score")));
    }

    #[test]
    fn empty_record_produces_exactly_the_lowest_tier_remark() {
        let record = record_with(Vec::new());
        let insights = generate_insights(None, &record);
        assert_eq!(insights.len(), 1);
        assert!(insights[0].starts_with("Results need improvement"));
    }

    #[test]
    fn consistency_remark_skips_the_middle_band() {
        // scores 6,8,10: mean 8, std 2, consistency 75 -> neither remark
        let record = record_with(vec![
            subject("A", 6.0, 1),
            subject("B", 8.0, 1),
            subject("C", 10.0, 1),
        ]);
        let stats = compute_statistics(&record.subjects).unwrap();
        assert_close(stats.consistency_score, 75.0);

        let insights = generate_insights(Some(&stats), &record);
        assert!(!insights.iter().any(|i| i.contains("very even")));
        assert!(!insights.iter().any(|i| i.contains("vary widely")));
    }

    #[test]
    fn excellence_rate_remark_cites_rounded_percentage() {
        let record = record_with(vec![
            subject("A", 9.0, 1),
            subject("B", 8.5, 1),
            subject("C", 8.0, 1),
            subject("D", 4.0, 1),
        ]);
        let stats = compute_statistics(&record.subjects).unwrap();
        assert_close(stats.excellence_rate, 75.0);

        let insights = generate_insights(Some(&stats), &record);
        assert!(insights.iter().any(|i| i.contains("75%")));
    }

    #[test]
    fn projection_improves_toward_ten_with_full_consistency() {
        let record = record_with(vec![subject("Math", 0.0, 1)]);
        let stats = compute_statistics(&record.subjects);
        let projection = project_performance(&record, stats.as_ref());

        assert_eq!(projection.current_gpa, 0.0);
        assert_eq!(projection.improvement_potential, 3.0);
        assert_eq!(projection.predicted_next, 3.0);
        assert_eq!(projection.confidence, Confidence::High);
        assert_eq!(projection.recommendation, Recommendation::Improve);
    }

    #[test]
    fn projection_never_exceeds_ten() {
        let record = record_with(vec![subject("Math", 9.5, 1)]);
        let stats = compute_statistics(&record.subjects);
        let projection = project_performance(&record, stats.as_ref());

        assert_eq!(projection.improvement_potential, 0.15);
        assert_eq!(projection.predicted_next, 9.65);
        assert!(projection.predicted_next <= 10.0);
        assert_eq!(projection.recommendation, Recommendation::Maintain);

        let record = record_with(vec![subject("Math", 9.9, 1)]);
        let stats = compute_statistics(&record.subjects);
        let projection = project_performance(&record, stats.as_ref());
        assert!(projection.predicted_next <= 10.0);
    }

    #[test]
    fn projection_on_empty_record_stays_at_current_gpa() {
        let record = record_with(Vec::new());
        let projection = project_performance(&record, None);
        assert_eq!(projection.current_gpa, 0.0);
        assert_eq!(projection.predicted_next, 0.0);
        assert_eq!(projection.improvement_potential, 0.0);
        assert_eq!(projection.confidence, Confidence::Low);
        assert!(projection.focus_areas.is_empty());
    }

    #[test]
    fn focus_areas_are_the_lowest_three_in_stable_order() {
        let record = record_with(vec![
            subject("Math", 6.0, 1),
            subject("Lit", 6.0, 1),
            subject("Eng", 9.0, 1),
            subject("Bio", 4.0, 1),
        ]);
        let stats = compute_statistics(&record.subjects);
        let projection = project_performance(&record, stats.as_ref());
        assert_eq!(projection.focus_areas, vec!["Bio", "Math", "Lit"]);
    }

    #[test]
    fn focus_areas_shrink_with_fewer_subjects() {
        let record = record_with(vec![subject("Math", 6.0, 1), subject("Lit", 8.0, 1)]);
        let stats = compute_statistics(&record.subjects);
        let projection = project_performance(&record, stats.as_ref());
        assert_eq!(projection.focus_areas, vec!["Math", "Lit"]);
    }

    #[test]
    fn snapshot_bundles_record_stats_insights_and_projection() {
        let record = record_with(vec![
            subject("Math", 10.0, 2),
            subject("Lit", 8.0, 2),
            subject("Eng", 7.0, 2),
        ]);
        let snapshot = RecordSnapshot::build(record);

        assert_eq!(snapshot.simple_gpa, 8.33);
        assert_eq!(snapshot.weighted_gpa, 8.33);
        assert_eq!(snapshot.grade_band, GradeBand::Excellent);
        assert_eq!(snapshot.statistics.as_ref().unwrap().count, 3);
        assert!(!snapshot.insights.is_empty());
        assert_eq!(snapshot.projection.current_gpa, 8.33);
    }
}
