use chrono::Utc;

use crate::analytics::RecordSnapshot;

/// Default export filename, matching the `report_<student>_<timestamp>` shape.
pub fn default_filename(snapshot: &RecordSnapshot, extension: &str) -> String {
    format!(
        "report_{}_{}.{}",
        snapshot.record.student.student_id,
        Utc::now().format("%Y%m%d_%H%M%S"),
        extension
    )
}

pub fn render_json(snapshot: &RecordSnapshot) -> anyhow::Result<String> {
    let document = serde_json::json!({
        "student": snapshot.record.student,
        "subjects": snapshot.record.subjects,
        "summary": {
            "simple_gpa": snapshot.simple_gpa,
            "weighted_gpa": snapshot.weighted_gpa,
            "grade_level": snapshot.grade_band.label(),
            "total_subjects": snapshot.record.subjects.len(),
        },
        "statistics": snapshot.statistics,
        "insights": snapshot.insights,
        "prediction": snapshot.projection,
        "metadata": {
            "record_id": snapshot.record.record_id,
            "semester": snapshot.record.semester.as_str(),
            "exam_type": snapshot.record.exam_type.as_str(),
            "created_at": snapshot.record.created_at.to_rfc3339(),
            "exported_at": Utc::now().to_rfc3339(),
        },
    });

    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn render_csv(snapshot: &RecordSnapshot) -> anyhow::Result<String> {
    let record = &snapshot.record;
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(["Electronic Transcript"])?;
    writer.write_record(["Student id", record.student.student_id.as_str()])?;
    writer.write_record(["Full name", record.student.full_name.as_str()])?;
    writer.write_record(["Class", record.student.class_name.as_str()])?;
    writer.write_record(["Academic year", record.student.academic_year.as_str()])?;
    writer.write_record(["Semester", record.semester.as_str()])?;
    writer.write_record(["Exam type", record.exam_type.as_str()])?;
    writer.write_record(["Record id", record.record_id.as_str()])?;
    writer.write_record(["Created at", record.created_at.to_rfc3339().as_str()])?;

    writer.write_record(["#", "Subject", "Score", "Weight", "Grade"])?;
    for (idx, subject) in record.subjects.iter().enumerate() {
        writer.write_record([
            (idx + 1).to_string(),
            subject.name.clone(),
            format!("{:.2}", subject.score),
            subject.weight.to_string(),
            subject.grade_band().label().to_string(),
        ])?;
    }

    writer.write_record(["Simple GPA", format!("{:.2}", snapshot.simple_gpa).as_str()])?;
    writer.write_record(["Weighted GPA", format!("{:.2}", snapshot.weighted_gpa).as_str()])?;
    writer.write_record(["Grade", snapshot.grade_band.label()])?;

    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush csv writer: {err}"))?;
    Ok(String::from_utf8(bytes)?)
}

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

const CSS: &str = "\
body { font-family: sans-serif; max-width: 900px; margin: 2em auto; color: #1e293b; }
h1 { border-bottom: 2px solid #334155; padding-bottom: 0.3em; }
h2 { color: #334155; margin-top: 1.6em; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #cbd5e1; padding: 6px 10px; text-align: left; }
th { background: #f1f5f9; }
.gpa { font-size: 1.4em; font-weight: bold; }
.insight { background: #f0fdf4; border-left: 4px solid #22c55e; padding: 8px 12px; margin: 6px 0; }
.muted { color: #64748b; font-size: 0.9em; }
";

/// Self-contained HTML document with the CSS inlined.
pub fn render_html(snapshot: &RecordSnapshot) -> String {
    let record = &snapshot.record;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>Academic record - {}</title>\n",
        html_escape(&record.student.full_name)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n</head>\n<body>\n");

    html.push_str("<h1>Academic Record</h1>\n");
    html.push_str(&format!(
        "<p class=\"muted\">{} | {} | {} | created {}</p>\n",
        html_escape(&record.student.academic_year),
        html_escape(record.semester.as_str()),
        html_escape(record.exam_type.as_str()),
        record.created_at.format("%Y-%m-%d %H:%M UTC")
    ));

    html.push_str("<h2>Student</h2>\n<table>\n");
    html.push_str(&format!(
        "<tr><th>Student id</th><td>{}</td></tr>\n",
        html_escape(&record.student.student_id)
    ));
    html.push_str(&format!(
        "<tr><th>Full name</th><td>{}</td></tr>\n",
        html_escape(&record.student.full_name)
    ));
    html.push_str(&format!(
        "<tr><th>Class</th><td>{}</td></tr>\n",
        html_escape(&record.student.class_name)
    ));
    if let Some(email) = &record.student.email {
        html.push_str(&format!(
            "<tr><th>Email</th><td>{}</td></tr>\n",
            html_escape(email)
        ));
    }
    html.push_str("</table>\n");

    html.push_str("<h2>Subjects</h2>\n<table>\n");
    html.push_str(
        "<thead><tr><th>#</th><th>Subject</th><th>Score</th><th>Weight</th>\
         <th>Weighted</th><th>Band</th></tr></thead>\n<tbody>\n",
    );
    for (idx, subject) in record.subjects.iter().enumerate() {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>\n",
            idx + 1,
            html_escape(&subject.name),
            subject.score,
            subject.weight,
            subject.weighted_score(),
            subject.grade_band()
        ));
    }
    html.push_str("</tbody>\n</table>\n");

    html.push_str("<h2>Summary</h2>\n");
    html.push_str(&format!(
        "<p>Simple GPA: <span class=\"gpa\">{:.2}</span> | Weighted GPA: \
         <span class=\"gpa\">{:.2}</span> | Grade: <strong>{}</strong> | {} subjects</p>\n",
        snapshot.simple_gpa,
        snapshot.weighted_gpa,
        snapshot.grade_band,
        record.subjects.len()
    ));

    if let Some(stats) = &snapshot.statistics {
        html.push_str("<h2>Statistics</h2>\n<table>\n");
        html.push_str(&format!(
            "<tr><th>Highest</th><td>{:.2} ({})</td></tr>\n",
            stats.max,
            html_escape(&stats.max_subject)
        ));
        html.push_str(&format!(
            "<tr><th>Lowest</th><td>{:.2} ({})</td></tr>\n",
            stats.min,
            html_escape(&stats.min_subject)
        ));
        html.push_str(&format!("<tr><th>Median</th><td>{:.2}</td></tr>\n", stats.median));
        html.push_str(&format!("<tr><th>Std dev</th><td>{:.2}</td></tr>\n", stats.std_dev));
        html.push_str(&format!(
            "<tr><th>Excellence rate</th><td>{:.0}%</td></tr>\n",
            stats.excellence_rate
        ));
        html.push_str(&format!(
            "<tr><th>Pass rate</th><td>{:.0}%</td></tr>\n",
            stats.pass_rate
        ));
        html.push_str(&format!(
            "<tr><th>Consistency</th><td>{:.0}%</td></tr>\n",
            stats.consistency_score
        ));
        html.push_str("</table>\n");
    }

    html.push_str("<h2>Observations</h2>\n");
    for insight in &snapshot.insights {
        html.push_str(&format!("<div class=\"insight\">{}</div>\n", html_escape(insight)));
    }

    let projection = &snapshot.projection;
    html.push_str("<h2>Next-period outlook</h2>\n<table>\n");
    html.push_str(&format!(
        "<tr><th>Predicted GPA</th><td>{:.2}</td></tr>\n",
        projection.predicted_next
    ));
    html.push_str(&format!(
        "<tr><th>Improvement potential</th><td>+{:.2}</td></tr>\n",
        projection.improvement_potential
    ));
    html.push_str(&format!(
        "<tr><th>Confidence</th><td>{}</td></tr>\n",
        projection.confidence.as_str()
    ));
    html.push_str(&format!(
        "<tr><th>Recommendation</th><td>{}</td></tr>\n",
        projection.recommendation.as_str()
    ));
    if !projection.focus_areas.is_empty() {
        let areas: Vec<String> = projection
            .focus_areas
            .iter()
            .map(|a| html_escape(a))
            .collect();
        html.push_str(&format!(
            "<tr><th>Focus areas</th><td>{}</td></tr>\n",
            areas.join(", ")
        ));
    }
    html.push_str("</table>\n");

    html.push_str("</body>\n</html>\n");
    html
}
