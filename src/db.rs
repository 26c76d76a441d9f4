use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::models::{
    AcademicRecord, ExamType, RecordSummary, Semester, StudentInfo, SubjectEntry,
};

pub async fn connect(path: &Path) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open database at {}", path.display()))
}

/// Create the three tables if absent. Safe to run repeatedly.
pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            student_id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            class_name TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            date_of_birth TEXT,
            gender TEXT,
            email TEXT,
            phone TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL,
            record_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            subject_name TEXT NOT NULL,
            score REAL NOT NULL,
            weight INTEGER NOT NULL DEFAULT 1,
            category TEXT,
            notes TEXT,
            FOREIGN KEY (student_id) REFERENCES students(student_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS academic_records (
            record_id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            semester TEXT NOT NULL,
            exam_type TEXT NOT NULL,
            simple_gpa REAL NOT NULL,
            weighted_gpa REAL NOT NULL,
            grade_level TEXT NOT NULL,
            total_subjects INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (student_id) REFERENCES students(student_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist one record: student upsert, subject rows, summary upsert.
/// All three writes land in one transaction or none of them do.
pub async fn save_record(pool: &SqlitePool, record: &AcademicRecord) -> anyhow::Result<()> {
    let mut tx = pool.begin().await.context("failed to start transaction")?;
    let student = &record.student;

    sqlx::query(
        r#"
        INSERT INTO students
        (student_id, full_name, class_name, academic_year,
         date_of_birth, gender, email, phone, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (student_id) DO UPDATE SET
            full_name = excluded.full_name,
            class_name = excluded.class_name,
            academic_year = excluded.academic_year,
            date_of_birth = excluded.date_of_birth,
            gender = excluded.gender,
            email = excluded.email,
            phone = excluded.phone
        "#,
    )
    .bind(&student.student_id)
    .bind(&student.full_name)
    .bind(&student.class_name)
    .bind(&student.academic_year)
    .bind(&student.date_of_birth)
    .bind(&student.gender)
    .bind(&student.email)
    .bind(&student.phone)
    .bind(record.created_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    // Re-saving a record replaces its subject rows instead of stacking them.
    sqlx::query("DELETE FROM subjects WHERE record_id = ?")
        .bind(&record.record_id)
        .execute(&mut *tx)
        .await?;

    for (position, subject) in record.subjects.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO subjects
            (student_id, record_id, position, subject_name, score, weight, category, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&student.student_id)
        .bind(&record.record_id)
        .bind(position as i64)
        .bind(&subject.name)
        .bind(subject.score)
        .bind(subject.weight)
        .bind(&subject.category)
        .bind(&subject.notes)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO academic_records
        (record_id, student_id, semester, exam_type,
         simple_gpa, weighted_gpa, grade_level, total_subjects, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (record_id) DO UPDATE SET
            semester = excluded.semester,
            exam_type = excluded.exam_type,
            simple_gpa = excluded.simple_gpa,
            weighted_gpa = excluded.weighted_gpa,
            grade_level = excluded.grade_level,
            total_subjects = excluded.total_subjects
        "#,
    )
    .bind(&record.record_id)
    .bind(&student.student_id)
    .bind(record.semester.as_str())
    .bind(record.exam_type.as_str())
    .bind(record.simple_gpa())
    .bind(record.weighted_gpa())
    .bind(record.grade_band().label())
    .bind(record.subjects.len() as i64)
    .bind(record.created_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    tx.commit().await.context("failed to commit record save")
}

/// Record summaries for one student, newest first. Unknown ids yield an
/// empty list, not an error.
pub async fn get_student_records(
    pool: &SqlitePool,
    student_id: &str,
) -> anyhow::Result<Vec<RecordSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT record_id, student_id, semester, exam_type,
               simple_gpa, weighted_gpa, grade_level, total_subjects, created_at
        FROM academic_records
        WHERE student_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut summaries = Vec::with_capacity(rows.len());
    for row in rows {
        summaries.push(RecordSummary {
            record_id: row.get("record_id"),
            student_id: row.get("student_id"),
            semester: row.get("semester"),
            exam_type: row.get("exam_type"),
            simple_gpa: row.get("simple_gpa"),
            weighted_gpa: row.get("weighted_gpa"),
            grade_level: row.get("grade_level"),
            total_subjects: row.get("total_subjects"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        });
    }

    Ok(summaries)
}

pub async fn get_student_info(
    pool: &SqlitePool,
    student_id: &str,
) -> anyhow::Result<Option<StudentInfo>> {
    let row = sqlx::query(
        r#"
        SELECT student_id, full_name, class_name, academic_year,
               date_of_birth, gender, email, phone
        FROM students
        WHERE student_id = ?
        "#,
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| student_from_row(&row)))
}

/// Rebuild a full record: student metadata, semester/exam metadata, and the
/// subject list in its original input order.
pub async fn load_full_record(
    pool: &SqlitePool,
    record_id: &str,
) -> anyhow::Result<Option<AcademicRecord>> {
    let Some(row) = sqlx::query(
        r#"
        SELECT s.student_id, s.full_name, s.class_name, s.academic_year,
               s.date_of_birth, s.gender, s.email, s.phone,
               ar.semester, ar.exam_type, ar.created_at
        FROM academic_records ar
        JOIN students s ON s.student_id = ar.student_id
        WHERE ar.record_id = ?
        "#,
    )
    .bind(record_id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let student = student_from_row(&row);
    let semester_label: String = row.get("semester");
    let semester = Semester::parse(&semester_label)
        .with_context(|| format!("unknown semester label '{semester_label}'"))?;
    let exam_label: String = row.get("exam_type");
    let exam_type = ExamType::parse(&exam_label)
        .with_context(|| format!("unknown exam type label '{exam_label}'"))?;
    let created_at = parse_timestamp(&row.get::<String, _>("created_at"))?;

    let subject_rows = sqlx::query(
        r#"
        SELECT subject_name, score, weight, category, notes
        FROM subjects
        WHERE record_id = ?
        ORDER BY position
        "#,
    )
    .bind(record_id)
    .fetch_all(pool)
    .await?;

    let mut subjects = Vec::with_capacity(subject_rows.len());
    for row in subject_rows {
        subjects.push(SubjectEntry {
            name: row.get("subject_name"),
            score: row.get("score"),
            weight: row.get("weight"),
            category: row.get("category"),
            notes: row.get("notes"),
        });
    }

    Ok(Some(AcademicRecord::from_parts(
        record_id.to_string(),
        student,
        semester,
        exam_type,
        subjects,
        created_at,
    )))
}

fn student_from_row(row: &sqlx::sqlite::SqliteRow) -> StudentInfo {
    StudentInfo {
        student_id: row.get("student_id"),
        full_name: row.get("full_name"),
        class_name: row.get("class_name"),
        academic_year: row.get("academic_year"),
        date_of_birth: row.get("date_of_birth"),
        gender: row.get("gender"),
        email: row.get("email"),
        phone: row.get("phone"),
    }
}

fn parse_timestamp(value: &str) -> anyhow::Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("invalid stored timestamp '{value}'"))?;
    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_db(&pool).await.unwrap();
        pool
    }

    fn sample_student() -> StudentInfo {
        let mut student =
            StudentInfo::new("HS123456", "An Nguyen", "10A1", "2025-2026").unwrap();
        student.email = Some("an.nguyen@example.com".to_string());
        student
    }

    fn sample_record() -> AcademicRecord {
        AcademicRecord::new(
            sample_student(),
            Semester::First,
            ExamType::Final,
            vec![
                SubjectEntry::new("Math", 10.0, 2, Some("Sciences".to_string()), None).unwrap(),
                SubjectEntry::new("Lit", 8.0, 2, None, Some("strong essay".to_string())).unwrap(),
                SubjectEntry::new("Eng", 7.0, 2, None, None).unwrap(),
            ],
        )
    }

    #[tokio::test]
    async fn saved_record_round_trips_field_for_field() {
        let pool = test_pool().await;
        let record = sample_record();
        save_record(&pool, &record).await.unwrap();

        let loaded = load_full_record(&pool, &record.record_id)
            .await
            .unwrap()
            .expect("record should exist");

        assert_eq!(loaded, record);
        let names: Vec<&str> = loaded.subjects.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Math", "Lit", "Eng"]);
        assert_eq!(loaded.created_at, record.created_at);
    }

    #[tokio::test]
    async fn history_lists_records_newest_first() {
        let pool = test_pool().await;
        let student = sample_student();

        let older = AcademicRecord::from_parts(
            "rec-older".to_string(),
            student.clone(),
            Semester::First,
            ExamType::Midterm,
            vec![SubjectEntry::new("Math", 7.0, 2, None, None).unwrap()],
            Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap(),
        );
        let newer = AcademicRecord::from_parts(
            "rec-newer".to_string(),
            student.clone(),
            Semester::Second,
            ExamType::Final,
            vec![SubjectEntry::new("Math", 9.0, 2, None, None).unwrap()],
            Utc.with_ymd_and_hms(2026, 5, 20, 8, 0, 0).unwrap(),
        );

        save_record(&pool, &older).await.unwrap();
        save_record(&pool, &newer).await.unwrap();

        let summaries = get_student_records(&pool, &student.student_id).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].record_id, "rec-newer");
        assert_eq!(summaries[1].record_id, "rec-older");
        assert_eq!(summaries[0].weighted_gpa, 9.0);
        assert_eq!(summaries[0].grade_level, "Outstanding");
        assert_eq!(summaries[0].total_subjects, 1);
    }

    #[tokio::test]
    async fn unknown_ids_are_absent_not_errors() {
        let pool = test_pool().await;
        assert!(get_student_records(&pool, "HS999999").await.unwrap().is_empty());
        assert!(get_student_info(&pool, "HS999999").await.unwrap().is_none());
        assert!(load_full_record(&pool, "no-such-record").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn student_upsert_overwrites_prior_metadata() {
        let pool = test_pool().await;
        save_record(&pool, &sample_record()).await.unwrap();

        let mut updated = sample_record();
        updated.student.class_name = "11A2".to_string();
        updated.student.email = Some("new.address@example.com".to_string());
        save_record(&pool, &updated).await.unwrap();

        let stored = get_student_info(&pool, "HS123456").await.unwrap().unwrap();
        assert_eq!(stored.class_name, "11A2");
        assert_eq!(stored.email.as_deref(), Some("new.address@example.com"));
    }

    #[tokio::test]
    async fn resaving_a_record_replaces_its_subject_rows() {
        let pool = test_pool().await;
        let mut record = sample_record();
        save_record(&pool, &record).await.unwrap();

        record.subjects.pop();
        save_record(&pool, &record).await.unwrap();

        let loaded = load_full_record(&pool, &record.record_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.subjects.len(), 2);
    }
}
