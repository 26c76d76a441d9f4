use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand, ValueEnum};

mod analytics;
mod db;
mod export;
mod models;
mod report;

use analytics::RecordSnapshot;
use models::{ExamType, RecordDraft, Semester, StudentInfo, SubjectEntry};

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Single-user academic record keeper with GPA analytics", long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, global = true, default_value = "student_grades.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    InitDb,
    /// Build a record from a subjects CSV, print its report, and save it
    Add {
        #[arg(long)]
        student_id: String,
        /// Required unless the student is already stored
        #[arg(long)]
        full_name: Option<String>,
        /// Required unless the student is already stored
        #[arg(long)]
        class_name: Option<String>,
        /// Defaults to the current academic year
        #[arg(long)]
        academic_year: Option<String>,
        #[arg(long)]
        date_of_birth: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, value_enum)]
        semester: Semester,
        #[arg(long, value_enum)]
        exam_type: ExamType,
        /// CSV of subjects: name,score,weight[,category,notes]
        #[arg(long)]
        subjects: PathBuf,
    },
    /// List a student's stored records, newest first
    History {
        #[arg(long)]
        student_id: String,
    },
    /// Reload a stored record and print its report
    Show {
        #[arg(long)]
        record_id: String,
    },
    /// Export a stored record as a document
    Export {
        #[arg(long)]
        record_id: String,
        #[arg(long, value_enum)]
        format: ExportFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
    Html,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let pool = db::connect(&cli.db).await?;
    db::init_db(&pool).await?;

    match cli.command {
        Commands::InitDb => {
            println!("Schema ready at {}.", cli.db.display());
        }
        Commands::Add {
            student_id,
            full_name,
            class_name,
            academic_year,
            date_of_birth,
            gender,
            email,
            phone,
            semester,
            exam_type,
            subjects,
        } => {
            let student_id = student_id.to_uppercase();
            let student = match db::get_student_info(&pool, &student_id).await? {
                Some(existing) => {
                    println!(
                        "Reusing stored metadata for {} ({}).",
                        existing.full_name, existing.student_id
                    );
                    existing
                }
                None => {
                    let full_name =
                        full_name.context("--full-name is required for a new student")?;
                    let class_name =
                        class_name.context("--class-name is required for a new student")?;
                    let academic_year = academic_year.unwrap_or_else(|| {
                        let year = Utc::now().year();
                        format!("{year}-{}", year + 1)
                    });
                    let mut student =
                        StudentInfo::new(student_id, full_name, class_name, academic_year)?;
                    student.date_of_birth = date_of_birth;
                    student.gender = gender;
                    student.email = email;
                    student.phone = phone;
                    student
                }
            };

            let draft = load_subjects(&subjects)?;
            let record = draft.finalize(student, semester, exam_type);
            let snapshot = RecordSnapshot::build(record);
            print!("{}", report::build_report(&snapshot));

            // A failed save leaves the in-memory record fully reported above.
            match db::save_record(&pool, &snapshot.record).await {
                Ok(()) => println!("\nSaved record {}.", snapshot.record.record_id),
                Err(err) => eprintln!("\nCould not save record: {err:#}"),
            }
        }
        Commands::History { student_id } => {
            let student_id = student_id.to_uppercase();
            let summaries = db::get_student_records(&pool, &student_id).await?;
            print!("{}", report::build_history(&student_id, &summaries));
        }
        Commands::Show { record_id } => {
            match db::load_full_record(&pool, &record_id).await? {
                Some(record) => {
                    let snapshot = RecordSnapshot::build(record);
                    print!("{}", report::build_report(&snapshot));
                }
                None => println!("No record found with id {record_id}."),
            }
        }
        Commands::Export {
            record_id,
            format,
            out,
        } => {
            let Some(record) = db::load_full_record(&pool, &record_id).await? else {
                println!("No record found with id {record_id}.");
                return Ok(());
            };
            let snapshot = RecordSnapshot::build(record);

            let (document, extension) = match format {
                ExportFormat::Json => (export::render_json(&snapshot)?, "json"),
                ExportFormat::Csv => (export::render_csv(&snapshot)?, "csv"),
                ExportFormat::Html => (export::render_html(&snapshot), "html"),
            };
            let out = out
                .unwrap_or_else(|| PathBuf::from(export::default_filename(&snapshot, extension)));
            std::fs::write(&out, document)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn load_subjects(path: &Path) -> anyhow::Result<RecordDraft> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        name: String,
        score: f64,
        weight: Option<i64>,
        category: Option<String>,
        notes: Option<String>,
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to read subjects from {}", path.display()))?;
    let mut draft = RecordDraft::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let entry = SubjectEntry::new(
            row.name,
            row.score,
            row.weight.unwrap_or(1),
            row.category,
            row.notes,
        )?;
        draft.add(entry)?;
    }

    if draft.is_empty() {
        anyhow::bail!("subjects file {} contains no rows", path.display());
    }

    Ok(draft)
}
