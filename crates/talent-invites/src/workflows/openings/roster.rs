use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::applications::{ApplicationSubmission, CandidateProfile, CandidateRef};

/// Applicant row loaded from a recruiter CSV export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub candidate: CandidateRef,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl RosterEntry {
    pub fn profile(&self) -> CandidateProfile {
        CandidateProfile {
            id: self.candidate.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    pub fn submission(&self) -> ApplicationSubmission {
        ApplicationSubmission {
            candidate: self.candidate.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            resume: None,
            reallocate: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read applicant roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid applicant roster CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unparseable applied_at '{value}'")]
    InvalidTimestamp { row: usize, value: String },
    #[error("row {row}: email is required")]
    MissingEmail { row: usize },
}

/// Loader for `candidate_id,name,email,phone,applied_at` CSV files.
///
/// `candidate_id` and `applied_at` are optional; ids default to a slug of the e-mail.
pub struct ApplicantRoster;

impl ApplicantRoster {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RosterEntry>, RosterError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<RosterEntry>, RosterError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut entries = Vec::new();

        for (index, row) in csv_reader.deserialize::<RosterRow>().enumerate() {
            let row = row?;
            // Header is line 1.
            let line = index + 2;

            let email = row
                .email
                .filter(|value| value.contains('@'))
                .ok_or(RosterError::MissingEmail { row: line })?;
            let applied_at = match row.applied_at {
                Some(raw) => Some(parse_timestamp(&raw).ok_or(RosterError::InvalidTimestamp {
                    row: line,
                    value: raw,
                })?),
                None => None,
            };
            let candidate = row
                .candidate_id
                .map(CandidateRef)
                .unwrap_or_else(|| CandidateRef(slug_from_email(&email)));

            entries.push(RosterEntry {
                candidate,
                name: row.name,
                email,
                phone: row.phone,
                applied_at,
            });
        }

        Ok(entries)
    }
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    candidate_id: Option<String>,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    applied_at: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn slug_from_email(email: &str) -> String {
    let slug: String = email
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("cand-{}", slug.trim_matches('-'))
}
