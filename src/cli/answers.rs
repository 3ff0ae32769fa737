//! Answers file for non-interactive runs.
//!
//! TOML by default; a `.json` extension switches to JSON. Image paths are
//! resolved against the directory holding the answers file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::session::PersonalInfo;

#[derive(Debug, Error)]
pub enum AnswersError {
    #[error("Failed to read answers file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse answers file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to parse answers file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonalAnswers {
    pub full_name: String,
    pub date_of_birth: String,
    pub address: String,
    pub phone_number: String,
    pub email: String,
}

impl From<PersonalAnswers> for PersonalInfo {
    fn from(answers: PersonalAnswers) -> Self {
        PersonalInfo {
            full_name: answers.full_name,
            date_of_birth: answers.date_of_birth,
            address: answers.address,
            phone_number: answers.phone_number,
            email: answers.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentAnswers {
    #[serde(default = "default_document_type")]
    pub document_type: String,
    pub image: PathBuf,
}

fn default_document_type() -> String {
    "PAN".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AadhaarAnswers {
    pub number: String,
    pub otp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Answers {
    pub personal_info: PersonalAnswers,
    pub document: DocumentAnswers,
    pub aadhaar: AadhaarAnswers,
    pub selfie: PathBuf,
    #[serde(default = "default_true")]
    pub check_duplicates: bool,
    #[serde(default)]
    pub consent: bool,
}

fn default_true() -> bool {
    true
}

impl Answers {
    pub fn load(path: &Path) -> Result<Self, AnswersError> {
        let contents = fs::read_to_string(path).map_err(|source| AnswersError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let mut answers = if is_json {
            Self::from_json_str(&contents)?
        } else {
            Self::from_toml_str(&contents)?
        };
        if let Some(base) = path.parent() {
            answers.resolve_paths(base);
        }
        Ok(answers)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, AnswersError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, AnswersError> {
        Ok(serde_json::from_str(contents)?)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.document.image, &mut self.selfie] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
