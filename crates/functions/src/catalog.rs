//! Static university reference data.
//!
//! The catalog is read once at startup, either from a directory of JSON
//! files or from the copy compiled into the binary, and never mutated.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: String,
    pub course_name: String,
    pub instructor: String,
    pub schedule: String,
    pub room: String,
    pub credits: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub course_id: String,
    pub exam_type: String,
    pub date: String,
    pub time: String,
    pub room: String,
    /// Minutes
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentService {
    pub service_name: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    pub hours: String,
    pub contact: String,
}

/// Per-credit rates and flat fees, in VND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuitionRates {
    pub undergraduate_credit_hour: u64,
    pub graduate_credit_hour: u64,
    pub registration_fee: u64,
    pub library_fee: u64,
    pub technology_fee: u64,
}

impl TuitionRates {
    /// Sum of the three flat fees, `None` on overflow.
    pub fn flat_fees(&self) -> Option<u64> {
        self.registration_fee
            .checked_add(self.library_fee)?
            .checked_add(self.technology_fee)
    }
}

/// Read-only access to the structured records the functions query.
pub trait DataSource: Send + Sync {
    fn courses(&self) -> &[Course];
    fn exams(&self) -> &[Exam];
    fn services(&self) -> &[StudentService];
    /// `None` when no rate table was loaded.
    fn tuition(&self) -> Option<&TuitionRates>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub courses: Vec<Course>,
    pub exams: Vec<Exam>,
    pub services: Vec<StudentService>,
    pub tuition: Option<TuitionRates>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse catalog file {file}: {reason}")]
    Parse { file: String, reason: String },
}

const BUILTIN_COURSES: &str = include_str!("../data/courses.json");
const BUILTIN_EXAMS: &str = include_str!("../data/exams.json");
const BUILTIN_SERVICES: &str = include_str!("../data/services.json");
const BUILTIN_TUITION: &str = include_str!("../data/tuition.json");

fn parse<T: serde::de::DeserializeOwned>(file: &str, content: &str) -> Result<T, CatalogError> {
    serde_json::from_str(content).map_err(|e| CatalogError::Parse {
        file: file.into(),
        reason: e.to_string(),
    })
}

impl Catalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Ok(Self {
            courses: parse("courses.json", BUILTIN_COURSES)?,
            exams: parse("exams.json", BUILTIN_EXAMS)?,
            services: parse("services.json", BUILTIN_SERVICES)?,
            tuition: Some(parse("tuition.json", BUILTIN_TUITION)?),
        })
    }

    /// Load `courses.json`, `exams.json`, `services.json` and `tuition.json`
    /// from `dir`. All four files must be present and valid.
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        let read = |name: &str| -> Result<String, CatalogError> {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|e| CatalogError::Read {
                path,
                reason: e.to_string(),
            })
        };

        Ok(Self {
            courses: parse("courses.json", &read("courses.json")?)?,
            exams: parse("exams.json", &read("exams.json")?)?,
            services: parse("services.json", &read("services.json")?)?,
            tuition: Some(parse("tuition.json", &read("tuition.json")?)?),
        })
    }

    /// Load from `dir` when given, falling back to the built-in catalog when
    /// the directory is absent or unreadable.
    pub fn load_or_builtin(dir: Option<&Path>) -> Self {
        if let Some(dir) = dir {
            match Self::load_dir(dir) {
                Ok(catalog) => {
                    info!(dir = %dir.display(), courses = catalog.courses.len(), "Catalog loaded");
                    return catalog;
                }
                Err(e) => warn!(error = %e, "Catalog directory unusable, using built-in data"),
            }
        }

        Self::builtin().unwrap_or_else(|e| {
            warn!(error = %e, "Built-in catalog failed to parse, starting empty");
            Self::default()
        })
    }
}

impl DataSource for Catalog {
    fn courses(&self) -> &[Course] {
        &self.courses
    }

    fn exams(&self) -> &[Exam] {
        &self.exams
    }

    fn services(&self) -> &[StudentService] {
        &self.services
    }

    fn tuition(&self) -> Option<&TuitionRates> {
        self.tuition.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.courses.iter().any(|c| c.course_id == "CS101"));
        assert!(!catalog.exams.is_empty());
        assert!(!catalog.services.is_empty());
        let rates = catalog.tuition.unwrap();
        assert_eq!(rates.undergraduate_credit_hour, 1_500_000);
        assert_eq!(rates.flat_fees(), Some(450_000));
    }

    #[test]
    fn load_dir_reads_all_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("courses.json"), "[]").unwrap();
        std::fs::write(dir.path().join("exams.json"), "[]").unwrap();
        std::fs::write(dir.path().join("services.json"), "[]").unwrap();
        std::fs::write(
            dir.path().join("tuition.json"),
            r#"{"undergraduate_credit_hour":1,"graduate_credit_hour":2,"registration_fee":0,"library_fee":0,"technology_fee":0}"#,
        )
        .unwrap();

        let catalog = Catalog::load_dir(dir.path()).unwrap();
        assert!(catalog.courses.is_empty());
        assert_eq!(catalog.tuition.unwrap().graduate_credit_hour, 2);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("courses.json"), "{oops").unwrap();
        let err = Catalog::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { ref file, .. } if file == "courses.json"));
    }

    #[test]
    fn unusable_dir_falls_back_to_builtin() {
        let catalog = Catalog::load_or_builtin(Some(Path::new("/nonexistent/catalog")));
        assert_eq!(catalog, Catalog::builtin().unwrap());
    }
}
