//! FunctionDispatcher trait: the closed set of data functions the
//! generation backend may ask for.
//!
//! Function names arriving from the backend are resolved through
//! [`FunctionName::lookup`]; anything outside the declared set never
//! becomes a [`FunctionCall`] and therefore never reaches a dispatcher.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// The five declared functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionName {
    GetCourseInfo,
    GetExamSchedule,
    CalculateTuition,
    GetStudentServices,
    GetAllCourses,
}

/// Wire name → variant.
const FUNCTION_TABLE: &[(&str, FunctionName)] = &[
    ("get_course_info", FunctionName::GetCourseInfo),
    ("get_exam_schedule", FunctionName::GetExamSchedule),
    ("calculate_tuition", FunctionName::CalculateTuition),
    ("get_student_services", FunctionName::GetStudentServices),
    ("get_all_courses", FunctionName::GetAllCourses),
];

impl FunctionName {
    /// Every declared function, in declaration order.
    pub const ALL: [FunctionName; 5] = [
        FunctionName::GetCourseInfo,
        FunctionName::GetExamSchedule,
        FunctionName::CalculateTuition,
        FunctionName::GetStudentServices,
        FunctionName::GetAllCourses,
    ];

    /// Resolve a wire name. Exact match only.
    pub fn lookup(name: &str) -> Option<Self> {
        FUNCTION_TABLE
            .iter()
            .find(|(wire, _)| *wire == name)
            .map(|(_, f)| *f)
    }

    pub fn as_str(&self) -> &'static str {
        FUNCTION_TABLE
            .iter()
            .find(|(_, f)| f == self)
            .map(|(wire, _)| *wire)
            .unwrap_or("unknown")
    }
}

impl std::fmt::Display for FunctionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function declaration sent to the generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the parameters object
    pub parameters: serde_json::Value,
}

/// A validated request to invoke one of the declared functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: FunctionName,
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl FunctionCall {
    pub fn new(name: FunctionName, arguments: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { name, arguments }
    }

    /// Build a call from the backend's raw `name` and JSON-text `arguments`.
    ///
    /// Blank argument text is treated as an empty object. Anything that is
    /// not a JSON object is rejected.
    pub fn parse(name: &str, arguments_json: &str) -> Result<Self, DispatchError> {
        let function =
            FunctionName::lookup(name).ok_or_else(|| DispatchError::UnknownFunction(name.into()))?;

        if arguments_json.trim().is_empty() {
            return Ok(Self::new(function, serde_json::Map::new()));
        }

        match serde_json::from_str::<serde_json::Value>(arguments_json) {
            Ok(serde_json::Value::Object(map)) => Ok(Self::new(function, map)),
            Ok(other) => Err(DispatchError::InvalidArguments {
                function: name.into(),
                reason: format!("expected a JSON object, got {other}"),
            }),
            Err(e) => Err(DispatchError::InvalidArguments {
                function: name.into(),
                reason: e.to_string(),
            }),
        }
    }
}

/// The textual result of a dispatched function.
///
/// An empty lookup is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum FunctionOutcome {
    Answer(String),
    EmptyMatch(String),
}

impl FunctionOutcome {
    pub fn text(&self) -> &str {
        match self {
            FunctionOutcome::Answer(t) | FunctionOutcome::EmptyMatch(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            FunctionOutcome::Answer(t) | FunctionOutcome::EmptyMatch(t) => t,
        }
    }

    pub fn is_empty_match(&self) -> bool {
        matches!(self, FunctionOutcome::EmptyMatch(_))
    }
}

/// Runs declared functions against structured reference data.
///
/// Implementations must be deterministic for a given data source.
#[async_trait]
pub trait FunctionDispatcher: Send + Sync {
    /// Declarations for every function this dispatcher serves.
    fn definitions(&self) -> Vec<FunctionDefinition>;

    /// Validate the call's arguments and compute the result text.
    async fn dispatch(&self, call: &FunctionCall) -> Result<FunctionOutcome, DispatchError>;
}
