//! Typed arguments for each declared function.
//!
//! [`UniversityFunction::from_call`] turns a validated [`FunctionCall`] into
//! a variant carrying its own argument struct. Unknown argument names are
//! rejected; omitted optional arguments take their documented defaults.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use studentdesk_core::error::DispatchError;
use studentdesk_core::function::{FunctionCall, FunctionName};

/// Course lookup predicates, checked in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CourseQuery {
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
}

/// Exam lookup predicates, checked in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExamQuery {
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub exam_type: Option<String>,
    /// Accepted for compatibility; not used for filtering.
    #[serde(default)]
    pub date_range: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StudentType {
    #[default]
    Undergraduate,
    Graduate,
}

impl StudentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentType::Undergraduate => "Undergraduate",
            StudentType::Graduate => "Graduate",
        }
    }
}

impl std::str::FromStr for StudentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "undergraduate" => Ok(StudentType::Undergraduate),
            "graduate" => Ok(StudentType::Graduate),
            other => Err(format!(
                "student_type must be \"undergraduate\" or \"graduate\", got \"{other}\""
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTuitionRequest {
    credit_hours: serde_json::Value,
    #[serde(default)]
    student_type: Option<String>,
    #[serde(default)]
    additional_fees: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuitionRequest {
    pub credit_hours: u32,
    /// Defaults to undergraduate
    pub student_type: StudentType,
    /// Defaults to true
    pub additional_fees: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceQuery {
    #[serde(default)]
    pub service_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArguments {}

/// One declared function together with its typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniversityFunction {
    CourseInfo(CourseQuery),
    ExamSchedule(ExamQuery),
    Tuition(TuitionRequest),
    Services(ServiceQuery),
    AllCourses,
}

impl UniversityFunction {
    pub fn from_call(call: &FunctionCall) -> Result<Self, DispatchError> {
        let name = call.name;
        Ok(match name {
            FunctionName::GetCourseInfo => Self::CourseInfo(decode(name, call)?),
            FunctionName::GetExamSchedule => Self::ExamSchedule(decode(name, call)?),
            FunctionName::CalculateTuition => Self::Tuition(tuition_request(call)?),
            FunctionName::GetStudentServices => Self::Services(decode(name, call)?),
            FunctionName::GetAllCourses => {
                let NoArguments {} = decode(name, call)?;
                Self::AllCourses
            }
        })
    }
}

fn invalid(name: FunctionName, reason: impl Into<String>) -> DispatchError {
    DispatchError::InvalidArguments {
        function: name.as_str().into(),
        reason: reason.into(),
    }
}

/// Drop explicit nulls so they read as "omitted".
fn without_nulls(call: &FunctionCall) -> serde_json::Value {
    serde_json::Value::Object(
        call.arguments
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

fn decode<T: DeserializeOwned>(name: FunctionName, call: &FunctionCall) -> Result<T, DispatchError> {
    serde_json::from_value(without_nulls(call)).map_err(|e| invalid(name, e.to_string()))
}

fn tuition_request(call: &FunctionCall) -> Result<TuitionRequest, DispatchError> {
    let name = FunctionName::CalculateTuition;
    let args = without_nulls(call);

    if args.get("credit_hours").is_none() {
        return Err(DispatchError::MissingArgument {
            function: name.as_str().into(),
            argument: "credit_hours".into(),
        });
    }

    let raw: RawTuitionRequest = serde_json::from_value(args).map_err(|e| invalid(name, e.to_string()))?;

    let credit_hours = whole_number(&raw.credit_hours)
        .ok_or_else(|| invalid(name, "credit_hours must be a non-negative whole number"))?;

    let student_type = match raw.student_type.as_deref() {
        None => StudentType::default(),
        Some(s) => s.parse().map_err(|reason: String| invalid(name, reason))?,
    };

    Ok(TuitionRequest {
        credit_hours,
        student_type,
        additional_fees: raw.additional_fees.unwrap_or(true),
    })
}

/// Accept `3`, `3.0` or `"3"`; reject fractions, negatives and overflow.
fn whole_number(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return u32::try_from(u).ok();
            }
            let f = n.as_f64()?;
            (f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64).then_some(f as u32)
        }
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
