//! JSON-schema declarations sent to the generation backend.

use studentdesk_core::function::{FunctionDefinition, FunctionName};

fn description(name: FunctionName) -> &'static str {
    match name {
        FunctionName::GetCourseInfo => {
            "Look up a course by ID, name or instructor. The first supplied filter that matches any course is used."
        }
        FunctionName::GetExamSchedule => "Look up exam dates, times and rooms by course ID or exam type.",
        FunctionName::CalculateTuition => {
            "Calculate tuition for a number of credit hours, optionally including registration, library and technology fees."
        }
        FunctionName::GetStudentServices => {
            "List student services such as the library, advising and career counseling, optionally filtered by name."
        }
        FunctionName::GetAllCourses => "List every course offered this term.",
    }
}

fn parameters(name: FunctionName) -> serde_json::Value {
    match name {
        FunctionName::GetCourseInfo => serde_json::json!({
            "type": "object",
            "properties": {
                "course_id": {"type": "string", "description": "Course code, e.g. CS101"},
                "course_name": {"type": "string", "description": "Part of the course name"},
                "instructor": {"type": "string", "description": "Part of the instructor's name"}
            },
            "additionalProperties": false
        }),
        FunctionName::GetExamSchedule => serde_json::json!({
            "type": "object",
            "properties": {
                "course_id": {"type": "string", "description": "Course code, e.g. CS201"},
                "exam_type": {"type": "string", "description": "Midterm or Final"},
                "date_range": {"type": "string", "description": "Free-text date range; informational only"}
            },
            "additionalProperties": false
        }),
        FunctionName::CalculateTuition => serde_json::json!({
            "type": "object",
            "properties": {
                "credit_hours": {"type": "integer", "minimum": 0, "description": "Number of credit hours"},
                "student_type": {
                    "type": "string",
                    "enum": ["undergraduate", "graduate"],
                    "description": "Defaults to undergraduate"
                },
                "additional_fees": {
                    "type": "boolean",
                    "description": "Include registration, library and technology fees. Defaults to true"
                }
            },
            "required": ["credit_hours"],
            "additionalProperties": false
        }),
        FunctionName::GetStudentServices => serde_json::json!({
            "type": "object",
            "properties": {
                "service_name": {"type": "string", "description": "Part of the service name, case-insensitive"}
            },
            "additionalProperties": false
        }),
        FunctionName::GetAllCourses => serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

pub fn definition(name: FunctionName) -> FunctionDefinition {
    FunctionDefinition {
        name: name.as_str().into(),
        description: description(name).into(),
        parameters: parameters(name),
    }
}

/// Declarations for all five functions, in declaration order.
pub fn function_definitions() -> Vec<FunctionDefinition> {
    FunctionName::ALL.iter().map(|n| definition(*n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_definition_per_function() {
        let defs = function_definitions();
        assert_eq!(defs.len(), 5);
        for (def, name) in defs.iter().zip(FunctionName::ALL) {
            assert_eq!(def.name, name.as_str());
            assert_eq!(def.parameters["additionalProperties"], false);
        }
    }

    #[test]
    fn tuition_requires_credit_hours() {
        let def = definition(FunctionName::CalculateTuition);
        assert_eq!(def.parameters["required"], serde_json::json!(["credit_hours"]));
    }
}
