//! Dispatcher over the catalog for the five declared functions.

use std::sync::Arc;

use async_trait::async_trait;
use studentdesk_core::error::DispatchError;
use studentdesk_core::function::{FunctionCall, FunctionDefinition, FunctionDispatcher, FunctionOutcome};
use tracing::debug;

use crate::args::{CourseQuery, ExamQuery, ServiceQuery, TuitionRequest, UniversityFunction};
use crate::catalog::{Course, DataSource, Exam};
use crate::format;
use crate::schema::function_definitions;

/// Treat empty and whitespace-only filters as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Keep each record that any supplied predicate accepts. Predicates are
/// tried per record in declared order and the first hit includes it, so
/// filters widen the result rather than intersect.
fn any_matching<'a, T>(records: &'a [T], predicates: &[&dyn Fn(&T) -> bool]) -> Vec<&'a T> {
    records
        .iter()
        .filter(|record| predicates.iter().any(|predicate| predicate(record)))
        .collect()
}

pub fn find_courses<'a>(courses: &'a [Course], query: &CourseQuery) -> Vec<&'a Course> {
    let by_id = present(&query.course_id).map(str::to_uppercase);
    let by_name = present(&query.course_name);
    let by_instructor = present(&query.instructor);

    let id_pred = |c: &Course| by_id.as_deref().is_some_and(|id| c.course_id.to_uppercase().contains(id));
    let name_pred = |c: &Course| by_name.is_some_and(|n| contains_ci(&c.course_name, n));
    let instructor_pred = |c: &Course| by_instructor.is_some_and(|i| contains_ci(&c.instructor, i));

    let predicates: [&dyn Fn(&Course) -> bool; 3] = [&id_pred, &name_pred, &instructor_pred];
    any_matching(courses, &predicates)
}

/// With no filters nothing matches.
pub fn find_exams<'a>(exams: &'a [Exam], query: &ExamQuery) -> Vec<&'a Exam> {
    let by_id = present(&query.course_id).map(str::to_uppercase);
    let by_type = present(&query.exam_type);

    let id_pred = |e: &Exam| by_id.as_deref().is_some_and(|id| e.course_id.to_uppercase().contains(id));
    let type_pred = |e: &Exam| by_type.is_some_and(|t| contains_ci(&e.exam_type, t));

    let predicates: [&dyn Fn(&Exam) -> bool; 2] = [&id_pred, &type_pred];
    any_matching(exams, &predicates)
}

pub struct CatalogDispatcher {
    source: Arc<dyn DataSource>,
}

impl CatalogDispatcher {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    fn course_info(&self, query: &CourseQuery) -> FunctionOutcome {
        let found = find_courses(self.source.courses(), query);
        if found.is_empty() {
            return FunctionOutcome::EmptyMatch("No courses found matching the given criteria.".into());
        }
        let blocks: Vec<String> = found.into_iter().map(format::course_block).collect();
        FunctionOutcome::Answer(blocks.join("\n\n"))
    }

    fn exam_schedule(&self, query: &ExamQuery) -> FunctionOutcome {
        let found = find_exams(self.source.exams(), query);
        if found.is_empty() {
            return FunctionOutcome::EmptyMatch("No exams found matching the given criteria.".into());
        }
        let blocks: Vec<String> = found.into_iter().map(format::exam_block).collect();
        FunctionOutcome::Answer(blocks.join("\n\n"))
    }

    fn tuition(&self, request: &TuitionRequest) -> Result<FunctionOutcome, DispatchError> {
        let rates = self
            .source
            .tuition()
            .ok_or_else(|| DispatchError::DataUnavailable("tuition rates are not loaded".into()))?;
        let breakdown = format::tuition_breakdown(
            rates,
            request.credit_hours,
            request.student_type,
            request.additional_fees,
        )?;
        Ok(FunctionOutcome::Answer(breakdown))
    }

    fn services(&self, query: &ServiceQuery) -> FunctionOutcome {
        let filter = present(&query.service_name);
        let blocks: Vec<String> = self
            .source
            .services()
            .iter()
            .filter(|s| filter.is_none_or(|f| contains_ci(&s.service_name, f)))
            .map(format::service_block)
            .collect();

        if blocks.is_empty() {
            return FunctionOutcome::EmptyMatch("No student services found matching that name.".into());
        }
        FunctionOutcome::Answer(blocks.join("\n\n"))
    }

    fn all_courses(&self) -> FunctionOutcome {
        let courses = self.source.courses();
        if courses.is_empty() {
            return FunctionOutcome::EmptyMatch("No courses are currently offered.".into());
        }
        let lines: Vec<String> = courses.iter().map(format::course_line).collect();
        FunctionOutcome::Answer(format!("📚 Available courses:\n{}", lines.join("\n")))
    }
}

#[async_trait]
impl FunctionDispatcher for CatalogDispatcher {
    fn definitions(&self) -> Vec<FunctionDefinition> {
        function_definitions()
    }

    async fn dispatch(&self, call: &FunctionCall) -> Result<FunctionOutcome, DispatchError> {
        let function = UniversityFunction::from_call(call)?;
        let outcome = match &function {
            UniversityFunction::CourseInfo(q) => self.course_info(q),
            UniversityFunction::ExamSchedule(q) => self.exam_schedule(q),
            UniversityFunction::Tuition(r) => self.tuition(r)?,
            UniversityFunction::Services(q) => self.services(q),
            UniversityFunction::AllCourses => self.all_courses(),
        };
        debug!(
            function = %call.name,
            empty = outcome.is_empty_match(),
            "Function dispatched"
        );
        Ok(outcome)
    }
}
