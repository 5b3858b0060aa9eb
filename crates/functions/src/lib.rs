//! University reference data and the functions the generator may call.
//!
//! The [`Catalog`] holds courses, exams, student services and tuition
//! rates. [`CatalogDispatcher`] validates a [`FunctionCall`] into a typed
//! [`UniversityFunction`] and renders the result as plain text.
//!
//! [`FunctionCall`]: studentdesk_core::function::FunctionCall

pub mod args;
pub mod catalog;
pub mod dispatcher;
pub mod format;
pub mod schema;

pub use args::{CourseQuery, ExamQuery, ServiceQuery, StudentType, TuitionRequest, UniversityFunction};
pub use catalog::{Catalog, CatalogError, Course, DataSource, Exam, StudentService, TuitionRates};
pub use dispatcher::CatalogDispatcher;
pub use format::format_vnd;
pub use schema::function_definitions;
