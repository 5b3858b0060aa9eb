//! Plain-text rendering of catalog records.
//!
//! Output is read by the second generation call as reference fact, so each
//! block is self-contained: labels on every line, units spelled out.

use std::fmt::Write;

use studentdesk_core::error::DispatchError;

use crate::args::StudentType;
use crate::catalog::{Course, Exam, StudentService, TuitionRates};

/// `4950000` → `"4,950,000 VND"`.
pub fn format_vnd(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push_str(" VND");
    out
}

pub fn course_block(course: &Course) -> String {
    let mut out = format!(
        "📚 {} - {}\n👨‍🏫 Instructor: {}\n📅 Schedule: {}\n🏫 Room: {}\n📖 Credits: {}",
        course.course_id,
        course.course_name,
        course.instructor,
        course.schedule,
        course.room,
        course.credits
    );
    if !course.description.is_empty() {
        let _ = write!(out, "\n📝 Description: {}", course.description);
    }
    if !course.prerequisites.is_empty() {
        let _ = write!(out, "\n🔗 Prerequisites: {}", course.prerequisites.join(", "));
    }
    out
}

pub fn exam_block(exam: &Exam) -> String {
    format!(
        "📝 {} - {}\n📅 Date: {}\n🕐 Time: {}\n🏫 Room: {}\n⏱️ Duration: {} minutes",
        exam.course_id, exam.exam_type, exam.date, exam.time, exam.room, exam.duration
    )
}

pub fn service_block(service: &StudentService) -> String {
    let mut out = format!("🏢 {}", service.service_name);
    if !service.description.is_empty() {
        let _ = write!(out, "\n   {}", service.description);
    }
    let _ = write!(
        out,
        "\n📍 Location: {}\n🕐 Hours: {}\n📞 Contact: {}",
        service.location, service.hours, service.contact
    );
    out
}

/// One line per course, for the full listing.
pub fn course_line(course: &Course) -> String {
    format!(
        "• {} - {} ({}, {} credits)",
        course.course_id, course.course_name, course.instructor, course.credits
    )
}

fn overflow(what: &str) -> DispatchError {
    DispatchError::InvalidArguments {
        function: "calculate_tuition".into(),
        reason: format!("{what} exceeds the representable amount"),
    }
}

/// Itemized tuition breakdown. Flat fees are listed only when included.
pub fn tuition_breakdown(
    rates: &TuitionRates,
    credit_hours: u32,
    student_type: StudentType,
    additional_fees: bool,
) -> Result<String, DispatchError> {
    let per_credit = match student_type {
        StudentType::Undergraduate => rates.undergraduate_credit_hour,
        StudentType::Graduate => rates.graduate_credit_hour,
    };
    let base = per_credit
        .checked_mul(u64::from(credit_hours))
        .ok_or_else(|| overflow("base tuition"))?;

    let mut out = format!(
        "💰 Tuition estimate\n👤 Student type: {}\n📖 Credit hours: {}\n💵 Rate per credit: {}\n📊 Base tuition: {}",
        student_type.as_str(),
        credit_hours,
        format_vnd(per_credit),
        format_vnd(base)
    );

    let total = if additional_fees {
        let _ = write!(
            out,
            "\n📋 Registration fee: {}\n📚 Library fee: {}\n💻 Technology fee: {}",
            format_vnd(rates.registration_fee),
            format_vnd(rates.library_fee),
            format_vnd(rates.technology_fee)
        );
        rates
            .flat_fees()
            .and_then(|fees| base.checked_add(fees))
            .ok_or_else(|| overflow("total tuition"))?
    } else {
        base
    };

    let _ = write!(out, "\n✅ Total: {}", format_vnd(total));
    Ok(out)
}
