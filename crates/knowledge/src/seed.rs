//! Default FAQ entries installed into an empty FAQ partition.

use crate::base::FaqEntry;

fn entry(question: &str, answer: &str, category: &str) -> FaqEntry {
    FaqEntry {
        question: question.into(),
        answer: answer.into(),
        category: category.into(),
        created_at: String::new(),
    }
}

/// The five starter FAQs. `locale` is `"vi"` for Vietnamese, anything
/// else gives English.
pub fn default_faqs(locale: &str) -> Vec<FaqEntry> {
    if locale == "vi" {
        return vec![
            entry(
                "Học phí một tín chỉ đại học bao nhiêu?",
                "Học phí đại học là 1,500,000 VND/tín chỉ. Bạn có thể dùng tính năng tính học phí để biết tổng chi phí cho số tín chỉ mong muốn.",
                "tuition",
            ),
            entry(
                "Làm thế nào để đăng ký môn học?",
                "Bạn có thể đăng ký môn học thông qua hệ thống online của trường hoặc liên hệ phòng đào tạo. Vui lòng kiểm tra lịch đăng ký để biết thời gian chính xác.",
                "registration",
            ),
            entry(
                "Thư viện mở cửa vào giờ nào?",
                "Thư viện mở cửa từ Thứ 2-Chủ Nhật: 7:00-22:00. Bạn có thể sử dụng dịch vụ học tập 24/7 tại khu vực tự học.",
                "services",
            ),
            entry(
                "Khi nào có lịch thi cuối kỳ?",
                "Lịch thi cuối kỳ thường được công bố 2 tuần trước kỳ thi. Bạn có thể kiểm tra lịch thi cụ thể cho từng môn học trong hệ thống.",
                "exams",
            ),
            entry(
                "Tôi cần hỗ trợ tư vấn học tập ở đâu?",
                "Dịch vụ tư vấn học tập có tại Phòng 201, Tòa A. Thời gian: Thứ 2-Thứ 6: 8:00-17:00. Email: tuvan@university.edu.vn",
                "services",
            ),
        ];
    }

    vec![
        entry(
            "How much is undergraduate tuition per credit?",
            "Undergraduate tuition is 1,500,000 VND per credit. You can use the tuition calculator to get the total cost for the number of credits you plan to take.",
            "tuition",
        ),
        entry(
            "How do I register for courses?",
            "You can register for courses through the university's online system or by contacting the Academic Affairs office. Please check the registration calendar for exact dates.",
            "registration",
        ),
        entry(
            "What time does the library open?",
            "The library is open Monday to Sunday, 7:00-22:00. The self-study area is available 24/7.",
            "services",
        ),
        entry(
            "When is the final exam schedule released?",
            "The final exam schedule is usually announced 2 weeks before the exam period. You can check the exact schedule for each course in the student portal.",
            "exams",
        ),
        entry(
            "Where can I get academic advising?",
            "Academic advising is available in Room 201, Building A, Monday to Friday 8:00-17:00. Email: tuvan@university.edu.vn",
            "services",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_entries_per_language() {
        assert_eq!(default_faqs("en").len(), 5);
        assert_eq!(default_faqs("vi").len(), 5);
        assert!(default_faqs("vi")[0].question.contains("tín chỉ"));
    }

    #[test]
    fn categories_are_stable_across_languages() {
        let en: Vec<_> = default_faqs("en").into_iter().map(|f| f.category).collect();
        let vi: Vec<_> = default_faqs("vi").into_iter().map(|f| f.category).collect();
        assert_eq!(en, vi);
    }
}
