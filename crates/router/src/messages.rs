//! Fixed user-facing strings, per locale.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Vi,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Vi => "vi",
        }
    }

    pub fn phrases(&self) -> &'static Phrases {
        match self {
            Locale::En => &EN,
            Locale::Vi => &VI,
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "vi" => Ok(Locale::Vi),
            other => Err(format!("unsupported locale \"{other}\" (expected en or vi)")),
        }
    }
}

pub struct Phrases {
    pub base_prompt: &'static str,
    pub reference_header: &'static str,
    pub reference_intro: &'static str,
    pub usage_header: &'static str,
    pub usage_lines: [&'static str; 4],
    greeting: &'static str,
    you_sent: &'static str,
    fallback_tail: &'static str,
    demo_tail: &'static str,
    /// Undeclared function or unusable arguments
    pub refusal: &'static str,
    /// The dispatcher failed on a valid call
    pub dispatch_apology: &'static str,
    pub internal_error: &'static str,
}

impl Phrases {
    fn degraded(&self, user_message: &str, tail: &str) -> String {
        format!("{} {}: \"{user_message}\". {tail}", self.greeting, self.you_sent)
    }

    /// Reply when generation failed for any reason other than missing
    /// credentials.
    pub fn fallback(&self, user_message: &str) -> String {
        self.degraded(user_message, self.fallback_tail)
    }

    /// Reply when no generation backend is configured.
    pub fn demo(&self, user_message: &str) -> String {
        self.degraded(user_message, self.demo_tail)
    }
}

static EN: Phrases = Phrases {
    base_prompt: "You are a smart virtual assistant for the university, helping students with:
- Course information and class schedules
- Exam schedules and exam regulations
- Tuition and fees
- Student services (library, career counseling)
- Course registration procedures

Answer in a friendly, accurate and helpful way. Use emoji to make answers lively.
If you are not sure about something, suggest that the student contact the relevant office directly.

Always answer in English unless asked otherwise.",
    reference_header: "=== REFERENCE INFORMATION FROM DATABASE ===",
    reference_intro: "Below is relevant information from the university's database:",
    usage_header: "HOW TO USE THIS INFORMATION:",
    usage_lines: [
        "- Use the information above to answer the student's question accurately",
        "- Prefer information from the database over generic knowledge",
        "- If the information is insufficient, you may combine it with function calls to get more",
        "- Always cite the source of information when possible",
    ],
    greeting: "Hello! I am the university's virtual assistant.",
    you_sent: "You sent",
    fallback_tail: "I am temporarily running with reduced functionality. Please try again in a moment.",
    demo_tail: "I am currently in demo mode. Please configure an API key to use all features.",
    refusal: "Sorry, I cannot process this request.",
    dispatch_apology: "Sorry, I could not look up that information right now. Please try again later or contact the relevant office.",
    internal_error: "An error occurred while processing your request. Please try again.",
};

static VI: Phrases = Phrases {
    base_prompt: "Bạn là một trợ lý ảo thông minh của trường đại học, chuyên hỗ trợ sinh viên với các thông tin về:
- Thông tin môn học và lịch học
- Lịch thi và quy định thi cử
- Học phí và các khoản phí
- Dịch vụ sinh viên (thư viện, tư vấn nghề nghiệp)
- Quy trình đăng ký môn học

Hãy trả lời một cách thân thiện, chính xác và hữu ích. Sử dụng emoji để làm cho câu trả lời sinh động hơn.
Nếu không chắc chắn về thông tin, hãy đề xuất sinh viên liên hệ trực tiếp với phòng ban liên quan.

Luôn trả lời bằng tiếng Việt trừ khi được yêu cầu khác.",
    reference_header: "=== THÔNG TIN THAM KHẢO TỪ CƠ SỞ DỮ LIỆU ===",
    reference_intro: "Dưới đây là thông tin liên quan từ cơ sở dữ liệu của trường đại học:",
    usage_header: "HƯỚNG DẪN SỬ DỤNG THÔNG TIN:",
    usage_lines: [
        "- Hãy sử dụng thông tin trên để trả lời câu hỏi của sinh viên một cách chính xác",
        "- Ưu tiên thông tin từ cơ sở dữ liệu trên thông tin chung chung",
        "- Nếu thông tin không đủ, bạn có thể kết hợp với function calls để lấy thêm thông tin",
        "- Luôn trích dẫn nguồn thông tin khi có thể",
    ],
    greeting: "Xin chào! Tôi là trợ lý ảo của trường đại học.",
    you_sent: "Bạn đã gửi",
    fallback_tail: "Hệ thống tạm thời hoạt động với chức năng hạn chế. Vui lòng thử lại sau ít phút.",
    demo_tail: "Hiện tại tôi đang trong chế độ demo. Vui lòng cấu hình API key để sử dụng đầy đủ tính năng.",
    refusal: "Xin lỗi, tôi không thể xử lý yêu cầu này.",
    dispatch_apology: "Xin lỗi, hiện tôi không thể tra cứu thông tin này. Vui lòng thử lại sau hoặc liên hệ phòng ban liên quan.",
    internal_error: "Có lỗi xảy ra khi xử lý yêu cầu của bạn. Vui lòng thử lại.",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_locale() {
        assert_eq!("VI".parse::<Locale>().unwrap(), Locale::Vi);
        assert_eq!(" en ".parse::<Locale>().unwrap(), Locale::En);
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn degraded_replies_echo_input() {
        let en = Locale::En.phrases();
        assert_eq!(
            en.demo("hi"),
            "Hello! I am the university's virtual assistant. You sent: \"hi\". I am currently in demo mode. Please configure an API key to use all features."
        );
        assert!(en.fallback("hi").contains("\"hi\""));
        assert_ne!(en.fallback("hi"), en.demo("hi"));

        let vi = Locale::Vi.phrases();
        assert!(vi.demo("xin chào").starts_with("Xin chào! Tôi là trợ lý ảo"));
    }
}
