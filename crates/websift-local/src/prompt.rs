use chrono::NaiveDate;
use websift_core::Focus;

pub const CITATION_INSTRUCTIONS: &str =
    "\n\nIMPORTANT: Cite them using markdown links named using the domain of the source.\nExample: [nytimes.com](https://nytimes.com/some-page).";

const TECHNICAL_EMPHASIS: &str =
    " Focus on technical accuracy, code examples, and software development best practices.";

/// Instruction handed to the web plugin. `date` is the only non-constant input.
pub fn search_prompt(focus: Focus, date: NaiveDate) -> String {
    let mut prompt = format!(
        "A web search was conducted on {}. Incorporate the following web search results into your response.",
        date.format("%Y-%m-%d")
    );
    if focus.is_technical() {
        prompt.push_str(TECHNICAL_EMPHASIS);
    }
    prompt.push_str(CITATION_INSTRUCTIONS);
    prompt
}

pub fn today_utc() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
