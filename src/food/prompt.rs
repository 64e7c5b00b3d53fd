//! The fixed instruction sent with every image and the clean-up applied to
//! the model's answer.

/// Shown in place of a report whenever the model call fails.
pub const FAILURE_PLACEHOLDER: &str = "Unable to analyze the image.";

pub const SECTION_LABELS: [&str; 5] = [
    "Quality assessment",
    "Freshness evaluation",
    "Potential issues or concerns",
    "Suggestions for improvement",
    "Recommendations for storage or consumption",
];

pub const ANALYSIS_INSTRUCTION: &str = "Analyze this food image and provide the following details:
**1. Quality assessment**
**2. Freshness evaluation**
**3. Potential issues or concerns**
**4. Suggestions for improvement**
**5. Recommendations for storage or consumption**

Please format the response in clear, separate sections without using asterisks or bullet points. Use formal language and complete sentences.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

/// Puts each bold section marker on its own line, then drops `*`, `•` and `#`.
pub fn format_response(raw: &str) -> String {
    let mut text = raw.to_string();
    for (index, label) in SECTION_LABELS.iter().enumerate() {
        let marker = format!("**{}. {}**", index + 1, label);
        text = text.replace(&marker, &format!("\n{}. {}\n", index + 1, label));
    }
    text.chars()
        .filter(|c| !matches!(c, '*' | '•' | '#'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Splits a formatted report on the numbered section headings.
///
/// Text before the first heading becomes an untitled section. A report with
/// no headings comes back as a single untitled section.
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut title = String::new();
    let mut body: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(heading) = match_heading(line) {
            push_section(&mut sections, &title, &body);
            title = heading;
            body.clear();
        } else {
            body.push(line);
        }
    }
    push_section(&mut sections, &title, &body);
    sections
}

fn match_heading(line: &str) -> Option<String> {
    let trimmed = line.trim().trim_end_matches(':');
    SECTION_LABELS.iter().enumerate().find_map(|(index, label)| {
        let numbered = format!("{}. {}", index + 1, label);
        if trimmed.eq_ignore_ascii_case(&numbered) || trimmed.eq_ignore_ascii_case(label) {
            Some(numbered)
        } else {
            None
        }
    })
}

fn push_section(sections: &mut Vec<Section>, title: &str, body: &[&str]) {
    let body = body.join("\n").trim().to_string();
    if title.is_empty() && body.is_empty() {
        return;
    }
    sections.push(Section {
        title: title.to_string(),
        body,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_names_every_section() {
        for (i, label) in SECTION_LABELS.iter().enumerate() {
            assert!(ANALYSIS_INSTRUCTION.contains(&format!("**{}. {}**", i + 1, label)));
        }
    }

    #[test]
    fn test_format_response_strips_markers() {
        let raw = "**1. Quality assessment** The bread looks fresh.\n* Crust is golden\n# Note • none";
        let formatted = format_response(raw);
        assert_eq!(
            formatted,
            "1. Quality assessment\n The bread looks fresh.\n Crust is golden\n Note  none"
        );
    }

    #[test]
    fn test_format_response_plain_text_unchanged() {
        assert_eq!(format_response("  Quality: good\n\nFreshness: high  "), "Quality: good\n\nFreshness: high");
    }

    #[test]
    fn test_split_sections() {
        let text = "Overall fine.\n1. Quality assessment\nGood color.\n\n2. Freshness evaluation:\nPicked today.";
        let sections = split_sections(text);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, "");
        assert_eq!(sections[0].body, "Overall fine.");
        assert_eq!(sections[1].title, "1. Quality assessment");
        assert_eq!(sections[1].body, "Good color.");
        assert_eq!(sections[2].title, "2. Freshness evaluation");
        assert_eq!(sections[2].body, "Picked today.");
    }

    #[test]
    fn test_split_sections_without_headings() {
        let sections = split_sections("Quality: good");
        assert_eq!(sections, vec![Section { title: String::new(), body: "Quality: good".to_string() }]);
    }
}
