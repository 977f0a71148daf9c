//! Prompt builder for use-case analysis requests.

use crate::analysis::core::use_case::UseCase;

/// Role description shared by every use case.
pub const PREAMBLE: &str = "당신은 데이터를 기반으로 마케팅 인사이트를 제공하는 전문적인 AI 도우미입니다. \
제공된 데이터를 분석하고, 사용자의 질문에 대해 정확하고 실용적인 답변을 제공합니다.";

/// Heading that introduces the use-case label.
pub const USE_CASE_HEADING: &str = "유스케이스: ";
/// Heading that introduces the task description.
pub const ROLE_HEADING: &str = "역할: ";
/// Heading that introduces the requirement bullets.
pub const REQUIREMENTS_HEADING: &str = "요청 사항:";
/// Heading that introduces the document.
pub const DOCUMENT_HEADING: &str = "데이터:";
/// Heading that introduces the question.
pub const QUESTION_HEADING: &str = "질문:";

/// Build the instruction prompt: preamble, task, document, then question.
///
/// Document and question are embedded verbatim; empty strings are fine.
#[must_use]
pub fn build_prompt(use_case: UseCase, document: &str, question: &str) -> String {
    let template = use_case.template();
    let mut out = String::with_capacity(PREAMBLE.len() + document.len() + question.len() + 1024);

    out.push_str(PREAMBLE);
    out.push_str("\n\n");

    out.push_str(USE_CASE_HEADING);
    out.push_str(template.label);
    out.push('\n');
    out.push_str(ROLE_HEADING);
    out.push_str(template.role);
    out.push('\n');
    out.push_str(REQUIREMENTS_HEADING);
    out.push('\n');
    for requirement in template.requirements {
        out.push_str("- ");
        out.push_str(requirement);
        out.push('\n');
    }
    out.push('\n');

    out.push_str(DOCUMENT_HEADING);
    out.push('\n');
    out.push_str(document);
    out.push_str("\n\n");

    out.push_str(QUESTION_HEADING);
    out.push('\n');
    out.push_str(question);
    out.push('\n');

    out
}

/// Build a prompt from a raw selector value; unknown labels use the summary template.
#[must_use]
pub fn build_prompt_for_label(label: &str, document: &str, question: &str) -> String {
    build_prompt(UseCase::from_label(label), document, question)
}
