//! Analysis use cases.
//!
//! A use case is the fixed category of analysis intent picked by the user. Each one is
//! bound to a static [`UseCaseTemplate`] that the prompt builder renders.
//!
//! Notes:
//! - Canonical labels are the Korean strings shown in the selector.
//! - [`UseCase::from_label`] is total: anything unrecognised resolves to
//!   [`UseCase::Summary`]. Use [`str::parse`] when unknown input must be rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed instruction template bound to a use case.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UseCaseTemplate {
    /// Label written into the prompt heading.
    pub label: &'static str,
    /// English title for display.
    pub title: &'static str,
    /// Task description.
    pub role: &'static str,
    /// Ordered requirement bullets.
    pub requirements: [&'static str; 4],
}

const SUMMARY: UseCaseTemplate = UseCaseTemplate {
    label: "데이터 요약 및 분석",
    title: "Data Summary and Analysis",
    role: "제공된 데이터를 분석하고, 주요 트렌드, 패턴, 이상치 등을 식별하여 요약해 주세요.",
    requirements: [
        "주요 지표와 그 변화 추이를 설명해 주세요.",
        "데이터 내의 중요한 패턴이나 트렌드를 식별해 주세요.",
        "이상치나 주목할 만한 데이터 포인트가 있다면 언급해 주세요.",
        "가능한 경우, 데이터 시각화에 대한 제안을 포함해 주세요.",
    ],
};

const STRATEGY_RECOMMENDATION: UseCaseTemplate = UseCaseTemplate {
    label: "마케팅 전략 제안",
    title: "Marketing Strategy Recommendation",
    role: "제공된 데이터를 기반으로 효과적인 마케팅 전략과 액션 플랜을 제안해 주세요.",
    requirements: [
        "데이터에서 도출된 인사이트를 바탕으로 구체적인 마케팅 전략을 제안해 주세요.",
        "타겟 고객 세그먼트, 추천 마케팅 채널, 캠페인 아이디어 등을 포함해 주세요.",
        "각 전략의 예상 효과와 실행 방법을 간략히 설명해 주세요.",
        "예산 고려 사항이나 우선 순위에 대한 제안이 있다면 포함해 주세요.",
    ],
};

const COMPARISON_EVALUATION: UseCaseTemplate = UseCaseTemplate {
    label: "데이터 비교 및 평가",
    title: "Data Comparison and Evaluation",
    role: "제공된 데이터 세트를 비교 분석하고, 성과를 평가하며 개선점을 도출해 주세요.",
    requirements: [
        "비교할 주요 지표와 그 변화 추이를 분석해 주세요.",
        "두 데이터 세트 간의 유사점과 차이점을 식별해 주세요.",
        "성과 평가를 기반으로 한 구체적인 개선 방안을 제안해 주세요.",
        "필요한 경우, 추가 데이터 수집이나 분석 방법에 대한 제안을 포함해 주세요.",
    ],
};

/// The analysis intent selected by the user.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    /// Summarize metrics, trends, patterns, and outliers.
    #[default]
    Summary,
    /// Propose marketing strategies and an action plan.
    StrategyRecommendation,
    /// Compare data sets and evaluate performance.
    ComparisonEvaluation,
}

impl UseCase {
    /// All use cases in selector order.
    pub const ALL: [Self; 3] = [
        Self::Summary,
        Self::StrategyRecommendation,
        Self::ComparisonEvaluation,
    ];

    /// Stable identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::StrategyRecommendation => "strategy_recommendation",
            Self::ComparisonEvaluation => "comparison_evaluation",
        }
    }

    /// The fixed template for this use case.
    #[must_use]
    pub const fn template(self) -> &'static UseCaseTemplate {
        match self {
            Self::Summary => &SUMMARY,
            Self::StrategyRecommendation => &STRATEGY_RECOMMENDATION,
            Self::ComparisonEvaluation => &COMPARISON_EVALUATION,
        }
    }

    /// Selector label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        self.template().label
    }

    /// English title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        self.template().title
    }

    /// Resolve a selector value, falling back to [`UseCase::Summary`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a string names no known use case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UseCaseParseError(pub String);

impl fmt::Display for UseCaseParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown use case: {:?}", self.0)
    }
}

impl std::error::Error for UseCaseParseError {}

impl FromStr for UseCase {
    type Err = UseCaseParseError;

    /// Accepts the selector label, the English title, or the stable identifier
    /// (snake_case or kebab-case, any ASCII case).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        Self::ALL
            .into_iter()
            .find(|use_case| {
                raw == use_case.label()
                    || raw.eq_ignore_ascii_case(use_case.title())
                    || raw.replace('-', "_").eq_ignore_ascii_case(use_case.as_str())
            })
            .ok_or_else(|| UseCaseParseError(raw.to_string()))
    }
}
