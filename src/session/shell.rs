//! Interactive terminal session.
//!
//! The shell owns all interaction state. Each run collects one [`AnalysisRequest`] through
//! terminal widgets, passes it through the gate, and relays the streamed answer.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Editor, Input, Password, Select};

use crate::analysis::core::config::AnalystConfig;
use crate::analysis::core::errors::{AnalysisError, AnalysisResult};
use crate::analysis::core::use_case::UseCase;
use crate::analysis::gate::{AnalysisRequest, Gate, prepare};
use crate::analysis::input::document::Document;
use crate::analysis::prompt::prompt_budget::{TokenBudget, TokenUsage};
use crate::llm::openai_stream::CompletionClient;
use crate::session::relay::{RelayStats, error_message, relay_stream};

const TITLE: &str = "📊 마케팅 데이터 분석 도우미";
const INTRO: &str = "데이터를 업로드하거나 직접 입력한 후, 분석 목적(유스케이스)을 선택하고 질문을 입력하세요.\n\
선택한 유스케이스에 따라 GPT가 데이터를 해석하고 적절한 마케팅 액션을 제안합니다.";
const API_KEY_REQUIRED: &str = "🗝️ OpenAI API 키를 입력해야 사용이 가능합니다.";
const INPUT_METHODS: [&str; 2] = ["CSV 파일 업로드", "텍스트 직접 입력"];
const PREVIEW_ROWS: usize = 10;

/// How one session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The user supplied no API key.
    NoApiKey,
    /// A precondition stopped the request before any call was made.
    Gated(Gate),
    /// The answer was streamed in full.
    Completed(RelayStats),
    /// The completion call failed; the message was shown.
    Failed(String),
}

/// Terminal front end writing to `out`.
pub struct Shell<W: Write> {
    config: AnalystConfig,
    theme: ColorfulTheme,
    out: W,
}

impl<W: Write> Shell<W> {
    /// Create a shell with the given configuration.
    pub fn new(config: AnalystConfig, out: W) -> Self {
        Self {
            config,
            theme: ColorfulTheme::default(),
            out,
        }
    }

    /// Run one interaction from credential prompt to streamed answer.
    ///
    /// # Errors
    /// Returns an error if a terminal widget or the output sink fails. Completion failures
    /// are shown to the user and reported as [`SessionOutcome::Failed`].
    pub fn run(&mut self) -> AnalysisResult<SessionOutcome> {
        writeln!(self.out, "{TITLE}\n\n{INTRO}\n")?;

        let api_key = Password::with_theme(&self.theme)
            .with_prompt("OpenAI API 키 입력")
            .allow_empty_password(true)
            .interact()?;
        if api_key.trim().is_empty() {
            writeln!(self.out, "{API_KEY_REQUIRED}")?;
            return Ok(SessionOutcome::NoApiKey);
        }

        let document = self.collect_document()?;
        let use_case = self.select_use_case()?;
        let model = self.select_model()?;
        let question = self.collect_question(&document)?;

        let request = AnalysisRequest {
            api_key,
            use_case,
            document: document.text,
            question,
            model,
        };
        self.analyze(&request)
    }

    fn collect_document(&mut self) -> AnalysisResult<Document> {
        writeln!(self.out, "\n### 데이터 입력 방식 선택")?;
        let method = Select::with_theme(&self.theme)
            .with_prompt("데이터를 어떻게 입력하시겠습니까?")
            .items(&INPUT_METHODS)
            .default(0)
            .interact()?;

        if method == 0 {
            let path: String = Input::with_theme(&self.theme)
                .with_prompt("CSV 파일 경로를 입력하세요")
                .allow_empty(true)
                .interact_text()?;
            if path.trim().is_empty() {
                return Ok(Document::empty());
            }
            return self.load_upload(Path::new(path.trim()));
        }

        let text = Editor::new().extension(".txt").edit("")?.unwrap_or_default();
        Ok(Document::from_text(text))
    }

    fn load_upload(&mut self, path: &Path) -> AnalysisResult<Document> {
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let loaded = File::open(path)
            .map_err(AnalysisError::from)
            .and_then(|file| Document::from_upload(&file_name, file));

        match loaded {
            Ok((document, table)) => {
                writeln!(self.out, "업로드한 CSV 데이터 미리보기:")?;
                write!(self.out, "{}", table.preview(PREVIEW_ROWS))?;
                Ok(document)
            }
            Err(err) => {
                tracing::warn!(file = %file_name, %err, "upload rejected");
                writeln!(self.out, "{}", upload_error_message(&err))?;
                Ok(Document::empty())
            }
        }
    }

    fn select_use_case(&mut self) -> AnalysisResult<UseCase> {
        writeln!(self.out, "\n### 분석 목적(유스케이스) 선택")?;
        let labels: Vec<&str> = UseCase::ALL.iter().map(|u| u.label()).collect();
        let index = Select::with_theme(&self.theme)
            .with_prompt("원하는 분석 목적을 선택하세요")
            .items(&labels)
            .default(0)
            .interact()?;
        Ok(UseCase::ALL.get(index).copied().unwrap_or_default())
    }

    fn select_model(&mut self) -> AnalysisResult<String> {
        let models = self.config.llm.selectable_models();
        let default = models
            .iter()
            .position(|m| *m == self.config.llm.model)
            .unwrap_or(0);
        let index = Select::with_theme(&self.theme)
            .with_prompt("모델을 선택하세요")
            .items(&models)
            .default(default)
            .interact()?;
        Ok(models
            .get(index)
            .cloned()
            .unwrap_or_else(|| self.config.llm.model.clone()))
    }

    fn collect_question(&mut self, document: &Document) -> AnalysisResult<String> {
        writeln!(self.out, "\n### 질문 입력")?;
        if document.is_blank() {
            writeln!(self.out, "(데이터가 없어 질문 입력이 비활성화되었습니다.)")?;
            return Ok(String::new());
        }
        let question: String = Input::with_theme(&self.theme)
            .with_prompt("데이터에 대해 궁금한 점을 입력하세요 (예: 이 데이터에서 주요 트렌드는 무엇인가요?)")
            .allow_empty(true)
            .interact_text()?;
        Ok(question)
    }

    fn analyze(&mut self, request: &AnalysisRequest) -> AnalysisResult<SessionOutcome> {
        let budget = TokenBudget::from(&self.config.budget);
        let usage = TokenUsage::measure(&request.document, &request.question);
        writeln!(self.out, "{}", usage_line(usage, budget))?;

        let gate = prepare(request, &budget);
        let Gate::Ready { prompt, .. } = &gate else {
            if let Some(message) = gate_message(&gate) {
                writeln!(self.out, "{message}")?;
            }
            return Ok(SessionOutcome::Gated(gate));
        };

        writeln!(self.out, "\n### 분석 결과\nGPT가 분석 중입니다...")?;
        let streamed = CompletionClient::new(&self.config.llm)
            .and_then(|client| client.stream_chat(&request.api_key, &request.model, prompt))
            .and_then(|stream| relay_stream(stream, &mut self.out));

        match streamed {
            Ok(stats) => {
                writeln!(self.out, "분석 완료!")?;
                tracing::info!(chunks = stats.chunks, use_case = %request.use_case.as_str(), "analysis completed");
                Ok(SessionOutcome::Completed(stats))
            }
            Err(err) => {
                tracing::error!(%err, "analysis failed");
                let message = error_message(&err);
                writeln!(self.out, "\n{message}")?;
                Ok(SessionOutcome::Failed(message))
            }
        }
    }
}

/// Token usage line shown before every request.
#[must_use]
pub fn usage_line(usage: TokenUsage, budget: TokenBudget) -> String {
    format!(
        "현재 입력 토큰 수: {} / 최대 토큰 수: {}",
        usage.total(),
        budget.ceiling
    )
}

/// Message for a gate that stopped the request; `None` for gates that need no message.
#[must_use]
pub fn gate_message(gate: &Gate) -> Option<String> {
    match gate {
        Gate::Ready { .. } => None,
        Gate::MissingApiKey => Some(API_KEY_REQUIRED.to_string()),
        Gate::EmptyDocument => Some("분석할 데이터가 없습니다. 데이터를 입력하세요.".to_string()),
        Gate::EmptyQuestion => Some("질문을 입력하세요.".to_string()),
        Gate::OverBudget { usage, ceiling } => Some(format!(
            "입력 토큰 수({})가 최대 토큰 수({ceiling})를 초과했습니다. 입력 내용을 줄이세요.",
            usage.total()
        )),
    }
}

/// Message shown when an uploaded file cannot be parsed.
#[must_use]
pub fn upload_error_message(err: &AnalysisError) -> String {
    format!("CSV 파일을 읽는 중 오류가 발생했습니다: {err}")
}
