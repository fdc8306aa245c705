//! Wire layer for the Open Trivia Database.
//!
//! [`TriviaApi`] is the boundary the question client talks through. The
//! production implementation issues blocking HTTP requests; [`ScriptedApi`]
//! replays canned responses for headless tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::question::{Difficulty, Question, QuestionFormat, RoundConfiguration};
use crate::source::FetchError;

pub const DEFAULT_API_URL: &str = "https://opentdb.com";

/// Number of questions requested per round
pub const BATCH_SIZE: usize = 10;

/// Upstream `response_code` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    NoResults,
    InvalidParameter,
    TokenNotFound,
    TokenEmpty,
    RateLimit,
    Unknown(u8),
}

impl From<u8> for ResponseCode {
    fn from(code: u8) -> Self {
        match code {
            0 => ResponseCode::Success,
            1 => ResponseCode::NoResults,
            2 => ResponseCode::InvalidParameter,
            3 => ResponseCode::TokenNotFound,
            4 => ResponseCode::TokenEmpty,
            5 => ResponseCode::RateLimit,
            other => ResponseCode::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub response_code: u8,
    #[serde(default)]
    pub token: String,
}

impl TokenResponse {
    pub fn ok(token: impl Into<String>) -> Self {
        Self {
            response_code: 0,
            token: token.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestionsResponse {
    pub response_code: u8,
    #[serde(default)]
    pub results: Vec<RawQuestion>,
}

impl QuestionsResponse {
    pub fn code(code: u8) -> Self {
        Self {
            response_code: code,
            results: Vec::new(),
        }
    }
}

/// A question as it arrives on the wire, with HTML entities still encoded
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawQuestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub difficulty: String,
    pub category: String,
    pub question: String,
    pub correct_answer: String,
    #[serde(default)]
    pub incorrect_answers: Vec<String>,
}

impl RawQuestion {
    /// Decodes entities in every text field. Returns `None` for an unknown question type.
    pub fn decode(self) -> Option<Question> {
        let format = QuestionFormat::from_label(&self.kind)?;
        let incorrect_answers = match format {
            QuestionFormat::Boolean => Vec::new(),
            QuestionFormat::Multiple => self.incorrect_answers.iter().map(|a| unescape(a)).collect(),
        };

        Some(Question {
            text: unescape(&self.question),
            category: unescape(&self.category),
            difficulty: self.difficulty,
            format,
            correct_answer: unescape(&self.correct_answer),
            incorrect_answers,
        })
    }
}

fn unescape(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Query parameters for one batch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchQuery {
    pub amount: usize,
    pub category_id: u32,
    pub difficulty: Difficulty,
    pub format: QuestionFormat,
}

impl From<&RoundConfiguration> for BatchQuery {
    fn from(config: &RoundConfiguration) -> Self {
        Self {
            amount: BATCH_SIZE,
            category_id: config.category_id,
            difficulty: config.difficulty,
            format: config.format,
        }
    }
}

/// Raw access to the upstream service. Implementations report only transport
/// and decoding failures; response codes are interpreted by the caller.
pub trait TriviaApi {
    fn request_token(&self) -> Result<TokenResponse, FetchError>;
    fn reset_token(&self, token: &str) -> Result<TokenResponse, FetchError>;
    fn fetch_questions(&self, query: &BatchQuery, token: &str)
        -> Result<QuestionsResponse, FetchError>;
}

/// Blocking HTTP client for opentdb.com
#[derive(Debug, Clone)]
pub struct HttpTriviaApi {
    client: Client,
    base_url: String,
}

impl HttpTriviaApi {
    /// `timeout` bounds every request end to end
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trivia-tui/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, ?query, "upstream request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                FetchError::InvalidResponse(e.to_string())
            } else {
                FetchError::Network(format!("HTTP {status}"))
            }
        })
    }
}

impl TriviaApi for HttpTriviaApi {
    fn request_token(&self) -> Result<TokenResponse, FetchError> {
        self.get_json("api_token.php", &[("command", "request".to_string())])
    }

    fn reset_token(&self, token: &str) -> Result<TokenResponse, FetchError> {
        self.get_json(
            "api_token.php",
            &[
                ("command", "reset".to_string()),
                ("token", token.to_string()),
            ],
        )
    }

    fn fetch_questions(
        &self,
        query: &BatchQuery,
        token: &str,
    ) -> Result<QuestionsResponse, FetchError> {
        self.get_json(
            "api.php",
            &[
                ("amount", query.amount.to_string()),
                ("category", query.category_id.to_string()),
                ("difficulty", query.difficulty.as_param().to_string()),
                ("type", query.format.as_param().to_string()),
                ("token", token.to_string()),
            ],
        )
    }
}

/// A request observed by [`ScriptedApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    RequestToken,
    ResetToken(String),
    FetchQuestions { query: BatchQuery, token: String },
}

#[derive(Debug, Default)]
struct Script {
    tokens: VecDeque<Result<TokenResponse, FetchError>>,
    resets: VecDeque<Result<TokenResponse, FetchError>>,
    batches: VecDeque<Result<QuestionsResponse, FetchError>>,
    calls: Vec<ApiCall>,
    issued: usize,
}

/// Test api that replays queued responses and records every call.
///
/// Clones share the same script, so a test can keep a handle after moving
/// one into a client. With nothing queued, token requests succeed with
/// `token-N`, resets succeed with the same token, and batch requests fail
/// with a network error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedApi {
    script: Arc<Mutex<Script>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_token(&self, response: Result<TokenResponse, FetchError>) -> &Self {
        self.script().tokens.push_back(response);
        self
    }

    pub fn push_reset(&self, response: Result<TokenResponse, FetchError>) -> &Self {
        self.script().resets.push_back(response);
        self
    }

    pub fn push_batch(&self, response: Result<QuestionsResponse, FetchError>) -> &Self {
        self.script().batches.push_back(response);
        self
    }

    /// Queues a successful batch matching `config`
    pub fn push_round(&self, config: &RoundConfiguration) -> &Self {
        self.push_batch(Ok(Self::round(config)))
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.script().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&ApiCall) -> bool) -> usize {
        self.script().calls.iter().filter(|c| pred(*c)).count()
    }

    pub fn fetch_count(&self) -> usize {
        self.count(|c| matches!(c, ApiCall::FetchQuestions { .. }))
    }

    /// A full successful response for `config`. Multiple-choice answers are
    /// `Answer N` with three `Wrong N.x` distractors; boolean answers are `True`.
    pub fn round(config: &RoundConfiguration) -> QuestionsResponse {
        let results = (1..=BATCH_SIZE)
            .map(|n| {
                let (correct_answer, incorrect_answers) = match config.format {
                    QuestionFormat::Boolean => ("True".to_string(), vec!["False".to_string()]),
                    QuestionFormat::Multiple => (
                        format!("Answer {n}"),
                        (1..=3).map(|x| format!("Wrong {n}.{x}")).collect(),
                    ),
                };
                RawQuestion {
                    kind: config.format.as_param().to_string(),
                    difficulty: config.difficulty.as_param().to_string(),
                    category: crate::category::name_of(config.category_id)
                        .unwrap_or("Any Category")
                        .replace('&', "&amp;"),
                    question: format!("Question #{n}: what&#039;s &quot;this&quot;?"),
                    correct_answer,
                    incorrect_answers,
                }
            })
            .collect();

        QuestionsResponse {
            response_code: 0,
            results,
        }
    }
}

impl TriviaApi for ScriptedApi {
    fn request_token(&self) -> Result<TokenResponse, FetchError> {
        let mut script = self.script();
        script.calls.push(ApiCall::RequestToken);
        match script.tokens.pop_front() {
            Some(response) => response,
            None => {
                script.issued += 1;
                Ok(TokenResponse::ok(format!("token-{}", script.issued)))
            }
        }
    }

    fn reset_token(&self, token: &str) -> Result<TokenResponse, FetchError> {
        let mut script = self.script();
        script.calls.push(ApiCall::ResetToken(token.to_string()));
        script
            .resets
            .pop_front()
            .unwrap_or_else(|| Ok(TokenResponse::ok(token)))
    }

    fn fetch_questions(
        &self,
        query: &BatchQuery,
        token: &str,
    ) -> Result<QuestionsResponse, FetchError> {
        let mut script = self.script();
        script.calls.push(ApiCall::FetchQuestions {
            query: *query,
            token: token.to_string(),
        });
        script
            .batches
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network("no scripted response".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_code_mapping() {
        assert_eq!(ResponseCode::from(0), ResponseCode::Success);
        assert_eq!(ResponseCode::from(1), ResponseCode::NoResults);
        assert_eq!(ResponseCode::from(2), ResponseCode::InvalidParameter);
        assert_eq!(ResponseCode::from(3), ResponseCode::TokenNotFound);
        assert_eq!(ResponseCode::from(4), ResponseCode::TokenEmpty);
        assert_eq!(ResponseCode::from(5), ResponseCode::RateLimit);
        assert_eq!(ResponseCode::from(42), ResponseCode::Unknown(42));
    }

    #[test]
    fn test_parse_questions_payload() {
        let body = r#"{
            "response_code": 0,
            "results": [{
                "type": "multiple",
                "difficulty": "medium",
                "category": "Entertainment: Books",
                "question": "Who wrote &quot;Dune&quot;?",
                "correct_answer": "Frank Herbert",
                "incorrect_answers": ["Isaac Asimov", "Arthur C. Clarke", "Ursula K. Le Guin"]
            }]
        }"#;

        let response: QuestionsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.response_code, 0);
        assert_eq!(response.results.len(), 1);

        let q = response.results[0].clone().decode().unwrap();
        assert_eq!(q.text, "Who wrote \"Dune\"?");
        assert_eq!(q.format, QuestionFormat::Multiple);
        assert_eq!(q.difficulty, "medium");
        assert_eq!(q.incorrect_answers.len(), 3);
    }

    #[test]
    fn test_error_payload_without_results() {
        let response: QuestionsResponse = serde_json::from_str(r#"{"response_code": 5}"#).unwrap();
        assert_eq!(ResponseCode::from(response.response_code), ResponseCode::RateLimit);
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_decode_entities_in_answers() {
        let raw = RawQuestion {
            kind: "multiple".to_string(),
            difficulty: "hard".to_string(),
            category: "Science &amp; Nature".to_string(),
            question: "What is &lt;H&gt;&#039;s symbol?".to_string(),
            correct_answer: "Hydrog&eacute;ne".to_string(),
            incorrect_answers: vec!["O&#178;".to_string()],
        };

        let q = raw.decode().unwrap();
        assert_eq!(q.category, "Science & Nature");
        assert_eq!(q.text, "What is <H>'s symbol?");
        assert_eq!(q.correct_answer, "Hydrogéne");
        assert_eq!(q.incorrect_answers, vec!["O²"]);
    }

    #[test]
    fn test_decode_boolean_drops_incorrect_answers() {
        let raw = RawQuestion {
            kind: "boolean".to_string(),
            difficulty: "easy".to_string(),
            category: "History".to_string(),
            question: "The Great Wall is visible from the Moon.".to_string(),
            correct_answer: "False".to_string(),
            incorrect_answers: vec!["True".to_string()],
        };

        let q = raw.decode().unwrap();
        assert_eq!(q.format, QuestionFormat::Boolean);
        assert!(q.incorrect_answers.is_empty());
    }

    #[test]
    fn test_decode_unknown_type() {
        let raw = RawQuestion {
            kind: "essay".to_string(),
            difficulty: "easy".to_string(),
            category: "History".to_string(),
            question: "Discuss.".to_string(),
            correct_answer: "-".to_string(),
            incorrect_answers: vec![],
        };
        assert!(raw.decode().is_none());
    }

    #[test]
    fn test_batch_query_from_configuration() {
        let config = RoundConfiguration::new(22, Difficulty::Hard, QuestionFormat::Boolean);
        let query = BatchQuery::from(&config);
        assert_eq!(query.amount, BATCH_SIZE);
        assert_eq!(query.category_id, 22);
        assert_eq!(query.difficulty, Difficulty::Hard);
        assert_eq!(query.format, QuestionFormat::Boolean);
    }

    #[test]
    fn test_http_api_trims_trailing_slash() {
        let api = HttpTriviaApi::new("http://localhost:9/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.base_url(), "http://localhost:9");
    }

    #[test]
    fn test_scripted_api_defaults_and_recording() {
        let api = ScriptedApi::new();
        let shared = api.clone();

        assert_eq!(api.request_token().unwrap().token, "token-1");
        assert_eq!(api.reset_token("token-1").unwrap().token, "token-1");

        let query = BatchQuery::from(&RoundConfiguration::default());
        assert!(matches!(
            api.fetch_questions(&query, "token-1"),
            Err(FetchError::Network(_))
        ));

        assert_eq!(
            shared.calls(),
            vec![
                ApiCall::RequestToken,
                ApiCall::ResetToken("token-1".to_string()),
                ApiCall::FetchQuestions {
                    query,
                    token: "token-1".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_scripted_round_matches_configuration() {
        let config = RoundConfiguration::new(17, Difficulty::Medium, QuestionFormat::Multiple);
        let response = ScriptedApi::round(&config);
        assert_eq!(response.results.len(), BATCH_SIZE);
        let q = response.results[0].clone().decode().unwrap();
        assert_eq!(q.category, "Science & Nature");
        assert_eq!(q.text, "Question #1: what's \"this\"?");
        assert_eq!(q.correct_answer, "Answer 1");
    }

    /// Serves one canned HTTP response and hands back the request line
    fn serve_once(status: &str, body: &str) -> (String, std::thread::JoinHandle<String>) {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            request_line.trim_end().to_string()
        });

        (base, handle)
    }

    fn http(base: &str) -> HttpTriviaApi {
        HttpTriviaApi::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_http_token_request_line() {
        let (base, server) = serve_once("200 OK", r#"{"response_code":0,"token":"abc"}"#);

        let response = http(&base).request_token().unwrap();

        assert_eq!(response, TokenResponse::ok("abc"));
        assert_eq!(
            server.join().unwrap(),
            "GET /api_token.php?command=request HTTP/1.1"
        );
    }

    #[test]
    fn test_http_token_reset_request_line() {
        let (base, server) = serve_once("200 OK", r#"{"response_code":0,"token":"abc"}"#);

        http(&base).reset_token("abc").unwrap();

        assert_eq!(
            server.join().unwrap(),
            "GET /api_token.php?command=reset&token=abc HTTP/1.1"
        );
    }

    #[test]
    fn test_http_fetch_request_line() {
        let (base, server) = serve_once("200 OK", r#"{"response_code":1,"results":[]}"#);
        let config = RoundConfiguration::new(9, Difficulty::Easy, QuestionFormat::Boolean);

        let response = http(&base)
            .fetch_questions(&BatchQuery::from(&config), "tok")
            .unwrap();

        assert_eq!(response.response_code, 1);
        assert_eq!(
            server.join().unwrap(),
            "GET /api.php?amount=10&category=9&difficulty=easy&type=boolean&token=tok HTTP/1.1"
        );
    }

    #[test]
    fn test_http_rate_limit_body_is_parsed() {
        let (base, server) = serve_once("429 Too Many Requests", r#"{"response_code":5}"#);
        let query = BatchQuery::from(&RoundConfiguration::default());

        let response = http(&base).fetch_questions(&query, "tok").unwrap();

        assert_eq!(ResponseCode::from(response.response_code), ResponseCode::RateLimit);
        server.join().unwrap();
    }

    #[test]
    fn test_http_garbage_body_on_success_is_invalid_response() {
        let (base, server) = serve_once("200 OK", "<html>maintenance</html>");

        let result = http(&base).request_token();

        assert!(matches!(result, Err(FetchError::InvalidResponse(_))));
        server.join().unwrap();
    }

    #[test]
    fn test_http_garbage_body_on_server_error_is_network() {
        let (base, server) = serve_once("500 Internal Server Error", "oops");

        let result = http(&base).request_token();

        assert!(matches!(result, Err(FetchError::Network(ref m)) if m.contains("500")));
        server.join().unwrap();
    }

    #[test]
    fn test_http_connection_refused_is_network() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        assert!(matches!(http(&base).request_token(), Err(FetchError::Network(_))));
    }
}
