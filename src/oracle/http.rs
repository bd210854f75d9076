//! OpenAI-compatible chat completion client

use serde::{Deserialize, Serialize};

use super::{LlmConfig, OracleError, TextOracle};
use crate::Result;

/// System message sent with every prompt
pub const SYSTEM_PROMPT: &str =
    "You are a test generation system. Return content ONLY in the required format";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Blocking client for one chat completion endpoint
///
/// Built once from an [`LlmConfig`] and shared by reference.
pub struct HttpTextOracle {
    config: LlmConfig,
    api_key: String,
    agent: ureq::Agent,
}

impl HttpTextOracle {
    /// Create a client with the configured timeouts
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the configuration is invalid or no API
    /// key is available
    pub fn new(config: LlmConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.resolved_api_key()?;
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_connect(Some(config.connect_timeout()))
            .timeout_send_request(Some(config.write_timeout()))
            .timeout_send_body(Some(config.write_timeout()))
            .timeout_recv_response(Some(config.read_timeout()))
            .timeout_recv_body(Some(config.read_timeout()))
            .http_status_as_error(false)
            .build()
            .into();
        Ok(Self {
            config,
            api_key,
            agent,
        })
    }

    /// Client configuration
    #[must_use]
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn request_body(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        Ok(serde_json::to_string(&request)?)
    }
}

/// Extract `choices[0].message.content` from a response body
fn reply_content(body: &str) -> std::result::Result<String, OracleError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| OracleError::MalformedResponse(format!("invalid json: {e}")))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::MalformedResponse("no choices in response".to_string()))?;
    let message = choice
        .message
        .ok_or_else(|| OracleError::MalformedResponse("no message in choice".to_string()))?;
    message
        .content
        .ok_or_else(|| OracleError::MalformedResponse("no content in message".to_string()))
}

impl TextOracle for HttpTextOracle {
    fn query(&self, prompt: &str) -> Result<String> {
        let payload = self.request_body(prompt)?;
        log::debug!("sending request to {}:\n{payload}", self.config.api_url);

        let mut response = self
            .agent
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(payload.as_str())
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(OracleError::Status {
                code: status.as_u16(),
                body,
            }
            .into());
        }

        let content = reply_content(&body)?;
        log::debug!("received reply:\n{content}");
        Ok(content)
    }
}

impl std::fmt::Debug for HttpTextOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTextOracle")
            .field("model", &self.config.model)
            .field("api_url", &self.config.api_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;
    use crate::Error;

    /// Serve one canned HTTP response and hand back the request body
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let url = format!("http://{}/v1/chat/completions", listener.local_addr().expect("addr"));
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept should succeed");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read header");
                let header = line.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().expect("length");
                    }
                }
            }
            let mut request = vec![0; content_length];
            reader.read_exact(&mut request).expect("read body");
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .expect("write response");
            String::from_utf8(request).expect("utf8 body")
        });
        (url, handle)
    }

    fn oracle(url: &str) -> HttpTextOracle {
        HttpTextOracle::new(LlmConfig::new("test-model", url).with_api_key("sk-test"))
            .expect("client should build")
    }

    #[test]
    fn test_reply_content_paths() {
        let ok = r#"{"choices":[{"message":{"role":"assistant","content":"2"}}]}"#;
        assert_eq!(reply_content(ok).expect("should parse"), "2");
        for bad in [
            "not json",
            r#"{"choices":[]}"#,
            r#"{"choices":[{}]}"#,
            r#"{"choices":[{"message":{"role":"assistant"}}]}"#,
        ] {
            assert!(matches!(
                reply_content(bad),
                Err(OracleError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn test_request_body_shape() {
        let oracle = oracle("http://localhost:1/v1");
        let body = oracle.request_body("pick one").expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&body).expect("json");
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(value["messages"][1]["content"], "pick one");
    }

    #[test]
    fn test_query_round_trip() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"Index: 1"}}]}"#,
        );
        let reply = oracle(&url).query("which variable?").expect("query should succeed");
        assert_eq!(reply, "Index: 1");
        let request = server.join().expect("server thread");
        assert!(request.contains("which variable?"));
    }

    #[test]
    fn test_error_status_is_reported() {
        let (url, server) = serve_once("503 Service Unavailable", r#"{"error":"busy"}"#);
        let err = oracle(&url).query("x").expect_err("query should fail");
        server.join().expect("server thread");
        match err {
            Error::Oracle(OracleError::Status { code, body }) => {
                assert_eq!(code, 503);
                assert!(body.contains("busy"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let mut config = LlmConfig::new("m", "http://localhost:1");
        config.api_key = Some(String::new());
        assert!(matches!(
            HttpTextOracle::new(config),
            Err(Error::Configuration(_))
        ));
    }
}
