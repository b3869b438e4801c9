//! Runs one prompt through an external model process.
//!
//! The prompt is written to the child's stdin and everything it prints on
//! stdout is the response. There is no timeout and no retry: a model can take
//! as long as it needs, and the user interrupts the process to give up.

use std::io::Write;
use std::process::{Command, Stdio};

use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::error::{PennyError, Result};

pub trait Gateway {
    fn run(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct CommandGateway {
    program: String,
    args: Vec<String>,
}

impl CommandGateway {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Gateway for CommandGateway {
    fn run(&self, prompt: &str) -> Result<String> {
        debug!(
            program = %self.program,
            args = ?self.args,
            prompt_bytes = prompt.len(),
            "Executing gateway command"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PennyError::Gateway(format!("could not start `{}`: {e}", self.program))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PennyError::Gateway("child stdin unavailable".into()))?;

        // Feed stdin from its own thread so a child that answers while still
        // reading cannot fill its stdout pipe and stall us.
        let (written, output) = std::thread::scope(|s| {
            let writer = s.spawn(move || {
                let result = stdin.write_all(prompt.as_bytes());
                drop(stdin);
                result
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output.map_err(|e| {
            PennyError::Gateway(format!("could not wait for `{}`: {e}", self.program))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                program = %self.program,
                status = %output.status,
                stderr = %stderr,
                "Gateway command failed"
            );
            return Err(PennyError::Gateway(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(PennyError::Gateway(format!("could not write prompt: {e}")));
            }
            Err(_) => return Err(PennyError::Gateway("prompt writer panicked".into())),
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(
            program = %self.program,
            response_bytes = text.len(),
            "Gateway command succeeded"
        );
        Ok(text)
    }
}

/// Strip one surrounding Markdown code fence (```json ... ```), if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    match body.find('\n') {
        Some(nl) => body[nl + 1..].trim(),
        None => body.trim(),
    }
}

/// Parse a model response as a single JSON object of type `T`.
pub fn parse_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(PennyError::Parse("empty response".into()));
    }
    serde_json::from_str(body).map_err(|e| PennyError::Parse(e.to_string()))
}
