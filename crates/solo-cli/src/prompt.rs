//! Terminal prompts

use std::io::{BufRead, Write};

use async_trait::async_trait;
use solo_core::{LocalConfigError, Prompter};

/// [`Prompter`] reading answers from stdin
#[derive(Debug, Default)]
pub(crate) struct StdinPrompter;

fn ask(question: &str, default: Option<&str>) -> std::io::Result<String> {
    let mut stderr = std::io::stderr().lock();
    match default {
        Some(default) => write!(stderr, "{question} [{default}]: ")?,
        None => write!(stderr, "{question}: ")?,
    }
    stderr.flush()?;

    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[async_trait]
impl Prompter for StdinPrompter {
    async fn input(&self, question: &str, default: Option<&str>) -> Result<String, LocalConfigError> {
        let question = question.to_string();
        let default = default.map(str::to_string);
        tokio::task::spawn_blocking(move || ask(&question, default.as_deref()))
            .await
            .map_err(|e| LocalConfigError::Prompt(e.to_string()))?
            .map_err(|e| LocalConfigError::Prompt(e.to_string()))
    }
}
