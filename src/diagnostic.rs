use crate::db::SettingsRepository;
use crate::errors::AppResult;
use crate::redaction::mask_webhook_url;
use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};

pub trait OperatorConsole {
    fn say(&mut self, line: &str) -> AppResult<()>;
    fn confirm(&mut self, question: &str) -> AppResult<bool>;
}

pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

#[derive(Debug)]
pub struct LineConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl LineConsole<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> OperatorConsole for LineConsole<R, W> {
    fn say(&mut self, line: &str) -> AppResult<()> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    fn confirm(&mut self, question: &str) -> AppResult<bool> {
        write!(self.output, "{} (y/n): ", question)?;
        self.output.flush()?;

        let mut answer = String::new();
        let read = self.input.read_line(&mut answer)?;
        // closed input counts as a decline
        if read == 0 {
            writeln!(self.output)?;
            return Ok(false);
        }
        Ok(is_affirmative(&answer))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    NotConfigured,
    AlreadyDisabled,
    Cleared,
    Cancelled,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotConfigured => "not-configured",
            Self::AlreadyDisabled => "already-disabled",
            Self::Cleared => "cleared",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticState {
    Idle,
    Reported { url: String },
    Resolved(Resolution),
}

#[derive(Debug)]
pub struct WebhookDiagnostic<'a> {
    repo: &'a SettingsRepository,
    state: DiagnosticState,
}

impl<'a> WebhookDiagnostic<'a> {
    pub fn new(repo: &'a SettingsRepository) -> Self {
        Self {
            repo,
            state: DiagnosticState::Idle,
        }
    }

    pub fn state(&self) -> &DiagnosticState {
        &self.state
    }

    pub fn inspect(&mut self) -> AppResult<&DiagnosticState> {
        if self.state == DiagnosticState::Idle {
            self.state = match self.repo.webhook_url()? {
                None => DiagnosticState::Resolved(Resolution::NotConfigured),
                Some(url) if url.is_empty() => DiagnosticState::Resolved(Resolution::AlreadyDisabled),
                Some(url) => DiagnosticState::Reported { url },
            };
        }
        Ok(&self.state)
    }

    pub fn decide(&mut self, affirm: bool) -> AppResult<Resolution> {
        self.inspect()?;
        let resolution = match &self.state {
            DiagnosticState::Resolved(resolution) => return Ok(*resolution),
            DiagnosticState::Reported { url } if affirm => {
                self.repo.clear_webhook_url()?;
                tracing::info!(webhook = %mask_webhook_url(url), "discord webhook cleared by operator");
                Resolution::Cleared
            }
            DiagnosticState::Reported { .. } => {
                tracing::info!("operator declined to clear discord webhook");
                Resolution::Cancelled
            }
            DiagnosticState::Idle => Resolution::NotConfigured,
        };
        self.state = DiagnosticState::Resolved(resolution);
        Ok(resolution)
    }

    pub fn run<C: OperatorConsole>(mut self, console: &mut C) -> AppResult<Resolution> {
        console.say("=== Discord webhook diagnostic ===")?;

        let url = match self.inspect()?.clone() {
            DiagnosticState::Reported { url } => url,
            DiagnosticState::Resolved(Resolution::NotConfigured) | DiagnosticState::Idle => {
                console.say("Security settings not found; the webhook is not configured.")?;
                return Ok(Resolution::NotConfigured);
            }
            DiagnosticState::Resolved(resolution) => {
                console.say("Current webhook URL: (empty). Discord alerts are disabled.")?;
                return Ok(resolution);
            }
        };

        console.say(&format!("Current webhook URL: {}", url))?;
        console.say("Alert delivery to this URL may be failing.")?;
        let affirm = console.confirm("Disable the Discord webhook?")?;

        let resolution = self.decide(affirm)?;
        match resolution {
            Resolution::Cleared => {
                console.say("Discord webhook disabled.")?;
                console.say("Restart the protection service for the change to take effect.")?;
            }
            _ => console.say("Cancelled; nothing was changed.")?,
        }
        Ok(resolution)
    }
}
