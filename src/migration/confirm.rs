//! Operator confirmation for destructive reverse runs.

use std::io::{self, BufRead, Write};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Prompt shown before the first reverse script of a run.
pub const DOWN_PROMPT: &str = "Do you want to proceed with the down migration/s? (y/n): ";

/// A blocking yes/no exchange with the operator.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Accepts every request. Used for non-interactive runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Asks on stdout and reads the answer from stdin. Only `y` or `Y` accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        let mut stdout = io::stdout();
        if write!(stdout, "{}", prompt).and_then(|_| stdout.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Run a blocking call, moving it off the async worker when the runtime allows it.
///
/// `block_in_place` is only available on the multi-thread runtime; elsewhere the
/// call simply blocks the current thread, which holds the single pipeline anyway.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Decision cached by a [`ConfirmationGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmationState {
    #[default]
    Unknown,
    Confirmed,
    Declined,
}

/// Asks for confirmation at most once and remembers the answer.
///
/// The decision lives as long as the gate; a new gate starts as `Unknown`.
pub struct ConfirmationGate {
    required: bool,
    state: ConfirmationState,
    confirm: Box<dyn Confirm>,
}

impl ConfirmationGate {
    pub fn new(required: bool, confirm: Box<dyn Confirm>) -> Self {
        Self {
            required,
            state: ConfirmationState::Unknown,
            confirm,
        }
    }

    /// A gate that never prompts.
    pub fn disabled() -> Self {
        Self::new(false, Box::new(AlwaysConfirm))
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn state(&self) -> ConfirmationState {
        self.state
    }

    /// Whether reverse scripts may run. Prompts only while the state is `Unknown`.
    pub fn check(&mut self) -> bool {
        if !self.required {
            return true;
        }
        if self.state == ConfirmationState::Unknown {
            let confirm = &self.confirm;
            self.state = if run_blocking(|| confirm.confirm(DOWN_PROMPT)) {
                ConfirmationState::Confirmed
            } else {
                ConfirmationState::Declined
            };
        }
        self.state == ConfirmationState::Confirmed
    }
}
