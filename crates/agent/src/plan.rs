//! Plan parsing and the per-step state machine.
//!
//! ```text
//! Executing -> Verifying -> Complete
//!                        -> Retrying -> Executing   (attempts remain)
//!                        -> Failed                  (attempts exhausted)
//! ```

use regex_lite::Regex;
use std::sync::LazyLock;

static PLAN_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s*(.*)$").expect("invalid plan pattern"));

/// Extract the steps of a numbered list. Leading indentation is ignored
/// and steps with no text are skipped.
pub fn parse_plan(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let caps = PLAN_LINE.captures(line.trim())?;
            let step = caps.get(1)?.as_str().trim();
            (!step.is_empty()).then(|| step.to_string())
        })
        .collect()
}

/// Whether a verification answer accepts the step.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().to_lowercase().starts_with("yes")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Executing,
    Verifying,
    Retrying,
    Complete,
    Failed,
}

/// Bookkeeping for one plan step during a planning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStepRecord {
    /// 1-based position in the plan
    pub index: usize,
    pub step_text: String,
    pub completed: bool,
    pub attempts: usize,
    pub last_result: String,
    pub last_verification: String,
    pub state: StepState,
}

impl PlanStepRecord {
    pub fn new(index: usize, step_text: impl Into<String>) -> Self {
        Self {
            index,
            step_text: step_text.into(),
            completed: false,
            attempts: 0,
            last_result: String::new(),
            last_verification: String::new(),
            state: StepState::Executing,
        }
    }

    /// Start the next attempt.
    pub fn begin_attempt(&mut self) {
        self.attempts += 1;
        self.state = StepState::Executing;
    }

    /// The execution produced `result`; verification comes next.
    pub fn record_result(&mut self, result: impl Into<String>) {
        self.last_result = result.into();
        self.state = StepState::Verifying;
    }

    /// Apply a verification answer given the attempt budget.
    pub fn record_verification(&mut self, answer: impl Into<String>, max_attempts: usize) -> StepState {
        self.last_verification = answer.into();
        self.state = if is_affirmative(&self.last_verification) {
            self.completed = true;
            StepState::Complete
        } else if self.attempts < max_attempts {
            StepState::Retrying
        } else {
            StepState::Failed
        };
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, StepState::Complete | StepState::Failed)
    }

    /// First line of the latest verification answer.
    pub fn verification_headline(&self) -> &str {
        self.last_verification.lines().next().unwrap_or_default()
    }

    /// One line of the final-summary prompt.
    pub fn outcome_line(&self) -> String {
        format!(
            "Step {}: {} -> {} | Attempts: {} | Result: {}",
            self.index,
            self.step_text,
            if self.completed { "complete" } else { "incomplete" },
            self.attempts,
            self.last_result
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_lines_become_steps() {
        let plan = "Here is the plan:\n1. Create file a.txt\n2.Read file a.txt\n  3.  Summarize  \nThanks";
        assert_eq!(parse_plan(plan), vec!["Create file a.txt", "Read file a.txt", "Summarize"]);
    }

    #[test]
    fn unnumbered_text_has_no_steps() {
        assert!(parse_plan("Sure, I can do that.").is_empty());
        assert!(parse_plan("- bullet\n* star").is_empty());
        assert!(parse_plan("1.\n2.   ").is_empty());
    }

    #[test]
    fn affirmative_answers() {
        assert!(is_affirmative("Yes, the file exists."));
        assert!(is_affirmative("  YES"));
        assert!(!is_affirmative("No, still missing."));
        assert!(!is_affirmative("I think yes"));
    }

    #[test]
    fn step_completes_on_yes() {
        let mut record = PlanStepRecord::new(1, "create file a.txt");
        record.begin_attempt();
        record.record_result("Created file a.txt.");
        assert_eq!(record.state, StepState::Verifying);
        assert_eq!(record.record_verification("yes", 1), StepState::Complete);
        assert!(record.completed);
        assert!(record.is_terminal());
        assert_eq!(record.attempts, 1);
    }

    #[test]
    fn step_retries_then_fails() {
        let mut record = PlanStepRecord::new(2, "read file a.txt");
        record.begin_attempt();
        record.record_result("nothing");
        assert_eq!(record.record_verification("no\nfile missing", 2), StepState::Retrying);
        assert!(!record.is_terminal());
        assert_eq!(record.verification_headline(), "no");

        record.begin_attempt();
        record.record_result("still nothing");
        assert_eq!(record.record_verification("no", 2), StepState::Failed);
        assert!(!record.completed);
        assert_eq!(record.attempts, 2);
    }

    #[test]
    fn outcome_line_format() {
        let mut record = PlanStepRecord::new(1, "list files");
        record.begin_attempt();
        record.record_result("a.txt");
        record.record_verification("yes", 3);
        assert_eq!(record.outcome_line(), "Step 1: list files -> complete | Attempts: 1 | Result: a.txt");
    }
}
