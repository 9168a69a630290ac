//! Fixed prompt texts and user-visible notices.

/// Appended after a round of tool calls so the model explains the result.
pub const TOOL_FOLLOW_UP: &str = "Please summarize or explain the result of the previous tool call for the user.";

pub const TOOL_LIMIT_NOTICE: &str = "[Tool execution limit reached]";

pub const NO_PLAN_STEPS: &str = "[No plan steps found. Try rephrasing your request.]";

pub const FORCE_PLAN_ARMED: &str =
    "[Force planning mode enabled for next request. Please enter your request after /plan.]";

pub fn plan_request(chain_limit: usize) -> String {
    format!(
        "Given the user's request, break it down into a numbered list of concrete steps (tools or actions) to achieve the goal. \
         Only plan up to {chain_limit} steps. Respond with the plan as a numbered list."
    )
}

pub fn execute_step(index: usize, step: &str, feedback: Option<&str>) -> String {
    let mut prompt = format!(
        "Execute step {index}: '{step}'. Use tools when needed by returning <tool:name>arguments</tool>. \
         Provide clear results of your actions."
    );
    if let Some(feedback) = feedback.filter(|f| !f.is_empty()) {
        prompt.push_str(&format!(" Previous feedback: {feedback}"));
    }
    prompt
}

pub fn verify_step(index: usize, step: &str, outcome: &str) -> String {
    format!(
        "Based on the recent actions and results: {outcome}\n\
         Did this complete step {index} ('{step}')? Answer 'yes' if complete, otherwise answer 'no' and explain what remains."
    )
}

pub fn retry_step(step: &str, feedback: &str) -> String {
    format!("Step '{step}' remains incomplete. Adjust your approach using this feedback: {feedback}. Then try again.")
}

pub fn final_summary(goal: &str, outcomes: &[String]) -> String {
    format!(
        "Goal: '{goal}'.\n\
         Provide a final user-facing summary that explains the work completed, mentions any remaining tasks, and confirms whether the goal is satisfied.\n\
         Here are the step outcomes:\n\
         {}\n\
         Respond concisely for the user.",
        outcomes.join("\n")
    )
}

pub fn router(request: &str) -> String {
    format!(
        "You are an AI assistant that can either answer questions directly or plan multi-step solutions using available tools.\n\
         For the following user request, decide if it requires multi-step planning (using tools or actions in sequence) or if you can answer it directly.\n\
         - If the request is simple (e.g., 'What is 2+2?' or 'What's the weather?'), reply with: respond\n\
         - If the request requires multiple steps, tool use, or actions (e.g., 'Create a file and then summarize its contents'), reply with: plan\n\
         User request: '{request}'\n\
         Reply with only one word: plan or respond"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_request_names_the_limit() {
        let prompt = plan_request(4);
        assert!(prompt.contains("Only plan up to 4 steps."));
        assert!(prompt.starts_with("Given the user's request, break it down"));
    }

    #[test]
    fn execute_prompt_carries_feedback() {
        let first = execute_step(2, "read a.txt", None);
        assert!(first.starts_with("Execute step 2: 'read a.txt'. Use tools"));
        assert!(!first.contains("Previous feedback"));

        let retry = execute_step(2, "read a.txt", Some("no, file missing"));
        assert!(retry.ends_with("actions. Previous feedback: no, file missing"));
    }

    #[test]
    fn verify_prompt_has_two_lines() {
        let prompt = verify_step(1, "make dir", "Created.");
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(lines[0], "Based on the recent actions and results: Created.");
        assert!(lines[1].starts_with("Did this complete step 1 ('make dir')?"));
    }

    #[test]
    fn summary_lists_outcomes() {
        let prompt = final_summary("build it", &["Step 1: a -> complete | Attempts: 1 | Result: ok".into()]);
        assert!(prompt.starts_with("Goal: 'build it'.\n"));
        assert!(prompt.contains("Here are the step outcomes:\nStep 1: a -> complete"));
        assert!(prompt.ends_with("Respond concisely for the user."));
    }

    #[test]
    fn router_quotes_the_request() {
        let prompt = router("list files");
        assert!(prompt.contains("User request: 'list files'\n"));
        assert!(prompt.ends_with("Reply with only one word: plan or respond"));
    }
}
