use aigw_protocol::openai::chat_completions::types::ReasoningEffort;

/// Fixed effort -> thinking-token-budget table used whenever only a
/// qualitative effort is given.
pub const BUDGET_LOW: i32 = 1024;
pub const BUDGET_MEDIUM: i32 = 8192;
pub const BUDGET_HIGH: i32 = 24576;

/// Budget meaning "let the model decide" on budget-based backends.
pub const BUDGET_DYNAMIC: i32 = -1;

/// Translate an abstract effort into a token budget.
/// `None` effort disables thinking (budget 0); `Auto` defers to the
/// backend's dynamic mode.
pub fn effort_to_budget(effort: ReasoningEffort) -> i32 {
    match effort {
        ReasoningEffort::None => 0,
        ReasoningEffort::Low => BUDGET_LOW,
        ReasoningEffort::Medium => BUDGET_MEDIUM,
        ReasoningEffort::High => BUDGET_HIGH,
        ReasoningEffort::Auto => BUDGET_DYNAMIC,
    }
}

/// Collapse an explicit token budget back into a level for targets that
/// only take a named effort. Thresholds follow the table above.
pub fn budget_to_effort(budget: i32) -> ReasoningEffort {
    if budget == 0 {
        ReasoningEffort::None
    } else if budget < 0 {
        ReasoningEffort::Auto
    } else if budget <= BUDGET_LOW {
        ReasoningEffort::Low
    } else if budget <= BUDGET_MEDIUM {
        ReasoningEffort::Medium
    } else {
        ReasoningEffort::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effort_budget_table() {
        assert_eq!(effort_to_budget(ReasoningEffort::Low), 1024);
        assert_eq!(effort_to_budget(ReasoningEffort::Medium), 8192);
        assert_eq!(effort_to_budget(ReasoningEffort::High), 24576);
        assert_eq!(effort_to_budget(ReasoningEffort::None), 0);
        assert_eq!(effort_to_budget(ReasoningEffort::Auto), -1);
    }

    #[test]
    fn budget_thresholds_round_trip() {
        assert_eq!(budget_to_effort(1024), ReasoningEffort::Low);
        assert_eq!(budget_to_effort(2000), ReasoningEffort::Medium);
        assert_eq!(budget_to_effort(30000), ReasoningEffort::High);
        assert_eq!(budget_to_effort(0), ReasoningEffort::None);
        assert_eq!(budget_to_effort(-1), ReasoningEffort::Auto);
    }
}
