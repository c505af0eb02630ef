//! System prompt composition.

use super::state::Personality;

/// Compose the system instruction: invariant base behavior plus the
/// selected personality clause.
pub fn compose_system_prompt(personality: Personality) -> String {
    const BASE_TEMPLATE: &str = include_str!("../../prompts/base.txt");

    BASE_TEMPLATE.replace("{personality}", personality.clause())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_includes_base_behavior() {
        let prompt = compose_system_prompt(Personality::default());
        assert!(prompt.contains("25 minutes"));
        assert!(prompt.contains("appendTasks"));
        assert!(prompt.contains("overwriteTasks"));
        assert!(prompt.contains("fetchTasks"));
    }

    #[test]
    fn test_compose_includes_personality_clause() {
        let prompt = compose_system_prompt(Personality::KindAndSupportive);
        assert!(prompt.contains(Personality::KindAndSupportive.clause()));
        assert!(!prompt.contains("{personality}"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let a = compose_system_prompt(Personality::Stern);
        let b = compose_system_prompt(Personality::Stern);
        assert_eq!(a, b);
    }

    #[test]
    fn test_personalities_compose_distinct_prompts() {
        let tough = compose_system_prompt(Personality::ToughLove);
        let kind = compose_system_prompt(Personality::KindAndSupportive);
        assert_ne!(tough, kind);
    }
}
