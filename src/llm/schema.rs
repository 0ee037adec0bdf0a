use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::generated::GeneratedItem;
use crate::util::lenient;

pub const HOURS_PER_POINT: f64 = 6.0;
pub const TESTING_TITLE: &str = "Testing";
pub const TESTING_HOURS: f64 = 1.0;

const EPSILON: f64 = 1e-6;

#[derive(Debug, Deserialize)]
pub(crate) struct TaskList {
    pub tasks: Vec<GeneratedItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoryList {
    pub stories: Vec<GeneratedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReview {
    #[serde(deserialize_with = "lenient::string_list")]
    pub suggestions: Vec<String>,
    #[serde(
        default,
        alias = "External Dependencies",
        alias = "external_dependencies",
        deserialize_with = "lenient::string_list"
    )]
    pub external_dependencies: Vec<String>,
    #[serde(
        default,
        alias = "Missing Steps",
        alias = "missing_steps",
        deserialize_with = "lenient::string_list"
    )]
    pub missing_steps: Vec<String>,
    #[serde(
        default,
        alias = "Iteration Analysis",
        alias = "iteration_analysis",
        deserialize_with = "lenient::text"
    )]
    pub iteration_analysis: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDetails {
    #[serde(alias = "Description", deserialize_with = "lenient::html")]
    pub description: String,
    #[serde(
        default,
        alias = "External Dependencies",
        alias = "external_dependencies",
        deserialize_with = "lenient::html"
    )]
    pub external_dependencies: String,
    #[serde(
        default,
        alias = "Non Functional Requirements",
        alias = "non_functional_requirements",
        deserialize_with = "lenient::html"
    )]
    pub non_functional_requirements: String,
    #[serde(
        default,
        alias = "Acceptance Criteria",
        alias = "acceptance_criteria",
        deserialize_with = "lenient::html"
    )]
    pub acceptance_criteria: String,
}

/// Generated tasks plus every way they break the hour rules.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskProposal {
    pub tasks: Vec<GeneratedItem>,
    pub violations: Vec<PlanViolation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanViolation {
    HourBudget { expected: f64, actual: f64 },
    MissingTestingTask,
    DuplicateTestingTask(usize),
    TestingEstimate(f64),
    TestingNotLast,
}

impl fmt::Display for PlanViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanViolation::HourBudget { expected, actual } => write!(
                f,
                "estimates sum to {actual}h, story points require {expected}h"
            ),
            PlanViolation::MissingTestingTask => {
                write!(f, "no \"{TESTING_TITLE}\" task of {TESTING_HOURS}h")
            }
            PlanViolation::DuplicateTestingTask(n) => {
                write!(f, "{n} \"{TESTING_TITLE}\" tasks, expected exactly one")
            }
            PlanViolation::TestingEstimate(h) => write!(
                f,
                "\"{TESTING_TITLE}\" task is {h}h, expected {TESTING_HOURS}h"
            ),
            PlanViolation::TestingNotLast => {
                write!(f, "\"{TESTING_TITLE}\" must be the last task")
            }
        }
    }
}

pub fn is_testing_task(item: &GeneratedItem) -> bool {
    item.title.trim() == TESTING_TITLE
}

/// Tasks must add up to `story_points * 6` hours and end with exactly one
/// one-hour "Testing" task. A story without points has no hour budget to check.
/// Non-finite estimates never satisfy a rule.
pub fn check_task_plan(story_points: f64, tasks: &[GeneratedItem]) -> Vec<PlanViolation> {
    let mut violations = Vec::new();

    if story_points > 0.0 {
        let expected = story_points * HOURS_PER_POINT;
        let actual: f64 = tasks.iter().map(GeneratedItem::estimate).sum();
        if !same_hours(expected, actual) {
            violations.push(PlanViolation::HourBudget { expected, actual });
        }
    }

    let testing: Vec<&GeneratedItem> = tasks.iter().filter(|t| is_testing_task(t)).collect();
    match testing.as_slice() {
        [] => violations.push(PlanViolation::MissingTestingTask),
        [only] => {
            if !same_hours(TESTING_HOURS, only.estimate()) {
                violations.push(PlanViolation::TestingEstimate(only.estimate()));
            }
            if !tasks.last().is_some_and(is_testing_task) {
                violations.push(PlanViolation::TestingNotLast);
            }
        }
        many => violations.push(PlanViolation::DuplicateTestingTask(many.len())),
    }

    violations
}

fn same_hours(expected: f64, actual: f64) -> bool {
    actual.is_finite() && (expected - actual).abs() <= EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::extract::parse_shape;
    use serde_json::json;

    fn task(title: &str, hours: f64) -> GeneratedItem {
        GeneratedItem {
            original_estimate: Some(hours),
            ..GeneratedItem::new(title)
        }
    }

    #[test]
    fn valid_plan_has_no_violations() {
        let tasks = vec![task("Build", 7.0), task("Deploy", 4.0), task("Testing", 1.0)];
        assert!(check_task_plan(2.0, &tasks).is_empty());
    }

    #[test]
    fn wrong_total_is_flagged() {
        let tasks = vec![task("Build", 3.0), task("Testing", 1.0)];
        assert_eq!(
            check_task_plan(1.0, &tasks),
            vec![PlanViolation::HourBudget {
                expected: 6.0,
                actual: 4.0
            }]
        );
    }

    #[test]
    fn testing_task_rules() {
        let missing = vec![task("Build", 6.0)];
        assert_eq!(
            check_task_plan(1.0, &missing),
            vec![PlanViolation::MissingTestingTask]
        );

        let long = vec![task("Build", 4.0), task("Testing", 2.0)];
        assert_eq!(
            check_task_plan(1.0, &long),
            vec![PlanViolation::TestingEstimate(2.0)]
        );

        let twice = vec![task("Build", 4.0), task("Testing", 1.0), task("Testing", 1.0)];
        assert_eq!(
            check_task_plan(1.0, &twice),
            vec![PlanViolation::DuplicateTestingTask(2)]
        );
    }

    #[test]
    fn testing_title_is_exact_and_last() {
        let lowercase = vec![task("Build", 5.0), task("testing", 1.0)];
        assert_eq!(
            check_task_plan(1.0, &lowercase),
            vec![PlanViolation::MissingTestingTask]
        );

        let first = vec![task("Testing", 1.0), task("Build", 5.0)];
        assert_eq!(
            check_task_plan(1.0, &first),
            vec![PlanViolation::TestingNotLast]
        );
    }

    #[test]
    fn non_finite_estimates_break_the_budget() {
        for bad in [f64::NAN, f64::INFINITY] {
            let tasks = vec![task("Build", bad), task("Testing", 1.0)];
            let violations = check_task_plan(2.0, &tasks);
            assert_eq!(violations.len(), 1);
            assert!(matches!(violations[0], PlanViolation::HourBudget { .. }));
        }

        let violations = check_task_plan(0.0, &[task("Testing", f64::NAN)]);
        assert!(matches!(violations[..], [PlanViolation::TestingEstimate(_)]));
    }

    #[test]
    fn unpointed_story_skips_budget_only() {
        let tasks = vec![task("Build", 13.0), task("Testing", 1.0)];
        assert!(check_task_plan(0.0, &tasks).is_empty());
        assert_eq!(
            check_task_plan(0.0, &[task("Build", 1.0)]),
            vec![PlanViolation::MissingTestingTask]
        );
    }

    #[test]
    fn missing_estimates_count_as_zero() {
        let tasks = vec![GeneratedItem::new("Build"), task("Testing", 1.0)];
        assert_eq!(
            check_task_plan(1.0, &tasks),
            vec![PlanViolation::HourBudget {
                expected: 6.0,
                actual: 1.0
            }]
        );
    }

    #[test]
    fn review_accepts_loose_shapes() {
        let review: PlanReview = parse_shape(
            json!({
                "suggestions": "Move auth stories first",
                "External Dependencies": ["Vendor SSO"],
                "iterationAnalysis": ["Sprint 1 overloaded", "Sprint 2 light"]
            }),
            "plan review",
        )
        .unwrap();
        assert_eq!(review.suggestions, vec!["Move auth stories first"]);
        assert_eq!(review.external_dependencies, vec!["Vendor SSO"]);
        assert!(review.missing_steps.is_empty());
        assert_eq!(review.iteration_analysis, "Sprint 1 overloaded\nSprint 2 light");
    }

    #[test]
    fn review_without_suggestions_is_wrong_shape() {
        let result = parse_shape::<PlanReview>(json!({ "notes": [] }), "plan review");
        assert!(result.is_err());
    }

    #[test]
    fn feature_details_turn_lists_into_html() {
        let details: FeatureDetails = parse_shape(
            json!({
                "description": "<p>Export reports</p>",
                "nonFunctionalRequirements": ["p95 < 2s", "audit logged"],
                "acceptanceCriteria": "<ul><li>CSV works</li></ul>"
            }),
            "feature details",
        )
        .unwrap();
        assert_eq!(
            details.non_functional_requirements,
            "<ul><li>p95 < 2s</li><li>audit logged</li></ul>"
        );
        assert_eq!(details.external_dependencies, "");
    }

    #[test]
    fn violations_read_as_sentences() {
        let msg = PlanViolation::HourBudget {
            expected: 12.0,
            actual: 10.0,
        }
        .to_string();
        assert_eq!(msg, "estimates sum to 10h, story points require 12h");
    }
}
