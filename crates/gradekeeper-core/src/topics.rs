//! Topic accumulation.
//!
//! Each bound test costs its points on failure. A factory's sub-case
//! failures add up but are capped at the factory's `max_points`. The topic
//! score is its maximum minus the costs, floored at zero.

use serde::{Deserialize, Serialize};

use crate::model::TestKind;
use crate::resolve::{GradedTest, ResolvedTopic};
use crate::results::{Outcome, TestIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    /// The test never reported an outcome.
    Missing,
}

/// What one bound test cost its topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDeduction {
    pub test: String,
    pub kind: TestKind,
    pub status: TestStatus,
    pub deducted: f64,
    /// Factory sub-cases that passed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_passed: Option<u32>,
    /// Factory sub-cases that ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_checked: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicReport {
    pub name: String,
    pub max_points: f64,
    pub earned: f64,
    /// Sum of test deductions before the floor is applied.
    pub deducted: f64,
    pub passing: bool,
    pub tests: Vec<TestDeduction>,
}

impl TopicReport {
    /// Tests that cost something or did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &TestDeduction> {
        self.tests.iter().filter(|t| t.status != TestStatus::Passed)
    }
}

/// Score one topic against the recorded outcomes.
pub fn accumulate_topic(topic: &ResolvedTopic, index: &TestIndex) -> TopicReport {
    let tests: Vec<TestDeduction> = topic
        .tests
        .iter()
        .map(|test| deduction(test, index.get(&test.test).unwrap_or_default()))
        .collect();

    let deducted: f64 = tests.iter().map(|t| t.deducted).sum();
    let earned = (topic.max_points - deducted).clamp(0.0, topic.max_points);

    TopicReport {
        name: topic.name.clone(),
        max_points: topic.max_points,
        earned,
        deducted,
        passing: deducted == 0.0,
        tests,
    }
}

fn deduction(test: &GradedTest, outcomes: &[Outcome]) -> TestDeduction {
    let failing = outcomes.iter().filter(|o| **o == Outcome::Failed).count();
    let status = if outcomes.is_empty() {
        TestStatus::Missing
    } else if failing > 0 {
        TestStatus::Failed
    } else {
        TestStatus::Passed
    };

    match test.kind {
        TestKind::Test => TestDeduction {
            test: test.test.clone(),
            kind: TestKind::Test,
            status,
            deducted: if status == TestStatus::Passed {
                0.0
            } else {
                test.points
            },
            num_passed: None,
            num_checked: None,
        },
        TestKind::Factory => {
            let cap = test.max_points.unwrap_or(0.0);
            let deducted = match status {
                TestStatus::Missing => cap,
                _ => (failing as f64 * test.points).min(cap),
            };
            TestDeduction {
                test: test.test.clone(),
                kind: TestKind::Factory,
                status,
                deducted,
                num_passed: Some((outcomes.len() - failing) as u32),
                num_checked: Some(outcomes.len() as u32),
            }
        }
    }
}
