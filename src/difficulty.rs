//! Question difficulty estimation
//!
//! Classifies a question interval from the focus ratio of its most recent
//! samples: sustained focus reads as an easy question, frequent look-aways as
//! a hard one.

use crate::config::DifficultyConfig;
use crate::types::{Difficulty, DifficultyInsights, QuestionFocus};
use std::collections::BTreeMap;

/// Maps recent focus samples to a difficulty label
#[derive(Debug, Clone, Default)]
pub struct DifficultyEstimator {
    config: DifficultyConfig,
}

impl DifficultyEstimator {
    pub fn new(config: DifficultyConfig) -> Self {
        Self { config }
    }

    /// Estimate difficulty from per-frame focus samples (oldest first)
    pub fn estimate(&self, samples: &[bool]) -> Difficulty {
        match self.recent_focus_percentage(samples) {
            Some(pct) => self.label(pct),
            None => Difficulty::default(),
        }
    }

    /// Focus percentage over the most recent window, or `None` with too few samples
    pub fn recent_focus_percentage(&self, samples: &[bool]) -> Option<f64> {
        if samples.len() < self.config.min_samples.max(1) {
            return None;
        }
        let window = self.config.recent_window.max(1).min(samples.len());
        let recent = &samples[samples.len() - window..];
        let focused = recent.iter().filter(|&&s| s).count();
        Some(focused as f64 * 100.0 / recent.len() as f64)
    }

    /// Map a focus percentage through the easy/normal thresholds
    pub fn label(&self, focus_pct: f64) -> Difficulty {
        if focus_pct >= self.config.easy_threshold {
            Difficulty::Easy
        } else if focus_pct >= self.config.normal_threshold {
            Difficulty::Normal
        } else {
            Difficulty::Hard
        }
    }
}

/// Group recorded questions by difficulty with mean focus per label
pub fn insights<'a, I>(questions: I) -> DifficultyInsights
where
    I: IntoIterator<Item = &'a QuestionFocus>,
{
    let mut result = DifficultyInsights::default();
    let mut focus_totals: BTreeMap<Difficulty, (f64, u32)> = BTreeMap::new();

    for question in questions {
        let bucket = match question.difficulty {
            Difficulty::Easy => &mut result.easy_questions,
            Difficulty::Normal => &mut result.normal_questions,
            Difficulty::Hard => &mut result.hard_questions,
        };
        bucket.push(question.question_id.clone());

        let entry = focus_totals.entry(question.difficulty).or_insert((0.0, 0));
        entry.0 += question.focus_score;
        entry.1 += 1;
    }

    result.average_focus_by_difficulty = focus_totals
        .into_iter()
        .map(|(difficulty, (sum, count))| (difficulty, sum / count as f64))
        .collect();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn question(id: &str, focus_score: f64, difficulty: Difficulty) -> QuestionFocus {
        QuestionFocus {
            question_id: id.to_string(),
            focus_score,
            duration_ms: 10_000,
            look_away_count: 0,
            difficulty,
            sample_count: 100,
            started_at_ms: 0,
            ended_at_ms: 10_000,
            metadata: None,
        }
    }

    #[test]
    fn test_too_few_samples_is_normal() {
        let estimator = DifficultyEstimator::default();
        assert_eq!(estimator.estimate(&[]), Difficulty::Normal);
        assert_eq!(estimator.estimate(&[false; 4]), Difficulty::Normal);
        assert_eq!(estimator.recent_focus_percentage(&[true; 4]), None);
    }

    #[test]
    fn test_labels() {
        let estimator = DifficultyEstimator::default();
        assert_eq!(estimator.estimate(&[true; 20]), Difficulty::Easy);
        assert_eq!(estimator.estimate(&[false; 20]), Difficulty::Hard);

        // 7 of the last 10
        let mut samples = vec![true; 7];
        samples.extend([false; 3]);
        assert_eq!(estimator.estimate(&samples), Difficulty::Normal);
    }

    #[test]
    fn test_threshold_edges_are_inclusive() {
        let estimator = DifficultyEstimator::default();
        assert_eq!(estimator.label(80.0), Difficulty::Easy);
        assert_eq!(estimator.label(79.9), Difficulty::Normal);
        assert_eq!(estimator.label(60.0), Difficulty::Normal);
        assert_eq!(estimator.label(59.9), Difficulty::Hard);
    }

    #[test]
    fn test_only_recent_window_counts() {
        let estimator = DifficultyEstimator::default();

        // Long unfocused start, focused for the last 10 samples
        let mut samples = vec![false; 50];
        samples.extend([true; 10]);
        assert_eq!(estimator.recent_focus_percentage(&samples), Some(100.0));
        assert_eq!(estimator.estimate(&samples), Difficulty::Easy);
    }

    #[test]
    fn test_window_shorter_than_configured() {
        let estimator = DifficultyEstimator::default();
        let samples = [true, true, true, false, false, false];
        assert_eq!(estimator.recent_focus_percentage(&samples), Some(50.0));
        assert_eq!(estimator.estimate(&samples), Difficulty::Hard);
    }

    #[test]
    fn test_insights_grouping() {
        let questions = vec![
            question("q1", 95.0, Difficulty::Easy),
            question("q2", 70.0, Difficulty::Normal),
            question("q3", 85.0, Difficulty::Easy),
            question("q4", 30.0, Difficulty::Hard),
        ];

        let insights = insights(&questions);
        assert_eq!(insights.easy_questions, vec!["q1", "q3"]);
        assert_eq!(insights.normal_questions, vec!["q2"]);
        assert_eq!(insights.hard_questions, vec!["q4"]);
        assert_eq!(
            insights.average_focus_by_difficulty.get(&Difficulty::Easy),
            Some(&90.0)
        );
        assert_eq!(
            insights.average_focus_by_difficulty.get(&Difficulty::Hard),
            Some(&30.0)
        );
    }

    #[test]
    fn test_insights_empty() {
        let insights = insights(std::iter::empty());
        assert_eq!(insights, DifficultyInsights::default());
    }
}
