//! Like/dislike calibration over generated sample messages.

use crate::aggregator::{Action, Feedback};
use crate::prompt::{filler_samples, SampleMessage};

/// Feedback needed before the wizard may continue
pub const MIN_FEEDBACK_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningState {
    Loading,
    Presenting(usize),
    Complete,
}

#[derive(Debug, Clone)]
pub struct TuningSession {
    samples: Vec<SampleMessage>,
    state: TuningState,
    recorded: usize,
    padded: bool,
}

impl Default for TuningSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TuningSession {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            state: TuningState::Loading,
            recorded: 0,
            padded: false,
        }
    }

    /// Install generated samples, padding with filler cards up to the minimum
    pub fn load(&mut self, mut samples: Vec<SampleMessage>) {
        if samples.len() < MIN_FEEDBACK_COUNT {
            tracing::warn!(
                generated = samples.len(),
                "not enough samples for tuning, using fallbacks"
            );
            samples.extend(filler_samples(MIN_FEEDBACK_COUNT - samples.len()));
            self.padded = true;
        }
        self.samples = samples;
        self.recorded = 0;
        self.state = TuningState::Presenting(0);
    }

    pub fn state(&self) -> TuningState {
        self.state
    }

    pub fn samples(&self) -> &[SampleMessage] {
        &self.samples
    }

    /// Whether filler cards had to be added
    pub fn was_padded(&self) -> bool {
        self.padded
    }

    pub fn feedback_count(&self) -> usize {
        self.recorded
    }

    pub fn current(&self) -> Option<&SampleMessage> {
        match self.state {
            TuningState::Presenting(i) => self.samples.get(i),
            _ => None,
        }
    }

    /// Record feedback on the current card and advance.
    ///
    /// Returns the action that stores the feedback on the alert, or `None`
    /// when nothing is being presented.
    pub fn record(&mut self, feedback: Feedback) -> Option<Action> {
        let TuningState::Presenting(index) = self.state else {
            return None;
        };
        let text = self.samples.get(index)?.summary_text.clone();

        self.recorded += 1;
        self.state = if self.recorded >= MIN_FEEDBACK_COUNT {
            TuningState::Complete
        } else {
            TuningState::Presenting(index + 1)
        };

        Some(Action::RecordFeedback { feedback, text })
    }

    pub fn can_continue(&self) -> bool {
        self.state == TuningState::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{reduce, Navigation};
    use crate::preferences::Alert;
    use crate::prompt::parse_samples;

    fn samples(n: usize) -> Vec<SampleMessage> {
        let json: Vec<String> = (0..n)
            .map(|i| format!(r#"{{"summaryText":"sample {}"}}"#, i))
            .collect();
        parse_samples(&format!("[{}]", json.join(","))).unwrap()
    }

    #[test]
    fn test_starts_loading() {
        let mut session = TuningSession::new();
        assert_eq!(session.state(), TuningState::Loading);
        assert!(session.current().is_none());
        assert!(session.record(Feedback::Like).is_none());
        assert!(!session.can_continue());
    }

    #[test]
    fn test_three_feedbacks_complete() {
        for pattern in [
            [Feedback::Like, Feedback::Like, Feedback::Like],
            [Feedback::Dislike, Feedback::Like, Feedback::Dislike],
            [Feedback::Dislike, Feedback::Dislike, Feedback::Dislike],
        ] {
            let mut session = TuningSession::new();
            session.load(samples(6));
            let mut alert = Alert::new("new-1", "New Alert 1");
            let nav = Navigation::default();

            for feedback in pattern {
                assert!(!session.can_continue());
                let action = session.record(feedback).unwrap();
                alert = reduce(&alert, &nav, action).0;
            }

            assert_eq!(session.state(), TuningState::Complete);
            assert!(session.can_continue());
            assert_eq!(alert.tuning_feedback.count(), 3);
            assert!(session.record(Feedback::Like).is_none());
        }
    }

    #[test]
    fn test_feedback_text_follows_card_order() {
        let mut session = TuningSession::new();
        session.load(samples(4));
        assert_eq!(session.current().unwrap().summary_text, "sample 0");
        let action = session.record(Feedback::Dislike).unwrap();
        assert_eq!(
            action,
            Action::RecordFeedback {
                feedback: Feedback::Dislike,
                text: "sample 0".into()
            }
        );
        assert_eq!(session.state(), TuningState::Presenting(1));
        assert_eq!(session.current().unwrap().summary_text, "sample 1");
    }

    #[test]
    fn test_short_batches_are_padded() {
        let mut session = TuningSession::new();
        session.load(samples(1));
        assert!(session.was_padded());
        assert_eq!(session.samples().len(), MIN_FEEDBACK_COUNT);
        assert!(session.samples()[2].summary_text.contains("#2"));

        for _ in 0..MIN_FEEDBACK_COUNT {
            session.record(Feedback::Like).unwrap();
        }
        assert!(session.can_continue());
    }
}
