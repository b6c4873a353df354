//! Sample generation wired into tuning and AI follow-up questions, using a
//! scripted generator in place of a real model.

use std::cell::RefCell;

use naarad::aggregator::{reduce, Action, Feedback, Navigation};
use naarad::error::{NaaradError, Result};
use naarad::llm::{self, TextGenerator};
use naarad::payload::to_api_payload;
use naarad::preferences::Alert;
use naarad::prompt;
use naarad::taxonomy::{CategoryId, CategoryKey};
use naarad::tuning::{TuningSession, TuningState};

struct Scripted {
    replies: RefCell<Vec<Result<String>>>,
    prompts: RefCell<Vec<String>>,
}

impl Scripted {
    fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: RefCell::new(replies),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl TextGenerator for Scripted {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.replies.borrow_mut().remove(0)
    }
}

fn apply(alert: Alert, actions: Vec<Action>) -> Alert {
    let nav = Navigation::default();
    actions
        .into_iter()
        .fold(alert, |a, action| reduce(&a, &nav, action).0)
}

fn youtube_alert() -> Alert {
    let mut nav = Navigation::default();
    let alert = Alert::new("new-1", "Weekend watching");
    let (alert, next) = reduce(&alert, &nav, Action::SelectMainCategory(CategoryId::YouTube));
    nav = next;
    let (alert, _) = reduce(
        &alert,
        &nav,
        Action::ToggleFollowUpTag {
            category: CategoryKey::YouTube,
            question_id: "yt_duration".into(),
            label: "5-15 minutes".into(),
        },
    );
    alert
}

#[test]
fn test_prompts_describe_answered_questions() {
    let generator = Scripted::new(vec![Ok(
        r#"{"summaryText":"MKBHD just reviewed the new Pixel","imageSuggestion":"📱","actionText":"Watch"}"#.into(),
    )]);
    let sample = llm::generate_sample_message(Some(&generator), &youtube_alert());

    assert_eq!(sample.summary_text, "MKBHD just reviewed the new Pixel");
    assert_eq!(sample.image_url.as_deref(), Some("📱"));

    let prompts = generator.prompts.borrow();
    assert!(prompts[0].contains("- Alert Name: Weekend watching"));
    assert!(prompts[0].contains("- Q: What is your preferred video length?"));
    assert!(prompts[0].contains("- A: 5-15 minutes"));
}

#[test]
fn test_generated_batch_drives_tuning() {
    let generator = Scripted::new(vec![Ok(r#"Here you go:
```json
[{"summaryText":"one"},{"summaryText":"two"},{"summaryText":"three"},{"summaryText":"four"}]
```"#
        .into())]);
    let samples = llm::generate_tuning_samples(Some(&generator), &youtube_alert());
    assert_eq!(samples.len(), 4);

    let mut session = TuningSession::new();
    assert_eq!(session.state(), TuningState::Loading);
    session.load(samples);
    assert!(!session.was_padded());

    let mut alert = youtube_alert();
    for feedback in [Feedback::Dislike, Feedback::Like, Feedback::Dislike] {
        let action = session.record(feedback).unwrap();
        alert = apply(alert, vec![action]);
    }

    assert_eq!(session.state(), TuningState::Complete);
    assert_eq!(alert.tuning_feedback.liked, vec!["two"]);
    assert_eq!(alert.tuning_feedback.disliked, vec!["one", "three"]);
}

#[test]
fn test_generator_failure_still_allows_tuning() {
    let generator = Scripted::new(vec![Err(NaaradError::LlmError("model overloaded".into()))]);
    let samples = llm::generate_tuning_samples(Some(&generator), &youtube_alert());

    let mut session = TuningSession::new();
    session.load(samples);
    assert_eq!(session.samples().len(), 3);
    assert!(session.current().unwrap().summary_text.contains("model overloaded"));

    for _ in 0..3 {
        session.record(Feedback::Like);
    }
    assert!(session.can_continue());
}

#[test]
fn test_missing_generator_falls_back() {
    let alert = youtube_alert();
    let sample = llm::generate_sample_message(None, &alert);
    assert_eq!(sample.summary_text, prompt::DISABLED_TEXT);

    let mut session = TuningSession::new();
    session.load(llm::generate_tuning_samples(None, &alert));
    assert!(session.was_padded());
    assert_eq!(session.samples().len(), 3);
}

#[test]
fn test_ai_questions_reach_custom_question() {
    let generator = Scripted::new(vec![Ok(
        r#"["Any favourite creators?", "Shorts or long videos?", "Tutorials?", "Too many"]"#.into(),
    )]);
    let alert = youtube_alert();
    let questions = llm::generate_follow_up_questions(&generator, &alert, CategoryKey::YouTube).unwrap();
    assert_eq!(questions.len(), prompt::MAX_AI_QUESTIONS);
    assert_eq!(questions[0].id, "youtube-ai-1");

    let alert = apply(
        alert,
        vec![
            Action::SetAiFollowUpQuestions {
                category: CategoryKey::YouTube,
                questions,
            },
            Action::AnswerAiFollowUpQuestion {
                category: CategoryKey::YouTube,
                id: "youtube-ai-1".into(),
                answer: "Marques Brownlee".into(),
            },
            Action::AddInstructionTag {
                category: CategoryKey::YouTube,
                label: "Only new uploads".into(),
            },
        ],
    );
    assert!(alert.category(CategoryKey::YouTube).ai_questions_attempted);

    let payload = to_api_payload(&alert);
    assert_eq!(
        payload.custom_question,
        "Only new uploads | Any favourite creators?: Marques Brownlee"
    );
    assert_eq!(payload.followup_questions, vec!["5-15 minutes"]);
}

#[test]
fn test_bad_question_reply_is_an_error() {
    let generator = Scripted::new(vec![Ok("I cannot help with that".into())]);
    let result = llm::generate_follow_up_questions(&generator, &youtube_alert(), CategoryKey::YouTube);
    assert!(result.is_err());
}
