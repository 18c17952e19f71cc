//! Quiz mode
//!
//! Multiple choice over translations. Options are picked from neighbouring
//! items so the same deck always produces the same questions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::mode::{ModeAction, ModeOutcome, ModeUsage};
use crate::models::review::Difficulty;
use crate::modes::builtin::deck::CardDeck;
use crate::modes::unit::{LearningModeUnit, ModeBase, ModeContext};

pub const QUIZ_MODE: &str = "quiz";

/// Upper bound on options per question
pub const MAX_CHOICES: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct QuizState {
    deck: Value,
    score: usize,
    answered: usize,
}

/// One question: the options and which of them is right
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct: usize,
}

pub struct QuizMode {
    base: ModeBase,
    deck: CardDeck,
    score: usize,
    answered: usize,
}

impl QuizMode {
    pub fn new(ctx: ModeContext) -> Self {
        let deck = CardDeck::new(ctx.data.words.clone());
        Self {
            base: ModeBase::new(ctx),
            deck,
            score: 0,
            answered: 0,
        }
    }

    pub fn score(&self) -> usize {
        self.score
    }

    /// Question for the current position
    pub fn question(&self) -> Option<Question> {
        let items = self.deck.items();
        let index = self.deck.position();
        let target = items.get(index)?;

        let option_count = items.len().min(MAX_CHOICES);
        let mut choices: Vec<String> = (1..option_count)
            .map(|offset| items[(index + offset) % items.len()].translation.clone())
            .collect();
        let correct = index % option_count;
        choices.insert(correct, target.translation.clone());

        Some(Question {
            prompt: target.text.clone(),
            choices,
            correct,
        })
    }

    fn view(&self) -> Value {
        let question = self.question().map(|q| {
            json!({
                "prompt": q.prompt,
                "choices": q.choices,
            })
        });
        json!({
            "question": question,
            "position": self.deck.position() + 1,
            "total": self.deck.len(),
            "score": self.score,
        })
    }

    async fn advance(&mut self) -> Result<bool> {
        if self.deck.advance() {
            self.base.saw_items(self.deck.position() + 1);
            self.render().await?;
            return Ok(true);
        }
        let state = json!({
            "score": self.score,
            "answered": self.answered,
            "total": self.deck.len(),
        });
        self.base.finish(state, &self.deck.item_ids()).await?;
        Ok(false)
    }

    async fn answer(&mut self, choice: usize) -> Result<ModeOutcome> {
        let question = self
            .question()
            .ok_or_else(|| AppError::Internal("quiz has no current question".to_string()))?;
        if choice >= question.choices.len() {
            return Err(AppError::InvalidArgument(format!(
                "Choice {} out of range (0..{})",
                choice,
                question.choices.len()
            )));
        }

        let correct = choice == question.correct;
        let difficulty = if correct {
            Difficulty::Easy
        } else {
            Difficulty::Hard
        };
        if let Some(item_id) = self.deck.current().map(|item| item.id.clone()) {
            self.base.rate(&item_id, difficulty).await?;
        }
        self.answered += 1;
        if correct {
            self.score += 1;
        }

        self.advance().await?;
        Ok(ModeOutcome::Answered { correct })
    }
}

#[async_trait]
impl LearningModeUnit for QuizMode {
    fn mode_id(&self) -> &str {
        self.base.mode_id()
    }

    async fn init(&mut self) -> Result<()> {
        // a single word leaves nothing to choose between
        self.base.require(&[("words", self.deck.len() >= 2)])?;
        self.base.mark_initialized();
        self.base.saw_items(1);
        Ok(())
    }

    async fn render(&mut self) -> Result<()> {
        self.base.present(self.view());
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<()> {
        self.base.cleanup();
        Ok(())
    }

    async fn handle(&mut self, action: ModeAction) -> Result<ModeOutcome> {
        if !self.base.active {
            return Ok(ModeOutcome::Finished);
        }
        self.base.record_interaction();

        match action {
            ModeAction::Answer { choice } => self.answer(choice).await,
            ModeAction::Next => {
                if self.advance().await? {
                    Ok(ModeOutcome::Continue)
                } else {
                    Ok(ModeOutcome::Finished)
                }
            }
            _ => Ok(ModeOutcome::Ignored),
        }
    }

    fn save_state(&self) -> Option<Value> {
        serde_json::to_value(QuizState {
            deck: self.deck.save(),
            score: self.score,
            answered: self.answered,
        })
        .ok()
    }

    fn restore_state(&mut self, state: &Value) -> Result<()> {
        let saved: QuizState = serde_json::from_value(state.clone())
            .map_err(|e| AppError::InvalidArgument(format!("Invalid quiz state: {}", e)))?;
        self.deck.restore(&saved.deck)?;
        self.score = saved.score;
        self.answered = saved.answered;
        Ok(())
    }

    fn usage(&self) -> ModeUsage {
        self.base.usage
    }
}
