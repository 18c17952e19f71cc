//! Flashcard mode: one card at a time, flip to reveal, rate to reschedule.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::mode::{ModeAction, ModeOutcome, ModeUsage};
use crate::models::review::Difficulty;
use crate::modes::builtin::deck::CardDeck;
use crate::modes::unit::{LearningModeUnit, ModeBase, ModeContext};

pub const FLASHCARD_MODE: &str = "flashcard";

pub struct FlashcardMode {
    base: ModeBase,
    deck: CardDeck,
    flipped: bool,
}

impl FlashcardMode {
    pub fn new(ctx: ModeContext) -> Self {
        let deck = CardDeck::new(ctx.data.words.clone());
        Self {
            base: ModeBase::new(ctx),
            deck,
            flipped: false,
        }
    }

    fn view(&self) -> Value {
        let card = self.deck.current().map(|item| {
            if self.flipped {
                json!({
                    "text": item.text,
                    "translation": item.translation,
                    "pronunciation": item.pronunciation,
                })
            } else {
                json!({ "text": item.text })
            }
        });
        json!({
            "card": card,
            "flipped": self.flipped,
            "position": self.deck.position() + 1,
            "total": self.deck.len(),
            "session": self.base.data().session,
        })
    }

    async fn next_card(&mut self) -> Result<ModeOutcome> {
        if self.deck.advance() {
            self.flipped = false;
            self.base.saw_items(self.deck.position() + 1);
            self.render().await?;
            Ok(ModeOutcome::Continue)
        } else {
            let state = json!({ "reviewed": self.deck.len() });
            self.base.finish(state, &self.deck.item_ids()).await?;
            Ok(ModeOutcome::Finished)
        }
    }

    async fn rate_current(&mut self, difficulty: Difficulty) -> Result<ModeOutcome> {
        if let Some(item_id) = self.deck.current().map(|item| item.id.clone()) {
            self.base.rate(&item_id, difficulty).await?;
        }
        self.next_card().await
    }
}

#[async_trait]
impl LearningModeUnit for FlashcardMode {
    fn mode_id(&self) -> &str {
        self.base.mode_id()
    }

    async fn init(&mut self) -> Result<()> {
        self.base.require(&[("words", !self.deck.is_empty())])?;
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
            ModeAction::Flip => {
                self.flipped = !self.flipped;
                self.render().await?;
                Ok(ModeOutcome::Continue)
            }
            ModeAction::Next => self.next_card().await,
            ModeAction::Previous => {
                if self.deck.back() {
                    self.flipped = false;
                    self.render().await?;
                }
                Ok(ModeOutcome::Continue)
            }
            ModeAction::Rate { difficulty } => self.rate_current(difficulty).await,
            ModeAction::Answer { .. } => Ok(ModeOutcome::Ignored),
        }
    }

    fn save_state(&self) -> Option<Value> {
        Some(self.deck.save())
    }

    fn restore_state(&mut self, state: &Value) -> Result<()> {
        self.deck.restore(state)?;
        self.base.saw_items(self.deck.position() + 1);
        Ok(())
    }

    fn usage(&self) -> ModeUsage {
        self.base.usage
    }
}
