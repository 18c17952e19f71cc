//! Review mode: works through due items, hardest first.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::mode::{ModeAction, ModeOutcome, ModeUsage};
use crate::models::review::DueFilter;
use crate::modes::builtin::deck::CardDeck;
use crate::modes::unit::{LearningModeUnit, ModeBase, ModeContext};

pub const REVIEW_MODE: &str = "review";

/// Due items loaded when the caller supplies none
pub const DEFAULT_REVIEW_LIMIT: usize = 20;

pub struct ReviewMode {
    base: ModeBase,
    deck: CardDeck,
    revealed: bool,
    reviewed: usize,
}

impl ReviewMode {
    pub fn new(ctx: ModeContext) -> Self {
        let deck = CardDeck::new(ctx.data.words.clone());
        Self {
            base: ModeBase::new(ctx),
            deck,
            revealed: false,
            reviewed: 0,
        }
    }

    fn limit(&self) -> usize {
        self.base
            .ctx
            .options
            .settings
            .get("limit")
            .and_then(Value::as_u64)
            .map(|limit| limit as usize)
            .unwrap_or(DEFAULT_REVIEW_LIMIT)
    }

    fn view(&self) -> Value {
        let item = self.deck.current().map(|item| {
            if self.revealed {
                json!({ "text": item.text, "translation": item.translation })
            } else {
                json!({ "text": item.text })
            }
        });
        json!({
            "item": item,
            "revealed": self.revealed,
            "remaining": self.deck.len() - self.deck.position(),
            "reviewed": self.reviewed,
        })
    }

    async fn advance(&mut self) -> Result<ModeOutcome> {
        if self.deck.advance() {
            self.revealed = false;
            self.base.saw_items(self.deck.position() + 1);
            self.render().await?;
            Ok(ModeOutcome::Continue)
        } else {
            // reviewing never counts as finishing a session
            self.base.end(json!({ "reviewed": self.reviewed }));
            Ok(ModeOutcome::Finished)
        }
    }
}

#[async_trait]
impl LearningModeUnit for ReviewMode {
    fn mode_id(&self) -> &str {
        self.base.mode_id()
    }

    async fn init(&mut self) -> Result<()> {
        if self.deck.is_empty() {
            if let Some(scheduler) = self.base.ctx.scheduler.clone() {
                let due = scheduler.due(DueFilter::All, self.limit()).await;
                tracing::debug!("Review loaded {} due items", due.len());
                self.deck = CardDeck::new(due);
            }
        }
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
                self.revealed = !self.revealed;
                self.render().await?;
                Ok(ModeOutcome::Continue)
            }
            ModeAction::Next => self.advance().await,
            ModeAction::Rate { difficulty } => {
                if let Some(item_id) = self.deck.current().map(|item| item.id.clone()) {
                    self.base.rate(&item_id, difficulty).await?;
                    self.reviewed += 1;
                }
                self.advance().await
            }
            _ => Ok(ModeOutcome::Ignored),
        }
    }

    fn save_state(&self) -> Option<Value> {
        Some(self.deck.save())
    }

    fn restore_state(&mut self, state: &Value) -> Result<()> {
        self.deck.restore(state)
    }

    fn usage(&self) -> ModeUsage {
        self.base.usage
    }
}
