use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::vocabulary::VocabularyItem;

/// Cursor over a fixed list of items
#[derive(Debug, Clone, Default)]
pub struct CardDeck {
    items: Vec<VocabularyItem>,
    position: usize,
}

/// Saved position, checked against the deck on restore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckState {
    pub position: usize,
    pub item_id: Option<String>,
}

impl CardDeck {
    pub fn new(items: Vec<VocabularyItem>) -> Self {
        Self { items, position: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[VocabularyItem] {
        &self.items
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current(&self) -> Option<&VocabularyItem> {
        self.items.get(self.position)
    }

    pub fn is_last(&self) -> bool {
        self.position + 1 >= self.items.len()
    }

    /// Move forward; false when already on the last item
    pub fn advance(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.position += 1;
        true
    }

    pub fn back(&mut self) -> bool {
        if self.position == 0 {
            return false;
        }
        self.position -= 1;
        true
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn save(&self) -> Value {
        serde_json::to_value(DeckState {
            position: self.position,
            item_id: self.current().map(|item| item.id.clone()),
        })
        .unwrap_or(Value::Null)
    }

    /// Restore a saved position.
    ///
    /// The saved item id wins over the raw index so a resized deck still
    /// lands on the same card; out-of-range positions clamp to the last card.
    pub fn restore(&mut self, state: &Value) -> Result<()> {
        let saved: DeckState = serde_json::from_value(state.clone())
            .map_err(|e| AppError::InvalidArgument(format!("Invalid deck state: {}", e)))?;

        let by_id = saved
            .item_id
            .as_deref()
            .and_then(|id| self.items.iter().position(|item| item.id == id));
        self.position = by_id.unwrap_or_else(|| saved.position.min(self.items.len().saturating_sub(1)));
        Ok(())
    }
}
