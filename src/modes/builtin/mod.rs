//! Built-in learning modes

pub mod deck;
pub mod flashcard;
pub mod quiz;
pub mod review;

pub use deck::CardDeck;
pub use flashcard::{FLASHCARD_MODE, FlashcardMode};
pub use quiz::{QUIZ_MODE, QuizMode};
pub use review::{REVIEW_MODE, ReviewMode};

use crate::models::mode::ModeDescriptor;
use crate::modes::manager::CAPABILITY_SPACED_REPETITION;
use crate::modes::registry::ModeRegistry;

/// Register flashcard, quiz and review
pub fn register_builtin_modes(registry: &ModeRegistry) {
    registry.register_fn(ModeDescriptor::new(FLASHCARD_MODE, "Flashcards"), |ctx| {
        Ok(Box::new(FlashcardMode::new(ctx)))
    });
    registry.register_fn(ModeDescriptor::new(QUIZ_MODE, "Quiz"), |ctx| {
        Ok(Box::new(QuizMode::new(ctx)))
    });
    registry.register_fn(
        ModeDescriptor::new(REVIEW_MODE, "Review").with_dependency(CAPABILITY_SPACED_REPETITION),
        |ctx| Ok(Box::new(ReviewMode::new(ctx))),
    );
}
