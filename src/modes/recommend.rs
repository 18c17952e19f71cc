use crate::config::config::RecommendationConfig;
use crate::models::mode::Recommendation;
use crate::models::progress::UserProgress;

/// Pick the next mode to study with.
///
/// Struggling items come first, then the introductory mode until enough
/// items have been learned, then the quiz.
pub fn recommend_next(progress: &UserProgress, config: &RecommendationConfig) -> Recommendation {
    if progress.struggling_items > 0 {
        Recommendation {
            mode_id: config.review_mode.clone(),
            reason: format!("{} items need review", progress.struggling_items),
        }
    } else if progress.learned_items < config.intro_threshold {
        Recommendation {
            mode_id: config.intro_mode.clone(),
            reason: format!(
                "only {} of {} starter items learned",
                progress.learned_items, config.intro_threshold
            ),
        }
    } else {
        Recommendation {
            mode_id: config.quiz_mode.clone(),
            reason: format!("{} items learned, ready for a quiz", progress.learned_items),
        }
    }
}
