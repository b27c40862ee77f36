use firebird_common::{Category, CategoryClassifier, ContentItem};

/// Category order of the remote model's score vector.
pub const SCORE_ORDER: [Category; 4] = [
    Category::Wildfire,
    Category::Hurricane,
    Category::Earthquake,
    Category::NonDisaster,
];

/// Arg-max over the score vector attached to each item.
///
/// The first index wins ties and NaN scores are ignored. A short vector
/// competes over the scores it has. Only an empty or all-NaN vector falls
/// back to `NonDisaster`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreClassifier;

impl ScoreClassifier {
    pub fn category_for(scores: &[f64]) -> Category {
        let mut best: Option<(Category, f64)> = None;
        for (category, &score) in SCORE_ORDER.iter().zip(scores) {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((*category, score)),
            }
        }
        best.map_or(Category::NonDisaster, |(category, _)| category)
    }
}

impl CategoryClassifier for ScoreClassifier {
    fn classify(&self, item: &ContentItem) -> Category {
        Self::category_for(&item.classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_highest_score() {
        assert_eq!(ScoreClassifier::category_for(&[0.1, 0.7, 0.1, 0.1]), Category::Hurricane);
        assert_eq!(ScoreClassifier::category_for(&[0.0, 0.0, 0.2, 0.8]), Category::NonDisaster);
        assert_eq!(ScoreClassifier::category_for(&[0.05, 0.0, 0.9, 0.05]), Category::Earthquake);
    }

    #[test]
    fn first_index_wins_ties() {
        assert_eq!(ScoreClassifier::category_for(&[0.5, 0.5, 0.0, 0.0]), Category::Wildfire);
    }

    #[test]
    fn degenerate_vectors_are_non_disaster() {
        assert_eq!(ScoreClassifier::category_for(&[]), Category::NonDisaster);
        assert_eq!(ScoreClassifier::category_for(&[f64::NAN; 4]), Category::NonDisaster);
    }

    #[test]
    fn short_vector_uses_available_scores() {
        assert_eq!(ScoreClassifier::category_for(&[0.2, 0.6]), Category::Hurricane);
    }

    #[test]
    fn nan_entries_are_ignored() {
        assert_eq!(
            ScoreClassifier::category_for(&[f64::NAN, 0.1, 0.3, f64::NAN]),
            Category::Earthquake
        );
    }
}
