use serde::{Deserialize, Serialize};

/// Weight split for one compatibility-score call site, in points out of 100.
///
/// Two stock splits exist: the swipe-recommendation feed weighs hobbies and
/// location only, the general matcher adds age proximity and peer rating.
/// Both are configuration, not constants baked into the algorithm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub hobbies: f64,
    pub location: f64,
    pub age: f64,
    pub rating: f64,
}

impl ScoreWeights {
    /// 70/30 hobbies/location split used by the swipe recommendation feed.
    pub fn swipe() -> Self {
        Self {
            hobbies: 70.0,
            location: 30.0,
            age: 0.0,
            rating: 0.0,
        }
    }

    /// 40/30/20/10 split used by the general compatibility matcher.
    pub fn general() -> Self {
        Self {
            hobbies: 40.0,
            location: 30.0,
            age: 20.0,
            rating: 10.0,
        }
    }
}

/// The profile slice the scorer reads. Callers assemble it from the
/// affinity tables; missing data contributes zero for its factor.
#[derive(Debug, Clone, Default)]
pub struct ScoreProfile {
    pub hobby_ids: Vec<i32>,
    pub location_ids: Vec<i32>,
    pub age: Option<i32>,
    /// Mean of received peer ratings on a 1-5 scale.
    pub rating_avg: Option<f64>,
}

/// Compatibility between two profiles, bounded to [0, 100].
///
/// Hobby and location factors are shared-set overlap scaled by their weight;
/// age proximity decays linearly over a ten-year difference; the peer-rating
/// factor is the candidate's mean rating normalized to [0, 1].
pub fn compatibility_score(a: &ScoreProfile, b: &ScoreProfile, weights: &ScoreWeights) -> f64 {
    let score = overlap_ratio(&a.hobby_ids, &b.hobby_ids) * weights.hobbies
        + overlap_ratio(&a.location_ids, &b.location_ids) * weights.location
        + age_proximity(a.age, b.age) * weights.age
        + rating_factor(b.rating_avg) * weights.rating;

    score.clamp(0.0, 100.0)
}

/// `|shared| / max(|a|, |b|)`; zero when either set is empty.
fn overlap_ratio(a: &[i32], b: &[i32]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.iter().filter(|id| b.contains(id)).count();
    let max_len = a.len().max(b.len());
    shared as f64 / max_len as f64
}

/// `max(0, (10 - |ageA - ageB|) / 10)`; zero when either age is unknown.
fn age_proximity(a: Option<i32>, b: Option<i32>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => {
            let diff = (a - b).abs() as f64;
            ((10.0 - diff) / 10.0).max(0.0)
        }
        _ => 0.0,
    }
}

/// Mean received rating normalized to [0, 1]; zero when unrated.
fn rating_factor(rating_avg: Option<f64>) -> f64 {
    match rating_avg {
        Some(avg) => (avg.clamp(0.0, 5.0)) / 5.0,
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(hobbies: &[i32], locations: &[i32], age: Option<i32>, rating: Option<f64>) -> ScoreProfile {
        ScoreProfile {
            hobby_ids: hobbies.to_vec(),
            location_ids: locations.to_vec(),
            age,
            rating_avg: rating,
        }
    }

    #[test]
    fn identical_profiles_hit_the_hobby_and_location_bands() {
        let a = profile(&[1, 2, 3], &[10], Some(30), None);
        let score = compatibility_score(&a, &a, &ScoreWeights::swipe());
        // Full hobby overlap (70) + full location overlap (30)
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_profiles_score_zero() {
        let a = profile(&[1, 2], &[10], None, None);
        let b = profile(&[3, 4], &[20], None, None);
        assert_eq!(compatibility_score(&a, &b, &ScoreWeights::swipe()), 0.0);
    }

    #[test]
    fn overlap_uses_larger_set_as_denominator() {
        let a = profile(&[1, 2, 3, 4], &[], None, None);
        let b = profile(&[1, 2], &[], None, None);
        let score = compatibility_score(&a, &b, &ScoreWeights::swipe());
        // 2 shared / max(4, 2) = 0.5 of the 70-point hobby band
        assert!((score - 35.0).abs() < 1e-9);
    }

    #[test]
    fn empty_hobby_set_contributes_zero() {
        let a = profile(&[], &[10], None, None);
        let b = profile(&[1], &[10], None, None);
        let score = compatibility_score(&a, &b, &ScoreWeights::swipe());
        assert!((score - 30.0).abs() < 1e-9);
    }

    #[test]
    fn age_proximity_decays_to_zero_at_ten_years() {
        let w = ScoreWeights::general();
        let a = profile(&[], &[], Some(30), None);
        let same = profile(&[], &[], Some(30), None);
        let five = profile(&[], &[], Some(35), None);
        let far = profile(&[], &[], Some(45), None);

        assert!((compatibility_score(&a, &same, &w) - 20.0).abs() < 1e-9);
        assert!((compatibility_score(&a, &five, &w) - 10.0).abs() < 1e-9);
        assert_eq!(compatibility_score(&a, &far, &w), 0.0);
    }

    #[test]
    fn unknown_age_contributes_zero() {
        let w = ScoreWeights::general();
        let a = profile(&[], &[], None, None);
        let b = profile(&[], &[], Some(30), None);
        assert_eq!(compatibility_score(&a, &b, &w), 0.0);
    }

    #[test]
    fn rating_factor_scales_candidate_mean() {
        let w = ScoreWeights::general();
        let a = profile(&[], &[], None, None);
        let b = profile(&[], &[], None, Some(5.0));
        let c = profile(&[], &[], None, Some(2.5));

        assert!((compatibility_score(&a, &b, &w) - 10.0).abs() < 1e-9);
        assert!((compatibility_score(&a, &c, &w) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_rating_is_clamped() {
        let w = ScoreWeights::general();
        let a = profile(&[], &[], None, None);
        let b = profile(&[], &[], None, Some(17.0));
        assert!((compatibility_score(&a, &b, &w) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn score_stays_bounded() {
        let lopsided = ScoreWeights {
            hobbies: 500.0,
            location: 0.0,
            age: 0.0,
            rating: 0.0,
        };
        let a = profile(&[1], &[], None, None);
        assert_eq!(compatibility_score(&a, &a, &lopsided), 100.0);
    }
}
