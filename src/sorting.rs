// Sort weights for market outcomes (home before draw before away, etc.)

/// Weight returned for outcome keys that are not in the table
pub const UNKNOWN_OUTCOME_SORT_VALUE: u32 = 1000;

pub struct OddOutcomesSortingHelper;

impl OddOutcomesSortingHelper {
    /// Sort weight for an outcome code name. Matching is case-insensitive and
    /// unknown keys sort last.
    pub fn sort_value_for_outcome(key: &str) -> u32 {
        match key.to_lowercase().as_str() {
            "yes" => 10,
            "no" => 20,

            "home" => 10,
            "draw" => 20,
            "none" => 21,
            "" => 22,
            "away" => 30,

            "home_draw" => 10,
            "home_away" => 20,
            "away_draw" => 30,

            "over" => 10,
            "under" => 20,

            "odd" => 10,
            "even" => 20,

            "exact" => 10,
            "range" => 20,
            "more_than" => 30,

            "in_90_minutes" => 10,
            "in_extra_time" => 20,
            "on_penalties" => 30,

            "home-true" => 10,
            "home-false" => 15,
            "-true" => 20,
            "-false" => 25,
            "away-true" => 30,
            "away-false" => 35,

            "home_draw-true" => 10,
            "home_draw-false" => 15,
            "home_away-true" => 20,
            "home_away-false" => 25,
            "away_draw-true" => 30,
            "away_draw-false" => 35,

            "over-true" => 10,
            "over-false" => 15,
            "under-true" => 20,
            "under-false" => 25,

            "odd-true" => 10,
            "odd-false" => 15,
            "even-true" => 20,
            "even-false" => 25,

            "yes-true" => 10,
            "yes-false" => 15,
            "no-true" => 20,
            "no-false" => 25,

            "true" => 10,
            "false" => 20,

            "h" => 10,
            "d" => 20,
            "a" => 30,

            _ => UNKNOWN_OUTCOME_SORT_VALUE,
        }
    }

    /// Stable sort by outcome weight; items sharing a weight keep their order.
    pub fn sort_outcomes_by_key<T, F>(outcomes: &mut [T], key: F)
    where
        F: Fn(&T) -> &str,
    {
        outcomes.sort_by_key(|outcome| Self::sort_value_for_outcome(key(outcome)));
    }
}
