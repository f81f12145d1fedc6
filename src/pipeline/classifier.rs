use crate::core::types::RiskTier;

/// Cut-point schemes used by the different views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierScheme {
    /// POI detail: 80 / 60 / 40, four tiers.
    Detail,
    /// Dashboard cards and POI summary cards: 80 / 60, anything lower is the amber tier.
    Card,
}

impl TierScheme {
    pub fn classify(self, score: u8) -> RiskTier {
        self.classify_percent(f64::from(score))
    }

    pub fn classify_percent(self, pct: f64) -> RiskTier {
        if pct >= 80.0 {
            RiskTier::Critical
        } else if pct >= 60.0 {
            RiskTier::High
        } else {
            match self {
                TierScheme::Detail if pct >= 40.0 => RiskTier::Medium,
                TierScheme::Detail => RiskTier::Low,
                TierScheme::Card => RiskTier::Medium,
            }
        }
    }

    pub fn classify_confidence(self, confidence: f64) -> RiskTier {
        self.classify_percent(confidence_percent(confidence))
    }
}

/// A `[0,1]` confidence as a percentage; applied before any threshold or display.
pub fn confidence_percent(confidence: f64) -> f64 {
    confidence * 100.0
}

/// Whole-number percentage for display, e.g. `0.914` → `91`.
pub fn confidence_display(confidence: f64) -> u8 {
    confidence_percent(confidence).round().clamp(0.0, 100.0) as u8
}

/// Width of a score bar: the score itself, as a percentage.
pub fn bar_width(score: u8) -> u8 {
    score.min(100)
}

/// Badge text shown next to a POI in the detail view.
pub fn badge_label(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::Critical => "CRITICAL",
        RiskTier::High => "HIGH RISK",
        RiskTier::Medium => "MODERATE",
        RiskTier::Low => "LOW",
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn boundaries_map_to_the_higher_tier() {
        for scheme in [TierScheme::Detail, TierScheme::Card] {
            assert_eq!(scheme.classify(80), RiskTier::Critical);
            assert_eq!(scheme.classify(79), RiskTier::High);
            assert_eq!(scheme.classify(60), RiskTier::High);
        }
        assert_eq!(TierScheme::Detail.classify(59), RiskTier::Medium);
        assert_eq!(TierScheme::Detail.classify(40), RiskTier::Medium);
        assert_eq!(TierScheme::Detail.classify(39), RiskTier::Low);
        assert_eq!(TierScheme::Card.classify(59), RiskTier::Medium);
        assert_eq!(TierScheme::Card.classify(0), RiskTier::Medium);
    }

    #[test]
    fn score_85_is_critical_with_full_width_bar() {
        assert_eq!(TierScheme::Detail.classify(85), RiskTier::Critical);
        assert_eq!(TierScheme::Card.classify(85), RiskTier::Critical);
        assert_eq!(bar_width(85), 85);
        assert_eq!(badge_label(TierScheme::Detail.classify(85)), "CRITICAL");
    }

    #[test]
    fn confidence_is_scaled_before_thresholds() {
        assert_eq!(confidence_percent(0.5), 50.0);
        assert_eq!(TierScheme::Detail.classify_confidence(0.82), RiskTier::Critical);
        assert_eq!(TierScheme::Detail.classify_confidence(0.45), RiskTier::Medium);
        assert_eq!(confidence_display(0.914), 91);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_top_tiers_follow_cut_points(score in 0u8..=100u8) {
            for scheme in [TierScheme::Detail, TierScheme::Card] {
                let tier = scheme.classify(score);
                prop_assert_eq!(tier == RiskTier::Critical, score >= 80);
                prop_assert_eq!(tier == RiskTier::High, (60..80).contains(&score));
            }
        }

        #[test]
        fn prop_detail_scheme_is_total_and_monotonic(a in 0u8..=100u8, b in 0u8..=100u8) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(TierScheme::Detail.classify(lo) <= TierScheme::Detail.classify(hi));
            prop_assert!(TierScheme::Card.classify(lo) <= TierScheme::Card.classify(hi));
        }

        #[test]
        fn prop_bar_width_is_the_score(score in 0u8..=100u8) {
            prop_assert_eq!(bar_width(score), score);
        }
    }
}
