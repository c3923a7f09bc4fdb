//! Answer resolution: pick one option per question from its darkness vector.
//!
//! The darkest bubble wins. Ties on the exact minimum go to the lowest option
//! index, so repeated runs over the same vector always agree.
//!
//! Two optional gates refine the plain "darkest wins" rule:
//! - `blank_threshold`: if even the darkest bubble is brighter than this, the
//!   question is reported [`MarkStatus::Blank`] with no option chosen.
//! - `ambiguity_margin`: if the runner-up is within this margin of the
//!   darkest bubble, the winner is kept but flagged [`MarkStatus::Ambiguous`].
//!
//! With both gates unset (the default) every question resolves to an option.

/// Resolver gates. Intensities are on the 8-bit `[0, 255]` scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveConfig {
    /// Report a question blank when its darkest bubble mean is strictly above
    /// this value. `None` disables blank detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blank_threshold: Option<f64>,
    /// Flag a question ambiguous when `runner_up - darkest` is strictly below
    /// this value. `None` disables the flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambiguity_margin: Option<f64>,
}

/// How a question was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkStatus {
    /// A single clear winner.
    Marked,
    /// A winner was chosen but the runner-up is nearly as dark.
    Ambiguous,
    /// No bubble is dark enough to count as filled.
    Blank,
}

/// Resolver output for one question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Chosen option index; `None` only for [`MarkStatus::Blank`].
    pub option: Option<usize>,
    pub status: MarkStatus,
    /// `runner_up - darkest`; `None` with fewer than two options.
    pub margin: Option<f64>,
}

/// Index of the first minimum. `None` for an empty slice.
pub fn argmin_first(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Gap between the minimum and the second-smallest value.
fn runner_up_margin(values: &[f64], best: usize) -> Option<f64> {
    let darkest = values[best];
    values
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != best)
        .map(|(_, &v)| v - darkest)
        .reduce(f64::min)
}

/// Resolve one darkness vector.
///
/// Returns `None` only for an empty vector, which a validated layout never
/// produces.
pub fn resolve(darkness: &[f64], config: &ResolveConfig) -> Option<Resolution> {
    let best = argmin_first(darkness)?;
    let margin = runner_up_margin(darkness, best);

    if let Some(threshold) = config.blank_threshold {
        if darkness[best] > threshold {
            return Some(Resolution {
                option: None,
                status: MarkStatus::Blank,
                margin,
            });
        }
    }

    let ambiguous = matches!(
        (config.ambiguity_margin, margin),
        (Some(min_gap), Some(gap)) if gap < min_gap
    );

    Some(Resolution {
        option: Some(best),
        status: if ambiguous {
            MarkStatus::Ambiguous
        } else {
            MarkStatus::Marked
        },
        margin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn unique_minimum_is_chosen() {
        assert_eq!(argmin_first(&[200.0, 180.0, 40.0, 210.0]), Some(2));
        assert_eq!(argmin_first(&[10.0, 180.0, 40.0, 210.0]), Some(0));
        assert_eq!(argmin_first(&[99.0, 180.0, 140.0, 9.5]), Some(3));
    }

    #[test]
    fn ties_go_to_lowest_index() {
        assert_eq!(argmin_first(&[50.0, 20.0, 20.0, 20.0]), Some(1));
        assert_eq!(argmin_first(&[7.0, 7.0]), Some(0));
        assert_eq!(argmin_first(&[255.0, 255.0, 255.0, 255.0]), Some(0));
        for _ in 0..10 {
            assert_eq!(argmin_first(&[90.0, 30.0, 60.0, 30.0]), Some(1));
        }
    }

    #[test]
    fn empty_vector_has_no_minimum() {
        assert_eq!(argmin_first(&[]), None);
        assert!(resolve(&[], &ResolveConfig::default()).is_none());
    }

    #[test]
    fn default_config_always_marks() {
        let cfg = ResolveConfig::default();
        let faint = resolve(&[250.0, 249.0, 250.0, 250.0], &cfg).expect("non-empty");
        assert_eq!(faint.option, Some(1));
        assert_eq!(faint.status, MarkStatus::Marked);

        let double = resolve(&[30.0, 200.0, 30.0, 200.0], &cfg).expect("non-empty");
        assert_eq!(double.option, Some(0));
        assert_eq!(double.status, MarkStatus::Marked);
        assert_abs_diff_eq!(double.margin.expect("margin"), 0.0);
    }

    #[test]
    fn blank_threshold_reports_blank() {
        let cfg = ResolveConfig {
            blank_threshold: Some(180.0),
            ambiguity_margin: None,
        };
        let r = resolve(&[230.0, 225.0, 231.0, 229.0], &cfg).expect("non-empty");
        assert_eq!(r.option, None);
        assert_eq!(r.status, MarkStatus::Blank);

        let filled = resolve(&[230.0, 40.0, 231.0, 229.0], &cfg).expect("non-empty");
        assert_eq!(filled.option, Some(1));
        assert_eq!(filled.status, MarkStatus::Marked);
    }

    #[test]
    fn blank_threshold_is_exclusive() {
        let cfg = ResolveConfig {
            blank_threshold: Some(100.0),
            ambiguity_margin: None,
        };
        let r = resolve(&[100.0, 200.0], &cfg).expect("non-empty");
        assert_eq!(r.status, MarkStatus::Marked);
    }

    #[test]
    fn close_runner_up_is_ambiguous_but_keeps_winner() {
        let cfg = ResolveConfig {
            blank_threshold: None,
            ambiguity_margin: Some(25.0),
        };
        let r = resolve(&[200.0, 40.0, 55.0, 210.0], &cfg).expect("non-empty");
        assert_eq!(r.option, Some(1));
        assert_eq!(r.status, MarkStatus::Ambiguous);
        assert_abs_diff_eq!(r.margin.expect("margin"), 15.0);

        let clear = resolve(&[200.0, 40.0, 120.0, 210.0], &cfg).expect("non-empty");
        assert_eq!(clear.status, MarkStatus::Marked);
        assert_abs_diff_eq!(clear.margin.expect("margin"), 80.0);
    }

    #[test]
    fn blank_takes_precedence_over_ambiguity() {
        let cfg = ResolveConfig {
            blank_threshold: Some(150.0),
            ambiguity_margin: Some(10.0),
        };
        let r = resolve(&[240.0, 238.0, 241.0, 239.0], &cfg).expect("non-empty");
        assert_eq!(r.status, MarkStatus::Blank);
    }

    #[test]
    fn single_option_has_no_margin() {
        let cfg = ResolveConfig {
            blank_threshold: None,
            ambiguity_margin: Some(10.0),
        };
        let r = resolve(&[12.0], &cfg).expect("non-empty");
        assert_eq!(r.option, Some(0));
        assert_eq!(r.margin, None);
        assert_eq!(r.status, MarkStatus::Marked);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: ResolveConfig = serde_json::from_str("{}").expect("valid json");
        assert_eq!(cfg, ResolveConfig::default());
        let cfg: ResolveConfig =
            serde_json::from_str(r#"{"blank_threshold":170.5}"#).expect("valid json");
        assert_eq!(cfg.blank_threshold, Some(170.5));
        assert_eq!(cfg.ambiguity_margin, None);
    }

    #[test]
    fn argmin_first_matches_linear_scan_on_random_vectors() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..2000 {
            let n = rng.gen_range(1..=8);
            // Few distinct levels so ties are frequent.
            let values: Vec<f64> = (0..n).map(|_| f64::from(rng.gen_range(0u8..4)) * 60.0).collect();

            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let expected = values.iter().position(|&v| v == min);
            let got = argmin_first(&values);
            assert_eq!(got, expected, "{values:?}");

            let best = got.expect("non-empty");
            assert!(values[..best].iter().all(|&v| v > values[best]));
            assert!(values[best..].iter().all(|&v| v >= values[best]));
        }
    }
}
