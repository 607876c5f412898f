// ── Threshold alerter ──
//
// Edge-triggered low-food latch. Fires once when the container drops
// below the threshold and re-arms only after it recovers.

/// One-shot latch over a stream of container weights.
#[derive(Debug, Clone)]
pub struct ThresholdAlerter {
    threshold: u32,
    fired: bool,
}

impl ThresholdAlerter {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            fired: false,
        }
    }

    /// Feed the latest container weight. Returns the weight when an alert
    /// should be raised for it.
    pub fn observe(&mut self, container_weight_grams: u32) -> Option<u32> {
        if container_weight_grams >= self.threshold {
            self.fired = false;
            return None;
        }
        if self.fired {
            return None;
        }
        self.fired = true;
        Some(container_weight_grams)
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }

    pub fn reset(&mut self) {
        self.fired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fires_once_per_excursion() {
        let mut alerter = ThresholdAlerter::new(100);
        assert_eq!(alerter.observe(150), None);
        assert_eq!(alerter.observe(80), Some(80));
        assert_eq!(alerter.observe(60), None);
        assert!(alerter.is_fired());
        assert_eq!(alerter.observe(100), None);
        assert!(!alerter.is_fired());
        assert_eq!(alerter.observe(99), Some(99));
    }

    #[test]
    fn starting_below_threshold_fires_immediately() {
        let mut alerter = ThresholdAlerter::new(100);
        assert_eq!(alerter.observe(0), Some(0));
    }

    proptest! {
        #[test]
        fn one_alert_per_run_below_threshold(weights in prop::collection::vec(0u32..=500, 0..64)) {
            let mut alerter = ThresholdAlerter::new(100);
            let alerts = weights.iter().filter(|w| alerter.observe(**w).is_some()).count();

            let mut runs = 0;
            let mut below = false;
            for w in &weights {
                if *w < 100 && !below {
                    runs += 1;
                }
                below = *w < 100;
            }
            prop_assert_eq!(alerts, runs);
        }
    }
}
