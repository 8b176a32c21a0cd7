//! Best-effort "high detail" sequence for renderers that silently ignore tilt.
//!
//! The sequence is an explicit finite state machine rather than chained
//! timers: attempt, wait, verify, then at most [`MAX_FALLBACKS`] rounds of
//! fallback, wait, verify. The owner schedules the returned delays on its own
//! timer queue and feeds back the tilt the renderer reports once each wait
//! elapses.

use foundation::time::Delay;
use serde::{Deserialize, Serialize};

use crate::state::{MAX_TILT, MAX_ZOOM};

pub const MAX_FALLBACKS: u8 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighDetailConfig {
    /// Delay before the first reconfiguration is applied.
    pub attempt_delay: Delay,
    /// Wait between the attempt and its verification.
    pub verify_delay: Delay,
    /// Wait between a fallback and its verification.
    pub fallback_verify_delay: Delay,
    /// Tilt (degrees) below which the renderer is considered to have refused.
    pub tilt_threshold: f64,
    pub target_tilt: f64,
    pub target_zoom: f64,
    pub target_heading: f64,
}

impl Default for HighDetailConfig {
    fn default() -> Self {
        Self {
            attempt_delay: Delay::ms(200),
            verify_delay: Delay::ms(800),
            fallback_verify_delay: Delay::ms(1000),
            tilt_threshold: 45.0,
            target_tilt: MAX_TILT,
            target_zoom: MAX_ZOOM,
            target_heading: 45.0,
        }
    }
}

/// Reconfiguration the owner must push to the renderer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconfigure {
    /// Vector rendering, road map, target tilt/zoom/heading.
    Attempt,
    /// Drop the vector-only map id and reapply the camera targets.
    DropMapId,
    /// Switch to satellite imagery and reapply the camera targets.
    SwitchToSatellite,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Honored { fallbacks: u8 },
    GaveUp,
    Cancelled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    Scheduled,
    Attempted,
    FellBack(u8),
    Done(Outcome),
}

/// What the owner must do after a timer fired.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Step {
    pub apply: Option<Reconfigure>,
    pub wait: Option<Delay>,
    pub outcome: Option<Outcome>,
}

impl Step {
    fn idle() -> Self {
        Self {
            apply: None,
            wait: None,
            outcome: None,
        }
    }

    fn reconfigure(apply: Reconfigure, wait: Delay) -> Self {
        Self {
            apply: Some(apply),
            wait: Some(wait),
            outcome: None,
        }
    }

    fn finished(outcome: Outcome) -> Self {
        Self {
            apply: None,
            wait: None,
            outcome: Some(outcome),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HighDetailSequence {
    config: HighDetailConfig,
    /// Viewport epoch the sequence was started in.
    epoch: u64,
    phase: Phase,
    reconfigurations: u8,
}

impl HighDetailSequence {
    pub fn new(config: HighDetailConfig, epoch: u64) -> Self {
        Self {
            config,
            epoch,
            phase: Phase::Scheduled,
            reconfigurations: 0,
        }
    }

    pub fn config(&self) -> &HighDetailConfig {
        &self.config
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Delay before the first timer.
    pub fn first_wait(&self) -> Delay {
        self.config.attempt_delay
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Done(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done(_))
    }

    /// Whether the next timer verifies a reconfiguration, i.e. the owner
    /// should read the renderer's tilt before calling [`Self::on_timer`].
    pub fn awaits_verification(&self) -> bool {
        matches!(self.phase, Phase::Attempted | Phase::FellBack(_))
    }

    /// Number of fallback reconfigurations applied so far (excludes the attempt).
    pub fn fallbacks(&self) -> u8 {
        self.reconfigurations.saturating_sub(1)
    }

    pub fn cancel(&mut self) {
        if !self.is_done() {
            self.phase = Phase::Done(Outcome::Cancelled);
        }
    }

    /// Advance after a wait elapsed. `observed_tilt` is what the renderer
    /// reports now; `None` means it could not be read and counts as refused.
    pub fn on_timer(&mut self, observed_tilt: Option<f64>) -> Step {
        let honored = observed_tilt.is_some_and(|t| t >= self.config.tilt_threshold);
        match self.phase {
            Phase::Scheduled => {
                self.phase = Phase::Attempted;
                self.reconfigurations += 1;
                Step::reconfigure(Reconfigure::Attempt, self.config.verify_delay)
            }
            Phase::Attempted | Phase::FellBack(_) if honored => {
                let outcome = Outcome::Honored {
                    fallbacks: self.fallbacks(),
                };
                self.phase = Phase::Done(outcome);
                Step::finished(outcome)
            }
            Phase::Attempted => self.fall_back(1),
            Phase::FellBack(round) if round < MAX_FALLBACKS => self.fall_back(round + 1),
            Phase::FellBack(_) => {
                self.phase = Phase::Done(Outcome::GaveUp);
                Step::finished(Outcome::GaveUp)
            }
            Phase::Done(_) => Step::idle(),
        }
    }

    fn fall_back(&mut self, round: u8) -> Step {
        self.phase = Phase::FellBack(round);
        self.reconfigurations += 1;
        let apply = if round == 1 {
            Reconfigure::DropMapId
        } else {
            Reconfigure::SwitchToSatellite
        };
        Step::reconfigure(apply, self.config.fallback_verify_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::{HighDetailConfig, HighDetailSequence, Outcome, Reconfigure};
    use pretty_assertions::assert_eq;

    fn seq() -> HighDetailSequence {
        HighDetailSequence::new(HighDetailConfig::default(), 0)
    }

    #[test]
    fn honored_on_first_verification() {
        let mut s = seq();
        let step = s.on_timer(Some(0.0));
        assert_eq!(step.apply, Some(Reconfigure::Attempt));
        let step = s.on_timer(Some(67.5));
        assert_eq!(step.outcome, Some(Outcome::Honored { fallbacks: 0 }));
        assert_eq!(s.fallbacks(), 0);
    }

    #[test]
    fn one_fallback_then_honored() {
        let mut s = seq();
        s.on_timer(None);
        let step = s.on_timer(Some(0.0));
        assert_eq!(step.apply, Some(Reconfigure::DropMapId));
        let step = s.on_timer(Some(60.0));
        assert_eq!(step.outcome, Some(Outcome::Honored { fallbacks: 1 }));
        assert_eq!(s.fallbacks(), 1);
    }

    #[test]
    fn never_more_than_two_fallbacks() {
        let mut s = seq();
        let mut applied = Vec::new();
        for _ in 0..10 {
            let step = s.on_timer(Some(0.0));
            if let Some(a) = step.apply {
                applied.push(a);
            }
        }
        assert_eq!(
            applied,
            vec![
                Reconfigure::Attempt,
                Reconfigure::DropMapId,
                Reconfigure::SwitchToSatellite
            ]
        );
        assert_eq!(s.outcome(), Some(Outcome::GaveUp));
        assert_eq!(s.fallbacks(), 2);
    }

    #[test]
    fn cancelled_sequence_goes_idle() {
        let mut s = seq();
        s.on_timer(Some(0.0));
        s.cancel();
        let step = s.on_timer(Some(0.0));
        assert_eq!(step.apply, None);
        assert_eq!(step.wait, None);
        assert_eq!(s.outcome(), Some(Outcome::Cancelled));
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut s = seq();
        s.on_timer(None);
        let step = s.on_timer(Some(45.0));
        assert_eq!(step.outcome, Some(Outcome::Honored { fallbacks: 0 }));
    }
}
