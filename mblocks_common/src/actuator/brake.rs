//! Mechanical brake profile.
//!
//! A profile is an ordered list of 1..=8 coil steps. It is built atomically:
//! either every declared step is present and valid, or construction fails and
//! nothing downstream ever sees a partial profile.

use serde::{Deserialize, Serialize};

use super::error::CommandError;
use crate::consts::{BRAKE_CURRENT_MAX_MA, MAX_BRAKE_STEPS};

/// One coil step. The sign of `current_ma` selects the winding polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrakeStep {
    pub current_ma: i32,
    pub time_ms: u32,
}

impl BrakeStep {
    pub const fn new(current_ma: i32, time_ms: u32) -> Self {
        Self {
            current_ma,
            time_ms,
        }
    }

    fn validate(&self) -> Result<(), CommandError> {
        CommandError::check_range(
            "brake step current_ma",
            self.current_ma as i64,
            -(BRAKE_CURRENT_MAX_MA as i64),
            BRAKE_CURRENT_MAX_MA as i64,
        )?;
        if self.time_ms == 0 {
            return Err(CommandError::ZeroDuration {
                what: "brake step time_ms",
            });
        }
        Ok(())
    }
}

/// Validated, ordered brake profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrakeProfile {
    steps: heapless::Vec<BrakeStep, MAX_BRAKE_STEPS>,
}

impl BrakeProfile {
    /// Build a profile that declared `declared` steps from the steps supplied.
    pub fn from_steps(declared: usize, steps: &[BrakeStep]) -> Result<Self, CommandError> {
        if declared == 0 {
            return Err(CommandError::EmptyProfile);
        }
        if declared > MAX_BRAKE_STEPS {
            return Err(CommandError::TooManySteps {
                declared,
                max: MAX_BRAKE_STEPS,
            });
        }
        if steps.len() != declared {
            return Err(CommandError::StepCountMismatch {
                declared,
                supplied: steps.len(),
            });
        }

        let mut out = heapless::Vec::new();
        for step in steps {
            step.validate()?;
            // Capacity checked above.
            let _ = out.push(*step);
        }
        Ok(Self { steps: out })
    }

    /// Single-step profile.
    pub fn single(current_ma: i32, time_ms: u32) -> Result<Self, CommandError> {
        Self::from_steps(1, &[BrakeStep::new(current_ma, time_ms)])
    }

    /// Parse `"<count> <current_ma> <time_ms> ..."`.
    ///
    /// Every token after the count must belong to a well-formed pair, and the
    /// number of pairs must equal the count. A malformed token before the
    /// declared count is reached reports the short step list; one after it
    /// rejects the text as malformed.
    pub fn parse(args: &str) -> Result<Self, CommandError> {
        let mut tokens = args.split_whitespace();
        let declared = match tokens.next().and_then(|t| t.parse::<usize>().ok()) {
            Some(n) => n,
            None => return Err(CommandError::EmptyProfile),
        };
        if declared > MAX_BRAKE_STEPS {
            return Err(CommandError::TooManySteps {
                declared,
                max: MAX_BRAKE_STEPS,
            });
        }

        let mut steps = [BrakeStep::new(0, 0); MAX_BRAKE_STEPS];
        let mut supplied = 0;
        while let Some(token) = tokens.next() {
            let current = token.parse::<i32>().ok();
            let time = tokens.next().and_then(|t| t.parse::<u32>().ok());
            match (current, time) {
                (Some(current_ma), Some(time_ms)) => {
                    if let Some(slot) = steps.get_mut(supplied) {
                        *slot = BrakeStep::new(current_ma, time_ms);
                    }
                    supplied += 1;
                }
                _ if supplied < declared => {
                    return Err(CommandError::StepCountMismatch { declared, supplied });
                }
                _ => return Err(CommandError::MalformedProfile),
            }
        }
        if supplied != declared {
            return Err(CommandError::StepCountMismatch { declared, supplied });
        }
        Self::from_steps(declared, &steps[..supplied])
    }

    #[inline]
    pub fn steps(&self) -> &[BrakeStep] {
        &self.steps
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of all step durations [ms].
    pub fn total_time_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.time_ms as u64).sum()
    }
}
