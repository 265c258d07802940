//! Surface-water routing parameters.

use crate::error::{EngineError, Result};

/// Parameters for one chunk routing pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HydrologyParams {
    /// Fraction of the available head moved per sub-step (0, 1].
    pub flow_fraction: f32,

    /// Sub-steps per routing pass. More sub-steps settle water further for
    /// the same tick cadence.
    pub sub_steps_per_tick: usize,

    /// Depths below this are treated as dry; flows below it are dropped.
    pub min_water_depth_m: f32,

    /// Accumulate routed volume into each receiving cell's runoff field.
    pub track_runoff_flux: bool,
}

impl Default for HydrologyParams {
    fn default() -> Self {
        Self {
            flow_fraction: 0.4,
            sub_steps_per_tick: 8,
            min_water_depth_m: 1e-6,
            track_runoff_flux: true,
        }
    }
}

impl HydrologyParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.flow_fraction > 0.0 && self.flow_fraction <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "flow fraction must lie in (0, 1], got {}",
                self.flow_fraction
            )));
        }
        if self.sub_steps_per_tick == 0 {
            return Err(EngineError::InvalidConfig(
                "sub-steps per tick must be positive".into(),
            ));
        }
        if !(self.min_water_depth_m >= 0.0 && self.min_water_depth_m.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "minimum water depth must be finite and non-negative, got {}",
                self.min_water_depth_m
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(HydrologyParams::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut p = HydrologyParams::default();
        p.flow_fraction = 0.0;
        assert!(p.validate().is_err());
        p.flow_fraction = 1.5;
        assert!(p.validate().is_err());

        let mut p = HydrologyParams::default();
        p.sub_steps_per_tick = 0;
        assert!(p.validate().is_err());

        let mut p = HydrologyParams::default();
        p.min_water_depth_m = f32::NAN;
        assert!(p.validate().is_err());
    }
}
