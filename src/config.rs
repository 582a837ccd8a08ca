use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Lowest accepted frequency (Hz).
pub const MIN_FREQUENCY: f64 = 1e-6;

/// Length unit of the model coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Km,
    M,
    Cm,
    Mm,
    #[default]
    Um,
    Nm,
    In,
    Mils,
}

impl Units {
    pub const ALL: [Self; 8] = [
        Self::Km,
        Self::M,
        Self::Cm,
        Self::Mm,
        Self::Um,
        Self::Nm,
        Self::In,
        Self::Mils,
    ];

    /// Name as written in settings files and solver decks.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Km => "km",
            Self::M => "m",
            Self::Cm => "cm",
            Self::Mm => "mm",
            Self::Um => "um",
            Self::Nm => "nm",
            Self::In => "in",
            Self::Mils => "mils",
        }
    }

    /// Meters per model unit.
    #[must_use]
    pub fn scale(self) -> f64 {
        match self {
            Self::Km => 1e3,
            Self::M => 1.0,
            Self::Cm => 1e-2,
            Self::Mm | Self::Mils => 1e-3,
            Self::Um => 1e-6,
            Self::Nm => 1e-9,
            Self::In => 2.54e-2,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|u| u.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown unit '{s}'"))
    }
}

/// Solver-level settings shared by a domain and its exported deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Voxel pitch in model units.
    pub delta: f64,
    pub units: Units,
    /// Lowest frequency of the sweep (Hz).
    pub fmin: f64,
    /// Highest frequency of the sweep (Hz).
    pub fmax: f64,
    /// Points per decade.
    pub ndec: f64,
    /// Name of the solver input file.
    pub filename: String,
    /// Contact distance as a fraction of the pitch.
    pub contact_distance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            delta: 1.0,
            units: Units::default(),
            fmin: 2.5e9,
            fmax: 1e10,
            ndec: 1.0,
            filename: "voxhenry_input_file.vhr".into(),
            contact_distance: crate::contact::DEFAULT_CONTACT_FRACTION,
        }
    }
}

impl SolverSettings {
    /// Parses and validates settings from TOML. Missing keys take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for these settings or
    /// fails [`SolverSettings::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text).map_err(ConfigError::from)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending setting.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.delta.is_finite() || self.delta <= 0.0 {
            return Err(invalid("delta", format!("must be positive, got {}", self.delta)));
        }
        if self.fmin.is_nan() || self.fmin < MIN_FREQUENCY {
            return Err(invalid("fmin", format!("must be at least {MIN_FREQUENCY}, got {}", self.fmin)));
        }
        if self.fmax.is_nan() || self.fmax < self.fmin {
            return Err(invalid("fmax", format!("must be at least fmin, got {}", self.fmax)));
        }
        if self.ndec.is_nan() || self.ndec < 0.0 {
            return Err(invalid("ndec", format!("must not be negative, got {}", self.ndec)));
        }
        if self.contact_distance.is_nan() || self.contact_distance <= 0.0 {
            return Err(invalid(
                "contact_distance",
                format!("must be positive, got {}", self.contact_distance),
            ));
        }
        if self.filename.trim().is_empty() {
            return Err(invalid("filename", "must not be empty".into()));
        }
        Ok(())
    }

    /// Frequency points of the sweep: `ndec` log-spaced points per decade
    /// from `fmin`, or the single point 1 Hz when no sweep is defined.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn frequencies(&self) -> Vec<f64> {
        if self.fmin > MIN_FREQUENCY && self.ndec > 0.0 && self.fmax >= self.fmin {
            let decades = (self.fmax / self.fmin).log10();
            let count = (decades * self.ndec) as usize + 1;
            (0..count)
                .map(|m| self.fmin * 10f64.powf(m as f64 / self.ndec))
                .collect()
        } else {
            vec![1.0]
        }
    }

    /// Voxel pitch in meters.
    #[must_use]
    pub fn delta_meters(&self) -> f64 {
        self.delta * self.units.scale()
    }
}

fn invalid(name: &'static str, message: String) -> ConfigError {
    ConfigError::Invalid { name, message }
}
