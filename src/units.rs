//! SLURM value types: memory sizes and wall-clock time limits
//!
//! Both keep to the forms `sbatch` itself accepts so that a value typed
//! by the user can be echoed into a script unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MB_PER_GB: u64 = 1024;

/// Memory quantity in megabytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemorySize {
    megabytes: u64,
}

impl MemorySize {
    /// Create from a megabyte count
    pub const fn from_mb(megabytes: u64) -> Self {
        Self { megabytes }
    }

    /// Create from a gigabyte count
    pub const fn from_gb(gigabytes: u64) -> Self {
        Self {
            megabytes: gigabytes * MB_PER_GB,
        }
    }

    /// Size in megabytes
    pub fn megabytes(&self) -> u64 {
        self.megabytes
    }

    /// Size in bytes
    pub fn bytes(&self) -> u64 {
        self.megabytes * 1024 * 1024
    }

    /// Scale by `numerator / denominator`, rounding down to whole megabytes
    pub fn scaled(&self, numerator: u64, denominator: u64) -> Self {
        if denominator == 0 {
            return *self;
        }
        Self::from_mb(self.megabytes * numerator / denominator)
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.megabytes > 0 && self.megabytes % MB_PER_GB == 0 {
            write!(f, "{}G", self.megabytes / MB_PER_GB)
        } else {
            write!(f, "{}M", self.megabytes)
        }
    }
}

impl FromStr for MemorySize {
    type Err = String;

    /// Parse `50G`, `512M`, `1T`, `1.5G`, `64GB` or a bare number (MB, as in SLURM)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let size = s.trim().to_uppercase();
        if size.is_empty() {
            return Err("Empty memory size".to_string());
        }

        let size = size.strip_suffix('B').unwrap_or(size.as_str());
        let (num_str, multiplier) = match size.chars().last() {
            Some('T') => (&size[..size.len() - 1], 1024.0 * 1024.0),
            Some('G') => (&size[..size.len() - 1], 1024.0),
            Some('M') => (&size[..size.len() - 1], 1.0),
            Some('K') => (&size[..size.len() - 1], 1.0 / 1024.0),
            _ => (size, 1.0),
        };

        let num: f64 = num_str
            .trim()
            .parse()
            .map_err(|_| format!("Invalid memory size: {}", s.trim()))?;
        if !num.is_finite() || num < 0.0 {
            return Err(format!("Invalid memory size: {}", s.trim()));
        }

        Ok(Self::from_mb((num * multiplier).round() as u64))
    }
}

impl TryFrom<String> for MemorySize {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MemorySize> for String {
    fn from(value: MemorySize) -> Self {
        value.to_string()
    }
}

/// Wall-clock time limit in one of SLURM's accepted notations
///
/// The original text is kept so it reaches `#SBATCH --time=` verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeLimit {
    text: String,
    seconds: Option<u64>,
}

impl TimeLimit {
    /// Time limit as entered
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Duration in seconds, `None` for unlimited
    pub fn seconds(&self) -> Option<u64> {
        self.seconds
    }

    /// Whether this is SLURM's "no limit"
    pub fn is_unlimited(&self) -> bool {
        self.seconds.is_none()
    }

    /// Build from a second count, formatted as `D-HH:MM:SS` / `HH:MM:SS`
    pub fn from_seconds(seconds: u64) -> Self {
        Self {
            text: format_slurm_time(seconds),
            seconds: Some(seconds),
        }
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for TimeLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err("Empty time limit".to_string());
        }
        if text.eq_ignore_ascii_case("infinite") || text.eq_ignore_ascii_case("unlimited") {
            return Ok(Self {
                text: text.to_string(),
                seconds: None,
            });
        }
        let seconds = parse_slurm_time(text).ok_or_else(|| {
            format!(
                "Invalid time limit '{}': expected MM, MM:SS, HH:MM:SS, D-HH, D-HH:MM or D-HH:MM:SS",
                text
            )
        })?;
        Ok(Self {
            text: text.to_string(),
            seconds: Some(seconds),
        })
    }
}

impl TryFrom<String> for TimeLimit {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeLimit> for String {
    fn from(value: TimeLimit) -> Self {
        value.text
    }
}

/// Parse a SLURM time specification into seconds
pub fn parse_slurm_time(s: &str) -> Option<u64> {
    let number = |part: &str| -> Option<u64> {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        part.parse().ok()
    };

    if let Some((days, rest)) = s.split_once('-') {
        let days = number(days)?;
        let parts: Vec<&str> = rest.split(':').collect();
        let (hours, minutes, seconds) = match parts.as_slice() {
            [h] => (number(h)?, 0, 0),
            [h, m] => (number(h)?, number(m)?, 0),
            [h, m, sec] => (number(h)?, number(m)?, number(sec)?),
            _ => return None,
        };
        return Some(days * 86400 + hours * 3600 + minutes * 60 + seconds);
    }

    let parts: Vec<&str> = s.split(':').collect();
    match parts.as_slice() {
        [m] => Some(number(m)? * 60),
        [m, sec] => Some(number(m)? * 60 + number(sec)?),
        [h, m, sec] => Some(number(h)? * 3600 + number(m)? * 60 + number(sec)?),
        _ => None,
    }
}

/// Format seconds as SLURM time
pub fn format_slurm_time(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}-{:02}:{:02}:{:02}", days, hours, minutes, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    }
}
