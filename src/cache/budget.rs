//! Disk footprint limits

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const KILOBYTE: u64 = 1_000;
const MEGABYTE: u64 = 1_000_000;
const GIGABYTE: u64 = 1_000_000_000;

/// Ceiling on the combined size of engine-owned files in a directory
///
/// Units are decimal. Conversion saturates at `u64::MAX` instead of overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SizeBudget {
    bytes: u64,
}

impl SizeBudget {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self { bytes }
    }

    pub const fn from_kilobytes(count: u64) -> Self {
        Self::from_bytes(count.saturating_mul(KILOBYTE))
    }

    pub const fn from_megabytes(count: u64) -> Self {
        Self::from_bytes(count.saturating_mul(MEGABYTE))
    }

    pub const fn from_gigabytes(count: u64) -> Self {
        Self::from_bytes(count.saturating_mul(GIGABYTE))
    }

    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Whether a combined footprint is over this budget
    pub const fn is_exceeded_by(&self, combined: u64) -> bool {
        combined > self.bytes
    }
}

impl fmt::Display for SizeBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.bytes;
        if bytes != 0 && bytes % GIGABYTE == 0 {
            write!(f, "{}GB", bytes / GIGABYTE)
        } else if bytes != 0 && bytes % MEGABYTE == 0 {
            write!(f, "{}MB", bytes / MEGABYTE)
        } else if bytes != 0 && bytes % KILOBYTE == 0 {
            write!(f, "{}KB", bytes / KILOBYTE)
        } else {
            write!(f, "{}B", bytes)
        }
    }
}

impl FromStr for SizeBudget {
    type Err = String;

    /// Parse `500KB`, `10MB`, `1GB`, `42B` or bare digits (bytes)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);

        let count = digits
            .parse::<u64>()
            .map_err(|e| format!("Invalid size '{}': {}", s, e))?;

        match unit.trim().to_ascii_uppercase().as_str() {
            "" | "B" => Ok(Self::from_bytes(count)),
            "K" | "KB" => Ok(Self::from_kilobytes(count)),
            "M" | "MB" => Ok(Self::from_megabytes(count)),
            "G" | "GB" => Ok(Self::from_gigabytes(count)),
            other => Err(format!("Unknown size unit '{}' in '{}'", other, s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion_is_decimal() {
        assert_eq!(SizeBudget::from_kilobytes(1).bytes(), 1_000);
        assert_eq!(SizeBudget::from_megabytes(3).bytes(), 3_000_000);
        assert_eq!(SizeBudget::from_gigabytes(2).bytes(), 2_000_000_000);
    }

    #[test]
    fn test_conversion_saturates() {
        assert_eq!(SizeBudget::from_gigabytes(u64::MAX).bytes(), u64::MAX);
    }

    #[test]
    fn test_is_exceeded_by() {
        let budget = SizeBudget::from_kilobytes(1);
        assert!(!budget.is_exceeded_by(1_000));
        assert!(budget.is_exceeded_by(1_001));
    }

    #[test]
    fn test_parse() {
        assert_eq!("500KB".parse(), Ok(SizeBudget::from_kilobytes(500)));
        assert_eq!("10 mb".parse(), Ok(SizeBudget::from_megabytes(10)));
        assert_eq!("1G".parse(), Ok(SizeBudget::from_gigabytes(1)));
        assert_eq!("1234".parse(), Ok(SizeBudget::from_bytes(1234)));
        assert!("ten MB".parse::<SizeBudget>().is_err());
        assert!("10TB".parse::<SizeBudget>().is_err());
    }

    #[test]
    fn test_display_round_trips_units() {
        assert_eq!(SizeBudget::from_megabytes(50).to_string(), "50MB");
        assert_eq!(SizeBudget::from_bytes(1500).to_string(), "1500B");
        assert_eq!(SizeBudget::from_bytes(0).to_string(), "0B");
    }
}
