//! CEFR proficiency levels derived from ECDICT markers
//!
//! ECDICT does not carry CEFR levels directly. A level is derived from three
//! markers on each row: the Oxford 3000 flag, the Collins star rating and
//! the corpus frequency column.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Common European Framework of Reference level, A1 (easiest) to C2+
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
    /// Beyond C2, or no usable data for the word
    #[serde(rename = "C2+")]
    C2Plus,
}

impl CefrLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
            CefrLevel::C2Plus => "C2+",
        }
    }

    /// Assign a level from the Oxford flag, Collins rating and frequency
    ///
    /// Oxford 3000 words with a high rating land in A1/A2; everything else
    /// falls through the frequency and rating thresholds. Words matching no
    /// threshold are `C2Plus`.
    pub fn assign(oxford: u32, collins: u32, frequency: u64) -> Self {
        if oxford == 1 {
            if collins >= 5 || frequency >= 50_000 {
                return CefrLevel::A1;
            }
            if collins >= 4 || frequency >= 30_000 {
                return CefrLevel::A2;
            }
            if frequency >= 15_000 {
                return CefrLevel::B1;
            }
        }

        if frequency >= 15_000 || collins >= 3 {
            CefrLevel::B1
        } else if frequency >= 8_000 || collins >= 2 {
            CefrLevel::B2
        } else if frequency >= 3_000 || collins >= 1 {
            CefrLevel::C1
        } else if frequency >= 1_000 {
            CefrLevel::C2
        } else {
            CefrLevel::C2Plus
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oxford_high_collins_is_a1() {
        assert_eq!(CefrLevel::assign(1, 5, 0), CefrLevel::A1);
        assert_eq!(CefrLevel::assign(1, 0, 60_000), CefrLevel::A1);
    }

    #[test]
    fn test_oxford_mid_rating_is_a2() {
        assert_eq!(CefrLevel::assign(1, 4, 0), CefrLevel::A2);
        assert_eq!(CefrLevel::assign(1, 0, 30_000), CefrLevel::A2);
    }

    #[test]
    fn test_non_oxford_thresholds() {
        assert_eq!(CefrLevel::assign(0, 3, 0), CefrLevel::B1);
        assert_eq!(CefrLevel::assign(0, 2, 0), CefrLevel::B2);
        assert_eq!(CefrLevel::assign(0, 1, 0), CefrLevel::C1);
        assert_eq!(CefrLevel::assign(0, 0, 1_500), CefrLevel::C2);
    }

    #[test]
    fn test_no_data_is_c2_plus() {
        assert_eq!(CefrLevel::assign(0, 0, 0), CefrLevel::C2Plus);
        assert_eq!(CefrLevel::C2Plus.to_string(), "C2+");
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&CefrLevel::C2Plus).unwrap();
        assert_eq!(json, "\"C2+\"");
        let level: CefrLevel = serde_json::from_str("\"B2\"").unwrap();
        assert_eq!(level, CefrLevel::B2);
    }
}
