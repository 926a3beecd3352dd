//! The closed set of result categories.
//!
//! The integer code is the storage value; labels are for presentation only.

use std::fmt;

/// How a lab result relates to its reference range, or why it could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResultCategory {
    UnderRange,
    WithinRange,
    OverRange,
    NoReferenceRange,
    Unparseable,
    InvalidSex,
    InvalidRangeWithDirection,
    DiscardedAge,
    InvalidRange,
    NoTestCode,
}

impl ResultCategory {
    /// Every category, in ascending code order.
    pub const ALL: [ResultCategory; 10] = [
        ResultCategory::UnderRange,
        ResultCategory::WithinRange,
        ResultCategory::OverRange,
        ResultCategory::NoReferenceRange,
        ResultCategory::Unparseable,
        ResultCategory::InvalidSex,
        ResultCategory::InvalidRangeWithDirection,
        ResultCategory::DiscardedAge,
        ResultCategory::InvalidRange,
        ResultCategory::NoTestCode,
    ];

    pub const fn code(self) -> i32 {
        match self {
            ResultCategory::UnderRange => -1,
            ResultCategory::WithinRange => 0,
            ResultCategory::OverRange => 1,
            ResultCategory::NoReferenceRange => 2,
            ResultCategory::Unparseable => 3,
            ResultCategory::InvalidSex => 4,
            ResultCategory::InvalidRangeWithDirection => 5,
            ResultCategory::DiscardedAge => 6,
            ResultCategory::InvalidRange => 7,
            ResultCategory::NoTestCode => 8,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ResultCategory::UnderRange => "Under range",
            ResultCategory::WithinRange => "Within range",
            ResultCategory::OverRange => "Over range",
            ResultCategory::NoReferenceRange => "No reference range",
            ResultCategory::Unparseable => "Unparseable result",
            ResultCategory::InvalidSex => "Invalid sex",
            ResultCategory::InvalidRangeWithDirection => "Invalid range with direction",
            ResultCategory::DiscardedAge => "Discarded age",
            ResultCategory::InvalidRange => "Invalid range",
            ResultCategory::NoTestCode => "No test code",
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }
}

impl fmt::Display for ResultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_and_ascending() {
        let codes: Vec<i32> = ResultCategory::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes, (-1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_from_code_roundtrip() {
        for cat in ResultCategory::ALL {
            assert_eq!(ResultCategory::from_code(cat.code()), Some(cat));
        }
        assert_eq!(ResultCategory::from_code(9), None);
        assert_eq!(ResultCategory::from_code(-2), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ResultCategory::WithinRange.label(), "Within range");
        assert_eq!(ResultCategory::NoTestCode.to_string(), "No test code (8)");
    }
}
