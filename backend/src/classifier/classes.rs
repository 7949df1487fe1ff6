/// Fixed class table for the distraction classifier. Index positions are
/// semantically fixed by the training data and must not be reordered.
pub const NUM_CLASSES: usize = 10;

pub const CLASS_LABELS: [&str; NUM_CLASSES] = [
    "safe driving",
    "texting - right",
    "talking on the phone - right",
    "texting - left",
    "talking on the phone - left",
    "operating the radio",
    "drinking",
    "reaching behind",
    "hair and makeup",
    "talking to passenger",
];

pub fn label_name(index: usize) -> &'static str {
    CLASS_LABELS.get(index).copied().unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_ten_fixed_positions() {
        assert_eq!(CLASS_LABELS.len(), 10);
        assert_eq!(label_name(0), "safe driving");
        assert_eq!(label_name(7), "reaching behind");
    }

    #[test]
    fn out_of_range_index_is_unknown() {
        assert_eq!(label_name(10), "unknown");
    }
}
