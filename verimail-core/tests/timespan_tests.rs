use proptest::prelude::*;
use std::time::Duration;
use verimail_core::{format_time_span, parse_time_span};

proptest! {
    #[test]
    fn formatted_spans_parse_back(secs in 0u64..(400 * 86_400), millis in 0u32..1_000) {
        let duration = Duration::from_secs(secs) + Duration::from_millis(u64::from(millis));
        let formatted = format_time_span(duration);
        prop_assert_eq!(parse_time_span(&formatted).unwrap(), duration);
    }
}
