use proptest::prelude::*;
use rust_decimal::Decimal;

use holdings_extractor::pipeline::processing::numeric::{format_grouped, normalize, NumberStyle};
use holdings_extractor::pipeline::processing::reconcile::accuracy;

proptest! {
    #[test]
    fn test_grouped_formats_normalize_back(units in 0i64..1_000_000_000_000, scale in 0u32..4) {
        let value = Decimal::new(units, scale);
        for style in NumberStyle::ALL {
            let text = format_grouped(value, style);
            prop_assert_eq!(normalize(&text), Some(value), "style {:?} rendered {}", style, text);
        }
    }

    #[test]
    fn test_accuracy_stays_in_unit_interval(extracted in 0i64..10_000_000_000, expected in 0i64..10_000_000_000) {
        let a = accuracy(Decimal::new(extracted, 2), Decimal::new(expected, 2));
        prop_assert!((0.0..=1.0).contains(&a));
        prop_assert_eq!(a, accuracy(Decimal::new(expected, 2), Decimal::new(extracted, 2)));
    }
}
