use std::cmp::Ordering;

/// Order two identifiers the way a listing should present them.
///
/// Identifiers that both parse as unsigned integers compare numerically, so
/// `"2"` sorts before `"10"`. Numeric identifiers sort before non-numeric
/// ones, and non-numeric identifiers (ObjectId hex) compare lexically.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sort `items` in place by the identifier returned from `id`.
pub fn sort_by_id<T, F>(items: &mut [T], id: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| compare_ids(id(a), id(b)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn numeric_ids_sort_numerically() {
        let mut ids = vec!["10", "2", "1", "33"];
        sort_by_id(&mut ids, |s| s);
        assert_eq!(ids, vec!["1", "2", "10", "33"]);
    }

    #[test]
    fn hex_ids_sort_lexically() {
        let mut ids = vec!["682996bc78d219298228c10a", "67bc5c4f1e8db0c9a17efca0"];
        sort_by_id(&mut ids, |s| s);
        assert_eq!(ids[0], "67bc5c4f1e8db0c9a17efca0");
    }

    #[test]
    fn numeric_before_non_numeric() {
        assert_eq!(compare_ids("99", "abc"), Ordering::Less);
        assert_eq!(compare_ids("abc", "99"), Ordering::Greater);
    }

    #[test]
    fn leading_zeros_still_total() {
        assert_eq!(compare_ids("01", "1"), Ordering::Less);
        assert_eq!(compare_ids("1", "1"), Ordering::Equal);
    }

    proptest! {
        #[test]
        fn numeric_order_matches_integer_order(a in 0u64..1_000_000, b in 0u64..1_000_000) {
            prop_assert_eq!(compare_ids(&a.to_string(), &b.to_string()), a.cmp(&b));
        }

        #[test]
        fn ordering_is_antisymmetric(a in "[0-9a-f]{1,8}", b in "[0-9a-f]{1,8}") {
            prop_assert_eq!(compare_ids(&a, &b), compare_ids(&b, &a).reverse());
        }
    }
}
