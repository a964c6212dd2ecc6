// Containment tests for parameter ranges

use blockbot::range::Range;

#[test]
fn test_closed_range_includes_both_endpoints() {
    let range = Range::closed(0.0, 100.0);
    assert!(range.contains(0.0));
    assert!(range.contains(100.0));
    assert!(range.contains(42.5));
    assert!(!range.contains(-0.1));
    assert!(!range.contains(100.1));
}

#[test]
fn test_open_range_excludes_both_endpoints() {
    let range = Range::open(0, 10);
    assert!(!range.contains(0));
    assert!(!range.contains(10));
    assert!(range.contains(1));
    assert!(range.contains(9));
}

#[test]
fn test_half_open_ranges() {
    let open_closed = Range::open_closed(0.0, 60.0);
    assert!(!open_closed.contains(0.0));
    assert!(open_closed.contains(60.0));

    let closed_open = Range::closed_open(0.0, 60.0);
    assert!(closed_open.contains(0.0));
    assert!(!closed_open.contains(60.0));
}

#[test]
fn test_inverted_range_contains_nothing() {
    let range = Range::closed(10, 0);
    assert!(range.is_empty());
    for value in -5..15 {
        assert!(!range.contains(value));
    }
}

#[test]
fn test_degenerate_ranges() {
    assert!(!Range::closed(5, 5).is_empty());
    assert!(Range::closed(5, 5).contains(5));
    assert!(Range::open(5, 5).is_empty());
    assert!(Range::closed_open(5, 5).is_empty());
}

#[test]
fn test_nan_is_never_contained() {
    assert!(!Range::closed(0.0, 1.0).contains(f64::NAN));
}

#[test]
fn test_display_uses_interval_notation() {
    assert_eq!(Range::open_closed(0, 60).to_string(), "(0, 60]");
    assert_eq!(Range::closed_open(1, 2).to_string(), "[1, 2)");
}
