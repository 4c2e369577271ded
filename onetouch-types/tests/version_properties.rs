//! Property tests for the version tuple -> platform identity mapping.

use onetouch_types::BuildVersion;
use proptest::prelude::*;

fn arb_version() -> impl Strategy<Value = BuildVersion> {
    (0u32..2100, 0u32..100, 0u32..100, 0u32..100)
        .prop_map(|(major, minor, patch, build)| BuildVersion::new(major, minor, patch, build))
}

proptest! {
    /// Distinct bounded tuples never share a version code.
    #[test]
    fn version_code_is_injective(a in arb_version(), b in arb_version()) {
        prop_assume!(a != b);
        prop_assert_ne!(a.version_code(), b.version_code());
    }

    /// Version codes increase with the lexicographic tuple order.
    #[test]
    fn version_code_is_monotonic(a in arb_version(), b in arb_version()) {
        prop_assume!(a < b);
        prop_assert!(a.version_code() < b.version_code());
    }

    /// Every bounded tuple passes validation.
    #[test]
    fn bounded_tuples_validate(v in arb_version()) {
        prop_assert!(v.validate().is_ok());
    }

    /// The human-readable name only depends on major/minor/patch.
    #[test]
    fn version_name_ignores_build(v in arb_version(), build in 0u32..100) {
        let other = BuildVersion::new(v.major, v.minor, v.patch, build);
        prop_assert_eq!(v.version_name(), other.version_name());
    }
}

#[test]
fn scenario_a_version_mapping() {
    let v = BuildVersion::new(1, 2, 3, 4);
    assert_eq!(v.version_code(), 1_020_304);
    assert_eq!(v.version_name(), "1.2.3");
}
