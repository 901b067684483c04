//! Manifest parsing and validation properties.

use proptest::prelude::*;

use stratus::Manifest;

proptest! {
    /// Arbitrary input never panics the manifest parser.
    #[test]
    fn parse_never_panics(input in "\\PC*") {
        let _ = Manifest::parse(&input);
    }

    /// The password policy floor is exactly min_length >= 8 when the
    /// character-class requirements are left at their defaults.
    #[test]
    fn password_floor_is_min_length_8(min_length in 0u32..=32) {
        let manifest = Manifest::parse(&format!(
            "units = [\"identity\"]\n\n[identity.password_policy]\nmin_length = {min_length}\n"
        )).expect("parses");
        prop_assert_eq!(manifest.validate().is_ok(), min_length >= 8);
    }
}
