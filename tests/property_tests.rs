//! Property-based tests for the harness
//!
//! These tests use proptest to verify invariants across many randomly
//! generated inputs, catching edge cases that hand-written tests might miss.

use proptest::prelude::*;
use ymut::coverage::CoverageCache;
use ymut::harness::{HarnessPaths, HostEnvironment, SuiteConfig, assert_key_equal};
use ymut::{ResultBag, Value};

// =============================================================================
// Coverage cache properties
// =============================================================================

proptest! {
    /// Property: merging the same (library, profile) pairs twice changes nothing the second time
    #[test]
    fn cache_merge_is_idempotent(pairs in prop::collection::vec(("lib[a-c]", "[a-z]{1,6}\\.profraw"), 0..20)) {
        let mut once = CoverageCache::new();
        for (lib, profile) in &pairs {
            once.merge(lib, profile);
        }
        let mut twice = once.clone();
        for (lib, profile) in &pairs {
            prop_assert!(!twice.merge(lib, profile));
        }
        prop_assert_eq!(&once, &twice);
    }

    /// Property: a saved cache loads back unchanged
    #[test]
    fn cache_survives_a_json_trip(pairs in prop::collection::vec(("lib[a-c]", "[a-z]{1,6}\\.profraw"), 0..10)) {
        let mut cache = CoverageCache::new();
        for (lib, profile) in &pairs {
            cache.merge(lib, profile);
        }
        let text = serde_json::to_string(&cache).unwrap();
        prop_assert_eq!(CoverageCache::from_json(&text).unwrap(), cache);
    }
}

// =============================================================================
// Environment properties
// =============================================================================

proptest! {
    /// Property: registering a suite again adds no search paths or defines
    #[test]
    fn suite_registration_is_idempotent(filepath in "[a-z]{1,4}(/[a-z]{1,4}){0,2}", filename in "[a-z]{1,8}") {
        let paths = HarnessPaths::new("/p/unittests", "/p", "/p/unittests/build");
        let config = SuiteConfig::new(filepath, filename);
        let mut env = HostEnvironment::new();
        env.register_suite(&paths, &config).unwrap();
        let snapshot = (env.include_paths().to_vec(), env.library_paths().to_vec(), env.defines().to_vec());
        env.register_suite(&paths, &config).unwrap();
        prop_assert_eq!(snapshot, (env.include_paths().to_vec(), env.library_paths().to_vec(), env.defines().to_vec()));
        prop_assert_eq!(env.library_paths().len(), 1);
    }

    /// Property: the library file name always embeds the dotted target
    #[test]
    fn library_name_embeds_target(filepath in "[a-z]{1,4}(/[a-z]{1,4}){0,2}", filename in "[a-z]{1,8}") {
        let config = SuiteConfig::new(filepath, filename);
        let expected = format!("{}-unittest", config.target_name());
        prop_assert!(config.library_file_name().contains(&expected));
    }
}

// =============================================================================
// Verification properties
// =============================================================================

proptest! {
    /// Property: an int only ever equals the same int, never a float of the same magnitude
    #[test]
    fn int_equality_is_variant_strict(n in any::<i32>()) {
        let bag = ResultBag::new().with("k", n);
        prop_assert!(assert_key_equal(&bag, "k", &Value::Int(i64::from(n)), None).is_ok());
        prop_assert!(assert_key_equal(&bag, "k", &Value::Float(f64::from(n)), None).is_err());
    }
}
