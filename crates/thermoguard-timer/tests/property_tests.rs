//! Property-based tests for timer construction.

#![cfg(test)]

use proptest::prelude::*;
use std::time::Duration;
use thermoguard_timer::prelude::*;
use thermoguard_timer::{MAX_NAME_LEN, MIN_NAME_LEN};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_name_length_decides_validity(name in "[a-z ]{0,64}") {
        let len = name.chars().count();
        let result = PeriodicTimer::new(name, Duration::from_millis(1), TimerPolicy::FailOpen, || Ok(()));
        prop_assert_eq!(result.is_ok(), (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len));
    }

    #[test]
    fn prop_new_timer_is_idle(millis in 0u64..10_000, fail_stop in any::<bool>()) {
        let policy = if fail_stop { TimerPolicy::FailStop } else { TimerPolicy::FailOpen };
        let timer = PeriodicTimer::new("prop timer", Duration::from_millis(millis), policy, || Ok(()))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(timer.phase(), TimerPhase::Idle);
        prop_assert_eq!(timer.fire_count(), 0);
        prop_assert_eq!(timer.policy(), policy);
        prop_assert!(!timer.is_running());
    }
}
