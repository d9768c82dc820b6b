use crate::models::UserProfile;

use super::distance::is_within_distance;

/// Whether two users may be shown to each other. Gender, age and distance
/// must hold in both directions.
pub fn are_compatible(a: &UserProfile, b: &UserProfile) -> bool {
    accepts(a, b) && accepts(b, a)
}

fn accepts(viewer: &UserProfile, target: &UserProfile) -> bool {
    viewer.looking_for.contains(&target.gender)
        && viewer.age_range.contains(target.age)
        && is_within_distance(
            viewer.location.as_ref(),
            target.location.as_ref(),
            viewer.max_distance,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgeRange, Gender, Location};
    use crate::testing::profile;
    use proptest::prelude::*;

    #[test]
    fn mutual_preferences_are_compatible() {
        let a = profile(Gender::Woman, 28, &[Gender::Man]);
        let b = profile(Gender::Man, 30, &[Gender::Woman]);
        assert!(are_compatible(&a, &b));
    }

    #[test]
    fn one_sided_gender_preference_is_not_enough() {
        let a = profile(Gender::Woman, 28, &[Gender::Man]);
        let b = profile(Gender::Man, 30, &[Gender::Man]);
        assert!(!are_compatible(&a, &b));
    }

    #[test]
    fn age_checked_both_ways() {
        let mut a = profile(Gender::Woman, 28, &[Gender::Man]);
        let b = profile(Gender::Man, 45, &[Gender::Woman]);
        a.age_range = AgeRange::new(25, 35).unwrap();
        assert!(!are_compatible(&a, &b));
        assert!(!are_compatible(&b, &a));
    }

    #[test]
    fn distance_limit_excludes_far_users() {
        let mut a = profile(Gender::Woman, 28, &[Gender::Man]);
        a.location = Some(Location::new(37.78, -122.40));
        a.max_distance = Some(10.0);
        let mut b = profile(Gender::Man, 30, &[Gender::Woman]);
        b.location = Some(Location::new(38.5037, -122.40));
        assert!(!are_compatible(&a, &b));

        b.location = None;
        assert!(are_compatible(&a, &b), "missing location never excludes");
    }

    fn gender() -> impl Strategy<Value = Gender> {
        prop_oneof![Just(Gender::Woman), Just(Gender::Man)]
    }

    fn looking_for() -> impl Strategy<Value = Vec<Gender>> {
        prop_oneof![
            Just(vec![Gender::Woman]),
            Just(vec![Gender::Man]),
            Just(vec![Gender::Woman, Gender::Man]),
        ]
    }

    fn location() -> impl Strategy<Value = Option<Location>> {
        proptest::option::of((-60.0f64..60.0, -180.0f64..180.0).prop_map(|(lat, lng)| Location::new(lat, lng)))
    }

    prop_compose! {
        fn arb_profile()(
            gender in gender(),
            looking_for in looking_for(),
            age in 18u32..=99,
            lo in 18u32..=99,
            span in 0u32..=40,
            location in location(),
            max_distance in proptest::option::of(0.0f64..3000.0),
        ) -> UserProfile {
            let mut p = profile(gender, age, &looking_for);
            p.age_range = AgeRange::new(lo, (lo + span).min(99).max(lo)).unwrap();
            p.location = location;
            p.max_distance = max_distance;
            p
        }
    }

    proptest! {
        #[test]
        fn compatibility_is_symmetric(a in arb_profile(), b in arb_profile()) {
            prop_assert_eq!(are_compatible(&a, &b), are_compatible(&b, &a));
        }

        #[test]
        fn missing_location_never_excludes(
            a in arb_profile(),
            b in arb_profile(),
            limit in 0.0f64..50.0,
        ) {
            let mut a = a;
            let mut b = b;
            a.max_distance = Some(limit);
            b.location = None;
            let expected = a.looking_for.contains(&b.gender)
                && b.looking_for.contains(&a.gender)
                && a.age_range.contains(b.age)
                && b.age_range.contains(a.age);
            prop_assert_eq!(are_compatible(&a, &b), expected);
        }
    }
}
