//! Demo accounts for local and staging environments.

use chrono::{Months, NaiveDate};
use futures_lite::StreamExt;
use serde::Serialize;

use kindred_shared::errors::AppResult;

use crate::models::{Location, UserId, UserProfile};
use crate::profiles::NewProfile;
use crate::store::UserStore;

struct DemoSeed {
    name: &'static str,
    age: u32,
    gender: &'static str,
    bio: &'static str,
    looking_for: &'static [&'static str],
    age_range: (u32, u32),
    interests: &'static [&'static str],
    location: (f64, f64),
    max_distance: Option<f64>,
}

const DEMO_SEEDS: &[DemoSeed] = &[
    DemoSeed {
        name: "Sophia",
        age: 26,
        gender: "woman",
        bio: "Yoga teacher who spends weekends hiking the coast with a camera.",
        looking_for: &["man", "woman"],
        age_range: (24, 35),
        interests: &["Yoga", "Photography", "Hiking", "Travel", "Coffee"],
        location: (37.7858, -122.4064),
        max_distance: Some(10.0),
    },
    DemoSeed {
        name: "Luna",
        age: 24,
        gender: "woman",
        bio: "Gallery curator and amateur baker. Farmers market every Saturday.",
        looking_for: &["man", "woman"],
        age_range: (22, 30),
        interests: &["Art", "Wine", "Cooking", "Movies"],
        location: (37.7879, -122.4074),
        max_distance: Some(25.0),
    },
    DemoSeed {
        name: "Aria",
        age: 27,
        gender: "woman",
        bio: "Pastry chef saving up for a tiny cafe. I host too many dinner parties.",
        looking_for: &["man"],
        age_range: (25, 38),
        interests: &["Cooking", "Travel", "Wine", "Nature"],
        location: (37.7849, -122.4094),
        max_distance: Some(50.0),
    },
    DemoSeed {
        name: "Mia",
        age: 25,
        gender: "woman",
        bio: "Physical therapist. Trail running by day, movie marathons by night.",
        looking_for: &["man"],
        age_range: (24, 34),
        interests: &["Fitness", "Yoga", "Sports", "Movies", "Beach"],
        location: (37.7899, -122.4044),
        max_distance: Some(100.0),
    },
    DemoSeed {
        name: "Zoe",
        age: 23,
        gender: "woman",
        bio: "Graphic designer, vinyl collector and aspiring DJ.",
        looking_for: &["man", "woman"],
        age_range: (21, 30),
        interests: &["Art", "Music", "Fashion", "Dancing"],
        location: (37.7949, -122.3994),
        max_distance: None,
    },
    DemoSeed {
        name: "Marcus",
        age: 29,
        gender: "man",
        bio: "Software engineer who climbs before work and cooks ramen from scratch.",
        looking_for: &["woman"],
        age_range: (23, 34),
        interests: &["Climbing", "Cooking", "Coffee", "Hiking"],
        location: (37.7799, -122.4144),
        max_distance: Some(25.0),
    },
    DemoSeed {
        name: "James",
        age: 31,
        gender: "man",
        bio: "Jazz pianist and part-time teacher. Looking for someone to share late shows with.",
        looking_for: &["woman"],
        age_range: (25, 36),
        interests: &["Music", "Reading", "Wine", "Travel"],
        location: (37.7749, -122.4194),
        max_distance: Some(50.0),
    },
    DemoSeed {
        name: "Ethan",
        age: 27,
        gender: "man",
        bio: "Marine biologist. Happiest on a boat or a surfboard.",
        looking_for: &["woman", "man"],
        age_range: (22, 33),
        interests: &["Beach", "Nature", "Fitness", "Photography"],
        location: (37.7699, -122.4294),
        max_distance: None,
    },
    DemoSeed {
        name: "Noah",
        age: 33,
        gender: "man",
        bio: "Architect with a soft spot for old bookshops and long bike rides.",
        looking_for: &["woman"],
        age_range: (26, 38),
        interests: &["Art", "Reading", "Cycling", "Coffee"],
        location: (37.7599, -122.4194),
        max_distance: Some(10.0),
    },
    DemoSeed {
        name: "Alexander",
        age: 30,
        gender: "man",
        bio: "Chef turned food writer. I will plan the whole trip around dinner.",
        looking_for: &["woman", "man"],
        age_range: (24, 36),
        interests: &["Cooking", "Travel", "Wine", "Yoga"],
        location: (37.7549, -122.4144),
        max_distance: Some(100.0),
    },
];

fn slug(name: &str) -> String {
    name.to_lowercase()
}

/// The demo profiles as creation requests, with birthdays `age` years
/// before `today`.
pub fn demo_profiles(today: NaiveDate) -> Vec<NewProfile> {
    DEMO_SEEDS
        .iter()
        .map(|seed| NewProfile {
            name: seed.name.to_string(),
            date_of_birth: today
                .checked_sub_months(Months::new(seed.age * 12))
                .unwrap_or(today),
            gender: seed.gender.to_string(),
            bio: seed.bio.to_string(),
            looking_for: seed.looking_for.iter().map(|s| s.to_string()).collect(),
            age_min: seed.age_range.0,
            age_max: seed.age_range.1,
            interests: seed.interests.iter().map(|s| s.to_string()).collect(),
            photos: (1..=3)
                .map(|n| format!("demo/{}-{n}.jpg", slug(seed.name)))
                .collect(),
            location: Some(Location::new(seed.location.0, seed.location.1)),
            max_distance: seed.max_distance,
        })
        .collect()
}

/// Every stored demo account, in store order.
pub async fn demo_users(users: &dyn UserStore) -> AppResult<Vec<UserProfile>> {
    let mut found = Vec::new();
    let mut population = users.stream_all();
    while let Some(profile) = population.next().await {
        let profile = profile?;
        if profile.is_demo {
            found.push(profile);
        }
    }
    Ok(found)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DemoSeedSummary {
    pub created: Vec<UserId>,
    /// Names whose embedding could not be generated.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeededLikes {
    pub likes_created: usize,
    pub target_name: String,
    pub liked_by: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DemoCleanup {
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::age_on;
    use validator::Validate;

    #[test]
    fn demo_profiles_are_valid_adults() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        let profiles = demo_profiles(today);
        assert_eq!(profiles.len(), DEMO_SEEDS.len());
        for (p, seed) in profiles.iter().zip(DEMO_SEEDS) {
            assert!(p.validate().is_ok(), "{} failed validation", p.name);
            assert_eq!(age_on(p.date_of_birth, today), seed.age);
            assert!(p.age_min <= p.age_max);
        }
    }
}
