use std::collections::HashSet;

use chrono::{FixedOffset, TimeZone, Utc};

use kindred_matching::config::MatchingSettings;
use kindred_matching::matching::compatibility::are_compatible;
use kindred_matching::matching::daily_picks::PickAction;
use kindred_matching::models::{Gender, Location, PickStatus, SwipeAction, SwipeOutcome};
use kindred_matching::store::{DailyPickStore, LedgerStore, UserStore};
use kindred_matching::testing::{embed_text, profile, Harness};
use kindred_shared::errors::ErrorCode;

fn woman() -> kindred_matching::models::UserProfile {
    profile(Gender::Woman, 29, &[Gender::Man])
}

fn man() -> kindred_matching::models::UserProfile {
    profile(Gender::Man, 31, &[Gender::Woman])
}

#[tokio::test]
async fn straightforward_match() {
    let h = Harness::new();
    let a = h.add(woman()).await;
    let b = h.add(man()).await;

    let first = h.engine.swipes.record_swipe(a.id, b.id, SwipeAction::Like).await.unwrap();
    assert_eq!(first, SwipeOutcome::no_match());

    let second = h.engine.swipes.record_swipe(b.id, a.id, SwipeAction::Like).await.unwrap();
    assert!(second.matched);
    let match_id = second.match_id.unwrap();

    let found = h.engine.swipes.check_match(a.id, b.id).await.unwrap().unwrap();
    assert_eq!(found.id, match_id);
    let reversed = h.engine.swipes.check_match(b.id, a.id).await.unwrap().unwrap();
    assert_eq!(reversed.id, match_id);
}

#[tokio::test]
async fn reject_never_matches() {
    let h = Harness::new();
    let a = h.add(woman()).await;
    let b = h.add(man()).await;

    h.engine.swipes.record_swipe(a.id, b.id, SwipeAction::Like).await.unwrap();
    let outcome = h.engine.swipes.record_swipe(b.id, a.id, SwipeAction::Reject).await.unwrap();
    assert!(!outcome.matched);
    assert!(h.engine.swipes.check_match(a.id, b.id).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutual_likes_create_exactly_one_match() {
    let h = Harness::new();
    for _ in 0..25 {
        let a = h.add(woman()).await;
        let b = h.add(man()).await;

        let left = h.engine.swipes.clone();
        let right = h.engine.swipes.clone();
        let (x, y) = tokio::join!(
            tokio::spawn(async move { left.record_swipe(a.id, b.id, SwipeAction::Like).await }),
            tokio::spawn(async move { right.record_swipe(b.id, a.id, SwipeAction::Like).await }),
        );
        let (x, y) = (x.unwrap().unwrap(), y.unwrap().unwrap());

        assert_eq!(h.ledger.match_count_for_pair(a.id, b.id).await, 1);
        assert!(x.matched ^ y.matched, "exactly one side observes the match");
    }
}

#[tokio::test]
async fn strict_duplicate_fails_and_lenient_repeats_outcome() {
    let h = Harness::new();
    let a = h.add(woman()).await;
    let b = h.add(man()).await;

    h.engine.swipes.record_swipe(a.id, b.id, SwipeAction::Like).await.unwrap();
    let err = h
        .engine
        .swipes
        .record_swipe(a.id, b.id, SwipeAction::Like)
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::DuplicateSwipe));

    let once = h.engine.swipes.record_swipe_lenient(b.id, a.id, SwipeAction::Like).await.unwrap();
    let twice = h.engine.swipes.record_swipe_lenient(b.id, a.id, SwipeAction::Like).await.unwrap();
    assert!(once.matched);
    assert_eq!(once, twice);
    assert_eq!(h.ledger.swipe_count().await, 2);
}

#[tokio::test]
async fn distance_excludes_far_user_from_feed() {
    let h = Harness::new();
    let mut a = woman();
    a.location = Some(Location::new(37.78, -122.40));
    a.max_distance = Some(10.0);
    let mut b = man();
    b.location = Some(Location::new(38.5037, -122.40));
    let a = h.add(a).await;
    let b = h.add(b).await;

    assert!(!are_compatible(&a, &b));
    let feed = h.engine.feed.feed_for(a.id).await.unwrap();
    assert!(feed.iter().all(|c| c.profile.id != b.id));
}

#[tokio::test]
async fn missing_location_never_excludes() {
    let h = Harness::new();
    let mut a = woman();
    a.location = Some(Location::new(37.78, -122.40));
    a.max_distance = Some(1.0);
    let b = h.add(man()).await;
    let a = h.add(a).await;

    assert!(are_compatible(&a, &b));
    let feed = h.engine.feed.feed_for(a.id).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].distance, None);
}

#[tokio::test]
async fn feed_excludes_self_swiped_and_incompatible() {
    let h = Harness::new();
    let viewer = h.add(woman()).await;
    let swiped = h.add(man()).await;
    let wrong_gender = h.add(profile(Gender::Woman, 30, &[Gender::Man])).await;
    let mut too_old = man();
    too_old.age = 70;
    let mut picky = man();
    picky.age_range.min = 40;
    let too_old = h.add(too_old).await;
    let picky = h.add(picky).await;
    let fresh = h.add(man()).await;

    let mut narrow = viewer.clone();
    narrow.age_range.max = 50;
    h.users.update(&narrow).await.unwrap();

    h.engine.swipes.record_swipe(viewer.id, swiped.id, SwipeAction::Reject).await.unwrap();

    let feed = h.engine.feed.feed_for(viewer.id).await.unwrap();
    let ids: Vec<_> = feed.iter().map(|c| c.profile.id).collect();
    assert_eq!(ids, vec![fresh.id]);
    for excluded in [viewer.id, swiped.id, wrong_gender.id, too_old.id, picky.id] {
        assert!(!ids.contains(&excluded));
    }
}

#[tokio::test]
async fn feed_is_nearest_first_with_unknown_last() {
    let h = Harness::with_settings(MatchingSettings {
        feed_batch_size: 4,
        ..MatchingSettings::default()
    });
    let mut viewer = woman();
    viewer.location = Some(Location::new(40.0, -74.0));
    let viewer = h.add(viewer).await;

    let mut expected = Vec::new();
    for offset in [0.5, 0.1, 2.0, 0.3, 5.0, 1.0] {
        let mut p = man();
        p.location = Some(Location::new(40.0 + offset, -74.0));
        let p = h.add(p).await;
        expected.push((offset, p.id));
    }
    let unknown = h.add(man()).await;

    let feed = h.engine.feed.feed_for(viewer.id).await.unwrap();
    expected.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    let want: Vec<_> = expected.iter().take(4).map(|(_, id)| *id).collect();
    let got: Vec<_> = feed.iter().map(|c| c.profile.id).collect();
    assert_eq!(got, want);
    assert!(!got.contains(&unknown.id));
    assert!(feed.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!(feed.iter().all(|c| c.profile.embedding.is_none()));

    // With a bigger batch the unknown-distance user lands at the end.
    let wide = Harness::with_settings(MatchingSettings {
        feed_batch_size: 10,
        ..MatchingSettings::default()
    });
    let viewer = wide.add(viewer.clone()).await;
    let nowhere = wide.add(man()).await;
    let mut near = man();
    near.location = Some(Location::new(40.2, -74.0));
    let near = wide.add(near).await;
    let feed = wide.engine.feed.feed_for(viewer.id).await.unwrap();
    let got: Vec<_> = feed.iter().map(|c| c.profile.id).collect();
    assert_eq!(got, vec![near.id, nowhere.id]);
    assert_eq!(feed[1].distance, None);
}

#[tokio::test]
async fn unknown_viewer_gets_empty_feed() {
    let h = Harness::new();
    h.add(man()).await;
    assert!(h.engine.feed.feed_for(uuid::Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn daily_picks_are_capped_compatible_and_unswiped() {
    let h = Harness::new();
    let mut viewer = woman();
    viewer.interests = vec!["hiking".into(), "jazz".into()];
    viewer.embedding = Some(embed_text("hiking jazz"));
    let viewer = h.add(viewer).await;

    let swiped = h.add(man()).await;
    h.engine.swipes.record_swipe(viewer.id, swiped.id, SwipeAction::Reject).await.unwrap();
    h.add(profile(Gender::Woman, 30, &[Gender::Woman])).await;
    for _ in 0..5 {
        let mut p = man();
        p.interests = vec!["jazz".into()];
        h.add(p).await;
    }

    let set = h.engine.daily_picks.generate(viewer.id).await.unwrap();
    assert_eq!(set.picks.len(), 3);
    let distinct: HashSet<_> = set.picks.iter().map(|p| p.picked_user_id).collect();
    assert_eq!(distinct.len(), 3);
    for pick in &set.picks {
        assert_ne!(pick.picked_user_id, viewer.id);
        assert_ne!(pick.picked_user_id, swiped.id);
        let candidate = h.users.get(pick.picked_user_id).await.unwrap().unwrap();
        assert!(are_compatible(&viewer, &candidate));
        assert_eq!(pick.status, PickStatus::Pending);
        assert_eq!(pick.shared_interests, vec!["jazz".to_string()]);
        assert!(!pick.ai_explanation.is_empty());
    }
    assert!(set.picks.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(h.picks.get(viewer.id).await.unwrap(), Some(set));
}

#[tokio::test]
async fn daily_picks_empty_result_is_persisted() {
    let h = Harness::new();
    let viewer = h.add(woman()).await;
    h.add(profile(Gender::Woman, 33, &[Gender::Man])).await;

    let set = h.engine.daily_picks.generate(viewer.id).await.unwrap();
    assert!(set.picks.is_empty());
    assert!(set.expires_at > set.generated_at);
    assert_eq!(h.picks.get(viewer.id).await.unwrap(), Some(set.clone()));

    let view = h.engine.daily_picks.get_or_generate(viewer.id).await.unwrap();
    assert!(view.picks.is_empty());
    assert!(!view.all_reviewed);
    assert_eq!(view.generated_at, set.generated_at, "cached set is served, not regenerated");
}

#[tokio::test]
async fn daily_picks_require_embedding() {
    let h = Harness::new();
    let mut viewer = woman();
    viewer.embedding = None;
    let viewer = h.add(viewer).await;

    let err = h.engine.daily_picks.generate(viewer.id).await.unwrap_err();
    assert!(err.is(ErrorCode::NoEmbedding));
    assert!(h.picks.get(viewer.id).await.unwrap().is_none());
}

#[tokio::test]
async fn expiry_is_next_local_midnight() {
    let h = Harness::new();
    let viewer = h.add(woman()).await;
    let tz = FixedOffset::east_opt(2 * 3600).unwrap();
    let now = tz.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();

    let set = h.engine.daily_picks.generate_at(viewer.id, now).await.unwrap();
    assert_eq!(set.generated_at, now.with_timezone(&Utc));
    assert_eq!(set.expires_at, Utc.with_ymd_and_hms(2026, 3, 10, 22, 0, 0).unwrap());

    let before = Utc.with_ymd_and_hms(2026, 3, 10, 21, 59, 59).unwrap();
    assert!(h.engine.daily_picks.current_at(viewer.id, before).await.unwrap().is_some());
    assert!(h.engine.daily_picks.current_at(viewer.id, set.expires_at).await.unwrap().is_none());
}

#[tokio::test]
async fn expired_picks_still_accept_actions() {
    let h = Harness::new();
    let viewer = h.add(woman()).await;
    let candidate = h.add(man()).await;
    let yesterday = Utc::now() - chrono::Duration::days(2);
    let set = h.engine.daily_picks.generate_at(viewer.id, yesterday).await.unwrap();
    assert!(set.is_expired(Utc::now()));
    assert!(h.engine.daily_picks.current(viewer.id).await.unwrap().is_none());

    h.engine
        .daily_picks
        .act_on_pick(viewer.id, candidate.id, PickAction::Like)
        .await
        .unwrap();
    let stored = h.picks.get(viewer.id).await.unwrap().unwrap();
    assert_eq!(stored.picks[0].status, PickStatus::Liked);
    assert!(h.ledger.get_swipe(viewer.id, candidate.id).await.unwrap().is_some());
}

#[tokio::test]
async fn acting_on_a_pick_twice_is_idempotent() {
    let h = Harness::new();
    let viewer = h.add(woman()).await;
    let candidate = h.add(man()).await;
    let set = h.engine.daily_picks.generate(viewer.id).await.unwrap();
    assert_eq!(set.picks[0].picked_user_id, candidate.id);

    let first = h
        .engine
        .daily_picks
        .act_on_pick(viewer.id, candidate.id, PickAction::Like)
        .await
        .unwrap();
    let second = h
        .engine
        .daily_picks
        .act_on_pick(viewer.id, candidate.id, PickAction::Like)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(h.ledger.swipe_count().await, 1);

    let stored = h.picks.get(viewer.id).await.unwrap().unwrap();
    assert_eq!(stored.picks[0].status, PickStatus::Liked);
    assert!(stored.all_reviewed());
}

#[tokio::test]
async fn liking_a_pick_who_liked_back_matches() {
    let h = Harness::new();
    let viewer = h.add(woman()).await;
    let candidate = h.add(man()).await;
    h.engine.daily_picks.generate(viewer.id).await.unwrap();
    h.engine.swipes.record_swipe(candidate.id, viewer.id, SwipeAction::Like).await.unwrap();

    let outcome = h
        .engine
        .daily_picks
        .act_on_pick(viewer.id, candidate.id, PickAction::Like)
        .await
        .unwrap();
    assert!(outcome.matched);
    assert_eq!(h.ledger.match_count_for_pair(viewer.id, candidate.id).await, 1);
}

#[tokio::test]
async fn passing_a_pick_rejects_and_hides_from_feed() {
    let h = Harness::new();
    let viewer = h.add(woman()).await;
    let candidate = h.add(man()).await;
    h.engine.daily_picks.generate(viewer.id).await.unwrap();

    let outcome = h
        .engine
        .daily_picks
        .act_on_pick(viewer.id, candidate.id, PickAction::Pass)
        .await
        .unwrap();
    assert_eq!(outcome, SwipeOutcome::no_match());

    let swipe = h.ledger.get_swipe(viewer.id, candidate.id).await.unwrap().unwrap();
    assert_eq!(swipe.action, SwipeAction::Reject);
    assert!(h.engine.feed.feed_for(viewer.id).await.unwrap().is_empty());

    let view = h.engine.daily_picks.current(viewer.id).await.unwrap().unwrap();
    assert_eq!(view.picks[0].pick.status, PickStatus::Passed);
    assert!(view.all_reviewed);
}

#[tokio::test]
async fn acting_without_picks_or_on_unknown_pick_fails() {
    let h = Harness::new();
    let viewer = h.add(woman()).await;
    let stranger = h.add(man()).await;

    let err = h
        .engine
        .daily_picks
        .act_on_pick(viewer.id, stranger.id, PickAction::Like)
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::DailyPicksNotFound));

    h.engine.daily_picks.generate(viewer.id).await.unwrap();
    let err = h
        .engine
        .daily_picks
        .act_on_pick(viewer.id, uuid::Uuid::new_v4(), PickAction::Like)
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::PickNotFound));
    assert_eq!(h.ledger.swipe_count().await, 0);
}

#[tokio::test]
async fn explanation_failure_falls_back_without_failing_generation() {
    let chat = kindred_matching::testing::ScriptedChat::new().fail("timeout");
    let h = Harness::with_chat(chat);
    let viewer = h.add(woman()).await;
    h.add(man()).await;

    let set = h.engine.daily_picks.generate(viewer.id).await.unwrap();
    assert_eq!(set.picks.len(), 1);
    assert_eq!(
        set.picks[0].ai_explanation,
        kindred_matching::matching::explanation::PICK_FALLBACK
    );
}
