use chrono::{Local, NaiveDate};
use uuid::Uuid;

use kindred_matching::models::{Gender, SwipeAction, UserProfile};
use kindred_matching::profiles::{NewProfile, ProfilePatch};
use kindred_matching::store::{DailyPickStore, LedgerStore, MessageStore, UserStore};
use kindred_matching::testing::{embed_text, profile, Harness};
use kindred_shared::errors::ErrorCode;
use kindred_shared::types::event::routing_keys;

fn new_profile() -> NewProfile {
    NewProfile {
        name: "Maya".into(),
        date_of_birth: NaiveDate::from_ymd_opt(1995, 5, 17).unwrap(),
        gender: "woman".into(),
        bio: "Weekend climber.".into(),
        looking_for: vec!["everyone".into()],
        age_min: 25,
        age_max: 40,
        interests: vec!["climbing".into(), "coffee".into(), "climbing".into()],
        photos: vec!["photos/maya-1.jpg".into(), "https://img.test/maya-2.jpg".into()],
        location: None,
        max_distance: None,
    }
}

async fn matched_pair(h: &Harness) -> (UserProfile, UserProfile, Uuid) {
    let a = h.add(profile(Gender::Woman, 29, &[Gender::Man])).await;
    let b = h.add(profile(Gender::Man, 31, &[Gender::Woman])).await;
    h.engine.swipes.record_swipe(a.id, b.id, SwipeAction::Like).await.unwrap();
    let outcome = h.engine.swipes.record_swipe(b.id, a.id, SwipeAction::Like).await.unwrap();
    (a, b, outcome.match_id.unwrap())
}

#[tokio::test]
async fn created_profile_is_embedded_and_normalized() {
    let h = Harness::new();
    let id = Uuid::new_v4();
    let created = h.engine.profiles.create_profile(id, new_profile()).await.unwrap();

    assert_eq!(created.looking_for, vec![Gender::Woman, Gender::Man]);
    assert_eq!(created.interests, vec!["climbing".to_string(), "coffee".to_string()]);
    assert_eq!(
        created.photos,
        vec![
            "https://cdn.test/photos/maya-1.jpg".to_string(),
            "https://img.test/maya-2.jpg".to_string(),
        ]
    );
    assert_eq!(
        h.embedder.texts(),
        vec!["Weekend climber. Interests: climbing, coffee".to_string()]
    );

    let stored = h.users.get(id).await.unwrap().unwrap();
    assert_eq!(
        stored.embedding,
        Some(embed_text("Weekend climber. Interests: climbing, coffee"))
    );
    assert_eq!(stored.photos[0], "photos/maya-1.jpg", "stored refs stay unresolved");
}

#[tokio::test]
async fn embedding_failure_aborts_creation() {
    let h = Harness::new();
    h.embedder.set_failing(true);
    let id = Uuid::new_v4();

    let err = h.engine.profiles.create_profile(id, new_profile()).await.unwrap_err();
    assert!(err.is(ErrorCode::ProviderError));
    assert!(h.users.get(id).await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_profiles_are_rejected() {
    let h = Harness::new();

    let mut minor = new_profile();
    minor.date_of_birth = Local::now().date_naive() - chrono::Duration::days(365 * 16);
    let err = h.engine.profiles.create_profile(Uuid::new_v4(), minor).await.unwrap_err();
    assert!(err.is(ErrorCode::InvalidProfile));

    let mut nobody = new_profile();
    nobody.looking_for.clear();
    let err = h.engine.profiles.create_profile(Uuid::new_v4(), nobody).await.unwrap_err();
    assert!(err.is(ErrorCode::ValidationError));

    let mut inverted = new_profile();
    inverted.age_min = 50;
    inverted.age_max = 30;
    let err = h.engine.profiles.create_profile(Uuid::new_v4(), inverted).await.unwrap_err();
    assert!(err.is(ErrorCode::ValidationError));

    let mut unknown = new_profile();
    unknown.gender = "robot".into();
    let err = h.engine.profiles.create_profile(Uuid::new_v4(), unknown).await.unwrap_err();
    assert!(err.is(ErrorCode::ValidationError));

    assert!(h.embedder.texts().is_empty(), "no embedding is requested for rejected input");
}

#[tokio::test]
async fn duplicate_profile_is_rejected() {
    let h = Harness::new();
    let id = Uuid::new_v4();
    h.engine.profiles.create_profile(id, new_profile()).await.unwrap();
    let err = h.engine.profiles.create_profile(id, new_profile()).await.unwrap_err();
    assert!(err.is(ErrorCode::InvalidProfile));
}

#[tokio::test]
async fn bio_change_requests_refresh_but_name_change_does_not() {
    let h = Harness::new();
    let id = Uuid::new_v4();
    h.engine.profiles.create_profile(id, new_profile()).await.unwrap();

    let renamed = h
        .engine
        .profiles
        .update_profile(id, ProfilePatch { name: Some("Maya R.".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(renamed.name, "Maya R.");
    assert!(h.refresher.requests().is_empty());

    h.engine
        .profiles
        .update_profile(id, ProfilePatch { bio: Some("Trail runner.".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(h.refresher.requests(), vec![id]);

    let keys = h.events.routing_keys();
    assert_eq!(keys.last(), Some(&routing_keys::USER_PROFILE_UPDATED));
}

#[tokio::test]
async fn zero_max_distance_clears_the_limit() {
    let h = Harness::new();
    let id = Uuid::new_v4();
    let mut input = new_profile();
    input.max_distance = Some(25.0);
    h.engine.profiles.create_profile(id, input).await.unwrap();

    let updated = h
        .engine
        .profiles
        .update_profile(id, ProfilePatch { max_distance: Some(0.0), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(updated.max_distance, None);
}

#[tokio::test]
async fn updating_unknown_user_is_not_found() {
    let h = Harness::new();
    let err = h
        .engine
        .profiles
        .update_profile(Uuid::new_v4(), ProfilePatch::default())
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::UserNotFound));
}

#[tokio::test]
async fn matches_list_shows_the_other_user_newest_first() {
    let h = Harness::new();
    let me = h.add(profile(Gender::Woman, 29, &[Gender::Man])).await;
    let mut others = Vec::new();
    for _ in 0..3 {
        let other = h.add(profile(Gender::Man, 30, &[Gender::Woman])).await;
        h.engine.swipes.record_swipe(other.id, me.id, SwipeAction::Like).await.unwrap();
        h.engine.swipes.record_swipe(me.id, other.id, SwipeAction::Like).await.unwrap();
        others.push(other.id);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let listed = h.engine.matches.matches_for(me.id).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|m| m.user.id).collect();
    others.reverse();
    assert_eq!(ids, others);
}

#[tokio::test]
async fn match_details_are_participant_only() {
    let h = Harness::new();
    let (a, b, match_id) = matched_pair(&h).await;
    let stranger = h.add(profile(Gender::Man, 40, &[Gender::Woman])).await;

    let details = h.engine.matches.match_with_users(match_id, a.id).await.unwrap();
    assert_eq!(details.record.id, match_id);
    let ids = [details.user1.id, details.user2.id];
    assert!(ids.contains(&a.id) && ids.contains(&b.id));

    let err = h.engine.matches.match_with_users(match_id, stranger.id).await.unwrap_err();
    assert!(err.is(ErrorCode::NotMatchParticipant));
    let err = h.engine.matches.match_with_users(Uuid::new_v4(), a.id).await.unwrap_err();
    assert!(err.is(ErrorCode::MatchNotFound));
}

#[tokio::test]
async fn likes_received_excludes_people_already_answered() {
    let h = Harness::new();
    let me = h.add(profile(Gender::Woman, 29, &[Gender::Man])).await;
    let pending = h.add(profile(Gender::Man, 30, &[Gender::Woman])).await;
    let answered = h.add(profile(Gender::Man, 32, &[Gender::Woman])).await;
    h.engine.swipes.record_swipe(pending.id, me.id, SwipeAction::Like).await.unwrap();
    h.engine.swipes.record_swipe(answered.id, me.id, SwipeAction::Like).await.unwrap();
    h.engine.swipes.record_swipe(me.id, answered.id, SwipeAction::Reject).await.unwrap();

    let likes = h.engine.matches.likes_received(me.id).await.unwrap();
    let ids: Vec<_> = likes.iter().map(|l| l.user.id).collect();
    assert_eq!(ids, vec![pending.id]);
}

#[tokio::test]
async fn chat_flow_between_participants() {
    let h = Harness::new();
    let (a, b, match_id) = matched_pair(&h).await;
    let chat = &h.engine.chat;

    let sent = chat.send_message(match_id, a.id, "  hi there  ").await.unwrap();
    assert_eq!(sent.content, "hi there");
    assert!(!sent.read);
    chat.send_message(match_id, a.id, "free this weekend?").await.unwrap();

    assert_eq!(chat.unread_count(b.id).await.unwrap(), 2);
    assert_eq!(chat.unread_count(a.id).await.unwrap(), 0);

    let conversations = chat.conversations(b.id).await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].user.id, a.id);
    assert_eq!(conversations[0].unread_count, 2);
    assert_eq!(
        conversations[0].last_message.as_ref().map(|m| m.content.as_str()),
        Some("free this weekend?")
    );

    assert_eq!(chat.mark_as_read(match_id, b.id).await.unwrap(), 2);
    assert_eq!(chat.unread_count(b.id).await.unwrap(), 0);

    let history = chat.list_messages(match_id, b.id).await.unwrap();
    let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hi there", "free this weekend?"]);
}

#[tokio::test]
async fn outsiders_and_empty_messages_are_rejected_before_writing() {
    let h = Harness::new();
    let (a, _, match_id) = matched_pair(&h).await;
    let stranger = h.add(profile(Gender::Man, 40, &[Gender::Woman])).await;
    let chat = &h.engine.chat;

    let err = chat.send_message(match_id, stranger.id, "hello").await.unwrap_err();
    assert!(err.is(ErrorCode::NotMatchParticipant));
    let err = chat.send_message(match_id, a.id, "   ").await.unwrap_err();
    assert!(err.is(ErrorCode::EmptyMessage));
    let err = chat.send_message(Uuid::new_v4(), a.id, "hello").await.unwrap_err();
    assert!(err.is(ErrorCode::MatchNotFound));
    let err = chat.list_messages(match_id, stranger.id).await.unwrap_err();
    assert!(err.is(ErrorCode::NotMatchParticipant));

    assert!(h.messages.list(match_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_user_cascades() {
    let h = Harness::new();
    let (a, b, match_id) = matched_pair(&h).await;
    let c = h.add(profile(Gender::Man, 35, &[Gender::Woman])).await;
    h.engine.swipes.record_swipe(c.id, a.id, SwipeAction::Like).await.unwrap();
    h.engine.chat.send_message(match_id, b.id, "hey").await.unwrap();
    h.engine.daily_picks.generate(a.id).await.unwrap();

    let summary = h.engine.profiles.delete_user(a.id).await.unwrap();
    assert_eq!(summary.swipes_deleted, 3);
    assert_eq!(summary.matches_deleted, 1);
    assert_eq!(summary.messages_deleted, 1);
    assert!(summary.daily_picks_deleted);

    assert!(h.users.get(a.id).await.unwrap().is_none());
    assert!(h.ledger.get_match(match_id).await.unwrap().is_none());
    assert!(h.messages.list(match_id).await.unwrap().is_empty());
    assert!(h.picks.get(a.id).await.unwrap().is_none());
    assert_eq!(h.ledger.swipe_count().await, 0);
    assert!(h.users.get(b.id).await.unwrap().is_some());

    let deleted = h
        .events
        .published()
        .into_iter()
        .find(|(key, _, _)| *key == routing_keys::USER_DELETED)
        .unwrap();
    assert_eq!(deleted.1, Some(a.id));

    let err = h.engine.profiles.delete_user(a.id).await.unwrap_err();
    assert!(err.is(ErrorCode::UserNotFound));
}

#[tokio::test]
async fn seeded_demo_likes_show_up_as_likes_received() {
    let h = Harness::new();
    let target = h.add(profile(Gender::Man, 29, &[Gender::Woman])).await;

    let seeded = h.engine.profiles.seed_demo_profiles().await.unwrap();
    assert_eq!(seeded.created.len(), 10);
    assert!(seeded.skipped.is_empty());

    let first = h.engine.swipes.seed_demo_likes(target.id, Some(2)).await.unwrap();
    assert_eq!(first.likes_created, 2);
    assert_eq!(first.target_name, target.name);
    let likes = h.engine.matches.likes_received(target.id).await.unwrap();
    assert_eq!(likes.len(), 2);
    for like in &likes {
        assert!(like.user.is_demo);
        assert!(first.liked_by.contains(&like.user.name));
    }

    // Only the five demo women who accept a 29-year-old man qualify.
    let all = h.engine.swipes.seed_demo_likes(target.id, None).await.unwrap();
    assert_eq!(all.likes_created, 5);
    let likes = h.engine.matches.likes_received(target.id).await.unwrap();
    assert_eq!(likes.len(), 5);
    assert!(likes.iter().all(|l| l.user.gender == Gender::Woman));
}

#[tokio::test]
async fn demo_likes_need_demo_users_and_a_known_target() {
    let h = Harness::new();
    let target = h.add(profile(Gender::Man, 29, &[Gender::Woman])).await;

    let err = h.engine.swipes.seed_demo_likes(target.id, None).await.unwrap_err();
    assert!(err.is(ErrorCode::NotFound));

    h.engine.profiles.seed_demo_profiles().await.unwrap();
    let err = h.engine.swipes.seed_demo_likes(Uuid::new_v4(), None).await.unwrap_err();
    assert!(err.is(ErrorCode::UserNotFound));
}

#[tokio::test]
async fn demo_profiles_without_embeddings_are_skipped() {
    let h = Harness::new();
    h.embedder.set_failing(true);

    let seeded = h.engine.profiles.seed_demo_profiles().await.unwrap();
    assert!(seeded.created.is_empty());
    assert_eq!(seeded.skipped.len(), 10);
    assert!(seeded.skipped.contains(&"Sophia".to_string()));
}

#[tokio::test]
async fn clearing_demo_profiles_cascades_and_keeps_real_users() {
    let h = Harness::new();
    let target = h.add(profile(Gender::Man, 29, &[Gender::Woman])).await;
    let seeded = h.engine.profiles.seed_demo_profiles().await.unwrap();
    h.engine.swipes.seed_demo_likes(target.id, None).await.unwrap();

    let cleanup = h.engine.profiles.clear_demo_profiles().await.unwrap();
    assert_eq!(cleanup.deleted, seeded.created.len() as u64);

    assert!(h.users.get(target.id).await.unwrap().is_some());
    for id in &seeded.created {
        assert!(h.users.get(*id).await.unwrap().is_none());
    }
    assert!(h.engine.matches.likes_received(target.id).await.unwrap().is_empty());
    assert_eq!(h.ledger.swipe_count().await, 0);
}
