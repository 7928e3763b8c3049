//! Tests for per-member overwrite synchronization and the AFK mover.

mod test_utils;

use coevoice_core::{CoevoiceConfig, Identifier, Overwrite, OverwriteSubject, Permissions, VoiceState};
use test_utils::{Call, engine, engine_with, fixture};

fn voice(user: &str, channel: Option<&str>, self_deaf: bool) -> VoiceState {
    VoiceState::new("g".into(), user.into(), channel.map(Identifier::from), false, self_deaf)
}

#[tokio::test]
async fn test_join_grants_exactly_one_overwrite() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "t")]);

    let outcome = engine.on_voice_state(voice("u", Some("v"), false)).await;

    assert_eq!(platform.calls(), vec![Call::set("t", "u")]);
    assert_eq!(outcome.granted(), &Some(Identifier::from("t")));
    assert!(platform.has_member_overwrite("t", "u"));
}

#[tokio::test]
async fn test_self_deafen_revokes_exactly_once() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "t")]);
    engine.on_voice_state(voice("u", Some("v"), false)).await;
    platform.clear_calls();

    engine.on_voice_state(voice("u", Some("v"), true)).await;

    assert_eq!(platform.overwrite_calls(), vec![Call::delete("t", "u")]);
    assert!(!platform.has_member_overwrite("t", "u"));
}

#[tokio::test]
async fn test_server_deafen_counts_as_deafened() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "t")]);
    engine.on_voice_state(voice("u", Some("v"), false)).await;
    platform.clear_calls();

    let state = VoiceState::new("g".into(), "u".into(), Some("v".into()), true, false);
    engine.on_voice_state(state).await;

    assert_eq!(platform.overwrite_calls(), vec![Call::delete("t", "u")]);
}

#[tokio::test]
async fn test_repeated_state_issues_no_calls() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "t")]);
    engine.on_voice_state(voice("u", Some("v"), false)).await;
    let overwrites = platform.overwrites("t");
    platform.clear_calls();

    let outcome = engine.on_voice_state(voice("u", Some("v"), false)).await;

    assert!(outcome.is_noop());
    assert!(platform.calls().is_empty());
    assert_eq!(platform.overwrites("t"), overwrites);
}

#[tokio::test]
async fn test_leaving_revokes_access() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "t")]);
    engine.on_voice_state(voice("u", Some("v"), false)).await;
    platform.clear_calls();

    engine.on_voice_state(voice("u", None, false)).await;

    assert_eq!(platform.calls(), vec![Call::delete("t", "u")]);
}

#[tokio::test]
async fn test_moving_between_links_swaps_access() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "t"), ("v2", "t2")]);
    engine.on_voice_state(voice("u", Some("v"), false)).await;
    platform.clear_calls();

    let outcome = engine.on_voice_state(voice("u", Some("v2"), false)).await;

    assert_eq!(
        platform.calls(),
        vec![Call::delete("t", "u"), Call::set("t2", "u")]
    );
    assert_eq!(outcome.revoked(), &vec![Identifier::from("t")]);
    assert_eq!(outcome.granted(), &Some(Identifier::from("t2")));
}

#[tokio::test]
async fn test_moving_between_voices_sharing_a_text_channel_keeps_access() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "t"), ("v2", "t")]);
    engine.on_voice_state(voice("u", Some("v"), false)).await;
    platform.clear_calls();

    engine.on_voice_state(voice("u", Some("v2"), false)).await;

    assert!(platform.calls().is_empty());
    assert!(platform.has_member_overwrite("t", "u"));
}

#[tokio::test]
async fn test_stale_grants_on_several_channels_are_all_revoked() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "t"), ("v2", "t2")]);
    platform.add_overwrite("t", Overwrite::member_read("u".into()));
    platform.add_overwrite("t2", Overwrite::member_read("u".into()));

    engine.on_voice_state(voice("u", Some("v2"), false)).await;

    assert_eq!(platform.calls(), vec![Call::delete("t", "u")]);
    assert!(platform.has_member_overwrite("t2", "u"));
}

#[tokio::test]
async fn test_other_subjects_are_never_touched() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "t")]);
    let role_overwrite = Overwrite {
        subject: OverwriteSubject::Role("g".into()),
        allow: Permissions::empty(),
        deny: Permissions::VIEW_CHANNEL,
    };
    platform.add_overwrite("t", role_overwrite.clone());
    platform.add_overwrite("t", Overwrite::member_read("w".into()));

    engine.on_voice_state(voice("u", Some("v"), false)).await;
    engine.on_voice_state(voice("u", None, false)).await;

    assert_eq!(
        platform.overwrites("t"),
        vec![role_overwrite, Overwrite::member_read("w".into())]
    );
}

#[tokio::test]
async fn test_unlinked_voice_channel_grants_nothing() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "t")]);

    engine.on_voice_state(voice("u", Some("v2"), false)).await;

    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_guild_without_links_is_ignored() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[]);
    platform.add_overwrite("t", Overwrite::member_read("u".into()));

    engine.on_voice_state(voice("u", None, false)).await;

    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_unreachable_linked_channel_is_skipped() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "gone"), ("v2", "t2")]);
    platform.add_overwrite("t2", Overwrite::member_read("u".into()));

    engine.on_voice_state(voice("u", Some("v"), false)).await;

    assert_eq!(platform.calls(), vec![Call::delete("t2", "u")]);
}

#[tokio::test]
async fn test_rejected_calls_are_counted_and_pass_continues() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[("v", "t"), ("v2", "t2"), ("afk", "lobby")]);
    platform.add_overwrite("t", Overwrite::member_read("u".into()));
    platform.add_overwrite("lobby", Overwrite::member_read("u".into()));
    platform.fail_writes(true);

    let outcome = engine.on_voice_state(voice("u", Some("v2"), false)).await;

    assert_eq!(platform.calls().len(), 3);
    assert_eq!(*outcome.failures(), 3);
    assert!(outcome.is_noop());
}

#[tokio::test]
async fn test_deafened_member_is_moved_to_afk() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[]);

    engine.on_voice_state(voice("u", Some("v"), true)).await;

    assert_eq!(
        platform.calls(),
        vec![Call::Move {
            guild: "g".into(),
            user: "u".into(),
            channel: "afk".into(),
        }]
    );
}

#[tokio::test]
async fn test_afk_mover_leaves_members_already_in_afk() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[]);

    engine.on_voice_state(voice("u", Some("afk"), true)).await;
    engine.on_voice_state(voice("u", None, true)).await;
    engine.on_voice_state(voice("u", Some("v"), false)).await;

    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_afk_mover_needs_an_afk_channel() {
    let platform = fixture();
    let (engine, _) = engine(&platform, &[]);

    let state = VoiceState::new("h".into(), "x".into(), Some("hv".into()), false, true);
    engine.on_voice_state(state).await;

    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_afk_mover_can_be_disabled() {
    let platform = fixture();
    let config = CoevoiceConfig::default().with_move_deafened_to_afk(false);
    let (engine, _) = engine_with(&platform, &[], &config);

    engine.on_voice_state(voice("u", Some("v"), true)).await;

    assert!(platform.calls().is_empty());
}
