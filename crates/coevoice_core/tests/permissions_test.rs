//! Tests for permission resolution against a live directory.

mod test_utils;

use coevoice_core::{
    Identifier, Invocation, Overwrite, OverwriteSubject, PermissionResolver, Permissions,
};
use test_utils::{engine, fixture};

fn deny_everyone(platform: &test_utils::MockPlatform, channel: &str) {
    platform.add_overwrite(
        channel,
        Overwrite {
            subject: OverwriteSubject::Role("g".into()),
            allow: Permissions::empty(),
            deny: Permissions::all(),
        },
    );
}

#[tokio::test]
async fn test_unknown_role_fails_closed() {
    let platform = fixture();
    platform.add_member("g", "ghost", &["missing"]);
    let resolver = PermissionResolver::new(platform.clone());

    assert!(
        resolver
            .guild_permissions(&"g".into(), &"ghost".into())
            .await
            .is_err()
    );
    assert!(
        resolver
            .channel_permissions(&"t".into(), &"ghost".into())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_unknown_role_cannot_link() {
    let platform = fixture();
    platform.add_member("g", "ghost", &["missing"]);
    let (engine, store) = engine(&platform, &[]);
    let invocation = Invocation {
        channel_id: "lobby".into(),
        user_id: "ghost".into(),
    };

    let reply = engine.on_command(&invocation, "!voicelink v t").await;

    assert_eq!(reply, None);
    assert!(engine.registry().get(&Identifier::from("g")).is_empty());
    assert!(store.last_saved().is_none());
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_administrator_role_ignores_channel_denies() {
    let platform = fixture();
    deny_everyone(&platform, "t");
    let resolver = PermissionResolver::new(platform.clone());

    let permissions = resolver
        .channel_permissions(&"t".into(), &"admin".into())
        .await
        .unwrap();

    assert_eq!(permissions, Permissions::all());
}

#[tokio::test]
async fn test_everyone_deny_hides_channel_from_members() {
    let platform = fixture();
    deny_everyone(&platform, "t");
    let resolver = PermissionResolver::new(platform.clone());

    let pleb = resolver
        .channel_permissions(&"t".into(), &"pleb".into())
        .await
        .unwrap();
    let moderator = resolver
        .channel_permissions(&"t".into(), &"mod".into())
        .await
        .unwrap();

    assert!(!pleb.contains(Permissions::VIEW_CHANNEL));
    assert!(!moderator.contains(Permissions::VIEW_CHANNEL));
    assert!(
        resolver
            .guild_permissions(&"g".into(), &"mod".into())
            .await
            .unwrap()
            .contains(Permissions::MANAGE_CHANNELS)
    );
}
