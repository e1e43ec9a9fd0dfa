mod common;

use common::{channel, text_message, user, FakeClient};
use tg_util::tg::{
    get_entity_stats, parse_entity, resolve_entity, resolve_entity_with_stats, EntityCache, EntityRef, Peer,
};
use tg_util::Error;

#[tokio::test]
async fn second_resolution_comes_from_the_cache() {
    let client = FakeClient::new(2);
    client.add_entity(channel(100, Some("clips")));
    let cache = EntityCache::new();

    let first = resolve_entity(&client, &cache, 100_i64).await.unwrap();
    let lookups = client.state().get_entity_calls.len();
    let second = resolve_entity(&client, &cache, 100_i64).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(lookups, 1);
    assert_eq!(client.state().get_entity_calls.len(), 1);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn bare_ids_try_channels_then_chats_then_users() {
    let client = FakeClient::new(2);
    client.add_entity(user(7, "Ann"));
    let cache = EntityCache::new();

    let entity = resolve_entity(&client, &cache, "7").await.unwrap();
    assert_eq!(entity.peer(), Peer::User { user_id: 7 });
    assert_eq!(
        client.state().get_entity_calls,
        vec![
            EntityRef::Peer(Peer::Channel { channel_id: 7 }),
            EntityRef::Peer(Peer::Chat { chat_id: 7 }),
            EntityRef::Peer(Peer::User { user_id: 7 }),
        ]
    );
}

#[tokio::test]
async fn usernames_and_peers_are_cached_under_their_own_keys() {
    let client = FakeClient::new(2);
    client.add_entity(channel(100, Some("clips")));
    let cache = EntityCache::new();

    let by_name = resolve_entity(&client, &cache, "clips").await.unwrap();
    let by_peer = resolve_entity(&client, &cache, Peer::Channel { channel_id: 100 })
        .await
        .unwrap();
    assert_eq!(by_name, by_peer);
    assert_eq!(cache.len().await, 2);

    resolve_entity(&client, &cache, "clips").await.unwrap();
    assert_eq!(client.state().get_entity_calls.len(), 2);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let client = FakeClient::new(2);
    let cache = EntityCache::new();

    let err = resolve_entity(&client, &cache, "nobody").await.unwrap_err();
    assert!(matches!(err, Error::EntityNotFound(_)));
    assert!(cache.is_empty().await);

    client.add_entity(channel(5, Some("nobody")));
    assert_eq!(resolve_entity(&client, &cache, "nobody").await.unwrap().id(), 5);
}

#[tokio::test]
async fn stats_come_with_the_entity() {
    let client = FakeClient::new(2);
    client.add_entity(channel(100, Some("clips")));
    client.add_message(common::video_message(100, 1, 11, 2));
    client.add_message(common::photo_message(100, 2, 12));
    client.add_message(common::file_message(100, 3, 13, "a.pdf"));
    client.add_message(text_message(100, 4, "hi"));
    let cache = EntityCache::new();

    let resolved = resolve_entity_with_stats(&client, &cache, "clips").await.unwrap();
    assert_eq!(resolved.entity.id(), 100);
    assert_eq!(resolved.stats.medias, 2);
    assert_eq!(resolved.stats.files, 1);
    assert_eq!(resolved.stats.messages, 4);
    assert_eq!(resolved.stats.ratio(), 0.75);
    assert_eq!(resolved.stats.username, "clips");
}

#[tokio::test]
async fn unknown_counts_fall_back_to_defaults() {
    let client = FakeClient::new(2);
    let empty = channel(9, None);
    let stats = get_entity_stats(&client, &empty).await.unwrap();
    assert_eq!((stats.medias, stats.files, stats.messages), (0, 0, -1));
    assert_eq!(stats.ratio(), 0.0);

    let parsed = parse_entity(&empty);
    assert_eq!(parsed.username, "");
    assert_eq!(parsed.title, "Channel 9");
}
