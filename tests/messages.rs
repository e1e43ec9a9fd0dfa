mod common;

use std::time::Duration;

use common::{channel, text_message, FakeClient};
use futures_util::TryStreamExt;
use tg_util::tg::{iter_messages, IterMessages, Message};

fn ids(items: &[(Message, Option<u32>)]) -> Vec<(i32, Option<u32>)> {
    items.iter().map(|(m, r)| (m.id, *r)).collect()
}

fn client_with_history() -> FakeClient {
    let client = FakeClient::new(2);
    client.add_entity(channel(100, Some("clips")));
    for id in 1..=5 {
        client.add_message(text_message(100, id, "m"));
    }
    client
}

#[tokio::test]
async fn newest_first_unless_reversed() {
    let client = client_with_history();
    let entity = channel(100, Some("clips"));

    let items: Vec<_> = iter_messages(&client, &entity, IterMessages::default())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(
        ids(&items),
        vec![(5, None), (4, None), (3, None), (2, None), (1, None)]
    );

    let reversed: Vec<_> = iter_messages(
        &client,
        &entity,
        IterMessages {
            reverse: true,
            ..Default::default()
        },
    )
    .try_collect()
    .await
    .unwrap();
    assert_eq!(reversed.first().map(|(m, _)| m.id), Some(1));
    assert_eq!(reversed.len(), 5);
}

#[tokio::test]
async fn bounds_are_exclusive() {
    let client = client_with_history();
    let entity = channel(100, Some("clips"));

    let items: Vec<_> = iter_messages(
        &client,
        &entity,
        IterMessages {
            min_id: 1,
            max_id: 4,
            reverse: true,
            ..Default::default()
        },
    )
    .try_collect()
    .await
    .unwrap();
    assert_eq!(ids(&items), vec![(2, None), (3, None)]);
}

#[tokio::test]
async fn single_ids_yield_at_most_one_message() {
    let client = client_with_history();
    let entity = channel(100, Some("clips"));

    let found: Vec<_> = iter_messages(
        &client,
        &entity,
        IterMessages {
            ids: Some(3),
            ..Default::default()
        },
    )
    .try_collect()
    .await
    .unwrap();
    assert_eq!(ids(&found), vec![(3, None)]);

    let missing: Vec<_> = iter_messages(
        &client,
        &entity,
        IterMessages {
            ids: Some(42),
            ..Default::default()
        },
    )
    .try_collect()
    .await
    .unwrap();
    assert!(missing.is_empty());
}

#[tokio::test]
async fn threads_follow_their_parent() {
    let client = FakeClient::new(2);
    let entity = channel(100, None);
    client.add_message(text_message(100, 1, "first"));
    let mut parent = text_message(100, 2, "parent");
    client.add_reply(&mut parent, text_message(100, 10, "r0"));
    client.add_reply(&mut parent, text_message(100, 11, "r1"));
    client.add_message(parent);
    client.add_message(text_message(100, 3, "last"));

    let params = IterMessages {
        wait_time: Some(Duration::from_millis(5)),
        ..Default::default()
    };
    let items: Vec<_> = iter_messages(&client, &entity, params)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(
        ids(&items),
        vec![(3, None), (2, None), (10, Some(0)), (11, Some(1)), (1, None)]
    );

    let requests = client.state().history_requests.clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].reply_to, Some(2));
    assert_eq!(requests[1].wait_time, Some(Duration::from_millis(5)));

    let flat: Vec<_> = iter_messages(
        &client,
        &entity,
        IterMessages {
            with_reply: false,
            ..Default::default()
        },
    )
    .try_collect()
    .await
    .unwrap();
    assert_eq!(ids(&flat), vec![(3, None), (2, None), (1, None)]);
}

#[tokio::test]
async fn iteration_can_be_restarted() {
    let client = client_with_history();
    let entity = channel(100, Some("clips"));
    let params = IterMessages {
        max_id: 3,
        ..Default::default()
    };

    let first: Vec<_> = iter_messages(&client, &entity, params.clone())
        .try_collect()
        .await
        .unwrap();
    let second: Vec<_> = iter_messages(&client, &entity, params)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(ids(&first), vec![(2, None), (1, None)]);
}
