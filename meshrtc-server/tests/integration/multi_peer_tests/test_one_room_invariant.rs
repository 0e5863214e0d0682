use crate::utils::{TestPeer, init_tracing};
use meshrtc_core::ServerSignal;
use meshrtc_server::SignalingRelay;

#[tokio::test]
async fn rejoining_another_room_leaves_the_first() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;
    let mut b = TestPeer::connect(&relay).await;

    a.join_and_members("one").await;
    b.join_and_members("one").await;
    a.recv().await; // user-joined(b)

    // B hops rooms without an explicit leave. The relay must evict it from
    // "one" before admitting it to "two".
    let members = b.join_and_members("two").await;
    assert!(members.is_empty());

    assert_eq!(a.recv().await, ServerSignal::UserLeft { user: b.id });
    assert_eq!(relay.members("one"), vec![a.id]);
    assert_eq!(relay.members("two"), vec![b.id]);
}

#[tokio::test]
async fn rejoining_the_same_room_does_not_announce_a_departure() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;
    let mut b = TestPeer::connect(&relay).await;

    a.join_and_members("one").await;
    b.join_and_members("one").await;
    a.recv().await;

    let members = b.join_and_members("one").await;
    assert_eq!(members, vec![a.id]);

    // A sees a fresh user-joined but no user-left in between.
    assert_eq!(a.recv().await, ServerSignal::UserJoined { user: b.id });
    assert_eq!(relay.members("one"), vec![a.id, b.id]);
}

#[tokio::test]
async fn participant_is_never_in_two_rooms_at_once() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;

    for room in ["one", "two", "three", "one"] {
        a.join_and_members(room).await;

        let occupied: Vec<&str> = ["one", "two", "three"]
            .into_iter()
            .filter(|r| relay.members(r).contains(&a.id))
            .collect();
        assert_eq!(occupied, vec![room]);
    }
}
