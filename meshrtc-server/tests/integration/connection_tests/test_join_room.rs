use crate::utils::{TestPeer, init_tracing};
use meshrtc_server::SignalingRelay;
use meshrtc_core::ServerSignal;

#[tokio::test]
async fn first_joiner_gets_empty_member_list() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;

    let members = a.join_and_members("abc").await;

    assert!(members.is_empty());
    assert_eq!(relay.members("abc"), vec![a.id]);
}

#[tokio::test]
async fn joiner_learns_existing_members_in_join_order() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;
    let mut b = TestPeer::connect(&relay).await;
    let mut c = TestPeer::connect(&relay).await;

    a.join_and_members("abc").await;
    b.join_and_members("abc").await;
    let members = c.join_and_members("abc").await;

    // Newcomer isolation: the list holds the others, never the joiner.
    assert_eq!(members, vec![a.id, b.id]);
}

#[tokio::test]
async fn user_joined_is_broadcast_to_everyone_but_the_joiner() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;
    let mut b = TestPeer::connect(&relay).await;

    a.join_and_members("abc").await;
    b.join_and_members("abc").await;

    assert_eq!(a.recv().await, ServerSignal::UserJoined { user: b.id });
    // The joiner itself only receives the member list.
    b.assert_silent().await;
}

#[tokio::test]
async fn blank_room_id_is_rejected_without_any_reply() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;

    a.join("");
    a.assert_silent().await;

    a.join("   ");
    a.assert_silent().await;
    assert!(relay.members("   ").is_empty());
}
