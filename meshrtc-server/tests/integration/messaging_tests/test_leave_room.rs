use crate::utils::{TestPeer, init_tracing};
use meshrtc_core::ServerSignal;
use meshrtc_server::SignalingRelay;

#[tokio::test]
async fn leave_broadcasts_to_remaining_members() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;
    let mut b = TestPeer::connect(&relay).await;

    a.join_and_members("abc").await;
    b.join_and_members("abc").await;
    a.recv().await; // user-joined(b)

    b.leave("abc");

    assert_eq!(a.recv().await, ServerSignal::UserLeft { user: b.id });
    assert_eq!(relay.members("abc"), vec![a.id]);
}

#[tokio::test]
async fn double_leave_produces_no_duplicate_broadcast() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;
    let mut b = TestPeer::connect(&relay).await;

    a.join_and_members("abc").await;
    b.join_and_members("abc").await;
    a.recv().await;

    b.leave("abc");
    b.leave("abc");

    assert_eq!(a.recv().await, ServerSignal::UserLeft { user: b.id });
    a.assert_silent().await;
}

#[tokio::test]
async fn leaving_a_room_never_joined_is_a_no_op() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;
    let mut b = TestPeer::connect(&relay).await;

    a.join_and_members("abc").await;

    b.leave("abc");
    b.leave("ghost-room");

    a.assert_silent().await;
    b.assert_silent().await;
    assert_eq!(relay.members("abc"), vec![a.id]);
}
