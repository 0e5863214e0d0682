use crate::utils::{TestPeer, init_tracing};
use meshrtc_core::{ClientSignal, ServerSignal};
use meshrtc_server::SignalingRelay;

#[tokio::test]
async fn disconnect_broadcasts_exactly_one_user_left() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;
    let mut b = TestPeer::connect(&relay).await;
    let mut c = TestPeer::connect(&relay).await;

    a.join_and_members("abc").await;
    b.join_and_members("abc").await;
    c.join_and_members("abc").await;

    // Drain the join broadcasts before the interesting part.
    a.recv().await;
    a.recv().await;
    b.recv().await;

    a.disconnect();

    assert_eq!(b.recv().await, ServerSignal::UserLeft { user: a.id });
    assert_eq!(c.recv().await, ServerSignal::UserLeft { user: a.id });
    b.assert_silent().await;
    c.assert_silent().await;

    assert_eq!(relay.members("abc"), vec![b.id, c.id]);
}

#[tokio::test]
async fn signals_to_a_disconnected_target_are_dropped_silently() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;
    let mut b = TestPeer::connect(&relay).await;

    a.join_and_members("abc").await;
    b.join_and_members("abc").await;
    a.recv().await; // user-joined(b)

    b.disconnect();
    a.recv().await; // user-left(b)

    a.send(ClientSignal::Offer {
        target: b.id,
        sdp: "v=0".into(),
    });

    // No delivery, no error back to the sender.
    a.assert_silent().await;
}

#[tokio::test]
async fn disconnect_before_any_join_is_harmless() {
    init_tracing();
    let relay = SignalingRelay::new();
    let a = TestPeer::connect(&relay).await;
    let mut b = TestPeer::connect(&relay).await;

    b.join_and_members("abc").await;
    a.disconnect();

    b.assert_silent().await;
}
