use crate::utils::{TestPeer, init_tracing};
use meshrtc_core::{ClientSignal, ServerSignal};
use meshrtc_server::SignalingRelay;

/// Walks the full signaling exchange for a three-way mesh: every newcomer
/// offers to the members it learned about, every member answers. The relay
/// only ever forwards; this test pins down who talks to whom.
#[tokio::test]
async fn three_peers_complete_a_full_mesh_exchange() {
    init_tracing();
    let relay = SignalingRelay::new();
    let mut a = TestPeer::connect(&relay).await;
    let mut b = TestPeer::connect(&relay).await;
    let mut c = TestPeer::connect(&relay).await;

    a.join_and_members("abc").await;

    let b_sees = b.join_and_members("abc").await;
    assert_eq!(b_sees, vec![a.id]);
    assert_eq!(a.recv().await, ServerSignal::UserJoined { user: b.id });

    let c_sees = c.join_and_members("abc").await;
    assert_eq!(c_sees, vec![a.id, b.id]);
    assert_eq!(a.recv().await, ServerSignal::UserJoined { user: c.id });
    assert_eq!(b.recv().await, ServerSignal::UserJoined { user: c.id });

    // Each newcomer offers toward every pre-existing member.
    b.send(ClientSignal::Offer {
        target: a.id,
        sdp: "b->a".into(),
    });
    for target in [a.id, b.id] {
        c.send(ClientSignal::Offer {
            target,
            sdp: format!("c->{target}"),
        });
    }

    assert_eq!(
        a.recv().await,
        ServerSignal::Offer {
            from: b.id,
            sdp: "b->a".into()
        }
    );
    assert_eq!(
        a.recv().await,
        ServerSignal::Offer {
            from: c.id,
            sdp: format!("c->{}", a.id)
        }
    );
    assert_eq!(
        b.recv().await,
        ServerSignal::Offer {
            from: c.id,
            sdp: format!("c->{}", b.id)
        }
    );

    // Answers travel the opposite way, one per received offer.
    a.send(ClientSignal::Answer {
        target: b.id,
        sdp: "a->b".into(),
    });
    a.send(ClientSignal::Answer {
        target: c.id,
        sdp: "a->c".into(),
    });
    b.send(ClientSignal::Answer {
        target: c.id,
        sdp: "b->c".into(),
    });

    assert_eq!(
        b.recv().await,
        ServerSignal::Answer {
            from: a.id,
            sdp: "a->b".into()
        }
    );
    assert_eq!(
        c.recv().await,
        ServerSignal::Answer {
            from: a.id,
            sdp: "a->c".into()
        }
    );
    assert_eq!(
        c.recv().await,
        ServerSignal::Answer {
            from: b.id,
            sdp: "b->c".into()
        }
    );

    // No stray deliveries: each pair exchanged exactly one offer/answer.
    a.assert_silent().await;
    b.assert_silent().await;
    c.assert_silent().await;
}
