//! Transaction retry/timeout sequences driven by the fake clock: wall-clock
//! seconds of protocol behavior, executed instantly.

use std::time::Duration;

use bacnet_core::datalink::{Datalink, NpduData};
use bacnet_core::env::Clock;
use bacnet_core::{Config, Stack, StackAction};
use bacnet_harness::{FakeClock, InMemoryDatalink, InMemoryNetwork, NodeId};
use bacnet_proto::services::ConfirmedServiceChoice;

const CLIENT: NodeId = 1;
/// A node that is attached to the network but never reads its inbox.
const SILENT_PEER: NodeId = 9;

fn run_actions(link: &mut InMemoryDatalink, actions: Vec<StackAction<NodeId>>) {
    for action in actions {
        match action {
            StackAction::Send { peer, pdu, data_expecting_reply } => {
                let npdu = NpduData { header: Vec::new(), data_expecting_reply };
                link.send_pdu(&peer, &npdu, &pdu, pdu.len());
            },
            StackAction::Broadcast { pdu } => {
                let dest = link.broadcast_address();
                link.send_pdu(&dest, &NpduData::default(), &pdu, pdu.len());
            },
        }
    }
}

#[test]
fn unanswered_request_retries_then_fails_exactly_once() {
    let network = InMemoryNetwork::new();
    let mut client_link = network.node(CLIENT);
    let mut peer_link = network.node(SILENT_PEER);

    let clock = FakeClock::new();
    let mut client: Stack<NodeId> = Stack::new(Config {
        apdu_timeout_ms: 100,
        number_of_apdu_retries: 2,
        ..Config::default()
    });

    let (invoke_id, actions) = client
        .send_confirmed(SILENT_PEER, ConfirmedServiceChoice::ReadProperty.to_u8(), &[])
        .unwrap();
    run_actions(&mut client_link, actions);

    // Drive the driver-loop clock in 100 ms polls. The original transmission
    // plus two retries go out over 300 ms; nothing further after that.
    let mut last = clock.now();
    let mut transmissions = 1;
    for _ in 0..5 {
        clock.advance(Duration::from_millis(100));
        let now = clock.now();
        let elapsed_ms = u32::try_from((now - last).as_millis()).unwrap();
        last = now;

        let actions = client.tick(elapsed_ms);
        transmissions += actions.len();
        run_actions(&mut client_link, actions);
    }
    assert_eq!(transmissions, 3, "original transmission plus two retries");

    // The silent peer's inbox holds exactly those three copies.
    let mut buf = [0u8; 256];
    let mut src = None;
    let mut delivered = 0;
    while peer_link.receive(&mut src, &mut buf, 0) > 0 {
        delivered += 1;
    }
    assert_eq!(delivered, 3);

    assert!(client.invoke_id_failed(invoke_id), "failure must be observable");
    assert!(!client.invoke_id_failed(invoke_id), "failure observation is one-shot");
    assert!(client.invoke_id_free(invoke_id), "the slot is free thereafter");
}

#[test]
fn late_reply_after_forced_release_is_dropped() {
    let network = InMemoryNetwork::new();
    let mut client_link = network.node(CLIENT);
    let mut peer_link = network.node(SILENT_PEER);

    let mut client: Stack<NodeId> = Stack::new(Config::default());
    let (invoke_id, actions) = client
        .send_confirmed(SILENT_PEER, ConfirmedServiceChoice::ReadProperty.to_u8(), &[])
        .unwrap();
    run_actions(&mut client_link, actions);

    client.free_invoke_id(invoke_id);

    // The peer finally answers, too late: the response must be ignored.
    let mut ack = Vec::new();
    bacnet_proto::apdu::SimpleAckHeader {
        invoke_id,
        service_choice: ConfirmedServiceChoice::ReadProperty.to_u8(),
    }
    .encode(&mut ack);
    peer_link.send_pdu(&CLIENT, &NpduData::default(), &ack, ack.len());

    let mut buf = [0u8; 256];
    let mut src = None;
    let n = client_link.receive(&mut src, &mut buf, 0);
    let (outcome, replies) = client.on_received(&SILENT_PEER, &buf[..n]);
    assert_eq!(outcome, bacnet_core::DispatchOutcome::Dropped);
    assert!(replies.is_empty());
}

#[test]
fn bind_request_reemits_who_is_only_after_the_retry_interval() {
    let network = InMemoryNetwork::new();
    let mut client_link = network.node(CLIENT);
    let mut observer_link = network.node(SILENT_PEER);

    let clock = FakeClock::new();
    let mut client: Stack<NodeId> = Stack::new(Config::default());

    let (_, actions) = client.bind_request(4321);
    assert_eq!(actions.len(), 1, "first bind request emits a Who-Is");
    run_actions(&mut client_link, actions);

    // Asking again inside the retry interval stays quiet.
    let (_, actions) = client.bind_request(4321);
    assert!(actions.is_empty());

    // Once the interval elapses on the driver clock, one more Who-Is goes out.
    clock.advance(Duration::from_secs(10));
    let elapsed_ms = u32::try_from(clock.now().as_millis()).unwrap();
    run_actions(&mut client_link, client.tick(elapsed_ms));

    let (_, actions) = client.bind_request(4321);
    assert_eq!(actions.len(), 1, "retry interval elapsed, a new Who-Is is due");
    run_actions(&mut client_link, actions);

    let mut buf = [0u8; 256];
    let mut src = None;
    let mut broadcasts = 0;
    while observer_link.receive(&mut src, &mut buf, 0) > 0 {
        broadcasts += 1;
    }
    assert_eq!(broadcasts, 2, "exactly one Who-Is per retry interval");
}
