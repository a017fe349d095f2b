//! Segmented complex-ack reassembly across the in-memory datalink, with a
//! deliberately dropped segment and rewind-based recovery.

use std::cell::RefCell;
use std::rc::Rc;

use bacnet_core::datalink::{Datalink, NpduData};
use bacnet_core::{Config, Stack, StackAction};
use bacnet_harness::{InMemoryDatalink, InMemoryNetwork, NodeId};
use bacnet_proto::apdu::{Apdu, ComplexAckHeader, SegmentAckHeader};
use bacnet_proto::services::ConfirmedServiceChoice;

const CLIENT: NodeId = 1;
const SERVER: NodeId = 2;

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

fn pump(stack: &mut Stack<NodeId>, link: &mut InMemoryDatalink) {
    loop {
        let mut buf = [0u8; 2048];
        let mut src = None;
        let n = link.receive(&mut src, &mut buf, 0);
        if n == 0 {
            break;
        }
        let Some(src) = src else { break };
        let (_, actions) = stack.on_received(&src, &buf[..n]);
        run_actions(link, actions);
    }
}

fn segment(invoke_id: u8, seq: u8, more_follows: bool, data: &[u8]) -> Vec<u8> {
    let mut pdu = Vec::new();
    ComplexAckHeader {
        segmented: true,
        more_follows,
        invoke_id,
        sequence_number: Some(seq),
        proposed_window_size: Some(4),
        service_choice: ConfirmedServiceChoice::ReadRange.to_u8(),
    }
    .encode(&mut pdu);
    pdu.extend_from_slice(data);
    pdu
}

#[test]
fn dropped_segment_triggers_negative_ack_then_recovery() {
    let network = InMemoryNetwork::new();
    let mut client_link = network.node(CLIENT);
    let mut server_link = network.node(SERVER);

    let mut client: Stack<NodeId> = Stack::new(Config::default());

    let assembled: Rc<RefCell<Vec<Vec<u8>>>> = Rc::new(RefCell::new(Vec::new()));
    let assembled_clone = assembled.clone();
    client.registry_mut().set_confirmed_ack_handler(
        ConfirmedServiceChoice::ReadRange.to_u8(),
        Box::new(move |_invoke_id, params| {
            assembled_clone.borrow_mut().push(params.to_vec());
        }),
    );

    // A confirmed request must be outstanding for the ack to correlate.
    let (invoke_id, actions) =
        client.send_confirmed(SERVER, ConfirmedServiceChoice::ReadRange.to_u8(), &[]).unwrap();
    run_actions(&mut client_link, actions);
    // Swallow the request; this test plays the server by hand.
    let mut buf = [0u8; 256];
    let mut src = None;
    assert!(server_link.receive(&mut src, &mut buf, 0) > 0);

    // The server's reply is 4 segments; segment 2 is lost in transit.
    let npdu = NpduData::default();
    for (seq, more, data) in [(0u8, true, b"aa"), (1, true, b"bb"), (3, false, b"dd")] {
        let pdu = segment(invoke_id, seq, more, data);
        server_link.send_pdu(&CLIENT, &npdu, &pdu, pdu.len());
    }
    pump(&mut client, &mut client_link);

    // The client must have asked for a rewind to sequence 2.
    let n = server_link.receive(&mut src, &mut buf, 0);
    assert!(n > 0, "client must emit a segment-ack for the gap");
    let (_, apdu) = Apdu::decode(&buf[..n]).unwrap();
    let Apdu::SegmentAck(SegmentAckHeader { negative_ack, sequence_number, .. }) = apdu else {
        panic!("expected a segment-ack, got {apdu:?}");
    };
    assert!(negative_ack);
    assert_eq!(sequence_number, 2);

    // Server rewinds and retransmits 2 and 3; reassembly completes once.
    for (seq, more, data) in [(2u8, true, b"cc"), (3, false, b"dd")] {
        let pdu = segment(invoke_id, seq, more, data);
        server_link.send_pdu(&CLIENT, &npdu, &pdu, pdu.len());
    }
    pump(&mut client, &mut client_link);

    assert_eq!(assembled.borrow().len(), 1, "the assembled APDU is delivered exactly once");
    assert_eq!(assembled.borrow()[0], b"aabbccdd");
    assert!(client.invoke_id_free(invoke_id));
}

#[test]
fn out_of_window_segment_aborts_the_transaction() {
    let network = InMemoryNetwork::new();
    let mut client_link = network.node(CLIENT);
    let mut server_link = network.node(SERVER);

    let mut client: Stack<NodeId> = Stack::new(Config::default());
    let (invoke_id, actions) =
        client.send_confirmed(SERVER, ConfirmedServiceChoice::ReadRange.to_u8(), &[]).unwrap();
    run_actions(&mut client_link, actions);
    let mut buf = [0u8; 256];
    let mut src = None;
    server_link.receive(&mut src, &mut buf, 0);

    // Sequence 9 with window 4 lies outside the receive window.
    let pdu = segment(invoke_id, 9, true, b"zz");
    server_link.send_pdu(&CLIENT, &NpduData::default(), &pdu, pdu.len());
    pump(&mut client, &mut client_link);

    let n = server_link.receive(&mut src, &mut buf, 0);
    assert!(n > 0, "client must abort on an out-of-window segment");
    let (_, apdu) = Apdu::decode(&buf[..n]).unwrap();
    let Apdu::Abort(header) = apdu else {
        panic!("expected an abort, got {apdu:?}");
    };
    assert_eq!(
        header.reason,
        bacnet_proto::services::AbortReason::InvalidApduInThisState.to_u8()
    );
    assert!(client.invoke_id_failed(invoke_id));
}
