//! Property tests driving `bacnet-core` through the in-memory harness.

use bacnet_core::config::SegmentationSupport;
use bacnet_core::datalink::{Datalink, NpduData};
use bacnet_core::{Config, Stack};
use bacnet_harness::{InMemoryNetwork, NodeId};
use bacnet_proto::apdu::UnconfirmedRequestHeader;
use bacnet_proto::services::{encode_i_am_request, IAmRequest, UnconfirmedServiceChoice};
use bacnet_proto::ObjectId;
use proptest::prelude::*;

const OBJECT_DEVICE: u16 = 8;

proptest! {
    #[test]
    fn frames_arrive_intact_and_in_order(
        frames in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..64), 1..16),
    ) {
        let network = InMemoryNetwork::new();
        let mut tx = network.node(1);
        let mut rx = network.node(2);

        for frame in &frames {
            tx.send_pdu(&2, &NpduData::default(), frame, frame.len());
        }
        for frame in &frames {
            let mut buf = [0u8; 64];
            let mut src = None;
            let n = rx.receive(&mut src, &mut buf, 0);
            prop_assert_eq!(&buf[..n], &frame[..]);
            prop_assert_eq!(src, Some(1));
        }
    }

    #[test]
    fn any_received_i_am_binds_its_sender(
        instance in 0u32..=0x3F_FFFF,
        max_apdu in 50u16..=1476,
        vendor_id in any::<u16>(),
        segmentation in 0u32..=3,
        src in 1u8..=0xFE,
    ) {
        let mut stack: Stack<NodeId> = Stack::new(Config::default());

        let mut pdu = Vec::new();
        UnconfirmedRequestHeader { service_choice: UnconfirmedServiceChoice::IAm.to_u8() }
            .encode(&mut pdu);
        encode_i_am_request(
            &mut pdu,
            &IAmRequest {
                device_id: ObjectId::new(OBJECT_DEVICE, instance).unwrap(),
                max_apdu_length_accepted: u32::from(max_apdu),
                segmentation_supported: segmentation,
                vendor_id: u32::from(vendor_id),
            },
        );
        stack.on_received(&src, &pdu);

        let (bound_max_apdu, bound_segmentation, _, bound_src) =
            stack.address_cache().get_by_device(instance).unwrap();
        prop_assert_eq!(bound_max_apdu, max_apdu);
        prop_assert_eq!(bound_segmentation, SegmentationSupport::from_u32(segmentation));
        prop_assert_eq!(bound_src, src);
    }
}
