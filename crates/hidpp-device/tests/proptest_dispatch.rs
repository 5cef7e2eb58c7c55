//! The dispatch point receives whatever the hardware emits; it must stay
//! total over arbitrary byte soup.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;

use hidpp_device::transport::mock::MockTransport;
use hidpp_device::{DispatchOutcome, RawHidTransport, SessionBuilder};
use hidpp_protocol::ids::report_ids;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn test_dispatch_total_over_arbitrary_input(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let transport = Arc::new(MockTransport::new());
        let forwarded = Arc::new(AtomicUsize::new(0));
        let session = {
            let forwarded = Arc::clone(&forwarded);
            SessionBuilder::new(transport as Arc<dyn RawHidTransport>)
                .raw_event(move |_session, _data| {
                    forwarded.fetch_add(1, Ordering::SeqCst);
                })
                .build()
        };

        let outcome = session.handle_raw_event(&data);

        // With no transaction outstanding nothing is ever consumed, and the
        // handler runs exactly when the outcome says it did.
        prop_assert_ne!(outcome, DispatchOutcome::ConsumedAnswer);
        let expected_forwards = usize::from(outcome == DispatchOutcome::Forwarded);
        prop_assert_eq!(forwarded.load(Ordering::SeqCst), expected_forwards);

        // Ill-sized HID++ frames are dropped, well-sized ones forwarded.
        match data.first().copied() {
            Some(report_ids::HIDPP_SHORT) => {
                let expected = if data.len() == 7 {
                    DispatchOutcome::Forwarded
                } else {
                    DispatchOutcome::Dropped
                };
                prop_assert_eq!(outcome, expected);
            }
            Some(report_ids::HIDPP_LONG) => {
                let expected = if data.len() == 20 {
                    DispatchOutcome::Forwarded
                } else {
                    DispatchOutcome::Dropped
                };
                prop_assert_eq!(outcome, expected);
            }
            Some(report_ids::DJ_SHORT) | Some(report_ids::DJ_LONG) => {
                prop_assert_eq!(outcome, DispatchOutcome::Notification);
            }
            _ => prop_assert_eq!(outcome, DispatchOutcome::Forwarded),
        }
    }
}
