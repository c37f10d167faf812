//! Randomized checks of slot allocation and call status ordering.

use std::collections::BTreeSet;

use proptest::prelude::*;

use workshop_rust::{
    AsyncCall, CallFailure, CallHandle, CallStatus, DeletedItem, LocalWorkshop, QueryOptions,
    QueryStatus, QueryTarget, QueryWorkflow, Request, SlotArena, SlotContent, Transport,
};

struct Empty;

impl SlotContent for Empty {
    fn handles(&mut self) -> Vec<CallHandle> {
        Vec::new()
    }
}

#[derive(Clone, Debug)]
enum SlotOp {
    Allocate,
    /// Release the n-th open slot, modulo the number open.
    Release(usize),
}

fn slot_op() -> impl Strategy<Value = SlotOp> {
    prop_oneof![Just(SlotOp::Allocate), any::<usize>().prop_map(SlotOp::Release)]
}

#[derive(Clone, Debug)]
enum CallOp {
    Pump,
    Poll,
    FailPending,
    Release,
}

fn call_op() -> impl Strategy<Value = CallOp> {
    prop_oneof![
        4 => Just(CallOp::Pump),
        4 => Just(CallOp::Poll),
        1 => Just(CallOp::FailPending),
        1 => Just(CallOp::Release),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn slots_reuse_the_lowest_free_index(ops in prop::collection::vec(slot_op(), 1..80)) {
        let mut arena = SlotArena::new();
        let mut transport = LocalWorkshop::new();
        let mut open = BTreeSet::new();
        let mut most_open = 0;

        for op in ops {
            match op {
                SlotOp::Allocate => {
                    let lowest_free = (0..).find(|index| !open.contains(index)).unwrap();
                    let id = arena.allocate(Empty);
                    prop_assert_eq!(id.index(), lowest_free);
                    open.insert(id.index());
                    most_open = most_open.max(open.len());
                }
                SlotOp::Release(n) if !open.is_empty() => {
                    let index = *open.iter().nth(n % open.len()).unwrap();
                    let id = arena.ids().into_iter().find(|id| id.index() == index).unwrap();
                    arena.release(id, &mut transport);
                    open.remove(&index);
                }
                SlotOp::Release(_) => {}
            }
            prop_assert_eq!(arena.len(), open.len());
            prop_assert!(arena.capacity() <= most_open);
        }
    }

    #[test]
    fn call_status_never_leaves_a_terminal_state(
        latency in 1u64..5,
        ops in prop::collection::vec(call_op(), 1..40),
    ) {
        let mut transport = LocalWorkshop::new().with_latency(latency);
        let mut call: AsyncCall<DeletedItem> = AsyncCall::submit(&mut transport, Request::DeleteItem(3));
        let mut terminal: Option<CallStatus> = None;

        for op in ops {
            match op {
                CallOp::Pump => transport.pump(),
                CallOp::Poll => call.poll(&mut transport),
                CallOp::FailPending => transport.fail_pending(CallFailure::NetworkFailure),
                CallOp::Release => transport.release(call.handle()),
            }
            let status = call.status();
            if let Some(settled) = terminal {
                prop_assert_eq!(status, settled);
            } else if status.is_terminal() {
                terminal = Some(status);
            } else {
                prop_assert_eq!(status, CallStatus::Pending);
            }
        }
    }

    #[test]
    fn query_status_never_leaves_a_terminal_state(
        latency in 1u64..5,
        ops in prop::collection::vec(call_op(), 1..40),
    ) {
        let mut transport = LocalWorkshop::new().with_latency(latency);
        let id = transport.publish("Castle", "Walls.", &["Map"]);
        let mut query = QueryWorkflow::submit(
            &mut transport,
            7,
            QueryOptions::default(),
            QueryTarget::Details(vec![id]),
        );
        let mut terminal: Option<QueryStatus> = None;

        for op in ops {
            match op {
                CallOp::Pump => transport.pump(),
                CallOp::Poll => query.poll(&mut transport),
                CallOp::FailPending => transport.fail_pending(CallFailure::ServiceUnavailable),
                CallOp::Release => transport.release(query.handle()),
            }
            let status = query.status();
            if let Some(settled) = terminal {
                prop_assert_eq!(status, settled);
            } else if status.is_terminal() {
                terminal = Some(status);
            }
        }
    }
}
