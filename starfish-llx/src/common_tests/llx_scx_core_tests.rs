use std::slice;

use crate::common_tests::{TestContext, basic_record};
use crate::data_record::ScxState;
use crate::error::{LinkError, UnlinkedScx};
use crate::guard::Guard;
use crate::helper::Helper;
use crate::linked_operations::{FieldUpdate, LinkedOperations, LoadLinkResult};

/// LLX a fresh record, SCX field 1 to 1337, LLX again
pub fn test_scx_modifies_field<G: Guard, H: Helper>(operations: &LinkedOperations<H>) {
    let record = basic_record::<G>();
    let mut context = TestContext::<G>::new();

    context.with_linked_operations(|context| {
        let snapshot = operations
            .load_link(context, &record)
            .unwrap()
            .into_snapshot()
            .expect("fresh record must link");
        assert_eq!((0..10).collect::<Vec<_>>(), snapshot.to_vec());

        let update = FieldUpdate::new(&record, 1, 1337);
        assert_eq!(
            Ok(true),
            operations.store_conditional(context, slice::from_ref(&record), &[], Some(update))
        );
    });

    context.with_linked_operations(|context| {
        let snapshot = operations
            .load_link(context, &record)
            .unwrap()
            .into_snapshot()
            .expect("modified record must link");
        assert_eq!(vec![0, 1337, 2, 3, 4, 5, 6, 7, 8, 9], snapshot.to_vec());
    });

    assert!(!record.is_marked());
    assert_eq!(Some(1337), record.read_field(1).map(|v| *v));
    assert_eq!(&(10..20).collect::<Vec<_>>(), record.immutable_fields());
}

/// SCX that finalizes the record it modifies; later LLXs see Finalized
pub fn test_scx_finalizes_record<G: Guard, H: Helper>(operations: &LinkedOperations<H>) {
    let record = basic_record::<G>();
    let mut context = TestContext::<G>::new();

    context.with_linked_operations(|context| {
        assert!(operations.load_link(context, &record).unwrap().is_success());

        let update = FieldUpdate::new(&record, 1, 1337);
        assert_eq!(
            Ok(true),
            operations.store_conditional(
                context,
                slice::from_ref(&record),
                slice::from_ref(&record),
                Some(update)
            )
        );
    });

    assert!(record.is_marked());
    assert_eq!(Some(1337), record.read_field(1).map(|v| *v));

    for _ in 0..3 {
        context.with_linked_operations(|context| {
            let result = operations.load_link(context, &record).unwrap();
            assert!(matches!(result, LoadLinkResult::Finalized));
            assert!(!context.is_linked(&record));
        });
        assert!(record.is_marked());
    }
}

/// A finalized record cannot be linked again, so an SCX over it is rejected
pub fn test_scx_after_finalize_is_unlinked<G: Guard, H: Helper>(operations: &LinkedOperations<H>) {
    let record = basic_record::<G>();
    let mut context = TestContext::<G>::new();

    context.with_linked_operations(|context| {
        assert!(operations.load_link(context, &record).unwrap().is_success());
        assert_eq!(
            Ok(true),
            operations.store_conditional(
                context,
                slice::from_ref(&record),
                slice::from_ref(&record),
                None
            )
        );
    });

    // New scope, no fresh LLX.
    context.with_linked_operations(|context| {
        assert_eq!(
            Err(LinkError::UnlinkedScx(UnlinkedScx::AffectedRecord { index: 0 })),
            operations.store_conditional(context, slice::from_ref(&record), &[], None)
        );
    });

    // New scope, LLX reports Finalized and links nothing.
    context.with_linked_operations(|context| {
        assert!(matches!(
            operations.load_link(context, &record).unwrap(),
            LoadLinkResult::Finalized
        ));
        let update = FieldUpdate::new(&record, 1, 7);
        assert_eq!(
            Err(LinkError::UnlinkedScx(UnlinkedScx::AffectedRecord { index: 0 })),
            operations.store_conditional(context, slice::from_ref(&record), &[], Some(update))
        );
    });

    assert_eq!(Some(1), record.read_field(1).map(|v| *v));
}

/// LLX and SCX outside of a scope
pub fn test_naked_operations<G: Guard, H: Helper>(operations: &LinkedOperations<H>) {
    let record = basic_record::<G>();
    let mut context = TestContext::<G>::new();

    assert!(matches!(
        operations.load_link(&mut context, &record),
        Err(LinkError::NakedOperation)
    ));
    assert_eq!(
        Err(LinkError::NakedOperation),
        operations.store_conditional(&context, slice::from_ref(&record), &[], None)
    );

    // A link does not outlive its scope.
    context.with_linked_operations(|context| {
        assert!(operations.load_link(context, &record).unwrap().is_success());
    });
    assert_eq!(0, context.linked_count());
    assert_eq!(
        Err(LinkError::NakedOperation),
        operations.store_conditional(&context, slice::from_ref(&record), &[], None)
    );
    assert!(operations
        .prepare_store_conditional(&context, slice::from_ref(&record), &[], None)
        .is_err());
}

/// One case per SCX precondition; a rejected SCX changes nothing
pub fn test_scx_preconditions<G: Guard, H: Helper>(operations: &LinkedOperations<H>) {
    let linked = basic_record::<G>();
    let linked_other = basic_record::<G>();
    let unlinked = basic_record::<G>();
    let mut context = TestContext::<G>::new();

    context.with_linked_operations(|context| {
        assert!(operations.load_link(context, &linked).unwrap().is_success());
        assert!(operations.load_link(context, &linked_other).unwrap().is_success());
        assert_eq!(2, context.linked_count());

        assert_eq!(
            Err(LinkError::from(UnlinkedScx::AffectedRecord { index: 1 })),
            operations.store_conditional(context, &[linked.clone(), unlinked.clone()], &[], None)
        );

        assert_eq!(
            Err(LinkError::from(UnlinkedScx::FinalizeNotAffected { index: 0 })),
            operations.store_conditional(
                context,
                slice::from_ref(&linked),
                slice::from_ref(&linked_other),
                None
            )
        );

        assert_eq!(
            Err(LinkError::from(UnlinkedScx::RecordToModify)),
            operations.store_conditional(
                context,
                slice::from_ref(&linked),
                &[],
                Some(FieldUpdate::new(&unlinked, 0, 1))
            )
        );

        assert_eq!(
            Err(LinkError::from(UnlinkedScx::ModifyNotAffected)),
            operations.store_conditional(
                context,
                slice::from_ref(&linked),
                &[],
                Some(FieldUpdate::new(&linked_other, 0, 1))
            )
        );

        assert_eq!(
            Err(LinkError::from(UnlinkedScx::FieldOutOfRange { field: 10, len: 10 })),
            operations.store_conditional(
                context,
                slice::from_ref(&linked),
                &[],
                Some(FieldUpdate::new(&linked, 10, 1))
            )
        );

        // Rejections keep the links, and the valid SCX still goes through.
        assert_eq!(2, context.linked_count());
        assert_eq!(
            Ok(true),
            operations.store_conditional(
                context,
                slice::from_ref(&linked),
                &[],
                Some(FieldUpdate::new(&linked, 9, 90))
            )
        );
    });

    assert_eq!(Some(90), linked.read_field(9).map(|v| *v));
    assert!(!linked_other.is_marked());
    assert_eq!(Some(0), unlinked.read_field(0).map(|v| *v));
}

/// An SCX over a stale link fails, and the snapshot it was based on is
/// unaffected by the SCX that won
pub fn test_stale_link_scx_fails<G: Guard, H: Helper>(operations: &LinkedOperations<H>) {
    let record = basic_record::<G>();
    let mut first = TestContext::<G>::new();
    let mut second = TestContext::<G>::new();

    first.with_linked_operations(|first| {
        let snapshot = operations
            .load_link(first, &record)
            .unwrap()
            .into_snapshot()
            .expect("fresh record must link");

        second.with_linked_operations(|second| {
            assert!(operations.load_link(second, &record).unwrap().is_success());
            assert_eq!(
                Ok(true),
                operations.store_conditional(
                    second,
                    slice::from_ref(&record),
                    &[],
                    Some(FieldUpdate::new(&record, 0, 100))
                )
            );
        });

        assert_eq!(0, snapshot[0]);
        assert_eq!(
            Ok(false),
            operations.store_conditional(
                first,
                slice::from_ref(&record),
                &[],
                Some(FieldUpdate::new(&record, 0, snapshot[0] + 200))
            )
        );
    });

    assert_eq!(Some(100), record.read_field(0).map(|v| *v));
}

/// An LLX that does not succeed removes the record's earlier link
pub fn test_unsuccessful_llx_unlinks<G: Guard, H: Helper>(operations: &LinkedOperations<H>) {
    let record = basic_record::<G>();
    let mut first = TestContext::<G>::new();
    let mut second = TestContext::<G>::new();

    first.with_linked_operations(|first| {
        assert!(operations.load_link(first, &record).unwrap().is_success());
        assert!(first.is_linked(&record));

        second.with_linked_operations(|second| {
            assert!(operations.load_link(second, &record).unwrap().is_success());
            assert_eq!(
                Ok(true),
                operations.store_conditional(
                    second,
                    slice::from_ref(&record),
                    slice::from_ref(&record),
                    None
                )
            );
        });

        assert!(matches!(
            operations.load_link(first, &record).unwrap(),
            LoadLinkResult::Finalized
        ));
        assert!(!first.is_linked(&record));
        assert_eq!(
            Err(LinkError::from(UnlinkedScx::AffectedRecord { index: 0 })),
            operations.store_conditional(first, slice::from_ref(&record), &[], None)
        );
    });
}

/// Two records, one finalized and the other modified, in one SCX
pub fn test_scx_over_two_records<G: Guard, H: Helper>(operations: &LinkedOperations<H>) {
    let parent = basic_record::<G>();
    let child = basic_record::<G>();
    let mut context = TestContext::<G>::new();

    let mut affected = vec![parent.clone(), child.clone()];
    affected.sort_by_key(|record| record.id());

    context.with_linked_operations(|context| {
        for record in &affected {
            assert!(operations.load_link(context, record).unwrap().is_success());
        }
        assert_eq!(
            Ok(true),
            operations.store_conditional(
                context,
                &affected,
                slice::from_ref(&child),
                Some(FieldUpdate::new(&parent, 2, 42))
            )
        );
    });

    context.with_linked_operations(|context| {
        assert!(matches!(
            operations.load_link(context, &child).unwrap(),
            LoadLinkResult::Finalized
        ));
        let snapshot = operations
            .load_link(context, &parent)
            .unwrap()
            .into_snapshot()
            .expect("parent is not finalized");
        assert_eq!(vec![0, 1, 42, 3, 4, 5, 6, 7, 8, 9], snapshot.to_vec());
    });

    assert!(!parent.is_marked());
    assert!(child.is_marked());
}

/// Two SCXs prepared from the same link: one commits, the other aborts, and
/// neither state changes afterwards
pub fn test_conflicting_descriptors<G: Guard, H: Helper>(operations: &LinkedOperations<H>) {
    let record = basic_record::<G>();
    let mut context = TestContext::<G>::new();

    let (winner, loser) = context.with_linked_operations(|context| {
        assert!(operations.load_link(context, &record).unwrap().is_success());

        let winner = operations
            .prepare_store_conditional(
                context,
                slice::from_ref(&record),
                &[],
                Some(FieldUpdate::new(&record, 0, 1)),
            )
            .unwrap();
        let loser = operations
            .prepare_store_conditional(
                context,
                slice::from_ref(&record),
                &[],
                Some(FieldUpdate::new(&record, 0, 2)),
            )
            .unwrap();
        (winner, loser)
    });

    assert_eq!(ScxState::InProgress, winner.state());
    assert_eq!(0, winner.threads_helping());

    assert!(operations.helper().help(&winner));
    assert!(!operations.helper().help(&loser));
    assert_eq!(ScxState::Committed, winner.state());
    assert_eq!(ScxState::Aborted, loser.state());
    assert!(!loser.is_all_frozen());

    for _ in 0..3 {
        assert!(operations.helper().help(&winner));
        assert!(!operations.helper().help(&loser));
    }
    assert_eq!(ScxState::Committed, winner.state());
    assert_eq!(ScxState::Aborted, loser.state());
    assert_eq!(Some(1), record.read_field(0).map(|v| *v));
    assert!(record.is_owned_by(&winner));

    context.with_linked_operations(|context| {
        let snapshot = operations
            .load_link(context, &record)
            .unwrap()
            .into_snapshot()
            .expect("committed descriptor releases the record");
        assert_eq!(1, snapshot[0]);
    });
}

/// Helping a committed descriptor again returns true and writes nothing
pub fn test_help_after_commit_is_idempotent<G: Guard, H: Helper>(operations: &LinkedOperations<H>) {
    let records: Vec<_> = (0..8).map(|_| basic_record::<G>()).collect();
    let mut context = TestContext::<G>::new();

    let descriptor = context.with_linked_operations(|context| {
        for record in &records {
            assert!(operations.load_link(context, record).unwrap().is_success());
        }
        operations
            .prepare_store_conditional(
                context,
                &records,
                &records[..2],
                Some(FieldUpdate::new(&records[3], 5, 55)),
            )
            .unwrap()
    });

    assert!(operations.helper().help(&descriptor));
    assert_eq!(records.len(), descriptor.frozen_records());

    for _ in 0..4 {
        assert!(operations.helper().help(&descriptor));
    }

    assert_eq!(ScxState::Committed, descriptor.state());
    assert_eq!(records.len(), descriptor.frozen_records());
    assert_eq!(0, descriptor.threads_helping());
    assert_eq!(Some(55), records[3].read_field(5).map(|v| *v));
    assert!(records[..2].iter().all(|record| record.is_marked()));
    assert!(records[2..].iter().all(|record| !record.is_marked()));
}

/// Nested scopes share the links of the outermost one
pub fn test_nested_scopes_share_links<G: Guard, H: Helper>(operations: &LinkedOperations<H>) {
    let record = basic_record::<G>();
    let mut context = TestContext::<G>::new();

    context.with_linked_operations(|context| {
        context.with_linked_operations(|context| {
            assert!(operations.load_link(context, &record).unwrap().is_success());
        });

        assert!(context.is_linked(&record));
        assert_eq!(
            Ok(true),
            operations.store_conditional(
                context,
                slice::from_ref(&record),
                &[],
                Some(FieldUpdate::new(&record, 4, 44))
            )
        );
    });

    assert!(!context.in_scope());
    assert_eq!(Some(44), record.read_field(4).map(|v| *v));
}
