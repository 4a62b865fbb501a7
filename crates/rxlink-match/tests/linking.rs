mod common;

use std::sync::Mutex;

use common::{FailingStore, PanickingStore, VecStore, id, record, record_with_salt};
use rxlink_match::{LinkError, LinkOptions, LinkingOrchestrator, MatchError};
use rxlink_model::{LinkMethod, LinkingStatistics, MedicineInput, StoreError};

fn catalog() -> VecStore {
    VecStore::new(vec![
        record(1, "Dolo"),
        record(5, "Paracetamol"),
        record(7, "Pantocid DSR Capsule"),
        record(8, "Pantocid 40"),
        record(9, "Pantocid HP Kit"),
        record_with_salt(20, "Calpol", "Paracetamol", "500"),
    ])
}

fn batch() -> Vec<MedicineInput> {
    vec![
        MedicineInput::new("Dolo"),
        MedicineInput::new("Whatever").with_existing_id(id(99)),
        MedicineInput::new("Xyzzyxx"),
        MedicineInput::new("   "),
        MedicineInput::new("Para"),
        MedicineInput::new("Pantocid DSR Capsul"),
    ]
}

fn methods(orchestrator: &LinkingOrchestrator<VecStore>, options: &LinkOptions) -> Vec<LinkMethod> {
    orchestrator
        .process_linking(&batch(), options)
        .expect("batch")
        .medicines
        .iter()
        .map(|m| m.method)
        .collect()
}

#[test]
fn batch_outcomes_follow_input_order() {
    let orchestrator = LinkingOrchestrator::from_store(catalog());
    let report = orchestrator
        .process_linking(&batch(), &LinkOptions::default())
        .expect("batch");

    let indices: Vec<usize> = report.medicines.iter().map(|m| m.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(
        methods(&orchestrator, &LinkOptions::default()),
        vec![
            LinkMethod::Exact,
            LinkMethod::Manual,
            LinkMethod::Failed,
            LinkMethod::NotLinked,
            LinkMethod::Failed,
            LinkMethod::Fuzzy,
        ]
    );

    let low = &report.medicines[4];
    assert_eq!(low.suggestion.as_ref().map(|r| r.id), Some(id(5)));
    assert!(low.medicine_id.is_none());
    assert_eq!(
        report.medicines[3].error.as_deref(),
        Some("Medicine name is required")
    );
    assert_eq!(report.medicines[0].display_name(), "Dolo");
    assert_eq!(report.linked().count(), 3);
}

#[test]
fn statistics_snapshot() {
    let report = LinkingOrchestrator::from_store(catalog())
        .process_linking(&batch(), &LinkOptions::default())
        .expect("batch");
    insta::assert_json_snapshot!(report.statistics, @r#"
    {
      "total": 6,
      "manual": 1,
      "exact": 1,
      "fuzzy": 1,
      "composition": 0,
      "failed": 2,
      "not_linked": 1,
      "high_confidence": 2,
      "medium_confidence": 1,
      "low_confidence": 0
    }
    "#);
}

#[test]
fn parallel_batch_matches_sequential() {
    let orchestrator = LinkingOrchestrator::from_store(catalog());
    let sequential = orchestrator
        .process_linking(&batch(), &LinkOptions::default())
        .expect("sequential");
    let parallel = orchestrator
        .process_linking(
            &batch(),
            &LinkOptions {
                parallel: true,
                ..LinkOptions::default()
            },
        )
        .expect("parallel");
    assert_eq!(sequential, parallel);
}

#[test]
fn statistics_ignore_input_order() {
    let orchestrator = LinkingOrchestrator::from_store(catalog());
    let forward = orchestrator
        .process_linking(&batch(), &LinkOptions::default())
        .expect("forward")
        .statistics;
    let mut reversed_input = batch();
    reversed_input.reverse();
    let reversed = orchestrator
        .process_linking(&reversed_input, &LinkOptions::default())
        .expect("reversed")
        .statistics;
    assert_eq!(forward, reversed);

    let every_item_bucketed = forward.manual
        + forward.exact
        + forward.fuzzy
        + forward.composition
        + forward.failed
        + forward.not_linked;
    assert_eq!(every_item_bucketed, forward.total);
    assert_eq!(
        forward.high_confidence + forward.medium_confidence + forward.low_confidence,
        forward.linked()
    );
}

#[test]
fn manual_links_never_query_the_store() {
    let inputs = vec![
        MedicineInput::new("Anything").with_existing_id(id(3)),
        MedicineInput::new("Else").with_existing_id(id(4)),
    ];
    for parallel in [false, true] {
        let options = LinkOptions {
            parallel,
            require_link: true,
            ..LinkOptions::default()
        };
        let report = LinkingOrchestrator::from_store(PanickingStore)
            .process_linking(&inputs, &options)
            .expect("manual batch");
        assert_eq!(report.statistics.manual, 2);
        assert_eq!(report.statistics.high_confidence, 2);
        assert_eq!(report.medicines[1].medicine_id, Some(id(4)));
        assert_eq!(report.medicines[1].confidence, Some(1.0));
    }
}

#[test]
fn disabled_auto_link_skips_search() {
    let inputs = vec![
        MedicineInput::new("Dolo"),
        MedicineInput::new("Crocin").with_existing_id(id(3)),
    ];
    let options = LinkOptions {
        auto_link: false,
        ..LinkOptions::default()
    };
    let report = LinkingOrchestrator::from_store(PanickingStore)
        .process_linking(&inputs, &options)
        .expect("batch");
    assert_eq!(report.medicines[0].method, LinkMethod::NotLinked);
    assert_eq!(report.medicines[1].method, LinkMethod::Manual);
    assert_eq!(report.statistics.not_linked, 1);
}

#[test]
fn required_links_abort_at_first_unlinked_medicine() {
    for parallel in [false, true] {
        let options = LinkOptions {
            require_link: true,
            parallel,
            ..LinkOptions::default()
        };
        let err = LinkingOrchestrator::from_store(catalog())
            .process_linking(&batch(), &options)
            .expect_err("batch aborts");
        assert_eq!(
            err,
            LinkError::BatchAbort {
                index: 2,
                name: "Xyzzyxx".to_string(),
                reason: "Medicine not found in catalog".to_string(),
            }
        );
        assert_eq!(err.index(), 2);
    }
}

#[test]
fn parallel_abort_skips_medicines_after_the_failure() {
    let inputs: Vec<MedicineInput> = ["Dolo", "Xyzzyxx", "Dolo", "Paracetamol", "Dolo", "Qqqqzz"]
        .into_iter()
        .map(MedicineInput::new)
        .collect();
    let options = LinkOptions {
        require_link: true,
        parallel: true,
        ..LinkOptions::default()
    };
    let orchestrator = LinkingOrchestrator::from_store(catalog());
    let seen = Mutex::new(Vec::new());
    // one worker visits medicines in input order
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .expect("thread pool");
    let err = pool
        .install(|| {
            orchestrator.process_linking_with(&inputs, &options, |medicine| {
                seen.lock().expect("lock").push(medicine.index);
            })
        })
        .expect_err("batch aborts");
    assert_eq!(err.index(), 1);
    assert_eq!(seen.into_inner().expect("lock"), vec![0]);
}

#[test]
fn store_failure_is_best_effort_unless_links_are_required() {
    let inputs = vec![MedicineInput::new("Dolo")];
    let orchestrator = LinkingOrchestrator::from_store(FailingStore(StoreError::unavailable(
        "connection refused",
    )));

    let report = orchestrator
        .process_linking(&inputs, &LinkOptions::default())
        .expect("best effort");
    assert_eq!(report.medicines[0].method, LinkMethod::NotLinked);
    assert!(
        report.medicines[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("connection refused"))
    );

    let options = LinkOptions {
        require_link: true,
        ..LinkOptions::default()
    };
    let err = orchestrator
        .process_linking(&inputs, &options)
        .expect_err("required");
    assert!(matches!(
        err,
        LinkError::Store {
            index: 0,
            source: MatchError::StoreUnavailable { .. },
            ..
        }
    ));
}

#[test]
fn input_salt_drives_composition_fallback() {
    let inputs = vec![MedicineInput::new("Xqzv").with_salt("Paracetamol 500mg")];
    let report = LinkingOrchestrator::from_store(catalog())
        .process_linking(&inputs, &LinkOptions::default())
        .expect("batch");
    let linked = &report.medicines[0];
    assert_eq!(linked.method, LinkMethod::Composition);
    assert_eq!(linked.medicine_id, Some(id(20)));
    assert_eq!(linked.display_salt().as_deref(), Some("Paracetamol 500mg"));
    assert_eq!(report.statistics.composition, 1);
}

#[test]
fn empty_batch_yields_empty_report() {
    let report = LinkingOrchestrator::from_store(PanickingStore)
        .process_linking(&[], &LinkOptions::default())
        .expect("empty");
    assert!(report.medicines.is_empty());
    assert_eq!(report.statistics, LinkingStatistics::default());
}

#[test]
fn progress_callback_sees_every_medicine() {
    let orchestrator = LinkingOrchestrator::from_store(catalog());
    for parallel in [false, true] {
        let seen = Mutex::new(Vec::new());
        let options = LinkOptions {
            parallel,
            ..LinkOptions::default()
        };
        orchestrator
            .process_linking_with(&batch(), &options, |medicine| {
                seen.lock().expect("lock").push(medicine.index);
            })
            .expect("batch");
        let mut seen = seen.into_inner().expect("lock");
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }
}
