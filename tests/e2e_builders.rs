//! End-to-end tests for the relation builders.
//!
//! Each test places candidates on a page at interline 20 px, runs `link()`
//! and inspects what the catalog produced.

use std::sync::Arc;

use omr_sig::{
    builder, AxisWeights, BeamPortion, Candidate, Error, EventLog, Footprint, Inter, InterId,
    PageGraph, RelId, RelationKind, RelationScan, Scale, Shape, Sig, SigConfig, SigEvent, Support,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Helper: two beamed eighth notes plus a stem under the middle of the beam
// ============================================================================

struct Beamed {
    page: PageGraph,
    beam: InterId,
    stems: [InterId; 3],
    heads: [InterId; 2],
}

fn beamed_pair() -> Beamed {
    let mut page = PageGraph::with_defaults(20.0).unwrap();
    let beam = page
        .add_candidate(Shape::Beam, Footprint::new(100, 50, 100, 10), 0.6)
        .unwrap();
    let stems = [
        page.add_candidate(Shape::Stem, Footprint::new(101, 60, 2, 50), 0.5).unwrap(),
        page.add_candidate(Shape::Stem, Footprint::new(197, 60, 2, 50), 0.5).unwrap(),
        page.add_candidate(Shape::Stem, Footprint::new(149, 60, 2, 50), 0.5).unwrap(),
    ];
    let heads = [
        page.add_candidate(Shape::NoteheadBlack, Footprint::new(82, 94, 20, 16), 0.7).unwrap(),
        page.add_candidate(Shape::NoteheadBlack, Footprint::new(178, 94, 20, 16), 0.7).unwrap(),
    ];
    Beamed { page, beam, stems, heads }
}

fn names(page: &PageGraph, ids: &[RelId]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| page.sig().relation(*id))
        .filter_map(|rel| rel.support().map(|s| s.name.clone()))
        .collect()
}

// ============================================================================
// 1. Heads, stems and a beam
// ============================================================================

#[test]
fn test_beamed_notes_link() {
    let Beamed { mut page, beam, stems, heads } = beamed_pair();

    let created = page.link().unwrap();
    assert_eq!(
        names(&page, &created),
        vec!["Head-Stem", "Head-Stem", "Beam-Stem", "Beam-Stem", "Beam-Stem"]
    );

    let first = page.sig().relation(created[0]).unwrap();
    assert_eq!((first.source, first.target), (heads[0], stems[0]));
    let second = page.sig().relation(created[1]).unwrap();
    assert_eq!((second.source, second.target), (heads[1], stems[1]));

    // a stem sitting on the head's right edge is a perfect connection
    assert_eq!(first.support().unwrap().source_coeff, 1.0);
    assert_eq!(first.support().unwrap().target_coeff, 1.0);

    for rel in created.iter().skip(2).filter_map(|id| page.sig().relation(*id)) {
        assert_eq!(rel.source, beam);
    }
}

#[test]
fn test_beam_portions_by_stem_position() {
    let Beamed { mut page, stems, .. } = beamed_pair();
    page.link().unwrap();

    let portion_of = |stem: InterId| {
        page.sig()
            .supports(stem)
            .filter_map(|(rel, _)| rel.support())
            .find(|s| s.name == "Beam-Stem")
            .and_then(|s| s.portion)
    };
    assert_eq!(portion_of(stems[0]), Some(BeamPortion::Left));
    assert_eq!(portion_of(stems[1]), Some(BeamPortion::Right));
    assert_eq!(portion_of(stems[2]), Some(BeamPortion::Center));
}

#[test]
fn test_supported_symbols_gain_grade() {
    let Beamed { mut page, beam, stems, heads } = beamed_pair();
    page.link().unwrap();

    let report = page.resolve();
    assert!(report.is_converged());
    assert!(report.removed.is_empty());

    for id in stems.iter().chain(heads.iter()).chain([beam].iter()) {
        let inter = page.sig().inter(*id).unwrap();
        assert!(
            inter.grade() > inter.intrinsic_grade(),
            "{id} should be boosted: {} vs {}",
            inter.grade(),
            inter.intrinsic_grade()
        );
    }
}

// ============================================================================
// 2. Re-linking after an edit
// ============================================================================

#[test]
fn test_relink_after_deletion_adds_nothing() {
    let Beamed { mut page, heads, stems, .. } = beamed_pair();
    page.link().unwrap();
    assert_eq!(page.sig().relation_count(), 5);

    assert!(page.sig_mut().remove_inter(heads[1]));
    assert_eq!(page.sig().relation_count(), 4);
    assert_eq!(page.sig().supports(stems[1]).count(), 1);

    assert!(page.link().unwrap().is_empty());
    assert_eq!(page.sig().relation_count(), 4);
}

// ============================================================================
// 3. Scan determinism
// ============================================================================

#[test]
fn test_scan_is_deterministic() {
    let Beamed { page, .. } = beamed_pair();
    let scan = RelationScan::new(&page.config().catalog, page.scale());

    let first = scan.collect(page.sig());
    for _ in 0..8 {
        assert_eq!(scan.collect(page.sig()), first);
    }
}

#[test]
fn test_identical_pages_resolve_identically() {
    let run = || {
        let Beamed { mut page, .. } = beamed_pair();
        // a competing head overlapping the first one
        page.add_candidate(Shape::NoteheadVoid, Footprint::new(84, 94, 20, 16), 0.65)
            .unwrap();
        page.link().unwrap();
        let report = page.resolve();
        (report, page.snapshot())
    };
    let (r1, s1) = run();
    let (r2, s2) = run();
    assert_eq!(r1, r2);
    assert_eq!(s1, s2);
    assert_eq!(r1.removed.len(), 1);
}

// ============================================================================
// 4. Graph-changed events
// ============================================================================

#[test]
fn test_events_follow_link_and_resolve() {
    let mut page = PageGraph::with_defaults(20.0).unwrap();
    let sharp = page
        .add_candidate(Shape::Sharp, Footprint::new(90, 40, 10, 30), 0.55)
        .unwrap();
    page.add_candidate(Shape::Natural, Footprint::new(91, 40, 10, 30), 0.6)
        .unwrap();
    page.add_candidate(Shape::NoteheadBlack, Footprint::new(104, 50, 20, 10), 0.8)
        .unwrap();

    let log = Arc::new(EventLog::new());
    page.sig_mut().subscribe(log.clone());

    page.link().unwrap();
    assert_eq!(
        log.take(),
        vec![
            SigEvent::RelationAdded(RelId(0)),
            SigEvent::RelationAdded(RelId(1)),
            SigEvent::RelationAdded(RelId(2)),
        ]
    );

    page.resolve();
    assert_eq!(
        log.take(),
        vec![
            SigEvent::RelationRemoved(RelId(0)),
            SigEvent::RelationRemoved(RelId(2)),
            SigEvent::InterRemoved(sharp),
        ]
    );
    assert!(log.is_empty());
}

// ============================================================================
// 5. Relation types added through configuration
// ============================================================================

#[test]
fn test_config_defined_relation_type() {
    let config = SigConfig::from_toml_str(
        r#"
[[catalog.supports]]
name = "Head-Dot"
source = "Head"
target = "Other"
layout = { type = "SourceLeftOfTarget" }

[catalog.supports.connection]
x_in_gap_max = 0.1
x_out_gap_max = 1.0
y_gap_max = 0.5
in_weights = { x = 1.0, y = 1.0 }
out_weights = { x = 1.0, y = 1.0 }
"#,
    )
    .unwrap();

    let mut page = PageGraph::new(Arc::new(config), Scale::new(20.0).unwrap()).unwrap();
    let head = page
        .add_candidate(Shape::NoteheadVoid, Footprint::new(100, 100, 20, 16), 0.8)
        .unwrap();
    let dot = page
        .add_candidate(Shape::Dot, Footprint::new(126, 104, 6, 6), 0.4)
        .unwrap();
    // only the configured type exists now: an accidental finds nothing
    page.add_candidate(Shape::Sharp, Footprint::new(86, 90, 10, 30), 0.6)
        .unwrap();

    let created = page.link().unwrap();
    assert_eq!(created.len(), 1);
    let rel = page.sig().relation(created[0]).unwrap();
    assert_eq!((rel.source, rel.target), (head, dot));
    match &rel.kind {
        RelationKind::Support(s) => {
            assert_eq!(s.name, "Head-Dot");
            assert!(s.target_coeff > 0.0);
            assert_eq!(s.portion, None);
        }
        other => panic!("expected a support, got {other:?}"),
    }

    page.resolve();
    assert!(page.sig().inter(dot).unwrap().grade() > 0.4);
}

// ============================================================================
// 6. One bad relation type never sinks the others
// ============================================================================

/// Built-in catalog with the Head-Stem weight profiles zeroed out.
fn config_with_broken_head_stem() -> SigConfig {
    let mut config = SigConfig::default();
    for support in config.catalog.supports.iter_mut().filter(|s| s.name == "Head-Stem") {
        support.connection.in_weights = AxisWeights::new(0.0, 0.0);
        support.connection.out_weights = AxisWeights::new(0.0, 0.0);
    }
    config
}

/// Sharp left of a head, with a stem on the head's right edge.
fn accidental_head_stem(sig: &mut Sig) -> (InterId, InterId, InterId) {
    let mut add = |shape, fp, grade| sig.add_inter(Inter::new(shape, fp, grade).unwrap()).unwrap();
    let sharp = add(Shape::Sharp, Footprint::new(90, 40, 10, 30), 0.7);
    let head = add(Shape::NoteheadBlack, Footprint::new(104, 50, 20, 10), 0.6);
    let stem = add(Shape::Stem, Footprint::new(123, 20, 2, 40), 0.5);
    (sharp, head, stem)
}

#[test]
fn test_page_rejects_unvalidated_catalog() {
    let scale = Scale::new(20.0).unwrap();
    let result = PageGraph::new(Arc::new(config_with_broken_head_stem()), scale);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_invalid_type_skipped_during_scan() {
    let config = config_with_broken_head_stem();
    let scale = Scale::new(20.0).unwrap();
    let mut sig = Sig::new();
    let (sharp, head, _) = accidental_head_stem(&mut sig);

    let candidates = RelationScan::new(&config.catalog, &scale).collect(&sig);
    let created = builder::apply(&mut sig, candidates).unwrap();

    assert_eq!(created.len(), 1);
    let rel = sig.relation(created[0]).unwrap();
    assert_eq!((rel.source, rel.target), (sharp, head));
    assert_eq!(rel.support().unwrap().name, "Accid-Note");
}

#[test]
fn test_invalid_candidate_skipped_during_apply() {
    let config = SigConfig::default();
    let scale = Scale::new(20.0).unwrap();
    let mut sig = Sig::new();
    let (sharp, head, stem) = accidental_head_stem(&mut sig);

    let mut candidates = RelationScan::new(&config.catalog, &scale).collect(&sig);
    assert_eq!(candidates.len(), 2);
    candidates.insert(
        1,
        Candidate {
            source: sharp,
            target: stem,
            kind: RelationKind::Support(Support::new("Broken", 1.5, 0.2)),
        },
    );

    let created = builder::apply(&mut sig, candidates).unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(sig.relation_count(), 2);
    assert_eq!(sig.supports(head).count(), 2);
    assert_eq!(sig.supports(stem).count(), 1);
    assert!(sig.supports(sharp).all(|(_, other)| other == head));
}

// ============================================================================
// 7. Snapshot export
// ============================================================================

#[test]
fn test_snapshot_json_lists_survivors() {
    let Beamed { mut page, beam, .. } = beamed_pair();
    page.link().unwrap();
    page.resolve();

    let snapshot = page.snapshot();
    assert_eq!(snapshot.inters.len(), 6);
    assert_eq!(snapshot.relations.len(), 5);
    assert!(snapshot.inter(beam).unwrap().contextual_grade.is_some());

    let json = snapshot.to_json().unwrap();
    assert!(json.contains("Beam-Stem"));
    assert!(json.contains("Center"));
}
