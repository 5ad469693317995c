use itertools::Itertools;
use score_rhythm::primitives::{Rational, RhythmTree, TimeError};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn r(numer: i64, denom: i64) -> Rational {
    Rational::new(numer, denom).unwrap()
}

#[test]
fn measure_in_three_with_split_first_beat() {
    init_logger();
    let mut tree = RhythmTree::new(Rational::one());
    let root = tree.root();
    let beats = tree.subdivide(root, 3).unwrap();
    let first = tree.subdivide(beats[0], 2).unwrap();

    assert_eq!(tree.children_of(root).unwrap(), beats.as_slice());
    for beat in beats.iter() {
        assert_eq!(tree.duration_of(*beat).unwrap(), r(1, 3));
    }
    for half in first.iter() {
        assert_eq!(tree.duration_of(*half).unwrap(), r(1, 6));
    }
    tree.leaves()
        .map(|leaf| leaf.timing())
        .zip_eq([r(0, 1), r(1, 6), r(1, 3), r(2, 3)])
        .for_each(|(a, b)| assert_eq!(a, b));
}

#[test]
fn every_subdivision_tiles_its_parent() {
    init_logger();
    let mut tree = RhythmTree::new(r(5, 8));
    let mut frontier = vec![tree.root()];
    for count in [3, 2, 5] {
        let mut next = Vec::new();
        for node in frontier {
            let children = tree.subdivide(node, count).unwrap();
            let parent = tree.node(node).unwrap();
            let total: Rational = children
                .iter()
                .map(|ch| tree.duration_of(*ch).unwrap())
                .sum();
            assert_eq!(total, parent.duration());
            assert_eq!(tree.timing_of(children[0]).unwrap(), parent.timing());
            for (a, b) in children.iter().tuple_windows() {
                assert_eq!(tree.node(*a).unwrap().end(), tree.timing_of(*b).unwrap());
            }
            for child in children.iter() {
                assert_eq!(tree.depth_of(*child).unwrap(), parent.depth() + 1);
            }
            next.extend(children);
        }
        frontier = next;
    }
    assert_eq!(tree.leaves().count(), 30);
    let total: Rational = tree.leaves().map(|leaf| leaf.duration()).sum();
    assert_eq!(total, r(5, 8));
}

#[test]
fn failed_subdivision_keeps_tree() {
    init_logger();
    let mut tree = RhythmTree::new(Rational::one());
    let root = tree.root();
    let beats = tree.subdivide(root, 2).unwrap();
    let before = tree.subdivision_counts();

    assert_eq!(
        tree.subdivide(root, 2),
        Err(TimeError::AlreadySubdivided(root))
    );
    assert!(matches!(
        tree.subdivide(beats[0], -1),
        Err(TimeError::InvalidSubdivisionCount { count: -1, .. })
    ));
    assert_eq!(tree.subdivision_counts(), before);
    assert_eq!(tree.children_of(root).unwrap(), beats.as_slice());
}

#[test]
fn subdivision_counts_round_trip() {
    init_logger();
    let mut tree = RhythmTree::new(r(3, 4));
    let beats = tree.subdivide(tree.root(), 3).unwrap();
    tree.subdivide(beats[0], 2).unwrap();
    let last = tree.subdivide(beats[2], 5).unwrap();
    tree.subdivide(last[4], 2).unwrap();

    let counts = tree.subdivision_counts();
    let rebuilt = RhythmTree::from_subdivision_counts(r(3, 4), &counts).unwrap();
    assert_eq!(rebuilt.subdivision_counts(), counts);
    assert_eq!(rebuilt.node_count(), tree.node_count());
    tree.leaves()
        .zip_eq(rebuilt.leaves())
        .for_each(|(a, b)| {
            assert_eq!(a.depth(), b.depth());
            assert_eq!(a.timing(), b.timing());
            assert_eq!(a.duration(), b.duration());
        });
}

#[test]
fn serde_round_trip() {
    init_logger();
    let mut tree = RhythmTree::new(r(6, 8));
    let halves = tree.subdivide(tree.root(), 2).unwrap();
    tree.subdivide(halves[1], 3).unwrap();

    let json = serde_json::to_string(&tree).unwrap();
    assert_eq!(json, r#"{"duration":[3,4],"subdivisions":[2,0,3,0,0,0]}"#);
    let restored: RhythmTree = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.to_string(), tree.to_string());
    assert_eq!(restored.total_duration(), r(3, 4));

    assert!(serde_json::from_str::<RhythmTree>(
        r#"{"duration":[1,0],"subdivisions":[0]}"#
    )
    .is_err());
    assert!(serde_json::from_str::<RhythmTree>(
        r#"{"duration":[1,1],"subdivisions":[2,0]}"#
    )
    .is_err());
    assert!(serde_json::from_str::<RhythmTree>(
        r#"{"duration":[1,1],"subdivisions":[4611686018427387904]}"#
    )
    .is_err());
    assert!(serde_json::from_str::<RhythmTree>(
        r#"{"duration":[-9223372036854775808,-1],"subdivisions":[0]}"#
    )
    .is_err());
}
