//! Fan-out behaviour of the region splitter.

mod common;

use cmf_core::{PixelArray, Rectangle};
use cmf_graph::prelude::*;
use cmf_graph::GraphConfig;

use common::{link, pipeline_with, pipeline_with_config, regions_options, region_ticket, Recorder};

fn left_right() -> [Rectangle; 2] {
    [
        Rectangle::new(0.0, 0.0, 50.0, 100.0),
        Rectangle::new(50.0, 0.0, 50.0, 100.0),
    ]
}

/// Leaves `[0..n)` of backend `leaf` → regions → output.
fn splitter(p: &mut Pipeline, leaf: &str, n: usize, regions: &[Rectangle]) -> (NodeId, NodeId) {
    let split = p
        .create_node("//image/regions", regions_options(regions))
        .unwrap();
    for _ in 0..n {
        let src = p.create_node(leaf, Options::new()).unwrap();
        link(p, src, split);
    }
    let out = p.create_node("//image/output", Options::new()).unwrap();
    link(p, split, out);
    (split, out)
}

#[test]
fn two_regions_two_calls() {
    let rec = Recorder::new("org/test/image/leaf", 100, 100, 0.5);
    let mut p = pipeline_with(&[rec.clone()]);
    let (_, out) = splitter(&mut p, "//test/image/leaf", 2, &left_right());

    let mut ticket = region_ticket(out, 100, 100, 1);
    let mut array = PixelArray::new(ticket.output_image_roi(), 1);
    let status = p.run(out, PlugRef::new(out, 0), &mut ticket, &mut array).unwrap();

    assert_eq!(status, Status::Success);
    assert_eq!(rec.calls(), left_right().to_vec());
    assert_eq!(array.get(0, 0), Some(&[0.5][..]));
    assert_eq!(array.get(99, 99), Some(&[0.5][..]));
}

#[test]
fn request_outside_coverage_runs_nothing() {
    let rec = Recorder::new("org/test/image/leaf", 100, 100, 1.0);
    let mut p = pipeline_with(&[rec.clone()]);
    let (_, out) = splitter(
        &mut p,
        "//test/image/leaf",
        1,
        &[Rectangle::new(0.0, 0.0, 50.0, 100.0)],
    );

    let roi = Rectangle::new(60.0, 0.0, 10.0, 10.0);
    let mut ticket = region_ticket(out, 100, 100, 1).with_roi(roi);
    let mut array = PixelArray::new(roi, 1);
    let status = p.run(out, PlugRef::new(out, 0), &mut ticket, &mut array).unwrap();

    assert_eq!(status, Status::Success);
    assert!(rec.calls().is_empty());
    assert!(!array.is_allocated());
}

#[test]
fn empty_branches_are_skipped() {
    let rec = Recorder::new("org/test/image/leaf", 100, 100, 1.0);
    let mut p = pipeline_with(&[rec.clone()]);
    let regions = [
        Rectangle::new(0.0, 0.0, 50.0, 50.0),
        Rectangle::new(50.0, 0.0, 50.0, 50.0),
        Rectangle::new(0.0, 50.0, 100.0, 50.0),
    ];
    let (_, out) = splitter(&mut p, "//test/image/leaf", 3, &regions);

    // the top half only touches the first two regions
    let roi = Rectangle::new(0.0, 0.0, 100.0, 50.0);
    let mut ticket = region_ticket(out, 100, 100, 1).with_roi(roi);
    let mut array = PixelArray::new(roi, 1);
    let status = p.run(out, PlugRef::new(out, 0), &mut ticket, &mut array).unwrap();

    assert_eq!(status, Status::Success);
    assert_eq!(rec.calls(), regions[..2].to_vec());
}

#[test]
fn tiled_regions_cover_the_request() {
    let rec = Recorder::new("org/test/image/leaf", 100, 100, 1.0);
    let mut p = pipeline_with(&[rec.clone()]);
    let quadrants = [
        Rectangle::new(0.0, 0.0, 50.0, 50.0),
        Rectangle::new(50.0, 0.0, 50.0, 50.0),
        Rectangle::new(0.0, 50.0, 50.0, 50.0),
        Rectangle::new(50.0, 50.0, 50.0, 50.0),
    ];
    let (_, out) = splitter(&mut p, "//test/image/leaf", 4, &quadrants);

    for (roi, expected_calls) in [
        (Rectangle::from_size(100.0, 100.0), 4),
        (Rectangle::new(40.0, 40.0, 20.0, 20.0), 4),
        (Rectangle::new(60.0, 10.0, 20.0, 20.0), 1),
        (Rectangle::new(10.0, 40.0, 20.0, 40.0), 2),
    ] {
        let before = rec.calls().len();
        let mut ticket = region_ticket(out, 100, 100, 1).with_roi(roi);
        let mut array = PixelArray::new(roi, 1);
        p.run(out, PlugRef::new(out, 0), &mut ticket, &mut array).unwrap();

        let calls = rec.calls()[before..].to_vec();
        assert_eq!(calls.len(), expected_calls, "{roi}");
        let union = calls
            .iter()
            .fold(Rectangle::default(), |u, r| u.union(r));
        assert_eq!(union, roi);
        let area: i64 = calls.iter().map(Rectangle::count_points).sum();
        assert_eq!(area, roi.count_points());
    }
}

#[test]
fn fewer_plugs_than_regions_warns() {
    let rec = Recorder::new("org/test/image/leaf", 100, 100, 1.0);
    let mut p = pipeline_with(&[rec.clone()]);
    let (_, out) = splitter(&mut p, "//test/image/leaf", 1, &left_right());

    let mut ticket = region_ticket(out, 100, 100, 1);
    let mut array = PixelArray::new(ticket.output_image_roi(), 1);
    let status = p.run(out, PlugRef::new(out, 0), &mut ticket, &mut array).unwrap();

    assert_eq!(status, Status::Success);
    assert_eq!(rec.calls(), vec![left_right()[0]]);
    assert_eq!(array.get(75, 0), Some(&[0.0][..]));
}

#[test]
fn open_middle_plug_is_skipped() {
    let rec = Recorder::new("org/test/image/leaf", 90, 90, 1.0);
    let mut p = pipeline_with(&[rec.clone()]);
    let columns = [
        Rectangle::new(0.0, 0.0, 30.0, 90.0),
        Rectangle::new(30.0, 0.0, 30.0, 90.0),
        Rectangle::new(60.0, 0.0, 30.0, 90.0),
    ];
    let (split, out) = splitter(&mut p, "//test/image/leaf", 3, &columns);
    p.disconnect(PlugRef::new(split, 1), Release::Keep).unwrap();

    let mut ticket = region_ticket(out, 90, 90, 1);
    let mut array = PixelArray::new(ticket.output_image_roi(), 1);
    let status = p.run(out, PlugRef::new(out, 0), &mut ticket, &mut array).unwrap();

    assert_eq!(status, Status::Success);
    assert_eq!(rec.calls(), vec![columns[0], columns[2]]);
    assert_eq!(array.get(75, 10), Some(&[1.0][..]));
    assert_eq!(array.get(45, 10), Some(&[0.0][..]));
}

#[test]
fn strict_count_mismatch_fails() {
    let rec = Recorder::new("org/test/image/leaf", 100, 100, 1.0);
    let config = GraphConfig::default().with_strict_upstream_count(true);
    let mut p = pipeline_with_config(&[rec.clone()], config);
    let (split, out) = splitter(&mut p, "//test/image/leaf", 1, &left_right());

    let mut ticket = region_ticket(out, 100, 100, 1);
    let mut array = PixelArray::new(ticket.output_image_roi(), 1);
    let err = p
        .run(out, PlugRef::new(out, 0), &mut ticket, &mut array)
        .unwrap_err();

    match err {
        GraphError::UpstreamCountMismatch { node, plugs, regions } => {
            assert_eq!((node, plugs, regions), (split, 1, 2));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(rec.calls().is_empty());
}

#[test]
fn failing_branch_does_not_stop_siblings() {
    let bad = Recorder::failing("org/test/image/bad", 100, 100);
    let good = Recorder::new("org/test/image/good", 100, 100, 0.75);
    let mut p = pipeline_with(&[bad.clone(), good.clone()]);

    let split = p
        .create_node("//image/regions", regions_options(&left_right()))
        .unwrap();
    let a = p.create_node("//test/image/bad", Options::new()).unwrap();
    let b = p.create_node("//test/image/good", Options::new()).unwrap();
    link(&mut p, a, split);
    link(&mut p, b, split);
    let out = p.create_node("//image/output", Options::new()).unwrap();
    link(&mut p, split, out);

    let mut ticket = region_ticket(out, 100, 100, 1);
    let mut array = PixelArray::new(ticket.output_image_roi(), 1);
    let err = p
        .run(out, PlugRef::new(out, 0), &mut ticket, &mut array)
        .unwrap_err();

    assert!(matches!(err, GraphError::BranchFailed { index: 0, .. }));
    assert!(matches!(err.root_cause(), GraphError::NoSample { .. }));
    assert!(err.code() >= 1);
    assert_eq!(bad.calls().len(), 1);
    assert_eq!(good.calls().len(), 1);
    assert_eq!(array.get(60, 10), Some(&[0.75][..]));
}

#[test]
fn relative_regions() {
    let rec = Recorder::new("org/test/image/leaf", 200, 100, 1.0);
    let mut p = pipeline_with(&[rec.clone()]);
    let split = p
        .create_node(
            "//image/regions",
            regions_options(&[
                Rectangle::new(0.0, 0.0, 0.5, 1.0),
                Rectangle::new(0.5, 0.0, 0.5, 1.0),
            ])
            .with("relative", true),
        )
        .unwrap();
    for _ in 0..2 {
        let leaf = p.create_node("//test/image/leaf", Options::new()).unwrap();
        link(&mut p, leaf, split);
    }
    let out = p.create_node("//image/output", Options::new()).unwrap();
    link(&mut p, split, out);

    let mut ticket = region_ticket(out, 200, 100, 1);
    let mut array = PixelArray::new(ticket.output_image_roi(), 1);
    p.run(out, PlugRef::new(out, 0), &mut ticket, &mut array).unwrap();
    assert_eq!(
        rec.calls(),
        vec![
            Rectangle::new(0.0, 0.0, 100.0, 100.0),
            Rectangle::new(100.0, 0.0, 100.0, 100.0),
        ]
    );
}

#[test]
fn forks_do_not_touch_the_parent() {
    let parent = region_ticket(NodeId(0), 100, 100, 1);
    let mut a = parent.fork(left_right()[0]);
    let b = parent.fork(left_right()[1]);
    a.set_roi(Rectangle::new(1.0, 2.0, 3.0, 4.0));

    assert_eq!(parent.output_image_roi(), Rectangle::from_size(100.0, 100.0));
    assert_eq!(b.output_image_roi(), left_right()[1]);
    assert_ne!(a.id(), b.id());
    assert_ne!(a.id(), parent.id());
}
