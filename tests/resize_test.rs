use gallery_xr::{config::ViewConfig, document::VirtualDocument, renderer::Renderer};

use crate::common::test_utils::{Journal, Step, mount_ar, mount_with};

mod common;

#[test]
fn each_resize_updates_aspect_and_surface_in_order() {
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let mut mounted = mount_ar(&mut doc, &journal);
    journal.clear();

    doc.set_viewport(800, 600);
    assert!(mounted.controller.on_resize(&doc, 800, 600));
    assert_eq!(mounted.controller.camera().unwrap().aspect(), 800.0 / 600.0);

    doc.set_viewport(400, 300);
    assert!(mounted.controller.on_resize(&doc, 400, 300));
    assert_eq!(mounted.controller.camera().unwrap().aspect(), 400.0 / 300.0);

    assert_eq!(journal.steps(), vec![Step::Size(800, 600), Step::Size(400, 300)]);
    assert_eq!(mounted.controller.renderer().map(|r| r.size()), Some((400, 300)));
}

#[test]
fn a_resize_refreshes_the_projection() {
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let mut mounted = mount_with(ViewConfig::vr(), &mut doc, &journal);
    let before = mounted.controller.camera().unwrap().projection_matrix();

    mounted.controller.on_resize(&doc, 1920, 1080);

    let camera = mounted.controller.camera().unwrap();
    assert!(!camera.is_projection_dirty());
    assert_ne!(camera.projection_matrix(), before);
    assert_eq!(camera.aspect(), 1920.0 / 1080.0);
}

#[test]
fn a_zero_area_viewport_is_ignored() {
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let mut mounted = mount_ar(&mut doc, &journal);
    journal.clear();

    assert!(!mounted.controller.on_resize(&doc, 0, 300));
    assert!(!mounted.controller.on_resize(&doc, 400, 0));

    assert_eq!(mounted.controller.camera().unwrap().aspect(), 800.0 / 600.0);
    assert_eq!(journal.count(|s| matches!(s, Step::Size(..))), 0);
}

#[test]
fn resizes_after_teardown_do_nothing() {
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let mut mounted = mount_ar(&mut doc, &journal);
    mounted.controller.teardown(&mut doc, &mut mounted.handle);
    journal.clear();

    assert!(!mounted.controller.on_resize(&doc, 400, 300));
    assert!(journal.steps().is_empty());
}

#[test]
fn a_view_whose_listener_was_dropped_stops_resizing() {
    use gallery_xr::document::Document;

    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let mut mounted = mount_ar(&mut doc, &journal);
    let listener = mounted.handle.listener().unwrap();
    assert!(doc.remove_resize_listener(listener));

    assert!(!mounted.controller.on_resize(&doc, 400, 300));
    assert_eq!(mounted.controller.camera().unwrap().aspect(), 800.0 / 600.0);

    // teardown copes with the listener being gone already
    let report = mounted.controller.teardown(&mut doc, &mut mounted.handle);
    assert!(!report.listener_removed);
    assert!(mounted.handle.is_released());
}

#[test]
fn a_new_pixel_ratio_reaches_the_renderer_before_the_size() {
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let mut mounted = mount_ar(&mut doc, &journal);
    journal.clear();

    doc.set_pixel_ratio(2.0);
    doc.set_viewport(1600, 1200);
    assert!(mounted.controller.on_resize(&doc, 1600, 1200));
    doc.set_viewport(1200, 900);
    assert!(mounted.controller.on_resize(&doc, 1200, 900));

    assert_eq!(
        journal.steps(),
        vec![
            Step::PixelRatio(2.0),
            Step::Size(1600, 1200),
            Step::Size(1200, 900)
        ]
    );
    assert_eq!(mounted.controller.renderer().map(|r| r.pixel_ratio()), Some(2.0));
}
