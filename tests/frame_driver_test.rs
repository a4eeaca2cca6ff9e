use std::time::Duration;

use futures::{StreamExt, executor::block_on, stream};
use gallery_xr::{
    config::ViewConfig,
    document::VirtualDocument,
    error::RenderError,
    frame::{FrameState, drive},
    lifecycle::SceneController,
    views,
};

use crate::common::test_utils::{Journal, RecordingRenderer, Step, mount_ar, offline};

mod common;

fn frames(n: usize) -> impl futures::Stream<Item = Duration> {
    stream::iter(std::iter::repeat(Duration::from_millis(16)).take(n))
}

#[test]
fn every_frame_renders_exactly_once() {
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let mut mounted = mount_ar(&mut doc, &journal);

    let done = block_on(drive(&mut mounted.controller, frames(5)));

    assert_eq!(done, 5);
    assert_eq!(journal.count(|s| *s == Step::Render), 5);
    assert_eq!(mounted.controller.frame_driver().ticks(), 5);
}

#[test]
fn stopping_mid_stream_ends_the_drive() {
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let mut mounted = mount_ar(&mut doc, &journal);
    let driver = mounted.controller.frame_driver();

    // the third frame arrives after the driver was stopped
    let ticks = frames(10).enumerate().map(move |(idx, dt)| {
        if idx == 2 {
            driver.stop();
        }
        dt
    });
    let done = block_on(drive(&mut mounted.controller, ticks));

    assert_eq!(done, 2);
    assert_eq!(journal.count(|s| *s == Step::Render), 2);
    assert_eq!(mounted.controller.frame_state(), FrameState::Stopped);
}

#[test]
fn no_frame_renders_after_teardown() {
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let mut mounted = mount_ar(&mut doc, &journal);
    block_on(drive(&mut mounted.controller, frames(3)));
    mounted.controller.teardown(&mut doc, &mut mounted.handle);
    let renders = journal.count(|s| *s == Step::Render);

    let done = block_on(drive(&mut mounted.controller, frames(3)));

    assert_eq!(done, 0);
    assert_eq!(journal.count(|s| *s == Step::Render), renders);
}

#[test]
fn a_lost_device_ends_the_drive() {
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let config = offline(ViewConfig::vr());
    let view = views::for_config(&config);
    let renderer_journal = journal.clone();
    let mut mounted = SceneController::mount(config, view, &mut doc, move |_| {
        Ok(RecordingRenderer::failing(renderer_journal, RenderError::DeviceLost))
    });

    let done = block_on(drive(&mut mounted.controller, frames(4)));

    assert_eq!(done, 1);
    assert_eq!(journal.count(|s| *s == Step::Render), 1);
    assert_eq!(mounted.controller.frame_state(), FrameState::Stopped);
}

#[test]
fn transient_render_errors_keep_the_drive_going() {
    let journal = Journal::default();
    let mut doc = VirtualDocument::default();
    let config = offline(ViewConfig::vr());
    let view = views::for_config(&config);
    let renderer_journal = journal.clone();
    let mut mounted = SceneController::mount(config, view, &mut doc, move |_| {
        Ok(RecordingRenderer::failing(
            renderer_journal,
            RenderError::Surface("timeout".to_string()),
        ))
    });

    let done = block_on(drive(&mut mounted.controller, frames(4)));

    assert_eq!(done, 4);
    assert_eq!(mounted.controller.frame_state(), FrameState::Running);
}
