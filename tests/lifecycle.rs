use onionskin::{
    BakeReport, Frame, LoopStatus, ManualOverlayHost, MemoryScene, ObjectId, OnionSettings,
    OnionSkin, OnionSource, RecordedBatch, RecordingRenderer, SamplingMode, SceneHost,
    SelectionOutcome, StopReason, TICK_INTERVAL,
};

fn scene() -> MemoryScene {
    MemoryScene::from_json(include_str!("data/walk_scene.json")).unwrap()
}

fn onion() -> OnionSkin<RecordedBatch> {
    OnionSkin::new(OnionSettings {
        skin_count: 3,
        ..OnionSettings::default()
    })
    .unwrap()
}

fn body() -> OnionSource {
    OnionSource::Single(ObjectId::new("body"))
}

#[test]
fn loop_keeps_running_while_nothing_changes() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut overlay = ManualOverlayHost::new();
    let mut onion = onion();

    onion.set_onion_source(&mut scene, &mut renderer, body()).unwrap();
    onion.set_toggle(&mut overlay, true).unwrap();
    assert_eq!(overlay.timers.values().copied().collect::<Vec<_>>(), vec![TICK_INTERVAL]);

    for _ in 0..3 {
        assert_eq!(onion.tick(&scene, &mut overlay), LoopStatus::Running);
    }
    assert_eq!(overlay.handlers.len(), 1);
}

#[test]
fn toggling_off_releases_handler_and_timer() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut overlay = ManualOverlayHost::new();
    let mut onion = onion();

    onion.set_onion_source(&mut scene, &mut renderer, body()).unwrap();
    onion.set_toggle(&mut overlay, true).unwrap();
    onion.set_toggle(&mut overlay, false).unwrap();

    assert!(overlay.is_idle());
    assert!(!onion.is_running());
    assert_eq!(onion.tick(&scene, &mut overlay), LoopStatus::Idle);
}

#[test]
fn mode_change_stops_loop_without_rebaking() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut overlay = ManualOverlayHost::new();
    let mut onion = onion();

    onion.set_onion_source(&mut scene, &mut renderer, body()).unwrap();
    let compiled = renderer.compiled;
    onion.set_toggle(&mut overlay, true).unwrap();

    onion.set_mode(Some(SamplingMode::DirectKeys));
    assert_eq!(
        onion.tick(&scene, &mut overlay),
        LoopStatus::Stopped(StopReason::ModeChanged)
    );
    assert!(overlay.is_idle());
    assert!(!onion.is_toggled());
    assert_eq!(renderer.compiled, compiled);
    assert_eq!(onion.frames().mode(), Some(SamplingMode::PerFrame));
}

#[test]
fn deleting_the_source_object_stops_loop() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut overlay = ManualOverlayHost::new();
    let mut onion = onion();

    onion.set_onion_source(&mut scene, &mut renderer, body()).unwrap();
    onion.set_toggle(&mut overlay, true).unwrap();
    scene.remove(&ObjectId::new("body"));

    assert_eq!(
        onion.tick(&scene, &mut overlay),
        LoopStatus::Stopped(StopReason::SourceInvalid)
    );
    assert!(overlay.is_idle());
}

#[test]
fn group_survives_while_any_member_exists() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut overlay = ManualOverlayHost::new();
    let mut onion = onion();

    let group = OnionSource::Group(vec![ObjectId::new("body"), ObjectId::new("arm")]);
    onion.set_onion_source(&mut scene, &mut renderer, group).unwrap();
    onion.set_toggle(&mut overlay, true).unwrap();

    scene.remove(&ObjectId::new("arm"));
    assert_eq!(onion.tick(&scene, &mut overlay), LoopStatus::Running);

    scene.remove(&ObjectId::new("body"));
    assert_eq!(
        onion.tick(&scene, &mut overlay),
        LoopStatus::Stopped(StopReason::SourceInvalid)
    );
}

#[test]
fn clearing_the_source_stops_loop_and_empties_cache() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut overlay = ManualOverlayHost::new();
    let mut onion = onion();

    onion.set_onion_source(&mut scene, &mut renderer, body()).unwrap();
    onion.set_toggle(&mut overlay, true).unwrap();
    assert!(!onion.frames().is_empty());

    onion.clear_onion_source(&mut scene, &mut overlay);
    assert!(onion.source().is_none());
    assert!(onion.frames().is_empty());
    assert!(overlay.is_idle());
    assert_eq!(onion.tick(&scene, &mut overlay), LoopStatus::Idle);
}

#[test]
fn changing_source_drops_the_old_frames() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut onion = onion();

    onion.set_onion_source(&mut scene, &mut renderer, body()).unwrap();
    assert_eq!(onion.frames().len(), 20);

    let report = onion
        .set_onion_source(
            &mut scene,
            &mut renderer,
            OnionSource::Single(ObjectId::new("body_proxy")),
        )
        .unwrap();
    assert_eq!(report, BakeReport::Baked { frames: 4 });
    assert_eq!(
        onion.frames().keys().map(|f| f.0).collect::<Vec<_>>(),
        vec![5, 6, 7, 8]
    );
    assert_eq!(scene.temporary_count(), 0);
}

#[test]
fn no_mode_leaves_cache_untouched() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut onion = onion();

    onion.set_onion_source(&mut scene, &mut renderer, body()).unwrap();
    onion.set_mode(None);
    assert_eq!(onion.rebake(&mut scene, &mut renderer).unwrap(), BakeReport::NoMode);
    assert_eq!(onion.frames().len(), 20);
}

#[test]
fn rebake_without_source_reports_it() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut onion = onion();
    assert_eq!(onion.rebake(&mut scene, &mut renderer).unwrap(), BakeReport::NoSource);
}

#[test]
fn failed_rebake_keeps_previous_frames() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut onion = onion();

    onion.set_onion_source(&mut scene, &mut renderer, body()).unwrap();
    let before = onion.frames();

    scene.fail_evaluation_at = Some(Frame(10));
    onion.set_mode(Some(SamplingMode::DirectKeys));
    assert!(onion.rebake(&mut scene, &mut renderer).is_err());

    assert_eq!(onion.frames().len(), before.len());
    assert_eq!(onion.frames().mode(), Some(SamplingMode::PerFrame));
    assert_eq!(scene.current_frame(), Frame(12));
}

#[test]
fn selection_keeps_only_meshes() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut onion = onion();

    let selection = [
        ObjectId::new("camera"),
        ObjectId::new("arm"),
        ObjectId::new("body_proxy"),
    ];
    onion
        .set_onion_from_selection(&mut scene, &mut renderer, &selection)
        .unwrap();
    assert_eq!(
        onion.source(),
        Some(&OnionSource::Group(vec![ObjectId::new("arm")]))
    );
    assert_eq!(onion.frames().len(), 20);
}

#[test]
fn selection_without_meshes_is_rejected() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut onion = onion();

    let err = onion
        .set_onion_from_selection(&mut scene, &mut renderer, &[ObjectId::new("camera")])
        .unwrap_err();
    assert!(err.to_string().starts_with("validation error:"));
    assert!(onion.source().is_none());
}

#[test]
fn add_or_clear_alternates() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut overlay = ManualOverlayHost::new();
    let mut onion = onion();
    let selection = [ObjectId::new("body")];

    let out = onion
        .add_or_clear(&mut scene, &mut renderer, &mut overlay, &selection)
        .unwrap();
    assert_eq!(out, SelectionOutcome::Set(BakeReport::Baked { frames: 20 }));

    let out = onion
        .add_or_clear(&mut scene, &mut renderer, &mut overlay, &selection)
        .unwrap();
    assert_eq!(out, SelectionOutcome::Cleared);
    assert!(onion.source().is_none());

    let out = onion
        .add_or_clear(&mut scene, &mut renderer, &mut overlay, &[])
        .unwrap();
    assert_eq!(out, SelectionOutcome::NeedsSelection);
}

#[test]
fn in_front_is_pushed_to_source_objects() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut onion = onion();
    let group = OnionSource::Group(vec![ObjectId::new("body"), ObjectId::new("arm")]);
    onion.set_onion_source(&mut scene, &mut renderer, group).unwrap();

    onion.set_in_front(&mut scene, true);
    assert!(scene.in_front(&ObjectId::new("body")));
    assert!(scene.in_front(&ObjectId::new("arm")));
    assert!(!scene.in_front(&ObjectId::new("camera")));

    onion.set_in_front(&mut scene, false);
    assert!(!scene.in_front(&ObjectId::new("body")));
}

#[test]
fn in_front_follows_the_source_across_changes() {
    let mut scene = scene();
    let mut renderer = RecordingRenderer::new();
    let mut overlay = ManualOverlayHost::new();
    let mut onion = onion();
    let body_id = ObjectId::new("body");
    let arm_id = ObjectId::new("arm");

    onion.set_onion_source(&mut scene, &mut renderer, body()).unwrap();
    onion.set_in_front(&mut scene, true);
    assert!(scene.in_front(&body_id));

    onion.clear_onion_source(&mut scene, &mut overlay);
    assert!(!scene.in_front(&body_id));

    onion
        .set_onion_source(&mut scene, &mut renderer, OnionSource::Single(arm_id.clone()))
        .unwrap();
    assert!(onion.settings().in_front);
    assert!(scene.in_front(&arm_id));

    onion
        .set_onion_source(&mut scene, &mut renderer, body())
        .unwrap();
    assert!(!scene.in_front(&arm_id));
    assert!(scene.in_front(&body_id));
}
