use std::{sync::Arc, time::Duration};

use crate::{
    bake::{BakeOutcome, BakedFrames, FrameStore, bake},
    compositor::{CompositeStats, composite},
    config::OnionSettings,
    foundation::error::{OnionError, OnionResult},
    host::{HandlerId, ObjectId, ObjectKind, OverlayHost, OverlayRenderer, SceneHost, TimerId},
    sampling::SamplingMode,
    source::OnionSource,
};

/// Interval of the liveness timer registered while the overlay is drawing.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a (re)bake request. Only `Baked` replaces the published frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BakeReport {
    Baked { frames: usize },
    NoKeyframes,
    NoMode,
    NoSource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    ToggledOff,
    ModeChanged,
    SourceCleared,
    SourceInvalid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopStatus {
    Idle,
    Running,
    Stopped(StopReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionOutcome {
    Set(BakeReport),
    Cleared,
    /// The selection holds no mesh; nothing changed.
    NeedsSelection,
}

#[derive(Debug)]
struct DrawSession {
    mode: Option<SamplingMode>,
    handler: HandlerId,
    timer: TimerId,
}

/// Owns the onion source, the published frames, and the draw loop.
pub struct OnionSkin<B> {
    settings: OnionSettings,
    source: Option<OnionSource>,
    store: FrameStore<B>,
    toggle: bool,
    session: Option<DrawSession>,
}

impl<B> OnionSkin<B> {
    pub fn new(settings: OnionSettings) -> OnionResult<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            source: None,
            store: FrameStore::new(),
            toggle: false,
            session: None,
        })
    }

    pub fn settings(&self) -> &OnionSettings {
        &self.settings
    }

    /// Replace the settings. A mode change stops a running loop on its next tick; it does
    /// not rebake.
    pub fn set_settings(&mut self, settings: OnionSettings) -> OnionResult<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn set_mode(&mut self, mode: Option<SamplingMode>) {
        self.settings.mode = mode;
    }

    pub fn source(&self) -> Option<&OnionSource> {
        self.source.as_ref()
    }

    /// The frames the compositor currently reads.
    pub fn frames(&self) -> Arc<BakedFrames<B>> {
        self.store.load()
    }

    pub fn is_toggled(&self) -> bool {
        self.toggle
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Make `source` the active source, drop every cached frame, and bake.
    #[tracing::instrument(skip_all)]
    pub fn set_onion_source<R>(
        &mut self,
        scene: &mut dyn SceneHost,
        renderer: &mut R,
        source: OnionSource,
    ) -> OnionResult<BakeReport>
    where
        R: OverlayRenderer<Batch = B>,
    {
        source.validate()?;
        self.release_in_front(scene);
        self.store.clear();
        tracing::info!(source = ?source, "onion source set");
        if self.settings.in_front {
            for id in source.objects() {
                scene.set_show_in_front(id, true);
            }
        }
        self.source = Some(source);
        self.rebake(scene, renderer)
    }

    /// Use the mesh objects of `selection` as a group source.
    pub fn set_onion_from_selection<R>(
        &mut self,
        scene: &mut dyn SceneHost,
        renderer: &mut R,
        selection: &[ObjectId],
    ) -> OnionResult<BakeReport>
    where
        R: OverlayRenderer<Batch = B>,
    {
        let meshes = mesh_objects(scene, selection);
        if meshes.is_empty() {
            tracing::warn!(selected = selection.len(), "no valid mesh objects selected");
            return Err(OnionError::validation("no valid mesh objects selected"));
        }
        self.set_onion_source(scene, renderer, OnionSource::Group(meshes))
    }

    /// Forget the source and all cached frames, and stop the draw loop.
    #[tracing::instrument(skip_all)]
    pub fn clear_onion_source(
        &mut self,
        scene: &mut dyn SceneHost,
        overlay: &mut dyn OverlayHost,
    ) {
        self.release_in_front(scene);
        self.store.clear();
        self.source = None;
        if self.session.is_some() {
            self.stop(overlay, StopReason::SourceCleared);
        }
    }

    /// Bake the current source with the current mode and step.
    ///
    /// With no source or no mode selected this does nothing. An empty keyframe set also
    /// leaves the published frames untouched.
    #[tracing::instrument(skip_all)]
    pub fn rebake<R>(
        &mut self,
        scene: &mut dyn SceneHost,
        renderer: &mut R,
    ) -> OnionResult<BakeReport>
    where
        R: OverlayRenderer<Batch = B>,
    {
        let Some(source) = &self.source else {
            return Ok(BakeReport::NoSource);
        };
        let Some(mode) = self.settings.mode else {
            tracing::info!("no sampling mode selected; skipping bake");
            return Ok(BakeReport::NoMode);
        };

        match bake(scene, renderer, source, mode, self.settings.skin_step)? {
            BakeOutcome::Baked(frames) => {
                let n = frames.len();
                self.store.publish(frames);
                Ok(BakeReport::Baked { frames: n })
            }
            BakeOutcome::NoKeyframes => Ok(BakeReport::NoKeyframes),
        }
    }

    /// Start or stop the draw loop.
    pub fn set_toggle(&mut self, overlay: &mut dyn OverlayHost, on: bool) -> OnionResult<()> {
        if on {
            self.start(overlay)
        } else {
            self.toggle = false;
            if self.session.is_some() {
                self.stop(overlay, StopReason::ToggledOff);
            }
            Ok(())
        }
    }

    /// Flip the draw flag. Returns the new state.
    pub fn toggle(&mut self, overlay: &mut dyn OverlayHost) -> OnionResult<bool> {
        let on = !self.toggle;
        self.set_toggle(overlay, on)?;
        Ok(self.toggle)
    }

    /// Set a source from `selection` when none is active, otherwise clear it.
    pub fn add_or_clear<R>(
        &mut self,
        scene: &mut dyn SceneHost,
        renderer: &mut R,
        overlay: &mut dyn OverlayHost,
        selection: &[ObjectId],
    ) -> OnionResult<SelectionOutcome>
    where
        R: OverlayRenderer<Batch = B>,
    {
        if mesh_objects(scene, selection).is_empty() {
            tracing::info!("onion needs an animated mesh selection");
            return Ok(SelectionOutcome::NeedsSelection);
        }
        if self.source.is_none() {
            let report = self.set_onion_from_selection(scene, renderer, selection)?;
            Ok(SelectionOutcome::Set(report))
        } else {
            self.clear_onion_source(scene, overlay);
            Ok(SelectionOutcome::Cleared)
        }
    }

    /// Show the source objects in front of the skins. Turning this on disables x-ray.
    pub fn set_in_front(&mut self, scene: &mut dyn SceneHost, in_front: bool) {
        self.settings.in_front = in_front;
        if let Some(source) = &self.source {
            for id in source.objects() {
                scene.set_show_in_front(id, in_front);
            }
        }
        if in_front && self.settings.use_xray {
            self.settings.use_xray = false;
        }
    }

    /// Liveness check, run on every timer event while the loop is registered.
    pub fn tick(&mut self, scene: &dyn SceneHost, overlay: &mut dyn OverlayHost) -> LoopStatus {
        let Some(session) = &self.session else {
            return LoopStatus::Idle;
        };

        let reason = if !self.toggle {
            Some(StopReason::ToggledOff)
        } else if session.mode != self.settings.mode {
            Some(StopReason::ModeChanged)
        } else {
            match &self.source {
                None => Some(StopReason::SourceCleared),
                Some(source) if !source.is_live(scene) => Some(StopReason::SourceInvalid),
                Some(_) => None,
            }
        };

        match reason {
            Some(reason) => {
                self.stop(overlay, reason);
                LoopStatus::Stopped(reason)
            }
            None => LoopStatus::Running,
        }
    }

    /// Draw callback. Does nothing unless the loop is running and overlays are visible.
    pub fn draw<R>(
        &self,
        scene: &dyn SceneHost,
        renderer: &mut R,
        overlays_visible: bool,
    ) -> CompositeStats
    where
        R: OverlayRenderer<Batch = B>,
    {
        if self.session.is_none() || !overlays_visible {
            return CompositeStats::default();
        }
        let frames = self.store.load();
        composite(renderer, &frames, scene.current_frame(), &self.settings)
    }

    /// Drop the in-front flag from the current source objects before they stop being tracked.
    fn release_in_front(&self, scene: &mut dyn SceneHost) {
        if let Some(source) = &self.source {
            for id in source.objects() {
                scene.set_show_in_front(id, false);
            }
        }
    }

    fn start(&mut self, overlay: &mut dyn OverlayHost) -> OnionResult<()> {
        self.toggle = true;
        if self.session.is_some() {
            return Ok(());
        }

        let handler = overlay.register_draw_handler()?;
        let timer = match overlay.add_timer(TICK_INTERVAL) {
            Ok(timer) => timer,
            Err(e) => {
                overlay.unregister_draw_handler(handler);
                self.toggle = false;
                return Err(e);
            }
        };
        self.session = Some(DrawSession {
            mode: self.settings.mode,
            handler,
            timer,
        });
        tracing::info!(mode = ?self.settings.mode, "onion draw loop started");
        Ok(())
    }

    fn stop(&mut self, overlay: &mut dyn OverlayHost, reason: StopReason) {
        self.toggle = false;
        if let Some(session) = self.session.take() {
            overlay.remove_timer(session.timer);
            overlay.unregister_draw_handler(session.handler);
            tracing::info!(?reason, "onion draw loop stopped");
        }
    }
}

fn mesh_objects(scene: &dyn SceneHost, selection: &[ObjectId]) -> Vec<ObjectId> {
    selection
        .iter()
        .filter(|id| scene.object_kind(id) == Some(ObjectKind::Mesh))
        .cloned()
        .collect()
}
