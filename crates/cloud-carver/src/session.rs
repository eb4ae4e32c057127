//! All mutable state tied to one loaded cloud.
//!
//! A new load replaces the whole `Session`; nothing in here outlives its cloud.

use crate::camera::{Camera, CameraPose};
use crate::data::PointCloud;
use crate::filter::{FilterEdit, FilterState};
use crate::interaction::{Interaction, PointerEvent};
use crate::overlay::BoundingBox;
use crate::picking::{pick_point, reference_plane_hit, Marker, Readout, Viewport};
use crate::predicate::retained_count;
use glam::Vec2;
use std::f32::consts::FRAC_PI_2;

/// Which derived outputs are stale since the last [`Session::take_changes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Changes {
    /// Filter bounds or flags changed; the shading uniform must be rewritten.
    pub shading: bool,
    /// The overlay box must be rebuilt.
    pub overlay: bool,
    pub markers: bool,
    pub redraw: bool,
}

impl Changes {
    fn all() -> Self {
        Self {
            shading: true,
            overlay: true,
            markers: true,
            redraw: true,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    cloud: PointCloud,
    filter: FilterState,
    overlay: Option<BoundingBox>,
    camera: Camera,
    initial_pose: CameraPose,
    interaction: Interaction,
    viewport: Viewport,
    hover: Marker,
    selection: Marker,
    readout: Readout,
    changes: Changes,
}

impl Session {
    /// Starts with every axis disabled and the camera framing the cloud.
    pub fn new(cloud: PointCloud, viewport: Viewport) -> Self {
        let camera = Camera::framing(cloud.observed_extent(), viewport.aspect());
        Self::with_camera(cloud, viewport, camera)
    }

    /// Like [`Session::new`] with an explicit starting camera, which also
    /// becomes the reset target.
    pub fn with_camera(cloud: PointCloud, viewport: Viewport, camera: Camera) -> Self {
        let filter = FilterState::new(cloud.native_extent());
        Self {
            overlay: BoundingBox::from_filter(&filter),
            filter,
            initial_pose: camera.pose(),
            camera,
            cloud,
            interaction: Interaction::new(),
            viewport,
            hover: Marker::default(),
            selection: Marker::default(),
            readout: Readout::Empty,
            changes: Changes::all(),
        }
    }

    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn overlay(&self) -> Option<BoundingBox> {
        self.overlay
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn hover(&self) -> Marker {
        self.hover
    }

    pub fn selection(&self) -> Marker {
        self.selection
    }

    pub fn readout(&self) -> Readout {
        self.readout
    }

    pub fn retained_count(&self) -> usize {
        retained_count(&self.filter, self.cloud.positions())
    }

    /// Installs the state produced by `edit`. Returns whether anything changed.
    pub fn edit_filter(&mut self, edit: FilterEdit) -> bool {
        let next = self.filter.apply(edit);
        if next == self.filter {
            return false;
        }
        self.filter = next;
        self.overlay = BoundingBox::from_filter(&self.filter);

        // A marker on a point that is now filtered out would float in empty space.
        if self.hover.visible {
            self.hover.hide();
        }
        self.changes.shading = true;
        self.changes.overlay = true;
        self.changes.markers = true;
        self.changes.redraw = true;
        true
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        let response = self.interaction.handle(event, &mut self.camera);

        if response.reset_view {
            self.reset_view();
        }
        if response.camera_changed {
            self.changes.redraw = true;
        }
        if let Some(cursor) = response.hover {
            self.update_hover(cursor);
        }
        if let Some(cursor) = response.click {
            self.update_selection(cursor);
        }
    }

    fn update_hover(&mut self, cursor: Vec2) {
        let before = (self.hover, self.readout);
        match pick_point(&self.camera, self.viewport, cursor, self.cloud.positions(), &self.filter) {
            Some(hit) => {
                self.hover.show(hit.position);
                self.readout = Readout::from_point(hit.position, self.cloud.observed_extent());
            }
            None => {
                self.hover.hide();
                self.readout = self.plane_readout(cursor);
            }
        }
        if (self.hover, self.readout) != before {
            self.changes.markers = true;
            self.changes.redraw = true;
        }
    }

    fn update_selection(&mut self, cursor: Vec2) {
        match pick_point(&self.camera, self.viewport, cursor, self.cloud.positions(), &self.filter) {
            Some(hit) => {
                log::debug!("Selected point #{} at {:?}", hit.index, hit.position);
                self.selection.show(hit.position);
                self.readout = Readout::from_point(hit.position, self.cloud.observed_extent());
            }
            None => {
                self.selection.hide();
                self.readout = self.plane_readout(cursor);
            }
        }
        self.changes.markers = true;
        self.changes.redraw = true;
    }

    fn plane_readout(&self, cursor: Vec2) -> Readout {
        self.camera
            .screen_ray(self.viewport, cursor)
            .and_then(|ray| reference_plane_hit(&ray))
            .map(|p| Readout::from_point(p, self.cloud.observed_extent()))
            .unwrap_or(Readout::Empty)
    }

    /// Back to the pose captured right after load.
    pub fn reset_view(&mut self) {
        self.camera.set_pose(self.initial_pose);
        self.changes.redraw = true;
    }

    /// Rotates the view a quarter turn about the view axis.
    pub fn rotate_quarter(&mut self, clockwise: bool) {
        // Turning the up vector anticlockwise makes the image turn clockwise.
        let angle = if clockwise { -FRAC_PI_2 } else { FRAC_PI_2 };
        self.camera.roll(angle);
        self.changes.redraw = true;
    }

    pub fn set_polar_lock(&mut self, locked: bool) {
        self.camera.set_polar_lock(locked);
    }

    pub fn set_azimuth_lock(&mut self, locked: bool) {
        self.camera.set_azimuth_lock(locked);
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.camera.set_aspect(viewport.aspect());
        self.changes.redraw = true;
    }

    pub fn has_pending_changes(&self) -> bool {
        self.changes != Changes::default()
    }

    /// Returns the pending change set and clears it.
    pub fn take_changes(&mut self) -> Changes {
        std::mem::take(&mut self.changes)
    }
}
