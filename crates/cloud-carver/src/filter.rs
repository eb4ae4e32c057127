//! Per-axis filter bounds shared by the renderer, the overlay and export.
//!
//! A [`FilterState`] is never mutated in place: every edit goes through
//! [`FilterState::apply`], which returns the next state. The session installs
//! that state and notifies its dependents.

/// Padding added on both sides of the observed range, as a fraction of it.
pub const NATIVE_PADDING: f32 = 0.05;

/// Granularity of the bound sliders.
pub const BOUND_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Min,
    Max,
}

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: f32,
    pub max: f32,
}

impl Extent {
    /// Builds an interval, swapping the ends if given in the wrong order.
    pub fn new(a: f32, b: f32) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    #[inline]
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> f32 {
        0.5 * (self.min + self.max)
    }

    #[inline]
    pub fn clamp(&self, v: f32) -> f32 {
        v.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, v: f32) -> bool {
        self.min <= v && v <= self.max
    }

    /// Position of `v` inside the interval mapped to [0,1]; degenerate intervals map to 0.
    pub fn normalize(&self, v: f32) -> f32 {
        let span = self.span();
        if span > 0.0 {
            ((v - self.min) / span).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Editable range of every axis: the observed extent of the loaded cloud
/// widened by [`NATIVE_PADDING`]. Fixed for the lifetime of a load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeExtent {
    axes: [Extent; 3],
}

impl NativeExtent {
    pub fn new(axes: [Extent; 3]) -> Self {
        Self { axes }
    }

    pub fn from_observed(observed: [Extent; 3]) -> Self {
        Self {
            axes: observed.map(|e| {
                let pad = e.span() * NATIVE_PADDING;
                Extent {
                    min: e.min - pad,
                    max: e.max + pad,
                }
            }),
        }
    }

    #[inline]
    pub fn axis(&self, axis: Axis) -> Extent {
        self.axes[axis.index()]
    }

    pub fn axes(&self) -> [Extent; 3] {
        self.axes
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub enabled: bool,
    pub min: f32,
    pub max: f32,
}

impl AxisBounds {
    #[inline]
    pub fn extent(&self) -> Extent {
        Extent {
            min: self.min,
            max: self.max,
        }
    }
}

/// A named set of bounds. Axes set to `None` are disabled and keep their bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub axes: [Option<(f32, f32)>; 3],
}

impl Preset {
    /// The one built-in preset: a 4 x 4 column around the cloud center, floor to 3 units.
    pub fn example() -> Self {
        Self {
            name: "Center column",
            axes: [Some((-2.0, 2.0)), Some((-2.0, 2.0)), Some((0.0, 3.0))],
        }
    }
}

/// One user-initiated change to the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterEdit {
    SetBound {
        axis: Axis,
        endpoint: Endpoint,
        value: f32,
    },
    SetEnabled {
        axis: Axis,
        enabled: bool,
    },
    ResetToNativeExtent,
    ApplyPreset(Preset),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    axes: [AxisBounds; 3],
    native: NativeExtent,
}

impl FilterState {
    /// All axes disabled, bounds at the native extent.
    pub fn new(native: NativeExtent) -> Self {
        Self {
            axes: native.axes.map(|e| AxisBounds {
                enabled: false,
                min: e.min,
                max: e.max,
            }),
            native,
        }
    }

    #[inline]
    pub fn axis(&self, axis: Axis) -> AxisBounds {
        self.axes[axis.index()]
    }

    pub fn axes(&self) -> [AxisBounds; 3] {
        self.axes
    }

    pub fn native(&self) -> NativeExtent {
        self.native
    }

    pub fn any_enabled(&self) -> bool {
        self.axes.iter().any(|a| a.enabled)
    }

    /// Computes the state that results from `edit`.
    pub fn apply(&self, edit: FilterEdit) -> FilterState {
        match edit {
            FilterEdit::SetBound {
                axis,
                endpoint,
                value,
            } => self.set_bound(axis, endpoint, value),
            FilterEdit::SetEnabled { axis, enabled } => self.set_enabled(axis, enabled),
            FilterEdit::ResetToNativeExtent => self.reset_to_native_extent(),
            FilterEdit::ApplyPreset(preset) => self.apply_preset(&preset),
        }
    }

    /// Clamps `value` into the native extent, then against the opposite
    /// endpoint, so `min <= max` holds afterwards. NaN leaves the state as is.
    pub fn set_bound(&self, axis: Axis, endpoint: Endpoint, value: f32) -> FilterState {
        if value.is_nan() {
            return *self;
        }

        let mut next = *self;
        let native = self.native.axis(axis);
        let bounds = &mut next.axes[axis.index()];
        let value = native.clamp(value);

        match endpoint {
            Endpoint::Min => bounds.min = value.min(bounds.max),
            Endpoint::Max => bounds.max = value.max(bounds.min),
        }
        next
    }

    pub fn set_enabled(&self, axis: Axis, enabled: bool) -> FilterState {
        let mut next = *self;
        next.axes[axis.index()].enabled = enabled;
        next
    }

    /// Restores every axis' bounds to the native extent; enable flags are kept.
    pub fn reset_to_native_extent(&self) -> FilterState {
        let mut next = *self;
        for axis in Axis::ALL {
            let native = self.native.axis(axis);
            let bounds = &mut next.axes[axis.index()];
            bounds.min = native.min;
            bounds.max = native.max;
        }
        next
    }

    pub fn apply_preset(&self, preset: &Preset) -> FilterState {
        let mut next = *self;
        for axis in Axis::ALL {
            let bounds = &mut next.axes[axis.index()];
            match preset.axes[axis.index()] {
                Some((lo, hi)) => {
                    let native = self.native.axis(axis);
                    let lo = native.clamp(lo);
                    let hi = native.clamp(hi).max(lo);
                    *bounds = AxisBounds {
                        enabled: true,
                        min: lo,
                        max: hi,
                    };
                }
                None => bounds.enabled = false,
            }
        }
        next
    }
}
