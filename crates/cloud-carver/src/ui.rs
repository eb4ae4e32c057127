//! Control panel. Widgets never touch the session directly; they emit
//! [`UiAction`]s that the app applies after the frame.

use crate::data::ShadingParams;
use crate::filter::{Axis, Endpoint, FilterEdit, FilterState, Preset, BOUND_STEP};
use crate::picking::Readout;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Filter(FilterEdit),
    Shading(ShadingParams),
    RotateQuarter { clockwise: bool },
    ResetView,
    LockPolar(bool),
    LockAzimuth(bool),
    Open(PathBuf),
    Export,
}

/// Read-only snapshot of what the panel displays.
pub struct PanelView<'a> {
    pub filter: Option<&'a FilterState>,
    pub params: ShadingParams,
    pub has_color: bool,
    pub readout: Readout,
    pub polar_locked: bool,
    pub azimuth_locked: bool,
    pub cloud_name: Option<&'a str>,
    pub total_points: usize,
    pub retained_points: usize,
    pub loading: bool,
    pub status: &'a str,
}

/// Panel state that lives across frames.
#[derive(Debug, Default)]
pub struct PanelState {
    pub open_path: String,
}

pub fn draw_panel(ctx: &egui::Context, view: &PanelView<'_>, state: &mut PanelState) -> Vec<UiAction> {
    let mut actions = Vec::new();

    egui::SidePanel::left("controls")
        .resizable(false)
        .default_width(280.0)
        .show(ctx, |ui| {
            ui.heading("Cloud Carver");
            ui.separator();

            file_section(ui, view, state, &mut actions);
            ui.separator();

            display_section(ui, view, &mut actions);
            ui.separator();

            if let Some(filter) = view.filter {
                filter_section(ui, filter, &mut actions);
                ui.separator();
                camera_section(ui, view, &mut actions);
                ui.separator();
            }

            ui.label(egui::RichText::new("Cursor").strong());
            readout_rows(ui, &view.readout);

            if !view.status.is_empty() {
                ui.separator();
                ui.label(view.status);
            }
        });

    actions
}

fn file_section(ui: &mut egui::Ui, view: &PanelView<'_>, state: &mut PanelState, actions: &mut Vec<UiAction>) {
    match view.cloud_name {
        Some(name) => {
            ui.label(format!("{}: {} points", name, view.total_points));
            ui.label(format!("Retained: {}", view.retained_points));
        }
        None => {
            ui.label("No cloud loaded. Drop a .pcd file or enter a path.");
        }
    }

    ui.horizontal(|ui| {
        ui.add(egui::TextEdit::singleline(&mut state.open_path).hint_text("path/to/cloud.pcd"));
        let can_open = !view.loading && !state.open_path.trim().is_empty();
        if ui.add_enabled(can_open, egui::Button::new("Open")).clicked() {
            actions.push(UiAction::Open(PathBuf::from(state.open_path.trim())));
        }
    });

    if view.loading {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Loading...");
        });
    }

    if ui
        .add_enabled(view.cloud_name.is_some(), egui::Button::new("Export filtered cloud"))
        .clicked()
    {
        actions.push(UiAction::Export);
    }
}

fn display_section(ui: &mut egui::Ui, view: &PanelView<'_>, actions: &mut Vec<UiAction>) {
    let mut params = view.params;

    ui.add(egui::Slider::new(&mut params.point_size, 0.5..=12.0).text("Point size"));
    ui.add_enabled(view.has_color, egui::Checkbox::new(&mut params.use_color, "Use point color"));
    ui.add_enabled(
        view.has_color && params.use_color,
        egui::Slider::new(&mut params.color_boost, 0.1..=4.0).text("Color boost"),
    );

    if params != view.params {
        actions.push(UiAction::Shading(params));
    }
}

fn filter_section(ui: &mut egui::Ui, filter: &FilterState, actions: &mut Vec<UiAction>) {
    ui.label(egui::RichText::new("Filters").strong());

    for axis in Axis::ALL {
        let bounds = filter.axis(axis);
        let native = filter.native().axis(axis);
        let range = native.min..=native.max;

        let mut enabled = bounds.enabled;
        if ui.checkbox(&mut enabled, format!("Filter {}", axis.label())).changed() {
            actions.push(UiAction::Filter(FilterEdit::SetEnabled { axis, enabled }));
        }

        ui.add_enabled_ui(bounds.enabled, |ui| {
            for (endpoint, value, text) in [
                (Endpoint::Min, bounds.min, "min"),
                (Endpoint::Max, bounds.max, "max"),
            ] {
                let mut v = value;
                let resp = ui.add(
                    egui::Slider::new(&mut v, range.clone())
                        .step_by(BOUND_STEP)
                        .text(format!("{} {}", axis.label(), text)),
                );
                if resp.changed() && v != value {
                    actions.push(UiAction::Filter(FilterEdit::SetBound { axis, endpoint, value: v }));
                }
            }
        });
    }

    ui.horizontal(|ui| {
        if ui.button("Reset filters").clicked() {
            actions.push(UiAction::Filter(FilterEdit::ResetToNativeExtent));
        }
        let preset = Preset::example();
        if ui.button(format!("Preset: {}", preset.name)).clicked() {
            actions.push(UiAction::Filter(FilterEdit::ApplyPreset(preset)));
        }
    });
}

fn camera_section(ui: &mut egui::Ui, view: &PanelView<'_>, actions: &mut Vec<UiAction>) {
    ui.label(egui::RichText::new("View").strong());

    ui.horizontal(|ui| {
        if ui.button("Rotate 90 cw").clicked() {
            actions.push(UiAction::RotateQuarter { clockwise: true });
        }
        if ui.button("Rotate 90 ccw").clicked() {
            actions.push(UiAction::RotateQuarter { clockwise: false });
        }
        if ui.button("Reset view").clicked() {
            actions.push(UiAction::ResetView);
        }
    });

    let mut polar = view.polar_locked;
    if ui.checkbox(&mut polar, "Lock polar angle").changed() {
        actions.push(UiAction::LockPolar(polar));
    }
    let mut azimuth = view.azimuth_locked;
    if ui.checkbox(&mut azimuth, "Lock azimuth angle").changed() {
        actions.push(UiAction::LockAzimuth(azimuth));
    }
    ui.small("Drag: orbit (axis-locked). Shift+drag: rotate. Double-click: reset.");
}

fn readout_rows(ui: &mut egui::Ui, readout: &Readout) {
    match readout {
        Readout::Empty => {
            ui.label("-");
        }
        Readout::Point { .. } => {
            egui::Grid::new("readout").num_columns(2).show(ui, |ui| {
                ui.label("XYZ");
                ui.monospace(readout.label());
                ui.end_row();
                ui.label("Normalized");
                ui.monospace(readout.normalized_label());
                ui.end_row();
            });
        }
    }
}
