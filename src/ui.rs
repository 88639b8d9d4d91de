// src/ui.rs

use procedural_scenes::engine_lib::params::{format_hex_color, parse_hex_color, ParamValue, Parameter, ParameterSet};
use procedural_scenes::DemoKind;

/// What the user did to the panel this frame.
#[derive(Default)]
pub struct UiOutput {
    pub selected_demo: Option<DemoKind>,
    pub edits: Vec<(String, ParamValue)>,
}

/// Draws the demo selector and one control per parameter. Values are read
/// fresh from `params` every frame; edits are returned, not applied.
pub fn build_ui(ctx: &egui::Context, current: DemoKind, params: &ParameterSet) -> UiOutput {
    let mut output = UiOutput::default();

    egui::Window::new("Controls")
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
        .resizable(false)
        .show(ctx, |ui| {
            let mut selected = current;
            egui::ComboBox::from_label("demo")
                .selected_text(current.name())
                .show_ui(ui, |ui| {
                    for kind in DemoKind::ALL {
                        ui.selectable_value(&mut selected, kind, kind.name());
                    }
                });
            if selected != current {
                output.selected_demo = Some(selected);
            }
            ui.separator();

            for param in params.iter().filter(|p| p.folder().is_none()) {
                parameter_widget(ui, param, &mut output.edits);
            }

            let mut folders: Vec<&str> = Vec::new();
            for folder in params.iter().filter_map(Parameter::folder) {
                if !folders.contains(&folder) {
                    folders.push(folder);
                }
            }
            for folder in folders {
                egui::CollapsingHeader::new(folder).default_open(true).show(ui, |ui| {
                    for param in params.iter().filter(|p| p.folder() == Some(folder)) {
                        parameter_widget(ui, param, &mut output.edits);
                    }
                });
            }

            ui.separator();
            ui.label("🖱 Drag: orbit   Scroll: zoom");
        });

    output
}

fn parameter_widget(ui: &mut egui::Ui, param: &Parameter, edits: &mut Vec<(String, ParamValue)>) {
    let edited = match param.value() {
        ParamValue::Scalar(current) => {
            let mut value = *current;
            let changed = match param.bounds() {
                Some(bounds) => {
                    let mut slider = egui::Slider::new(&mut value, bounds.min as f32..=bounds.max as f32).text(param.label());
                    if let Some(step) = bounds.step {
                        slider = slider.step_by(step);
                    }
                    ui.add(slider).changed()
                }
                None => {
                    ui.horizontal(|ui| {
                        let changed = ui.add(egui::DragValue::new(&mut value).speed(0.01)).changed();
                        ui.label(param.label());
                        changed
                    })
                    .inner
                }
            };
            changed.then_some(ParamValue::Scalar(value))
        }
        ParamValue::Integer(current) => {
            let mut value = *current;
            let changed = match param.bounds() {
                Some(bounds) => {
                    let slider = egui::Slider::new(&mut value, bounds.min as i64..=bounds.max as i64)
                        .text(param.label())
                        .step_by(bounds.step.unwrap_or(1.0));
                    ui.add(slider).changed()
                }
                None => {
                    ui.horizontal(|ui| {
                        let changed = ui.add(egui::DragValue::new(&mut value)).changed();
                        ui.label(param.label());
                        changed
                    })
                    .inner
                }
            };
            changed.then_some(ParamValue::Integer(value))
        }
        ParamValue::Color(hex) => {
            let mut rgb = parse_hex_color(hex).unwrap_or([0, 0, 0]);
            let changed = ui
                .horizontal(|ui| {
                    let changed = ui.color_edit_button_srgb(&mut rgb).changed();
                    ui.label(param.label());
                    changed
                })
                .inner;
            changed.then(|| ParamValue::Color(format_hex_color(rgb)))
        }
    };

    if let Some(value) = edited {
        edits.push((param.name().to_string(), value));
    }
}
