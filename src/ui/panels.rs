use egui::{Color32, Context, RichText, ScrollArea, Ui};

use crate::config::{Color, FALLOFF_RADIUS_RANGE, STROKE_WIDTH_RANGE};
use crate::sketch::{DrawState, FalloffShape};
use crate::ui::state::{SceneStats, UiActions, UiState};
use crate::ui::theme::*;

pub fn draw_side_panel(ctx: &Context, state: &mut UiState, stats: &SceneStats<'_>) -> UiActions {
    let mut actions = UiActions::default();

    egui::SidePanel::right("control_panel")
        .min_width(260.0)
        .max_width(360.0)
        .default_width(280.0)
        .frame(egui::Frame::default().fill(BG_PAPER).inner_margin(16.0))
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading(RichText::new("Harold's Crayons").strong().color(INK));
                ui.add_space(4.0);
                ui.label(RichText::new("Draw on the ground, the sky, or thin air").color(TEXT_MUTED).size(11.0));
                ui.add_space(16.0);

                section_header(ui, "CRAYON");
                if let Some(color) = color_row(ui, "Stroke", &mut state.crayon_color) {
                    actions.crayon_color = Some(color);
                }
                ui.horizontal(|ui| {
                    ui.label("Width:");
                    let slider = egui::Slider::new(&mut state.stroke_width, STROKE_WIDTH_RANGE)
                        .step_by(0.005)
                        .fixed_decimals(3);
                    if ui.add(slider).changed() {
                        actions.stroke_width = Some(state.stroke_width);
                    }
                });
                ui.add_space(16.0);

                section_header(ui, "WORLD");
                if let Some(color) = color_row(ui, "Sky", &mut state.sky_color) {
                    actions.sky_color = Some(color);
                }
                if let Some(color) = color_row(ui, "Ground", &mut state.ground_color) {
                    actions.ground_color = Some(color);
                }
                ui.add_space(16.0);

                section_header(ui, "TERRAIN BRUSH");
                actions.falloff_changed = falloff_controls(ui, state);
                ui.add_space(16.0);

                ui.separator();
                ui.add_space(12.0);

                section_header(ui, "DISPLAY");
                ui.horizontal(|ui| {
                    ui.checkbox(&mut state.vsync_enabled, "VSync");
                    ui.checkbox(&mut state.show_stats, "Stats");
                    ui.checkbox(&mut state.show_help, "Help");
                });
                ui.add_space(16.0);

                if state.show_stats {
                    stats_panel(ui, stats);
                }
            });
        });

    actions
}

fn section_header(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).color(TEXT_MUTED).size(11.0).strong());
    ui.add_space(4.0);
}

fn color_row(ui: &mut Ui, label: &str, rgb: &mut [u8; 3]) -> Option<Color> {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(format!("{label}:"));
        changed = ui.color_edit_button_srgb(rgb).changed();
        ui.label(RichText::new(Color::from_srgb_u8(*rgb).to_hex()).color(TEXT_MUTED).monospace());
    });
    changed.then(|| Color::from_srgb_u8(*rgb))
}

fn falloff_controls(ui: &mut Ui, state: &mut UiState) -> bool {
    let mut changed = false;

    ui.horizontal(|ui| {
        ui.label("Falloff:");
        egui::ComboBox::from_id_salt("falloff_shape")
            .selected_text(state.falloff_shape.label())
            .show_ui(ui, |ui| {
                for shape in FalloffShape::ALL {
                    changed |= ui
                        .selectable_value(&mut state.falloff_shape, shape, shape.label())
                        .changed();
                }
            });
    });
    ui.horizontal(|ui| {
        ui.label("Radius:");
        changed |= ui
            .add(egui::Slider::new(&mut state.falloff_radius, FALLOFF_RADIUS_RANGE).suffix(" m"))
            .changed();
    });

    changed
}

fn stats_panel(ui: &mut Ui, stats: &SceneStats<'_>) {
    section_header(ui, "SCENE");
    egui::Frame::default()
        .fill(BG_WIDGET)
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .rounding(6.0)
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.style_mut().override_font_id = Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));

            egui::Grid::new("stats").num_columns(2).spacing([20.0, 4.0]).show(ui, |ui| {
                ui.label(RichText::new("FPS").color(TEXT_MUTED));
                ui.label(RichText::new(format!("{:.0}", stats.fps)).color(INK));
                ui.end_row();

                ui.label(RichText::new("Billboards").color(TEXT_MUTED));
                ui.label(RichText::new(stats.billboards.to_string()).color(INK));
                ui.end_row();

                ui.label(RichText::new("Drawing on").color(TEXT_MUTED));
                ui.label(RichText::new(draw_state_label(stats.draw_state)).color(ACCENT_CRAYON));
                ui.end_row();

                if stats.draw_state != DrawState::Idle {
                    ui.label(RichText::new("Points").color(TEXT_MUTED));
                    ui.label(RichText::new(stats.stroke_points.to_string()).color(INK));
                    ui.end_row();
                }
            });
        });

    if let Some(message) = stats.last_diagnostic {
        ui.add_space(6.0);
        egui::Frame::default()
            .fill(Color32::from_rgb(250, 232, 220))
            .stroke(egui::Stroke::new(1.0, ACCENT_WARN))
            .rounding(4.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.label(RichText::new(message).color(ACCENT_WARN).size(11.0));
            });
    }
}

fn draw_state_label(state: DrawState) -> String {
    match state {
        DrawState::Idle => "-".to_string(),
        DrawState::Ground => "ground".to_string(),
        DrawState::Sky => "sky".to_string(),
        DrawState::Billboard(i) => format!("billboard #{i}"),
    }
}

pub fn draw_help_overlay(ctx: &Context, pos: [f32; 3], speed: f32) {
    egui::Area::new(egui::Id::new("help_overlay"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(Color32::from_white_alpha(200))
                .rounding(6.0)
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.style_mut().override_font_id = Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));
                    ui.label(RichText::new("LMB - Draw | Esc - Cancel stroke").color(INK));
                    ui.label(RichText::new("WASD - Walk | RMB+Drag - Look | Scroll - Speed").color(TEXT_MUTED));
                    ui.label(RichText::new(format!("Pos: ({:.1}, {:.1}, {:.1}) | Speed: {:.1}", pos[0], pos[1], pos[2], speed)).color(TEXT_MUTED));
                });
        });
}
