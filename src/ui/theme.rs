use egui::{Color32, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};

pub const BG_PAPER: Color32 = Color32::from_rgb(250, 247, 240);
pub const BG_WIDGET: Color32 = Color32::from_rgb(240, 235, 224);
pub const BG_WIDGET_HOVER: Color32 = Color32::from_rgb(230, 224, 210);
pub const BG_WIDGET_ACTIVE: Color32 = Color32::from_rgb(218, 210, 192);

pub const INK: Color32 = Color32::from_rgb(40, 36, 48);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(120, 112, 104);

pub const ACCENT_CRAYON: Color32 = Color32::from_rgb(33, 157, 32);
pub const ACCENT_PURPLE: Color32 = Color32::from_rgb(96, 40, 120);
pub const ACCENT_WARN: Color32 = Color32::from_rgb(176, 84, 28);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(214, 206, 190);

fn widget(bg: Color32, stroke: Stroke, fg: Color32, expansion: f32) -> egui::style::WidgetVisuals {
    egui::style::WidgetVisuals {
        bg_fill: bg,
        weak_bg_fill: bg,
        bg_stroke: stroke,
        rounding: Rounding::same(4.0),
        fg_stroke: Stroke::new(1.0, fg),
        expansion,
    }
}

/// Light "paper" look for the crayon panel.
pub fn apply_theme(ctx: &egui::Context) {
    let mut style = Style::default();

    let mut visuals = Visuals::light();
    visuals.override_text_color = Some(INK);
    visuals.widgets.noninteractive = widget(BG_PAPER, Stroke::new(1.0, BORDER_SUBTLE), TEXT_MUTED, 0.0);
    visuals.widgets.inactive = widget(BG_WIDGET, Stroke::new(1.0, BORDER_SUBTLE), INK, 0.0);
    visuals.widgets.hovered = widget(BG_WIDGET_HOVER, Stroke::new(1.0, ACCENT_PURPLE), INK, 1.0);
    visuals.widgets.active = widget(BG_WIDGET_ACTIVE, Stroke::new(2.0, ACCENT_CRAYON), INK, 1.0);
    visuals.widgets.open = widget(BG_WIDGET_ACTIVE, Stroke::new(1.0, ACCENT_PURPLE), INK, 0.0);
    visuals.selection = egui::style::Selection {
        bg_fill: ACCENT_CRAYON.gamma_multiply(0.35),
        stroke: Stroke::new(1.0, ACCENT_CRAYON),
    };
    visuals.panel_fill = BG_PAPER;
    visuals.window_fill = BG_PAPER;
    visuals.window_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.window_rounding = Rounding::same(6.0);
    visuals.warn_fg_color = ACCENT_WARN;
    visuals.slider_trailing_fill = true;
    visuals.handle_shape = egui::style::HandleShape::Circle;
    style.visuals = visuals;

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);
    style.spacing.slider_width = 150.0;

    style.text_styles = [
        (TextStyle::Small, FontId::new(11.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Button, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Heading, FontId::new(20.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(12.0, FontFamily::Monospace)),
    ]
    .into();

    ctx.set_style(style);
}
