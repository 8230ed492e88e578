use egui::{Color32, Context, RichText, Ui};
use crate::ui::{Preview, UiComponent, UiContext, UiEvent};

#[derive(Default)]
pub struct CentralPanel {}

impl CentralPanel {
    fn show_preview(ui: &mut Ui, title: &str, preview: Option<&Preview>, width: f32) {
        ui.vertical(|ui| {
            ui.set_width(width);
            ui.label(RichText::new(title).strong());

            match preview {
                Some(preview) => {
                    ui.add(
                        egui::Image::new(&preview.texture)
                            .max_width(width)
                            .max_height((ui.available_height() - 40.0).max(32.0))
                            .maintain_aspect_ratio(true),
                    );
                    ui.label(
                        RichText::new(format!("{} × {}", preview.size[0], preview.size[1]))
                            .small()
                            .color(Color32::GRAY),
                    );
                }
                None => {
                    egui::Frame::new()
                        .fill(Color32::from_gray(25))
                        .corner_radius(5)
                        .show(ui, |ui| {
                            ui.set_min_size(egui::vec2(width, width * 0.75));
                            ui.centered_and_justified(|ui| {
                                ui.label(RichText::new("No image").color(Color32::GRAY));
                            });
                        });
                }
            }
        });
    }
}

impl UiComponent for CentralPanel {
    fn show(&mut self, ctx: &Context, ui_ctx: &UiContext) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let spacing = ui.spacing().item_spacing.x;
            let width = ((ui.available_width() - 2.0 * spacing) / 3.0).max(64.0);

            ui.horizontal_top(|ui| {
                Self::show_preview(ui, "Input image", ui_ctx.input.as_ref(), width);
                Self::show_preview(ui, "Line art", ui_ctx.lineart.as_ref(), width);
                Self::show_preview(ui, "Output image", ui_ctx.output.as_ref(), width);
            });

            ui.separator();

            ui.horizontal(|ui| {
                if let Some(path) = &ui_ctx.output_path {
                    ui.label(RichText::new(path.display().to_string()).small().color(Color32::GRAY));
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui_ctx.can_open_folders && ui.button("📁 Open output folder").clicked() {
                        ui_ctx.send_event(UiEvent::OpenOutputFolder);
                    }

                    let copy = ui.add_enabled(
                        ui_ctx.output_path.is_some(),
                        egui::Button::new("📋 Copy output path"),
                    );
                    if copy.clicked() {
                        ui_ctx.send_event(UiEvent::CopyOutputPath);
                    }
                });
            });
        });
    }
}
