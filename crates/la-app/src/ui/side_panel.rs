use egui::{Color32, Context, RichText, TextEdit};
use la_core::imaging::{CANNY_HIGH_DEFAULT, CANNY_HIGH_MAX, CANNY_LOW_DEFAULT, CANNY_LOW_MAX};
use la_core::job::{LINEART_FIDELITY_MAX, LINEART_FIDELITY_MIN};
use la_core::{prompt, LineartMode, PromptInputs};
use crate::events::AppEvent;
use crate::ui::{UiComponent, UiContext, UiEvent};

pub struct SidePanel {
    pub selected_mode: LineartMode,
    pub canny_low: f32,
    pub canny_high: f32,
    pub inputs: PromptInputs,
    pub analyzing: bool,
}

impl Default for SidePanel {
    fn default() -> Self {
        Self {
            selected_mode: LineartMode::default(),
            canny_low: CANNY_LOW_DEFAULT,
            canny_high: CANNY_HIGH_DEFAULT,
            inputs: PromptInputs::default(),
            analyzing: false,
        }
    }
}

impl SidePanel {
    fn show_lora_picker(&mut self, ui: &mut egui::Ui, ui_ctx: &UiContext) {
        ui.horizontal(|ui| {
            let mut picked = None;
            egui::ComboBox::from_id_salt("lora_models")
                .width(220.0)
                .selected_text("LoRA models")
                .show_ui(ui, |ui| {
                    for label in &ui_ctx.loras {
                        if ui.selectable_label(false, label.as_str()).clicked() {
                            picked = Some(label.clone());
                        }
                    }
                });

            if let Some(label) = picked {
                self.inputs.prompt = prompt::append_lora_tag(&self.inputs.prompt, &label);
            }

            if ui.button("🔄").on_hover_text("Reload LoRA models").clicked() {
                ui_ctx.send_event(UiEvent::RefreshLoras);
            }
        });
    }
}

impl UiComponent for SidePanel {
    fn show(&mut self, ctx: &Context, ui_ctx: &UiContext) {
        egui::SidePanel::left("side_panel")
            .default_width(360.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    // === Mode ===
                    ui.heading(RichText::new("🎨 Mode").size(16.0));
                    ui.horizontal(|ui| {
                        for mode in LineartMode::all() {
                            ui.selectable_value(
                                &mut self.selected_mode,
                                mode,
                                format!("{} {}", mode.icon(), mode.name()),
                            );
                        }
                    });
                    ui.label(
                        RichText::new(self.selected_mode.description())
                            .small()
                            .color(Color32::LIGHT_BLUE)
                    );
                    ui.separator();

                    // === Input ===
                    ui.heading(RichText::new("🖼 Input image").size(16.0));
                    ui.horizontal(|ui| {
                        if ui.button("📂 Open image…").clicked() {
                            ui_ctx.send_event(UiEvent::PickImage);
                        }
                        match ui_ctx.input_path.as_ref().and_then(|p| p.file_name()) {
                            Some(name) => ui.label(name.to_string_lossy().to_string()),
                            None => ui.label(RichText::new("No image selected").color(Color32::GRAY)),
                        };
                    });

                    if self.selected_mode.requires_lineart() {
                        ui.add_space(5.0);
                        ui.horizontal(|ui| {
                            ui.add(egui::Slider::new(&mut self.canny_low, 0.0..=CANNY_LOW_MAX).step_by(1.0));
                            ui.label("/");
                            ui.add(egui::Slider::new(&mut self.canny_high, 0.0..=CANNY_HIGH_MAX).step_by(1.0));
                        });

                        let extract = ui.add_enabled(
                            ui_ctx.input.is_some(),
                            egui::Button::new("✏ Extract line art"),
                        );
                        if extract.clicked() {
                            ui_ctx.send_event(UiEvent::ExtractLineart {
                                low: self.canny_low,
                                high: self.canny_high,
                            });
                        }
                    }
                    ui.separator();

                    // === Prompt ===
                    ui.heading(RichText::new("✨ Prompt").size(16.0));
                    self.show_lora_picker(ui, ui_ctx);

                    ui.horizontal(|ui| {
                        let analyze = ui.add_enabled(
                            ui_ctx.input.is_some() && !self.analyzing,
                            egui::Button::new("🔍 Analyze prompt"),
                        );
                        if analyze.clicked() {
                            self.analyzing = true;
                            ui_ctx.send_event(UiEvent::AnalyzePrompt);
                        }
                        if self.analyzing {
                            ui.spinner();
                        }
                    });

                    ui.add(
                        TextEdit::multiline(&mut self.inputs.prompt)
                            .desired_width(f32::INFINITY)
                            .desired_rows(3)
                            .hint_text("e.g. 1girl, solo, looking at viewer")
                    );

                    ui.label("Negative prompt");
                    ui.add(
                        TextEdit::multiline(&mut self.inputs.negative_prompt)
                            .desired_width(f32::INFINITY)
                            .desired_rows(3)
                    );
                    ui.separator();

                    // === Line settings ===
                    ui.add(
                        egui::Slider::new(&mut self.inputs.fidelity, LINEART_FIDELITY_MIN..=LINEART_FIDELITY_MAX)
                            .step_by(0.01)
                            .text("Line art fidelity")
                    );
                    ui.add(
                        egui::Slider::new(&mut self.inputs.bold, 0.0..=1.0)
                            .step_by(0.01)
                            .text("Line boldness")
                    );
                    ui.add_space(8.0);

                    let busy = ui_ctx.is_busy();
                    let generate_button = ui.add_enabled(
                        ui_ctx.is_ready(self.selected_mode) && !busy,
                        egui::Button::new(RichText::new("🎨 Generate").size(14.0))
                            .min_size(egui::vec2(ui.available_width(), 30.0))
                    );

                    if generate_button.clicked() {
                        ui_ctx.send_event(UiEvent::Generate {
                            mode: self.selected_mode,
                            inputs: self.inputs.clone(),
                        });
                    }

                    if busy {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label(RichText::new("Generating…").color(Color32::LIGHT_BLUE));
                        });
                    }
                });
            });
    }

    fn on_app_event(&mut self, ev: &AppEvent) {
        match ev {
            AppEvent::PromptAnalyzed(tags) => {
                self.inputs.prompt = tags.clone();
                self.analyzing = false;
            }
            AppEvent::PromptAnalysisFailed => {
                self.analyzing = false;
            }
            _ => {}
        }
    }
}
