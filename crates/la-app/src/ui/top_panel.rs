use egui::{Color32, Context, RichText};
use crate::events::NoticeLevel;
use crate::ui::{UiComponent, UiContext};

#[derive(Default)]
pub struct TopPanel {}

impl UiComponent for TopPanel {
    fn show(&mut self, ctx: &Context, ui_ctx: &UiContext) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("✏ Line Art Assistant");
                ui.separator();
                ui.label(RichText::new(&ui_ctx.api_url).small().color(Color32::GRAY));
                ui.separator();

                match &ui_ctx.notice {
                    Some(notice) => {
                        let color = match notice.level {
                            NoticeLevel::Info => Color32::LIGHT_BLUE,
                            NoticeLevel::Warning => Color32::from_rgb(255, 170, 60),
                        };
                        ui.label(RichText::new(&notice.text).color(color));
                    }
                    None => {
                        ui.label(RichText::new("Ready").color(Color32::LIGHT_BLUE));
                    }
                }
            });
        });
    }
}
