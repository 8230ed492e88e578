use egui::{Color32, Context, RichText, Ui};
use crate::events::AppEvent;
use crate::job::{JobRecord, JobStatus};
use crate::ui::{UiComponent, UiContext, UiEvent};

#[derive(Default)]
pub struct QueuePanel {
    show_panel: bool,
    show_completed: bool,
}

impl QueuePanel {
    fn show_job_card(&self, ui: &mut Ui, ui_ctx: &UiContext, job: &JobRecord) {
        egui::Frame::new()
            .fill(Color32::from_gray(30))
            .corner_radius(5)
            .inner_margin(egui::Margin::same(10))
            .stroke(egui::Stroke::new(1.0, Color32::from_gray(60)))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(job.status.icon())
                            .size(24.0)
                            .color(job.status.color())
                    );

                    ui.add_space(5.0);

                    ui.vertical(|ui| {
                        ui.horizontal(|ui| {
                            ui.label(RichText::new(job.mode_name()).strong());
                            ui.label(
                                RichText::new(&job.prompt)
                                    .small()
                                    .color(Color32::GRAY)
                            );
                        });

                        if let Some(message) = &job.message {
                            ui.label(
                                RichText::new(message)
                                    .small()
                                    .color(job.status.color())
                            );
                        }

                        let secs = job.elapsed_secs(chrono::Utc::now());
                        let time_str = if job.completed_at.is_some() {
                            format!("Completed in {}s", secs)
                        } else {
                            format!("Elapsed: {}s", secs)
                        };
                        ui.label(RichText::new(time_str).small().color(Color32::GRAY));
                    });

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        match job.status {
                            JobStatus::Generating => {
                                ui.spinner();
                            }
                            JobStatus::Complete => {
                                if ui.button("🗑").clicked() {
                                    ui_ctx.send_event(UiEvent::RemoveJob(job.id));
                                }
                                ui.add_space(5.0);
                                if ui_ctx.current_job_id == Some(job.id) {
                                    ui.label(
                                        RichText::new("👁 Viewing")
                                            .color(Color32::LIGHT_BLUE)
                                    );
                                } else if ui.button("🖼 Show").clicked() {
                                    ui_ctx.send_event(UiEvent::ShowOutput(job.id));
                                }
                            }
                            JobStatus::Failed => {
                                if ui.button("🗑").clicked() {
                                    ui_ctx.send_event(UiEvent::RemoveJob(job.id));
                                }
                                ui.add_space(5.0);
                                if let Some(error) = &job.error {
                                    ui.label(
                                        RichText::new(error)
                                            .color(Color32::RED)
                                            .small()
                                    );
                                }
                            }
                            JobStatus::Queued => {
                                ui.label(RichText::new("Waiting...").color(Color32::GRAY));
                            }
                        }
                    });
                });
            });

        ui.add_space(5.0);
    }
}

impl UiComponent for QueuePanel {
    fn show(&mut self, ctx: &Context, ui_ctx: &UiContext) {
        if !self.show_panel && !ui_ctx.jobs.is_empty() {
            self.show_panel = true;
        }

        if !self.show_panel {
            return;
        }

        egui::TopBottomPanel::bottom("queue_panel")
            .resizable(true)
            .min_height(100.0)
            .max_height(300.0)
            .default_height(150.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("🎬 Generation history");

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("🗑 Clear Completed").clicked() {
                            ui_ctx.send_event(UiEvent::ClearCompletedJobs);
                        }

                        ui.add_space(10.0);

                        let toggle_text = if self.show_completed {
                            "Hide Completed"
                        } else {
                            "Show Completed"
                        };
                        if ui.button(toggle_text).clicked() {
                            self.show_completed = !self.show_completed;
                        }

                        ui.add_space(10.0);

                        let active = ui_ctx.jobs.iter().filter(|j| j.status.is_active()).count();
                        let completed = ui_ctx.jobs.iter().filter(|j| j.status.is_complete()).count();

                        ui.label(
                            RichText::new(format!("Active: {} | Completed: {}", active, completed))
                                .color(Color32::GRAY)
                        );
                    });
                });

                ui.separator();

                egui::ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .show(ui, |ui| {
                        let mut has_visible_jobs = false;

                        for job in &ui_ctx.jobs {
                            if !self.show_completed && job.status.is_complete() {
                                continue;
                            }

                            has_visible_jobs = true;
                            self.show_job_card(ui, ui_ctx, job);
                        }

                        if !has_visible_jobs {
                            ui.centered_and_justified(|ui| {
                                ui.label(
                                    RichText::new("No jobs in queue")
                                        .color(Color32::GRAY)
                                        .size(16.0)
                                );
                            });
                        }
                    });
            });
    }

    fn on_app_event(&mut self, ev: &AppEvent) {
        match ev {
            AppEvent::JobQueued => {
                self.show_panel = true;
            }
            AppEvent::JobComplete => {
                self.show_completed = true;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_events_reveal_history() {
        let mut panel = QueuePanel::default();
        assert!(!panel.show_panel);

        panel.on_app_event(&AppEvent::JobQueued);
        assert!(panel.show_panel);
        assert!(!panel.show_completed);

        panel.on_app_event(&AppEvent::JobComplete);
        assert!(panel.show_completed);
    }
}
