use crate::app::file_dialogs;
use crate::app::image_processing;
use crate::app::{App, BatchProgress, ConversionUpdate, FileDetail};
use crate::utils::Logger;
use egui::{Color32, Frame, ProgressBar, RichText, Rounding, Stroke};
use std::path::PathBuf;
use std::sync::mpsc::channel;

pub fn render(app: &mut App, ctx: &egui::Context) {
    let frame = Frame {
        fill: Color32::from_rgb(30, 30, 40),
        rounding: Rounding::same(10.0),
        stroke: Stroke::new(1.0, Color32::from_rgb(100, 200, 250)),
        inner_margin: egui::style::Margin::same(20.0),
        ..Default::default()
    };

    egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
        ui.heading(
            RichText::new("HEIC to JPEG Converter")
                .size(28.0)
                .color(Color32::from_rgb(100, 200, 250)),
        );
        ui.add_space(20.0);

        let converting = app.conversion_receiver.is_some();

        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                let button_width = 200.0;
                if ui
                    .add_sized([button_width, 30.0], egui::Button::new("Select HEIC Files"))
                    .clicked()
                    && !converting
                {
                    if let Some(files) = file_dialogs::select_heic_files() {
                        app.file_details = files
                            .iter()
                            .map(|path| FileDetail {
                                path: path.clone(),
                                name: path
                                    .file_name()
                                    .map(|n| n.to_string_lossy().into_owned())
                                    .unwrap_or_default(),
                                original_size: std::fs::metadata(path)
                                    .map(|m| m.len())
                                    .unwrap_or(0),
                                output_size: None,
                                status: "Pending".to_string(),
                                error_message: None,
                            })
                            .collect();
                        app.input_files = files;
                        app.log_messages.lock().push(format!(
                            "[{}] {} file(s) selected.",
                            chrono::Local::now().format("%H:%M:%S"),
                            app.input_files.len()
                        ));
                    }
                }
                ui.add_space(5.0);
                if ui
                    .add_sized(
                        [button_width, 30.0],
                        egui::Button::new("Select Output Directory"),
                    )
                    .clicked()
                    && !converting
                {
                    if let Some(dir) = file_dialogs::select_output_directory() {
                        app.output_directory = Some(dir);
                        app.log_messages.lock().push(format!(
                            "[{}] Output directory selected.",
                            chrono::Local::now().format("%H:%M:%S")
                        ));
                    }
                }

                ui.add_space(10.0);

                // Display output directory
                ui.group(|ui| {
                    ui.set_width(button_width);
                    ui.label(
                        RichText::new("Output Directory:")
                            .size(16.0)
                            .color(Color32::from_rgb(100, 200, 250)),
                    );
                    if let Some(dir) = &app.output_directory {
                        ui.label(dir.to_string_lossy());
                    } else {
                        ui.label("Not selected (will use input directory)");
                    }
                });

                ui.add_space(10.0);

                ui.group(|ui| {
                    ui.set_width(button_width);
                    ui.label(
                        RichText::new("Batch")
                            .size(16.0)
                            .color(Color32::from_rgb(100, 200, 250)),
                    );
                    let total_size: f64 = app
                        .input_files
                        .iter()
                        .filter_map(|f| std::fs::metadata(f).ok())
                        .map(|m| m.len() as f64 / (1024.0 * 1024.0))
                        .sum();
                    ui.label(
                        RichText::new(format!("Files: {}", app.input_files.len()))
                            .color(Color32::from_rgb(200, 200, 200)),
                    );
                    ui.label(
                        RichText::new(format!("Total Size: {:.2} MB", total_size))
                            .color(Color32::from_rgb(200, 200, 200)),
                    );
                    ui.label(
                        RichText::new("Output: JPEG, quality 95")
                            .color(Color32::from_rgb(200, 200, 200)),
                    );
                });

                ui.add_space(10.0);

                if ui
                    .add_sized([button_width, 30.0], egui::Button::new("Start Conversion"))
                    .clicked()
                    && !converting
                {
                    if app.input_files.is_empty() {
                        app.log_messages.lock().push(format!(
                            "[{}] No HEIC files selected.",
                            chrono::Local::now().format("%H:%M:%S")
                        ));
                    } else {
                        app.log_messages.lock().push(format!(
                            "[{}] Starting conversion...",
                            chrono::Local::now().format("%H:%M:%S")
                        ));
                        start_conversion(app);
                    }
                }
            });

            ui.add_space(10.0);

            // Selected files (scrollable table)
            ui.vertical(|ui| {
                ui.group(|ui| {
                    ui.set_min_width(ui.available_width());
                    ui.set_min_height(ui.available_height() - 250.0);
                    ui.label(
                        RichText::new("Selected Files:")
                            .size(16.0)
                            .color(Color32::from_rgb(100, 200, 250)),
                    );

                    egui::ScrollArea::vertical()
                        .auto_shrink([false; 2])
                        .show(ui, |ui| {
                            egui::Grid::new("file_details_grid")
                                .num_columns(5)
                                .striped(true)
                                .show(ui, |ui| {
                                    ui.label(RichText::new("#").strong());
                                    ui.label(RichText::new("Name").strong());
                                    ui.label(RichText::new("Size").strong());
                                    ui.label(RichText::new("JPEG Size").strong());
                                    ui.label(RichText::new("Status").strong());
                                    ui.end_row();

                                    for (index, detail) in app.file_details.iter().enumerate() {
                                        ui.label(format!("{}", index + 1));
                                        ui.label(&detail.name);
                                        ui.label(format!(
                                            "{:.2} MB",
                                            detail.original_size as f64 / (1024.0 * 1024.0)
                                        ));
                                        ui.label(match detail.output_size {
                                            Some(size) => format!(
                                                "{:.2} MB",
                                                size as f64 / (1024.0 * 1024.0)
                                            ),
                                            None => "-".to_string(),
                                        });

                                        let status_color = match detail.status.as_str() {
                                            "Converted" => Color32::GREEN,
                                            "Converting..." => Color32::YELLOW,
                                            "Failed" => Color32::RED,
                                            _ => Color32::WHITE,
                                        };
                                        let status = match &detail.error_message {
                                            Some(error) => {
                                                format!("{} ({})", detail.status, error)
                                            }
                                            None => detail.status.clone(),
                                        };
                                        ui.label(RichText::new(status).color(status_color));
                                        ui.end_row();
                                    }
                                });
                        });
                });
            });
        });

        ui.add_space(20.0);

        // Conversion log with progress bar
        ui.group(|ui| {
            ui.set_min_width(ui.available_width());
            ui.label(
                RichText::new("Conversion Log")
                    .size(16.0)
                    .color(Color32::from_rgb(100, 200, 250)),
            );

            let progress = &app.batch_progress;
            if progress.total > 0 {
                let ratio = progress.completed as f32 / progress.total as f32;
                ui.add(ProgressBar::new(ratio).text(format!("{}%", progress.percent())));
            }

            egui::ScrollArea::vertical()
                .max_height(200.0)
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    let logs = app.log_messages.lock();
                    for log in logs.iter() {
                        if log.contains("Failed") || log.contains("aborted") {
                            ui.label(RichText::new(log).color(Color32::RED));
                        } else {
                            ui.label(log);
                        }
                    }
                });
        });
    });
}

fn start_conversion(app: &mut App) {
    let input_files = app.input_files.clone();
    let output_directory = app.output_directory.clone().unwrap_or_else(|| {
        input_files
            .first()
            .and_then(|path| path.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let log_messages = app.log_messages.clone();

    app.batch_progress = BatchProgress {
        completed: 0,
        total: input_files.len(),
    };
    for detail in &mut app.file_details {
        detail.status = "Converting...".to_string();
        detail.output_size = None;
        detail.error_message = None;
    }

    let (sender, receiver) = channel();
    app.conversion_receiver = Some(receiver);

    std::thread::spawn(move || {
        let logger = Logger::new(log_messages);
        let progress_sender = sender.clone();
        let outcome = image_processing::convert_batch(
            &input_files,
            &output_directory,
            &logger,
            move |percent| {
                progress_sender
                    .send(ConversionUpdate::Progress(percent))
                    .unwrap_or_default();
            },
        );
        match outcome {
            Ok(results) => sender
                .send(ConversionUpdate::BatchFinished(results))
                .unwrap_or_default(),
            Err(e) => sender
                .send(ConversionUpdate::BatchFailed(e.to_string()))
                .unwrap_or_default(),
        }
    });
}
