// app.rs
pub mod gui;
pub mod image_processing;
pub mod file_dialogs;

use eframe::egui;
use eframe::App as EframeApp;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use image_processing::ConversionResult;

pub struct App {
    pub input_files: Vec<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub batch_progress: BatchProgress,
    pub file_details: Vec<FileDetail>,
    pub log_messages: Arc<Mutex<Vec<String>>>,
    pub conversion_receiver: Option<Receiver<ConversionUpdate>>,
}

/// Messages posted by the background conversion thread and drained by the
/// GUI loop. One `Progress` message per completed file.
pub enum ConversionUpdate {
    Progress(u8),
    BatchFinished(Vec<ConversionResult>),
    BatchFailed(String),
}

/// Aggregate batch state behind the progress bar. Owned by the GUI; the
/// converter reports completions over the update channel.
#[derive(Default)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            (self.completed * 100 / self.total) as u8
        }
    }
}

/// Per-file row in the GUI table.
#[derive(Clone, Debug)]
pub struct FileDetail {
    pub path: PathBuf,
    pub name: String,
    pub original_size: u64,
    pub output_size: Option<u64>,
    pub status: String,
    pub error_message: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            input_files: Vec::new(),
            output_directory: None,
            batch_progress: BatchProgress::default(),
            file_details: Vec::new(),
            log_messages: Arc::new(Mutex::new(Vec::new())),
            conversion_receiver: None,
        }
    }
}

impl App {
    /// Applies one channel message; returns true when the batch is over and
    /// the receiver should be dropped.
    fn handle_update(&mut self, update: ConversionUpdate) -> bool {
        match update {
            ConversionUpdate::Progress(_percent) => {
                // One message per completed file.
                self.batch_progress.completed += 1;
                false
            }
            ConversionUpdate::BatchFinished(results) => {
                self.apply_results(&results);
                true
            }
            ConversionUpdate::BatchFailed(message) => {
                self.abort_batch(&message);
                true
            }
        }
    }

    /// Nothing ran; put the rows back the way they were before Start.
    fn abort_batch(&mut self, message: &str) {
        for detail in &mut self.file_details {
            if detail.status == "Converting..." {
                detail.status = "Pending".to_string();
            }
        }
        self.batch_progress = BatchProgress::default();
        self.log_messages.lock().push(format!(
            "[{}] Conversion aborted: {}",
            chrono::Local::now().format("%H:%M:%S"),
            message
        ));
    }

    fn apply_results(&mut self, results: &[ConversionResult]) {
        for result in results {
            let detail = self
                .file_details
                .iter_mut()
                .find(|d| d.path == result.job.input_path);
            if let Some(detail) = detail {
                if result.success {
                    detail.status = "Converted".to_string();
                    detail.output_size =
                        std::fs::metadata(&result.job.output_path).map(|m| m.len()).ok();
                } else {
                    detail.status = "Failed".to_string();
                    detail.error_message = result.error.clone();
                }
            }
        }

        let failed: Vec<&ConversionResult> =
            results.iter().filter(|r| !r.success).collect();
        let mut logs = self.log_messages.lock();
        logs.push(format!(
            "[{}] Conversion finished: {} of {} file(s) converted.",
            chrono::Local::now().format("%H:%M:%S"),
            results.len() - failed.len(),
            results.len()
        ));
        for result in failed {
            logs.push(format!(
                "[{}] Failed: {} ({})",
                chrono::Local::now().format("%H:%M:%S"),
                result.job.input_path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }
}

impl EframeApp for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut finished = false;
        let mut needs_redraw = false;

        let mut pending = Vec::new();
        if let Some(receiver) = &self.conversion_receiver {
            while let Ok(update) = receiver.try_recv() {
                pending.push(update);
            }
        }
        for update in pending {
            if self.handle_update(update) {
                finished = true;
            }
            needs_redraw = true;
        }

        if finished {
            self.conversion_receiver = None;
        }

        // Render the GUI
        gui::render(self, ctx);

        if needs_redraw || self.conversion_receiver.is_some() {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::image_processing::ConversionJob;
    use super::*;
    use std::path::Path;

    fn detail(name: &str) -> FileDetail {
        FileDetail {
            path: PathBuf::from(name),
            name: name.to_string(),
            original_size: 1,
            output_size: None,
            status: "Converting...".to_string(),
            error_message: None,
        }
    }

    #[test]
    fn aborted_batch_resets_rows_to_pending() {
        let mut app = App::default();
        app.file_details.push(detail("a.heic"));
        app.batch_progress = BatchProgress {
            completed: 0,
            total: 1,
        };

        let finished = app.handle_update(ConversionUpdate::BatchFailed(
            "failed to create output directory".to_string(),
        ));

        assert!(finished);
        assert_eq!(app.file_details[0].status, "Pending");
        assert_eq!(app.batch_progress.total, 0);
        assert!(app
            .log_messages
            .lock()
            .iter()
            .any(|log| log.contains("aborted")));
    }

    #[test]
    fn finished_batch_marks_failed_rows() {
        let mut app = App::default();
        app.file_details.push(detail("a.heic"));
        let results = vec![ConversionResult {
            job: ConversionJob::new(Path::new("a.heic"), Path::new("out")),
            success: false,
            error: Some("boom".to_string()),
        }];

        let finished = app.handle_update(ConversionUpdate::BatchFinished(results));

        assert!(finished);
        assert_eq!(app.file_details[0].status, "Failed");
        assert_eq!(app.file_details[0].error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn progress_messages_advance_the_counter() {
        let mut app = App::default();
        app.batch_progress = BatchProgress {
            completed: 0,
            total: 2,
        };

        assert!(!app.handle_update(ConversionUpdate::Progress(50)));
        assert_eq!(app.batch_progress.completed, 1);
        assert_eq!(app.batch_progress.percent(), 50);
    }
}
