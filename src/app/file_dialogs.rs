// file_dialogs.rs
use rfd::FileDialog;
use std::path::PathBuf;

pub fn select_heic_files() -> Option<Vec<PathBuf>> {
    FileDialog::new()
        .add_filter("HEIC image", &["heic", "heif"])
        .pick_files()
}

pub fn select_output_directory() -> Option<PathBuf> {
    FileDialog::new().pick_folder()
}
