//! Pending-upload selection for the file manager.

#[cfg(test)]
#[path = "upload_test.rs"]
mod upload_test;

use crate::net::types::UploadFile;

pub const ALLOWED_MIME_TYPES: [&str; 5] = ["image/jpeg", "image/png", "image/gif", "image/webp", "application/pdf"];
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_FILES_PER_UPLOAD: usize = 10;
pub const TOO_MANY_FILES: &str = "Maximum 10 files per upload.";

/// Files queued for the next `upload_files` call.
#[derive(Clone, Debug, Default)]
pub struct UploadSelection {
    files: Vec<UploadFile>,
}

impl UploadSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `incoming`, returning one message per rejected file.
    ///
    /// Wrong type and oversize files are rejected individually. Files whose
    /// name and size match one already queued are skipped silently. If the
    /// accepted batch would push the selection past the per-upload limit,
    /// nothing is added.
    pub fn add(&mut self, incoming: Vec<UploadFile>) -> Vec<String> {
        let mut errors = Vec::new();
        let mut accepted: Vec<UploadFile> = Vec::new();

        for file in incoming {
            if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
                errors.push(format!("{}: File type not allowed. Use JPG, PNG, GIF, WebP, or PDF.", file.name));
                continue;
            }
            if file.size() > MAX_FILE_BYTES {
                errors.push(format!("{}: File too large. Maximum size is 10MB.", file.name));
                continue;
            }
            let duplicate = self.files.iter().chain(accepted.iter()).any(|f| same_file(f, &file));
            if !duplicate {
                accepted.push(file);
            }
        }

        if self.files.len() + accepted.len() > MAX_FILES_PER_UPLOAD {
            errors.push(TOO_MANY_FILES.to_owned());
            return errors;
        }
        self.files.extend(accepted);
        errors
    }

    /// Drop the file at `index`; out-of-range is a no-op.
    pub fn remove(&mut self, index: usize) -> Option<UploadFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    #[must_use]
    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

fn same_file(a: &UploadFile, b: &UploadFile) -> bool {
    a.name == b.name && a.size() == b.size()
}

/// Toast text after a successful upload of `count` files.
#[must_use]
pub fn upload_success_message(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} file{plural} uploaded successfully")
}
