use std::fmt;

use tracing::debug;

use crate::model::UploadedFile;
use crate::pipeline::{process_batch, FileReport, UserChoices};

/// Identifies one upload within a session. Two uploads with the same name get
/// different ids and therefore independent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(usize);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file-{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct FileEntry {
    id: FileId,
    file: UploadedFile,
    choices: UserChoices,
}

/// Per-file state for one interactive session, kept in upload order.
#[derive(Debug, Clone, Default)]
pub struct Session {
    next_id: usize,
    entries: Vec<FileEntry>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload(&mut self, file: UploadedFile) -> FileId {
        self.upload_with(file, UserChoices::default())
    }

    pub fn upload_with(&mut self, file: UploadedFile, choices: UserChoices) -> FileId {
        let id = FileId(self.next_id);
        self.next_id += 1;
        debug!(%id, file = file.name(), "file uploaded");
        self.entries.push(FileEntry { id, file, choices });
        id
    }

    pub fn file(&self, id: FileId) -> Option<&UploadedFile> {
        self.entry(id).map(|entry| &entry.file)
    }

    pub fn choices(&self, id: FileId) -> Option<&UserChoices> {
        self.entry(id).map(|entry| &entry.choices)
    }

    pub fn choices_mut(&mut self, id: FileId) -> Option<&mut UserChoices> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .map(|entry| &mut entry.choices)
    }

    pub fn remove(&mut self, id: FileId) -> Option<UploadedFile> {
        let position = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(position).file)
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &UploadedFile)> {
        self.entries.iter().map(|entry| (entry.id, &entry.file))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-runs the pipeline for every file in upload order.
    pub fn evaluate(&self) -> Vec<(FileId, FileReport)> {
        let reports = process_batch(
            self.entries
                .iter()
                .map(|entry| (&entry.file, &entry.choices)),
        );
        self.entries
            .iter()
            .map(|entry| entry.id)
            .zip(reports)
            .collect()
    }

    /// Drops every upload, as when the page state resets.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    fn entry(&self, id: FileId) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}
