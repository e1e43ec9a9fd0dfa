use std::path::{Path, PathBuf};

use crate::error::Result;

/// Outcome recorded against one line of an input file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineStatus {
    /// Everything behind the line was downloaded: `# line`.
    Done,
    /// At least one download failed: `line # error`.
    Failed,
    /// The chat could not be resolved: `##line (entity error)`.
    EntityError,
}

impl LineStatus {
    pub fn apply(self, line: &str) -> String {
        match self {
            LineStatus::Done => format!("# {}", line),
            LineStatus::Failed => format!("{} # error", line),
            LineStatus::EntityError => format!("##{} (entity error)", line),
        }
    }
}

/// A list of message links, one per line, rewritten in place as lines are
/// processed. Anything after a `#` is a comment, so finished lines are
/// skipped on the next run.
#[derive(Debug)]
pub struct InputFile {
    path: PathBuf,
    lines: Vec<String>,
}

impl InputFile {
    pub async fn open(path: impl AsRef<Path>) -> Result<InputFile> {
        let path = path.as_ref().to_path_buf();
        let text = tokio::fs::read_to_string(&path).await?;
        let lines = text.lines().map(|line| line.trim().to_string()).collect();
        Ok(InputFile { path, lines })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line `lnum`, counting from 1.
    pub fn get(&self, lnum: usize) -> Option<&str> {
        lnum.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    /// Line numbers and contents of the lines that still have work, with
    /// comments stripped.
    pub fn pending(&self) -> Vec<(usize, String)> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| {
                let content = line.split('#').next().unwrap_or_default().trim();
                if content.is_empty() {
                    log::debug!("ignoring input at line {}", i + 1);
                    None
                } else {
                    Some((i + 1, content.to_string()))
                }
            })
            .collect()
    }

    pub fn set_status(&mut self, lnum: usize, status: LineStatus) {
        if let Some(line) = lnum.checked_sub(1).and_then(|i| self.lines.get_mut(i)) {
            *line = status.apply(line);
        }
    }

    pub async fn write(&self) -> Result<()> {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        tokio::fs::write(&self.path, text).await?;
        log::debug!("wrote {} lines to {:?}", self.lines.len(), self.path);
        Ok(())
    }
}
