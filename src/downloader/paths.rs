use std::path::{Path, PathBuf};

use crate::tg::ParsedEntity;
use crate::types::FileType;

/// Where a downloaded file and its meta sidecar go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetPaths {
    pub target: PathBuf,
    pub meta: PathBuf,
}

/// Lays files out as `<root>/@<username>|<chat id>[ - thumbs]/<Photo|Video|>/<base>`.
#[derive(Clone, Debug)]
pub struct PathResolver {
    root: PathBuf,
    thumbs_only: bool,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, thumbs_only: bool) -> Self {
        PathResolver {
            root: root.into(),
            thumbs_only,
        }
    }

    pub fn chat_dir(&self, chat_id: i64, username: &str) -> PathBuf {
        let mut name = if username.is_empty() {
            chat_id.to_string()
        } else {
            format!("@{}", username)
        };
        if self.thumbs_only {
            name.push_str(" - thumbs");
        }
        self.root.join(name)
    }

    /// `file_name` only names files of type [`FileType::Other`]; everything
    /// else is called `<chat>_<msg>[_<reply>]<ext>`.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve(
        &self,
        chat_id: i64,
        username: &str,
        message_id: i32,
        reply_id: Option<u32>,
        file_name: Option<&str>,
        ext: &str,
        file_type: FileType,
    ) -> TargetPaths {
        let mut base = format!(
            "{}_{}{}{}",
            chat_id,
            message_id,
            reply_id.map(|r| format!("_{}", r)).unwrap_or_default(),
            ext
        );
        if file_type == FileType::Other {
            if let Some(name) = file_name.filter(|name| !name.is_empty()) {
                base = name.to_string();
            }
        }

        let dir = self.chat_dir(chat_id, username);
        let meta = dir.join("Meta").join(&base).with_extension("json");

        let mut target = dir;
        if !file_type.path().is_empty() {
            target.push(file_type.path());
        }
        target.push(&base);
        if self.thumbs_only && file_type == FileType::Video {
            target.set_extension("webp");
        }

        TargetPaths { target, meta }
    }
}

/// Temporary path a download is written to before it is renamed into place.
pub fn part_path(target: &Path) -> PathBuf {
    let mut part = target.as_os_str().to_owned();
    part.push(".part");
    PathBuf::from(part)
}

/// How a message is named in logs and in the archive's `msg` column.
///
/// The text is the archive's resume key, so it stays byte-compatible with
/// existing archives: Python-style quoting and the outer parenthesis left
/// open.
pub fn message_repr(message_id: i32, reply_id: Option<u32>, chat: &ParsedEntity) -> String {
    let reply = match reply_id {
        Some(reply_id) => reply_id.to_string(),
        None => "None".to_string(),
    };
    format!(
        "Message(id={}, reply_id={}, from={}(id={}, username={})",
        message_id,
        reply,
        chat.class,
        chat.id,
        quote(&chat.username)
    )
}

// Single quoted unless the text holds a single quote and no double quote
fn quote(text: &str) -> String {
    let delim = if text.contains('\'') && !text.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(delim);
    for c in text.chars() {
        if c == '\\' || c == delim {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(delim);
    out
}
