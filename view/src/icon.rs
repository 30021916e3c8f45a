use std::fmt;

use arbor_tree::TreeNode;
use ratatui::style::{Color, Style};
use ratatui::text::Span;
use serde::{Deserialize, Serialize};

use crate::Render;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "bmp", "gif", "ico", "jpeg", "jpg", "png", "svg", "tif", "tiff", "webp",
];

pub const CODE_EXTENSIONS: &[&str] = &[
    "c", "cc", "cpp", "css", "go", "h", "hpp", "html", "ipynb", "java", "js", "json", "jsx",
    "less", "py", "r", "rb", "rs", "scala", "sh", "toml", "ts", "tsx", "yaml", "yml",
];

pub const TEXT_EXTENSIONS: &[&str] = &["csv", "err", "log", "md", "out", "rst", "text", "tsv", "txt"];

/// Trailing extension of a display name: the last segment after splitting
/// on `.` and `/`. A name without either separator is its own extension.
pub fn extension(name: &str) -> &str {
    name.rsplit(|c: char| c == '.' || c == '/').next().unwrap_or(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconKind {
    Folder,
    Image,
    Code,
    Text,
    File,
}

impl IconKind {
    /// Directories are folders regardless of their name.
    pub fn classify(node: &TreeNode) -> Self {
        if node.is_branch() {
            IconKind::Folder
        } else {
            Self::from_name(&node.name)
        }
    }

    pub fn from_name(name: &str) -> Self {
        let extension = extension(name).to_ascii_lowercase();
        let extension = extension.as_str();
        if IMAGE_EXTENSIONS.contains(&extension) {
            IconKind::Image
        } else if CODE_EXTENSIONS.contains(&extension) {
            IconKind::Code
        } else if TEXT_EXTENSIONS.contains(&extension) {
            IconKind::Text
        } else {
            IconKind::File
        }
    }

    /// Font Awesome icon name used by the web client.
    pub fn class_name(self) -> &'static str {
        match self {
            IconKind::Folder => "folder",
            IconKind::Image => "file-image-o",
            IconKind::Code => "file-code-o",
            IconKind::Text => "file-text-o",
            IconKind::File => "file",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            IconKind::Folder => "📁",
            IconKind::Image => "🖼",
            IconKind::Code => "📜",
            IconKind::Text => "📝",
            IconKind::File => "📄",
        }
    }

    fn color(self) -> Color {
        match self {
            IconKind::Folder => Color::Blue,
            IconKind::Image => Color::Magenta,
            IconKind::Code => Color::Green,
            IconKind::Text => Color::White,
            IconKind::File => Color::Gray,
        }
    }
}

impl fmt::Display for IconKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

impl Render for IconKind {
    fn render(&self) -> Vec<Span<'static>> {
        vec![Span::styled(self.glyph(), Style::default().fg(self.color()))]
    }
}
