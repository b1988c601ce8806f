use std::path::Path;

pub const UPLOAD_COMMAND: &str = "upload";
pub const QUIT_COMMAND: &str = "quit";

/// Line-oriented input fed to the client: one `upload <path>` per file in
/// the given order, then a single `quit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandScript {
    text: String,
    uploads: usize,
}

impl CommandScript {
    pub fn build<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut text = String::new();
        for path in paths {
            text.push_str(UPLOAD_COMMAND);
            text.push(' ');
            text.push_str(&path.as_ref().display().to_string());
            text.push('\n');
        }
        text.push_str(QUIT_COMMAND);
        text.push('\n');
        Self {
            text,
            uploads: paths.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}
