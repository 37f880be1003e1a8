/// Default copy chunk size.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// What to do when a file entry's destination already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overwrite {
    /// Truncate and rewrite the existing file.
    #[default]
    Always,
    /// Leave the existing file alone and skip the entry.
    Never,
}

/// Knobs for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub overwrite: Overwrite,
    /// Only extract file entries matching one of these patterns.
    pub include: Vec<String>,
    /// Skip entries matching any of these patterns.
    pub exclude: Vec<String>,
    /// Drop the directory part of every name.
    pub junk_paths: bool,
    pub buffer_size: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            overwrite: Overwrite::Always,
            include: Vec::new(),
            exclude: Vec::new(),
            junk_paths: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ExtractOptions {
    pub fn overwrite(mut self, overwrite: Overwrite) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn junk_paths(mut self, junk_paths: bool) -> Self {
        self.junk_paths = junk_paths;
        self
    }

    /// Chunk size used when copying entry data; clamped to at least one byte.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }
}
