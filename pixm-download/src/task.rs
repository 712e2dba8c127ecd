//! Download work items and the on-disk layout they target.
//!
//! Layout under the works root:
//!   `<root>/<author_id>/<filename>` for single-page items,
//!   `<root>/<author_id>/<item_id>/<filename>` for multi-page and
//!   animated items. Rebuilt animations land next to their archive as
//!   `<item_id>_anim.gif`.

use std::path::PathBuf;

/// What an animated item needs beyond its archive download.
#[derive(Debug, Clone)]
pub struct AnimationSpec {
    pub item_id: i64,
    /// Per-frame delays in hundredths of a second, archive listing order.
    pub frame_delays_cs: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub url: String,
    /// Works root directory.
    pub root: PathBuf,
    pub author_id: i64,
    pub item_id: i64,
    /// Per-item directory name for multi-page and animated items; `None`
    /// puts the file directly under the author directory.
    pub subdir: Option<String>,
    /// Spliced between the filename stem and its extension to keep
    /// same-named assets apart.
    pub filename_suffix: Option<String>,
    /// Present for frame archives of animated items.
    pub animation: Option<AnimationSpec>,
}

impl DownloadTask {
    pub fn single(url: impl Into<String>, root: PathBuf, author_id: i64, item_id: i64) -> Self {
        Self {
            url: url.into(),
            root,
            author_id,
            item_id,
            subdir: None,
            filename_suffix: None,
            animation: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.filename_suffix = Some(suffix.into());
        self
    }

    pub fn in_item_dir(
        url: impl Into<String>,
        root: PathBuf,
        author_id: i64,
        item_id: i64,
    ) -> Self {
        Self {
            subdir: Some(item_id.to_string()),
            ..Self::single(url, root, author_id, item_id)
        }
    }

    pub fn animated(
        url: impl Into<String>,
        root: PathBuf,
        author_id: i64,
        item_id: i64,
        frame_delays_cs: Vec<u32>,
    ) -> Self {
        Self {
            animation: Some(AnimationSpec {
                item_id,
                frame_delays_cs,
            }),
            ..Self::in_item_dir(url, root, author_id, item_id)
        }
    }

    fn author_dir(&self) -> PathBuf {
        self.root.join(self.author_id.to_string())
    }

    /// Directory the asset is written to.
    pub fn dest_dir(&self) -> PathBuf {
        match &self.subdir {
            Some(subdir) => self.author_dir().join(subdir),
            None => self.author_dir(),
        }
    }

    /// Other locations the same asset may already live at, from runs that
    /// used the other layout variant.
    pub fn alternate_dirs(&self) -> Vec<PathBuf> {
        match &self.subdir {
            Some(_) => vec![self.author_dir()],
            None => vec![self.author_dir().join(self.item_id.to_string())],
        }
    }

    /// Filename the asset is stored under: derived from the URL, with the
    /// disambiguation suffix spliced in before the extension.
    pub fn target_filename(&self) -> Option<String> {
        let name = filename_from_url(&self.url)?;
        Some(match &self.filename_suffix {
            Some(suffix) => splice_suffix(name, suffix),
            None => name.to_string(),
        })
    }
}

/// Filename of an asset URL: the last path segment, query stripped.
pub fn filename_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    (!name.is_empty()).then_some(name)
}

fn splice_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}{suffix}.{ext}"),
        _ => format!("{name}{suffix}"),
    }
}
