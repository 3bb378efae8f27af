//! Deciding which files in a frame directory are frames.

use std::collections::HashSet;
use std::path::Path;

/// Filters files down to decodable frame images
#[derive(Debug, Clone)]
pub struct ImageFilter {
    /// File extensions to include, lowercase
    extensions: HashSet<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl ImageFilter {
    /// Create a new filter with the formats the decoder handles
    pub fn new() -> Self {
        Self {
            extensions: ["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp", "ppm", "pgm"]
                .into_iter()
                .map(String::from)
                .collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Override the list of extensions to accept
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    /// Check if a file should be treated as a frame
    pub fn should_include(&self, path: &Path) -> bool {
        // Capture tools often stage writes in dotfiles
        if !self.include_hidden {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    return false;
                }
            }
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_includes_common_frame_formats() {
        let filter = ImageFilter::new();
        assert!(filter.should_include(Path::new("/frames/0001.png")));
        assert!(filter.should_include(Path::new("/frames/0002.JPG")));
        assert!(filter.should_include(Path::new("/frames/snap.jpeg")));
    }

    #[test]
    fn filter_excludes_partial_writes() {
        let filter = ImageFilter::new();
        assert!(!filter.should_include(Path::new("/frames/0003.png.part")));
        assert!(!filter.should_include(Path::new("/frames/.0003.png")));
    }

    #[test]
    fn filter_can_include_hidden() {
        let filter = ImageFilter::new().with_hidden(true);
        assert!(filter.should_include(Path::new("/frames/.0003.png")));
    }

    #[test]
    fn custom_extensions_are_case_insensitive() {
        let filter = ImageFilter::new().with_extensions(vec!["PNG".to_string()]);
        assert!(filter.should_include(Path::new("/frames/a.png")));
        assert!(!filter.should_include(Path::new("/frames/a.jpg")));
    }

    #[test]
    fn filter_handles_no_extension() {
        let filter = ImageFilter::new();
        assert!(!filter.should_include(Path::new("/frames/no_extension")));
    }
}
