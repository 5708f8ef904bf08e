//! CDN URLs for CMS image assets.
//!
//! Asset references look like `image-<id>-<width>x<height>-<format>`.

use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl ImageAsset {
    pub fn parse(reference: &str) -> Option<Self> {
        let rest = reference.strip_prefix("image-")?;
        let (rest, format) = rest.rsplit_once('-')?;
        let (id, dims) = rest.rsplit_once('-')?;
        let (w, h) = dims.split_once('x')?;
        if id.is_empty() || format.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            width: w.parse().ok()?,
            height: h.parse().ok()?,
            format: format.to_string(),
        })
    }
}

/// Builds image URLs for one project and dataset.
#[derive(Debug, Clone)]
pub struct ImageUrlBuilder {
    project_id: String,
    dataset: String,
}

impl ImageUrlBuilder {
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
        }
    }

    /// URL for `reference`, optionally resized. `None` if the reference is
    /// not an image asset.
    pub fn url(&self, reference: &str, width: Option<u32>, height: Option<u32>) -> Option<String> {
        let asset = ImageAsset::parse(reference)?;
        let mut url = format!(
            "https://cdn.sanity.io/images/{}/{}/{}-{}x{}.{}",
            self.project_id, self.dataset, asset.id, asset.width, asset.height, asset.format
        );
        let mut sep = '?';
        for (key, value) in [("w", width), ("h", height)] {
            if let Some(v) = value {
                // Writing into a String cannot fail.
                let _ = write!(url, "{sep}{key}={v}");
                sep = '&';
            }
        }
        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_asset_reference() {
        let asset = ImageAsset::parse("image-Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000-jpg").unwrap();
        assert_eq!(asset.id, "Tb9Ew8CXIwaY6R1kjMvI0uRR");
        assert_eq!((asset.width, asset.height), (2000, 3000));
        assert_eq!(asset.format, "jpg");
        assert!(ImageAsset::parse("file-abc-pdf").is_none());
        assert!(ImageAsset::parse("image-abc-axb-png").is_none());
    }

    #[test]
    fn builds_cdn_urls() {
        let b = ImageUrlBuilder::new("proj", "production");
        assert_eq!(
            b.url("image-abc-10x20-png", None, None).unwrap(),
            "https://cdn.sanity.io/images/proj/production/abc-10x20.png"
        );
        assert_eq!(
            b.url("image-abc-10x20-png", Some(5), Some(8)).unwrap(),
            "https://cdn.sanity.io/images/proj/production/abc-10x20.png?w=5&h=8"
        );
        assert_eq!(
            b.url("image-abc-10x20-png", None, Some(8)).unwrap(),
            "https://cdn.sanity.io/images/proj/production/abc-10x20.png?h=8"
        );
    }
}
