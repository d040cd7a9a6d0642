//! # Frame sources
//!
//! The camera feed is consumed through the [`FrameSource`] trait. A source produces frames at
//! its own pace and returns `None` whenever no frame is available, which the control loop
//! treats as "skip this cycle".

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::RgbImage;
use log::{debug, warn};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something which produces colour frames.
pub trait FrameSource {
    /// Get the next frame, or `None` if there is no frame available right now.
    fn next_frame(&mut self) -> Option<RgbImage>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Plays back the images in a directory, in file name order.
pub struct ImageDirSource {
    paths: Vec<PathBuf>,
    next: usize,
    looped: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FrameSourceError {
    #[error("Could not read the frame directory {0:?}: {1}")]
    ReadDirError(PathBuf, std::io::Error),

    #[error("The frame directory {0:?} contains no PNG or JPEG images")]
    NoImages(PathBuf),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ImageDirSource {
    /// Open a directory of frames. If `looped` the frames are replayed forever, otherwise the
    /// source runs dry after the last one.
    pub fn new<P: AsRef<Path>>(dir: P, looped: bool) -> Result<Self, FrameSourceError> {
        let dir = dir.as_ref();

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| FrameSourceError::ReadDirError(dir.to_path_buf(), e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_image(p))
            .collect();

        if paths.is_empty() {
            return Err(FrameSourceError::NoImages(dir.to_path_buf()));
        }

        paths.sort();

        debug!("Loaded {} frames from {:?}", paths.len(), dir);

        Ok(Self {
            paths,
            next: 0,
            looped,
        })
    }

    /// Number of frames in the directory.
    pub fn len(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        if self.next >= self.paths.len() {
            if !self.looped {
                return None;
            }
            self.next = 0;
        }

        let path = &self.paths[self.next];
        self.next += 1;

        match image::open(path) {
            Ok(img) => Some(img.to_rgb8()),
            Err(e) => {
                warn!("Could not decode frame {:?}: {}", path, e);
                None
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn is_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_ascii_lowercase().as_str(),
            "png" | "jpg" | "jpeg"
        ),
        None => false,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "frame_source_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_image_dir_source() {
        let dir = temp_dir("playback");

        RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30]))
            .save(dir.join("b.png"))
            .unwrap();
        RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]))
            .save(dir.join("a.png"))
            .unwrap();
        fs::write(dir.join("notes.txt"), "not a frame").unwrap();
        fs::write(dir.join("c.png"), "not a png either").unwrap();

        let mut src = ImageDirSource::new(&dir, false).unwrap();
        assert_eq!(src.len(), 3);

        // Name order
        assert_eq!(src.next_frame().map(|f| f.dimensions()), Some((2, 2)));
        assert_eq!(src.next_frame().map(|f| f.dimensions()), Some((4, 3)));

        // Undecodable frame is skipped, then the source runs dry
        assert!(src.next_frame().is_none());
        assert!(src.next_frame().is_none());

        let mut src = ImageDirSource::new(&dir, true).unwrap();
        for _ in 0..3 {
            src.next_frame();
        }
        assert_eq!(src.next_frame().map(|f| f.dimensions()), Some((2, 2)));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_dir() {
        let dir = temp_dir("empty");
        assert!(matches!(
            ImageDirSource::new(&dir, false),
            Err(FrameSourceError::NoImages(_))
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
