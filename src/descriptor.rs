//! DZI descriptor serialization.
//!
//! The descriptor is the XML file a Deep Zoom viewer fetches first. Viewers
//! read it by fixed attribute names, so the output below is a wire contract:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Image TileSize="256" Overlap="1" Format="jpg" xmlns="http://schemas.microsoft.com/deepzoom/2008">
//!   <Size Width="4000" Height="3000"/>
//! </Image>
//! ```
//!
//! `Width`/`Height` are always the original source dimensions, never a level's.
//!
//! Writing the descriptor is the commit point of a pyramid: it lands via a
//! temp file and a rename so readers never see a truncated document.

use crate::imaging::TileFormat;
use std::io;
use std::path::Path;

/// Deep Zoom schema namespace.
pub const DEEPZOOM_NAMESPACE: &str = "http://schemas.microsoft.com/deepzoom/2008";

/// Contents of a `.dzi` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub tile_size: u32,
    pub overlap: u32,
    pub format: TileFormat,
    pub width: u32,
    pub height: u32,
}

impl Descriptor {
    /// Render the fixed-schema XML document.
    pub fn to_xml(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Image TileSize=\"{tile_size}\" Overlap=\"{overlap}\" Format=\"{format}\" xmlns=\"{ns}\">\n  \
             <Size Width=\"{width}\" Height=\"{height}\"/>\n\
             </Image>",
            tile_size = self.tile_size,
            overlap = self.overlap,
            format = self.format.extension(),
            ns = DEEPZOOM_NAMESPACE,
            width = self.width,
            height = self.height,
        )
    }

    /// Write the descriptor to `path` atomically (temp file + rename).
    ///
    /// On error the temp file is removed; `path` is untouched.
    pub fn write_atomic(&self, path: &Path) -> io::Result<()> {
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = Path::new(&tmp_name);

        let result = std::fs::write(tmp, self.to_xml()).and_then(|()| std::fs::rename(tmp, path));
        if result.is_err() {
            let _ = std::fs::remove_file(tmp);
        }
        result
    }
}
