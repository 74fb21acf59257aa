use std::fmt::Write as _;

use super::params::RenditionSpec;

/// HLS master playlist listing every rendition in ladder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<(RenditionSpec, String)>,
}

impl Manifest {
    pub fn new(renditions: &[RenditionSpec]) -> Self {
        Self {
            entries: renditions
                .iter()
                .map(|r| (r.clone(), r.playlist_name()))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[(RenditionSpec, String)] {
        &self.entries
    }

    pub fn render(&self) -> String {
        let mut out = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");

        for (rendition, playlist) in &self.entries {
            let _ = writeln!(
                out,
                "#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH={},RESOLUTION={}x{}",
                rendition.video_bitrate, rendition.width, rendition.height
            );
            let _ = writeln!(out, "{}", playlist);
        }

        out
    }
}
