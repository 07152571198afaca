use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::capture::types::FrameFormat;
use crate::frame::PixelFormat;

/// Saved capture profile for a single source — the shape and cadence the
/// embedder last used for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub fps: f32,
}

impl CaptureProfile {
    /// The frame shape this profile asks a backend for. Profiles only store
    /// geometry; the pixel layout is the pipeline default.
    pub fn frame_format(&self) -> FrameFormat {
        FrameFormat {
            width: self.width,
            height: self.height,
            pixel_format: PixelFormat::Bgr8,
        }
    }
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            width: 640,
            height: 480,
            fps: 30.0,
        }
    }
}

/// Top-level profile file structure — maps source IDs to capture profiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileFile {
    pub sources: HashMap<String, CaptureProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_profile_default_is_vga_30fps() {
        let profile = CaptureProfile::default();
        assert_eq!(profile.width, 640);
        assert_eq!(profile.height, 480);
        assert_eq!(profile.fps, 30.0);
    }

    #[test]
    fn frame_format_carries_profile_geometry() {
        let profile = CaptureProfile {
            name: "HD".to_string(),
            width: 1280,
            height: 720,
            fps: 60.0,
        };
        let format = profile.frame_format();
        assert_eq!(format.width, 1280);
        assert_eq!(format.height, 720);
        assert_eq!(format.pixel_format, PixelFormat::Bgr8);
    }

    #[test]
    fn profile_file_serialises_to_json() {
        let mut sources = HashMap::new();
        sources.insert(
            "synth:camera-000".to_string(),
            CaptureProfile {
                name: "Synthetic Camera 0".to_string(),
                width: 1920,
                height: 1080,
                fps: 30.0,
            },
        );

        let file = ProfileFile { sources };
        let json = serde_json::to_value(&file).unwrap();

        assert!(json["sources"]["synth:camera-000"].is_object());
        assert_eq!(json["sources"]["synth:camera-000"]["width"], 1920);
        assert_eq!(json["sources"]["synth:camera-000"]["fps"], 30.0);
    }

    #[test]
    fn profile_file_round_trips_through_json() {
        let mut sources = HashMap::new();
        sources.insert("cam-1".to_string(), CaptureProfile::default());
        sources.insert(
            "cam-2".to_string(),
            CaptureProfile {
                name: "External".to_string(),
                width: 1280,
                height: 720,
                fps: 24.0,
            },
        );

        let original = ProfileFile { sources };
        let json = serde_json::to_string(&original).unwrap();
        let restored: ProfileFile = serde_json::from_str(&json).unwrap();

        assert_eq!(original, restored);
    }
}
