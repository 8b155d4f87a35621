//! Value types shared by the controller, the facade and drivers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way the lens points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Facing {
    Back,
    Front,
}

impl Facing {
    pub const fn values() -> &'static [Facing] {
        &[Facing::Back, Facing::Front]
    }
}

impl Default for Facing {
    fn default() -> Self {
        Facing::Back
    }
}

/// Whether the session is set up for stills or for video recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    Picture,
    Video,
}

impl SessionType {
    pub const fn values() -> &'static [SessionType] {
        &[SessionType::Picture, SessionType::Video]
    }
}

impl Default for SessionType {
    fn default() -> Self {
        SessionType::Picture
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Flash {
    Off,
    On,
    Auto,
    Torch,
}

impl Flash {
    pub const fn values() -> &'static [Flash] {
        &[Flash::Off, Flash::On, Flash::Auto, Flash::Torch]
    }
}

impl Default for Flash {
    fn default() -> Self {
        Flash::Off
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WhiteBalance {
    Auto,
    Incandescent,
    Fluorescent,
    Daylight,
    Cloudy,
}

impl WhiteBalance {
    pub const fn values() -> &'static [WhiteBalance] {
        &[
            WhiteBalance::Auto,
            WhiteBalance::Incandescent,
            WhiteBalance::Fluorescent,
            WhiteBalance::Daylight,
            WhiteBalance::Cloudy,
        ]
    }
}

impl Default for WhiteBalance {
    fn default() -> Self {
        WhiteBalance::Auto
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hdr {
    Off,
    On,
}

impl Hdr {
    pub const fn values() -> &'static [Hdr] {
        &[Hdr::Off, Hdr::On]
    }
}

impl Default for Hdr {
    fn default() -> Self {
        Hdr::Off
    }
}

/// Whether video recordings carry an audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Audio {
    Off,
    On,
}

impl Default for Audio {
    fn default() -> Self {
        Audio::On
    }
}

/// Encoding target for video recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoQuality {
    /// Smallest profile the device offers
    Lowest,
    /// Largest profile the device offers
    Highest,
    MaxQvga,
    Max480p,
    Max720p,
    Max1080p,
    Max2160p,
}

impl VideoQuality {
    pub const fn values() -> &'static [VideoQuality] {
        &[
            VideoQuality::Lowest,
            VideoQuality::Highest,
            VideoQuality::MaxQvga,
            VideoQuality::Max480p,
            VideoQuality::Max720p,
            VideoQuality::Max1080p,
            VideoQuality::Max2160p,
        ]
    }

    /// Upper bound on the recording resolution (width, height).
    ///
    /// `Lowest` and `Highest` depend on the device and report `None`.
    pub fn max_resolution(&self) -> Option<(u32, u32)> {
        match self {
            VideoQuality::Lowest | VideoQuality::Highest => None,
            VideoQuality::MaxQvga => Some((320, 240)),
            VideoQuality::Max480p => Some((720, 480)),
            VideoQuality::Max720p => Some((1280, 720)),
            VideoQuality::Max1080p => Some((1920, 1080)),
            VideoQuality::Max2160p => Some((3840, 2160)),
        }
    }

    /// Recommended bitrate in bits per second
    pub fn bitrate(&self) -> u32 {
        match self {
            VideoQuality::Lowest | VideoQuality::MaxQvga => 500_000,
            VideoQuality::Max480p => 1_500_000,
            VideoQuality::Max720p => 2_500_000,
            VideoQuality::Max1080p | VideoQuality::Highest => 5_000_000,
            VideoQuality::Max2160p => 20_000_000,
        }
    }
}

impl Default for VideoQuality {
    fn default() -> Self {
        VideoQuality::Max480p
    }
}

/// Size of the drawable target handed over by the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSize {
    pub width: u32,
    pub height: u32,
}

impl PreviewSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for PreviewSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single setting change, as handed to drivers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Parameter {
    Facing(Facing),
    SessionType(SessionType),
    /// Normalized zoom, 0.0 is no zoom and 1.0 the device maximum
    Zoom(f32),
    /// Exposure compensation in EV
    ExposureCorrection(f32),
    Flash(Flash),
    WhiteBalance(WhiteBalance),
    Hdr(Hdr),
    Audio(Audio),
    VideoQuality(VideoQuality),
}

impl Parameter {
    /// Parameters that can only take effect by closing and reopening the device.
    pub fn requires_restart(&self) -> bool {
        matches!(self, Parameter::Facing(_) | Parameter::SessionType(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Parameter::Facing(_) => "facing",
            Parameter::SessionType(_) => "session_type",
            Parameter::Zoom(_) => "zoom",
            Parameter::ExposureCorrection(_) => "exposure_correction",
            Parameter::Flash(_) => "flash",
            Parameter::WhiteBalance(_) => "white_balance",
            Parameter::Hdr(_) => "hdr",
            Parameter::Audio(_) => "audio",
            Parameter::VideoQuality(_) => "video_quality",
        }
    }
}

/// The full parameter set. Defaults are valid while the camera is closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub facing: Facing,
    pub session_type: SessionType,
    pub zoom: f32,
    pub exposure_correction: f32,
    pub flash: Flash,
    pub white_balance: WhiteBalance,
    pub hdr: Hdr,
    pub audio: Audio,
    pub video_quality: VideoQuality,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            facing: Facing::default(),
            session_type: SessionType::default(),
            zoom: 0.0,
            exposure_correction: 0.0,
            flash: Flash::default(),
            white_balance: WhiteBalance::default(),
            hdr: Hdr::default(),
            audio: Audio::default(),
            video_quality: VideoQuality::default(),
        }
    }
}

impl Parameters {
    /// Store a value, returning whether it differs from the previous one.
    pub fn set(&mut self, parameter: Parameter) -> bool {
        match parameter {
            Parameter::Facing(v) => std::mem::replace(&mut self.facing, v) != v,
            Parameter::SessionType(v) => std::mem::replace(&mut self.session_type, v) != v,
            Parameter::Zoom(v) => std::mem::replace(&mut self.zoom, v) != v,
            Parameter::ExposureCorrection(v) => {
                std::mem::replace(&mut self.exposure_correction, v) != v
            }
            Parameter::Flash(v) => std::mem::replace(&mut self.flash, v) != v,
            Parameter::WhiteBalance(v) => std::mem::replace(&mut self.white_balance, v) != v,
            Parameter::Hdr(v) => std::mem::replace(&mut self.hdr, v) != v,
            Parameter::Audio(v) => std::mem::replace(&mut self.audio, v) != v,
            Parameter::VideoQuality(v) => std::mem::replace(&mut self.video_quality, v) != v,
        }
    }

    /// The stored value of the same setting as `like`.
    pub fn current(&self, like: Parameter) -> Parameter {
        match like {
            Parameter::Facing(_) => Parameter::Facing(self.facing),
            Parameter::SessionType(_) => Parameter::SessionType(self.session_type),
            Parameter::Zoom(_) => Parameter::Zoom(self.zoom),
            Parameter::ExposureCorrection(_) => {
                Parameter::ExposureCorrection(self.exposure_correction)
            }
            Parameter::Flash(_) => Parameter::Flash(self.flash),
            Parameter::WhiteBalance(_) => Parameter::WhiteBalance(self.white_balance),
            Parameter::Hdr(_) => Parameter::Hdr(self.hdr),
            Parameter::Audio(_) => Parameter::Audio(self.audio),
            Parameter::VideoQuality(_) => Parameter::VideoQuality(self.video_quality),
        }
    }

    /// Settings a live device accepts without a restart, in application order.
    pub fn in_place(&self) -> [Parameter; 7] {
        [
            Parameter::Zoom(self.zoom),
            Parameter::ExposureCorrection(self.exposure_correction),
            Parameter::Flash(self.flash),
            Parameter::WhiteBalance(self.white_balance),
            Parameter::Hdr(self.hdr),
            Parameter::Audio(self.audio),
            Parameter::VideoQuality(self.video_quality),
        ]
    }
}
