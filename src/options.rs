//! Capability snapshot of an open camera device.
//!
//! Drivers report what the hardware can do as a raw [`DeviceCapabilities`]
//! value right after a successful open. The controller turns it into an
//! immutable [`CameraOptions`] that lives exactly as long as the device stays
//! open; every re-open builds a fresh one.

use crate::types::{Facing, Flash, Hdr, Parameter, WhiteBalance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Raw capability data as reported by a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Lens directions present on this device
    pub facings: Vec<Facing>,
    pub flash_modes: Vec<Flash>,
    pub white_balances: Vec<WhiteBalance>,
    pub hdr_modes: Vec<Hdr>,
    /// Largest optical/digital zoom ratio; 1.0 means no zoom
    pub max_zoom_ratio: f32,
    /// Exposure compensation range expressed in driver steps
    pub min_exposure_index: i32,
    pub max_exposure_index: i32,
    /// EV per exposure step
    pub exposure_step: f32,
    pub auto_focus: bool,
    pub video_snapshot: bool,
    /// Field of view in degrees
    pub horizontal_view_angle: f32,
    pub vertical_view_angle: f32,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            facings: vec![Facing::Back],
            flash_modes: Vec::new(),
            white_balances: vec![WhiteBalance::Auto],
            hdr_modes: vec![Hdr::Off],
            max_zoom_ratio: 1.0,
            min_exposure_index: 0,
            max_exposure_index: 0,
            exposure_step: 0.0,
            auto_focus: false,
            video_snapshot: false,
            horizontal_view_angle: 60.0,
            vertical_view_angle: 45.0,
        }
    }
}

/// Immutable description of what the currently open device supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraOptions {
    supported_facing: BTreeSet<Facing>,
    supported_flash: BTreeSet<Flash>,
    supported_white_balance: BTreeSet<WhiteBalance>,
    supported_hdr: BTreeSet<Hdr>,
    zoom_supported: bool,
    exposure_correction_supported: bool,
    exposure_correction_min: f32,
    exposure_correction_max: f32,
    auto_focus_supported: bool,
    video_snapshot_supported: bool,
}

impl CameraOptions {
    pub fn from_capabilities(caps: &DeviceCapabilities) -> Self {
        let zoom_supported = caps.max_zoom_ratio.is_finite() && caps.max_zoom_ratio > 1.0;

        let (min_index, max_index) = if caps.min_exposure_index <= caps.max_exposure_index {
            (caps.min_exposure_index, caps.max_exposure_index)
        } else {
            (caps.max_exposure_index, caps.min_exposure_index)
        };
        let exposure_correction_supported = caps.exposure_step.is_finite()
            && caps.exposure_step > 0.0
            && (min_index != 0 || max_index != 0);
        let (exposure_correction_min, exposure_correction_max) = if exposure_correction_supported {
            (
                min_index as f32 * caps.exposure_step,
                max_index as f32 * caps.exposure_step,
            )
        } else {
            (0.0, 0.0)
        };

        Self {
            supported_facing: caps.facings.iter().copied().collect(),
            supported_flash: caps.flash_modes.iter().copied().collect(),
            supported_white_balance: caps.white_balances.iter().copied().collect(),
            supported_hdr: caps.hdr_modes.iter().copied().collect(),
            zoom_supported,
            exposure_correction_supported,
            exposure_correction_min,
            exposure_correction_max,
            auto_focus_supported: caps.auto_focus,
            video_snapshot_supported: caps.video_snapshot,
        }
    }

    pub fn supported_facing(&self) -> &BTreeSet<Facing> {
        &self.supported_facing
    }

    pub fn supported_flash(&self) -> &BTreeSet<Flash> {
        &self.supported_flash
    }

    pub fn supported_white_balance(&self) -> &BTreeSet<WhiteBalance> {
        &self.supported_white_balance
    }

    pub fn supported_hdr(&self) -> &BTreeSet<Hdr> {
        &self.supported_hdr
    }

    pub fn supports_facing(&self, facing: Facing) -> bool {
        self.supported_facing.contains(&facing)
    }

    pub fn supports_flash(&self, flash: Flash) -> bool {
        self.supported_flash.contains(&flash)
    }

    pub fn supports_white_balance(&self, white_balance: WhiteBalance) -> bool {
        self.supported_white_balance.contains(&white_balance)
    }

    pub fn supports_hdr(&self, hdr: Hdr) -> bool {
        self.supported_hdr.contains(&hdr)
    }

    pub fn is_zoom_supported(&self) -> bool {
        self.zoom_supported
    }

    /// Normalized zoom range, present only when zoom is supported.
    pub fn zoom_range(&self) -> Option<RangeInclusive<f32>> {
        self.zoom_supported.then(|| 0.0..=1.0)
    }

    pub fn is_exposure_correction_supported(&self) -> bool {
        self.exposure_correction_supported
    }

    pub fn exposure_correction_min_value(&self) -> f32 {
        self.exposure_correction_min
    }

    pub fn exposure_correction_max_value(&self) -> f32 {
        self.exposure_correction_max
    }

    pub fn exposure_correction_range(&self) -> Option<RangeInclusive<f32>> {
        self.exposure_correction_supported
            .then(|| self.exposure_correction_min..=self.exposure_correction_max)
    }

    pub fn is_auto_focus_supported(&self) -> bool {
        self.auto_focus_supported
    }

    pub fn is_video_snapshot_supported(&self) -> bool {
        self.video_snapshot_supported
    }

    /// Filter a requested in-place value through this snapshot.
    ///
    /// Returns the value to apply, clamped into range for continuous
    /// parameters, or `None` when the device cannot honor it. Facing and
    /// session type are passed through: they are resolved by reopening.
    pub fn accept(&self, parameter: Parameter) -> Option<Parameter> {
        match parameter {
            Parameter::Zoom(v) => {
                let range = self.zoom_range()?;
                clamp(v, &range).map(Parameter::Zoom)
            }
            Parameter::ExposureCorrection(v) => {
                let range = self.exposure_correction_range()?;
                clamp(v, &range).map(Parameter::ExposureCorrection)
            }
            Parameter::Flash(v) => self.supports_flash(v).then_some(parameter),
            Parameter::WhiteBalance(v) => self.supports_white_balance(v).then_some(parameter),
            Parameter::Hdr(v) => self.supports_hdr(v).then_some(parameter),
            Parameter::Audio(_)
            | Parameter::VideoQuality(_)
            | Parameter::Facing(_)
            | Parameter::SessionType(_) => Some(parameter),
        }
    }
}

fn clamp(value: f32, range: &RangeInclusive<f32>) -> Option<f32> {
    if value.is_nan() {
        return None;
    }
    Some(value.clamp(*range.start(), *range.end()))
}

/// Physical properties of the open device that are not settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtraProperties {
    pub horizontal_view_angle: f32,
    pub vertical_view_angle: f32,
}

impl ExtraProperties {
    pub fn from_capabilities(caps: &DeviceCapabilities) -> Self {
        Self {
            horizontal_view_angle: caps.horizontal_view_angle,
            vertical_view_angle: caps.vertical_view_angle,
        }
    }
}
