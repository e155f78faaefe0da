//! Kernel <-> vendor value mapping
//!
//! Lossy where the vendor has no equivalent: several kernel values collapse
//! onto one vendor value.

use crate::vendor::{VendorCameraMode, VendorPhotoMode};
use parrot_shared::{CameraMode, CameraPhotoMode};

/// Convert a kernel value into the vendor's equivalent
pub trait ToVendor {
    type Vendor;

    fn to_vendor(&self) -> Self::Vendor;
}

/// Convert a vendor value into the kernel's equivalent
pub trait ToKernel {
    type Kernel;

    fn to_kernel(&self) -> Self::Kernel;
}

impl ToVendor for CameraMode {
    type Vendor = VendorCameraMode;

    fn to_vendor(&self) -> VendorCameraMode {
        match self {
            CameraMode::Video => VendorCameraMode::Recording,
            CameraMode::Photo
            | CameraMode::Playback
            | CameraMode::Download
            | CameraMode::Broadcast
            | CameraMode::Unknown => VendorCameraMode::Photo,
        }
    }
}

impl ToKernel for VendorCameraMode {
    type Kernel = CameraMode;

    fn to_kernel(&self) -> CameraMode {
        match self {
            VendorCameraMode::Recording => CameraMode::Video,
            VendorCameraMode::Photo => CameraMode::Photo,
        }
    }
}

impl ToVendor for CameraPhotoMode {
    type Vendor = VendorPhotoMode;

    fn to_vendor(&self) -> VendorPhotoMode {
        use CameraPhotoMode::*;

        match self {
            Burst | RawBurst => VendorPhotoMode::Burst,
            Aeb => VendorPhotoMode::Bracketing,
            Interval | TimeLapse => VendorPhotoMode::TimeLapse,
            Single | Hdr | ShallowFocus | Panorama | Ehdr | HyperLight | HighResolution
            | Smart | HyperLapse | SuperResolution | Unknown => VendorPhotoMode::Single,
        }
    }
}

impl ToKernel for VendorPhotoMode {
    type Kernel = CameraPhotoMode;

    fn to_kernel(&self) -> CameraPhotoMode {
        match self {
            VendorPhotoMode::Single => CameraPhotoMode::Single,
            VendorPhotoMode::Bracketing => CameraPhotoMode::Aeb,
            VendorPhotoMode::Burst => CameraPhotoMode::Burst,
            VendorPhotoMode::TimeLapse => CameraPhotoMode::Interval,
            VendorPhotoMode::GpsLapse => CameraPhotoMode::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_mode_mapping() {
        assert_eq!(CameraMode::Video.to_vendor(), VendorCameraMode::Recording);
        assert_eq!(CameraMode::Playback.to_vendor(), VendorCameraMode::Photo);
        assert_eq!(VendorCameraMode::Recording.to_kernel(), CameraMode::Video);
    }

    #[test]
    fn test_photo_mode_collapses() {
        assert_eq!(CameraPhotoMode::Hdr.to_vendor(), VendorPhotoMode::Single);
        assert_eq!(CameraPhotoMode::TimeLapse.to_vendor(), VendorPhotoMode::TimeLapse);
        assert_eq!(CameraPhotoMode::RawBurst.to_vendor(), VendorPhotoMode::Burst);
        assert_eq!(VendorPhotoMode::GpsLapse.to_kernel(), CameraPhotoMode::Unknown);
    }
}
