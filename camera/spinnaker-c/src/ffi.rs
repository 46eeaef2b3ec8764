//! Function table of the Spinnaker C library.
//!
//! Only the functions used by this crate are resolved. All take opaque
//! handles and return a `spinError` code.
#![allow(non_camel_case_types, non_snake_case)]

use std::os::raw::{c_char, c_void};

pub type spinError = i32;
pub type bool8_t = u8;
pub type spinSystem = *mut c_void;
pub type spinCameraList = *mut c_void;
pub type spinCamera = *mut c_void;
pub type spinNodeMapHandle = *mut c_void;
pub type spinNodeHandle = *mut c_void;
pub type spinImage = *mut c_void;
pub type spinImageStatus = i32;

pub const FALSE: bool8_t = 0;
pub const TRUE: bool8_t = 1;

macro_rules! spinnaker_fns {
    ($($name:ident ( $($arg:ty),* );)*) => {
        pub(crate) struct SpinnakerC {
            $(pub(crate) $name: unsafe extern "C" fn($($arg),*) -> spinError,)*
        }

        impl SpinnakerC {
            /// Resolve all symbols from `lib`.
            ///
            /// # Safety
            ///
            /// `lib` must be the Spinnaker C library so that the symbols have
            /// the declared signatures. The returned table must not outlive
            /// `lib`.
            pub(crate) unsafe fn load(lib: &libloading::Library) -> Result<Self, libloading::Error> {
                Ok(Self {
                    $($name: unsafe {
                        *lib.get::<unsafe extern "C" fn($($arg),*) -> spinError>(
                            concat!(stringify!($name), "\0").as_bytes(),
                        )?
                    },)*
                })
            }
        }
    };
}

spinnaker_fns! {
    spinErrorGetLastMessage(*mut c_char, *mut usize);

    spinSystemGetInstance(*mut spinSystem);
    spinSystemReleaseInstance(spinSystem);
    spinSystemGetCameras(spinSystem, spinCameraList);

    spinCameraListCreateEmpty(*mut spinCameraList);
    spinCameraListClear(spinCameraList);
    spinCameraListDestroy(spinCameraList);
    spinCameraListGetSize(spinCameraList, *mut usize);
    spinCameraListGet(spinCameraList, usize, *mut spinCamera);
    spinCameraListGetBySerial(spinCameraList, *const c_char, *mut spinCamera);

    spinCameraInit(spinCamera);
    spinCameraDeInit(spinCamera);
    spinCameraRelease(spinCamera);
    spinCameraGetNodeMap(spinCamera, *mut spinNodeMapHandle);
    spinCameraGetTLDeviceNodeMap(spinCamera, *mut spinNodeMapHandle);
    spinCameraBeginAcquisition(spinCamera);
    spinCameraEndAcquisition(spinCamera);
    spinCameraGetNextImageEx(spinCamera, u64, *mut spinImage);

    spinNodeMapGetNode(spinNodeMapHandle, *const c_char, *mut spinNodeHandle);
    spinNodeIsAvailable(spinNodeHandle, *mut bool8_t);
    spinNodeIsReadable(spinNodeHandle, *mut bool8_t);
    spinNodeIsWritable(spinNodeHandle, *mut bool8_t);
    spinNodeGetName(spinNodeHandle, *mut c_char, *mut usize);
    spinNodeToString(spinNodeHandle, *mut c_char, *mut usize);

    spinIntegerGetValue(spinNodeHandle, *mut i64);
    spinIntegerSetValue(spinNodeHandle, i64);
    spinIntegerGetMin(spinNodeHandle, *mut i64);
    spinIntegerGetMax(spinNodeHandle, *mut i64);
    spinIntegerGetInc(spinNodeHandle, *mut i64);
    spinFloatGetValue(spinNodeHandle, *mut f64);
    spinFloatSetValue(spinNodeHandle, f64);
    spinBooleanGetValue(spinNodeHandle, *mut bool8_t);
    spinBooleanSetValue(spinNodeHandle, bool8_t);
    spinCommandExecute(spinNodeHandle);

    spinEnumerationGetNumEntries(spinNodeHandle, *mut usize);
    spinEnumerationGetEntryByIndex(spinNodeHandle, usize, *mut spinNodeHandle);
    spinEnumerationGetEntryByName(spinNodeHandle, *const c_char, *mut spinNodeHandle);
    spinEnumerationGetCurrentEntry(spinNodeHandle, *mut spinNodeHandle);
    spinEnumerationSetIntValue(spinNodeHandle, i64);
    spinEnumerationEntryGetIntValue(spinNodeHandle, *mut i64);
    spinEnumerationEntryGetSymbolic(spinNodeHandle, *mut c_char, *mut usize);
    spinEnumerationReleaseNode(spinNodeHandle, spinNodeHandle);

    spinCategoryGetNumFeatures(spinNodeHandle, *mut usize);
    spinCategoryGetFeatureByIndex(spinNodeHandle, usize, *mut spinNodeHandle);

    spinImageIsIncomplete(spinImage, *mut bool8_t);
    spinImageGetStatus(spinImage, *mut spinImageStatus);
    spinImageGetWidth(spinImage, *mut usize);
    spinImageGetHeight(spinImage, *mut usize);
    spinImageGetStride(spinImage, *mut usize);
    spinImageGetPixelFormatName(spinImage, *mut c_char, *mut usize);
    spinImageGetBufferSize(spinImage, *mut usize);
    spinImageGetData(spinImage, *mut *mut c_void);
    spinImageChunkDataGetIntValue(spinImage, *const c_char, *mut i64);
    spinImageRelease(spinImage);
}
