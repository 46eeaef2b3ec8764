//! Safe wrappers around the FLIR Spinnaker C API.
//!
//! The library is loaded at runtime, so building does not require the SDK.
//! Handles are released in reverse order of acquisition: an [Image] borrows
//! its [Camera], and cameras and camera lists keep the [System] alive.

use std::{
    ffi::CString,
    marker::PhantomData,
    os::raw::c_char,
    path::{Path, PathBuf},
    sync::Arc,
};

mod ffi;
pub mod gentl;

use ffi::{FALSE, SpinnakerC, TRUE, bool8_t, spinError};

pub use gentl::{GENTL_ENV_VAR, check_gentl_producer};

/// Environment variable to override the path of the Spinnaker C library.
pub const LIBRARY_ENV_VAR: &str = "SPINNAKER_C_LIBRARY";

#[cfg(target_os = "windows")]
const DEFAULT_LIBRARY: &str = "SpinnakerC_v140.dll";
#[cfg(target_os = "macos")]
const DEFAULT_LIBRARY: &str = "libSpinnaker_C.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_LIBRARY: &str = "libSpinnaker_C.so";

pub const SPINNAKER_ERR_SUCCESS: i32 = 0;
pub const SPINNAKER_ERR_TIMEOUT: i32 = -1011;

const STRING_BUF_LEN: usize = 1024;

fn err_str(code: i32) -> &'static str {
    match code {
        0 => "SPINNAKER_ERR_SUCCESS",
        -1001 => "SPINNAKER_ERR_ERROR",
        -1002 => "SPINNAKER_ERR_NOT_INITIALIZED",
        -1003 => "SPINNAKER_ERR_NOT_IMPLEMENTED",
        -1004 => "SPINNAKER_ERR_RESOURCE_IN_USE",
        -1005 => "SPINNAKER_ERR_ACCESS_DENIED",
        -1006 => "SPINNAKER_ERR_INVALID_HANDLE",
        -1007 => "SPINNAKER_ERR_INVALID_ID",
        -1008 => "SPINNAKER_ERR_NO_DATA",
        -1009 => "SPINNAKER_ERR_INVALID_PARAMETER",
        -1010 => "SPINNAKER_ERR_IO",
        -1011 => "SPINNAKER_ERR_TIMEOUT",
        -1012 => "SPINNAKER_ERR_ABORT",
        -1013 => "SPINNAKER_ERR_INVALID_BUFFER",
        -1014 => "SPINNAKER_ERR_NOT_AVAILABLE",
        -1015 => "SPINNAKER_ERR_INVALID_ADDRESS",
        -1016 => "SPINNAKER_ERR_BUFFER_TOO_SMALL",
        -1017 => "SPINNAKER_ERR_INVALID_INDEX",
        -1018 => "SPINNAKER_ERR_PARSING_CHUNK_DATA",
        -1019 => "SPINNAKER_ERR_INVALID_VALUE",
        -1020 => "SPINNAKER_ERR_RESOURCE_EXHAUSTED",
        -1021 => "SPINNAKER_ERR_OUT_OF_MEMORY",
        -1022 => "SPINNAKER_ERR_BUSY",
        -2001 => "GENICAM_ERR_INVALID_ARGUMENT",
        -2002 => "GENICAM_ERR_OUT_OF_RANGE",
        -2003 => "GENICAM_ERR_PROPERTY",
        -2004 => "GENICAM_ERR_RUN_TIME",
        -2005 => "GENICAM_ERR_LOGICAL",
        -2006 => "GENICAM_ERR_ACCESS",
        -2007 => "GENICAM_ERR_TIMEOUT",
        -2008 => "GENICAM_ERR_DYNAMIC_CAST",
        -2009 => "GENICAM_ERR_GENERIC",
        -2010 => "GENICAM_ERR_BAD_ALLOCATION",
        _ => "unknown error",
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Loading library at {path}")]
    LibLoading {
        source: libloading::Error,
        path: PathBuf,
    },
    #[error("Spinnaker error {code} ({name}): {msg}")]
    Spinnaker {
        code: i32,
        name: &'static str,
        msg: String,
    },
    #[error("node \"{name}\" not available")]
    NodeNotAvailable { name: String },
    #[error("node \"{name}\" not readable")]
    NodeNotReadable { name: String },
    #[error("node \"{name}\" not writable")]
    NodeNotWritable { name: String },
    #[error(
        "GenTL producer not found ({}). Please verify that the environment variable {var} \
         names the FLIR GenTL producer (.cti file) installed with the Spinnaker SDK.",
        describe_gentl_path(.path)
    )]
    GenTlProducer { var: String, path: Option<PathBuf> },
    #[error("{source}")]
    NulError {
        #[from]
        source: std::ffi::NulError,
    },
    #[error("{source}")]
    Utf8Error {
        #[from]
        source: std::string::FromUtf8Error,
    },
}

fn describe_gentl_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!("\"{}\" does not exist", p.display()),
        None => "variable not set".to_string(),
    }
}

impl Error {
    /// True if no image arrived within the grab timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Spinnaker { code, .. } if *code == SPINNAKER_ERR_TIMEOUT)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

macro_rules! spin_call {
    ($lib:expr, $func:ident ( $($arg:expr),* )) => {{
        tracing::trace!("calling: {} {}:{}", stringify!($func), file!(), line!());
        let errcode: spinError = unsafe { ($lib.fns.$func)($($arg),*) };
        $lib.check(errcode)
    }};
}

/// The loaded Spinnaker C library.
pub struct SpinnakerLibrary {
    fns: SpinnakerC,
    // Keep the library loaded as long as `fns` is used.
    _lib: libloading::Library,
}

impl SpinnakerLibrary {
    /// Load from [LIBRARY_ENV_VAR] if set, else from the platform default name.
    pub fn new() -> Result<Arc<Self>> {
        let path = std::env::var_os(LIBRARY_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBRARY));
        Self::from_dynamic_lib_path(path)
    }

    pub fn from_dynamic_lib_path<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let to_err = |source| Error::LibLoading {
            source,
            path: path.as_ref().to_path_buf(),
        };
        tracing::debug!("loading {}", path.as_ref().display());
        let lib = unsafe { libloading::Library::new(path.as_ref()) }.map_err(to_err)?;
        let fns = unsafe { SpinnakerC::load(&lib) }.map_err(to_err)?;
        Ok(Arc::new(Self { fns, _lib: lib }))
    }

    fn check(&self, code: spinError) -> Result<()> {
        if code == SPINNAKER_ERR_SUCCESS {
            return Ok(());
        }
        let msg = if code == SPINNAKER_ERR_TIMEOUT {
            String::new()
        } else {
            self.last_error_message()
        };
        Err(Error::Spinnaker {
            code,
            name: err_str(code),
            msg,
        })
    }

    fn last_error_message(&self) -> String {
        let mut buf = [0 as c_char; STRING_BUF_LEN];
        let mut len = STRING_BUF_LEN;
        let code = unsafe { (self.fns.spinErrorGetLastMessage)(buf.as_mut_ptr(), &mut len) };
        if code != SPINNAKER_ERR_SUCCESS {
            return String::new();
        }
        buf_to_string(&buf, len).unwrap_or_default()
    }

    fn read_string<H: Copy>(
        &self,
        handle: H,
        getter: unsafe extern "C" fn(H, *mut c_char, *mut usize) -> spinError,
    ) -> Result<String> {
        let mut buf = [0 as c_char; STRING_BUF_LEN];
        let mut len = STRING_BUF_LEN;
        self.check(unsafe { getter(handle, buf.as_mut_ptr(), &mut len) })?;
        buf_to_string(&buf, len)
    }

    fn read_value<H: Copy, V: Default>(
        &self,
        handle: H,
        getter: unsafe extern "C" fn(H, *mut V) -> spinError,
    ) -> Result<V> {
        let mut value = V::default();
        self.check(unsafe { getter(handle, &mut value) })?;
        Ok(value)
    }

    fn read_bool<H: Copy>(
        &self,
        handle: H,
        getter: unsafe extern "C" fn(H, *mut bool8_t) -> spinError,
    ) -> Result<bool> {
        Ok(self.read_value(handle, getter)? != FALSE)
    }
}

/// `len` includes the terminating nul.
fn buf_to_string(buf: &[c_char], len: usize) -> Result<String> {
    let len = len.min(buf.len());
    let bytes: Vec<u8> = buf[..len]
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    Ok(String::from_utf8(bytes)?)
}

// ---------------------------
// System

/// The Spinnaker system singleton.
pub struct System {
    lib: Arc<SpinnakerLibrary>,
    handle: ffi::spinSystem,
}

// The Spinnaker system handle may be used from any thread.
unsafe impl Send for System {}
unsafe impl Sync for System {}

impl System {
    pub fn new(lib: Arc<SpinnakerLibrary>) -> Result<Arc<Self>> {
        let mut handle = std::ptr::null_mut();
        spin_call!(lib, spinSystemGetInstance(&mut handle))?;
        Ok(Arc::new(Self { lib, handle }))
    }

    /// Enumerate the currently connected cameras.
    pub fn cameras(self: &Arc<Self>) -> Result<CameraList> {
        let mut handle = std::ptr::null_mut();
        spin_call!(self.lib, spinCameraListCreateEmpty(&mut handle))?;
        let list = CameraList {
            system: self.clone(),
            handle,
        };
        spin_call!(self.lib, spinSystemGetCameras(self.handle, list.handle))?;
        Ok(list)
    }
}

impl Drop for System {
    fn drop(&mut self) {
        if let Err(e) = spin_call!(self.lib, spinSystemReleaseInstance(self.handle)) {
            tracing::error!("releasing Spinnaker system: {e}");
        }
    }
}

// ---------------------------
// CameraList

pub struct CameraList {
    system: Arc<System>,
    handle: ffi::spinCameraList,
}

impl CameraList {
    pub fn len(&self) -> Result<usize> {
        self.system
            .lib
            .read_value(self.handle, self.system.lib.fns.spinCameraListGetSize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, index: usize) -> Result<Camera> {
        let mut handle = std::ptr::null_mut();
        spin_call!(self.system.lib, spinCameraListGet(self.handle, index, &mut handle))?;
        Ok(Camera::new(self.system.clone(), handle))
    }

    pub fn get_by_serial(&self, serial: &str) -> Result<Camera> {
        let serial = CString::new(serial)?;
        let mut handle = std::ptr::null_mut();
        spin_call!(
            self.system.lib,
            spinCameraListGetBySerial(self.handle, serial.as_ptr(), &mut handle)
        )?;
        if handle.is_null() {
            return Err(Error::NodeNotAvailable {
                name: format!("camera {}", serial.to_string_lossy()),
            });
        }
        Ok(Camera::new(self.system.clone(), handle))
    }
}

impl Drop for CameraList {
    fn drop(&mut self) {
        let lib = &self.system.lib;
        if let Err(e) = spin_call!(lib, spinCameraListClear(self.handle)) {
            tracing::error!("clearing camera list: {e}");
        }
        if let Err(e) = spin_call!(lib, spinCameraListDestroy(self.handle)) {
            tracing::error!("destroying camera list: {e}");
        }
    }
}

// ---------------------------
// Camera

pub struct Camera {
    system: Arc<System>,
    handle: ffi::spinCamera,
    initialized: bool,
    streaming: bool,
}

unsafe impl Send for Camera {}

impl Camera {
    fn new(system: Arc<System>, handle: ffi::spinCamera) -> Self {
        Self {
            system,
            handle,
            initialized: false,
            streaming: false,
        }
    }

    fn lib(&self) -> &SpinnakerLibrary {
        &self.system.lib
    }

    /// Connect to the device. Required before using [Camera::node_map].
    pub fn init(&mut self) -> Result<()> {
        if !self.initialized {
            spin_call!(self.lib(), spinCameraInit(self.handle))?;
            self.initialized = true;
        }
        Ok(())
    }

    pub fn deinit(&mut self) -> Result<()> {
        if self.initialized {
            self.end_acquisition()?;
            spin_call!(self.lib(), spinCameraDeInit(self.handle))?;
            self.initialized = false;
        }
        Ok(())
    }

    /// The GenICam node map of the device.
    pub fn node_map(&self) -> Result<NodeMap<'_>> {
        let mut handle = std::ptr::null_mut();
        spin_call!(self.lib(), spinCameraGetNodeMap(self.handle, &mut handle))?;
        Ok(NodeMap::new(self.lib(), handle))
    }

    /// The transport layer device node map. Available without [Camera::init].
    pub fn tl_device_node_map(&self) -> Result<NodeMap<'_>> {
        let mut handle = std::ptr::null_mut();
        spin_call!(self.lib(), spinCameraGetTLDeviceNodeMap(self.handle, &mut handle))?;
        Ok(NodeMap::new(self.lib(), handle))
    }

    pub fn begin_acquisition(&mut self) -> Result<()> {
        if !self.streaming {
            spin_call!(self.lib(), spinCameraBeginAcquisition(self.handle))?;
            self.streaming = true;
        }
        Ok(())
    }

    pub fn end_acquisition(&mut self) -> Result<()> {
        if self.streaming {
            spin_call!(self.lib(), spinCameraEndAcquisition(self.handle))?;
            self.streaming = false;
        }
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Wait up to `timeout_ms` for the next image. Check
    /// [Error::is_timeout] to distinguish a timeout from a failure.
    pub fn next_image(&self, timeout_ms: u64) -> Result<Image<'_>> {
        let mut handle = std::ptr::null_mut();
        spin_call!(
            self.lib(),
            spinCameraGetNextImageEx(self.handle, timeout_ms, &mut handle)
        )?;
        Ok(Image { cam: self, handle })
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(e) = self.deinit() {
            tracing::error!("deinitializing camera: {e}");
        }
        if let Err(e) = spin_call!(self.lib(), spinCameraRelease(self.handle)) {
            tracing::error!("releasing camera: {e}");
        }
    }
}

// ---------------------------
// NodeMap and Node

pub struct NodeMap<'cam> {
    lib: &'cam SpinnakerLibrary,
    handle: ffi::spinNodeMapHandle,
}

impl<'cam> NodeMap<'cam> {
    fn new(lib: &'cam SpinnakerLibrary, handle: ffi::spinNodeMapHandle) -> Self {
        Self { lib, handle }
    }

    /// Look up a node, failing with [Error::NodeNotAvailable] if it does not
    /// exist or is currently unavailable.
    pub fn node(&self, name: &str) -> Result<Node<'cam>> {
        let c_name = CString::new(name)?;
        let mut handle = std::ptr::null_mut();
        let found = spin_call!(
            self.lib,
            spinNodeMapGetNode(self.handle, c_name.as_ptr(), &mut handle)
        );
        let not_available = || Error::NodeNotAvailable {
            name: name.to_string(),
        };
        if found.is_err() || handle.is_null() {
            return Err(not_available());
        }
        let node = Node {
            lib: self.lib,
            handle,
            name: name.to_string(),
            _cam: PhantomData,
        };
        if !node.is_available()? {
            return Err(not_available());
        }
        Ok(node)
    }
}

pub struct Node<'cam> {
    lib: &'cam SpinnakerLibrary,
    handle: ffi::spinNodeHandle,
    name: String,
    _cam: PhantomData<&'cam Camera>,
}

impl<'cam> Node<'cam> {
    fn child(&self, handle: ffi::spinNodeHandle) -> Result<Node<'cam>> {
        let name = self.lib.read_string(handle, self.lib.fns.spinNodeGetName)?;
        Ok(Node {
            lib: self.lib,
            handle,
            name,
            _cam: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_available(&self) -> Result<bool> {
        self.lib.read_bool(self.handle, self.lib.fns.spinNodeIsAvailable)
    }

    pub fn is_readable(&self) -> Result<bool> {
        self.lib.read_bool(self.handle, self.lib.fns.spinNodeIsReadable)
    }

    pub fn is_writable(&self) -> Result<bool> {
        self.lib.read_bool(self.handle, self.lib.fns.spinNodeIsWritable)
    }

    fn ensure_readable(&self) -> Result<()> {
        if self.is_readable()? {
            Ok(())
        } else {
            Err(Error::NodeNotReadable {
                name: self.name.clone(),
            })
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.is_writable()? {
            Ok(())
        } else {
            Err(Error::NodeNotWritable {
                name: self.name.clone(),
            })
        }
    }

    /// The value of any node type, formatted by the SDK.
    pub fn value_string(&self) -> Result<String> {
        self.ensure_readable()?;
        self.lib.read_string(self.handle, self.lib.fns.spinNodeToString)
    }

    pub fn int_value(&self) -> Result<i64> {
        self.ensure_readable()?;
        self.lib.read_value(self.handle, self.lib.fns.spinIntegerGetValue)
    }

    pub fn set_int_value(&self, value: i64) -> Result<()> {
        self.ensure_writable()?;
        spin_call!(self.lib, spinIntegerSetValue(self.handle, value))
    }

    pub fn int_min(&self) -> Result<i64> {
        self.lib.read_value(self.handle, self.lib.fns.spinIntegerGetMin)
    }

    pub fn int_max(&self) -> Result<i64> {
        self.lib.read_value(self.handle, self.lib.fns.spinIntegerGetMax)
    }

    pub fn int_inc(&self) -> Result<i64> {
        self.lib.read_value(self.handle, self.lib.fns.spinIntegerGetInc)
    }

    pub fn float_value(&self) -> Result<f64> {
        self.ensure_readable()?;
        self.lib.read_value(self.handle, self.lib.fns.spinFloatGetValue)
    }

    pub fn set_float_value(&self, value: f64) -> Result<()> {
        self.ensure_writable()?;
        spin_call!(self.lib, spinFloatSetValue(self.handle, value))
    }

    pub fn bool_value(&self) -> Result<bool> {
        self.ensure_readable()?;
        self.lib.read_bool(self.handle, self.lib.fns.spinBooleanGetValue)
    }

    pub fn set_bool_value(&self, value: bool) -> Result<()> {
        self.ensure_writable()?;
        let value = if value { TRUE } else { FALSE };
        spin_call!(self.lib, spinBooleanSetValue(self.handle, value))
    }

    pub fn execute(&self) -> Result<()> {
        self.ensure_writable()?;
        spin_call!(self.lib, spinCommandExecute(self.handle))
    }

    /// Symbolic name of the current entry of an enumeration node.
    pub fn enum_value(&self) -> Result<String> {
        self.ensure_readable()?;
        let mut entry = std::ptr::null_mut();
        spin_call!(self.lib, spinEnumerationGetCurrentEntry(self.handle, &mut entry))?;
        let symbolic = self
            .lib
            .read_string(entry, self.lib.fns.spinEnumerationEntryGetSymbolic);
        spin_call!(self.lib, spinEnumerationReleaseNode(self.handle, entry))?;
        symbolic
    }

    /// Select the enumeration entry with the given symbolic name.
    pub fn set_enum_value(&self, symbolic: &str) -> Result<()> {
        self.ensure_writable()?;
        let c_symbolic = CString::new(symbolic)?;
        let mut entry = std::ptr::null_mut();
        spin_call!(
            self.lib,
            spinEnumerationGetEntryByName(self.handle, c_symbolic.as_ptr(), &mut entry)
        )?;
        if entry.is_null() {
            return Err(Error::NodeNotAvailable {
                name: format!("{}::{symbolic}", self.name),
            });
        }
        let value = self
            .lib
            .read_value(entry, self.lib.fns.spinEnumerationEntryGetIntValue);
        spin_call!(self.lib, spinEnumerationReleaseNode(self.handle, entry))?;
        spin_call!(self.lib, spinEnumerationSetIntValue(self.handle, value?))
    }

    /// Symbolic names of the available and readable enumeration entries.
    pub fn enum_entries(&self) -> Result<Vec<String>> {
        let n = self
            .lib
            .read_value(self.handle, self.lib.fns.spinEnumerationGetNumEntries)?;
        let mut entries = Vec::with_capacity(n);
        for i in 0..n {
            let mut entry = std::ptr::null_mut();
            spin_call!(
                self.lib,
                spinEnumerationGetEntryByIndex(self.handle, i, &mut entry)
            )?;
            let symbolic = self.entry_symbolic_if_usable(entry);
            spin_call!(self.lib, spinEnumerationReleaseNode(self.handle, entry))?;
            if let Some(symbolic) = symbolic? {
                entries.push(symbolic);
            }
        }
        Ok(entries)
    }

    fn entry_symbolic_if_usable(&self, entry: ffi::spinNodeHandle) -> Result<Option<String>> {
        let lib = self.lib;
        if !lib.read_bool(entry, lib.fns.spinNodeIsAvailable)?
            || !lib.read_bool(entry, lib.fns.spinNodeIsReadable)?
        {
            return Ok(None);
        }
        Ok(Some(
            lib.read_string(entry, lib.fns.spinEnumerationEntryGetSymbolic)?,
        ))
    }

    /// The feature nodes of a category node.
    pub fn category_features(&self) -> Result<Vec<Node<'cam>>> {
        self.ensure_readable()?;
        let n = self
            .lib
            .read_value(self.handle, self.lib.fns.spinCategoryGetNumFeatures)?;
        let mut features = Vec::with_capacity(n);
        for i in 0..n {
            let mut handle = std::ptr::null_mut();
            spin_call!(
                self.lib,
                spinCategoryGetFeatureByIndex(self.handle, i, &mut handle)
            )?;
            features.push(self.child(handle)?);
        }
        Ok(features)
    }
}

// ---------------------------
// Image

/// An image owned by the acquisition engine. Released on drop.
pub struct Image<'cam> {
    cam: &'cam Camera,
    handle: ffi::spinImage,
}

impl Image<'_> {
    fn lib(&self) -> &SpinnakerLibrary {
        self.cam.lib()
    }

    pub fn is_incomplete(&self) -> Result<bool> {
        self.lib()
            .read_bool(self.handle, self.lib().fns.spinImageIsIncomplete)
    }

    /// Image status code (nonzero for incomplete images).
    pub fn status(&self) -> Result<i32> {
        self.lib()
            .read_value(self.handle, self.lib().fns.spinImageGetStatus)
    }

    pub fn width(&self) -> Result<usize> {
        self.lib()
            .read_value(self.handle, self.lib().fns.spinImageGetWidth)
    }

    pub fn height(&self) -> Result<usize> {
        self.lib()
            .read_value(self.handle, self.lib().fns.spinImageGetHeight)
    }

    pub fn stride(&self) -> Result<usize> {
        self.lib()
            .read_value(self.handle, self.lib().fns.spinImageGetStride)
    }

    /// GenICam name of the pixel format, e.g. `Mono8`.
    pub fn pixel_format_name(&self) -> Result<String> {
        self.lib()
            .read_string(self.handle, self.lib().fns.spinImageGetPixelFormatName)
    }

    /// The image buffer. Valid until the image is dropped.
    pub fn data(&self) -> Result<&[u8]> {
        let size = self
            .lib()
            .read_value(self.handle, self.lib().fns.spinImageGetBufferSize)?;
        let mut ptr = std::ptr::null_mut();
        spin_call!(self.lib(), spinImageGetData(self.handle, &mut ptr))?;
        if ptr.is_null() || size == 0 {
            return Ok(&[]);
        }
        Ok(unsafe { std::slice::from_raw_parts(ptr as *const u8, size) })
    }

    /// Read an integer chunk value such as `ChunkFrameID`.
    pub fn chunk_int(&self, name: &str) -> Result<i64> {
        let c_name = CString::new(name)?;
        let mut value = 0;
        spin_call!(
            self.lib(),
            spinImageChunkDataGetIntValue(self.handle, c_name.as_ptr(), &mut value)
        )?;
        Ok(value)
    }
}

impl Drop for Image<'_> {
    fn drop(&mut self) {
        if let Err(e) = spin_call!(self.lib(), spinImageRelease(self.handle)) {
            tracing::error!("releasing image: {e}");
        }
    }
}
