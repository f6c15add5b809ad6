//! Dynamic library loading and symbol resolution
//!
//! Platform-agnostic wrapper around dlopen/LoadLibrary used by the class
//! registry to pull in classes published by shared libraries.

use core::ffi::c_void;
use core::ptr::NonNull;
use std::ffi::CString;
use std::path::{Path, PathBuf};

/// File extensions tried, in order, when resolving `library::Class`
#[cfg(target_os = "macos")]
pub const DLL_EXTENSIONS: &[&str] = &[".gam", ".drv", ".dylib", ".so"];

#[cfg(all(unix, not(target_os = "macos")))]
pub const DLL_EXTENSIONS: &[&str] = &[".gam", ".drv", ".so"];

#[cfg(windows)]
pub const DLL_EXTENSIONS: &[&str] = &[".gam", ".drv", ".dll"];

/// Symbol a library exports to register its classes once loaded
///
/// Signature: `extern "C" fn(database: *const c_void)`, where the argument
/// points at the `ClassRegistryDatabase` performing the load.
pub const REGISTER_SYMBOL: &str = "refcore_register_classes";

/// Handle to a dynamically loaded library
///
/// The library stays mapped until the handle is dropped.
pub struct LoadableLibrary {
    handle: NonNull<c_void>,
    path: PathBuf,
}

impl LoadableLibrary {
    /// Open the library at `path` (absolute, relative, or a bare name
    /// resolved by the platform loader)
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let handle = Self::open_impl(path)?;
        Ok(Self {
            handle,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn open_impl(path: &Path) -> Result<NonNull<c_void>, LoadError> {
        use std::os::unix::ffi::OsStrExt;

        let cname = CString::new(path.as_os_str().as_bytes()).map_err(|_| LoadError::InvalidName)?;

        unsafe {
            let handle = libc::dlopen(cname.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL);
            NonNull::new(handle).ok_or_else(|| LoadError::LoadFailed(last_dl_error()))
        }
    }

    #[cfg(windows)]
    fn open_impl(path: &Path) -> Result<NonNull<c_void>, LoadError> {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::errhandlingapi::GetLastError;
        use winapi::um::libloaderapi::LoadLibraryW;

        let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();

        unsafe {
            let handle = LoadLibraryW(wide.as_ptr());
            NonNull::new(handle as *mut c_void).ok_or_else(|| {
                let code = GetLastError();
                LoadError::LoadFailed(format!("Error code: {}", code))
            })
        }
    }

    /// Address of an exported symbol
    pub fn symbol(&self, name: &str) -> Result<NonNull<c_void>, SymbolError> {
        let cname = CString::new(name).map_err(|_| SymbolError::InvalidName)?;
        self.symbol_impl(&cname).ok_or(SymbolError::NotFound)
    }

    #[cfg(unix)]
    fn symbol_impl(&self, name: &CString) -> Option<NonNull<c_void>> {
        unsafe { NonNull::new(libc::dlsym(self.handle.as_ptr(), name.as_ptr())) }
    }

    #[cfg(windows)]
    fn symbol_impl(&self, name: &CString) -> Option<NonNull<c_void>> {
        use winapi::shared::minwindef::HMODULE;
        use winapi::um::libloaderapi::GetProcAddress;

        unsafe {
            let ptr = GetProcAddress(self.handle.as_ptr() as HMODULE, name.as_ptr());
            NonNull::new(ptr as *mut c_void)
        }
    }
}

#[cfg(unix)]
fn last_dl_error() -> String {
    unsafe {
        let err = libc::dlerror();
        if err.is_null() {
            "Unknown error".into()
        } else {
            std::ffi::CStr::from_ptr(err).to_string_lossy().into_owned()
        }
    }
}

impl Drop for LoadableLibrary {
    #[cfg(unix)]
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle.as_ptr());
        }
    }

    #[cfg(windows)]
    fn drop(&mut self) {
        use winapi::shared::minwindef::HMODULE;
        use winapi::um::libloaderapi::FreeLibrary;

        unsafe {
            FreeLibrary(self.handle.as_ptr() as HMODULE);
        }
    }
}

impl core::fmt::Debug for LoadableLibrary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoadableLibrary")
            .field("path", &self.path)
            .field("handle", &self.handle)
            .finish()
    }
}

// The OS handle is process-global and the loader calls are thread-safe
unsafe impl Send for LoadableLibrary {}
unsafe impl Sync for LoadableLibrary {}

/// Library loading errors
#[derive(Debug)]
pub enum LoadError {
    InvalidName,
    LoadFailed(String),
    /// None of the candidate files for a library could be opened
    NotFound { library: String, tried: Vec<PathBuf> },
}

impl core::fmt::Display for LoadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "Invalid library name"),
            Self::LoadFailed(msg) => write!(f, "Failed to load library: {}", msg),
            Self::NotFound { library, tried } => {
                write!(f, "Library '{}' not found ({} candidates tried)", library, tried.len())
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Symbol lookup errors
#[derive(Debug, PartialEq, Eq)]
pub enum SymbolError {
    InvalidName,
    NotFound,
}

impl core::fmt::Display for SymbolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "Invalid symbol name"),
            Self::NotFound => write!(f, "Symbol not found"),
        }
    }
}

impl std::error::Error for SymbolError {}
