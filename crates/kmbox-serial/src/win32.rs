//! Native Windows backend.
//!
//! Enumeration walks the "Ports (COM & LPT)" setup class through SetupAPI and
//! reads `PortName` from each device's hardware registry key. Ports are opened
//! with `CreateFileW` (no sharing) and configured through the DCB and
//! `COMMTIMEOUTS` structures.

#![cfg(windows)]

use std::ffi::OsStr;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use std::time::Duration;

use tracing::debug;
use windows_sys::Win32::Devices::Communication::{
    GetCommState, SetCommState, SetCommTimeouts, COMMTIMEOUTS, DCB, EVENPARITY, NOPARITY,
    ODDPARITY, ONESTOPBIT, TWOSTOPBITS,
};
use windows_sys::Win32::Devices::DeviceAndDriverInstallation::{
    SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInfo, SetupDiGetClassDevsW,
    SetupDiGetDeviceRegistryPropertyW, SetupDiOpenDevRegKey, DICS_FLAG_GLOBAL, DIGCF_PRESENT,
    DIREG_DEV, GUID_DEVCLASS_PORTS, HDEVINFO, SPDRP_FRIENDLYNAME, SP_DEVINFO_DATA,
};
use windows_sys::Win32::Foundation::{
    CloseHandle, ERROR_SUCCESS, GENERIC_READ, GENERIC_WRITE, HANDLE, INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FlushFileBuffers, WriteFile, OPEN_EXISTING,
};
use windows_sys::Win32::System::Registry::{RegCloseKey, RegQueryValueExW, HKEY, KEY_READ};

use crate::config::{DataBits, LineConfig, Parity, StopBits, TimeoutPolicy};
use crate::error::{Result, SerialError};
use crate::traits::{DeviceEntry, DeviceRegistry, PortHandle, SerialDriver};

/// Registry property buffers, in UTF-16 code units.
const NAME_BUFFER_LEN: usize = 256;

/// SetupAPI registry and Win32 comm driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Backend;

impl Win32Backend {
    pub fn new() -> Self {
        Self
    }
}

impl SerialDriver for Win32Backend {
    type Port = Win32Port;

    fn open(&self, path: &str) -> Result<Win32Port> {
        let wide = to_wide(path);
        // SAFETY: `wide` is a NUL-terminated UTF-16 string that outlives the call;
        // null security attributes and template handle are permitted.
        let handle = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                0,
                ptr::null(),
                OPEN_EXISTING,
                0,
                ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(SerialError::Open {
                path: path.to_string(),
                source: io::Error::last_os_error(),
            });
        }
        debug!(%path, "opened serial port");
        Ok(Win32Port { handle })
    }
}

impl DeviceRegistry for Win32Backend {
    fn scan(&self, visit: &mut dyn FnMut(&dyn DeviceEntry) -> ControlFlow<()>) -> Result<()> {
        let set = DeviceInfoSet::present_ports()?;
        let mut index = 0u32;
        loop {
            // SAFETY: SP_DEVINFO_DATA is plain data; all-zero is a valid bit pattern.
            let mut data: SP_DEVINFO_DATA = unsafe { std::mem::zeroed() };
            data.cbSize = std::mem::size_of::<SP_DEVINFO_DATA>() as u32;
            // SAFETY: `set.0` is a live device info list and `data.cbSize` is initialized.
            if unsafe { SetupDiEnumDeviceInfo(set.0, index, &mut data) } == 0 {
                break;
            }
            let entry = Win32Device { set: &set, data };
            if visit(&entry).is_break() {
                break;
            }
            index += 1;
        }
        Ok(())
    }
}

/// Device information list for present "Ports" class devices.
struct DeviceInfoSet(HDEVINFO);

impl DeviceInfoSet {
    fn present_ports() -> Result<Self> {
        // SAFETY: the class GUID is a static; enumerator and parent window may be null.
        let set = unsafe {
            SetupDiGetClassDevsW(
                &GUID_DEVCLASS_PORTS,
                ptr::null(),
                ptr::null_mut(),
                DIGCF_PRESENT,
            )
        };
        if set as isize == INVALID_HANDLE_VALUE as isize {
            return Err(SerialError::Enumerate(io::Error::last_os_error()));
        }
        Ok(Self(set))
    }
}

impl Drop for DeviceInfoSet {
    fn drop(&mut self) {
        // SAFETY: the list was returned by SetupDiGetClassDevsW and is destroyed once.
        unsafe {
            SetupDiDestroyDeviceInfoList(self.0);
        }
    }
}

struct Win32Device<'a> {
    set: &'a DeviceInfoSet,
    data: SP_DEVINFO_DATA,
}

impl DeviceEntry for Win32Device<'_> {
    fn friendly_name(&self) -> Option<String> {
        let mut buf = [0u16; NAME_BUFFER_LEN];
        // SAFETY: the buffer pointer and byte length describe `buf` exactly.
        let ok = unsafe {
            SetupDiGetDeviceRegistryPropertyW(
                self.set.0,
                &self.data,
                SPDRP_FRIENDLYNAME,
                ptr::null_mut(),
                buf.as_mut_ptr().cast::<u8>(),
                std::mem::size_of_val(&buf) as u32,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return None;
        }
        Some(from_wide(&buf))
    }

    fn port_name(&self) -> Option<String> {
        let key = RegKey::open_device_key(self.set, &self.data)?;
        let value_name = to_wide("PortName");
        let mut buf = [0u16; NAME_BUFFER_LEN];
        let mut len = std::mem::size_of_val(&buf) as u32;
        // SAFETY: `key.0` is an open registry key; `len` holds the byte size of `buf`.
        let status = unsafe {
            RegQueryValueExW(
                key.0,
                value_name.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
                buf.as_mut_ptr().cast::<u8>(),
                &mut len,
            )
        };
        if status != ERROR_SUCCESS {
            return None;
        }
        Some(from_wide(&buf)).filter(|name| !name.is_empty())
    }
}

/// Device hardware registry key, closed on drop.
struct RegKey(HKEY);

impl RegKey {
    fn open_device_key(set: &DeviceInfoSet, data: &SP_DEVINFO_DATA) -> Option<Self> {
        // SAFETY: `set` is live and `data` was filled by SetupDiEnumDeviceInfo on it.
        let key =
            unsafe { SetupDiOpenDevRegKey(set.0, data, DICS_FLAG_GLOBAL, 0, DIREG_DEV, KEY_READ) };
        if key as isize == INVALID_HANDLE_VALUE as isize {
            return None;
        }
        Some(Self(key))
    }
}

impl Drop for RegKey {
    fn drop(&mut self) {
        // SAFETY: the key was opened by SetupDiOpenDevRegKey and is closed once.
        unsafe {
            RegCloseKey(self.0);
        }
    }
}

/// Open comm handle. Closed exactly once on drop.
#[derive(Debug)]
pub struct Win32Port {
    handle: HANDLE,
}

// SAFETY: the handle is exclusively owned and Win32 comm handles may be used
// from any thread; `&mut self` serializes writes.
unsafe impl Send for Win32Port {}

impl Win32Port {
    fn comm_state(&self) -> io::Result<DCB> {
        // SAFETY: DCB is plain data; all-zero is a valid bit pattern.
        let mut dcb: DCB = unsafe { std::mem::zeroed() };
        dcb.DCBlength = std::mem::size_of::<DCB>() as u32;
        // SAFETY: `self.handle` is an open comm handle and `dcb` is writable.
        if unsafe { GetCommState(self.handle, &mut dcb) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(dcb)
    }
}

impl PortHandle for Win32Port {
    fn line_config(&self) -> Result<LineConfig> {
        let dcb = self.comm_state()?;
        let data_bits = match dcb.ByteSize {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            other => return Err(SerialError::UnsupportedSetting(format!("{other} data bits"))),
        };
        let stop_bits = match dcb.StopBits {
            ONESTOPBIT => StopBits::One,
            TWOSTOPBITS => StopBits::Two,
            other => return Err(SerialError::UnsupportedSetting(format!("stop bits code {other}"))),
        };
        let parity = match dcb.Parity {
            NOPARITY => Parity::None,
            ODDPARITY => Parity::Odd,
            EVENPARITY => Parity::Even,
            other => return Err(SerialError::UnsupportedSetting(format!("parity code {other}"))),
        };
        Ok(LineConfig {
            baud_rate: dcb.BaudRate,
            data_bits,
            stop_bits,
            parity,
        })
    }

    fn set_line_config(&mut self, config: &LineConfig) -> Result<()> {
        let mut dcb = self.comm_state()?;
        dcb.BaudRate = config.baud_rate;
        dcb.ByteSize = config.data_bits.count();
        dcb.StopBits = match config.stop_bits {
            StopBits::One => ONESTOPBIT,
            StopBits::Two => TWOSTOPBITS,
        };
        dcb.Parity = match config.parity {
            Parity::None => NOPARITY,
            Parity::Odd => ODDPARITY,
            Parity::Even => EVENPARITY,
        };
        // SAFETY: `dcb` was populated by GetCommState on this handle.
        if unsafe { SetCommState(self.handle, &dcb) } == 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    fn set_timeouts(&mut self, policy: &TimeoutPolicy) -> Result<()> {
        let timeouts = COMMTIMEOUTS {
            ReadIntervalTimeout: millis(policy.read_interval),
            ReadTotalTimeoutMultiplier: millis(policy.read_total_per_byte),
            ReadTotalTimeoutConstant: millis(policy.read_total_constant),
            WriteTotalTimeoutMultiplier: millis(policy.write_total_per_byte),
            WriteTotalTimeoutConstant: millis(policy.write_total_constant),
        };
        // SAFETY: `self.handle` is an open comm handle; `timeouts` is fully initialized.
        if unsafe { SetCommTimeouts(self.handle, &timeouts) } == 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }
}

impl Write for Win32Port {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        let mut written = 0u32;
        // SAFETY: `buf` is valid for `len` bytes; synchronous handle, no OVERLAPPED.
        let ok = unsafe {
            WriteFile(
                self.handle,
                buf.as_ptr(),
                len,
                &mut written,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        if written == 0 && !buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "write timed out before any byte was sent",
            ));
        }
        Ok(written as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        // SAFETY: `self.handle` is an open comm handle.
        if unsafe { FlushFileBuffers(self.handle) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for Win32Port {
    fn drop(&mut self) {
        // SAFETY: the handle came from CreateFileW and is closed exactly once here.
        unsafe {
            CloseHandle(self.handle);
        }
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

fn to_wide(value: &str) -> Vec<u16> {
    OsStr::new(value)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}
