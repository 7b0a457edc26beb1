//! Raw ioctl calls on the device file descriptor.

use std::io;
use std::os::fd::RawFd;

/// Issue a request whose argument is passed by value.
///
/// Returns the non-negative ioctl return value.
pub(crate) fn ioctl_value(fd: RawFd, request: libc::c_ulong, arg: libc::c_long) -> io::Result<libc::c_int> {
    let ret = unsafe { libc::ioctl(fd, request as _, arg) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret)
}

/// Issue a request whose argument is a pointer the driver reads or fills.
pub(crate) fn ioctl_ptr<T>(fd: RawFd, request: libc::c_ulong, arg: &mut T) -> io::Result<libc::c_int> {
    let ret = unsafe { libc::ioctl(fd, request as _, arg as *mut T) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ret)
}
