#![allow(non_camel_case_types)]

use std::io;
use std::mem;
use std::net::Shutdown;
use std::os::raw::{c_int, c_ulong};
use std::os::windows::io::{AsRawSocket, FromRawSocket, IntoRawSocket, RawSocket};
use std::ptr;
use std::sync::Once;
use std::time::Duration;

use windows_sys::Win32::Foundation::{
    HANDLE,
    SetHandleInformation,
    HANDLE_FLAG_INHERIT
};
use windows_sys::Win32::System::Threading::GetCurrentProcessId;
use windows_sys::Win32::System::WindowsProgramming::INFINITE;
use windows_sys::Win32::Networking::WinSock::{
    self,
    SOCKET_ERROR,
    AF_UNIX,
    SOCKADDR,
    SOCK_STREAM,
    SOL_SOCKET,
    SO_ERROR,
    accept, closesocket, ioctlsocket, recv, send,
    setsockopt, shutdown, WSADuplicateSocketW, WSASocketW, FIONBIO,
    INVALID_SOCKET, SOCKET, WSADATA, WSAPROTOCOL_INFOW,
    WSA_FLAG_OVERLAPPED,
    SD_RECEIVE,
    SD_SEND,
    SD_BOTH
};

// TODO
type socklen_t = i32;
type DWORD = u32;

#[derive(Debug)]
pub struct Socket(SOCKET);

impl Socket {
    pub fn new() -> io::Result<Socket> {
        let socket = wsa_syscall!(
            WSASocketW(
                AF_UNIX,
                SOCK_STREAM,
                0,
                ptr::null_mut(),
                0,
                WSA_FLAG_OVERLAPPED,
            )
            PartialEq::eq,
            INVALID_SOCKET
        )?;
        socket.set_no_inherit()?;
        Ok(socket)
    }

    pub fn accept(&self, storage: *mut SOCKADDR, len: *mut c_int) -> io::Result<Socket> {
        let socket = wsa_syscall!(
            accept(self.0, storage, len),
            PartialEq::eq,
            INVALID_SOCKET
        )?;
        socket.set_no_inherit()?;
        Ok(socket)
    }

    pub fn duplicate(&self) -> io::Result<Socket> {
        let socket = unsafe {
            let mut info: WSAPROTOCOL_INFOW = mem::zeroed();
            wsa_syscall!(
                WSADuplicateSocketW(
                    self.0,
                    GetCurrentProcessId(),
                    &mut info,
                ),
                PartialEq::eq,
                SOCKET_ERROR
            )?;
            let n = wsa_syscall!(
                WSASocketW(
                    info.iAddressFamily,
                    info.iSocketType,
                    info.iProtocol,
                    &mut info,
                    0,
                    WSA_FLAG_OVERLAPPED,
                )
                PartialEq::eq,
                INVALID_SOCKET
            )?;
            Socket(n)
        };
        socket.set_no_inherit()?;
        Ok(socket)
    }

    fn recv_with_flags(&self, buf: &mut [u8], flags: c_int) -> io::Result<usize> {
        let ret = wsa_syscall!(
            recv(
                self.0,
                buf.as_mut_ptr() as *mut _,
                buf.len() as c_int,
                flags,
            ),
            PartialEq::eq,
            SOCKET_ERROR
        )?;
        Ok(ret as usize)
    }

    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv_with_flags(buf, 0)
    }

    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let ret = wsa_syscall!(
            send(self.0, buf as *const _ as *const _, buf.len() as c_int, 0),
            PartialEq::eq,
            SOCKET_ERROR
        )?;
        Ok(ret as usize)
    }

    fn set_no_inherit(&self) -> io::Result<()> {
        syscall!(
            SetHandleInformation(self.0 as HANDLE, HANDLE_FLAG_INHERIT, 0),
            PartialEq::eq,
            0
        )
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        let mut nonblocking = nonblocking as c_ulong;
        wsa_syscall!(
            ioctlsocket(self.0, FIONBIO as c_int, &mut nonblocking),
            PartialEq::eq,
            SOCKET_ERROR
        )
    }

    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        let how = match how {
            Shutdown::Write => SD_SEND,
            Shutdown::Read => SD_RECEIVE,
            Shutdown::Both => SD_BOTH,
        };
        wsa_syscall!(
            shutdown(self.0, how),
            PartialEq::eq,
            SOCKET_ERROR
        )?;
        Ok(())
    }

    pub fn take_error(&self) -> io::Result<Option<io::Error>> {
        let raw: c_int = getsockopt(self, SOL_SOCKET, SO_ERROR)?;
        if raw == 0 {
            Ok(None)
        } else {
            Ok(Some(io::Error::from_raw_os_error(raw as i32)))
        }
    }

    pub fn set_timeout(&self, dur: Option<Duration>, kind: c_int) -> io::Result<()> {
        let timeout = match dur {
            Some(dur) => {
                let timeout = dur2timeout(dur);
                if timeout == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "cannot set a 0 duration timeout",
                    ));
                }
                timeout
            }
            None => 0,
        };
        setsockopt(self, SOL_SOCKET, kind, timeout)
    }

    pub fn timeout(&self, kind: c_int) -> io::Result<Option<Duration>> {
        let raw: DWORD = getsockopt(self, SOL_SOCKET, kind)?;
        if raw == 0 {
            Ok(None)
        } else {
            let secs = raw / 1000;
            let nsec = (raw % 1000) * 1000000;
            Ok(Some(Duration::new(secs as u64, nsec as u32)))
        }
    }
}

pub fn setsockopt<T>(sock: &Socket, opt: c_int, val: c_int, payload: T) -> io::Result<()> {
    unsafe {
        let payload = &payload as *const T as *const _;
        wsa_syscall!(
            WinSock::setsockopt(
                sock.as_raw_socket() as usize,
                opt,
                val,
                payload,
                mem::size_of::<T>() as socklen_t,
            ),
            PartialEq::eq,
            SOCKET_ERROR
        )?;
        Ok(())
    }
}

pub fn getsockopt<T: Copy>(sock: &Socket, opt: c_int, val: c_int) -> io::Result<T> {
    unsafe {
        let mut slot: T = mem::zeroed();
        let mut len = mem::size_of::<T>() as socklen_t;
        wsa_syscall!(
            WinSock::getsockopt(
                sock.as_raw_socket() as _,
                opt,
                val,
                &mut slot as *mut _ as *mut _,
                &mut len,
            ),
            PartialEq::eq,
            SOCKET_ERROR
        )?;
        assert_eq!(len as usize, mem::size_of::<T>());
        Ok(slot)
    }
}

fn dur2timeout(dur: Duration) -> DWORD {
    // Note that a duration is a (u64, u32) (seconds, nanoseconds) pair, and the
    // timeouts in windows APIs are typically u32 milliseconds. To translate, we
    // have two pieces to take care of:
    //
    // * Nanosecond precision is rounded up
    // * Greater than u32::MAX milliseconds (50 days) is rounded up to INFINITE
    //   (never time out).
    dur.as_secs()
        .checked_mul(1000)
        .and_then(|ms| ms.checked_add((dur.subsec_nanos() as u64) / 1_000_000))
        .and_then(|ms| {
            ms.checked_add(if dur.subsec_nanos() % 1_000_000 > 0 {
                1
            } else {
                0
            })
        })
        .map(|ms| {
            if ms > <DWORD>::max_value() as u64 {
                INFINITE
            } else {
                ms as DWORD
            }
        })
        .unwrap_or(INFINITE)
}

impl Drop for Socket {
    fn drop(&mut self) {
        let _ = unsafe { closesocket(self.0) };
    }
}

impl AsRawSocket for Socket {
    fn as_raw_socket(&self) -> RawSocket {
        self.0 as RawSocket
    }
}

impl FromRawSocket for Socket {
    unsafe fn from_raw_socket(sock: RawSocket) -> Self {
        Socket(sock as SOCKET)
    }
}

impl IntoRawSocket for Socket {
    fn into_raw_socket(self) -> RawSocket {
        let ret = self.0 as RawSocket;
        mem::forget(self);
        ret
    }
}
