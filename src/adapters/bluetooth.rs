//! Bluetooth adapter: RSSI of a paired peer over raw Linux HCI sockets.
//!
//! One query is a short conversation with the kernel's Bluetooth stack:
//!
//! ```text
//! L2CAP connect (PSM 1, SDP)  ──▶  brings up the ACL link
//! HCIGETCONNINFO ioctl        ──▶  ACL connection handle
//! HCI cmd  Read RSSI (0x1405) ──▶  Command Complete event ─▶ RSSI (i8)
//! ```
//!
//! The connect result is not checked: an existing ACL link is enough.
//! Every other failure ends the query and the port reports `None`.
//!
//! Socket I/O is only built for Linux with the `rpi` feature.  Elsewhere
//! the reader always answers `None`; the packet helpers stay available.

use std::io;
use std::time::Duration;

use log::debug;

use crate::address::BdAddr;
use crate::app::ports::RssiPort;

// ── HCI protocol ──────────────────────────────────────────────

const HCI_COMMAND_PKT: u8 = 0x01;
const HCI_EVENT_PKT: u8 = 0x04;
const EVT_CMD_COMPLETE: u8 = 0x0E;
const EVT_CMD_STATUS: u8 = 0x0F;
/// OGF 0x05 (status parameters), OCF 0x0005.
const OPCODE_READ_RSSI: u16 = 0x1405;

/// `Read RSSI` command packet for an ACL connection handle.
pub fn read_rssi_command(handle: u16) -> [u8; 6] {
    let [op_lo, op_hi] = OPCODE_READ_RSSI.to_le_bytes();
    let [h_lo, h_hi] = handle.to_le_bytes();
    [HCI_COMMAND_PKT, op_lo, op_hi, 2, h_lo, h_hi]
}

/// Outcome of one HCI event packet read while waiting for the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HciReply {
    Rssi(i8),
    /// The controller rejected the command.
    Failed(u8),
    /// Some other event; keep waiting.
    Unrelated,
}

/// Decode an event packet (`0x04` prefix included).
pub fn parse_reply(packet: &[u8]) -> HciReply {
    let [HCI_EVENT_PKT, event, _plen, params @ ..] = packet else {
        return HciReply::Unrelated;
    };
    let opcode_at = |i: usize| {
        params
            .get(i..i + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
    };
    match *event {
        // ncmd, opcode, status, handle (2), rssi
        EVT_CMD_COMPLETE if opcode_at(1) == Some(OPCODE_READ_RSSI) => match params.get(3..7) {
            Some(&[0, _, _, rssi]) => HciReply::Rssi(rssi as i8),
            Some(&[status, ..]) => HciReply::Failed(status),
            _ => HciReply::Failed(0xFF),
        },
        // status, ncmd, opcode
        EVT_CMD_STATUS if opcode_at(2) == Some(OPCODE_READ_RSSI) => match params.first() {
            Some(&0) | None => HciReply::Unrelated,
            Some(&status) => HciReply::Failed(status),
        },
        _ => HciReply::Unrelated,
    }
}

// ── Adapter ───────────────────────────────────────────────────

/// [`RssiPort`] backed by local HCI device `hciN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HciRssiReader {
    device: u16,
}

impl HciRssiReader {
    /// Reader on `hci0`.
    pub fn new() -> Self {
        Self::with_device(0)
    }

    pub fn with_device(device: u16) -> Self {
        Self { device }
    }
}

impl RssiPort for HciRssiReader {
    fn query_rssi(&mut self, address: &BdAddr, timeout: Duration) -> Option<i8> {
        match self.read(address, timeout) {
            Ok(rssi) => Some(rssi),
            Err(e) => {
                debug!("RSSI {} via hci{}: {}", address, self.device, e);
                None
            }
        }
    }
}

#[cfg(all(feature = "rpi", target_os = "linux"))]
impl HciRssiReader {
    fn read(&self, address: &BdAddr, timeout: Duration) -> io::Result<i8> {
        let hci = sys::open_hci(self.device)?;
        let _link = sys::connect_l2cap(address, timeout)?;
        let handle = sys::conn_handle(&hci, address)?;
        sys::set_event_filter(&hci)?;
        sys::send(&hci, &read_rssi_command(handle))?;
        sys::await_rssi(&hci, timeout)
    }
}

#[cfg(not(all(feature = "rpi", target_os = "linux")))]
impl HciRssiReader {
    fn read(&self, _address: &BdAddr, _timeout: Duration) -> io::Result<i8> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "HCI sockets need Linux and the `rpi` feature",
        ))
    }
}

// ───────────────────────────────────────────────────────────────
// Raw sockets (libc)
// ───────────────────────────────────────────────────────────────

#[cfg(all(feature = "rpi", target_os = "linux"))]
mod sys {
    use std::io;
    use std::mem;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
    use std::ptr;
    use std::time::{Duration, Instant};

    use libc::{c_int, sa_family_t, socklen_t};
    use log::debug;

    use super::{EVT_CMD_COMPLETE, EVT_CMD_STATUS, HCI_EVENT_PKT, HciReply, OPCODE_READ_RSSI};
    use crate::address::BdAddr;

    const AF_BLUETOOTH: c_int = 31;
    const BTPROTO_L2CAP: c_int = 0;
    const BTPROTO_HCI: c_int = 1;
    const SOL_HCI: c_int = 0;
    const HCI_FILTER: c_int = 2;
    /// `_IOR('H', 213, int)`
    const HCIGETCONNINFO: libc::c_ulong = 0x8004_48D5;
    const ACL_LINK: u8 = 0x01;
    const SDP_PSM: u16 = 0x0001;
    const MAX_EVENT_LEN: usize = 260;

    // Kernel ABI layouts from <bluetooth/hci.h> and <bluetooth/l2cap.h>.

    #[repr(C)]
    #[allow(dead_code)]
    struct SockaddrHci {
        family: sa_family_t,
        dev: u16,
        channel: u16,
    }

    #[repr(C)]
    #[allow(dead_code)]
    struct SockaddrL2 {
        family: sa_family_t,
        psm: u16,
        bdaddr: [u8; 6],
        cid: u16,
        bdaddr_type: u8,
    }

    #[repr(C)]
    #[derive(Default)]
    #[allow(dead_code)]
    struct ConnInfo {
        handle: u16,
        bdaddr: [u8; 6],
        link_type: u8,
        out: u8,
        state: u16,
        link_mode: u32,
    }

    #[repr(C)]
    #[allow(dead_code)]
    struct ConnInfoReq {
        bdaddr: [u8; 6],
        link_type: u8,
        info: ConnInfo,
    }

    #[repr(C)]
    #[allow(dead_code)]
    struct HciFilter {
        type_mask: u32,
        event_mask: [u32; 2],
        opcode: u16,
    }

    fn check(ret: c_int) -> io::Result<c_int> {
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret)
        }
    }

    fn socket(kind: c_int, proto: c_int) -> io::Result<OwnedFd> {
        // SAFETY: no pointers involved; a non-negative return is a fresh fd we own.
        let fd = check(unsafe { libc::socket(AF_BLUETOOTH, kind | libc::SOCK_CLOEXEC, proto) })?;
        Ok(unsafe { OwnedFd::from_raw_fd(fd) })
    }

    fn setsockopt<T>(fd: &OwnedFd, level: c_int, name: c_int, value: &T) -> io::Result<()> {
        // SAFETY: `value` is a live `#[repr(C)]` value of exactly the length passed.
        check(unsafe {
            libc::setsockopt(
                fd.as_raw_fd(),
                level,
                name,
                ptr::from_ref(value).cast(),
                mem::size_of::<T>() as socklen_t,
            )
        })
        .map(drop)
    }

    pub fn open_hci(dev: u16) -> io::Result<OwnedFd> {
        let fd = socket(libc::SOCK_RAW, BTPROTO_HCI)?;
        let addr = SockaddrHci {
            family: AF_BLUETOOTH as sa_family_t,
            dev,
            channel: 0,
        };
        // SAFETY: `addr` outlives the call and its size is passed alongside.
        check(unsafe {
            libc::bind(
                fd.as_raw_fd(),
                ptr::from_ref(&addr).cast(),
                mem::size_of::<SockaddrHci>() as socklen_t,
            )
        })?;
        Ok(fd)
    }

    /// Open an L2CAP channel to the SDP PSM so the ACL link exists.
    /// The socket must stay open until the RSSI read completes.
    pub fn connect_l2cap(address: &BdAddr, timeout: Duration) -> io::Result<OwnedFd> {
        let fd = socket(libc::SOCK_SEQPACKET, BTPROTO_L2CAP)?;
        let tv = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };
        setsockopt(&fd, libc::SOL_SOCKET, libc::SO_SNDTIMEO, &tv)?;

        let addr = SockaddrL2 {
            family: AF_BLUETOOTH as sa_family_t,
            psm: SDP_PSM.to_le(),
            bdaddr: address.to_le_bytes(),
            cid: 0,
            bdaddr_type: 0,
        };
        // SAFETY: as in `open_hci`.
        let connected = check(unsafe {
            libc::connect(
                fd.as_raw_fd(),
                ptr::from_ref(&addr).cast(),
                mem::size_of::<SockaddrL2>() as socklen_t,
            )
        });
        if let Err(e) = connected {
            debug!("L2CAP connect {}: {}", address, e);
        }
        Ok(fd)
    }

    pub fn conn_handle(hci: &OwnedFd, address: &BdAddr) -> io::Result<u16> {
        let mut req = ConnInfoReq {
            bdaddr: address.to_le_bytes(),
            link_type: ACL_LINK,
            info: ConnInfo::default(),
        };
        // SAFETY: the kernel writes one `hci_conn_info` after the header,
        // which `req.info` provides.
        check(unsafe { libc::ioctl(hci.as_raw_fd(), HCIGETCONNINFO as _, ptr::from_mut(&mut req)) })?;
        Ok(u16::from_le(req.info.handle))
    }

    pub fn set_event_filter(hci: &OwnedFd) -> io::Result<()> {
        let filter = HciFilter {
            type_mask: 1 << HCI_EVENT_PKT,
            event_mask: [(1 << EVT_CMD_COMPLETE) | (1 << EVT_CMD_STATUS), 0],
            opcode: OPCODE_READ_RSSI.to_le(),
        };
        setsockopt(hci, SOL_HCI, HCI_FILTER, &filter)
    }

    pub fn send(hci: &OwnedFd, packet: &[u8]) -> io::Result<()> {
        // SAFETY: `packet` is valid for `packet.len()` bytes.
        let n = unsafe { libc::write(hci.as_raw_fd(), packet.as_ptr().cast(), packet.len()) };
        match usize::try_from(n) {
            Ok(n) if n == packet.len() => Ok(()),
            Ok(_) => Err(io::Error::new(io::ErrorKind::WriteZero, "short HCI write")),
            Err(_) => Err(io::Error::last_os_error()),
        }
    }

    /// Read events until the `Read RSSI` reply arrives or `timeout` passes.
    pub fn await_rssi(hci: &OwnedFd, timeout: Duration) -> io::Result<i8> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; MAX_EVENT_LEN];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(io::ErrorKind::TimedOut.into());
            }
            let mut pfd = libc::pollfd {
                fd: hci.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            let wait_ms = c_int::try_from(remaining.as_millis()).unwrap_or(c_int::MAX);
            // SAFETY: one valid `pollfd`.
            if check(unsafe { libc::poll(&raw mut pfd, 1, wait_ms) })? == 0 {
                return Err(io::ErrorKind::TimedOut.into());
            }
            // SAFETY: `buf` is valid for `buf.len()` bytes.
            let n = unsafe { libc::read(hci.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
            let n = usize::try_from(n).map_err(|_| io::Error::last_os_error())?;

            match super::parse_reply(&buf[..n]) {
                HciReply::Rssi(rssi) => return Ok(rssi),
                HciReply::Failed(status) => {
                    return Err(io::Error::other(format!("HCI status {status:#04x}")));
                }
                HciReply::Unrelated => {}
            }
        }
    }
}
