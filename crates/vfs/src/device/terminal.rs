//! TEAM_478: Terminal wrapper around a serial/console device.
//!
//! Adds the minimal line discipline stdio expects:
//! - output `\n` becomes `\r\n`
//! - input `\r`, `\n` and `\r\n` all become one `\n`, reads return at a newline
//! - backspace erases the previous character
//! - optional echo of typed input
//!
//! Binary mode (termios without `ICANON`) turns all of that off.

use core::sync::atomic::{AtomicBool, Ordering};

use super::DeviceRef;
use crate::error::{VfsError, VfsResult};
use crate::flags::{
    ECHO, ICANON, IOCTL_TCGETATTR, IOCTL_TCSETATTR_DRAIN, IOCTL_TCSETATTR_FLUSH,
    IOCTL_TCSETATTR_NOW, IoctlArg, SeekWhence,
};
use crate::mode::Stat;
use crate::sync::Mutex;
use crate::vfs::{File, FileBase};

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;
const ERASE_ECHO: &[u8] = b"\x1b[1D \x1b[1D";

pub struct TerminalDevice {
    base: FileBase,
    device: DeviceRef,
    echo: AtomicBool,
    binary: AtomicBool,
    /// Serializes line-discipline reads; holds the "swallow the `\n` of a
    /// `\r\n` pair" flag.
    skip_newline: Mutex<bool>,
}

impl TerminalDevice {
    /// Echo on, text mode.
    pub fn new(device: DeviceRef) -> Self {
        Self {
            base: FileBase::detached(),
            device,
            echo: AtomicBool::new(true),
            binary: AtomicBool::new(false),
            skip_newline: Mutex::new(false),
        }
    }

    pub fn device(&self) -> &DeviceRef {
        &self.device
    }

    pub fn set_echo(&self, echo: bool) {
        self.echo.store(echo, Ordering::Relaxed);
    }

    pub fn set_binary(&self, binary: bool) {
        self.binary.store(binary, Ordering::Relaxed);
    }

    fn write_all(&self, mut data: &[u8]) -> VfsResult<()> {
        while !data.is_empty() {
            let n = self.device.write_block(data, 0)?;
            if n == 0 {
                return Err(VfsError::IoError);
            }
            data = &data[n..];
        }
        Ok(())
    }

    fn echo_bytes(&self, data: &[u8]) -> VfsResult<()> {
        if data.is_empty() || !self.echo.load(Ordering::Relaxed) {
            return Ok(());
        }
        self.write_all(data)
    }

    /// Rewrites the freshly read `buf[begin..end]` in place.
    ///
    /// Returns the new end of valid data and whether a newline was seen.
    fn normalize(
        &self,
        skip_newline: &mut bool,
        buf: &mut [u8],
        begin: usize,
        end: usize,
    ) -> VfsResult<(usize, bool)> {
        let mut w = begin;
        // Start of the run of ordinary characters not yet echoed
        let mut run = begin;
        let mut newline = false;
        for r in begin..end {
            let c = buf[r];
            match c {
                b'\r' | b'\n' if c == b'\n' && *skip_newline => {
                    *skip_newline = false;
                }
                b'\r' | b'\n' => {
                    self.echo_bytes(&buf[run..w])?;
                    buf[w] = b'\n';
                    w += 1;
                    self.echo_bytes(b"\r\n")?;
                    *skip_newline = c == b'\r';
                    newline = true;
                    run = w;
                }
                BACKSPACE | DELETE => {
                    self.echo_bytes(&buf[run..w])?;
                    if w > 0 {
                        w -= 1;
                        self.echo_bytes(ERASE_ECHO)?;
                    }
                    run = w;
                }
                _ => {
                    buf[w] = c;
                    w += 1;
                    *skip_newline = false;
                }
            }
        }
        self.echo_bytes(&buf[run..w])?;
        Ok((w, newline))
    }
}

impl File for TerminalDevice {
    fn base(&self) -> &FileBase {
        &self.base
    }

    fn read(&self, buf: &mut [u8]) -> VfsResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.binary.load(Ordering::Relaxed) {
            let n = self.device.read_block(buf, 0)?;
            self.echo_bytes(&buf[..n])?;
            return Ok(n);
        }
        let mut skip_newline = self.skip_newline.lock();
        let mut filled = 0;
        loop {
            let n = self.device.read_block(&mut buf[filled..], 0)?;
            if n == 0 {
                return Ok(filled);
            }
            let (end, newline) = self.normalize(&mut skip_newline, buf, filled, filled + n)?;
            filled = end;
            if newline || filled == buf.len() {
                return Ok(filled);
            }
        }
    }

    fn write(&self, buf: &[u8]) -> VfsResult<usize> {
        if self.binary.load(Ordering::Relaxed) {
            return self.device.write_block(buf, 0);
        }
        let mut rest = buf;
        while let Some(i) = rest.iter().position(|&b| b == b'\n') {
            self.write_all(&rest[..i])?;
            self.write_all(b"\r\n")?;
            rest = &rest[i + 1..];
        }
        self.write_all(rest)?;
        Ok(buf.len())
    }

    fn lseek(&self, _pos: i64, _whence: SeekWhence) -> VfsResult<u64> {
        Err(VfsError::BadFd)
    }

    fn fstat(&self) -> VfsResult<Stat> {
        Ok(self.device.stat())
    }

    fn isatty(&self) -> bool {
        self.device.info().is_tty()
    }

    fn ioctl(&self, cmd: u32, mut arg: IoctlArg<'_>) -> VfsResult<i32> {
        let result = self.device.ioctl(cmd, &mut arg)?;
        let IoctlArg::Termios(t) = arg else {
            return Ok(result);
        };
        match cmd {
            IOCTL_TCGETATTR => {
                if self.echo.load(Ordering::Relaxed) {
                    t.c_lflag |= ECHO;
                } else {
                    t.c_lflag &= !ECHO;
                }
                if self.binary.load(Ordering::Relaxed) {
                    t.c_lflag &= !ICANON;
                } else {
                    t.c_lflag |= ICANON;
                }
            }
            IOCTL_TCSETATTR_NOW | IOCTL_TCSETATTR_DRAIN | IOCTL_TCSETATTR_FLUSH => {
                self.set_echo(t.c_lflag & ECHO != 0);
                self.set_binary(t.c_lflag & ICANON == 0);
            }
            _ => {}
        }
        Ok(result)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
