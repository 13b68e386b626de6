use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Error raised by device stream implementations.
#[derive(Debug)]
pub enum StreamError {
    /// IO error (socket, file, serial device)
    Io(std::io::Error),
    /// Device-level error (closed, disconnected, refused)
    Device(String),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Io(e) => write!(f, "IO error: {e}"),
            StreamError::Device(s) => write!(f, "device error: {s}"),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        StreamError::Io(e)
    }
}

/// Sender half of a byte-stream device.
///
/// Implement for every output the bridge can drive (serial MIDI port,
/// test double, ...). One `send` call is one atomic write to the device.
#[async_trait]
pub trait DeviceSender: Send {
    async fn send(&mut self, payload: &[u8]) -> Result<(), StreamError>;
}

/// Receiver half of a byte-stream device.
#[async_trait]
pub trait DeviceReceiver: Send {
    /// Reads up to `buf.len()` bytes, returning how many arrived.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError>;
}

/// Byte stream over a serial character device such as `/dev/snd/midiC1D0`.
pub struct SerialStream {
    file: File,
}

impl SerialStream {
    pub async fn open_input<P: AsRef<Path>>(path: P) -> Result<Self, StreamError> {
        let file = OpenOptions::new().read(true).open(path).await?;
        Ok(Self { file })
    }

    pub async fn open_output<P: AsRef<Path>>(path: P) -> Result<Self, StreamError> {
        let file = OpenOptions::new().write(true).open(path).await?;
        Ok(Self { file })
    }
}

#[async_trait]
impl DeviceSender for SerialStream {
    async fn send(&mut self, payload: &[u8]) -> Result<(), StreamError> {
        self.file.write_all(payload).await?;
        self.file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceReceiver for SerialStream {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let n = self.file.read(buf).await?;
        Ok(n)
    }
}

/// Mock implementation of `DeviceSender` for testing and dependency injection.
///
/// Records every payload behind a shared handle, so a test can keep a clone
/// and inspect what the bridge wrote.
#[derive(Clone, Default)]
pub struct MockSender {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    fail: bool,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every write fails, for exercising the error path.
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceSender for MockSender {
    async fn send(&mut self, payload: &[u8]) -> Result<(), StreamError> {
        if self.fail {
            return Err(StreamError::Device("mock write refused".to_string()));
        }
        self.sent.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

/// Mock implementation of `DeviceReceiver`: replays scripted chunks, then
/// fails as if the device disappeared.
pub struct MockReceiver {
    chunks: VecDeque<Vec<u8>>,
}

impl MockReceiver {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

#[async_trait]
impl DeviceReceiver for MockReceiver {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        match self.chunks.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            }
            None => Err(StreamError::Device("mock device unplugged".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_sender_records_writes() {
        let mut sender = MockSender::new();
        let handle = sender.clone();
        sender.send(&[0x90, 60, 127]).await.unwrap();
        assert_eq!(handle.sent(), vec![vec![0x90, 60, 127]]);
    }

    #[tokio::test]
    async fn test_failing_sender_reports_device_error() {
        let mut sender = MockSender::failing();
        let err = sender.send(&[0x90, 60, 127]).await.unwrap_err();
        assert!(matches!(err, StreamError::Device(_)));
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_mock_receiver_replays_then_fails() {
        let mut receiver = MockReceiver::new(vec![vec![0xF8], vec![0x90, 60]]);
        let mut buf = [0u8; 16];
        assert_eq!(receiver.read(&mut buf).await.unwrap(), 1);
        assert_eq!(buf[0], 0xF8);
        assert_eq!(receiver.read(&mut buf).await.unwrap(), 2);
        assert!(receiver.read(&mut buf).await.is_err());
    }

    #[tokio::test]
    async fn test_serial_open_missing_device_fails() {
        let res = SerialStream::open_input("/nonexistent/path/to/midi").await;
        assert!(res.is_err());
    }
}
