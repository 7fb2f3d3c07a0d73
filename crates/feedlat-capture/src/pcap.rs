//! Classic libpcap file reader.
//!
//! Reads the 24-byte global header, then yields one `Frame` per record until
//! end of file. Both byte orders and the nanosecond-resolution variant are
//! supported. pcapng is not.
//!
//! Frame timestamps are seconds since the first record's whole second. Epoch
//! seconds in an `f64` only resolve to about 240 ns, too coarse for delays.

use crate::error::{CaptureError, CaptureResult};
use crate::identity::IdentityField;
use crate::packet::{self, LinkType};
use feedlat_core::{Frame, Payload};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

const MAGIC_MICROS: u32 = 0xa1b2_c3d4;
const MAGIC_NANOS: u32 = 0xa1b2_3c4d;
const MAGIC_PCAPNG: u32 = 0x0a0d_0d0a;

const GLOBAL_HEADER_LEN: usize = 24;
const RECORD_HEADER_LEN: usize = 16;

/// Upper bound on a single record; larger lengths mean a corrupt file.
const MAX_RECORD_LEN: u32 = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u32(&self, bytes: &[u8]) -> u32 {
        let b = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            Self::Little => u32::from_le_bytes(b),
            Self::Big => u32::from_be_bytes(b),
        }
    }
}

/// Streaming pcap reader.
pub struct PcapReader<R> {
    reader: R,
    order: ByteOrder,
    nanos: bool,
    link: LinkType,
    identity: IdentityField,
    buf: Vec<u8>,
    records: u64,
    /// Whole epoch second of the first record.
    base_sec: Option<u32>,
    done: bool,
}

impl PcapReader<BufReader<File>> {
    /// Open a capture file.
    pub fn open(path: impl AsRef<Path>, identity: IdentityField) -> CaptureResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!(path = %path.display(), %identity, "Opening pcap capture");
        Self::new(BufReader::new(file), identity)
    }
}

impl<R: Read> PcapReader<R> {
    /// Read the global header from `reader`.
    pub fn new(mut reader: R, identity: IdentityField) -> CaptureResult<Self> {
        let mut header = [0u8; GLOBAL_HEADER_LEN];
        reader.read_exact(&mut header).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                CaptureError::Corrupt("file shorter than pcap global header".to_string())
            }
            _ => CaptureError::Io(e),
        })?;

        let magic = ByteOrder::Little.u32(&header[0..4]);
        let (order, nanos) = match magic {
            MAGIC_MICROS => (ByteOrder::Little, false),
            MAGIC_NANOS => (ByteOrder::Little, true),
            m if m == MAGIC_MICROS.swap_bytes() => (ByteOrder::Big, false),
            m if m == MAGIC_NANOS.swap_bytes() => (ByteOrder::Big, true),
            MAGIC_PCAPNG => {
                return Err(CaptureError::Unsupported(
                    "pcapng files are not supported, convert to pcap first".to_string(),
                ))
            }
            other => {
                return Err(CaptureError::Unsupported(format!(
                    "unknown pcap magic {other:#010x}"
                )))
            }
        };

        let network = order.u32(&header[20..24]);
        let link = LinkType::from_pcap(network).ok_or_else(|| {
            CaptureError::Unsupported(format!("link type {network}"))
        })?;

        debug!(?order, nanos, ?link, "pcap global header");

        Ok(Self {
            reader,
            order,
            nanos,
            link,
            identity,
            buf: Vec::new(),
            records: 0,
            base_sec: None,
            done: false,
        })
    }

    pub fn link_type(&self) -> LinkType {
        self.link
    }

    /// Records read so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Epoch second that frame timestamps are relative to, once a record is read.
    pub fn base_seconds(&self) -> Option<u32> {
        self.base_sec
    }

    /// Fill `buf` as far as the reader allows. Returns the bytes read.
    fn read_full(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn next_record(&mut self) -> CaptureResult<Option<Frame>> {
        let mut header = [0u8; RECORD_HEADER_LEN];
        let read = Self::read_full(&mut self.reader, &mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < RECORD_HEADER_LEN {
            warn!(record = self.records, "Truncated pcap record header, stopping");
            return Ok(None);
        }

        let ts_sec = self.order.u32(&header[0..4]);
        let ts_frac = self.order.u32(&header[4..8]);
        let incl_len = self.order.u32(&header[8..12]);

        if incl_len > MAX_RECORD_LEN {
            return Err(CaptureError::Corrupt(format!(
                "record {} claims {} bytes",
                self.records, incl_len
            )));
        }

        self.buf.resize(incl_len as usize, 0);
        let read = Self::read_full(&mut self.reader, &mut self.buf)?;
        if read < self.buf.len() {
            warn!(
                record = self.records,
                expected = incl_len,
                read,
                "Truncated pcap record, stopping"
            );
            return Ok(None);
        }
        self.records += 1;

        let base = *self.base_sec.get_or_insert_with(|| {
            debug!(base_sec = ts_sec, "pcap timestamps relative to first record");
            ts_sec
        });
        let divisor = if self.nanos { 1e9 } else { 1e6 };
        let whole = i64::from(ts_sec) - i64::from(base);
        let timestamp = whole as f64 + f64::from(ts_frac) / divisor;

        let fields = packet::decode(self.link, &self.buf);
        let publisher = self.identity.extract(&fields);
        let payload = fields.payload.map(Payload::from);

        Ok(Some(Frame::partial(timestamp, publisher, payload)))
    }
}

impl<R: Read> Iterator for PcapReader<R> {
    type Item = CaptureResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_record() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                debug!(records = self.records, "pcap capture exhausted");
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
