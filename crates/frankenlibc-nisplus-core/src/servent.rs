//! Packing of `services_tbl` entries into a caller-supplied buffer.
//!
//! The output mirrors C `struct servent`: every string and the alias pointer
//! table live inside the buffer the caller handed in, and nothing is
//! allocated. Layout of a packed record, growing forward from offset 0:
//!
//! ```text
//! name\0 proto\0 [ alias\0]* \0 <pad to pointer alignment> slot* NULL
//! ```
//!
//! The alias section is first written as one space-separated line (` a1 a2`)
//! because the number of slots, and with it the aligned position of the slot
//! table, is only known after every row of the group has been visited. The
//! line is then split in place: each separating space becomes the previous
//! alias's terminator, and the start address of each alias goes into a slot.
//!
//! Slots hold absolute addresses (native-endian machine words) so that the
//! ABI layer can expose the table as `char **` without rewriting it.
//! [`ServiceEntry`] reads the same bytes back through offsets.
//!
//! ## Insufficient space
//!
//! Every write is bounds-checked against the remaining room before it
//! happens. When the record does not fit, the buffer may hold a partial
//! prefix, no [`ServiceEntry`] is produced, and the outcome carries the exact
//! length that would have sufficed for a buffer starting at the same address.

use std::fmt;
use std::mem::{align_of, size_of};
use std::ops::Range;

use crate::config::PortPolicy;
use crate::nis::{NisObject, NisResult, ObjectKind, until_nul};

/// `en_type` of rows in the services table.
pub const SERVICES_TABLE_TYPE: &[u8] = b"services_tbl";
/// `cname`, `name`, `proto`, `port`.
pub const SERVICES_MIN_COLUMNS: usize = 4;

pub const COL_CNAME: usize = 0;
pub const COL_NAME: usize = 1;
pub const COL_PROTO: usize = 2;
pub const COL_PORT: usize = 3;

const PTR_SIZE: usize = size_of::<*const u8>();
const PTR_ALIGN: usize = align_of::<*const u8>();

const _: () = assert!(size_of::<usize>() == PTR_SIZE);

/// Result of [`parse_servent`].
#[derive(Debug)]
pub enum ParseOutcome<'b> {
    /// Not a services table entry; skip it.
    NoMatch,
    Record(ServiceEntry<'b>),
    /// The buffer is too small. `needed` is the minimum length for a buffer
    /// starting at the same address.
    InsufficientSpace { needed: usize },
}

/// Overflow reported by [`ServiceGroup::pack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientSpace {
    pub needed: usize,
}

/// Row-0 fields of a group that passed validation.
struct Header<'r> {
    name: &'r [u8],
    protocol: &'r [u8],
    port: u16,
}

/// Status, object kind, table type and column count of the first object.
pub fn is_services_entry(result: &NisResult) -> bool {
    services_row(result).is_some()
}

fn services_row(result: &NisResult) -> Option<&NisObject> {
    if !result.status.is_success() {
        return None;
    }
    let row = result.first()?;
    let well_formed = row.kind == ObjectKind::Entry
        && until_nul(&row.entry_type) == SERVICES_TABLE_TYPE
        && row.columns.len() >= SERVICES_MIN_COLUMNS;
    well_formed.then_some(row)
}

fn header(result: &NisResult, policy: PortPolicy) -> Option<Header<'_>> {
    let row = services_row(result)?;
    let name = row.column_text(COL_CNAME)?;
    let protocol = row.column_text(COL_PROTO)?;
    if name.is_empty() || protocol.is_empty() {
        return None;
    }
    let port = policy.parse(row.column_text(COL_PORT)?)?;
    Some(Header {
        name,
        protocol,
        port,
    })
}

/// Alias column of a row, if the row is an entry that has one.
fn alias_of(row: &NisObject) -> Option<&[u8]> {
    if row.kind != ObjectKind::Entry {
        return None;
    }
    row.column_text(COL_NAME)
}

/// Serialize `result` into `buffer` as a service record.
pub fn parse_servent<'b>(
    result: &NisResult,
    buffer: &'b mut [u8],
    policy: PortPolicy,
) -> ParseOutcome<'b> {
    let Some(header) = header(result, policy) else {
        return ParseOutcome::NoMatch;
    };
    match pack_fields(&header, &result.objects, buffer) {
        Ok(entry) => ParseOutcome::Record(entry),
        Err(InsufficientSpace { needed }) => ParseOutcome::InsufficientSpace { needed },
    }
}

/// A reply already known to be a well-formed services entry.
///
/// The enumeration cursor validates pages before it decides which page to
/// keep, then packs the survivor; this type carries that guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceGroup {
    result: NisResult,
    port: u16,
}

impl ServiceGroup {
    /// Hands the reply back unchanged when it is not a services entry.
    pub fn validate(result: NisResult, policy: PortPolicy) -> Result<Self, NisResult> {
        match header(&result, policy).map(|h| h.port) {
            Some(port) => Ok(Self { result, port }),
            None => Err(result),
        }
    }

    pub fn result(&self) -> &NisResult {
        &self.result
    }

    pub fn into_result(self) -> NisResult {
        self.result
    }

    pub fn pack<'b>(&self, buffer: &'b mut [u8]) -> Result<ServiceEntry<'b>, InsufficientSpace> {
        let row = &self.result.objects[0];
        let header = Header {
            name: until_nul(&row.columns[COL_CNAME]),
            protocol: until_nul(&row.columns[COL_PROTO]),
            port: self.port,
        };
        pack_fields(&header, &self.result.objects, buffer)
    }
}

// ---------------------------------------------------------------------------
// Bump allocation
// ---------------------------------------------------------------------------

#[inline]
fn padding_for(addr: usize, align: usize) -> usize {
    (align - addr % align) % align
}

struct Bump<'a> {
    buf: &'a mut [u8],
    base: usize,
    used: usize,
}

impl<'a> Bump<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        let base = buf.as_ptr() as usize;
        Self { buf, base, used: 0 }
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.buf.len() - self.used
    }

    /// Copy `text` and a NUL terminator. Returns the range of `text`.
    fn push_cstr(&mut self, text: &[u8]) -> Option<Range<usize>> {
        if text.len() >= self.remaining() {
            return None;
        }
        let start = self.used;
        let end = start + text.len();
        self.buf[start..end].copy_from_slice(text);
        self.buf[end] = 0;
        self.used = end + 1;
        Some(start..end)
    }

    /// Append ` text` without a terminator.
    fn push_alias(&mut self, text: &[u8]) -> Option<()> {
        if text.len() >= self.remaining() {
            return None;
        }
        let start = self.used;
        self.buf[start] = b' ';
        self.buf[start + 1..start + 1 + text.len()].copy_from_slice(text);
        self.used = start + 1 + text.len();
        Some(())
    }

    fn push_nul(&mut self) -> Option<usize> {
        if self.remaining() == 0 {
            return None;
        }
        let at = self.used;
        self.buf[at] = 0;
        self.used += 1;
        Some(at)
    }

    /// Skip padding so the next byte is `align`-aligned in memory, then
    /// reserve `len` bytes.
    fn reserve_aligned(&mut self, align: usize, len: usize) -> Option<usize> {
        let pad = padding_for(self.base + self.used, align);
        if pad.checked_add(len)? > self.remaining() {
            return None;
        }
        let start = self.used + pad;
        self.used = start + len;
        Some(start)
    }

    fn write_word(&mut self, at: usize, word: usize) {
        self.buf[at..at + PTR_SIZE].copy_from_slice(&word.to_ne_bytes());
    }
}

struct Layout {
    name: Range<usize>,
    protocol: Range<usize>,
    alias_table: usize,
    alias_count: usize,
}

fn count_tokens(line: &[u8]) -> usize {
    line.split(u8::is_ascii_whitespace)
        .filter(|tok| !tok.is_empty())
        .count()
}

fn aliases_of<'r>(name: &'r [u8], rows: &'r [NisObject]) -> impl Iterator<Item = &'r [u8]> + 'r {
    rows.iter()
        .filter_map(alias_of)
        .filter(move |alias| *alias != name)
}

fn write_layout(header: &Header<'_>, rows: &[NisObject], buffer: &mut [u8]) -> Option<Layout> {
    let mut bump = Bump::new(buffer);

    let name = bump.push_cstr(header.name)?;
    let protocol = bump.push_cstr(header.protocol)?;

    let line_start = bump.used;
    for alias in aliases_of(header.name, rows) {
        bump.push_alias(alias)?;
    }
    let line_end = bump.push_nul()?;

    let alias_count = count_tokens(&bump.buf[line_start..line_end]);
    let alias_table = bump.reserve_aligned(PTR_ALIGN, (alias_count + 1) * PTR_SIZE)?;

    let mut slot = alias_table;
    let mut pos = line_start;
    while pos < line_end {
        while pos < line_end && bump.buf[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos == line_end {
            break;
        }
        let start = pos;
        while pos < line_end && !bump.buf[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos < line_end {
            bump.buf[pos] = 0;
            pos += 1;
        }
        let addr = bump.base + start;
        bump.write_word(slot, addr);
        slot += PTR_SIZE;
    }
    bump.write_word(slot, 0);

    Some(Layout {
        name,
        protocol,
        alias_table,
        alias_count,
    })
}

/// Minimum buffer length for `header`/`rows` at address `base`.
fn required_len(header: &Header<'_>, rows: &[NisObject], base: usize) -> usize {
    let mut used = header.name.len() + 1 + header.protocol.len() + 1;
    let mut alias_count = 0;
    for alias in aliases_of(header.name, rows) {
        used += 1 + alias.len();
        alias_count += count_tokens(alias);
    }
    used += 1;
    used += padding_for(base.wrapping_add(used), PTR_ALIGN);
    used + (alias_count + 1) * PTR_SIZE
}

fn pack_fields<'b>(
    header: &Header<'_>,
    rows: &[NisObject],
    buffer: &'b mut [u8],
) -> Result<ServiceEntry<'b>, InsufficientSpace> {
    let base = buffer.as_ptr() as usize;
    let Some(layout) = write_layout(header, rows, buffer) else {
        return Err(InsufficientSpace {
            needed: required_len(header, rows, base),
        });
    };
    let buf: &'b [u8] = buffer;
    Ok(ServiceEntry {
        buf,
        base,
        name: layout.name,
        protocol: layout.protocol,
        port: header.port,
        alias_table: layout.alias_table,
        alias_count: layout.alias_count,
    })
}

// ---------------------------------------------------------------------------
// Typed view
// ---------------------------------------------------------------------------

/// A service record living inside the caller's buffer.
///
/// Valid as long as the buffer is neither freed nor modified, which the
/// borrow enforces.
#[derive(Clone)]
pub struct ServiceEntry<'b> {
    buf: &'b [u8],
    base: usize,
    name: Range<usize>,
    protocol: Range<usize>,
    port: u16,
    alias_table: usize,
    alias_count: usize,
}

impl<'b> ServiceEntry<'b> {
    pub fn name(&self) -> &'b [u8] {
        &self.buf[self.name.clone()]
    }

    pub fn protocol(&self) -> &'b [u8] {
        &self.buf[self.protocol.clone()]
    }

    /// Port in host byte order.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Port in network byte order, as stored in `servent.s_port`.
    pub fn port_be(&self) -> u16 {
        self.port.to_be()
    }

    pub fn aliases(&self) -> Aliases<'b> {
        Aliases {
            buf: self.buf,
            base: self.base,
            slot: self.alias_table,
            left: self.alias_count,
        }
    }

    pub fn alias_count(&self) -> usize {
        self.alias_count
    }

    pub fn name_offset(&self) -> usize {
        self.name.start
    }

    pub fn protocol_offset(&self) -> usize {
        self.protocol.start
    }

    /// Offset of the NULL-terminated slot table.
    pub fn alias_table_offset(&self) -> usize {
        self.alias_table
    }

    /// Bytes of the buffer occupied by the record.
    pub fn packed_len(&self) -> usize {
        self.alias_table + (self.alias_count + 1) * PTR_SIZE
    }

    pub fn to_record(&self) -> ServiceRecord {
        ServiceRecord {
            name: String::from_utf8_lossy(self.name()).into_owned(),
            aliases: self
                .aliases()
                .map(|a| String::from_utf8_lossy(a).into_owned())
                .collect(),
            port: self.port,
            protocol: String::from_utf8_lossy(self.protocol()).into_owned(),
        }
    }
}

impl fmt::Debug for ServiceEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("name", &String::from_utf8_lossy(self.name()))
            .field("protocol", &String::from_utf8_lossy(self.protocol()))
            .field("port", &self.port)
            .field("alias_count", &self.alias_count)
            .finish()
    }
}

/// Walks the slot table of a [`ServiceEntry`].
pub struct Aliases<'b> {
    buf: &'b [u8],
    base: usize,
    slot: usize,
    left: usize,
}

impl<'b> Iterator for Aliases<'b> {
    type Item = &'b [u8];

    fn next(&mut self) -> Option<&'b [u8]> {
        if self.left == 0 {
            return None;
        }
        let raw = self.buf.get(self.slot..self.slot + PTR_SIZE)?;
        let addr = usize::from_ne_bytes(raw.try_into().ok()?);
        let start = addr.checked_sub(self.base)?;
        let text = until_nul(self.buf.get(start..)?);
        self.slot += PTR_SIZE;
        self.left -= 1;
        Some(text)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.left))
    }
}

/// Owned copy of a packed record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub aliases: Vec<String>,
    pub port: u16,
    pub protocol: String,
}
