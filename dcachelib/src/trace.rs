use crate::error::TraceError;
use crate::hex::HEX_LOOKUP;
use crate::splitter::{AccessEvent, AccessReason};
use crate::stats::AccessKind;

/// Every record is exactly this long, newline included:
/// `IIIIIIIIIIIIIIII AAAAAAAAAAAAAAAA K SSS\n`
pub const RECORD_SIZE: usize = 40;
const IP_OFFSET: usize = 0;
const ADDRESS_OFFSET: usize = 17;
const HEX_DIGITS: usize = 16;
const KIND_OFFSET: usize = ADDRESS_OFFSET + HEX_DIGITS + 1;
const SIZE_OFFSET: usize = KIND_OFFSET + 2;
const SIZE_DIGITS: usize = 3;
/// Largest access size the record format can describe
pub const MAX_RECORD_SIZE: u32 = 999;

/// Iterates over the access events in a trace buffer, each paired with its record number
///
/// The buffer must hold whole records only, which is checked up front. Individual records are
/// checked as they are read, and the iterator yields the error in place of a bad record. Record
/// numbers count from 0 over the whole buffer, so they still locate an event after filtering.
///
/// # Arguments
///
/// * `bytes`: The trace, usually a memory mapped file
///
/// returns: Result<impl Iterator<Item=Result<(usize, AccessEvent), TraceError>>, TraceError>
pub fn records(bytes: &[u8]) -> Result<impl Iterator<Item = Result<(usize, AccessEvent), TraceError>> + '_, TraceError> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(TraceError::PartialRecord(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(RECORD_SIZE)
        .enumerate()
        .map(|(record, line)| parse_record(record, line).map(|event| (record, event))))
}

/// Parses one record. `record` is only used to label errors.
pub fn parse_record(record: usize, line: &[u8]) -> Result<AccessEvent, TraceError> {
    let invalid = |field| TraceError::InvalidField { record, field };
    if line.len() != RECORD_SIZE
        || line[HEX_DIGITS] != b' '
        || line[KIND_OFFSET - 1] != b' '
        || line[SIZE_OFFSET - 1] != b' '
        || line[RECORD_SIZE - 1] != b'\n'
    {
        return Err(invalid("layout"));
    }
    let ip = hex_field(&line[IP_OFFSET..IP_OFFSET + HEX_DIGITS]).ok_or_else(|| invalid("instruction pointer"))?;
    let address = hex_field(&line[ADDRESS_OFFSET..ADDRESS_OFFSET + HEX_DIGITS]).ok_or_else(|| invalid("address"))?;
    let size_digits = &line[SIZE_OFFSET..SIZE_OFFSET + SIZE_DIGITS];
    if !size_digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid("size"));
    }
    let size = parse_size(size_digits.try_into().map_err(|_| invalid("size"))?) as u32;
    let (kind, reason) = match line[KIND_OFFSET] {
        b'R' => (AccessKind::Load, AccessReason::Demand),
        b'W' => (AccessKind::Store, AccessReason::Demand),
        b'P' => (AccessKind::Load, AccessReason::Prefetch),
        _ => return Err(invalid("access kind")),
    };
    Ok(AccessEvent { address, size, kind, reason, ip })
}

fn hex_field(field: &[u8]) -> Option<u64> {
    if !field.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    Some(parse_address(field.try_into().ok()?))
}

/// Parses a 64-bit value from a 16 byte hexadecimal field
///
/// Parsing with the standard library becomes the bottleneck for small caches, so this uses a
/// lookup table of 2^16 entries mapping each pair of hex digits straight to a byte. The table is
/// generated by build.rs. Only 256 entries of it are touched for well formed input.
///
/// No checks are made on the digits, callers validate first.
///
/// # Arguments
///
/// * `buf`: The byte buffer
///
/// returns: u64
///
/// # Examples
///
/// ```
/// use dcachelib::trace::parse_address;
/// let address = b"000000000000000A";
/// assert_eq!(parse_address(&address), 10)
/// ```
pub fn parse_address(buf: &[u8; 16]) -> u64 {
    let mut res: u64 = 0;
    let mut x = 0;
    while x < 15 {
        res <<= 8;
        res |= HEX_LOOKUP[buf[x] as usize][buf[x + 1] as usize] as u64;
        x += 2;
    }
    res
}

/// Parses the three digit decimal size field
///
/// # Examples
///
/// ```
/// use dcachelib::trace::parse_size;
/// let size = b"010";
/// assert_eq!(parse_size(&size), 10);
/// ```
pub fn parse_size(buf: &[u8; 3]) -> u16 {
    let mut res = (buf[2] - b'0') as u16;
    res += 10u16 * (buf[1] - b'0') as u16;
    res += 100u16 * (buf[0] - b'0') as u16;
    res
}

/// Formats an event as a trace record
///
/// The size field holds three decimal digits, larger accesses cannot be written.
pub fn format_record(event: &AccessEvent) -> Result<String, TraceError> {
    if event.size > MAX_RECORD_SIZE {
        return Err(TraceError::SizeTooLarge { size: event.size, max: MAX_RECORD_SIZE });
    }
    let kind = match (event.reason, event.kind) {
        (AccessReason::Prefetch, _) => 'P',
        (AccessReason::Demand, AccessKind::Load) => 'R',
        (AccessReason::Demand, AccessKind::Store) => 'W',
    };
    Ok(format!("{:016x} {:016x} {} {:03}\n", event.ip, event.address, kind, event.size))
}
