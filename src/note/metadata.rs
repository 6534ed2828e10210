//! Length-prefixed metadata blocks and their textual key/value bodies.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::sync::OnceLock;

use byteorder::{LittleEndian, ReadBytesExt};
use regex::Regex;

use super::error::Result;

static PARAM_PATTERN: OnceLock<Regex> = OnceLock::new();

// Keys and values contain no '<', '>' or ':'.
fn param_regex() -> &'static Regex {
    PARAM_PATTERN
        .get_or_init(|| Regex::new(r"<([^:<>]+):([^:<>]*)>").expect("invalid metadata pattern"))
}

/// Read the length-prefixed metadata block at `offset` and parse its body.
///
/// Block layout is a 4-byte little-endian length followed by that many bytes
/// of UTF-8 text. Offset 0 denotes an absent block and yields an empty map.
/// Invalid UTF-8 is tolerated; bytes that match no `<KEY:VALUE>` occurrence
/// contribute no entries.
pub(crate) fn read_block<R: Read + Seek>(
    source: &mut R,
    offset: u64,
) -> Result<HashMap<String, String>> {
    if offset == 0 {
        return Ok(HashMap::new());
    }
    source.seek(SeekFrom::Start(offset))?;
    let len = source.read_u32::<LittleEndian>()?;
    let mut body = vec![0u8; len as usize];
    source.read_exact(&mut body)?;
    Ok(parse_params(&String::from_utf8_lossy(&body)))
}

/// Parse `<KEY:VALUE>` occurrences into a map. The first binding of a
/// duplicated key wins.
pub(crate) fn parse_params(body: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for caps in param_regex().captures_iter(body) {
        params
            .entry(caps[1].to_string())
            .or_insert_with(|| caps[2].to_string());
    }
    params
}
