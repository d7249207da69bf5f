//! BER-TLV codec and the tagged-value store built on top of it
//!
//! Coding follows EMV Book 3, Annex B: tags are one or more bytes (a first
//! byte with bits 1-5 all set announces a multi-byte tag continuing while
//! bit 8 is set), lengths are either a single byte below 0x80 or 0x81-0x83
//! followed by one to three length bytes.

use std::ptr;

use thiserror::Error;

/// Numeric BER tag, the big-endian value of the tag bytes (`0x9F46`)
pub type Tag = u32;

/// Constructed objects nested deeper than this are rejected
const MAX_DEPTH: usize = 16;

/// TLV decoding failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TlvError {
    /// Input ended inside a tag, length or value field
    #[error("data truncated at offset {0}")]
    Truncated(usize),
    /// Tag does not fit into four bytes
    #[error("tag at offset {0} is longer than 4 bytes")]
    TagTooLong(usize),
    /// Indefinite or oversized length field
    #[error("unsupported length encoding at offset {0}")]
    BadLength(usize),
    /// Constructed objects nested too deeply
    #[error("constructed objects nested deeper than {} levels", MAX_DEPTH)]
    TooDeep,
}

/// Does this tag denote a constructed data object?
pub fn is_constructed(tag: Tag) -> bool {
    tag_bytes(tag)[0] & 0x20 != 0
}

/// Big-endian tag bytes without leading zero bytes
pub fn tag_bytes(tag: Tag) -> Vec<u8> {
    let bytes = tag.to_be_bytes();
    let skip = bytes.iter().take(3).take_while(|&&b| b == 0).count();
    bytes[skip..].to_vec()
}

/// A single data object: tag, raw value and, for constructed tags, the
/// objects decoded from that value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tag: Tag,
    value: Vec<u8>,
    children: Vec<Tlv>,
}

impl Tlv {
    /// Create a primitive data object
    pub fn new(tag: Tag, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            value: value.into(),
            children: Vec::new(),
        }
    }

    /// Create a constructed data object owning `children`
    pub fn constructed(tag: Tag, children: Vec<Tlv>) -> Self {
        let value = children.iter().flat_map(Tlv::encode).collect();
        Self {
            tag,
            value,
            children,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn children(&self) -> &[Tlv] {
        &self.children
    }

    pub fn is_constructed(&self) -> bool {
        is_constructed(self.tag)
    }

    /// Encode as tag, length and value
    pub fn encode(&self) -> Vec<u8> {
        let mut out = tag_bytes(self.tag);
        encode_length(self.value.len(), &mut out);
        out.extend_from_slice(&self.value);
        out
    }
}

/// Longest value a three byte length field can carry
const MAX_VALUE_LEN: usize = 0xFF_FFFF;

fn encode_length(len: usize, out: &mut Vec<u8>) {
    debug_assert!(len <= MAX_VALUE_LEN, "value of {len} bytes does not fit a BER-TLV length field");
    match len {
        0..=0x7F => out.push(len as u8),
        0x80..=0xFF => out.extend_from_slice(&[0x81, len as u8]),
        0x100..=0xFFFF => out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]),
        _ => out.extend_from_slice(&[0x83, (len >> 16) as u8, (len >> 8) as u8, len as u8]),
    }
}

fn decode_all(data: &[u8], base: usize, depth: usize) -> Result<Vec<Tlv>, TlvError> {
    if depth > MAX_DEPTH {
        return Err(TlvError::TooDeep);
    }

    let mut objects = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        // 00 and FF are allowed as filler before, between and after objects
        if data[pos] == 0x00 || data[pos] == 0xFF {
            pos += 1;
            continue;
        }

        let (tlv, used) = decode_one(&data[pos..], base + pos, depth)?;
        objects.push(tlv);
        pos += used;
    }
    Ok(objects)
}

/// Read one tag, returning it and the number of bytes it occupies
fn read_tag(data: &[u8], offset: usize) -> Result<(Tag, usize), TlvError> {
    let first = *data.first().ok_or(TlvError::Truncated(offset))?;
    let mut tag = Tag::from(first);
    let mut pos = 1;

    if first & 0x1F == 0x1F {
        loop {
            if pos == 4 {
                return Err(TlvError::TagTooLong(offset));
            }
            let b = *data.get(pos).ok_or(TlvError::Truncated(offset + pos))?;
            tag = (tag << 8) | Tag::from(b);
            pos += 1;
            if b & 0x80 == 0 {
                break;
            }
        }
    }

    Ok((tag, pos))
}

/// Parse a list of bare tags, as used by the static data authentication tag list
pub fn parse_tag_list(data: &[u8]) -> Result<Vec<Tag>, TlvError> {
    let mut tags = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let (tag, used) = read_tag(&data[pos..], pos)?;
        tags.push(tag);
        pos += used;
    }
    Ok(tags)
}

fn decode_one(data: &[u8], offset: usize, depth: usize) -> Result<(Tlv, usize), TlvError> {
    let (tag, mut pos) = read_tag(data, offset)?;

    let len_byte = *data.get(pos).ok_or(TlvError::Truncated(offset + pos))?;
    pos += 1;

    let len = if len_byte & 0x80 == 0 {
        usize::from(len_byte)
    } else {
        let count = usize::from(len_byte & 0x7F);
        if count == 0 || count > 3 {
            return Err(TlvError::BadLength(offset + pos - 1));
        }
        let bytes = data
            .get(pos..pos + count)
            .ok_or(TlvError::Truncated(offset + pos))?;
        pos += count;
        bytes.iter().fold(0usize, |acc, &b| (acc << 8) | usize::from(b))
    };

    let value = data
        .get(pos..pos + len)
        .ok_or(TlvError::Truncated(offset + pos))?;

    let children = if is_constructed(tag) {
        decode_all(value, offset + pos, depth + 1)?
    } else {
        Vec::new()
    };

    let tlv = Tlv {
        tag,
        value: value.to_vec(),
        children,
    };
    Ok((tlv, pos + len))
}

/// What a [`Store::visit`] callback wants to happen next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    /// Do not descend into the children of the current node
    SkipChildren,
}

/// Ordered forest of data objects collected during a transaction.
///
/// Duplicate tags are kept; lookups search depth-first in insertion order
/// and return the first match, [`Store::get_after`] continues from a
/// previous match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    roots: Vec<Tlv>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a card response (one or more concatenated objects)
    pub fn parse(data: &[u8]) -> Result<Self, TlvError> {
        Ok(Self {
            roots: decode_all(data, 0, 0)?,
        })
    }

    /// Insert a subtree, taking ownership of it
    pub fn add(&mut self, tlv: Tlv) {
        self.roots.push(tlv);
    }

    /// Move every root of `other` into this store
    pub fn extend(&mut self, other: Store) {
        self.roots.extend(other.roots);
    }

    pub fn roots(&self) -> &[Tlv] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// First object carrying `tag`, searching nested objects too
    pub fn get(&self, tag: Tag) -> Option<&Tlv> {
        self.get_all(tag).next()
    }

    /// Next object carrying `tag` after `previous`
    ///
    /// `previous` is matched by identity, so it must be a reference obtained
    /// from this store.
    pub fn get_after(&self, tag: Tag, previous: &Tlv) -> Option<&Tlv> {
        self.get_all(tag)
            .skip_while(|tlv| !ptr::eq(*tlv, previous))
            .nth(1)
    }

    /// Every object carrying `tag`, in depth-first order
    pub fn get_all(&self, tag: Tag) -> impl Iterator<Item = &Tlv> + '_ {
        self.iter().filter(move |tlv| tlv.tag == tag)
    }

    /// Value of the first object carrying `tag`
    pub fn value(&self, tag: Tag) -> Option<&[u8]> {
        self.get(tag).map(Tlv::value)
    }

    /// Depth-first, pre-order iterator over all nodes
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![self.roots.iter()],
        }
    }

    /// Visit every node depth-first, pre-order, constructed nodes included
    pub fn visit<F>(&self, mut f: F)
    where
        F: FnMut(&Tlv) -> Walk,
    {
        let mut stack = vec![self.roots.iter()];
        while let Some(level) = stack.last_mut() {
            match level.next() {
                Some(tlv) => {
                    if f(tlv) == Walk::Continue && !tlv.children.is_empty() {
                        stack.push(tlv.children.iter());
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }
    }
}

impl From<Vec<Tlv>> for Store {
    fn from(roots: Vec<Tlv>) -> Self {
        Self { roots }
    }
}

impl<'a> IntoIterator for &'a Store {
    type Item = &'a Tlv;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`Store::iter`]
#[derive(Debug)]
pub struct Iter<'a> {
    stack: Vec<std::slice::Iter<'a, Tlv>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Tlv;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(tlv) => {
                    self.stack.push(tlv.children.iter());
                    return Some(tlv);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
