//! Digest engine selected by the EMV hash algorithm indicator

use digest::DynDigest;

/// Hash algorithm named by an EMV hash algorithm indicator (Book 2, Annex B3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
}

impl HashAlgorithm {
    /// Map an indicator byte to an algorithm, `None` for unassigned values
    pub const fn from_indicator(indicator: u8) -> Option<Self> {
        match indicator {
            0x01 => Some(Self::Sha1),
            _ => None,
        }
    }

    pub const fn indicator(self) -> u8 {
        match self {
            Self::Sha1 => 0x01,
        }
    }

    /// Length of the digest in bytes
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
        }
    }

    /// Fresh incremental hasher for this algorithm
    pub fn hasher(self) -> Box<dyn DynDigest> {
        match self {
            Self::Sha1 => Box::new(sha1::Sha1::default()),
        }
    }

    /// Digest of the concatenation of `parts`
    pub fn digest<'a, I>(self, parts: I) -> Vec<u8>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut hasher = self.hasher();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().into_vec()
    }
}
