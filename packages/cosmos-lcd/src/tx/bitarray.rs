use cosmos_sdk_proto::cosmos::crypto::multisig::v1beta1 as proto;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// Space efficient bit array used to mark which members of a multisig signed.
///
/// Bits are stored most significant first inside each byte.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompactBitArray {
    /// Number of bits used in the last byte, 0 when the last byte is full.
    pub extra_bits_stored: u32,
    #[serde_as(as = "Base64")]
    pub elems: Vec<u8>,
}

impl CompactBitArray {
    /// All-false array holding `bits` entries.
    pub fn from_bits(bits: usize) -> Self {
        CompactBitArray {
            extra_bits_stored: (bits % 8) as u32,
            elems: vec![0; (bits + 7) / 8],
        }
    }

    /// Never more than the bits held by `elems`, whatever `extra_bits_stored` claims.
    pub fn len(&self) -> usize {
        let capacity = self.elems.len() * 8;
        match self.extra_bits_stored {
            0 => capacity,
            extra => (self.elems.len().saturating_sub(1) * 8)
                .saturating_add(extra as usize)
                .min(capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Out of range indices read as false.
    pub fn get_index(&self, index: usize) -> bool {
        if index >= self.len() {
            return false;
        }
        self.elems[index / 8] & mask(index) != 0
    }

    /// Returns false, leaving the array untouched, for out of range indices.
    pub fn set_index(&mut self, index: usize, value: bool) -> bool {
        if index >= self.len() {
            return false;
        }
        if value {
            self.elems[index / 8] |= mask(index);
        } else {
            self.elems[index / 8] &= !mask(index);
        }
        true
    }

    /// Number of set bits strictly before `index`.
    ///
    /// This is the position of a member's signature inside a multisignature.
    pub fn num_true_bits_before(&self, index: usize) -> usize {
        let index = index.min(self.len());
        let full_bytes = index / 8;
        let whole: usize = self.elems[..full_bytes]
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .sum();
        let partial = match index % 8 {
            0 => 0,
            rem => (self.elems[full_bytes] & !(0xffu8 >> rem)).count_ones() as usize,
        };
        whole + partial
    }

    pub fn to_proto(&self) -> proto::CompactBitArray {
        proto::CompactBitArray {
            extra_bits_stored: self.extra_bits_stored,
            elems: self.elems.clone(),
        }
    }

    pub fn from_proto(proto: proto::CompactBitArray) -> Self {
        CompactBitArray {
            extra_bits_stored: proto.extra_bits_stored,
            elems: proto.elems,
        }
    }
}

fn mask(index: usize) -> u8 {
    0x80 >> (index % 8)
}
