//! Runtime call construction: a pallet index, a call index and the
//! SCALE-encoded argument tuple.

use parity_scale_codec::{Decode, Encode};

/// An unsigned runtime call, ready to be wrapped in an extrinsic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub pallet_index: u8,
    pub call_index: u8,
    pub args: Vec<u8>,
}

impl Call {
    pub fn new(pallet_index: u8, call_index: u8) -> Self {
        Self {
            pallet_index,
            call_index,
            args: Vec::new(),
        }
    }

    /// Append one SCALE-encoded argument. Arguments must be appended in the
    /// order the runtime call declares them.
    pub fn arg<A: Encode>(mut self, value: A) -> Self {
        value.encode_to(&mut self.args);
        self
    }
}

impl Encode for Call {
    fn encode_to<T: parity_scale_codec::Output + ?Sized>(&self, dest: &mut T) {
        dest.push_byte(self.pallet_index);
        dest.push_byte(self.call_index);
        dest.write(&self.args);
    }
}

impl Decode for Call {
    fn decode<I: parity_scale_codec::Input>(
        input: &mut I,
    ) -> Result<Self, parity_scale_codec::Error> {
        let pallet_index = input.read_byte()?;
        let call_index = input.read_byte()?;
        let mut args = match input.remaining_len()? {
            Some(len) => vec![0u8; len],
            None => return Err("call arguments require a known input length".into()),
        };
        input.read(&mut args)?;
        Ok(Call {
            pallet_index,
            call_index,
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId32, MultiAddress};
    use parity_scale_codec::Compact;

    #[test]
    fn call_encoding_is_indices_then_args() {
        let dest = MultiAddress::Id(AccountId32([1u8; 32]));
        let call = Call::new(6, 0).arg(dest).arg(Compact(500u128));
        let encoded = call.encode();
        assert_eq!(encoded[0], 6);
        assert_eq!(encoded[1], 0);
        // MultiAddress::Id is 33 bytes, Compact(500) is 2 bytes.
        assert_eq!(encoded.len(), 2 + 33 + 2);
    }

    #[test]
    fn call_round_trip() {
        let call = Call::new(3, 9).arg(42u64);
        let decoded = Call::decode(&mut call.encode().as_slice()).unwrap();
        assert_eq!(decoded, call);
    }
}
