// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A plain in-memory [`DataStore`] backed by byte- and word-arrays, as described
//! for the default test [`crate::model::DataModel`].

use byteorder::{BigEndian, ByteOrder};

use crate::bits::{read_bits, write_bits};
use crate::frame::pack_coils;
use crate::model::DataStore;

/// Reference [`DataStore`] backed by plain slices.
///
/// `coils` and `discrete_inputs` are bit-addressable (bit `i` of logical
/// address `a` at byte `a/8`, bit `a%8`) and must be sized `ceil(count/8) + 1`
/// per [`crate::bits`]'s one-byte overshoot requirement.
pub struct ArrayDataStore<'a> {
    pub coils: &'a mut [u8],
    pub discrete_inputs: &'a [u8],
    pub input_registers: &'a [i16],
    pub holding_registers: &'a mut [i16],
}

impl DataStore for ArrayDataStore<'_> {
    fn read_coils(&mut self, start: u16, count: i16, out: &mut [u8]) {
        read_packed_bits(self.coils, start, count, out);
    }

    fn read_discrete_inputs(&mut self, start: u16, count: i16, out: &mut [u8]) {
        read_packed_bits(self.discrete_inputs, start, count, out);
    }

    fn read_input_registers(&mut self, start: u16, count: u16, out: &mut [u8]) {
        read_words(self.input_registers, start, count, out);
    }

    fn read_holding_registers(&mut self, start: u16, count: u16, out: &mut [u8]) {
        read_words(self.holding_registers, start, count, out);
    }

    fn write_holding_registers(&mut self, start: u16, count: u16, data: &[u8]) {
        for i in 0..count as usize {
            self.holding_registers[start as usize + i] = BigEndian::read_i16(&data[2 * i..2 * i + 2]);
        }
    }

    fn write_coils(&mut self, start: u16, count: i16, data: &[u8]) {
        let mut remaining = count;
        let mut bit = start as usize;
        let mut byte_idx = 0usize;
        while remaining > 0 {
            let width = remaining.min(8) as u8;
            let value = u16::from(data[byte_idx]);
            write_bits(self.coils, bit, width, value);
            bit += width as usize;
            remaining -= i16::from(width);
            byte_idx += 1;
        }
    }
}

fn read_packed_bits(store: &[u8], start: u16, count: i16, out: &mut [u8]) {
    let count = count as u16;
    let bits = (0..count).map(|i| read_bits(store, (start + i) as usize, 1) != 0);
    let _ = pack_coils(bits, out);
}

fn read_words(store: &[i16], start: u16, count: u16, out: &mut [u8]) {
    for i in 0..count as usize {
        BigEndian::write_i16(&mut out[2 * i..2 * i + 2], store[start as usize + i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_coils_then_read_back_matches() {
        let mut coils = [0u8, 0, 0];
        let mut holding = [0i16; 4];
        let mut store = ArrayDataStore {
            coils: &mut coils,
            discrete_inputs: &[0b1110_1111],
            input_registers: &[1, 2, 3],
            holding_registers: &mut holding,
        };
        store.write_coils(2, 3, &[0b0000_0101]);
        let mut out = [0u8];
        store.read_coils(2, 3, &mut out);
        assert_eq!(out[0], 0b0000_0101);
    }

    #[test]
    fn read_discrete_inputs_packs_lsb_first() {
        let mut coils = [0u8];
        let mut holding = [0i16; 1];
        let mut store = ArrayDataStore {
            coils: &mut coils,
            discrete_inputs: &[0xEF, 0x00],
            input_registers: &[],
            holding_registers: &mut holding,
        };
        let mut out = [0u8];
        store.read_discrete_inputs(0, 8, &mut out);
        assert_eq!(out[0], 0xEF);
    }

    #[test]
    fn write_holding_register_round_trips() {
        let mut coils = [0u8];
        let mut holding = [5i16, 6, 7, 0];
        let mut store = ArrayDataStore {
            coils: &mut coils,
            discrete_inputs: &[0],
            input_registers: &[],
            holding_registers: &mut holding,
        };
        let mut word = [0u8; 2];
        BigEndian::write_i16(&mut word, 200);
        store.write_holding_registers(1, 1, &word);
        let mut out = [0u8; 2];
        store.read_holding_registers(1, 1, &mut out);
        assert_eq!(BigEndian::read_i16(&out), 200);
    }
}
