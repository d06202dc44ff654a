// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-coil wire values and LSB-first bit packing for coil / discrete-input responses.

use crate::error::Error;

/// Turn a bool into a single-coil wire value.
#[must_use]
pub const fn bool_to_u16_coil(state: bool) -> u16 {
    if state { 0xFF00 } else { 0x0000 }
}

/// Turn a single-coil wire value into a boolean value.
pub const fn u16_coil_to_bool(coil: u16) -> Result<bool, Error> {
    match coil {
        0xFF00 => Ok(true),
        0x0000 => Ok(false),
        _ => Err(Error::CoilValue(coil)),
    }
}

/// Pack an iterator of coil states into `bytes`, LSB first within each byte.
///
/// Returns the number of bytes used to hold the packed coils.
pub fn pack_coils(coils: impl IntoIterator<Item = bool>, bytes: &mut [u8]) -> Result<usize, Error> {
    let mut count = 0usize;
    for coil in coils {
        let Some(byte) = bytes.get_mut(count / 8) else {
            return Err(Error::BufferSize);
        };
        *byte |= u8::from(coil) << (count % 8);
        count += 1;
    }
    Ok(count.div_ceil(8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_bool_to_coil() {
        assert_eq!(bool_to_u16_coil(true), 0xFF00);
        assert_eq!(bool_to_u16_coil(false), 0x0000);
    }

    #[test]
    fn convert_coil_to_bool() {
        assert!(u16_coil_to_bool(0xFF00).unwrap());
        assert!(!u16_coil_to_bool(0x0000).unwrap());
        assert_eq!(
            u16_coil_to_bool(0x1234).err().unwrap(),
            Error::CoilValue(0x1234)
        );
    }

    #[test]
    fn pack_coils_into_byte_array() {
        assert_eq!(pack_coils([], &mut []).unwrap(), 0);
        assert_eq!(pack_coils([], &mut [0, 0]).unwrap(), 0);
        assert_eq!(pack_coils([true; 2], &mut []).err().unwrap(), Error::BufferSize);

        let buff = &mut [0];
        assert_eq!(pack_coils([true], buff).unwrap(), 1);
        assert_eq!(buff, &[0b_1]);

        let buff = &mut [0];
        assert_eq!(pack_coils([false, true], buff).unwrap(), 1);
        assert_eq!(buff, &[0b_10]);

        let buff = &mut [0];
        assert_eq!(pack_coils([true; 8], buff).unwrap(), 1);
        assert_eq!(buff, &[0b_1111_1111]);

        let buff = &mut [0, 0];
        assert_eq!(pack_coils([true; 9], buff).unwrap(), 2);
        assert_eq!(buff, &[0xff, 1]);
    }
}
