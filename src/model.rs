// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration bound to a [`crate::Slave`] instance: address windows, per-register
//! value bounds, function-code gating and the data-backing callbacks.

/// An address window `{ start, count }` understood by the address validator.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressWindow {
    pub start: u16,
    pub count: u16,
}

impl AddressWindow {
    #[must_use]
    pub const fn new(start: u16, count: u16) -> Self {
        Self { start, count }
    }

    /// `true` iff `[addr, addr + count)` lies entirely inside the window.
    ///
    /// Used both for multi-item reads/writes and, with `count == 1`, for the
    /// single-address form required by `WriteSingleCoil` / `WriteSingleHoldingRegister`.
    #[must_use]
    pub const fn contains_run(&self, addr: u16, count: u16) -> bool {
        addr as u32 >= self.start as u32
            && addr as u32 + count as u32 <= self.start as u32 + self.count as u32
    }

    /// Absolute address relative to the window start.
    #[must_use]
    pub const fn relative(&self, addr: u16) -> u16 {
        addr - self.start
    }
}

/// Per-function-code enable flags. A gated-off function behaves exactly like
/// an unrecognised one: `ILLEGAL_FUNCTION_CODE`.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionGates {
    pub read_coils: bool,
    pub read_discrete_inputs: bool,
    pub read_holding_registers: bool,
    pub read_input_registers: bool,
    pub write_single_coil: bool,
    pub write_single_holding_register: bool,
    pub write_multiple_coils: bool,
    pub write_multiple_holding_registers: bool,
}

impl Default for FunctionGates {
    fn default() -> Self {
        Self {
            read_coils: true,
            read_discrete_inputs: true,
            read_holding_registers: true,
            read_input_registers: true,
            write_single_coil: true,
            write_single_holding_register: true,
            write_multiple_coils: true,
            write_multiple_holding_registers: true,
        }
    }
}

/// The capability interface bound to a [`DataModel`]: four reads, two writes.
///
/// Counts for the bit-oriented methods are `i16` and counts for the
/// word-oriented methods are `u16`, mirroring the two historically distinct
/// call sites this contract was distilled from. Callers never pass a count
/// exceeding `2000` (enforced by the address validator before dispatch).
pub trait DataStore {
    /// Fill `out` with `count` coils starting at `start`, LSB-first.
    fn read_coils(&mut self, start: u16, count: i16, out: &mut [u8]);
    /// Fill `out` with `count` discrete inputs starting at `start`, LSB-first.
    fn read_discrete_inputs(&mut self, start: u16, count: i16, out: &mut [u8]);
    /// Fill `out` with `count` big-endian input register words starting at `start`.
    fn read_input_registers(&mut self, start: u16, count: u16, out: &mut [u8]);
    /// Fill `out` with `count` big-endian holding register words starting at `start`.
    fn read_holding_registers(&mut self, start: u16, count: u16, out: &mut [u8]);
    /// Write `count` big-endian holding register words from `data` starting at `start`.
    fn write_holding_registers(&mut self, start: u16, count: u16, data: &[u8]);
    /// Write `count` packed coil bits from `data` starting at `start`.
    fn write_coils(&mut self, start: u16, count: i16, data: &[u8]);
}

/// Configuration bound at [`crate::Slave::new`] time: ranges, per-register value
/// bounds, function gating, and the store that backs reads and writes.
pub struct DataModel<'a, D> {
    pub coils: AddressWindow,
    pub discrete_inputs: AddressWindow,
    pub input_registers: AddressWindow,
    pub holding_registers: AddressWindow,
    /// Lower bound per holding register, indexed relative to `holding_registers.start`.
    pub holding_register_lower: &'a [i16],
    /// Upper bound per holding register, indexed relative to `holding_registers.start`.
    pub holding_register_upper: &'a [i16],
    pub gates: FunctionGates,
    pub store: D,
}
