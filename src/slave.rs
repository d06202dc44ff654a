// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The MBAP request processor: `BasicValidator` → `AddressValidator` →
//! per-function-code handler → response bytes.

use byteorder::{BigEndian, ByteOrder};

use crate::bits::packed_len;
use crate::error::Error;
use crate::frame::{u16_coil_to_bool, Exception, FunctionCode};
use crate::model::{DataModel, DataStore};

const MBAP_HEADER_LEN: usize = 7;
const PROTOCOL_ID: u16 = 0;
const UNIT_ID: u8 = 1;
const MAX_MBAP_LENGTH: u16 = 256;

/// Shortest query any in-scope function code can act on: MBAP header, FC,
/// and a 4-byte `StartAddress`/`Count` (or `Address`/`Value`) pair. Handlers
/// for FC 15/16 separately bounds-check their `ByteCount` byte and payload.
const MIN_PDU_QUERY_LEN: usize = MBAP_HEADER_LEN + 5;

/// Upper bound on `Count`, enforced explicitly even though the wire field is `u16`.
const MAX_QUANTITY: u16 = 2000;

/// Largest possible response: MBAP header plus a full-size PDU.
pub const MAX_RESPONSE_LEN: usize = MBAP_HEADER_LEN + 256;

/// Internal dispatch outcome, serialized into the caller's buffer at the edge.
enum Outcome {
    /// Frame-level malformation or cross-unit traffic: no response at all.
    Silent,
    /// A normal response of the given length has already been written.
    Response(usize),
    /// A Modbus exception must be built for the given original function-code byte.
    Exception(Exception),
}

enum BitWindow {
    Coils,
    DiscreteInputs,
}

enum WordWindow {
    Holding,
    Input,
}

/// A Modbus TCP slave bound to a single [`DataModel`].
///
/// `process_request` is the sole entry point: it is a pure function of the
/// query bytes and the bound model, run to completion synchronously with no
/// internal concurrency.
pub struct Slave<'a, D> {
    model: DataModel<'a, D>,
}

impl<'a, D: DataStore> Slave<'a, D> {
    /// Bind `model` to a new slave instance.
    pub fn new(model: DataModel<'a, D>) -> Self {
        Self { model }
    }

    /// Borrow the bound data model.
    pub fn model(&self) -> &DataModel<'a, D> {
        &self.model
    }

    /// Borrow the bound data model mutably.
    pub fn model_mut(&mut self) -> &mut DataModel<'a, D> {
        &mut self.model
    }

    /// Validate, execute and encode a single MBAP query into `response`.
    ///
    /// Returns `Ok(0)` for a silent drop (frame-level malformation, or unit
    /// not addressed to us). Returns `Err(Error::BufferSize)` if `response`
    /// is too small to hold the reply; this never happens when `response` is
    /// at least [`MAX_RESPONSE_LEN`] bytes.
    pub fn process_request(&mut self, query: &[u8], response: &mut [u8]) -> Result<usize, Error> {
        if query.len() < MBAP_HEADER_LEN + 1 || !basic_validation(query) {
            return Ok(0);
        }
        let function_code = FunctionCode::new(query[7]);
        if !matches!(function_code, FunctionCode::Custom(_)) && query.len() < MIN_PDU_QUERY_LEN {
            warn_truncated(query.len());
            return Ok(0);
        }
        match self.dispatch(function_code, query, response)? {
            Outcome::Silent => Ok(0),
            Outcome::Response(len) => Ok(len),
            Outcome::Exception(exception) => build_exception_response(query, exception, response),
        }
    }

    fn dispatch(&mut self, function_code: FunctionCode, query: &[u8], response: &mut [u8]) -> Result<Outcome, Error> {
        match function_code {
            FunctionCode::ReadCoils => self.handle_read_bits(query, response, BitWindow::Coils),
            FunctionCode::ReadDiscreteInputs => self.handle_read_bits(query, response, BitWindow::DiscreteInputs),
            FunctionCode::ReadHoldingRegisters => self.handle_read_words(query, response, WordWindow::Holding),
            FunctionCode::ReadInputRegisters => self.handle_read_words(query, response, WordWindow::Input),
            FunctionCode::WriteSingleCoil => self.handle_write_single_coil(query, response),
            FunctionCode::WriteSingleRegister => self.handle_write_single_holding_register(query, response),
            FunctionCode::WriteMultipleCoils => self.handle_write_multiple_coils(query, response),
            FunctionCode::WriteMultipleRegisters => self.handle_write_multiple_holding_registers(query, response),
            FunctionCode::Custom(fc) => {
                warn_unsupported(fc);
                Ok(Outcome::Exception(Exception::IllegalFunction))
            }
        }
    }

    fn handle_read_bits(
        &mut self,
        query: &[u8],
        response: &mut [u8],
        kind: BitWindow,
    ) -> Result<Outcome, Error> {
        let gate_open = match kind {
            BitWindow::Coils => self.model.gates.read_coils,
            BitWindow::DiscreteInputs => self.model.gates.read_discrete_inputs,
        };
        if !gate_open {
            return Ok(Outcome::Exception(Exception::IllegalFunction));
        }
        let window = match kind {
            BitWindow::Coils => self.model.coils,
            BitWindow::DiscreteInputs => self.model.discrete_inputs,
        };
        let start = BigEndian::read_u16(&query[8..10]);
        let count = BigEndian::read_u16(&query[10..12]);
        if count == 0 || count > MAX_QUANTITY {
            return Ok(Outcome::Exception(Exception::IllegalDataValue));
        }
        if !window.contains_run(start, count) {
            return Ok(Outcome::Exception(Exception::IllegalDataAddress));
        }
        let rel = window.relative(start);
        let byte_count = packed_len(count);
        let total_len = MBAP_HEADER_LEN + 2 + byte_count;
        if response.len() < total_len {
            return Err(Error::BufferSize);
        }
        response[0..8].copy_from_slice(&query[0..8]);
        BigEndian::write_u16(&mut response[4..6], (3 + byte_count) as u16);
        response[8] = byte_count as u8;
        let data = &mut response[9..9 + byte_count];
        match kind {
            BitWindow::Coils => self.model.store.read_coils(rel, count as i16, data),
            BitWindow::DiscreteInputs => self.model.store.read_discrete_inputs(rel, count as i16, data),
        }
        Ok(Outcome::Response(total_len))
    }

    fn handle_read_words(
        &mut self,
        query: &[u8],
        response: &mut [u8],
        kind: WordWindow,
    ) -> Result<Outcome, Error> {
        let gate_open = match kind {
            WordWindow::Holding => self.model.gates.read_holding_registers,
            WordWindow::Input => self.model.gates.read_input_registers,
        };
        if !gate_open {
            return Ok(Outcome::Exception(Exception::IllegalFunction));
        }
        let window = match kind {
            WordWindow::Holding => self.model.holding_registers,
            WordWindow::Input => self.model.input_registers,
        };
        let start = BigEndian::read_u16(&query[8..10]);
        let count = BigEndian::read_u16(&query[10..12]);
        if count == 0 || count > MAX_QUANTITY {
            return Ok(Outcome::Exception(Exception::IllegalDataValue));
        }
        if !window.contains_run(start, count) {
            return Ok(Outcome::Exception(Exception::IllegalDataAddress));
        }
        let rel = window.relative(start);
        let byte_count = 2 * count as usize;
        let total_len = MBAP_HEADER_LEN + 2 + byte_count;
        if response.len() < total_len {
            return Err(Error::BufferSize);
        }
        response[0..8].copy_from_slice(&query[0..8]);
        BigEndian::write_u16(&mut response[4..6], (3 + byte_count) as u16);
        response[8] = byte_count as u8;
        let data = &mut response[9..9 + byte_count];
        match kind {
            WordWindow::Holding => self.model.store.read_holding_registers(rel, count, data),
            WordWindow::Input => self.model.store.read_input_registers(rel, count, data),
        }
        Ok(Outcome::Response(total_len))
    }

    fn handle_write_single_coil(&mut self, query: &[u8], response: &mut [u8]) -> Result<Outcome, Error> {
        if !self.model.gates.write_single_coil {
            return Ok(Outcome::Exception(Exception::IllegalFunction));
        }
        let addr = BigEndian::read_u16(&query[8..10]);
        if !self.model.coils.contains_run(addr, 1) {
            return Ok(Outcome::Exception(Exception::IllegalDataAddress));
        }
        let raw = BigEndian::read_u16(&query[10..12]);
        let Ok(state) = u16_coil_to_bool(raw) else {
            return Ok(Outcome::Exception(Exception::IllegalDataValue));
        };
        let rel = self.model.coils.relative(addr);
        self.model.store.write_coils(rel, 1, &[u8::from(state)]);
        if response.len() < 12 {
            return Err(Error::BufferSize);
        }
        response[0..12].copy_from_slice(&query[0..12]);
        Ok(Outcome::Response(12))
    }

    fn handle_write_single_holding_register(
        &mut self,
        query: &[u8],
        response: &mut [u8],
    ) -> Result<Outcome, Error> {
        if !self.model.gates.write_single_holding_register {
            return Ok(Outcome::Exception(Exception::IllegalFunction));
        }
        let addr = BigEndian::read_u16(&query[8..10]);
        if !self.model.holding_registers.contains_run(addr, 1) {
            return Ok(Outcome::Exception(Exception::IllegalDataAddress));
        }
        let rel = self.model.holding_registers.relative(addr) as usize;
        let value = BigEndian::read_i16(&query[10..12]);
        if value < self.model.holding_register_lower[rel] || value > self.model.holding_register_upper[rel] {
            return Ok(Outcome::Exception(Exception::IllegalDataValue));
        }
        self.model
            .store
            .write_holding_registers(rel as u16, 1, &query[10..12]);
        if response.len() < 12 {
            return Err(Error::BufferSize);
        }
        response[0..12].copy_from_slice(&query[0..12]);
        Ok(Outcome::Response(12))
    }

    fn handle_write_multiple_coils(&mut self, query: &[u8], response: &mut [u8]) -> Result<Outcome, Error> {
        if !self.model.gates.write_multiple_coils {
            return Ok(Outcome::Exception(Exception::IllegalFunction));
        }
        let start = BigEndian::read_u16(&query[8..10]);
        let count = BigEndian::read_u16(&query[10..12]);
        if count == 0 || count > MAX_QUANTITY {
            return Ok(Outcome::Exception(Exception::IllegalDataValue));
        }
        if !self.model.coils.contains_run(start, count) {
            return Ok(Outcome::Exception(Exception::IllegalDataAddress));
        }
        let Some(&byte_count) = query.get(12) else {
            return Ok(Outcome::Silent);
        };
        let expected = packed_len(count);
        let payload_end = 13 + expected;
        if byte_count as usize != expected || query.len() < payload_end {
            return Ok(Outcome::Silent);
        }
        let rel = self.model.coils.relative(start);
        self.model
            .store
            .write_coils(rel, count as i16, &query[13..payload_end]);
        write_multi_ack(query, response, start, count)
    }

    fn handle_write_multiple_holding_registers(
        &mut self,
        query: &[u8],
        response: &mut [u8],
    ) -> Result<Outcome, Error> {
        if !self.model.gates.write_multiple_holding_registers {
            return Ok(Outcome::Exception(Exception::IllegalFunction));
        }
        let start = BigEndian::read_u16(&query[8..10]);
        let count = BigEndian::read_u16(&query[10..12]);
        if count == 0 || count > MAX_QUANTITY {
            return Ok(Outcome::Exception(Exception::IllegalDataValue));
        }
        if !self.model.holding_registers.contains_run(start, count) {
            return Ok(Outcome::Exception(Exception::IllegalDataAddress));
        }
        let Some(&byte_count) = query.get(12) else {
            return Ok(Outcome::Silent);
        };
        let expected = 2 * count as usize;
        let payload_end = 13 + expected;
        if byte_count as usize != expected || query.len() < payload_end {
            return Ok(Outcome::Silent);
        }
        let rel = self.model.holding_registers.relative(start) as usize;
        for i in 0..count as usize {
            let word = BigEndian::read_i16(&query[13 + 2 * i..15 + 2 * i]);
            if word < self.model.holding_register_lower[rel + i] || word > self.model.holding_register_upper[rel + i]
            {
                return Ok(Outcome::Exception(Exception::IllegalDataValue));
            }
        }
        self.model
            .store
            .write_holding_registers(rel as u16, count, &query[13..payload_end]);
        write_multi_ack(query, response, start, count)
    }
}

/// Shared normal-response shape for `WriteMultipleCoils` / `WriteMultipleHoldingRegisters`:
/// MBAP header + FC + echoed (Address, Count), length 12.
fn write_multi_ack(query: &[u8], response: &mut [u8], start: u16, count: u16) -> Result<Outcome, Error> {
    if response.len() < 12 {
        return Err(Error::BufferSize);
    }
    response[0..8].copy_from_slice(&query[0..8]);
    BigEndian::write_u16(&mut response[4..6], 6);
    BigEndian::write_u16(&mut response[8..10], start);
    BigEndian::write_u16(&mut response[10..12], count);
    Ok(Outcome::Response(12))
}

/// `ProtocolId == 0`, `Length <= 256`, `UnitId == 1`; anything else is a silent drop.
fn basic_validation(query: &[u8]) -> bool {
    let protocol_id = BigEndian::read_u16(&query[2..4]);
    let length = BigEndian::read_u16(&query[4..6]);
    let unit_id = query[6];
    if protocol_id != PROTOCOL_ID {
        warn_protocol_id(protocol_id);
        return false;
    }
    if length > MAX_MBAP_LENGTH {
        warn_length(length);
        return false;
    }
    if unit_id != UNIT_ID {
        warn_unit_id(unit_id);
        return false;
    }
    true
}

/// Bytes 0..7 preserved verbatim, Length forced to 3, FC `| 0x80`, single exception byte.
fn build_exception_response(query: &[u8], exception: Exception, response: &mut [u8]) -> Result<usize, Error> {
    if query.len() < 8 || response.len() < 9 {
        return Err(Error::BufferSize);
    }
    response[0..7].copy_from_slice(&query[0..7]);
    BigEndian::write_u16(&mut response[4..6], 3);
    response[7] = query[7] | 0x80;
    response[8] = exception as u8;
    Ok(9)
}

#[cfg(feature = "log")]
fn warn_protocol_id(id: u16) {
    log::warn!("dropping request: wrong protocol id {id}");
}
#[cfg(not(feature = "log"))]
fn warn_protocol_id(_id: u16) {}

#[cfg(feature = "log")]
fn warn_length(length: u16) {
    log::warn!("dropping request: mbap length {length} exceeds maximum");
}
#[cfg(not(feature = "log"))]
fn warn_length(_length: u16) {}

#[cfg(feature = "log")]
fn warn_unit_id(id: u8) {
    log::warn!("dropping request: wrong unit id {id}");
}
#[cfg(not(feature = "log"))]
fn warn_unit_id(_id: u8) {}

#[cfg(feature = "log")]
fn warn_unsupported(fc: u8) {
    log::warn!("unsupported function code {fc:#04x}");
}
#[cfg(not(feature = "log"))]
fn warn_unsupported(_fc: u8) {}

#[cfg(feature = "log")]
fn warn_truncated(len: usize) {
    log::warn!("dropping request: {len} byte(s) too short for its function code's PDU");
}
#[cfg(not(feature = "log"))]
fn warn_truncated(_len: usize) {}
