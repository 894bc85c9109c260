use super::{constants, Address, Error, Memory, Result, Word};
use log::{debug, warn};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};

pub type OutputCharFn = Box<dyn FnMut(u8) -> io::Result<()>>;
pub type OutputIntFn = Box<dyn FnMut(i64) -> io::Result<()>>;
pub type InputCharFn = Box<dyn FnMut() -> io::Result<u8>>;
pub type InputIntFn = Box<dyn FnMut() -> io::Result<i64>>;

/// A host stream bound to a numeric port for string transfer.
pub enum PortBinding {
    Reader(Box<dyn BufRead>),
    Writer(Box<dyn Write>),
}

/// The machine's I/O unit: MMIO decoding, numeric ports, string transfer
/// and the four host callbacks.
///
/// Every callback is optional. Without one, output is collected in internal
/// buffers and input reads as zero, which keeps the core fully testable
/// headless. Callback failures surface as [`Error::Io`] and stop the run.
#[derive(Default)]
pub struct IoPorts {
    output_char: Option<OutputCharFn>,
    output_int: Option<OutputIntFn>,
    input_char: Option<InputCharFn>,
    input_int: Option<InputIntFn>,

    bindings: HashMap<Address, PortBinding>,

    char_buffer: String,
    int_buffer: Vec<i64>,
}

impl IoPorts {
    pub fn new() -> IoPorts {
        Default::default()
    }

    pub fn set_output_char<F>(&mut self, callback: F)
    where
        F: FnMut(u8) -> io::Result<()> + 'static,
    {
        self.output_char = Some(Box::new(callback));
    }

    pub fn set_output_int<F>(&mut self, callback: F)
    where
        F: FnMut(i64) -> io::Result<()> + 'static,
    {
        self.output_int = Some(Box::new(callback));
    }

    pub fn set_input_char<F>(&mut self, callback: F)
    where
        F: FnMut() -> io::Result<u8> + 'static,
    {
        self.input_char = Some(Box::new(callback));
    }

    pub fn set_input_int<F>(&mut self, callback: F)
    where
        F: FnMut() -> io::Result<i64> + 'static,
    {
        self.input_int = Some(Box::new(callback));
    }

    /// Drains the fallback character buffer.
    pub fn take_chars(&mut self) -> String {
        std::mem::replace(&mut self.char_buffer, String::new())
    }

    /// Drains the fallback integer buffer.
    pub fn take_ints(&mut self) -> Vec<i64> {
        std::mem::replace(&mut self.int_buffer, Vec::new())
    }

    pub fn clear_buffers(&mut self) {
        self.char_buffer.clear();
        self.int_buffer.clear();
    }

    /// Binds a host reader to a port for INS.
    pub fn bind_reader(&mut self, port: Address, reader: Box<dyn BufRead>) {
        self.bindings.insert(port, PortBinding::Reader(reader));
    }

    /// Binds a host writer to a port for OUTS.
    pub fn bind_writer(&mut self, port: Address, writer: Box<dyn Write>) {
        self.bindings.insert(port, PortBinding::Writer(writer));
    }

    pub fn unbind(&mut self, port: Address) -> bool {
        self.bindings.remove(&port).is_some()
    }

    pub fn unbind_all(&mut self) {
        self.bindings.clear();
    }

    // === OUT ===

    /// Dispatches an OUT instruction: `value` is the source register value,
    /// `target` the IMM32 field, `func` the 12-bit mode field.
    pub fn write_output(
        &mut self,
        mem: &mut Memory,
        value: Word,
        target: u32,
        func: u16,
    ) -> Result<()> {
        let subop = (func >> constants::IO_FUNC_SUBOP_OFFSET) & constants::IO_FUNC_SUBOP_MASK;

        match subop {
            constants::IO_SUBOP_INT_ARRAY => {
                let separator =
                    ((func >> constants::IO_FUNC_SEPARATOR_OFFSET) & constants::IO_FUNC_SEPARATOR_MASK) as u8;
                self.write_int_array(mem, value, target, separator)
            }
            constants::IO_SUBOP_INT_PLAIN => self.write_int_plain(value),
            _ => {
                if func & constants::IO_FUNC_PORT_BIT != 0 {
                    self.write_to_port(value, Address::from(target))
                } else {
                    self.write_to_mmio(mem, value, Address::from(target))
                }
            }
        }
    }

    fn write_to_port(&mut self, value: Word, port: Address) -> Result<()> {
        match port {
            constants::PORT_CONSOLE_CHAR => self.write_char(value),
            constants::PORT_CONSOLE_INT => self.write_int(value),
            _ => {
                // Unknown ports fall through to the integer channel.
                debug!("OUT to unknown port {:#X}", port);
                self.write_int(value)
            }
        }
    }

    fn write_to_mmio(&mut self, mem: &mut Memory, value: Word, address: Address) -> Result<()> {
        match address {
            constants::MMIO_CONSOLE_CHAR => self.write_char(value),
            constants::MMIO_CONSOLE_INT => self.write_int(value),
            _ => {
                if mem.check_range(address, constants::WORD_BYTES) {
                    mem.write_word(address, value)
                } else {
                    debug!("OUT to unmapped address {:#010X} ignored", address);
                    Ok(())
                }
            }
        }
    }

    fn write_char(&mut self, value: Word) -> Result<()> {
        self.write_char_byte((value & 0xFF) as u8)
    }

    fn write_char_byte(&mut self, byte: u8) -> Result<()> {
        match &mut self.output_char {
            Some(callback) => callback(byte)?,
            None => self.char_buffer.push(char::from(byte)),
        }
        Ok(())
    }

    fn write_int(&mut self, value: Word) -> Result<()> {
        let value = value as i64;
        match &mut self.output_int {
            Some(callback) => callback(value)?,
            None => self.int_buffer.push(value),
        }
        Ok(())
    }

    /// Prints an integer with no terminator, for formatted output.
    fn write_int_plain(&mut self, value: Word) -> Result<()> {
        let value = value as i64;
        match &mut self.output_int {
            Some(callback) => callback(value)?,
            None => self.char_buffer.push_str(&value.to_string()),
        }
        Ok(())
    }

    /// Prints `count` words starting at `base`, separated by `separator`.
    /// Stops early at the end of memory; `count` is clamped to a safety cap.
    fn write_int_array(
        &mut self,
        mem: &Memory,
        base: Word,
        count: u32,
        separator: u8,
    ) -> Result<()> {
        let count = count.min(constants::INT_ARRAY_CAP);

        for i in 0..count {
            let address = base.wrapping_add(Word::from(i) * Word::from(constants::WORD_BYTES));
            if !mem.check_range(address, constants::WORD_BYTES) {
                break;
            }

            self.write_int_plain(mem.read_word(address)?)?;
            if i + 1 != count && separator != 0 {
                self.write_char_byte(separator)?;
            }
        }
        Ok(())
    }

    // === IN ===

    /// Dispatches a plain IN instruction and returns the 64-bit value read.
    pub fn read_input(&mut self, mem: &Memory, source: u32, func: u16) -> Result<Word> {
        if func & constants::IO_FUNC_PORT_BIT != 0 {
            self.read_from_port(Address::from(source))
        } else {
            self.read_from_mmio(mem, Address::from(source))
        }
    }

    fn read_from_port(&mut self, port: Address) -> Result<Word> {
        match port {
            constants::PORT_CONSOLE_CHAR => self.read_char(),
            constants::PORT_CONSOLE_INT => self.read_int(),
            _ => {
                warn!("IN from unknown port {:#X} reads zero", port);
                Ok(0)
            }
        }
    }

    fn read_from_mmio(&mut self, mem: &Memory, address: Address) -> Result<Word> {
        match address {
            constants::MMIO_CONSOLE_IN_CHAR => self.read_char(),
            constants::MMIO_CONSOLE_IN_INT => self.read_int(),
            _ => {
                if mem.check_range(address, constants::WORD_BYTES) {
                    mem.read_word(address)
                } else {
                    debug!("IN from unmapped address {:#010X} reads zero", address);
                    Ok(0)
                }
            }
        }
    }

    fn read_char(&mut self) -> Result<Word> {
        match &mut self.input_char {
            Some(callback) => Ok(Word::from(callback()?)),
            None => Ok(0),
        }
    }

    fn read_int(&mut self) -> Result<Word> {
        match &mut self.input_int {
            Some(callback) => Ok(callback()? as Word),
            None => Ok(0),
        }
    }

    /// The IN array sub-operation: reads one input line, splits it on the
    /// separator (whitespace when zero), parses signed integers (zero on
    /// parse failure) and stores up to `count` of them as words at `base`.
    /// Returns the number of values actually stored.
    pub fn read_int_array(
        &mut self,
        mem: &mut Memory,
        base: Word,
        count: u32,
        separator: u8,
    ) -> Result<u32> {
        let line = self.read_line(constants::INPUT_LINE_CAP)?;

        let fields: Vec<&str> = if separator == 0 {
            line.split_whitespace().collect()
        } else {
            line.split(char::from(separator)).collect()
        };

        let count = count.min(constants::INT_ARRAY_CAP) as usize;
        let mut parsed = 0u32;

        for (i, field) in fields.iter().take(count).enumerate() {
            let address = base.wrapping_add(i as Word * Word::from(constants::WORD_BYTES));
            if !mem.check_range(address, constants::WORD_BYTES) {
                break;
            }

            mem.write_word(address, parse_int_lenient(field) as Word)?;
            parsed += 1;
        }

        Ok(parsed)
    }

    fn read_line(&mut self, cap: usize) -> Result<String> {
        let mut line = String::new();

        if let Some(callback) = &mut self.input_char {
            for _ in 0..cap {
                let ch = callback()?;
                if ch == 0 || ch == b'\n' {
                    break;
                }
                line.push(char::from(ch));
            }
        }

        Ok(line)
    }

    // === Strings (INS/OUTS) ===

    /// Reads a string from a port: the console input port uses the character
    /// callback, file ports use their bound reader. Unbound ports fault with
    /// [`Error::PortUnbound`]; the executor degrades that to an empty string.
    pub fn read_string(&mut self, port: Address, cap: usize) -> Result<String> {
        if port < constants::FILE_PORT_BASE {
            return self.read_line(cap);
        }

        match self.bindings.get_mut(&port) {
            Some(PortBinding::Reader(reader)) => {
                let mut line = String::new();
                reader.read_line(&mut line)?;
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                line.truncate(cap);
                Ok(line)
            }
            _ => Err(Error::PortUnbound { port }),
        }
    }

    /// Writes a string to a port: console ports go through the character
    /// callback, file ports through their bound writer.
    pub fn write_string(&mut self, text: &str, port: Address) -> Result<()> {
        if port < constants::FILE_PORT_BASE {
            for byte in text.bytes() {
                self.write_char_byte(byte)?;
            }
            return Ok(());
        }

        match self.bindings.get_mut(&port) {
            Some(PortBinding::Writer(writer)) => {
                writer.write_all(text.as_bytes())?;
                writer.flush()?;
                Ok(())
            }
            _ => Err(Error::PortUnbound { port }),
        }
    }
}

/// Reads a null-terminated string from memory, stopping at the terminator,
/// the safety cap or the end of the buffer.
pub fn read_string_from_memory(mem: &Memory, base: Address, cap: usize) -> String {
    let mut text = String::new();

    for offset in 0..cap {
        let address = base.wrapping_add(offset as Address);
        match mem.read_byte(address) {
            Ok(0) | Err(_) => break,
            Ok(byte) => text.push(char::from(byte)),
        }
    }

    text
}

/// Writes a string to memory followed by a null terminator, truncating at
/// the safety cap and at the end of the buffer.
pub fn write_string_to_memory(
    mem: &mut Memory,
    base: Address,
    text: &str,
    cap: usize,
) -> Result<()> {
    let bytes: Vec<u8> = text.bytes().take(cap).collect();

    for (i, byte) in bytes.iter().enumerate() {
        let address = base.wrapping_add(i as Address);
        if !mem.check_range(address, constants::BYTE_BYTES) {
            return Ok(());
        }
        mem.write_byte(address, *byte)?;
    }

    let terminator = base.wrapping_add(bytes.len() as Address);
    if mem.check_range(terminator, constants::BYTE_BYTES) {
        mem.write_byte(terminator, 0)?;
    }
    Ok(())
}

fn parse_int_lenient(field: &str) -> i64 {
    let field = field.trim();
    let (negative, digits) = match field.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, field),
    };

    let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse(),
    };

    match parsed {
        Ok(value) => {
            if negative {
                -value
            } else {
                value
            }
        }
        Err(_) => 0,
    }
}
