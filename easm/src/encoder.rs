use euclid::instruction::{make_i, make_j, make_r, make_s};
use euclid::isa::parse_mnemonic;
use euclid::{Form, Opcode, Word};
use std::fmt;

/// A resolved instruction operand. Labels and memory references are
/// rewritten into [`Operand::Int`] before encoding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operand {
    /// A register number as written; range-checked here, not at parse time.
    Register(u32),
    Int(i128),
    Float(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum EncodeError {
    UnknownMnemonic(String),
    OperandCountMismatch {
        mnemonic: Opcode,
        expected: &'static str,
        found: usize,
    },
    OperandMismatch {
        mnemonic: Opcode,
        expected: &'static str,
    },
    RegisterOutOfRange(u32),
    ImmediateOutOfRange(i128),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncodeError::UnknownMnemonic(name) => write!(f, "unknown mnemonic \"{}\"", name),
            EncodeError::OperandCountMismatch {
                mnemonic,
                expected,
                found,
            } => write!(
                f,
                "{} takes {} operand(s), found {}",
                mnemonic, expected, found
            ),
            EncodeError::OperandMismatch { mnemonic, expected } => {
                write!(f, "{} expects {}", mnemonic, expected)
            }
            EncodeError::RegisterOutOfRange(reg) => {
                write!(f, "register R{} is out of range (R0..R15)", reg)
            }
            EncodeError::ImmediateOutOfRange(value) => write!(
                f,
                "immediate {} is outside the 32-bit range -2^31..2^32",
                value
            ),
        }
    }
}

impl std::error::Error for EncodeError {}

type Result<T> = std::result::Result<T, EncodeError>;

/// Deterministically encodes `(mnemonic, operands)` into a 64-bit word.
///
/// Operand shapes follow the instruction form; the notable special cases
/// are MOVI (FUNC selected by the second operand's kind), CP (FUNC=1 with
/// IMM32=1), LD/ST (absolute vs register+offset by operand count), PUSH
/// (register vs immediate) and IN/OUT (optional trailing FUNC operand).
pub fn encode(mnemonic: &str, operands: &[Operand]) -> Result<Word> {
    let opcode = parse_mnemonic(mnemonic)
        .map_err(|_| EncodeError::UnknownMnemonic(mnemonic.to_string()))?;

    match opcode.form() {
        Form::R => encode_r(opcode, operands),
        Form::I => encode_i(opcode, operands),
        Form::J => encode_j(opcode, operands),
        Form::S => {
            expect_count(opcode, operands, 0, "no")?;
            Ok(make_s(opcode))
        }
    }
}

fn encode_r(opcode: Opcode, operands: &[Operand]) -> Result<Word> {
    // CMP also accepts two registers, with RD defaulted to zero.
    if opcode == Opcode::CMP && operands.len() == 2 {
        let rs1 = register(opcode, operands, 0)?;
        let rs2 = register(opcode, operands, 1)?;
        return Ok(make_r(opcode, 0, rs1, rs2));
    }

    expect_count(opcode, operands, 3, "three")?;
    let rd = register(opcode, operands, 0)?;
    let rs1 = register(opcode, operands, 1)?;
    let rs2 = register(opcode, operands, 2)?;
    Ok(make_r(opcode, rd, rs1, rs2))
}

fn encode_i(opcode: Opcode, operands: &[Operand]) -> Result<Word> {
    match opcode {
        Opcode::MOVI => {
            expect_count(opcode, operands, 2, "two")?;
            let rd = register(opcode, operands, 0)?;
            match operands[1] {
                Operand::Int(value) => Ok(make_i(opcode, rd, 0, 0, immediate(value)?)),
                Operand::Register(_) => {
                    let rs1 = register(opcode, operands, 1)?;
                    Ok(make_i(opcode, rd, rs1, 1, 0))
                }
                Operand::Float(value) => {
                    Ok(make_i(opcode, rd, 0, 2, (value as f32).to_bits()))
                }
            }
        }

        Opcode::CP => {
            expect_count(opcode, operands, 2, "two")?;
            let rd = register(opcode, operands, 0)?;
            let rs1 = register(opcode, operands, 1)?;
            // IMM32=1 is a fixed disambiguator in the ABI.
            Ok(make_i(opcode, rd, rs1, 1, 1))
        }

        Opcode::LD | Opcode::ST => match operands.len() {
            2 => {
                let rd = register(opcode, operands, 0)?;
                let address = int(opcode, operands, 1, "an address")?;
                Ok(make_i(opcode, rd, 0, 0, immediate(address)?))
            }
            3 => {
                let rd = register(opcode, operands, 0)?;
                let rs1 = register(opcode, operands, 1)?;
                let offset = int(opcode, operands, 2, "an offset")?;
                Ok(make_i(opcode, rd, rs1, 1, immediate(offset)?))
            }
            found => Err(EncodeError::OperandCountMismatch {
                mnemonic: opcode,
                expected: "two or three",
                found,
            }),
        },

        Opcode::ADDI => {
            expect_count(opcode, operands, 3, "three")?;
            let rd = register(opcode, operands, 0)?;
            let rs1 = register(opcode, operands, 1)?;
            let value = int(opcode, operands, 2, "an immediate")?;
            Ok(make_i(opcode, rd, rs1, 0, immediate(value)?))
        }

        Opcode::PUSH => {
            expect_count(opcode, operands, 1, "one")?;
            match operands[0] {
                Operand::Register(_) => {
                    let rs1 = register(opcode, operands, 0)?;
                    Ok(make_i(opcode, 0, rs1, 1, 0))
                }
                Operand::Int(value) => Ok(make_i(opcode, 0, 0, 0, immediate(value)?)),
                Operand::Float(_) => Err(EncodeError::OperandMismatch {
                    mnemonic: opcode,
                    expected: "a register or an integer immediate",
                }),
            }
        }

        Opcode::POP => {
            expect_count(opcode, operands, 1, "one")?;
            let rd = register(opcode, operands, 0)?;
            Ok(make_i(opcode, rd, 0, 0, 0))
        }

        Opcode::IN | Opcode::OUT => encode_io(opcode, operands),

        Opcode::INS | Opcode::OUTS => {
            expect_count(opcode, operands, 2, "two")?;
            let rd = register(opcode, operands, 0)?;
            let port = int(opcode, operands, 1, "a port")?;
            Ok(make_i(opcode, rd, 0, 0, immediate(port)?))
        }

        _ => unreachable!("not an I-form opcode: {}", opcode),
    }
}

/// IN/OUT shapes:
/// - `(reg, target)`: MMIO mode, FUNC=0;
/// - `(reg, target, func)`: explicit FUNC field (port mode, sub-ops,
///   separator byte);
/// - `(reg, reg, target, func)`: extended array forms needing both a
///   destination and a base register.
fn encode_io(opcode: Opcode, operands: &[Operand]) -> Result<Word> {
    match operands.len() {
        2 => {
            let reg = register(opcode, operands, 0)?;
            let target = int(opcode, operands, 1, "a port or MMIO address")?;
            Ok(make_i(opcode, reg, reg, 0, immediate(target)?))
        }
        3 => {
            let reg = register(opcode, operands, 0)?;
            let target = int(opcode, operands, 1, "a port or MMIO address")?;
            let func = func_field(int(opcode, operands, 2, "a FUNC value")?)?;
            Ok(make_i(opcode, reg, reg, func, immediate(target)?))
        }
        4 => {
            let rd = register(opcode, operands, 0)?;
            let rs1 = register(opcode, operands, 1)?;
            let target = int(opcode, operands, 2, "a count or address")?;
            let func = func_field(int(opcode, operands, 3, "a FUNC value")?)?;
            Ok(make_i(opcode, rd, rs1, func, immediate(target)?))
        }
        found => Err(EncodeError::OperandCountMismatch {
            mnemonic: opcode,
            expected: "two to four",
            found,
        }),
    }
}

fn encode_j(opcode: Opcode, operands: &[Operand]) -> Result<Word> {
    if opcode == Opcode::RET {
        expect_count(opcode, operands, 0, "no")?;
        return Ok(make_j(opcode, 0));
    }

    expect_count(opcode, operands, 1, "one")?;
    let target = int(opcode, operands, 0, "a target address")?;
    Ok(make_j(opcode, immediate(target)?))
}

fn expect_count(opcode: Opcode, operands: &[Operand], count: usize, word: &'static str) -> Result<()> {
    if operands.len() == count {
        Ok(())
    } else {
        Err(EncodeError::OperandCountMismatch {
            mnemonic: opcode,
            expected: word,
            found: operands.len(),
        })
    }
}

fn register(opcode: Opcode, operands: &[Operand], index: usize) -> Result<u8> {
    match operands[index] {
        Operand::Register(reg) if reg <= 15 => Ok(reg as u8),
        Operand::Register(reg) => Err(EncodeError::RegisterOutOfRange(reg)),
        _ => Err(EncodeError::OperandMismatch {
            mnemonic: opcode,
            expected: "a register operand",
        }),
    }
}

fn int(opcode: Opcode, operands: &[Operand], index: usize, expected: &'static str) -> Result<i128> {
    match operands[index] {
        Operand::Int(value) => Ok(value),
        _ => Err(EncodeError::OperandMismatch {
            mnemonic: opcode,
            expected,
        }),
    }
}

/// Immediates must fit the 32-bit field: -2^31 inclusive to 2^32 exclusive.
fn immediate(value: i128) -> Result<u32> {
    const MIN: i128 = -(1i128 << 31);
    const MAX: i128 = 1i128 << 32;

    if (MIN..MAX).contains(&value) {
        Ok(value as i64 as u32)
    } else {
        Err(EncodeError::ImmediateOutOfRange(value))
    }
}

fn func_field(value: i128) -> Result<u16> {
    if (0..0x1000).contains(&value) {
        Ok(value as u16)
    } else {
        Err(EncodeError::ImmediateOutOfRange(value))
    }
}
