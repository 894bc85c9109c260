use crate::encoder::{self, Operand};
use crate::error::{encoding_error, parser_error, symbol_error};
use crate::int_util::{parse_float, parse_int, parse_uint, unescape};
use crate::parser::Rule;
use crate::source_map::{SourceMap, SourceMapItem};
use crate::symbols::SymbolTable;
use crate::Result;
use byteorder::ByteOrder;
use eobj::{MapEntry, Program, ProgramWord};
use euclid::Address;
use matches::debug_assert_matches;
use pest::iterators::Pair;
use pest::Span;
use std::collections::HashMap;
use util::Endian;

const WORD_BYTES: Address = 8;

enum RawOperand<'i> {
    Register(u32),
    Int(i128),
    Float(f64),
    Label(Span<'i>),
    RefLabel(Span<'i>),
    RefAddr(i128),
}

enum DwValue<'i> {
    Value(i128),
    Label(Span<'i>),
}

enum Payload<'i> {
    Instruction {
        mnemonic: Span<'i>,
        operands: Vec<RawOperand<'i>>,
    },
    Dw(Vec<DwValue<'i>>),
    Resw(u64),
    Db(Vec<u8>),
}

struct Item<'i> {
    payload: Payload<'i>,
    span: Span<'i>,
    address: Address,
    word_index: usize,
    words: usize,
    line: u32,
}

/// Runs both passes over a parsed program and produces the relocatable
/// object together with its source map.
pub(crate) fn assemble_parsed(program: Pair<Rule>) -> Result<(Program, SourceMap)> {
    debug_assert_matches!(program.as_rule(), Rule::program);
    let program_span = program.as_span();

    let mut symbols = SymbolTable::new();
    let mut index_of_address: HashMap<Address, usize> = HashMap::new();
    let mut items = Vec::new();

    // Pass 1: register labels, parse statements, lay out addresses and
    // word indices.
    let mut address: Address = 0;
    let mut word_index = 0usize;

    for line in program.into_inner() {
        if line.as_rule() != Rule::line {
            continue;
        }

        let line_no = line.as_span().start_pos().line_col().0 as u32;
        let mut pairs = line.into_inner();
        let first = pairs.next().unwrap();

        let statement = if first.as_rule() == Rule::label {
            let name = first.into_inner().next().unwrap().as_span();
            symbols.add(name, address)?;
            pairs.next()
        } else {
            Some(first)
        };

        let statement = match statement {
            Some(statement) => statement,
            None => continue,
        };

        if let Some(item) =
            process_statement(statement, &mut address, word_index, line_no)?
        {
            for offset in 0..item.words {
                index_of_address
                    .insert(item.address + offset as Address * WORD_BYTES, word_index + offset);
            }

            word_index += item.words;
            items.push(item);
        }
    }

    // Pass 2: resolve labels, encode, emit words and map records.
    let mut words = Vec::new();
    let mut map = Vec::new();
    let mut source_map = Vec::new();

    for item in &items {
        match &item.payload {
            Payload::Instruction { mnemonic, operands } => {
                let (resolved, reloc) = resolve_operands(operands, &symbols, &index_of_address)?;

                let word = encoder::encode(mnemonic.as_str(), &resolved)
                    .map_err(|err| encoding_error(item.span.clone(), err.to_string()))?;

                words.push(match reloc {
                    Some(target) => ProgramWord::Reloc32 {
                        prefix: (word >> 32) as u32,
                        target,
                    },
                    None => ProgramWord::Absolute(word),
                });
                map.push(entry(item, 0, true));
                source_map.push(source_item(item));
            }

            Payload::Dw(values) => {
                for (offset, value) in values.iter().enumerate() {
                    words.push(match value {
                        DwValue::Value(value) => ProgramWord::Absolute(*value as u64),
                        DwValue::Label(label) => ProgramWord::Reloc64 {
                            target: reloc_target(label, &symbols, &index_of_address)?,
                        },
                    });
                    map.push(entry(item, offset, false));
                    source_map.push(source_item(item));
                }
            }

            Payload::Resw(count) => {
                for offset in 0..*count as usize {
                    words.push(ProgramWord::Absolute(0));
                    map.push(entry(item, offset, false));
                    source_map.push(source_item(item));
                }
            }

            Payload::Db(bytes) => {
                for (offset, chunk) in bytes.chunks(WORD_BYTES as usize).enumerate() {
                    // The final word is zero-padded.
                    words.push(ProgramWord::Absolute(Endian::read_uint(chunk, chunk.len())));
                    map.push(entry(item, offset, false));
                    source_map.push(source_item(item));
                }
            }
        }
    }

    if words.is_empty() {
        return Err(parser_error(
            program_span,
            "program emits no words".to_string(),
        ));
    }

    let program =
        Program::from(words, map).expect("assembler emitted an inconsistent object");
    Ok((program, source_map))
}

fn entry(item: &Item, offset: usize, executable: bool) -> MapEntry {
    MapEntry {
        index: item.word_index + offset,
        address: item.address + offset as Address * WORD_BYTES,
        executable,
    }
}

fn source_item(item: &Item) -> SourceMapItem {
    SourceMapItem {
        start_line: item.line,
        line_count: 1,
    }
}

fn process_statement<'i>(
    pair: Pair<'i, Rule>,
    address: &mut Address,
    word_index: usize,
    line: u32,
) -> Result<Option<Item<'i>>> {
    let span = pair.as_span();

    let payload = match pair.as_rule() {
        Rule::directive => {
            let inner = pair.into_inner().next().unwrap();
            match inner.as_rule() {
                Rule::org => {
                    let target = inner.into_inner().next().unwrap();
                    let origin = parse_uint(&target)?;
                    if origin % WORD_BYTES != 0 {
                        return Err(parser_error(
                            target.as_span(),
                            format!("ORG address {:#X} is not word-aligned", origin),
                        ));
                    }
                    *address = origin;
                    return Ok(None);
                }
                Rule::dw => Payload::Dw(process_dw_args(inner)?),
                Rule::resw => {
                    let count = inner.into_inner().next().unwrap();
                    Payload::Resw(parse_uint(&count)?)
                }
                Rule::db => Payload::Db(process_db_args(inner)?),
                _ => unreachable!(),
            }
        }
        Rule::instruction => {
            let mut pairs = pair.into_inner();
            let mnemonic = pairs.next().unwrap().as_span();
            let operands = match pairs.next() {
                Some(list) => list
                    .into_inner()
                    .map(process_operand)
                    .collect::<Result<Vec<_>>>()?,
                None => Vec::new(),
            };
            Payload::Instruction { mnemonic, operands }
        }
        _ => unreachable!(),
    };

    let words = match &payload {
        Payload::Instruction { .. } => 1,
        Payload::Dw(values) => values.len(),
        Payload::Resw(count) => *count as usize,
        Payload::Db(bytes) => (bytes.len() + WORD_BYTES as usize - 1) / WORD_BYTES as usize,
    };

    let item = Item {
        payload,
        span: span.clone(),
        address: *address,
        word_index,
        words,
        line,
    };

    *address = (words as Address)
        .checked_mul(WORD_BYTES)
        .and_then(|size| address.checked_add(size))
        .ok_or_else(|| parser_error(span, "location counter overflow".to_string()))?;

    Ok(Some(item))
}

fn process_operand(pair: Pair<Rule>) -> Result<RawOperand> {
    debug_assert_matches!(pair.as_rule(), Rule::operand);
    let inner = pair.into_inner().next().unwrap();
    let span = inner.as_span();

    Ok(match inner.as_rule() {
        Rule::register => {
            let number = inner.as_str()[1..].parse::<u32>().map_err(|_| {
                encoding_error(
                    span.clone(),
                    format!("register {} is out of range (R0..R15)", span.as_str()),
                )
            })?;
            RawOperand::Register(number)
        }
        Rule::float => RawOperand::Float(parse_float(&inner)?),
        Rule::int => RawOperand::Int(parse_int(&inner)?),
        Rule::reference => {
            let target = inner.into_inner().next().unwrap();
            match target.as_rule() {
                Rule::int => RawOperand::RefAddr(parse_int(&target)?),
                Rule::identifier => RawOperand::RefLabel(target.as_span()),
                _ => unreachable!(),
            }
        }
        Rule::identifier => RawOperand::Label(span),
        _ => unreachable!(),
    })
}

fn process_dw_args(pair: Pair<Rule>) -> Result<Vec<DwValue>> {
    pair.into_inner()
        .map(|arg| {
            debug_assert_matches!(arg.as_rule(), Rule::dw_arg);
            let inner = arg.into_inner().next().unwrap();
            Ok(match inner.as_rule() {
                Rule::int => DwValue::Value(parse_int(&inner)?),
                Rule::identifier => DwValue::Label(inner.as_span()),
                _ => unreachable!(),
            })
        })
        .collect()
}

fn process_db_args(pair: Pair<Rule>) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();

    for arg in pair.into_inner() {
        debug_assert_matches!(arg.as_rule(), Rule::db_arg);
        let inner = arg.into_inner().next().unwrap();
        match inner.as_rule() {
            Rule::int => bytes.push(parse_int(&inner)? as u8),
            Rule::string => {
                let body = inner.into_inner().next().unwrap();
                bytes.extend(unescape(body.as_str()).bytes());
            }
            _ => unreachable!(),
        }
    }

    Ok(bytes)
}

/// Rewrites label operands into zeroed immediates plus a relocation keyed
/// by the label's word index. One relocation per instruction.
fn resolve_operands<'i>(
    operands: &[RawOperand<'i>],
    symbols: &SymbolTable<'i>,
    index_of_address: &HashMap<Address, usize>,
) -> Result<(Vec<Operand>, Option<usize>)> {
    let mut resolved = Vec::with_capacity(operands.len());
    let mut reloc = None;

    for operand in operands {
        let value = match operand {
            RawOperand::Register(reg) => Operand::Register(*reg),
            RawOperand::Int(value) => Operand::Int(*value),
            RawOperand::Float(value) => Operand::Float(*value),
            RawOperand::RefAddr(value) => Operand::Int(*value),
            RawOperand::Label(label) | RawOperand::RefLabel(label) => {
                let target = reloc_target(label, symbols, index_of_address)?;
                if reloc.replace(target).is_some() {
                    return Err(encoding_error(
                        label.clone(),
                        "an instruction may reference at most one label".to_string(),
                    ));
                }
                Operand::Int(0)
            }
        };
        resolved.push(value);
    }

    Ok((resolved, reloc))
}

fn reloc_target<'i>(
    label: &Span<'i>,
    symbols: &SymbolTable<'i>,
    index_of_address: &HashMap<Address, usize>,
) -> Result<usize> {
    let address = symbols.get(label)?;
    index_of_address.get(&address).copied().ok_or_else(|| {
        symbol_error(
            label.clone(),
            format!(
                "label \"{}\" does not address an emitted word",
                label.as_str()
            ),
        )
    })
}
