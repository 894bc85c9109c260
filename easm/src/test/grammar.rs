use super::*;

#[test]
fn registers() {
    assert!(parses(Rule::register, "R0"));
    assert!(parses(Rule::register, "R15"));
    assert!(parses(Rule::register, "R99"));
    assert!(!parses(Rule::register, "r0"));
    assert!(!parses(Rule::register, "R"));
    assert!(!parses(Rule::register, "R1x"));
}

#[test]
fn integers() {
    assert!(parses(Rule::int, "0"));
    assert!(parses(Rule::int, "-42"));
    assert!(parses(Rule::int, "0xFFFF0008"));
    assert!(parses(Rule::int, "-0x10"));
    assert!(!parses(Rule::int, "0x"));
    assert!(!parses(Rule::int, "--1"));
}

#[test]
fn floats() {
    assert!(parses(Rule::float, "1.5"));
    assert!(parses(Rule::float, "-2.75"));
    assert!(parses(Rule::float, "3.0e10"));
    assert!(parses(Rule::float, "1.5E-3"));
    assert!(!parses(Rule::float, "1."));
    assert!(!parses(Rule::float, "5"));
}

#[test]
fn labels_and_identifiers() {
    assert!(parses(Rule::label, "loop:"));
    assert!(parses(Rule::label, "_start:"));
    assert!(parses(Rule::label, "data2:"));
    assert!(!parses(Rule::label, "2data:"));
    assert!(parses(Rule::identifier, "a_label"));
}

#[test]
fn references() {
    assert!(parses(Rule::reference, "[1000]"));
    assert!(parses(Rule::reference, "[0x100]"));
    assert!(parses(Rule::reference, "[value]"));
    assert!(parses(Rule::reference, "[ value ]"));
    assert!(!parses(Rule::reference, "[]"));
}

#[test]
fn strings() {
    assert!(parses(Rule::string, "\"hello\""));
    assert!(parses(Rule::string, "\"a\\nb\\\"c\\\\d\""));
    assert!(parses(Rule::string, "\"\""));
    assert!(!parses(Rule::string, "\"unterminated"));
}

#[test]
fn instructions() {
    assert!(parses(Rule::instruction, "NOP"));
    assert!(parses(Rule::instruction, "ADD R3, R1, R2"));
    assert!(parses(Rule::instruction, "MOVI R1, -10"));
    assert!(parses(Rule::instruction, "MOVI R1, 2.5"));
    assert!(parses(Rule::instruction, "LD R2, [counter]"));
    assert!(parses(Rule::instruction, "JZ target"));
    assert!(parses(Rule::instruction, "OUT R3, 0xFFFF0008"));
}

#[test]
fn directives() {
    assert!(parses(Rule::directive, "ORG 0x100"));
    assert!(parses(Rule::directive, "DW 1, -2, 0x3, label"));
    assert!(parses(Rule::directive, "RESW 16"));
    assert!(parses(Rule::directive, "DB 1, 2, \"text\", 0"));
}

#[test]
fn whole_program() {
    let source = "\
# sum two numbers
ORG 0
start: MOVI R1, 10
MOVI R2, 20
ADD R3, R1, R2   # the sum
OUT R3, 0xFFFF0008
HALT
";
    assert!(AsmParser::parse(Rule::program, source).is_ok());
}

#[test]
fn label_on_its_own_line() {
    let source = "target:\nHALT\n";
    assert!(AsmParser::parse(Rule::program, source).is_ok());
}

#[test]
fn missing_newline_at_eof_is_fine() {
    assert!(AsmParser::parse(Rule::program, "HALT").is_ok());
}

#[test]
fn two_mnemonics_on_one_line_fail_at_encode_time() {
    // "HALT" reads as a label operand here, so the grammar accepts the
    // line; the encoder then rejects the operand count.
    let err = crate::assemble("start: NOP HALT\nstart2: HALT\n").unwrap_err();
    assert!(matches!(err, crate::Error::Symbol(_) | crate::Error::Encoding(_)));
}

#[test]
fn error_classification() {
    // An illegal character is a lexer error.
    let err = crate::assemble("MOVI R1, @\n").unwrap_err();
    assert!(matches!(err, crate::Error::Lexer(_)), "{:?}", err.kind());

    // Legal tokens in the wrong order are a parser error.
    let err = crate::assemble("ADD ,\n").unwrap_err();
    assert!(matches!(err, crate::Error::Parser(_)), "{:?}", err.kind());
}
