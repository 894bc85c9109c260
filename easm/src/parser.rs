use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "easm.pest"]
pub struct AsmParser;
