use crate::error::symbol_error;
use crate::Result;
use euclid::Address;
use pest::Span;
use std::collections::HashMap;

/// Label table built during the first pass: label name to byte address.
#[derive(Default)]
pub(crate) struct SymbolTable<'i> {
    symbols: HashMap<&'i str, Address>,
}

impl<'i> SymbolTable<'i> {
    pub fn new() -> SymbolTable<'i> {
        Default::default()
    }

    pub fn add(&mut self, label: Span<'i>, address: Address) -> Result<()> {
        let name = label.as_str();
        if self.symbols.contains_key(name) {
            return Err(symbol_error(
                label,
                format!("duplicate label \"{}\"", name),
            ));
        }

        self.symbols.insert(name, address);
        Ok(())
    }

    pub fn get(&self, label: &Span<'i>) -> Result<Address> {
        self.symbols.get(label.as_str()).copied().ok_or_else(|| {
            symbol_error(
                label.clone(),
                format!("undefined label \"{}\"", label.as_str()),
            )
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }
}
