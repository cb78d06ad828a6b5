//! Binding resolver.
//!
//! Binding is a one-time pre-pass over a code tree: every word and path asks
//! a scope factory for a [`Binding`] and keeps whatever it gets. A later pass
//! (for example a procedure binding its body) overwrites earlier results for
//! the symbols it resolves, so inner scopes win. Symbols nobody resolves stay
//! unbound and fail only when executed.

use crate::code::{Code, CodeItem, WordKind};
use crate::error::{EvalError, EvalResult};
use crate::value::{Dictionary, Value};
use std::collections::BTreeSet;
use std::rc::Rc;

/// One resolved binding site: a get/set capability for a symbol.
pub trait Bound {
    fn get(&self, symbol: &str) -> EvalResult<Value>;
    fn set(&self, symbol: &str, value: Value) -> EvalResult<()>;
}

pub type Binding = Rc<dyn Bound>;

/// One scope: resolves the symbols it knows about.
pub trait BindFactory {
    fn resolve(&self, symbol: &str) -> Option<Binding>;
}

impl<F> BindFactory for F
where
    F: Fn(&str) -> Option<Binding>,
{
    fn resolve(&self, symbol: &str) -> Option<Binding> {
        self(symbol)
    }
}

/// Scopes ordered innermost first; the first one that resolves wins.
pub struct ScopeChain<'a> {
    scopes: Vec<&'a dyn BindFactory>,
}

impl<'a> ScopeChain<'a> {
    pub fn new(scopes: Vec<&'a dyn BindFactory>) -> Self {
        Self { scopes }
    }
}

impl BindFactory for ScopeChain<'_> {
    fn resolve(&self, symbol: &str) -> Option<Binding> {
        self.scopes.iter().find_map(|scope| scope.resolve(symbol))
    }
}

/// Attach bindings from `factory` to every word and path in `code`,
/// recursing into blocks and parens.
pub fn bind(code: &Code, factory: &dyn BindFactory) {
    for item in code.iter() {
        match item {
            CodeItem::Word(word) => {
                if let Some(binding) = factory.resolve(word.symbol()) {
                    word.attach(binding);
                }
            }
            CodeItem::Path(path) => {
                if let Some(binding) = factory.resolve(path.head()) {
                    path.attach(binding);
                }
            }
            CodeItem::Block(inner) | CodeItem::Paren(inner) => bind(inner, factory),
            CodeItem::Const(_) | CodeItem::Refinement(_) => {}
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Dictionary scopes
// ══════════════════════════════════════════════════════════════════════════════

/// Reads and writes go straight to a dictionary. Reading a missing key is an
/// unbound reference.
pub struct DictionaryBinding(pub Dictionary);

impl Bound for DictionaryBinding {
    fn get(&self, symbol: &str) -> EvalResult<Value> {
        self.0
            .get(symbol)
            .ok_or_else(|| EvalError::UnboundReference(symbol.to_string()))
    }

    fn set(&self, symbol: &str, value: Value) -> EvalResult<()> {
        self.0.set(symbol, value);
        Ok(())
    }
}

/// Symbols assigned anywhere in `code` (`word:`), nested code included.
pub fn set_words(code: &Code) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    collect_set_words(code, &mut found);
    found
}

fn collect_set_words(code: &Code, found: &mut BTreeSet<String>) {
    for item in code.iter() {
        match item {
            CodeItem::Word(word) if word.kind() == WordKind::Set => {
                found.insert(word.symbol().to_string());
            }
            CodeItem::Block(inner) | CodeItem::Paren(inner) => collect_set_words(inner, found),
            _ => {}
        }
    }
}

/// Bind every symbol that `code` assigns to `dict`. Used for module bodies
/// and module metadata.
pub fn bind_dictionary(code: &Code, dict: &Dictionary) {
    let assigned = set_words(code);
    let binding: Binding = Rc::new(DictionaryBinding(dict.clone()));
    bind(code, &|symbol: &str| {
        assigned.contains(symbol).then(|| binding.clone())
    });
}

/// Bind every symbol already present in `dict`.
pub fn bind_dictionary_words(code: &Code, dict: &Dictionary) {
    let binding: Binding = Rc::new(DictionaryBinding(dict.clone()));
    bind(code, &|symbol: &str| dict.contains(symbol).then(|| binding.clone()));
}
