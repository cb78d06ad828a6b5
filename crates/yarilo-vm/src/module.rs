//! Modules: the `module` word, the source loader and native backings.
//!
//! A module file holds exactly one form:
//!
//! ```text
//! module [Impl-Native: "kv"] [
//!     get: proc [key] [Impl/get key]
//! ]
//! ```
//!
//! The description block fills a metadata dictionary. When it names a native
//! backing, the backing registered on the VM under that name is started and
//! its exports appear as `Impl` inside the module.

use crate::bind::{bind_dictionary, bind_dictionary_words};
use crate::code::{Code, CodeItem, WordKind};
use crate::error::{EvalError, EvalResult};
use crate::value::{Dictionary, Value};
use crate::vm::Vm;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Metadata key naming a native backing.
pub const IMPL_NATIVE: &str = "Impl-Native";
/// Export under which a started backing is exposed.
pub const IMPL: &str = "Impl";

/// A natively implemented module object.
pub trait Backing {
    fn exports(&self) -> Dictionary;
    fn stop(&self) -> EvalResult<()>;
}

/// Starts a backing for a VM.
pub type BackingFactory = Rc<dyn Fn(&Vm) -> EvalResult<Rc<dyn Backing>>>;

/// Evaluate `desc` into a metadata dictionary, then `body` into a fresh
/// exports dictionary. Returns the exports.
pub fn evaluate_module(vm: &Vm, desc: &Code, body: &Code) -> EvalResult<Dictionary> {
    let meta = describe(vm, desc)?;
    debug!(meta = %meta, "module description evaluated");
    let exports = Dictionary::new();
    bind_dictionary(body, &exports);
    vm.execute(body)?;
    Ok(exports)
}

fn describe(vm: &Vm, desc: &Code) -> EvalResult<Dictionary> {
    let meta = Dictionary::new();
    bind_dictionary(desc, &meta);
    vm.execute(desc)?;
    Ok(meta)
}

/// Load a module from source text and return its exports. `id` is the key
/// used by [`stop_module`].
pub fn load_module_source(vm: &Vm, id: &str, name: &str, text: &str) -> EvalResult<Dictionary> {
    let code = Code::from_nodes(&yarilo_parser::parse(name, text)?);
    let (desc, body) = match &code[..] {
        [CodeItem::Word(word), CodeItem::Block(desc), CodeItem::Block(body)]
            if word.kind() == WordKind::Normal && word.symbol() == "module" =>
        {
            (desc.clone(), body.clone())
        }
        _ => {
            return Err(EvalError::Module(format!(
                "{name}: expected `module [description] [body]`"
            )))
        }
    };
    vm.bind(&code);

    let meta = describe(vm, &desc)?;
    let exports = Dictionary::new();
    if let Some(backing_name) = meta.get(IMPL_NATIVE) {
        let backing_name = backing_name.as_str().ok_or_else(|| {
            EvalError::Module(format!("{name}: {IMPL_NATIVE} must be a string"))
        })?;
        let backing = start_backing(vm, id, backing_name)?;
        exports.set(IMPL, Value::Object(backing.exports()));
        bind_dictionary_words(&body, &exports);
    }
    bind_dictionary(&body, &exports);
    vm.execute(&body)?;
    info!(module = id, exports = exports.len(), "module loaded");
    Ok(exports)
}

fn start_backing(vm: &Vm, id: &str, name: &str) -> EvalResult<Rc<dyn Backing>> {
    let factory = vm
        .backing_factory(name)
        .ok_or_else(|| EvalError::Module(format!("no native backing named {name}")))?;
    let backing = factory(vm)?;
    vm.track_module(id, backing.clone());
    info!(module = id, backing = name, "native backing started");
    Ok(backing)
}

/// Read and load a module file. Relative paths resolve against
/// [`VmConfig::module_root`](crate::VmConfig::module_root).
pub fn load_module(vm: &Vm, id: &str, path: impl AsRef<Path>) -> EvalResult<Dictionary> {
    let path = resolve(vm, path.as_ref());
    let text = std::fs::read_to_string(&path)
        .map_err(|e| EvalError::Module(format!("cannot read {}: {e}", path.display())))?;
    load_module_source(vm, id, &path.display().to_string(), &text)
}

fn resolve(vm: &Vm, path: &Path) -> PathBuf {
    match &vm.config().module_root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.to_path_buf(),
    }
}

/// Stop the native backing started for module `id`.
pub fn stop_module(vm: &Vm, id: &str) -> EvalResult<()> {
    let backing = vm.untrack_module(id).ok_or_else(|| {
        warn!(module = id, "stop requested for unknown module");
        EvalError::Module(format!("module not found: {id}"))
    })?;
    backing.stop()?;
    info!(module = id, "native backing stopped");
    Ok(())
}
