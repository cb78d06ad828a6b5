//! Yarilo virtual machine.
//!
//! Lowers parsed source into bindable [`Code`], resolves symbols against
//! layered scopes, and executes it with a [`Cursor`]. Procedures run on a
//! shared value stack; streaming procedures and async natives produce
//! [`Suspend`]s that publish into single-subscriber [`Publisher`]s and can be
//! chained with `pipe`.
//!
//! ```
//! use yarilo_vm::{Value, Vm};
//!
//! let vm = Vm::new();
//! vm.boot().unwrap();
//! assert_eq!(vm.eval("1 + 2 * 3").unwrap(), Value::Number(9.0));
//! ```

pub mod bind;
pub mod code;
pub mod config;
pub mod cursor;
pub mod error;
pub mod module;
mod natives;
pub mod procedure;
pub mod stdlib;
pub mod stream;
pub mod suspend;
pub mod value;
pub mod vm;

pub use bind::{BindFactory, Binding, Bound, ScopeChain};
pub use code::{Code, CodeItem, WordKind};
pub use config::VmConfig;
pub use cursor::Cursor;
pub use error::{ErrorKind, ErrorReport, EvalError, EvalResult};
pub use module::{load_module, load_module_source, stop_module, Backing, BackingFactory};
pub use stream::{Collector, Publisher, Subscriber};
pub use suspend::{pipe, Suspend, SuspendState, Task};
pub use value::{Dictionary, Func, Proc, Value};
pub use vm::Vm;
