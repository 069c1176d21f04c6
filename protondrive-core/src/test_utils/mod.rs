pub mod helpers;

pub use helpers::{obscure_value, ScriptedInvoker};
